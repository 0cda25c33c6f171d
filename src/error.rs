use serde::{Deserialize, Serialize};

/// Failure taxonomy shared by the deriver, the gateway and the commands.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScoreError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("write rejected: {0}")]
    Rejected(String),

    #[error("no score record found for {0}")]
    NotFound(String),
}

impl ScoreError {
    pub fn code(&self) -> &'static str {
        match self {
            ScoreError::InvalidInput(_) => "INVALID_INPUT",
            ScoreError::BackendUnavailable(_) => "BACKEND_UNAVAILABLE",
            ScoreError::Rejected(_) => "REJECTED",
            ScoreError::NotFound(_) => "NOT_FOUND",
        }
    }

    /// HTTP-style status reported to the front end alongside the message.
    pub fn status(&self) -> u16 {
        match self {
            ScoreError::InvalidInput(_) => 400,
            ScoreError::NotFound(_) => 404,
            ScoreError::Rejected(_) => 422,
            ScoreError::BackendUnavailable(_) => 503,
        }
    }
}

impl From<rusqlite::Error> for ScoreError {
    fn from(err: rusqlite::Error) -> Self {
        ScoreError::BackendUnavailable(format!("DB error: {err}"))
    }
}

/// Error object returned across the IPC boundary: `{error, code, status}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
    pub code: String,
    pub status: u16,
}

impl From<ScoreError> for ApiError {
    fn from(err: ScoreError) -> Self {
        ApiError {
            error: err.to_string(),
            code: err.code().to_string(),
            status: err.status(),
        }
    }
}
