use crate::error::ScoreError;
use crate::models::credit_score::CreditScore;
use crate::models::record::{SaveReceipt, StorageBackend};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

/// Lifecycle of a save against one backend: Idle -> Pending -> Succeeded | Failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum SaveState {
    #[default]
    Idle,
    Pending {
        address: String,
        started_at: i64,
    },
    Succeeded {
        receipt: SaveReceipt,
    },
    Failed {
        address: String,
        error: String,
    },
}

impl SaveState {
    pub fn is_pending(&self) -> bool {
        matches!(self, SaveState::Pending { .. })
    }

    /// Moves to `Pending`. Only one save per backend may be in flight.
    pub fn begin(&mut self, address: &str, now: i64) -> Result<(), ScoreError> {
        if let SaveState::Pending { address: pending, .. } = self {
            return Err(ScoreError::Rejected(format!(
                "a save for {pending} is already pending"
            )));
        }
        *self = SaveState::Pending {
            address: address.to_string(),
            started_at: now,
        };
        Ok(())
    }

    pub fn finish(&mut self, outcome: &Result<SaveReceipt, ScoreError>) {
        let address = match self {
            SaveState::Pending { address, .. } => address.clone(),
            _ => String::new(),
        };
        *self = match outcome {
            Ok(receipt) => SaveState::Succeeded {
                receipt: receipt.clone(),
            },
            Err(err) => SaveState::Failed {
                address,
                error: err.to_string(),
            },
        };
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveStatus {
    pub registry: SaveState,
    pub record_store: SaveState,
}

/// Per-window state shared by the commands.
#[derive(Debug, Default)]
pub struct GatewaySession {
    pub data_dir: Option<PathBuf>,
    pub last_address: Option<String>,
    pub last_score: Option<CreditScore>,
    pub registry: SaveState,
    pub record_store: SaveState,
}

impl GatewaySession {
    pub fn new(data_dir: PathBuf) -> Self {
        GatewaySession {
            data_dir: Some(data_dir),
            ..Default::default()
        }
    }

    pub fn data_dir(&self) -> Result<PathBuf, ScoreError> {
        self.data_dir
            .clone()
            .ok_or_else(|| ScoreError::BackendUnavailable("data directory not initialized".to_string()))
    }

    pub fn state_mut(&mut self, backend: StorageBackend) -> &mut SaveState {
        match backend {
            StorageBackend::Registry => &mut self.registry,
            StorageBackend::RecordStore => &mut self.record_store,
        }
    }

    pub fn status(&self) -> SaveStatus {
        SaveStatus {
            registry: self.registry.clone(),
            record_store: self.record_store.clone(),
        }
    }
}

pub fn lock_session(session: &Arc<Mutex<GatewaySession>>) -> Result<MutexGuard<'_, GatewaySession>, ScoreError> {
    session
        .lock()
        .map_err(|_| ScoreError::BackendUnavailable("Session lock error".to_string()))
}
