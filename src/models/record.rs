use crate::models::credit_score::{CreditScore, ScoreBreakdown};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StorageBackend {
    Registry,
    RecordStore,
}

impl StorageBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageBackend::Registry => "registry",
            StorageBackend::RecordStore => "recordStore",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "registry" => Some(StorageBackend::Registry),
            "recordStore" => Some(StorageBackend::RecordStore),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskTier {
    HighRisk,
    MediumRisk,
    LowRisk,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedScoreRecord {
    pub address: String,
    pub overall: u32,
    pub breakdown: ScoreBreakdown,
    pub timestamp: i64,
    pub expires_at: i64,
    pub backend: StorageBackend,
    pub tx_hash: String,
}

impl PersistedScoreRecord {
    /// Display shape of a stored record. Chain activity is never persisted.
    pub fn to_credit_score(&self) -> CreditScore {
        CreditScore {
            overall: self.overall,
            breakdown: self.breakdown,
            chains: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveReceipt {
    pub record_id: String,
    pub tx_hash: String,
    pub timestamp: i64,
    pub expires_at: i64,
    pub backend: StorageBackend,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredScoreView {
    pub record: PersistedScoreRecord,
    pub valid: bool,
    pub tier: RiskTier,
    pub expires_in_secs: i64,
    pub score: CreditScore,
}
