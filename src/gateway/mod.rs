//! Score Record Gateway.
//!
//! Two interchangeable persistence backends sit behind [`ScoreStore`]: the score registry
//! contract (one entry per address) and the remote record store (one entity per address,
//! superseded on every save). Both are backed by the local `state.db` ledger here; the
//! trait is the seam where real chain and network clients plug in.

pub mod record_store;
pub mod registry;

use crate::commands::settings::GatewaySettings;
use crate::error::ScoreError;
use crate::models::credit_score::CreditScore;
use crate::models::record::{PersistedScoreRecord, SaveReceipt, StorageBackend};
use crate::scoring::address::WalletAddress;
use crate::scoring::tier::MAX_SCORE;
use std::path::Path;
use std::time::Duration;

pub use record_store::RecordStore;
pub use registry::ScoreRegistry;

/// Lookup key for a stored score.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordKey {
    Address(WalletAddress),
    Entity(String),
}

impl RecordKey {
    /// `0x...` keys are addresses; anything else must be a record-store entity key.
    pub fn parse(raw: &str) -> Result<Self, ScoreError> {
        let trimmed = raw.trim();
        if trimmed.starts_with("0x") || trimmed.starts_with("0X") {
            return WalletAddress::parse(trimmed).map(RecordKey::Address);
        }

        uuid::Uuid::parse_str(trimmed)
            .map(|key| RecordKey::Entity(key.to_string()))
            .map_err(|_| ScoreError::InvalidInput(format!("not an address or entity key: {trimmed}")))
    }

    pub fn for_receipt(receipt: &SaveReceipt) -> Result<Self, ScoreError> {
        match receipt.backend {
            StorageBackend::Registry => WalletAddress::parse(&receipt.record_id).map(RecordKey::Address),
            StorageBackend::RecordStore => Ok(RecordKey::Entity(receipt.record_id.clone())),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            RecordKey::Address(address) => address.as_str(),
            RecordKey::Entity(key) => key,
        }
    }
}

pub trait ScoreStore: Send + Sync {
    fn backend(&self) -> StorageBackend;

    /// Writes one record for `address` stamped at `now`, replacing any earlier one.
    fn save_at(&self, address: &WalletAddress, score: &CreditScore, now: i64) -> Result<SaveReceipt, ScoreError>;

    /// Most recent record for the key, `None` when nothing is stored.
    fn load(&self, key: &RecordKey) -> Result<Option<PersistedScoreRecord>, ScoreError>;

    fn save(&self, address: &WalletAddress, score: &CreditScore) -> Result<SaveReceipt, ScoreError> {
        self.save_at(address, score, chrono::Utc::now().timestamp())
    }
}

pub fn load_required<S: ScoreStore + ?Sized>(store: &S, key: &RecordKey) -> Result<PersistedScoreRecord, ScoreError> {
    store
        .load(key)?
        .ok_or_else(|| ScoreError::NotFound(key.as_str().to_string()))
}

/// Checks the backends apply before accepting a write.
pub fn validate_submission(score: &CreditScore) -> Result<(), ScoreError> {
    if !score.is_consistent() {
        return Err(ScoreError::Rejected(format!(
            "overall {} does not equal breakdown sum {}",
            score.overall,
            score.breakdown.total()
        )));
    }
    if score.overall > MAX_SCORE {
        return Err(ScoreError::Rejected(format!(
            "overall {} exceeds maximum {MAX_SCORE}",
            score.overall
        )));
    }
    Ok(())
}

pub(crate) fn new_tx_hash() -> String {
    format!(
        "0x{}{}",
        uuid::Uuid::new_v4().simple(),
        uuid::Uuid::new_v4().simple()
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmationPolicy {
    pub interval: Duration,
    pub attempts: u32,
}

impl Default for ConfirmationPolicy {
    fn default() -> Self {
        ConfirmationPolicy {
            interval: Duration::from_millis(250),
            attempts: 20,
        }
    }
}

impl From<&GatewaySettings> for ConfirmationPolicy {
    fn from(settings: &GatewaySettings) -> Self {
        ConfirmationPolicy {
            interval: settings.confirmation_poll,
            attempts: settings.confirmation_attempts.max(1),
        }
    }
}

pub fn open_store(data_dir: &Path, settings: &GatewaySettings, backend: StorageBackend) -> Box<dyn ScoreStore> {
    match backend {
        StorageBackend::Registry => Box::new(ScoreRegistry::new(
            data_dir,
            &settings.registry_address,
            settings.chain_id,
        )),
        StorageBackend::RecordStore => Box::new(RecordStore::new(data_dir, &settings.record_store_namespace)),
    }
}

/// Re-reads `key` until the stored record carries the receipt's transaction hash.
pub async fn await_confirmation<S: ScoreStore + ?Sized>(
    store: &S,
    key: &RecordKey,
    receipt: &SaveReceipt,
    policy: ConfirmationPolicy,
) -> Result<PersistedScoreRecord, ScoreError> {
    let attempts = policy.attempts.max(1);
    for attempt in 1..=attempts {
        if let Some(record) = store.load(key)? {
            if record.tx_hash == receipt.tx_hash {
                log::debug!(
                    "{} confirmed {} after {attempt} read(s)",
                    store.backend().as_str(),
                    receipt.tx_hash
                );
                return Ok(record);
            }
        }

        if attempt < attempts {
            tokio::time::sleep(policy.interval).await;
        }
    }

    Err(ScoreError::BackendUnavailable(format!(
        "{} not confirmed after {attempts} reads",
        receipt.tx_hash
    )))
}

pub async fn save_and_confirm<S: ScoreStore + ?Sized>(
    store: &S,
    address: &WalletAddress,
    score: &CreditScore,
    policy: ConfirmationPolicy,
) -> Result<SaveReceipt, ScoreError> {
    let receipt = store.save(address, score)?;
    let key = RecordKey::for_receipt(&receipt)?;
    await_confirmation(store, &key, &receipt, policy).await?;
    Ok(receipt)
}
