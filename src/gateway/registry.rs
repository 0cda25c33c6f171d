use crate::commands::db;
use crate::error::ScoreError;
use crate::gateway::{new_tx_hash, validate_submission, RecordKey, ScoreStore};
use crate::models::credit_score::CreditScore;
use crate::models::record::{PersistedScoreRecord, SaveReceipt, StorageBackend};
use crate::scoring::address::WalletAddress;
use crate::scoring::tier;
use std::path::{Path, PathBuf};

/// Score registry contract deployed at `contract` on `chain_id`.
#[derive(Debug, Clone)]
pub struct ScoreRegistry {
    data_dir: PathBuf,
    contract: String,
    chain_id: u64,
}

impl ScoreRegistry {
    pub fn new(data_dir: &Path, contract: &str, chain_id: u64) -> Self {
        ScoreRegistry {
            data_dir: data_dir.to_path_buf(),
            contract: contract.to_ascii_lowercase(),
            chain_id,
        }
    }

    /// Contract read: the stored entry and whether it is still valid at `now`.
    pub fn get_score(
        &self,
        address: &WalletAddress,
        now: i64,
    ) -> Result<Option<(PersistedScoreRecord, bool)>, ScoreError> {
        let conn = db::get_db_connection(&self.data_dir)?;
        let entry = db::load_registry_entry(&conn, &self.contract, address.as_str())?;
        Ok(entry.map(|record| {
            let valid = tier::is_valid(&record, now);
            (record, valid)
        }))
    }
}

impl ScoreStore for ScoreRegistry {
    fn backend(&self) -> StorageBackend {
        StorageBackend::Registry
    }

    fn save_at(&self, address: &WalletAddress, score: &CreditScore, now: i64) -> Result<SaveReceipt, ScoreError> {
        validate_submission(score)?;

        let record = PersistedScoreRecord {
            address: address.to_string(),
            overall: score.overall,
            breakdown: score.breakdown,
            timestamp: now,
            expires_at: tier::expires_at(now, score.overall),
            backend: StorageBackend::Registry,
            tx_hash: new_tx_hash(),
        };

        let conn = db::get_db_connection(&self.data_dir)?;
        db::upsert_registry_entry(&conn, &self.contract, self.chain_id, &record)?;
        log::info!(
            "registry {} updated score for {address}: overall={} tx={}",
            self.contract,
            record.overall,
            record.tx_hash
        );

        Ok(SaveReceipt {
            record_id: record.address,
            tx_hash: record.tx_hash,
            timestamp: record.timestamp,
            expires_at: record.expires_at,
            backend: StorageBackend::Registry,
        })
    }

    fn load(&self, key: &RecordKey) -> Result<Option<PersistedScoreRecord>, ScoreError> {
        match key {
            RecordKey::Address(address) => {
                let conn = db::get_db_connection(&self.data_dir)?;
                Ok(db::load_registry_entry(&conn, &self.contract, address.as_str())?)
            }
            RecordKey::Entity(key) => Err(ScoreError::InvalidInput(format!(
                "registry entries are keyed by address, not entity key {key}"
            ))),
        }
    }
}
