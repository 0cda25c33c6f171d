use crate::commands::db;
use crate::error::ScoreError;
use crate::gateway::{new_tx_hash, validate_submission, RecordKey, ScoreStore};
use crate::models::credit_score::CreditScore;
use crate::models::record::{PersistedScoreRecord, SaveReceipt, StorageBackend};
use crate::scoring::address::WalletAddress;
use crate::scoring::tier;
use std::path::{Path, PathBuf};

/// Remote key-value record store. Entities expire at `expires_at`.
#[derive(Debug, Clone)]
pub struct RecordStore {
    data_dir: PathBuf,
    namespace: String,
}

impl RecordStore {
    pub fn new(data_dir: &Path, namespace: &str) -> Self {
        RecordStore {
            data_dir: data_dir.to_path_buf(),
            namespace: namespace.to_string(),
        }
    }

    /// Entity key of the owner's current record.
    pub fn entity_key_for(&self, address: &WalletAddress) -> Result<Option<String>, ScoreError> {
        let conn = db::get_db_connection(&self.data_dir)?;
        Ok(db::load_latest_entity(&conn, &self.namespace, address.as_str())?.map(|(key, _)| key))
    }
}

impl ScoreStore for RecordStore {
    fn backend(&self) -> StorageBackend {
        StorageBackend::RecordStore
    }

    fn save_at(&self, address: &WalletAddress, score: &CreditScore, now: i64) -> Result<SaveReceipt, ScoreError> {
        validate_submission(score)?;

        let entity_key = uuid::Uuid::new_v4().to_string();
        let record = PersistedScoreRecord {
            address: address.to_string(),
            overall: score.overall,
            breakdown: score.breakdown,
            timestamp: now,
            expires_at: tier::expires_at(now, score.overall),
            backend: StorageBackend::RecordStore,
            tx_hash: new_tx_hash(),
        };

        let conn = db::get_db_connection(&self.data_dir)?;
        db::replace_entity(&conn, &self.namespace, &entity_key, &record)?;
        log::info!(
            "record store {} created entity {entity_key} for {address} (expires {})",
            self.namespace,
            record.expires_at
        );

        Ok(SaveReceipt {
            record_id: entity_key,
            tx_hash: record.tx_hash,
            timestamp: record.timestamp,
            expires_at: record.expires_at,
            backend: StorageBackend::RecordStore,
        })
    }

    fn load(&self, key: &RecordKey) -> Result<Option<PersistedScoreRecord>, ScoreError> {
        let conn = db::get_db_connection(&self.data_dir)?;
        let record = match key {
            RecordKey::Address(address) => {
                db::load_latest_entity(&conn, &self.namespace, address.as_str())?.map(|(_, record)| record)
            }
            RecordKey::Entity(entity_key) => db::load_entity(&conn, &self.namespace, entity_key)?,
        };
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::deriver::derive_from_seed;
    use crate::scoring::tier::SECONDS_PER_DAY;

    const ADDR: &str = "0x00000000000000000000000000000000000000bb";

    #[test]
    fn save_returns_entity_key_readable_by_key_and_owner() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = RecordStore::new(dir.path(), "credit-scores");
        let address = WalletAddress::parse(ADDR).expect("valid");
        let score = derive_from_seed(0);

        let receipt = store.save_at(&address, &score, 5_000).expect("save");
        assert!(uuid::Uuid::parse_str(&receipt.record_id).is_ok());
        assert_eq!(receipt.expires_at - receipt.timestamp, 90 * SECONDS_PER_DAY);

        let by_key = store
            .load(&RecordKey::Entity(receipt.record_id.clone()))
            .expect("load")
            .expect("exists");
        let by_owner = store
            .load(&RecordKey::Address(address.clone()))
            .expect("load")
            .expect("exists");
        assert_eq!(by_key, by_owner);
        assert_eq!(by_key.breakdown, score.breakdown);
        assert_eq!(by_key.to_credit_score().chains.len(), 0);
        assert_eq!(store.entity_key_for(&address).expect("key"), Some(receipt.record_id));
    }

    #[test]
    fn new_save_supersedes_previous_entity() {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = RecordStore::new(dir.path(), "credit-scores");
        let address = WalletAddress::parse(ADDR).expect("valid");

        let first = store.save_at(&address, &derive_from_seed(0), 1).expect("first");
        let second = store.save_at(&address, &derive_from_seed(1), 2).expect("second");

        assert!(store
            .load(&RecordKey::Entity(first.record_id))
            .expect("load")
            .is_none());
        let latest = store
            .load(&RecordKey::Address(address))
            .expect("load")
            .expect("exists");
        assert_eq!(latest.tx_hash, second.tx_hash);
        assert_eq!(latest.overall, 660);
    }

    #[test]
    fn namespaces_are_isolated() {
        let dir = tempfile::tempdir().expect("temp dir");
        let address = WalletAddress::parse(ADDR).expect("valid");
        RecordStore::new(dir.path(), "a")
            .save_at(&address, &derive_from_seed(0), 1)
            .expect("save");

        let other = RecordStore::new(dir.path(), "b");
        assert!(other.load(&RecordKey::Address(address)).expect("load").is_none());
    }
}
