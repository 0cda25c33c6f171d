use crate::error::ApiError;
use crate::models::credit_score::ScoreBreakdown;
use crate::models::record::{PersistedScoreRecord, StorageBackend};
use crate::models::session::GatewaySession;
use rusqlite::{params, Connection, OptionalExtension, Result, Row};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex};

const DB_SCHEMA_VERSION: i64 = 2;

const RECORD_COLUMNS: &str = "address, overall, loan_history, liquidation_avoidance, portfolio_diversity, cross_chain_activity, timestamp, expires_at, tx_hash";

pub fn initialize_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "PRAGMA foreign_keys = ON;
         PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;",
    )?;

    let mut version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;

    if version < 1 {
        apply_migration_1(conn)?;
        version = 1;
        conn.pragma_update(None, "user_version", version)?;
    }

    if version < 2 {
        apply_migration_2(conn)?;
        version = 2;
        conn.pragma_update(None, "user_version", version)?;
    }

    if version > DB_SCHEMA_VERSION {
        log::warn!("state.db schema version {version} is newer than {DB_SCHEMA_VERSION}");
    }

    Ok(())
}

fn apply_migration_1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS score_registry (
            contract TEXT NOT NULL,
            address TEXT NOT NULL,
            overall INTEGER NOT NULL,
            loan_history INTEGER NOT NULL,
            liquidation_avoidance INTEGER NOT NULL,
            portfolio_diversity INTEGER NOT NULL,
            cross_chain_activity INTEGER NOT NULL,
            timestamp INTEGER NOT NULL,
            expires_at INTEGER NOT NULL,
            tx_hash TEXT NOT NULL,
            PRIMARY KEY (contract, address)
        );

        CREATE TABLE IF NOT EXISTS score_entities (
            entity_key TEXT PRIMARY KEY,
            namespace TEXT NOT NULL,
            address TEXT NOT NULL,
            overall INTEGER NOT NULL,
            loan_history INTEGER NOT NULL,
            liquidation_avoidance INTEGER NOT NULL,
            portfolio_diversity INTEGER NOT NULL,
            cross_chain_activity INTEGER NOT NULL,
            timestamp INTEGER NOT NULL,
            expires_at INTEGER NOT NULL,
            tx_hash TEXT NOT NULL
        );
        ",
    )
}

fn apply_migration_2(conn: &Connection) -> Result<()> {
    add_column_if_missing(conn, "score_registry", "chain_id INTEGER NOT NULL DEFAULT 31337")?;
    conn.execute_batch(
        "
        CREATE INDEX IF NOT EXISTS idx_score_entities_owner ON score_entities(namespace, address);
        CREATE INDEX IF NOT EXISTS idx_score_entities_expires_at ON score_entities(expires_at);
        ",
    )
}

fn add_column_if_missing(conn: &Connection, table: &str, column_def: &str) -> Result<()> {
    let column_name = column_def
        .split_whitespace()
        .next()
        .unwrap_or(column_def)
        .to_string();

    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let exists = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .filter_map(|res| res.ok())
        .any(|name| name == column_name);

    if !exists {
        conn.execute(&format!("ALTER TABLE {table} ADD COLUMN {column_def}"), [])?;
    }

    Ok(())
}

pub fn get_db_connection(data_dir: &Path) -> Result<Connection> {
    let conn = Connection::open(data_dir.join("state.db"))?;
    initialize_schema(&conn)?;
    Ok(conn)
}

fn row_to_record(row: &Row<'_>, backend: StorageBackend) -> Result<PersistedScoreRecord> {
    Ok(PersistedScoreRecord {
        address: row.get(0)?,
        overall: row.get(1)?,
        breakdown: ScoreBreakdown {
            loan_history: row.get(2)?,
            liquidation_avoidance: row.get(3)?,
            portfolio_diversity: row.get(4)?,
            cross_chain_activity: row.get(5)?,
        },
        timestamp: row.get(6)?,
        expires_at: row.get(7)?,
        backend,
        tx_hash: row.get(8)?,
    })
}

pub fn upsert_registry_entry(
    conn: &Connection,
    contract: &str,
    chain_id: u64,
    record: &PersistedScoreRecord,
) -> Result<()> {
    let b = &record.breakdown;
    conn.execute(
        "
        INSERT INTO score_registry (
            contract,
            address,
            overall,
            loan_history,
            liquidation_avoidance,
            portfolio_diversity,
            cross_chain_activity,
            timestamp,
            expires_at,
            tx_hash,
            chain_id
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        ON CONFLICT(contract, address) DO UPDATE SET
            overall = excluded.overall,
            loan_history = excluded.loan_history,
            liquidation_avoidance = excluded.liquidation_avoidance,
            portfolio_diversity = excluded.portfolio_diversity,
            cross_chain_activity = excluded.cross_chain_activity,
            timestamp = excluded.timestamp,
            expires_at = excluded.expires_at,
            tx_hash = excluded.tx_hash,
            chain_id = excluded.chain_id
        ",
        params![
            contract,
            record.address,
            record.overall,
            b.loan_history,
            b.liquidation_avoidance,
            b.portfolio_diversity,
            b.cross_chain_activity,
            record.timestamp,
            record.expires_at,
            record.tx_hash,
            chain_id as i64,
        ],
    )?;

    Ok(())
}

pub fn load_registry_entry(conn: &Connection, contract: &str, address: &str) -> Result<Option<PersistedScoreRecord>> {
    conn.query_row(
        &format!("SELECT {RECORD_COLUMNS} FROM score_registry WHERE contract = ?1 AND address = ?2"),
        params![contract, address],
        |row| row_to_record(row, StorageBackend::Registry),
    )
    .optional()
}

/// Replaces the owner's entity in `namespace` with a new one under `entity_key`.
pub fn replace_entity(
    conn: &Connection,
    namespace: &str,
    entity_key: &str,
    record: &PersistedScoreRecord,
) -> Result<()> {
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "DELETE FROM score_entities WHERE namespace = ?1 AND address = ?2",
        params![namespace, record.address],
    )?;

    let b = &record.breakdown;
    tx.execute(
        "INSERT INTO score_entities (entity_key, namespace, address, overall, loan_history, liquidation_avoidance, portfolio_diversity, cross_chain_activity, timestamp, expires_at, tx_hash) VALUES (?1,?2,?3,?4,?5,?6,?7,?8,?9,?10,?11)",
        params![
            entity_key,
            namespace,
            record.address,
            record.overall,
            b.loan_history,
            b.liquidation_avoidance,
            b.portfolio_diversity,
            b.cross_chain_activity,
            record.timestamp,
            record.expires_at,
            record.tx_hash,
        ],
    )?;
    tx.commit()
}

pub fn load_entity(conn: &Connection, namespace: &str, entity_key: &str) -> Result<Option<PersistedScoreRecord>> {
    conn.query_row(
        &format!("SELECT {RECORD_COLUMNS} FROM score_entities WHERE namespace = ?1 AND entity_key = ?2"),
        params![namespace, entity_key],
        |row| row_to_record(row, StorageBackend::RecordStore),
    )
    .optional()
}

/// Latest entity for an owner, together with its key.
pub fn load_latest_entity(
    conn: &Connection,
    namespace: &str,
    address: &str,
) -> Result<Option<(String, PersistedScoreRecord)>> {
    conn.query_row(
        &format!(
            "SELECT {RECORD_COLUMNS}, entity_key FROM score_entities WHERE namespace = ?1 AND address = ?2 ORDER BY timestamp DESC, rowid DESC LIMIT 1"
        ),
        params![namespace, address],
        |row| {
            let record = row_to_record(row, StorageBackend::RecordStore)?;
            let key: String = row.get(9)?;
            Ok((key, record))
        },
    )
    .optional()
}

pub fn prune_expired_entities(conn: &Connection, namespace: &str, now: i64) -> Result<usize> {
    conn.execute(
        "DELETE FROM score_entities WHERE namespace = ?1 AND expires_at <= ?2",
        params![namespace, now],
    )
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PruneResult {
    pub namespace: String,
    pub removed: usize,
}

#[tauri::command]
pub async fn prune_expired_records(
    session: tauri::State<'_, Arc<Mutex<GatewaySession>>>,
) -> Result<PruneResult, ApiError> {
    let data_dir = crate::commands::settings::session_data_dir(session.inner())?;
    prune_expired_records_internal(&data_dir, chrono::Utc::now().timestamp()).map_err(ApiError::from)
}

pub fn prune_expired_records_internal(data_dir: &Path, now: i64) -> Result<PruneResult, crate::error::ScoreError> {
    let settings = crate::commands::settings::load_gateway_settings(data_dir)?;
    let conn = get_db_connection(data_dir)?;
    let removed = prune_expired_entities(&conn, &settings.record_store_namespace, now)?;
    if removed > 0 {
        log::info!("pruned {removed} expired records from {}", settings.record_store_namespace);
    }

    Ok(PruneResult {
        namespace: settings.record_store_namespace,
        removed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(address: &str, timestamp: i64, expires_at: i64, tx_hash: &str) -> PersistedScoreRecord {
        PersistedScoreRecord {
            address: address.to_string(),
            overall: 739,
            breakdown: ScoreBreakdown {
                loan_history: 300,
                liquidation_avoidance: 212,
                portfolio_diversity: 100,
                cross_chain_activity: 127,
            },
            timestamp,
            expires_at,
            backend: StorageBackend::RecordStore,
            tx_hash: tx_hash.to_string(),
        }
    }

    fn open() -> Connection {
        let conn = Connection::open_in_memory().expect("in-memory db");
        initialize_schema(&conn).expect("schema init");
        conn
    }

    #[test]
    fn schema_initializes_with_expected_version() {
        let conn = open();
        let version: i64 = conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .expect("schema version");
        assert_eq!(version, DB_SCHEMA_VERSION);

        // Re-running is a no-op.
        initialize_schema(&conn).expect("second init");
    }

    #[test]
    fn registry_upsert_overwrites_per_contract_and_address() {
        let conn = open();
        let first = PersistedScoreRecord {
            backend: StorageBackend::Registry,
            ..record("0xaa", 10, 20, "0x01")
        };
        let second = PersistedScoreRecord {
            overall: 700,
            tx_hash: "0x02".to_string(),
            ..first.clone()
        };

        upsert_registry_entry(&conn, "0xcontract", 31337, &first).expect("first write");
        upsert_registry_entry(&conn, "0xcontract", 31337, &second).expect("second write");
        upsert_registry_entry(&conn, "0xother", 31337, &first).expect("other contract");

        let loaded = load_registry_entry(&conn, "0xcontract", "0xaa")
            .expect("read")
            .expect("exists");
        assert_eq!(loaded, second);

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM score_registry", [], |r| r.get(0))
            .expect("count");
        assert_eq!(count, 2);
        assert!(load_registry_entry(&conn, "0xcontract", "0xbb").expect("read").is_none());
    }

    #[test]
    fn replace_entity_supersedes_previous_owner_entity() {
        let conn = open();
        replace_entity(&conn, "ns", "key-1", &record("0xaa", 10, 100, "0x01")).expect("first");
        replace_entity(&conn, "ns", "key-2", &record("0xaa", 20, 100, "0x02")).expect("second");

        assert!(load_entity(&conn, "ns", "key-1").expect("read").is_none());
        let (key, latest) = load_latest_entity(&conn, "ns", "0xaa")
            .expect("read")
            .expect("exists");
        assert_eq!(key, "key-2");
        assert_eq!(latest.tx_hash, "0x02");
        assert!(load_entity(&conn, "other", "key-2").expect("read").is_none());
    }

    #[test]
    fn prune_removes_only_expired_entities() {
        let conn = open();
        replace_entity(&conn, "ns", "old", &record("0xaa", 0, 50, "0x01")).expect("old");
        replace_entity(&conn, "ns", "fresh", &record("0xbb", 0, 500, "0x02")).expect("fresh");

        assert_eq!(prune_expired_entities(&conn, "ns", 100).expect("prune"), 1);
        assert!(load_entity(&conn, "ns", "old").expect("read").is_none());
        assert!(load_entity(&conn, "ns", "fresh").expect("read").is_some());
    }
}
