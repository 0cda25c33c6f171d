use crate::commands::settings::{load_gateway_settings, session_data_dir};
use crate::error::{ApiError, ScoreError};
use crate::gateway::{self, ConfirmationPolicy, RecordKey, ScoreRegistry};
use crate::models::record::{SaveReceipt, StorageBackend, StoredScoreView};
use crate::models::session::{lock_session, GatewaySession, SaveStatus};
use crate::scoring::address::WalletAddress;
use crate::scoring::tier;
use std::sync::{Arc, Mutex};

#[tauri::command]
pub async fn save_score(
    address: String,
    backend: Option<StorageBackend>,
    session: tauri::State<'_, Arc<Mutex<GatewaySession>>>,
) -> Result<SaveReceipt, ApiError> {
    save_score_internal(&address, backend, session.inner())
        .await
        .map_err(ApiError::from)
}

/// Persists the session's calculated score for `address` and waits until the backend
/// serves it back.
pub async fn save_score_internal(
    address: &str,
    backend: Option<StorageBackend>,
    session: &Arc<Mutex<GatewaySession>>,
) -> Result<SaveReceipt, ScoreError> {
    let address = WalletAddress::parse(address)?;

    let (data_dir, score) = {
        let lock = lock_session(session)?;
        let score = match (lock.last_address.as_deref(), lock.last_score.as_ref()) {
            (Some(last), Some(score)) if last == address.as_str() => score.clone(),
            _ => {
                return Err(ScoreError::InvalidInput(format!(
                    "calculate a score for {address} before saving"
                )))
            }
        };
        (lock.data_dir()?, score)
    };

    let settings = load_gateway_settings(&data_dir)?;
    let backend = backend.unwrap_or(settings.default_backend);

    lock_session(session)?
        .state_mut(backend)
        .begin(address.as_str(), chrono::Utc::now().timestamp())?;

    let store = gateway::open_store(&data_dir, &settings, backend);
    let outcome = gateway::save_and_confirm(store.as_ref(), &address, &score, ConfirmationPolicy::from(&settings)).await;

    match &outcome {
        Ok(receipt) => log::info!(
            "saved score for {address} to {} (record {}, tx {})",
            backend.as_str(),
            receipt.record_id,
            receipt.tx_hash
        ),
        Err(err) => log::warn!("saving score for {address} to {} failed: {err}", backend.as_str()),
    }

    lock_session(session)?.state_mut(backend).finish(&outcome);
    outcome
}

#[tauri::command]
pub async fn load_score(
    key: String,
    backend: Option<StorageBackend>,
    session: tauri::State<'_, Arc<Mutex<GatewaySession>>>,
) -> Result<StoredScoreView, ApiError> {
    load_score_internal(&key, backend, session.inner()).map_err(ApiError::from)
}

/// Reads the stored score for an address or record-store entity key.
pub fn load_score_internal(
    key: &str,
    backend: Option<StorageBackend>,
    session: &Arc<Mutex<GatewaySession>>,
) -> Result<StoredScoreView, ScoreError> {
    let key = RecordKey::parse(key)?;
    let data_dir = session_data_dir(session)?;
    let settings = load_gateway_settings(&data_dir)?;

    let backend = match (&key, backend) {
        (_, Some(backend)) => backend,
        (RecordKey::Entity(_), None) => StorageBackend::RecordStore,
        (RecordKey::Address(_), None) => settings.default_backend,
    };

    let now = chrono::Utc::now().timestamp();
    let (record, valid) = match (backend, &key) {
        (StorageBackend::Registry, RecordKey::Address(address)) => {
            ScoreRegistry::new(&data_dir, &settings.registry_address, settings.chain_id)
                .get_score(address, now)?
                .ok_or_else(|| ScoreError::NotFound(address.to_string()))?
        }
        _ => {
            let store = gateway::open_store(&data_dir, &settings, backend);
            let record = gateway::load_required(store.as_ref(), &key)?;
            let valid = tier::is_valid(&record, now);
            (record, valid)
        }
    };

    log::debug!(
        "loaded {} record for {} (valid={valid})",
        backend.as_str(),
        record.address
    );

    Ok(StoredScoreView {
        tier: tier::tier_of(record.overall),
        expires_in_secs: record.expires_at - now,
        score: record.to_credit_score(),
        valid,
        record,
    })
}

#[tauri::command]
pub async fn get_save_status(
    session: tauri::State<'_, Arc<Mutex<GatewaySession>>>,
) -> Result<SaveStatus, ApiError> {
    Ok(lock_session(session.inner())?.status())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::scoring::calculate_score_internal;
    use crate::models::record::RiskTier;
    use crate::models::session::SaveState;

    const ADDR: &str = "0x00000000000000000000000000000000000000aa";

    fn session_in(dir: &std::path::Path) -> Arc<Mutex<GatewaySession>> {
        Arc::new(Mutex::new(GatewaySession::new(dir.to_path_buf())))
    }

    #[tokio::test]
    async fn save_requires_a_calculated_score_for_the_same_address() {
        let dir = tempfile::tempdir().expect("temp dir");
        let session = session_in(dir.path());

        let err = save_score_internal(ADDR, None, &session).await.unwrap_err();
        assert_eq!(err.code(), "INVALID_INPUT");

        calculate_score_internal(ADDR, &session).expect("calculate");
        let other = "0x00000000000000000000000000000000000000bb";
        let err = save_score_internal(other, None, &session).await.unwrap_err();
        assert_eq!(err.code(), "INVALID_INPUT");
        assert_eq!(lock_session(&session).expect("lock").status().registry, SaveState::Idle);
    }

    #[tokio::test]
    async fn pending_save_blocks_a_second_save_on_the_same_backend() {
        let dir = tempfile::tempdir().expect("temp dir");
        let session = session_in(dir.path());
        calculate_score_internal(ADDR, &session).expect("calculate");

        lock_session(&session)
            .expect("lock")
            .state_mut(StorageBackend::Registry)
            .begin(ADDR, 0)
            .expect("begin");

        let err = save_score_internal(ADDR, Some(StorageBackend::Registry), &session)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "REJECTED");

        // The other backend is independent.
        save_score_internal(ADDR, Some(StorageBackend::RecordStore), &session)
            .await
            .expect("record store save");
    }

    #[tokio::test]
    async fn save_then_load_reports_validity_and_tier() {
        let dir = tempfile::tempdir().expect("temp dir");
        let session = session_in(dir.path());
        let score = calculate_score_internal(ADDR, &session).expect("calculate");

        let receipt = save_score_internal(ADDR, None, &session).await.expect("save");
        assert_eq!(receipt.backend, StorageBackend::Registry);

        let view = load_score_internal(ADDR, None, &session).expect("load");
        assert!(view.valid);
        assert_eq!(view.tier, RiskTier::LowRisk);
        assert_eq!(view.record.tx_hash, receipt.tx_hash);
        assert_eq!(view.score.breakdown, score.breakdown);
        assert!(view.score.chains.is_empty());
        assert!(view.expires_in_secs > 0);

        match lock_session(&session).expect("lock").status().registry {
            SaveState::Succeeded { receipt: saved } => assert_eq!(saved, receipt),
            other => panic!("unexpected state {other:?}"),
        };
    }

    #[test]
    fn load_distinguishes_not_found_from_bad_keys() {
        let dir = tempfile::tempdir().expect("temp dir");
        let session = session_in(dir.path());

        let err = load_score_internal(ADDR, None, &session).unwrap_err();
        assert_eq!(err.status(), 404);

        let missing_entity = uuid::Uuid::new_v4().to_string();
        let err = load_score_internal(&missing_entity, None, &session).unwrap_err();
        assert_eq!(err.status(), 404);

        let err = load_score_internal("nope", None, &session).unwrap_err();
        assert_eq!(err.status(), 400);
    }
}
