use crate::error::{ApiError, ScoreError};
use crate::models::credit_score::{ComponentDetail, CreditScore, ScoreBreakdownView, ScoreRating, COMPONENT_WEIGHTS};
use crate::models::session::{lock_session, GatewaySession};
use crate::scoring::address::WalletAddress;
use crate::scoring::deriver::{derive_with, AddressDigits};
use std::sync::{Arc, Mutex};

#[tauri::command]
pub async fn calculate_score(
    address: String,
    session: tauri::State<'_, Arc<Mutex<GatewaySession>>>,
) -> Result<CreditScore, ApiError> {
    calculate_score_internal(&address, session.inner()).map_err(ApiError::from)
}

/// Derives the score for `address` and keeps it as the session's unsaved preview.
pub fn calculate_score_internal(
    address: &str,
    session: &Arc<Mutex<GatewaySession>>,
) -> Result<CreditScore, ScoreError> {
    let address = WalletAddress::parse(address).map_err(|e| {
        log::warn!("calculate_score rejected input: {e}");
        e
    })?;
    let score = derive_with(&address, &AddressDigits)?;
    log::info!("calculated score {} for {address}", score.overall);

    let mut lock = lock_session(session)?;
    lock.last_address = Some(address.to_string());
    lock.last_score = Some(score.clone());

    Ok(score)
}

#[tauri::command]
pub async fn get_score_breakdown(
    session: tauri::State<'_, Arc<Mutex<GatewaySession>>>,
) -> Result<ScoreBreakdownView, ApiError> {
    get_score_breakdown_internal(session.inner()).map_err(ApiError::from)
}

pub fn get_score_breakdown_internal(session: &Arc<Mutex<GatewaySession>>) -> Result<ScoreBreakdownView, ScoreError> {
    let lock = lock_session(session)?;
    let (Some(address), Some(score)) = (lock.last_address.as_ref(), lock.last_score.as_ref()) else {
        return Err(ScoreError::NotFound("the current session; calculate a score first".to_string()));
    };

    Ok(build_breakdown_view(address, score))
}

pub fn build_breakdown_view(address: &str, score: &CreditScore) -> ScoreBreakdownView {
    let b = &score.breakdown;
    let values = [
        b.loan_history,
        b.liquidation_avoidance,
        b.portfolio_diversity,
        b.cross_chain_activity,
    ];

    ScoreBreakdownView {
        address: address.to_string(),
        overall: score.overall,
        rating: ScoreRating::from_overall(score.overall),
        components: COMPONENT_WEIGHTS
            .iter()
            .zip(values)
            .map(|((name, label, weight), value)| ComponentDetail {
                name: name.to_string(),
                label: label.to_string(),
                value,
                weight: *weight,
            })
            .collect(),
        chains: score.chains.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calculate_caches_normalized_preview() {
        let session = Arc::new(Mutex::new(GatewaySession::default()));
        let score = calculate_score_internal("0X00000000000000000000000000000000000000AA", &session)
            .expect("calculate");

        assert!(score.is_consistent());
        let lock = session.lock().expect("lock");
        assert_eq!(
            lock.last_address.as_deref(),
            Some("0x00000000000000000000000000000000000000aa")
        );
        assert_eq!(lock.last_score.as_ref(), Some(&score));
    }

    #[test]
    fn invalid_address_leaves_session_untouched() {
        let session = Arc::new(Mutex::new(GatewaySession::default()));
        let err = calculate_score_internal("not-an-address", &session).unwrap_err();
        assert_eq!(err.status(), 400);
        assert!(session.lock().expect("lock").last_score.is_none());
    }

    #[test]
    fn breakdown_lists_weighted_components_in_order() {
        let session = Arc::new(Mutex::new(GatewaySession::default()));
        assert_eq!(get_score_breakdown_internal(&session).unwrap_err().code(), "NOT_FOUND");

        // Seed 0: 300 / 212 / 100 / 127.
        calculate_score_internal("0x00000000000000000000000000000000000000aa", &session).expect("calculate");
        let view = get_score_breakdown_internal(&session).expect("breakdown");

        assert_eq!(view.overall, 739);
        assert_eq!(view.rating, ScoreRating::Good);
        let names: Vec<&str> = view.components.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["loan_history", "liquidation_avoidance", "portfolio_diversity", "cross_chain_activity"]
        );
        assert_eq!(view.components[0].value, 300);
        assert_eq!(view.components[0].weight, 0.40);
        assert_eq!(view.components[3].value, 127);
        assert_eq!(view.chains.len(), 4);
    }
}
