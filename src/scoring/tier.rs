use crate::models::record::{PersistedScoreRecord, RiskTier};

pub const SECONDS_PER_DAY: i64 = 86_400;

/// Highest overall score either backend accepts.
pub const MAX_SCORE: u32 = 1000;

pub fn tier_of(overall: u32) -> RiskTier {
    match overall {
        0..=499 => RiskTier::HighRisk,
        500..=700 => RiskTier::MediumRisk,
        _ => RiskTier::LowRisk,
    }
}

/// Retention period of a stored score.
pub fn ttl_days(overall: u32) -> i64 {
    match tier_of(overall) {
        RiskTier::HighRisk => 30,
        RiskTier::MediumRisk => 60,
        RiskTier::LowRisk => 90,
    }
}

pub fn expires_at(timestamp: i64, overall: u32) -> i64 {
    timestamp + ttl_days(overall) * SECONDS_PER_DAY
}

pub fn is_valid(record: &PersistedScoreRecord, now: i64) -> bool {
    now < record.expires_at
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::credit_score::ScoreBreakdown;
    use crate::models::record::StorageBackend;

    #[test]
    fn tier_boundaries() {
        assert_eq!(tier_of(0), RiskTier::HighRisk);
        assert_eq!(tier_of(499), RiskTier::HighRisk);
        assert_eq!(tier_of(500), RiskTier::MediumRisk);
        assert_eq!(tier_of(700), RiskTier::MediumRisk);
        assert_eq!(tier_of(701), RiskTier::LowRisk);

        assert_eq!(ttl_days(499), 30);
        assert_eq!(ttl_days(500), 60);
        assert_eq!(ttl_days(700), 60);
        assert_eq!(ttl_days(701), 90);
    }

    #[test]
    fn validity_is_strictly_before_expiry() {
        let record = PersistedScoreRecord {
            address: "0x0000000000000000000000000000000000000001".to_string(),
            overall: 739,
            breakdown: ScoreBreakdown {
                loan_history: 300,
                liquidation_avoidance: 212,
                portfolio_diversity: 100,
                cross_chain_activity: 127,
            },
            timestamp: 1_000,
            expires_at: expires_at(1_000, 739),
            backend: StorageBackend::Registry,
            tx_hash: "0x00".to_string(),
        };

        assert_eq!(record.expires_at - record.timestamp, 90 * SECONDS_PER_DAY);
        assert!(is_valid(&record, record.timestamp));
        assert!(is_valid(&record, record.expires_at - 1));
        assert!(!is_valid(&record, record.expires_at));
        assert!(!is_valid(&record, record.expires_at + SECONDS_PER_DAY));
    }
}
