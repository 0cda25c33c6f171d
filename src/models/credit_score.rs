use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub loan_history: u32,
    pub liquidation_avoidance: u32,
    pub portfolio_diversity: u32,
    pub cross_chain_activity: u32,
}

impl ScoreBreakdown {
    pub fn total(&self) -> u32 {
        self.loan_history
            .saturating_add(self.liquidation_avoidance)
            .saturating_add(self.portfolio_diversity)
            .saturating_add(self.cross_chain_activity)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainActivity {
    pub name: String,
    pub activity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditScore {
    pub overall: u32,
    pub breakdown: ScoreBreakdown,
    pub chains: Vec<ChainActivity>, // display only, never persisted
}

impl CreditScore {
    pub fn from_breakdown(breakdown: ScoreBreakdown, chains: Vec<ChainActivity>) -> Self {
        CreditScore {
            overall: breakdown.total(),
            breakdown,
            chains,
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.overall == self.breakdown.total()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoreRating {
    Excellent,
    Good,
    Fair,
}

impl ScoreRating {
    pub fn from_overall(overall: u32) -> Self {
        if overall >= 750 {
            ScoreRating::Excellent
        } else if overall >= 650 {
            ScoreRating::Good
        } else {
            ScoreRating::Fair
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentDetail {
    pub name: String,
    pub label: String,
    pub value: u32,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdownView {
    pub address: String,
    pub overall: u32,
    pub rating: ScoreRating,
    pub components: Vec<ComponentDetail>,
    pub chains: Vec<ChainActivity>,
}

/// Display weights of the four sub-scores (sum to 1.0)
pub const COMPONENT_WEIGHTS: [(&str, &str, f64); 4] = [
    ("loan_history", "Loan History", 0.40),
    ("liquidation_avoidance", "Liquidation Avoidance", 0.25),
    ("portfolio_diversity", "Portfolio Diversity", 0.20),
    ("cross_chain_activity", "Cross-Chain Activity", 0.15),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_camel_case_breakdown() {
        let score = CreditScore::from_breakdown(
            ScoreBreakdown {
                loan_history: 300,
                liquidation_avoidance: 212,
                portfolio_diversity: 100,
                cross_chain_activity: 127,
            },
            vec![ChainActivity {
                name: "Base Sepolia".to_string(),
                activity: 10,
            }],
        );

        let value = serde_json::to_value(&score).expect("serialize");
        assert_eq!(value["overall"], 739);
        assert_eq!(value["breakdown"]["loanHistory"], 300);
        assert_eq!(value["breakdown"]["liquidationAvoidance"], 212);
        assert_eq!(value["breakdown"]["portfolioDiversity"], 100);
        assert_eq!(value["breakdown"]["crossChainActivity"], 127);
        assert_eq!(value["chains"][0]["name"], "Base Sepolia");
    }

    #[test]
    fn rating_thresholds() {
        assert_eq!(ScoreRating::from_overall(750), ScoreRating::Excellent);
        assert_eq!(ScoreRating::from_overall(749), ScoreRating::Good);
        assert_eq!(ScoreRating::from_overall(650), ScoreRating::Good);
        assert_eq!(ScoreRating::from_overall(649), ScoreRating::Fair);
    }

    #[test]
    fn component_weights_sum_to_one() {
        let sum: f64 = COMPONENT_WEIGHTS.iter().map(|(_, _, w)| w).sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }
}
