//! Placeholder score derivation.
//!
//! Nothing here reads on-chain history. The seed comes from the address's own hex digits
//! and every constant below is illustrative, chosen so that the demo UI shows plausible
//! numbers. A real implementation replaces the `SeedSource` with aggregated lending data.

use crate::error::ScoreError;
use crate::models::credit_score::{ChainActivity, CreditScore, ScoreBreakdown};
use crate::scoring::address::WalletAddress;

/// Offset and width of the hex slice used as the seed (after the `0x` prefix).
const SEED_SLICE: std::ops::Range<usize> = 0..8;
const SEED_MODULUS: u32 = 1000;

/// (name, base, range) for the illustrative per-chain activity bars.
const CHAINS: [(&str, u32, u32); 4] = [
    ("Ethereum Sepolia", 30, 70),
    ("Arbitrum Sepolia", 20, 60),
    ("Optimism Sepolia", 15, 50),
    ("Base Sepolia", 10, 40),
];

pub trait SeedSource {
    /// Returns a seed in `0..1000` for the address.
    fn seed(&self, address: &WalletAddress) -> Result<u32, ScoreError>;
}

/// Seeds from the first 8 hex digits of the address.
#[derive(Debug, Clone, Copy, Default)]
pub struct AddressDigits;

impl SeedSource for AddressDigits {
    fn seed(&self, address: &WalletAddress) -> Result<u32, ScoreError> {
        let slice = address
            .digits()
            .get(SEED_SLICE)
            .ok_or_else(|| ScoreError::InvalidInput(format!("address too short: {address}")))?;
        let value = u32::from_str_radix(slice, 16)
            .map_err(|e| ScoreError::InvalidInput(format!("bad seed digits {slice}: {e}")))?;
        Ok(value % SEED_MODULUS)
    }
}

pub fn derive(address: &str) -> Result<CreditScore, ScoreError> {
    derive_with(&WalletAddress::parse(address)?, &AddressDigits)
}

pub fn derive_with<S: SeedSource>(address: &WalletAddress, source: &S) -> Result<CreditScore, ScoreError> {
    let seed = source.seed(address)?;
    Ok(derive_from_seed(seed % SEED_MODULUS))
}

pub fn derive_from_seed(seed: u32) -> CreditScore {
    // Integer forms of floor((seed * 0.4) % 200) and floor((seed * 0.3) % 100);
    // identical for every seed below 1000.
    let loan_history = 300 + (seed * 2 / 5) % 200;
    let liquidation_avoidance = if seed % 2 == 0 { 212 } else { 180 };
    let portfolio_diversity = 100 + (seed * 3 / 10) % 100;
    let cross_chain_activity = if seed % 3 == 0 { 127 } else { 80 };

    let chains = CHAINS
        .iter()
        .map(|(name, base, range)| ChainActivity {
            name: name.to_string(),
            activity: (base + seed % range).min(100),
        })
        .collect();

    CreditScore::from_breakdown(
        ScoreBreakdown {
            loan_history,
            liquidation_avoidance,
            portfolio_diversity,
            cross_chain_activity,
        },
        chains,
    )
}
