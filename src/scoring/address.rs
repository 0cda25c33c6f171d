use crate::error::ScoreError;
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

const ADDRESS_HEX_LEN: usize = 40;

/// A 20-byte hex wallet address, normalized to lowercase with a `0x` prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WalletAddress(String);

impl WalletAddress {
    pub fn parse(raw: &str) -> Result<Self, ScoreError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ScoreError::InvalidInput("Address required".to_string()));
        }

        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .ok_or_else(|| ScoreError::InvalidInput(format!("address must start with 0x: {trimmed}")))?;

        if digits.len() != ADDRESS_HEX_LEN {
            return Err(ScoreError::InvalidInput(format!(
                "address must have {ADDRESS_HEX_LEN} hex digits, got {}",
                digits.len()
            )));
        }

        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ScoreError::InvalidInput(format!(
                "address contains non-hex characters: {trimmed}"
            )));
        }

        Ok(WalletAddress(format!("0x{}", digits.to_ascii_lowercase())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Hex digits after the prefix.
    pub fn digits(&self) -> &str {
        &self.0[2..]
    }
}

impl FromStr for WalletAddress {
    type Err = ScoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WalletAddress::parse(s)
    }
}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for WalletAddress {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}
