//! Core identifiers and numeric types for the Waternity ledger

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Well identifier, allocated sequentially from 0 at mint time
pub type WellId = u64;

/// Token amount in the smallest unit of the staking asset
pub type Amount = u128;

/// Rate in basis points (10_000 = 100%)
pub type Bps = u32;

/// Unix timestamp in seconds
pub type Timestamp = i64;

/// Basis points denominator
pub const BPS_DENOMINATOR: u128 = 10_000;

/// Seconds in a (365 day) accrual year
pub const SECONDS_PER_YEAR: u128 = 365 * 24 * 3600;

/// Decimal places of the staking asset (USDC-like)
pub const ASSET_DECIMALS: u8 = 6;

/// One whole unit of the staking asset
pub const ONE_TOKEN: Amount = 1_000_000;

/// Identity of a staker, partner or administrator (wallet address)
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address {
    bytes: [u8; 32],
}

impl Address {
    pub const ZERO: Address = Address { bytes: [0u8; 32] };

    pub fn new(bytes: [u8; 32]) -> Self {
        Self { bytes }
    }

    /// Deterministic address derived from a human label ("alice", "partner-1")
    pub fn from_label(label: &str) -> Self {
        Self {
            bytes: *blake3::hash(label.as_bytes()).as_bytes(),
        }
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.bytes
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.bytes)
    }

    pub fn is_zero(&self) -> bool {
        self.bytes == [0u8; 32]
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", &self.to_hex()[..12])
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", &self.to_hex()[..12])
    }
}

impl FromStr for Address {
    type Err = hex::FromHexError;

    /// Parses a 64-character hex string, with or without a `0x` prefix
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.strip_prefix("0x").unwrap_or(s);
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(trimmed, &mut bytes)?;
        Ok(Self { bytes })
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Convert whole tokens to smallest units
pub fn tokens(whole: u64) -> Amount {
    whole as Amount * ONE_TOKEN
}
