//! Error types for Waternity ledger operations

use crate::types::{Address, Amount, WellId};
use thiserror::Error;

/// Result type alias for Waternity operations
pub type Result<T> = std::result::Result<T, WaternityError>;

/// Errors that can occur in Waternity ledger operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WaternityError {
    // === Registry ===
    /// Well was never minted or registered
    #[error("Well not found: {0}")]
    NotFound(WellId),

    /// Well is already registered for staking
    #[error("Well already registered: {0}")]
    AlreadyRegistered(WellId),

    /// Well cannot be burned while stake remains in it
    #[error("Well {well_id} still holds {total_staked} staked")]
    WellHasStake { well_id: WellId, total_staked: Amount },

    /// Caller lacks the role required for the operation
    #[error("Unauthorized caller: {0}")]
    Unauthorized(Address),

    // === Staking ===
    /// Stake amount must be greater than zero
    #[error("Amount must be greater than 0")]
    InvalidAmount,

    /// Unstake exceeds the position
    #[error("Insufficient staked amount: requested {requested}, staked {available}")]
    InsufficientStake { requested: Amount, available: Amount },

    /// Reward reserve cannot cover a payout
    #[error("Insufficient reward funds: requested {requested}, reserve {available}")]
    InsufficientFunds { requested: Amount, available: Amount },

    /// Token vault refused a transfer for another reason
    #[error("Token transfer failed: {0}")]
    TransferFailed(String),

    // === Automation ===
    /// Upkeep requested before the interval elapsed
    #[error("Upkeep not due for another {remaining_secs}s")]
    NotDue { remaining_secs: u64 },

    // === Market data ===
    /// Price feed returned a non-positive price
    #[error("Invalid price from feed: {0}")]
    InvalidPrice(i64),

    /// Price feed answer is older than the configured bound
    #[error("Stale price: {age_secs}s old, max {max_age_secs}s")]
    StalePrice { age_secs: u64, max_age_secs: u64 },

    /// Price feed could not be read
    #[error("Price feed unavailable: {0}")]
    FeedUnavailable(String),

    // === General ===
    /// Configuration rejected
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Fixed-point arithmetic overflowed
    #[error("Arithmetic overflow in {0}")]
    ArithmeticOverflow(&'static str),
}

impl WaternityError {
    /// Get the error code for API responses
    pub fn code(&self) -> u32 {
        match self {
            Self::NotFound(_) => 1001,
            Self::AlreadyRegistered(_) => 1002,
            Self::WellHasStake { .. } => 1003,
            Self::Unauthorized(_) => 1004,
            Self::InvalidAmount => 2001,
            Self::InsufficientStake { .. } => 2002,
            Self::InsufficientFunds { .. } => 2003,
            Self::TransferFailed(_) => 2004,
            Self::NotDue { .. } => 3001,
            Self::InvalidPrice(_) => 4001,
            Self::StalePrice { .. } => 4002,
            Self::FeedUnavailable(_) => 4003,
            Self::InvalidConfig(_) => 9001,
            Self::ArithmeticOverflow(_) => 9002,
        }
    }

    /// Check if the caller may succeed by retrying later (nothing retries internally)
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::InsufficientFunds { .. }
                | Self::NotDue { .. }
                | Self::StalePrice { .. }
                | Self::FeedUnavailable(_)
                | Self::TransferFailed(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(WaternityError::NotFound(7).code(), 1001);
        assert_eq!(WaternityError::InvalidAmount.code(), 2001);
        assert_eq!(WaternityError::NotDue { remaining_secs: 5 }.code(), 3001);
    }

    #[test]
    fn test_error_display() {
        let err = WaternityError::InsufficientStake {
            requested: 2000,
            available: 1000,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("Insufficient staked amount"));
        assert!(msg.contains("2000"));
    }

    #[test]
    fn test_recoverable_errors() {
        assert!(WaternityError::FeedUnavailable("timeout".into()).is_recoverable());
        assert!(!WaternityError::InvalidAmount.is_recoverable());
        assert!(!WaternityError::Unauthorized(Address::ZERO).is_recoverable());
    }
}
