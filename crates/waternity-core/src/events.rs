//! Ledger events
//!
//! Appended to the journal by successful commands only.

use crate::types::{Address, Amount, Bps, Timestamp, WellId};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LedgerEvent {
    PartnerAuthorized {
        partner: Address,
    },
    PartnerRevoked {
        partner: Address,
    },
    WellMinted {
        well_id: WellId,
        location: String,
        capacity: u64,
        field_partner: Address,
    },
    WellStatusUpdated {
        well_id: WellId,
        is_active: bool,
    },
    WellDataUpdated {
        well_id: WellId,
        is_active: bool,
        capacity: u64,
        people_served: u64,
    },
    WellBurned {
        well_id: WellId,
        burned_by: Address,
        reason: String,
    },
    WellRegistered {
        well_id: WellId,
    },
    Staked {
        staker: Address,
        well_id: WellId,
        amount: Amount,
    },
    Unstaked {
        staker: Address,
        well_id: WellId,
        amount: Amount,
    },
    RewardsClaimed {
        staker: Address,
        well_id: WellId,
        amount: Amount,
    },
    YieldRateUpdated {
        well_id: WellId,
        old_rate_bps: Bps,
        new_rate_bps: Bps,
    },
    UpkeepPerformed {
        upkeep_counter: u64,
        timestamp: Timestamp,
        wells_updated: usize,
    },
    MarketYieldsAdjusted {
        previous_price: i64,
        new_price: i64,
        wells_adjusted: usize,
        timestamp: Timestamp,
    },
    AutomationWellAdded {
        well_id: WellId,
    },
    IntervalUpdated {
        interval_secs: u64,
    },
}

impl LedgerEvent {
    /// Event name as used in logs and reports
    pub fn name(&self) -> &'static str {
        match self {
            Self::PartnerAuthorized { .. } => "PartnerAuthorized",
            Self::PartnerRevoked { .. } => "PartnerRevoked",
            Self::WellMinted { .. } => "WellMinted",
            Self::WellStatusUpdated { .. } => "WellStatusUpdated",
            Self::WellDataUpdated { .. } => "WellDataUpdated",
            Self::WellBurned { .. } => "WellBurned",
            Self::WellRegistered { .. } => "WellRegistered",
            Self::Staked { .. } => "Staked",
            Self::Unstaked { .. } => "Unstaked",
            Self::RewardsClaimed { .. } => "RewardsClaimed",
            Self::YieldRateUpdated { .. } => "YieldRateUpdated",
            Self::UpkeepPerformed { .. } => "UpkeepPerformed",
            Self::MarketYieldsAdjusted { .. } => "MarketYieldsAdjusted",
            Self::AutomationWellAdded { .. } => "AutomationWellAdded",
            Self::IntervalUpdated { .. } => "IntervalUpdated",
        }
    }
}
