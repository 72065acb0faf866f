//! # Waternity Node
//!
//! The ledger service: one serialized state owning the well registry,
//! staking positions, automation trigger, market adapter and vault, plus the
//! keeper loop that drives upkeep and price updates.

pub mod config;
pub mod keeper;
pub mod node;

pub use config::WaternityConfig;
pub use keeper::{Keeper, KeeperStats};
pub use node::{
    AutomationStatus, MarketData, MarketOutcome, StakeInfo, UpkeepCheck, UpkeepOutcome, WaternityNode,
    WellDetails,
};
