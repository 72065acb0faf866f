//! # Waternity Economics - Well Staking & Yield Model
//!
//! The accrual and rate-setting rules behind Waternity well staking.
//!
//! ## Components
//!
//! - **Well registry**: minted wells, partner roles, per-well stake aggregates
//! - **Staking ledger**: per-(staker, well) positions with linear yield accrual
//! - **Yield curve**: diminishing-returns rate as a function of aggregate stake
//! - **Automation**: time-gated upkeep that re-prices every automated well
//! - **Market adapter**: price-driven proportional rate adjustment
//! - **Vault**: the external token ledger holding principal and the reward reserve
//!
//! ## Accrual
//!
//! ```text
//! reward = floor(amount * rate_bps * elapsed_secs / (10_000 * 31_536_000))
//! ```
//!
//! Every settlement rounds down, so splitting an interval into many
//! settlements never pays more than settling it once.
//!
//! ## Rate Lifecycle
//!
//! | Writer | Trigger | Rule |
//! |--------|---------|------|
//! | Registry | `register_well` | default rate (300 bps) |
//! | Automation | interval elapsed | yield curve of total staked |
//! | Market adapter | price moved past threshold | `rate * new / old`, clamped |

pub mod automation;
pub mod market;
pub mod registry;
pub mod staking;
pub mod vault;
pub mod yield_curve;

// Re-exports
pub use automation::{AutomationState, AutomationTrigger, UpkeepPhase, UpkeepPlan};
pub use market::{MarketDecision, MarketParams, MarketPlan, MarketRateAdapter, PriceFeed, PriceRound, StaticPriceFeed};
pub use registry::{MintWell, RegistryEntry, WellData, WellInfo, WellRegistry};
pub use staking::{accrue, RateChange, StakePosition, StakingLedger};
pub use vault::{ReserveVault, TokenVault, VaultSummary};
pub use yield_curve::YieldCurve;

/// Waternity economic constants
pub mod constants {
    use waternity_core::types::{Bps, ONE_TOKEN};

    /// Rate given to a freshly registered well: 3%
    pub const DEFAULT_YIELD_RATE_BPS: Bps = 300;

    /// Default automation interval: 1 hour
    pub const DEFAULT_UPKEEP_INTERVAL_SECS: u64 = 3600;

    /// Yield curve rate at zero aggregate stake: 8%
    pub const DEFAULT_CURVE_CEILING_BPS: Bps = 800;

    /// Yield curve asymptote for very large stake: 2%
    pub const DEFAULT_CURVE_FLOOR_BPS: Bps = 200;

    /// Aggregate stake at which the curve sits halfway between ceiling and floor
    pub const DEFAULT_CURVE_HALF_STAKE: u128 = 5_000 * ONE_TOKEN;

    /// Price move that triggers a market adjustment: 5%
    pub const DEFAULT_MARKET_THRESHOLD_BPS: Bps = 500;

    /// Market adjustment band: 1% .. 15%
    pub const DEFAULT_MIN_RATE_BPS: Bps = 100;
    pub const DEFAULT_MAX_RATE_BPS: Bps = 1_500;

    /// Oldest acceptable price answer: 1 hour
    pub const DEFAULT_MAX_PRICE_AGE_SECS: u64 = 3600;

    /// People served at which a well reaches the maximum impact score
    pub const IMPACT_REFERENCE_PEOPLE: u64 = 500;

    /// Maximum impact score
    pub const MAX_IMPACT_SCORE: u32 = 100;
}

pub use constants::*;
