//! Node configuration types

use serde::{Deserialize, Serialize};
use std::path::Path;
use waternity_core::error::{Result, WaternityError};
use waternity_core::types::{tokens, Address, Amount, Bps};
use waternity_economics::constants::*;
use waternity_economics::{MarketParams, YieldCurve};

/// Prefix of environment overrides, e.g. `WATERNITY__AUTOMATION__INTERVAL_SECS=600`
pub const ENV_PREFIX: &str = "WATERNITY";

/// Complete node configuration
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WaternityConfig {
    /// Ledger ownership and defaults
    #[serde(default)]
    pub ledger: LedgerConfig,

    /// Automation trigger and yield curve
    #[serde(default)]
    pub automation: AutomationConfig,

    /// Market-rate adapter
    #[serde(default)]
    pub market: MarketConfig,

    /// Reward reserve
    #[serde(default)]
    pub treasury: TreasuryConfig,

    /// Keeper loop
    #[serde(default)]
    pub keeper: KeeperConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Ledger settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Administrator address (hex)
    #[serde(default = "default_admin")]
    pub admin: Address,

    /// Rate given to newly registered wells
    #[serde(default = "default_yield_rate_bps")]
    pub default_yield_rate_bps: Bps,
}

fn default_admin() -> Address {
    Address::from_label("waternity-admin")
}

fn default_yield_rate_bps() -> Bps {
    DEFAULT_YIELD_RATE_BPS
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            admin: default_admin(),
            default_yield_rate_bps: default_yield_rate_bps(),
        }
    }
}

/// Automation settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AutomationConfig {
    /// Minimum seconds between upkeeps
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Curve rate at zero stake
    #[serde(default = "default_curve_ceiling_bps")]
    pub curve_ceiling_bps: Bps,

    /// Curve rate for unbounded stake
    #[serde(default = "default_curve_floor_bps")]
    pub curve_floor_bps: Bps,

    /// Stake (whole tokens) at the curve midpoint
    #[serde(default = "default_curve_half_stake_tokens")]
    pub curve_half_stake_tokens: u64,
}

fn default_interval_secs() -> u64 {
    DEFAULT_UPKEEP_INTERVAL_SECS
}

fn default_curve_ceiling_bps() -> Bps {
    DEFAULT_CURVE_CEILING_BPS
}

fn default_curve_floor_bps() -> Bps {
    DEFAULT_CURVE_FLOOR_BPS
}

fn default_curve_half_stake_tokens() -> u64 {
    5_000
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            curve_ceiling_bps: default_curve_ceiling_bps(),
            curve_floor_bps: default_curve_floor_bps(),
            curve_half_stake_tokens: default_curve_half_stake_tokens(),
        }
    }
}

impl AutomationConfig {
    pub fn curve(&self) -> Result<YieldCurve> {
        YieldCurve::new(
            self.curve_ceiling_bps,
            self.curve_floor_bps,
            tokens(self.curve_half_stake_tokens),
        )
    }
}

/// Market adapter settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MarketConfig {
    /// Price move that must be exceeded before rates change
    #[serde(default = "default_threshold_bps")]
    pub threshold_bps: Bps,

    /// Lowest adjusted rate
    #[serde(default = "default_min_rate_bps")]
    pub min_rate_bps: Bps,

    /// Highest adjusted rate
    #[serde(default = "default_max_rate_bps")]
    pub max_rate_bps: Bps,

    /// Oldest acceptable feed answer
    #[serde(default = "default_max_price_age_secs")]
    pub max_price_age_secs: u64,
}

fn default_threshold_bps() -> Bps {
    DEFAULT_MARKET_THRESHOLD_BPS
}

fn default_min_rate_bps() -> Bps {
    DEFAULT_MIN_RATE_BPS
}

fn default_max_rate_bps() -> Bps {
    DEFAULT_MAX_RATE_BPS
}

fn default_max_price_age_secs() -> u64 {
    DEFAULT_MAX_PRICE_AGE_SECS
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            threshold_bps: default_threshold_bps(),
            min_rate_bps: default_min_rate_bps(),
            max_rate_bps: default_max_rate_bps(),
            max_price_age_secs: default_max_price_age_secs(),
        }
    }
}

impl MarketConfig {
    pub fn params(&self) -> MarketParams {
        MarketParams {
            threshold_bps: self.threshold_bps,
            min_rate_bps: self.min_rate_bps,
            max_rate_bps: self.max_rate_bps,
            max_price_age_secs: self.max_price_age_secs,
        }
    }
}

/// Reward reserve settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TreasuryConfig {
    /// Reserve (whole tokens) the in-memory vault starts with
    #[serde(default = "default_initial_reward_reserve_tokens")]
    pub initial_reward_reserve_tokens: u64,
}

fn default_initial_reward_reserve_tokens() -> u64 {
    100_000
}

impl Default for TreasuryConfig {
    fn default() -> Self {
        Self {
            initial_reward_reserve_tokens: default_initial_reward_reserve_tokens(),
        }
    }
}

impl TreasuryConfig {
    pub fn initial_reward_reserve(&self) -> Amount {
        tokens(self.initial_reward_reserve_tokens)
    }
}

/// Keeper loop settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KeeperConfig {
    /// Seconds between keeper ticks
    #[serde(default = "default_tick_secs")]
    pub tick_secs: u64,

    /// Also run the market adapter over automated wells each tick
    #[serde(default = "default_true")]
    pub update_market: bool,
}

fn default_tick_secs() -> u64 {
    60
}

fn default_true() -> bool {
    true
}

impl Default for KeeperConfig {
    fn default() -> Self {
        Self {
            tick_secs: default_tick_secs(),
            update_market: true,
        }
    }
}

/// Logging configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when RUST_LOG is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of text
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl WaternityConfig {
    /// Load defaults, then `path` (TOML) if given, then `WATERNITY__*` environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(
                config::File::from(path)
                    .format(config::FileFormat::Toml)
                    .required(true),
            );
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = builder
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| WaternityError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| WaternityError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| WaternityError::InvalidConfig(e.to_string()))
    }

    /// Reject inconsistent settings
    pub fn validate(&self) -> Result<()> {
        if self.ledger.admin.is_zero() {
            return Err(WaternityError::InvalidConfig("ledger.admin must not be zero".into()));
        }
        if self.automation.interval_secs == 0 {
            return Err(WaternityError::InvalidConfig(
                "automation.interval_secs must be positive".into(),
            ));
        }
        if self.keeper.tick_secs == 0 {
            return Err(WaternityError::InvalidConfig("keeper.tick_secs must be positive".into()));
        }
        self.automation.curve()?;
        self.market.params().validate()?;
        Ok(())
    }
}
