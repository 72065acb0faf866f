//! # Market-Rate Adapter
//!
//! Nudges well rates when an external price moves past a threshold.
//!
//! ## Rules
//!
//! | Situation | Effect |
//! |-----------|--------|
//! | No price recorded yet | record baseline, rates untouched |
//! | `|move| <= threshold` | explicit no-op, nothing recorded |
//! | `|move| > threshold` | `rate * new / old` clamped to the band; price recorded |
//! | price <= 0 | `InvalidPrice` |
//! | answer older than max age | `StalePrice` |

use crate::constants::*;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use waternity_core::error::{Result, WaternityError};
use waternity_core::types::{Bps, Timestamp, WellId, BPS_DENOMINATOR};

/// One price answer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceRound {
    /// Signed integer price in the feed's own decimals
    pub price: i64,
    /// When the feed last updated the answer
    pub updated_at: Timestamp,
}

/// External price source
pub trait PriceFeed: Send + Sync {
    fn latest_round(&self) -> Result<PriceRound>;
}

/// Feed whose answer is set by hand (simulation, tests)
#[derive(Debug)]
pub struct StaticPriceFeed {
    round: Mutex<Option<PriceRound>>,
}

impl StaticPriceFeed {
    pub fn new(price: i64, updated_at: Timestamp) -> Self {
        Self {
            round: Mutex::new(Some(PriceRound { price, updated_at })),
        }
    }

    /// Feed that has never answered
    pub fn empty() -> Self {
        Self {
            round: Mutex::new(None),
        }
    }

    pub fn set_price(&self, price: i64, updated_at: Timestamp) {
        *self.round.lock() = Some(PriceRound { price, updated_at });
    }
}

impl PriceFeed for StaticPriceFeed {
    fn latest_round(&self) -> Result<PriceRound> {
        (*self.round.lock()).ok_or_else(|| WaternityError::FeedUnavailable("no answer yet".into()))
    }
}

/// Adapter tuning
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketParams {
    /// Price move (bps of the recorded price) that must be exceeded
    pub threshold_bps: Bps,
    /// Lowest rate an adjustment may produce
    pub min_rate_bps: Bps,
    /// Highest rate an adjustment may produce
    pub max_rate_bps: Bps,
    /// Oldest acceptable answer
    pub max_price_age_secs: u64,
}

impl Default for MarketParams {
    fn default() -> Self {
        Self {
            threshold_bps: DEFAULT_MARKET_THRESHOLD_BPS,
            min_rate_bps: DEFAULT_MIN_RATE_BPS,
            max_rate_bps: DEFAULT_MAX_RATE_BPS,
            max_price_age_secs: DEFAULT_MAX_PRICE_AGE_SECS,
        }
    }
}

impl MarketParams {
    pub fn validate(&self) -> Result<()> {
        if self.min_rate_bps > self.max_rate_bps {
            return Err(WaternityError::InvalidConfig(format!(
                "market band min {} bps above max {} bps",
                self.min_rate_bps, self.max_rate_bps
            )));
        }
        Ok(())
    }
}

/// What a fresh price means for the rates
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketDecision {
    /// First observation; becomes the reference price
    Baseline,
    /// Move within threshold; nothing changes
    BelowThreshold { movement_bps: i64 },
    /// Move past threshold; rates scale by the price ratio
    Adjust { movement_bps: i64 },
}

/// Planned adjustment
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MarketPlan {
    pub decision: MarketDecision,
    /// Price the plan was computed from
    pub round: PriceRound,
    /// Reference price before this plan
    pub previous_price: Option<i64>,
    /// New rates; empty unless `decision` is `Adjust`
    pub rates: Vec<(WellId, Bps)>,
}

/// Recorded reference price plus tuning
#[derive(Clone, Debug)]
pub struct MarketRateAdapter {
    params: MarketParams,
    recorded: Option<PriceRound>,
}

impl MarketRateAdapter {
    pub fn new(params: MarketParams) -> Self {
        Self {
            params,
            recorded: None,
        }
    }

    pub fn params(&self) -> &MarketParams {
        &self.params
    }

    /// Last price that caused (or baselined) an adjustment
    pub fn recorded(&self) -> Option<PriceRound> {
        self.recorded
    }

    /// Reject non-positive and stale answers
    pub fn check_round(&self, round: &PriceRound, now: Timestamp) -> Result<()> {
        if round.price <= 0 {
            return Err(WaternityError::InvalidPrice(round.price));
        }
        let age_secs = now.saturating_sub(round.updated_at).max(0) as u64;
        if age_secs > self.params.max_price_age_secs {
            return Err(WaternityError::StalePrice {
                age_secs,
                max_age_secs: self.params.max_price_age_secs,
            });
        }
        Ok(())
    }

    /// Signed move of `price` relative to the recorded price, in bps (truncated)
    pub fn movement_bps(&self, price: i64) -> Option<i64> {
        self.recorded.map(|recorded| {
            let delta = price as i128 - recorded.price as i128;
            let movement = delta * BPS_DENOMINATOR as i128 / recorded.price as i128;
            i64::try_from(movement).unwrap_or(if movement < 0 { i64::MIN } else { i64::MAX })
        })
    }

    /// Classify a validated answer
    pub fn decide(&self, round: &PriceRound) -> MarketDecision {
        let Some(recorded) = self.recorded else {
            return MarketDecision::Baseline;
        };
        let movement_bps = self.movement_bps(round.price).unwrap_or(0);

        // exact comparison: |new - old| * 10_000 > threshold * old
        let delta = (round.price as i128 - recorded.price as i128).abs();
        let exceeds = delta * BPS_DENOMINATOR as i128 > self.params.threshold_bps as i128 * recorded.price as i128;
        if exceeds {
            MarketDecision::Adjust { movement_bps }
        } else {
            MarketDecision::BelowThreshold { movement_bps }
        }
    }

    /// `rate * new / old`, clamped to the band
    pub fn adjusted_rate(&self, rate_bps: Bps, previous_price: i64, new_price: i64) -> Bps {
        let scaled = rate_bps as u128 * new_price.max(0) as u128 / previous_price.max(1) as u128;
        let clamped = scaled
            .max(self.params.min_rate_bps as u128)
            .min(self.params.max_rate_bps as u128);
        clamped as Bps
    }

    /// Plan the effect of `round` on the given `(well, current rate)` pairs
    pub fn plan(&self, round: PriceRound, now: Timestamp, current_rates: &[(WellId, Bps)]) -> Result<MarketPlan> {
        self.check_round(&round, now)?;

        let decision = self.decide(&round);
        let previous_price = self.recorded.map(|r| r.price);
        let rates = match (decision, previous_price) {
            (MarketDecision::Adjust { .. }, Some(previous)) => current_rates
                .iter()
                .map(|&(well_id, rate)| (well_id, self.adjusted_rate(rate, previous, round.price)))
                .collect(),
            _ => Vec::new(),
        };

        Ok(MarketPlan {
            decision,
            round,
            previous_price,
            rates,
        })
    }

    /// Persist the outcome of an applied plan
    pub fn commit(&mut self, plan: &MarketPlan) {
        match plan.decision {
            MarketDecision::Baseline | MarketDecision::Adjust { .. } => self.recorded = Some(plan.round),
            MarketDecision::BelowThreshold { .. } => {}
        }
    }
}

impl Default for MarketRateAdapter {
    fn default() -> Self {
        Self::new(MarketParams::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round(price: i64) -> PriceRound {
        PriceRound { price, updated_at: 100 }
    }

    fn baselined(price: i64) -> MarketRateAdapter {
        let mut adapter = MarketRateAdapter::default();
        let plan = adapter.plan(round(price), 100, &[]).unwrap();
        assert_eq!(plan.decision, MarketDecision::Baseline);
        adapter.commit(&plan);
        adapter
    }

    #[test]
    fn test_first_observation_is_baseline() {
        let adapter = MarketRateAdapter::default();
        let plan = adapter.plan(round(2_000), 100, &[(0, 300)]).unwrap();
        assert_eq!(plan.decision, MarketDecision::Baseline);
        assert!(plan.rates.is_empty());
    }

    #[test]
    fn test_small_move_is_noop() {
        let mut adapter = baselined(2_000);
        // +5% exactly: not past the threshold
        let plan = adapter.plan(round(2_100), 100, &[(0, 300)]).unwrap();
        assert_eq!(plan.decision, MarketDecision::BelowThreshold { movement_bps: 500 });
        assert!(plan.rates.is_empty());

        adapter.commit(&plan);
        assert_eq!(adapter.recorded().unwrap().price, 2_000);
    }

    #[test]
    fn test_large_move_scales_rates() {
        let mut adapter = baselined(2_000);
        let plan = adapter.plan(round(2_200), 100, &[(0, 300), (1, 700)]).unwrap();
        assert_eq!(plan.decision, MarketDecision::Adjust { movement_bps: 1_000 });
        assert_eq!(plan.rates, vec![(0, 330), (1, 770)]);

        adapter.commit(&plan);
        assert_eq!(adapter.recorded().unwrap().price, 2_200);
    }

    #[test]
    fn test_extreme_move_saturates_movement() {
        let adapter = baselined(1);
        assert_eq!(adapter.movement_bps(i64::MAX), Some(i64::MAX));
        assert_eq!(adapter.movement_bps(2), Some(10_000));
        assert!(matches!(
            adapter.decide(&round(i64::MAX)),
            MarketDecision::Adjust { movement_bps: i64::MAX }
        ));
    }

    #[test]
    fn test_drop_is_clamped_to_floor() {
        let adapter = baselined(2_000);
        let plan = adapter.plan(round(200), 100, &[(0, 300)]).unwrap();
        assert_eq!(plan.rates, vec![(0, DEFAULT_MIN_RATE_BPS)]);
    }

    #[test]
    fn test_rise_is_clamped_to_ceiling() {
        let adapter = baselined(100);
        let plan = adapter.plan(round(1_000), 100, &[(0, 700)]).unwrap();
        assert_eq!(plan.rates, vec![(0, DEFAULT_MAX_RATE_BPS)]);
    }

    #[test]
    fn test_invalid_and_stale_prices() {
        let adapter = MarketRateAdapter::default();
        assert_eq!(adapter.plan(round(0), 100, &[]), Err(WaternityError::InvalidPrice(0)));
        assert_eq!(adapter.plan(round(-5), 100, &[]), Err(WaternityError::InvalidPrice(-5)));
        assert_eq!(
            adapter.plan(round(10), 100 + 3601, &[]),
            Err(WaternityError::StalePrice {
                age_secs: 3601,
                max_age_secs: 3600
            })
        );
    }

    #[test]
    fn test_static_feed() {
        let feed = StaticPriceFeed::empty();
        assert!(matches!(feed.latest_round(), Err(WaternityError::FeedUnavailable(_))));
        feed.set_price(175, 9);
        assert_eq!(feed.latest_round().unwrap(), PriceRound { price: 175, updated_at: 9 });
    }

    #[test]
    fn test_inverted_band_rejected() {
        let params = MarketParams {
            min_rate_bps: 900,
            max_rate_bps: 100,
            ..MarketParams::default()
        };
        assert!(params.validate().is_err());
    }
}
