//! # Diminishing-Returns Yield Curve
//!
//! Models a fixed reward pool spread over more capital: the more stake a well
//! attracts, the lower the per-unit rate.
//!
//! ```text
//! rate(S) = floor + (ceiling - floor) * H / (H + S)
//!
//!   ceiling ┤●
//!           │ ╲
//!           │  ╲__
//!   mid     ┤     ●───___            (S = H)
//!           │           ‾‾‾‾‾───___
//!   floor   ┤┈┈┈┈┈┈┈┈┈┈┈┈┈┈┈┈┈┈┈┈┈┈┈┈┈┈
//!           └──────────────────────────── S (total staked)
//! ```

use crate::constants::*;
use serde::{Deserialize, Serialize};
use waternity_core::error::{Result, WaternityError};
use waternity_core::types::{Amount, Bps};

/// Hyperbolic decay from `ceiling_bps` towards `floor_bps`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct YieldCurve {
    /// Rate at zero stake
    pub ceiling_bps: Bps,
    /// Asymptotic rate for unbounded stake
    pub floor_bps: Bps,
    /// Stake at which the rate is halfway between ceiling and floor
    pub half_stake: Amount,
}

impl Default for YieldCurve {
    fn default() -> Self {
        Self {
            ceiling_bps: DEFAULT_CURVE_CEILING_BPS,
            floor_bps: DEFAULT_CURVE_FLOOR_BPS,
            half_stake: DEFAULT_CURVE_HALF_STAKE,
        }
    }
}

impl YieldCurve {
    pub fn new(ceiling_bps: Bps, floor_bps: Bps, half_stake: Amount) -> Result<Self> {
        let curve = Self {
            ceiling_bps,
            floor_bps,
            half_stake,
        };
        curve.validate()?;
        Ok(curve)
    }

    pub fn validate(&self) -> Result<()> {
        if self.floor_bps > self.ceiling_bps {
            return Err(WaternityError::InvalidConfig(format!(
                "curve floor {} bps above ceiling {} bps",
                self.floor_bps, self.ceiling_bps
            )));
        }
        if self.half_stake == 0 {
            return Err(WaternityError::InvalidConfig(
                "curve half_stake must be positive".into(),
            ));
        }
        Ok(())
    }

    /// Rate for a well holding `total_staked`; non-increasing in `total_staked`
    pub fn rate_for(&self, total_staked: Amount) -> Bps {
        let spread = self.ceiling_bps.saturating_sub(self.floor_bps) as u128;
        // saturating: a stake near u128::MAX just rounds the bonus to zero
        let denominator = self.half_stake.saturating_add(total_staked);
        let bonus = spread.saturating_mul(self.half_stake) / denominator;
        self.floor_bps + bonus as Bps
    }
}
