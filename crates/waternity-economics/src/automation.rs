//! # Automation Trigger
//!
//! Time-gated upkeep that re-prices every automated well from its aggregate
//! stake.
//!
//! ```text
//!            now - last_upkeep >= interval
//!   ┌──────┐ ───────────────────────────► ┌───────────┐
//!   │ Idle │                               │ UpkeepDue │
//!   └──────┘ ◄─────────────────────────── └───────────┘
//!              perform_upkeep: rates rewritten,
//!              last_upkeep = now, counter += 1
//! ```
//!
//! [`AutomationState`] is a plain value: planning an upkeep takes the current
//! state and returns the next one, so nothing here reads a clock or holds
//! hidden globals.

use crate::yield_curve::YieldCurve;
use serde::{Deserialize, Serialize};
use waternity_core::error::{Result, WaternityError};
use waternity_core::types::{Amount, Bps, Timestamp, WellId};

/// Phase of the trigger at a given time
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpkeepPhase {
    /// Interval has not elapsed
    Idle { remaining_secs: u64 },
    /// Interval elapsed; upkeep may run
    UpkeepDue { overdue_secs: u64 },
}

impl UpkeepPhase {
    pub fn is_due(&self) -> bool {
        matches!(self, Self::UpkeepDue { .. })
    }
}

/// Upkeep clock and counter
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutomationState {
    /// Timestamp of the last upkeep (creation time before the first)
    pub last_upkeep: Timestamp,

    /// Minimum seconds between upkeeps
    pub interval_secs: u64,

    /// Upkeeps performed so far
    pub upkeep_counter: u64,
}

impl AutomationState {
    pub fn new(now: Timestamp, interval_secs: u64) -> Result<Self> {
        if interval_secs == 0 {
            return Err(WaternityError::InvalidConfig(
                "automation interval must be positive".into(),
            ));
        }
        Ok(Self {
            last_upkeep: now,
            interval_secs,
            upkeep_counter: 0,
        })
    }

    /// Phase at `now`
    pub fn phase(&self, now: Timestamp) -> UpkeepPhase {
        let elapsed = now.saturating_sub(self.last_upkeep).max(0) as u64;
        if elapsed >= self.interval_secs {
            UpkeepPhase::UpkeepDue {
                overdue_secs: elapsed - self.interval_secs,
            }
        } else {
            UpkeepPhase::Idle {
                remaining_secs: self.interval_secs - elapsed,
            }
        }
    }

    /// Fail with `NotDue` while the interval has not elapsed
    pub fn require_due(&self, now: Timestamp) -> Result<()> {
        match self.phase(now) {
            UpkeepPhase::UpkeepDue { .. } => Ok(()),
            UpkeepPhase::Idle { remaining_secs } => Err(WaternityError::NotDue { remaining_secs }),
        }
    }

    /// State after an upkeep at `now`
    pub fn after_upkeep(&self, now: Timestamp) -> Self {
        Self {
            last_upkeep: now,
            interval_secs: self.interval_secs,
            upkeep_counter: self.upkeep_counter + 1,
        }
    }

    /// Same clock, new interval
    pub fn with_interval(&self, interval_secs: u64) -> Result<Self> {
        if interval_secs == 0 {
            return Err(WaternityError::InvalidConfig(
                "automation interval must be positive".into(),
            ));
        }
        Ok(Self {
            interval_secs,
            ..*self
        })
    }
}

/// Result of planning an upkeep
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpkeepPlan {
    /// State to persist once the rates are applied
    pub next_state: AutomationState,

    /// Curve rate for every automated well
    pub rates: Vec<(WellId, Bps)>,
}

/// Automated well set plus the curve that prices it
#[derive(Clone, Debug)]
pub struct AutomationTrigger {
    /// Wells re-priced on upkeep, in insertion order
    active_wells: Vec<WellId>,

    /// Diminishing-returns curve
    curve: YieldCurve,
}

impl AutomationTrigger {
    pub fn new(curve: YieldCurve) -> Self {
        Self {
            active_wells: Vec::new(),
            curve,
        }
    }

    pub fn curve(&self) -> &YieldCurve {
        &self.curve
    }

    /// Add a well; returns false for duplicates
    pub fn add_well(&mut self, well_id: WellId) -> bool {
        if self.active_wells.contains(&well_id) {
            return false;
        }
        self.active_wells.push(well_id);
        true
    }

    /// Remove a well (burned wells leave the set)
    pub fn remove_well(&mut self, well_id: WellId) -> bool {
        let before = self.active_wells.len();
        self.active_wells.retain(|id| *id != well_id);
        self.active_wells.len() != before
    }

    pub fn active_wells(&self) -> &[WellId] {
        &self.active_wells
    }

    /// Plan an upkeep at `now`
    ///
    /// Re-checks the interval itself; `total_staked` supplies each well's
    /// aggregate stake.
    pub fn plan_upkeep<F>(&self, state: &AutomationState, now: Timestamp, total_staked: F) -> Result<UpkeepPlan>
    where
        F: Fn(WellId) -> Result<Amount>,
    {
        state.require_due(now)?;

        let rates = self
            .active_wells
            .iter()
            .map(|&well_id| Ok((well_id, self.curve.rate_for(total_staked(well_id)?))))
            .collect::<Result<Vec<_>>>()?;

        Ok(UpkeepPlan {
            next_state: state.after_upkeep(now),
            rates,
        })
    }
}
