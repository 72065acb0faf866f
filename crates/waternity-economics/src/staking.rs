//! # Staking Ledger
//!
//! Per-(staker, well) positions accruing linear yield at the well's rate.
//!
//! Mutations follow a prepare/commit split: `prepare_*` computes the updated
//! position on a copy and performs every fallible check, `commit` writes it
//! back and cannot fail. The caller runs external effects (token transfers)
//! in between, so a refused transfer leaves the ledger untouched.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use waternity_core::error::{Result, WaternityError};
use waternity_core::types::*;

/// Reward for `principal` at `rate_bps` over `elapsed_secs`, rounded down
///
/// The principal is split into whole multiples of the denominator and a
/// remainder, so the result only overflows when the reward itself does.
pub fn accrue(principal: Amount, rate_bps: Bps, elapsed_secs: u64) -> Result<Amount> {
    const DENOMINATOR: u128 = BPS_DENOMINATOR * SECONDS_PER_YEAR;
    let factor = (rate_bps as u128)
        .checked_mul(elapsed_secs as u128)
        .ok_or(WaternityError::ArithmeticOverflow("reward accrual"))?;

    let whole = (principal / DENOMINATOR).checked_mul(factor);
    let partial = (principal % DENOMINATOR)
        .checked_mul(factor)
        .map(|v| v / DENOMINATOR);
    whole
        .zip(partial)
        .and_then(|(w, p)| w.checked_add(p))
        .ok_or(WaternityError::ArithmeticOverflow("reward accrual"))
}

/// A staker's position in one well
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakePosition {
    /// Staker address
    pub staker: Address,

    /// Well staked into
    pub well_id: WellId,

    /// Principal currently staked
    pub amount: Amount,

    /// Rate in effect since `last_update`
    pub rate_bps: Bps,

    /// First stake timestamp
    pub staked_at: Timestamp,

    /// Accrual checkpoint
    pub last_update: Timestamp,

    /// Settled but unclaimed reward
    pub unclaimed_rewards: Amount,

    /// Lifetime rewards paid out
    pub total_rewards_claimed: Amount,
}

impl StakePosition {
    /// Create an empty position accruing at `rate_bps`
    pub fn new(staker: Address, well_id: WellId, rate_bps: Bps, now: Timestamp) -> Self {
        Self {
            staker,
            well_id,
            amount: 0,
            rate_bps,
            staked_at: now,
            last_update: now,
            unclaimed_rewards: 0,
            total_rewards_claimed: 0,
        }
    }

    fn elapsed(&self, now: Timestamp) -> u64 {
        now.saturating_sub(self.last_update).max(0) as u64
    }

    /// Reward accrued since the last checkpoint
    pub fn accrued(&self, now: Timestamp) -> Result<Amount> {
        accrue(self.amount, self.rate_bps, self.elapsed(now))
    }

    /// Settled reward plus accrual since the last checkpoint
    pub fn pending_rewards(&self, now: Timestamp) -> Result<Amount> {
        self.unclaimed_rewards
            .checked_add(self.accrued(now)?)
            .ok_or(WaternityError::ArithmeticOverflow("pending rewards"))
    }

    /// Move accrued reward into the unclaimed balance and checkpoint at `now`
    pub fn settle(&mut self, now: Timestamp) -> Result<Amount> {
        let accrued = self.accrued(now)?;
        self.unclaimed_rewards = self
            .unclaimed_rewards
            .checked_add(accrued)
            .ok_or(WaternityError::ArithmeticOverflow("reward settlement"))?;
        self.last_update = self.last_update.max(now);
        Ok(accrued)
    }

    /// Nothing staked and nothing owed
    pub fn is_empty(&self) -> bool {
        self.amount == 0 && self.unclaimed_rewards == 0
    }
}

/// A rate rewrite applied to one well
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateChange {
    pub well_id: WellId,
    pub old_rate_bps: Bps,
    pub new_rate_bps: Bps,
}

/// Positions and per-well yield rates
#[derive(Clone, Debug)]
pub struct StakingLedger {
    /// All open positions
    positions: HashMap<(Address, WellId), StakePosition>,

    /// Current rate per registered well
    yield_rates: HashMap<WellId, Bps>,

    /// Rate given to newly registered wells
    default_rate_bps: Bps,
}

impl StakingLedger {
    /// Create new ledger
    pub fn new(default_rate_bps: Bps) -> Self {
        Self {
            positions: HashMap::new(),
            yield_rates: HashMap::new(),
            default_rate_bps,
        }
    }

    pub fn default_rate_bps(&self) -> Bps {
        self.default_rate_bps
    }

    /// Start tracking a rate for a newly registered well
    pub fn init_well(&mut self, well_id: WellId) {
        self.yield_rates.entry(well_id).or_insert(self.default_rate_bps);
    }

    /// Stop tracking a burned well's rate; zero-amount positions stay claimable
    pub fn drop_well(&mut self, well_id: WellId) {
        self.yield_rates.remove(&well_id);
    }

    /// Current rate of a well
    pub fn yield_rate(&self, well_id: WellId) -> Option<Bps> {
        self.yield_rates.get(&well_id).copied()
    }

    /// Get a position
    pub fn position(&self, staker: &Address, well_id: WellId) -> Option<&StakePosition> {
        self.positions.get(&(*staker, well_id))
    }

    /// All positions in a well
    pub fn positions_for_well(&self, well_id: WellId) -> impl Iterator<Item = &StakePosition> {
        self.positions.values().filter(move |p| p.well_id == well_id)
    }

    /// All positions of a staker
    pub fn positions_for_staker<'a>(
        &'a self,
        staker: &'a Address,
    ) -> impl Iterator<Item = &'a StakePosition> {
        self.positions.values().filter(move |p| p.staker == *staker)
    }

    /// Number of open positions
    pub fn position_count(&self) -> usize {
        self.positions.len()
    }

    /// Position after staking `amount` more, settled at the prior rate
    pub fn prepare_stake(
        &self,
        staker: Address,
        well_id: WellId,
        amount: Amount,
        now: Timestamp,
    ) -> Result<StakePosition> {
        if amount == 0 {
            return Err(WaternityError::InvalidAmount);
        }
        let rate = self
            .yield_rate(well_id)
            .ok_or(WaternityError::NotFound(well_id))?;

        let mut position = match self.positions.get(&(staker, well_id)) {
            Some(existing) => {
                let mut position = existing.clone();
                position.settle(now)?;
                position
            }
            None => StakePosition::new(staker, well_id, rate, now),
        };

        position.amount = position
            .amount
            .checked_add(amount)
            .ok_or(WaternityError::ArithmeticOverflow("stake amount"))?;
        Ok(position)
    }

    /// Position after withdrawing `amount`, settled first
    pub fn prepare_unstake(
        &self,
        staker: Address,
        well_id: WellId,
        amount: Amount,
        now: Timestamp,
    ) -> Result<StakePosition> {
        if amount == 0 {
            return Err(WaternityError::InvalidAmount);
        }
        let available = self
            .position(&staker, well_id)
            .map(|p| p.amount)
            .unwrap_or(0);
        if amount > available {
            return Err(WaternityError::InsufficientStake {
                requested: amount,
                available,
            });
        }

        let mut position = self
            .position(&staker, well_id)
            .cloned()
            .ok_or(WaternityError::NotFound(well_id))?;
        position.settle(now)?;
        position.amount -= amount;
        Ok(position)
    }

    /// Position after a claim, and the amount to pay out
    pub fn prepare_claim(
        &self,
        staker: Address,
        well_id: WellId,
        now: Timestamp,
    ) -> Result<(StakePosition, Amount)> {
        let mut position = self
            .position(&staker, well_id)
            .cloned()
            .ok_or(WaternityError::NotFound(well_id))?;
        position.settle(now)?;

        let payout = position.unclaimed_rewards;
        position.unclaimed_rewards = 0;
        position.total_rewards_claimed = position.total_rewards_claimed.saturating_add(payout);
        Ok((position, payout))
    }

    /// Write back a prepared position; empty positions are dropped
    pub fn commit(&mut self, position: StakePosition) {
        let key = (position.staker, position.well_id);
        if position.is_empty() {
            self.positions.remove(&key);
        } else {
            self.positions.insert(key, position);
        }
    }

    /// Rewrite rates, checkpointing every affected position at its old rate
    ///
    /// All-or-nothing: every settlement is computed before anything is written.
    pub fn apply_rates(&mut self, rates: &[(WellId, Bps)], now: Timestamp) -> Result<Vec<RateChange>> {
        let mut changes = Vec::new();
        let mut settled = Vec::new();

        for &(well_id, new_rate_bps) in rates {
            let old_rate_bps = self
                .yield_rate(well_id)
                .ok_or(WaternityError::NotFound(well_id))?;
            if old_rate_bps == new_rate_bps {
                continue;
            }

            for position in self.positions_for_well(well_id) {
                let mut position = position.clone();
                position.settle(now)?;
                position.rate_bps = new_rate_bps;
                settled.push(position);
            }

            changes.push(RateChange {
                well_id,
                old_rate_bps,
                new_rate_bps,
            });
        }

        for change in &changes {
            self.yield_rates.insert(change.well_id, change.new_rate_bps);
        }
        for position in settled {
            self.positions.insert((position.staker, position.well_id), position);
        }

        Ok(changes)
    }
}

impl Default for StakingLedger {
    fn default() -> Self {
        Self::new(crate::constants::DEFAULT_YIELD_RATE_BPS)
    }
}
