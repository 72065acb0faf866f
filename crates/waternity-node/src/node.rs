//! Waternity ledger node
//!
//! Owns the whole ledger behind one lock. Each command runs under the write
//! lock as prepare, vault transfer, commit: state is only written once every
//! fallible step has succeeded, so a failed command leaves no trace.

use crate::config::WaternityConfig;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};
use waternity_core::prelude::*;
use waternity_economics::{
    AutomationState, AutomationTrigger, MarketDecision, MarketRateAdapter, MintWell, PriceFeed,
    PriceRound, RateChange, ReserveVault, StakePosition, StakingLedger, TokenVault, UpkeepPhase,
    VaultSummary, WellData, WellInfo, WellRegistry,
};

/// Result of [`WaternityNode::perform_upkeep`]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum UpkeepOutcome {
    /// Interval has not elapsed; nothing changed
    NotDue { remaining_secs: u64 },
    /// Rates re-priced and the counter advanced
    Performed {
        upkeep_counter: u64,
        wells_updated: usize,
        rate_changes: Vec<RateChange>,
    },
}

impl UpkeepOutcome {
    pub fn is_performed(&self) -> bool {
        matches!(self, Self::Performed { .. })
    }
}

/// Result of [`WaternityNode::update_yields_with_market_data`]
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketOutcome {
    pub decision: MarketDecision,
    pub price: i64,
    pub previous_price: Option<i64>,
    pub rate_changes: Vec<RateChange>,
}

impl MarketOutcome {
    pub fn is_adjustment(&self) -> bool {
        matches!(self.decision, MarketDecision::Adjust { .. })
    }
}

/// A staker's view of one position
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeInfo {
    pub staker: Address,
    pub well_id: WellId,
    pub amount: Amount,
    pub rate_bps: Bps,
    pub staked_at: Timestamp,
    pub last_update: Timestamp,
    pub unclaimed_rewards: Amount,
    pub total_rewards_claimed: Amount,
    /// Settled plus accrued since `last_update`
    pub pending_rewards: Amount,
}

impl StakeInfo {
    fn from_position(position: &StakePosition, now: Timestamp) -> Result<Self> {
        Ok(Self {
            staker: position.staker,
            well_id: position.well_id,
            amount: position.amount,
            rate_bps: position.rate_bps,
            staked_at: position.staked_at,
            last_update: position.last_update,
            unclaimed_rewards: position.unclaimed_rewards,
            total_rewards_claimed: position.total_rewards_claimed,
            pending_rewards: position.pending_rewards(now)?,
        })
    }

    fn empty(staker: Address, well_id: WellId, rate_bps: Bps) -> Self {
        Self {
            staker,
            well_id,
            amount: 0,
            rate_bps,
            staked_at: 0,
            last_update: 0,
            unclaimed_rewards: 0,
            total_rewards_claimed: 0,
            pending_rewards: 0,
        }
    }
}

/// Answer to `get_automation_status`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutomationStatus {
    pub last_upkeep: Timestamp,
    pub interval_secs: u64,
    pub upkeep_counter: u64,
    pub next_upkeep_at: Timestamp,
    pub phase: UpkeepPhase,
    pub active_wells: Vec<WellId>,
}

/// Answer to `check_upkeep`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpkeepCheck {
    pub upkeep_needed: bool,
    /// Seconds until the interval elapses; zero once due
    pub remaining_secs: u64,
    /// Wells an upkeep would re-price
    pub active_wells: Vec<WellId>,
}

/// Answer to `get_market_data`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketData {
    /// Latest feed answer
    pub latest: PriceRound,
    /// Reference price the next adjustment is measured against
    pub recorded: Option<PriceRound>,
    pub movement_bps: Option<i64>,
    /// Would `update_yields_with_market_data` change rates now
    pub adjustment_due: bool,
}

/// Answer to `get_well_details`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WellDetails {
    pub well: WellData,
    pub info: Option<WellInfo>,
    pub yield_rate_bps: Option<Bps>,
    pub is_automated: bool,
    /// Rewards owed across every position in the well
    pub total_pending_rewards: Amount,
    /// Rewards owed to the requested staker
    pub staker_pending_rewards: Option<Amount>,
}

/// Everything guarded by the node lock
struct LedgerState {
    registry: WellRegistry,
    ledger: StakingLedger,
    automation_state: AutomationState,
    trigger: AutomationTrigger,
    market: MarketRateAdapter,
    vault: Box<dyn TokenVault>,
    journal: Vec<LedgerEvent>,
}

impl LedgerState {
    fn require_registered(&self, well_id: WellId) -> Result<()> {
        if self.registry.is_registered(well_id) {
            Ok(())
        } else {
            Err(WaternityError::NotFound(well_id))
        }
    }

    fn stake(&mut self, staker: Address, well_id: WellId, amount: Amount, now: Timestamp) -> Result<StakeInfo> {
        if amount == 0 {
            return Err(WaternityError::InvalidAmount);
        }
        self.require_registered(well_id)?;

        let new_staker = self
            .ledger
            .position(&staker, well_id)
            .map_or(true, |p| p.amount == 0);
        let position = self.ledger.prepare_stake(staker, well_id, amount, now)?;
        let entry = self.registry.entry_after_stake(well_id, amount, new_staker)?;
        let info = StakeInfo::from_position(&position, now)?;

        self.vault.deposit_stake(&staker, amount)?;

        self.ledger.commit(position);
        self.registry.commit_entry(well_id, entry);
        self.journal.push(LedgerEvent::Staked {
            staker,
            well_id,
            amount,
        });

        info!(staker = %staker, well_id, amount, total_staked = entry.total_staked, "Staked");
        Ok(info)
    }

    fn retire_well(&mut self, well_id: WellId) {
        self.ledger.drop_well(well_id);
        self.trigger.remove_well(well_id);
    }
}

/// The Waternity ledger service
pub struct WaternityNode {
    config: WaternityConfig,
    clock: Arc<dyn Clock>,
    price_feed: Arc<dyn PriceFeed>,
    state: RwLock<LedgerState>,
}

impl WaternityNode {
    /// Create a node over an external vault
    pub fn new(
        config: WaternityConfig,
        clock: Arc<dyn Clock>,
        price_feed: Arc<dyn PriceFeed>,
        vault: Box<dyn TokenVault>,
    ) -> Result<Self> {
        config.validate()?;
        let now = clock.now();

        let state = LedgerState {
            registry: WellRegistry::new(config.ledger.admin),
            ledger: StakingLedger::new(config.ledger.default_yield_rate_bps),
            automation_state: AutomationState::new(now, config.automation.interval_secs)?,
            trigger: AutomationTrigger::new(config.automation.curve()?),
            market: MarketRateAdapter::new(config.market.params()),
            vault,
            journal: Vec::new(),
        };

        info!(
            admin = %config.ledger.admin,
            interval_secs = config.automation.interval_secs,
            default_rate_bps = config.ledger.default_yield_rate_bps,
            "Waternity ledger initialized"
        );

        Ok(Self {
            config,
            clock,
            price_feed,
            state: RwLock::new(state),
        })
    }

    /// Create a node with an in-memory vault funded from `treasury.initial_reward_reserve_tokens`
    pub fn with_reserve_vault(
        config: WaternityConfig,
        clock: Arc<dyn Clock>,
        price_feed: Arc<dyn PriceFeed>,
    ) -> Result<Self> {
        let vault = ReserveVault::new(config.treasury.initial_reward_reserve());
        Self::new(config, clock, price_feed, Box::new(vault))
    }

    pub fn config(&self) -> &WaternityConfig {
        &self.config
    }

    pub fn admin(&self) -> Address {
        self.config.ledger.admin
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    // ---- Well collection ----

    /// Allow `partner` to mint wells; admin only
    pub fn authorize_partner(&self, caller: &Address, partner: Address) -> Result<bool> {
        let mut guard = self.state.write();
        let state = &mut *guard;
        let added = state.registry.authorize_partner(caller, partner)?;
        if added {
            state.journal.push(LedgerEvent::PartnerAuthorized { partner });
            info!(partner = %partner, "Field partner authorized");
        }
        Ok(added)
    }

    /// Withdraw a partner's mint right; admin only
    pub fn revoke_partner(&self, caller: &Address, partner: &Address) -> Result<bool> {
        let mut guard = self.state.write();
        let state = &mut *guard;
        let removed = state.registry.revoke_partner(caller, partner)?;
        if removed {
            state.journal.push(LedgerEvent::PartnerRevoked { partner: *partner });
            info!(partner = %partner, "Field partner revoked");
        }
        Ok(removed)
    }

    /// Mint a well; admin or authorized partner
    pub fn mint_well(&self, caller: &Address, mint: MintWell) -> Result<WellId> {
        let now = self.clock.now();
        let location = mint.location.clone();
        let capacity = mint.capacity;

        let mut guard = self.state.write();
        let state = &mut *guard;
        let well_id = state.registry.mint_well(caller, mint, now)?;
        state.journal.push(LedgerEvent::WellMinted {
            well_id,
            location: location.clone(),
            capacity,
            field_partner: *caller,
        });

        info!(well_id, location = %location, capacity, partner = %caller, "Well minted");
        Ok(well_id)
    }

    /// Set a well's operating status; field partner or admin
    pub fn update_well_status(&self, caller: &Address, well_id: WellId, is_active: bool) -> Result<()> {
        let mut guard = self.state.write();
        let state = &mut *guard;
        state.registry.update_well_status(caller, well_id, is_active)?;
        state
            .journal
            .push(LedgerEvent::WellStatusUpdated { well_id, is_active });
        info!(well_id, is_active, "Well status updated");
        Ok(())
    }

    /// Write externally verified well data; admin only
    pub fn update_well_data(
        &self,
        caller: &Address,
        well_id: WellId,
        is_active: bool,
        capacity: u64,
        people_served: u64,
    ) -> Result<()> {
        let mut guard = self.state.write();
        let state = &mut *guard;
        state
            .registry
            .update_well_data(caller, well_id, is_active, capacity, people_served)?;
        state.journal.push(LedgerEvent::WellDataUpdated {
            well_id,
            is_active,
            capacity,
            people_served,
        });
        info!(well_id, is_active, capacity, people_served, "Verified well data applied");
        Ok(())
    }

    /// Burn a well; holder only, nothing may be staked
    pub fn burn_well(&self, caller: &Address, well_id: WellId, reason: &str) -> Result<WellData> {
        let mut guard = self.state.write();
        let state = &mut *guard;
        let well = state.registry.burn_well(caller, well_id)?;
        state.retire_well(well_id);
        state.journal.push(LedgerEvent::WellBurned {
            well_id,
            burned_by: *caller,
            reason: reason.to_string(),
        });
        info!(well_id, burned_by = %caller, reason, "Well burned");
        Ok(well)
    }

    /// Burn a well on admin authority; nothing may be staked
    pub fn emergency_burn(&self, caller: &Address, well_id: WellId, reason: &str) -> Result<WellData> {
        let mut guard = self.state.write();
        let state = &mut *guard;
        let well = state.registry.emergency_burn(caller, well_id)?;
        state.retire_well(well_id);
        state.journal.push(LedgerEvent::WellBurned {
            well_id,
            burned_by: *caller,
            reason: reason.to_string(),
        });
        warn!(well_id, burned_by = %caller, reason, "Well emergency burned");
        Ok(well)
    }

    // ---- Staking ----

    /// Open a well for staking at the default rate; field partner or admin
    pub fn register_well(&self, caller: &Address, well_id: WellId) -> Result<()> {
        let now = self.clock.now();
        let mut guard = self.state.write();
        let state = &mut *guard;
        state.registry.register_well(caller, well_id, now)?;
        state.ledger.init_well(well_id);
        state.journal.push(LedgerEvent::WellRegistered { well_id });
        info!(well_id, rate_bps = state.ledger.default_rate_bps(), "Well registered for staking");
        Ok(())
    }

    /// Stake `amount` into a registered well
    pub fn stake(&self, staker: Address, well_id: WellId, amount: Amount) -> Result<StakeInfo> {
        let now = self.clock.now();
        self.state.write().stake(staker, well_id, amount, now)
    }

    /// Register the well if needed, then stake into it
    ///
    /// Registration happens on the ledger's own authority. If the stake
    /// fails, a registration made by this call is undone.
    pub fn stake_and_register(&self, staker: Address, well_id: WellId, amount: Amount) -> Result<StakeInfo> {
        if amount == 0 {
            return Err(WaternityError::InvalidAmount);
        }
        let now = self.clock.now();
        let mut guard = self.state.write();
        let state = &mut *guard;

        let registered_here = if state.registry.is_registered(well_id) {
            false
        } else {
            let admin = state.registry.admin();
            state.registry.register_well(&admin, well_id, now)?;
            state.ledger.init_well(well_id);
            true
        };

        match state.stake(staker, well_id, amount, now) {
            Ok(info) => {
                if registered_here {
                    // registration event precedes the stake event
                    let staked = state.journal.pop();
                    state.journal.push(LedgerEvent::WellRegistered { well_id });
                    state.journal.extend(staked);
                    info!(well_id, "Well registered for staking");
                }
                Ok(info)
            }
            Err(e) => {
                if registered_here {
                    state.registry.deregister_well(well_id)?;
                    state.ledger.drop_well(well_id);
                }
                Err(e)
            }
        }
    }

    /// Withdraw `amount` of principal; accrued rewards stay claimable
    pub fn unstake(&self, staker: Address, well_id: WellId, amount: Amount) -> Result<StakeInfo> {
        let now = self.clock.now();
        let mut guard = self.state.write();
        let state = &mut *guard;

        if state.ledger.position(&staker, well_id).is_none() {
            state.require_registered(well_id)?;
        }
        let position = state.ledger.prepare_unstake(staker, well_id, amount, now)?;
        let entry = state
            .registry
            .entry_after_unstake(well_id, amount, position.amount == 0)?;
        let info = StakeInfo::from_position(&position, now)?;

        state.vault.withdraw_stake(&staker, amount)?;

        state.ledger.commit(position);
        state.registry.commit_entry(well_id, entry);
        state.journal.push(LedgerEvent::Unstaked {
            staker,
            well_id,
            amount,
        });

        info!(staker = %staker, well_id, amount, remaining = info.amount, "Unstaked");
        Ok(info)
    }

    /// Pay out everything accrued on a position
    ///
    /// Returns the amount paid; zero when nothing is owed. A failed payout
    /// leaves the position untouched.
    pub fn claim_rewards(&self, staker: Address, well_id: WellId) -> Result<Amount> {
        let now = self.clock.now();
        let mut guard = self.state.write();
        let state = &mut *guard;

        if state.ledger.position(&staker, well_id).is_none() {
            state.require_registered(well_id)?;
            return Ok(0);
        }

        let (position, payout) = state.ledger.prepare_claim(staker, well_id, now)?;
        if payout == 0 {
            debug!(staker = %staker, well_id, "Nothing to claim");
            return Ok(0);
        }

        if let Err(e) = state.vault.pay_reward(&staker, payout) {
            warn!(staker = %staker, well_id, payout, error = %e, "Reward payout failed");
            return Err(e);
        }

        state.ledger.commit(position);
        state.journal.push(LedgerEvent::RewardsClaimed {
            staker,
            well_id,
            amount: payout,
        });

        info!(staker = %staker, well_id, payout, "Rewards claimed");
        Ok(payout)
    }

    /// Top up the reward reserve
    pub fn fund_rewards(&self, amount: Amount) -> Result<Amount> {
        if amount == 0 {
            return Err(WaternityError::InvalidAmount);
        }
        let mut state = self.state.write();
        state.vault.fund_rewards(amount)?;
        let reserve = state.vault.reward_reserve();
        info!(amount, reserve, "Reward reserve funded");
        Ok(reserve)
    }

    // ---- Automation ----

    /// Re-price every automated well from the yield curve, once per interval
    pub fn perform_upkeep(&self) -> Result<UpkeepOutcome> {
        let now = self.clock.now();
        let mut guard = self.state.write();
        let state = &mut *guard;

        let registry = &state.registry;
        let plan = match state.trigger.plan_upkeep(&state.automation_state, now, |well_id| {
            Ok(registry.entry(well_id)?.total_staked)
        }) {
            Ok(plan) => plan,
            Err(WaternityError::NotDue { remaining_secs }) => {
                debug!(remaining_secs, "Upkeep not due");
                return Ok(UpkeepOutcome::NotDue { remaining_secs });
            }
            Err(e) => return Err(e),
        };

        let rate_changes = state.ledger.apply_rates(&plan.rates, now)?;
        state.automation_state = plan.next_state;

        for change in &rate_changes {
            state.journal.push(LedgerEvent::YieldRateUpdated {
                well_id: change.well_id,
                old_rate_bps: change.old_rate_bps,
                new_rate_bps: change.new_rate_bps,
            });
        }
        let upkeep_counter = plan.next_state.upkeep_counter;
        let wells_updated = plan.rates.len();
        state.journal.push(LedgerEvent::UpkeepPerformed {
            upkeep_counter,
            timestamp: now,
            wells_updated,
        });

        info!(upkeep_counter, wells_updated, rates_changed = rate_changes.len(), "Upkeep performed");
        Ok(UpkeepOutcome::Performed {
            upkeep_counter,
            wells_updated,
            rate_changes,
        })
    }

    /// Add a registered well to the automated set; admin only
    pub fn add_well_to_automation(&self, caller: &Address, well_id: WellId) -> Result<bool> {
        let mut guard = self.state.write();
        let state = &mut *guard;
        state.registry.require_admin(caller)?;
        state.require_registered(well_id)?;

        let added = state.trigger.add_well(well_id);
        if added {
            state.journal.push(LedgerEvent::AutomationWellAdded { well_id });
            info!(well_id, "Well added to automation");
        }
        Ok(added)
    }

    /// Change the upkeep interval; admin only
    pub fn set_automation_interval(&self, caller: &Address, interval_secs: u64) -> Result<()> {
        let mut guard = self.state.write();
        let state = &mut *guard;
        state.registry.require_admin(caller)?;
        state.automation_state = state.automation_state.with_interval(interval_secs)?;
        state.journal.push(LedgerEvent::IntervalUpdated { interval_secs });
        info!(interval_secs, "Automation interval updated");
        Ok(())
    }

    // ---- Market ----

    /// Scale the given wells' rates by the latest price move
    ///
    /// The first answer only records a baseline. Moves within the threshold
    /// change nothing and are not recorded.
    pub fn update_yields_with_market_data(&self, well_ids: &[WellId]) -> Result<MarketOutcome> {
        let round = self.price_feed.latest_round()?;
        let now = self.clock.now();
        let mut guard = self.state.write();
        let state = &mut *guard;

        let mut current_rates: Vec<(WellId, Bps)> = Vec::with_capacity(well_ids.len());
        for &well_id in well_ids {
            if current_rates.iter().any(|(id, _)| *id == well_id) {
                continue;
            }
            let rate = state
                .ledger
                .yield_rate(well_id)
                .ok_or(WaternityError::NotFound(well_id))?;
            current_rates.push((well_id, rate));
        }

        let plan = state.market.plan(round, now, &current_rates)?;
        let rate_changes = state.ledger.apply_rates(&plan.rates, now)?;
        state.market.commit(&plan);

        match plan.decision {
            MarketDecision::Baseline => {
                info!(price = round.price, "Market baseline recorded");
            }
            MarketDecision::BelowThreshold { movement_bps } => {
                debug!(price = round.price, movement_bps, "Price move within threshold");
            }
            MarketDecision::Adjust { movement_bps } => {
                for change in &rate_changes {
                    state.journal.push(LedgerEvent::YieldRateUpdated {
                        well_id: change.well_id,
                        old_rate_bps: change.old_rate_bps,
                        new_rate_bps: change.new_rate_bps,
                    });
                }
                state.journal.push(LedgerEvent::MarketYieldsAdjusted {
                    previous_price: plan.previous_price.unwrap_or(round.price),
                    new_price: round.price,
                    wells_adjusted: rate_changes.len(),
                    timestamp: now,
                });
                info!(
                    price = round.price,
                    movement_bps,
                    wells_adjusted = rate_changes.len(),
                    "Yields adjusted to market"
                );
            }
        }

        Ok(MarketOutcome {
            decision: plan.decision,
            price: round.price,
            previous_price: plan.previous_price,
            rate_changes,
        })
    }

    // ---- Queries ----

    pub fn get_well_data(&self, well_id: WellId) -> Result<WellData> {
        self.state.read().registry.get_well_data(well_id).cloned()
    }

    pub fn well_exists(&self, well_id: WellId) -> bool {
        self.state.read().registry.well_exists(well_id)
    }

    pub fn total_minted(&self) -> u64 {
        self.state.read().registry.total_minted()
    }

    /// Ids of the live wells `holder` holds
    pub fn wells_held_by(&self, holder: &Address) -> Vec<WellId> {
        self.state
            .read()
            .registry
            .wells_held_by(holder)
            .map(|well| well.well_id)
            .collect()
    }

    pub fn is_partner(&self, address: &Address) -> bool {
        self.state.read().registry.is_partner(address)
    }

    /// Registration, aggregates and impact of a registered well
    pub fn get_well_info(&self, well_id: WellId) -> Result<WellInfo> {
        self.state.read().registry.get_well_info(well_id)
    }

    /// Current rate of a registered well
    pub fn get_yield_rate(&self, well_id: WellId) -> Result<Bps> {
        self.state
            .read()
            .ledger
            .yield_rate(well_id)
            .ok_or(WaternityError::NotFound(well_id))
    }

    /// Position of `staker` in `well_id`; zeroed for a registered well they never staked in
    pub fn get_stake_info(&self, staker: &Address, well_id: WellId) -> Result<StakeInfo> {
        let now = self.clock.now();
        let state = self.state.read();
        match state.ledger.position(staker, well_id) {
            Some(position) => StakeInfo::from_position(position, now),
            None => {
                state.require_registered(well_id)?;
                let rate = state
                    .ledger
                    .yield_rate(well_id)
                    .unwrap_or_else(|| state.ledger.default_rate_bps());
                Ok(StakeInfo::empty(*staker, well_id, rate))
            }
        }
    }

    pub fn get_pending_rewards(&self, staker: &Address, well_id: WellId) -> Result<Amount> {
        self.get_stake_info(staker, well_id).map(|info| info.pending_rewards)
    }

    /// Every open position of `staker`
    pub fn positions_for_staker(&self, staker: &Address) -> Result<Vec<StakeInfo>> {
        let now = self.clock.now();
        let state = self.state.read();
        let mut positions = state
            .ledger
            .positions_for_staker(staker)
            .map(|p| StakeInfo::from_position(p, now))
            .collect::<Result<Vec<_>>>()?;
        positions.sort_by_key(|p| p.well_id);
        Ok(positions)
    }

    pub fn get_automation_status(&self) -> AutomationStatus {
        let now = self.clock.now();
        let state = self.state.read();
        let automation = state.automation_state;
        AutomationStatus {
            last_upkeep: automation.last_upkeep,
            interval_secs: automation.interval_secs,
            upkeep_counter: automation.upkeep_counter,
            next_upkeep_at: automation
                .last_upkeep
                .saturating_add(automation.interval_secs as Timestamp),
            phase: automation.phase(now),
            active_wells: state.trigger.active_wells().to_vec(),
        }
    }

    /// Would `perform_upkeep` do work now
    pub fn check_upkeep(&self) -> UpkeepCheck {
        let now = self.clock.now();
        let state = self.state.read();
        let (upkeep_needed, remaining_secs) = match state.automation_state.phase(now) {
            UpkeepPhase::UpkeepDue { .. } => (true, 0),
            UpkeepPhase::Idle { remaining_secs } => (false, remaining_secs),
        };
        UpkeepCheck {
            upkeep_needed,
            remaining_secs,
            active_wells: state.trigger.active_wells().to_vec(),
        }
    }

    pub fn get_active_wells(&self) -> Vec<WellId> {
        self.state.read().trigger.active_wells().to_vec()
    }

    /// Latest feed answer against the recorded reference price
    pub fn get_market_data(&self) -> Result<MarketData> {
        let latest = self.price_feed.latest_round()?;
        let now = self.clock.now();
        let state = self.state.read();
        let adjustment_due = state.market.check_round(&latest, now).is_ok()
            && matches!(state.market.decide(&latest), MarketDecision::Adjust { .. });
        Ok(MarketData {
            latest,
            recorded: state.market.recorded(),
            movement_bps: state.market.movement_bps(latest.price),
            adjustment_due,
        })
    }

    /// Well record with its staking view, and optionally one staker's reward
    pub fn get_well_details(&self, well_id: WellId, staker: Option<&Address>) -> Result<WellDetails> {
        let now = self.clock.now();
        let state = self.state.read();
        let well = state.registry.get_well_data(well_id)?.clone();
        let info = state.registry.get_well_info(well_id).ok();

        let mut total_pending_rewards: Amount = 0;
        for position in state.ledger.positions_for_well(well_id) {
            total_pending_rewards = total_pending_rewards
                .checked_add(position.pending_rewards(now)?)
                .ok_or(WaternityError::ArithmeticOverflow("well rewards"))?;
        }
        let staker_pending_rewards = match staker {
            Some(staker) => Some(
                state
                    .ledger
                    .position(staker, well_id)
                    .map(|p| p.pending_rewards(now))
                    .transpose()?
                    .unwrap_or(0),
            ),
            None => None,
        };

        Ok(WellDetails {
            well,
            info,
            yield_rate_bps: state.ledger.yield_rate(well_id),
            is_automated: state.trigger.active_wells().contains(&well_id),
            total_pending_rewards,
            staker_pending_rewards,
        })
    }

    pub fn vault_summary(&self) -> VaultSummary {
        self.state.read().vault.summary()
    }

    /// Journal entries since the last drain, oldest first
    pub fn events(&self) -> Vec<LedgerEvent> {
        self.state.read().journal.clone()
    }

    /// Take and clear the journal
    pub fn drain_events(&self) -> Vec<LedgerEvent> {
        std::mem::take(&mut self.state.write().journal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use waternity_economics::StaticPriceFeed;

    const START: Timestamp = 1_700_000_000;

    fn node_with(reserve_tokens: u64) -> (WaternityNode, Arc<ManualClock>) {
        let mut config = WaternityConfig::default();
        config.treasury.initial_reward_reserve_tokens = reserve_tokens;
        let clock = Arc::new(ManualClock::new(START));
        let feed = Arc::new(StaticPriceFeed::new(2_000, START));
        let node = WaternityNode::with_reserve_vault(config, clock.clone(), feed).unwrap();
        (node, clock)
    }

    fn mint(node: &WaternityNode, location: &str) -> WellId {
        let admin = node.admin();
        node.mint_well(
            &admin,
            MintWell {
                to: admin,
                location: location.to_string(),
                capacity: 1_000,
                people_served: 250,
                metadata_uri: String::new(),
            },
        )
        .unwrap()
    }

    #[test]
    fn test_stake_requires_registration() {
        let (node, _) = node_with(10);
        let well = mint(&node, "Lombok");
        let alice = Address::from_label("alice");

        assert_eq!(node.stake(alice, well, tokens(1)), Err(WaternityError::NotFound(well)));
        assert_eq!(node.stake(alice, well, 0), Err(WaternityError::InvalidAmount));

        node.register_well(&node.admin(), well).unwrap();
        let info = node.stake(alice, well, tokens(1)).unwrap();
        assert_eq!(info.amount, tokens(1));
        assert_eq!(info.rate_bps, 300);
    }

    #[test]
    fn test_claim_failure_leaves_position_untouched() {
        let (node, clock) = node_with(0);
        let well = mint(&node, "Lombok");
        let alice = Address::from_label("alice");
        node.register_well(&node.admin(), well).unwrap();
        node.stake(alice, well, tokens(1_000)).unwrap();
        clock.advance(SECONDS_PER_YEAR as u64);

        let before = node.get_stake_info(&alice, well).unwrap();
        assert!(matches!(
            node.claim_rewards(alice, well),
            Err(WaternityError::InsufficientFunds { .. })
        ));
        assert_eq!(node.get_stake_info(&alice, well).unwrap(), before);

        node.fund_rewards(tokens(100)).unwrap();
        assert_eq!(node.claim_rewards(alice, well).unwrap(), tokens(30));
    }

    #[test]
    fn test_claim_with_nothing_owed() {
        let (node, _) = node_with(10);
        let well = mint(&node, "Lombok");
        let bob = Address::from_label("bob");
        assert_eq!(node.claim_rewards(bob, well), Err(WaternityError::NotFound(well)));

        node.register_well(&node.admin(), well).unwrap();
        assert_eq!(node.claim_rewards(bob, well).unwrap(), 0);
        assert!(!node
            .events()
            .iter()
            .any(|e| matches!(e, LedgerEvent::RewardsClaimed { .. })));
    }

    #[test]
    fn test_stake_and_register_rolls_back_on_failure() {
        let (node, _) = node_with(10);
        let alice = Address::from_label("alice");
        assert_eq!(
            node.stake_and_register(alice, 9, tokens(1)),
            Err(WaternityError::NotFound(9))
        );

        let well = mint(&node, "Sumba");
        node.stake_and_register(alice, well, tokens(5)).unwrap();
        assert!(node.get_well_info(well).unwrap().is_registered);

        let names: Vec<_> = node.drain_events().iter().map(|e| e.name()).collect();
        assert_eq!(names[names.len() - 2..], ["WellRegistered", "Staked"]);

        // already registered: plain stake
        node.stake_and_register(alice, well, tokens(5)).unwrap();
        assert_eq!(node.get_well_info(well).unwrap().total_staked, tokens(10));
    }

    #[test]
    fn test_stake_and_register_undoes_registration_when_stake_fails() {
        let (node, _) = node_with(10);
        let admin = node.admin();
        let full = mint(&node, "Lombok");
        node.register_well(&admin, full).unwrap();
        for label in ["whale-a", "whale-b"] {
            node.stake(Address::from_label(label), full, u128::MAX / 2).unwrap();
        }
        let fresh = mint(&node, "Flores");
        node.drain_events();

        let bob = Address::from_label("bob");
        assert_eq!(
            node.stake_and_register(bob, fresh, tokens(1)),
            Err(WaternityError::ArithmeticOverflow("vault principal"))
        );
        assert_eq!(node.get_well_info(fresh), Err(WaternityError::NotFound(fresh)));
        assert_eq!(node.get_yield_rate(fresh), Err(WaternityError::NotFound(fresh)));
        assert!(node.events().is_empty());
    }

    #[test]
    fn test_unstake_unknown_well_not_found() {
        let (node, _) = node_with(10);
        let alice = Address::from_label("alice");
        assert_eq!(node.unstake(alice, 999, 1), Err(WaternityError::NotFound(999)));

        let well = mint(&node, "Sumba");
        node.register_well(&node.admin(), well).unwrap();
        assert_eq!(
            node.unstake(alice, well, 1),
            Err(WaternityError::InsufficientStake {
                requested: 1,
                available: 0
            })
        );
    }

    #[test]
    fn test_wells_held_by_follow_burns() {
        let (node, _) = node_with(10);
        let admin = node.admin();
        let lombok = mint(&node, "Lombok");
        let flores = mint(&node, "Flores");
        assert_eq!(node.wells_held_by(&admin), vec![lombok, flores]);

        node.burn_well(&admin, lombok, "decommissioned").unwrap();
        assert_eq!(node.wells_held_by(&admin), vec![flores]);
        assert!(node.wells_held_by(&Address::from_label("alice")).is_empty());
    }

    #[test]
    fn test_market_data_before_baseline() {
        let (node, _) = node_with(10);
        let data = node.get_market_data().unwrap();
        assert_eq!(data.recorded, None);
        assert_eq!(data.movement_bps, None);
        assert!(!data.adjustment_due);
    }

    #[test]
    fn test_burn_retires_automation_and_rate() {
        let (node, _) = node_with(10);
        let admin = node.admin();
        let well = mint(&node, "Flores");
        node.register_well(&admin, well).unwrap();
        node.add_well_to_automation(&admin, well).unwrap();

        node.emergency_burn(&admin, well, "decommissioned").unwrap();
        assert!(node.get_active_wells().is_empty());
        assert_eq!(node.get_yield_rate(well), Err(WaternityError::NotFound(well)));
        assert!(!node.well_exists(well));
    }

    #[test]
    fn test_upkeep_not_due_is_silent() {
        let (node, _) = node_with(10);
        node.drain_events();
        assert_eq!(
            node.perform_upkeep().unwrap(),
            UpkeepOutcome::NotDue { remaining_secs: 3600 }
        );
        assert!(node.events().is_empty());
        assert_eq!(node.get_automation_status().upkeep_counter, 0);
    }
}
