//! # Token Vault
//!
//! The external fungible-asset ledger: it takes stake deposits, returns
//! principal, and pays rewards out of a separately funded reserve. Principal is
//! never used to pay rewards.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use waternity_core::error::{Result, WaternityError};
use waternity_core::types::{Address, Amount};

/// Token movements the staking ledger depends on
pub trait TokenVault: Send + Sync {
    /// Pull `amount` of principal from `from`
    fn deposit_stake(&mut self, from: &Address, amount: Amount) -> Result<()>;

    /// Return `amount` of principal to `to`
    fn withdraw_stake(&mut self, to: &Address, amount: Amount) -> Result<()>;

    /// Pay `amount` of reward to `to` out of the reserve
    fn pay_reward(&mut self, to: &Address, amount: Amount) -> Result<()>;

    /// Top up the reward reserve
    fn fund_rewards(&mut self, amount: Amount) -> Result<()>;

    /// Reward reserve available for payouts
    fn reward_reserve(&self) -> Amount;

    /// Current balances
    fn summary(&self) -> VaultSummary;
}

/// Balances reported by [`ReserveVault::summary`]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VaultSummary {
    pub principal_held: Amount,
    pub reward_reserve: Amount,
    pub total_rewards_paid: Amount,
}

/// In-memory vault with a reward reserve and per-address payout totals
#[derive(Clone, Debug, Default)]
pub struct ReserveVault {
    principal_held: Amount,
    reward_reserve: Amount,
    total_rewards_paid: Amount,
    rewards_paid: HashMap<Address, Amount>,
}

impl ReserveVault {
    pub fn new(reward_reserve: Amount) -> Self {
        Self {
            reward_reserve,
            ..Self::default()
        }
    }

    /// Rewards paid to `address` so far
    pub fn rewards_paid_to(&self, address: &Address) -> Amount {
        self.rewards_paid.get(address).copied().unwrap_or(0)
    }
}

impl TokenVault for ReserveVault {
    fn deposit_stake(&mut self, _from: &Address, amount: Amount) -> Result<()> {
        self.principal_held = self
            .principal_held
            .checked_add(amount)
            .ok_or(WaternityError::ArithmeticOverflow("vault principal"))?;
        Ok(())
    }

    fn withdraw_stake(&mut self, _to: &Address, amount: Amount) -> Result<()> {
        self.principal_held = self.principal_held.checked_sub(amount).ok_or_else(|| {
            WaternityError::TransferFailed(format!(
                "vault holds {} principal, asked for {}",
                self.principal_held, amount
            ))
        })?;
        Ok(())
    }

    fn pay_reward(&mut self, to: &Address, amount: Amount) -> Result<()> {
        if amount > self.reward_reserve {
            return Err(WaternityError::InsufficientFunds {
                requested: amount,
                available: self.reward_reserve,
            });
        }
        self.reward_reserve -= amount;
        self.total_rewards_paid = self.total_rewards_paid.saturating_add(amount);
        *self.rewards_paid.entry(*to).or_insert(0) += amount;
        Ok(())
    }

    fn fund_rewards(&mut self, amount: Amount) -> Result<()> {
        self.reward_reserve = self
            .reward_reserve
            .checked_add(amount)
            .ok_or(WaternityError::ArithmeticOverflow("reward reserve"))?;
        Ok(())
    }

    fn reward_reserve(&self) -> Amount {
        self.reward_reserve
    }

    fn summary(&self) -> VaultSummary {
        VaultSummary {
            principal_held: self.principal_held,
            reward_reserve: self.reward_reserve,
            total_rewards_paid: self.total_rewards_paid,
        }
    }
}
