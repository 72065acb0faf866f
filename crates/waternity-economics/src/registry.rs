//! # Well Registry
//!
//! Minted wells, partner roles and per-well stake aggregates.
//!
//! ## Roles
//!
//! | Operation | Admin | Authorized partner | Field partner | Holder |
//! |-----------|-------|--------------------|---------------|--------|
//! | authorize / revoke partner | yes | - | - | - |
//! | mint well | yes | yes | - | - |
//! | update status | yes | - | yes | - |
//! | update verified data | yes | - | - | - |
//! | register for staking | yes | - | yes | - |
//! | burn | - | - | - | yes |
//! | emergency burn | yes | - | - | - |

use crate::constants::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use waternity_core::error::{Result, WaternityError};
use waternity_core::types::*;

/// Descriptive record of a minted well
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WellData {
    /// Well ID
    pub well_id: WellId,

    /// Current holder of the well token
    pub holder: Address,

    /// Human-readable location
    pub location: String,

    /// Capacity in liters per day
    pub capacity: u64,

    /// People served by the well
    pub people_served: u64,

    /// Is the well operating
    pub is_active: bool,

    /// Partner who minted and maintains the well
    pub field_partner: Address,

    /// Off-ledger metadata URI
    pub metadata_uri: String,

    /// Mint timestamp
    pub created_at: Timestamp,
}

impl WellData {
    /// Impact score 0-100 from people served; inactive wells score zero
    pub fn impact_score(&self) -> u32 {
        if !self.is_active {
            return 0;
        }
        let score = self.people_served.saturating_mul(MAX_IMPACT_SCORE as u64) / IMPACT_REFERENCE_PEOPLE;
        score.min(MAX_IMPACT_SCORE as u64) as u32
    }
}

/// Parameters for minting a well
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MintWell {
    pub to: Address,
    pub location: String,
    pub capacity: u64,
    pub people_served: u64,
    pub metadata_uri: String,
}

/// Staking registration and aggregates of a well
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryEntry {
    /// Registration timestamp
    pub registered_at: Timestamp,

    /// Sum of all positions in the well
    pub total_staked: Amount,

    /// Stakers with a non-zero position
    pub staker_count: u64,
}

/// Answer to `get_well_info`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WellInfo {
    pub well_id: WellId,
    pub is_registered: bool,
    pub total_staked: Amount,
    pub staker_count: u64,
    pub impact_score: u32,
}

/// Well registry
#[derive(Clone, Debug)]
pub struct WellRegistry {
    /// Ledger administrator
    admin: Address,

    /// Partners allowed to mint
    partners: HashSet<Address>,

    /// Minted wells
    wells: BTreeMap<WellId, WellData>,

    /// Wells registered for staking
    entries: BTreeMap<WellId, RegistryEntry>,

    /// Next well ID to allocate
    next_well_id: WellId,
}

impl WellRegistry {
    /// Create new registry owned by `admin`
    pub fn new(admin: Address) -> Self {
        Self {
            admin,
            partners: HashSet::new(),
            wells: BTreeMap::new(),
            entries: BTreeMap::new(),
            next_well_id: 0,
        }
    }

    pub fn admin(&self) -> Address {
        self.admin
    }

    pub fn is_admin(&self, caller: &Address) -> bool {
        *caller == self.admin
    }

    /// Fail with `Unauthorized` unless `caller` is the admin
    pub fn require_admin(&self, caller: &Address) -> Result<()> {
        if self.is_admin(caller) {
            Ok(())
        } else {
            Err(WaternityError::Unauthorized(*caller))
        }
    }

    pub fn is_partner(&self, address: &Address) -> bool {
        self.partners.contains(address)
    }

    /// Authorize a partner; returns false if already authorized
    pub fn authorize_partner(&mut self, caller: &Address, partner: Address) -> Result<bool> {
        self.require_admin(caller)?;
        Ok(self.partners.insert(partner))
    }

    /// Revoke a partner; returns false if not authorized
    pub fn revoke_partner(&mut self, caller: &Address, partner: &Address) -> Result<bool> {
        self.require_admin(caller)?;
        Ok(self.partners.remove(partner))
    }

    /// Mint a new well; the caller becomes its field partner
    pub fn mint_well(&mut self, caller: &Address, mint: MintWell, now: Timestamp) -> Result<WellId> {
        if !self.is_admin(caller) && !self.is_partner(caller) {
            return Err(WaternityError::Unauthorized(*caller));
        }

        let well_id = self.next_well_id;
        self.next_well_id += 1;

        self.wells.insert(
            well_id,
            WellData {
                well_id,
                holder: mint.to,
                location: mint.location,
                capacity: mint.capacity,
                people_served: mint.people_served,
                is_active: true,
                field_partner: *caller,
                metadata_uri: mint.metadata_uri,
                created_at: now,
            },
        );

        Ok(well_id)
    }

    /// Get well data
    pub fn get_well_data(&self, well_id: WellId) -> Result<&WellData> {
        self.wells.get(&well_id).ok_or(WaternityError::NotFound(well_id))
    }

    pub fn well_exists(&self, well_id: WellId) -> bool {
        self.wells.contains_key(&well_id)
    }

    /// Wells ever minted, including burned ones
    pub fn total_minted(&self) -> u64 {
        self.next_well_id
    }

    /// Live (minted and not burned) wells
    pub fn wells(&self) -> impl Iterator<Item = &WellData> {
        self.wells.values()
    }

    /// Live wells whose token `holder` currently holds, in id order
    pub fn wells_held_by<'a>(&'a self, holder: &'a Address) -> impl Iterator<Item = &'a WellData> + 'a {
        self.wells.values().filter(move |well| well.holder == *holder)
    }

    fn well_mut_for_maintainer(&mut self, caller: &Address, well_id: WellId) -> Result<&mut WellData> {
        let is_admin = self.is_admin(caller);
        let well = self
            .wells
            .get_mut(&well_id)
            .ok_or(WaternityError::NotFound(well_id))?;
        if !is_admin && well.field_partner != *caller {
            return Err(WaternityError::Unauthorized(*caller));
        }
        Ok(well)
    }

    /// Toggle active status; field partner or admin
    pub fn update_well_status(&mut self, caller: &Address, well_id: WellId, is_active: bool) -> Result<()> {
        let well = self.well_mut_for_maintainer(caller, well_id)?;
        well.is_active = is_active;
        Ok(())
    }

    /// Write externally verified well data; admin only
    pub fn update_well_data(
        &mut self,
        caller: &Address,
        well_id: WellId,
        is_active: bool,
        capacity: u64,
        people_served: u64,
    ) -> Result<()> {
        self.require_admin(caller)?;
        let well = self
            .wells
            .get_mut(&well_id)
            .ok_or(WaternityError::NotFound(well_id))?;
        well.is_active = is_active;
        well.capacity = capacity;
        well.people_served = people_served;
        Ok(())
    }

    fn require_unstaked(&self, well_id: WellId) -> Result<()> {
        match self.entries.get(&well_id) {
            Some(entry) if entry.total_staked > 0 => Err(WaternityError::WellHasStake {
                well_id,
                total_staked: entry.total_staked,
            }),
            _ => Ok(()),
        }
    }

    fn remove_well(&mut self, well_id: WellId) -> Result<WellData> {
        self.entries.remove(&well_id);
        self.wells.remove(&well_id).ok_or(WaternityError::NotFound(well_id))
    }

    /// Burn a well; holder only, and only once nothing is staked in it
    pub fn burn_well(&mut self, caller: &Address, well_id: WellId) -> Result<WellData> {
        let well = self.get_well_data(well_id)?;
        if well.holder != *caller {
            return Err(WaternityError::Unauthorized(*caller));
        }
        self.require_unstaked(well_id)?;
        self.remove_well(well_id)
    }

    /// Burn a well on the admin's authority; still requires zero stake
    pub fn emergency_burn(&mut self, caller: &Address, well_id: WellId) -> Result<WellData> {
        self.require_admin(caller)?;
        self.get_well_data(well_id)?;
        self.require_unstaked(well_id)?;
        self.remove_well(well_id)
    }

    /// Register a minted well for staking; field partner or admin
    pub fn register_well(&mut self, caller: &Address, well_id: WellId, now: Timestamp) -> Result<()> {
        let well = self.get_well_data(well_id)?;
        if !self.is_admin(caller) && well.field_partner != *caller {
            return Err(WaternityError::Unauthorized(*caller));
        }
        if self.entries.contains_key(&well_id) {
            return Err(WaternityError::AlreadyRegistered(well_id));
        }

        self.entries.insert(
            well_id,
            RegistryEntry {
                registered_at: now,
                ..RegistryEntry::default()
            },
        );
        Ok(())
    }

    pub fn is_registered(&self, well_id: WellId) -> bool {
        self.entries.contains_key(&well_id)
    }

    /// Registration and aggregates of a well
    pub fn entry(&self, well_id: WellId) -> Result<&RegistryEntry> {
        self.entries.get(&well_id).ok_or(WaternityError::NotFound(well_id))
    }

    /// Registered well IDs in ascending order
    pub fn registered_wells(&self) -> impl Iterator<Item = WellId> + '_ {
        self.entries.keys().copied()
    }

    /// Registration flag, aggregates and impact score
    pub fn get_well_info(&self, well_id: WellId) -> Result<WellInfo> {
        let entry = self.entry(well_id)?;
        let impact_score = self
            .wells
            .get(&well_id)
            .map(WellData::impact_score)
            .unwrap_or(0);

        Ok(WellInfo {
            well_id,
            is_registered: true,
            total_staked: entry.total_staked,
            staker_count: entry.staker_count,
            impact_score,
        })
    }

    /// Aggregates after a stake; `new_staker` when the position was empty
    pub fn entry_after_stake(&self, well_id: WellId, amount: Amount, new_staker: bool) -> Result<RegistryEntry> {
        let mut entry = *self.entry(well_id)?;
        entry.total_staked = entry
            .total_staked
            .checked_add(amount)
            .ok_or(WaternityError::ArithmeticOverflow("well total staked"))?;
        if new_staker {
            entry.staker_count += 1;
        }
        Ok(entry)
    }

    /// Aggregates after an unstake; `closed` when the position dropped to zero
    pub fn entry_after_unstake(&self, well_id: WellId, amount: Amount, closed: bool) -> Result<RegistryEntry> {
        let mut entry = *self.entry(well_id)?;
        entry.total_staked = entry.total_staked.checked_sub(amount).ok_or(
            WaternityError::InsufficientStake {
                requested: amount,
                available: entry.total_staked,
            },
        )?;
        if closed {
            entry.staker_count = entry.staker_count.saturating_sub(1);
        }
        Ok(entry)
    }

    /// Write back aggregates prepared by `entry_after_*`
    pub fn commit_entry(&mut self, well_id: WellId, entry: RegistryEntry) {
        self.entries.insert(well_id, entry);
    }

    /// Undo a registration that never received stake
    pub fn deregister_well(&mut self, well_id: WellId) -> Result<()> {
        self.require_unstaked(well_id)?;
        self.entries
            .remove(&well_id)
            .map(|_| ())
            .ok_or(WaternityError::NotFound(well_id))
    }
}
