//! Shared fixtures for node integration tests

#![allow(dead_code)]

use std::sync::Arc;
use waternity_core::prelude::*;
use waternity_economics::{MintWell, StaticPriceFeed};
use waternity_node::{WaternityConfig, WaternityNode};

pub const START: Timestamp = 1_700_000_000;
pub const YEAR: u64 = SECONDS_PER_YEAR as u64;
pub const INITIAL_PRICE: i64 = 2_000_00000000;

pub struct Harness {
    pub node: WaternityNode,
    pub clock: Arc<ManualClock>,
    pub feed: Arc<StaticPriceFeed>,
    pub admin: Address,
    pub partner: Address,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(WaternityConfig::default())
    }

    pub fn with_config(config: WaternityConfig) -> Self {
        let clock = Arc::new(ManualClock::new(START));
        let feed = Arc::new(StaticPriceFeed::new(INITIAL_PRICE, START));
        let admin = config.ledger.admin;
        let node = WaternityNode::with_reserve_vault(config, clock.clone(), feed.clone()).unwrap();

        let partner = Address::from_label("field-partner");
        node.authorize_partner(&admin, partner).unwrap();

        Self {
            node,
            clock,
            feed,
            admin,
            partner,
        }
    }

    /// Partner mints a well it holds itself
    pub fn mint(&self, location: &str, capacity: u64, people_served: u64) -> WellId {
        self.node
            .mint_well(
                &self.partner,
                MintWell {
                    to: self.partner,
                    location: location.to_string(),
                    capacity,
                    people_served,
                    metadata_uri: format!("ipfs://{}", location.to_lowercase()),
                },
            )
            .unwrap()
    }

    pub fn registered_well(&self, location: &str) -> WellId {
        let well_id = self.mint(location, 5_000, 250);
        self.node.register_well(&self.partner, well_id).unwrap();
        well_id
    }

    pub fn automated_well(&self, location: &str) -> WellId {
        let well_id = self.registered_well(location);
        self.node.add_well_to_automation(&self.admin, well_id).unwrap();
        well_id
    }

    /// Publish a price stamped at the current time
    pub fn publish_price(&self, price: i64) {
        self.feed.set_price(price, self.clock.now());
    }

    pub fn event_names(&self) -> Vec<&'static str> {
        self.node.drain_events().iter().map(|e| e.name()).collect()
    }
}

pub fn investor(name: &str) -> Address {
    Address::from_label(name)
}
