//! Demo wells, stakes and the simulation driver

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use waternity_core::prelude::*;
use waternity_economics::{MintWell, StaticPriceFeed, VaultSummary};
use waternity_node::{WaternityConfig, WaternityNode, WellDetails};

/// Unix time the simulation clock starts at
pub const SIMULATION_START: Timestamp = 1_700_000_000;

/// ETH/USD-style answer with 8 decimals
pub const DEMO_PRICE: i64 = 2_000_00000000;

const DEMO_WELLS: [(&str, u64, u64); 3] = [
    ("Lombok, Indonesia", 5_000, 250),
    ("Flores, Indonesia", 3_500, 180),
    ("Sumba, Indonesia", 4_200, 210),
];

/// (investor, well index, whole tokens)
const DEMO_STAKES: [(&str, usize, u64); 4] = [
    ("investor-1", 0, 10_000),
    ("investor-1", 1, 5_000),
    ("investor-2", 0, 15_000),
    ("investor-2", 2, 8_000),
];

pub fn demo_investors() -> Vec<Address> {
    ["investor-1", "investor-2"]
        .iter()
        .map(|label| Address::from_label(label))
        .collect()
}

/// Mint, register and automate the demo wells, then place the demo stakes
pub fn seed(node: &WaternityNode) -> Result<Vec<WellId>> {
    let admin = node.admin();
    let mut wells = Vec::with_capacity(DEMO_WELLS.len());

    for (index, (location, capacity, people_served)) in DEMO_WELLS.iter().enumerate() {
        let well_id = node.mint_well(
            &admin,
            MintWell {
                to: admin,
                location: location.to_string(),
                capacity: *capacity,
                people_served: *people_served,
                metadata_uri: format!("ipfs://QmDemo{}", index + 1),
            },
        )?;
        node.register_well(&admin, well_id)?;
        node.add_well_to_automation(&admin, well_id)?;
        wells.push(well_id);
    }

    for (label, well_index, amount) in DEMO_STAKES {
        node.stake(Address::from_label(label), wells[well_index], tokens(amount))?;
    }

    Ok(wells)
}

#[derive(Debug, Serialize)]
pub struct Claim {
    pub investor: Address,
    pub well_id: WellId,
    pub amount: Amount,
}

#[derive(Debug, Serialize)]
pub struct SimulationReport {
    pub days: u64,
    pub final_price: i64,
    pub upkeeps_performed: u64,
    pub market_adjustments: u64,
    pub wells: Vec<WellDetails>,
    pub claims: Vec<Claim>,
    pub vault: VaultSummary,
    pub event_counts: BTreeMap<&'static str, usize>,
}

/// Run the demo ledger on a manual clock
///
/// The clock steps one upkeep interval at a time; the price moves by
/// `daily_drift_bps` once per simulated day and is fed to the market adapter.
pub fn simulate(config: WaternityConfig, days: u64, daily_drift_bps: i64) -> Result<SimulationReport> {
    let clock = Arc::new(ManualClock::new(SIMULATION_START));
    let feed = Arc::new(StaticPriceFeed::new(DEMO_PRICE, SIMULATION_START));
    let step = config.automation.interval_secs;
    let node = WaternityNode::with_reserve_vault(config, clock.clone(), feed.clone())?;

    let wells = seed(&node)?;
    node.update_yields_with_market_data(&wells)?;

    let end = SIMULATION_START.saturating_add((days * 24 * 3600) as Timestamp);
    let mut next_price_at = SIMULATION_START + 24 * 3600;
    let mut price = DEMO_PRICE;
    let mut upkeeps_performed = 0;
    let mut market_adjustments = 0;
    let mut event_counts: BTreeMap<&'static str, usize> = BTreeMap::new();

    while clock.now() < end {
        let now = clock.advance(step);

        if node.perform_upkeep()?.is_performed() {
            upkeeps_performed += 1;
        }

        if now >= next_price_at {
            price = price.saturating_add(price.saturating_mul(daily_drift_bps) / 10_000).max(1);
            feed.set_price(price, now);
            if node.update_yields_with_market_data(&wells)?.is_adjustment() {
                market_adjustments += 1;
            }
            next_price_at += 24 * 3600;
        }

        for event in node.drain_events() {
            *event_counts.entry(event.name()).or_default() += 1;
        }
    }

    let mut claims = Vec::new();
    for investor in demo_investors() {
        for position in node.positions_for_staker(&investor)? {
            let amount = node.claim_rewards(investor, position.well_id)?;
            claims.push(Claim {
                investor,
                well_id: position.well_id,
                amount,
            });
        }
    }
    for event in node.drain_events() {
        *event_counts.entry(event.name()).or_default() += 1;
    }

    let wells = wells
        .iter()
        .map(|well_id| node.get_well_details(*well_id, None))
        .collect::<Result<Vec<_>>>()?;

    Ok(SimulationReport {
        days,
        final_price: price,
        upkeeps_performed,
        market_adjustments,
        wells,
        claims,
        vault: node.vault_summary(),
        event_counts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seed_places_demo_stakes() {
        let clock = Arc::new(ManualClock::new(SIMULATION_START));
        let feed = Arc::new(StaticPriceFeed::new(DEMO_PRICE, SIMULATION_START));
        let node = WaternityNode::with_reserve_vault(WaternityConfig::default(), clock, feed).unwrap();

        let wells = seed(&node).unwrap();
        assert_eq!(wells, vec![0, 1, 2]);
        assert_eq!(node.get_well_info(0).unwrap().total_staked, tokens(25_000));
        assert_eq!(node.get_well_info(0).unwrap().staker_count, 2);
        assert_eq!(node.get_active_wells().len(), 3);
    }

    #[test]
    fn test_simulation_pays_rewards() {
        let report = simulate(WaternityConfig::default(), 7, 100).unwrap();

        assert_eq!(report.upkeeps_performed, 7 * 24);
        assert!(report.market_adjustments >= 1);
        assert_eq!(report.claims.len(), 4);
        assert!(report.claims.iter().all(|c| c.amount > 0));

        let paid: Amount = report.claims.iter().map(|c| c.amount).sum();
        assert_eq!(report.vault.total_rewards_paid, paid);
        assert_eq!(report.vault.principal_held, tokens(38_000));
        assert_eq!(report.event_counts.get("UpkeepPerformed"), Some(&(7 * 24)));
    }
}
