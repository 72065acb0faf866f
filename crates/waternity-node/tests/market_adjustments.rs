//! Price-driven yield adjustments

mod common;

use common::*;
use waternity_core::prelude::*;
use waternity_economics::MarketDecision;

fn baselined() -> (Harness, WellId) {
    let h = Harness::new();
    let well = h.automated_well("Lombok");
    let outcome = h.node.update_yields_with_market_data(&[well]).unwrap();
    assert_eq!(outcome.decision, MarketDecision::Baseline);
    assert!(outcome.rate_changes.is_empty());
    h.node.drain_events();
    (h, well)
}

#[test]
fn test_first_price_sets_baseline() {
    let (h, well) = baselined();
    assert_eq!(h.node.get_yield_rate(well).unwrap(), 300);

    let market = h.node.get_market_data().unwrap();
    assert_eq!(market.recorded.map(|r| r.price), Some(INITIAL_PRICE));
    assert_eq!(market.movement_bps, Some(0));
    assert!(!market.adjustment_due);
}

#[test]
fn test_move_at_threshold_is_ignored() {
    let (h, well) = baselined();
    h.clock.advance(60);
    h.publish_price(2_100_00000000);

    let outcome = h.node.update_yields_with_market_data(&[well]).unwrap();
    assert_eq!(outcome.decision, MarketDecision::BelowThreshold { movement_bps: 500 });
    assert_eq!(h.node.get_yield_rate(well).unwrap(), 300);
    assert!(h.node.events().is_empty());

    // reference price is unchanged
    let market = h.node.get_market_data().unwrap();
    assert_eq!(market.recorded.map(|r| r.price), Some(INITIAL_PRICE));
}

#[test]
fn test_large_move_scales_rates() {
    let (h, well) = baselined();
    let second = h.automated_well("Flores");
    h.clock.advance(3_600);
    h.node.perform_upkeep().unwrap();
    assert_eq!(h.node.get_yield_rate(second).unwrap(), 800);
    h.node.drain_events();

    h.publish_price(2_200_00000000);
    assert!(h.node.get_market_data().unwrap().adjustment_due);

    let outcome = h.node.update_yields_with_market_data(&[well, second]).unwrap();
    assert_eq!(outcome.decision, MarketDecision::Adjust { movement_bps: 1_000 });
    assert_eq!(outcome.previous_price, Some(INITIAL_PRICE));
    assert_eq!(h.node.get_yield_rate(well).unwrap(), 880);
    assert_eq!(h.node.get_yield_rate(second).unwrap(), 880);
    assert_eq!(
        h.event_names(),
        ["YieldRateUpdated", "YieldRateUpdated", "MarketYieldsAdjusted"]
    );

    let market = h.node.get_market_data().unwrap();
    assert_eq!(market.recorded.map(|r| r.price), Some(2_200_00000000));
}

#[test]
fn test_adjusted_rates_are_clamped() {
    let (h, well) = baselined();
    h.publish_price(200_00000000);
    h.node.update_yields_with_market_data(&[well]).unwrap();
    assert_eq!(h.node.get_yield_rate(well).unwrap(), 100);

    h.publish_price(2_000_00000000);
    h.node.update_yields_with_market_data(&[well]).unwrap();
    assert_eq!(h.node.get_yield_rate(well).unwrap(), 1_000);

    h.publish_price(200_000_00000000);
    h.node.update_yields_with_market_data(&[well]).unwrap();
    assert_eq!(h.node.get_yield_rate(well).unwrap(), 1_500);
}

#[test]
fn test_bad_prices_change_nothing() {
    let (h, well) = baselined();

    h.publish_price(0);
    assert_eq!(
        h.node.update_yields_with_market_data(&[well]),
        Err(WaternityError::InvalidPrice(0))
    );

    h.feed.set_price(3_000_00000000, START - 7_200);
    assert_eq!(
        h.node.update_yields_with_market_data(&[well]),
        Err(WaternityError::StalePrice {
            age_secs: 7_200,
            max_age_secs: 3_600,
        })
    );

    assert_eq!(h.node.get_yield_rate(well).unwrap(), 300);
    assert!(h.node.events().is_empty());
}

#[test]
fn test_unknown_well_rejected_before_recording() {
    let h = Harness::new();
    let well = h.registered_well("Lombok");

    assert_eq!(
        h.node.update_yields_with_market_data(&[well, 42]),
        Err(WaternityError::NotFound(42))
    );
    assert_eq!(h.node.get_market_data().unwrap().recorded, None);
}
