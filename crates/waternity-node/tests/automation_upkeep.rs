//! Interval-gated upkeep and yield-curve repricing

mod common;

use common::*;
use waternity_core::prelude::*;
use waternity_economics::accrue;
use waternity_node::UpkeepOutcome;

#[test]
fn test_add_wells_to_automation() {
    let h = Harness::new();
    let well = h.registered_well("Lombok");
    let outsider = investor("outsider");

    assert_eq!(
        h.node.add_well_to_automation(&outsider, well),
        Err(WaternityError::Unauthorized(outsider))
    );
    assert!(h.node.add_well_to_automation(&h.admin, well).unwrap());
    assert!(!h.node.add_well_to_automation(&h.admin, well).unwrap());
    assert_eq!(h.node.get_active_wells(), vec![well]);

    let unregistered = h.mint("Flores", 3_000, 150);
    assert_eq!(
        h.node.add_well_to_automation(&h.admin, unregistered),
        Err(WaternityError::NotFound(unregistered))
    );
}

#[test]
fn test_check_upkeep_follows_interval() {
    let h = Harness::new();
    let well = h.automated_well("Lombok");

    let check = h.node.check_upkeep();
    assert!(!check.upkeep_needed);
    assert_eq!(check.remaining_secs, 3_600);
    assert_eq!(check.active_wells, vec![well]);

    h.clock.advance(3_599);
    assert_eq!(h.node.check_upkeep().remaining_secs, 1);
    h.clock.advance(2);
    let check = h.node.check_upkeep();
    assert!(check.upkeep_needed);
    assert_eq!(check.remaining_secs, 0);
}

#[test]
fn test_perform_upkeep_updates_rates() {
    let h = Harness::new();
    let well = h.automated_well("Lombok");
    h.node.stake(investor("alice"), well, tokens(1_000)).unwrap();
    h.node.drain_events();

    h.clock.advance(3_601);
    let initial = h.node.get_yield_rate(well).unwrap();
    let outcome = h.node.perform_upkeep().unwrap();

    let UpkeepOutcome::Performed {
        upkeep_counter,
        wells_updated,
        rate_changes,
    } = outcome
    else {
        panic!("upkeep should run");
    };
    assert_eq!(upkeep_counter, 1);
    assert_eq!(wells_updated, 1);
    assert_eq!(rate_changes.len(), 1);

    let updated = h.node.get_yield_rate(well).unwrap();
    assert_ne!(updated, initial);
    assert_eq!(updated, 700);
    assert_eq!(h.event_names(), ["YieldRateUpdated", "UpkeepPerformed"]);

    let status = h.node.get_automation_status();
    assert_eq!(status.upkeep_counter, 1);
    assert_eq!(status.last_upkeep, h.clock.now());
    assert_eq!(status.next_upkeep_at, h.clock.now() + 3_600);
    assert!(!status.phase.is_due());
}

#[test]
fn test_upkeep_not_repeated_within_interval() {
    let h = Harness::new();
    h.automated_well("Lombok");
    h.clock.advance(3_600);
    assert!(h.node.perform_upkeep().unwrap().is_performed());
    h.node.drain_events();

    h.clock.advance(10);
    assert_eq!(
        h.node.perform_upkeep().unwrap(),
        UpkeepOutcome::NotDue { remaining_secs: 3_590 }
    );
    assert!(h.node.events().is_empty());
    assert_eq!(h.node.get_automation_status().upkeep_counter, 1);
}

#[test]
fn test_larger_stake_gets_lower_rate() {
    let h = Harness::new();
    let small = h.automated_well("Lombok");
    let large = h.automated_well("Flores");
    let alice = investor("alice");

    h.node.stake(alice, small, tokens(1_000)).unwrap();
    h.node.stake(alice, large, tokens(15_000)).unwrap();

    h.clock.advance(3_601);
    h.node.perform_upkeep().unwrap();

    let small_rate = h.node.get_yield_rate(small).unwrap();
    let large_rate = h.node.get_yield_rate(large).unwrap();
    assert_eq!(small_rate, 700);
    assert_eq!(large_rate, 350);
    assert!(large_rate < small_rate);
}

#[test]
fn test_rate_change_checkpoints_accrual() {
    let h = Harness::new();
    let well = h.automated_well("Lombok");
    let alice = investor("alice");
    h.node.stake(alice, well, tokens(1_000)).unwrap();

    h.clock.advance(3_601);
    h.node.perform_upkeep().unwrap();
    h.clock.advance(YEAR);

    let expected = accrue(tokens(1_000), 300, 3_601).unwrap() + accrue(tokens(1_000), 700, YEAR).unwrap();
    assert_eq!(h.node.get_pending_rewards(&alice, well).unwrap(), expected);
}

#[test]
fn test_unstaked_automated_well_gets_ceiling_rate() {
    let h = Harness::new();
    let well = h.automated_well("Sumba");
    h.clock.advance(3_600);
    h.node.perform_upkeep().unwrap();
    assert_eq!(h.node.get_yield_rate(well).unwrap(), 800);
}

#[test]
fn test_set_automation_interval() {
    let h = Harness::new();
    let outsider = investor("outsider");

    assert_eq!(
        h.node.set_automation_interval(&outsider, 60),
        Err(WaternityError::Unauthorized(outsider))
    );
    assert!(matches!(
        h.node.set_automation_interval(&h.admin, 0),
        Err(WaternityError::InvalidConfig(_))
    ));

    h.node.drain_events();
    h.node.set_automation_interval(&h.admin, 60).unwrap();
    assert_eq!(h.event_names(), ["IntervalUpdated"]);
    assert_eq!(h.node.get_automation_status().interval_secs, 60);

    h.clock.advance(60);
    assert!(h.node.check_upkeep().upkeep_needed);
}
