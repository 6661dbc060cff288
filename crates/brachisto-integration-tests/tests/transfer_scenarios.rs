//! Reference scenarios for the transfer subsystem.
//!
//! Each test drives a `TransferSystem` through its public API only: fuel
//! debits on a probe shipment, metal batching, the energy gate and shared
//! mass-driver capacity.

use brachisto_core::config::TransferConfig;
use brachisto_core::engine::{TickContext, TransferSystem};
use brachisto_core::event::TransferEvent;
use brachisto_core::id::ProbeTypeId;
use brachisto_core::skills::{Skill, SkillSnapshot};
use brachisto_core::test_utils::*;
use brachisto_core::transfer::{CreateRequest, TransferError, TransferStatus};
use brachisto_core::zone::{Resource, Zone};

/// Tsiolkovsky fuel for 1000 kg over 4 km/s at Isp 500 s.
const SCENARIO_A_FUEL_KG: f64 = 1260.9;

// ===========================================================================
// Scenario A: probe shipment without a mass driver
// ===========================================================================

fn scenario_a(methalox: f64) -> TransferSystem {
    let mut config = TransferConfig::default();
    config.mass_driver.muzzle_velocity_km_s = 0.0;
    let oracle = TableOracle::new().with_route(EARTH, MARS, 4.0, 120.0);
    let mut sys = TransferSystem::new(Box::new(oracle)).with_config(config).unwrap();
    sys.add_zone(
        Zone::new(EARTH, "earth")
            .with_methalox(methalox)
            .with_probes(ProbeTypeId::DEFAULT, 10.0, 100.0),
    );
    sys.add_zone(Zone::new(MARS, "mars"));
    sys
}

#[test]
fn scenario_a_debits_exact_rocket_fuel() {
    let mut sys = scenario_a(2000.0);
    sys.advance(3.0, &TickContext::default());
    let skills = SkillSnapshot::new().with(Skill::Propulsion, 1.0);

    let estimate = sys.estimate_fuel(EARTH, MARS, probes(), 10.0, &skills).unwrap();
    assert_close(estimate.fuel_kg, SCENARIO_A_FUEL_KG, 0.1);
    assert_eq!(estimate.mass_driver_credit, 0.0);

    let id = sys
        .create_transfer(&CreateRequest::one_time(EARTH, MARS, probes(), 10.0), &skills)
        .into_result()
        .unwrap();

    let earth = sys.zone(EARTH).unwrap();
    assert_close(earth.methalox, 2000.0 - estimate.fuel_kg, 1e-9);
    assert_eq!(earth.probe_count(ProbeTypeId::DEFAULT), 0.0);

    let view = sys.view(id).unwrap();
    assert_eq!(view.status, TransferStatus::Traveling);
    assert_eq!(view.departure_time, Some(3.0));
    assert_eq!(view.arrival_time, Some(123.0));
}

#[test]
fn scenario_a_rejects_when_fuel_is_short() {
    let mut sys = scenario_a(1000.0);
    let outcome = sys.create_transfer(
        &CreateRequest::one_time(EARTH, MARS, probes(), 10.0),
        &SkillSnapshot::new(),
    );
    assert!(!outcome.success);
    match outcome.error {
        Some(TransferError::InsufficientFuel { required, available }) => {
            assert_close(required, SCENARIO_A_FUEL_KG, 0.1);
            assert_eq!(available, 1000.0);
        }
        other => panic!("expected InsufficientFuel, got {other:?}"),
    }
    // Nothing was debited.
    let earth = sys.zone(EARTH).unwrap();
    assert_eq!(earth.methalox, 1000.0);
    assert_eq!(earth.probe_count(ProbeTypeId::DEFAULT), 10.0);
}

// ===========================================================================
// Scenario B: metal batching
// ===========================================================================

#[test]
fn scenario_b_first_batch_fires_at_threshold() {
    let mut sys = three_zone_system();
    let id = sys
        .create_transfer(
            &CreateRequest::continuous(EARTH, MARS, Resource::Metal, 10.0),
            &SkillSnapshot::new(),
        )
        .into_result()
        .unwrap();
    assert_close(sys.view(id).unwrap().effective_rate, 500.0, 1e-9);

    let ctx = TickContext::default();
    let first = sys.advance(0.1, &ctx);
    assert_eq!(first.batches_dispatched, 0);
    assert_close(sys.view(id).unwrap().accumulator, 50.0, 1e-9);

    let second = sys.advance(0.2, &ctx);
    assert_eq!(second.batches_dispatched, 1);
    let view = sys.view(id).unwrap();
    assert_eq!(view.batches_in_flight, 1);
    assert_close(view.in_flight, 150.0, 1e-6);
    assert_close(view.accumulator, 0.0, 1e-6);
    assert_close(sys.zone(EARTH).unwrap().stored_metal, 4850.0, 1e-6);

    let departed: Vec<_> = second
        .events
        .iter()
        .filter_map(|e| match e {
            TransferEvent::BatchDeparted { amount, arrival_time, .. } => Some((*amount, *arrival_time)),
            _ => None,
        })
        .collect();
    assert_eq!(departed.len(), 1);
    assert_close(departed[0].0, 150.0, 1e-6);
    assert_close(departed[0].1, 10.3, 1e-9);
}

#[test]
fn scenario_b_batch_lands_after_travel_time() {
    let mut sys = three_zone_system();
    sys.create_transfer(
        &CreateRequest::continuous(EARTH, MARS, Resource::Metal, 10.0),
        &SkillSnapshot::new(),
    );
    let ctx = TickContext::default();
    sys.advance(0.3, &ctx);

    // Stop the stream so only the first batch is in play.
    let first = sys.active_transfers()[0].id;
    sys.stop(first).unwrap();

    let mut arrived = 0;
    for _ in 0..11 {
        arrived += sys.advance(1.0, &ctx).batches_arrived;
    }
    assert_eq!(arrived, 1);
    assert_close(sys.zone(MARS).unwrap().stored_metal, 150.0, 1e-6);
    assert!(sys.transfer(first).is_none(), "drained stopping stream is removed");
}

// ===========================================================================
// Scenario C: energy gate
// ===========================================================================

fn powered_network() -> TransferSystem {
    let mut sys = three_zone_system();
    if let Some(earth) = sys.zone_mut(EARTH) {
        earth.probe_production_rate = 10.0;
    }
    sys.add_zone(
        Zone::new(MARS, "mars")
            .with_metal(2000.0)
            .with_mass_drivers(1),
    );
    sys
}

#[test]
fn scenario_c_negative_energy_blocks_every_metal_stream() {
    let mut sys = powered_network();
    let skills = SkillSnapshot::new();
    let earth_metal = sys
        .create_transfer(&CreateRequest::continuous(EARTH, MARS, Resource::Metal, 10.0), &skills)
        .into_result()
        .unwrap();
    let mars_metal = sys
        .create_transfer(&CreateRequest::continuous(MARS, BELT, Resource::Metal, 10.0), &skills)
        .into_result()
        .unwrap();
    let earth_probes = sys
        .create_transfer(&CreateRequest::continuous(EARTH, BELT, probes(), 100.0), &skills)
        .into_result()
        .unwrap();

    let blocked = TickContext::new(skills.clone()).with_net_energy(-5.0e6);
    let report = sys.advance(1.0, &blocked);

    for id in [earth_metal, mars_metal] {
        let view = sys.view(id).unwrap();
        assert!(view.energy_blocked);
        assert_eq!(view.batches_in_flight, 0);
        assert_eq!(view.effective_rate, 0.0);
    }
    let probe_view = sys.view(earth_probes).unwrap();
    assert!(!probe_view.energy_blocked);
    assert_eq!(probe_view.batches_in_flight, 1);
    assert_close(probe_view.in_flight, 10.0, 1e-9);

    let blocked_events = report
        .events
        .iter()
        .filter(|e| matches!(e, TransferEvent::EnergyBlocked { .. }))
        .count();
    assert_eq!(blocked_events, 2);
    assert_eq!(report.batches_dispatched, 1);

    // Power comes back: metal resumes on the next tick.
    let restored = sys.advance(1.0, &TickContext::new(skills).with_net_energy(1.0e6));
    assert!(!sys.view(earth_metal).unwrap().energy_blocked);
    assert_eq!(sys.view(earth_metal).unwrap().batches_in_flight, 1);
    assert_eq!(sys.view(mars_metal).unwrap().batches_in_flight, 1);
    assert_eq!(
        restored
            .events
            .iter()
            .filter(|e| matches!(e, TransferEvent::EnergyRestored { .. }))
            .count(),
        2
    );
}

// ===========================================================================
// Scenario D: shared mass-driver capacity
// ===========================================================================

fn driver_limited_system() -> TransferSystem {
    let oracle = TableOracle::new().with_route(EARTH, MARS, 1.44, 10.0);
    let mut sys = TransferSystem::new(Box::new(oracle))
        .with_config(driver_limited_config())
        .unwrap();
    sys.add_zone(Zone::new(EARTH, "earth").with_metal(5000.0).with_mass_drivers(1));
    sys.add_zone(Zone::new(MARS, "mars"));
    sys
}

#[test]
fn scenario_d_second_stream_gets_the_remaining_capacity() {
    let mut sys = driver_limited_system();
    let skills = SkillSnapshot::new();

    let report = sys.assess_route(EARTH, MARS, Resource::Metal, &skills).unwrap();
    assert!(report.reachable);

    let first = sys
        .create_transfer(&CreateRequest::continuous(EARTH, MARS, Resource::Metal, 14.0), &skills)
        .into_result()
        .unwrap();
    let second = sys
        .create_transfer(&CreateRequest::continuous(EARTH, MARS, Resource::Metal, 10.0), &skills)
        .into_result()
        .unwrap();

    assert_close(sys.view(first).unwrap().effective_rate, 700.0, 1e-6);
    let capped = sys.view(second).unwrap();
    assert_close(capped.effective_rate, 300.0, 1e-6);
    assert_close(capped.rate_percentage.unwrap(), 6.0, 1e-9);

    // The cap holds on the tick path too.
    sys.advance(0.01, &TickContext::default());
    assert_close(sys.view(first).unwrap().effective_rate, 700.0, 1e-6);
    assert_close(sys.view(second).unwrap().effective_rate, 300.0, 1e-6);

    // A third stream finds the driver fully booked.
    let third = sys.create_transfer(
        &CreateRequest::continuous(EARTH, MARS, Resource::Metal, 1.0),
        &skills,
    );
    assert!(matches!(third.error, Some(TransferError::NoCapacity(z)) if z == EARTH));
}

#[test]
fn scenario_d_pausing_the_first_frees_capacity() {
    let mut sys = driver_limited_system();
    let skills = SkillSnapshot::new();
    let first = sys
        .create_transfer(&CreateRequest::continuous(EARTH, MARS, Resource::Metal, 14.0), &skills)
        .into_result()
        .unwrap();
    let second = sys
        .create_transfer(&CreateRequest::continuous(EARTH, MARS, Resource::Metal, 6.0), &skills)
        .into_result()
        .unwrap();
    sys.pause(first, true).unwrap();
    sys.advance(0.01, &TickContext::default());

    assert_eq!(sys.view(first).unwrap().effective_rate, 0.0);
    // 6 % of 5000 fits in the whole driver now.
    assert_close(sys.view(second).unwrap().effective_rate, 300.0, 1e-6);
}
