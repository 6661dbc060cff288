//! Property-based tests for the transfer subsystem.
//!
//! Random transfer mixes, tick lengths and command sequences are run
//! through a `TransferSystem` and checked against the conservation, rate
//! and feasibility invariants.

use brachisto_core::command_queue::TransferCommand;
use brachisto_core::config::TransferConfig;
use brachisto_core::engine::{TickContext, TransferSystem};
use brachisto_core::id::{CommandId, ProbeTypeId, TransferId};
use brachisto_core::physics::Physics;
use brachisto_core::propellant;
use brachisto_core::reachability;
use brachisto_core::skills::{EconomicRules, Skill, SkillSnapshot};
use brachisto_core::test_utils::*;
use brachisto_core::transfer::CreateRequest;
use brachisto_core::zone::{Resource, Zone};
use proptest::prelude::*;

// ===========================================================================
// Generators
// ===========================================================================

#[derive(Debug, Clone)]
enum Op {
    Advance(f64),
    Pause(usize),
    Resume(usize),
    Stop(usize),
    Delete(usize),
    Reverse(usize),
}

fn arb_ops(max_ops: usize) -> impl Strategy<Value = Vec<Op>> {
    proptest::collection::vec(
        prop_oneof![
            6 => (0.05..3.0f64).prop_map(Op::Advance),
            1 => (0..8usize).prop_map(Op::Pause),
            1 => (0..8usize).prop_map(Op::Resume),
            1 => (0..8usize).prop_map(Op::Stop),
            1 => (0..8usize).prop_map(Op::Delete),
            1 => (0..8usize).prop_map(Op::Reverse),
        ],
        1..=max_ops,
    )
}

/// (destination index, is_metal, one_time, value)
fn arb_requests() -> impl Strategy<Value = Vec<(u8, bool, bool, f64)>> {
    proptest::collection::vec((0..2u8, any::<bool>(), any::<bool>(), 1.0..60.0f64), 1..6)
}

/// Three zones, both Earth and Mars with drivers so reversals succeed.
fn conservation_system() -> TransferSystem {
    let mut sys = three_zone_system();
    if let Some(mars) = sys.zone_mut(MARS) {
        mars.mass_drivers = 1;
        mars.methalox = 100_000.0;
    }
    sys
}

fn totals(sys: &TransferSystem) -> (f64, f64) {
    let state = sys.state();
    (
        state.stock_total(Resource::Metal) + state.in_flight_total(Resource::Metal),
        state.stock_total(probes()) + state.in_flight_total(probes()),
    )
}

// ===========================================================================
// Properties
// ===========================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Whatever leaves a zone is either in flight or has arrived somewhere.
    #[test]
    fn mass_is_conserved(requests in arb_requests(), ops in arb_ops(40)) {
        let mut sys = conservation_system();
        let skills = SkillSnapshot::new();
        let initial = totals(&sys);

        let mut ids: Vec<TransferId> = Vec::new();
        for (dest, is_metal, one_time, value) in requests {
            let to = if dest == 0 { MARS } else { BELT };
            let resource = if is_metal { Resource::Metal } else { probes() };
            let request = if one_time {
                CreateRequest::one_time(EARTH, to, resource, value.floor())
            } else {
                CreateRequest::continuous(EARTH, to, resource, value)
            };
            if let Some(id) = sys.create_transfer(&request, &skills).transfer {
                ids.push(id);
            }
        }

        let ctx = TickContext::new(skills.clone());
        let pick = |i: usize| ids.get(i % ids.len().max(1)).copied();
        for op in ops {
            match op {
                Op::Advance(dt) => { sys.advance(dt, &ctx); }
                Op::Pause(i) => if let Some(id) = pick(i) { let _ = sys.pause(id, true); },
                Op::Resume(i) => if let Some(id) = pick(i) { let _ = sys.pause(id, false); },
                Op::Stop(i) => if let Some(id) = pick(i) { let _ = sys.stop(id); },
                Op::Delete(i) => if let Some(id) = pick(i) { let _ = sys.delete(id); },
                Op::Reverse(i) => if let Some(id) = pick(i) { let _ = sys.reverse(id); },
            }
            let (metal, probe_count) = totals(&sys);
            prop_assert!((metal - initial.0).abs() < 1e-6, "metal {} != {}", metal, initial.0);
            prop_assert!((probe_count - initial.1).abs() < 1e-6, "probes {} != {}", probe_count, initial.1);
            for zone in sys.zones() {
                prop_assert!(zone.methalox >= 0.0);
                prop_assert!(zone.stored_metal >= 0.0);
            }
        }
    }

    /// Dispatched probes stay within one minimum batch of the nominal rate.
    #[test]
    fn batching_tracks_nominal_rate(
        production in 0.5..50.0f64,
        pct in 1.0..100.0f64,
        steps in proptest::collection::vec(0.01..2.0f64, 1..60),
    ) {
        let mut sys = three_zone_system();
        sys.add_zone(
            Zone::new(EARTH, "earth")
                .with_probes(ProbeTypeId::DEFAULT, 1.0e9, 100.0)
                .with_probe_production(production)
                .with_mass_drivers(1),
        );
        let id = sys
            .create_transfer(&CreateRequest::continuous(EARTH, MARS, probes(), pct), &SkillSnapshot::new())
            .into_result()
            .unwrap();

        let ctx = TickContext::default();
        let mut elapsed = 0.0;
        for dt in steps {
            sys.advance(dt, &ctx);
            elapsed += dt;
        }
        let dispatched = 1.0e9 - sys.zone(EARTH).unwrap().probe_count(ProbeTypeId::DEFAULT);
        let nominal = production * pct / 100.0 * elapsed;
        prop_assert!(dispatched <= nominal + 1e-6);
        prop_assert!(nominal - dispatched < sys.config().min_probe_batch + 1e-6);
        prop_assert!(sys.view(id).unwrap().accumulator < sys.config().min_probe_batch + 1e-6);
    }

    /// Faster drivers never turn a reachable route unreachable.
    #[test]
    fn reachability_is_monotone_in_muzzle_velocity(
        hohmann in 0.1..20.0f64,
        escape in 0.0..15.0f64,
        slow in 0.0..30.0f64,
        extra in 0.0..30.0f64,
        metal in any::<bool>(),
    ) {
        let oracle = TableOracle::new().with_route(EARTH, MARS, hohmann, 100.0).with_escape(EARTH, escape);
        let rules = EconomicRules::default();
        let skills = SkillSnapshot::new();
        let earth = Zone::new(EARTH, "earth").with_mass_drivers(1);
        let resource = if metal { Resource::Metal } else { probes() };

        let mut config = TransferConfig::default();
        config.mass_driver.muzzle_velocity_km_s = slow;
        let before = reachability::assess(&Physics::new(&oracle, &rules, &config, &skills), &earth, MARS, resource).unwrap();
        config.mass_driver.muzzle_velocity_km_s = slow + extra;
        let after = reachability::assess(&Physics::new(&oracle, &rules, &config, &skills), &earth, MARS, resource).unwrap();

        prop_assert!(!before.reachable || after.reachable);
        prop_assert!(after.shortfall <= before.shortfall);
    }

    /// Propulsion research never changes the gate.
    #[test]
    fn propulsion_does_not_enter_the_gate(
        hohmann in 0.1..60.0f64,
        propulsion in 0.1..10.0f64,
    ) {
        let oracle = TableOracle::new().with_route(EARTH, MARS, hohmann, 100.0);
        let (rules, config) = (EconomicRules::default(), TransferConfig::default());
        let base = SkillSnapshot::new();
        let boosted = SkillSnapshot::new().with(Skill::Propulsion, propulsion);
        let earth = Zone::new(EARTH, "earth");

        let a = reachability::assess(&Physics::new(&oracle, &rules, &config, &base), &earth, MARS, probes()).unwrap();
        let b = reachability::assess(&Physics::new(&oracle, &rules, &config, &boosted), &earth, MARS, probes()).unwrap();
        prop_assert_eq!(a.reachable, b.reachable);
        prop_assert_eq!(a.capacity, b.capacity);
    }

    /// Fuel is never negative or NaN, and shrinks as drivers cover more.
    #[test]
    fn fuel_is_well_behaved(
        payload in 0.0..1.0e6f64,
        hohmann in -5.0..80.0f64,
        muzzle in 0.0..20.0f64,
        drivers in 0..3u32,
    ) {
        let oracle = TableOracle::new().with_route(EARTH, MARS, hohmann, 100.0);
        let (rules, skills) = (EconomicRules::default(), SkillSnapshot::new());
        let mut config = TransferConfig::default();
        config.mass_driver.muzzle_velocity_km_s = muzzle;
        let phys = Physics::new(&oracle, &rules, &config, &skills);

        let bare = Zone::new(EARTH, "earth");
        let equipped = Zone::new(EARTH, "earth").with_mass_drivers(drivers);
        let without = propellant::fuel_required(&phys, &bare, MARS, payload);
        let with = propellant::fuel_required(&phys, &equipped, MARS, payload);
        prop_assert!(without >= 0.0 && !without.is_nan());
        prop_assert!(with >= 0.0 && !with.is_nan());
        prop_assert!(with <= without);
    }

    /// A restored snapshot advances exactly like the original.
    #[test]
    fn snapshot_round_trip(rates in proptest::collection::vec(1.0..40.0f64, 1..4), ticks in 1..20usize) {
        let mut sys = three_zone_system();
        let skills = SkillSnapshot::new();
        for (i, pct) in rates.iter().enumerate() {
            let to = if i % 2 == 0 { MARS } else { BELT };
            sys.create_transfer(&CreateRequest::continuous(EARTH, to, Resource::Metal, *pct), &skills);
        }
        let ctx = TickContext::default();
        for _ in 0..ticks {
            sys.advance(0.9, &ctx);
        }
        let first = sys.active_transfers()[0].id;
        sys.queue_command(CommandId(0), TransferCommand::Stop { transfer: first });

        let data = sys.serialize().unwrap();
        let mut restored = TransferSystem::deserialize(&data, Box::new(three_zone_oracle())).unwrap();
        prop_assert_eq!(restored.state_hash(), sys.state_hash());
        for _ in 0..5 {
            prop_assert_eq!(sys.advance(1.1, &ctx).state_hash, restored.advance(1.1, &ctx).state_hash);
        }
    }
}
