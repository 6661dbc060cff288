//! Shared test helpers for unit tests, integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]`.

use std::collections::BTreeMap;

use crate::config::TransferConfig;
use crate::engine::TransferSystem;
use crate::id::{ProbeTypeId, ZoneId};
use crate::oracle::{OrbitalOracle, ZoneInfo};
use crate::skills::SkillSnapshot;
use crate::zone::{Resource, Zone};

// ===========================================================================
// Zones and resources
// ===========================================================================

pub const EARTH: ZoneId = ZoneId(0);
pub const MARS: ZoneId = ZoneId(1);
pub const BELT: ZoneId = ZoneId(2);

pub fn probes() -> Resource {
    Resource::Probes(ProbeTypeId::DEFAULT)
}

// ===========================================================================
// Table-driven oracle
// ===========================================================================

/// An oracle answering from fixed tables.
///
/// Travel times are returned as listed, with no boost. Zones without an
/// escape entry have zero escape delta-v.
#[derive(Debug, Clone, Default)]
pub struct TableOracle {
    routes: BTreeMap<(ZoneId, ZoneId), (f64, f64)>,
    escape: BTreeMap<ZoneId, f64>,
    radii: BTreeMap<ZoneId, f64>,
}

impl TableOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a route in both directions: Hohmann delta-v (km/s) and days.
    pub fn with_route(self, a: ZoneId, b: ZoneId, delta_v: f64, days: f64) -> Self {
        self.with_one_way(a, b, delta_v, days).with_one_way(b, a, delta_v, days)
    }

    pub fn with_one_way(mut self, from: ZoneId, to: ZoneId, delta_v: f64, days: f64) -> Self {
        self.routes.insert((from, to), (delta_v, days));
        self
    }

    pub fn with_escape(mut self, zone: ZoneId, delta_v: f64) -> Self {
        self.escape.insert(zone, delta_v);
        self
    }

    pub fn with_radius(mut self, zone: ZoneId, radius_au: f64) -> Self {
        self.radii.insert(zone, radius_au);
        self
    }
}

impl OrbitalOracle for TableOracle {
    fn hohmann_delta_v(&self, from: ZoneId, to: ZoneId) -> Option<f64> {
        self.routes.get(&(from, to)).map(|(dv, _)| *dv)
    }

    fn escape_delta_v(&self, zone: ZoneId, _current_mass_kg: f64) -> f64 {
        self.escape.get(&zone).copied().unwrap_or(0.0)
    }

    fn transfer_time_with_boost(
        &self,
        from: ZoneId,
        to: ZoneId,
        _skills: &SkillSnapshot,
        _mass_driver_velocity: f64,
        _current_mass_kg: f64,
        _probe_bonus: f64,
    ) -> Option<f64> {
        self.routes.get(&(from, to)).map(|(_, days)| *days)
    }

    fn zone_info(&self, zone: ZoneId) -> Option<ZoneInfo> {
        self.radii.get(&zone).map(|r| ZoneInfo::planet(*r, 0.0))
    }
}

/// Earth, Mars and the belt: Earth–Mars 2 km/s over 10 days, Earth–belt
/// 3 km/s over 20 days, Mars–belt 1.5 km/s over 8 days.
pub fn three_zone_oracle() -> TableOracle {
    TableOracle::new()
        .with_route(EARTH, MARS, 2.0, 10.0)
        .with_route(EARTH, BELT, 3.0, 20.0)
        .with_route(MARS, BELT, 1.5, 8.0)
        .with_radius(EARTH, 1.0)
        .with_radius(MARS, 1.52)
        .with_radius(BELT, 2.7)
}

// ===========================================================================
// Configurations and systems
// ===========================================================================

/// Drivers slow and weak enough that capacity, not stock, is the limit:
/// one driver launches exactly 1000 kg/day at 1.44 km/s.
pub fn driver_limited_config() -> TransferConfig {
    let mut config = TransferConfig::default();
    config.mass_driver.muzzle_velocity_km_s = 1.44;
    config.mass_driver.power_watts = 12_000.0;
    config.mass_driver.efficiency = 1.0;
    config
}

/// Earth with 5000 kg metal, 100 000 kg methalox, 100 probes and one mass
/// driver; empty Mars and belt.
pub fn three_zone_system() -> TransferSystem {
    let mut sys = TransferSystem::new(Box::new(three_zone_oracle()));
    sys.add_zone(
        Zone::new(EARTH, "earth")
            .with_metal(5000.0)
            .with_methalox(100_000.0)
            .with_probes(ProbeTypeId::DEFAULT, 100.0, 100.0)
            .with_mass_drivers(1),
    );
    sys.add_zone(Zone::new(MARS, "mars"));
    sys.add_zone(Zone::new(BELT, "belt"));
    sys
}

// ===========================================================================
// Assertions
// ===========================================================================

#[track_caller]
pub fn assert_close(actual: f64, expected: f64, tolerance: f64) {
    assert!(
        (actual - expected).abs() <= tolerance,
        "expected {expected} ± {tolerance}, got {actual}"
    );
}
