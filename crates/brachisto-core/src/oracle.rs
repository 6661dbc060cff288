//! Orbital mechanics queries used by the transfer subsystem.
//!
//! The transfer code never does orbital geometry itself. It asks an
//! [`OrbitalOracle`] for delta-v and travel times, which keeps the cost
//! model testable with table-driven oracles and lets the game swap in a full
//! Lambert solver.
//!
//! [`HohmannOracle`] is the reference implementation: circular coplanar
//! orbits around the Sun, two-burn Hohmann delta-v, half-period travel time,
//! plus moon capture/escape costs and a mass-dependent local escape velocity.

use std::collections::BTreeMap;
use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use crate::id::ZoneId;
use crate::skills::SkillSnapshot;

/// Astronomical unit in metres.
pub const AU_M: f64 = 149_597_870_700.0;

/// Gravitational parameter of the Sun, m³/s².
pub const SUN_MU: f64 = 1.327_124_400_18e20;

/// Newtonian gravitational constant, m³/(kg·s²).
pub const GRAVITATIONAL_CONSTANT: f64 = 6.674_30e-11;

/// Bulk density assumed when deriving a body's radius from its mass, kg/m³.
pub const DEFAULT_BULK_DENSITY: f64 = 5_500.0;

/// Travel time between a moon and its parent (or sibling moons), in days.
pub const LOCAL_TRANSFER_DAYS: f64 = 3.0;

/// Travel time never drops below this fraction of the unboosted time.
pub const MIN_TRAVEL_FRACTION: f64 = 0.1;

const DAYS_PER_YEAR: f64 = 365.25;

/// Orbital radii of the standard zones, in AU.
pub const DEFAULT_RADII_AU: &[(&str, f64)] = &[
    ("dyson_sphere", 0.29),
    ("mercury", 0.39),
    ("venus", 0.72),
    ("earth", 1.0),
    ("mars", 1.52),
    ("asteroid_belt", 2.7),
    ("jupiter", 5.2),
    ("saturn", 9.5),
    ("uranus", 19.2),
    ("neptune", 30.1),
    ("kuiper", 40.0),
    ("oort_cloud", 140.0),
];

/// Static orbital data of a zone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneInfo {
    /// Heliocentric orbital radius. Moons share their parent's radius.
    pub radius_au: f64,
    /// Mass of the body when untouched, kg.
    pub total_mass_kg: f64,
    pub is_moon: bool,
    pub parent: Option<ZoneId>,
    /// Delta-v between the moon's orbit and its parent's orbit, km/s.
    pub delta_v_to_parent_km_s: f64,
}

impl ZoneInfo {
    pub fn planet(radius_au: f64, total_mass_kg: f64) -> Self {
        Self {
            radius_au,
            total_mass_kg,
            is_moon: false,
            parent: None,
            delta_v_to_parent_km_s: 0.0,
        }
    }

    pub fn moon(parent: ZoneId, parent_radius_au: f64, total_mass_kg: f64, delta_v_to_parent_km_s: f64) -> Self {
        Self {
            radius_au: parent_radius_au,
            total_mass_kg,
            is_moon: true,
            parent: Some(parent),
            delta_v_to_parent_km_s,
        }
    }
}

// ---------------------------------------------------------------------------
// Oracle trait
// ---------------------------------------------------------------------------

/// Narrow numeric interface to the orbital-mechanics library.
///
/// Delta-v values are km/s, times are days, masses kg.
pub trait OrbitalOracle {
    /// Delta-v of the heliocentric leg including moon capture/escape.
    /// `None` if either zone is unknown.
    fn hohmann_delta_v(&self, from: ZoneId, to: ZoneId) -> Option<f64>;

    /// Delta-v to leave the zone's gravity well given its remaining mass.
    fn escape_delta_v(&self, zone: ZoneId, current_mass_kg: f64) -> f64;

    /// Escape plus Hohmann delta-v.
    fn total_delta_v(&self, from: ZoneId, to: ZoneId, current_mass_kg: f64) -> Option<f64> {
        self.hohmann_delta_v(from, to)
            .map(|hohmann| hohmann + self.escape_delta_v(from, current_mass_kg))
    }

    /// Travel time in days. Delta-v capacity beyond the requirement
    /// (`mass_driver_velocity + probe_bonus − total`) shortens the trip.
    fn transfer_time_with_boost(
        &self,
        from: ZoneId,
        to: ZoneId,
        skills: &SkillSnapshot,
        mass_driver_velocity: f64,
        current_mass_kg: f64,
        probe_bonus: f64,
    ) -> Option<f64>;

    /// Whether the given combined delta-v capacity covers the trip.
    fn can_probe_reach(&self, from: ZoneId, to: ZoneId, capacity_km_s: f64, current_mass_kg: f64) -> bool {
        self.total_delta_v(from, to, current_mass_kg)
            .is_some_and(|required| capacity_km_s >= required)
    }

    fn zone_info(&self, zone: ZoneId) -> Option<ZoneInfo>;
}

// ---------------------------------------------------------------------------
// Reference oracle
// ---------------------------------------------------------------------------

/// Circular-orbit Hohmann model of the solar system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HohmannOracle {
    zones: BTreeMap<ZoneId, ZoneInfo>,
    bulk_density: f64,
}

impl Default for HohmannOracle {
    fn default() -> Self {
        Self::new()
    }
}

impl HohmannOracle {
    pub fn new() -> Self {
        Self {
            zones: BTreeMap::new(),
            bulk_density: DEFAULT_BULK_DENSITY,
        }
    }

    pub fn with_zone(mut self, id: ZoneId, info: ZoneInfo) -> Self {
        self.insert(id, info);
        self
    }

    pub fn insert(&mut self, id: ZoneId, info: ZoneInfo) {
        self.zones.insert(id, info);
    }

    pub fn set_bulk_density(&mut self, kg_per_m3: f64) {
        if kg_per_m3 > 0.0 {
            self.bulk_density = kg_per_m3;
        }
    }

    pub fn zone_count(&self) -> usize {
        self.zones.len()
    }

    /// Radius of a standard zone by name, if it is one.
    pub fn default_radius_au(name: &str) -> Option<f64> {
        DEFAULT_RADII_AU
            .iter()
            .find(|(zone, _)| *zone == name)
            .map(|(_, r)| *r)
    }

    /// Two-burn Hohmann delta-v between circular orbits, km/s.
    pub fn interplanetary_delta_v(r1_au: f64, r2_au: f64) -> f64 {
        if r1_au <= 0.0 || r2_au <= 0.0 {
            return 0.0;
        }
        let r1 = r1_au * AU_M;
        let r2 = r2_au * AU_M;
        let sum = r1 + r2;
        let dv1 = (SUN_MU / r1).sqrt() * ((2.0 * r2 / sum).sqrt() - 1.0);
        let dv2 = (SUN_MU / r2).sqrt() * (1.0 - (2.0 * r1 / sum).sqrt());
        (dv1.abs() + dv2.abs()) / 1000.0
    }

    /// Half the period of the transfer ellipse, days.
    pub fn hohmann_time_days(r1_au: f64, r2_au: f64) -> f64 {
        let a = (r1_au + r2_au) / 2.0;
        0.5 * DAYS_PER_YEAR * a.max(0.0).powf(1.5)
    }

    fn is_local(from: &ZoneInfo, to: &ZoneInfo) -> bool {
        (from.radius_au - to.radius_au).abs() < f64::EPSILON && (from.is_moon || to.is_moon)
    }
}

impl OrbitalOracle for HohmannOracle {
    fn hohmann_delta_v(&self, from: ZoneId, to: ZoneId) -> Option<f64> {
        let a = self.zones.get(&from)?;
        let b = self.zones.get(&to)?;
        let mut dv = Self::interplanetary_delta_v(a.radius_au, b.radius_au);
        if a.is_moon {
            dv += a.delta_v_to_parent_km_s;
        }
        if b.is_moon {
            dv += b.delta_v_to_parent_km_s;
        }
        Some(dv)
    }

    fn escape_delta_v(&self, _zone: ZoneId, current_mass_kg: f64) -> f64 {
        if current_mass_kg <= 0.0 {
            return 0.0;
        }
        let radius_m = (3.0 * current_mass_kg / (4.0 * PI * self.bulk_density)).cbrt();
        (2.0 * GRAVITATIONAL_CONSTANT * current_mass_kg / radius_m).sqrt() / 1000.0
    }

    fn transfer_time_with_boost(
        &self,
        from: ZoneId,
        to: ZoneId,
        skills: &SkillSnapshot,
        mass_driver_velocity: f64,
        current_mass_kg: f64,
        probe_bonus: f64,
    ) -> Option<f64> {
        let a = self.zones.get(&from)?;
        let b = self.zones.get(&to)?;
        let base = if Self::is_local(a, b) {
            LOCAL_TRANSFER_DAYS
        } else {
            Self::hohmann_time_days(a.radius_au, b.radius_au)
        };

        let required = self.total_delta_v(from, to, current_mass_kg)?;
        if required <= 0.0 {
            return Some(base);
        }
        let capacity = mass_driver_velocity + probe_bonus;
        let excess_ratio = (capacity - required).max(0.0) / required;
        let speedup = 1.0 + excess_ratio * skills.propulsion_multiplier().max(0.0);
        Some((base / speedup).max(base * MIN_TRAVEL_FRACTION))
    }

    fn zone_info(&self, zone: ZoneId) -> Option<ZoneInfo> {
        self.zones.get(&zone).cloned()
    }
}
