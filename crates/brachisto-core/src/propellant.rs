//! Rocket-equation fuel requirements.
//!
//! Fuel is computed for the whole trip (`escape + Hohmann`) and then scaled
//! down by the share of delta-v the origin's mass drivers do not cover.

use crate::id::ZoneId;
use crate::physics::Physics;
use crate::zone::Zone;

/// Breakdown of a fuel computation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FuelEstimate {
    /// Escape plus Hohmann delta-v, km/s.
    pub total_delta_v: f64,
    /// Delta-v supplied by mass drivers, km/s, capped at `total_delta_v`.
    pub mass_driver_credit: f64,
    /// Share of the trip flown on onboard propulsion (0..1).
    pub probe_fraction: f64,
    /// Methalox to burn, kg.
    pub fuel_kg: f64,
}

impl FuelEstimate {
    const NONE: FuelEstimate = FuelEstimate {
        total_delta_v: 0.0,
        mass_driver_credit: 0.0,
        probe_fraction: 0.0,
        fuel_kg: 0.0,
    };
}

/// Tsiolkovsky propellant mass for `payload_kg` to gain `delta_v_km_s` at
/// exhaust velocity `exhaust_m_s`.
pub fn rocket_fuel(payload_kg: f64, delta_v_km_s: f64, exhaust_m_s: f64) -> f64 {
    if payload_kg <= 0.0 || delta_v_km_s <= 0.0 || exhaust_m_s <= 0.0 {
        return 0.0;
    }
    let fuel = payload_kg * ((delta_v_km_s * 1000.0 / exhaust_m_s).exp() - 1.0);
    if fuel.is_finite() { fuel.max(0.0) } else { f64::MAX }
}

/// Full fuel breakdown for launching `payload_kg` from `from` to `to`.
///
/// Degenerate routes (unknown zones or non-positive Hohmann delta-v) cost
/// nothing here; the reachability gate rejects them.
pub fn estimate(phys: &Physics<'_>, from: &Zone, to: ZoneId, payload_kg: f64) -> FuelEstimate {
    let Some(hohmann) = phys.oracle.hohmann_delta_v(from.id, to) else {
        return FuelEstimate::NONE;
    };
    if hohmann.is_nan() || hohmann <= 0.0 {
        return FuelEstimate::NONE;
    }
    let total = hohmann + phys.oracle.escape_delta_v(from.id, from.mass_remaining).max(0.0);

    let credit = phys.launch_assist(from).min(total);
    let probe_fraction = ((total - credit).max(0.0) / total).clamp(0.0, 1.0);
    let whole_trip = rocket_fuel(payload_kg, total, phys.exhaust_velocity());

    FuelEstimate {
        total_delta_v: total,
        mass_driver_credit: credit,
        probe_fraction,
        fuel_kg: whole_trip * probe_fraction,
    }
}

/// Methalox in kg needed to launch `payload_kg` from `from` to `to`.
pub fn fuel_required(phys: &Physics<'_>, from: &Zone, to: ZoneId, payload_kg: f64) -> f64 {
    estimate(phys, from, to, payload_kg).fuel_kg
}
