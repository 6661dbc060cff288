//! Tuning constants for the transfer subsystem.
//!
//! Every value has a default matching the shipped game balance, so a
//! `TransferConfig::default()` reproduces the reference behaviour exactly.
//! Data files only need to list the fields they override.

use serde::{Deserialize, Serialize};

/// Standard gravity in m/s², used to turn specific impulse into exhaust velocity.
pub const STANDARD_GRAVITY: f64 = 9.80665;

/// Seconds per simulation day.
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Base stats of a single mass driver before research upgrades.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MassDriverSpec {
    /// Muzzle velocity in km/s.
    pub muzzle_velocity_km_s: f64,
    /// Electrical power drawn per driver in watts.
    pub power_watts: f64,
    /// Fraction of electrical power converted into kinetic energy (0..1).
    pub efficiency: f64,
}

impl Default for MassDriverSpec {
    fn default() -> Self {
        Self {
            muzzle_velocity_km_s: 3.0,
            power_watts: 10_000_000.0,
            efficiency: 0.5,
        }
    }
}

/// Configuration for the transfer subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Smallest probe batch a continuous transfer will dispatch.
    pub min_probe_batch: f64,
    /// Smallest metal batch (kg) a continuous transfer will dispatch.
    pub min_metal_batch_kg: f64,
    /// Specific impulse of probe engines before research, in seconds.
    pub base_isp_seconds: f64,
    /// Gravity constant used for exhaust velocity.
    pub standard_gravity: f64,
    /// Dry mass of one probe in kg.
    pub probe_mass_kg: f64,
    /// Delta-v a probe can contribute on its own, in km/s.
    pub probe_base_delta_v_km_s: f64,
    /// Mass driver base stats.
    pub mass_driver: MassDriverSpec,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            min_probe_batch: 1.0,
            min_metal_batch_kg: 100.0,
            base_isp_seconds: 500.0,
            standard_gravity: STANDARD_GRAVITY,
            probe_mass_kg: 100.0,
            probe_base_delta_v_km_s: 30.0,
            mass_driver: MassDriverSpec::default(),
        }
    }
}

/// A configuration value outside its meaningful range.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("invalid transfer config: {field} = {value} ({reason})")]
pub struct ConfigError {
    pub field: &'static str,
    pub value: f64,
    pub reason: &'static str,
}

impl TransferConfig {
    /// Check every field for physically meaningful values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("min_probe_batch", self.min_probe_batch),
            ("min_metal_batch_kg", self.min_metal_batch_kg),
            ("base_isp_seconds", self.base_isp_seconds),
            ("standard_gravity", self.standard_gravity),
            ("probe_mass_kg", self.probe_mass_kg),
        ];
        for (field, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError { field, value, reason: "must be positive" });
            }
        }

        let non_negative = [
            ("probe_base_delta_v_km_s", self.probe_base_delta_v_km_s),
            ("mass_driver.muzzle_velocity_km_s", self.mass_driver.muzzle_velocity_km_s),
            ("mass_driver.power_watts", self.mass_driver.power_watts),
        ];
        for (field, value) in non_negative {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError { field, value, reason: "must be non-negative" });
            }
        }

        let eff = self.mass_driver.efficiency;
        if !(eff > 0.0 && eff <= 1.0) {
            return Err(ConfigError {
                field: "mass_driver.efficiency",
                value: eff,
                reason: "must be in (0, 1]",
            });
        }
        Ok(())
    }

    /// Minimum batch size for the given resource kind.
    pub fn min_batch(&self, is_metal: bool) -> f64 {
        if is_metal {
            self.min_metal_batch_kg
        } else {
            self.min_probe_batch
        }
    }
}
