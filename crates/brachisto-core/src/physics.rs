//! Per-call view of everything the cost model reads.
//!
//! [`Physics`] bundles the oracle, economic rules, configuration and the
//! current skill snapshot so that the propellant, reachability and capacity
//! code can take a single borrowed argument. It owns nothing.

use crate::config::{SECONDS_PER_DAY, TransferConfig};
use crate::id::ZoneId;
use crate::oracle::OrbitalOracle;
use crate::skills::{EconomicRules, SkillSnapshot, UpgradeCategory};
use crate::zone::{Resource, Zone};

/// Launch speeds below this (m/s) are treated as this value when converting
/// driver power into throughput.
const MIN_LAUNCH_SPEED_M_S: f64 = 1.0;

#[derive(Clone, Copy)]
pub struct Physics<'a> {
    pub oracle: &'a dyn OrbitalOracle,
    pub rules: &'a EconomicRules,
    pub config: &'a TransferConfig,
    pub skills: &'a SkillSnapshot,
}

impl std::fmt::Debug for Physics<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Physics")
            .field("rules", self.rules)
            .field("config", self.config)
            .field("skills", self.skills)
            .finish_non_exhaustive()
    }
}

impl<'a> Physics<'a> {
    pub fn new(
        oracle: &'a dyn OrbitalOracle,
        rules: &'a EconomicRules,
        config: &'a TransferConfig,
        skills: &'a SkillSnapshot,
    ) -> Self {
        Self {
            oracle,
            rules,
            config,
            skills,
        }
    }

    // -----------------------------------------------------------------------
    // Mass drivers
    // -----------------------------------------------------------------------

    /// Upgraded muzzle velocity of one mass driver, km/s.
    pub fn muzzle_velocity(&self) -> f64 {
        let base = self.config.mass_driver.muzzle_velocity_km_s
            * self.rules.factor(UpgradeCategory::MassDriverMuzzleVelocity, self.skills);
        (base + self.skills.mass_driver_dv_bonus).max(0.0)
    }

    /// Muzzle velocity available to launches from `zone`: zero without drivers.
    pub fn launch_assist(&self, zone: &Zone) -> f64 {
        if zone.has_mass_driver() {
            self.muzzle_velocity()
        } else {
            0.0
        }
    }

    /// Upgraded electrical power of one driver, W.
    pub fn driver_power_watts(&self) -> f64 {
        self.config.mass_driver.power_watts
            * self.rules.factor(UpgradeCategory::MassDriverPower, self.skills)
    }

    /// Upgraded conversion efficiency of one driver, capped at 1.
    pub fn driver_efficiency(&self) -> f64 {
        (self.config.mass_driver.efficiency
            * self.rules.factor(UpgradeCategory::MassDriverEfficiency, self.skills))
        .clamp(0.0, 1.0)
    }

    /// Kilograms per day all of `zone`'s drivers can launch at `speed_km_s`.
    pub fn driver_throughput(&self, zone: &Zone, speed_km_s: f64) -> f64 {
        if !zone.has_mass_driver() {
            return 0.0;
        }
        let v = (speed_km_s * 1000.0).max(MIN_LAUNCH_SPEED_M_S);
        let joules_per_kg = 0.5 * v * v;
        let joules_per_day =
            zone.mass_drivers as f64 * self.driver_power_watts() * self.driver_efficiency() * SECONDS_PER_DAY;
        joules_per_day / joules_per_kg
    }

    // -----------------------------------------------------------------------
    // Rockets
    // -----------------------------------------------------------------------

    /// Exhaust velocity of probe engines, m/s.
    pub fn exhaust_velocity(&self) -> f64 {
        self.config.base_isp_seconds * self.skills.propulsion_multiplier() * self.config.standard_gravity
    }

    /// Flat delta-v a probe brings on its own, km/s.
    pub fn probe_delta_v(&self) -> f64 {
        self.config.probe_base_delta_v_km_s + self.skills.probe_dv_bonus
    }

    /// Launch mass of `amount` units of `resource`, kg.
    pub fn payload_mass(&self, resource: Resource, amount: f64) -> f64 {
        resource.mass_kg(amount, self.config.probe_mass_kg)
    }

    // -----------------------------------------------------------------------
    // Routes
    // -----------------------------------------------------------------------

    /// Travel time in days for a launch from `from` to `to`.
    ///
    /// Probes fly with their research bonus on top of any driver assist;
    /// metal relies on the drivers alone.
    pub fn travel_time(&self, from: &Zone, to: ZoneId, resource: Resource) -> Option<f64> {
        let bonus = match resource {
            Resource::Probes(_) => self.skills.probe_dv_bonus,
            Resource::Metal => 0.0,
        };
        self.oracle
            .transfer_time_with_boost(
                from.id,
                to,
                self.skills,
                self.launch_assist(from),
                from.mass_remaining,
                bonus,
            )
            .map(|days| days.max(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skills::Skill;
    use crate::test_utils::TableOracle;

    fn fixture() -> (TableOracle, EconomicRules, TransferConfig) {
        (TableOracle::new(), EconomicRules::default(), TransferConfig::default())
    }

    #[test]
    fn muzzle_velocity_includes_flat_bonus() {
        let (oracle, rules, config) = fixture();
        let mut skills = SkillSnapshot::new();
        skills.mass_driver_dv_bonus = 1.5;
        let phys = Physics::new(&oracle, &rules, &config, &skills);
        assert!((phys.muzzle_velocity() - 4.5).abs() < 1e-12);
    }

    #[test]
    fn muzzle_velocity_scales_with_locomotion() {
        let (oracle, rules, config) = fixture();
        let skills = SkillSnapshot::new().with(Skill::Locomotion, 3.0);
        let phys = Physics::new(&oracle, &rules, &config, &skills);
        // factor = 1 + 0.5 * 2 = 2
        assert!((phys.muzzle_velocity() - 6.0).abs() < 1e-12);
    }

    #[test]
    fn no_drivers_no_assist_no_throughput() {
        let (oracle, rules, config) = fixture();
        let skills = SkillSnapshot::new();
        let phys = Physics::new(&oracle, &rules, &config, &skills);
        let zone = Zone::new(ZoneId(0), "bare");
        assert_eq!(phys.launch_assist(&zone), 0.0);
        assert_eq!(phys.driver_throughput(&zone, 3.0), 0.0);
    }

    #[test]
    fn throughput_is_energy_budget_over_kinetic_energy() {
        let (oracle, rules, mut config) = fixture();
        config.mass_driver.power_watts = 12_000.0;
        config.mass_driver.efficiency = 1.0;
        let skills = SkillSnapshot::new();
        let phys = Physics::new(&oracle, &rules, &config, &skills);
        let zone = Zone::new(ZoneId(0), "yard").with_mass_drivers(1);
        // 12 kW * 86400 s / (0.5 * 1440²) = 1000 kg/day
        assert!((phys.driver_throughput(&zone, 1.44) - 1000.0).abs() < 1e-6);

        let two = zone.clone().with_mass_drivers(2);
        assert!((phys.driver_throughput(&two, 1.44) - 2000.0).abs() < 1e-6);
    }

    #[test]
    fn efficiency_upgrade_is_capped() {
        let (oracle, rules, config) = fixture();
        let skills = SkillSnapshot::new().with(Skill::EnergyConversion, 10.0);
        let phys = Physics::new(&oracle, &rules, &config, &skills);
        assert_eq!(phys.driver_efficiency(), 1.0);
    }

    #[test]
    fn exhaust_velocity_from_isp() {
        let (oracle, rules, config) = fixture();
        let skills = SkillSnapshot::new().with(Skill::Propulsion, 2.0);
        let phys = Physics::new(&oracle, &rules, &config, &skills);
        assert!((phys.exhaust_velocity() - 500.0 * 2.0 * 9.80665).abs() < 1e-9);
    }
}
