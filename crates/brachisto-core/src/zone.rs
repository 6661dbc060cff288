//! Orbital zones and their inventories.
//!
//! A zone is the unit of storage for everything the transfer subsystem moves:
//! refined metal, methalox fuel and probe populations. Inventory mutation goes
//! through [`Zone::withdraw`], [`Zone::deposit`] and [`Zone::burn_fuel`], which
//! never let a stock go negative.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::id::{ProbeTypeId, ZoneId};

// ---------------------------------------------------------------------------
// Resource
// ---------------------------------------------------------------------------

/// What a transfer moves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Resource {
    /// Probes of one type, counted in units.
    Probes(ProbeTypeId),
    /// Refined metal, counted in kg.
    Metal,
}

impl Resource {
    /// Whether this resource can only travel by mass driver.
    pub fn is_metal(self) -> bool {
        matches!(self, Resource::Metal)
    }

    /// Launch mass in kg of `amount` units of this resource.
    pub fn mass_kg(self, amount: f64, probe_mass_kg: f64) -> f64 {
        match self {
            Resource::Probes(_) => amount * probe_mass_kg,
            Resource::Metal => amount,
        }
    }
}

// ---------------------------------------------------------------------------
// Zone
// ---------------------------------------------------------------------------

/// An orbital region with its stocks.
///
/// All mass fields are in kg and never negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub id: ZoneId,
    pub name: String,
    /// Unmined ore mass. Drives the escape delta-v of the zone.
    pub mass_remaining: f64,
    /// Refined metal available for construction or shipment.
    pub stored_metal: f64,
    /// Fuel stock.
    pub methalox: f64,
    /// Probe counts per type. Fractional counts accumulate from production.
    pub probes: BTreeMap<ProbeTypeId, f64>,
    /// Aggregate mass of probes present in the zone.
    pub probe_mass: f64,
    /// Aggregate mass of structures present in the zone.
    pub structure_mass: f64,
    /// Set once `mass_remaining` reaches zero.
    pub depleted: bool,
    /// Number of mass drivers built in this zone.
    pub mass_drivers: u32,
    /// Probes produced per day, maintained by the production system.
    pub probe_production_rate: f64,
}

impl Zone {
    /// Create an empty zone.
    pub fn new(id: ZoneId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            mass_remaining: 0.0,
            stored_metal: 0.0,
            methalox: 0.0,
            probes: BTreeMap::new(),
            probe_mass: 0.0,
            structure_mass: 0.0,
            depleted: false,
            mass_drivers: 0,
            probe_production_rate: 0.0,
        }
    }

    pub fn with_mass(mut self, kg: f64) -> Self {
        self.mass_remaining = kg.max(0.0);
        self.refresh_depletion();
        self
    }

    pub fn with_metal(mut self, kg: f64) -> Self {
        self.stored_metal = kg.max(0.0);
        self
    }

    pub fn with_methalox(mut self, kg: f64) -> Self {
        self.methalox = kg.max(0.0);
        self
    }

    /// Add probes of the given type. `probe_mass_kg` keeps the aggregate in step.
    pub fn with_probes(mut self, probe_type: ProbeTypeId, count: f64, probe_mass_kg: f64) -> Self {
        self.deposit(Resource::Probes(probe_type), count, probe_mass_kg);
        self
    }

    pub fn with_mass_drivers(mut self, count: u32) -> Self {
        self.mass_drivers = count;
        self
    }

    pub fn with_probe_production(mut self, probes_per_day: f64) -> Self {
        self.probe_production_rate = probes_per_day.max(0.0);
        self
    }

    /// Number of probes of the given type present.
    pub fn probe_count(&self, probe_type: ProbeTypeId) -> f64 {
        self.probes.get(&probe_type).copied().unwrap_or(0.0)
    }

    /// Amount of `resource` currently available for shipment.
    pub fn available(&self, resource: Resource) -> f64 {
        match resource {
            Resource::Probes(ty) => self.probe_count(ty),
            Resource::Metal => self.stored_metal,
        }
    }

    /// Remove `amount` of `resource`. Returns `false` and leaves the zone
    /// untouched if the stock is insufficient.
    pub fn withdraw(&mut self, resource: Resource, amount: f64, probe_mass_kg: f64) -> bool {
        if amount < 0.0 || self.available(resource) < amount {
            return false;
        }
        match resource {
            Resource::Probes(ty) => {
                let count = self.probes.entry(ty).or_insert(0.0);
                *count = (*count - amount).max(0.0);
                self.probe_mass = (self.probe_mass - amount * probe_mass_kg).max(0.0);
            }
            Resource::Metal => {
                self.stored_metal = (self.stored_metal - amount).max(0.0);
            }
        }
        true
    }

    /// Add `amount` of `resource`. Negative amounts are ignored.
    pub fn deposit(&mut self, resource: Resource, amount: f64, probe_mass_kg: f64) {
        if amount <= 0.0 {
            return;
        }
        match resource {
            Resource::Probes(ty) => {
                *self.probes.entry(ty).or_insert(0.0) += amount;
                self.probe_mass += amount * probe_mass_kg;
            }
            Resource::Metal => self.stored_metal += amount,
        }
    }

    /// Consume fuel. Returns `false` without consuming anything if the zone
    /// holds less than `kg`.
    pub fn burn_fuel(&mut self, kg: f64) -> bool {
        if kg < 0.0 || self.methalox < kg {
            return false;
        }
        self.methalox = (self.methalox - kg).max(0.0);
        true
    }

    /// Whether at least one mass driver is present.
    pub fn has_mass_driver(&self) -> bool {
        self.mass_drivers > 0
    }

    /// Re-derive the depletion flag from `mass_remaining`.
    pub fn refresh_depletion(&mut self) {
        if self.mass_remaining <= 0.0 {
            self.mass_remaining = 0.0;
            self.depleted = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROBE_KG: f64 = 100.0;

    fn earth() -> Zone {
        Zone::new(ZoneId(0), "earth")
            .with_metal(500.0)
            .with_methalox(200.0)
            .with_probes(ProbeTypeId::DEFAULT, 10.0, PROBE_KG)
    }

    #[test]
    fn probes_track_aggregate_mass() {
        let z = earth();
        assert_eq!(z.probe_count(ProbeTypeId::DEFAULT), 10.0);
        assert_eq!(z.probe_mass, 1000.0);
    }

    #[test]
    fn withdraw_rejects_overdraw() {
        let mut z = earth();
        assert!(!z.withdraw(Resource::Metal, 600.0, PROBE_KG));
        assert_eq!(z.stored_metal, 500.0);
        assert!(z.withdraw(Resource::Metal, 500.0, PROBE_KG));
        assert_eq!(z.stored_metal, 0.0);
    }

    #[test]
    fn withdraw_probes_reduces_mass() {
        let mut z = earth();
        assert!(z.withdraw(Resource::Probes(ProbeTypeId::DEFAULT), 4.0, PROBE_KG));
        assert_eq!(z.probe_count(ProbeTypeId::DEFAULT), 6.0);
        assert_eq!(z.probe_mass, 600.0);
    }

    #[test]
    fn unknown_probe_type_has_nothing_available() {
        let z = earth();
        assert_eq!(z.available(Resource::Probes(ProbeTypeId(7))), 0.0);
    }

    #[test]
    fn deposit_ignores_negative() {
        let mut z = earth();
        z.deposit(Resource::Metal, -50.0, PROBE_KG);
        assert_eq!(z.stored_metal, 500.0);
    }

    #[test]
    fn burn_fuel_never_goes_negative() {
        let mut z = earth();
        assert!(!z.burn_fuel(200.5));
        assert_eq!(z.methalox, 200.0);
        assert!(z.burn_fuel(200.0));
        assert_eq!(z.methalox, 0.0);
    }

    #[test]
    fn depletion_flag_follows_mass() {
        let z = Zone::new(ZoneId(1), "rock").with_mass(0.0);
        assert!(z.depleted);
        let z = Zone::new(ZoneId(2), "planet").with_mass(1e20);
        assert!(!z.depleted);
    }

    #[test]
    fn resource_launch_mass() {
        assert_eq!(Resource::Metal.mass_kg(250.0, PROBE_KG), 250.0);
        assert_eq!(Resource::Probes(ProbeTypeId::DEFAULT).mass_kg(3.0, PROBE_KG), 300.0);
    }
}
