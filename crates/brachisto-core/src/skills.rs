//! Research-derived multipliers consumed by the transfer subsystem.
//!
//! The tech tree lives outside this crate. Each tick the engine hands the
//! transfer system a [`SkillSnapshot`] with the current skill values; the
//! [`EconomicRules`] turn those into upgrade factors with the weighted-sum
//! formula `factor = 1 + Σ weightᵢ × (skillᵢ − 1)`.
//!
//! Skill names coming from data files are resolved once, at load time,
//! through a static alias table ([`Skill::from_name`]). Nothing in the tick
//! path deals with strings.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Skills
// ---------------------------------------------------------------------------

/// A research skill whose value is a multiplier (1.0 = no research).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Skill {
    Propulsion,
    Locomotion,
    AttitudeControl,
    Robotics,
    ProductionEfficiency,
    EnergyCollection,
    EnergyStorage,
    EnergyTransport,
    EnergyConversion,
}

/// Accepted spellings for each skill. The first entry per skill is canonical.
const SKILL_ALIASES: &[(&str, Skill)] = &[
    ("propulsion_systems", Skill::Propulsion),
    ("propulsion", Skill::Propulsion),
    ("isp", Skill::Propulsion),
    ("locomotion_systems", Skill::Locomotion),
    ("locomotion", Skill::Locomotion),
    ("acds", Skill::AttitudeControl),
    ("attitude_control", Skill::AttitudeControl),
    ("robotic_systems", Skill::Robotics),
    ("robotics", Skill::Robotics),
    ("production_efficiency", Skill::ProductionEfficiency),
    ("production", Skill::ProductionEfficiency),
    ("energy_collection", Skill::EnergyCollection),
    ("solar_pv", Skill::EnergyCollection),
    ("energy_storage", Skill::EnergyStorage),
    ("battery_density", Skill::EnergyStorage),
    ("energy_transport", Skill::EnergyTransport),
    ("transport", Skill::EnergyTransport),
    ("energy_conversion", Skill::EnergyConversion),
    ("conversion", Skill::EnergyConversion),
];

impl Skill {
    pub const ALL: [Skill; 9] = [
        Skill::Propulsion,
        Skill::Locomotion,
        Skill::AttitudeControl,
        Skill::Robotics,
        Skill::ProductionEfficiency,
        Skill::EnergyCollection,
        Skill::EnergyStorage,
        Skill::EnergyTransport,
        Skill::EnergyConversion,
    ];

    /// Resolve a skill by any of its accepted names (case-insensitive).
    pub fn from_name(name: &str) -> Option<Skill> {
        let name = name.trim().to_ascii_lowercase();
        SKILL_ALIASES
            .iter()
            .find(|(alias, _)| *alias == name)
            .map(|(_, skill)| *skill)
    }

    /// The canonical data-file name of this skill.
    pub fn canonical_name(self) -> &'static str {
        SKILL_ALIASES
            .iter()
            .find(|(_, skill)| *skill == self)
            .map(|(alias, _)| *alias)
            .unwrap_or("unknown")
    }
}

impl fmt::Display for Skill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.canonical_name())
    }
}

impl FromStr for Skill {
    type Err = SkillError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Skill::from_name(s).ok_or_else(|| SkillError::UnknownSkill(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Upgrade categories
// ---------------------------------------------------------------------------

/// A coefficient bundle combined from several skills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum UpgradeCategory {
    MassDriverPower,
    MassDriverEfficiency,
    MassDriverMuzzleVelocity,
}

impl UpgradeCategory {
    pub const ALL: [UpgradeCategory; 3] = [
        UpgradeCategory::MassDriverPower,
        UpgradeCategory::MassDriverEfficiency,
        UpgradeCategory::MassDriverMuzzleVelocity,
    ];

    pub fn name(self) -> &'static str {
        match self {
            UpgradeCategory::MassDriverPower => "mass_driver_power",
            UpgradeCategory::MassDriverEfficiency => "mass_driver_efficiency",
            UpgradeCategory::MassDriverMuzzleVelocity => "mass_driver_muzzle_velocity",
        }
    }

    pub fn from_name(name: &str) -> Option<UpgradeCategory> {
        let name = name.trim().to_ascii_lowercase();
        UpgradeCategory::ALL.into_iter().find(|c| c.name() == name)
    }
}

impl FromStr for UpgradeCategory {
    type Err = SkillError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UpgradeCategory::from_name(s).ok_or_else(|| SkillError::UnknownCategory(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised while resolving skill data.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SkillError {
    #[error("unknown skill name '{0}'")]
    UnknownSkill(String),

    #[error("unknown upgrade category '{0}'")]
    UnknownCategory(String),

    #[error("weight for {skill} in {category} must be finite, got {weight}")]
    InvalidWeight {
        category: &'static str,
        skill: Skill,
        weight: f64,
    },
}

// ---------------------------------------------------------------------------
// Skill snapshot
// ---------------------------------------------------------------------------

/// Skill values and flat research bonuses at one point in time.
///
/// Missing skills read as 1.0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkillSnapshot {
    values: BTreeMap<Skill, f64>,
    /// Flat delta-v added to every probe launch, km/s.
    pub probe_dv_bonus: f64,
    /// Flat delta-v added to base mass-driver muzzle velocity, km/s.
    pub mass_driver_dv_bonus: f64,
}

impl SkillSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, skill: Skill, value: f64) -> Self {
        self.set(skill, value);
        self
    }

    pub fn set(&mut self, skill: Skill, value: f64) {
        self.values.insert(skill, value);
    }

    pub fn get(&self, skill: Skill) -> f64 {
        self.values.get(&skill).copied().unwrap_or(1.0)
    }

    /// Multiplier applied to base specific impulse.
    pub fn propulsion_multiplier(&self) -> f64 {
        self.get(Skill::Propulsion)
    }
}

// ---------------------------------------------------------------------------
// Economic rules
// ---------------------------------------------------------------------------

/// Per-category skill weights used by the upgrade formula.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EconomicRules {
    weights: BTreeMap<UpgradeCategory, Vec<(Skill, f64)>>,
}

impl Default for EconomicRules {
    fn default() -> Self {
        let mut weights = BTreeMap::new();
        weights.insert(
            UpgradeCategory::MassDriverPower,
            vec![(Skill::EnergyTransport, 0.5), (Skill::EnergyConversion, 0.5)],
        );
        weights.insert(
            UpgradeCategory::MassDriverEfficiency,
            vec![(Skill::EnergyConversion, 0.6), (Skill::Robotics, 0.4)],
        );
        weights.insert(
            UpgradeCategory::MassDriverMuzzleVelocity,
            vec![(Skill::Locomotion, 0.5), (Skill::EnergyTransport, 0.5)],
        );
        Self { weights }
    }
}

impl EconomicRules {
    /// Rules with no weights at all; every factor is 1.0.
    pub fn flat() -> Self {
        Self {
            weights: BTreeMap::new(),
        }
    }

    /// Replace the weights of one category.
    pub fn set_weights(
        &mut self,
        category: UpgradeCategory,
        weights: Vec<(Skill, f64)>,
    ) -> Result<(), SkillError> {
        for &(skill, weight) in &weights {
            if !weight.is_finite() {
                return Err(SkillError::InvalidWeight {
                    category: category.name(),
                    skill,
                    weight,
                });
            }
        }
        self.weights.insert(category, weights);
        Ok(())
    }

    pub fn weights(&self, category: UpgradeCategory) -> &[(Skill, f64)] {
        self.weights.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }

    /// `1 + Σ weight × (skill − 1)`, floored at zero.
    pub fn factor(&self, category: UpgradeCategory, skills: &SkillSnapshot) -> f64 {
        let bonus: f64 = self
            .weights(category)
            .iter()
            .map(|&(skill, weight)| weight * (skills.get(skill) - 1.0))
            .sum();
        (1.0 + bonus).max(0.0)
    }
}
