//! Serde data file structs for transfer subsystem content.
//!
//! These structs define the on-disk format for economic rules and orbital
//! zones. `TransferConfig` is read directly from its core definition. Names
//! in these files are resolved into core types by the loader.

use serde::Deserialize;

// ===========================================================================
// Economic rules
// ===========================================================================

/// A skill weight entry, supporting a short tuple form and a full form.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SkillWeightData {
    /// Short form: `("energy_transport", 0.5)`.
    Short(String, f64),
    /// Full form with explicit fields.
    Full { skill: String, weight: f64 },
}

impl SkillWeightData {
    pub fn parts(&self) -> (&str, f64) {
        match self {
            SkillWeightData::Short(skill, weight) => (skill.as_str(), *weight),
            SkillWeightData::Full { skill, weight } => (skill.as_str(), *weight),
        }
    }
}

/// The skill weights of one upgrade category.
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryWeightsData {
    pub category: String,
    #[serde(default)]
    pub weights: Vec<SkillWeightData>,
}

/// Wrapper for the TOML form of `economic_rules`.
#[derive(Debug, Clone, Deserialize)]
pub struct TomlCategories {
    pub categories: Vec<CategoryWeightsData>,
}

// ===========================================================================
// Orbital zones
// ===========================================================================

/// An orbital zone definition in a data file.
///
/// `radius_au` may be omitted for the standard zones (`earth`, `mars`, ...).
/// Moons take their parent's radius and need `parent`.
#[derive(Debug, Clone, Deserialize)]
pub struct ZoneData {
    pub name: String,
    #[serde(default)]
    pub radius_au: Option<f64>,
    #[serde(default)]
    pub total_mass_kg: f64,
    #[serde(default)]
    pub is_moon: bool,
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub delta_v_to_parent_km_s: f64,
}

/// Wrapper for the TOML form of `orbital_zones`.
#[derive(Debug, Clone, Deserialize)]
pub struct TomlZones {
    pub zones: Vec<ZoneData>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weight_forms_agree() {
        let short: Vec<SkillWeightData> = ron::from_str(r#"[("robotics", 0.4)]"#).unwrap();
        let full: Vec<SkillWeightData> =
            serde_json::from_str(r#"[{"skill": "robotics", "weight": 0.4}]"#).unwrap();
        assert_eq!(short[0].parts(), ("robotics", 0.4));
        assert_eq!(full[0].parts(), ("robotics", 0.4));
    }

    #[test]
    fn zone_defaults() {
        let zone: ZoneData = serde_json::from_str(r#"{"name": "mars"}"#).unwrap();
        assert_eq!(zone.radius_au, None);
        assert_eq!(zone.total_mass_kg, 0.0);
        assert!(!zone.is_moon);
        assert!(zone.parent.is_none());
    }

    #[test]
    fn toml_zone_wrapper() {
        let wrapper: TomlZones = toml::from_str(
            r#"
[[zones]]
name = "earth"
total_mass_kg = 5.97e24

[[zones]]
name = "luna"
is_moon = true
parent = "earth"
delta_v_to_parent_km_s = 3.2
"#,
        )
        .unwrap();
        assert_eq!(wrapper.zones.len(), 2);
        assert_eq!(wrapper.zones[1].parent.as_deref(), Some("earth"));
    }
}
