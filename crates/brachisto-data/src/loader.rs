//! Resolution pipeline: reads data files, resolves names, builds core types.
//!
//! Provides format detection (RON/JSON/TOML), file discovery, and
//! deserialization helpers, plus [`load_transfer_data`] which turns a data
//! directory into a config, economic rules and a populated orbital oracle.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use brachisto_core::config::{ConfigError, TransferConfig};
use brachisto_core::engine::TransferSystem;
use brachisto_core::id::ZoneId;
use brachisto_core::oracle::{HohmannOracle, ZoneInfo};
use brachisto_core::skills::{EconomicRules, Skill, UpgradeCategory};
use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::schema::{CategoryWeightsData, ZoneData};

/// Base names of the files read from a data directory.
pub const TRANSFER_CONFIG_FILE: &str = "transfer_config";
pub const ECONOMIC_RULES_FILE: &str = "economic_rules";
pub const ORBITAL_ZONES_FILE: &str = "orbital_zones";

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur during data loading.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// A required data file was not found in the given directory.
    #[error("required file '{file}' not found in {dir}")]
    MissingRequired { file: String, dir: PathBuf },

    /// The file has an extension we don't support.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// Two files with the same base name but different formats exist.
    #[error("conflicting formats: {a} and {b}")]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    /// A deserialization error occurred.
    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// A name reference could not be resolved.
    #[error("unresolved {expected_kind} reference '{name}' in {file}")]
    UnresolvedRef {
        file: PathBuf,
        name: String,
        expected_kind: &'static str,
    },

    /// A duplicate name was found.
    #[error("duplicate name '{name}' in {file}")]
    DuplicateName { file: PathBuf, name: String },

    /// The file parsed but its values are out of range.
    #[error("invalid value in {file}: {detail}")]
    Invalid { file: PathBuf, detail: String },

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

/// Supported data file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

/// Detect the format of a file based on its extension.
pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

// ===========================================================================
// File discovery
// ===========================================================================

/// Scan a directory for a data file with the given base name.
///
/// Looks for `{base_name}.ron`, `{base_name}.toml` and `{base_name}.json`.
/// Returns `Ok(None)` if no file is found, or `Err(ConflictingFormats)` if
/// more than one format exists for the same base name.
pub fn find_data_file(dir: &Path, base_name: &str) -> Result<Option<PathBuf>, DataLoadError> {
    let mut found: Option<PathBuf> = None;

    for ext in ["ron", "toml", "json"] {
        let candidate = dir.join(format!("{base_name}.{ext}"));
        if candidate.exists() {
            if let Some(existing) = found {
                return Err(DataLoadError::ConflictingFormats {
                    a: existing,
                    b: candidate,
                });
            }
            found = Some(candidate);
        }
    }

    Ok(found)
}

/// Like [`find_data_file`], but returns an error if no file is found.
pub fn require_data_file(dir: &Path, base_name: &str) -> Result<PathBuf, DataLoadError> {
    find_data_file(dir, base_name)?.ok_or_else(|| DataLoadError::MissingRequired {
        file: base_name.to_string(),
        dir: dir.to_path_buf(),
    })
}

// ===========================================================================
// Deserialization
// ===========================================================================

fn parse_error(path: &Path, detail: impl ToString) -> DataLoadError {
    DataLoadError::Parse {
        file: path.to_path_buf(),
        detail: detail.to_string(),
    }
}

/// Read a file and deserialize it according to its format.
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;

    match format {
        Format::Ron => ron::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Json => serde_json::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Toml => toml::from_str(&content).map_err(|e| parse_error(path, e)),
    }
}

/// Deserialize a list from a file. TOML files hold the array under
/// `toml_key` in a top-level table; RON and JSON hold a bare list.
pub fn deserialize_list<T: DeserializeOwned>(
    path: &Path,
    toml_key: &str,
) -> Result<Vec<T>, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;

    match format {
        Format::Ron => ron::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Json => serde_json::from_str(&content).map_err(|e| parse_error(path, e)),
        Format::Toml => {
            let table: toml::Value = toml::from_str(&content).map_err(|e| parse_error(path, e))?;
            let array = table
                .get(toml_key)
                .ok_or_else(|| parse_error(path, format!("missing key '{toml_key}' in TOML file")))?
                .clone();
            array
                .try_into()
                .map_err(|e: toml::de::Error| parse_error(path, e))
        }
    }
}

// ===========================================================================
// Name resolution helpers
// ===========================================================================

/// Look up a name in a map, returning an `UnresolvedRef` error if not found.
pub fn resolve_name<'a, V>(
    map: &'a HashMap<String, V>,
    name: &str,
    file: &Path,
    expected_kind: &'static str,
) -> Result<&'a V, DataLoadError> {
    map.get(name).ok_or_else(|| DataLoadError::UnresolvedRef {
        file: file.to_path_buf(),
        name: name.to_string(),
        expected_kind,
    })
}

/// Check whether a name already exists in a map, returning a `DuplicateName`
/// error if so.
pub fn check_duplicate<V>(
    map: &HashMap<String, V>,
    name: &str,
    file: &Path,
) -> Result<(), DataLoadError> {
    if map.contains_key(name) {
        Err(DataLoadError::DuplicateName {
            file: file.to_path_buf(),
            name: name.to_string(),
        })
    } else {
        Ok(())
    }
}

// ===========================================================================
// Section loaders
// ===========================================================================

/// Read `transfer_config`, falling back to defaults when the file is absent.
pub fn load_transfer_config(dir: &Path) -> Result<TransferConfig, DataLoadError> {
    let Some(path) = find_data_file(dir, TRANSFER_CONFIG_FILE)? else {
        return Ok(TransferConfig::default());
    };
    let config: TransferConfig = deserialize_file(&path)?;
    config.validate().map_err(|e| DataLoadError::Invalid {
        file: path.clone(),
        detail: e.to_string(),
    })?;
    Ok(config)
}

/// Read `economic_rules`, falling back to defaults when the file is absent.
///
/// Categories listed in the file replace the default weights of that
/// category; unlisted categories keep their defaults.
pub fn load_economic_rules(dir: &Path) -> Result<EconomicRules, DataLoadError> {
    let mut rules = EconomicRules::default();
    let Some(path) = find_data_file(dir, ECONOMIC_RULES_FILE)? else {
        return Ok(rules);
    };
    let categories: Vec<CategoryWeightsData> = deserialize_list(&path, "categories")?;

    let mut seen: HashMap<String, usize> = HashMap::new();
    for (index, entry) in categories.iter().enumerate() {
        let category = UpgradeCategory::from_name(&entry.category).ok_or_else(|| {
            DataLoadError::UnresolvedRef {
                file: path.clone(),
                name: entry.category.clone(),
                expected_kind: "upgrade category",
            }
        })?;
        check_duplicate(&seen, category.name(), &path)?;
        seen.insert(category.name().to_string(), index);

        let weights = entry
            .weights
            .iter()
            .map(|w| {
                let (name, weight) = w.parts();
                Skill::from_name(name)
                    .map(|skill| (skill, weight))
                    .ok_or_else(|| DataLoadError::UnresolvedRef {
                        file: path.clone(),
                        name: name.to_string(),
                        expected_kind: "skill",
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        rules
            .set_weights(category, weights)
            .map_err(|e| DataLoadError::Invalid {
                file: path.clone(),
                detail: e.to_string(),
            })?;
    }
    debug!(categories = categories.len(), "economic rules loaded");
    Ok(rules)
}

/// Zones resolved from `orbital_zones`: the oracle plus the name table.
#[derive(Debug, Clone)]
pub struct OrbitalZones {
    pub oracle: HohmannOracle,
    /// Zone names indexed by `ZoneId`.
    pub names: Vec<String>,
    pub ids: HashMap<String, ZoneId>,
}

/// Read the required `orbital_zones` file. Zone ids follow file order.
pub fn load_orbital_zones(dir: &Path) -> Result<OrbitalZones, DataLoadError> {
    let path = require_data_file(dir, ORBITAL_ZONES_FILE)?;
    let zones: Vec<ZoneData> = deserialize_list(&path, "zones")?;

    let mut ids: HashMap<String, ZoneId> = HashMap::new();
    for (index, zone) in zones.iter().enumerate() {
        check_duplicate(&ids, &zone.name, &path)?;
        ids.insert(zone.name.clone(), ZoneId(index as u32));
    }

    let invalid = |detail: String| DataLoadError::Invalid {
        file: path.clone(),
        detail,
    };

    // Planets first so moons can take their parent's radius.
    let mut radii: HashMap<String, f64> = HashMap::new();
    for zone in zones.iter().filter(|z| !z.is_moon) {
        let radius = zone
            .radius_au
            .or_else(|| HohmannOracle::default_radius_au(&zone.name))
            .ok_or_else(|| invalid(format!("zone '{}' has no radius_au", zone.name)))?;
        if !(radius.is_finite() && radius > 0.0) {
            return Err(invalid(format!("zone '{}' radius_au must be positive, got {radius}", zone.name)));
        }
        radii.insert(zone.name.clone(), radius);
    }

    let mut oracle = HohmannOracle::new();
    for zone in &zones {
        if !(zone.total_mass_kg.is_finite() && zone.total_mass_kg >= 0.0) {
            return Err(invalid(format!("zone '{}' total_mass_kg must be non-negative", zone.name)));
        }
        let id = ids[&zone.name];
        let info = if zone.is_moon {
            let parent_name = zone
                .parent
                .as_deref()
                .ok_or_else(|| invalid(format!("moon '{}' has no parent", zone.name)))?;
            let parent = *resolve_name(&ids, parent_name, &path, "zone")?;
            let parent_radius = *radii
                .get(parent_name)
                .ok_or_else(|| invalid(format!("moon '{}' orbits another moon '{parent_name}'", zone.name)))?;
            ZoneInfo::moon(parent, parent_radius, zone.total_mass_kg, zone.delta_v_to_parent_km_s)
        } else {
            ZoneInfo::planet(radii[&zone.name], zone.total_mass_kg)
        };
        oracle.insert(id, info);
    }

    Ok(OrbitalZones {
        oracle,
        names: zones.into_iter().map(|z| z.name).collect(),
        ids,
    })
}

// ===========================================================================
// Full load
// ===========================================================================

/// Everything the transfer subsystem reads from a data directory.
#[derive(Debug, Clone)]
pub struct TransferData {
    pub config: TransferConfig,
    pub rules: EconomicRules,
    pub zones: OrbitalZones,
}

impl TransferData {
    pub fn zone_id(&self, name: &str) -> Option<ZoneId> {
        self.zones.ids.get(name).copied()
    }

    pub fn zone_name(&self, id: ZoneId) -> Option<&str> {
        self.zones.names.get(id.0 as usize).map(String::as_str)
    }

    /// A transfer system with this config, rules and oracle. Zones (their
    /// stock) are added by the caller.
    pub fn build_system(&self) -> Result<TransferSystem, ConfigError> {
        Ok(TransferSystem::new(Box::new(self.zones.oracle.clone()))
            .with_config(self.config.clone())?
            .with_rules(self.rules.clone()))
    }
}

/// Load `transfer_config`, `economic_rules` and `orbital_zones` from `dir`.
///
/// Only `orbital_zones` is required.
pub fn load_transfer_data(dir: &Path) -> Result<TransferData, DataLoadError> {
    let config = load_transfer_config(dir)?;
    let rules = load_economic_rules(dir)?;
    let zones = load_orbital_zones(dir)?;
    info!(dir = %dir.display(), zones = zones.names.len(), "transfer data loaded");
    Ok(TransferData {
        config,
        rules,
        zones,
    })
}

// ===========================================================================
// Tests
// ===========================================================================
