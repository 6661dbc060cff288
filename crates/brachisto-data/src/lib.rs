//! Data-file loading for the Brachisto transfer subsystem.
//!
//! Reads `transfer_config`, `economic_rules` and `orbital_zones` from a
//! directory in RON, TOML or JSON and resolves them into core types.

pub mod loader;
pub mod schema;

pub use loader::{DataLoadError, TransferData, load_transfer_data};
