//! Configuration system for offloadr.
//!
//! Two layers:
//! 1. Scenario file (./offloadr.yml or ~/.config/offloadr/offloadr.yml)
//! 2. Command-line overrides

use eyre::Result;
use std::path::PathBuf;

pub use self::global::{DeviceConfig, OffloadConfig, SweepConfig, WorkloadConfig};
pub use self::overrides::ConfigOverrides;

mod global;
mod overrides;

/// Application name, used for config and log directories.
pub const APP_NAME: &str = "offloadr";

/// Scenario file name searched for in the working and config directories.
pub const PROJECT_CONFIG_FILE: &str = "offloadr.yml";

/// Load the scenario, apply overrides, then validate.
pub fn load_config(explicit_path: Option<&PathBuf>, overrides: &ConfigOverrides) -> Result<OffloadConfig> {
    let mut config = OffloadConfig::load(explicit_path)?;
    overrides.apply(&mut config);
    config.validate()?;
    Ok(config)
}
