//! Scenario configuration.
//!
//! Loaded from ./offloadr.yml or ~/.config/offloadr/offloadr.yml

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::{DeviceId, ExecutionVenue, TaskVariant, VenueClass};
use crate::mobility::MobilityConfig;
use crate::network::NetworkConfig;
use crate::scheduler::{SchedulerConfig, Strategy};
use crate::sim::SimulationConfig;
use crate::workload::WorkloadDirective;

/// Everything needed to plan and simulate one device's batch.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OffloadConfig {
    /// The simulated client device.
    pub device: DeviceConfig,

    /// Planning strategy and deadline settings.
    pub scheduler: SchedulerConfig,

    /// Instance counts per task group.
    pub workload: WorkloadConfig,

    /// Task variants, grouped by their `group` field.
    pub catalog: Vec<TaskVariant>,

    /// Execution venues.
    pub venues: Vec<ExecutionVenue>,

    pub network: NetworkConfig,

    pub mobility: MobilityConfig,

    pub simulation: SimulationConfig,

    /// Grid for the `sweep` command.
    pub sweep: SweepConfig,
}

impl Default for OffloadConfig {
    fn default() -> Self {
        Self {
            device: DeviceConfig::default(),
            scheduler: SchedulerConfig::default(),
            workload: WorkloadConfig::default(),
            catalog: default_catalog(),
            venues: default_venues(),
            network: NetworkConfig::default(),
            mobility: MobilityConfig::default(),
            simulation: SimulationConfig::default(),
            sweep: SweepConfig::default(),
        }
    }
}

impl OffloadConfig {
    /// Load configuration with fallback chain.
    ///
    /// Search order:
    /// 1. Explicit path if provided
    /// 2. offloadr.yml in current directory
    /// 3. ~/.config/offloadr/offloadr.yml
    /// 4. Defaults
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        let project_config = PathBuf::from(crate::config::PROJECT_CONFIG_FILE);
        if project_config.exists() {
            match Self::load_from_file(&project_config) {
                Ok(config) => {
                    log::info!("Loaded config from {}", project_config.display());
                    return Ok(config);
                }
                Err(e) => {
                    log::warn!("Failed to load {}: {}", project_config.display(), e);
                }
            }
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir
                .join(crate::config::APP_NAME)
                .join(crate::config::PROJECT_CONFIG_FILE);
            if user_config.exists() {
                match Self::load_from_file(&user_config) {
                    Ok(config) => {
                        log::info!("Loaded config from {}", user_config.display());
                        return Ok(config);
                    }
                    Err(e) => {
                        log::warn!("Failed to load {}: {}", user_config.display(), e);
                    }
                }
            }
        }

        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;
        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.scheduler.precision == 0 {
            eyre::bail!("scheduler.precision must be > 0");
        }
        if self.scheduler.max_ticks == 0 {
            eyre::bail!("scheduler.max-ticks must be > 0");
        }
        if self.scheduler.deadline_percentage <= 0.0 {
            eyre::bail!("scheduler.deadline-percentage must be > 0");
        }
        if self.catalog.is_empty() {
            eyre::bail!("catalog must list at least one variant");
        }

        let mut variant_ids = HashSet::new();
        for variant in &self.catalog {
            if !variant_ids.insert(variant.id) {
                eyre::bail!("catalog: duplicate variant id {}", variant.id);
            }
        }

        if !self.venues.iter().any(|v| v.class == VenueClass::Local) {
            eyre::bail!("venues must include a local venue");
        }
        let mut venue_ids = HashSet::new();
        for venue in &self.venues {
            if venue.rate <= 0.0 {
                eyre::bail!("venue {} must have a rate > 0", venue.id);
            }
            if !venue_ids.insert(venue.id) {
                eyre::bail!("venues: duplicate venue id {}", venue.id);
            }
        }

        if let NetworkConfig::Fixed { edge, cloud } = &self.network
            && (edge.upload < 0.0 || edge.download < 0.0 || cloud.upload < 0.0 || cloud.download < 0.0)
        {
            eyre::bail!("network delays must be >= 0");
        }

        if self.simulation.max_events == 0 {
            eyre::bail!("simulation.max-events must be > 0");
        }
        if self.sweep.deadline_percentages.iter().any(|p| *p <= 0.0) {
            eyre::bail!("sweep.deadline-percentages must all be > 0");
        }
        Ok(())
    }
}

/// The simulated client device.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub id: DeviceId,
}

/// Workload directive plus the seed of the arrival process.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkloadConfig {
    pub directive: WorkloadDirective,
    pub seed: Option<u64>,
}

/// Parameter grid for the sweep command.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SweepConfig {
    pub deadline_percentages: Vec<f64>,

    pub strategies: Vec<Strategy>,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            deadline_percentages: vec![10.0, 25.0, 50.0, 75.0, 100.0],
            strategies: Strategy::all().to_vec(),
        }
    }
}

fn default_catalog() -> Vec<TaskVariant> {
    vec![
        TaskVariant::new(0, 0, 1.0, 100.0).with_sizes(200.0, 50.0),
        TaskVariant::new(1, 0, 0.6, 50.0).with_sizes(200.0, 30.0),
        TaskVariant::new(2, 0, 0.3, 20.0).with_sizes(100.0, 10.0),
        TaskVariant::new(3, 1, 1.0, 40.0).with_sizes(500.0, 100.0),
        TaskVariant::new(4, 1, 0.5, 15.0).with_sizes(250.0, 50.0),
    ]
}

fn default_venues() -> Vec<ExecutionVenue> {
    vec![
        ExecutionVenue::local(0, 10.0),
        ExecutionVenue::edge(1, 100.0).with_max_in_flight(4),
        ExecutionVenue::edge(2, 100.0).with_max_in_flight(4),
        ExecutionVenue::cloud(3, 250.0),
    ]
}
