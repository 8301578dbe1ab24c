//! Command-line overrides.
//!
//! Applied on top of the loaded file before validation.

use serde::{Deserialize, Serialize};

use super::OffloadConfig;
use crate::scheduler::{InfeasibilityPolicy, Strategy};

/// Scheduler settings taken from flags rather than the config file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ConfigOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<Strategy>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline_percentage: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub precision: Option<u32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub on_infeasible: Option<InfeasibilityPolicy>,

    /// Only ever switches re-optimization on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reoptimize: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

impl ConfigOverrides {
    /// Check if any overrides are set.
    pub fn is_empty(&self) -> bool {
        self.strategy.is_none()
            && self.deadline_percentage.is_none()
            && self.precision.is_none()
            && self.on_infeasible.is_none()
            && self.reoptimize.is_none()
            && self.seed.is_none()
    }

    /// Write every set field into `config`.
    pub fn apply(&self, config: &mut OffloadConfig) {
        let scheduler = &mut config.scheduler;
        if let Some(strategy) = self.strategy {
            scheduler.strategy = strategy;
        }
        if let Some(pct) = self.deadline_percentage {
            scheduler.deadline_percentage = pct;
        }
        if let Some(precision) = self.precision {
            scheduler.precision = precision;
        }
        if let Some(policy) = self.on_infeasible {
            scheduler.on_infeasible = policy;
        }
        if let Some(reoptimize) = self.reoptimize {
            scheduler.reoptimize = reoptimize;
        }
        if let Some(seed) = self.seed {
            scheduler.seed = Some(seed);
            config.workload.seed = Some(seed);
        }
        if !self.is_empty() {
            log::debug!("Applied overrides: {:?}", self);
        }
    }
}
