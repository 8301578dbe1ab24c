//! Workload derivation
//!
//! Turns a configuration directive into a concrete instance count per task
//! group. Directives:
//! - `total`: a fixed number of instances spread round-robin over the groups
//! - `per-group`: the same count for every group
//! - `exact`: one explicit count per group, in ascending group order
//! - `idle-active`: per group, the arrivals of an exponential process that is
//!   only active for `active-period` seconds out of every
//!   `active-period + idle-period`

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::catalog::TaskCatalog;
use crate::domain::GroupId;
use crate::error::{OffloadError, Result};

/// Parameters of the idle/active arrival process
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ArrivalProcess {
    pub active_period: f64,
    pub idle_period: f64,
    pub mean_interarrival: f64,
    /// Length of the observation window in seconds
    pub duration: f64,
}

impl ArrivalProcess {
    fn validate(&self) -> Result<()> {
        if self.mean_interarrival <= 0.0 {
            return Err(OffloadError::InvalidConfig("mean-interarrival must be > 0".to_string()));
        }
        if self.active_period <= 0.0 || self.idle_period < 0.0 {
            return Err(OffloadError::InvalidConfig(
                "active-period must be > 0 and idle-period >= 0".to_string(),
            ));
        }
        if self.duration < 0.0 {
            return Err(OffloadError::InvalidConfig("duration must be >= 0".to_string()));
        }
        Ok(())
    }
}

/// How many instances of each group to create
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum WorkloadDirective {
    Total { count: u32 },
    PerGroup { count: u32 },
    Exact { counts: Vec<u32> },
    IdleActive(ArrivalProcess),
}

impl Default for WorkloadDirective {
    fn default() -> Self {
        WorkloadDirective::PerGroup { count: 10 }
    }
}

/// Instance count per task group
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Workload {
    counts: BTreeMap<GroupId, u32>,
}

impl Workload {
    pub fn new(counts: BTreeMap<GroupId, u32>) -> Self {
        Self { counts }
    }

    pub fn from_pairs(pairs: &[(GroupId, u32)]) -> Self {
        Self {
            counts: pairs.iter().copied().collect(),
        }
    }

    pub fn count(&self, group: GroupId) -> u32 {
        self.counts.get(&group).copied().unwrap_or(0)
    }

    /// Total number of instances
    pub fn total(&self) -> u64 {
        self.counts.values().map(|&c| u64::from(c)).sum()
    }

    /// (group, count) in ascending group order
    pub fn iter(&self) -> impl Iterator<Item = (GroupId, u32)> + '_ {
        self.counts.iter().map(|(&g, &c)| (g, c))
    }
}

/// Derives a [`Workload`] from a directive
#[derive(Debug)]
pub struct WorkloadGenerator {
    directive: WorkloadDirective,
    rng: StdRng,
}

impl WorkloadGenerator {
    /// A `seed` makes the stochastic directive reproducible
    pub fn new(directive: WorkloadDirective, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        };
        Self { directive, rng }
    }

    /// Produce instance counts for every group in the catalog
    pub fn generate(&mut self, catalog: &TaskCatalog) -> Result<Workload> {
        let groups = catalog.group_ids();
        let mut counts = BTreeMap::new();

        match self.directive.clone() {
            WorkloadDirective::Total { count } => {
                if groups.is_empty() {
                    return Ok(Workload::default());
                }
                let n = groups.len() as u32;
                for (index, group) in groups.iter().enumerate() {
                    let extra = u32::from((index as u32) < count % n);
                    counts.insert(*group, count / n + extra);
                }
            }
            WorkloadDirective::PerGroup { count } => {
                for group in &groups {
                    counts.insert(*group, count);
                }
            }
            WorkloadDirective::Exact { counts: exact } => {
                if exact.len() != groups.len() {
                    return Err(OffloadError::InvalidConfig(format!(
                        "exact workload lists {} counts for {} task groups",
                        exact.len(),
                        groups.len()
                    )));
                }
                counts.extend(groups.iter().copied().zip(exact));
            }
            WorkloadDirective::IdleActive(process) => {
                process.validate()?;
                for group in &groups {
                    let arrivals = self.sample_arrivals(&process);
                    counts.insert(*group, arrivals);
                }
            }
        }

        let workload = Workload::new(counts);
        log::info!(
            "Generated workload: {} instances over {} groups",
            workload.total(),
            groups.len()
        );
        Ok(workload)
    }

    fn sample_arrivals(&mut self, process: &ArrivalProcess) -> u32 {
        let mut count = 0;
        let mut window_start = 0.0;
        while window_start < process.duration {
            let window_end = (window_start + process.active_period).min(process.duration);
            let mut t = window_start + self.exponential(process.mean_interarrival);
            while t < window_end {
                count += 1;
                t += self.exponential(process.mean_interarrival);
            }
            window_start += process.active_period + process.idle_period;
        }
        count
    }

    fn exponential(&mut self, mean: f64) -> f64 {
        let u: f64 = self.rng.random();
        -mean * (1.0 - u).ln()
    }
}
