//! Scheduler: builds the schedule and decides variant and venue per entry.
//!
//! This module provides:
//! - **Schedule construction**: one entry per task instance of the workload,
//!   plus the deadline derived from running everything locally at full quality.
//! - **Planning**: the adaptive dynamic-programming strategy and the heuristic
//!   strategies, selected by [`Strategy`].
//! - **Infeasibility handling**: what to do when the adaptive strategy cannot
//!   meet the remaining budget, per [`InfeasibilityPolicy`].
//! - **Re-optimization**: replanning the undispatched remainder against the
//!   budget that is left.
//!
//! # Example
//!
//! ```ignore
//! let mut scheduler = Scheduler::new(venues, SchedulerConfig::default(), 0)?;
//! let mut schedule = scheduler.build_schedule(&catalog, &workload)?;
//! match scheduler.plan(&mut schedule, &network)? {
//!     PlanOutcome::Infeasible => abort(),
//!     outcome => dispatch(schedule, outcome),
//! }
//! ```

mod adaptive;
mod cost;
mod heuristics;

use std::fmt;
use std::str::FromStr;

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::catalog::TaskCatalog;
use crate::domain::{DeviceId, VenueClass, VenueSet};
use crate::error::{OffloadError, Result};
use crate::network::NetworkModel;
use crate::schedule::{Schedule, ScheduleEntry};
use crate::workload::Workload;

/// Planning strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    #[default]
    Adaptive,
    Greedy,
    ValueDensity,
    Minimal,
    OnlyLocal,
    OnlyEdge,
    OnlyCloud,
    Random,
}

impl Strategy {
    pub fn all() -> [Strategy; 8] {
        [
            Strategy::Adaptive,
            Strategy::Greedy,
            Strategy::ValueDensity,
            Strategy::Minimal,
            Strategy::OnlyLocal,
            Strategy::OnlyEdge,
            Strategy::OnlyCloud,
            Strategy::Random,
        ]
    }

    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Adaptive => "adaptive",
            Strategy::Greedy => "greedy",
            Strategy::ValueDensity => "value-density",
            Strategy::Minimal => "minimal",
            Strategy::OnlyLocal => "only-local",
            Strategy::OnlyEdge => "only-edge",
            Strategy::OnlyCloud => "only-cloud",
            Strategy::Random => "random",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Strategy {
    type Err = OffloadError;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_lowercase().replace('_', "-");
        match normalized.as_str() {
            "adaptive" => Ok(Strategy::Adaptive),
            "greedy" => Ok(Strategy::Greedy),
            "value-density" | "heuristic" => Ok(Strategy::ValueDensity),
            "minimal" => Ok(Strategy::Minimal),
            "only-local" | "only-mobile" => Ok(Strategy::OnlyLocal),
            "only-edge" => Ok(Strategy::OnlyEdge),
            "only-cloud" => Ok(Strategy::OnlyCloud),
            "random" => Ok(Strategy::Random),
            _ => Err(OffloadError::InvalidConfig(format!("unknown strategy '{}'", s))),
        }
    }
}

/// What to do when the adaptive strategy finds no plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InfeasibilityPolicy {
    /// Discard the plan and signal abort
    #[default]
    No,
    /// Fall back to the minimal strategy
    Minimal,
    /// Keep the previous plan; on a first plan this behaves like `No`
    Keep,
}

impl FromStr for InfeasibilityPolicy {
    type Err = OffloadError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "no" => Ok(InfeasibilityPolicy::No),
            "minimal" => Ok(InfeasibilityPolicy::Minimal),
            "keep" => Ok(InfeasibilityPolicy::Keep),
            _ => Err(OffloadError::InvalidConfig(format!("unknown infeasibility policy '{}'", s))),
        }
    }
}

/// Scheduler settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SchedulerConfig {
    pub strategy: Strategy,

    /// Deadline as a percentage of the all-local full-quality runtime
    pub deadline_percentage: f64,

    /// Ticks per second of the planning grid
    pub precision: u32,

    pub on_infeasible: InfeasibilityPolicy,

    /// Replan whenever the active client counts change
    pub reoptimize: bool,

    /// Seed for the random strategy
    pub seed: Option<u64>,

    /// Largest planning grid the adaptive strategy will build, in ticks
    pub max_ticks: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::Adaptive,
            deadline_percentage: 100.0,
            precision: 10,
            on_infeasible: InfeasibilityPolicy::No,
            reoptimize: false,
            seed: None,
            max_ticks: 1_000_000,
        }
    }
}

/// Result of a planning call
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlanOutcome {
    /// Every entry selected by the configured strategy
    Planned { quality: f64, estimated_time: f64 },
    /// Adaptive planning failed, the minimal strategy was applied instead
    Degraded { quality: f64, estimated_time: f64 },
    /// Adaptive replanning failed, previous selections kept
    KeptPrevious,
    /// No plan; the schedule has been discarded
    Infeasible,
}

impl PlanOutcome {
    pub fn is_feasible(&self) -> bool {
        !matches!(self, PlanOutcome::Infeasible)
    }
}

/// Remaining planning budget: the deadline minus elapsed time and minus the
/// projected download of every remote result still outstanding, never negative
pub fn remaining_budget(deadline: f64, elapsed: f64, pending_downloads: f64) -> f64 {
    (deadline - elapsed - pending_downloads).max(0.0)
}

/// Plans schedules for one device against a fixed venue set
#[derive(Debug)]
pub struct Scheduler {
    config: SchedulerConfig,
    venues: VenueSet,
    device: DeviceId,
    rng: StdRng,
    replans: u32,
}

impl Scheduler {
    pub fn new(venues: VenueSet, config: SchedulerConfig, device: DeviceId) -> Result<Self> {
        if config.precision == 0 {
            return Err(OffloadError::InvalidConfig("precision must be > 0".to_string()));
        }
        if config.max_ticks == 0 {
            return Err(OffloadError::InvalidConfig("max-ticks must be > 0".to_string()));
        }
        if venues.is_empty() {
            return Err(OffloadError::InvalidConfig("no venues configured".to_string()));
        }
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        };
        Ok(Self {
            config,
            venues,
            device,
            rng,
            replans: 0,
        })
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn venues(&self) -> &VenueSet {
        &self.venues
    }

    /// Number of replans performed so far
    pub fn replans(&self) -> u32 {
        self.replans
    }

    /// One entry per task instance, grouped in ascending group order, with the
    /// deadline `Σ full-quality length / local rate × percentage / 100`
    pub fn build_schedule(&self, catalog: &TaskCatalog, workload: &Workload) -> Result<Schedule> {
        let local = self.venues.local().ok_or(OffloadError::NoLocalVenue)?;
        let candidates: Vec<_> = self.venues.iter().cloned().collect();

        let mut entries = Vec::new();
        let mut full_length = 0.0;
        for (group, count) in workload.iter() {
            let variants = catalog.variants(group)?;
            let full = catalog.full_quality(group)?;
            for _ in 0..count {
                entries.push(ScheduleEntry::new(group, variants.to_vec(), candidates.clone())?);
                full_length += full.length;
            }
        }

        let deadline = local.compute_seconds(full_length) * self.config.deadline_percentage / 100.0;
        log::info!(
            "Built schedule: {} entries, deadline {:.3}s at {}%",
            entries.len(),
            deadline,
            self.config.deadline_percentage
        );
        Ok(Schedule::new(entries, deadline))
    }

    /// First plan against the full deadline
    pub fn plan(&mut self, schedule: &mut Schedule, network: &dyn NetworkModel) -> Result<PlanOutcome> {
        let budget = schedule.deadline();
        self.run(schedule, network, budget, true)
    }

    /// Replan the undispatched entries against what is left of the deadline
    pub fn replan(
        &mut self,
        schedule: &mut Schedule,
        network: &dyn NetworkModel,
        elapsed: f64,
        pending_downloads: f64,
    ) -> Result<PlanOutcome> {
        self.replans += 1;
        let budget = remaining_budget(schedule.deadline(), elapsed, pending_downloads);
        tracing::debug!(
            elapsed,
            pending_downloads,
            budget,
            remaining = schedule.len(),
            "Replanning"
        );
        self.run(schedule, network, budget, false)
    }

    fn run(
        &mut self,
        schedule: &mut Schedule,
        network: &dyn NetworkModel,
        budget: f64,
        first: bool,
    ) -> Result<PlanOutcome> {
        let precision = self.config.precision;
        let strategy = self.config.strategy;

        if strategy != Strategy::Adaptive {
            self.apply_heuristic(strategy, schedule.entries_mut(), network)?;
            return Ok(self.finish(schedule, network, false));
        }

        let ticks = adaptive::tick_count(budget, precision);
        if ticks > self.config.max_ticks {
            return Err(OffloadError::InvalidConfig(format!(
                "planning grid of {} ticks exceeds max-ticks {}",
                ticks, self.config.max_ticks
            )));
        }

        match adaptive::solve(schedule.entries_mut(), network, self.device, budget, precision) {
            Some(plan) => {
                for (entry, &(variant, venue)) in schedule.entries_mut().iter_mut().zip(&plan.picks) {
                    entry.select_at(variant, venue)?;
                }
                schedule.estimated_time = Some(plan.estimated_time);
                tracing::debug!(
                    quality = plan.quality,
                    estimated_time = plan.estimated_time,
                    budget,
                    "Adaptive plan applied"
                );
                Ok(PlanOutcome::Planned {
                    quality: plan.quality,
                    estimated_time: plan.estimated_time,
                })
            }
            None => self.on_infeasible(schedule, network, budget, first),
        }
    }

    fn on_infeasible(
        &mut self,
        schedule: &mut Schedule,
        network: &dyn NetworkModel,
        budget: f64,
        first: bool,
    ) -> Result<PlanOutcome> {
        match self.config.on_infeasible {
            InfeasibilityPolicy::Keep if !first => {
                log::warn!("No plan fits {:.3}s, keeping previous plan", budget);
                Ok(PlanOutcome::KeptPrevious)
            }
            InfeasibilityPolicy::Minimal => {
                log::warn!("No plan fits {:.3}s, falling back to minimal strategy", budget);
                heuristics::minimal(schedule.entries_mut(), network, self.device)?;
                Ok(self.finish(schedule, network, true))
            }
            _ => {
                log::warn!("No plan fits {:.3}s, discarding {} entries", budget, schedule.len());
                schedule.clear();
                Ok(PlanOutcome::Infeasible)
            }
        }
    }

    fn apply_heuristic(
        &mut self,
        strategy: Strategy,
        entries: &mut [ScheduleEntry],
        network: &dyn NetworkModel,
    ) -> Result<()> {
        match strategy {
            Strategy::Greedy => heuristics::greedy(entries, network, self.device),
            Strategy::ValueDensity => heuristics::value_density(entries, network, self.device),
            Strategy::Minimal => heuristics::minimal(entries, network, self.device),
            Strategy::OnlyLocal => heuristics::only_class(entries, VenueClass::Local),
            Strategy::OnlyEdge => heuristics::only_class(entries, VenueClass::Edge),
            Strategy::OnlyCloud => heuristics::only_class(entries, VenueClass::Cloud),
            Strategy::Random => heuristics::random(entries, &mut self.rng),
            Strategy::Adaptive => Ok(()),
        }
    }

    fn finish(&self, schedule: &mut Schedule, network: &dyn NetworkModel, degraded: bool) -> PlanOutcome {
        let precision = f64::from(self.config.precision);
        let estimated_time = cost::estimate_completion(schedule.entries_mut(), network, self.device, precision);
        schedule.estimated_time = Some(estimated_time);
        let quality = schedule.total_quality();
        if degraded {
            PlanOutcome::Degraded {
                quality,
                estimated_time,
            }
        } else {
            PlanOutcome::Planned {
                quality,
                estimated_time,
            }
        }
    }
}
