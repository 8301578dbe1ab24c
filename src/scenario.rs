//! Scenario runner
//!
//! Wires a validated [`OffloadConfig`] into catalog, venues, workload, network,
//! mobility, scheduler and dispatcher, then plans or simulates.

use serde::Serialize;

use crate::catalog::TaskCatalog;
use crate::config::OffloadConfig;
use crate::dispatcher::Dispatcher;
use crate::domain::{GroupId, VenueSet};
use crate::error::Result;
use crate::mobility::MobilityModel;
use crate::network::NetworkModel;
use crate::schedule::Assignment;
use crate::scheduler::{PlanOutcome, Scheduler, SchedulerConfig, Strategy};
use crate::sim::{Simulation, SimulationSummary};
use crate::stats::{ReportContext, RunReport, RunStats};
use crate::workload::{Workload, WorkloadGenerator};

/// Assignment of one schedule entry in a plan preview
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct PlannedEntry {
    pub group: GroupId,
    pub quality: f64,
    #[serde(flatten)]
    pub assignment: Assignment,
}

/// Plan computed without running the simulation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct PlanPreview {
    pub strategy: Strategy,
    pub deadline: f64,
    pub feasible: bool,
    pub estimated_time: Option<f64>,
    pub total_quality: f64,
    pub entries: Vec<PlannedEntry>,
}

/// A loaded scenario; the workload is drawn once so that every run compares
/// strategies on the same batch
#[derive(Debug, Clone)]
pub struct Scenario {
    config: OffloadConfig,
    catalog: TaskCatalog,
    venues: VenueSet,
    workload: Workload,
}

impl Scenario {
    pub fn new(config: OffloadConfig) -> Result<Self> {
        let catalog = TaskCatalog::new(config.catalog.clone())?;
        let venues = VenueSet::new(config.venues.clone());
        let mut generator = WorkloadGenerator::new(config.workload.directive.clone(), config.workload.seed);
        let workload = generator.generate(&catalog)?;
        log::info!(
            "Scenario: {} groups, {} venues, {} task instances",
            catalog.group_count(),
            venues.len(),
            workload.total()
        );
        Ok(Self {
            config,
            catalog,
            venues,
            workload,
        })
    }

    pub fn config(&self) -> &OffloadConfig {
        &self.config
    }

    pub fn workload(&self) -> &Workload {
        &self.workload
    }

    /// Plan with the configured scheduler settings, without simulating
    pub fn plan(&self) -> Result<PlanPreview> {
        let mut scheduler = Scheduler::new(self.venues.clone(), self.config.scheduler.clone(), self.config.device.id)?;
        let mut schedule = scheduler.build_schedule(&self.catalog, &self.workload)?;
        let network = self.config.network.build();
        let outcome = scheduler.plan(&mut schedule, network.as_ref())?;

        let entries = schedule
            .entries()
            .map(|entry| PlannedEntry {
                group: entry.group(),
                quality: entry.selected_variant().quality,
                assignment: entry.assignment(),
            })
            .collect();
        Ok(PlanPreview {
            strategy: scheduler.config().strategy,
            deadline: schedule.deadline(),
            feasible: outcome != PlanOutcome::Infeasible,
            estimated_time: schedule.estimated_time,
            total_quality: schedule.total_quality(),
            entries,
        })
    }

    /// Simulate with the configured scheduler settings
    pub fn run(&self) -> Result<RunReport> {
        self.run_with(self.config.scheduler.clone())
    }

    /// Simulate with the given scheduler settings in place of the configured ones
    pub fn run_with(&self, scheduler_config: SchedulerConfig) -> Result<RunReport> {
        let strategy = scheduler_config.strategy;
        let deadline_percentage = scheduler_config.deadline_percentage;

        let scheduler = Scheduler::new(self.venues.clone(), scheduler_config, self.config.device.id)?;
        let schedule = scheduler.build_schedule(&self.catalog, &self.workload)?;
        let dispatcher = Dispatcher::new(
            scheduler,
            schedule,
            self.config.network.build(),
            self.config.mobility.build(),
            self.config.device.id,
        );
        let mut simulation = Simulation::new(dispatcher, &self.venues, self.config.simulation.clone());

        let mut stats = RunStats::new();
        let summary = simulation.run(&mut stats)?;
        let report = stats.report(self.context(&simulation, &summary, strategy, deadline_percentage));
        log::info!(
            "{} at {}%: quality {:.2}/{:.2}, makespan {:.3}s, deadline {:.3}s, {} background devices",
            strategy,
            deadline_percentage,
            report.total_quality,
            report.max_quality,
            report.makespan,
            report.deadline,
            simulation.background().len()
        );
        Ok(report)
    }

    /// One run per (deadline percentage, strategy) pair of the sweep grid
    pub fn sweep(&self) -> Result<Vec<RunReport>> {
        let mut reports = Vec::new();
        for &pct in &self.config.sweep.deadline_percentages {
            for &strategy in &self.config.sweep.strategies {
                let scheduler_config = SchedulerConfig {
                    strategy,
                    deadline_percentage: pct,
                    ..self.config.scheduler.clone()
                };
                reports.push(self.run_with(scheduler_config)?);
            }
        }
        Ok(reports)
    }

    fn context<N: NetworkModel, M: MobilityModel>(
        &self,
        simulation: &Simulation<N, M>,
        summary: &SimulationSummary,
        strategy: Strategy,
        deadline_percentage: f64,
    ) -> ReportContext {
        let schedule = simulation.dispatcher().schedule();
        ReportContext {
            strategy,
            deadline_percentage,
            deadline: schedule.deadline(),
            estimated_time: schedule.estimated_time,
            workload: self.workload.clone(),
            events_processed: summary.events,
        }
    }
}
