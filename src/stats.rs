//! Run statistics
//!
//! The dispatcher reports every lifecycle transition; a [`StatsSink`] only
//! observes them. [`RunStats`] aggregates a run into a [`RunReport`].

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{LifecycleEvent, LifecycleKind, SimTime, TaskState, VenueClass};
use crate::scheduler::Strategy;
use crate::workload::Workload;

/// Observer of lifecycle events
pub trait StatsSink {
    fn record(&mut self, event: &LifecycleEvent);
}

/// Keeps every event, in order
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    pub events: Vec<LifecycleEvent>,
}

impl StatsSink for EventLog {
    fn record(&mut self, event: &LifecycleEvent) {
        self.events.push(event.clone());
    }
}

/// Terminal outcome counts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct TaskCounts {
    pub dispatched: u32,
    pub completed: u32,
    pub rejected_vm_capacity: u32,
    pub rejected_bandwidth: u32,
    pub failed_bandwidth: u32,
    pub failed_mobility: u32,
}

impl TaskCounts {
    /// Tasks that reached any terminal state
    pub fn finished(&self) -> u32 {
        self.completed + self.rejected_vm_capacity + self.rejected_bandwidth + self.failed_bandwidth + self.failed_mobility
    }
}

/// Aggregating sink
#[derive(Debug, Clone, Default)]
pub struct RunStats {
    counts: TaskCounts,
    assignments: BTreeMap<VenueClass, u32>,
    completed_by_class: BTreeMap<VenueClass, u32>,
    total_quality: f64,
    makespan: SimTime,
    replans: u32,
    abort_reason: Option<String>,
}

impl StatsSink for RunStats {
    fn record(&mut self, event: &LifecycleEvent) {
        match &event.kind {
            LifecycleKind::Queued { .. } => self.counts.dispatched += 1,
            LifecycleKind::Assigned { class, .. } => *self.assignments.entry(*class).or_insert(0) += 1,
            LifecycleKind::StateChange { .. } => {}
            LifecycleKind::Completed { quality, class } => {
                self.counts.completed += 1;
                self.total_quality += quality;
                *self.completed_by_class.entry(*class).or_insert(0) += 1;
            }
            LifecycleKind::Rejected { reason, .. } | LifecycleKind::Failed { reason, .. } => match reason {
                TaskState::RejectedVmCapacity => self.counts.rejected_vm_capacity += 1,
                TaskState::RejectedBandwidth => self.counts.rejected_bandwidth += 1,
                TaskState::FailedBandwidth => self.counts.failed_bandwidth += 1,
                TaskState::FailedMobility => self.counts.failed_mobility += 1,
                other => log::warn!("Unexpected terminal reason {:?}", other),
            },
            LifecycleKind::Replanned { .. } => self.replans += 1,
            LifecycleKind::Aborted { reason } => self.abort_reason = Some(reason.clone()),
        }
        if event.is_terminal() {
            self.makespan = self.makespan.max(event.time);
        }
    }
}

/// Run parameters that the event stream does not carry
#[derive(Debug, Clone)]
pub struct ReportContext {
    pub strategy: Strategy,
    pub deadline_percentage: f64,
    pub deadline: f64,
    pub estimated_time: Option<f64>,
    pub workload: Workload,
    pub events_processed: u64,
}

/// Summary of one simulated run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RunReport {
    pub generated_at: DateTime<Utc>,
    pub strategy: Strategy,
    pub deadline_percentage: f64,
    pub deadline: f64,
    pub estimated_time: Option<f64>,
    pub makespan: f64,
    pub deadline_met: bool,
    pub total_quality: f64,
    /// Quality if every instance completed at full quality
    pub max_quality: f64,
    pub tasks: TaskCounts,
    pub assignments: BTreeMap<VenueClass, u32>,
    pub completed_by_class: BTreeMap<VenueClass, u32>,
    pub replans: u32,
    pub aborted: bool,
    pub abort_reason: Option<String>,
    pub workload: Workload,
    pub events_processed: u64,
}

impl RunReport {
    /// Delivered quality relative to the full-quality maximum
    pub fn quality_ratio(&self) -> f64 {
        if self.max_quality > 0.0 {
            self.total_quality / self.max_quality
        } else {
            0.0
        }
    }
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn counts(&self) -> &TaskCounts {
        &self.counts
    }

    pub fn total_quality(&self) -> f64 {
        self.total_quality
    }

    pub fn makespan(&self) -> SimTime {
        self.makespan
    }

    pub fn replans(&self) -> u32 {
        self.replans
    }

    pub fn is_aborted(&self) -> bool {
        self.abort_reason.is_some()
    }

    pub fn report(&self, context: ReportContext) -> RunReport {
        let aborted = self.is_aborted();
        RunReport {
            generated_at: Utc::now(),
            strategy: context.strategy,
            deadline_percentage: context.deadline_percentage,
            deadline: context.deadline,
            estimated_time: context.estimated_time,
            makespan: self.makespan,
            deadline_met: !aborted && self.makespan <= context.deadline,
            total_quality: self.total_quality,
            max_quality: context.workload.total() as f64,
            tasks: self.counts.clone(),
            assignments: self.assignments.clone(),
            completed_by_class: self.completed_by_class.clone(),
            replans: self.replans,
            aborted,
            abort_reason: self.abort_reason.clone(),
            workload: context.workload,
            events_processed: context.events_processed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> ReportContext {
        ReportContext {
            strategy: Strategy::Adaptive,
            deadline_percentage: 100.0,
            deadline: 20.0,
            estimated_time: Some(10.0),
            workload: Workload::from_pairs(&[(0, 2)]),
            events_processed: 12,
        }
    }

    #[test]
    fn test_counts_terminal_kinds() {
        let mut stats = RunStats::new();
        stats.record(&LifecycleEvent::queued(0, 0.0, 0, 0, 1.0));
        stats.record(&LifecycleEvent::assigned(0, 0.0, 1, VenueClass::Edge));
        stats.record(&LifecycleEvent::queued(1, 1.0, 0, 0, 1.0));
        stats.record(&LifecycleEvent::assigned(1, 1.0, 0, VenueClass::Local));
        stats.record(&LifecycleEvent::completed(0, 4.0, 1.0, VenueClass::Edge));
        stats.record(&LifecycleEvent::terminated(1, 2.0, TaskState::RejectedVmCapacity, VenueClass::Local));

        assert_eq!(stats.counts().dispatched, 2);
        assert_eq!(stats.counts().completed, 1);
        assert_eq!(stats.counts().rejected_vm_capacity, 1);
        assert_eq!(stats.counts().finished(), 2);
        assert_eq!(stats.makespan(), 4.0);

        let report = stats.report(context());
        assert_eq!(report.assignments.get(&VenueClass::Edge), Some(&1));
        assert_eq!(report.total_quality, 1.0);
        assert_eq!(report.quality_ratio(), 0.5);
        assert!(report.deadline_met);
    }

    #[test]
    fn test_abort_flags_report() {
        let mut stats = RunStats::new();
        stats.record(&LifecycleEvent::aborted(0.0, "no feasible plan"));
        let report = stats.report(context());
        assert!(report.aborted);
        assert!(!report.deadline_met);
        assert_eq!(report.abort_reason.as_deref(), Some("no feasible plan"));
    }

    #[test]
    fn test_replans_counted() {
        let mut stats = RunStats::new();
        stats.record(&LifecycleEvent::replanned(3.0, 5.0, 4));
        stats.record(&LifecycleEvent::replanned(6.0, 2.0, 2));
        assert_eq!(stats.replans(), 2);
    }

    #[test]
    fn test_report_json() {
        let report = RunStats::new().report(context());
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["strategy"], "adaptive");
        assert_eq!(json["deadline"], 20.0);
        assert!(json["generated-at"].is_string());
    }

    #[test]
    fn test_event_log_keeps_order() {
        let mut log = EventLog::default();
        log.record(&LifecycleEvent::queued(0, 0.0, 0, 0, 1.0));
        log.record(&LifecycleEvent::completed(0, 1.0, 1.0, VenueClass::Local));
        assert_eq!(log.events.len(), 2);
        assert!(log.events[1].is_terminal());
    }
}
