//! Lifecycle event records handed to the statistics collaborator.

use serde::{Deserialize, Serialize};

use super::{GroupId, SimTime, TaskId, TaskState, VariantId, VenueClass, VenueId};

/// Event type constants
pub mod event_types {
    pub const TASK_QUEUED: &str = "task.queued";
    pub const TASK_ASSIGNED: &str = "task.assigned";
    pub const TASK_STATE_CHANGE: &str = "task.state_change";
    pub const TASK_COMPLETED: &str = "task.completed";
    pub const TASK_REJECTED: &str = "task.rejected";
    pub const TASK_FAILED: &str = "task.failed";
    pub const PLAN_REPLANNED: &str = "plan.replanned";
    pub const PLAN_ABORTED: &str = "plan.aborted";
}

/// What happened
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LifecycleKind {
    Queued {
        group: GroupId,
        variant: VariantId,
        quality: f64,
    },
    Assigned {
        venue: VenueId,
        class: VenueClass,
    },
    StateChange {
        state: TaskState,
    },
    Completed {
        quality: f64,
        class: VenueClass,
    },
    Rejected {
        reason: TaskState,
        class: VenueClass,
    },
    Failed {
        reason: TaskState,
        class: VenueClass,
    },
    Replanned {
        budget: f64,
        remaining: usize,
    },
    Aborted {
        reason: String,
    },
}

/// One observation of the lifecycle protocol
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifecycleEvent {
    /// Associated task, `None` for plan-level events
    pub task: Option<TaskId>,
    /// Virtual time of the transition
    pub time: SimTime,
    pub kind: LifecycleKind,
}

impl LifecycleEvent {
    fn for_task(task: TaskId, time: SimTime, kind: LifecycleKind) -> Self {
        Self {
            task: Some(task),
            time,
            kind,
        }
    }

    pub fn queued(task: TaskId, time: SimTime, group: GroupId, variant: VariantId, quality: f64) -> Self {
        Self::for_task(task, time, LifecycleKind::Queued { group, variant, quality })
    }

    pub fn assigned(task: TaskId, time: SimTime, venue: VenueId, class: VenueClass) -> Self {
        Self::for_task(task, time, LifecycleKind::Assigned { venue, class })
    }

    pub fn state_change(task: TaskId, time: SimTime, state: TaskState) -> Self {
        Self::for_task(task, time, LifecycleKind::StateChange { state })
    }

    pub fn completed(task: TaskId, time: SimTime, quality: f64, class: VenueClass) -> Self {
        Self::for_task(task, time, LifecycleKind::Completed { quality, class })
    }

    /// Terminal rejection or failure, picked from the state
    pub fn terminated(task: TaskId, time: SimTime, reason: TaskState, class: VenueClass) -> Self {
        let kind = if reason.is_rejection() {
            LifecycleKind::Rejected { reason, class }
        } else {
            LifecycleKind::Failed { reason, class }
        };
        Self::for_task(task, time, kind)
    }

    pub fn replanned(time: SimTime, budget: f64, remaining: usize) -> Self {
        Self {
            task: None,
            time,
            kind: LifecycleKind::Replanned { budget, remaining },
        }
    }

    pub fn aborted(time: SimTime, reason: &str) -> Self {
        Self {
            task: None,
            time,
            kind: LifecycleKind::Aborted {
                reason: reason.to_string(),
            },
        }
    }

    /// Dotted event type name
    pub fn event_type(&self) -> &'static str {
        match self.kind {
            LifecycleKind::Queued { .. } => event_types::TASK_QUEUED,
            LifecycleKind::Assigned { .. } => event_types::TASK_ASSIGNED,
            LifecycleKind::StateChange { .. } => event_types::TASK_STATE_CHANGE,
            LifecycleKind::Completed { .. } => event_types::TASK_COMPLETED,
            LifecycleKind::Rejected { .. } => event_types::TASK_REJECTED,
            LifecycleKind::Failed { .. } => event_types::TASK_FAILED,
            LifecycleKind::Replanned { .. } => event_types::PLAN_REPLANNED,
            LifecycleKind::Aborted { .. } => event_types::PLAN_ABORTED,
        }
    }

    /// Check if this event ends a task's lifecycle
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.kind,
            LifecycleKind::Completed { .. } | LifecycleKind::Rejected { .. } | LifecycleKind::Failed { .. }
        )
    }

    /// Check if this is a plan-level event
    pub fn is_plan_event(&self) -> bool {
        self.task.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queued_event() {
        let event = LifecycleEvent::queued(3, 1.5, 0, 2, 0.5);
        assert_eq!(event.event_type(), event_types::TASK_QUEUED);
        assert_eq!(event.task, Some(3));
        assert!(!event.is_terminal());
    }

    #[test]
    fn test_terminated_splits_rejection_and_failure() {
        let rejected = LifecycleEvent::terminated(1, 0.0, TaskState::RejectedVmCapacity, VenueClass::Edge);
        assert_eq!(rejected.event_type(), event_types::TASK_REJECTED);
        assert!(rejected.is_terminal());

        let failed = LifecycleEvent::terminated(1, 0.0, TaskState::FailedMobility, VenueClass::Cloud);
        assert_eq!(failed.event_type(), event_types::TASK_FAILED);
        assert!(failed.is_terminal());
    }

    #[test]
    fn test_plan_events() {
        let replanned = LifecycleEvent::replanned(4.0, 6.0, 3);
        assert!(replanned.is_plan_event());
        assert_eq!(replanned.event_type(), event_types::PLAN_REPLANNED);

        let aborted = LifecycleEvent::aborted(0.0, "no feasible plan");
        assert_eq!(aborted.event_type(), event_types::PLAN_ABORTED);
        assert!(!aborted.is_terminal());
    }

    #[test]
    fn test_event_json_tagging() {
        let event = LifecycleEvent::completed(9, 12.0, 1.0, VenueClass::Edge);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"]["kind"], "completed");
        assert_eq!(json["kind"]["class"], "edge");
        assert_eq!(json["task"], 9);
    }
}
