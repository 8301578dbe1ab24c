//! Error types for offloadr
//!
//! Centralized error handling using thiserror. Planning infeasibility is not an
//! error: it is reported through [`crate::scheduler::PlanOutcome`] and handled
//! by the configured policy.

use thiserror::Error;

use crate::domain::{GroupId, TaskId, TaskState, VenueId};

/// All error types that can occur in offloadr
#[derive(Debug, Error)]
pub enum OffloadError {
    /// Configuration is structurally invalid
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// Workload references a group missing from the catalog
    #[error("Unknown task group: {0}")]
    UnknownGroup(GroupId),

    /// Group has no variant with quality 1.0, so no deadline baseline exists
    #[error("Task group {0} has no full-quality variant")]
    MissingFullQuality(GroupId),

    /// Venue id not present in the venue set
    #[error("Unknown venue: {0}")]
    UnknownVenue(VenueId),

    /// Task id not tracked by the dispatcher
    #[error("Unknown task: {0}")]
    UnknownTask(TaskId),

    /// Deadline baseline needs a local venue
    #[error("No local venue configured")]
    NoLocalVenue,

    /// Selection outside an entry's candidate set, or inconsistent bookkeeping
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    /// Lifecycle transition that the state machine does not allow
    #[error("Invalid transition for task {task}: {from:?} -> {to:?}")]
    InvalidTransition { task: TaskId, from: TaskState, to: TaskState },

    /// Simulation did not reach shutdown within the configured event budget
    #[error("Event budget exhausted after {0} events")]
    EventBudgetExhausted(u64),
}

/// Result type alias for offloadr operations
pub type Result<T> = std::result::Result<T, OffloadError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_config_error() {
        let err = OffloadError::InvalidConfig("precision must be > 0".to_string());
        assert_eq!(err.to_string(), "Invalid config: precision must be > 0");
    }

    #[test]
    fn test_missing_full_quality_error() {
        let err = OffloadError::MissingFullQuality(3);
        assert_eq!(err.to_string(), "Task group 3 has no full-quality variant");
    }

    #[test]
    fn test_protocol_violation_error() {
        let err = OffloadError::ProtocolViolation("venue 9 not a candidate".to_string());
        assert_eq!(err.to_string(), "Protocol violation: venue 9 not a candidate");
    }

    #[test]
    fn test_invalid_transition_error() {
        let err = OffloadError::InvalidTransition {
            task: 7,
            from: TaskState::Completed,
            to: TaskState::Downloading,
        };
        assert_eq!(err.to_string(), "Invalid transition for task 7: Completed -> Downloading");
    }

    #[test]
    fn test_result_type_alias() {
        fn returns_ok() -> Result<i32> {
            Ok(42)
        }

        fn returns_err() -> Result<i32> {
            Err(OffloadError::NoLocalVenue)
        }

        assert!(returns_ok().is_ok());
        assert!(returns_err().is_err());
    }
}
