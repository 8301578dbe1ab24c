//! Live tasks and their lifecycle state machine
//!
//! A LiveTask is created when the dispatcher pulls a schedule entry and lives
//! until it reaches a terminal state. Local tasks skip the network phases:
//! `Queued -> Processing -> Completed`. Remote tasks go through
//! `Queued -> Uploading -> Processing -> AwaitingPickup -> Downloading -> Completed`.

use serde::{Deserialize, Serialize};

use super::{DeviceId, ExecutionVenue, LocationId, SimTime, TaskId, TaskVariant};
use crate::error::{OffloadError, Result};

/// Lifecycle state of a dispatched task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskState {
    /// Materialized, not yet admitted
    Queued,
    /// Input travelling to a remote venue
    Uploading,
    /// Executing on its venue
    Processing,
    /// Remote result ready, waiting for the device to fetch it
    AwaitingPickup,
    /// Result travelling back to the device
    Downloading,
    /// Result delivered
    Completed,
    /// Venue had no free admission slot
    RejectedVmCapacity,
    /// No bandwidth at submission time
    RejectedBandwidth,
    /// Bandwidth vanished while work was in flight
    FailedBandwidth,
    /// Device left its serving point before the result came back
    FailedMobility,
}

impl TaskState {
    /// Returns true if the task is in a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskState::Completed
                | TaskState::RejectedVmCapacity
                | TaskState::RejectedBandwidth
                | TaskState::FailedBandwidth
                | TaskState::FailedMobility
        )
    }

    /// Terminal admission failures
    pub fn is_rejection(&self) -> bool {
        matches!(self, TaskState::RejectedVmCapacity | TaskState::RejectedBandwidth)
    }

    /// Terminal in-flight failures
    pub fn is_failure(&self) -> bool {
        matches!(self, TaskState::FailedBandwidth | TaskState::FailedMobility)
    }

    /// Whether the lifecycle permits moving from `self` to `next`
    pub fn can_transition_to(&self, next: TaskState) -> bool {
        use TaskState::*;
        match self {
            Queued => matches!(next, Uploading | Processing | RejectedVmCapacity | RejectedBandwidth),
            Uploading => matches!(next, Processing | RejectedBandwidth | FailedBandwidth | FailedMobility),
            Processing => matches!(next, AwaitingPickup | Completed),
            AwaitingPickup => matches!(next, Downloading | FailedBandwidth | FailedMobility),
            Downloading => matches!(next, Completed | FailedBandwidth | FailedMobility),
            Completed | RejectedVmCapacity | RejectedBandwidth | FailedBandwidth | FailedMobility => false,
        }
    }
}

/// A dispatched task bound to a venue and concrete delay figures
#[derive(Debug, Clone, PartialEq)]
pub struct LiveTask {
    pub id: TaskId,
    pub device: DeviceId,
    pub variant: TaskVariant,
    pub venue: ExecutionVenue,

    /// Serving point when the task was submitted
    pub submitted_location: LocationId,
    pub submitted_at: SimTime,

    /// Upload delay charged at submission (0 for local)
    pub upload_delay: f64,

    /// Download delay projected at submission, charged against replans
    pub projected_download: f64,

    pub state: TaskState,
}

impl LiveTask {
    pub fn new(
        id: TaskId,
        device: DeviceId,
        variant: TaskVariant,
        venue: ExecutionVenue,
        submitted_location: LocationId,
        submitted_at: SimTime,
    ) -> Self {
        Self {
            id,
            device,
            variant,
            venue,
            submitted_location,
            submitted_at,
            upload_delay: 0.0,
            projected_download: 0.0,
            state: TaskState::Queued,
        }
    }

    pub fn is_remote(&self) -> bool {
        self.venue.class.is_remote()
    }

    /// Move to `next`, rejecting transitions the lifecycle forbids
    pub fn transition(&mut self, next: TaskState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(OffloadError::InvalidTransition {
                task: self.id,
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }

    /// Dispatched but its result has not been received yet
    pub fn awaits_result(&self) -> bool {
        self.is_remote() && !self.state.is_terminal()
    }
}
