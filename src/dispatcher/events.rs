//! Events the dispatcher consumes and effects it asks its driver to perform.

use serde::{Deserialize, Serialize};

use crate::domain::{LifecycleEvent, TaskId, VenueId};

/// Input to [`super::Dispatcher::handle_event`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DispatchEvent {
    /// Plan the schedule and begin dispatching
    Start,
    /// The device is free to do its next piece of work
    SendNext,
    UploadFinished { task: TaskId },
    /// Reported by the venue executing `task`
    ExecutionFinished { task: TaskId },
    DownloadFinished { task: TaskId },
    /// Every schedule entry has been dispatched
    NoMoreTasks,
}

/// Output of [`super::Dispatcher::handle_event`]
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Deliver `event` back to the dispatcher after `delay` seconds
    ScheduleIn { delay: f64, event: DispatchEvent },
    /// Run `length` instructions of `task` on `venue`; the venue answers with
    /// exactly one `ExecutionFinished`
    Execute { task: TaskId, venue: VenueId, length: f64 },
    /// Lifecycle observation for the statistics sink
    Notify(LifecycleEvent),
    /// All work done
    Stop,
    /// Planning failed; nothing further will be dispatched
    Abort { reason: String },
}

impl Effect {
    pub fn send_next() -> Self {
        Effect::ScheduleIn {
            delay: 0.0,
            event: DispatchEvent::SendNext,
        }
    }
}
