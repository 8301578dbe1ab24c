//! Venue executors: run one task at a time, in arrival order.

use crate::domain::{ExecutionVenue, SimTime};

#[derive(Debug, Clone)]
pub struct VenueExecutor {
    venue: ExecutionVenue,
    busy_until: SimTime,
    executed: u32,
}

impl VenueExecutor {
    pub fn new(venue: ExecutionVenue) -> Self {
        Self {
            venue,
            busy_until: 0.0,
            executed: 0,
        }
    }

    /// Accept `length` instructions at `now`; returns the completion time
    pub fn submit(&mut self, now: SimTime, length: f64) -> SimTime {
        let start = now.max(self.busy_until);
        self.busy_until = start + self.venue.compute_seconds(length);
        self.executed += 1;
        self.busy_until
    }

    pub fn venue(&self) -> &ExecutionVenue {
        &self.venue
    }

    pub fn executed(&self) -> u32 {
        self.executed
    }
}
