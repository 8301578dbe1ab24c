//! Schedule data structures
//!
//! A [`Schedule`] is the ordered list of task instances the dispatcher consumes
//! front to back, together with the deadline fixed at plan creation and the
//! completion estimate of the most recent plan.

mod entry;

use std::collections::VecDeque;

pub use entry::{Assignment, ScheduleEntry};

/// Ordered entries plus the global deadline
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schedule {
    entries: VecDeque<ScheduleEntry>,

    /// Seconds allowed for the whole batch, fixed at creation
    deadline: f64,

    /// Completion estimate reported by the last plan, in seconds
    pub estimated_time: Option<f64>,
}

impl Schedule {
    pub fn new(entries: Vec<ScheduleEntry>, deadline: f64) -> Self {
        Self {
            entries: entries.into(),
            deadline,
            estimated_time: None,
        }
    }

    pub fn deadline(&self) -> f64 {
        self.deadline
    }

    /// Remove and return the next entry to dispatch
    pub fn pop_next(&mut self) -> Option<ScheduleEntry> {
        self.entries.pop_front()
    }

    pub fn peek(&self) -> Option<&ScheduleEntry> {
        self.entries.front()
    }

    pub fn entries(&self) -> impl Iterator<Item = &ScheduleEntry> {
        self.entries.iter()
    }

    /// Undispatched entries as a contiguous slice, for planners
    pub fn entries_mut(&mut self) -> &mut [ScheduleEntry] {
        self.entries.make_contiguous()
    }

    pub fn assignments(&self) -> Vec<Assignment> {
        self.entries.iter().map(ScheduleEntry::assignment).collect()
    }

    /// Drop every undispatched entry
    pub fn clear(&mut self) {
        self.entries.clear();
        self.estimated_time = None;
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sum of the selected variants' quality
    pub fn total_quality(&self) -> f64 {
        self.entries.iter().map(|e| e.selected_variant().quality).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ExecutionVenue, TaskVariant};

    fn schedule() -> Schedule {
        let venues = vec![ExecutionVenue::local(0, 1.0)];
        let entries = (0..3)
            .map(|g| ScheduleEntry::new(g, vec![TaskVariant::new(g, g, 1.0, 10.0)], venues.clone()).unwrap())
            .collect();
        Schedule::new(entries, 30.0)
    }

    #[test]
    fn test_pop_in_order() {
        let mut schedule = schedule();
        assert_eq!(schedule.len(), 3);
        assert_eq!(schedule.pop_next().map(|e| e.group()), Some(0));
        assert_eq!(schedule.peek().map(|e| e.group()), Some(1));
        assert_eq!(schedule.len(), 2);
    }

    #[test]
    fn test_total_quality() {
        let schedule = schedule();
        assert_eq!(schedule.total_quality(), 3.0);
        assert_eq!(schedule.deadline(), 30.0);
    }

    #[test]
    fn test_clear_drops_entries_and_estimate() {
        let mut schedule = schedule();
        schedule.estimated_time = Some(12.0);
        schedule.clear();
        assert!(schedule.is_empty());
        assert!(schedule.estimated_time.is_none());
        assert!(schedule.pop_next().is_none());
    }

    #[test]
    fn test_entries_mut_is_ordered() {
        let mut schedule = schedule();
        schedule.pop_next();
        let groups: Vec<_> = schedule.entries_mut().iter().map(|e| e.group()).collect();
        assert_eq!(groups, vec![1, 2]);
    }
}
