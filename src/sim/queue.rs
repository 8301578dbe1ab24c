//! Virtual-time event queue.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::domain::SimTime;

struct Scheduled<E> {
    time: SimTime,
    seq: u64,
    event: E,
}

impl<E> PartialEq for Scheduled<E> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<E> Eq for Scheduled<E> {}

impl<E> PartialOrd for Scheduled<E> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<E> Ord for Scheduled<E> {
    // Reversed: BinaryHeap is a max-heap and the earliest event must surface
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .time
            .total_cmp(&self.time)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Min-queue on time; events scheduled for the same time come out in the
/// order they were pushed
pub struct EventQueue<E> {
    heap: BinaryHeap<Scheduled<E>>,
    seq: u64,
    now: SimTime,
}

impl<E> EventQueue<E> {
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            seq: 0,
            now: 0.0,
        }
    }

    /// Schedule `event` at absolute time `at`; the past is clamped to now
    pub fn push(&mut self, at: SimTime, event: E) {
        let time = if at < self.now { self.now } else { at };
        self.heap.push(Scheduled {
            time,
            seq: self.seq,
            event,
        });
        self.seq += 1;
    }

    /// Next event, advancing the clock to its time
    pub fn pop(&mut self) -> Option<(SimTime, E)> {
        let next = self.heap.pop()?;
        self.now = next.time;
        Some((next.time, next.event))
    }

    pub fn now(&self) -> SimTime {
        self.now
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

impl<E> Default for EventQueue<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_order() {
        let mut queue = EventQueue::new();
        queue.push(3.0, "c");
        queue.push(1.0, "a");
        queue.push(2.0, "b");
        assert_eq!(queue.pop(), Some((1.0, "a")));
        assert_eq!(queue.pop(), Some((2.0, "b")));
        assert_eq!(queue.now(), 2.0);
        assert_eq!(queue.pop(), Some((3.0, "c")));
        assert!(queue.pop().is_none());
    }

    #[test]
    fn test_same_time_is_fifo() {
        let mut queue = EventQueue::new();
        for i in 0..5 {
            queue.push(1.0, i);
        }
        let order: Vec<_> = std::iter::from_fn(|| queue.pop().map(|(_, e)| e)).collect();
        assert_eq!(order, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_past_is_clamped() {
        let mut queue = EventQueue::new();
        queue.push(5.0, 'x');
        queue.pop();
        queue.push(1.0, 'y');
        assert_eq!(queue.pop(), Some((5.0, 'y')));
    }
}
