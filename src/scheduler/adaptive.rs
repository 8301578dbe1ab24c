//! Quality-maximizing planner over discretized time.
//!
//! Stage `i` of the table holds, for every tick `t` of the budget, the best
//! total quality of the first `i` entries when their sequential cost ends at
//! `t`. Local work is charged its compute time; remote work is charged only its
//! transfers, but its remote compute has to fit before the budget ends.

use crate::domain::DeviceId;
use crate::network::NetworkModel;
use crate::schedule::ScheduleEntry;

use super::cost::{self, Candidate};

/// Result of a successful solve
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct AdaptivePlan {
    /// (variant index, venue index) per entry
    pub picks: Vec<(usize, usize)>,
    pub quality: f64,
    /// Seconds
    pub estimated_time: f64,
}

#[derive(Debug, Clone, Copy)]
struct Pick {
    variant: usize,
    venue: usize,
    tick: usize,
    processing: f64,
}

#[derive(Debug, Clone, Copy, Default)]
struct Cell {
    /// `None` while unreachable
    quality: Option<f64>,
    prev_tick: usize,
    pick: Option<Pick>,
}

/// Solve for the best assignment within `budget` seconds, or `None` when no
/// assignment fits
pub(crate) fn solve(
    entries: &[ScheduleEntry],
    network: &dyn NetworkModel,
    device: DeviceId,
    budget: f64,
    precision: u32,
) -> Option<AdaptivePlan> {
    let n = entries.len();
    if n == 0 {
        return Some(AdaptivePlan {
            picks: Vec::new(),
            quality: 0.0,
            estimated_time: 0.0,
        });
    }

    let p = f64::from(precision);
    let d = tick_count(budget, precision) as usize;

    let mut table = vec![vec![Cell::default(); d + 1]; n + 1];
    for cell in table[0].iter_mut() {
        cell.quality = Some(0.0);
    }

    for i in 1..=n {
        let options = cost::candidates(&entries[i - 1], network, device, p);
        let (done, rest) = table.split_at_mut(i);
        let prev = &done[i - 1];
        let row = &mut rest[0];

        for t in 1..=d {
            for option in &options {
                if !admissible(option, t, d) {
                    continue;
                }
                // Unreachable predecessors must not propagate
                let Some(base) = prev[t - option.cost_ticks].quality else {
                    continue;
                };
                let quality = base + option.quality;
                if row[t].quality.is_none_or(|current| quality > current) {
                    row[t] = Cell {
                        quality: Some(quality),
                        prev_tick: t - option.cost_ticks,
                        pick: Some(Pick {
                            variant: option.variant,
                            venue: option.venue,
                            tick: t,
                            processing: option.processing_ticks,
                        }),
                    };
                }
            }
        }
    }

    // Scanning down with `>=` leaves the lowest tick on ties
    let mut best: Option<(usize, f64)> = None;
    for t in (1..=d).rev() {
        if let Some(quality) = table[n][t].quality
            && best.is_none_or(|(_, b)| quality >= b)
        {
            best = Some((t, quality));
        }
    }
    let Some((mut t, quality)) = best else {
        tracing::debug!(entries = n, ticks = d, "No reachable state at final stage");
        return None;
    };

    let mut picks = vec![(0, 0); n];
    let mut estimated_ticks = 0.0f64;
    for i in (1..=n).rev() {
        let cell = table[i][t];
        let Some(pick) = cell.pick else {
            tracing::debug!(stage = i, tick = t, "Backtrack hit an unset pick");
            return None;
        };
        estimated_ticks = estimated_ticks.max(pick.tick as f64 + pick.processing);
        picks[i - 1] = (pick.variant, pick.venue);
        t = cell.prev_tick;
    }

    tracing::debug!(entries = n, ticks = d, quality, "Adaptive plan solved");
    Some(AdaptivePlan {
        picks,
        quality,
        estimated_time: estimated_ticks / p,
    })
}

/// Ticks of the planning grid for `budget` seconds
pub(crate) fn tick_count(budget: f64, precision: u32) -> u64 {
    (budget.max(0.0) * f64::from(precision)).floor() as u64
}

fn admissible(option: &Candidate, t: usize, d: usize) -> bool {
    option.cost_ticks <= t && (t as f64) <= d as f64 - option.processing_ticks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ExecutionVenue, TaskVariant};
    use crate::network::FixedDelayNetwork;

    fn entries(count: u32, variants: Vec<TaskVariant>) -> Vec<ScheduleEntry> {
        let venues = vec![ExecutionVenue::local(0, 1.0), ExecutionVenue::edge(1, 10.0)];
        (0..count)
            .map(|_| ScheduleEntry::new(0, variants.clone(), venues.clone()).unwrap())
            .collect()
    }

    #[test]
    fn test_empty_schedule_is_trivial() {
        let network = FixedDelayNetwork::uniform(1.0, 1.0);
        let plan = solve(&[], &network, 0, 0.0, 10).unwrap();
        assert!(plan.picks.is_empty());
        assert_eq!(plan.quality, 0.0);
    }

    #[test]
    fn test_two_full_quality_tasks() {
        let network = FixedDelayNetwork::uniform(1.0, 1.0);
        let entries = entries(2, vec![TaskVariant::new(0, 0, 1.0, 10.0)]);
        let plan = solve(&entries, &network, 0, 10.0, 10).unwrap();
        assert_eq!(plan.quality, 2.0);
        // 10 s budget: at most one local run, so at least one goes remote
        assert!(plan.picks.iter().any(|&(_, venue)| venue == 1));
        assert!(plan.estimated_time <= 10.0);
    }

    #[test]
    fn test_infeasible_budget() {
        let network = FixedDelayNetwork::uniform(1.0, 1.0);
        let entries = entries(2, vec![TaskVariant::new(0, 0, 1.0, 10.0)]);
        assert!(solve(&entries, &network, 0, 0.5, 10).is_none());
    }

    #[test]
    fn test_zero_budget_is_infeasible() {
        let network = FixedDelayNetwork::uniform(1.0, 1.0);
        let entries = entries(1, vec![TaskVariant::new(0, 0, 1.0, 10.0)]);
        assert!(solve(&entries, &network, 0, 0.0, 10).is_none());
    }

    #[test]
    fn test_degrades_quality_to_fit() {
        // No remote bandwidth: only local, full quality takes 10 s
        let network = FixedDelayNetwork::uniform(0.0, 0.0);
        let entries = entries(
            2,
            vec![TaskVariant::new(0, 0, 1.0, 10.0), TaskVariant::new(1, 0, 0.4, 2.0)],
        );
        let plan = solve(&entries, &network, 0, 12.0, 1).unwrap();
        assert!((plan.quality - 1.4).abs() < 1e-9);
        let mut variants: Vec<usize> = plan.picks.iter().map(|&(v, _)| v).collect();
        variants.sort();
        assert_eq!(variants, vec![0, 1]);
    }

    #[test]
    fn test_remote_compute_must_fit_budget() {
        // Remote compute of 10 s never fits a 5 s budget even though the
        // transfers do, and local takes 100 s
        let network = FixedDelayNetwork::uniform(1.0, 1.0);
        let entries = entries(1, vec![TaskVariant::new(0, 0, 1.0, 100.0)]);
        assert!(solve(&entries, &network, 0, 5.0, 1).is_none());
        assert!(solve(&entries, &network, 0, 12.0, 1).is_some());
    }

    #[test]
    fn test_tie_prefers_lowest_tick() {
        // One local option at 2 s; every end tick from 2 to 6 gives quality 1
        let network = FixedDelayNetwork::uniform(0.0, 0.0);
        let entries = entries(1, vec![TaskVariant::new(0, 0, 1.0, 2.0)]);
        let plan = solve(&entries, &network, 0, 6.0, 1).unwrap();
        assert_eq!(plan.estimated_time, 2.0);
    }

    #[test]
    fn test_ample_budget_still_offloads() {
        // 20 s fits both runs locally, but the remote plan ends sooner
        let network = FixedDelayNetwork::uniform(1.0, 1.0);
        let entries = entries(2, vec![TaskVariant::new(0, 0, 1.0, 10.0)]);
        let plan = solve(&entries, &network, 0, 20.0, 10).unwrap();
        assert_eq!(plan.quality, 2.0);
        assert_eq!(plan.picks, vec![(0, 1), (0, 1)]);
        assert_eq!(plan.estimated_time, 5.0);
    }
}
