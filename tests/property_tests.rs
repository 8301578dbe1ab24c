//! Property-based tests for the planning strategies using proptest.
//!
//! - The adaptive planner matches an exhaustive search on small batches
//! - Raising the deadline never lowers the achievable quality
//! - Every strategy only selects options the entry offers

use proptest::prelude::*;

use offloadr::catalog::TaskCatalog;
use offloadr::domain::{ExecutionVenue, TaskVariant, VenueClass, VenueSet};
use offloadr::network::{FixedDelayNetwork, LinkDelays, NetworkModel};
use offloadr::schedule::Schedule;
use offloadr::scheduler::{PlanOutcome, Scheduler, SchedulerConfig, Strategy as PlanStrategy};
use offloadr::workload::Workload;

const PRECISION: u32 = 10;
const MAX_ENTRIES: u32 = 6;

#[derive(Debug, Clone)]
struct Instance {
    variants: Vec<TaskVariant>,
    venues: Vec<ExecutionVenue>,
    counts: Vec<(u32, u32)>,
    edge: LinkDelays,
    cloud: LinkDelays,
    deadline_percentage: f64,
}

impl Instance {
    fn network(&self) -> FixedDelayNetwork {
        FixedDelayNetwork::new(self.edge, self.cloud)
    }

    fn scheduler(&self, strategy: PlanStrategy, deadline_percentage: f64) -> Scheduler {
        let config = SchedulerConfig {
            strategy,
            deadline_percentage,
            precision: PRECISION,
            seed: Some(7),
            ..SchedulerConfig::default()
        };
        Scheduler::new(VenueSet::new(self.venues.clone()), config, 0).unwrap()
    }

    fn schedule(&self, scheduler: &Scheduler) -> Schedule {
        let catalog = TaskCatalog::new(self.variants.clone()).unwrap();
        scheduler
            .build_schedule(&catalog, &Workload::from_pairs(&self.counts))
            .unwrap()
    }

    fn has_class(&self, class: VenueClass) -> bool {
        self.venues.iter().any(|v| v.class == class)
    }
}

fn delay() -> impl Strategy<Value = f64> {
    prop::sample::select(vec![0.5, 1.0, 2.0])
}

fn link() -> impl Strategy<Value = LinkDelays> {
    (delay(), delay()).prop_map(|(upload, download)| LinkDelays { upload, download })
}

fn arb_instance() -> impl Strategy<Value = Instance> {
    (
        // per group: full-quality length, extra (quality tenths, length), count
        prop::collection::vec(
            (1u32..=20, prop::collection::vec((1u32..=9, 1u32..=20), 0..=2), 1u32..=3),
            1..=3,
        ),
        prop::sample::select(vec![1.0, 2.0, 5.0]),
        prop::collection::vec((any::<bool>(), prop::sample::select(vec![2.0, 5.0, 10.0, 20.0])), 0..=2),
        link(),
        link(),
        10u32..=150,
    )
        .prop_map(|(groups, local_rate, remotes, edge, cloud, pct)| {
            let mut variants = Vec::new();
            let mut counts = Vec::new();
            let mut used = 0;
            for (group, (full_length, extras, count)) in groups.into_iter().enumerate() {
                let group = group as u32;
                let next_id = variants.len() as u32;
                variants.push(TaskVariant::new(next_id, group, 1.0, f64::from(full_length)));
                for (tenths, length) in extras {
                    let next_id = variants.len() as u32;
                    variants.push(TaskVariant::new(
                        next_id,
                        group,
                        f64::from(tenths) / 10.0,
                        f64::from(length),
                    ));
                }
                let count = count.min(MAX_ENTRIES - used);
                used += count;
                counts.push((group, count));
            }

            let mut venues = vec![ExecutionVenue::local(0, local_rate)];
            for (i, (cloud_venue, rate)) in remotes.into_iter().enumerate() {
                let id = i as u32 + 1;
                venues.push(if cloud_venue {
                    ExecutionVenue::cloud(id, rate)
                } else {
                    ExecutionVenue::edge(id, rate)
                });
            }

            Instance {
                variants,
                venues,
                counts,
                edge,
                cloud,
                deadline_percentage: f64::from(pct),
            }
        })
}

/// (cost ticks, remote processing ticks) of one option, priced like the planner
fn price(network: &dyn NetworkModel, venue: &ExecutionVenue, variant: &TaskVariant, p: f64) -> Option<(usize, f64)> {
    if venue.class.is_remote() {
        let upload = network.upload_delay(0, venue, variant);
        let download = network.download_delay(0, venue, variant);
        if upload <= 0.0 || download <= 0.0 {
            return None;
        }
        Some((((upload + download) * p).ceil() as usize, venue.compute_seconds(variant.length) * p))
    } else {
        Some(((venue.compute_seconds(variant.length) * p).ceil() as usize, 0.0))
    }
}

/// Best total quality over every assignment that fits, by exhaustive search
fn brute_force(schedule: &Schedule, network: &dyn NetworkModel) -> Option<f64> {
    let p = f64::from(PRECISION);
    let d = (schedule.deadline().max(0.0) * p).floor() as usize;
    let options: Vec<Vec<(f64, usize, f64)>> = schedule
        .entries()
        .map(|entry| {
            let mut out = Vec::new();
            for variant in entry.variants() {
                for venue in entry.venues() {
                    if let Some((cost, processing)) = price(network, venue, variant, p) {
                        out.push((variant.quality, cost, processing));
                    }
                }
            }
            out
        })
        .collect();

    fn search(options: &[Vec<(f64, usize, f64)>], tick: usize, d: usize) -> Option<f64> {
        let Some((first, rest)) = options.split_first() else {
            return Some(0.0);
        };
        let mut best: Option<f64> = None;
        for &(quality, cost, processing) in first {
            let t = tick + cost;
            if t < 1 || t > d || (t as f64) > d as f64 - processing {
                continue;
            }
            if let Some(tail) = search(rest, t, d) {
                let total = quality + tail;
                if best.is_none_or(|b| total > b) {
                    best = Some(total);
                }
            }
        }
        best
    }

    search(&options, 0, d)
}

fn plan(instance: &Instance, strategy: PlanStrategy, pct: f64) -> (PlanOutcome, Schedule) {
    let mut scheduler = instance.scheduler(strategy, pct);
    let mut schedule = instance.schedule(&scheduler);
    let outcome = scheduler.plan(&mut schedule, &instance.network()).unwrap();
    (outcome, schedule)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// The adaptive plan reaches the exhaustive optimum, and fails only when
    /// nothing fits.
    #[test]
    fn adaptive_matches_exhaustive_search(instance in arb_instance()) {
        let scheduler = instance.scheduler(PlanStrategy::Adaptive, instance.deadline_percentage);
        let reference = instance.schedule(&scheduler);
        let expected = brute_force(&reference, &instance.network());

        let (outcome, schedule) = plan(&instance, PlanStrategy::Adaptive, instance.deadline_percentage);
        match (outcome, expected) {
            (PlanOutcome::Planned { quality, estimated_time }, Some(best)) => {
                prop_assert!((quality - best).abs() < 1e-9, "planned {} vs best {}", quality, best);
                prop_assert!((schedule.total_quality() - best).abs() < 1e-9);
                prop_assert!(estimated_time <= schedule.deadline() + 1e-9);
            }
            (PlanOutcome::Infeasible, None) => {
                prop_assert!(schedule.is_empty());
            }
            (outcome, expected) => {
                prop_assert!(false, "outcome {:?} but exhaustive search gives {:?}", outcome, expected);
            }
        }
    }

    /// A longer deadline never makes the adaptive plan worse.
    #[test]
    fn quality_is_monotonic_in_deadline(instance in arb_instance(), extra in 0u32..=100) {
        let tight = instance.deadline_percentage;
        let loose = tight + f64::from(extra);
        let (tight_outcome, _) = plan(&instance, PlanStrategy::Adaptive, tight);
        let (loose_outcome, _) = plan(&instance, PlanStrategy::Adaptive, loose);

        match (tight_outcome, loose_outcome) {
            (PlanOutcome::Planned { quality: a, .. }, PlanOutcome::Planned { quality: b, .. }) => {
                prop_assert!(a <= b + 1e-9, "quality dropped from {} to {}", a, b);
            }
            (PlanOutcome::Planned { .. }, other) => {
                prop_assert!(false, "feasible at {}% but {:?} at {}%", tight, other, loose);
            }
            _ => {}
        }
    }

    /// Whatever the strategy, each entry ends up on one of its own variants
    /// and one of the configured venues.
    #[test]
    fn selections_stay_within_candidates(instance in arb_instance()) {
        for strategy in PlanStrategy::all() {
            let required = match strategy {
                PlanStrategy::OnlyLocal => Some(VenueClass::Local),
                PlanStrategy::OnlyEdge => Some(VenueClass::Edge),
                PlanStrategy::OnlyCloud => Some(VenueClass::Cloud),
                _ => None,
            };

            let mut scheduler = instance.scheduler(strategy, instance.deadline_percentage);
            let mut schedule = instance.schedule(&scheduler);
            let result = scheduler.plan(&mut schedule, &instance.network());

            if let Some(class) = required
                && !instance.has_class(class)
            {
                prop_assert!(result.is_err(), "{} planned without a {} venue", strategy, class);
                continue;
            }
            let outcome = result.unwrap();
            if outcome == PlanOutcome::Infeasible {
                continue;
            }

            for entry in schedule.entries() {
                let assignment = entry.assignment();
                prop_assert!(entry.variants().iter().any(|v| v.id == assignment.variant && v.group == entry.group()));
                let venue = instance.venues.iter().find(|v| v.id == assignment.venue);
                prop_assert!(venue.is_some(), "{} picked unknown venue {}", strategy, assignment.venue);
                if let (Some(class), Some(venue)) = (required, venue) {
                    prop_assert_eq!(venue.class, class);
                }
                if strategy == PlanStrategy::Minimal {
                    let lowest = entry.variants().iter().map(|v| v.quality).fold(f64::INFINITY, f64::min);
                    prop_assert_eq!(entry.selected_variant().quality, lowest);
                }
            }
        }
    }
}
