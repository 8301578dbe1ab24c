//! Non-optimal strategies. They always produce a selection for every entry but
//! ignore the deadline.

use rand::Rng;
use rand::rngs::StdRng;

use crate::domain::{DeviceId, VenueClass};
use crate::error::{OffloadError, Result};
use crate::network::NetworkModel;
use crate::schedule::ScheduleEntry;

use super::cost::estimate_seconds;

/// Fastest (variant, venue) among variants at least as good as the current one
pub(crate) fn greedy(entries: &mut [ScheduleEntry], network: &dyn NetworkModel, device: DeviceId) -> Result<()> {
    for entry in entries.iter_mut() {
        let floor = entry.selected_variant().quality;
        let mut best: Option<(f64, usize, usize)> = None;
        for (vi, variant) in entry.variants().iter().enumerate() {
            if variant.quality < floor {
                continue;
            }
            for (ci, venue) in entry.venues().iter().enumerate() {
                let Some(estimate) = estimate_seconds(network, device, venue, variant) else {
                    continue;
                };
                if best.is_none_or(|(b, _, _)| estimate < b) {
                    best = Some((estimate, vi, ci));
                }
            }
        }
        if let Some((_, vi, ci)) = best {
            entry.select_at(vi, ci)?;
        }
    }
    Ok(())
}

/// Highest quality per estimated second
pub(crate) fn value_density(
    entries: &mut [ScheduleEntry],
    network: &dyn NetworkModel,
    device: DeviceId,
) -> Result<()> {
    for entry in entries.iter_mut() {
        let mut best = 0.0f64;
        let mut choice = None;
        for (vi, variant) in entry.variants().iter().enumerate() {
            for (ci, venue) in entry.venues().iter().enumerate() {
                let Some(estimate) = estimate_seconds(network, device, venue, variant) else {
                    continue;
                };
                let density = if estimate == 0.0 {
                    f64::INFINITY
                } else {
                    variant.quality / estimate
                };
                if density > best {
                    best = density;
                    choice = Some((vi, ci));
                }
            }
        }
        if let Some((vi, ci)) = choice {
            entry.select_at(vi, ci)?;
        }
    }
    Ok(())
}

/// Cheapest variant of the lowest quality on the fastest venue
pub(crate) fn minimal(entries: &mut [ScheduleEntry], network: &dyn NetworkModel, device: DeviceId) -> Result<()> {
    for entry in entries.iter_mut() {
        let mut vi = 0;
        for (index, variant) in entry.variants().iter().enumerate() {
            let current = &entry.variants()[vi];
            if variant.quality < current.quality
                || (variant.quality == current.quality && variant.length < current.length)
            {
                vi = index;
            }
        }

        let variant = &entry.variants()[vi];
        let mut best: Option<(f64, usize)> = None;
        for (ci, venue) in entry.venues().iter().enumerate() {
            let Some(estimate) = estimate_seconds(network, device, venue, variant) else {
                continue;
            };
            if best.is_none_or(|(b, _)| estimate < b) {
                best = Some((estimate, ci));
            }
        }

        match best {
            Some((_, ci)) => entry.select_at(vi, ci)?,
            None => entry.select_variant_at(vi)?,
        }
    }
    Ok(())
}

/// Round-robin over the venues of one class by entry position
pub(crate) fn only_class(entries: &mut [ScheduleEntry], class: VenueClass) -> Result<()> {
    for (index, entry) in entries.iter_mut().enumerate() {
        let pool: Vec<usize> = entry
            .venues()
            .iter()
            .enumerate()
            .filter(|(_, v)| v.class == class)
            .map(|(ci, _)| ci)
            .collect();
        if pool.is_empty() {
            return Err(OffloadError::InvalidConfig(format!(
                "strategy only-{} needs at least one {} venue",
                class, class
            )));
        }
        let variant = entry.selected_variant().id;
        let position = entry
            .variants()
            .iter()
            .position(|v| v.id == variant)
            .unwrap_or_default();
        entry.select_at(position, pool[index % pool.len()])?;
    }
    Ok(())
}

/// Uniform class, then uniform venue within it, then uniform variant
pub(crate) fn random(entries: &mut [ScheduleEntry], rng: &mut StdRng) -> Result<()> {
    for entry in entries.iter_mut() {
        let classes: Vec<VenueClass> = VenueClass::all()
            .into_iter()
            .filter(|c| entry.venues().iter().any(|v| v.class == *c))
            .collect();
        if classes.is_empty() {
            continue;
        }
        let class = classes[rng.random_range(0..classes.len())];
        let pool: Vec<usize> = entry
            .venues()
            .iter()
            .enumerate()
            .filter(|(_, v)| v.class == class)
            .map(|(ci, _)| ci)
            .collect();
        let venue = pool[rng.random_range(0..pool.len())];
        let variant = rng.random_range(0..entry.variants().len());
        entry.select_at(variant, venue)?;
    }
    Ok(())
}
