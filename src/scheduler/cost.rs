//! Cost figures shared by the planning strategies.

use crate::domain::{DeviceId, ExecutionVenue, TaskVariant};
use crate::network::NetworkModel;
use crate::schedule::ScheduleEntry;

/// One (variant, venue) option of an entry, priced in ticks
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Candidate {
    pub variant: usize,
    pub venue: usize,
    pub quality: f64,
    /// Ticks charged against the sequential budget
    pub cost_ticks: usize,
    /// Remote compute ticks, not charged against the budget
    pub processing_ticks: f64,
}

/// Upload and download delay towards a remote venue, `None` without bandwidth
fn transfer_delays(
    network: &dyn NetworkModel,
    device: DeviceId,
    venue: &ExecutionVenue,
    variant: &TaskVariant,
) -> Option<(f64, f64)> {
    let upload = network.upload_delay(device, venue, variant);
    let download = network.download_delay(device, venue, variant);
    (upload > 0.0 && download > 0.0).then_some((upload, download))
}

/// Whole seconds until the result is back on the device:
/// `ceil(upload + local compute + download)`
pub(crate) fn estimate_seconds(
    network: &dyn NetworkModel,
    device: DeviceId,
    venue: &ExecutionVenue,
    variant: &TaskVariant,
) -> Option<f64> {
    if venue.class.is_remote() {
        let (upload, download) = transfer_delays(network, device, venue, variant)?;
        Some((upload + download).ceil())
    } else {
        Some(venue.compute_seconds(variant.length).ceil())
    }
}

fn price(
    network: &dyn NetworkModel,
    device: DeviceId,
    venue: &ExecutionVenue,
    variant: &TaskVariant,
    precision: f64,
) -> Option<(usize, f64)> {
    if venue.class.is_remote() {
        let (upload, download) = transfer_delays(network, device, venue, variant)?;
        let cost = ((upload + download) * precision).ceil();
        Some((cost as usize, venue.compute_seconds(variant.length) * precision))
    } else {
        let cost = (venue.compute_seconds(variant.length) * precision).ceil();
        Some((cost as usize, 0.0))
    }
}

/// All priced options of an entry, variants outer and venues inner.
/// Remote venues without bandwidth are left out.
pub(crate) fn candidates(
    entry: &ScheduleEntry,
    network: &dyn NetworkModel,
    device: DeviceId,
    precision: f64,
) -> Vec<Candidate> {
    let mut out = Vec::with_capacity(entry.variants().len() * entry.venues().len());
    for (vi, variant) in entry.variants().iter().enumerate() {
        for (ci, venue) in entry.venues().iter().enumerate() {
            if let Some((cost_ticks, processing_ticks)) = price(network, device, venue, variant, precision) {
                out.push(Candidate {
                    variant: vi,
                    venue: ci,
                    quality: variant.quality,
                    cost_ticks,
                    processing_ticks,
                });
            }
        }
    }
    out
}

/// Completion estimate of the current selections executed back to back:
/// the latest `(cumulative tick + remote processing) / precision`
pub(crate) fn estimate_completion(
    entries: &[ScheduleEntry],
    network: &dyn NetworkModel,
    device: DeviceId,
    precision: f64,
) -> f64 {
    let mut tick = 0usize;
    let mut latest = 0.0f64;
    for entry in entries {
        let priced = price(network, device, entry.selected_venue(), entry.selected_variant(), precision);
        let (cost, processing) = priced.unwrap_or((0, 0.0));
        tick = tick.saturating_add(cost);
        latest = latest.max((tick as f64 + processing) / precision);
    }
    latest
}
