//! Background devices replaying the primary plan.
//!
//! Each background device sends the planned tasks one after another: local
//! work keeps it busy for the compute time, remote work holds the link for the
//! upload. Once everything is sent it downloads the remote results in order.
//! Only the network model sees these transfers, which is what moves the
//! active client counts under the primary device's feet.

use std::collections::VecDeque;

use crate::domain::{DeviceId, ExecutionVenue, TaskVariant};
use crate::network::NetworkModel;

/// Step of one background device, addressed by its slot in the simulation
#[derive(Debug, Clone, PartialEq)]
pub enum BackgroundEvent {
    SendNext { slot: usize },
    UploadFinished { slot: usize, venue: ExecutionVenue },
    DownloadFinished { slot: usize },
}

#[derive(Debug, Clone)]
struct Job {
    variant: TaskVariant,
    venue: ExecutionVenue,
}

/// A device that only generates load
#[derive(Debug, Clone)]
pub struct BackgroundDevice {
    id: DeviceId,
    slot: usize,
    to_send: VecDeque<Job>,
    to_receive: VecDeque<Job>,
}

impl BackgroundDevice {
    pub fn new(id: DeviceId, slot: usize, plan: &[(TaskVariant, ExecutionVenue)]) -> Self {
        Self {
            id,
            slot,
            to_send: plan
                .iter()
                .map(|(variant, venue)| Job {
                    variant: variant.clone(),
                    venue: venue.clone(),
                })
                .collect(),
            to_receive: VecDeque::new(),
        }
    }

    pub fn id(&self) -> DeviceId {
        self.id
    }

    /// Nothing left to send or receive
    pub fn is_done(&self) -> bool {
        self.to_send.is_empty() && self.to_receive.is_empty()
    }

    /// Send the next planned task, or start on the results once all are sent.
    /// Returns follow-up events with their delays.
    pub fn send_next(&mut self, network: &mut dyn NetworkModel) -> Vec<(f64, BackgroundEvent)> {
        let Some(job) = self.to_send.pop_front() else {
            return self.start_download(network).into_iter().collect();
        };

        let next = BackgroundEvent::SendNext { slot: self.slot };
        if !job.venue.class.is_remote() {
            return vec![(job.venue.compute_seconds(job.variant.length), next)];
        }

        let delay = network.upload_delay(self.id, &job.venue, &job.variant).max(0.0);
        network.upload_started(self.id, &job.venue);
        let venue = job.venue.clone();
        self.to_receive.push_back(job);
        vec![
            (
                delay,
                BackgroundEvent::UploadFinished {
                    slot: self.slot,
                    venue,
                },
            ),
            (delay, next),
        ]
    }

    pub fn upload_finished(&self, venue: &ExecutionVenue, network: &mut dyn NetworkModel) {
        network.upload_finished(self.id, venue);
    }

    /// Release the link held by the oldest result and start on the next one
    pub fn download_finished(&mut self, network: &mut dyn NetworkModel) -> Option<(f64, BackgroundEvent)> {
        if let Some(job) = self.to_receive.pop_front() {
            network.download_finished(self.id, &job.venue);
        }
        self.start_download(network)
    }

    fn start_download(&self, network: &mut dyn NetworkModel) -> Option<(f64, BackgroundEvent)> {
        let job = self.to_receive.front()?;
        let delay = network.download_delay(self.id, &job.venue, &job.variant).max(0.0);
        network.download_started(self.id, &job.venue);
        Some((delay, BackgroundEvent::DownloadFinished { slot: self.slot }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::VenueClass;
    use crate::network::{LinkParams, SharedLinkNetwork};

    fn plan() -> Vec<(TaskVariant, ExecutionVenue)> {
        let variant = TaskVariant::new(0, 0, 1.0, 10.0).with_sizes(100.0, 100.0);
        vec![
            (variant.clone(), ExecutionVenue::local(0, 1.0)),
            (variant.clone(), ExecutionVenue::edge(1, 10.0)),
            (variant, ExecutionVenue::edge(1, 10.0)),
        ]
    }

    fn network() -> SharedLinkNetwork {
        SharedLinkNetwork::new(
            LinkParams {
                bandwidth: 100.0,
                ..LinkParams::default()
            },
            LinkParams::default(),
        )
    }

    #[test]
    fn test_local_work_only_waits() {
        let mut network = network();
        let mut device = BackgroundDevice::new(1, 0, &plan());
        let steps = device.send_next(&mut network);
        assert_eq!(steps, vec![(10.0, BackgroundEvent::SendNext { slot: 0 })]);
        assert_eq!(network.active_clients(VenueClass::Edge), 0);
    }

    #[test]
    fn test_replays_uploads_then_downloads() {
        let mut network = network();
        let mut device = BackgroundDevice::new(1, 0, &plan());
        let edge = ExecutionVenue::edge(1, 10.0);

        device.send_next(&mut network);
        let steps = device.send_next(&mut network);
        assert_eq!(network.active_clients(VenueClass::Edge), 1);
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].0, 1.0);
        device.upload_finished(&edge, &mut network);
        assert_eq!(network.active_clients(VenueClass::Edge), 0);

        device.send_next(&mut network);
        device.upload_finished(&edge, &mut network);

        // Everything sent: the first result comes back
        let steps = device.send_next(&mut network);
        assert_eq!(steps, vec![(1.0, BackgroundEvent::DownloadFinished { slot: 0 })]);
        assert_eq!(network.active_clients(VenueClass::Edge), 1);

        assert!(device.download_finished(&mut network).is_some());
        assert!(device.download_finished(&mut network).is_none());
        assert_eq!(network.active_clients(VenueClass::Edge), 0);
        assert!(device.is_done());
    }
}
