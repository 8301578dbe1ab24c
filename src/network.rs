//! Network delay model
//!
//! The core only sees the [`NetworkModel`] trait. Two implementations ship:
//! - [`FixedDelayNetwork`]: constant upload/download delay per venue class
//! - [`SharedLinkNetwork`]: a per-class link whose bandwidth is split among the
//!   clients currently transferring, reporting no bandwidth (delay 0) when the
//!   link is saturated
//!
//! A non-positive delay always means "no bandwidth available".

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::{DeviceId, ExecutionVenue, TaskVariant, VenueClass};

/// Delay oracle plus transfer bookkeeping hooks
pub trait NetworkModel {
    /// Seconds to move the variant's input to `venue`; `<= 0` means no bandwidth
    fn upload_delay(&self, device: DeviceId, venue: &ExecutionVenue, variant: &TaskVariant) -> f64;

    /// Seconds to bring the variant's result back from `venue`
    fn download_delay(&self, device: DeviceId, venue: &ExecutionVenue, variant: &TaskVariant) -> f64;

    fn upload_started(&mut self, _device: DeviceId, _venue: &ExecutionVenue) {}
    fn upload_finished(&mut self, _device: DeviceId, _venue: &ExecutionVenue) {}
    fn download_started(&mut self, _device: DeviceId, _venue: &ExecutionVenue) {}
    fn download_finished(&mut self, _device: DeviceId, _venue: &ExecutionVenue) {}

    /// Clients currently using the links towards `class`
    fn active_clients(&self, class: VenueClass) -> u32;
}

/// Constant upload and download delay, in seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct LinkDelays {
    pub upload: f64,
    pub download: f64,
}

impl Default for LinkDelays {
    fn default() -> Self {
        Self {
            upload: 1.0,
            download: 1.0,
        }
    }
}

/// Same delay for every transfer towards a class
#[derive(Debug, Clone, PartialEq)]
pub struct FixedDelayNetwork {
    edge: LinkDelays,
    cloud: LinkDelays,
}

impl FixedDelayNetwork {
    pub fn new(edge: LinkDelays, cloud: LinkDelays) -> Self {
        Self { edge, cloud }
    }

    /// One delay pair for both remote classes
    pub fn uniform(upload: f64, download: f64) -> Self {
        let delays = LinkDelays { upload, download };
        Self::new(delays, delays)
    }

    fn delays(&self, class: VenueClass) -> Option<LinkDelays> {
        match class {
            VenueClass::Local => None,
            VenueClass::Edge => Some(self.edge),
            VenueClass::Cloud => Some(self.cloud),
        }
    }
}

impl NetworkModel for FixedDelayNetwork {
    fn upload_delay(&self, _device: DeviceId, venue: &ExecutionVenue, _variant: &TaskVariant) -> f64 {
        self.delays(venue.class).map(|d| d.upload).unwrap_or(0.0)
    }

    fn download_delay(&self, _device: DeviceId, venue: &ExecutionVenue, _variant: &TaskVariant) -> f64 {
        self.delays(venue.class).map(|d| d.download).unwrap_or(0.0)
    }

    fn active_clients(&self, _class: VenueClass) -> u32 {
        0
    }
}

/// Parameters of one shared link
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct LinkParams {
    /// Link capacity in KB per second
    pub bandwidth: f64,

    /// Fixed latency added to every transfer, in seconds
    pub propagation: f64,

    /// Transfers beyond this many saturate the link
    pub max_clients: Option<u32>,

    /// Other devices permanently sharing the link
    pub background_clients: u32,
}

impl Default for LinkParams {
    fn default() -> Self {
        Self {
            bandwidth: 1000.0,
            propagation: 0.0,
            max_clients: None,
            background_clients: 0,
        }
    }
}

/// Per-class bandwidth split evenly among active transfers
#[derive(Debug, Clone, PartialEq)]
pub struct SharedLinkNetwork {
    edge: LinkParams,
    cloud: LinkParams,
    transfers: HashMap<VenueClass, u32>,
}

impl SharedLinkNetwork {
    pub fn new(edge: LinkParams, cloud: LinkParams) -> Self {
        Self {
            edge,
            cloud,
            transfers: HashMap::new(),
        }
    }

    fn link(&self, class: VenueClass) -> Option<&LinkParams> {
        match class {
            VenueClass::Local => None,
            VenueClass::Edge => Some(&self.edge),
            VenueClass::Cloud => Some(&self.cloud),
        }
    }

    fn transfers(&self, class: VenueClass) -> u32 {
        self.transfers.get(&class).copied().unwrap_or(0)
    }

    /// Delay for `size` KB if one more transfer joined the link
    fn transfer_delay(&self, class: VenueClass, size: f64) -> f64 {
        let Some(link) = self.link(class) else {
            return 0.0;
        };
        let users = link.background_clients + self.transfers(class) + 1;
        if link.bandwidth <= 0.0 || link.max_clients.is_some_and(|max| users > max) {
            return 0.0;
        }
        link.propagation + size / (link.bandwidth / f64::from(users))
    }

    fn begin(&mut self, class: VenueClass) {
        if class.is_remote() {
            *self.transfers.entry(class).or_insert(0) += 1;
        }
    }

    fn end(&mut self, class: VenueClass) {
        if let Some(count) = self.transfers.get_mut(&class) {
            *count = count.saturating_sub(1);
        }
    }
}

impl NetworkModel for SharedLinkNetwork {
    fn upload_delay(&self, _device: DeviceId, venue: &ExecutionVenue, variant: &TaskVariant) -> f64 {
        self.transfer_delay(venue.class, variant.input_size)
    }

    fn download_delay(&self, _device: DeviceId, venue: &ExecutionVenue, variant: &TaskVariant) -> f64 {
        self.transfer_delay(venue.class, variant.output_size)
    }

    fn upload_started(&mut self, _device: DeviceId, venue: &ExecutionVenue) {
        self.begin(venue.class);
    }

    fn upload_finished(&mut self, _device: DeviceId, venue: &ExecutionVenue) {
        self.end(venue.class);
    }

    fn download_started(&mut self, _device: DeviceId, venue: &ExecutionVenue) {
        self.begin(venue.class);
    }

    fn download_finished(&mut self, _device: DeviceId, venue: &ExecutionVenue) {
        self.end(venue.class);
    }

    fn active_clients(&self, class: VenueClass) -> u32 {
        match self.link(class) {
            Some(link) => link.background_clients + self.transfers(class),
            None => 0,
        }
    }
}

/// Selects and parameterizes the network model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum NetworkConfig {
    Fixed {
        #[serde(default)]
        edge: LinkDelays,
        #[serde(default)]
        cloud: LinkDelays,
    },
    SharedLink {
        #[serde(default)]
        edge: LinkParams,
        #[serde(default)]
        cloud: LinkParams,
    },
}

impl Default for NetworkConfig {
    fn default() -> Self {
        NetworkConfig::Fixed {
            edge: LinkDelays::default(),
            cloud: LinkDelays {
                upload: 2.0,
                download: 2.0,
            },
        }
    }
}

impl NetworkConfig {
    pub fn build(&self) -> Box<dyn NetworkModel> {
        match self {
            NetworkConfig::Fixed { edge, cloud } => Box::new(FixedDelayNetwork::new(*edge, *cloud)),
            NetworkConfig::SharedLink { edge, cloud } => Box::new(SharedLinkNetwork::new(*edge, *cloud)),
        }
    }
}

impl<N: NetworkModel + ?Sized> NetworkModel for Box<N> {
    fn upload_delay(&self, device: DeviceId, venue: &ExecutionVenue, variant: &TaskVariant) -> f64 {
        (**self).upload_delay(device, venue, variant)
    }

    fn download_delay(&self, device: DeviceId, venue: &ExecutionVenue, variant: &TaskVariant) -> f64 {
        (**self).download_delay(device, venue, variant)
    }

    fn upload_started(&mut self, device: DeviceId, venue: &ExecutionVenue) {
        (**self).upload_started(device, venue)
    }

    fn upload_finished(&mut self, device: DeviceId, venue: &ExecutionVenue) {
        (**self).upload_finished(device, venue)
    }

    fn download_started(&mut self, device: DeviceId, venue: &ExecutionVenue) {
        (**self).download_started(device, venue)
    }

    fn download_finished(&mut self, device: DeviceId, venue: &ExecutionVenue) {
        (**self).download_finished(device, venue)
    }

    fn active_clients(&self, class: VenueClass) -> u32 {
        (**self).active_clients(class)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variant() -> TaskVariant {
        TaskVariant::new(0, 0, 1.0, 10.0).with_sizes(100.0, 50.0)
    }

    #[test]
    fn test_fixed_delays_per_class() {
        let network = FixedDelayNetwork::new(
            LinkDelays {
                upload: 1.0,
                download: 0.5,
            },
            LinkDelays {
                upload: 3.0,
                download: 2.0,
            },
        );
        let v = variant();
        assert_eq!(network.upload_delay(0, &ExecutionVenue::edge(1, 10.0), &v), 1.0);
        assert_eq!(network.download_delay(0, &ExecutionVenue::cloud(2, 10.0), &v), 2.0);
        assert_eq!(network.upload_delay(0, &ExecutionVenue::local(0, 1.0), &v), 0.0);
        assert_eq!(network.active_clients(VenueClass::Edge), 0);
    }

    #[test]
    fn test_shared_link_splits_bandwidth() {
        let mut network = SharedLinkNetwork::new(
            LinkParams {
                bandwidth: 100.0,
                ..LinkParams::default()
            },
            LinkParams::default(),
        );
        let edge = ExecutionVenue::edge(1, 10.0);
        let v = variant();

        assert_eq!(network.upload_delay(0, &edge, &v), 1.0);
        network.upload_started(0, &edge);
        assert_eq!(network.active_clients(VenueClass::Edge), 1);
        assert_eq!(network.upload_delay(1, &edge, &v), 2.0);
        network.upload_finished(0, &edge);
        assert_eq!(network.active_clients(VenueClass::Edge), 0);
    }

    #[test]
    fn test_shared_link_saturation() {
        let mut network = SharedLinkNetwork::new(
            LinkParams {
                bandwidth: 100.0,
                max_clients: Some(1),
                ..LinkParams::default()
            },
            LinkParams::default(),
        );
        let edge = ExecutionVenue::edge(1, 10.0);
        network.download_started(0, &edge);
        assert_eq!(network.download_delay(1, &edge, &variant()), 0.0);
        network.download_finished(0, &edge);
        assert!(network.download_delay(1, &edge, &variant()) > 0.0);
    }

    #[test]
    fn test_shared_link_background_clients() {
        let network = SharedLinkNetwork::new(
            LinkParams::default(),
            LinkParams {
                bandwidth: 100.0,
                propagation: 0.5,
                background_clients: 1,
                max_clients: None,
            },
        );
        assert_eq!(network.active_clients(VenueClass::Cloud), 1);
        assert_eq!(network.upload_delay(0, &ExecutionVenue::cloud(2, 1.0), &variant()), 2.5);
    }

    #[test]
    fn test_finished_without_start_is_ignored() {
        let mut network = SharedLinkNetwork::new(LinkParams::default(), LinkParams::default());
        network.upload_finished(0, &ExecutionVenue::edge(1, 1.0));
        assert_eq!(network.active_clients(VenueClass::Edge), 0);
    }

    #[test]
    fn test_network_config_yaml() {
        let yaml = "kind: shared-link\nedge:\n  bandwidth: 500\n  max-clients: 4\n";
        let config: NetworkConfig = serde_yaml::from_str(yaml).unwrap();
        let NetworkConfig::SharedLink { edge, cloud } = config else {
            panic!("expected shared-link");
        };
        assert_eq!(edge.bandwidth, 500.0);
        assert_eq!(edge.max_clients, Some(4));
        assert_eq!(cloud, LinkParams::default());
    }

    #[test]
    fn test_boxed_model_delegates() {
        let network: Box<dyn NetworkModel> = NetworkConfig::default().build();
        let cloud = ExecutionVenue::cloud(2, 1.0);
        assert_eq!(network.upload_delay(0, &cloud, &variant()), 2.0);
    }
}
