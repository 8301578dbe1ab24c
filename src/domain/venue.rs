//! Execution venues and the read-only set the core plans against.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::VenueId;

/// Where a venue sits relative to the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VenueClass {
    /// The device's own processor
    Local,
    /// Remote-near: an edge unit behind the WLAN
    Edge,
    /// Remote-far: a cloud unit behind the WAN
    Cloud,
}

impl VenueClass {
    /// Remote venues need an upload and a download
    pub fn is_remote(&self) -> bool {
        !matches!(self, VenueClass::Local)
    }

    pub fn all() -> [VenueClass; 3] {
        [VenueClass::Local, VenueClass::Edge, VenueClass::Cloud]
    }
}

impl fmt::Display for VenueClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            VenueClass::Local => "local",
            VenueClass::Edge => "edge",
            VenueClass::Cloud => "cloud",
        };
        write!(f, "{}", name)
    }
}

/// A capacity unit with an immutable processing rate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ExecutionVenue {
    pub id: VenueId,
    pub class: VenueClass,

    /// Million instructions per second
    pub rate: f64,

    /// Maximum tasks in flight on this venue; `None` admits everything
    #[serde(default)]
    pub max_in_flight: Option<u32>,
}

impl ExecutionVenue {
    pub fn new(id: VenueId, class: VenueClass, rate: f64) -> Self {
        Self {
            id,
            class,
            rate,
            max_in_flight: None,
        }
    }

    pub fn local(id: VenueId, rate: f64) -> Self {
        Self::new(id, VenueClass::Local, rate)
    }

    pub fn edge(id: VenueId, rate: f64) -> Self {
        Self::new(id, VenueClass::Edge, rate)
    }

    pub fn cloud(id: VenueId, rate: f64) -> Self {
        Self::new(id, VenueClass::Cloud, rate)
    }

    pub fn with_max_in_flight(mut self, limit: u32) -> Self {
        self.max_in_flight = Some(limit);
        self
    }

    /// Seconds needed to process `length` instructions here
    pub fn compute_seconds(&self, length: f64) -> f64 {
        length / self.rate
    }
}

/// Ordered, immutable collection of venues
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VenueSet {
    venues: Vec<ExecutionVenue>,
}

impl VenueSet {
    pub fn new(venues: Vec<ExecutionVenue>) -> Self {
        Self { venues }
    }

    pub fn get(&self, id: VenueId) -> Option<&ExecutionVenue> {
        self.venues.iter().find(|v| v.id == id)
    }

    /// First local venue; it defines the deadline baseline rate
    pub fn local(&self) -> Option<&ExecutionVenue> {
        self.venues.iter().find(|v| v.class == VenueClass::Local)
    }

    pub fn of_class(&self, class: VenueClass) -> impl Iterator<Item = &ExecutionVenue> {
        self.venues.iter().filter(move |v| v.class == class)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExecutionVenue> {
        self.venues.iter()
    }

    pub fn len(&self) -> usize {
        self.venues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.venues.is_empty()
    }
}
