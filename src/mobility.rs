//! Device mobility
//!
//! Answers which access point serves a device at a given time. A task whose
//! device moved between submission and result pickup fails with
//! `FailedMobility`.

use serde::{Deserialize, Serialize};

use crate::domain::{DeviceId, LocationId, SimTime};

pub trait MobilityModel {
    fn serving_point(&self, device: DeviceId, time: SimTime) -> LocationId;
}

/// Device never moves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StaticMobility {
    location: LocationId,
}

impl StaticMobility {
    pub fn new(location: LocationId) -> Self {
        Self { location }
    }
}

impl MobilityModel for StaticMobility {
    fn serving_point(&self, _device: DeviceId, _time: SimTime) -> LocationId {
        self.location
    }
}

/// A move to `location` taking effect at `at`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Move {
    pub at: SimTime,
    pub location: LocationId,
}

/// Follows a fixed itinerary; same for every device
#[derive(Debug, Clone, PartialEq)]
pub struct ScriptedMobility {
    initial: LocationId,
    moves: Vec<Move>,
}

impl ScriptedMobility {
    pub fn new(initial: LocationId, mut moves: Vec<Move>) -> Self {
        moves.sort_by(|a, b| a.at.total_cmp(&b.at));
        Self { initial, moves }
    }
}

impl MobilityModel for ScriptedMobility {
    fn serving_point(&self, _device: DeviceId, time: SimTime) -> LocationId {
        // Moves are sorted, so the last one at or before `time` wins
        let applied = self.moves.partition_point(|m| m.at <= time);
        match applied {
            0 => self.initial,
            n => self.moves[n - 1].location,
        }
    }
}

/// Selects and parameterizes the mobility model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum MobilityConfig {
    Static {
        #[serde(default)]
        location: LocationId,
    },
    Scripted {
        #[serde(default)]
        initial: LocationId,
        #[serde(default)]
        moves: Vec<Move>,
    },
}

impl Default for MobilityConfig {
    fn default() -> Self {
        MobilityConfig::Static { location: 0 }
    }
}

impl MobilityConfig {
    pub fn build(&self) -> Box<dyn MobilityModel> {
        match self {
            MobilityConfig::Static { location } => Box::new(StaticMobility::new(*location)),
            MobilityConfig::Scripted { initial, moves } => Box::new(ScriptedMobility::new(*initial, moves.clone())),
        }
    }
}

impl<M: MobilityModel + ?Sized> MobilityModel for Box<M> {
    fn serving_point(&self, device: DeviceId, time: SimTime) -> LocationId {
        (**self).serving_point(device, time)
    }
}
