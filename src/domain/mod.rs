//! Domain types for offloadr
//!
//! This module contains the core domain types:
//! - TaskVariant: a quality/cost realization of a task group
//! - ExecutionVenue / VenueSet: where work runs
//! - LiveTask / TaskState: a dispatched task and its lifecycle
//! - LifecycleEvent: observations handed to the statistics collaborator

pub mod event;
pub mod task;
pub mod variant;
pub mod venue;

pub use event::{LifecycleEvent, LifecycleKind, event_types};
pub use task::{LiveTask, TaskState};
pub use variant::{FULL_QUALITY, TaskVariant};
pub use venue::{ExecutionVenue, VenueClass, VenueSet};

/// Logical job type
pub type GroupId = u32;
/// Catalog-wide variant identity
pub type VariantId = u32;
/// Venue identity, also used to look up network delays
pub type VenueId = u32;
/// Client device identity
pub type DeviceId = u32;
/// Serving access point of a device
pub type LocationId = u32;
/// Identity of a dispatched task
pub type TaskId = u64;
/// Virtual time in seconds
pub type SimTime = f64;
