//! offloadr - deadline-aware task offloading
//!
//! Plans a batch of tasks for one mobile device across local, edge and cloud
//! venues so that total quality is maximized within a deadline, then drives
//! the batch through the offloading lifecycle on a discrete-event simulator.

pub mod catalog;
pub mod config;
pub mod dispatcher;
pub mod domain;
pub mod error;
pub mod mobility;
pub mod network;
pub mod scenario;
pub mod schedule;
pub mod scheduler;
pub mod sim;
pub mod stats;
pub mod workload;

pub use error::{OffloadError, Result};
