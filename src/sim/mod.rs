//! Reference discrete-event driver
//!
//! Executes the dispatcher's effects against a virtual clock: delayed events go
//! into an [`EventQueue`], execution requests go to per-venue FIFO executors,
//! and notifications go to the statistics sink. Optional background devices
//! replay the primary plan to load the shared links.

mod background;
mod executor;
mod queue;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use background::{BackgroundDevice, BackgroundEvent};
pub use executor::VenueExecutor;
pub use queue::EventQueue;

use crate::dispatcher::{DispatchEvent, Dispatcher, Effect};
use crate::domain::{DeviceId, SimTime, VenueId, VenueSet};
use crate::error::{OffloadError, Result};
use crate::mobility::MobilityModel;
use crate::network::NetworkModel;
use crate::stats::StatsSink;

/// Simulation limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SimulationConfig {
    /// Events processed before the run is declared stuck
    pub max_events: u64,

    /// Other devices replaying the same plan over the shared links
    pub background_devices: u32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            max_events: 1_000_000,
            background_devices: 0,
        }
    }
}

/// How the run ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Termination {
    Stopped,
    Aborted { reason: String },
    /// Queue ran dry without a stop signal
    Drained,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationSummary {
    pub end_time: SimTime,
    pub events: u64,
    pub termination: Termination,
}

#[derive(Debug, Clone, PartialEq)]
enum SimEvent {
    Dispatch(DispatchEvent),
    Background(BackgroundEvent),
}

/// Couples a dispatcher with venues and a clock
pub struct Simulation<N: NetworkModel, M: MobilityModel> {
    dispatcher: Dispatcher<N, M>,
    executors: BTreeMap<VenueId, VenueExecutor>,
    background: Vec<BackgroundDevice>,
    queue: EventQueue<SimEvent>,
    config: SimulationConfig,
}

impl<N: NetworkModel, M: MobilityModel> Simulation<N, M> {
    pub fn new(dispatcher: Dispatcher<N, M>, venues: &VenueSet, config: SimulationConfig) -> Self {
        let executors = venues
            .iter()
            .map(|v| (v.id, VenueExecutor::new(v.clone())))
            .collect();
        Self {
            dispatcher,
            executors,
            background: Vec::new(),
            queue: EventQueue::new(),
            config,
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher<N, M> {
        &self.dispatcher
    }

    pub fn executor(&self, venue: VenueId) -> Option<&VenueExecutor> {
        self.executors.get(&venue)
    }

    pub fn background(&self) -> &[BackgroundDevice] {
        &self.background
    }

    /// Run from `Start` until the dispatcher stops or aborts
    pub fn run(&mut self, stats: &mut dyn StatsSink) -> Result<SimulationSummary> {
        self.queue.push(0.0, SimEvent::Dispatch(DispatchEvent::Start));
        let mut events = 0u64;

        while let Some((now, event)) = self.queue.pop() {
            events += 1;
            if events > self.config.max_events {
                return Err(OffloadError::EventBudgetExhausted(self.config.max_events));
            }

            let event = match event {
                SimEvent::Dispatch(event) => event,
                SimEvent::Background(event) => {
                    self.on_background(now, event)?;
                    continue;
                }
            };

            let effects = self.dispatcher.handle_event(now, event)?;
            if let Some(termination) = self.apply(now, effects, stats)? {
                log::info!("Simulation ended at {:.3} after {} events: {:?}", now, events, termination);
                return Ok(SimulationSummary {
                    end_time: now,
                    events,
                    termination,
                });
            }
            if event == DispatchEvent::Start {
                self.spawn_background(now);
            }
        }

        log::warn!("Event queue drained without a stop signal after {} events", events);
        Ok(SimulationSummary {
            end_time: self.queue.now(),
            events,
            termination: Termination::Drained,
        })
    }

    fn apply(&mut self, now: SimTime, effects: Vec<Effect>, stats: &mut dyn StatsSink) -> Result<Option<Termination>> {
        let mut termination = None;
        for effect in effects {
            match effect {
                Effect::ScheduleIn { delay, event } => self.queue.push(now + delay.max(0.0), SimEvent::Dispatch(event)),
                Effect::Execute { task, venue, length } => {
                    let executor = self.executors.get_mut(&venue).ok_or(OffloadError::UnknownVenue(venue))?;
                    let done = executor.submit(now, length);
                    self.queue.push(done, SimEvent::Dispatch(DispatchEvent::ExecutionFinished { task }));
                }
                Effect::Notify(event) => stats.record(&event),
                Effect::Stop => termination = Some(Termination::Stopped),
                Effect::Abort { reason } => termination = Some(Termination::Aborted { reason }),
            }
        }
        Ok(termination)
    }

    /// Background devices start together with the primary one, each replaying
    /// the plan it just made
    fn spawn_background(&mut self, now: SimTime) {
        let count = self.config.background_devices as usize;
        if count == 0 {
            return;
        }
        let plan: Vec<_> = self
            .dispatcher
            .schedule()
            .entries()
            .map(|e| (e.selected_variant().clone(), e.selected_venue().clone()))
            .collect();
        let first: DeviceId = self.dispatcher.device().saturating_add(1);
        for slot in 0..count {
            let id = first.saturating_add(slot as DeviceId);
            self.background.push(BackgroundDevice::new(id, slot, &plan));
            self.queue.push(now, SimEvent::Background(BackgroundEvent::SendNext { slot }));
        }
        log::info!("Started {} background devices replaying {} tasks each", count, plan.len());
    }

    fn on_background(&mut self, now: SimTime, event: BackgroundEvent) -> Result<()> {
        let slot = match &event {
            BackgroundEvent::SendNext { slot }
            | BackgroundEvent::UploadFinished { slot, .. }
            | BackgroundEvent::DownloadFinished { slot } => *slot,
        };
        let device = self
            .background
            .get_mut(slot)
            .ok_or_else(|| OffloadError::ProtocolViolation(format!("no background device in slot {}", slot)))?;
        let network = self.dispatcher.network_mut();

        let steps = match event {
            BackgroundEvent::SendNext { .. } => device.send_next(network),
            BackgroundEvent::UploadFinished { venue, .. } => {
                device.upload_finished(&venue, network);
                Vec::new()
            }
            BackgroundEvent::DownloadFinished { .. } => device.download_finished(network).into_iter().collect(),
        };
        tracing::debug!(device = device.id(), time = now, follow_ups = steps.len(), "Background step");
        if device.is_done() {
            log::debug!("Background device {} finished at {:.3}", device.id(), now);
        }
        for (delay, next) in steps {
            self.queue.push(now + delay, SimEvent::Background(next));
        }
        Ok(())
    }
}
