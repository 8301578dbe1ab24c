//! Task lifecycle protocol
//!
//! The [`Dispatcher`] is a plain state machine: the driver feeds it
//! [`DispatchEvent`]s with the current virtual time and executes the
//! [`Effect`]s it returns. It pulls one schedule entry at a time, binds it to a
//! venue, and follows the task through upload, processing, pickup and download.
//!
//! # Send-next priority
//!
//! 1. Start the download of the oldest result awaiting pickup
//! 2. Replan the remainder if re-optimization is on and the active client
//!    counts changed since the last check (abort when no plan fits)
//! 3. Dispatch the next schedule entry
//! 4. Otherwise raise "no more tasks" once and go idle

mod events;

use std::collections::{BTreeMap, VecDeque};

pub use events::{DispatchEvent, Effect};

use crate::domain::{DeviceId, LifecycleEvent, LiveTask, SimTime, TaskId, TaskState, VenueClass};
use crate::error::{OffloadError, Result};
use crate::mobility::MobilityModel;
use crate::network::NetworkModel;
use crate::schedule::{Schedule, ScheduleEntry};
use crate::scheduler::{PlanOutcome, Scheduler};

/// Drives one device's schedule through the task lifecycle
pub struct Dispatcher<N: NetworkModel, M: MobilityModel> {
    scheduler: Scheduler,
    schedule: Schedule,
    network: N,
    mobility: M,
    device: DeviceId,

    /// Every task dispatched so far, including finished ones
    tasks: BTreeMap<TaskId, LiveTask>,
    /// Remote results ready for download, oldest first
    pickups: VecDeque<TaskId>,
    next_id: TaskId,

    started_at: Option<SimTime>,
    /// (edge, cloud) active clients at the last check
    last_clients: (u32, u32),
    no_more_raised: bool,
    idle: bool,
    stopped: bool,
    aborted: bool,
}

impl<N: NetworkModel, M: MobilityModel> Dispatcher<N, M> {
    pub fn new(scheduler: Scheduler, schedule: Schedule, network: N, mobility: M, device: DeviceId) -> Self {
        Self {
            scheduler,
            schedule,
            network,
            mobility,
            device,
            tasks: BTreeMap::new(),
            pickups: VecDeque::new(),
            next_id: 0,
            started_at: None,
            last_clients: (0, 0),
            no_more_raised: false,
            idle: false,
            stopped: false,
            aborted: false,
        }
    }

    /// Advance the state machine
    pub fn handle_event(&mut self, now: SimTime, event: DispatchEvent) -> Result<Vec<Effect>> {
        if self.aborted || self.stopped {
            log::debug!("Ignoring {:?} at {:.3}: dispatcher finished", event, now);
            return Ok(Vec::new());
        }

        let mut effects = Vec::new();
        match event {
            DispatchEvent::Start => self.on_start(now, &mut effects)?,
            DispatchEvent::SendNext => self.on_send_next(now, &mut effects)?,
            DispatchEvent::UploadFinished { task } => self.on_upload_finished(now, task, &mut effects)?,
            DispatchEvent::ExecutionFinished { task } => self.on_execution_finished(now, task, &mut effects)?,
            DispatchEvent::DownloadFinished { task } => self.on_download_finished(now, task, &mut effects)?,
            DispatchEvent::NoMoreTasks => {
                if self.outstanding() == 0 {
                    self.stop(&mut effects);
                }
            }
        }
        Ok(effects)
    }

    fn on_start(&mut self, now: SimTime, effects: &mut Vec<Effect>) -> Result<()> {
        if self.started_at.is_some() {
            return Err(OffloadError::ProtocolViolation("dispatcher started twice".to_string()));
        }
        self.started_at = Some(now);
        self.last_clients = self.active_clients();

        let outcome = self.scheduler.plan(&mut self.schedule, &self.network)?;
        log::info!("Initial plan at {:.3}: {:?}", now, outcome);
        if outcome == PlanOutcome::Infeasible {
            self.abort(now, "no feasible plan within the deadline", effects);
            return Ok(());
        }
        self.emit_send_next(effects);
        Ok(())
    }

    fn on_send_next(&mut self, now: SimTime, effects: &mut Vec<Effect>) -> Result<()> {
        if self.started_at.is_none() {
            return Err(OffloadError::ProtocolViolation("send-next before start".to_string()));
        }

        if let Some(id) = self.pickups.pop_front() {
            return self.start_download(now, id, effects);
        }

        if self.scheduler.config().reoptimize && !self.schedule.is_empty() {
            let clients = self.active_clients();
            if clients != self.last_clients {
                self.last_clients = clients;
                if !self.replan(now, effects)? {
                    return Ok(());
                }
            }
        }

        match self.schedule.pop_next() {
            Some(entry) => self.dispatch(now, entry, effects),
            None => {
                if !self.no_more_raised {
                    self.no_more_raised = true;
                    effects.push(Effect::ScheduleIn {
                        delay: 0.0,
                        event: DispatchEvent::NoMoreTasks,
                    });
                }
                self.idle = true;
                Ok(())
            }
        }
    }

    /// Returns false when the replan aborted the run
    fn replan(&mut self, now: SimTime, effects: &mut Vec<Effect>) -> Result<bool> {
        let elapsed = now - self.started_at.unwrap_or(now);
        let pending: f64 = self
            .tasks
            .values()
            .filter(|t| t.awaits_result())
            .map(|t| t.projected_download)
            .sum();

        let outcome = self
            .scheduler
            .replan(&mut self.schedule, &self.network, elapsed, pending)?;
        log::info!(
            "Replanned at {:.3} (clients {:?}): {:?}",
            now,
            self.last_clients,
            outcome
        );

        if outcome == PlanOutcome::Infeasible {
            self.abort(now, "replan found no feasible plan", effects);
            return Ok(false);
        }
        let budget = crate::scheduler::remaining_budget(self.schedule.deadline(), elapsed, pending);
        effects.push(Effect::Notify(LifecycleEvent::replanned(now, budget, self.schedule.len())));
        Ok(true)
    }

    fn dispatch(&mut self, now: SimTime, entry: ScheduleEntry, effects: &mut Vec<Effect>) -> Result<()> {
        let id = self.next_id;
        self.next_id += 1;

        let variant = entry.selected_variant().clone();
        let venue = entry.selected_venue().clone();
        let location = self.mobility.serving_point(self.device, now);
        let mut task = LiveTask::new(id, self.device, variant, venue, location, now);

        effects.push(Effect::Notify(LifecycleEvent::queued(
            id,
            now,
            entry.group(),
            task.variant.id,
            task.variant.quality,
        )));
        effects.push(Effect::Notify(LifecycleEvent::assigned(
            id,
            now,
            task.venue.id,
            task.venue.class,
        )));

        if let Some(limit) = task.venue.max_in_flight
            && self.in_flight_on(task.venue.id) >= limit
        {
            self.insert(task);
            return self.terminate(now, id, TaskState::RejectedVmCapacity, effects);
        }

        if !task.is_remote() {
            task.transition(TaskState::Processing)?;
            effects.push(Effect::Notify(LifecycleEvent::state_change(id, now, TaskState::Processing)));
            effects.push(Effect::Execute {
                task: id,
                venue: task.venue.id,
                length: task.variant.length,
            });
            log::debug!("Task {} processing locally on venue {}", id, task.venue.id);
            self.insert(task);
            return Ok(());
        }

        let upload = self.network.upload_delay(self.device, &task.venue, &task.variant);
        if upload <= 0.0 {
            self.insert(task);
            return self.terminate(now, id, TaskState::RejectedBandwidth, effects);
        }

        task.upload_delay = upload;
        task.projected_download = self.network.download_delay(self.device, &task.venue, &task.variant);
        task.transition(TaskState::Uploading)?;
        self.network.upload_started(self.device, &task.venue);
        effects.push(Effect::Notify(LifecycleEvent::state_change(id, now, TaskState::Uploading)));
        effects.push(Effect::ScheduleIn {
            delay: upload,
            event: DispatchEvent::UploadFinished { task: id },
        });
        log::debug!("Task {} uploading to venue {} for {:.3}s", id, task.venue.id, upload);
        self.insert(task);
        Ok(())
    }

    fn on_upload_finished(&mut self, now: SimTime, id: TaskId, effects: &mut Vec<Effect>) -> Result<()> {
        let device = self.device;
        let task = self.task_mut(id)?;
        task.transition(TaskState::Processing)?;
        let (venue, length) = (task.venue.clone(), task.variant.length);
        self.network.upload_finished(device, &venue);

        effects.push(Effect::Notify(LifecycleEvent::state_change(id, now, TaskState::Processing)));
        effects.push(Effect::Execute {
            task: id,
            venue: venue.id,
            length,
        });
        self.emit_send_next(effects);
        Ok(())
    }

    fn on_execution_finished(&mut self, now: SimTime, id: TaskId, effects: &mut Vec<Effect>) -> Result<()> {
        let task = self.task_mut(id)?;
        if !task.is_remote() {
            return self.terminate(now, id, TaskState::Completed, effects);
        }

        task.transition(TaskState::AwaitingPickup)?;
        effects.push(Effect::Notify(LifecycleEvent::state_change(id, now, TaskState::AwaitingPickup)));
        self.pickups.push_back(id);
        if self.idle {
            self.emit_send_next(effects);
        }
        Ok(())
    }

    fn start_download(&mut self, now: SimTime, id: TaskId, effects: &mut Vec<Effect>) -> Result<()> {
        let location = self.mobility.serving_point(self.device, now);
        let task = self.task(id)?;
        if location != task.submitted_location {
            log::debug!(
                "Task {} lost its device: submitted at {}, now at {}",
                id,
                task.submitted_location,
                location
            );
            return self.terminate(now, id, TaskState::FailedMobility, effects);
        }

        let download = self.network.download_delay(self.device, &task.venue, &task.variant);
        if download <= 0.0 {
            return self.terminate(now, id, TaskState::FailedBandwidth, effects);
        }

        let device = self.device;
        let task = self.task_mut(id)?;
        task.transition(TaskState::Downloading)?;
        let venue = task.venue.clone();
        self.network.download_started(device, &venue);
        effects.push(Effect::Notify(LifecycleEvent::state_change(id, now, TaskState::Downloading)));
        effects.push(Effect::ScheduleIn {
            delay: download,
            event: DispatchEvent::DownloadFinished { task: id },
        });
        Ok(())
    }

    fn on_download_finished(&mut self, now: SimTime, id: TaskId, effects: &mut Vec<Effect>) -> Result<()> {
        let device = self.device;
        let venue = self.task(id)?.venue.clone();
        self.network.download_finished(device, &venue);
        self.terminate(now, id, TaskState::Completed, effects)
    }

    /// Move a task to a terminal state, report it once, and continue
    fn terminate(&mut self, now: SimTime, id: TaskId, state: TaskState, effects: &mut Vec<Effect>) -> Result<()> {
        let task = self.task_mut(id)?;
        task.transition(state)?;
        let class = task.venue.class;
        let event = if state == TaskState::Completed {
            LifecycleEvent::completed(id, now, task.variant.quality, class)
        } else {
            log::warn!("Task {} ended {:?} on {} venue {}", id, state, class, task.venue.id);
            LifecycleEvent::terminated(id, now, state, class)
        };
        effects.push(Effect::Notify(event));

        if self.no_more_raised && self.outstanding() == 0 {
            self.stop(effects);
        } else {
            self.emit_send_next(effects);
        }
        Ok(())
    }

    fn abort(&mut self, now: SimTime, reason: &str, effects: &mut Vec<Effect>) {
        log::warn!("Aborting at {:.3}: {}", now, reason);
        self.aborted = true;
        self.schedule.clear();
        effects.push(Effect::Notify(LifecycleEvent::aborted(now, reason)));
        effects.push(Effect::Abort {
            reason: reason.to_string(),
        });
    }

    fn stop(&mut self, effects: &mut Vec<Effect>) {
        if !self.stopped {
            self.stopped = true;
            effects.push(Effect::Stop);
        }
    }

    fn emit_send_next(&mut self, effects: &mut Vec<Effect>) {
        self.idle = false;
        effects.push(Effect::send_next());
    }

    fn insert(&mut self, task: LiveTask) {
        self.tasks.insert(task.id, task);
    }

    fn task(&self, id: TaskId) -> Result<&LiveTask> {
        self.tasks.get(&id).ok_or(OffloadError::UnknownTask(id))
    }

    fn task_mut(&mut self, id: TaskId) -> Result<&mut LiveTask> {
        self.tasks.get_mut(&id).ok_or(OffloadError::UnknownTask(id))
    }

    /// Tasks admitted to `venue` that have not finished executing there
    fn in_flight_on(&self, venue: crate::domain::VenueId) -> u32 {
        self.tasks
            .values()
            .filter(|t| t.venue.id == venue && matches!(t.state, TaskState::Uploading | TaskState::Processing))
            .count() as u32
    }

    fn active_clients(&self) -> (u32, u32) {
        (
            self.network.active_clients(VenueClass::Edge),
            self.network.active_clients(VenueClass::Cloud),
        )
    }

    /// Dispatched tasks not yet in a terminal state
    pub fn outstanding(&self) -> usize {
        self.tasks.values().filter(|t| !t.state.is_terminal()).count()
    }

    pub fn tasks(&self) -> impl Iterator<Item = &LiveTask> {
        self.tasks.values()
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    pub fn device(&self) -> DeviceId {
        self.device
    }

    /// Link bookkeeping shared with the simulation's background devices
    pub(crate) fn network_mut(&mut self) -> &mut N {
        &mut self.network
    }

    pub fn is_idle(&self) -> bool {
        self.idle
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted
    }
}
