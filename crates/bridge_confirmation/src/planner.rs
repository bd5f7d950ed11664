use std::sync::{Arc, Mutex};
use std::time::Duration;

use bridge_time::converters::deserialize_float_seconds_to_duration;
use bridge_time::time::SharedClock;
use bridge_transfer_recorder::{RecorderError, TransferRecorder};
use bridge_types::{ControlMessage, FetchedEvent, TransferEvent};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use validator::Validate;

#[cfg(test)]
#[path = "planner_test.rs"]
mod planner_test;

#[derive(Debug, Error)]
pub enum PlannerError {
    /// A watermark moved backwards: programmer error, not retried.
    #[error(transparent)]
    Recorder(#[from] RecorderError),
    #[error("{queue} queue closed")]
    QueueClosed { queue: &'static str },
}

#[derive(Clone, Debug, Serialize, Deserialize, Validate, PartialEq)]
pub struct ConfirmationTaskPlannerConfig {
    /// Upper bound (seconds) on how long the planner sleeps when all input
    /// queues are idle.
    #[serde(deserialize_with = "deserialize_float_seconds_to_duration")]
    pub poll_interval: Duration,
    /// Maximum age (seconds) of the home-chain sync watermarks before task
    /// emission pauses; one home-chain step.
    #[serde(deserialize_with = "deserialize_float_seconds_to_duration")]
    pub sync_persistence_time: Duration,
}

impl Default for ConfirmationTaskPlannerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            sync_persistence_time: Duration::from_secs(5),
        }
    }
}

enum Input {
    Transfer(FetchedEvent),
    HomeBridge(FetchedEvent),
    Control(ControlMessage),
    Tick,
    Cancelled,
}

/// Drives the recorder: drains the two event queues and the control bus,
/// emits confirmation tasks while the validator is active, funded, and in
/// sync, and garbage-collects completed transfers.
///
/// The planner is the only component calling recorder mutators; the shared
/// handle exists so the monitoring endpoint and the state-dump signal can
/// take read-only snapshots.
pub struct ConfirmationTaskPlanner {
    config: ConfirmationTaskPlannerConfig,
    recorder: Arc<Mutex<TransferRecorder>>,
    clock: SharedClock,
    control_queue: mpsc::Receiver<ControlMessage>,
    transfer_event_queue: mpsc::Receiver<FetchedEvent>,
    home_bridge_event_queue: mpsc::Receiver<FetchedEvent>,
    confirmation_task_queue: mpsc::Sender<TransferEvent>,
    validator_is_active: bool,
    balance_sufficient: bool,
}

impl ConfirmationTaskPlanner {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: ConfirmationTaskPlannerConfig,
        recorder: Arc<Mutex<TransferRecorder>>,
        clock: SharedClock,
        control_queue: mpsc::Receiver<ControlMessage>,
        transfer_event_queue: mpsc::Receiver<FetchedEvent>,
        home_bridge_event_queue: mpsc::Receiver<FetchedEvent>,
        confirmation_task_queue: mpsc::Sender<TransferEvent>,
    ) -> Self {
        Self {
            config,
            recorder,
            clock,
            control_queue,
            transfer_event_queue,
            home_bridge_event_queue,
            confirmation_task_queue,
            // The status watcher reports the initial membership; until then
            // no task may be emitted.
            validator_is_active: false,
            balance_sufficient: true,
        }
    }

    pub async fn run(mut self, cancel: CancellationToken) -> Result<(), PlannerError> {
        info!("Starting confirmation task planner.");
        loop {
            let input = tokio::select! {
                _ = cancel.cancelled() => Input::Cancelled,
                maybe_event = self.transfer_event_queue.recv() => {
                    match maybe_event {
                        Some(event) => Input::Transfer(event),
                        None => return Err(PlannerError::QueueClosed { queue: "transfer event" }),
                    }
                }
                maybe_event = self.home_bridge_event_queue.recv() => {
                    match maybe_event {
                        Some(event) => Input::HomeBridge(event),
                        None => {
                            return Err(PlannerError::QueueClosed { queue: "home bridge event" });
                        }
                    }
                }
                maybe_message = self.control_queue.recv() => {
                    match maybe_message {
                        Some(message) => Input::Control(message),
                        None => return Err(PlannerError::QueueClosed { queue: "control" }),
                    }
                }
                _ = tokio::time::sleep(self.config.poll_interval) => Input::Tick,
            };

            match input {
                Input::Cancelled => {
                    info!("Confirmation task planner stopping.");
                    return Ok(());
                }
                Input::Transfer(event) | Input::HomeBridge(event) => self.apply_event(event)?,
                Input::Control(message) => {
                    if !self.handle_control_message(message) {
                        return Ok(());
                    }
                }
                Input::Tick => {}
            }
            if !self.drain_event_queues()? {
                return Ok(());
            }

            self.emit_tasks().await?;
            self.recorder.lock().unwrap().clear_transfers();
        }
    }

    /// Empties whatever else accumulated on the input queues before deciding
    /// on tasks, so one wake-up processes a whole backlog. Returns false when
    /// a drained control message asked the planner to stop.
    fn drain_event_queues(&mut self) -> Result<bool, PlannerError> {
        while let Ok(event) = self.transfer_event_queue.try_recv() {
            self.apply_event(event)?;
        }
        while let Ok(event) = self.home_bridge_event_queue.try_recv() {
            self.apply_event(event)?;
        }
        while let Ok(message) = self.control_queue.try_recv() {
            if !self.handle_control_message(message) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn apply_event(&mut self, event: FetchedEvent) -> Result<(), PlannerError> {
        let mut recorder = self.recorder.lock().unwrap();
        match event {
            FetchedEvent::Event(event) => recorder.apply_event(event),
            FetchedEvent::SyncedUntil { kind, timestamp } => {
                recorder.apply_sync_completed(kind, timestamp)?;
            }
        }
        Ok(())
    }

    /// Returns false when the planner should stop.
    fn handle_control_message(&mut self, message: ControlMessage) -> bool {
        match message {
            ControlMessage::ValidatorBecameActive => {
                info!("Validator is active, confirmations enabled.");
                self.validator_is_active = true;
            }
            ControlMessage::ValidatorBecameInactive => {
                warn!("Validator is no longer active, confirmations disabled.");
                self.validator_is_active = false;
            }
            ControlMessage::BalanceOk => {
                info!("Validator balance is sufficient again, confirmations enabled.");
                self.balance_sufficient = true;
            }
            ControlMessage::BalanceLow => {
                warn!("Validator balance is low, confirmations disabled.");
                self.balance_sufficient = false;
            }
            ControlMessage::Shutdown => {
                info!("Shutdown requested, confirmation task planner stopping.");
                return false;
            }
        }
        true
    }

    async fn emit_tasks(&mut self) -> Result<(), PlannerError> {
        if !(self.validator_is_active && self.balance_sufficient) {
            return Ok(());
        }
        let now = self.clock.now();
        let tasks = self.recorder.lock().unwrap().get_unconfirmed_transfers(now);
        for task in tasks {
            debug!(transfer_hash = %task.transfer_hash, "Emitting confirmation task.");
            self.confirmation_task_queue
                .send(task)
                .await
                .map_err(|_| PlannerError::QueueClosed { queue: "confirmation task" })?;
        }
        Ok(())
    }
}
