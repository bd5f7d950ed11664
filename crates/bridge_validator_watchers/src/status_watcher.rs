use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::Address;
use bridge_base_layer::errors::BaseLayerError;
use bridge_base_layer::retry::retry_transient;
use bridge_base_layer::BaseLayer;
use bridge_time::converters::deserialize_float_seconds_to_duration;
use bridge_types::ControlMessage;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use validator::Validate;

#[cfg(test)]
#[path = "status_watcher_test.rs"]
mod status_watcher_test;

#[derive(Debug, Error)]
pub enum ValidatorStatusWatcherError {
    #[error(transparent)]
    BaseLayer(#[from] BaseLayerError),
    #[error("control queue closed")]
    QueueClosed,
}

#[derive(Clone, Debug, Serialize, Deserialize, Validate, PartialEq)]
pub struct ValidatorStatusWatcherConfig {
    /// Pause (seconds) between membership polls; one home-chain step.
    #[serde(deserialize_with = "deserialize_float_seconds_to_duration")]
    pub poll_interval: Duration,
}

impl Default for ValidatorStatusWatcherConfig {
    fn default() -> Self {
        Self { poll_interval: Duration::from_secs(5) }
    }
}

/// Polls the validator proxy for this validator's membership and reports
/// changes on the control bus. Losing membership also cancels the daemon's
/// shutdown token: an inactive validator cannot submit confirmations, so the
/// process exits.
pub struct ValidatorStatusWatcher {
    config: ValidatorStatusWatcherConfig,
    base_layer: Arc<dyn BaseLayer>,
    home_bridge_address: Address,
    validator_address: Address,
    control_queue: mpsc::Sender<ControlMessage>,
    was_active: Option<bool>,
}

impl ValidatorStatusWatcher {
    pub fn new(
        config: ValidatorStatusWatcherConfig,
        base_layer: Arc<dyn BaseLayer>,
        home_bridge_address: Address,
        validator_address: Address,
        control_queue: mpsc::Sender<ControlMessage>,
    ) -> Self {
        Self {
            config,
            base_layer,
            home_bridge_address,
            validator_address,
            control_queue,
            was_active: None,
        }
    }

    pub async fn run(
        mut self,
        cancel: CancellationToken,
    ) -> Result<(), ValidatorStatusWatcherError> {
        info!(validator = %self.validator_address, "Starting validator status watcher.");
        let base_layer = self.base_layer.clone();
        let home_bridge = self.home_bridge_address;
        let proxy = retry_transient("validatorProxy", || {
            base_layer.validator_proxy_address(home_bridge)
        })
        .await?;

        loop {
            self.check_validator_status(proxy, &cancel).await?;
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Validator status watcher stopping.");
                    return Ok(());
                }
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }
    }

    async fn check_validator_status(
        &mut self,
        proxy: Address,
        shutdown: &CancellationToken,
    ) -> Result<(), ValidatorStatusWatcherError> {
        let base_layer = self.base_layer.clone();
        let validator = self.validator_address;
        let is_active =
            retry_transient("isValidator", || base_layer.is_validator(proxy, validator)).await?;

        match (self.was_active, is_active) {
            (None, false) => {
                warn!(
                    validator = %self.validator_address,
                    "Not an active validator; standing by until the validator set includes us."
                );
            }
            (None | Some(false), true) => {
                info!(validator = %self.validator_address, "Joined the validator set.");
                self.send(ControlMessage::ValidatorBecameActive).await?;
            }
            (Some(true), false) => {
                warn!(
                    validator = %self.validator_address,
                    "Dropped from the validator set, shutting down."
                );
                self.send(ControlMessage::ValidatorBecameInactive).await?;
                shutdown.cancel();
            }
            (Some(false), false) | (Some(true), true) => {}
        }
        self.was_active = Some(is_active);
        Ok(())
    }

    async fn send(&self, message: ControlMessage) -> Result<(), ValidatorStatusWatcherError> {
        self.control_queue
            .send(message)
            .await
            .map_err(|_| ValidatorStatusWatcherError::QueueClosed)
    }
}
