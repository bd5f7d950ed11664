use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, U256};
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
#[path = "balance_watcher_test.rs"]
mod balance_watcher_test;

#[derive(Debug, Error)]
pub enum ValidatorBalanceWatcherError {
    #[error(transparent)]
    BaseLayer(#[from] BaseLayerError),
    #[error("control queue closed")]
    QueueClosed,
}

#[derive(Clone, Debug, Serialize, Deserialize, Validate, PartialEq)]
pub struct ValidatorBalanceWatcherConfig {
    /// Pause (seconds) between balance polls.
    #[serde(deserialize_with = "deserialize_float_seconds_to_duration")]
    pub poll_interval: Duration,
    /// Balance (wei) below which confirmations are suspended until refilled.
    pub minimum_validator_balance: U256,
}

impl Default for ValidatorBalanceWatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(60),
            // 0.04 ether: roughly a day of confirmations at default gas
            // settings.
            minimum_validator_balance: U256::from(40_000_000_000_000_000_u64),
        }
    }
}

/// Polls the validator's home-chain balance and reports threshold crossings
/// on the control bus.
pub struct ValidatorBalanceWatcher {
    config: ValidatorBalanceWatcherConfig,
    base_layer: Arc<dyn BaseLayer>,
    validator_address: Address,
    control_queue: mpsc::Sender<ControlMessage>,
    last_sufficient: Option<bool>,
}

impl ValidatorBalanceWatcher {
    pub fn new(
        config: ValidatorBalanceWatcherConfig,
        base_layer: Arc<dyn BaseLayer>,
        validator_address: Address,
        control_queue: mpsc::Sender<ControlMessage>,
    ) -> Self {
        Self { config, base_layer, validator_address, control_queue, last_sufficient: None }
    }

    pub async fn run(
        mut self,
        cancel: CancellationToken,
    ) -> Result<(), ValidatorBalanceWatcherError> {
        info!(validator = %self.validator_address, "Starting validator balance watcher.");
        loop {
            self.check_balance().await?;
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Validator balance watcher stopping.");
                    return Ok(());
                }
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }
    }

    async fn check_balance(&mut self) -> Result<(), ValidatorBalanceWatcherError> {
        let base_layer = self.base_layer.clone();
        let validator = self.validator_address;
        let balance = retry_transient("eth_getBalance", || base_layer.balance(validator)).await?;

        let sufficient = balance >= self.config.minimum_validator_balance;
        // The planner assumes a funded validator until told otherwise, so the
        // first poll only reports insufficiency.
        let previously_sufficient = self.last_sufficient.unwrap_or(true);
        if sufficient != previously_sufficient {
            if sufficient {
                info!(%balance, "Validator balance is sufficient again.");
                self.send(ControlMessage::BalanceOk).await?;
            } else {
                warn!(
                    %balance,
                    minimum = %self.config.minimum_validator_balance,
                    "Validator balance is below the minimum, confirmations will be suspended."
                );
                self.send(ControlMessage::BalanceLow).await?;
            }
        }
        self.last_sufficient = Some(sufficient);
        Ok(())
    }

    async fn send(&self, message: ControlMessage) -> Result<(), ValidatorBalanceWatcherError> {
        self.control_queue
            .send(message)
            .await
            .map_err(|_| ValidatorBalanceWatcherError::QueueClosed)
    }
}
