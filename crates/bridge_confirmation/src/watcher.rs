use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use bridge_base_layer::errors::BaseLayerError;
use bridge_base_layer::retry::retry_transient;
use bridge_base_layer::{BaseLayer, ReceiptSummary};
use bridge_time::converters::deserialize_float_seconds_to_duration;
use bridge_time::time::SharedClock;
use bridge_types::PendingTransaction;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use validator::Validate;

#[cfg(test)]
#[path = "watcher_test.rs"]
mod watcher_test;

#[derive(Debug, Error)]
pub enum ConfirmationWatcherError {
    #[error(transparent)]
    BaseLayer(#[from] BaseLayerError),
}

#[derive(Clone, Debug, Serialize, Deserialize, Validate, PartialEq)]
pub struct ConfirmationWatcherConfig {
    /// Pause (seconds) between burial checks; one home-chain step.
    #[serde(deserialize_with = "deserialize_float_seconds_to_duration")]
    pub poll_interval: Duration,
    /// Blocks below the home head at which a receipt counts as final.
    pub max_reorg_depth: u64,
    /// Age (seconds) after which a transaction that never got a receipt is
    /// assumed evicted from the mempool and abandoned. A restart replays the
    /// chain logs and re-confirms whatever is still unconfirmed.
    #[serde(deserialize_with = "deserialize_float_seconds_to_duration")]
    pub pending_transaction_max_age: Duration,
}

impl Default for ConfirmationWatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            max_reorg_depth: 10,
            pending_transaction_max_age: Duration::from_secs(3600),
        }
    }
}

/// Tracks submitted confirmation transactions until their receipts are at
/// least `max_reorg_depth` blocks below the home head.
///
/// The queue is FIFO in submission order, which equals nonce order, so
/// receipts are monotonic in block number and the scan may stop at the first
/// transaction that is not yet buried.
pub struct ConfirmationWatcher {
    config: ConfirmationWatcherConfig,
    base_layer: Arc<dyn BaseLayer>,
    pending_transaction_queue: mpsc::Receiver<PendingTransaction>,
    clock: SharedClock,
    pending: VecDeque<PendingTransaction>,
}

impl ConfirmationWatcher {
    pub fn new(
        config: ConfirmationWatcherConfig,
        base_layer: Arc<dyn BaseLayer>,
        pending_transaction_queue: mpsc::Receiver<PendingTransaction>,
        clock: SharedClock,
    ) -> Self {
        Self {
            config,
            base_layer,
            pending_transaction_queue,
            clock,
            pending: VecDeque::new(),
        }
    }

    pub async fn run(mut self, cancel: CancellationToken) -> Result<(), ConfirmationWatcherError> {
        info!("Starting confirmation watcher.");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    if !self.pending.is_empty() {
                        warn!(
                            "Confirmation watcher stopping with {} transaction(s) not yet buried.",
                            self.pending.len()
                        );
                    }
                    info!("Confirmation watcher stopping.");
                    return Ok(());
                }
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }
            self.clear_confirmed_transactions().await?;
        }
    }

    pub async fn clear_confirmed_transactions(&mut self) -> Result<(), ConfirmationWatcherError> {
        while let Ok(pending_transaction) = self.pending_transaction_queue.try_recv() {
            self.pending.push_back(pending_transaction);
        }
        if self.pending.is_empty() {
            return Ok(());
        }

        let base_layer = self.base_layer.clone();
        let head = retry_transient("eth_blockNumber", || base_layer.latest_block_number()).await?;
        let confirmation_threshold = head.saturating_sub(self.config.max_reorg_depth);

        while let Some(oldest) = self.pending.front() {
            let tx_hash = oldest.tx_hash;
            let receipt = retry_transient("eth_getTransactionReceipt", || {
                base_layer.transaction_receipt(tx_hash)
            })
            .await?;

            match receipt {
                None => {
                    let age = self.clock.now().saturating_duration_since(oldest.submitted_at);
                    if age < self.config.pending_transaction_max_age {
                        // Unmined but young; nothing newer can be buried
                        // either.
                        break;
                    }
                    error!(
                        tx_hash = %oldest.tx_hash,
                        nonce = oldest.nonce,
                        transfer_hash = %oldest.transfer_hash,
                        "Confirmation transaction has had no receipt for {age:?}; assuming it \
                         was dropped from the mempool and abandoning it."
                    );
                    self.pending.pop_front();
                }
                Some(receipt) if receipt.block_number > confirmation_threshold => break,
                Some(receipt) => {
                    self.log_receipt(&receipt);
                    self.pending.pop_front();
                }
            }
        }
        Ok(())
    }

    fn log_receipt(&self, receipt: &ReceiptSummary) {
        if receipt.succeeded {
            info!(tx_hash = %receipt.tx_hash, "Transaction confirmed.");
        } else {
            warn!(tx_hash = %receipt.tx_hash, "Transaction failed.");
        }
    }

    #[cfg(test)]
    pub(crate) fn tracked_transactions(&self) -> usize {
        self.pending.len()
    }
}
