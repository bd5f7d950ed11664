use std::sync::Arc;
use std::time::Duration;

use alloy::rpc::types::Log;
use bridge_base_layer::contracts::{decode_bridge_event, EventDecodeError, LogQuery};
use bridge_base_layer::errors::BaseLayerError;
use bridge_base_layer::retry::retry_transient;
use bridge_base_layer::BaseLayer;
use bridge_time::converters::deserialize_float_seconds_to_duration;
use bridge_time::time::SharedClock;
use bridge_types::{ChainRole, EventKind, FetchedEvent};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use validator::Validate;

#[cfg(test)]
#[path = "event_fetcher_test.rs"]
mod event_fetcher_test;

#[derive(Debug, Error)]
pub enum EventFetcherError {
    /// A non-transient RPC failure; transient ones are retried internally.
    #[error(transparent)]
    BaseLayer(#[from] BaseLayerError),
    /// A log that does not decode means the contract ABI does not match.
    #[error(transparent)]
    Decode(#[from] EventDecodeError),
    #[error("event queue closed")]
    QueueClosed,
}

#[derive(Clone, Debug, Serialize, Deserialize, Validate, PartialEq)]
pub struct EventFetcherConfig {
    /// Pause (seconds) between poll rounds.
    #[serde(deserialize_with = "deserialize_float_seconds_to_duration")]
    pub poll_interval: Duration,
    /// Blocks below the head considered final. Logs above the horizon are
    /// never emitted, which is what makes rollback handling unnecessary.
    pub max_reorg_depth: u64,
    /// First block ever fetched; earlier bridge history is not replayed.
    pub start_block_number: u64,
    /// Upper bound on the block span of a single `eth_getLogs` call.
    #[validate(range(min = 1))]
    pub fetch_window_size: u64,
}

impl Default for EventFetcherConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            max_reorg_depth: 10,
            start_block_number: 0,
            fetch_window_size: 1000,
        }
    }
}

/// Emits every matching log in `[start_block_number, head - max_reorg_depth]`
/// exactly once, ordered by `(block_number, log_index)` within the chain,
/// followed by a `SyncedUntil` marker per event kind each poll round.
pub struct EventFetcher {
    chain_role: ChainRole,
    config: EventFetcherConfig,
    /// One query per event kind; kinds differ in indexed-argument filters and
    /// therefore cannot share an `eth_getLogs` call.
    queries: Vec<(EventKind, LogQuery)>,
    base_layer: Arc<dyn BaseLayer>,
    event_queue: mpsc::Sender<FetchedEvent>,
    clock: SharedClock,
    next_block: u64,
}

impl EventFetcher {
    pub fn new(
        chain_role: ChainRole,
        config: EventFetcherConfig,
        queries: Vec<(EventKind, LogQuery)>,
        base_layer: Arc<dyn BaseLayer>,
        event_queue: mpsc::Sender<FetchedEvent>,
        clock: SharedClock,
    ) -> Self {
        let next_block = config.start_block_number;
        Self { chain_role, config, queries, base_layer, event_queue, clock, next_block }
    }

    pub async fn run(mut self, cancel: CancellationToken) -> Result<(), EventFetcherError> {
        info!(
            chain = %self.chain_role,
            start_block = self.config.start_block_number,
            "Starting event fetcher."
        );
        loop {
            self.fetch_new_events().await?;
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!(chain = %self.chain_role, "Event fetcher stopping.");
                    return Ok(());
                }
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }
    }

    /// One poll round: read the head, drain `[next_block, safe_head]` in
    /// windows, then mark every tracked kind as synced up to now.
    pub async fn fetch_new_events(&mut self) -> Result<(), EventFetcherError> {
        let base_layer = self.base_layer.clone();
        let head =
            retry_transient("eth_blockNumber", || base_layer.latest_block_number()).await?;
        let safe_head = head.saturating_sub(self.config.max_reorg_depth);

        if safe_head >= self.next_block {
            let mut from_block = self.next_block;
            while from_block <= safe_head {
                let to_block = safe_head.min(from_block + self.config.fetch_window_size - 1);
                self.fetch_window(from_block, to_block).await?;
                from_block = to_block + 1;
            }
            self.next_block = safe_head + 1;
        }

        let timestamp = self.clock.now();
        for (kind, _) in &self.queries {
            self.event_queue
                .send(FetchedEvent::SyncedUntil { kind: *kind, timestamp })
                .await
                .map_err(|_| EventFetcherError::QueueClosed)?;
        }
        Ok(())
    }

    async fn fetch_window(
        &self,
        from_block: u64,
        to_block: u64,
    ) -> Result<(), EventFetcherError> {
        let mut logs: Vec<(EventKind, Log)> = Vec::new();
        for (kind, query) in &self.queries {
            let base_layer = self.base_layer.clone();
            let fetched = retry_transient("eth_getLogs", || {
                base_layer.get_logs(query, from_block, to_block)
            })
            .await?;
            logs.extend(fetched.into_iter().map(|log| (*kind, log)));
        }
        // Merge the kinds back into on-chain order.
        logs.sort_by_key(|(_, log)| (log.block_number, log.log_index));

        for (kind, log) in &logs {
            let event = decode_bridge_event(*kind, log)?;
            debug!(
                chain = %self.chain_role,
                kind = event.kind().name(),
                transfer_hash = %event.transfer_hash(),
                block_number = event.block_number(),
                "Fetched event."
            );
            self.event_queue
                .send(FetchedEvent::Event(event))
                .await
                .map_err(|_| EventFetcherError::QueueClosed)?;
        }
        Ok(())
    }
}
