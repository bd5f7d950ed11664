use std::sync::Arc;
use std::time::{Duration, Instant};

use alloy::primitives::{Bytes, B256};
use bridge_base_layer::{MockBaseLayer, ReceiptSummary};
use bridge_time::test_utils::FakeClock;
use bridge_time::time::Clock;
use bridge_types::{compute_transfer_hash, PendingTransaction};
use pretty_assertions::assert_eq;
use tokio::sync::mpsc;

use crate::watcher::{ConfirmationWatcher, ConfirmationWatcherConfig};

const MAX_REORG_DEPTH: u64 = 10;
const HEAD: u64 = 100;
const BURIAL_THRESHOLD: u64 = HEAD - MAX_REORG_DEPTH;
const MAX_AGE: Duration = Duration::from_secs(3600);

fn pending_transaction(tx_byte: u8, nonce: u64, submitted_at: Instant) -> PendingTransaction {
    let tx_hash = B256::repeat_byte(tx_byte);
    PendingTransaction {
        raw: Bytes::from(vec![tx_byte]),
        tx_hash,
        nonce,
        transfer_hash: compute_transfer_hash(tx_hash, 0),
        submitted_at,
    }
}

fn receipt(tx_hash: B256, block_number: u64) -> ReceiptSummary {
    ReceiptSummary { tx_hash, block_number, succeeded: true }
}

struct WatcherHarness {
    watcher: ConfirmationWatcher,
    pending_tx: mpsc::Sender<PendingTransaction>,
    clock: Arc<FakeClock>,
}

impl WatcherHarness {
    fn new(base_layer: MockBaseLayer) -> Self {
        let (pending_tx, pending_rx) = mpsc::channel(100);
        let clock = Arc::new(FakeClock::new(Instant::now()));
        let watcher = ConfirmationWatcher::new(
            ConfirmationWatcherConfig {
                poll_interval: Duration::from_millis(10),
                max_reorg_depth: MAX_REORG_DEPTH,
                pending_transaction_max_age: MAX_AGE,
            },
            Arc::new(base_layer),
            pending_rx,
            clock.clone(),
        );
        Self { watcher, pending_tx, clock }
    }
}

#[tokio::test]
async fn buried_transactions_are_cleared() {
    let mut base_layer = MockBaseLayer::new();
    base_layer.expect_latest_block_number().returning(|| Ok(HEAD));
    base_layer
        .expect_transaction_receipt()
        .returning(|tx_hash| Ok(Some(receipt(tx_hash, BURIAL_THRESHOLD))));
    let mut harness = WatcherHarness::new(base_layer);

    let now = harness.clock.now();
    harness.pending_tx.send(pending_transaction(1, 7, now)).await.unwrap();
    harness.watcher.clear_confirmed_transactions().await.unwrap();

    assert_eq!(harness.watcher.tracked_transactions(), 0);
}

#[tokio::test]
async fn unburied_transactions_stay_tracked() {
    let mut base_layer = MockBaseLayer::new();
    base_layer.expect_latest_block_number().returning(|| Ok(HEAD));
    base_layer
        .expect_transaction_receipt()
        .returning(|tx_hash| Ok(Some(receipt(tx_hash, BURIAL_THRESHOLD + 1))));
    let mut harness = WatcherHarness::new(base_layer);

    let now = harness.clock.now();
    harness.pending_tx.send(pending_transaction(1, 7, now)).await.unwrap();
    harness.watcher.clear_confirmed_transactions().await.unwrap();

    assert_eq!(harness.watcher.tracked_transactions(), 1);
}

#[tokio::test]
async fn scan_stops_at_the_first_unburied_transaction() {
    let mut base_layer = MockBaseLayer::new();
    base_layer.expect_latest_block_number().returning(|| Ok(HEAD));
    // Only the front of the queue may be queried: it is not buried, and
    // receipts are monotonic in block number by nonce order.
    base_layer
        .expect_transaction_receipt()
        .withf(|tx_hash| *tx_hash == B256::repeat_byte(1))
        .times(1)
        .returning(|tx_hash| Ok(Some(receipt(tx_hash, HEAD))));
    let mut harness = WatcherHarness::new(base_layer);

    let now = harness.clock.now();
    harness.pending_tx.send(pending_transaction(1, 7, now)).await.unwrap();
    harness.pending_tx.send(pending_transaction(2, 8, now)).await.unwrap();
    harness.watcher.clear_confirmed_transactions().await.unwrap();

    assert_eq!(harness.watcher.tracked_transactions(), 2);
}

#[tokio::test]
async fn unmined_transaction_is_kept_within_the_age_limit() {
    let mut base_layer = MockBaseLayer::new();
    base_layer.expect_latest_block_number().returning(|| Ok(HEAD));
    base_layer.expect_transaction_receipt().returning(|_| Ok(None));
    let mut harness = WatcherHarness::new(base_layer);

    let now = harness.clock.now();
    harness.pending_tx.send(pending_transaction(1, 7, now)).await.unwrap();
    harness.watcher.clear_confirmed_transactions().await.unwrap();

    assert_eq!(harness.watcher.tracked_transactions(), 1);
}

#[tokio::test]
async fn overaged_unmined_transaction_is_abandoned() {
    let mut base_layer = MockBaseLayer::new();
    base_layer.expect_latest_block_number().returning(|| Ok(HEAD));
    base_layer.expect_transaction_receipt().returning(|_| Ok(None));
    let mut harness = WatcherHarness::new(base_layer);

    let now = harness.clock.now();
    harness.pending_tx.send(pending_transaction(1, 7, now)).await.unwrap();
    harness.clock.advance(MAX_AGE + Duration::from_secs(1));
    harness.watcher.clear_confirmed_transactions().await.unwrap();

    assert_eq!(harness.watcher.tracked_transactions(), 0);
}

#[tokio::test]
async fn failed_receipts_are_cleared_once_buried() {
    let mut base_layer = MockBaseLayer::new();
    base_layer.expect_latest_block_number().returning(|| Ok(HEAD));
    base_layer.expect_transaction_receipt().returning(|tx_hash| {
        Ok(Some(ReceiptSummary { tx_hash, block_number: 50, succeeded: false }))
    });
    let mut harness = WatcherHarness::new(base_layer);

    let now = harness.clock.now();
    harness.pending_tx.send(pending_transaction(1, 7, now)).await.unwrap();
    harness.watcher.clear_confirmed_transactions().await.unwrap();

    // A contract-reverted confirmation (e.g. transfer already completed) is
    // logged and dropped, not retried.
    assert_eq!(harness.watcher.tracked_transactions(), 0);
}

#[tokio::test]
async fn empty_queue_skips_the_head_query() {
    let mut base_layer = MockBaseLayer::new();
    base_layer.expect_latest_block_number().never();
    let mut harness = WatcherHarness::new(base_layer);

    harness.watcher.clear_confirmed_transactions().await.unwrap();

    assert_eq!(harness.watcher.tracked_transactions(), 0);
}
