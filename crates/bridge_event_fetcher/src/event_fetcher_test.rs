use std::sync::Arc;
use std::time::{Duration, Instant};

use alloy::primitives::{Address, Bytes, LogData, B256, U256};
use alloy::rpc::types::Log;
use alloy::sol_types::SolEvent;
use bridge_base_layer::contracts::{
    completion_log_query,
    confirmation_log_query,
    transfer_log_query,
    ForeignToken,
    HomeBridge,
};
use bridge_base_layer::MockBaseLayer;
use bridge_time::test_utils::FakeClock;
use bridge_types::{BridgeEvent, ChainRole, EventKind, FetchedEvent};
use pretty_assertions::assert_eq;
use tokio::sync::mpsc;

use crate::event_fetcher::{EventFetcher, EventFetcherConfig};

const MAX_REORG_DEPTH: u64 = 5;
const START_BLOCK: u64 = 0;

fn token() -> Address {
    Address::repeat_byte(0x11)
}

fn foreign_bridge() -> Address {
    Address::repeat_byte(0x22)
}

fn home_bridge() -> Address {
    Address::repeat_byte(0x33)
}

fn validator() -> Address {
    Address::repeat_byte(0x44)
}

fn transfer_log(block_number: u64, log_index: u64) -> Log {
    Log {
        inner: alloy::primitives::Log {
            address: token(),
            data: LogData::new_unchecked(
                vec![
                    ForeignToken::Transfer::SIGNATURE_HASH,
                    Address::repeat_byte(0x55).into_word(),
                    foreign_bridge().into_word(),
                ],
                Bytes::from(U256::from(100).to_be_bytes::<32>().to_vec()),
            ),
        },
        block_number: Some(block_number),
        transaction_hash: Some(B256::repeat_byte(0xaa)),
        log_index: Some(log_index),
        ..Default::default()
    }
}

fn completion_log(block_number: u64, log_index: u64) -> Log {
    Log {
        inner: alloy::primitives::Log {
            address: home_bridge(),
            data: LogData::new_unchecked(
                vec![HomeBridge::TransferCompleted::SIGNATURE_HASH],
                Bytes::from(B256::repeat_byte(0x77).to_vec()),
            ),
        },
        block_number: Some(block_number),
        transaction_hash: Some(B256::repeat_byte(0xbb)),
        log_index: Some(log_index),
        ..Default::default()
    }
}

fn foreign_fetcher(
    base_layer: MockBaseLayer,
    config: EventFetcherConfig,
) -> (EventFetcher, mpsc::Receiver<FetchedEvent>) {
    let (tx, rx) = mpsc::channel(100);
    let fetcher = EventFetcher::new(
        ChainRole::Foreign,
        config,
        vec![(EventKind::Transfer, transfer_log_query(token(), foreign_bridge()))],
        Arc::new(base_layer),
        tx,
        Arc::new(FakeClock::new(Instant::now())),
    );
    (fetcher, rx)
}

fn drain(rx: &mut mpsc::Receiver<FetchedEvent>) -> Vec<FetchedEvent> {
    let mut fetched = Vec::new();
    while let Ok(item) = rx.try_recv() {
        fetched.push(item);
    }
    fetched
}

fn config() -> EventFetcherConfig {
    EventFetcherConfig {
        poll_interval: Duration::from_millis(10),
        max_reorg_depth: MAX_REORG_DEPTH,
        start_block_number: START_BLOCK,
        fetch_window_size: 1000,
    }
}

#[tokio::test]
async fn fetches_only_below_the_reorg_horizon() {
    let mut base_layer = MockBaseLayer::new();
    base_layer.expect_latest_block_number().times(1).returning(|| Ok(20));
    base_layer
        .expect_get_logs()
        .withf(|_, from_block, to_block| (*from_block, *to_block) == (START_BLOCK, 15))
        .times(1)
        .returning(|_, _, _| Ok(vec![transfer_log(10, 0)]));
    let (mut fetcher, mut rx) = foreign_fetcher(base_layer, config());

    fetcher.fetch_new_events().await.unwrap();

    let fetched = drain(&mut rx);
    assert_eq!(fetched.len(), 2);
    assert!(
        matches!(&fetched[0], FetchedEvent::Event(BridgeEvent::Transfer(transfer)) if transfer.block_number == 10)
    );
    assert!(
        matches!(&fetched[1], FetchedEvent::SyncedUntil { kind: EventKind::Transfer, .. })
    );
}

#[tokio::test]
async fn no_fetch_when_safe_head_is_behind_the_cursor() {
    let mut base_layer = MockBaseLayer::new();
    base_layer.expect_latest_block_number().times(1).returning(|| Ok(20));
    base_layer.expect_get_logs().never();
    let (mut fetcher, mut rx) = foreign_fetcher(
        base_layer,
        EventFetcherConfig { start_block_number: 16, ..config() },
    );

    fetcher.fetch_new_events().await.unwrap();

    // Still emits the sync marker so the planner's watermarks keep advancing.
    let fetched = drain(&mut rx);
    assert_eq!(fetched.len(), 1);
    assert!(matches!(&fetched[0], FetchedEvent::SyncedUntil { .. }));
}

#[tokio::test]
async fn each_log_is_emitted_exactly_once() {
    let mut base_layer = MockBaseLayer::new();
    base_layer.expect_latest_block_number().times(2).returning(|| Ok(20));
    // The second round finds the cursor past the safe head: no second query.
    base_layer.expect_get_logs().times(1).returning(|_, _, _| Ok(vec![transfer_log(10, 0)]));
    let (mut fetcher, mut rx) = foreign_fetcher(base_layer, config());

    fetcher.fetch_new_events().await.unwrap();
    fetcher.fetch_new_events().await.unwrap();

    let events: Vec<_> = drain(&mut rx)
        .into_iter()
        .filter(|fetched| matches!(fetched, FetchedEvent::Event(_)))
        .collect();
    assert_eq!(events.len(), 1);
}

#[tokio::test]
async fn fetches_in_bounded_windows() {
    let mut base_layer = MockBaseLayer::new();
    base_layer.expect_latest_block_number().times(1).returning(|| Ok(17));
    for (expected_from, expected_to) in [(0, 4), (5, 9), (10, 12)] {
        base_layer
            .expect_get_logs()
            .withf(move |_, from_block, to_block| {
                (*from_block, *to_block) == (expected_from, expected_to)
            })
            .times(1)
            .returning(|_, _, _| Ok(vec![]));
    }
    let (mut fetcher, _rx) =
        foreign_fetcher(base_layer, EventFetcherConfig { fetch_window_size: 5, ..config() });

    fetcher.fetch_new_events().await.unwrap();
}

#[tokio::test]
async fn merges_event_kinds_into_chain_order() {
    let mut base_layer = MockBaseLayer::new();
    base_layer.expect_latest_block_number().times(1).returning(|| Ok(20));
    let confirmation_query = confirmation_log_query(home_bridge(), validator());
    base_layer
        .expect_get_logs()
        .withf(move |query, _, _| *query == confirmation_query)
        .times(1)
        .returning(|_, _, _| Ok(vec![]));
    let completion_query = completion_log_query(home_bridge());
    base_layer
        .expect_get_logs()
        .withf(move |query, _, _| *query == completion_query)
        .times(1)
        .returning(|_, _, _| Ok(vec![completion_log(3, 0), completion_log(1, 1)]));

    let (tx, mut rx) = mpsc::channel(100);
    let mut fetcher = EventFetcher::new(
        ChainRole::Home,
        config(),
        vec![
            (EventKind::Confirmation, confirmation_log_query(home_bridge(), validator())),
            (EventKind::Completion, completion_log_query(home_bridge())),
        ],
        Arc::new(base_layer),
        tx,
        Arc::new(FakeClock::new(Instant::now())),
    );

    fetcher.fetch_new_events().await.unwrap();

    let block_numbers: Vec<u64> = drain(&mut rx)
        .into_iter()
        .filter_map(|fetched| match fetched {
            FetchedEvent::Event(event) => Some(event.block_number()),
            FetchedEvent::SyncedUntil { .. } => None,
        })
        .collect();
    assert_eq!(block_numbers, vec![1, 3]);
}

#[tokio::test]
async fn home_fetcher_marks_both_kinds_synced() {
    let mut base_layer = MockBaseLayer::new();
    base_layer.expect_latest_block_number().times(1).returning(|| Ok(4));
    let (tx, mut rx) = mpsc::channel(100);
    let mut fetcher = EventFetcher::new(
        ChainRole::Home,
        EventFetcherConfig { start_block_number: 5, ..config() },
        vec![
            (EventKind::Confirmation, confirmation_log_query(home_bridge(), validator())),
            (EventKind::Completion, completion_log_query(home_bridge())),
        ],
        Arc::new(base_layer),
        tx,
        Arc::new(FakeClock::new(Instant::now())),
    );

    fetcher.fetch_new_events().await.unwrap();

    let kinds: Vec<EventKind> = drain(&mut rx)
        .into_iter()
        .map(|fetched| match fetched {
            FetchedEvent::SyncedUntil { kind, .. } => kind,
            other => panic!("unexpected queue item: {other:?}"),
        })
        .collect();
    assert_eq!(kinds, vec![EventKind::Confirmation, EventKind::Completion]);
}
