use std::sync::Arc;

use alloy::primitives::{Address, U256};
use bridge_base_layer::MockBaseLayer;
use bridge_types::ControlMessage;
use pretty_assertions::assert_eq;
use tokio::sync::mpsc;

use crate::balance_watcher::{ValidatorBalanceWatcher, ValidatorBalanceWatcherConfig};

const MINIMUM: u64 = 1_000;

fn watcher_with_balances(
    balances: Vec<u64>,
) -> (ValidatorBalanceWatcher, mpsc::Receiver<ControlMessage>) {
    let mut base_layer = MockBaseLayer::new();
    let mut remaining = balances.into_iter();
    base_layer
        .expect_balance()
        .returning(move |_| Ok(U256::from(remaining.next().expect("unexpected extra poll"))));
    let (control_tx, control_rx) = mpsc::channel(100);
    let watcher = ValidatorBalanceWatcher::new(
        ValidatorBalanceWatcherConfig {
            minimum_validator_balance: U256::from(MINIMUM),
            ..Default::default()
        },
        Arc::new(base_layer),
        Address::repeat_byte(0x44),
        control_tx,
    );
    (watcher, control_rx)
}

fn drain(rx: &mut mpsc::Receiver<ControlMessage>) -> Vec<ControlMessage> {
    let mut messages = Vec::new();
    while let Ok(message) = rx.try_recv() {
        messages.push(message);
    }
    messages
}

#[tokio::test]
async fn sufficient_balance_stays_quiet() {
    let (mut watcher, mut control_rx) = watcher_with_balances(vec![MINIMUM, MINIMUM + 1]);

    watcher.check_balance().await.unwrap();
    watcher.check_balance().await.unwrap();

    assert_eq!(drain(&mut control_rx), vec![]);
}

#[tokio::test]
async fn underfunded_validator_is_reported_immediately() {
    let (mut watcher, mut control_rx) = watcher_with_balances(vec![MINIMUM - 1]);

    watcher.check_balance().await.unwrap();

    assert_eq!(drain(&mut control_rx), vec![ControlMessage::BalanceLow]);
}

#[tokio::test]
async fn threshold_crossings_emit_once_per_direction() {
    let (mut watcher, mut control_rx) =
        watcher_with_balances(vec![MINIMUM, MINIMUM - 1, MINIMUM - 2, MINIMUM + 5, MINIMUM + 4]);

    for _ in 0..5 {
        watcher.check_balance().await.unwrap();
    }

    assert_eq!(
        drain(&mut control_rx),
        vec![ControlMessage::BalanceLow, ControlMessage::BalanceOk]
    );
}
