use std::convert::Infallible;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bridge_base_layer::contracts::{
    completion_log_query,
    confirmation_log_query,
    transfer_log_query,
};
use bridge_base_layer::ethereum_base_layer::EthereumBaseLayer;
use bridge_base_layer::BaseLayer;
use bridge_confirmation::{ConfirmationSender, ConfirmationTaskPlanner, ConfirmationWatcher};
use bridge_event_fetcher::EventFetcher;
use bridge_monitoring_endpoint::{MonitoringEndpoint, MonitoringEndpointRunError};
use bridge_time::time::{DefaultClock, SharedClock};
use bridge_transfer_recorder::TransferRecorder;
use bridge_types::{ChainRole, EventKind};
use bridge_validator_watchers::{ValidatorBalanceWatcher, ValidatorStatusWatcher};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::BridgeNodeConfig;
use crate::setup::sanity_check_contracts;
use crate::signals::{handle_signals, log_recorder_state};
use crate::supervisor::Supervisor;
use crate::trace_util::ReloadHandle;

/// The queues were unbounded in spirit; this capacity is far above anything
/// the foreign chain's throughput can produce between planner wake-ups.
const CHANNEL_CAPACITY: usize = 2048;

const INTERNAL_STATE_LOG_INTERVAL: Duration = Duration::from_secs(60);

pub async fn run_bridge_node(
    config: BridgeNodeConfig,
    config_path: PathBuf,
    reload_handle: ReloadHandle,
) -> anyhow::Result<()> {
    let signer = config.validator_signer()?;
    let validator_address = signer.address();
    info!("Starting the bridge validation server for address {validator_address}");

    let foreign_base_layer: Arc<dyn BaseLayer> =
        Arc::new(EthereumBaseLayer::new(config.foreign_chain.clone())?);
    let home_base_layer: Arc<dyn BaseLayer> =
        Arc::new(EthereumBaseLayer::new(config.home_chain.clone())?);

    sanity_check_contracts(&config, foreign_base_layer.as_ref(), home_base_layer.as_ref())
        .await?;

    let clock: SharedClock = Arc::new(DefaultClock);
    let cancel = CancellationToken::new();

    let (control_tx, control_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (transfer_event_tx, transfer_event_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (home_event_tx, home_event_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (confirmation_task_tx, confirmation_task_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (pending_transaction_tx, pending_transaction_rx) = mpsc::channel(CHANNEL_CAPACITY);

    let recorder =
        Arc::new(Mutex::new(TransferRecorder::new(config.planner.sync_persistence_time)));

    let transfer_event_fetcher = EventFetcher::new(
        ChainRole::Foreign,
        config.foreign_fetcher.clone(),
        vec![(
            EventKind::Transfer,
            transfer_log_query(
                config.foreign_token_contract_address,
                config.foreign_bridge_contract_address,
            ),
        )],
        foreign_base_layer.clone(),
        transfer_event_tx,
        clock.clone(),
    );
    let home_bridge_event_fetcher = EventFetcher::new(
        ChainRole::Home,
        config.home_fetcher.clone(),
        vec![
            (
                EventKind::Confirmation,
                confirmation_log_query(config.home_bridge_contract_address, validator_address),
            ),
            (EventKind::Completion, completion_log_query(config.home_bridge_contract_address)),
        ],
        home_base_layer.clone(),
        home_event_tx,
        clock.clone(),
    );

    let confirmation_task_planner = ConfirmationTaskPlanner::new(
        config.planner.clone(),
        recorder.clone(),
        clock.clone(),
        control_rx,
        transfer_event_rx,
        home_event_rx,
        confirmation_task_tx,
    );
    let confirmation_sender = ConfirmationSender::new(
        config.sender.clone(),
        config.home_bridge_contract_address,
        config.foreign_bridge_contract_address,
        signer,
        home_base_layer.clone(),
        confirmation_task_rx,
        pending_transaction_tx,
        clock.clone(),
    );
    let confirmation_watcher = ConfirmationWatcher::new(
        config.watcher.clone(),
        home_base_layer.clone(),
        pending_transaction_rx,
        clock.clone(),
    );
    let validator_status_watcher = ValidatorStatusWatcher::new(
        config.status_watcher.clone(),
        home_base_layer.clone(),
        config.home_bridge_contract_address,
        validator_address,
        control_tx.clone(),
    );
    let validator_balance_watcher = ValidatorBalanceWatcher::new(
        config.balance_watcher.clone(),
        home_base_layer.clone(),
        validator_address,
        control_tx,
    );

    let mut supervisor = Supervisor::new(cancel.clone());
    supervisor.spawn("fetch-foreign-bridge-events", transfer_event_fetcher.run(cancel.clone()));
    supervisor.spawn("fetch-home-bridge-events", home_bridge_event_fetcher.run(cancel.clone()));
    supervisor.spawn("confirmation-task-planner", confirmation_task_planner.run(cancel.clone()));
    supervisor.spawn("confirmation-sender", confirmation_sender.run(cancel.clone()));
    supervisor.spawn("confirmation-watcher", confirmation_watcher.run(cancel.clone()));
    supervisor.spawn("validator-status-watcher", validator_status_watcher.run(cancel.clone()));
    supervisor
        .spawn("validator-balance-watcher", validator_balance_watcher.run(cancel.clone()));
    supervisor.spawn(
        "log-internal-state",
        log_internal_state(recorder.clone(), clock.clone(), cancel.clone()),
    );
    supervisor.spawn(
        "signal-handler",
        handle_signals(
            cancel.clone(),
            reload_handle,
            config_path,
            recorder.clone(),
            clock.clone(),
        ),
    );
    if let Some(endpoint_config) = config.monitoring_endpoint.clone() {
        let endpoint = MonitoringEndpoint::new(
            endpoint_config,
            recorder.clone(),
            clock.clone(),
            config.public_config(),
        );
        supervisor.spawn("monitoring-endpoint", run_monitoring_endpoint(endpoint, cancel.clone()));
    }

    supervisor.run().await
}

async fn run_monitoring_endpoint(
    endpoint: MonitoringEndpoint,
    cancel: CancellationToken,
) -> Result<(), MonitoringEndpointRunError> {
    tokio::select! {
        _ = cancel.cancelled() => Ok(()),
        result = endpoint.run() => result,
    }
}

async fn log_internal_state(
    recorder: Arc<Mutex<TransferRecorder>>,
    clock: SharedClock,
    cancel: CancellationToken,
) -> Result<(), Infallible> {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            _ = tokio::time::sleep(INTERNAL_STATE_LOG_INTERVAL) => {}
        }
        log_recorder_state(&recorder, &clock);
    }
}
