use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use bridge_time::time::SharedClock;
use bridge_transfer_recorder::TransferRecorder;
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::load_config;
use crate::trace_util::{reload_filter, ReloadHandle};

/// Dispatches the daemon's signal surface:
/// SIGINT/SIGTERM initiate graceful shutdown, SIGHUP reloads the logging
/// configuration from the config file, SIGUSR1 logs the recorder state.
pub async fn handle_signals(
    cancel: CancellationToken,
    reload_handle: ReloadHandle,
    config_path: PathBuf,
    recorder: Arc<Mutex<TransferRecorder>>,
    clock: SharedClock,
) -> Result<(), Infallible> {
    let mut interrupt = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");
    let mut terminate = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    let mut hangup = signal(SignalKind::hangup()).expect("failed to install SIGHUP handler");
    let mut user_defined1 =
        signal(SignalKind::user_defined1()).expect("failed to install SIGUSR1 handler");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            _ = interrupt.recv() => {
                info!("Received SIGINT signal.");
                cancel.cancel();
            }
            _ = terminate.recv() => {
                info!("Received SIGTERM signal.");
                cancel.cancel();
            }
            _ = hangup.recv() => {
                info!("Received SIGHUP signal.");
                reload_logging_config(&reload_handle, &config_path);
            }
            _ = user_defined1.recv() => {
                info!("Received SIGUSR1 signal.");
                log_recorder_state(&recorder, &clock);
            }
        }
    }
}

fn reload_logging_config(reload_handle: &ReloadHandle, config_path: &Path) {
    info!("Trying to reload the logging configuration from {}", config_path.display());
    match load_config(config_path) {
        Ok(config) => {
            reload_filter(reload_handle, &config.logging.filter);
            info!("Logging has been reconfigured.");
        }
        Err(error) => {
            // Called from the signal path; a broken config file must not
            // bring the daemon down.
            error!(
                "Error while trying to reload the logging configuration from {}: {error:#}",
                config_path.display()
            );
        }
    }
}

pub fn log_recorder_state(recorder: &Arc<Mutex<TransferRecorder>>, clock: &SharedClock) {
    let summary = recorder.lock().unwrap().state_summary(clock.now());
    info!(
        transfers = summary.transfers,
        confirmations = summary.confirmations,
        completions = summary.completions,
        scheduled = summary.scheduled,
        is_in_sync = summary.is_in_sync,
        "Recorder state."
    );
}
