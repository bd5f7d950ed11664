use std::future::Future;
use std::time::Duration;

use anyhow::anyhow;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[cfg(test)]
#[path = "supervisor_test.rs"]
mod supervisor_test;

/// How long tasks get to finish after shutdown is initiated before the
/// remaining ones are aborted.
pub const APPLICATION_CLEANUP_TIMEOUT: Duration = Duration::from_secs(20);

/// Owns the daemon's task pool. The first task that terminates - normally
/// only possible on error or after cancellation - brings the whole pool down:
/// every task is cancelled, given the cleanup timeout, then aborted.
pub struct Supervisor {
    tasks: JoinSet<(&'static str, anyhow::Result<()>)>,
    cancel: CancellationToken,
    cleanup_timeout: Duration,
}

impl Supervisor {
    pub fn new(cancel: CancellationToken) -> Self {
        Self { tasks: JoinSet::new(), cancel, cleanup_timeout: APPLICATION_CLEANUP_TIMEOUT }
    }

    #[cfg(test)]
    pub(crate) fn with_cleanup_timeout(cancel: CancellationToken, timeout: Duration) -> Self {
        Self { tasks: JoinSet::new(), cancel, cleanup_timeout: timeout }
    }

    pub fn spawn<F, E>(&mut self, name: &'static str, task: F)
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: Into<anyhow::Error> + 'static,
    {
        self.tasks.spawn(async move { (name, task.await.map_err(Into::into)) });
    }

    /// Runs until every task has finished. Returns an error if any task
    /// failed or terminated before shutdown was requested.
    pub async fn run(mut self) -> anyhow::Result<()> {
        let mut failure: Option<anyhow::Error> = None;

        tokio::select! {
            joined = self.tasks.join_next() => {
                if let Some(joined) = joined {
                    failure = self.inspect_termination(joined);
                }
            }
            _ = self.cancel.cancelled() => {}
        }

        info!("Stopping...");
        self.cancel.cancel();

        let cleanup_timeout = self.cleanup_timeout;
        let drain = async {
            while let Some(joined) = self.tasks.join_next().await {
                if let Some(error) = self.inspect_termination(joined) {
                    failure.get_or_insert(error);
                }
            }
        };
        if tokio::time::timeout(cleanup_timeout, drain).await.is_err() {
            error!("Bridge didn't clean up in time, aborting the remaining tasks.");
            self.tasks.abort_all();
            failure.get_or_insert_with(|| anyhow!("tasks did not terminate in time"));
        }

        match failure {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn inspect_termination(
        &self,
        joined: Result<(&'static str, anyhow::Result<()>), tokio::task::JoinError>,
    ) -> Option<anyhow::Error> {
        let stop_requested = self.cancel.is_cancelled();
        match joined {
            Ok((name, Ok(()))) => {
                if stop_requested {
                    info!("Task {name} finished.");
                    None
                } else {
                    Some(anyhow!("task {name} terminated unexpectedly"))
                }
            }
            Ok((name, Err(error))) => {
                error!("Task {name} failed: {error:#}");
                Some(error.context(format!("task {name} failed")))
            }
            Err(join_error) => {
                error!("Task panicked: {join_error}");
                Some(anyhow!("task panicked: {join_error}"))
            }
        }
    }
}
