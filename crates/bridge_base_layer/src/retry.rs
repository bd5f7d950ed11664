//! Backoff policy for transient RPC failures: exponential from 5s up to a
//! 120s cap, retrying forever. Non-transient errors are returned to the
//! caller immediately.

use std::future::Future;
use std::time::Duration;

use tokio_retry::strategy::ExponentialBackoff;
use tracing::warn;

use crate::errors::BaseLayerError;

const BACKOFF_CAP: Duration = Duration::from_secs(120);

/// 5s, 10s, 20s, ... capped at [`BACKOFF_CAP`], never exhausted.
pub fn transient_backoff() -> impl Iterator<Item = Duration> {
    ExponentialBackoff::from_millis(2).factor(2500).max_delay(BACKOFF_CAP)
}

pub async fn retry_transient<T, F, Fut>(
    operation: &str,
    mut action: F,
) -> Result<T, BaseLayerError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, BaseLayerError>>,
{
    let mut delays = transient_backoff();
    loop {
        match action().await {
            Ok(value) => return Ok(value),
            Err(error) if error.is_transient() => {
                let delay = delays.next().expect("backoff iterator never ends");
                warn!("{operation} hit a transient RPC error, retrying in {delay:?}: {error}");
                tokio::time::sleep(delay).await;
            }
            Err(error) => return Err(error),
        }
    }
}
