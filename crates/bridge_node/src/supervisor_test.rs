use std::convert::Infallible;
use std::time::Duration;

use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use crate::supervisor::Supervisor;

const TEST_TIMEOUT: Duration = Duration::from_secs(5);

async fn wait_for_cancel(cancel: CancellationToken) -> Result<(), Infallible> {
    cancel.cancelled().await;
    Ok(())
}

#[tokio::test]
async fn failing_task_cancels_the_pool_and_fails_the_run() {
    let cancel = CancellationToken::new();
    let mut supervisor = Supervisor::new(cancel.clone());
    supervisor.spawn("well-behaved", wait_for_cancel(cancel.clone()));
    supervisor.spawn("failing", async {
        Err::<(), _>(std::io::Error::new(std::io::ErrorKind::Other, "boom"))
    });

    let result = timeout(TEST_TIMEOUT, supervisor.run()).await.unwrap();

    assert!(result.is_err());
    assert!(cancel.is_cancelled());
}

#[tokio::test]
async fn requested_shutdown_exits_cleanly() {
    let cancel = CancellationToken::new();
    let mut supervisor = Supervisor::new(cancel.clone());
    supervisor.spawn("first", wait_for_cancel(cancel.clone()));
    supervisor.spawn("second", wait_for_cancel(cancel.clone()));

    cancel.cancel();
    let result = timeout(TEST_TIMEOUT, supervisor.run()).await.unwrap();

    assert!(result.is_ok());
}

#[tokio::test]
async fn unexpected_clean_exit_is_a_failure() {
    let cancel = CancellationToken::new();
    let mut supervisor = Supervisor::new(cancel.clone());
    supervisor.spawn("well-behaved", wait_for_cancel(cancel.clone()));
    supervisor.spawn("quitter", async { Ok::<(), Infallible>(()) });

    let result = timeout(TEST_TIMEOUT, supervisor.run()).await.unwrap();

    assert!(result.is_err());
}

#[tokio::test]
async fn stuck_tasks_are_aborted_after_the_cleanup_timeout() {
    let cancel = CancellationToken::new();
    let mut supervisor =
        Supervisor::with_cleanup_timeout(cancel.clone(), Duration::from_millis(50));
    supervisor.spawn("stuck", async {
        std::future::pending::<()>().await;
        Ok::<(), Infallible>(())
    });

    cancel.cancel();
    let result = timeout(TEST_TIMEOUT, supervisor.run()).await.unwrap();

    assert!(result.is_err());
}