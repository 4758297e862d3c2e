//! Added-latency waits

use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Sleeps for `latency` unless cancelled first.
///
/// Returns `false` when `cancel` fired, before or during the wait.
pub(crate) async fn pause(cancel: &CancellationToken, latency: Option<Duration>) -> bool {
    let Some(latency) = latency else {
        return !cancel.is_cancelled();
    };
    tokio::select! {
        biased;
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(latency) => true,
    }
}
