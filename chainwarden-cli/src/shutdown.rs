//! Graceful shutdown
//!
//! The run is spawned as a background task and raced against a termination
//! future (normally [`wait_for_shutdown_signal`]). When termination wins the
//! run's token is cancelled and the task is joined before returning, so no
//! pass outlives the controller.

use std::future::Future;

use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::CliError;

/// Result of [`ShutdownController::run`].
#[derive(Debug)]
pub struct ShutdownOutcome<T> {
    /// Whatever the background work returned.
    pub output: T,
    /// `true` when termination fired before the work finished.
    pub signal: bool,
}

#[derive(Debug, Default)]
pub struct ShutdownController {
    token: CancellationToken,
}

impl ShutdownController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token handed to the work; cancelled on termination.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Runs `work` until it finishes or `termination` resolves.
    pub async fn run<W, Fut, T, S>(
        &self,
        work: W,
        termination: S,
    ) -> Result<ShutdownOutcome<T>, CliError>
    where
        W: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
        S: Future<Output = ()>,
    {
        let mut handle = tokio::spawn(work(self.token.clone()));

        tokio::select! {
            joined = &mut handle => {
                let output = joined.map_err(|e| CliError::Aborted(format!("run task failed: {e}")))?;
                Ok(ShutdownOutcome { output, signal: false })
            }
            () = termination => {
                info!("termination requested, waiting for the current pass to stop");
                self.token.cancel();
                let output = handle
                    .await
                    .map_err(|e| CliError::Aborted(format!("run task failed: {e}")))?;
                info!("run stopped");
                Ok(ShutdownOutcome { output, signal: true })
            }
        }
    }
}

/// Resolves on SIGTERM or SIGINT, returning the signal name.
#[cfg(unix)]
pub async fn wait_for_shutdown_signal() -> Result<&'static str, CliError> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Resolves on Ctrl-C.
#[cfg(not(unix))]
pub async fn wait_for_shutdown_signal() -> Result<&'static str, CliError> {
    tokio::signal::ctrl_c().await?;
    Ok("CTRL_C")
}
