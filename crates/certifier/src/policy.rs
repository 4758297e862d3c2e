//! Error policies
//!
//! The orchestrator routes every query, certifier and emit error through an
//! [`ErrorHandler`]. `true` records the error and keeps going; `false`
//! aborts the run with that error.

use std::sync::atomic::{AtomicU64, Ordering};

use tracing::error;

use crate::error::CertifierError;

/// Decides whether the orchestration continues after an error.
pub trait ErrorHandler: Send + Sync {
    /// Returns `true` to continue, `false` to abort.
    fn handle(&self, error: &CertifierError) -> bool;
}

impl<F> ErrorHandler for F
where
    F: Fn(&CertifierError) -> bool + Send + Sync,
{
    fn handle(&self, error: &CertifierError) -> bool {
        self(error)
    }
}

/// Logs every error and always continues.
#[derive(Debug, Default)]
pub struct ContinueOnError {
    seen: AtomicU64,
}

impl ContinueOnError {
    pub fn new() -> Self {
        Self::default()
    }

    /// Errors handled so far.
    pub fn seen(&self) -> u64 {
        self.seen.load(Ordering::Relaxed)
    }
}

impl ErrorHandler for ContinueOnError {
    fn handle(&self, err: &CertifierError) -> bool {
        self.seen.fetch_add(1, Ordering::Relaxed);
        error!(error = %err, "certifier ended with error");
        true
    }
}

/// Logs the error and aborts.
#[derive(Debug, Default, Clone, Copy)]
pub struct AbortOnError;

impl ErrorHandler for AbortOnError {
    fn handle(&self, err: &CertifierError) -> bool {
        error!(error = %err, "certifier ended with error, aborting");
        false
    }
}
