//! Collector error types
//!
//! [`CollectorError`] converts into [`ChainwardenError`] so the binary can
//! propagate it with `?`.

use chainwarden_core::error::{ChainwardenError, CollectError, RegistryError};

/// Collector domain error
#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    /// An image reference could not be parsed
    #[error("invalid reference '{reference}': {reason}")]
    InvalidReference {
        /// The rejected input
        reference: String,
        /// Why it was rejected
        reason: String,
    },

    /// The artifact registry failed to answer
    #[error("registry error: {reference}: {reason}")]
    Registry {
        /// Reference being looked up
        reference: String,
        /// Failure reported by the registry client
        reason: String,
    },

    /// Capability registration failed
    #[error("registration error: {0}")]
    Registration(#[from] RegistryError),

    /// The document stream was closed by its consumer
    #[error("channel error: {0}")]
    Channel(String),

    /// A worker task panicked or was aborted
    #[error("task error: {0}")]
    Task(String),

    /// Collection observed cancellation
    #[error("collection cancelled")]
    Cancelled,
}

impl From<CollectorError> for ChainwardenError {
    fn from(err: CollectorError) -> Self {
        match err {
            CollectorError::Registration(e) => ChainwardenError::Registry(e),
            CollectorError::Cancelled => ChainwardenError::Collect(CollectError::Cancelled),
            other => ChainwardenError::Collect(CollectError::Failed(other.to_string())),
        }
    }
}
