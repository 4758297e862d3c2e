//! Certifier error types
//!
//! [`CertifierError`] converts into [`ChainwardenError`] for `?` propagation
//! at the binary edge.

use chainwarden_core::error::{CertifyError, ChainwardenError, ConfigError, IngestError};

/// Certifier domain error
#[derive(Debug, thiserror::Error)]
pub enum CertifierError {
    /// Run configuration is invalid
    #[error("config error: {field}: {reason}")]
    Config {
        /// Offending field
        field: String,
        /// Why it was rejected
        reason: String,
    },

    /// A remote call failed (connect, auth, non-success status)
    #[error("transport error: {0}")]
    Transport(String),

    /// A remote response could not be decoded
    #[error("decode error: {0}")]
    Decode(String),

    /// A source could not be turned into a certifiable component
    #[error("resolve error: {0}")]
    Resolve(String),

    /// The ingestion sink refused a document
    #[error("emit error: {0}")]
    Emit(#[from] IngestError),

    /// A stream endpoint went away
    #[error("channel error: {0}")]
    Channel(String),

    /// A worker task panicked or was aborted
    #[error("task error: {0}")]
    Task(String),
}

impl From<CertifierError> for ChainwardenError {
    fn from(err: CertifierError) -> Self {
        match err {
            CertifierError::Config { field, reason } => {
                ChainwardenError::Config(ConfigError::InvalidValue { field, reason })
            }
            CertifierError::Emit(e) => ChainwardenError::Ingest(e),
            other => ChainwardenError::Certify(CertifyError::PassFailed(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let err = CertifierError::Config {
            field: "batch_size".to_owned(),
            reason: "must be positive".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("batch_size"));
        assert!(msg.contains("must be positive"));
    }

    #[test]
    fn ingest_error_converts_into_emit() {
        let err: CertifierError = IngestError::Transport("connection reset".to_owned()).into();
        assert!(matches!(err, CertifierError::Emit(_)));
        assert!(err.to_string().contains("connection reset"));
    }

    #[test]
    fn emit_error_keeps_ingest_kind_at_top_level() {
        let err = CertifierError::Emit(IngestError::Rejected {
            status: 400,
            reason: "bad doc".to_owned(),
        });
        let top: ChainwardenError = err.into();
        assert!(matches!(top, ChainwardenError::Ingest(_)));
    }

    #[test]
    fn config_error_becomes_top_level_config() {
        let top: ChainwardenError = CertifierError::Config {
            field: "interval".to_owned(),
            reason: "zero".to_owned(),
        }
        .into();
        assert!(matches!(
            top,
            ChainwardenError::Config(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn transport_error_becomes_pass_failure() {
        let top: ChainwardenError = CertifierError::Transport("401".to_owned()).into();
        assert!(matches!(
            top,
            ChainwardenError::Certify(CertifyError::PassFailed(_))
        ));
    }
}
