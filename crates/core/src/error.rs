//! Error types -- per-domain error definitions

/// chainwarden top-level error type
#[derive(Debug, thiserror::Error)]
pub enum ChainwardenError {
    /// Configuration errors
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Capability registration errors
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Ingestion sink errors
    #[error("ingest error: {0}")]
    Ingest(#[from] IngestError),

    /// Collection errors
    #[error("collect error: {0}")]
    Collect(#[from] CollectError),

    /// Certification errors
    #[error("certify error: {0}")]
    Certify(#[from] CertifyError),

    /// I/O errors
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Configuration file does not exist
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// Configuration could not be parsed
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// A configuration value is out of range or malformed
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Registration errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// A factory is already registered under this name
    #[error("the name '{name}' is already registered")]
    Duplicate { name: String },

    /// Registration names must be non-empty
    #[error("registration name must not be empty")]
    EmptyName,
}

/// Errors returned by an ingestion sink
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// The request never reached the sink or the response was unreadable
    #[error("transport error: {0}")]
    Transport(String),

    /// The sink answered with a failure status
    #[error("sink rejected document: status {status}: {reason}")]
    Rejected { status: u16, reason: String },

    /// A configured request header is malformed
    #[error("invalid header: {0}")]
    InvalidHeader(String),
}

/// Collection domain errors (wire form of the collector crate's errors)
#[derive(Debug, thiserror::Error)]
pub enum CollectError {
    /// A collector failed
    #[error("collection failed: {0}")]
    Failed(String),

    /// The collection pass was cancelled
    #[error("collection cancelled")]
    Cancelled,
}

/// Certification domain errors (wire form of the certifier crate's errors)
#[derive(Debug, thiserror::Error)]
pub enum CertifyError {
    /// A certifier pass failed
    #[error("certifier pass failed: {0}")]
    PassFailed(String),

    /// The error policy aborted the run
    #[error("certification aborted: {0}")]
    Aborted(String),
}
