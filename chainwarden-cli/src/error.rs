//! CLI-specific error types and exit code mapping

use chainwarden_certifier::CertifierError;
use chainwarden_core::{ChainwardenError, IngestError};

/// CLI-specific error type.
///
/// The `exit_code()` method maps errors to process exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure, before any work starts.
    #[error("configuration error: {0}")]
    Config(String),

    /// A collaborator (HTTP client, sink, signal handler) could not be built.
    #[error("setup error: {0}")]
    Setup(String),

    /// The error policy stopped the run.
    #[error("run aborted: {0}")]
    Aborted(String),

    /// The run finished but recorded errors along the way.
    #[error("completed with {errors} recorded error(s)")]
    Degraded { errors: u64 },

    /// IO error (header file, signal registration).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                                  |
    /// |------|------------------------------------------|
    /// | 0    | Success                                  |
    /// | 1    | Run aborted / setup or runtime failure   |
    /// | 2    | Configuration error                      |
    /// | 4    | Completed with recorded errors           |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 2,
            Self::Degraded { .. } => 4,
            Self::Setup(_) | Self::Aborted(_) | Self::Io(_) => 1,
        }
    }
}

impl From<ChainwardenError> for CliError {
    fn from(e: ChainwardenError) -> Self {
        match e {
            ChainwardenError::Config(_) => Self::Config(e.to_string()),
            other => Self::Setup(other.to_string()),
        }
    }
}

impl From<IngestError> for CliError {
    fn from(e: IngestError) -> Self {
        Self::Setup(e.to_string())
    }
}

impl From<CertifierError> for CliError {
    fn from(e: CertifierError) -> Self {
        match e {
            CertifierError::Config { .. } => Self::Config(e.to_string()),
            other => Self::Aborted(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainwarden_core::ConfigError;

    #[test]
    fn test_exit_code_config() {
        assert_eq!(CliError::Config("bad".to_owned()).exit_code(), 2);
    }

    #[test]
    fn test_exit_code_setup() {
        assert_eq!(CliError::Setup("no client".to_owned()).exit_code(), 1);
    }

    #[test]
    fn test_exit_code_aborted() {
        assert_eq!(CliError::Aborted("403".to_owned()).exit_code(), 1);
    }

    #[test]
    fn test_exit_code_degraded() {
        let err = CliError::Degraded { errors: 3 };
        assert_eq!(err.exit_code(), 4);
        assert_eq!(err.to_string(), "completed with 3 recorded error(s)");
    }

    #[test]
    fn test_exit_code_io() {
        let err = CliError::from(std::io::Error::other("boom"));
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn core_config_errors_map_to_config() {
        let err = CliError::from(ChainwardenError::Config(ConfigError::InvalidValue {
            field: "certifier.batch_size".to_owned(),
            reason: "must be 1-1000000".to_owned(),
        }));
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn certifier_config_errors_map_to_config() {
        let err = CliError::from(CertifierError::Config {
            field: "interval".to_owned(),
            reason: "must be greater than zero".to_owned(),
        });
        assert_eq!(err.exit_code(), 2);

        let err = CliError::from(CertifierError::Transport("down".to_owned()));
        assert!(matches!(err, CliError::Aborted(_)));
    }
}
