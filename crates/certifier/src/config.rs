//! Certifier run configuration
//!
//! [`CertifierRunConfig`] is the validated, immutable form of the
//! `[certifier]` section plus CLI overrides.
//!
//! ```
//! use std::time::Duration;
//! use chainwarden_certifier::CertifierRunConfigBuilder;
//!
//! let config = CertifierRunConfigBuilder::new()
//!     .poll(true)
//!     .interval(Duration::from_secs(600))
//!     .batch_size(1_000)
//!     .build()
//!     .unwrap();
//! assert!(config.poll());
//! ```

use std::time::Duration;

use chainwarden_core::config::{CertifierConfig, MAX_BATCH_SIZE};

use crate::error::CertifierError;

/// Validated run configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertifierRunConfig {
    batch_size: usize,
    added_latency: Option<Duration>,
    poll: bool,
    interval: Duration,
}

impl CertifierRunConfig {
    /// Page size for paginated source queries.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Delay before each external call; `None` disables it.
    pub fn added_latency(&self) -> Option<Duration> {
        self.added_latency
    }

    /// Whether passes repeat until cancelled.
    pub fn poll(&self) -> bool {
        self.poll
    }

    /// Time between pass starts when polling.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Builder seeded from a parsed `[certifier]` section.
    pub fn builder_from(core: &CertifierConfig) -> Result<CertifierRunConfigBuilder, CertifierError> {
        let interval = core.interval().map_err(config_error)?;
        let added_latency = core.added_latency().map_err(config_error)?;
        Ok(CertifierRunConfigBuilder::new()
            .batch_size(core.batch_size)
            .poll(core.poll)
            .interval(interval)
            .added_latency(added_latency))
    }
}

fn config_error(err: chainwarden_core::ConfigError) -> CertifierError {
    match err {
        chainwarden_core::ConfigError::InvalidValue { field, reason } => {
            CertifierError::Config { field, reason }
        }
        other => CertifierError::Config {
            field: "certifier".to_owned(),
            reason: other.to_string(),
        },
    }
}

/// Builder for [`CertifierRunConfig`]
#[derive(Debug, Clone)]
pub struct CertifierRunConfigBuilder {
    batch_size: usize,
    added_latency: Option<Duration>,
    poll: bool,
    interval: Duration,
}

impl Default for CertifierRunConfigBuilder {
    fn default() -> Self {
        Self {
            batch_size: 60_000,
            added_latency: None,
            poll: false,
            interval: Duration::from_secs(300),
        }
    }
}

impl CertifierRunConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn added_latency(mut self, latency: Option<Duration>) -> Self {
        self.added_latency = latency;
        self
    }

    pub fn poll(mut self, poll: bool) -> Self {
        self.poll = poll;
        self
    }

    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Validates and freezes the configuration.
    pub fn build(self) -> Result<CertifierRunConfig, CertifierError> {
        if self.batch_size == 0 || self.batch_size > MAX_BATCH_SIZE {
            return Err(CertifierError::Config {
                field: "batch_size".to_owned(),
                reason: format!("must be 1-{MAX_BATCH_SIZE}"),
            });
        }

        if self.poll && self.interval.is_zero() {
            return Err(CertifierError::Config {
                field: "interval".to_owned(),
                reason: "must be greater than zero when polling".to_owned(),
            });
        }

        // zero latency is the same as none
        let added_latency = self.added_latency.filter(|l| !l.is_zero());

        Ok(CertifierRunConfig {
            batch_size: self.batch_size,
            added_latency,
            poll: self.poll,
            interval: self.interval,
        })
    }
}
