//! Configuration -- `chainwarden.toml` parsing and runtime settings
//!
//! [`ChainwardenConfig`] holds every section; each crate reads only its own.
//!
//! # Precedence
//! 1. CLI flags (highest)
//! 2. Environment variables (`CHAINWARDEN_CERTIFIER_BATCH_SIZE=500`)
//! 3. Config file (`chainwarden.toml`)
//! 4. Defaults (`Default` impls)
//!
//! # Example
//! ```no_run
//! # async fn example() -> Result<(), chainwarden_core::error::ChainwardenError> {
//! use chainwarden_core::config::ChainwardenConfig;
//!
//! let config = ChainwardenConfig::load("chainwarden.toml").await?;
//! let config = ChainwardenConfig::parse("[certifier]\npoll = true\ninterval = \"10m\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::duration::parse_duration;
use crate::error::{ChainwardenError, ConfigError};

/// Upper bound for the certifier page size
pub const MAX_BATCH_SIZE: usize = 1_000_000;

/// Combined chainwarden configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChainwardenConfig {
    /// General settings
    #[serde(default)]
    pub general: GeneralConfig,
    /// Ingestion sink settings
    #[serde(default)]
    pub ingest: IngestConfig,
    /// Certifier run settings
    #[serde(default)]
    pub certifier: CertifierConfig,
}

impl ChainwardenConfig {
    /// Loads a TOML file, applies env overrides and validates the result.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ChainwardenError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Loads a TOML file without env overrides or validation.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ChainwardenError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ChainwardenError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                ChainwardenError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    /// Parses a TOML string.
    pub fn parse(toml_str: &str) -> Result<Self, ChainwardenError> {
        toml::from_str(toml_str).map_err(|e| {
            ChainwardenError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// Applies `CHAINWARDEN_{SECTION}_{FIELD}` environment overrides.
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "CHAINWARDEN_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "CHAINWARDEN_GENERAL_LOG_FORMAT");

        // Ingest
        override_string(&mut self.ingest.endpoint, "CHAINWARDEN_INGEST_ENDPOINT");
        override_string(&mut self.ingest.header_file, "CHAINWARDEN_INGEST_HEADER_FILE");
        override_bool(&mut self.ingest.query_vulns, "CHAINWARDEN_INGEST_QUERY_VULNS");
        override_bool(
            &mut self.ingest.query_licenses,
            "CHAINWARDEN_INGEST_QUERY_LICENSES",
        );
        override_bool(
            &mut self.ingest.add_vuln_metadata,
            "CHAINWARDEN_INGEST_ADD_VULN_METADATA",
        );

        // Certifier
        override_bool(&mut self.certifier.poll, "CHAINWARDEN_CERTIFIER_POLL");
        override_string(&mut self.certifier.interval, "CHAINWARDEN_CERTIFIER_INTERVAL");
        override_usize(
            &mut self.certifier.batch_size,
            "CHAINWARDEN_CERTIFIER_BATCH_SIZE",
        );
        override_string(&mut self.certifier.latency, "CHAINWARDEN_CERTIFIER_LATENCY");
        override_bool(&mut self.certifier.fail_fast, "CHAINWARDEN_CERTIFIER_FAIL_FAST");
        override_string(
            &mut self.certifier.scorecard_api_url,
            "CHAINWARDEN_CERTIFIER_SCORECARD_API_URL",
        );
    }

    /// Validates every section.
    pub fn validate(&self) -> Result<(), ChainwardenError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        validate_url("ingest.endpoint", &self.ingest.endpoint)?;
        validate_url("certifier.scorecard_api_url", &self.certifier.scorecard_api_url)?;

        let interval = self.certifier.interval()?;
        if self.certifier.poll && interval.is_zero() {
            return Err(invalid(
                "certifier.interval",
                "must be greater than zero when polling".to_owned(),
            ));
        }

        if self.certifier.batch_size == 0 || self.certifier.batch_size > MAX_BATCH_SIZE {
            return Err(invalid(
                "certifier.batch_size",
                format!("must be 1-{MAX_BATCH_SIZE}"),
            ));
        }

        self.certifier.added_latency()?;

        Ok(())
    }
}

/// General settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Log format (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
        }
    }
}

/// Ingestion sink settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Ingestion endpoint address
    pub endpoint: String,
    /// Optional file of extra request headers (`Name: value` per line). Empty = none
    pub header_file: String,
    /// Ask the sink to look up vulnerabilities on ingestion
    pub query_vulns: bool,
    /// Ask the sink to look up licenses on ingestion
    pub query_licenses: bool,
    /// Ask the sink to attach vulnerability metadata
    pub add_vuln_metadata: bool,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8080/query".to_owned(),
            header_file: String::new(),
            query_vulns: false,
            query_licenses: false,
            add_vuln_metadata: false,
        }
    }
}

/// Certifier run settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CertifierConfig {
    /// Re-run passes on `interval` until cancelled
    pub poll: bool,
    /// Time between pass starts, as a duration string
    pub interval: String,
    /// Page size for paginated source queries
    pub batch_size: usize,
    /// Artificial delay before each external call, as a duration string. Empty = none
    pub latency: String,
    /// Abort the run on the first error instead of recording it and continuing
    pub fail_fast: bool,
    /// Base URL of the scorecard results API
    pub scorecard_api_url: String,
}

impl Default for CertifierConfig {
    fn default() -> Self {
        Self {
            poll: false,
            interval: "5m".to_owned(),
            batch_size: 60_000,
            latency: String::new(),
            fail_fast: false,
            scorecard_api_url: "https://api.securityscorecards.dev".to_owned(),
        }
    }
}

impl CertifierConfig {
    /// Parsed poll interval.
    pub fn interval(&self) -> Result<Duration, ConfigError> {
        parse_duration(&self.interval).map_err(|reason| ConfigError::InvalidValue {
            field: "certifier.interval".to_owned(),
            reason,
        })
    }

    /// Parsed added latency; `None` when unset.
    pub fn added_latency(&self) -> Result<Option<Duration>, ConfigError> {
        if self.latency.trim().is_empty() {
            return Ok(None);
        }
        parse_duration(&self.latency)
            .map(Some)
            .map_err(|reason| ConfigError::InvalidValue {
                field: "certifier.latency".to_owned(),
                reason,
            })
    }
}

fn invalid(field: &str, reason: String) -> ChainwardenError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason,
    }
    .into()
}

fn validate_url(field: &str, value: &str) -> Result<(), ChainwardenError> {
    if value.is_empty() {
        return Err(invalid(field, "must not be empty".to_owned()));
    }
    if !(value.starts_with("http://") || value.starts_with("https://")) {
        return Err(invalid(
            field,
            format!("'{value}' must start with http:// or https://"),
        ));
    }
    Ok(())
}

// --- env override helpers ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn default_config_has_sane_values() {
        let config = ChainwardenConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.general.log_format, "json");
        assert!(!config.certifier.poll);
        assert_eq!(config.certifier.batch_size, 60_000);
        assert!(config.ingest.header_file.is_empty());
    }

    #[test]
    fn default_config_passes_validation() {
        ChainwardenConfig::default().validate().unwrap();
    }

    #[test]
    fn empty_toml_uses_defaults() {
        let config = ChainwardenConfig::parse("").unwrap();
        assert_eq!(config.certifier.interval, "5m");
        assert_eq!(config.ingest.endpoint, "http://localhost:8080/query");
    }

    #[test]
    fn partial_toml_merges_with_defaults() {
        let toml = r#"
[certifier]
poll = true
interval = "30s"
latency = "250ms"
"#;
        let config = ChainwardenConfig::parse(toml).unwrap();
        assert!(config.certifier.poll);
        assert_eq!(
            config.certifier.interval().unwrap(),
            Duration::from_secs(30)
        );
        assert_eq!(
            config.certifier.added_latency().unwrap(),
            Some(Duration::from_millis(250))
        );
        assert_eq!(config.certifier.batch_size, 60_000);
        assert_eq!(config.general.log_format, "json");
    }

    #[test]
    fn invalid_toml_returns_parse_error() {
        let err = ChainwardenConfig::parse("invalid = [[[toml").unwrap_err();
        assert!(matches!(
            err,
            ChainwardenError::Config(ConfigError::ParseFailed { .. })
        ));
    }

    #[test]
    fn validate_rejects_invalid_log_level() {
        let mut config = ChainwardenConfig::default();
        config.general.log_level = "verbose".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("log_level"));
    }

    #[test]
    fn validate_rejects_zero_batch_size() {
        let mut config = ChainwardenConfig::default();
        config.certifier.batch_size = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("batch_size"));
    }

    #[test]
    fn validate_rejects_unparseable_interval() {
        let mut config = ChainwardenConfig::default();
        config.certifier.interval = "soon".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("certifier.interval"));
    }

    #[test]
    fn validate_rejects_zero_interval_when_polling() {
        let mut config = ChainwardenConfig::default();
        config.certifier.poll = true;
        config.certifier.interval = "0s".to_owned();
        assert!(config.validate().is_err());

        config.certifier.poll = false;
        config.validate().unwrap();
    }

    #[test]
    fn validate_rejects_bad_latency() {
        let mut config = ChainwardenConfig::default();
        config.certifier.latency = "fast".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("certifier.latency"));
    }

    #[test]
    fn validate_rejects_non_http_endpoint() {
        let mut config = ChainwardenConfig::default();
        config.ingest.endpoint = "localhost:8080".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("ingest.endpoint"));
    }

    #[test]
    fn unset_latency_is_none() {
        let config = CertifierConfig::default();
        assert_eq!(config.added_latency().unwrap(), None);
    }

    #[test]
    #[serial]
    fn env_override_applies() {
        // SAFETY: serialized with the other env tests.
        unsafe {
            std::env::set_var("CHAINWARDEN_CERTIFIER_BATCH_SIZE", "500");
            std::env::set_var("CHAINWARDEN_CERTIFIER_POLL", "true");
        }
        let mut config = ChainwardenConfig::default();
        config.apply_env_overrides();
        assert_eq!(config.certifier.batch_size, 500);
        assert!(config.certifier.poll);
        unsafe {
            std::env::remove_var("CHAINWARDEN_CERTIFIER_BATCH_SIZE");
            std::env::remove_var("CHAINWARDEN_CERTIFIER_POLL");
        }
    }

    #[test]
    #[serial]
    fn env_override_bad_bool_keeps_original() {
        // SAFETY: serialized with the other env tests.
        unsafe { std::env::set_var("CHAINWARDEN_INGEST_QUERY_VULNS", "maybe") };
        let mut config = ChainwardenConfig::default();
        config.apply_env_overrides();
        assert!(!config.ingest.query_vulns);
        unsafe { std::env::remove_var("CHAINWARDEN_INGEST_QUERY_VULNS") };
    }

    #[test]
    fn config_serialize_roundtrip() {
        let config = ChainwardenConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed = ChainwardenConfig::parse(&toml_str).unwrap();
        assert_eq!(config.certifier.interval, parsed.certifier.interval);
        assert_eq!(config.ingest.endpoint, parsed.ingest.endpoint);
    }

    #[tokio::test]
    async fn from_file_not_found() {
        let err = ChainwardenConfig::from_file("/nonexistent/chainwarden.toml")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ChainwardenError::Config(ConfigError::FileNotFound { .. })
        ));
    }
}
