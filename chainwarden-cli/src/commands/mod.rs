//! Command handlers -- one module per subcommand

pub mod scorecard;

use std::path::Path;

use chainwarden_core::{ChainwardenConfig, ChainwardenError, ConfigError};

use crate::error::CliError;

/// Config path used when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "chainwarden.toml";

/// Loads the configuration file with env overrides applied.
///
/// A missing file at [`DEFAULT_CONFIG_PATH`] falls back to built-in defaults
/// (plus env overrides); any other missing path is an error. Validation is
/// left to the caller, after CLI overrides.
pub async fn load_config(path: &Path) -> Result<ChainwardenConfig, CliError> {
    match ChainwardenConfig::from_file(path).await {
        Ok(mut config) => {
            config.apply_env_overrides();
            Ok(config)
        }
        Err(ChainwardenError::Config(ConfigError::FileNotFound { .. }))
            if path == Path::new(DEFAULT_CONFIG_PATH) =>
        {
            let mut config = ChainwardenConfig::default();
            config.apply_env_overrides();
            Ok(config)
        }
        Err(e) => Err(e.into()),
    }
}

/// Applies the global `--log-level` / `--log-format` flags.
pub fn apply_log_overrides(
    config: &mut ChainwardenConfig,
    log_level: Option<&str>,
    log_format: Option<&str>,
) {
    if let Some(level) = log_level {
        config.general.log_level = level.to_owned();
    }
    if let Some(format) = log_format {
        config.general.log_format = format.to_owned();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn explicit_missing_path_is_an_error() {
        let err = load_config(Path::new("/nonexistent/chainwarden.toml"))
            .await
            .unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[tokio::test]
    async fn file_values_are_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chainwarden.toml");
        std::fs::write(&path, "[certifier]\nbatch_size = 25\n").unwrap();

        let config = load_config(&path).await.unwrap();
        assert_eq!(config.certifier.batch_size, 25);
        assert_eq!(config.general.log_level, "info");
    }

    #[test]
    fn log_flags_override_config() {
        let mut config = ChainwardenConfig::default();
        apply_log_overrides(&mut config, Some("debug"), None);
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.general.log_format, "json");

        apply_log_overrides(&mut config, None, Some("pretty"));
        assert_eq!(config.general.log_format, "pretty");
    }
}
