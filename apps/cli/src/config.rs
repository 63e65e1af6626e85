//! Configuration for the `spine-submit` binary
//!
//! Loaded in order, later sources winning:
//! 1. `.env` (through `dotenvy`, only fills variables that are not already set)
//! 2. `spine.toml` in the working directory, or the file given with `--config`
//! 3. Environment variables prefixed with `SPINE__`, nested with `__`
//!    (e.g. `SPINE__SPINE__URL`, `SPINE__LOGGING__LEVEL`)

use std::path::Path;

use anyhow::{bail, Context};
use config::{builder::DefaultState, ConfigBuilder, Environment, File};
use serde::Deserialize;
use spine_client::SpineConfig;
use tracing::level_filters::LevelFilter;

const ROTATIONS: [&str; 4] = ["daily", "hourly", "minutely", "never"];

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub spine: SpineConfig,
    pub logging: LoggingConfig,
}

/// Log output settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level when `RUST_LOG` is not set
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
    pub file_enabled: bool,
    pub file_directory: String,
    pub file_prefix: String,
    /// daily, hourly, minutely or never
    pub file_rotation: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file_enabled: false,
            file_directory: "logs".to_string(),
            file_prefix: "spine-submit".to_string(),
            file_rotation: "daily".to_string(),
        }
    }
}

impl Config {
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let file = match path {
            Some(path) => File::from(path).required(true),
            None => File::with_name("spine").required(false),
        };
        let builder = config::Config::builder().add_source(file).add_source(
            Environment::with_prefix("SPINE")
                .separator("__")
                .try_parsing(true),
        );
        Self::from_builder(builder)
    }

    fn from_builder(builder: ConfigBuilder<DefaultState>) -> anyhow::Result<Self> {
        builder
            .build()
            .context("Failed to read configuration sources")?
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.spine.validate()?;
        self.logging.validate()
    }
}

impl LoggingConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        self.level
            .parse::<LevelFilter>()
            .with_context(|| format!("invalid logging level '{}'", self.level))?;
        if !ROTATIONS.contains(&self.file_rotation.as_str()) {
            bail!(
                "invalid file_rotation '{}', expected one of {}",
                self.file_rotation,
                ROTATIONS.join(", ")
            );
        }
        if self.file_enabled && self.file_directory.trim().is_empty() {
            bail!("file_directory must be set when file logging is enabled");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    fn from_toml(toml: &str) -> anyhow::Result<Config> {
        Config::from_builder(config::Config::builder().add_source(File::from_str(toml, FileFormat::Toml)))
    }

    #[test]
    fn test_toml_overrides_defaults() {
        let config = from_toml(
            r#"
            [spine]
            url = "https://spine.example"
            scr_result_repeat_timeout_ms = 5000

            [logging]
            level = "debug"
            json = true
            "#,
        )
        .unwrap();

        assert_eq!(config.spine.url, "https://spine.example");
        assert_eq!(config.spine.scr_result_repeat_timeout_ms, 5000);
        assert_eq!(config.spine.initial_wait_ms, 1000);
        assert_eq!(config.spine.scr_endpoint, "/clinical");
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
        assert_eq!(config.logging.file_rotation, "daily");
        config.validate().unwrap();
    }

    #[test]
    fn test_missing_url_fails_validation() {
        let config = from_toml("[logging]\nlevel = \"warn\"\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_logging_validation() {
        let mut logging = LoggingConfig::default();
        logging.validate().unwrap();

        logging.level = "loud".to_string();
        assert!(logging.validate().is_err());

        logging.level = "trace".to_string();
        logging.file_rotation = "weekly".to_string();
        assert!(logging.validate().is_err());

        logging.file_rotation = "never".to_string();
        logging.file_enabled = true;
        logging.file_directory = " ".to_string();
        assert!(logging.validate().is_err());
    }
}
