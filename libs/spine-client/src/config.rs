//! Connection settings for the Spine remote

use std::time::Duration;

use serde::Deserialize;
use url::Url;

use crate::error::ConfigError;

/// Where the remote lives and how long flows may wait for it
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SpineConfig {
    /// Base URL every endpoint path is appended to
    pub url: String,
    pub scr_endpoint: String,
    pub acs_endpoint: String,
    pub psis_queries_endpoint: String,
    pub alert_endpoint: String,
    /// Total polling budget, counted from the first poll request
    pub scr_result_repeat_timeout_ms: u64,
    /// Wait before the first poll request
    pub initial_wait_ms: u64,
    /// Per-request transport timeout
    pub request_timeout_ms: u64,
}

impl Default for SpineConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            scr_endpoint: "/clinical".to_string(),
            acs_endpoint: "/acs".to_string(),
            psis_queries_endpoint: "/sync-service".to_string(),
            alert_endpoint: "/alert".to_string(),
            scr_result_repeat_timeout_ms: 15_000,
            initial_wait_ms: 1_000,
            request_timeout_ms: 30_000,
        }
    }
}

impl SpineConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.trim().is_empty() {
            return Err(ConfigError::Invalid("spine url must be set".to_string()));
        }
        let base = Url::parse(&self.url).map_err(|reason| ConfigError::Url {
            url: self.url.clone(),
            reason,
        })?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid(format!(
                "spine url must be http or https, got {}",
                base.scheme()
            )));
        }
        if self.scr_result_repeat_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "scr_result_repeat_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn repeat_timeout(&self) -> Duration {
        Duration::from_millis(self.scr_result_repeat_timeout_ms)
    }

    pub fn initial_wait(&self) -> Duration {
        Duration::from_millis(self.initial_wait_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Base URL followed by `path`
    pub fn endpoint_url(&self, path: &str) -> String {
        let base = self.url.trim_end_matches('/');
        if path.is_empty() {
            base.to_string()
        } else if path.starts_with('/') {
            format!("{base}{path}")
        } else {
            format!("{base}/{path}")
        }
    }

    /// Absolute URL of a poll location.
    ///
    /// The remote may hand back either a full URL or a path below the base URL.
    pub fn resolve_location(&self, location: &str) -> String {
        match Url::parse(location) {
            Ok(_) => location.to_string(),
            Err(_) => self.endpoint_url(location),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config: SpineConfig =
            serde_json::from_str(r#"{"url": "https://spine.example", "initial_wait_ms": 50}"#)
                .unwrap();

        assert_eq!(config.initial_wait(), Duration::from_millis(50));
        assert_eq!(config.repeat_timeout(), Duration::from_secs(15));
        assert_eq!(config.scr_endpoint, "/clinical");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(SpineConfig::default().validate().is_err());
        assert!(matches!(
            SpineConfig::new("spine without scheme").validate(),
            Err(ConfigError::Url { .. })
        ));
        assert!(SpineConfig::new("ftp://spine").validate().is_err());

        let mut config = SpineConfig::new("https://spine");
        config.scr_result_repeat_timeout_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_endpoint_url_joins_paths() {
        let config = SpineConfig::new("https://spine/");
        assert_eq!(config.endpoint_url("/clinical"), "https://spine/clinical");
        assert_eq!(config.endpoint_url("acs"), "https://spine/acs");
        assert_eq!(config.endpoint_url(""), "https://spine");
    }

    #[test]
    fn test_resolve_location() {
        let config = SpineConfig::new("https://spine");
        assert_eq!(
            config.resolve_location("/_poll/9807d292-8797-4c79"),
            "https://spine/_poll/9807d292-8797-4c79"
        );
        assert_eq!(
            config.resolve_location("https://other/_poll/1"),
            "https://other/_poll/1"
        );
    }
}
