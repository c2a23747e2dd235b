// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::constants::{
    DEFAULT_IDLE_SLEEP, DEFAULT_LOG_LEVEL, DEFAULT_MAX_DEFERRALS_SIZE,
    DEFAULT_QUEUE_THRESHOLD_SIZE, DEFAULT_REQUEST_TIMEOUT,
};
use crate::error::DasError;
use serde::Deserialize;
use std::env;
use std::path::Path;
use std::time::Duration;

/// Configuration for the analytics shipper
#[derive(Debug, Clone, PartialEq)]
pub struct DasConfig {
    /// Collection endpoint batches are posted to
    pub url: String,
    /// Number of events that triggers a batch upload
    pub queue_threshold_size: usize,
    /// Number of failed batches kept for retry
    pub max_deferrals_size: usize,
    /// Timeout for each upload request
    pub request_timeout: Duration,
    /// Pause after the log source reports no data
    pub idle_sleep: Duration,
    /// Log level (e.g., trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for DasConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            queue_threshold_size: DEFAULT_QUEUE_THRESHOLD_SIZE,
            max_deferrals_size: DEFAULT_MAX_DEFERRALS_SIZE,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            idle_sleep: DEFAULT_IDLE_SLEEP,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(rename = "dasConfig")]
    das_config: ConfigFileSection,
}

#[derive(Debug, Deserialize)]
struct ConfigFileSection {
    url: String,
    queue_threshold_size: Option<usize>,
    max_deferrals_size: Option<usize>,
    request_timeout_secs: Option<u64>,
    log_level: Option<String>,
}

impl DasConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self, DasError> {
        let defaults = Self::default();
        let url = env::var("DAS_URL").unwrap_or_default();
        let queue_threshold_size = parse_env("DAS_QUEUE_THRESHOLD_SIZE")?
            .unwrap_or(defaults.queue_threshold_size);
        let max_deferrals_size =
            parse_env("DAS_MAX_DEFERRALS_SIZE")?.unwrap_or(defaults.max_deferrals_size);
        let request_timeout = parse_env("DAS_REQUEST_TIMEOUT_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.request_timeout);
        let idle_sleep = parse_env("DAS_IDLE_SLEEP_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.idle_sleep);
        let log_level = env::var("DAS_LOG_LEVEL")
            .map(|val| val.to_lowercase())
            .unwrap_or(defaults.log_level);

        let config = Self {
            url,
            queue_threshold_size,
            max_deferrals_size,
            request_timeout,
            idle_sleep,
            log_level,
        };

        config.validate()?;
        Ok(config)
    }

    /// Create configuration from a JSON file with a top-level `dasConfig` object
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, DasError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            DasError::InvalidConfig(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json(&contents)
    }

    pub fn from_json(contents: &str) -> Result<Self, DasError> {
        let file: ConfigFile = serde_json::from_str(contents)
            .map_err(|e| DasError::InvalidConfig(format!("malformed config: {e}")))?;
        let section = file.das_config;
        let defaults = Self::default();

        let config = Self {
            url: section.url,
            queue_threshold_size: section
                .queue_threshold_size
                .unwrap_or(defaults.queue_threshold_size),
            max_deferrals_size: section
                .max_deferrals_size
                .unwrap_or(defaults.max_deferrals_size),
            request_timeout: section
                .request_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            idle_sleep: defaults.idle_sleep,
            log_level: section
                .log_level
                .map(|level| level.to_lowercase())
                .unwrap_or(defaults.log_level),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), DasError> {
        let url = self.url.trim();
        if url.is_empty() {
            return Err(DasError::InvalidConfig(
                "upload url cannot be empty".to_string(),
            ));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(DasError::InvalidConfig(format!(
                "upload url '{url}' must use http or https"
            )));
        }

        if self.queue_threshold_size == 0 {
            return Err(DasError::InvalidConfig(
                "queue_threshold_size must be greater than 0".to_string(),
            ));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.log_level.as_str()) {
            return Err(DasError::InvalidConfig(format!(
                "Invalid log level '{}'. Must be one of: trace, debug, info, warn, error",
                self.log_level
            )));
        }

        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Result<Option<T>, DasError> {
    match env::var(name) {
        Ok(val) => val
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| DasError::InvalidConfig(format!("{name} has invalid value '{val}'"))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Write;

    fn valid() -> DasConfig {
        DasConfig {
            url: "https://das.example.com/v1/events".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_default_config_requires_url() {
        assert!(DasConfig::default().validate().is_err());
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_blank_or_foreign_url() {
        let config = DasConfig {
            url: "   ".to_string(),
            ..valid()
        };
        assert!(config.validate().is_err());

        let config = DasConfig {
            url: "ftp://das.example.com".to_string(),
            ..valid()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_threshold() {
        let config = DasConfig {
            queue_threshold_size: 0,
            ..valid()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("queue_threshold_size"));
    }

    #[test]
    fn test_zero_deferrals_is_allowed() {
        let config = DasConfig {
            max_deferrals_size: 0,
            ..valid()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let config = DasConfig {
            log_level: "loud".to_string(),
            ..valid()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_json() {
        let config = DasConfig::from_json(
            r#"{"dasConfig": {"url": "https://das.example.com", "queue_threshold_size": 5, "max_deferrals_size": 2}}"#,
        )
        .unwrap();
        assert_eq!(config.url, "https://das.example.com");
        assert_eq!(config.queue_threshold_size, 5);
        assert_eq!(config.max_deferrals_size, 2);
        assert_eq!(config.request_timeout, DEFAULT_REQUEST_TIMEOUT);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_from_json_missing_url() {
        let err = DasConfig::from_json(r#"{"dasConfig": {"queue_threshold_size": 5}}"#)
            .unwrap_err();
        assert!(matches!(err, DasError::InvalidConfig(_)));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"dasConfig": {{"url": "http://127.0.0.1:9000", "log_level": "DEBUG"}}}}"#
        )
        .unwrap();
        let config = DasConfig::from_file(file.path()).unwrap();
        assert_eq!(config.url, "http://127.0.0.1:9000");
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.queue_threshold_size, DEFAULT_QUEUE_THRESHOLD_SIZE);
    }

    #[test]
    fn test_from_file_missing() {
        assert!(DasConfig::from_file("/no/such/das.json").is_err());
    }
}
