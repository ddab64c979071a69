//! Environment loading for [`DashboardConfig`].

use std::time::Duration;

use gma_telemetry::{DEFAULT_LOG_LEVEL, LogFormat};

use crate::defaults::{
    DEFAULT_API_URL, DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_IDENTITY_URL, DEFAULT_MAX_UPLOAD_BYTES,
    DEFAULT_MAX_UPLOAD_TASKS, DEFAULT_SECURE_TOKEN_URL,
};
use crate::error::{ConfigError, ConfigResult};
use crate::model::{DashboardConfig, IdentityConfig, UploadLimits};
use crate::validate::{parse_base_url, parse_positive_u64, parse_positive_usize};

impl DashboardConfig {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidField`] for malformed values.
    pub fn from_env() -> ConfigResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// Blank values are treated as unset.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidField`] for malformed values.
    pub fn from_lookup<F>(lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let api_url = parse_base_url(
            "GMA_API_URL",
            get("GMA_API_URL").as_deref().unwrap_or(DEFAULT_API_URL),
        )?;
        let timeout_secs = get("GMA_HTTP_TIMEOUT_SECS")
            .map(|value| parse_positive_u64("GMA_HTTP_TIMEOUT_SECS", &value))
            .transpose()?
            .unwrap_or(DEFAULT_HTTP_TIMEOUT_SECS);

        let identity = IdentityConfig {
            api_key: get("GMA_IDENTITY_API_KEY").map(|value| value.trim().to_string()),
            identity_url: parse_base_url(
                "GMA_IDENTITY_URL",
                get("GMA_IDENTITY_URL")
                    .as_deref()
                    .unwrap_or(DEFAULT_IDENTITY_URL),
            )?,
            secure_token_url: parse_base_url(
                "GMA_SECURE_TOKEN_URL",
                get("GMA_SECURE_TOKEN_URL")
                    .as_deref()
                    .unwrap_or(DEFAULT_SECURE_TOKEN_URL),
            )?,
        };

        let upload = UploadLimits {
            max_file_bytes: get("GMA_MAX_UPLOAD_BYTES")
                .map(|value| parse_positive_u64("GMA_MAX_UPLOAD_BYTES", &value))
                .transpose()?
                .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
            max_tasks: get("GMA_MAX_UPLOAD_TASKS")
                .map(|value| parse_positive_usize("GMA_MAX_UPLOAD_TASKS", &value))
                .transpose()?
                .unwrap_or(DEFAULT_MAX_UPLOAD_TASKS),
        };

        let log_format_label = get("GMA_LOG_FORMAT");
        let log_format =
            LogFormat::from_label(log_format_label.as_deref()).map_err(|_| {
                ConfigError::InvalidField {
                    field: "GMA_LOG_FORMAT",
                    value: log_format_label.clone(),
                    reason: "must be json or pretty",
                }
            })?;

        Ok(Self {
            api_url,
            http_timeout: Duration::from_secs(timeout_secs),
            identity,
            upload,
            log_level: get("GMA_LOG_LEVEL").unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            log_format,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_apply_when_environment_is_empty() {
        let config = DashboardConfig::from_lookup(|_| None).expect("defaults");
        assert_eq!(config.api_url.as_str(), "http://localhost:8000/");
        assert_eq!(config.http_timeout, Duration::from_secs(30));
        assert_eq!(config.upload.max_file_bytes, 1_610_612_736);
        assert_eq!(config.upload.max_tasks, 10);
        assert!(config.identity.api_key.is_none());
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_format, LogFormat::infer());
    }

    #[test]
    fn explicit_values_override_defaults() {
        let config = DashboardConfig::from_lookup(lookup(&[
            ("GMA_API_URL", "https://gma.example.test"),
            ("GMA_HTTP_TIMEOUT_SECS", "5"),
            ("GMA_IDENTITY_API_KEY", " key-123 "),
            ("GMA_MAX_UPLOAD_BYTES", "1048576"),
            ("GMA_MAX_UPLOAD_TASKS", "3"),
            ("GMA_LOG_LEVEL", "debug"),
            ("GMA_LOG_FORMAT", "json"),
        ]))
        .expect("config");
        assert_eq!(config.api_url.host_str(), Some("gma.example.test"));
        assert_eq!(config.http_timeout, Duration::from_secs(5));
        assert_eq!(config.identity.require_api_key().ok(), Some("key-123"));
        assert_eq!(config.upload.max_file_bytes, 1_048_576);
        assert_eq!(config.upload.max_tasks, 3);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn zero_limits_are_rejected() {
        for field in [
            "GMA_HTTP_TIMEOUT_SECS",
            "GMA_MAX_UPLOAD_BYTES",
            "GMA_MAX_UPLOAD_TASKS",
        ] {
            let err = DashboardConfig::from_lookup(lookup(&[(field, "0")]))
                .expect_err("zero must be rejected");
            match err {
                ConfigError::InvalidField { field: got, .. } => assert_eq!(got, field),
                other @ ConfigError::MissingField { .. } => panic!("unexpected error: {other}"),
            }
        }
    }

    #[test]
    fn malformed_values_name_the_field() {
        let err = DashboardConfig::from_lookup(lookup(&[("GMA_LOG_FORMAT", "xml")]))
            .expect_err("bad format");
        assert!(matches!(
            err,
            ConfigError::InvalidField {
                field: "GMA_LOG_FORMAT",
                ..
            }
        ));

        let err = DashboardConfig::from_lookup(lookup(&[("GMA_API_URL", "localhost")]))
            .expect_err("bad url");
        assert!(matches!(
            err,
            ConfigError::InvalidField {
                field: "GMA_API_URL",
                ..
            }
        ));
    }

    #[test]
    fn blank_values_count_as_unset() {
        let config = DashboardConfig::from_lookup(lookup(&[
            ("GMA_API_URL", "   "),
            ("GMA_IDENTITY_API_KEY", ""),
        ]))
        .expect("config");
        assert_eq!(config.api_url.as_str(), "http://localhost:8000/");
        assert!(config.identity.api_key.is_none());
    }
}
