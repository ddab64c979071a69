//! Typed configuration consumed by the client, dashboard and CLI.

use std::time::Duration;

use gma_telemetry::LogFormat;
use url::Url;

use crate::defaults::{
    ALLOWED_EXTENSIONS, ALLOWED_MIME_TYPES, DEFAULT_MAX_UPLOAD_BYTES, DEFAULT_MAX_UPLOAD_TASKS,
};
use crate::error::{ConfigError, ConfigResult};

/// Complete console configuration.
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    /// Backend base URL.
    pub api_url: Url,
    /// Timeout applied to every backend and identity request.
    pub http_timeout: Duration,
    /// Identity provider settings.
    pub identity: IdentityConfig,
    /// Upload validation and pool limits.
    pub upload: UploadLimits,
    /// Log level passed to the tracing filter.
    pub log_level: String,
    /// Log output format.
    pub log_format: LogFormat,
}

/// Identity provider endpoints and credentials.
#[derive(Debug, Clone)]
pub struct IdentityConfig {
    /// Web API key; only password and provider sign-in need it.
    pub api_key: Option<String>,
    /// Identity toolkit base URL.
    pub identity_url: Url,
    /// Secure token base URL.
    pub secure_token_url: Url,
}

impl IdentityConfig {
    /// Return the API key or a [`ConfigError::MissingField`].
    ///
    /// # Errors
    ///
    /// Fails when `GMA_IDENTITY_API_KEY` was not provided.
    pub fn require_api_key(&self) -> ConfigResult<&str> {
        self.api_key
            .as_deref()
            .ok_or(ConfigError::MissingField {
                field: "GMA_IDENTITY_API_KEY",
            })
    }
}

/// Client-side upload policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadLimits {
    /// Largest accepted file, in bytes.
    pub max_file_bytes: u64,
    /// Maximum number of tracked upload tasks.
    pub max_tasks: usize,
}

impl Default for UploadLimits {
    fn default() -> Self {
        Self {
            max_file_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            max_tasks: DEFAULT_MAX_UPLOAD_TASKS,
        }
    }
}

impl UploadLimits {
    /// Whether the extension (case-insensitive, without the dot) is accepted.
    #[must_use]
    pub fn extension_allowed(extension: &str) -> bool {
        ALLOWED_EXTENSIONS
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(extension))
    }

    /// Whether the MIME type is accepted.
    #[must_use]
    pub fn mime_allowed(mime: &str) -> bool {
        ALLOWED_MIME_TYPES
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(mime))
    }
}
