//! Error taxonomy for backend and identity calls.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

/// Errors raised by [`crate::ApiClient`] and [`crate::FirebaseIdentity`].
#[derive(Debug, Error)]
pub enum ClientError {
    /// A call needing a signed-in identity was attempted without one.
    #[error("not authenticated")]
    Unauthenticated,
    /// The request never produced a response (connect failure, timeout, reset).
    #[error("request failed")]
    Transport {
        /// Operation identifier.
        operation: &'static str,
        /// Underlying HTTP client error.
        #[source]
        source: reqwest::Error,
    },
    /// A streaming transfer made no progress for longer than the timeout.
    #[error("transfer stalled")]
    Stalled {
        /// Operation identifier.
        operation: &'static str,
        /// How long the transfer had been idle.
        idle: Duration,
    },
    /// The server answered with a non-success status.
    #[error("request rejected by server")]
    Status {
        /// Operation identifier.
        operation: &'static str,
        /// Response status.
        status: StatusCode,
        /// Message extracted from the error body, when present.
        detail: Option<String>,
    },
    /// The response body could not be decoded.
    #[error("failed to decode response")]
    Decode {
        /// Operation identifier.
        operation: &'static str,
        /// Underlying decode error.
        #[source]
        source: reqwest::Error,
    },
    /// The response decoded but did not carry what the operation needs.
    #[error("unexpected response")]
    UnexpectedResponse {
        /// Operation identifier.
        operation: &'static str,
        /// Machine-readable reason.
        reason: &'static str,
    },
    /// Local file access failed.
    #[error("filesystem operation failed")]
    Io {
        /// Operation identifier.
        operation: &'static str,
        /// Path involved in the failure.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// A request URL could not be built from the configured base.
    #[error("invalid request url")]
    Url {
        /// Operation identifier.
        operation: &'static str,
        /// Underlying URL parse error.
        #[source]
        source: url::ParseError,
    },
    /// Configuration needed by the client is missing or invalid.
    #[error("client configuration invalid")]
    Config {
        /// Underlying configuration error.
        #[source]
        source: gma_config::ConfigError,
    },
    /// The identity provider rejected the request.
    #[error("identity provider rejected request")]
    Identity {
        /// Provider error code (for example `EMAIL_NOT_FOUND`).
        code: String,
        /// Friendly message for the code.
        message: &'static str,
    },
}

impl ClientError {
    /// Whether the failure was a request timeout.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Transport { source, .. } => source.is_timeout(),
            Self::Stalled { .. } => true,
            _ => false,
        }
    }

    /// Response status, for [`ClientError::Status`].
    #[must_use]
    pub const fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Operation identifier, when the variant carries one.
    #[must_use]
    pub const fn operation(&self) -> Option<&'static str> {
        match self {
            Self::Transport { operation, .. }
            | Self::Stalled { operation, .. }
            | Self::Status { operation, .. }
            | Self::Decode { operation, .. }
            | Self::UnexpectedResponse { operation, .. }
            | Self::Io { operation, .. }
            | Self::Url { operation, .. } => Some(*operation),
            Self::Unauthenticated | Self::Config { .. } | Self::Identity { .. } => None,
        }
    }

    /// One-line description suitable for a user-facing notice.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Unauthenticated => "You are not signed in".to_string(),
            Self::Transport { source, .. } if source.is_timeout() => {
                "The server took too long to respond".to_string()
            }
            Self::Transport { .. } => "Could not reach the server".to_string(),
            Self::Stalled { .. } => "The transfer stopped making progress".to_string(),
            Self::Status {
                status, detail, ..
            } => detail
                .clone()
                .unwrap_or_else(|| format!("Request failed with status {status}")),
            Self::Decode { .. } | Self::UnexpectedResponse { .. } => {
                "The server sent an unexpected response".to_string()
            }
            Self::Io { path, source, .. } => format!("{}: {source}", path.display()),
            Self::Url { .. } | Self::Config { .. } => "Client configuration is invalid".to_string(),
            Self::Identity { message, .. } => (*message).to_string(),
        }
    }
}

/// Convenience alias for client results.
pub type ClientResult<T> = Result<T, ClientError>;
