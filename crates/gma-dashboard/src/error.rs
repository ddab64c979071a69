//! Error taxonomy for dashboard operations.
//!
//! # Design
//! - Validation and authentication failures are raised before any network call.
//! - Network failures keep the underlying [`ClientError`] and the operation that
//!   produced it.
//! - A partially successful batch delete is not an error; only a batch with
//!   zero successes surfaces as [`DashboardError::NothingDeleted`].

use gma_client::ClientError;
use thiserror::Error;

/// Client-side validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A test was submitted with no videos selected.
    #[error("no videos selected")]
    EmptySelection,
    /// A file failed type or size validation.
    #[error("file rejected")]
    FileRejected {
        /// Offending file name.
        file: String,
        /// Why the file was rejected.
        reason: String,
    },
    /// Sign-in was attempted without an email or password.
    #[error("email and password are required")]
    MissingCredentials,
}

/// Errors produced by dashboard operations.
#[derive(Debug, Error)]
pub enum DashboardError {
    /// No identity is present.
    #[error("not authenticated")]
    Unauthenticated,
    /// Client-side validation rejected the action.
    #[error("validation failed")]
    Validation(#[from] ValidationError),
    /// The identity provider rejected a sign-in or sign-up.
    #[error("sign-in failed")]
    SignInFailed {
        /// Underlying provider error.
        #[source]
        source: ClientError,
    },
    /// A backend call failed (transport, status, decode or timeout).
    #[error("backend call failed")]
    Network {
        /// Operation identifier.
        operation: &'static str,
        /// Underlying client error.
        #[source]
        source: ClientError,
    },
    /// The requested test is not in the caller's history.
    #[error("test not found")]
    NotFound {
        /// Requested test id.
        test_id: i64,
    },
    /// A results payload could not be decoded.
    #[error("results payload could not be parsed")]
    Parse {
        /// Test whose payload was malformed.
        test_id: i64,
    },
    /// Every delete in a batch failed.
    #[error("no videos were deleted")]
    NothingDeleted {
        /// Number of deletes attempted.
        attempted: usize,
    },
}

impl DashboardError {
    /// Wrap a client error raised by a backend call.
    ///
    /// An unauthenticated client error stays [`DashboardError::Unauthenticated`].
    #[must_use]
    pub fn network(operation: &'static str, source: ClientError) -> Self {
        match source {
            ClientError::Unauthenticated => Self::Unauthenticated,
            source => Self::Network { operation, source },
        }
    }

    /// Whether the failure was raised before any network call.
    #[must_use]
    pub const fn is_local(&self) -> bool {
        matches!(self, Self::Unauthenticated | Self::Validation(_))
    }

    /// One-line detail for notices, beyond the headline.
    #[must_use]
    pub fn detail(&self) -> Option<String> {
        match self {
            Self::Validation(ValidationError::FileRejected { file, reason }) => {
                Some(format!("{file}: {reason}"))
            }
            Self::SignInFailed { source } | Self::Network { source, .. } => {
                Some(source.user_message())
            }
            Self::NotFound { test_id } => Some(format!("test {test_id} is not in your history")),
            Self::NothingDeleted { attempted } => {
                Some(format!("all {attempted} delete request(s) failed"))
            }
            Self::Unauthenticated
            | Self::Validation(_)
            | Self::Parse { .. } => None,
        }
    }
}

/// Convenience alias for dashboard results.
pub type DashboardResult<T> = Result<T, DashboardError>;
