//! User-visible notices.
//!
//! Each failure path maps to a distinct [`NoticeKind`] so the view can show a
//! specific, dismissible message instead of a generic error.

use std::fmt;

use crate::error::{DashboardError, ValidationError};

/// Category of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoticeKind {
    /// An operation succeeded.
    Success,
    /// No identity; the user must sign in.
    NotAuthenticated,
    /// The identity provider rejected the credentials.
    SignInFailed,
    /// A file failed type or size validation.
    InvalidFile,
    /// Required input is missing (empty selection, blank credentials).
    MissingInput,
    /// An upload transfer failed.
    UploadFailed,
    /// A batch delete removed nothing.
    NothingDeleted,
    /// Test results could not be loaded.
    ResultsUnavailable,
    /// Any other backend failure.
    RequestFailed,
}

impl NoticeKind {
    /// Whether the notice reports a failure.
    #[must_use]
    pub const fn is_error(self) -> bool {
        !matches!(self, Self::Success)
    }
}

/// A dismissible message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Category.
    pub kind: NoticeKind,
    /// Short headline.
    pub title: String,
    /// Optional detail line.
    pub detail: Option<String>,
}

impl Notice {
    fn new(kind: NoticeKind, title: impl Into<String>, detail: Option<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            detail,
        }
    }

    /// Success notice.
    #[must_use]
    pub fn success(title: impl Into<String>) -> Self {
        Self::new(NoticeKind::Success, title, None)
    }

    /// Map an error onto its notice.
    #[must_use]
    pub fn from_error(err: &DashboardError) -> Self {
        let detail = err.detail();
        match err {
            DashboardError::Unauthenticated => Self::new(
                NoticeKind::NotAuthenticated,
                "You are not signed in",
                Some("Sign in to continue".to_string()),
            ),
            DashboardError::Validation(ValidationError::FileRejected { .. }) => {
                Self::new(NoticeKind::InvalidFile, "Invalid file", detail)
            }
            DashboardError::Validation(ValidationError::EmptySelection) => Self::new(
                NoticeKind::MissingInput,
                "Select at least one video",
                None,
            ),
            DashboardError::Validation(ValidationError::MissingCredentials) => Self::new(
                NoticeKind::MissingInput,
                "Enter your email and password",
                None,
            ),
            DashboardError::SignInFailed { .. } => {
                Self::new(NoticeKind::SignInFailed, "Sign-in failed", detail)
            }
            DashboardError::Network {
                operation: "uploads.create",
                ..
            } => Self::new(NoticeKind::UploadFailed, "Upload failed", detail),
            DashboardError::Network { .. } => {
                Self::new(NoticeKind::RequestFailed, "Request failed", detail)
            }
            DashboardError::NotFound { .. } | DashboardError::Parse { .. } => {
                Self::results_unavailable(err)
            }
            DashboardError::NothingDeleted { .. } => {
                Self::new(NoticeKind::NothingDeleted, "No videos were deleted", detail)
            }
        }
    }

    /// Notice for a results screen that could not be filled, whatever the cause.
    #[must_use]
    pub fn results_unavailable(err: &DashboardError) -> Self {
        let detail = match err {
            DashboardError::Unauthenticated => Some("You are not signed in".to_string()),
            other => other.detail(),
        };
        Self::new(NoticeKind::ResultsUnavailable, "Results unavailable", detail)
    }

    /// Full text: the title, followed by the detail when present.
    #[must_use]
    pub fn message(&self) -> String {
        match &self.detail {
            Some(detail) => format!("{}: {detail}", self.title),
            None => self.title.clone(),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}
