//! Default values and fixed policy constants.
//!
//! # Design
//! - One authoritative upload size limit, used both for enforcement and display.
//! - Allowed upload types are fixed; only the numeric limits are configurable.

/// Backend base URL used when `GMA_API_URL` is unset.
pub const DEFAULT_API_URL: &str = "http://localhost:8000";
/// Identity toolkit base URL.
pub const DEFAULT_IDENTITY_URL: &str = "https://identitytoolkit.googleapis.com";
/// Secure token (refresh) base URL.
pub const DEFAULT_SECURE_TOKEN_URL: &str = "https://securetoken.googleapis.com";
/// Per-request timeout in seconds.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
/// Per-file upload limit: 1.5 GiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 1_610_612_736;
/// Maximum number of upload tasks tracked at once.
pub const DEFAULT_MAX_UPLOAD_TASKS: usize = 10;

/// File extensions accepted for upload (lowercase, without the dot).
pub const ALLOWED_EXTENSIONS: [&str; 2] = ["mp4", "mov"];
/// MIME types accepted for upload.
pub const ALLOWED_MIME_TYPES: [&str; 2] = ["video/mp4", "video/quicktime"];
