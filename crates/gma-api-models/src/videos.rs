//! Uploaded video records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::risk::RiskBucket;
use crate::timestamp;

/// Backend processing status for an uploaded video.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum VideoStatus {
    /// Stored and waiting for a test.
    #[default]
    Uploaded,
    /// Being processed by a classifier.
    Processing,
    /// Processing finished.
    Completed,
    /// Processing failed.
    Error,
    /// Status label this client does not know about.
    Other(String),
}

impl VideoStatus {
    /// Wire label for the status.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Uploaded => "uploaded",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Error => "error",
            Self::Other(label) => label,
        }
    }
}

impl From<String> for VideoStatus {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "uploaded" => Self::Uploaded,
            "processing" => Self::Processing,
            "completed" => Self::Completed,
            "error" => Self::Error,
            _ => Self::Other(value),
        }
    }
}

impl From<VideoStatus> for String {
    fn from(value: VideoStatus) -> Self {
        value.as_str().to_string()
    }
}

/// Metadata for a video stored by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "VideoRecordWire")]
pub struct VideoRecord {
    /// Backend identifier.
    pub id: i64,
    /// Stored (server-side) filename.
    pub filename: String,
    /// Filename as uploaded by the user.
    pub original_filename: String,
    /// Size in bytes.
    pub file_size: u64,
    /// Processing status.
    pub status: VideoStatus,
    /// Upload timestamp when the backend supplied one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Playback URL, from either `file_url` or `url`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    /// Latest classification bucket, when the backend attaches one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classification: Option<RiskBucket>,
    /// Confidence percentage paired with `classification`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl VideoRecord {
    /// Name shown to users: the original filename, or the stored one when missing.
    #[must_use]
    pub fn display_name(&self) -> &str {
        if self.original_filename.is_empty() {
            &self.filename
        } else {
            &self.original_filename
        }
    }
}

#[derive(Deserialize)]
struct VideoRecordWire {
    id: i64,
    #[serde(default)]
    filename: String,
    #[serde(default)]
    original_filename: Option<String>,
    #[serde(default)]
    file_size: f64,
    #[serde(default)]
    status: VideoStatus,
    #[serde(
        default,
        alias = "upload_time",
        deserialize_with = "timestamp::deserialize_option"
    )]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    file_url: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    classification: Option<RiskBucket>,
    #[serde(default)]
    confidence: Option<f64>,
}

impl From<VideoRecordWire> for VideoRecord {
    fn from(wire: VideoRecordWire) -> Self {
        let original_filename = wire
            .original_filename
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| wire.filename.clone());
        Self {
            id: wire.id,
            filename: wire.filename,
            original_filename,
            file_size: size_from_float(wire.file_size),
            status: wire.status,
            created_at: wire.created_at,
            file_url: wire.file_url.or(wire.url),
            classification: wire.classification,
            confidence: wire.confidence,
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn size_from_float(value: f64) -> u64 {
    if value.is_finite() && value > 0.0 {
        value.round() as u64
    } else {
        0
    }
}

/// Metadata update body for `PUT /api/uploads/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoRename {
    /// New stored filename.
    pub filename: String,
}

/// Acknowledgement returned by `DELETE /api/uploads/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteAck {
    /// Backend confirmation message.
    #[serde(default)]
    pub message: String,
}
