//! Backend doctor profile.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::timestamp;

/// Backend-side metadata for the signed-in doctor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoctorProfile {
    /// Backend identifier.
    pub id: i64,
    /// Identity provider user id.
    #[serde(default)]
    pub firebase_uid: String,
    /// Contact email.
    pub email: String,
    /// Display name, when set.
    #[serde(default)]
    pub name: Option<String>,
    /// Role label (for example `doctor`).
    #[serde(default)]
    pub role: String,
    /// Profile creation time.
    #[serde(default, deserialize_with = "timestamp::deserialize_option")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Body for `POST /api/auth/profile`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpsert {
    /// Contact email.
    pub email: String,
    /// Display name; omitted leaves the backend value unchanged.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}
