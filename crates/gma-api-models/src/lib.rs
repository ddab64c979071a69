#![forbid(unsafe_code)]
#![deny(unused_must_use, rustdoc::broken_intra_doc_links, rustdoc::bare_urls)]
#![warn(missing_docs, unreachable_pub, clippy::all, clippy::pedantic)]
//! Shared HTTP DTOs for the GMA classification backend.
//!
//! These types are re-used by the client, the dashboard state machines and the
//! CLI so the wire contract has a single home. Loose backend shapes (float
//! sizes, naive timestamps, `file_url` vs `url`) are normalised here, once, at
//! deserialisation time.
//!
//! Layout: `risk.rs` (risk buckets and score thresholds), `videos.rs` (upload
//! records), `blind_test.rs` (test submissions, records and result payloads),
//! `profile.rs` (doctor profile), `problem.rs` (error bodies), `timestamp.rs`
//! (lenient timestamp parsing).

pub mod problem;
pub mod profile;
pub mod risk;
pub mod timestamp;
pub mod videos;

pub use blind_test::{
    ClassificationOutcome, ResultsPayloadError, TestRecord, TestStatus, TestSubmission, TestType,
    encode_results, parse_results,
};
pub use problem::ProblemDetails;
pub use profile::{DoctorProfile, ProfileUpsert};
pub use risk::{HIGH_RISK_THRESHOLD, RiskBucket, RiskSummary, UNCERTAIN_THRESHOLD};
pub use videos::{DeleteAck, VideoRecord, VideoRename, VideoStatus};
