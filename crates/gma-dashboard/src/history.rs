//! Test history and dashboard-wide aggregates.

use chrono::{DateTime, Utc};
use gma_api_models::{RiskSummary, TestRecord, VideoRecord, VideoStatus};
use tracing::warn;

use crate::backend::Backend;
use crate::blind_test::{parse_results, summarize};
use crate::error::DashboardError;
use crate::notice::Notice;
use crate::session::SessionGate;

/// A test with its bucket counts.
#[derive(Debug, Clone, PartialEq)]
pub struct TestSummary {
    /// The test.
    pub test: TestRecord,
    /// Bucket counts over its outcomes.
    pub summary: RiskSummary,
}

impl TestSummary {
    /// Summarise one test; malformed payloads count as empty.
    #[must_use]
    pub fn of(test: TestRecord) -> Self {
        let summary = summarize(&parse_results(&test));
        Self { test, summary }
    }
}

/// History listing; a failed fetch yields an empty list and a notice.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryView {
    /// Tests in backend order (most recent first).
    pub tests: Vec<TestSummary>,
    /// Set when the fetch failed.
    pub notice: Option<Notice>,
}

/// Fetch and summarise the caller's test history.
pub async fn load_history(session: &SessionGate, backend: &dyn Backend) -> HistoryView {
    let fetched = match session.token().await {
        Ok(token) => backend
            .test_history(&token)
            .await
            .map_err(|source| DashboardError::network("tests.history", source)),
        Err(err) => Err(err),
    };
    match fetched {
        Ok(tests) => HistoryView {
            tests: tests.into_iter().map(TestSummary::of).collect(),
            notice: None,
        },
        Err(err) => {
            warn!(error = %err, "test history unavailable");
            HistoryView {
                tests: Vec::new(),
                notice: Some(Notice::from_error(&err)),
            }
        }
    }
}

/// Totals shown on the landing screen.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DashboardTotals {
    /// Number of tests submitted.
    pub tests_run: usize,
    /// Outcome counts across every test.
    pub outcomes: RiskSummary,
    /// Submission time of the most recent test.
    pub latest: Option<DateTime<Utc>>,
}

/// Aggregate a history listing.
#[must_use]
pub fn dashboard_totals(tests: &[TestSummary]) -> DashboardTotals {
    let mut totals = DashboardTotals {
        tests_run: tests.len(),
        ..DashboardTotals::default()
    };
    for entry in tests {
        totals.outcomes.merge(&entry.summary);
        totals.latest = totals.latest.max(Some(entry.test.submitted_at));
    }
    totals
}

/// Video counts by processing status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    /// Stored, awaiting a test.
    pub uploaded: usize,
    /// Being processed.
    pub processing: usize,
    /// Processing finished.
    pub completed: usize,
    /// Processing failed.
    pub error: usize,
    /// Unrecognised status labels.
    pub other: usize,
}

impl StatusCounts {
    /// Total videos counted.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.uploaded + self.processing + self.completed + self.error + self.other
    }
}

/// Count videos by status.
#[must_use]
pub fn status_counts(videos: &[VideoRecord]) -> StatusCounts {
    videos
        .iter()
        .fold(StatusCounts::default(), |mut counts, video| {
            match video.status {
                VideoStatus::Uploaded => counts.uploaded += 1,
                VideoStatus::Processing => counts.processing += 1,
                VideoStatus::Completed => counts.completed += 1,
                VideoStatus::Error => counts.error += 1,
                VideoStatus::Other(_) => counts.other += 1,
            }
            counts
        })
}
