//! Batch deletion coordinator.
//!
//! # Design
//! - One delete call per id, all in flight together. A failing call is
//!   recorded against its id and never aborts its siblings.
//! - The local list is reconciled once, after every call has settled, and
//!   only succeeded ids are removed.
//! - Zero successes is reported as [`DashboardError::NothingDeleted`]; a mix
//!   of successes and failures is a successful [`DeletionReport`].

use std::collections::BTreeSet;

use futures_util::future::join_all;
use gma_api_models::VideoRecord;
use tracing::{info, warn};

use crate::backend::Backend;
use crate::error::{DashboardError, DashboardResult, ValidationError};
use crate::notice::Notice;
use crate::session::SessionGate;

/// A delete that did not go through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedDeletion {
    /// Video id.
    pub id: i64,
    /// User-facing reason.
    pub message: String,
}

/// How a batch went overall.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletionOutcome {
    /// Every delete succeeded.
    All,
    /// Some deletes failed.
    Partial,
    /// No delete succeeded.
    Nothing,
}

/// Per-item results of a batch delete.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeletionReport {
    /// Ids the backend deleted, in request order.
    pub succeeded: Vec<i64>,
    /// Ids that failed, in request order.
    pub failed: Vec<FailedDeletion>,
}

impl DeletionReport {
    /// Overall outcome.
    #[must_use]
    pub fn outcome(&self) -> DeletionOutcome {
        match (self.succeeded.is_empty(), self.failed.is_empty()) {
            (true, _) => DeletionOutcome::Nothing,
            (false, true) => DeletionOutcome::All,
            (false, false) => DeletionOutcome::Partial,
        }
    }

    /// Remove the succeeded ids from `videos`; failed ones stay for retry.
    pub fn apply_to(&self, videos: &mut Vec<VideoRecord>) {
        let deleted: BTreeSet<i64> = self.succeeded.iter().copied().collect();
        videos.retain(|video| !deleted.contains(&video.id));
    }

    /// Success notice with the deleted count.
    #[must_use]
    pub fn notice(&self) -> Notice {
        let mut notice = Notice::success(format!(
            "{} video(s) deleted successfully",
            self.succeeded.len()
        ));
        if !self.failed.is_empty() {
            notice.detail = Some(format!("{} could not be deleted", self.failed.len()));
        }
        notice
    }
}

/// Delete every id in `ids` concurrently.
///
/// Duplicate ids are deleted once.
///
/// # Errors
///
/// Returns [`ValidationError::EmptySelection`] for an empty request,
/// [`DashboardError::Unauthenticated`] without an identity, and
/// [`DashboardError::NothingDeleted`] when every call failed.
pub async fn delete_many(
    session: &SessionGate,
    backend: &dyn Backend,
    ids: &[i64],
) -> DashboardResult<DeletionReport> {
    let mut seen = BTreeSet::new();
    let unique: Vec<i64> = ids.iter().copied().filter(|id| seen.insert(*id)).collect();
    if unique.is_empty() {
        return Err(ValidationError::EmptySelection.into());
    }
    if session.identity().is_none() {
        return Err(DashboardError::Unauthenticated);
    }

    let settled = join_all(unique.iter().map(|&id| async move {
        let result = match session.token().await {
            Ok(token) => backend
                .delete_video(&token, id)
                .await
                .map(|_| ())
                .map_err(|source| DashboardError::network("uploads.delete", source)),
            Err(err) => Err(err),
        };
        (id, result)
    }))
    .await;

    let mut report = DeletionReport::default();
    for (id, result) in settled {
        match result {
            Ok(()) => report.succeeded.push(id),
            Err(err) => {
                warn!(video_id = id, error = %err, "delete failed");
                report.failed.push(FailedDeletion {
                    id,
                    message: err.detail().unwrap_or_else(|| err.to_string()),
                });
            }
        }
    }
    info!(
        attempted = unique.len(),
        deleted = report.succeeded.len(),
        failed = report.failed.len(),
        "batch delete settled"
    );

    if report.outcome() == DeletionOutcome::Nothing {
        return Err(DashboardError::NothingDeleted {
            attempted: unique.len(),
        });
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::backend::fakes::{FakeBackend, FakeIdentity, PASSWORD, video};
    use crate::notice::NoticeKind;

    async fn signed_in(backend: Arc<FakeBackend>) -> SessionGate {
        let gate = SessionGate::new(Arc::new(FakeIdentity::default()), backend);
        gate.sign_in("dr@example.test", PASSWORD)
            .await
            .expect("sign in");
        gate
    }

    fn listing() -> Vec<VideoRecord> {
        vec![
            video(1, "a.mp4", 1),
            video(2, "b.mp4", 2),
            video(3, "c.mp4", 3),
        ]
    }

    #[tokio::test]
    async fn one_failing_delete_does_not_abort_the_others() {
        let backend = Arc::new(FakeBackend {
            failing_deletes: [2].into_iter().collect(),
            ..FakeBackend::default()
        });
        let gate = signed_in(backend.clone()).await;
        let report = delete_many(&gate, backend.as_ref(), &[1, 2, 3])
            .await
            .expect("partial success");

        assert_eq!(report.succeeded, vec![1, 3]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].id, 2);
        assert_eq!(report.outcome(), DeletionOutcome::Partial);

        let mut videos = listing();
        report.apply_to(&mut videos);
        let remaining: Vec<i64> = videos.iter().map(|video| video.id).collect();
        assert_eq!(remaining, vec![2]);
        assert_eq!(report.notice().title, "2 video(s) deleted successfully");
    }

    #[tokio::test]
    async fn every_delete_failing_is_nothing_deleted() {
        let backend = Arc::new(FakeBackend {
            failing_deletes: [1, 2].into_iter().collect(),
            ..FakeBackend::default()
        });
        let gate = signed_in(backend.clone()).await;
        let err = delete_many(&gate, backend.as_ref(), &[1, 2])
            .await
            .expect_err("nothing deleted");
        assert!(matches!(err, DashboardError::NothingDeleted { attempted: 2 }));
        assert_eq!(Notice::from_error(&err).kind, NoticeKind::NothingDeleted);
    }

    #[tokio::test]
    async fn full_success_removes_every_id_once() {
        let backend = Arc::new(FakeBackend::default());
        let gate = signed_in(backend.clone()).await;
        let before = backend.call_count();
        let report = delete_many(&gate, backend.as_ref(), &[3, 1, 3])
            .await
            .expect("deleted");
        assert_eq!(report.outcome(), DeletionOutcome::All);
        assert_eq!(backend.call_count() - before, 2);
        let mut videos = listing();
        report.apply_to(&mut videos);
        assert_eq!(videos.len(), 1);
        assert!(report.notice().detail.is_none());
    }

    #[tokio::test]
    async fn empty_request_and_missing_identity_make_no_calls() {
        let backend = Arc::new(FakeBackend::default());
        let gate = SessionGate::new(Arc::new(FakeIdentity::default()), backend.clone());
        gate.restore(None);
        assert!(matches!(
            delete_many(&gate, backend.as_ref(), &[]).await,
            Err(DashboardError::Validation(ValidationError::EmptySelection))
        ));
        assert!(matches!(
            delete_many(&gate, backend.as_ref(), &[1]).await,
            Err(DashboardError::Unauthenticated)
        ));
        assert_eq!(backend.call_count(), 0);
    }

    #[test]
    fn report_outcome_reflects_counts() {
        let nothing = DeletionReport::default();
        assert_eq!(nothing.outcome(), DeletionOutcome::Nothing);
        let all = DeletionReport {
            succeeded: vec![1],
            failed: Vec::new(),
        };
        assert_eq!(all.outcome(), DeletionOutcome::All);
    }
}
