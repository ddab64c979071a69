//! Upload lifecycle manager.
//!
//! # Design
//! - [`UploadManager`] is a synchronous state machine; [`run_uploads`] drives
//!   transfers and feeds their events back through one channel.
//! - Tasks move `uploading -> success` or `uploading -> error -> uploading`.
//!   The backend id lives inside [`UploadStatus::Success`], so it exists
//!   exactly when the task succeeded.
//! - Every event carries an [`UploadTicket`]. Events for removed tasks, or for
//!   an attempt superseded by a retry, are discarded.
//! - Files failing validation are reported as [`Rejection`]s and never become
//!   tasks.

use std::sync::{Mutex, MutexGuard, PoisonError};

use futures_util::future::join_all;
use gma_client::UploadSource;
use gma_config::UploadLimits;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::backend::Backend;
use crate::error::{DashboardError, ValidationError};
use crate::session::SessionGate;

/// Lifecycle state of one upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadStatus {
    /// Transfer in flight.
    Uploading,
    /// Stored by the backend.
    Success {
        /// Backend-assigned video id.
        backend_id: i64,
    },
    /// Transfer failed; may be retried.
    Error {
        /// User-facing failure message.
        message: String,
    },
}

/// One file moving through the upload flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadTask {
    /// Client-generated id, unique per session.
    pub local_id: Uuid,
    /// File being uploaded.
    pub source: UploadSource,
    /// Lifecycle state.
    pub status: UploadStatus,
    /// Whole-percent progress of the current attempt.
    pub progress: u8,
    generation: u32,
}

impl UploadTask {
    /// Backend id, present only after success.
    #[must_use]
    pub const fn backend_id(&self) -> Option<i64> {
        match self.status {
            UploadStatus::Success { backend_id } => Some(backend_id),
            _ => None,
        }
    }

    /// Failure message, present only in the error state.
    #[must_use]
    pub fn error_message(&self) -> Option<&str> {
        match &self.status {
            UploadStatus::Error { message } => Some(message),
            _ => None,
        }
    }

    fn ticket(&self) -> UploadTicket {
        UploadTicket {
            local_id: self.local_id,
            generation: self.generation,
        }
    }
}

/// Identifies one transfer attempt of one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UploadTicket {
    /// Task the attempt belongs to.
    pub local_id: Uuid,
    generation: u32,
}

/// Why a file was not accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// Not an MP4 or MOV file.
    UnsupportedType,
    /// Larger than the configured limit.
    TooLarge {
        /// File size in bytes.
        size: u64,
        /// Limit in bytes.
        limit: u64,
    },
    /// The batch does not fit in the remaining pool slots.
    PoolFull {
        /// Free slots at the time of the request.
        remaining: usize,
    },
}

impl RejectReason {
    /// User-facing explanation.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::UnsupportedType => "Only MP4 and MOV files are supported".to_string(),
            Self::TooLarge { size, limit } => format!(
                "File size must be less than {}. Your file is {}",
                gib(*limit),
                gib(*size)
            ),
            Self::PoolFull { remaining } => {
                format!("You can only upload {remaining} more video(s)")
            }
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn gib(bytes: u64) -> String {
    format!("{:.2}GB", bytes as f64 / f64::from(1_u32 << 30))
}

/// A file that failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    /// Rejected file name.
    pub file: String,
    /// Why it was rejected.
    pub reason: RejectReason,
}

impl From<Rejection> for ValidationError {
    fn from(rejection: Rejection) -> Self {
        Self::FileRejected {
            reason: rejection.reason.message(),
            file: rejection.file,
        }
    }
}

impl From<Rejection> for DashboardError {
    fn from(rejection: Rejection) -> Self {
        Self::Validation(rejection.into())
    }
}

/// Result of [`UploadManager::accept`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AcceptReport {
    /// Tickets for the tasks created, in input order.
    pub started: Vec<UploadTicket>,
    /// Files that did not become tasks.
    pub rejected: Vec<Rejection>,
}

/// Event emitted by a transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadEvent {
    /// Bytes handed to the transport, as a percentage.
    Progress {
        /// Attempt the event belongs to.
        ticket: UploadTicket,
        /// Whole percent.
        percent: u8,
    },
    /// Backend stored the file.
    Completed {
        /// Attempt the event belongs to.
        ticket: UploadTicket,
        /// Backend-assigned id.
        backend_id: i64,
    },
    /// Transfer failed.
    Failed {
        /// Attempt the event belongs to.
        ticket: UploadTicket,
        /// User-facing message.
        message: String,
    },
}

/// Bounded set of upload tasks.
#[derive(Debug, Clone)]
pub struct UploadManager {
    limits: UploadLimits,
    tasks: Vec<UploadTask>,
}

impl UploadManager {
    /// Empty manager enforcing `limits`.
    #[must_use]
    pub const fn new(limits: UploadLimits) -> Self {
        Self {
            limits,
            tasks: Vec::new(),
        }
    }

    /// Validate files and create an `uploading` task for each accepted one.
    ///
    /// A batch larger than the free pool slots is rejected as a whole.
    pub fn accept(&mut self, files: Vec<UploadSource>) -> AcceptReport {
        let mut report = AcceptReport::default();
        let remaining = self.remaining_slots();
        if files.len() > remaining {
            report.rejected = files
                .into_iter()
                .map(|source| Rejection {
                    file: source.file_name,
                    reason: RejectReason::PoolFull { remaining },
                })
                .collect();
            return report;
        }

        for source in files {
            if let Some(reason) = self.validate(&source) {
                report.rejected.push(Rejection {
                    file: source.file_name,
                    reason,
                });
                continue;
            }
            let task = UploadTask {
                local_id: Uuid::new_v4(),
                source,
                status: UploadStatus::Uploading,
                progress: 0,
                generation: 0,
            };
            report.started.push(task.ticket());
            self.tasks.push(task);
        }
        report
    }

    fn validate(&self, source: &UploadSource) -> Option<RejectReason> {
        let extension_ok = source
            .extension()
            .is_some_and(|ext| UploadLimits::extension_allowed(&ext));
        if !extension_ok || !UploadLimits::mime_allowed(&source.mime) {
            return Some(RejectReason::UnsupportedType);
        }
        if source.size > self.limits.max_file_bytes {
            return Some(RejectReason::TooLarge {
                size: source.size,
                limit: self.limits.max_file_bytes,
            });
        }
        None
    }

    /// Apply a progress update. Progress never decreases.
    ///
    /// Returns `false` when the update was discarded (stale attempt, removed
    /// or finished task).
    pub fn apply_progress(&mut self, ticket: UploadTicket, percent: u8) -> bool {
        let Some(task) = self.live_task(ticket) else {
            return false;
        };
        task.progress = task.progress.max(percent.min(100));
        true
    }

    /// Mark the attempt as stored by the backend.
    pub fn complete(&mut self, ticket: UploadTicket, backend_id: i64) -> bool {
        let Some(task) = self.live_task(ticket) else {
            return false;
        };
        task.status = UploadStatus::Success { backend_id };
        task.progress = 100;
        true
    }

    /// Mark the attempt as failed.
    pub fn fail(&mut self, ticket: UploadTicket, message: impl Into<String>) -> bool {
        let Some(task) = self.live_task(ticket) else {
            return false;
        };
        task.status = UploadStatus::Error {
            message: message.into(),
        };
        true
    }

    /// Apply any transfer event.
    pub fn apply(&mut self, event: UploadEvent) -> bool {
        match event {
            UploadEvent::Progress { ticket, percent } => self.apply_progress(ticket, percent),
            UploadEvent::Completed { ticket, backend_id } => self.complete(ticket, backend_id),
            UploadEvent::Failed { ticket, message } => self.fail(ticket, message),
        }
    }

    /// Restart a failed task from 0%. Returns the new attempt's ticket, or
    /// `None` unless the task exists and is in the error state.
    pub fn retry(&mut self, local_id: Uuid) -> Option<UploadTicket> {
        let task = self
            .tasks
            .iter_mut()
            .find(|task| task.local_id == local_id)?;
        if !matches!(task.status, UploadStatus::Error { .. }) {
            return None;
        }
        task.generation = task.generation.wrapping_add(1);
        task.status = UploadStatus::Uploading;
        task.progress = 0;
        Some(task.ticket())
    }

    /// Dismiss a task. Later events for it are discarded.
    pub fn remove(&mut self, local_id: Uuid) -> Option<UploadTask> {
        let index = self
            .tasks
            .iter()
            .position(|task| task.local_id == local_id)?;
        Some(self.tasks.remove(index))
    }

    /// Tasks in the order they were accepted.
    #[must_use]
    pub fn tasks(&self) -> &[UploadTask] {
        &self.tasks
    }

    /// Backend ids of every successful task, in task order.
    #[must_use]
    pub fn successful_backend_ids(&self) -> Vec<i64> {
        self.tasks.iter().filter_map(UploadTask::backend_id).collect()
    }

    /// Free slots in the pool.
    #[must_use]
    pub fn remaining_slots(&self) -> usize {
        self.limits.max_tasks.saturating_sub(self.tasks.len())
    }

    /// Source file for a live attempt.
    #[must_use]
    pub fn source_for(&self, ticket: UploadTicket) -> Option<UploadSource> {
        self.tasks
            .iter()
            .find(|task| task.ticket() == ticket && task.status == UploadStatus::Uploading)
            .map(|task| task.source.clone())
    }

    fn live_task(&mut self, ticket: UploadTicket) -> Option<&mut UploadTask> {
        self.tasks.iter_mut().find(|task| {
            task.ticket() == ticket && task.status == UploadStatus::Uploading
        })
    }
}

/// Counts of events applied by one [`run_uploads`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UploadRunSummary {
    /// Attempts that ended in success.
    pub completed: usize,
    /// Attempts that ended in error.
    pub failed: usize,
    /// Events dropped because their task was removed or retried.
    pub discarded: usize,
}

/// Drive the transfers for `tickets` concurrently.
///
/// Each transfer fetches its own bearer token. Events are applied to
/// `manager` in arrival order and `on_change` observes the manager after each
/// applied event.
pub async fn run_uploads<F>(
    manager: &Mutex<UploadManager>,
    tickets: Vec<UploadTicket>,
    session: &SessionGate,
    backend: &dyn Backend,
    mut on_change: F,
) -> UploadRunSummary
where
    F: FnMut(&UploadManager),
{
    let (events, mut inbox) = mpsc::unbounded_channel::<UploadEvent>();
    let transfers: Vec<_> = tickets
        .into_iter()
        .filter_map(|ticket| {
            let source = lock_manager(manager).source_for(ticket)?;
            Some(transfer(ticket, source, session, backend, events.clone()))
        })
        .collect();
    drop(events);

    let mut summary = UploadRunSummary::default();
    let apply = async {
        while let Some(event) = inbox.recv().await {
            let terminal = match &event {
                UploadEvent::Progress { .. } => None,
                UploadEvent::Completed { .. } => Some(true),
                UploadEvent::Failed { .. } => Some(false),
            };
            let mut guard = lock_manager(manager);
            if guard.apply(event) {
                match terminal {
                    Some(true) => summary.completed += 1,
                    Some(false) => summary.failed += 1,
                    None => {}
                }
                on_change(&guard);
            } else {
                summary.discarded += 1;
            }
        }
    };
    tokio::join!(join_all(transfers), apply);
    summary
}

async fn transfer(
    ticket: UploadTicket,
    source: UploadSource,
    session: &SessionGate,
    backend: &dyn Backend,
    events: mpsc::UnboundedSender<UploadEvent>,
) {
    let progress_events = events.clone();
    let progress = Box::new(move |percent: u8| {
        let _ = progress_events.send(UploadEvent::Progress { ticket, percent });
    });
    let outcome = match session.token().await {
        Ok(token) => backend
            .upload_video(&token, &source, progress)
            .await
            .map_err(|err| DashboardError::network("uploads.create", err)),
        Err(err) => Err(err),
    };
    let event = match outcome {
        Ok(record) => {
            info!(file = %source.file_name, video_id = record.id, "upload completed");
            UploadEvent::Completed {
                ticket,
                backend_id: record.id,
            }
        }
        Err(err) => {
            warn!(file = %source.file_name, error = %err, "upload failed");
            UploadEvent::Failed {
                ticket,
                message: err.detail().unwrap_or_else(|| err.to_string()),
            }
        }
    };
    let _ = events.send(event);
}

fn lock_manager(manager: &Mutex<UploadManager>) -> MutexGuard<'_, UploadManager> {
    manager.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;

    use tokio::sync::Notify;

    use super::*;
    use crate::backend::fakes::{FakeBackend, FakeIdentity, PASSWORD};

    fn source(name: &str, mime: &str, size: u64) -> UploadSource {
        UploadSource {
            path: PathBuf::from(format!("/tmp/{name}")),
            file_name: name.to_string(),
            mime: mime.to_string(),
            size,
        }
    }

    fn mp4(name: &str) -> UploadSource {
        source(name, "video/mp4", 1024)
    }

    fn limits(max_tasks: usize) -> UploadLimits {
        UploadLimits {
            max_file_bytes: 10_000,
            max_tasks,
        }
    }

    fn assert_backend_id_iff_success(manager: &UploadManager) {
        for task in manager.tasks() {
            assert_eq!(
                task.backend_id().is_some(),
                matches!(task.status, UploadStatus::Success { .. })
            );
        }
    }

    #[test]
    fn disallowed_type_is_rejected_without_creating_a_task() {
        let mut manager = UploadManager::new(limits(10));
        let report = manager.accept(vec![source("clip.avi", "video/x-msvideo", 10)]);
        assert!(report.started.is_empty());
        assert_eq!(report.rejected[0].reason, RejectReason::UnsupportedType);
        assert!(manager.tasks().is_empty());

        let report = manager.accept(vec![source("renamed.mp4", "video/x-msvideo", 10)]);
        assert_eq!(report.rejected[0].reason, RejectReason::UnsupportedType);
        assert!(manager.tasks().is_empty());
    }

    #[test]
    fn oversized_file_is_rejected() {
        let mut manager = UploadManager::new(limits(10));
        let report = manager.accept(vec![
            source("big.mov", "video/quicktime", 10_001),
            source("ok.MOV", "video/quicktime", 10_000),
        ]);
        assert_eq!(report.started.len(), 1);
        assert_eq!(
            report.rejected[0].reason,
            RejectReason::TooLarge {
                size: 10_001,
                limit: 10_000
            }
        );
        assert_eq!(manager.tasks()[0].source.file_name, "ok.MOV");
    }

    #[test]
    fn batch_larger_than_free_slots_is_rejected_whole() {
        let mut manager = UploadManager::new(limits(2));
        manager.accept(vec![mp4("a.mp4")]);
        let report = manager.accept(vec![mp4("b.mp4"), mp4("c.mp4")]);
        assert!(report.started.is_empty());
        assert_eq!(report.rejected.len(), 2);
        assert_eq!(
            report.rejected[0].reason,
            RejectReason::PoolFull { remaining: 1 }
        );
        assert_eq!(manager.remaining_slots(), 1);
        assert_eq!(
            report.rejected[0].reason.message(),
            "You can only upload 1 more video(s)"
        );
    }

    #[test]
    fn rejection_maps_to_file_rejected_validation_error() {
        let err = DashboardError::from(Rejection {
            file: "clip.avi".into(),
            reason: RejectReason::UnsupportedType,
        });
        assert!(matches!(
            err,
            DashboardError::Validation(ValidationError::FileRejected { ref file, .. }) if file == "clip.avi"
        ));
    }

    #[test]
    fn progress_is_monotonic_until_terminal() {
        let mut manager = UploadManager::new(limits(10));
        let ticket = manager.accept(vec![mp4("a.mp4")]).started[0];
        assert!(manager.apply_progress(ticket, 40));
        assert!(manager.apply_progress(ticket, 20));
        assert_eq!(manager.tasks()[0].progress, 40);
        assert!(manager.apply_progress(ticket, 250));
        assert_eq!(manager.tasks()[0].progress, 100);

        assert!(manager.complete(ticket, 77));
        assert!(!manager.apply_progress(ticket, 10));
        assert!(!manager.fail(ticket, "late"));
        assert_eq!(manager.tasks()[0].backend_id(), Some(77));
        assert_backend_id_iff_success(&manager);
    }

    #[test]
    fn retry_restarts_failed_task_from_zero() {
        let mut manager = UploadManager::new(limits(10));
        let first = manager.accept(vec![mp4("a.mp4")]).started[0];
        manager.apply_progress(first, 60);
        manager.fail(first, "Could not reach the server");
        assert_eq!(
            manager.tasks()[0].error_message(),
            Some("Could not reach the server")
        );
        assert_backend_id_iff_success(&manager);

        let second = manager.retry(first.local_id).expect("retry from error");
        assert_ne!(first, second);
        assert_eq!(manager.tasks()[0].progress, 0);
        assert_eq!(manager.tasks()[0].status, UploadStatus::Uploading);

        assert!(!manager.apply_progress(first, 90));
        assert!(manager.retry(first.local_id).is_none());
        assert!(manager.complete(second, 5));
        assert!(manager.retry(first.local_id).is_none());
        assert_eq!(manager.successful_backend_ids(), vec![5]);
    }

    #[test]
    fn removed_task_ignores_late_events() {
        let mut manager = UploadManager::new(limits(10));
        let ticket = manager.accept(vec![mp4("a.mp4")]).started[0];
        assert!(manager.remove(ticket.local_id).is_some());
        assert!(!manager.apply(UploadEvent::Progress {
            ticket,
            percent: 50
        }));
        assert!(!manager.apply(UploadEvent::Completed {
            ticket,
            backend_id: 1
        }));
        assert!(manager.tasks().is_empty());
        assert_eq!(manager.remaining_slots(), 10);
    }

    async fn signed_in(backend: Arc<FakeBackend>) -> SessionGate {
        let gate = SessionGate::new(Arc::new(FakeIdentity::default()), backend);
        gate.sign_in("dr@example.test", PASSWORD)
            .await
            .expect("sign in");
        gate
    }

    #[tokio::test]
    async fn run_uploads_completes_and_fails_tasks_independently() {
        let backend = Arc::new(FakeBackend::default());
        backend
            .failing_uploads
            .lock()
            .expect("failing lock")
            .insert("bad.mp4".into());
        let gate = signed_in(backend.clone()).await;
        let calls_before = backend.call_count();

        let manager = Mutex::new(UploadManager::new(limits(10)));
        let tickets = manager
            .lock()
            .expect("manager")
            .accept(vec![mp4("good.mp4"), mp4("bad.mp4")])
            .started;

        let mut observed = Vec::new();
        let summary = run_uploads(&manager, tickets, &gate, backend.as_ref(), |state| {
            observed.push(state.tasks().iter().map(|task| task.progress).collect::<Vec<_>>());
        })
        .await;

        assert_eq!(summary.completed, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(backend.call_count() - calls_before, 2);
        assert!(!observed.is_empty());

        let state = manager.lock().expect("manager");
        assert_backend_id_iff_success(&state);
        let good = &state.tasks()[0];
        assert_eq!(good.progress, 100);
        assert!(good.backend_id().is_some());
        let bad = &state.tasks()[1];
        assert_eq!(bad.progress, 50);
        assert_eq!(
            bad.error_message(),
            Some("The server sent an unexpected response")
        );
    }

    #[tokio::test]
    async fn retried_upload_runs_again_and_succeeds() {
        let backend = Arc::new(FakeBackend::default());
        backend
            .failing_uploads
            .lock()
            .expect("failing lock")
            .insert("flaky.mp4".into());
        let gate = signed_in(backend.clone()).await;
        let manager = Mutex::new(UploadManager::new(limits(10)));
        let tickets = manager
            .lock()
            .expect("manager")
            .accept(vec![mp4("flaky.mp4")])
            .started;
        run_uploads(&manager, tickets, &gate, backend.as_ref(), |_| {}).await;

        backend.failing_uploads.lock().expect("failing lock").clear();
        let local_id = manager.lock().expect("manager").tasks()[0].local_id;
        let retry = manager
            .lock()
            .expect("manager")
            .retry(local_id)
            .expect("retry");
        let summary = run_uploads(&manager, vec![retry], &gate, backend.as_ref(), |_| {}).await;

        assert_eq!(summary.completed, 1);
        assert_eq!(backend.uploads.lock().expect("uploads")["flaky.mp4"], 2);
        assert_eq!(
            manager.lock().expect("manager").successful_backend_ids().len(),
            1
        );
    }

    #[tokio::test]
    async fn uploads_without_identity_fail_as_unauthenticated() {
        let backend = Arc::new(FakeBackend::default());
        let gate = SessionGate::new(Arc::new(FakeIdentity::default()), backend.clone());
        gate.restore(None);
        let manager = Mutex::new(UploadManager::new(limits(10)));
        let tickets = manager
            .lock()
            .expect("manager")
            .accept(vec![mp4("a.mp4")])
            .started;
        let summary = run_uploads(&manager, tickets, &gate, backend.as_ref(), |_| {}).await;
        assert_eq!(summary.failed, 1);
        assert_eq!(backend.call_count(), 0);
        assert_eq!(
            manager.lock().expect("manager").tasks()[0].error_message(),
            Some("not authenticated")
        );
    }

    #[tokio::test]
    async fn dismissing_an_in_flight_upload_discards_its_late_events() {
        let gate = Arc::new(Notify::new());
        let backend = Arc::new(FakeBackend {
            upload_gate: Some(gate.clone()),
            ..FakeBackend::default()
        });
        let session = signed_in(backend.clone()).await;
        let manager = Mutex::new(UploadManager::new(limits(1)));
        let tickets = lock_manager(&manager).accept(vec![mp4("a.mp4")]).started;
        let local_id = tickets[0].local_id;

        let dismiss = async {
            while lock_manager(&manager)
                .tasks()
                .first()
                .is_none_or(|task| task.progress < 50)
            {
                tokio::task::yield_now().await;
            }
            let removed = lock_manager(&manager).remove(local_id);
            gate.notify_one();
            removed
        };
        let (summary, removed) = tokio::join!(
            run_uploads(&manager, tickets, &session, backend.as_ref(), |_| {}),
            dismiss
        );

        assert!(removed.is_some());
        assert!(summary.discarded >= 1);
        assert_eq!(summary.completed, 0);
        let state = lock_manager(&manager);
        assert!(state.tasks().is_empty());
        assert_eq!(state.remaining_slots(), 1);
        assert_eq!(backend.uploads.lock().expect("uploads")["a.mp4"], 1);
    }
}
