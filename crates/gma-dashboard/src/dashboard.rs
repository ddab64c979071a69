//! Facade wiring the session gate, router and per-screen managers together.
//!
//! # Design
//! - Owns one instance of each state unit; screens borrow them through the
//!   accessors.
//! - Cross-unit flows (submit then navigate, delete then reconcile, sign out
//!   then reset) live here so the units stay independent.

use std::sync::{Mutex, MutexGuard, PoisonError};

use gma_api_models::{TestRecord, TestType};
use gma_client::{Page, UploadSource};
use gma_config::UploadLimits;
use tracing::info;
use uuid::Uuid;

use crate::backend::{Backend, SharedBackend, SharedIdentity};
use crate::blind_test::{ResultsView, results_for_route, submit_test};
use crate::deletion::{DeletionReport, delete_many};
use crate::error::{DashboardError, DashboardResult};
use crate::history::{HistoryView, load_history};
use crate::router::ScreenRouter;
use crate::selection::VideoSelection;
use crate::session::SessionGate;
use crate::uploads::{
    AcceptReport, UploadManager, UploadRunSummary, UploadTask, UploadTicket, run_uploads,
};

/// Client-side dashboard state.
pub struct Dashboard {
    backend: SharedBackend,
    session: SessionGate,
    router: ScreenRouter,
    selection: VideoSelection,
    limits: UploadLimits,
    uploads: Mutex<UploadManager>,
}

impl Dashboard {
    /// Assemble a dashboard over the given providers.
    #[must_use]
    pub fn new(identity: SharedIdentity, backend: SharedBackend, limits: UploadLimits) -> Self {
        Self {
            session: SessionGate::new(identity, backend.clone()),
            backend,
            router: ScreenRouter::new(),
            selection: VideoSelection::new(),
            limits,
            uploads: Mutex::new(UploadManager::new(limits)),
        }
    }

    /// Session gate.
    #[must_use]
    pub const fn session(&self) -> &SessionGate {
        &self.session
    }

    /// Backend used for every call.
    #[must_use]
    pub fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    /// Screen router.
    #[must_use]
    pub const fn router(&self) -> &ScreenRouter {
        &self.router
    }

    /// Mutable screen router.
    pub const fn router_mut(&mut self) -> &mut ScreenRouter {
        &mut self.router
    }

    /// Video selection for the current listing.
    #[must_use]
    pub const fn selection(&self) -> &VideoSelection {
        &self.selection
    }

    /// Mutable video selection.
    pub const fn selection_mut(&mut self) -> &mut VideoSelection {
        &mut self.selection
    }

    /// Snapshot of the upload manager.
    #[must_use]
    pub fn uploads(&self) -> UploadManager {
        self.lock_uploads().clone()
    }

    /// Dismiss an upload task, freeing its pool slot.
    ///
    /// A transfer still in flight keeps running; its events are discarded.
    pub fn remove_upload(&self, local_id: Uuid) -> Option<UploadTask> {
        self.lock_uploads().remove(local_id)
    }

    /// Sign out and reset navigation and every per-screen state.
    pub fn sign_out(&mut self) {
        self.session.sign_out();
        self.router.reset();
        self.selection = VideoSelection::new();
        *self.lock_uploads() = UploadManager::new(self.limits);
    }

    /// Fetch the video listing into the selection. On failure the listing
    /// is emptied.
    ///
    /// # Errors
    ///
    /// Returns [`DashboardError::Unauthenticated`] or [`DashboardError::Network`].
    pub async fn refresh_videos(&mut self, page: Page) -> DashboardResult<usize> {
        let fetched = match self.session.token().await {
            Ok(token) => self
                .backend
                .list_videos(&token, page)
                .await
                .map_err(|source| DashboardError::network("uploads.list", source)),
            Err(err) => Err(err),
        };
        match fetched {
            Ok(videos) => {
                let count = videos.len();
                self.selection.replace_list(videos);
                Ok(count)
            }
            Err(err) => {
                self.selection.replace_list(Vec::new());
                Err(err)
            }
        }
    }

    /// Validate `files`, then upload the accepted ones concurrently.
    pub async fn upload_files<F>(
        &mut self,
        files: Vec<UploadSource>,
        on_change: F,
    ) -> (AcceptReport, UploadRunSummary)
    where
        F: FnMut(&UploadManager),
    {
        let report = self.lock_uploads().accept(files);
        let summary = run_uploads(
            &self.uploads,
            report.started.clone(),
            &self.session,
            self.backend.as_ref(),
            on_change,
        )
        .await;
        (report, summary)
    }

    /// Retry every failed upload.
    pub async fn retry_failed_uploads<F>(&mut self, on_change: F) -> UploadRunSummary
    where
        F: FnMut(&UploadManager),
    {
        let tickets: Vec<UploadTicket> = {
            let mut manager = self.lock_uploads();
            let failed: Vec<_> = manager
                .tasks()
                .iter()
                .filter(|task| task.error_message().is_some())
                .map(|task| task.local_id)
                .collect();
            failed
                .into_iter()
                .filter_map(|local_id| manager.retry(local_id))
                .collect()
        };
        run_uploads(
            &self.uploads,
            tickets,
            &self.session,
            self.backend.as_ref(),
            on_change,
        )
        .await
    }

    /// Submit the selected videos and open the results screen.
    ///
    /// # Errors
    ///
    /// Same as [`submit_test`].
    pub async fn submit_selected(&mut self, test_type: TestType) -> DashboardResult<TestRecord> {
        let ids = self.selection.selected_ids();
        self.submit(test_type, &ids).await
    }

    /// Submit every successfully uploaded video as an instant test and open
    /// the results screen.
    ///
    /// # Errors
    ///
    /// Same as [`submit_test`].
    pub async fn submit_uploaded(&mut self) -> DashboardResult<TestRecord> {
        let ids = self.lock_uploads().successful_backend_ids();
        self.submit(TestType::Instant, &ids).await
    }

    async fn submit(&mut self, test_type: TestType, ids: &[i64]) -> DashboardResult<TestRecord> {
        let record = submit_test(&self.session, self.backend.as_ref(), test_type, ids).await?;
        self.router.complete_test(Some(ids.len()), Some(record.id));
        Ok(record)
    }

    /// Delete the selected videos and reconcile the listing once all calls settle.
    ///
    /// # Errors
    ///
    /// Same as [`delete_many`].
    pub async fn delete_selected(&mut self) -> DashboardResult<DeletionReport> {
        let ids = self.selection.selected_ids();
        let report = delete_many(&self.session, self.backend.as_ref(), &ids).await?;
        let mut videos = self.selection.videos().to_vec();
        report.apply_to(&mut videos);
        self.selection.replace_list(videos);
        info!(remaining = self.selection.videos().len(), "listing reconciled");
        Ok(report)
    }

    /// Content for the results screen at the current route.
    pub async fn results(&self) -> ResultsView {
        results_for_route(&self.session, self.backend.as_ref(), self.router.params()).await
    }

    /// Content for the history screen.
    pub async fn history(&self) -> HistoryView {
        load_history(&self.session, self.backend.as_ref()).await
    }

    fn lock_uploads(&self) -> MutexGuard<'_, UploadManager> {
        self.uploads.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
