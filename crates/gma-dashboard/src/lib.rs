#![forbid(unsafe_code)]
#![deny(unused_must_use, rustdoc::broken_intra_doc_links, rustdoc::bare_urls)]
#![warn(missing_docs, unreachable_pub, clippy::all, clippy::pedantic)]
//! Client-side state machines for the GMA console.
//!
//! The units here hold every piece of state a dashboard view renders: the
//! signed-in session, the active screen, upload tasks, the video selection,
//! test results, history aggregates and batch deletion reports. Network
//! access goes through the [`Backend`] and [`IdentityProvider`] seams.
//!
//! Layout: `session.rs` (session gate), `router.rs` (screens and navigation),
//! `uploads.rs` (upload lifecycle), `selection.rs` (selection, sort and
//! search), `blind_test.rs` (submission and results), `history.rs`
//! (aggregates), `deletion.rs` (batch delete), `notice.rs` (user-facing
//! messages), `dashboard.rs` (facade), `backend.rs` (network seams),
//! `error.rs` (error taxonomy).

pub mod backend;
pub mod dashboard;
pub mod deletion;
pub mod error;
pub mod history;
pub mod notice;
pub mod router;
pub mod selection;
pub mod session;
pub mod uploads;

pub use backend::{Backend, IdentityProvider, SharedBackend, SharedIdentity};
pub use blind_test::{ResultsView, parse_results, resolve_test, results_for_route, submit_test, summarize};
pub use dashboard::Dashboard;
pub use deletion::{DeletionOutcome, DeletionReport, FailedDeletion, delete_many};
pub use error::{DashboardError, DashboardResult, ValidationError};
pub use history::{
    DashboardTotals, HistoryView, StatusCounts, TestSummary, dashboard_totals, load_history,
    status_counts,
};
pub use notice::{Notice, NoticeKind};
pub use router::{NavParams, NavTarget, Screen, ScreenRouter, UnknownTarget};
pub use selection::{SortKey, UnknownSortKey, VideoSelection};
pub use session::SessionGate;
pub use uploads::{
    AcceptReport, RejectReason, Rejection, UploadEvent, UploadManager, UploadRunSummary,
    UploadStatus, UploadTask, UploadTicket, run_uploads,
};
