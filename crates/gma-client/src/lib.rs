#![forbid(unsafe_code)]
#![deny(unused_must_use, rustdoc::broken_intra_doc_links, rustdoc::bare_urls)]
#![warn(missing_docs, unreachable_pub, clippy::all, clippy::pedantic)]
//! HTTP plumbing for the GMA console.
//!
//! [`ApiClient`] speaks the backend REST surface; every call takes the bearer
//! token explicitly so callers obtain a fresh one per request.
//! [`FirebaseIdentity`] speaks the identity provider's REST surface.
//!
//! Layout: `api.rs` (backend client), `upload.rs` (streaming multipart body with
//! progress), `identity.rs` (identity provider client), `error.rs` (error
//! taxonomy).

pub mod api;
pub mod error;
pub mod identity;
pub mod upload;

pub use api::{ApiClient, DownloadedFile, Page};
pub use error::{ClientError, ClientResult};
pub use identity::{FirebaseIdentity, IdentitySession, RefreshedToken};
pub use upload::{ProgressFn, UploadSource};
