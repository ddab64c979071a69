#![forbid(unsafe_code)]
#![deny(unused_must_use, rustdoc::broken_intra_doc_links, rustdoc::bare_urls)]
#![warn(missing_docs, unreachable_pub, clippy::all, clippy::pedantic)]

//! Environment-driven configuration for the GMA console.
//!
//! Layout: `defaults.rs` (default values and allowed upload types),
//! `model.rs` (typed configuration), `loader.rs` (environment loading),
//! `validate.rs` (field parsers), `error.rs` (configuration errors).

pub mod defaults;
pub mod error;
pub mod loader;
pub mod model;
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use model::{DashboardConfig, IdentityConfig, UploadLimits};
