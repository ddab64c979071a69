#![forbid(unsafe_code)]
#![deny(unused_must_use, rustdoc::broken_intra_doc_links, rustdoc::bare_urls)]
#![warn(missing_docs, unreachable_pub, clippy::all, clippy::pedantic)]
//! Logging primitives shared across the GMA console crates.
//!
//! Layout: `init.rs` (subscriber installation and format selection),
//! `context.rs` (command span and task-local command context), `error.rs`
//! (telemetry error type).

pub mod context;
pub mod error;
pub mod init;

pub use context::{GlobalContextGuard, current_command, with_command_context};
pub use error::{Result, TelemetryError};
pub use init::{DEFAULT_LOG_LEVEL, LogFormat, LoggingConfig, build_sha, init_logging};
