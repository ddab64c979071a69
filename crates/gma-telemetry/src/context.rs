//! Command-scoped tracing context.
//!
//! # Design
//! - The process-wide span carries the command name and build identifier.
//! - The command name is also kept in task-local storage so client code can
//!   tag outgoing requests without threading it through every call.

use std::future::Future;
use std::sync::Arc;

use tracing::{Span, span::Entered};

use crate::init::build_sha;

/// Guard that keeps the command-level span entered for the lifetime of the process.
pub struct GlobalContextGuard {
    _guard: Entered<'static>,
}

impl GlobalContextGuard {
    /// Enter the command-level tracing span for the lifetime of the guard.
    #[must_use]
    pub fn new(command: impl Into<String>) -> Self {
        let command = command.into();
        let span: &'static Span = Box::leak(Box::new(
            tracing::info_span!("gma", command = %command, build_sha = %build_sha()),
        ));
        let guard = span.enter();
        Self { _guard: guard }
    }
}

/// Retrieve the command name for the running task, if one is set.
#[must_use]
pub fn current_command() -> Option<String> {
    ACTIVE_COMMAND
        .try_with(|command| command.as_ref().to_string())
        .ok()
}

/// Execute the provided future with the command name available to downstream logging.
pub async fn with_command_context<Fut, T>(command: impl Into<String>, fut: Fut) -> T
where
    Fut: Future<Output = T>,
{
    ACTIVE_COMMAND.scope(Arc::from(command.into()), fut).await
}

tokio::task_local! {
    static ACTIVE_COMMAND: Arc<str>;
}
