//! Script engine seam.

use crate::host::{ScriptBindings, ScriptHost};
use crate::token::CancellationToken;
use meadow_protocol::ScriptToRun;
use std::sync::Arc;

/// How a script run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptOutcome {
    /// Ran to the end of its source.
    Completed,
    /// Unwound after cancellation (cooperative or forced). Not an error.
    Cancelled,
    /// A runtime fault. Logged, never propagated.
    Failed(String),
}

/// Executes a script against a host. Implementations run on a worker thread
/// owned by the [`crate::ScriptRunner`] and must honor the token between
/// units of work.
pub trait ScriptEngine: Send + Sync {
    fn run(
        &self,
        script: &ScriptToRun,
        bindings: &ScriptBindings,
        host: Arc<dyn ScriptHost>,
        token: Arc<CancellationToken>,
    ) -> ScriptOutcome;
}
