//! Error types for script execution.

use thiserror::Error;

/// Errors surfaced to a running script through its host handle.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScriptError {
    /// Cooperative stop was requested; the script should unwind.
    #[error("script cancelled")]
    Cancelled,
    /// The host handle was fenced after a force-stop; no further world
    /// access is possible.
    #[error("script interrupted")]
    Interrupted,
    /// A runtime fault inside the script or a host call.
    #[error("script runtime error: {0}")]
    Runtime(String),
}
