//! Error types for prompt assembly.

use thiserror::Error;

/// Errors returned while building a prompt.
#[derive(Debug, Error)]
pub enum PromptError {
    /// A section reservation asked for more tokens than its parent has left.
    #[error(
        "section reservation exceeds budget (section={section}, requested={requested}, available={available})"
    )]
    ReservationExceedsBudget {
        section: String,
        requested: usize,
        available: usize,
    },
    /// Required text did not fit in its section's remaining budget.
    #[error(
        "text does not fit in section (section={section}, token_count={token_count}, available={available})\nusage:\n{usage_summary}\ntext:\n{text}"
    )]
    DoesNotFit {
        section: String,
        token_count: usize,
        available: usize,
        usage_summary: String,
        text: String,
    },
}
