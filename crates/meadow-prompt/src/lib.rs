//! Token-budgeted prompt assembly.
//!
//! Prompts are assembled as a tree of sections, each optionally reserving a
//! slice of the model's context window. Text is measured before it lands, so
//! a finished prompt never exceeds `max_token_count - reserved_output_tokens`.

mod builder;
mod error;
mod tokenizer;

pub use builder::{AddTextResult, ModelInfo, PromptBuilder, SectionId};
pub use error::PromptError;
pub use tokenizer::{HeuristicTokenizer, Tokenizer, TokenizerRegistry};
