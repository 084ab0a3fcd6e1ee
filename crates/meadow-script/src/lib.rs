//! Script sandbox: cancellation, host capabilities, engines, and the
//! per-agent runner.
//!
//! Scripts run on dedicated worker threads. The runner never kills a thread;
//! cancellation is cooperative first, and after a grace period the script's
//! host handle is fenced so any further world access fails fast.

mod engine;
mod error;
mod host;
mod line_engine;
mod runner;
mod token;

pub use engine::{ScriptEngine, ScriptOutcome};
pub use error::ScriptError;
pub use host::{ScriptBindings, ScriptHost};
pub use line_engine::LineScriptEngine;
pub use runner::{OutcomeCallback, ScriptRunner};
pub use token::CancellationToken;
