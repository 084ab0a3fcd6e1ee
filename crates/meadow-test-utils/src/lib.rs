//! Shared helpers for pipeline tests.

mod service;
mod world;

pub use service::QueuedAgentService;
pub use world::{register_basic_items, spawn_character, spawn_item};
