//! Agent synchronization and execution pipeline.
//!
//! Binds agent-controlled entities in a [`meadow_sim::Simulation`] to a
//! remote decision service: observations accumulate per tick, sync cycles
//! snapshot and send them, and responses come back as either a script for
//! the sandbox or an ordered action list for the action engine.

mod actions;
mod error;
mod integration;
mod observation;
mod pipeline;
mod script_host;
mod service;
mod state;

pub use error::{AgentServiceError, MeadowCoreError};
pub use integration::AgentIntegration;
pub use observation::{build_entity_info, build_self_info, record_observations};
pub use pipeline::AgentPipeline;
pub use script_host::IntegrationScriptHost;
pub use service::{AgentService, HttpAgentService};
pub use state::{ActiveAction, AgentState, SyncPhase};
