//! Error types for the agent pipeline.

use meadow_protocol::AgentId;
use thiserror::Error;

/// Errors from the decision-service transport. Always non-fatal: the
/// orchestrator records them on the agent and retries next cycle.
#[derive(Debug, Error)]
pub enum AgentServiceError {
    /// Request failed before a response arrived.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// The decision service answered with a non-success status.
    #[error("decision service returned status {status}")]
    Status { status: u16 },
    /// The response body could not be decoded.
    #[error("malformed response: {0}")]
    Decode(String),
}

/// Errors surfaced by the pipeline facade.
#[derive(Debug, Error)]
pub enum MeadowCoreError {
    #[error(transparent)]
    Sim(#[from] meadow_sim::SimError),
    #[error(transparent)]
    Service(#[from] AgentServiceError),
    /// No integration registered for this agent.
    #[error("unknown agent (agent_id={0})")]
    UnknownAgent(AgentId),
}
