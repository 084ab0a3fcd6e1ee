//! Request and response payloads for the decision-service round trip.

use crate::action::ActionRequest;
use crate::ids::{AgentId, SimulationId};
use crate::info::{SelfInfo, WorldConstants};
use crate::observation::Observations;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier for one sync cycle.
pub type SyncId = Uuid;

/// An open-ended behavior script returned by the decision service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptToRun {
    pub script_id: Uuid,
    /// Opaque executable source; interpreted by the configured script engine.
    pub source: String,
}

/// Token/cost bookkeeping for one prompt the decision service ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptUsage {
    pub model_id: String,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

/// One sync request: everything the decision service needs to produce the
/// agent's next behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSyncRequest {
    pub sync_id: SyncId,
    pub agent_id: AgentId,
    pub agent_type: String,
    pub simulation_id: SimulationId,
    pub simulation_time: f64,
    pub self_info: SelfInfo,
    pub new_observations: Observations,
    pub constants: WorldConstants,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub most_recent_completed_script_id: Option<Uuid>,
}

/// One output from the decision service. Carries at most one of
/// `script` / `actions`; a script always wins when both are present.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AgentSyncOutput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug_info: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prompt_usages: Vec<PromptUsage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<ScriptToRun>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actions: Option<Vec<ActionRequest>>,
}

/// Response envelope; a single round trip may carry multiple outputs which
/// are applied in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSyncResponse {
    pub outputs: Vec<AgentSyncOutput>,
}
