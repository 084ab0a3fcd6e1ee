//! Per-agent mutable state.

use chrono::{DateTime, Utc};
use meadow_protocol::{ActionRequest, MessageId, Observations, PromptUsage};
use std::collections::{HashSet, VecDeque};
use uuid::Uuid;

/// Where an agent is in its sync cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Idle,
    AwaitingResponse,
    ApplyingScript,
    ApplyingActions,
    Paused,
    Errored,
}

/// The action currently executing for an agent.
#[derive(Debug, Clone)]
pub struct ActiveAction {
    pub action_id: Uuid,
    pub summary: String,
}

/// All mutable state for one agent-controlled entity.
///
/// Locked after the world lock, never before it.
#[derive(Debug)]
pub struct AgentState {
    pub phase: SyncPhase,
    /// Observation cutoff for activity entries.
    pub previous_check_time: f64,
    /// Accumulates between syncs; snapshotted and cleared at sync entry.
    pub pending: Observations,
    /// Message ids already reported to this agent. A message is reported to
    /// an agent at most once, ever.
    pub reported_message_ids: HashSet<MessageId>,
    pub observation_distance: f64,
    pub active_action: Option<ActiveAction>,
    pub pending_actions: VecDeque<ActionRequest>,
    /// Status bookkeeping surfaced to operators.
    pub status: String,
    pub last_error: Option<String>,
    pub agent_status: Option<String>,
    pub debug_info: Option<String>,
    pub total_request_count: u64,
    pub prompt_usages: Vec<PromptUsage>,
    pub last_response_at: Option<DateTime<Utc>>,
}

impl AgentState {
    pub fn new(observation_distance: f64) -> Self {
        Self {
            phase: SyncPhase::Idle,
            previous_check_time: -1.0,
            pending: Observations::default(),
            reported_message_ids: HashSet::new(),
            observation_distance,
            active_action: None,
            pending_actions: VecDeque::new(),
            status: "idle".to_string(),
            last_error: None,
            agent_status: None,
            debug_info: None,
            total_request_count: 0,
            prompt_usages: Vec::new(),
            last_response_at: None,
        }
    }
}
