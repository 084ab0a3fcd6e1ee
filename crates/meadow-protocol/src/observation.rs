//! Observation records delivered to an agent for one sync cycle.

use crate::action::ActionResult;
use crate::geom::Point;
use crate::ids::{EntityId, MessageId};
use crate::info::EntityInfo;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// A message spoken by another character, heard by this agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservedMessage {
    pub message_id: MessageId,
    pub speaker_entity_id: EntityId,
    pub speaker_name: String,
    pub message: String,
    pub time: f64,
    pub speaker_location: Point,
    pub my_location: Point,
}

/// A message the agent itself spoke since the last sync.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelfSpokenMessage {
    pub message: String,
    pub location: Point,
    pub time: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// A private thought the agent recorded since the last sync.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelfThought {
    pub thought: String,
    pub location: Point,
    pub time: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// A movement the agent performed or started since the last sync.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementRecord {
    pub started_at_time: f64,
    pub start_point: Point,
    pub end_point: Point,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// An action the agent performed on another entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionOnEntityRecord {
    pub started_at_time: f64,
    pub action_id: Uuid,
    pub target_entity_id: EntityId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// An action the agent performed on one of its inventory items.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionOnItemRecord {
    pub started_at_time: f64,
    pub action_id: Uuid,
    pub config_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// A craft the agent performed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CraftItemRecord {
    pub started_at_time: f64,
    pub config_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// An agent-relevant entry from the global activity stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEntryRecord {
    pub time: f64,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_entity_id: Option<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_location: Option<Point>,
}

/// Error captured from a script the agent previously submitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptExecutionError {
    pub script_id: Uuid,
    pub error: String,
}

/// The delta of world information delivered to an agent for one sync cycle.
/// Built fresh per cycle from the pending accumulator; immutable once sent.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Observations {
    /// Entities observed in range, keyed by entity id (last write wins
    /// within the observation window).
    pub entities_by_id: HashMap<EntityId, EntityInfo>,
    pub spoken_messages: Vec<ObservedMessage>,
    pub self_spoken_messages: Vec<SelfSpokenMessage>,
    pub self_thoughts: Vec<SelfThought>,
    pub movement_records: Vec<MovementRecord>,
    pub action_on_entity_records: Vec<ActionOnEntityRecord>,
    pub action_on_item_records: Vec<ActionOnItemRecord>,
    pub craft_item_records: Vec<CraftItemRecord>,
    pub activity_entries: Vec<ActivityEntryRecord>,
    pub script_execution_errors: Vec<ScriptExecutionError>,
    pub action_results: Vec<ActionResult>,
    pub started_action_ids: Vec<Uuid>,
}

impl Observations {
    /// True when nothing was observed since the previous cutoff.
    pub fn is_empty(&self) -> bool {
        self.entities_by_id.is_empty()
            && self.spoken_messages.is_empty()
            && self.self_spoken_messages.is_empty()
            && self.self_thoughts.is_empty()
            && self.movement_records.is_empty()
            && self.action_on_entity_records.is_empty()
            && self.action_on_item_records.is_empty()
            && self.craft_item_records.is_empty()
            && self.activity_entries.is_empty()
            && self.script_execution_errors.is_empty()
            && self.action_results.is_empty()
            && self.started_action_ids.is_empty()
    }
}
