//! World activity stream.

use meadow_protocol::EntityId;

/// One entry in the world's activity stream.
///
/// Entries flagged `reportable_to_agents` feed agent observations; entries
/// with `only_observed_by` set are visible to that single agent.
#[derive(Debug, Clone)]
pub struct ActivityEntry {
    pub time: f64,
    pub source_entity_id: Option<EntityId>,
    pub title: String,
    pub message: Option<String>,
    pub reportable_to_agents: bool,
    pub only_observed_by: Option<EntityId>,
}
