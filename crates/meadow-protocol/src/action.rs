//! Discrete actions issued by the decision service.

use crate::geom::Point;
use crate::ids::EntityId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One closed-ended behavior request. Exactly one variant per action kind;
/// the decision service never mixes several behaviors in a single action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Say something out loud near the agent's position.
    Speak { message: String },
    /// Record a private thought, visible only to the agent itself.
    RecordThought { thought: String },
    /// Change the character's facial expression emoji.
    SetFacialExpression { emoji: String },
    /// Walk to a target point; completes when movement visibly finishes.
    Walk { target: Point },
    /// Use the currently equipped tool in place.
    UseEquippedTool,
    /// Walk to and use the equipped tool on a target entity.
    UseEquippedToolOnEntity { target_id: EntityId },
    /// Walk to and pick up a target entity.
    PickUpEntity { target_id: EntityId },
    /// Equip an inventory item by config key.
    EquipItem {
        config_key: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        stack_index: Option<usize>,
    },
    /// Drop an inventory item by config key.
    DropItem {
        config_key: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        stack_index: Option<usize>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        amount: Option<u32>,
    },
    /// Craft an item by config key.
    CraftItem { config_key: String },
}

/// Envelope for a single action: a unique id for result correlation and an
/// optional human-readable reason (logged, never semantically consumed).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRequest {
    pub action_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub action: Action,
}

impl ActionRequest {
    /// Wrap an action with a fresh id and no reason.
    pub fn new(action: Action) -> Self {
        Self {
            action_id: Uuid::new_v4(),
            reason: None,
            action,
        }
    }

    /// Wrap an action with a fresh id and a reason string.
    pub fn with_reason(action: Action, reason: impl Into<String>) -> Self {
        Self {
            action_id: Uuid::new_v4(),
            reason: Some(reason.into()),
            action,
        }
    }
}

/// Completion record for one action id. Exactly one result is produced per
/// issued action id, on success and failure paths alike.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResult {
    pub action_id: Uuid,
}
