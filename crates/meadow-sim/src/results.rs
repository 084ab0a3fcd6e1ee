//! Result enums for world operations.
//!
//! Failure modes that agents can trigger with stale or invalid requests are
//! ordinary enum variants, not errors. Callers map them to activity entries
//! and alerts.

use uuid::Uuid;

/// Outcome of starting a movement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveResult {
    /// Movement started; the id supersedes any previous track.
    Success { movement_id: Uuid },
    /// Target is outside the walkable world.
    PathNotFound,
    /// The entity has no position component.
    NoPosition,
    /// The entity is dead or missing.
    Busy,
}

/// Outcome of equipping an inventory item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EquipItemResult {
    Success,
    ItemNotInInventory,
    ItemCannotBeEquipped,
    UnexpectedItemInStack,
}

/// Outcome of dropping an inventory item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropItemResult {
    Success,
    ItemNotInInventory,
    AmountTooLarge,
    UnexpectedItemInStack,
    NoPosition,
}

/// Outcome of crafting an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CraftItemResult {
    Success,
    UnknownItem,
    ItemCannotBeCrafted,
    CannotAfford,
}

/// Outcome of using the equipped tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UseToolResult {
    Success { tool_config_key: String },
    NoToolEquipped,
    Dead,
}

/// Outcome of picking up a world item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickUpResult {
    Success { config_key: String },
    TargetNotFound,
    TargetNotAnItem,
    NoInventory,
}
