//! Snapshot records describing entities, inventories, and world constants.

use crate::geom::Point;
use crate::ids::EntityId;
use serde::{Deserialize, Serialize};

/// Facts about an item entity lying in the world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemInfo {
    pub config_key: String,
    pub name: String,
    pub description: String,
    pub can_be_picked_up: bool,
    pub amount: u32,
}

/// Facts about a character entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterInfo {
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equipped_item_info: Option<ItemInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub facial_expression_emoji: Option<String>,
}

/// Facts about a damageable entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DamageableInfo {
    pub hp: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub damageable_by_tool_config_key: Option<String>,
}

/// Freshly rebuilt observation record for one entity. Stale entries are
/// fully replaced on re-observation, never merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityInfo {
    pub entity_id: EntityId,
    pub observed_at_simulation_time: f64,
    pub location: Point,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_info: Option<ItemInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character_info: Option<CharacterInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub damageable_info: Option<DamageableInfo>,
}

/// One stack in an inventory snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemStackInfo {
    pub config_key: String,
    pub item_name: String,
    pub amount: u32,
    pub can_be_equipped: bool,
    pub can_be_dropped: bool,
    pub is_equipped: bool,
}

/// Full inventory snapshot for the agent's own entity.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct InventoryInfo {
    pub item_stacks: Vec<ItemStackInfo>,
}

/// A crafting option available to the agent at sync time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CraftingRecipeInfo {
    pub config_key: String,
    pub item_name: String,
    pub cost: Vec<(String, u32)>,
    pub can_currently_afford: bool,
}

/// Self-state snapshot included in every sync request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelfInfo {
    pub entity_info: EntityInfo,
    pub personality: String,
    pub observation_distance: f64,
    pub inventory: InventoryInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equipped_tool_config_key: Option<String>,
    pub available_crafting_recipes: Vec<CraftingRecipeInfo>,
}

/// World constants the decision service needs for spatial reasoning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldConstants {
    pub world_width: f64,
    pub world_height: f64,
    pub walk_speed: f64,
}

impl Default for WorldConstants {
    fn default() -> Self {
        Self {
            world_width: 1000.0,
            world_height: 1000.0,
            walk_speed: 10.0,
        }
    }
}
