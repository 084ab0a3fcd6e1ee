//! Capabilities a running script may invoke, and the data it sees.

use crate::error::ScriptError;
use meadow_protocol::{CraftingRecipeInfo, EntityId, EntityInfo, Point, SelfInfo};

/// World capabilities exposed to a running script.
///
/// Implementations re-enter the simulation lock per call and check the
/// script's cancellation token first, returning [`ScriptError::Cancelled`]
/// or [`ScriptError::Interrupted`] instead of touching the world.
/// Blocking calls (`walk_to`, `wait_ticks`) must also unblock promptly when
/// the token trips.
pub trait ScriptHost: Send + Sync {
    fn speak(&self, message: &str) -> Result<(), ScriptError>;
    fn record_thought(&self, thought: &str) -> Result<(), ScriptError>;
    fn set_facial_expression(&self, emoji: &str) -> Result<(), ScriptError>;
    /// Walk to `target` and block until arrival.
    fn walk_to(&self, target: Point) -> Result<(), ScriptError>;
    fn craft_item(&self, config_key: &str) -> Result<(), ScriptError>;
    fn equip_item(&self, config_key: &str) -> Result<(), ScriptError>;
    fn drop_item(&self, config_key: &str, amount: Option<u32>) -> Result<(), ScriptError>;
    fn use_equipped_tool(&self) -> Result<(), ScriptError>;
    fn pick_up(&self, target_id: EntityId) -> Result<(), ScriptError>;
    /// Block for a number of simulation ticks.
    fn wait_ticks(&self, ticks: u32) -> Result<(), ScriptError>;
}

/// Snapshot handed to a script at start. Rebuilt fresh for every invocation,
/// so nothing leaks between script runs.
#[derive(Debug, Clone, Default)]
pub struct ScriptBindings {
    pub self_info: Option<SelfInfo>,
    pub observed_entities: Vec<EntityInfo>,
    pub crafting_recipes: Vec<CraftingRecipeInfo>,
}

impl ScriptBindings {
    /// Nearest observed item entity of the given kind, by distance from the
    /// script's own position.
    pub fn nearest_item(&self, config_key: &str) -> Option<&EntityInfo> {
        let own_location = self
            .self_info
            .as_ref()
            .map(|info| info.entity_info.location)?;
        self.observed_entities
            .iter()
            .filter(|entity| {
                entity
                    .item_info
                    .as_ref()
                    .is_some_and(|item| item.config_key == config_key)
            })
            .min_by(|a, b| {
                let da = a.location.distance(own_location);
                let db = b.location.distance(own_location);
                da.total_cmp(&db)
            })
    }
}
