//! World state and operations.
//!
//! All methods here run under the simulation lock held by the caller.

use crate::activity::ActivityEntry;
use crate::entity::{Entity, Keyframe, SpokenMessage};
use crate::error::SimError;
use crate::item::ItemConfig;
use crate::results::{
    CraftItemResult, DropItemResult, EquipItemResult, MoveResult, PickUpResult, UseToolResult,
};
use log::{debug, warn};
use meadow_protocol::{EntityId, MessageId, Point, WorldConstants};
use std::collections::HashMap;
use uuid::Uuid;

type Predicate = Box<dyn Fn(&World) -> bool + Send>;
type Continuation = Box<dyn FnOnce(&mut World) + Send>;

pub(crate) struct TickCallback {
    predicate: Predicate,
    continuation: Continuation,
}

/// Mutable world state. Owned by a [`crate::Simulation`] behind a mutex.
pub struct World {
    time: f64,
    constants: WorldConstants,
    entities: HashMap<EntityId, Entity>,
    destroyed_entities: HashMap<EntityId, Entity>,
    item_configs: HashMap<String, ItemConfig>,
    activity_stream: Vec<ActivityEntry>,
    alerts: Vec<String>,
    pause_agents: bool,
    pub(crate) callbacks: Vec<TickCallback>,
}

impl World {
    pub fn new(constants: WorldConstants) -> Self {
        Self {
            time: 0.0,
            constants,
            entities: HashMap::new(),
            destroyed_entities: HashMap::new(),
            item_configs: HashMap::new(),
            activity_stream: Vec::new(),
            alerts: Vec::new(),
            pause_agents: false,
            callbacks: Vec::new(),
        }
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub(crate) fn advance_time(&mut self, dt: f64) {
        self.time += dt;
    }

    pub fn constants(&self) -> &WorldConstants {
        &self.constants
    }

    pub fn pause_agents(&self) -> bool {
        self.pause_agents
    }

    pub fn set_pause_agents(&mut self, paused: bool) {
        self.pause_agents = paused;
    }

    // Entities

    pub fn spawn_entity(&mut self, entity: Entity) -> EntityId {
        let id = entity.id;
        debug!("entity spawned (entity_id={id})");
        self.entities.insert(id, entity);
        id
    }

    /// Remove an entity from the live set. It stays queryable through
    /// [`World::destroyed_entity`] for stale-reference diagnostics.
    pub fn remove_entity(&mut self, id: EntityId) {
        if let Some(mut entity) = self.entities.remove(&id) {
            entity.dead = true;
            self.destroyed_entities.insert(id, entity);
            debug!("entity removed (entity_id={id})");
        }
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    pub fn destroyed_entity(&self, id: EntityId) -> Option<&Entity> {
        self.destroyed_entities.get(&id)
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    // Items

    pub fn register_item_config(&mut self, config: ItemConfig) {
        self.item_configs.insert(config.key.clone(), config);
    }

    pub fn item_config(&self, key: &str) -> Option<&ItemConfig> {
        self.item_configs.get(key)
    }

    pub fn item_configs(&self) -> impl Iterator<Item = &ItemConfig> {
        self.item_configs.values()
    }

    // Movement

    /// Position of a live entity at the current simulation time.
    pub fn resolve_position(&self, id: EntityId) -> Option<Point> {
        self.entities
            .get(&id)
            .and_then(|entity| entity.position.as_ref())
            .and_then(|position| position.resolve(self.time))
    }

    /// Start moving an entity to `end`, replacing any in-flight track and
    /// movement id. Starting a movement to the current resolved position
    /// halts the entity in place.
    pub fn start_movement(&mut self, id: EntityId, end: Point) -> MoveResult {
        let time = self.time;
        let walk_speed = self.constants.walk_speed;
        let in_bounds = end.x.is_finite()
            && end.y.is_finite()
            && end.x >= 0.0
            && end.y >= 0.0
            && end.x <= self.constants.world_width
            && end.y <= self.constants.world_height;

        let Some(entity) = self.entities.get_mut(&id) else {
            return MoveResult::Busy;
        };
        if entity.dead {
            return MoveResult::Busy;
        }
        let Some(position) = entity.position.as_mut() else {
            return MoveResult::NoPosition;
        };
        if !in_bounds {
            return MoveResult::PathNotFound;
        }
        let Some(from) = position.resolve(time) else {
            return MoveResult::NoPosition;
        };

        let duration = if walk_speed > 0.0 {
            from.distance(end) / walk_speed
        } else {
            0.0
        };
        let movement_id = Uuid::new_v4();
        position.keyframes = vec![
            Keyframe { time, point: from },
            Keyframe {
                time: time + duration,
                point: end,
            },
        ];
        position.movement_id = movement_id;
        debug!(
            "movement started (entity_id={id}, end=({:.1}, {:.1}), duration={duration:.2})",
            end.x, end.y
        );
        MoveResult::Success { movement_id }
    }

    // Character actions

    /// Record a spoken message on the speaker's character component.
    pub fn speak(&mut self, id: EntityId, message: impl Into<String>) -> Result<MessageId, SimError> {
        let time = self.time;
        let location = self.resolve_position(id).unwrap_or_default();
        let entity = self
            .entities
            .get_mut(&id)
            .ok_or(SimError::EntityNotFound(id))?;
        let character = entity.character.as_mut().ok_or(SimError::MissingComponent {
            entity_id: id,
            component: "character",
        })?;
        let message_id = MessageId::new();
        character.recent_messages.push(SpokenMessage {
            message_id,
            message: message.into(),
            time,
            location,
        });
        Ok(message_id)
    }

    pub fn set_facial_expression(
        &mut self,
        id: EntityId,
        emoji: impl Into<String>,
    ) -> Result<(), SimError> {
        let entity = self
            .entities
            .get_mut(&id)
            .ok_or(SimError::EntityNotFound(id))?;
        let character = entity.character.as_mut().ok_or(SimError::MissingComponent {
            entity_id: id,
            component: "character",
        })?;
        character.facial_expression_emoji = Some(emoji.into());
        Ok(())
    }

    // Inventory

    pub fn equip_item(
        &mut self,
        id: EntityId,
        config_key: &str,
        stack_index: Option<usize>,
    ) -> EquipItemResult {
        let equippable = self
            .item_configs
            .get(config_key)
            .is_some_and(|config| config.equippable_as_tool);
        let Some(entity) = self.entities.get_mut(&id) else {
            return EquipItemResult::ItemNotInInventory;
        };
        let Some(inventory) = entity.inventory.as_ref() else {
            return EquipItemResult::ItemNotInInventory;
        };
        let held = match stack_index {
            Some(index) => match inventory.stacks.get(index) {
                Some(stack) if stack.config_key == config_key => true,
                Some(_) => return EquipItemResult::UnexpectedItemInStack,
                None => false,
            },
            None => inventory.amount_of(config_key) > 0,
        };
        if !held {
            return EquipItemResult::ItemNotInInventory;
        }
        if !equippable {
            return EquipItemResult::ItemCannotBeEquipped;
        }
        entity.equipped_tool_config_key = Some(config_key.to_string());
        EquipItemResult::Success
    }

    /// Drop items from an inventory, spawning an item entity at the
    /// dropper's current position.
    pub fn drop_item(
        &mut self,
        id: EntityId,
        config_key: &str,
        stack_index: Option<usize>,
        amount: Option<u32>,
    ) -> DropItemResult {
        let Some(location) = self.resolve_position(id) else {
            return DropItemResult::NoPosition;
        };
        let Some(entity) = self.entities.get_mut(&id) else {
            return DropItemResult::ItemNotInInventory;
        };
        let Some(inventory) = entity.inventory.as_mut() else {
            return DropItemResult::ItemNotInInventory;
        };
        if let Some(index) = stack_index {
            match inventory.stacks.get(index) {
                Some(stack) if stack.config_key != config_key => {
                    return DropItemResult::UnexpectedItemInStack;
                }
                None => return DropItemResult::ItemNotInInventory,
                Some(_) => {}
            }
        }
        let held = inventory.amount_of(config_key);
        if held == 0 {
            return DropItemResult::ItemNotInInventory;
        }
        let dropped = amount.unwrap_or(held);
        if dropped > held {
            return DropItemResult::AmountTooLarge;
        }
        inventory.remove(config_key, dropped);
        if entity.equipped_tool_config_key.as_deref() == Some(config_key)
            && inventory.amount_of(config_key) == 0
        {
            entity.equipped_tool_config_key = None;
        }

        let item_entity = Entity::new(EntityId::new())
            .at(location)
            .with_item(config_key, dropped);
        self.spawn_entity(item_entity);
        DropItemResult::Success
    }

    pub fn craft_item(&mut self, id: EntityId, config_key: &str) -> CraftItemResult {
        let Some(config) = self.item_configs.get(config_key) else {
            return CraftItemResult::UnknownItem;
        };
        let Some(cost) = config.craftable.clone() else {
            return CraftItemResult::ItemCannotBeCrafted;
        };
        let Some(inventory) = self
            .entities
            .get_mut(&id)
            .and_then(|entity| entity.inventory.as_mut())
        else {
            return CraftItemResult::CannotAfford;
        };
        let affordable = cost
            .entries
            .iter()
            .all(|(key, amount)| inventory.amount_of(key) >= *amount);
        if !affordable {
            return CraftItemResult::CannotAfford;
        }
        for (key, amount) in &cost.entries {
            inventory.remove(key, *amount);
        }
        inventory.add(config_key, 1);
        debug!("item crafted (entity_id={id}, config_key={config_key})");
        CraftItemResult::Success
    }

    pub fn use_equipped_tool(&mut self, id: EntityId) -> UseToolResult {
        let Some(entity) = self.entities.get(&id) else {
            return UseToolResult::Dead;
        };
        if entity.dead {
            return UseToolResult::Dead;
        }
        match &entity.equipped_tool_config_key {
            Some(key) => UseToolResult::Success {
                tool_config_key: key.clone(),
            },
            None => UseToolResult::NoToolEquipped,
        }
    }

    /// Pick up a world item entity into the picker's inventory. The item
    /// entity is removed from the live set.
    pub fn pick_up(&mut self, picker_id: EntityId, target_id: EntityId) -> PickUpResult {
        let Some(target) = self.entities.get(&target_id) else {
            return PickUpResult::TargetNotFound;
        };
        let Some(item) = target.item.clone() else {
            return PickUpResult::TargetNotAnItem;
        };
        let Some(inventory) = self
            .entities
            .get_mut(&picker_id)
            .and_then(|entity| entity.inventory.as_mut())
        else {
            return PickUpResult::NoInventory;
        };
        inventory.add(&item.config_key, item.amount);
        self.remove_entity(target_id);
        PickUpResult::Success {
            config_key: item.config_key,
        }
    }

    /// Apply damage to a damageable entity. At zero hp the entity is
    /// removed from the live set.
    pub fn damage_entity(&mut self, id: EntityId, amount: i32) {
        let Some(damageable) = self
            .entities
            .get_mut(&id)
            .and_then(|entity| entity.damageable.as_mut())
        else {
            return;
        };
        damageable.hp = (damageable.hp - amount).max(0);
        if damageable.hp == 0 {
            self.remove_entity(id);
        }
    }

    // Activity stream and alerts

    pub fn add_activity_entry(
        &mut self,
        source_entity_id: Option<EntityId>,
        title: impl Into<String>,
        message: Option<String>,
        reportable_to_agents: bool,
        only_observed_by: Option<EntityId>,
    ) {
        self.activity_stream.push(ActivityEntry {
            time: self.time,
            source_entity_id,
            title: title.into(),
            message,
            reportable_to_agents,
            only_observed_by,
        });
    }

    pub fn activity_stream(&self) -> &[ActivityEntry] {
        &self.activity_stream
    }

    /// Surface a user-visible non-fatal notice.
    pub fn broadcast_alert(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("alert: {message}");
        self.alerts.push(message);
    }

    pub fn alerts(&self) -> &[String] {
        &self.alerts
    }

    // Action guard

    /// True if the entity exists, is alive, and has no action in progress.
    pub fn is_available_to_act(&self, id: EntityId) -> bool {
        self.entities
            .get(&id)
            .is_some_and(|entity| !entity.dead && !entity.in_progress_action)
    }

    /// Atomically check availability and mark an action in progress.
    pub fn try_begin_action(&mut self, id: EntityId) -> bool {
        match self.entities.get_mut(&id) {
            Some(entity) if !entity.dead && !entity.in_progress_action => {
                entity.in_progress_action = true;
                true
            }
            _ => false,
        }
    }

    pub fn end_action(&mut self, id: EntityId) {
        if let Some(entity) = self.entities.get_mut(&id) {
            entity.in_progress_action = false;
        }
    }

    // Tick callbacks

    /// Defer `continuation` until the first tick where `predicate` holds.
    /// Each callback fires at most once.
    pub fn queue_callback(
        &mut self,
        predicate: impl Fn(&World) -> bool + Send + 'static,
        continuation: impl FnOnce(&mut World) + Send + 'static,
    ) {
        self.callbacks.push(TickCallback {
            predicate: Box::new(predicate),
            continuation: Box::new(continuation),
        });
    }

    pub(crate) fn fire_ready_callbacks(&mut self) {
        let callbacks = std::mem::take(&mut self.callbacks);
        let mut remaining = Vec::new();
        let mut ready = Vec::new();
        for callback in callbacks {
            if (callback.predicate)(self) {
                ready.push(callback.continuation);
            } else {
                remaining.push(callback);
            }
        }
        for continuation in ready {
            continuation(self);
        }
        // Continuations may have queued new callbacks; keep both.
        remaining.append(&mut self.callbacks);
        self.callbacks = remaining;
    }
}
