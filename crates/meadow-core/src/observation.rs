//! Observation aggregation.
//!
//! Runs under the world lock at sync entry. Mutates nothing on the world;
//! the only agent-side mutations are the message dedup set and the activity
//! cutoff.

use crate::state::AgentState;
use log::debug;
use meadow_protocol::{
    ActivityEntryRecord, CharacterInfo, CraftingRecipeInfo, DamageableInfo, EntityInfo,
    EntityId, InventoryInfo, ItemInfo, ItemStackInfo, ObservedMessage, SelfInfo,
};
use meadow_sim::{Entity, World};

/// Snapshot record for one observed entity at the current simulation time.
pub fn build_entity_info(world: &World, entity: &Entity, time: f64) -> Option<EntityInfo> {
    let location = entity.position.as_ref()?.resolve(time)?;
    let item_info = entity.item.as_ref().map(|item| {
        let config = world.item_config(&item.config_key);
        ItemInfo {
            config_key: item.config_key.clone(),
            name: config.map(|c| c.name.clone()).unwrap_or_default(),
            description: String::new(),
            can_be_picked_up: true,
            amount: item.amount,
        }
    });
    let character_info = entity.character.as_ref().map(|character| CharacterInfo {
        name: character.name.clone(),
        description: character.personality.clone(),
        equipped_item_info: entity.equipped_tool_config_key.as_ref().and_then(|key| {
            world.item_config(key).map(|config| ItemInfo {
                config_key: config.key.clone(),
                name: config.name.clone(),
                description: String::new(),
                can_be_picked_up: false,
                amount: 1,
            })
        }),
        facial_expression_emoji: character.facial_expression_emoji.clone(),
    });
    let damageable_info = entity.damageable.map(|damageable| DamageableInfo {
        hp: damageable.hp,
        damageable_by_tool_config_key: None,
    });
    Some(EntityInfo {
        entity_id: entity.id,
        observed_at_simulation_time: time,
        location,
        item_info,
        character_info,
        damageable_info,
    })
}

/// Self-state snapshot for a sync request or fresh script bindings.
pub fn build_self_info(
    world: &World,
    entity_id: EntityId,
    observation_distance: f64,
) -> Option<SelfInfo> {
    let entity = world.entity(entity_id)?;
    let entity_info = build_entity_info(world, entity, world.time())?;
    let inventory = build_inventory_info(world, entity);
    Some(SelfInfo {
        entity_info,
        personality: entity
            .character
            .as_ref()
            .map(|character| character.personality.clone())
            .unwrap_or_default(),
        observation_distance,
        inventory,
        equipped_tool_config_key: entity.equipped_tool_config_key.clone(),
        available_crafting_recipes: build_crafting_recipes(world, entity),
    })
}

fn build_inventory_info(world: &World, entity: &Entity) -> InventoryInfo {
    let Some(inventory) = entity.inventory.as_ref() else {
        return InventoryInfo::default();
    };
    InventoryInfo {
        item_stacks: inventory
            .stacks
            .iter()
            .map(|stack| {
                let config = world.item_config(&stack.config_key);
                ItemStackInfo {
                    config_key: stack.config_key.clone(),
                    item_name: config.map(|c| c.name.clone()).unwrap_or_default(),
                    amount: stack.amount,
                    can_be_equipped: config.is_some_and(|c| c.equippable_as_tool),
                    can_be_dropped: true,
                    is_equipped: entity.equipped_tool_config_key.as_deref()
                        == Some(stack.config_key.as_str()),
                }
            })
            .collect(),
    }
}

/// Every craftable recipe in the world, with current affordability.
pub fn build_crafting_recipes(world: &World, entity: &Entity) -> Vec<CraftingRecipeInfo> {
    let mut recipes: Vec<CraftingRecipeInfo> = world
        .item_configs()
        .filter_map(|config| {
            let cost = config.craftable.as_ref()?;
            let can_currently_afford = entity.inventory.as_ref().is_some_and(|inventory| {
                cost.entries
                    .iter()
                    .all(|(key, amount)| inventory.amount_of(key) >= *amount)
            });
            Some(CraftingRecipeInfo {
                config_key: config.key.clone(),
                item_name: config.name.clone(),
                cost: cost.entries.clone(),
                can_currently_afford,
            })
        })
        .collect();
    recipes.sort_by(|a, b| a.config_key.cmp(&b.config_key));
    recipes
}

/// Fold everything observable since the last check into the agent's pending
/// accumulator, then advance the cutoff.
pub fn record_observations(
    world: &World,
    agent_entity_id: EntityId,
    state: &mut AgentState,
    message_retention_time: f64,
) {
    let time = world.time();
    let Some(my_location) = world.resolve_position(agent_entity_id) else {
        state.previous_check_time = time;
        return;
    };

    for entity in world.entities() {
        if entity.id == agent_entity_id {
            continue;
        }
        let Some(location) = entity
            .position
            .as_ref()
            .and_then(|position| position.resolve(time))
        else {
            continue;
        };
        if location.distance(my_location) > state.observation_distance {
            // An entity that has left the window is no longer observed, even
            // if an earlier pass recorded it.
            state.pending.entities_by_id.remove(&entity.id);
            continue;
        }
        if let Some(info) = build_entity_info(world, entity, time) {
            state.pending.entities_by_id.insert(entity.id, info);
        }

        // Spoken messages ride on the speaker's character component. Report
        // each message id at most once per agent, within the retention
        // window, from speakers heard in range.
        if let Some(character) = entity.character.as_ref() {
            for spoken in &character.recent_messages {
                if time - spoken.time > message_retention_time {
                    continue;
                }
                if spoken.location.distance(my_location) > state.observation_distance {
                    continue;
                }
                if !state.reported_message_ids.insert(spoken.message_id) {
                    continue;
                }
                state.pending.spoken_messages.push(ObservedMessage {
                    message_id: spoken.message_id,
                    speaker_entity_id: entity.id,
                    speaker_name: character.name.clone(),
                    message: spoken.message.clone(),
                    time: spoken.time,
                    speaker_location: spoken.location,
                    my_location,
                });
            }
        }
    }

    for entry in world.activity_stream() {
        if entry.time <= state.previous_check_time || !entry.reportable_to_agents {
            continue;
        }
        if entry
            .only_observed_by
            .is_some_and(|observer| observer != agent_entity_id)
        {
            continue;
        }
        let source_location = entry
            .source_entity_id
            .and_then(|source| world.resolve_position(source));
        state.pending.activity_entries.push(ActivityEntryRecord {
            time: entry.time,
            title: entry.title.clone(),
            message: entry.message.clone(),
            source_entity_id: entry.source_entity_id,
            source_location,
        });
    }

    debug!(
        "observations recorded (entity_id={agent_entity_id}, time={time:.2}, entities={}, messages={})",
        state.pending.entities_by_id.len(),
        state.pending.spoken_messages.len()
    );
    state.previous_check_time = time;
}
