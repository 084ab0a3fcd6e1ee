//! World-building helpers.

use meadow_protocol::{EntityId, Point};
use meadow_sim::{CharacterComponent, Entity, InventoryComponent, ItemConfig, World};

/// Register a minimal item set: wood (raw material), stone (raw material),
/// and a craftable axe tool costing three wood.
pub fn register_basic_items(world: &mut World) {
    world.register_item_config(ItemConfig::new("wood", "Wood"));
    world.register_item_config(ItemConfig::new("stone", "Stone"));
    world.register_item_config(
        ItemConfig::new("axe", "Axe")
            .as_tool()
            .craftable_for(vec![("wood".to_string(), 3)]),
    );
}

/// Spawn a character with an empty inventory at a point.
pub fn spawn_character(world: &mut World, name: &str, at: Point) -> EntityId {
    world.spawn_entity(
        Entity::new(EntityId::new())
            .at(at)
            .with_character(CharacterComponent::new(name))
            .with_inventory(InventoryComponent::default()),
    )
}

/// Spawn an item entity lying in the world.
pub fn spawn_item(world: &mut World, config_key: &str, amount: u32, at: Point) -> EntityId {
    world.spawn_entity(
        Entity::new(EntityId::new())
            .at(at)
            .with_item(config_key, amount),
    )
}
