//! Tick-based world simulation.
//!
//! A [`Simulation`] owns its [`World`] behind a single mutex; every
//! read-modify-write happens under that one lock. Time only advances through
//! [`Simulation::tick`], which also fires queued tick-aligned callbacks.

mod activity;
mod entity;
mod error;
mod item;
mod results;
mod simulation;
mod world;

pub use activity::ActivityEntry;
pub use entity::{
    CharacterComponent, DamageableComponent, Entity, InventoryComponent, ItemComponent,
    ItemStack, Keyframe, PositionComponent, SpokenMessage,
};
pub use error::SimError;
pub use item::{CraftingCost, ItemConfig};
pub use results::{
    CraftItemResult, DropItemResult, EquipItemResult, MoveResult, PickUpResult, UseToolResult,
};
pub use simulation::Simulation;
pub use world::World;
