//! Entities and their optional components.

use meadow_protocol::{EntityId, MessageId, Point};
use uuid::Uuid;

/// One point on a position track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keyframe {
    pub time: f64,
    pub point: Point,
}

/// Keyframe-animated position. The track is replaced wholesale whenever a
/// new movement starts, along with the movement id.
#[derive(Debug, Clone)]
pub struct PositionComponent {
    pub keyframes: Vec<Keyframe>,
    pub movement_id: Uuid,
}

impl PositionComponent {
    /// A stationary track at a fixed point.
    pub fn stationary(point: Point) -> Self {
        Self {
            keyframes: vec![Keyframe { time: 0.0, point }],
            movement_id: Uuid::new_v4(),
        }
    }

    /// Position at `time`, interpolating between keyframes and clamping to
    /// the track's endpoints.
    pub fn resolve(&self, time: f64) -> Option<Point> {
        let first = self.keyframes.first()?;
        if time <= first.time {
            return Some(first.point);
        }
        let last = self.keyframes.last()?;
        if time >= last.time {
            return Some(last.point);
        }
        for pair in self.keyframes.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if time >= a.time && time <= b.time {
                let span = b.time - a.time;
                let fraction = if span > 0.0 { (time - a.time) / span } else { 1.0 };
                return Some(a.point.lerp(b.point, fraction));
            }
        }
        Some(last.point)
    }

    /// True once the track has no keyframes beyond `time`.
    pub fn is_done(&self, time: f64) -> bool {
        match self.keyframes.last() {
            Some(last) => time >= last.time,
            None => true,
        }
    }
}

/// A message a character spoke, kept on the character for later observation.
#[derive(Debug, Clone)]
pub struct SpokenMessage {
    pub message_id: MessageId,
    pub message: String,
    pub time: f64,
    pub location: Point,
}

/// Character state for agent-controllable and NPC entities.
#[derive(Debug, Clone)]
pub struct CharacterComponent {
    pub name: String,
    pub personality: String,
    pub recent_messages: Vec<SpokenMessage>,
    pub facial_expression_emoji: Option<String>,
}

impl CharacterComponent {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            personality: String::new(),
            recent_messages: Vec::new(),
            facial_expression_emoji: None,
        }
    }
}

/// Component for entities that are themselves items lying in the world.
#[derive(Debug, Clone)]
pub struct ItemComponent {
    pub config_key: String,
    pub amount: u32,
}

/// One stack in an inventory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemStack {
    pub config_key: String,
    pub amount: u32,
}

/// Inventory of item stacks.
#[derive(Debug, Clone, Default)]
pub struct InventoryComponent {
    pub stacks: Vec<ItemStack>,
}

impl InventoryComponent {
    /// Total amount held across all stacks of one item kind.
    pub fn amount_of(&self, config_key: &str) -> u32 {
        self.stacks
            .iter()
            .filter(|stack| stack.config_key == config_key)
            .map(|stack| stack.amount)
            .sum()
    }

    /// Add to an existing stack of this kind, or start a new one.
    pub fn add(&mut self, config_key: &str, amount: u32) {
        if let Some(stack) = self
            .stacks
            .iter_mut()
            .find(|stack| stack.config_key == config_key)
        {
            stack.amount += amount;
        } else {
            self.stacks.push(ItemStack {
                config_key: config_key.to_string(),
                amount,
            });
        }
    }

    /// Remove up to `amount` of this kind. Returns false (without mutating)
    /// if not enough is held.
    pub fn remove(&mut self, config_key: &str, amount: u32) -> bool {
        if self.amount_of(config_key) < amount {
            return false;
        }
        let mut remaining = amount;
        for stack in &mut self.stacks {
            if stack.config_key != config_key || remaining == 0 {
                continue;
            }
            let taken = stack.amount.min(remaining);
            stack.amount -= taken;
            remaining -= taken;
        }
        self.stacks.retain(|stack| stack.amount > 0);
        true
    }
}

/// Hit points for destructible entities.
#[derive(Debug, Clone, Copy)]
pub struct DamageableComponent {
    pub hp: i32,
    pub max_hp: i32,
}

/// One world entity. Components are optional; an entity has whichever
/// aspects apply to it.
#[derive(Debug, Clone)]
pub struct Entity {
    pub id: EntityId,
    pub position: Option<PositionComponent>,
    pub character: Option<CharacterComponent>,
    pub item: Option<ItemComponent>,
    pub inventory: Option<InventoryComponent>,
    pub damageable: Option<DamageableComponent>,
    pub equipped_tool_config_key: Option<String>,
    pub dead: bool,
    /// Set while an agent action is executing on this entity. Only touched
    /// through `World::try_begin_action` / `World::end_action`.
    pub in_progress_action: bool,
}

impl Entity {
    pub fn new(id: EntityId) -> Self {
        Self {
            id,
            position: None,
            character: None,
            item: None,
            inventory: None,
            damageable: None,
            equipped_tool_config_key: None,
            dead: false,
            in_progress_action: false,
        }
    }

    pub fn at(mut self, point: Point) -> Self {
        self.position = Some(PositionComponent::stationary(point));
        self
    }

    pub fn with_character(mut self, character: CharacterComponent) -> Self {
        self.character = Some(character);
        self
    }

    pub fn with_inventory(mut self, inventory: InventoryComponent) -> Self {
        self.inventory = Some(inventory);
        self
    }

    pub fn with_item(mut self, config_key: impl Into<String>, amount: u32) -> Self {
        self.item = Some(ItemComponent {
            config_key: config_key.into(),
            amount,
        });
        self
    }

    pub fn with_damageable(mut self, hp: i32, max_hp: i32) -> Self {
        self.damageable = Some(DamageableComponent { hp, max_hp });
        self
    }
}
