//! Item configuration.

/// Recipe cost for a craftable item.
#[derive(Debug, Clone)]
pub struct CraftingCost {
    /// Pairs of item config key and required amount.
    pub entries: Vec<(String, u32)>,
}

/// Static configuration for one item kind.
#[derive(Debug, Clone)]
pub struct ItemConfig {
    pub key: String,
    pub name: String,
    pub equippable_as_tool: bool,
    pub craftable: Option<CraftingCost>,
}

impl ItemConfig {
    pub fn new(key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            equippable_as_tool: false,
            craftable: None,
        }
    }

    pub fn as_tool(mut self) -> Self {
        self.equippable_as_tool = true;
        self
    }

    pub fn craftable_for(mut self, entries: Vec<(String, u32)>) -> Self {
        self.craftable = Some(CraftingCost { entries });
        self
    }
}
