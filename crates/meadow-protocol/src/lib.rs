//! Wire and data types shared between the simulation side of the agent
//! pipeline and the remote decision service.
//!
//! Everything here is serde-serializable; the decision service speaks JSON.

pub mod action;
pub mod geom;
pub mod ids;
pub mod info;
pub mod observation;
pub mod sync;

pub use action::{Action, ActionRequest, ActionResult};
pub use geom::Point;
pub use ids::{AgentId, EntityId, MessageId, SimulationId};
pub use info::{
    CharacterInfo, CraftingRecipeInfo, DamageableInfo, EntityInfo, InventoryInfo, ItemInfo,
    ItemStackInfo, SelfInfo, WorldConstants,
};
pub use observation::{
    ActionOnEntityRecord, ActionOnItemRecord, ActivityEntryRecord, CraftItemRecord,
    MovementRecord, Observations, ObservedMessage, ScriptExecutionError, SelfSpokenMessage,
    SelfThought,
};
pub use sync::{
    AgentSyncOutput, AgentSyncRequest, AgentSyncResponse, PromptUsage, ScriptToRun, SyncId,
};
