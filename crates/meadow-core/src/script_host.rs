//! World capabilities handed to running scripts.

use crate::actions::queue_movement_wait;
use crate::state::AgentState;
use log::debug;
use meadow_protocol::{
    ActionOnEntityRecord, ActionOnItemRecord, CraftItemRecord, EntityId, MovementRecord, Point,
    SelfSpokenMessage, SelfThought,
};
use meadow_script::{CancellationToken, ScriptError, ScriptHost};
use meadow_sim::{
    CraftItemResult, DropItemResult, EquipItemResult, MoveResult, PickUpResult, Simulation,
    UseToolResult,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

const BLOCK_POLL: Duration = Duration::from_millis(50);

/// Host handle for one script run. Every world mutation re-enters the
/// simulation lock and checks the cancellation token first; once the token
/// is forced, the handle is fenced and every call fails fast.
pub struct IntegrationScriptHost {
    sim: Arc<Simulation>,
    entity_id: EntityId,
    state: Arc<Mutex<AgentState>>,
    token: Arc<CancellationToken>,
}

impl IntegrationScriptHost {
    pub fn new(
        sim: Arc<Simulation>,
        entity_id: EntityId,
        state: Arc<Mutex<AgentState>>,
        token: Arc<CancellationToken>,
    ) -> Self {
        Self {
            sim,
            entity_id,
            state,
            token,
        }
    }

    fn check_token(&self) -> Result<(), ScriptError> {
        if self.token.is_forced() {
            return Err(ScriptError::Interrupted);
        }
        if self.token.is_stop_requested() {
            return Err(ScriptError::Cancelled);
        }
        Ok(())
    }

    /// Block the worker thread until the receiver fires or the token trips.
    fn block_on(&self, receiver: &mpsc::Receiver<()>) -> Result<(), ScriptError> {
        loop {
            self.check_token()?;
            match receiver.recv_timeout(BLOCK_POLL) {
                Ok(()) => return Ok(()),
                Err(mpsc::RecvTimeoutError::Timeout) => continue,
                Err(mpsc::RecvTimeoutError::Disconnected) => {
                    return Err(ScriptError::Runtime("simulation dropped waiter".to_string()));
                }
            }
        }
    }
}

impl ScriptHost for IntegrationScriptHost {
    fn speak(&self, message: &str) -> Result<(), ScriptError> {
        self.check_token()?;
        let mut world = self.sim.world();
        let time = world.time();
        let location = world.resolve_position(self.entity_id).unwrap_or_default();
        world
            .speak(self.entity_id, message)
            .map_err(|error| ScriptError::Runtime(error.to_string()))?;
        self.state.lock().pending.self_spoken_messages.push(SelfSpokenMessage {
            message: message.to_string(),
            location,
            time,
            reason: None,
        });
        Ok(())
    }

    fn record_thought(&self, thought: &str) -> Result<(), ScriptError> {
        self.check_token()?;
        let world = self.sim.world();
        let time = world.time();
        let location = world.resolve_position(self.entity_id).unwrap_or_default();
        self.state.lock().pending.self_thoughts.push(SelfThought {
            thought: thought.to_string(),
            location,
            time,
            reason: None,
        });
        Ok(())
    }

    fn set_facial_expression(&self, emoji: &str) -> Result<(), ScriptError> {
        self.check_token()?;
        self.sim
            .world()
            .set_facial_expression(self.entity_id, emoji)
            .map_err(|error| ScriptError::Runtime(error.to_string()))
    }

    fn walk_to(&self, target: Point) -> Result<(), ScriptError> {
        self.check_token()?;
        let (sender, receiver) = mpsc::channel();
        {
            let mut world = self.sim.world();
            let start_point = world.resolve_position(self.entity_id).unwrap_or_default();
            let movement_id = match world.start_movement(self.entity_id, target) {
                MoveResult::Success { movement_id } => movement_id,
                failure => {
                    return Err(ScriptError::Runtime(format!("walk failed: {failure:?}")));
                }
            };
            self.state.lock().pending.movement_records.push(MovementRecord {
                started_at_time: world.time(),
                start_point,
                end_point: target,
                reason: None,
            });
            queue_movement_wait(&mut world, self.entity_id, movement_id, move |_world| {
                let _ = sender.send(());
            });
        }
        debug!("script walking (entity_id={})", self.entity_id);
        self.block_on(&receiver)
    }

    fn craft_item(&self, config_key: &str) -> Result<(), ScriptError> {
        self.check_token()?;
        let mut world = self.sim.world();
        let time = world.time();
        match world.craft_item(self.entity_id, config_key) {
            CraftItemResult::Success => {
                self.state.lock().pending.craft_item_records.push(CraftItemRecord {
                    started_at_time: time,
                    config_key: config_key.to_string(),
                    reason: None,
                });
                Ok(())
            }
            failure => Err(ScriptError::Runtime(format!(
                "craft failed (config_key={config_key}): {failure:?}"
            ))),
        }
    }

    fn equip_item(&self, config_key: &str) -> Result<(), ScriptError> {
        self.check_token()?;
        let mut world = self.sim.world();
        let time = world.time();
        match world.equip_item(self.entity_id, config_key, None) {
            EquipItemResult::Success => {
                self.state.lock().pending.action_on_item_records.push(ActionOnItemRecord {
                    started_at_time: time,
                    action_id: Uuid::new_v4(),
                    config_key: config_key.to_string(),
                    amount: None,
                    reason: None,
                });
                Ok(())
            }
            failure => Err(ScriptError::Runtime(format!(
                "equip failed (config_key={config_key}): {failure:?}"
            ))),
        }
    }

    fn drop_item(&self, config_key: &str, amount: Option<u32>) -> Result<(), ScriptError> {
        self.check_token()?;
        let mut world = self.sim.world();
        let time = world.time();
        match world.drop_item(self.entity_id, config_key, None, amount) {
            DropItemResult::Success => {
                self.state.lock().pending.action_on_item_records.push(ActionOnItemRecord {
                    started_at_time: time,
                    action_id: Uuid::new_v4(),
                    config_key: config_key.to_string(),
                    amount,
                    reason: None,
                });
                Ok(())
            }
            failure => Err(ScriptError::Runtime(format!(
                "drop failed (config_key={config_key}): {failure:?}"
            ))),
        }
    }

    fn use_equipped_tool(&self) -> Result<(), ScriptError> {
        self.check_token()?;
        let mut world = self.sim.world();
        let time = world.time();
        match world.use_equipped_tool(self.entity_id) {
            UseToolResult::Success { tool_config_key } => {
                self.state.lock().pending.action_on_item_records.push(ActionOnItemRecord {
                    started_at_time: time,
                    action_id: Uuid::new_v4(),
                    config_key: tool_config_key,
                    amount: None,
                    reason: None,
                });
                Ok(())
            }
            failure => Err(ScriptError::Runtime(format!("use tool failed: {failure:?}"))),
        }
    }

    fn pick_up(&self, target_id: EntityId) -> Result<(), ScriptError> {
        self.check_token()?;
        let mut world = self.sim.world();
        let time = world.time();
        match world.pick_up(self.entity_id, target_id) {
            PickUpResult::Success { .. } => {
                self.state.lock().pending.action_on_entity_records.push(ActionOnEntityRecord {
                    started_at_time: time,
                    action_id: Uuid::new_v4(),
                    target_entity_id: target_id,
                    reason: None,
                });
                Ok(())
            }
            failure => Err(ScriptError::Runtime(format!(
                "pick up failed (entity_id={target_id}): {failure:?}"
            ))),
        }
    }

    fn wait_ticks(&self, ticks: u32) -> Result<(), ScriptError> {
        self.check_token()?;
        if ticks == 0 {
            return Ok(());
        }
        let (sender, receiver) = mpsc::channel();
        {
            let mut world = self.sim.world();
            let remaining = AtomicI64::new(ticks as i64);
            world.queue_callback(
                move |_world| remaining.fetch_sub(1, Ordering::SeqCst) <= 1,
                move |_world| {
                    let _ = sender.send(());
                },
            );
        }
        self.block_on(&receiver)
    }
}
