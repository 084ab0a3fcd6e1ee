//! Action engine: strict per-agent FIFO execution of decision-service
//! actions, aligned to simulation ticks.

use crate::integration::AgentIntegration;
use crate::state::{ActiveAction, AgentState};
use log::debug;
use meadow_protocol::{
    Action, ActionOnEntityRecord, ActionOnItemRecord, ActionRequest, ActionResult,
    CraftItemRecord, EntityId, MovementRecord, Point, SelfSpokenMessage, SelfThought,
};
use meadow_sim::{
    CraftItemResult, DropItemResult, EquipItemResult, MoveResult, PickUpResult, UseToolResult,
    World,
};
use uuid::Uuid;

impl AgentIntegration {
    /// Advance the action queue by at most one action. Called every tick
    /// under the world lock.
    pub fn update_pending_actions(&self) {
        let mut world = self.sim.world();
        let mut state = self.state.lock();
        if state.active_action.is_some() {
            return;
        }
        let Some(request) = state.pending_actions.pop_front() else {
            return;
        };
        let action_id = request.action_id;
        state.pending.started_action_ids.push(action_id);

        if !world.try_begin_action(self.entity_id) {
            // Dead or otherwise unable to act. The action still gets closed.
            world.broadcast_alert(format!(
                "action skipped, entity unavailable (entity_id={})",
                self.entity_id
            ));
            finish_action(&mut world, &mut state, self.entity_id, action_id);
            return;
        }
        state.active_action = Some(ActiveAction {
            action_id,
            summary: format!("{:?}", request.action),
        });
        debug!(
            "action started (agent_id={}, action_id={action_id})",
            self.agent_id
        );
        self.perform_action(&mut world, &mut state, request);
    }

    fn perform_action(&self, world: &mut World, state: &mut AgentState, request: ActionRequest) {
        let entity_id = self.entity_id;
        let action_id = request.action_id;
        let reason = request.reason;
        let time = world.time();
        match request.action {
            Action::Speak { message } => {
                let location = world.resolve_position(entity_id).unwrap_or_default();
                match world.speak(entity_id, message.clone()) {
                    Ok(_) => state.pending.self_spoken_messages.push(SelfSpokenMessage {
                        message,
                        location,
                        time,
                        reason,
                    }),
                    Err(error) => world.broadcast_alert(format!("speak failed: {error}")),
                }
                finish_action(world, state, entity_id, action_id);
            }
            Action::RecordThought { thought } => {
                let location = world.resolve_position(entity_id).unwrap_or_default();
                state.pending.self_thoughts.push(SelfThought {
                    thought,
                    location,
                    time,
                    reason,
                });
                finish_action(world, state, entity_id, action_id);
            }
            Action::SetFacialExpression { emoji } => {
                if let Err(error) = world.set_facial_expression(entity_id, emoji) {
                    world.broadcast_alert(format!("set facial expression failed: {error}"));
                }
                finish_action(world, state, entity_id, action_id);
            }
            Action::Walk { target } => {
                self.perform_walk(world, state, action_id, target, reason);
            }
            Action::UseEquippedTool => {
                match world.use_equipped_tool(entity_id) {
                    UseToolResult::Success { tool_config_key } => {
                        state.pending.action_on_item_records.push(ActionOnItemRecord {
                            started_at_time: time,
                            action_id,
                            config_key: tool_config_key,
                            amount: None,
                            reason,
                        });
                    }
                    failure => {
                        self.report_failure(world, format!("use tool failed: {failure:?}"));
                    }
                }
                finish_action(world, state, entity_id, action_id);
            }
            Action::UseEquippedToolOnEntity { target_id } => {
                self.perform_action_on_entity(world, state, action_id, target_id, reason, true);
            }
            Action::PickUpEntity { target_id } => {
                self.perform_action_on_entity(world, state, action_id, target_id, reason, false);
            }
            Action::EquipItem {
                config_key,
                stack_index,
            } => {
                match world.equip_item(entity_id, &config_key, stack_index) {
                    EquipItemResult::Success => {
                        state.pending.action_on_item_records.push(ActionOnItemRecord {
                            started_at_time: time,
                            action_id,
                            config_key,
                            amount: None,
                            reason,
                        });
                    }
                    failure => {
                        self.report_failure(
                            world,
                            format!("equip failed (config_key={config_key}): {failure:?}"),
                        );
                    }
                }
                finish_action(world, state, entity_id, action_id);
            }
            Action::DropItem {
                config_key,
                stack_index,
                amount,
            } => {
                match world.drop_item(entity_id, &config_key, stack_index, amount) {
                    DropItemResult::Success => {
                        state.pending.action_on_item_records.push(ActionOnItemRecord {
                            started_at_time: time,
                            action_id,
                            config_key: config_key.clone(),
                            amount,
                            reason,
                        });
                        world.add_activity_entry(
                            Some(entity_id),
                            "dropped item",
                            Some(config_key),
                            true,
                            None,
                        );
                    }
                    failure => {
                        self.report_failure(
                            world,
                            format!("drop failed (config_key={config_key}): {failure:?}"),
                        );
                    }
                }
                finish_action(world, state, entity_id, action_id);
            }
            Action::CraftItem { config_key } => {
                match world.craft_item(entity_id, &config_key) {
                    CraftItemResult::Success => {
                        state.pending.craft_item_records.push(CraftItemRecord {
                            started_at_time: time,
                            config_key: config_key.clone(),
                            reason,
                        });
                        world.add_activity_entry(
                            Some(entity_id),
                            "crafted item",
                            Some(config_key),
                            true,
                            None,
                        );
                    }
                    failure => {
                        self.report_failure(
                            world,
                            format!("craft failed (config_key={config_key}): {failure:?}"),
                        );
                    }
                }
                finish_action(world, state, entity_id, action_id);
            }
        }
    }

    fn perform_walk(
        &self,
        world: &mut World,
        state: &mut AgentState,
        action_id: Uuid,
        target: Point,
        reason: Option<String>,
    ) {
        let entity_id = self.entity_id;
        let start_point = world.resolve_position(entity_id).unwrap_or_default();
        match world.start_movement(entity_id, target) {
            MoveResult::Success { movement_id } => {
                state.pending.movement_records.push(MovementRecord {
                    started_at_time: world.time(),
                    start_point,
                    end_point: target,
                    reason,
                });
                let state_arc = self.state.clone();
                queue_movement_wait(world, entity_id, movement_id, move |world| {
                    let mut state = state_arc.lock();
                    finish_action(world, &mut state, entity_id, action_id);
                });
            }
            failure => {
                self.report_failure(world, format!("walk failed: {failure:?}"));
                finish_action(world, state, entity_id, action_id);
            }
        }
    }

    /// Walk to a target entity and interact with it on arrival. Stale
    /// targets close the action with an alert, never an error.
    fn perform_action_on_entity(
        &self,
        world: &mut World,
        state: &mut AgentState,
        action_id: Uuid,
        target_id: EntityId,
        reason: Option<String>,
        use_tool: bool,
    ) {
        let entity_id = self.entity_id;
        let Some(target_location) = world.resolve_position(target_id) else {
            self.report_stale_target(world, target_id);
            finish_action(world, state, entity_id, action_id);
            return;
        };
        match world.start_movement(entity_id, target_location) {
            MoveResult::Success { movement_id } => {
                let state_arc = self.state.clone();
                queue_movement_wait(world, entity_id, movement_id, move |world| {
                    let mut state = state_arc.lock();
                    complete_entity_interaction(
                        world, &mut state, entity_id, action_id, target_id, reason, use_tool,
                    );
                    finish_action(world, &mut state, entity_id, action_id);
                });
            }
            failure => {
                self.report_failure(world, format!("approach failed: {failure:?}"));
                finish_action(world, state, entity_id, action_id);
            }
        }
    }

    fn report_failure(&self, world: &mut World, message: String) {
        world.broadcast_alert(message.clone());
        world.add_activity_entry(
            Some(self.entity_id),
            "action failed",
            Some(message),
            true,
            Some(self.entity_id),
        );
    }

    fn report_stale_target(&self, world: &mut World, target_id: EntityId) {
        let description = match world.destroyed_entity(target_id) {
            Some(_) => format!("target entity was destroyed (entity_id={target_id})"),
            None => format!("target entity does not exist (entity_id={target_id})"),
        };
        self.report_failure(world, description);
    }
}

/// Interact with the target after arriving next to it.
fn complete_entity_interaction(
    world: &mut World,
    state: &mut AgentState,
    entity_id: EntityId,
    action_id: Uuid,
    target_id: EntityId,
    reason: Option<String>,
    use_tool: bool,
) {
    let time = world.time();
    if world.entity(target_id).is_none() {
        let description = format!("target entity was destroyed (entity_id={target_id})");
        world.broadcast_alert(description.clone());
        world.add_activity_entry(
            Some(entity_id),
            "action failed",
            Some(description),
            true,
            Some(entity_id),
        );
        return;
    }
    if use_tool {
        match world.use_equipped_tool(entity_id) {
            UseToolResult::Success { tool_config_key } => {
                world.damage_entity(target_id, 10);
                state.pending.action_on_entity_records.push(ActionOnEntityRecord {
                    started_at_time: time,
                    action_id,
                    target_entity_id: target_id,
                    reason,
                });
                world.add_activity_entry(
                    Some(entity_id),
                    "used tool on entity",
                    Some(tool_config_key),
                    true,
                    None,
                );
            }
            failure => {
                world.broadcast_alert(format!("use tool failed: {failure:?}"));
            }
        }
    } else {
        match world.pick_up(entity_id, target_id) {
            PickUpResult::Success { config_key } => {
                state.pending.action_on_entity_records.push(ActionOnEntityRecord {
                    started_at_time: time,
                    action_id,
                    target_entity_id: target_id,
                    reason,
                });
                world.add_activity_entry(
                    Some(entity_id),
                    "picked up item",
                    Some(config_key),
                    true,
                    None,
                );
            }
            failure => {
                world.broadcast_alert(format!("pick up failed: {failure:?}"));
            }
        }
    }
}

/// Defer `on_arrival` until the movement resolves: keyframes exhausted at
/// the current time, the movement id superseded, or the entity dead.
pub(crate) fn queue_movement_wait(
    world: &mut World,
    entity_id: EntityId,
    movement_id: Uuid,
    on_arrival: impl FnOnce(&mut World) + Send + 'static,
) {
    world.queue_callback(
        move |world| match world.entity(entity_id) {
            Some(entity) => {
                entity.dead
                    || entity.position.as_ref().is_none_or(|position| {
                        position.movement_id != movement_id || position.is_done(world.time())
                    })
            }
            None => true,
        },
        on_arrival,
    );
}

/// Close an action: release the entity guard, clear the active slot, and
/// record exactly one result for the action id.
pub(crate) fn finish_action(
    world: &mut World,
    state: &mut AgentState,
    entity_id: EntityId,
    action_id: Uuid,
) {
    world.end_action(entity_id);
    state.active_action = None;
    state.pending.action_results.push(ActionResult { action_id });
    debug!("action finished (entity_id={entity_id}, action_id={action_id})");
}
