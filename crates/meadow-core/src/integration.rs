//! Per-agent integration: the sync cycle and response routing.

use crate::error::MeadowCoreError;
use crate::observation::{build_crafting_recipes, build_entity_info, build_self_info, record_observations};
use crate::script_host::IntegrationScriptHost;
use crate::service::AgentService;
use crate::state::{AgentState, SyncPhase};
use chrono::Utc;
use log::{debug, warn};
use meadow_config::MeadowConfig;
use meadow_protocol::{
    AgentId, AgentSyncOutput, AgentSyncRequest, EntityId, ScriptExecutionError,
};
use meadow_script::{
    CancellationToken, ScriptBindings, ScriptEngine, ScriptOutcome, ScriptRunner,
};
use meadow_sim::{Simulation, World};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Binds one agent-controlled entity to the decision service.
///
/// Owns the agent's sync state machine, its pending observations, its action
/// queue, and its script runner. Sync cycles are strictly sequential per
/// agent: a new cycle is refused while one is awaiting a response.
pub struct AgentIntegration {
    pub(crate) sim: Arc<Simulation>,
    pub(crate) entity_id: EntityId,
    pub(crate) agent_id: AgentId,
    pub(crate) agent_type: String,
    pub(crate) service: Arc<dyn AgentService>,
    pub(crate) runner: ScriptRunner,
    pub(crate) state: Arc<Mutex<AgentState>>,
    pub(crate) config: MeadowConfig,
}

impl AgentIntegration {
    pub fn new(
        sim: Arc<Simulation>,
        entity_id: EntityId,
        agent_type: impl Into<String>,
        service: Arc<dyn AgentService>,
        engine: Arc<dyn ScriptEngine>,
        config: MeadowConfig,
    ) -> Arc<Self> {
        let state = Arc::new(Mutex::new(AgentState::new(
            config.observation.default_observation_distance,
        )));

        // Script failures feed back into the next sync as observations.
        let outcome_state = state.clone();
        let runner = ScriptRunner::new(
            engine,
            Duration::from_secs_f64(config.script.cancel_grace_secs),
            Duration::from_millis(config.script.cancel_poll_ms),
        )
        .with_on_outcome(Arc::new(move |script_id, outcome| {
            if let ScriptOutcome::Failed(message) = outcome {
                outcome_state
                    .lock()
                    .pending
                    .script_execution_errors
                    .push(ScriptExecutionError {
                        script_id,
                        error: message.clone(),
                    });
            }
        }));

        Arc::new(Self {
            sim,
            entity_id,
            agent_id: AgentId::new(),
            agent_type: agent_type.into(),
            service,
            runner,
            state,
            config,
        })
    }

    pub fn agent_id(&self) -> AgentId {
        self.agent_id
    }

    pub fn entity_id(&self) -> EntityId {
        self.entity_id
    }

    pub fn state(&self) -> &Arc<Mutex<AgentState>> {
        &self.state
    }

    pub fn has_running_script(&self) -> bool {
        self.runner.has_running_script()
    }

    pub fn most_recent_completed_script_id(&self) -> Option<Uuid> {
        self.runner.most_recent_completed_script_id()
    }

    /// Fold current observations into the pending accumulator. Called per
    /// tick and again at sync entry.
    pub fn record_observations_now(&self) {
        let world = self.sim.world();
        let mut state = self.state.lock();
        record_observations(
            &world,
            self.entity_id,
            &mut state,
            self.config.observation.message_retention_time,
        );
    }

    /// Run one sync cycle: snapshot, send, route the response.
    pub async fn sync(&self) -> Result<(), MeadowCoreError> {
        let request = {
            let world = self.sim.world();
            let mut state = self.state.lock();
            if state.phase == SyncPhase::AwaitingResponse {
                debug!("sync already in flight (agent_id={})", self.agent_id);
                return Ok(());
            }
            if world.pause_agents() {
                state.phase = SyncPhase::Paused;
                state.status = "paused".to_string();
                return Ok(());
            }
            record_observations(
                &world,
                self.entity_id,
                &mut state,
                self.config.observation.message_retention_time,
            );
            let Some(self_info) =
                build_self_info(&world, self.entity_id, state.observation_distance)
            else {
                debug!("sync skipped, entity gone (agent_id={})", self.agent_id);
                return Ok(());
            };
            let new_observations = std::mem::take(&mut state.pending);
            state.phase = SyncPhase::AwaitingResponse;
            state.status = "waiting_for_agent".to_string();
            state.total_request_count += 1;
            AgentSyncRequest {
                sync_id: Uuid::new_v4(),
                agent_id: self.agent_id,
                agent_type: self.agent_type.clone(),
                simulation_id: self.sim.id(),
                simulation_time: world.time(),
                self_info,
                new_observations,
                constants: *world.constants(),
                most_recent_completed_script_id: self.runner.most_recent_completed_script_id(),
            }
        };

        // The network round trip happens outside every lock.
        match self.service.send_sync_request(request).await {
            Err(error) => {
                warn!("sync failed (agent_id={}): {error}", self.agent_id);
                self.sim.world().broadcast_alert(format!(
                    "agent sync failed (agent_id={}): {error}",
                    self.agent_id
                ));
                let mut state = self.state.lock();
                state.phase = SyncPhase::Errored;
                state.status = "idle".to_string();
                state.last_error = Some(error.to_string());
            }
            Ok(outputs) => {
                for output in outputs {
                    self.handle_output(output).await;
                }
                let mut state = self.state.lock();
                if state.phase != SyncPhase::Errored {
                    state.phase = SyncPhase::Idle;
                }
                state.status = "idle".to_string();
            }
        }
        Ok(())
    }

    async fn handle_output(&self, output: AgentSyncOutput) {
        {
            // Bookkeeping applies to every output, including errored ones.
            let mut state = self.state.lock();
            state.last_response_at = Some(Utc::now());
            if let Some(status) = output.status {
                state.agent_status = Some(status);
            }
            if let Some(debug_info) = output.debug_info {
                state.debug_info = Some(debug_info);
            }
            state.prompt_usages.extend(output.prompt_usages);
        }

        if let Some(error) = output.error {
            warn!("decision service error (agent_id={}): {error}", self.agent_id);
            self.sim.world().broadcast_alert(format!(
                "agent error (agent_id={}): {error}",
                self.agent_id
            ));
            let mut state = self.state.lock();
            state.phase = SyncPhase::Errored;
            state.last_error = Some(error);
            return;
        }

        if let Some(script) = output.script {
            // A script supersedes everything queued: drop pending actions
            // and snap any in-flight movement to a stationary endpoint. The
            // old script unwinds fully before the bindings are snapshotted,
            // so none of its mutations land after the snapshot.
            self.runner.stop_current_and_wait().await;
            let bindings = {
                let mut world = self.sim.world();
                let mut state = self.state.lock();
                state.phase = SyncPhase::ApplyingScript;
                state.pending_actions.clear();
                halt_movement(&mut world, self.entity_id);
                self.build_bindings(&world, state.observation_distance)
            };
            let token = Arc::new(CancellationToken::new());
            let host = Arc::new(IntegrationScriptHost::new(
                self.sim.clone(),
                self.entity_id,
                self.state.clone(),
                token.clone(),
            ));
            debug!(
                "starting script (agent_id={}, script_id={})",
                self.agent_id, script.script_id
            );
            self.runner.start_script(script, bindings, host, token).await;
            return;
        }

        if let Some(actions) = output.actions {
            // Actions likewise supersede the previous queue and any running
            // script. The script is stopped (forced after the grace period
            // if need be) before the queue installs, so a script and an
            // action are never live at the same time.
            self.runner.stop_current_and_wait().await;
            let mut world = self.sim.world();
            let mut state = self.state.lock();
            state.phase = SyncPhase::ApplyingActions;
            state.pending_actions.clear();
            halt_movement(&mut world, self.entity_id);
            debug!(
                "enqueueing actions (agent_id={}, count={})",
                self.agent_id,
                actions.len()
            );
            state.pending_actions.extend(actions);
        }
    }

    /// Fresh bindings for a script run. Nothing carries over between runs.
    fn build_bindings(&self, world: &World, observation_distance: f64) -> ScriptBindings {
        let self_info = build_self_info(world, self.entity_id, observation_distance);
        let my_location = world.resolve_position(self.entity_id);
        let observed_entities = match my_location {
            Some(my_location) => world
                .entities()
                .filter(|entity| entity.id != self.entity_id)
                .filter_map(|entity| {
                    let info = build_entity_info(world, entity, world.time())?;
                    (info.location.distance(my_location) <= observation_distance).then_some(info)
                })
                .collect(),
            None => Vec::new(),
        };
        let crafting_recipes = world
            .entity(self.entity_id)
            .map(|entity| build_crafting_recipes(world, entity))
            .unwrap_or_default();
        ScriptBindings {
            self_info,
            observed_entities,
            crafting_recipes,
        }
    }
}

/// Snap an entity's movement track to its current resolved position.
pub(crate) fn halt_movement(world: &mut World, entity_id: EntityId) {
    if let Some(position) = world.resolve_position(entity_id) {
        let _ = world.start_movement(entity_id, position);
    }
}
