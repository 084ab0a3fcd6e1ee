//! End-to-end pipeline behavior: action execution, script routing, and the
//! sync state machine.

use meadow_config::{MeadowConfig, ScriptConfig};
use meadow_core::{AgentPipeline, SyncPhase};
use meadow_protocol::{
    Action, ActionRequest, AgentSyncOutput, EntityId, Point, ScriptToRun, WorldConstants,
};
use meadow_script::{
    CancellationToken, LineScriptEngine, ScriptBindings, ScriptEngine, ScriptHost, ScriptOutcome,
};
use meadow_sim::Simulation;
use meadow_test_utils::{register_basic_items, spawn_character, spawn_item, QueuedAgentService};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

fn setup_with_config(
    config: MeadowConfig,
    engine: Arc<dyn ScriptEngine>,
) -> (Arc<Simulation>, Arc<QueuedAgentService>, AgentPipeline) {
    let _ = env_logger::builder().is_test(true).try_init();
    let sim = Arc::new(Simulation::new(WorldConstants::default()));
    {
        let mut world = sim.world();
        register_basic_items(&mut world);
    }
    let service = Arc::new(QueuedAgentService::new());
    let pipeline = AgentPipeline::new(sim.clone(), service.clone(), engine, config);
    (sim, service, pipeline)
}

fn setup() -> (Arc<Simulation>, Arc<QueuedAgentService>, AgentPipeline) {
    setup_with_config(MeadowConfig::default(), Arc::new(LineScriptEngine))
}

fn script_output(script_id: Uuid, source: &str) -> AgentSyncOutput {
    AgentSyncOutput {
        script: Some(ScriptToRun {
            script_id,
            source: source.to_string(),
        }),
        ..AgentSyncOutput::default()
    }
}

#[tokio::test]
async fn action_queue_executes_strictly_in_order() {
    let (sim, service, pipeline) = setup();
    let agent_entity = {
        let mut world = sim.world();
        let agent = spawn_character(&mut world, "agent", Point { x: 0.0, y: 0.0 });
        let entity = world.entity_mut(agent).expect("agent");
        entity.inventory.as_mut().expect("inventory").add("wood", 3);
        agent
    };
    let integration = pipeline.register_agent(agent_entity, "npc");

    let speak = ActionRequest::new(Action::Speak {
        message: "hi".to_string(),
    });
    let walk = ActionRequest::new(Action::Walk {
        target: Point { x: 10.0, y: 10.0 },
    });
    let craft = ActionRequest::new(Action::CraftItem {
        config_key: "axe".to_string(),
    });
    let (speak_id, walk_id, craft_id) = (speak.action_id, walk.action_id, craft.action_id);
    service.push_outputs(vec![AgentSyncOutput {
        actions: Some(vec![speak, walk, craft]),
        ..AgentSyncOutput::default()
    }]);
    pipeline.sync_all().await.expect("sync");

    // Speak completes on the first tick.
    pipeline.tick(0.1);
    {
        let state = integration.state().lock();
        assert_eq!(state.pending.self_spoken_messages.len(), 1);
        assert_eq!(
            state.pending.action_results[0].action_id, speak_id,
            "speak resolves immediately"
        );
    }

    // Walk starts next; craft must not run while the walk is in flight.
    pipeline.tick(0.1);
    {
        let state = integration.state().lock();
        assert_eq!(state.pending.craft_item_records.len(), 0);
        assert_eq!(state.pending.action_results.len(), 1);
    }

    // (10,10) is ~14.14 units away at walk speed 10: the movement keyframes
    // are exhausted a little after t=1.6.
    for _ in 0..20 {
        pipeline.tick(0.1);
    }

    let state = integration.state().lock();
    let result_ids: Vec<Uuid> = state
        .pending
        .action_results
        .iter()
        .map(|result| result.action_id)
        .collect();
    assert_eq!(result_ids, vec![speak_id, walk_id, craft_id]);
    assert_eq!(
        state.pending.started_action_ids,
        vec![speak_id, walk_id, craft_id]
    );
    drop(state);

    let world = sim.world();
    let inventory = world
        .entity(agent_entity)
        .and_then(|entity| entity.inventory.as_ref())
        .expect("inventory");
    assert_eq!(inventory.amount_of("axe"), 1);
    assert_eq!(inventory.amount_of("wood"), 0);
}

#[tokio::test]
async fn script_supersedes_queued_actions_and_halts_movement() {
    let (sim, service, pipeline) = setup();
    let agent_entity = {
        let mut world = sim.world();
        spawn_character(&mut world, "agent", Point { x: 0.0, y: 0.0 })
    };
    let integration = pipeline.register_agent(agent_entity, "npc");

    let walk = ActionRequest::new(Action::Walk {
        target: Point { x: 100.0, y: 0.0 },
    });
    let walk_id = walk.action_id;
    let craft = ActionRequest::new(Action::CraftItem {
        config_key: "axe".to_string(),
    });
    let craft_id = craft.action_id;
    service.push_outputs(vec![AgentSyncOutput {
        actions: Some(vec![walk, craft]),
        ..AgentSyncOutput::default()
    }]);
    pipeline.sync_all().await.expect("sync");
    pipeline.tick(0.1);
    assert_eq!(integration.state().lock().pending_actions.len(), 1);

    // A script arrives while the walk is still in flight.
    service.push_outputs(vec![script_output(Uuid::new_v4(), "think \"change of plans\"")]);
    pipeline.sync_all().await.expect("sync");
    assert_eq!(integration.state().lock().pending_actions.len(), 0);

    let halted_at = sim.world().resolve_position(agent_entity).expect("position");
    for _ in 0..10 {
        pipeline.tick(0.1);
    }
    let now_at = sim.world().resolve_position(agent_entity).expect("position");
    assert_eq!(now_at, halted_at, "movement snapped to a stationary endpoint");

    // The superseded walk still closes with exactly one result; the craft
    // was cleared before starting and never produces one.
    let state = integration.state().lock();
    let walk_results = state
        .pending
        .action_results
        .iter()
        .filter(|result| result.action_id == walk_id)
        .count();
    assert_eq!(walk_results, 1);
    assert_eq!(
        state
            .pending
            .action_results
            .iter()
            .any(|result| result.action_id == craft_id),
        false
    );
}

/// Records script lifecycle events; the "stubborn" source ignores
/// cooperative stops and only unwinds once its token is forced.
struct RecordingEngine {
    events: Arc<Mutex<Vec<String>>>,
}

impl ScriptEngine for RecordingEngine {
    fn run(
        &self,
        script: &ScriptToRun,
        _bindings: &ScriptBindings,
        _host: Arc<dyn ScriptHost>,
        token: Arc<CancellationToken>,
    ) -> ScriptOutcome {
        self.events.lock().push(format!("start:{}", script.source));
        if script.source == "stubborn" {
            while !token.is_forced() {
                std::thread::sleep(Duration::from_millis(5));
            }
            self.events.lock().push("forced:stubborn".to_string());
            return ScriptOutcome::Cancelled;
        }
        self.events.lock().push(format!("done:{}", script.source));
        ScriptOutcome::Completed
    }
}

#[tokio::test]
async fn stubborn_script_is_force_interrupted_and_new_script_starts() {
    let events: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let config = MeadowConfig::builder()
        .script(ScriptConfig {
            cancel_grace_secs: 0.2,
            cancel_poll_ms: 10,
        })
        .build();
    let engine = Arc::new(RecordingEngine {
        events: events.clone(),
    });
    let (sim, service, pipeline) = setup_with_config(config, engine);
    let agent_entity = {
        let mut world = sim.world();
        spawn_character(&mut world, "agent", Point { x: 0.0, y: 0.0 })
    };
    pipeline.register_agent(agent_entity, "npc");

    service.push_outputs(vec![script_output(Uuid::new_v4(), "stubborn")]);
    pipeline.sync_all().await.expect("sync");
    wait_until(|| events.lock().iter().any(|event| event == "start:stubborn"));

    service.push_outputs(vec![script_output(Uuid::new_v4(), "replacement")]);
    pipeline.sync_all().await.expect("sync");

    wait_until(|| events.lock().iter().any(|event| event == "done:replacement"));
    wait_until(|| events.lock().iter().any(|event| event == "forced:stubborn"));

    let recorded = events.lock();
    let start_replacement = recorded
        .iter()
        .position(|event| event == "start:replacement")
        .expect("replacement started");
    // The replacement started even though the stubborn script never honored
    // the cooperative stop.
    assert_eq!(recorded[0], "start:stubborn");
    assert_eq!(start_replacement > 0, true);
}

#[tokio::test]
async fn actions_force_stop_a_stubborn_script_before_the_queue_installs() {
    let events: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let config = MeadowConfig::builder()
        .script(ScriptConfig {
            cancel_grace_secs: 0.2,
            cancel_poll_ms: 10,
        })
        .build();
    let engine = Arc::new(RecordingEngine {
        events: events.clone(),
    });
    let (sim, service, pipeline) = setup_with_config(config, engine);
    let agent_entity = {
        let mut world = sim.world();
        spawn_character(&mut world, "agent", Point { x: 0.0, y: 0.0 })
    };
    let integration = pipeline.register_agent(agent_entity, "npc");

    service.push_outputs(vec![script_output(Uuid::new_v4(), "stubborn")]);
    pipeline.sync_all().await.expect("sync");
    wait_until(|| events.lock().iter().any(|event| event == "start:stubborn"));

    let speak = ActionRequest::new(Action::Speak {
        message: "back to work".to_string(),
    });
    let speak_id = speak.action_id;
    service.push_outputs(vec![AgentSyncOutput {
        actions: Some(vec![speak]),
        ..AgentSyncOutput::default()
    }]);
    pipeline.sync_all().await.expect("sync");

    // The stubborn script is gone from the slot by the time the queue is
    // installed, never merely asked to stop.
    assert_eq!(integration.has_running_script(), false);
    wait_until(|| events.lock().iter().any(|event| event == "forced:stubborn"));

    pipeline.tick(0.1);
    let state = integration.state().lock();
    assert_eq!(state.pending.action_results[0].action_id, speak_id);
    assert_eq!(state.pending.self_spoken_messages.len(), 1);
}

/// Runs "linger" sources until stopped, writing a marker into the world as
/// a parting mutation; any other source records the facial expression its
/// bindings carried.
struct HandoffEngine {
    sim: Arc<Simulation>,
    entity_id: EntityId,
    seen: Arc<Mutex<Vec<Option<String>>>>,
}

impl ScriptEngine for HandoffEngine {
    fn run(
        &self,
        script: &ScriptToRun,
        bindings: &ScriptBindings,
        _host: Arc<dyn ScriptHost>,
        token: Arc<CancellationToken>,
    ) -> ScriptOutcome {
        if script.source == "linger" {
            while !token.is_stop_requested() {
                std::thread::sleep(Duration::from_millis(5));
            }
            let _ = self
                .sim
                .world()
                .set_facial_expression(self.entity_id, "🙂");
            return ScriptOutcome::Cancelled;
        }
        self.seen.lock().push(bindings.self_info.as_ref().and_then(|info| {
            info.entity_info
                .character_info
                .as_ref()?
                .facial_expression_emoji
                .clone()
        }));
        ScriptOutcome::Completed
    }
}

#[tokio::test]
async fn replacement_bindings_include_the_superseded_scripts_last_writes() {
    let _ = env_logger::builder().is_test(true).try_init();
    let sim = Arc::new(Simulation::new(WorldConstants::default()));
    let agent_entity = {
        let mut world = sim.world();
        register_basic_items(&mut world);
        spawn_character(&mut world, "agent", Point { x: 0.0, y: 0.0 })
    };
    let seen: Arc<Mutex<Vec<Option<String>>>> = Arc::new(Mutex::new(Vec::new()));
    let engine = Arc::new(HandoffEngine {
        sim: sim.clone(),
        entity_id: agent_entity,
        seen: seen.clone(),
    });
    let service = Arc::new(QueuedAgentService::new());
    let pipeline = AgentPipeline::new(
        sim.clone(),
        service.clone(),
        engine,
        MeadowConfig::default(),
    );
    pipeline.register_agent(agent_entity, "npc");

    service.push_outputs(vec![script_output(Uuid::new_v4(), "linger")]);
    pipeline.sync_all().await.expect("sync");

    // The lingering script mutates the world while it unwinds; the
    // replacement's bindings are snapshotted only afterwards and must
    // carry that mutation.
    service.push_outputs(vec![script_output(Uuid::new_v4(), "inspect")]);
    pipeline.sync_all().await.expect("sync");
    wait_until(|| !seen.lock().is_empty());

    assert_eq!(*seen.lock(), vec![Some("🙂".to_string())]);
}

#[tokio::test]
async fn pick_up_action_walks_to_the_item_and_collects_it() {
    let (sim, service, pipeline) = setup();
    let (agent_entity, item) = {
        let mut world = sim.world();
        let agent = spawn_character(&mut world, "agent", Point { x: 0.0, y: 0.0 });
        let item = spawn_item(&mut world, "wood", 2, Point { x: 5.0, y: 0.0 });
        (agent, item)
    };
    let integration = pipeline.register_agent(agent_entity, "npc");

    let pick = ActionRequest::new(Action::PickUpEntity { target_id: item });
    let pick_id = pick.action_id;
    service.push_outputs(vec![AgentSyncOutput {
        actions: Some(vec![pick]),
        ..AgentSyncOutput::default()
    }]);
    pipeline.sync_all().await.expect("sync");

    for _ in 0..10 {
        pipeline.tick(0.1);
    }

    {
        let state = integration.state().lock();
        assert_eq!(state.pending.action_results.len(), 1);
        assert_eq!(state.pending.action_results[0].action_id, pick_id);
        assert_eq!(state.pending.action_on_entity_records.len(), 1);
        assert_eq!(
            state.pending.action_on_entity_records[0].target_entity_id,
            item
        );
    }
    let world = sim.world();
    let inventory = world
        .entity(agent_entity)
        .and_then(|entity| entity.inventory.as_ref())
        .expect("inventory");
    assert_eq!(inventory.amount_of("wood"), 2);
    assert_eq!(world.entity(item).is_none(), true);
}

#[tokio::test]
async fn target_destroyed_mid_walk_still_closes_the_action_with_an_alert() {
    let (sim, service, pipeline) = setup();
    let (agent_entity, item) = {
        let mut world = sim.world();
        let agent = spawn_character(&mut world, "agent", Point { x: 0.0, y: 0.0 });
        let item = spawn_item(&mut world, "wood", 1, Point { x: 20.0, y: 0.0 });
        (agent, item)
    };
    let integration = pipeline.register_agent(agent_entity, "npc");

    let pick = ActionRequest::new(Action::PickUpEntity { target_id: item });
    let pick_id = pick.action_id;
    service.push_outputs(vec![AgentSyncOutput {
        actions: Some(vec![pick]),
        ..AgentSyncOutput::default()
    }]);
    pipeline.sync_all().await.expect("sync");
    pipeline.tick(0.1);

    // The item vanishes while the agent is still walking towards it.
    sim.world().remove_entity(item);
    for _ in 0..25 {
        pipeline.tick(0.1);
    }

    let state = integration.state().lock();
    let results: Vec<Uuid> = state
        .pending
        .action_results
        .iter()
        .map(|result| result.action_id)
        .collect();
    assert_eq!(results, vec![pick_id]);
    assert_eq!(state.pending.action_on_entity_records.len(), 0);
    drop(state);
    assert_eq!(
        sim.world()
            .alerts()
            .iter()
            .any(|alert| alert.contains("destroyed")),
        true
    );
}

#[tokio::test]
async fn already_destroyed_target_closes_the_action_on_its_first_tick() {
    let (sim, service, pipeline) = setup();
    let (agent_entity, item) = {
        let mut world = sim.world();
        let agent = spawn_character(&mut world, "agent", Point { x: 0.0, y: 0.0 });
        let item = spawn_item(&mut world, "wood", 1, Point { x: 10.0, y: 0.0 });
        world.remove_entity(item);
        (agent, item)
    };
    let integration = pipeline.register_agent(agent_entity, "npc");

    let strike = ActionRequest::new(Action::UseEquippedToolOnEntity { target_id: item });
    let strike_id = strike.action_id;
    service.push_outputs(vec![AgentSyncOutput {
        actions: Some(vec![strike]),
        ..AgentSyncOutput::default()
    }]);
    pipeline.sync_all().await.expect("sync");
    pipeline.tick(0.1);

    let state = integration.state().lock();
    assert_eq!(state.pending.action_results.len(), 1);
    assert_eq!(state.pending.action_results[0].action_id, strike_id);
    assert_eq!(state.active_action.is_none(), true);
    drop(state);
    assert_eq!(
        sim.world()
            .alerts()
            .iter()
            .any(|alert| alert.contains("destroyed")),
        true
    );
}

fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..500 {
        if condition() {
            return;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    panic!("condition not reached in time");
}

#[tokio::test]
async fn sync_if_due_honors_the_configured_interval() {
    let (sim, service, pipeline) = setup();
    let agent_entity = {
        let mut world = sim.world();
        spawn_character(&mut world, "agent", Point { x: 0.0, y: 0.0 })
    };
    pipeline.register_agent(agent_entity, "npc");

    // Default interval is 2.0 simulation-time units.
    pipeline.sync_if_due().await.expect("sync");
    pipeline.sync_if_due().await.expect("sync");
    assert_eq!(service.request_count(), 1);

    for _ in 0..25 {
        pipeline.tick(0.1);
    }
    pipeline.sync_if_due().await.expect("sync");
    assert_eq!(service.request_count(), 2);
}

#[tokio::test]
async fn paused_world_skips_the_network_entirely() {
    let (sim, service, pipeline) = setup();
    let agent_entity = {
        let mut world = sim.world();
        spawn_character(&mut world, "agent", Point { x: 0.0, y: 0.0 })
    };
    let integration = pipeline.register_agent(agent_entity, "npc");

    sim.world().set_pause_agents(true);
    pipeline.sync_all().await.expect("sync");
    assert_eq!(service.request_count(), 0);
    {
        let state = integration.state().lock();
        assert_eq!(state.phase, SyncPhase::Paused);
        assert_eq!(state.status, "paused");
    }

    // Unpausing resumes normal cycles.
    sim.world().set_pause_agents(false);
    service.push_outputs(vec![]);
    pipeline.sync_all().await.expect("sync");
    assert_eq!(service.request_count(), 1);
    assert_eq!(integration.state().lock().phase, SyncPhase::Idle);
}

#[tokio::test]
async fn decision_service_errors_are_recorded_and_retried() {
    let (sim, service, pipeline) = setup();
    let agent_entity = {
        let mut world = sim.world();
        spawn_character(&mut world, "agent", Point { x: 0.0, y: 0.0 })
    };
    let integration = pipeline.register_agent(agent_entity, "npc");

    service.push_outputs(vec![AgentSyncOutput {
        error: Some("model overloaded".to_string()),
        ..AgentSyncOutput::default()
    }]);
    pipeline.sync_all().await.expect("sync");
    {
        let state = integration.state().lock();
        assert_eq!(state.phase, SyncPhase::Errored);
        assert_eq!(state.last_error.as_deref(), Some("model overloaded"));
    }
    assert_eq!(sim.world().alerts().is_empty(), false);

    // The next cycle proceeds normally.
    service.push_outputs(vec![]);
    pipeline.sync_all().await.expect("sync");
    assert_eq!(service.request_count(), 2);
    assert_eq!(integration.state().lock().phase, SyncPhase::Idle);
}

#[tokio::test]
async fn scripts_report_completion_and_failures_back_into_the_next_sync() {
    let (sim, service, pipeline) = setup();
    let agent_entity = {
        let mut world = sim.world();
        spawn_character(&mut world, "agent", Point { x: 0.0, y: 0.0 })
    };
    let integration = pipeline.register_agent(agent_entity, "npc");

    let script_id = Uuid::new_v4();
    service.push_outputs(vec![script_output(script_id, "speak \"done\"")]);
    pipeline.sync_all().await.expect("sync");
    wait_until(|| integration.most_recent_completed_script_id() == Some(script_id));
    assert_eq!(
        integration.state().lock().pending.self_spoken_messages.len(),
        1
    );

    service.push_outputs(vec![]);
    pipeline.sync_all().await.expect("sync");
    let requests = service.requests();
    assert_eq!(
        requests[1].most_recent_completed_script_id,
        Some(script_id)
    );

    // A failing script surfaces in observations rather than anywhere fatal.
    let bad_id = Uuid::new_v4();
    service.push_outputs(vec![script_output(bad_id, "explode now")]);
    pipeline.sync_all().await.expect("sync");
    wait_until(|| {
        !integration
            .state()
            .lock()
            .pending
            .script_execution_errors
            .is_empty()
    });
    service.push_outputs(vec![]);
    pipeline.sync_all().await.expect("sync");
    let requests = service.requests();
    let errors = &requests[3].new_observations.script_execution_errors;
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].script_id, bad_id);
}
