//! Pipeline facade: registration, ticking, and fan-out syncs.

use crate::error::MeadowCoreError;
use crate::integration::AgentIntegration;
use crate::service::AgentService;
use futures_util::future::join_all;
use log::info;
use meadow_config::MeadowConfig;
use meadow_protocol::{AgentId, EntityId};
use meadow_script::ScriptEngine;
use meadow_sim::Simulation;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;

/// Owns every agent integration attached to one simulation.
pub struct AgentPipeline {
    sim: Arc<Simulation>,
    service: Arc<dyn AgentService>,
    engine: Arc<dyn ScriptEngine>,
    config: MeadowConfig,
    integrations: RwLock<HashMap<AgentId, Arc<AgentIntegration>>>,
    last_sync_time: Mutex<f64>,
}

impl AgentPipeline {
    pub fn new(
        sim: Arc<Simulation>,
        service: Arc<dyn AgentService>,
        engine: Arc<dyn ScriptEngine>,
        config: MeadowConfig,
    ) -> Self {
        Self {
            sim,
            service,
            engine,
            config,
            integrations: RwLock::new(HashMap::new()),
            last_sync_time: Mutex::new(f64::NEG_INFINITY),
        }
    }

    pub fn sim(&self) -> &Arc<Simulation> {
        &self.sim
    }

    /// Attach an agent to an entity.
    pub fn register_agent(
        &self,
        entity_id: EntityId,
        agent_type: impl Into<String>,
    ) -> Arc<AgentIntegration> {
        let integration = AgentIntegration::new(
            self.sim.clone(),
            entity_id,
            agent_type,
            self.service.clone(),
            self.engine.clone(),
            self.config.clone(),
        );
        info!(
            "agent registered (agent_id={}, entity_id={entity_id})",
            integration.agent_id()
        );
        self.integrations
            .write()
            .insert(integration.agent_id(), integration.clone());
        integration
    }

    pub fn integration(&self, agent_id: AgentId) -> Result<Arc<AgentIntegration>, MeadowCoreError> {
        self.integrations
            .read()
            .get(&agent_id)
            .cloned()
            .ok_or(MeadowCoreError::UnknownAgent(agent_id))
    }

    fn all_integrations(&self) -> Vec<Arc<AgentIntegration>> {
        self.integrations.read().values().cloned().collect()
    }

    /// Advance the simulation one tick, then fold observations and pump the
    /// action queue for every agent.
    pub fn tick(&self, dt: f64) {
        self.sim.tick(dt);
        for integration in self.all_integrations() {
            integration.record_observations_now();
            integration.update_pending_actions();
        }
    }

    /// Sync all agents if the simulation clock has advanced past the
    /// configured interval since the previous fan-out.
    pub async fn sync_if_due(&self) -> Result<(), MeadowCoreError> {
        let now = self.sim.time();
        {
            let mut last = self.last_sync_time.lock();
            if now - *last < self.config.sync.interval {
                return Ok(());
            }
            *last = now;
        }
        self.sync_all().await
    }

    /// Run a sync cycle for every registered agent concurrently. Per-agent
    /// cycles stay strictly sequential; a still-in-flight agent skips.
    pub async fn sync_all(&self) -> Result<(), MeadowCoreError> {
        let integrations = self.all_integrations();
        let results = join_all(
            integrations
                .iter()
                .map(|integration| integration.sync()),
        )
        .await;
        for result in results {
            result?;
        }
        Ok(())
    }
}
