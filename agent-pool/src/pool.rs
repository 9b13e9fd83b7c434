//! Per-project pool of [`AgentInstance`]s (§4.2 "Pool operations"),
//! grounded in the original project's `AgentPoolManager` class.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use feature_core::{
    api::{AgentInfo, PoolStatus},
    error::Result,
    events::{Event, EventBus},
    models::{Agent, AgentStatus},
    repository::AgentRepository,
};
use tokio::sync::RwLock;

use crate::instance::{AgentInstance, AgentSpawnConfig};
use crate::lock::cleanup_orphaned_locks;

const DEFAULT_MAX_AGENTS: usize = 10;

/// Supervises every agent subprocess for one project.
pub struct AgentPoolManager<R: AgentRepository> {
    project_name: String,
    project_dir: PathBuf,
    agent_binary: PathBuf,
    max_agents: usize,
    agents: RwLock<HashMap<String, AgentInstance>>,
    repository: Arc<R>,
    events: EventBus,
}

impl<R: AgentRepository> AgentPoolManager<R> {
    pub fn new(
        project_name: impl Into<String>,
        project_dir: PathBuf,
        agent_binary: PathBuf,
        repository: Arc<R>,
        events: EventBus,
    ) -> Self {
        Self {
            project_name: project_name.into(),
            project_dir,
            agent_binary,
            max_agents: DEFAULT_MAX_AGENTS,
            agents: RwLock::new(HashMap::new()),
            repository,
            events,
        }
    }

    pub fn with_max_agents(mut self, max_agents: usize) -> Self {
        self.max_agents = max_agents;
        self
    }

    fn generate_agent_id() -> String {
        use rand::Rng;
        const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";
        let mut rng = rand::thread_rng();
        (0..8)
            .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
            .collect()
    }

    /// Spawn one agent. Refuses when the pool is at `max_agents`.
    pub async fn spawn_agent(&self, model: String, yolo_mode: bool) -> Result<AgentInstance> {
        let mut agents = self.agents.write().await;
        if agents.len() >= self.max_agents {
            return Err(feature_core::error::FeatureError::PoolFull(
                self.project_name.clone(),
            ));
        }

        let agent_id = Self::generate_agent_id();
        let instance = AgentInstance::new(AgentSpawnConfig {
            agent_id: agent_id.clone(),
            project_name: self.project_name.clone(),
            project_dir: self.project_dir.clone(),
            agent_binary: self.agent_binary.clone(),
            model: model.clone(),
            yolo_mode,
        });

        if let Err(e) = instance.start(self.events.clone()).await {
            return Err(e);
        }

        agents.insert(agent_id.clone(), instance.clone());
        drop(agents);

        let record = Agent {
            agent_id: agent_id.clone(),
            project_name: self.project_name.clone(),
            status: instance.status().await,
            model,
            yolo_mode,
            pid: instance.pid().await,
            created_at: chrono::Utc::now(),
            started_at: instance.started_at().await,
            last_heartbeat: None,
            current_feature_id: None,
        };
        self.repository.upsert(&record).await?;

        self.notify_pool_change().await;
        Ok(instance)
    }

    /// Spawn `count` agents sequentially, collecting partial failures
    /// rather than aborting on the first one.
    pub async fn spawn_agents(
        &self,
        count: u32,
        model: String,
        yolo_mode: bool,
    ) -> (Vec<AgentInstance>, Vec<String>) {
        let mut spawned = Vec::new();
        let mut errors = Vec::new();
        for _ in 0..count {
            match self.spawn_agent(model.clone(), yolo_mode).await {
                Ok(instance) => spawned.push(instance),
                Err(e) => errors.push(e.to_string()),
            }
        }
        (spawned, errors)
    }

    pub async fn stop_agent(&self, agent_id: &str) -> Result<()> {
        let instance = {
            let agents = self.agents.read().await;
            agents.get(agent_id).cloned()
        };
        let Some(instance) = instance else {
            return Err(feature_core::error::FeatureError::AgentNotFound(
                agent_id.to_string(),
            ));
        };

        instance.stop().await?;
        self.agents.write().await.remove(agent_id);
        self.repository.delete(agent_id).await?;
        self.notify_pool_change().await;
        Ok(())
    }

    pub async fn stop_all_agents(&self) -> (usize, Vec<String>) {
        let ids: Vec<String> = self.agents.read().await.keys().cloned().collect();
        let mut stopped = 0;
        let mut errors = Vec::new();
        for id in ids {
            match self.stop_agent(&id).await {
                Ok(()) => stopped += 1,
                Err(e) => errors.push(e.to_string()),
            }
        }
        (stopped, errors)
    }

    pub async fn pause_agent(&self, agent_id: &str) -> Result<()> {
        let instance = self.get_agent(agent_id).await?;
        instance.pause().await?;
        self.repository
            .upsert(&self.snapshot_record(agent_id, &instance).await)
            .await?;
        self.notify_pool_change().await;
        Ok(())
    }

    pub async fn resume_agent(&self, agent_id: &str) -> Result<()> {
        let instance = self.get_agent(agent_id).await?;
        instance.resume().await?;
        self.repository
            .upsert(&self.snapshot_record(agent_id, &instance).await)
            .await?;
        self.notify_pool_change().await;
        Ok(())
    }

    async fn snapshot_record(&self, agent_id: &str, instance: &AgentInstance) -> Agent {
        Agent {
            agent_id: agent_id.to_string(),
            project_name: self.project_name.clone(),
            status: instance.status().await,
            model: instance.config.model.clone(),
            yolo_mode: instance.config.yolo_mode,
            pid: instance.pid().await,
            created_at: chrono::Utc::now(),
            started_at: instance.started_at().await,
            last_heartbeat: Some(chrono::Utc::now()),
            current_feature_id: instance.current_feature_id().await,
        }
    }

    pub async fn get_agent(&self, agent_id: &str) -> Result<AgentInstance> {
        self.agents
            .read()
            .await
            .get(agent_id)
            .cloned()
            .ok_or_else(|| feature_core::error::FeatureError::AgentNotFound(agent_id.to_string()))
    }

    /// Run each live agent's healthcheck and reap any that crashed.
    pub async fn healthcheck_all(&self) -> HashMap<String, bool> {
        let snapshot: Vec<(String, AgentInstance)> = self
            .agents
            .read()
            .await
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let mut results = HashMap::new();
        let mut crashed = Vec::new();
        for (id, instance) in snapshot {
            let healthy = instance.healthcheck().await;
            results.insert(id.clone(), healthy);
            if !healthy && instance.status().await == AgentStatus::Crashed {
                crashed.push(id);
            }
        }

        if !crashed.is_empty() {
            let mut agents = self.agents.write().await;
            for id in &crashed {
                agents.remove(id);
            }
            drop(agents);
            for id in &crashed {
                let _ = self.repository.delete(id).await;
            }
            self.notify_pool_change().await;
        }

        results
    }

    pub async fn get_pool_status(&self) -> Result<PoolStatus> {
        let agents = self.agents.read().await;
        let mut infos = Vec::with_capacity(agents.len());
        let mut active = 0;
        let mut idle = 0;
        let mut working = 0;
        let mut paused = 0;

        for instance in agents.values() {
            let status = instance.status().await;
            match status {
                AgentStatus::Idle => {
                    idle += 1;
                    active += 1;
                }
                AgentStatus::Working => {
                    working += 1;
                    active += 1;
                }
                AgentStatus::Paused => paused += 1,
                _ => {}
            }
            infos.push(AgentInfo {
                agent_id: instance.config.agent_id.clone(),
                status: status.to_string(),
                pid: instance.pid().await,
                model: instance.config.model.clone(),
                yolo_mode: instance.config.yolo_mode,
                current_feature_id: instance.current_feature_id().await,
            });
        }

        Ok(PoolStatus {
            project_name: self.project_name.clone(),
            total_count: infos.len(),
            agents: infos,
            active_count: active,
            idle_count: idle,
            working_count: working,
            paused_count: paused,
            max_agents: self.max_agents,
        })
    }

    /// Remove orphaned lock files left from a previous run before this
    /// pool spawns anything new (§4.2 "Orphaned lock recovery").
    pub fn cleanup_orphaned_locks(&self) -> usize {
        cleanup_orphaned_locks(&self.project_dir)
    }

    async fn notify_pool_change(&self) {
        if let Ok(status) = self.get_pool_status().await {
            self.events.publish(Event::AgentPool {
                agents: status.agents.iter().map(|a| a.agent_id.clone()).collect(),
                active_count: status.active_count,
                idle_count: status.idle_count,
                working_count: status.working_count,
            });
        }
    }
}
