//! In-memory mock implementations of the `feature-core` repository traits.
//!
//! Mirrors real repository semantics closely enough for unit and contract
//! tests: atomic claim via a single mutex section (no true concurrency
//! races, but the same precondition checks), append-only status log, and
//! one-shot error injection for exercising failure paths.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use rand::seq::SliceRandom;

use feature_core::{
    Agent, AgentRepository, DependencyKind, DependencyRepository, Feature, FeatureDependency,
    FeatureError, FeatureFilter, FeatureRepository, FeatureStats, NewFeature, Result,
    SkipOutcome, StatusChangeLog, VerificationOutcome,
};

/// In-memory stand-in for a SQLite-backed `FeatureRepository`.
///
/// Also implements [`DependencyRepository`] and [`AgentRepository`] so a
/// single instance can back tests that exercise all three surfaces.
pub struct MockFeatureRepository {
    features: Arc<Mutex<HashMap<i64, Feature>>>,
    status_changes: Arc<Mutex<Vec<StatusChangeLog>>>,
    dependencies: Arc<Mutex<HashMap<i64, FeatureDependency>>>,
    agents: Arc<Mutex<HashMap<String, Agent>>>,
    next_feature_id: Arc<AtomicI64>,
    next_edge_id: Arc<AtomicI64>,
    next_log_id: Arc<AtomicI64>,
    error_injection: Arc<Mutex<Option<FeatureError>>>,
    call_history: Arc<Mutex<Vec<String>>>,
}

impl Default for MockFeatureRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl MockFeatureRepository {
    pub fn new() -> Self {
        Self {
            features: Arc::new(Mutex::new(HashMap::new())),
            status_changes: Arc::new(Mutex::new(Vec::new())),
            dependencies: Arc::new(Mutex::new(HashMap::new())),
            agents: Arc::new(Mutex::new(HashMap::new())),
            next_feature_id: Arc::new(AtomicI64::new(1)),
            next_edge_id: Arc::new(AtomicI64::new(1)),
            next_log_id: Arc::new(AtomicI64::new(1)),
            error_injection: Arc::new(Mutex::new(None)),
            call_history: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Seed the repository with a pre-built set of features.
    pub fn with_features(features: Vec<Feature>) -> Self {
        let repo = Self::new();
        let max_id = features.iter().map(|f| f.id).max().unwrap_or(0);
        repo.next_feature_id.store(max_id + 1, Ordering::SeqCst);
        let mut store = repo.features.lock();
        for feature in features {
            store.insert(feature.id, feature);
        }
        drop(store);
        repo
    }

    pub fn with_next_id(self, next_id: i64) -> Self {
        self.next_feature_id.store(next_id, Ordering::SeqCst);
        self
    }

    /// Queue a single error to be returned by the next repository call.
    pub fn inject_error(&self, error: FeatureError) {
        *self.error_injection.lock() = Some(error);
    }

    pub fn clear_error(&self) {
        *self.error_injection.lock() = None;
    }

    pub fn call_history(&self) -> Vec<String> {
        self.call_history.lock().clone()
    }

    pub fn clear_history(&self) {
        self.call_history.lock().clear();
    }

    pub fn assert_called(&self, method: &str) {
        let history = self.call_history();
        assert!(
            history.iter().any(|call| call == method),
            "expected '{method}' to have been called; history: {history:?}"
        );
    }

    fn check_error_injection(&self) -> Option<FeatureError> {
        self.error_injection.lock().take()
    }

    fn record_call(&self, method: &str) {
        self.call_history.lock().push(method.to_string());
    }

    fn record_call_with_params(&self, method: &str, params: &str) {
        self.call_history
            .lock()
            .push(format!("{method}({params})"));
    }

    fn next_priority(&self, features: &HashMap<i64, Feature>) -> i64 {
        features.values().map(|f| f.priority).max().unwrap_or(0) + 1
    }
}

#[async_trait]
impl FeatureRepository for MockFeatureRepository {
    async fn create(&self, feature: NewFeature) -> Result<Feature> {
        self.record_call_with_params("create", &feature.name);
        if let Some(err) = self.check_error_injection() {
            return Err(err);
        }

        let mut store = self.features.lock();
        let id = self.next_feature_id.fetch_add(1, Ordering::SeqCst);
        let priority = self.next_priority(&store);
        let created = Feature {
            id,
            priority,
            category: feature.category,
            name: feature.name,
            description: feature.description,
            steps: feature.steps,
            passes: false,
            in_progress: false,
            assigned_to_agent_id: None,
            attempt_count: 0,
            verification_command: feature.verification_command,
            verification_evidence: None,
            marked_passing_at: None,
            inserted_at: Utc::now(),
        };
        store.insert(id, created.clone());
        Ok(created)
    }

    async fn create_bulk(&self, features: Vec<NewFeature>) -> Result<Vec<Feature>> {
        self.record_call_with_params("create_bulk", &features.len().to_string());
        if let Some(err) = self.check_error_injection() {
            return Err(err);
        }

        let mut store = self.features.lock();
        let mut next_priority = self.next_priority(&store);
        let mut created = Vec::with_capacity(features.len());
        for feature in features {
            let id = self.next_feature_id.fetch_add(1, Ordering::SeqCst);
            let row = Feature {
                id,
                priority: next_priority,
                category: feature.category,
                name: feature.name,
                description: feature.description,
                steps: feature.steps,
                passes: false,
                in_progress: false,
                assigned_to_agent_id: None,
                attempt_count: 0,
                verification_command: feature.verification_command,
                verification_evidence: None,
                marked_passing_at: None,
                inserted_at: Utc::now(),
            };
            next_priority += 1;
            store.insert(id, row.clone());
            created.push(row);
        }
        Ok(created)
    }

    async fn get_by_id(&self, id: i64) -> Result<Feature> {
        self.record_call_with_params("get_by_id", &id.to_string());
        if let Some(err) = self.check_error_injection() {
            return Err(err);
        }

        self.features
            .lock()
            .get(&id)
            .cloned()
            .ok_or(FeatureError::FeatureNotFound(id))
    }

    async fn list(&self, filter: FeatureFilter) -> Result<Vec<Feature>> {
        self.record_call("list");
        if let Some(err) = self.check_error_injection() {
            return Err(err);
        }

        let store = self.features.lock();
        let mut matched: Vec<Feature> = store
            .values()
            .filter(|f| {
                filter
                    .category
                    .as_ref()
                    .map(|c| &f.category == c)
                    .unwrap_or(true)
                    && filter.passes.map(|p| f.passes == p).unwrap_or(true)
                    && filter
                        .in_progress
                        .map(|ip| f.in_progress == ip)
                        .unwrap_or(true)
            })
            .cloned()
            .collect();
        matched.sort_by(|a, b| a.priority.cmp(&b.priority).then(a.id.cmp(&b.id)));

        let offset = filter.offset.unwrap_or(0).max(0) as usize;
        let matched = if offset < matched.len() {
            matched.split_off(offset)
        } else {
            Vec::new()
        };
        let matched = if let Some(limit) = filter.limit {
            matched.into_iter().take(limit.max(0) as usize).collect()
        } else {
            matched
        };
        Ok(matched)
    }

    async fn get_next(&self) -> Result<Option<Feature>> {
        self.record_call("get_next");
        if let Some(err) = self.check_error_injection() {
            return Err(err);
        }

        let store = self.features.lock();
        let next = store
            .values()
            .filter(|f| !f.passes)
            .min_by(|a, b| a.priority.cmp(&b.priority).then(a.id.cmp(&b.id)))
            .cloned();
        Ok(next)
    }

    async fn get_for_regression(&self, limit: i64) -> Result<Vec<Feature>> {
        self.record_call_with_params("get_for_regression", &limit.to_string());
        if let Some(err) = self.check_error_injection() {
            return Err(err);
        }

        let store = self.features.lock();
        let mut passing: Vec<Feature> = store.values().filter(|f| f.passes).cloned().collect();
        let mut rng = rand::thread_rng();
        passing.shuffle(&mut rng);
        passing.truncate(limit.max(0) as usize);
        Ok(passing)
    }

    async fn get_stats(&self) -> Result<FeatureStats> {
        self.record_call("get_stats");
        if let Some(err) = self.check_error_injection() {
            return Err(err);
        }

        let store = self.features.lock();
        let total = store.len() as i64;
        let passing = store.values().filter(|f| f.passes).count() as i64;
        let in_progress = store.values().filter(|f| f.in_progress).count() as i64;
        Ok(FeatureStats::compute(passing, in_progress, total))
    }

    async fn mark_in_progress(&self, feature_id: i64) -> Result<Feature> {
        self.record_call_with_params("mark_in_progress", &feature_id.to_string());
        if let Some(err) = self.check_error_injection() {
            return Err(err);
        }

        let mut store = self.features.lock();
        let feature = store
            .get_mut(&feature_id)
            .ok_or(FeatureError::FeatureNotFound(feature_id))?;
        if feature.passes {
            return Err(FeatureError::AlreadyPassing(feature_id));
        }
        if feature.in_progress {
            return Err(FeatureError::AlreadyInProgress(feature_id));
        }
        feature.in_progress = true;
        feature.attempt_count += 1;
        Ok(feature.clone())
    }

    async fn clear_in_progress(&self, feature_id: i64) -> Result<Feature> {
        self.record_call_with_params("clear_in_progress", &feature_id.to_string());
        if let Some(err) = self.check_error_injection() {
            return Err(err);
        }

        let mut store = self.features.lock();
        let feature = store
            .get_mut(&feature_id)
            .ok_or(FeatureError::FeatureNotFound(feature_id))?;
        feature.in_progress = false;
        Ok(feature.clone())
    }

    async fn skip(&self, feature_id: i64) -> Result<SkipOutcome> {
        self.record_call_with_params("skip", &feature_id.to_string());
        if let Some(err) = self.check_error_injection() {
            return Err(err);
        }

        let mut store = self.features.lock();
        let old_priority = {
            let feature = store
                .get(&feature_id)
                .ok_or(FeatureError::FeatureNotFound(feature_id))?;
            if feature.passes {
                return Err(FeatureError::AlreadyPassing(feature_id));
            }
            feature.priority
        };
        let new_priority = self.next_priority(&store);
        if let Some(feature) = store.get_mut(&feature_id) {
            feature.priority = new_priority;
        }
        Ok(SkipOutcome {
            old_priority,
            new_priority,
        })
    }

    async fn commit_passing(
        &self,
        feature_id: i64,
        stripped_evidence: &str,
        verification_output: Option<&VerificationOutcome>,
    ) -> Result<Feature> {
        self.record_call_with_params("commit_passing", &feature_id.to_string());
        if let Some(err) = self.check_error_injection() {
            return Err(err);
        }

        let mut store = self.features.lock();
        let feature = store
            .get_mut(&feature_id)
            .ok_or(FeatureError::FeatureNotFound(feature_id))?;
        if !feature.in_progress {
            return Err(FeatureError::NotInProgress(feature_id));
        }

        let old_status = "in_progress".to_string();
        feature.passes = true;
        feature.in_progress = false;
        feature.verification_evidence = Some(stripped_evidence.to_string());
        feature.marked_passing_at = Some(Utc::now());
        let result = feature.clone();
        let feature_name = feature.name.clone();
        drop(store);

        let log_id = self.next_log_id.fetch_add(1, Ordering::SeqCst);
        self.status_changes.lock().push(StatusChangeLog {
            id: log_id,
            feature_id,
            feature_name,
            old_status,
            new_status: "passing".to_string(),
            evidence: Some(stripped_evidence.to_string()),
            verification_output: verification_output.map(|v| v.stdout.clone()),
            timestamp: Utc::now(),
        });

        Ok(result)
    }

    async fn list_status_changes(&self, feature_id: i64) -> Result<Vec<StatusChangeLog>> {
        self.record_call_with_params("list_status_changes", &feature_id.to_string());
        if let Some(err) = self.check_error_injection() {
            return Err(err);
        }

        Ok(self
            .status_changes
            .lock()
            .iter()
            .filter(|log| log.feature_id == feature_id)
            .cloned()
            .collect())
    }

    async fn health_check(&self) -> Result<()> {
        self.record_call("health_check");
        if let Some(err) = self.check_error_injection() {
            return Err(err);
        }
        Ok(())
    }
}

#[async_trait]
impl DependencyRepository for MockFeatureRepository {
    async fn add_edge(
        &self,
        feature_id: i64,
        depends_on_id: i64,
        kind: DependencyKind,
        notes: Option<String>,
    ) -> Result<FeatureDependency> {
        self.record_call("add_edge");
        if let Some(err) = self.check_error_injection() {
            return Err(err);
        }

        if feature_id == depends_on_id {
            return Err(FeatureError::SelfDependency(feature_id));
        }

        let mut edges = self.dependencies.lock();
        if edges
            .values()
            .any(|e| e.feature_id == feature_id && e.depends_on_id == depends_on_id)
        {
            return Err(FeatureError::DuplicateDependency {
                feature_id,
                depends_on_id,
            });
        }
        if edges
            .values()
            .any(|e| e.feature_id == depends_on_id && e.depends_on_id == feature_id)
        {
            return Err(FeatureError::CircularDependency {
                feature_id,
                depends_on_id,
            });
        }

        let id = self.next_edge_id.fetch_add(1, Ordering::SeqCst);
        let edge = FeatureDependency {
            id,
            feature_id,
            depends_on_id,
            kind,
            notes,
        };
        edges.insert(id, edge.clone());
        Ok(edge)
    }

    async fn remove_edge(&self, edge_id: i64) -> Result<()> {
        self.record_call_with_params("remove_edge", &edge_id.to_string());
        if let Some(err) = self.check_error_injection() {
            return Err(err);
        }
        self.dependencies.lock().remove(&edge_id);
        Ok(())
    }

    async fn dependencies_of(&self, feature_id: i64) -> Result<Vec<FeatureDependency>> {
        self.record_call("dependencies_of");
        if let Some(err) = self.check_error_injection() {
            return Err(err);
        }
        Ok(self
            .dependencies
            .lock()
            .values()
            .filter(|e| e.feature_id == feature_id)
            .cloned()
            .collect())
    }

    async fn dependents_of(&self, feature_id: i64) -> Result<Vec<FeatureDependency>> {
        self.record_call("dependents_of");
        if let Some(err) = self.check_error_injection() {
            return Err(err);
        }
        Ok(self
            .dependencies
            .lock()
            .values()
            .filter(|e| e.depends_on_id == feature_id)
            .cloned()
            .collect())
    }

    async fn is_ready(&self, feature_id: i64) -> Result<bool> {
        self.record_call("is_ready");
        if let Some(err) = self.check_error_injection() {
            return Err(err);
        }

        let edges = self.dependencies.lock();
        let features = self.features.lock();
        let ready = edges
            .values()
            .filter(|e| e.feature_id == feature_id)
            .all(|e| {
                features
                    .get(&e.depends_on_id)
                    .map(|f| f.passes)
                    .unwrap_or(false)
            });
        Ok(ready)
    }
}

#[async_trait]
impl AgentRepository for MockFeatureRepository {
    async fn upsert(&self, agent: &Agent) -> Result<()> {
        self.record_call_with_params("upsert", &agent.agent_id);
        if let Some(err) = self.check_error_injection() {
            return Err(err);
        }
        self.agents
            .lock()
            .insert(agent.agent_id.clone(), agent.clone());
        Ok(())
    }

    async fn get(&self, agent_id: &str) -> Result<Agent> {
        self.record_call_with_params("get", agent_id);
        if let Some(err) = self.check_error_injection() {
            return Err(err);
        }
        self.agents
            .lock()
            .get(agent_id)
            .cloned()
            .ok_or_else(|| FeatureError::AgentNotFound(agent_id.to_string()))
    }

    async fn list_by_project(&self, project_name: &str) -> Result<Vec<Agent>> {
        self.record_call_with_params("list_by_project", project_name);
        if let Some(err) = self.check_error_injection() {
            return Err(err);
        }
        Ok(self
            .agents
            .lock()
            .values()
            .filter(|a| a.project_name == project_name)
            .cloned()
            .collect())
    }

    async fn delete(&self, agent_id: &str) -> Result<()> {
        self.record_call_with_params("delete", agent_id);
        if let Some(err) = self.check_error_injection() {
            return Err(err);
        }
        self.agents.lock().remove(agent_id);
        Ok(())
    }
}
