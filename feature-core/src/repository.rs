use async_trait::async_trait;

use crate::{
    error::Result,
    models::{
        Agent, DependencyKind, Feature, FeatureDependency, FeatureFilter, FeatureStats,
        NewFeature, StatusChangeLog,
    },
};

/// Outcome of a `mark_passing` attempt that reached the verification step.
#[derive(Debug, Clone)]
pub struct VerificationOutcome {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Result of `skip`: the old and new priority of the rotated feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkipOutcome {
    pub old_priority: i64,
    pub new_priority: i64,
}

/// Persistence abstraction for the feature queue and its audit trail.
///
/// Implementations are responsible for the full gate sequence documented
/// in §4.1 of the specification, in particular the atomic compare-and-set
/// claim pattern: `UPDATE features SET in_progress = true WHERE id = ?
/// AND in_progress = false AND passes = false`, treating zero affected
/// rows as the rejection signal rather than doing a read-then-write.
#[async_trait]
pub trait FeatureRepository: Send + Sync {
    /// Insert a single feature, assigning its priority under the
    /// priority lock (current max + 1).
    async fn create(&self, feature: NewFeature) -> Result<Feature>;

    /// Insert a batch of features as one all-or-nothing transaction,
    /// assigning consecutive priorities under the priority lock.
    async fn create_bulk(&self, features: Vec<NewFeature>) -> Result<Vec<Feature>>;

    async fn get_by_id(&self, id: i64) -> Result<Feature>;

    async fn list(&self, filter: FeatureFilter) -> Result<Vec<Feature>>;

    /// The single feature with `passes = false` ordered by
    /// `(priority asc, id asc)`, if any.
    async fn get_next(&self) -> Result<Option<Feature>>;

    /// Uniformly random sample of passing features, `min(limit, count)`
    /// in size.
    async fn get_for_regression(&self, limit: i64) -> Result<Vec<Feature>>;

    async fn get_stats(&self) -> Result<FeatureStats>;

    /// Atomic compare-and-set claim. Fails with `AlreadyPassing` or
    /// `AlreadyInProgress` (not a generic conflict) when the row did not
    /// match the `WHERE` clause, by re-reading current state.
    async fn mark_in_progress(&self, feature_id: i64) -> Result<Feature>;

    /// Unconditionally clears `in_progress`; logs a transition only if
    /// it was previously `true`.
    async fn clear_in_progress(&self, feature_id: i64) -> Result<Feature>;

    /// Moves a feature to the tail of the queue. Rejects features that
    /// are already passing.
    async fn skip(&self, feature_id: i64) -> Result<SkipOutcome>;

    /// Commits the `passing` transition and appends the audit row.
    /// Callers (the feature-queue service, not the repository) are
    /// responsible for rate limiting, evidence-length checking,
    /// verification execution, and backup — this method performs only
    /// the state-precondition check and the atomic commit + audit
    /// append described by steps 3, 6, and 7 of §4.1.
    async fn commit_passing(
        &self,
        feature_id: i64,
        stripped_evidence: &str,
        verification_output: Option<&VerificationOutcome>,
    ) -> Result<Feature>;

    async fn list_status_changes(&self, feature_id: i64) -> Result<Vec<StatusChangeLog>>;

    async fn health_check(&self) -> Result<()>;
}

/// Persistence abstraction for the optional dependency graph extension.
#[async_trait]
pub trait DependencyRepository: Send + Sync {
    async fn add_edge(
        &self,
        feature_id: i64,
        depends_on_id: i64,
        kind: DependencyKind,
        notes: Option<String>,
    ) -> Result<FeatureDependency>;

    async fn remove_edge(&self, edge_id: i64) -> Result<()>;

    async fn dependencies_of(&self, feature_id: i64) -> Result<Vec<FeatureDependency>>;

    async fn dependents_of(&self, feature_id: i64) -> Result<Vec<FeatureDependency>>;

    /// True iff every feature `feature_id` depends on currently passes.
    async fn is_ready(&self, feature_id: i64) -> Result<bool>;
}

/// Persistence abstraction for agent pool records (the DB side of the
/// pool supervisor; process management lives in the `agent-pool` crate).
#[async_trait]
pub trait AgentRepository: Send + Sync {
    async fn upsert(&self, agent: &Agent) -> Result<()>;

    async fn get(&self, agent_id: &str) -> Result<Agent>;

    async fn list_by_project(&self, project_name: &str) -> Result<Vec<Agent>>;

    async fn delete(&self, agent_id: &str) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skip_outcome_carries_both_priorities() {
        let outcome = SkipOutcome {
            old_priority: 1,
            new_priority: 4,
        };
        assert_eq!(outcome.old_priority, 1);
        assert_eq!(outcome.new_priority, 4);
    }
}
