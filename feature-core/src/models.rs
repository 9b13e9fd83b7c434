//! Domain models for the feature queue: `Feature`, its append-only audit
//! trail (`StatusChangeLog`), the `Agent` pool records, and the optional
//! `FeatureDependency` graph.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A unit of implementation work tracked by the queue.
///
/// Invariants (enforced by the repository layer, not by this struct):
/// `passes ⇒ ¬in_progress`; `marked_passing_at.is_some() == passes`;
/// `assigned_to_agent_id.is_some()` whenever `in_progress`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    pub id: i64,
    pub priority: i64,
    pub category: String,
    pub name: String,
    pub description: String,
    pub steps: Vec<String>,
    pub passes: bool,
    pub in_progress: bool,
    pub assigned_to_agent_id: Option<String>,
    pub attempt_count: i64,
    pub verification_command: Option<String>,
    pub verification_evidence: Option<String>,
    pub marked_passing_at: Option<DateTime<Utc>>,
    pub inserted_at: DateTime<Utc>,
}

impl Feature {
    /// A feature is eligible for `mark_in_progress` iff it is neither
    /// already passing nor already claimed by another agent.
    pub fn is_claimable(&self) -> bool {
        !self.passes && !self.in_progress
    }
}

/// Fields required to insert a new feature. Priority is assigned by the
/// repository under the priority lock, never supplied by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewFeature {
    pub category: String,
    pub name: String,
    pub description: String,
    pub steps: Vec<String>,
    #[serde(default)]
    pub verification_command: Option<String>,
}

/// One append-only row per feature-state transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusChangeLog {
    pub id: i64,
    pub feature_id: i64,
    pub feature_name: String,
    pub old_status: String,
    pub new_status: String,
    pub evidence: Option<String>,
    pub verification_output: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Status of a supervised agent subprocess.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentStatus {
    Idle,
    Working,
    Paused,
    Stopped,
    Crashed,
}

impl std::fmt::Display for AgentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AgentStatus::Idle => "idle",
            AgentStatus::Working => "working",
            AgentStatus::Paused => "paused",
            AgentStatus::Stopped => "stopped",
            AgentStatus::Crashed => "crashed",
        };
        write!(f, "{s}")
    }
}

/// Persisted record of a pool-supervised agent subprocess.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    pub agent_id: String,
    pub project_name: String,
    pub status: AgentStatus,
    pub model: String,
    pub yolo_mode: bool,
    pub pid: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub last_heartbeat: Option<DateTime<Utc>>,
    pub current_feature_id: Option<i64>,
}

/// The kind of a directed dependency edge between two features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DependencyKind {
    Blocks,
    Requires,
    Related,
}

impl std::fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DependencyKind::Blocks => "blocks",
            DependencyKind::Requires => "requires",
            DependencyKind::Related => "related",
        };
        write!(f, "{s}")
    }
}

/// A directed edge `feature_id -> depends_on_id` in the optional
/// dependency graph extension (§4.4).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureDependency {
    pub id: i64,
    pub feature_id: i64,
    pub depends_on_id: i64,
    pub kind: DependencyKind,
    pub notes: Option<String>,
}

/// Aggregate queue statistics returned by `get_stats()`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureStats {
    pub passing: i64,
    pub in_progress: i64,
    pub total: i64,
    pub percentage: f64,
}

impl FeatureStats {
    /// `percentage = round(100 * passing / total, 1)`, or `0.0` when
    /// `total == 0`.
    pub fn compute(passing: i64, in_progress: i64, total: i64) -> Self {
        let percentage = if total == 0 {
            0.0
        } else {
            ((passing as f64 / total as f64) * 1000.0).round() / 10.0
        };
        Self {
            passing,
            in_progress,
            total,
            percentage,
        }
    }
}

/// Filter parameters for listing features.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureFilter {
    pub category: Option<String>,
    pub passes: Option<bool>,
    pub in_progress: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn claimable_requires_not_passing_and_not_in_progress() {
        let f = sample_feature();
        assert!(f.is_claimable());

        let mut claimed = f.clone();
        claimed.in_progress = true;
        assert!(!claimed.is_claimable());

        let mut passed = f;
        passed.passes = true;
        assert!(!passed.is_claimable());
    }

    #[test]
    fn stats_percentage_rounds_to_one_decimal() {
        let stats = FeatureStats::compute(1, 0, 3);
        assert_eq!(stats.percentage, 33.3);
    }

    #[test]
    fn stats_percentage_zero_when_no_features() {
        let stats = FeatureStats::compute(0, 0, 0);
        assert_eq!(stats.percentage, 0.0);
    }

    fn sample_feature() -> Feature {
        Feature {
            id: 1,
            priority: 1,
            category: "A".into(),
            name: "N".into(),
            description: "D".into(),
            steps: vec!["s".into()],
            passes: false,
            in_progress: false,
            assigned_to_agent_id: None,
            attempt_count: 0,
            verification_command: None,
            verification_evidence: None,
            marked_passing_at: None,
            inserted_at: Utc::now(),
        }
    }
}
