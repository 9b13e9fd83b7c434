//! Wire-shape DTOs for the three JSON APIs described in §6. These are
//! plain `serde` structs with no transport dependency, so that a thin
//! HTTP/WebSocket layer (explicitly out of scope, §1) can serialize
//! them without this crate ever depending on a web framework.

use serde::{Deserialize, Serialize};

use crate::models::{Agent, Feature, FeatureStats};

// --- Feature API -----------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetStatsResponse {
    pub passing: i64,
    pub in_progress: i64,
    pub total: i64,
    pub percentage: f64,
}

impl From<FeatureStats> for GetStatsResponse {
    fn from(s: FeatureStats) -> Self {
        Self {
            passing: s.passing,
            in_progress: s.in_progress,
            total: s.total,
            percentage: s.percentage,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GetNextResponse {
    Feature(Box<Feature>),
    /// Exact literal carried over from the original implementation:
    /// `{"error": "All features are passing! No more work to do."}`
    NoWork { error: String },
}

impl GetNextResponse {
    pub fn no_work() -> Self {
        Self::NoWork {
            error: "All features are passing! No more work to do.".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetForRegressionResponse {
    pub features: Vec<Feature>,
    pub count: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarkPassingRequest {
    pub feature_id: i64,
    pub evidence: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct MarkPassingResponse {
    pub success: bool,
    pub feature: Option<Feature>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SkipFeatureRequest {
    pub feature_id: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SkipFeatureResponse {
    pub success: bool,
    pub old_priority: i64,
    pub new_priority: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarkInProgressRequest {
    pub feature_id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ClearInProgressRequest {
    pub feature_id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegressionRequest {
    #[serde(default = "default_regression_limit")]
    pub limit: i64,
}

fn default_regression_limit() -> i64 {
    3
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeatureCreateItem {
    pub category: String,
    pub name: String,
    pub description: String,
    pub steps: Vec<String>,
    #[serde(default)]
    pub verification_command: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BulkCreateRequest {
    pub features: Vec<FeatureCreateItem>,
}

/// Response for the dependency graph's "query blocked vs ready sets"
/// operation (§4.4).
#[derive(Debug, Clone, Serialize)]
pub struct BlockedReadySetsResponse {
    pub ready: Vec<Feature>,
    pub blocked: Vec<Feature>,
}

// --- Agent Pool API ----------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct SpawnAgentsRequest {
    #[serde(default = "default_spawn_count")]
    pub count: u32,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub yolo_mode: bool,
}

fn default_spawn_count() -> u32 {
    1
}

fn default_model() -> String {
    "claude-opus-4-6".to_string()
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentInfo {
    pub agent_id: String,
    pub status: String,
    pub pid: Option<u32>,
    pub model: String,
    pub yolo_mode: bool,
    pub current_feature_id: Option<i64>,
}

impl From<&Agent> for AgentInfo {
    fn from(a: &Agent) -> Self {
        Self {
            agent_id: a.agent_id.clone(),
            status: a.status.to_string(),
            pid: a.pid,
            model: a.model.clone(),
            yolo_mode: a.yolo_mode,
            current_feature_id: a.current_feature_id,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SpawnAgentResponse {
    pub spawned: usize,
    pub agents: Vec<AgentInfo>,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PoolStatus {
    pub project_name: String,
    pub agents: Vec<AgentInfo>,
    pub active_count: usize,
    pub idle_count: usize,
    pub working_count: usize,
    pub paused_count: usize,
    pub total_count: usize,
    pub max_agents: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentActionResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StopAllResponse {
    pub stopped: usize,
    pub errors: Vec<String>,
}

// --- Task Runner API ----------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct RunTaskRequest {
    pub task: String,
    #[serde(default)]
    pub custom_cmd: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunTaskResponse {
    pub output: String,
    pub exit_code: i32,
    pub command: String,
    pub success: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PredefinedTask {
    pub name: String,
    pub command: String,
    pub description: String,
}
