use chrono::{DateTime, Utc};
use feature_core::{
    error::FeatureError,
    models::{Agent, AgentStatus, Feature, StatusChangeLog},
};
use sqlx::{sqlite::SqliteRow, Row};

pub fn agent_status_to_string(status: AgentStatus) -> &'static str {
    match status {
        AgentStatus::Idle => "idle",
        AgentStatus::Working => "working",
        AgentStatus::Paused => "paused",
        AgentStatus::Stopped => "stopped",
        AgentStatus::Crashed => "crashed",
    }
}

pub fn string_to_agent_status(s: &str) -> Result<AgentStatus, FeatureError> {
    match s {
        "idle" => Ok(AgentStatus::Idle),
        "working" => Ok(AgentStatus::Working),
        "paused" => Ok(AgentStatus::Paused),
        "stopped" => Ok(AgentStatus::Stopped),
        "crashed" => Ok(AgentStatus::Crashed),
        other => Err(FeatureError::Internal(format!(
            "unknown agent status in database: {other}"
        ))),
    }
}

/// Serialize `steps` the way the repository stores it: a JSON array in
/// a TEXT column, mirroring the original project's `steps` JSON column.
pub fn steps_to_json(steps: &[String]) -> String {
    serde_json::to_string(steps).unwrap_or_else(|_| "[]".to_string())
}

pub fn json_to_steps(json: &str) -> Vec<String> {
    serde_json::from_str(json).unwrap_or_default()
}

pub fn row_to_feature(row: &SqliteRow) -> Result<Feature, FeatureError> {
    let steps_json: String = row.try_get("steps").unwrap_or_else(|_| "[]".to_string());

    Ok(Feature {
        id: row.get("id"),
        priority: row.get("priority"),
        category: row.get("category"),
        name: row.get("name"),
        description: row.get("description"),
        steps: json_to_steps(&steps_json),
        passes: row.get("passes"),
        in_progress: row.get("in_progress"),
        assigned_to_agent_id: row.try_get("assigned_to_agent_id").ok(),
        attempt_count: row.try_get("attempt_count").unwrap_or(0),
        verification_command: row.try_get("verification_command").ok(),
        verification_evidence: row.try_get("verification_evidence").ok(),
        marked_passing_at: row.try_get("marked_passing_at").ok(),
        inserted_at: row
            .try_get("inserted_at")
            .unwrap_or_else(|_| Utc::now()),
    })
}

pub fn row_to_status_change_log(row: &SqliteRow) -> Result<StatusChangeLog, FeatureError> {
    Ok(StatusChangeLog {
        id: row.get("id"),
        feature_id: row.get("feature_id"),
        feature_name: row.get("feature_name"),
        old_status: row.get("old_status"),
        new_status: row.get("new_status"),
        evidence: row.try_get("evidence").ok(),
        verification_output: row.try_get("verification_output").ok(),
        timestamp: row.get("timestamp"),
    })
}

pub fn row_to_agent(row: &SqliteRow) -> Result<Agent, FeatureError> {
    let status_str: String = row.get("status");
    Ok(Agent {
        agent_id: row.get("agent_id"),
        project_name: row.get("project_name"),
        status: string_to_agent_status(&status_str)?,
        model: row.get("model"),
        yolo_mode: row.get("yolo_mode"),
        pid: row
            .try_get::<i64, _>("pid")
            .ok()
            .map(|v| v as u32),
        created_at: row.get("created_at"),
        started_at: row.try_get("started_at").ok(),
        last_heartbeat: row.try_get("last_heartbeat").ok(),
        current_feature_id: row.try_get("current_feature_id").ok(),
    })
}

pub fn sqlx_error_to_feature_error(err: sqlx::Error) -> FeatureError {
    match &err {
        sqlx::Error::Database(db_err) => {
            let message = db_err.message();
            FeatureError::Database(format!("Database constraint error: {message}"))
        }
        sqlx::Error::RowNotFound => FeatureError::Database("Unexpected RowNotFound error".to_string()),
        sqlx::Error::PoolTimedOut => FeatureError::Database("Connection pool timeout".to_string()),
        sqlx::Error::Io(io_err) => FeatureError::Database(format!("Database I/O error: {io_err}")),
        _ => FeatureError::Database(format!("Database operation failed: {err}")),
    }
}

/// UTC timestamp formatted as `yyyymmdd_HHMMSS`, used for backup file
/// naming (§4.5).
pub fn backup_timestamp(now: DateTime<Utc>) -> String {
    now.format("%Y%m%d_%H%M%S").to_string()
}
