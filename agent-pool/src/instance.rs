//! Single supervised agent subprocess (§4.2 "AgentInstance lifecycle"),
//! grounded in the original project's `AgentInstance` class in
//! `agent_pool_manager.py`, adapted from Python's `subprocess.Popen` +
//! `asyncio` streaming to `tokio::process::Command` and a spawned
//! reader task, the way the adapted workspace's integration tests drive
//! a child process with `tokio::process::Command`.

use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use feature_core::{
    error::{FeatureError, Result},
    events::{Event, EventBus},
    models::AgentStatus,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Child;
use tokio::sync::Mutex;

use crate::auth_detect::AuthErrorDetector;
use crate::lock;
use crate::redaction::sanitize_output;

/// Parameters fixed at spawn time for one agent subprocess.
#[derive(Debug, Clone)]
pub struct AgentSpawnConfig {
    pub agent_id: String,
    pub project_name: String,
    pub project_dir: PathBuf,
    pub agent_binary: PathBuf,
    pub model: String,
    pub yolo_mode: bool,
}

struct Running {
    child: Child,
    output_task: tokio::task::JoinHandle<()>,
}

struct State {
    status: AgentStatus,
    started_at: Option<DateTime<Utc>>,
    current_feature_id: Option<i64>,
    running: Option<Running>,
}

/// One supervised agent subprocess. Cloning shares the same underlying
/// state (via `Arc`), matching how the pool manager hands instances to
/// both its map and the output-streaming task.
#[derive(Clone)]
pub struct AgentInstance {
    pub config: AgentSpawnConfig,
    state: Arc<Mutex<State>>,
}

impl AgentInstance {
    pub fn new(config: AgentSpawnConfig) -> Self {
        Self {
            config,
            state: Arc::new(Mutex::new(State {
                status: AgentStatus::Stopped,
                started_at: None,
                current_feature_id: None,
                running: None,
            })),
        }
    }

    pub async fn status(&self) -> AgentStatus {
        self.state.lock().await.status
    }

    pub async fn pid(&self) -> Option<u32> {
        self.state
            .lock()
            .await
            .running
            .as_ref()
            .and_then(|r| r.child.id())
    }

    pub async fn started_at(&self) -> Option<DateTime<Utc>> {
        self.state.lock().await.started_at
    }

    pub async fn current_feature_id(&self) -> Option<i64> {
        self.state.lock().await.current_feature_id
    }

    pub async fn set_current_feature_id(&self, id: Option<i64>) {
        self.state.lock().await.current_feature_id = id;
    }

    /// Launch the subprocess, create its lock file, and start the
    /// output-streaming task. Mirrors `AgentInstance.start()`.
    pub async fn start(&self, events: EventBus) -> Result<()> {
        {
            let guard = self.state.lock().await;
            if matches!(
                guard.status,
                AgentStatus::Idle | AgentStatus::Working | AgentStatus::Paused
            ) {
                return Err(FeatureError::InvalidAgentTransition {
                    agent_id: self.config.agent_id.clone(),
                    status: guard.status.to_string(),
                    action: "start".to_string(),
                });
            }
        }

        let mut command = tokio::process::Command::new(&self.config.agent_binary);
        command
            .arg("--project-dir")
            .arg(&self.config.project_dir)
            .arg("--model")
            .arg(&self.config.model);
        if self.config.yolo_mode {
            command.arg("--yolo");
        }
        command
            .env("AGENT_ID", &self.config.agent_id)
            .current_dir(&self.config.project_dir)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = command
            .spawn()
            .map_err(|e| FeatureError::SpawnFailure(e.to_string()))?;

        let pid = child
            .id()
            .ok_or_else(|| FeatureError::SpawnFailure("child exited immediately".to_string()))?;

        lock::create_lock(&self.config.project_dir, &self.config.agent_id, pid)?;

        let stdout = child.stdout.take().expect("stdout was piped");
        let stderr = child.stderr.take().expect("stderr was piped");

        let agent_id = self.config.agent_id.clone();
        let state = self.state.clone();
        let project_dir = self.config.project_dir.clone();
        let output_task = tokio::spawn(stream_output(
            agent_id, stdout, stderr, state, project_dir, events,
        ));

        let mut guard = self.state.lock().await;
        guard.status = AgentStatus::Idle;
        guard.started_at = Some(Utc::now());
        guard.running = Some(Running { child, output_task });

        Ok(())
    }

    /// Politely terminate, escalating to a kill after a 5-second grace
    /// period, per §4.2 "stop".
    pub async fn stop(&self) -> Result<()> {
        let mut guard = self.state.lock().await;
        let Some(mut running) = guard.running.take() else {
            return Err(FeatureError::InvalidAgentTransition {
                agent_id: self.config.agent_id.clone(),
                status: guard.status.to_string(),
                action: "stop".to_string(),
            });
        };

        running.output_task.abort();

        #[cfg(unix)]
        if let Some(pid) = running.child.id() {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;
            let _ = kill(Pid::from_raw(pid as i32), Signal::SIGTERM);
        }

        let waited = tokio::time::timeout(Duration::from_secs(5), running.child.wait()).await;
        if waited.is_err() {
            let _ = running.child.kill().await;
            let _ = running.child.wait().await;
        }

        lock::remove_lock(&self.config.project_dir, &self.config.agent_id);
        guard.status = AgentStatus::Stopped;
        guard.started_at = None;
        guard.current_feature_id = None;
        Ok(())
    }

    /// Suspend the subprocess with `SIGSTOP` (§4.2 "pause / resume").
    #[cfg(unix)]
    pub async fn pause(&self) -> Result<()> {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        let mut guard = self.state.lock().await;
        if !matches!(guard.status, AgentStatus::Idle | AgentStatus::Working) {
            return Err(FeatureError::InvalidAgentTransition {
                agent_id: self.config.agent_id.clone(),
                status: guard.status.to_string(),
                action: "pause".to_string(),
            });
        }
        let pid = guard
            .running
            .as_ref()
            .and_then(|r| r.child.id())
            .ok_or_else(|| FeatureError::InvalidAgentTransition {
                agent_id: self.config.agent_id.clone(),
                status: guard.status.to_string(),
                action: "pause".to_string(),
            })?;

        match kill(Pid::from_raw(pid as i32), Signal::SIGSTOP) {
            Ok(()) => {
                guard.status = AgentStatus::Paused;
                Ok(())
            }
            Err(_) => {
                guard.status = AgentStatus::Crashed;
                lock::remove_lock(&self.config.project_dir, &self.config.agent_id);
                Err(FeatureError::Internal(format!(
                    "agent {} process no longer exists",
                    self.config.agent_id
                )))
            }
        }
    }

    /// Resume a paused subprocess with `SIGCONT`.
    #[cfg(unix)]
    pub async fn resume(&self) -> Result<()> {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        let mut guard = self.state.lock().await;
        if guard.status != AgentStatus::Paused {
            return Err(FeatureError::InvalidAgentTransition {
                agent_id: self.config.agent_id.clone(),
                status: guard.status.to_string(),
                action: "resume".to_string(),
            });
        }
        let pid = guard
            .running
            .as_ref()
            .and_then(|r| r.child.id())
            .ok_or_else(|| FeatureError::InvalidAgentTransition {
                agent_id: self.config.agent_id.clone(),
                status: guard.status.to_string(),
                action: "resume".to_string(),
            })?;

        match kill(Pid::from_raw(pid as i32), Signal::SIGCONT) {
            Ok(()) => {
                guard.status = AgentStatus::Idle;
                Ok(())
            }
            Err(_) => {
                guard.status = AgentStatus::Crashed;
                lock::remove_lock(&self.config.project_dir, &self.config.agent_id);
                Err(FeatureError::Internal(format!(
                    "agent {} process no longer exists",
                    self.config.agent_id
                )))
            }
        }
    }

    #[cfg(not(unix))]
    pub async fn pause(&self) -> Result<()> {
        Err(FeatureError::Internal(
            "pause/resume requires Unix signal support".to_string(),
        ))
    }

    #[cfg(not(unix))]
    pub async fn resume(&self) -> Result<()> {
        Err(FeatureError::Internal(
            "pause/resume requires Unix signal support".to_string(),
        ))
    }

    /// Poll process liveness; flip to `crashed` if it died unreported.
    pub async fn healthcheck(&self) -> bool {
        let mut guard = self.state.lock().await;
        let Some(running) = guard.running.as_mut() else {
            return guard.status == AgentStatus::Stopped;
        };

        match running.child.try_wait() {
            Ok(Some(_)) => {
                if matches!(
                    guard.status,
                    AgentStatus::Idle | AgentStatus::Working | AgentStatus::Paused
                ) {
                    guard.status = AgentStatus::Crashed;
                    lock::remove_lock(&self.config.project_dir, &self.config.agent_id);
                }
                false
            }
            Ok(None) => true,
            Err(_) => false,
        }
    }
}

async fn stream_output(
    agent_id: String,
    stdout: tokio::process::ChildStdout,
    stderr: tokio::process::ChildStderr,
    state: Arc<Mutex<State>>,
    project_dir: PathBuf,
    events: EventBus,
) {
    let mut detector = AuthErrorDetector::new();
    let mut lines = merged_lines(stdout, stderr);

    while let Some(line) = lines.recv().await {
        if let Some(help) = detector.observe_line(&line) {
            for help_line in help {
                events.publish(Event::AgentLog {
                    agent_id: agent_id.clone(),
                    line: help_line,
                    timestamp: Utc::now(),
                });
            }
        }
        events.publish(Event::AgentLog {
            agent_id: agent_id.clone(),
            line: sanitize_output(&line),
            timestamp: Utc::now(),
        });
    }

    if let Some(help) = detector.observe_exit() {
        for help_line in help {
            events.publish(Event::AgentLog {
                agent_id: agent_id.clone(),
                line: help_line,
                timestamp: Utc::now(),
            });
        }
    }

    let mut guard = state.lock().await;
    let exit_status = match guard.running.as_mut() {
        Some(running) => running.child.try_wait().ok().flatten(),
        None => None,
    };

    let crashed = exit_status.map(|s| !s.success()).unwrap_or(true);
    if matches!(guard.status, AgentStatus::Idle | AgentStatus::Working) {
        guard.status = if crashed {
            AgentStatus::Crashed
        } else {
            AgentStatus::Stopped
        };
    }
    lock::remove_lock(&project_dir, &agent_id);
}

/// Merge stdout and stderr into a single ordered-enough line stream,
/// matching §4.2's "stdout+stderr combined into one pipe".
fn merged_lines(
    stdout: tokio::process::ChildStdout,
    stderr: tokio::process::ChildStderr,
) -> tokio::sync::mpsc::UnboundedReceiver<String> {
    let (tx, rx) = tokio::sync::mpsc::unbounded_channel();

    let tx_out = tx.clone();
    tokio::spawn(async move {
        let mut reader = BufReader::new(stdout).lines();
        while let Ok(Some(line)) = reader.next_line().await {
            if tx_out.send(line).is_err() {
                break;
            }
        }
    });

    tokio::spawn(async move {
        let mut reader = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = reader.next_line().await {
            if tx.send(line).is_err() {
                break;
            }
        }
    });

    rx
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn new_instance_starts_stopped() {
        let instance = AgentInstance::new(AgentSpawnConfig {
            agent_id: "abcd1234".to_string(),
            project_name: "demo".to_string(),
            project_dir: PathBuf::from("."),
            agent_binary: PathBuf::from("/bin/true"),
            model: "claude-opus-4-6".to_string(),
            yolo_mode: false,
        });
        assert_eq!(instance.status().await, AgentStatus::Stopped);
        assert!(instance.pid().await.is_none());
    }

    #[tokio::test]
    async fn stop_on_never_started_instance_errors() {
        let instance = AgentInstance::new(AgentSpawnConfig {
            agent_id: "abcd1234".to_string(),
            project_name: "demo".to_string(),
            project_dir: PathBuf::from("."),
            agent_binary: PathBuf::from("/bin/true"),
            model: "claude-opus-4-6".to_string(),
            yolo_mode: false,
        });
        assert!(instance.stop().await.is_err());
    }
}
