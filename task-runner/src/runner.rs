//! Allow-listed command execution (§4.3 "Execution"), implementing
//! [`feature_core::queue_service::Verifier`] for the `mark_passing`
//! gate and exposing a combined-output mode for the Task Runner API.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use feature_core::{
    error::{FeatureError, Result},
    queue_service::Verifier,
    repository::VerificationOutcome,
};
use tokio::io::AsyncReadExt;
use tokio::process::Command;

use crate::allowlist::validate_command;

const TIMEOUT: Duration = Duration::from_secs(120);
const OUTPUT_CAP_BYTES: usize = 500_000;
const TRUNCATION_NOTICE: &str = "\n... [output truncated]";

/// Allow-listed shell execution shared by the Task Runner API and the
/// `mark_passing` verification step.
pub struct TaskRunner {
    project_root: PathBuf,
}

impl TaskRunner {
    pub fn new(project_root: PathBuf) -> Self {
        Self { project_root }
    }

    fn resolve_dir<'a>(&'a self, working_dir: Option<&'a Path>) -> &'a Path {
        working_dir.unwrap_or(&self.project_root)
    }

    /// Run `command` in a shell, capturing stdout and stderr
    /// separately, capped to [`OUTPUT_CAP_BYTES`] each, with the full
    /// §4.3 allow-list/timeout/env-override treatment.
    pub async fn run_separate(
        &self,
        command: &str,
        working_dir: Option<&Path>,
    ) -> Result<VerificationOutcome> {
        validate_command(command)?;

        let dir = self.resolve_dir(working_dir);
        let mut child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .current_dir(dir)
            .env("TERM", "dumb")
            .env("NO_COLOR", "1")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| FeatureError::SpawnFailure(e.to_string()))?;

        let mut stdout_pipe = child.stdout.take().expect("stdout was piped");
        let mut stderr_pipe = child.stderr.take().expect("stderr was piped");

        let wait = async {
            let mut stdout_buf = Vec::new();
            let mut stderr_buf = Vec::new();
            let (stdout_result, stderr_result, status) = tokio::join!(
                stdout_pipe.read_to_end(&mut stdout_buf),
                stderr_pipe.read_to_end(&mut stderr_buf),
                child.wait(),
            );
            stdout_result.map_err(|e| FeatureError::Internal(e.to_string()))?;
            stderr_result.map_err(|e| FeatureError::Internal(e.to_string()))?;
            let status = status.map_err(|e| FeatureError::Internal(e.to_string()))?;
            Ok::<_, FeatureError>((stdout_buf, stderr_buf, status))
        };

        match tokio::time::timeout(TIMEOUT, wait).await {
            Ok(Ok((stdout_buf, stderr_buf, status))) => Ok(VerificationOutcome {
                exit_code: status.code().unwrap_or(-1),
                stdout: cap_output(&String::from_utf8_lossy(&stdout_buf)),
                stderr: cap_output(&String::from_utf8_lossy(&stderr_buf)),
            }),
            Ok(Err(e)) => Err(e),
            Err(_) => {
                let _ = child.kill().await;
                Err(FeatureError::VerificationTimedOut {
                    timeout_secs: TIMEOUT.as_secs(),
                })
            }
        }
    }

    /// Run `command`, combining stdout and stderr into one capped
    /// string, for the Task Runner API's `{output, exit_code, ...}`
    /// response shape.
    pub async fn run_combined(&self, command: &str, working_dir: Option<&Path>) -> Result<(String, i32)> {
        let outcome = self.run_separate(command, working_dir).await?;
        let mut combined = outcome.stdout;
        if !outcome.stderr.is_empty() {
            if !combined.is_empty() {
                combined.push('\n');
            }
            combined.push_str(&outcome.stderr);
        }
        Ok((cap_output(&combined), outcome.exit_code))
    }
}

#[async_trait]
impl Verifier for TaskRunner {
    async fn run(&self, command: &str, working_dir: &Path) -> Result<VerificationOutcome> {
        self.run_separate(command, Some(working_dir)).await
    }
}

fn cap_output(s: &str) -> String {
    if s.len() <= OUTPUT_CAP_BYTES {
        return s.to_string();
    }
    let mut end = OUTPUT_CAP_BYTES;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}{}", &s[..end], TRUNCATION_NOTICE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn runs_allowlisted_command_successfully() {
        let runner = TaskRunner::new(PathBuf::from("."));
        let outcome = runner.run_separate("echo hello", None).await.unwrap();
        assert_eq!(outcome.exit_code, 0);
        assert!(outcome.stdout.contains("hello"));
    }

    #[tokio::test]
    async fn rejects_non_allowlisted_command() {
        let runner = TaskRunner::new(PathBuf::from("."));
        let err = runner.run_separate("rm -rf /", None).await.unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn combined_output_merges_stdout_and_stderr() {
        let runner = TaskRunner::new(PathBuf::from("."));
        let (output, exit_code) = runner
            .run_combined("echo out && echo err 1>&2", None)
            .await
            .unwrap();
        assert_eq!(exit_code, 0);
        assert!(output.contains("out"));
    }

    #[test]
    fn cap_output_truncates_and_notes_it() {
        let long = "a".repeat(OUTPUT_CAP_BYTES + 100);
        let capped = cap_output(&long);
        assert!(capped.len() < long.len());
        assert!(capped.ends_with(TRUNCATION_NOTICE));
    }

    #[test]
    fn cap_output_leaves_short_output_untouched() {
        assert_eq!(cap_output("short"), "short");
    }
}
