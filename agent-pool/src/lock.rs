//! Per-agent lock files under `<project>/.agents/<agent_id>.lock`
//! (§4.2 "spawn", "Orphaned lock recovery"), grounded in the original
//! project's `_create_lock`/`_remove_lock`/`cleanup_orphaned_agent_locks`.

use std::fs;
use std::path::{Path, PathBuf};

use feature_core::error::{FeatureError, Result};

pub fn agents_dir(project_dir: &Path) -> PathBuf {
    project_dir.join(".agents")
}

pub fn lock_path(project_dir: &Path, agent_id: &str) -> PathBuf {
    agents_dir(project_dir).join(format!("{agent_id}.lock"))
}

pub fn create_lock(project_dir: &Path, agent_id: &str, pid: u32) -> Result<()> {
    let dir = agents_dir(project_dir);
    fs::create_dir_all(&dir)
        .map_err(|e| FeatureError::Filesystem(format!("failed to create .agents dir: {e}")))?;
    fs::write(lock_path(project_dir, agent_id), pid.to_string())
        .map_err(|e| FeatureError::Filesystem(format!("failed to write lock file: {e}")))
}

pub fn remove_lock(project_dir: &Path, agent_id: &str) {
    let _ = fs::remove_file(lock_path(project_dir, agent_id));
}

/// Scan `<project>/.agents/*.lock`, removing any lock whose PID is no
/// longer a live process on the host. Returns the count removed.
///
/// This does not attempt to inspect the candidate process's command
/// line (unlike the original project's `psutil.Process.cmdline()`
/// check) since that requires a `/proc`-reading crate this workspace
/// does not otherwise need; a live PID with an unrelated command line
/// is treated conservatively as "still running" and its lock kept.
pub fn cleanup_orphaned_locks(project_dir: &Path) -> usize {
    let dir = agents_dir(project_dir);
    let Ok(entries) = fs::read_dir(&dir) else {
        return 0;
    };

    let mut cleaned = 0;
    for entry in entries.filter_map(|e| e.ok()) {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("lock") {
            continue;
        }

        let remove = match fs::read_to_string(&path)
            .ok()
            .and_then(|s| s.trim().parse::<i32>().ok())
        {
            Some(pid) => !process_is_alive(pid),
            None => true,
        };

        if remove && fs::remove_file(&path).is_ok() {
            cleaned += 1;
        }
    }
    cleaned
}

#[cfg(unix)]
fn process_is_alive(pid: i32) -> bool {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;
    kill(Pid::from_raw(pid), None).is_ok()
}

#[cfg(not(unix))]
fn process_is_alive(_pid: i32) -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_and_remove_lock_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        create_lock(dir.path(), "abcd1234", 12345).unwrap();
        let path = lock_path(dir.path(), "abcd1234");
        assert_eq!(fs::read_to_string(&path).unwrap(), "12345");
        remove_lock(dir.path(), "abcd1234");
        assert!(!path.exists());
    }

    #[test]
    fn cleanup_removes_locks_for_dead_pids() {
        let dir = tempfile::tempdir().unwrap();
        create_lock(dir.path(), "dead0001", 999_999_999).unwrap();
        let cleaned = cleanup_orphaned_locks(dir.path());
        assert_eq!(cleaned, 1);
        assert!(!lock_path(dir.path(), "dead0001").exists());
    }

    #[test]
    fn cleanup_removes_malformed_lock_files() {
        let dir = tempfile::tempdir().unwrap();
        let agents = agents_dir(dir.path());
        fs::create_dir_all(&agents).unwrap();
        fs::write(agents.join("bad.lock"), "not-a-pid").unwrap();
        let cleaned = cleanup_orphaned_locks(dir.path());
        assert_eq!(cleaned, 1);
    }

    #[test]
    fn cleanup_keeps_locks_for_live_pids() {
        let dir = tempfile::tempdir().unwrap();
        let my_pid = std::process::id();
        create_lock(dir.path(), "alive001", my_pid).unwrap();
        let cleaned = cleanup_orphaned_locks(dir.path());
        assert_eq!(cleaned, 0);
        assert!(lock_path(dir.path(), "alive001").exists());
    }
}
