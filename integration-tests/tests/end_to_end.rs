//! End-to-end scenarios (§8) exercising the feature queue, agent pool, and
//! task runner together, against a real SQLite-backed repository and a
//! real subprocess-driven task runner rather than the in-memory mocks.

use std::sync::Arc;

use database::{BackupManager, SqliteFeatureRepository};
use feature_core::{EventBus, FeatureError, FeatureQueueService, NewFeature};
use task_runner::TaskRunner;
use tempfile::TempDir;

struct Harness {
    _dir: TempDir,
    queue: FeatureQueueService<SqliteFeatureRepository>,
    runner: TaskRunner,
    backup: BackupManager,
}

async fn harness() -> Harness {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("features.db");
    let repo = SqliteFeatureRepository::new(db_path.to_str().unwrap())
        .await
        .unwrap();
    repo.migrate().await.unwrap();

    let runner = TaskRunner::new(dir.path().to_path_buf());
    let backup = BackupManager::new(db_path, dir.path());
    let queue = FeatureQueueService::new(Arc::new(repo), dir.path().to_path_buf(), EventBus::new());

    Harness {
        _dir: dir,
        queue,
        runner,
        backup,
    }
}

fn new_feature(name: &str) -> NewFeature {
    NewFeature {
        category: "A".to_string(),
        name: name.to_string(),
        description: "D".to_string(),
        steps: vec!["s".to_string()],
        verification_command: None,
    }
}

/// S1 — happy path: create, claim, mark passing with no verification
/// command, one log row and one backup file appear.
#[tokio::test]
async fn s1_happy_path() {
    let h = harness().await;

    let feature = h.queue.create(new_feature("N")).await.unwrap();
    assert_eq!(feature.id, 1);
    assert_eq!(feature.priority, 1);

    h.queue.mark_in_progress(feature.id).await.unwrap();

    let evidence = "x".repeat(60);
    let result = h
        .queue
        .mark_passing(feature.id, &evidence, &h.runner, &h.backup)
        .await
        .unwrap();
    assert!(result.passes);

    let changes = h
        .queue
        .get_stats()
        .await
        .unwrap();
    assert_eq!(changes.passing, 1);

    let backups_dir = h._dir.path().join(".features_backups");
    assert!(backups_dir.exists());
    assert_eq!(std::fs::read_dir(&backups_dir).unwrap().count(), 1);
}

/// S2 — evidence too short is rejected and leaves state unchanged.
#[tokio::test]
async fn s2_evidence_too_short() {
    let h = harness().await;

    let feature = h.queue.create(new_feature("N")).await.unwrap();
    h.queue.mark_in_progress(feature.id).await.unwrap();

    let err = h
        .queue
        .mark_passing(feature.id, "short", &h.runner, &h.backup)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("at least 50"));

    let unchanged = h.queue.get_next().await.unwrap().unwrap();
    assert!(!unchanged.passes);
    assert!(unchanged.in_progress);
}

/// S3 — marking passing a feature that was never claimed fails with a
/// "NOT in-progress" error and leaves state unchanged.
#[tokio::test]
async fn s3_not_in_progress() {
    let h = harness().await;

    let feature = h.queue.create(new_feature("N")).await.unwrap();

    let evidence = "x".repeat(60);
    let err = h
        .queue
        .mark_passing(feature.id, &evidence, &h.runner, &h.backup)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("NOT in-progress"));

    let unchanged = h.queue.get_next().await.unwrap().unwrap();
    assert!(!unchanged.passes);
    assert!(!unchanged.in_progress);
}

/// S4 — a failing verification command rejects the commit and leaves the
/// feature claimed but not passing.
#[tokio::test]
async fn s4_verification_fails() {
    let h = harness().await;

    let feature = h
        .queue
        .create(NewFeature {
            verification_command: Some("exit 1".to_string()),
            ..new_feature("N")
        })
        .await
        .unwrap();
    h.queue.mark_in_progress(feature.id).await.unwrap();

    let evidence = "x".repeat(60);
    let err = h
        .queue
        .mark_passing(feature.id, &evidence, &h.runner, &h.backup)
        .await
        .unwrap_err();
    match err {
        FeatureError::VerificationFailed { exit_code, .. } => assert_eq!(exit_code, 1),
        other => panic!("expected VerificationFailed, got {other:?}"),
    }

    let reloaded = h.queue.get_next().await.unwrap().unwrap();
    assert!(reloaded.in_progress);
    assert!(!reloaded.passes);
}

/// S5 — a fourth `mark_passing` within the rate-limit window is rejected
/// without writing a new status-change row.
#[tokio::test]
async fn s5_rate_limit() {
    let h = harness().await;
    let evidence = "x".repeat(60);

    let mut last_id = 0;
    for i in 0..3 {
        let feature = h.queue.create(new_feature(&format!("N{i}"))).await.unwrap();
        h.queue.mark_in_progress(feature.id).await.unwrap();
        h.queue
            .mark_passing(feature.id, &evidence, &h.runner, &h.backup)
            .await
            .unwrap();
        last_id = feature.id;
    }

    let fourth = h.queue.create(new_feature("N3")).await.unwrap();
    h.queue.mark_in_progress(fourth.id).await.unwrap();

    let changes_before = h.queue.list_status_changes(fourth.id).await.unwrap().len();
    let err = h
        .queue
        .mark_passing(fourth.id, &evidence, &h.runner, &h.backup)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Rate limit"));

    let changes_after = h.queue.list_status_changes(fourth.id).await.unwrap().len();
    assert_eq!(changes_before, changes_after);
    assert_ne!(last_id, fourth.id);
}

/// S6 — skip rotates a feature to the tail; `get_next` then returns what
/// was previously second in line.
#[tokio::test]
async fn s6_skip_rotates_tail() {
    let h = harness().await;

    let f1 = h.queue.create(new_feature("one")).await.unwrap();
    let f2 = h.queue.create(new_feature("two")).await.unwrap();
    let _f3 = h.queue.create(new_feature("three")).await.unwrap();

    let outcome = h.queue.skip(f1.id).await.unwrap();
    assert_eq!(outcome.old_priority, 1);
    assert_eq!(outcome.new_priority, 4);

    let next = h.queue.get_next().await.unwrap().unwrap();
    assert_eq!(next.id, f2.id);
}

/// S7 — an externally killed agent subprocess is reaped as `crashed` on
/// the next healthcheck sweep, and its lock file is removed.
#[tokio::test]
#[cfg(unix)]
async fn s7_agent_crash_reaps_lock() {
    use agent_pool::AgentPoolManager;
    use mocks::MockFeatureRepository;
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().unwrap();
    let agent_binary = dir.path().join("fake-agent.sh");
    std::fs::write(&agent_binary, "#!/bin/sh\nsleep 30\n").unwrap();
    let mut perms = std::fs::metadata(&agent_binary).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&agent_binary, perms).unwrap();

    let repo = Arc::new(MockFeatureRepository::new());
    let pool = AgentPoolManager::new(
        "demo",
        dir.path().to_path_buf(),
        agent_binary,
        repo,
        EventBus::new(),
    );

    let instance = pool.spawn_agent("claude".to_string(), false).await.unwrap();
    let pid = instance.pid().await.unwrap();
    let lock_path = dir.path().join(".agents").join(format!("{}.lock", instance.config.agent_id));
    assert!(lock_path.exists(), "spawn should have written a lock file");

    kill(Pid::from_raw(pid as i32), Signal::SIGKILL).unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;

    let results = pool.healthcheck_all().await;
    assert_eq!(results.len(), 1);
    assert_eq!(*results.values().next().unwrap(), false);

    let status = pool.get_pool_status().await.unwrap();
    assert_eq!(status.total_count, 0, "crashed agent should be reaped from the pool");
    assert!(!lock_path.exists(), "crash reaping should remove the lock file");
}

/// S8 — secret redaction replaces an entire API key assignment verbatim.
#[tokio::test]
async fn s8_secret_redaction() {
    let line = "ANTHROPIC_API_KEY=abc123";
    let redacted = agent_pool::sanitize_output(line);
    assert_eq!(redacted, "[REDACTED]");
}
