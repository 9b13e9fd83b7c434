//! Integration tests for the mocks crate
//!
//! Tests the mock implementations and utilities to ensure they work correctly
//! and provide the expected testing capabilities.

use feature_core::{DependencyKind, Event, FeatureError, FeatureQueueService};
use mocks::*;

#[tokio::test]
async fn test_mock_repository_basic_operations() {
    let repo = MockFeatureRepository::new();

    let new_feature = create_new_feature();
    let feature = repo.create(new_feature).await.unwrap();

    assert_eq!(feature.id, 1);
    assert_eq!(feature.name, "New Test Feature");
    assert!(!feature.passes);

    repo.assert_called("create");

    let retrieved = repo.get_by_id(feature.id).await.unwrap();
    assert_eq!(retrieved.id, feature.id);

    repo.assert_called("get_by_id");
}

#[tokio::test]
async fn test_mock_repository_error_injection() {
    let repo = MockFeatureRepository::new();

    repo.inject_error(FeatureError::FeatureNotFound(1));

    let result = repo.get_by_id(1).await;
    assert!(result.is_err());
    assert!(matches!(result.unwrap_err(), FeatureError::FeatureNotFound(_)));

    repo.clear_error();
    let result = repo.get_by_id(1).await;
    assert!(result.is_err(), "feature 1 was never created");
    assert!(matches!(result.unwrap_err(), FeatureError::FeatureNotFound(_)));
}

#[tokio::test]
async fn test_mock_repository_claim_lifecycle() {
    let repo = MockFeatureRepository::new();

    let feature = repo.create(create_new_feature()).await.unwrap();

    let claimed = repo.mark_in_progress(feature.id).await.unwrap();
    assert!(claimed.in_progress);

    let result = repo.mark_in_progress(feature.id).await;
    assert!(result.is_err());
    assert!(matches!(result.unwrap_err(), FeatureError::AlreadyInProgress(_)));

    let passing = repo
        .commit_passing(feature.id, "evidence", None)
        .await
        .unwrap();
    assert!(passing.passes);
    assert!(!passing.in_progress);
}

#[tokio::test]
async fn test_fixtures_create_features_in_all_states() {
    let features = create_features_in_all_states();

    assert_eq!(features.len(), 3);
    assert!(features.iter().any(|f| f.is_claimable()));
    assert!(features.iter().any(|f| f.in_progress));
    assert!(features.iter().any(|f| f.passes));
}

#[tokio::test]
async fn test_builders_feature_builder() {
    let feature = FeatureBuilder::new()
        .with_id(42)
        .with_name("Built Feature")
        .with_category("infra")
        .with_in_progress("ag000001")
        .build();

    assert_eq!(feature.id, 42);
    assert_eq!(feature.name, "Built Feature");
    assert_eq!(feature.category, "infra");
    assert!(feature.in_progress);
    assert_eq!(feature.assigned_to_agent_id.as_deref(), Some("ag000001"));
}

#[tokio::test]
async fn test_assertions_feature_equals() {
    let feature1 = create_test_feature();
    let mut feature2 = feature1.clone();

    assert_feature_equals(&feature1, &feature2);

    feature2.name = "Different Name".to_string();

    let result = std::panic::catch_unwind(|| {
        assert_feature_equals(&feature1, &feature2);
    });
    assert!(result.is_err());
}

#[tokio::test]
async fn test_assertions_claimability() {
    let queued = create_test_feature();
    assert_claimable(&queued);

    let in_progress = create_test_feature_in_progress("ag000001");
    assert_not_claimable(&in_progress);

    let passing = create_test_feature_passing();
    assert_not_claimable(&passing);
}

#[tokio::test]
async fn test_generators_realistic_data() {
    let feature = generate_random_feature();

    assert!(feature.id > 0);
    assert!(!feature.category.is_empty());
    assert!(!feature.name.is_empty());
    assert!(!feature.description.is_empty());
}

#[tokio::test]
async fn test_mock_repository_concurrent_access() {
    use std::sync::Arc;
    use tokio::task::JoinSet;

    let repo = Arc::new(MockFeatureRepository::new());
    let mut set = JoinSet::new();

    for i in 0..10 {
        let repo_clone = repo.clone();
        set.spawn(async move {
            let new_feature = NewFeatureBuilder::new()
                .with_name(format!("Concurrent Feature {i}"))
                .build();

            repo_clone.create(new_feature).await.unwrap()
        });
    }

    let mut features = Vec::new();
    while let Some(result) = set.join_next().await {
        features.push(result.unwrap());
    }

    assert_eq!(features.len(), 10);

    let mut ids: Vec<_> = features.iter().map(|f| f.id).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 10);
}

#[tokio::test]
async fn test_mock_repository_stats() {
    let features = create_features_in_all_states();
    let repo_with_features = MockFeatureRepository::with_features(features);

    let stats = repo_with_features.get_stats().await.unwrap();

    assert_eq!(stats.total, 3);
    assert_eq!(stats.passing, 1);
    assert_eq!(stats.in_progress, 1);
}

#[tokio::test]
async fn test_contract_tests_with_mock() {
    let repo = MockFeatureRepository::new();

    test_repository_contract(&repo).await;

    let history = repo.call_history();
    assert!(!history.is_empty(), "Mock should have recorded method calls");
    assert!(history.iter().any(|call| call.contains("create")));
    assert!(history.iter().any(|call| call.contains("get_by_id")));
}

struct NoopVerifier;

#[async_trait::async_trait]
impl feature_core::Verifier for NoopVerifier {
    async fn run(
        &self,
        _command: &str,
        _working_dir: &std::path::Path,
    ) -> feature_core::Result<feature_core::VerificationOutcome> {
        Ok(feature_core::VerificationOutcome {
            exit_code: 0,
            stdout: String::new(),
            stderr: String::new(),
        })
    }
}

struct NoopBackup;

#[async_trait::async_trait]
impl feature_core::BackupHook for NoopBackup {
    async fn maybe_backup(&self) -> feature_core::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn test_dependency_graph_blocks_and_resolves_get_next() {
    let repo = std::sync::Arc::new(MockFeatureRepository::new());

    let blocker = repo.create(create_new_feature()).await.unwrap();
    let dependent = repo
        .create(NewFeatureBuilder::new().with_name("Dependent").build())
        .await
        .unwrap();
    repo.add_edge(dependent.id, blocker.id, DependencyKind::Requires, None)
        .await
        .unwrap();

    let queue = FeatureQueueService::new(
        repo.clone(),
        std::path::PathBuf::from("."),
        feature_core::EventBus::new(),
    )
    .with_dependencies(repo.clone() as std::sync::Arc<dyn feature_core::DependencyRepository>);

    let next = queue.get_next().await.unwrap().unwrap();
    assert_eq!(next.id, blocker.id, "blocked dependent must not be returned first");

    let (ready, blocked) = queue.get_ready_and_blocked().await.unwrap();
    assert_eq!(ready.iter().map(|f| f.id).collect::<Vec<_>>(), vec![blocker.id]);
    assert_eq!(blocked.iter().map(|f| f.id).collect::<Vec<_>>(), vec![dependent.id]);

    let mut events = queue.events().subscribe();

    queue.mark_in_progress(blocker.id).await.unwrap();
    let evidence = "x".repeat(60);
    queue
        .mark_passing(blocker.id, &evidence, &NoopVerifier, &NoopBackup)
        .await
        .unwrap();

    let next = queue.get_next().await.unwrap().unwrap();
    assert_eq!(next.id, dependent.id, "dependent becomes ready once its blocker passes");

    let mut saw_resolved = false;
    while let Ok(event) = events.try_recv() {
        if let Event::DependencyResolved {
            feature_id,
            unblocked_feature_ids,
        } = event
        {
            assert_eq!(feature_id, blocker.id);
            assert_eq!(unblocked_feature_ids, vec![dependent.id]);
            saw_resolved = true;
        }
    }
    assert!(saw_resolved, "mark_passing should publish DependencyResolved");
}
