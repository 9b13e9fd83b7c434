//! Contract test helpers for validating trait implementations
//!
//! Provides standardized tests that any implementation of `FeatureRepository`
//! should pass, ensuring consistent behavior across different implementations
//! (the in-memory mock here, and the SQLite-backed repository).

use crate::{create_new_feature, NewFeatureBuilder};
use feature_core::{FeatureError, FeatureFilter, FeatureRepository};

/// Run the full contract test suite against a `FeatureRepository`
/// implementation.
pub async fn test_repository_contract<R: FeatureRepository>(repo: &R) {
    test_create_contract(repo).await;
    test_claim_contract(repo).await;
    test_passing_contract(repo).await;
    test_skip_contract(repo).await;
    test_get_contract(repo).await;
    test_list_contract(repo).await;
    test_health_check_contract(repo).await;
    test_stats_contract(repo).await;
}

/// Test feature creation contract
pub async fn test_create_contract<R: FeatureRepository>(repo: &R) {
    let new_feature = create_new_feature();
    let feature = repo
        .create(new_feature.clone())
        .await
        .expect("Create should succeed");

    assert!(feature.id > 0, "Created feature should have positive ID");
    assert_eq!(feature.name, new_feature.name, "Created feature should preserve name");
    assert!(!feature.passes, "New feature should not be passing");
    assert!(!feature.in_progress, "New feature should not be in progress");

    let batch = vec![
        NewFeatureBuilder::new().with_name("Bulk A").build(),
        NewFeatureBuilder::new().with_name("Bulk B").build(),
    ];
    let created = repo
        .create_bulk(batch)
        .await
        .expect("Bulk create should succeed");
    assert_eq!(created.len(), 2, "Bulk create should insert both features");
    assert!(
        created[1].priority > created[0].priority,
        "Bulk create should assign increasing priorities"
    );
}

/// Test claim / release contract (`mark_in_progress` / `clear_in_progress`)
pub async fn test_claim_contract<R: FeatureRepository>(repo: &R) {
    let new_feature = NewFeatureBuilder::new().with_name("Claim Target").build();
    let feature = repo.create(new_feature).await.expect("Create should succeed");

    let claimed = repo
        .mark_in_progress(feature.id)
        .await
        .expect("Claim should succeed on an idle feature");
    assert!(claimed.in_progress, "Claimed feature should be in progress");
    assert_eq!(
        claimed.attempt_count, 1,
        "Claiming should increment attempt_count exactly once"
    );

    let second_claim = repo.mark_in_progress(feature.id).await;
    assert!(second_claim.is_err(), "Should reject claiming an already in-progress feature");
    match second_claim.unwrap_err() {
        FeatureError::AlreadyInProgress(id) => assert_eq!(id, feature.id),
        other => panic!("Expected AlreadyInProgress, got: {other:?}"),
    }

    let released = repo
        .clear_in_progress(feature.id)
        .await
        .expect("Release should succeed");
    assert!(!released.in_progress, "Released feature should not be in progress");

    let not_found = repo.mark_in_progress(999_999).await;
    assert!(matches!(not_found.unwrap_err(), FeatureError::FeatureNotFound(_)));
}

/// Test the `commit_passing` gate
pub async fn test_passing_contract<R: FeatureRepository>(repo: &R) {
    let new_feature = NewFeatureBuilder::new().with_name("Passing Target").build();
    let feature = repo.create(new_feature).await.expect("Create should succeed");

    let not_in_progress = repo.commit_passing(feature.id, "stripped evidence", None).await;
    assert!(
        not_in_progress.is_err(),
        "Should reject committing a feature that was never claimed"
    );
    match not_in_progress.unwrap_err() {
        FeatureError::NotInProgress(id) => assert_eq!(id, feature.id),
        other => panic!("Expected NotInProgress, got: {other:?}"),
    }

    repo.mark_in_progress(feature.id).await.expect("Claim should succeed");
    let passing = repo
        .commit_passing(feature.id, "stripped evidence", None)
        .await
        .expect("Commit should succeed for an in-progress feature");
    assert!(passing.passes, "Committed feature should be passing");
    assert!(!passing.in_progress, "Committed feature should no longer be in progress");
    assert!(passing.marked_passing_at.is_some());

    let changes = repo
        .list_status_changes(feature.id)
        .await
        .expect("Listing status changes should succeed");
    assert!(!changes.is_empty(), "Commit should append a status change row");
}

/// Test the `skip` rotation
pub async fn test_skip_contract<R: FeatureRepository>(repo: &R) {
    let new_feature = NewFeatureBuilder::new().with_name("Skip Target").build();
    let feature = repo.create(new_feature).await.expect("Create should succeed");

    let outcome = repo.skip(feature.id).await.expect("Skip should succeed");
    assert!(
        outcome.new_priority > outcome.old_priority,
        "Skip should move the feature to a higher (later) priority"
    );

    repo.mark_in_progress(feature.id).await.expect("Claim should succeed");
    repo.commit_passing(feature.id, "stripped evidence", None)
        .await
        .expect("Commit should succeed");

    let skip_passing = repo.skip(feature.id).await;
    assert!(skip_passing.is_err(), "Should reject skipping a passing feature");
    match skip_passing.unwrap_err() {
        FeatureError::AlreadyPassing(id) => assert_eq!(id, feature.id),
        other => panic!("Expected AlreadyPassing, got: {other:?}"),
    }
}

/// Test get operations contract
pub async fn test_get_contract<R: FeatureRepository>(repo: &R) {
    let new_feature = NewFeatureBuilder::new().with_name("Get Target").build();
    let feature = repo.create(new_feature).await.expect("Create should succeed");

    let retrieved = repo.get_by_id(feature.id).await.expect("Get by ID should succeed");
    assert_eq!(retrieved.id, feature.id);

    let not_found = repo.get_by_id(999_999).await;
    assert!(matches!(not_found.unwrap_err(), FeatureError::FeatureNotFound(_)));
}

/// Test list operations contract
pub async fn test_list_contract<R: FeatureRepository>(repo: &R) {
    repo.create(NewFeatureBuilder::new().with_name("List A").with_category("alpha").build())
        .await
        .expect("Create should succeed");
    let b = repo
        .create(NewFeatureBuilder::new().with_name("List B").with_category("beta").build())
        .await
        .expect("Create should succeed");
    repo.mark_in_progress(b.id).await.expect("Claim should succeed");

    let all = repo.list(FeatureFilter::default()).await.expect("List all should succeed");
    assert!(all.len() >= 2, "Should contain at least our created features");

    let alpha_only = repo
        .list(FeatureFilter {
            category: Some("alpha".to_string()),
            ..Default::default()
        })
        .await
        .expect("Filter by category should succeed");
    assert!(alpha_only.iter().all(|f| f.category == "alpha"));

    let in_progress_only = repo
        .list(FeatureFilter {
            in_progress: Some(true),
            ..Default::default()
        })
        .await
        .expect("Filter by in_progress should succeed");
    assert!(in_progress_only.iter().all(|f| f.in_progress));
}

/// Test health check contract
pub async fn test_health_check_contract<R: FeatureRepository>(repo: &R) {
    let health_result = repo.health_check().await;
    assert!(health_result.is_ok(), "Health check should succeed for a working repository");
}

/// Test statistics contract
pub async fn test_stats_contract<R: FeatureRepository>(repo: &R) {
    repo.create(NewFeatureBuilder::new().with_name("Stats Target").build())
        .await
        .expect("Create should succeed");

    let stats = repo.get_stats().await.expect("Get stats should succeed");
    assert!(stats.total > 0, "Should report at least one feature");
    assert!(stats.percentage >= 0.0 && stats.percentage <= 100.0);
}
