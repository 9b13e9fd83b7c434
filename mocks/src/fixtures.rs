//! Standard test fixtures for consistent testing
//!
//! Provides pre-built test data including:
//! - Standard features in various states
//! - Edge case scenarios
//! - Bulk feature generators

use chrono::Utc;
use feature_core::{Feature, NewFeature};

/// Create a basic test feature with sensible defaults
pub fn create_test_feature() -> Feature {
    Feature {
        id: 1,
        priority: 1,
        category: "general".to_string(),
        name: "Test Feature".to_string(),
        description: "A standard test feature with default values".to_string(),
        steps: vec!["do the thing".to_string()],
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

/// Create a feature already claimed by an agent
pub fn create_test_feature_in_progress(agent_id: &str) -> Feature {
    let mut feature = create_test_feature();
    feature.in_progress = true;
    feature.assigned_to_agent_id = Some(agent_id.to_string());
    feature.attempt_count = 1;
    feature
}

/// Create a feature already marked passing
pub fn create_test_feature_passing() -> Feature {
    let mut feature = create_test_feature();
    feature.passes = true;
    feature.in_progress = false;
    feature.verification_evidence =
        Some("Ran the full suite; all 42 assertions passed with no flakes.".to_string());
    feature.marked_passing_at = Some(Utc::now());
    feature
}

/// Create a feature belonging to a specific category
pub fn create_test_feature_with_category(category: &str) -> Feature {
    let mut feature = create_test_feature();
    feature.category = category.to_string();
    feature
}

/// Create multiple unique features, distributed across priorities
pub fn create_test_features(count: usize) -> Vec<Feature> {
    (1..=count)
        .map(|i| Feature {
            id: i as i64,
            priority: i as i64,
            category: format!("category-{}", i % 3 + 1),
            name: format!("Test Feature {i}"),
            description: format!("Test feature number {i} for bulk testing"),
            steps: vec![format!("step {i}")],
            passes: i % 4 == 3,
            in_progress: i % 4 == 1,
            assigned_to_agent_id: if i % 4 == 1 {
                Some(format!("ag{:06}", i % 3 + 1))
            } else {
                None
            },
            attempt_count: (i % 4) as i64,
            verification_command: None,
            verification_evidence: if i % 4 == 3 {
                Some("Evidence recorded during bulk fixture generation for testing.".to_string())
            } else {
                None
            },
            marked_passing_at: if i % 4 == 3 { Some(Utc::now()) } else { None },
            inserted_at: Utc::now(),
        })
        .collect()
}

/// Create one feature in each of the three reachable queue states
pub fn create_features_in_all_states() -> Vec<Feature> {
    let now = Utc::now();
    vec![
        Feature {
            id: 1,
            priority: 1,
            category: "backend".to_string(),
            name: "Queued Feature".to_string(),
            description: "Feature sitting at the head of the queue".to_string(),
            steps: vec!["implement".to_string()],
            passes: false,
            in_progress: false,
            assigned_to_agent_id: None,
            attempt_count: 0,
            verification_command: None,
            verification_evidence: None,
            marked_passing_at: None,
            inserted_at: now,
        },
        Feature {
            id: 2,
            priority: 2,
            category: "backend".to_string(),
            name: "In-Progress Feature".to_string(),
            description: "Feature currently claimed by an agent".to_string(),
            steps: vec!["implement".to_string()],
            passes: false,
            in_progress: true,
            assigned_to_agent_id: Some("ag000001".to_string()),
            attempt_count: 1,
            verification_command: None,
            verification_evidence: None,
            marked_passing_at: None,
            inserted_at: now,
        },
        Feature {
            id: 3,
            priority: 3,
            category: "backend".to_string(),
            name: "Passing Feature".to_string(),
            description: "Feature verified and committed".to_string(),
            steps: vec!["implement".to_string()],
            passes: true,
            in_progress: false,
            assigned_to_agent_id: None,
            attempt_count: 1,
            verification_command: Some("cargo test".to_string()),
            verification_evidence: Some(
                "Verification command exited 0 with the expected test output.".to_string(),
            ),
            marked_passing_at: Some(now),
            inserted_at: now,
        },
    ]
}

/// Create a standard NewFeature for testing creation
pub fn create_new_feature() -> NewFeature {
    NewFeature {
        category: "general".to_string(),
        name: "New Test Feature".to_string(),
        description: "A new feature for testing creation".to_string(),
        steps: vec!["do the thing".to_string()],
        verification_command: None,
    }
}

/// Create NewFeature with a specific category
pub fn create_new_feature_with_category(category: &str) -> NewFeature {
    let mut feature = create_new_feature();
    feature.category = category.to_string();
    feature
}

/// Create NewFeature with a verification command attached
pub fn create_new_feature_with_verification(command: &str) -> NewFeature {
    let mut feature = create_new_feature();
    feature.verification_command = Some(command.to_string());
    feature
}
