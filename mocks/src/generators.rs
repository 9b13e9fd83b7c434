//! Random test data generators using the fake crate
//!
//! Provides realistic random data including:
//! - Feature categories and names
//! - Agent identifiers from a realistic pool
//! - Feature descriptions
//! - Property-based testing strategies

use chrono::Utc;
use fake::faker::lorem::en::{Paragraph, Sentence};
use fake::Fake;
use proptest::prelude::*;
use rand::Rng;
use feature_core::{Feature, FeatureFilter};

/// Generate a realistic feature category
pub fn generate_feature_category() -> String {
    let categories = [
        "backend",
        "frontend",
        "infra",
        "docs",
        "testing",
        "security",
        "performance",
    ];
    categories[rand::thread_rng().gen_range(0..categories.len())].to_string()
}

/// Generate a realistic agent identifier
pub fn generate_agent_id() -> String {
    let n: u32 = (1..999_999).fake();
    format!("ag{n:06}")
}

/// Generate a realistic feature name
pub fn generate_feature_name() -> String {
    Sentence(3..8).fake()
}

/// Generate a realistic feature description
pub fn generate_feature_description() -> String {
    Paragraph(2..5).fake()
}

/// Generate a random feature with realistic data
pub fn generate_random_feature() -> Feature {
    let id: i64 = (1..99999).fake();
    let priority: i64 = (1..9999).fake();
    let passes: bool = rand::thread_rng().gen_bool(0.3);
    let in_progress = !passes && rand::thread_rng().gen_bool(0.3);

    Feature {
        id,
        priority,
        category: generate_feature_category(),
        name: generate_feature_name(),
        description: generate_feature_description(),
        steps: vec![generate_feature_description()],
        passes,
        in_progress,
        assigned_to_agent_id: if in_progress {
            Some(generate_agent_id())
        } else {
            None
        },
        attempt_count: if in_progress || passes { 1 } else { 0 },
        verification_command: None,
        verification_evidence: if passes {
            Some(generate_feature_description())
        } else {
            None
        },
        marked_passing_at: if passes { Some(Utc::now()) } else { None },
        inserted_at: Utc::now(),
    }
}

/// Configurable feature generator
pub struct FeatureGenerator {
    pub category: String,
    pub agent_pool: Vec<String>,
}

impl Default for FeatureGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureGenerator {
    /// Create new generator with default settings
    pub fn new() -> Self {
        Self {
            category: "general".to_string(),
            agent_pool: vec![
                "ag000001".to_string(),
                "ag000002".to_string(),
                "ag000003".to_string(),
            ],
        }
    }

    /// Generate a feature with this generator's settings
    pub fn generate(&self) -> Feature {
        let id: i64 = (1..99999).fake();
        let priority: i64 = (1..9999).fake();
        let agent = &self.agent_pool[rand::thread_rng().gen_range(0..self.agent_pool.len())];

        Feature {
            id,
            priority,
            category: self.category.clone(),
            name: generate_feature_name(),
            description: generate_feature_description(),
            steps: vec![generate_feature_description()],
            passes: false,
            in_progress: true,
            assigned_to_agent_id: Some(agent.clone()),
            attempt_count: 1,
            verification_command: None,
            verification_evidence: None,
            marked_passing_at: None,
            inserted_at: Utc::now(),
        }
    }
}

/// Proptest strategy for generating valid feature categories
pub fn feature_category_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("backend".to_string()),
        Just("frontend".to_string()),
        Just("infra".to_string()),
        Just("docs".to_string()),
        Just("testing".to_string()),
    ]
}

/// Proptest strategy for generating complete features
pub fn feature_strategy() -> impl Strategy<Value = Feature> {
    (
        1i64..99999,
        1i64..9999,
        feature_category_strategy(),
        "[A-Za-z ]{5,50}",
        "[A-Za-z0-9 .,!?]{10,200}",
        any::<bool>(),
    )
        .prop_map(|(id, priority, category, name, description, passes)| Feature {
            id,
            priority,
            category,
            name,
            description,
            steps: vec!["step 1".to_string()],
            passes,
            in_progress: false,
            assigned_to_agent_id: None,
            attempt_count: 0,
            verification_command: None,
            verification_evidence: if passes {
                Some("Verification evidence generated for property-based testing.".to_string())
            } else {
                None
            },
            marked_passing_at: if passes { Some(Utc::now()) } else { None },
            inserted_at: Utc::now(),
        })
}

/// Proptest strategy for generating feature filters
pub fn feature_filter_strategy() -> impl Strategy<Value = FeatureFilter> {
    (
        proptest::option::of(feature_category_strategy()),
        proptest::option::of(any::<bool>()),
        proptest::option::of(any::<bool>()),
    )
        .prop_map(|(category, passes, in_progress)| FeatureFilter {
            category,
            passes,
            in_progress,
            limit: None,
            offset: None,
        })
}
