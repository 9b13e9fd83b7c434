//! Custom assertion helpers for testing
//!
//! Provides specialized assertions for:
//! - Feature equality with clear error messages
//! - Claimability and state-precondition validation
//! - Collection-based assertions

use feature_core::Feature;

/// Assert features are equal ignoring timestamps
pub fn assert_feature_equals(actual: &Feature, expected: &Feature) {
    assert_eq!(actual.id, expected.id, "Feature IDs don't match");
    assert_eq!(
        actual.category, expected.category,
        "Feature categories don't match"
    );
    assert_eq!(actual.name, expected.name, "Feature names don't match");
    assert_eq!(
        actual.description, expected.description,
        "Feature descriptions don't match"
    );
    assert_eq!(actual.passes, expected.passes, "Feature passes flags don't match");
    assert_eq!(
        actual.in_progress, expected.in_progress,
        "Feature in_progress flags don't match"
    );
    // Note: timestamps are ignored in this assertion
}

/// Assert features are equal including exact timestamps
pub fn assert_feature_equals_exact(actual: &Feature, expected: &Feature) {
    assert_eq!(actual, expected, "Features are not exactly equal");
}

/// Assert feature matches partial criteria
pub fn assert_feature_matches(feature: &Feature, matcher: &FeatureMatcher) {
    if let Some(ref expected_id) = matcher.id {
        assert_eq!(feature.id, *expected_id, "Feature ID doesn't match expected");
    }
    if let Some(ref expected_category) = matcher.category {
        assert_eq!(
            &feature.category, expected_category,
            "Feature category doesn't match expected"
        );
    }
    if let Some(ref expected_name) = matcher.name {
        assert_eq!(&feature.name, expected_name, "Feature name doesn't match expected");
    }
    if let Some(expected_passes) = matcher.passes {
        assert_eq!(feature.passes, expected_passes, "Feature passes doesn't match expected");
    }
    if let Some(expected_in_progress) = matcher.in_progress {
        assert_eq!(
            feature.in_progress, expected_in_progress,
            "Feature in_progress doesn't match expected"
        );
    }
}

/// Assert a feature is claimable (not passing, not in progress)
pub fn assert_claimable(feature: &Feature) {
    assert!(
        feature.is_claimable(),
        "Expected feature {} to be claimable, but passes={} in_progress={}",
        feature.id,
        feature.passes,
        feature.in_progress
    );
}

/// Assert a feature is NOT claimable
pub fn assert_not_claimable(feature: &Feature) {
    assert!(
        !feature.is_claimable(),
        "Expected feature {} to not be claimable, but it is",
        feature.id
    );
}

/// Assert feature list contains a feature with the given name
pub fn assert_contains_feature_with_name(features: &[Feature], name: &str) {
    assert!(
        features.iter().any(|f| f.name == name),
        "Expected to find feature named '{}' in feature list, but it wasn't found. Available names: {:?}",
        name,
        features.iter().map(|f| &f.name).collect::<Vec<_>>()
    );
}

/// Assert features are sorted by priority ascending, then by id ascending
pub fn assert_features_sorted_by_priority(features: &[Feature]) {
    for window in features.windows(2) {
        let ordered = window[0].priority < window[1].priority
            || (window[0].priority == window[1].priority && window[0].id <= window[1].id);
        assert!(
            ordered,
            "Features are not sorted by priority. Feature '{}' (priority {}) comes before '{}' (priority {})",
            window[0].name, window[0].priority, window[1].name, window[1].priority
        );
    }
}

/// Flexible feature matcher for partial assertions
#[derive(Debug, Default)]
pub struct FeatureMatcher {
    pub id: Option<i64>,
    pub category: Option<String>,
    pub name: Option<String>,
    pub passes: Option<bool>,
    pub in_progress: Option<bool>,
}

impl FeatureMatcher {
    /// Create a new empty matcher
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_passes(mut self, passes: bool) -> Self {
        self.passes = Some(passes);
        self
    }

    pub fn with_in_progress(mut self, in_progress: bool) -> Self {
        self.in_progress = Some(in_progress);
        self
    }
}
