//! Builder pattern implementations for easy test data construction
//!
//! Provides fluent builders for:
//! - Feature construction with sensible defaults
//! - NewFeature and FeatureFilter variants
//! - Agent construction for pool-supervisor tests

use chrono::{DateTime, Utc};
use feature_core::{Agent, AgentStatus, Feature, FeatureFilter, NewFeature};

/// Builder for constructing Feature instances in tests
pub struct FeatureBuilder {
    feature: Feature,
}

impl Default for FeatureBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureBuilder {
    /// Create new builder with default values
    pub fn new() -> Self {
        Self {
            feature: Feature {
                id: 1,
                priority: 1,
                category: "general".to_string(),
                name: "Test Feature".to_string(),
                description: "A test feature".to_string(),
                steps: vec!["do the thing".to_string()],
                passes: false,
                in_progress: false,
                assigned_to_agent_id: None,
                attempt_count: 0,
                verification_command: None,
                verification_evidence: None,
                marked_passing_at: None,
                inserted_at: Utc::now(),
            },
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.feature.id = id;
        self
    }

    pub fn with_priority(mut self, priority: i64) -> Self {
        self.feature.priority = priority;
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.feature.category = category.into();
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.feature.name = name.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.feature.description = description.into();
        self
    }

    pub fn with_steps(mut self, steps: Vec<String>) -> Self {
        self.feature.steps = steps;
        self
    }

    /// Mark the feature passing, setting `marked_passing_at` to now.
    pub fn with_passes(mut self, passes: bool) -> Self {
        self.feature.passes = passes;
        if passes {
            self.feature.in_progress = false;
            self.feature.marked_passing_at = Some(Utc::now());
        } else {
            self.feature.marked_passing_at = None;
        }
        self
    }

    pub fn with_in_progress(mut self, agent_id: impl Into<String>) -> Self {
        self.feature.in_progress = true;
        self.feature.passes = false;
        self.feature.assigned_to_agent_id = Some(agent_id.into());
        self
    }

    pub fn with_verification_command(mut self, command: impl Into<String>) -> Self {
        self.feature.verification_command = Some(command.into());
        self
    }

    pub fn with_inserted_at(mut self, inserted_at: DateTime<Utc>) -> Self {
        self.feature.inserted_at = inserted_at;
        self
    }

    pub fn build(self) -> Feature {
        self.feature
    }
}

/// Builder for constructing NewFeature instances in tests
pub struct NewFeatureBuilder {
    new_feature: NewFeature,
}

impl Default for NewFeatureBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl NewFeatureBuilder {
    pub fn new() -> Self {
        Self {
            new_feature: NewFeature {
                category: "general".to_string(),
                name: "New Test Feature".to_string(),
                description: "A new test feature".to_string(),
                steps: vec!["do the thing".to_string()],
                verification_command: None,
            },
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.new_feature.category = category.into();
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.new_feature.name = name.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.new_feature.description = description.into();
        self
    }

    pub fn with_steps(mut self, steps: Vec<String>) -> Self {
        self.new_feature.steps = steps;
        self
    }

    pub fn with_verification_command(mut self, command: impl Into<String>) -> Self {
        self.new_feature.verification_command = Some(command.into());
        self
    }

    pub fn build(self) -> NewFeature {
        self.new_feature
    }
}

/// Builder for constructing FeatureFilter instances in tests
pub struct FeatureFilterBuilder {
    filter: FeatureFilter,
}

impl Default for FeatureFilterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureFilterBuilder {
    pub fn new() -> Self {
        Self {
            filter: FeatureFilter::default(),
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.filter.category = Some(category.into());
        self
    }

    pub fn with_passes(mut self, passes: bool) -> Self {
        self.filter.passes = Some(passes);
        self
    }

    pub fn with_in_progress(mut self, in_progress: bool) -> Self {
        self.filter.in_progress = Some(in_progress);
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.filter.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: i64) -> Self {
        self.filter.offset = Some(offset);
        self
    }

    pub fn build(self) -> FeatureFilter {
        self.filter
    }
}

/// Builder for constructing Agent instances in tests
pub struct AgentBuilder {
    agent: Agent,
}

impl Default for AgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentBuilder {
    pub fn new() -> Self {
        Self {
            agent: Agent {
                agent_id: "ag000001".to_string(),
                project_name: "test-project".to_string(),
                status: AgentStatus::Idle,
                model: "claude".to_string(),
                yolo_mode: false,
                pid: None,
                created_at: Utc::now(),
                started_at: None,
                last_heartbeat: None,
                current_feature_id: None,
            },
        }
    }

    pub fn with_agent_id(mut self, agent_id: impl Into<String>) -> Self {
        self.agent.agent_id = agent_id.into();
        self
    }

    pub fn with_project_name(mut self, project_name: impl Into<String>) -> Self {
        self.agent.project_name = project_name.into();
        self
    }

    pub fn with_status(mut self, status: AgentStatus) -> Self {
        self.agent.status = status;
        self
    }

    pub fn with_pid(mut self, pid: u32) -> Self {
        self.agent.pid = Some(pid);
        self
    }

    pub fn with_current_feature_id(mut self, feature_id: i64) -> Self {
        self.agent.current_feature_id = Some(feature_id);
        self
    }

    pub fn build(self) -> Agent {
        self.agent
    }
}
