use thiserror::Error;

/// Result type alias for feature-queue operations.
pub type Result<T> = std::result::Result<T, FeatureError>;

/// Domain error for the feature queue, agent pool, and task runner.
///
/// Variants map onto the five error kinds of the error-handling design:
/// Validation, Precondition, Guard, NotFound, Infrastructure. Validation,
/// precondition, and guard errors never leave a partial state mutation
/// behind; infrastructure errors roll back whatever transaction was open.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeatureError {
    // --- Validation ---
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Validation error: {field} must not be empty")]
    EmptyField { field: String },

    // --- Precondition ---
    #[error("Feature {0} is already passing and cannot be skipped")]
    AlreadyPassing(i64),

    #[error("Feature {0} is already in progress")]
    AlreadyInProgress(i64),

    #[error("Feature {0} is NOT in-progress; cannot mark passing")]
    NotInProgress(i64),

    // --- Guard ---
    #[error("Rate limit exceeded: at most 3 mark_passing calls per 5 minutes; try again in {wait_seconds}s")]
    RateLimited { wait_seconds: i64 },

    #[error("Evidence too short: must be at least 50 characters (got {len})")]
    EvidenceTooShort { len: usize },

    #[error("Verification failed with exit code {exit_code}: stdout={stdout}, stderr={stderr}")]
    VerificationFailed {
        exit_code: i32,
        stdout: String,
        stderr: String,
    },

    #[error("Verification timed out after {timeout_secs}s")]
    VerificationTimedOut { timeout_secs: u64 },

    // --- NotFound ---
    #[error("Feature {0} not found")]
    FeatureNotFound(i64),

    #[error("Agent {0} not found")]
    AgentNotFound(String),

    // --- Infrastructure ---
    #[error("Database error: {0}")]
    Database(String),

    #[error("Subprocess spawn failure: {0}")]
    SpawnFailure(String),

    #[error("Filesystem error: {0}")]
    Filesystem(String),

    #[error("Internal error: {0}")]
    Internal(String),

    // --- Dependency graph ---
    #[error("Cannot depend on self (feature {0})")]
    SelfDependency(i64),

    #[error("Duplicate dependency: feature {feature_id} already depends on {depends_on_id}")]
    DuplicateDependency { feature_id: i64, depends_on_id: i64 },

    #[error("Circular dependency: {depends_on_id} already depends on {feature_id}")]
    CircularDependency { feature_id: i64, depends_on_id: i64 },

    // --- Agent pool ---
    #[error("Pool for project '{0}' is full (max_agents reached)")]
    PoolFull(String),

    #[error("Agent {agent_id} cannot {action} from status {status}")]
    InvalidAgentTransition {
        agent_id: String,
        status: String,
        action: String,
    },
}

/// Coarse error classification, used by transports to map onto HTTP-like
/// status codes without matching on every variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Precondition,
    Guard,
    NotFound,
    Infrastructure,
}

impl FeatureError {
    pub fn empty_field(field: impl Into<String>) -> Self {
        Self::EmptyField {
            field: field.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        use FeatureError::*;
        match self {
            Validation(_) | EmptyField { .. } => ErrorKind::Validation,
            AlreadyPassing(_) | AlreadyInProgress(_) | NotInProgress(_) => ErrorKind::Precondition,
            RateLimited { .. } | EvidenceTooShort { .. } | VerificationFailed { .. }
            | VerificationTimedOut { .. } => ErrorKind::Guard,
            FeatureNotFound(_) | AgentNotFound(_) => ErrorKind::NotFound,
            Database(_) | SpawnFailure(_) | Filesystem(_) | Internal(_) => {
                ErrorKind::Infrastructure
            }
            SelfDependency(_) | DuplicateDependency { .. } | CircularDependency { .. } => {
                ErrorKind::Validation
            }
            PoolFull(_) => ErrorKind::Precondition,
            InvalidAgentTransition { .. } => ErrorKind::Precondition,
        }
    }

    /// HTTP-like status code for a thin transport layer to surface.
    pub fn status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::Validation => 400,
            ErrorKind::Precondition => 409,
            ErrorKind::Guard => 429,
            ErrorKind::NotFound => 404,
            ErrorKind::Infrastructure => 500,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    pub fn is_validation(&self) -> bool {
        self.kind() == ErrorKind::Validation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_classification() {
        assert_eq!(FeatureError::FeatureNotFound(1).kind(), ErrorKind::NotFound);
        assert_eq!(
            FeatureError::EvidenceTooShort { len: 5 }.kind(),
            ErrorKind::Guard
        );
        assert_eq!(
            FeatureError::AlreadyInProgress(1).kind(),
            ErrorKind::Precondition
        );
    }

    #[test]
    fn status_codes() {
        assert_eq!(FeatureError::FeatureNotFound(1).status_code(), 404);
        assert_eq!(FeatureError::RateLimited { wait_seconds: 1 }.status_code(), 429);
        assert_eq!(FeatureError::Database("x".into()).status_code(), 500);
    }

    #[test]
    fn display_messages_carry_context() {
        let err = FeatureError::EvidenceTooShort { len: 5 };
        assert!(err.to_string().contains("at least 50"));

        let err = FeatureError::NotInProgress(42);
        assert!(err.to_string().contains("NOT in-progress"));
    }
}
