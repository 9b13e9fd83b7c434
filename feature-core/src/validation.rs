use crate::{
    error::{FeatureError, Result},
    models::NewFeature,
};

/// Validation utilities for feature-queue input.
pub struct FeatureValidator;

impl FeatureValidator {
    pub fn validate_category(category: &str) -> Result<()> {
        let trimmed = category.trim();
        if trimmed.is_empty() {
            return Err(FeatureError::empty_field("category"));
        }
        if trimmed.len() > 100 {
            return Err(FeatureError::Validation(
                "category must be at most 100 characters long".to_string(),
            ));
        }
        Ok(())
    }

    pub fn validate_name(name: &str) -> Result<()> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(FeatureError::empty_field("name"));
        }
        if trimmed.len() > 255 {
            return Err(FeatureError::Validation(
                "name must be at most 255 characters long".to_string(),
            ));
        }
        Ok(())
    }

    pub fn validate_description(description: &str) -> Result<()> {
        if description.trim().is_empty() {
            return Err(FeatureError::empty_field("description"));
        }
        Ok(())
    }

    pub fn validate_steps(steps: &[String]) -> Result<()> {
        if steps.is_empty() {
            return Err(FeatureError::Validation(
                "steps must be a non-empty list".to_string(),
            ));
        }
        Ok(())
    }

    pub fn validate_new_feature(feature: &NewFeature) -> Result<()> {
        Self::validate_category(&feature.category)?;
        Self::validate_name(&feature.name)?;
        Self::validate_description(&feature.description)?;
        Self::validate_steps(&feature.steps)?;
        Ok(())
    }

    /// Strip whitespace and enforce the ≥50 character floor on
    /// `mark_passing` evidence (§4.1 step 2). Returns the stripped string
    /// so callers persist exactly what was validated.
    pub fn validate_and_strip_evidence(evidence: &str) -> Result<String> {
        let stripped = evidence.trim().to_string();
        if stripped.len() < 50 {
            return Err(FeatureError::EvidenceTooShort {
                len: stripped.len(),
            });
        }
        Ok(stripped)
    }

    /// `get_for_regression(limit)` bounds: `1 <= limit <= 10`.
    pub fn validate_regression_limit(limit: i64) -> Result<i64> {
        if !(1..=10).contains(&limit) {
            return Err(FeatureError::Validation(
                "limit must be between 1 and 10".to_string(),
            ));
        }
        Ok(limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_new_feature_passes() {
        let feature = NewFeature {
            category: "A".to_string(),
            name: "N".to_string(),
            description: "D".to_string(),
            steps: vec!["do it".to_string()],
            verification_command: None,
        };
        assert!(FeatureValidator::validate_new_feature(&feature).is_ok());
    }

    #[test]
    fn empty_steps_rejected() {
        let feature = NewFeature {
            category: "A".to_string(),
            name: "N".to_string(),
            description: "D".to_string(),
            steps: vec![],
            verification_command: None,
        };
        assert!(FeatureValidator::validate_new_feature(&feature).is_err());
    }

    #[test]
    fn blank_description_rejected() {
        assert!(FeatureValidator::validate_description("   ").is_err());
    }

    #[test]
    fn evidence_below_fifty_chars_rejected() {
        let err = FeatureValidator::validate_and_strip_evidence("short").unwrap_err();
        assert!(err.to_string().contains("at least 50"));
    }

    #[test]
    fn evidence_exactly_fifty_after_strip_accepted() {
        let evidence = format!("  {}  ", "x".repeat(50));
        let stripped = FeatureValidator::validate_and_strip_evidence(&evidence).unwrap();
        assert_eq!(stripped.len(), 50);
    }

    #[test]
    fn regression_limit_bounds() {
        assert!(FeatureValidator::validate_regression_limit(0).is_err());
        assert!(FeatureValidator::validate_regression_limit(11).is_err());
        assert!(FeatureValidator::validate_regression_limit(3).is_ok());
    }
}
