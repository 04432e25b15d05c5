//! Model router: a pure function from task shape to model tier.

use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;

/// Router output before resolving to a concrete model identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelTier {
    Complex,
    Balanced,
    Fast,
    Coding,
}

impl ModelTier {
    /// Resolve this tier to the concrete model identifier configured for it.
    pub fn resolve(self, config: &LlmConfig) -> &str {
        match self {
            ModelTier::Complex => &config.model_complex,
            ModelTier::Balanced => &config.model_balanced,
            ModelTier::Fast => &config.model_fast,
            ModelTier::Coding => &config.model_coding,
        }
    }
}

const CODE_TASK_TYPES: &[&str] = &["code", "coding", "programming", "debug"];
const ANALYSIS_TASK_TYPES: &[&str] = &["analysis", "research", "planning"];
const SIMPLE_TASK_TYPES: &[&str] = &["simple", "file_operation", "read"];

/// Select a model tier for the given task type and complexity score.
///
/// Pure: identical inputs always produce identical outputs. Rules are
/// evaluated in order; the first match wins.
pub fn select(task_type: &str, complexity: f64) -> ModelTier {
    let task_type = task_type.to_lowercase();

    if complexity > 0.8 {
        return ModelTier::Complex;
    }
    if CODE_TASK_TYPES.contains(&task_type.as_str()) {
        return ModelTier::Coding;
    }
    if complexity > 0.6 && ANALYSIS_TASK_TYPES.contains(&task_type.as_str()) {
        return ModelTier::Complex;
    }
    if (0.3..=0.6).contains(&complexity) {
        return ModelTier::Balanced;
    }
    if complexity < 0.3 && SIMPLE_TASK_TYPES.contains(&task_type.as_str()) {
        return ModelTier::Fast;
    }
    ModelTier::Balanced
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_1_high_complexity_dominates() {
        assert_eq!(select("simple", 0.9), ModelTier::Complex);
    }

    #[test]
    fn test_rule_2_code_task_type() {
        assert_eq!(select("debug", 0.5), ModelTier::Coding);
    }

    #[test]
    fn test_rule_3_analysis_at_high_complexity() {
        assert_eq!(select("research", 0.7), ModelTier::Complex);
    }

    #[test]
    fn test_rule_4_mid_complexity_balanced() {
        assert_eq!(select("general", 0.45), ModelTier::Balanced);
    }

    #[test]
    fn test_rule_5_low_complexity_simple_task() {
        assert_eq!(select("file_operation", 0.1), ModelTier::Fast);
    }

    #[test]
    fn test_rule_6_default_balanced() {
        assert_eq!(select("general", 0.1), ModelTier::Balanced);
    }

    #[test]
    fn test_determinism() {
        assert_eq!(select("code", 0.5), select("code", 0.5));
    }

    #[test]
    fn test_resolve_tier_to_model_id() {
        let config = LlmConfig::default();
        assert_eq!(ModelTier::Coding.resolve(&config), config.model_coding);
    }
}
