//! Numerical importance scoring (spec §4.6).

use memo_core::llm::Category;

/// Used when no LLM-derived weight is available (spec §4.6).
const DEFAULT_LLM_WEIGHT: f32 = 0.5;

fn category_weight(category: Category) -> f32 {
    match category {
        Category::Health => 1.0,
        Category::Fact | Category::Skill => 0.7,
        Category::Relationship => 0.6,
        Category::Preference => 0.5,
        Category::Event => 0.3,
        Category::Other => 0.2,
    }
}

/// Computes `importance ∈ [0, 1]` from a memory's category and an optional
/// LLM-derived weight.
#[derive(Debug)]
pub struct MemoryImportanceScorer;

impl MemoryImportanceScorer {
    /// Scores a memory: `clip(0.3 + 0.4 * category_weight + 0.3 *
    /// llm_weight)`. `llm_weight` is `None` when the LLM provider was
    /// unavailable, in which case 0.5 is used (spec §4.6).
    #[must_use]
    pub fn score(category: Category, llm_weight: Option<f32>) -> f32 {
        let llm_weight = llm_weight.unwrap_or(DEFAULT_LLM_WEIGHT);
        let raw = 0.3 + 0.4 * category_weight(category) + 0.3 * llm_weight;
        raw.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_with_default_llm_weight_is_high() {
        let score = MemoryImportanceScorer::score(Category::Health, None);
        assert!(score >= 0.8, "expected >= 0.8, got {score}");
    }

    #[test]
    fn other_with_default_llm_weight_is_low() {
        let score = MemoryImportanceScorer::score(Category::Other, None);
        assert!(score < 0.6, "expected < 0.6, got {score}");
    }

    #[test]
    fn score_is_always_clamped() {
        let low = MemoryImportanceScorer::score(Category::Other, Some(0.0));
        let high = MemoryImportanceScorer::score(Category::Health, Some(1.0));
        assert!((0.0..=1.0).contains(&low));
        assert!((0.0..=1.0).contains(&high));
    }
}
