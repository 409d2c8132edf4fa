//! Memory classification: LLM-first, deterministic rule-table fallback.

use memo_core::llm::{Category, LlmProvider};

/// Where a [`ClassificationResult`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassificationSource {
    /// The LLM provider's `classify` call produced a confident result.
    Llm,
    /// The deterministic keyword rule table was used, either because the
    /// LLM's confidence was below the threshold or the call failed.
    Rule,
}

/// The outcome of classifying a piece of text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassificationResult {
    /// The assigned category.
    pub category: Category,
    /// Confidence in `[0, 1]`. Rule-table results report `1.0` for a
    /// keyword hit, `0.0` for the `OTHER` catch-all.
    pub confidence: f32,
    /// Which path produced the result.
    pub source: ClassificationSource,
}

/// Below this LLM confidence, fall back to the rule table (spec §4.5).
const LLM_CONFIDENCE_FLOOR: f32 = 0.4;

/// Keyword table, first match wins, checked in this exact order (spec
/// §4.5). Keywords are matched against lowercased content.
const RULE_TABLE: &[(Category, &[&str])] = &[
    (
        Category::Preference,
        &["prefer", "like", "favorite", "喜欢"],
    ),
    (Category::Health, &["allerg", "过敏", "blood"]),
    (Category::Skill, &["learn", "practice", "学习"]),
    (Category::Event, &["yesterday", "today", "went"]),
    (Category::Fact, &["is", "was", "are"]),
    (
        Category::Relationship,
        &["friend", "colleague", "family"],
    ),
];

/// Classifies normalized content using the deterministic keyword table
/// alone. Exposed standalone so the conflict detector and tests can use
/// the exact same fallback the classifier uses.
#[must_use]
pub fn classify_by_rule(content: &str) -> ClassificationResult {
    let lowered = content.to_ascii_lowercase();
    for (category, keywords) in RULE_TABLE {
        if keywords.iter().any(|kw| lowered.contains(kw)) {
            return ClassificationResult {
                category: *category,
                confidence: 1.0,
                source: ClassificationSource::Rule,
            };
        }
    }
    ClassificationResult {
        category: Category::Other,
        confidence: 0.0,
        source: ClassificationSource::Rule,
    }
}

/// Decides a new memory's category: LLM-first with a deterministic
/// fallback.
#[derive(Debug)]
pub struct MemoryClassifier;

impl MemoryClassifier {
    /// Classifies `content`, preferring `llm`'s judgement but falling back
    /// to the rule table when the LLM is unavailable or unconfident (spec
    /// §4.5).
    pub async fn classify(
        llm: &(impl LlmProvider + ?Sized),
        content: &str,
    ) -> ClassificationResult {
        match llm.classify(content).await {
            Ok(classification) if classification.confidence >= LLM_CONFIDENCE_FLOOR => {
                ClassificationResult {
                    category: classification.category,
                    confidence: classification.confidence,
                    source: ClassificationSource::Llm,
                }
            }
            Ok(_) | Err(_) => classify_by_rule(content),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memo_core::llm::{Classification, ConflictVerdict, LlmError};

    struct ConfidentLlm;

    impl LlmProvider for ConfidentLlm {
        async fn classify(&self, _text: &str) -> Result<Classification, LlmError> {
            Ok(Classification {
                category: Category::Skill,
                confidence: 0.95,
            })
        }

        async fn judge_conflict(
            &self,
            _existing_text: &str,
            _new_text: &str,
        ) -> Result<ConflictVerdict, LlmError> {
            Ok(ConflictVerdict::None)
        }

        async fn merge(&self, old_text: &str, new_text: &str) -> Result<String, LlmError> {
            Ok(format!("{old_text}; {new_text}"))
        }
    }

    struct UnconfidentLlm;

    impl LlmProvider for UnconfidentLlm {
        async fn classify(&self, _text: &str) -> Result<Classification, LlmError> {
            Ok(Classification {
                category: Category::Other,
                confidence: 0.1,
            })
        }

        async fn judge_conflict(
            &self,
            _existing_text: &str,
            _new_text: &str,
        ) -> Result<ConflictVerdict, LlmError> {
            Ok(ConflictVerdict::None)
        }

        async fn merge(&self, old_text: &str, new_text: &str) -> Result<String, LlmError> {
            Ok(format!("{old_text}; {new_text}"))
        }
    }

    struct FailingLlm;

    impl LlmProvider for FailingLlm {
        async fn classify(&self, _text: &str) -> Result<Classification, LlmError> {
            Err(LlmError::Unavailable("down".into()))
        }

        async fn judge_conflict(
            &self,
            _existing_text: &str,
            _new_text: &str,
        ) -> Result<ConflictVerdict, LlmError> {
            Err(LlmError::Unavailable("down".into()))
        }

        async fn merge(&self, _old_text: &str, _new_text: &str) -> Result<String, LlmError> {
            Err(LlmError::Unavailable("down".into()))
        }
    }

    #[test]
    fn rule_table_matches_in_declared_order() {
        // "I prefer to learn" matches PREFERENCE before SKILL.
        let result = classify_by_rule("I prefer to learn guitar");
        assert_eq!(result.category, Category::Preference);
    }

    #[test]
    fn rule_table_catches_health_keywords() {
        assert_eq!(
            classify_by_rule("I have a peanut allergy").category,
            Category::Health
        );
    }

    #[test]
    fn rule_table_falls_back_to_other() {
        assert_eq!(classify_by_rule("xyzzy plugh").category, Category::Other);
    }

    #[tokio::test]
    async fn confident_llm_result_is_used() {
        let result = MemoryClassifier::classify(&ConfidentLlm, "anything").await;
        assert_eq!(result.category, Category::Skill);
        assert_eq!(result.source, ClassificationSource::Llm);
    }

    #[tokio::test]
    async fn low_confidence_falls_back_to_rule() {
        let result = MemoryClassifier::classify(&UnconfidentLlm, "I prefer tea").await;
        assert_eq!(result.category, Category::Preference);
        assert_eq!(result.source, ClassificationSource::Rule);
    }

    #[tokio::test]
    async fn failing_llm_falls_back_to_rule() {
        let result = MemoryClassifier::classify(&FailingLlm, "yesterday I went running").await;
        assert_eq!(result.category, Category::Event);
        assert_eq!(result.source, ClassificationSource::Rule);
    }
}
