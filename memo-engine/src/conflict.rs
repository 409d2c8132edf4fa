//! Pairwise conflict detection against same-user candidates (spec §4.7).

use memo_core::llm::{ConflictVerdict, LlmProvider};

use crate::memory::Memory;

/// One candidate's verdict against the new memory, paired with the
/// similarity that got it into the candidate pool.
#[derive(Debug, Clone)]
pub struct ConflictRecord {
    /// The existing memory being compared.
    pub old: Memory,
    /// The verdict for this pair.
    pub verdict: ConflictVerdict,
    /// Cosine similarity between `old` and the new candidate.
    pub similarity: f32,
}

/// Compares a new memory candidate against same-user memories that already
/// cleared the similarity floor.
#[derive(Debug)]
pub struct MemoryConflictDetector;

impl MemoryConflictDetector {
    /// Judges each `(old_memory, similarity)` candidate against the new
    /// memory's `content`/`category`, returning verdicts ordered
    /// descending by similarity (spec §4.7).
    ///
    /// `candidates` is expected to already be filtered to the similarity
    /// floor (τ_sim, default 0.75) and capped to the candidate pool size
    /// (default k=8) — both are the vector store search's job, not this
    /// detector's.
    pub async fn detect(
        llm: &(impl LlmProvider + ?Sized),
        new_content: &str,
        new_category: memo_core::llm::Category,
        candidates: Vec<(Memory, f32)>,
        category_conflict_threshold: f32,
    ) -> Vec<ConflictRecord> {
        let mut records = Vec::with_capacity(candidates.len());
        for (old, similarity) in candidates {
            let same_category = old.category == new_category;
            let verdict = if !same_category && similarity < category_conflict_threshold {
                ConflictVerdict::None
            } else {
                match llm.judge_conflict(&old.content, new_content).await {
                    Ok(verdict) => verdict,
                    Err(_) if same_category => ConflictVerdict::Complementary,
                    Err(_) => ConflictVerdict::None,
                }
            };
            records.push(ConflictRecord {
                old,
                verdict,
                similarity,
            });
        }
        records.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memo_core::llm::{Category, Classification, LlmError};

    struct AlwaysSupersedes;

    impl LlmProvider for AlwaysSupersedes {
        async fn classify(&self, _text: &str) -> Result<Classification, LlmError> {
            Ok(Classification {
                category: Category::Other,
                confidence: 1.0,
            })
        }

        async fn judge_conflict(
            &self,
            _existing_text: &str,
            _new_text: &str,
        ) -> Result<ConflictVerdict, LlmError> {
            Ok(ConflictVerdict::Supersedes)
        }

        async fn merge(&self, old_text: &str, new_text: &str) -> Result<String, LlmError> {
            Ok(format!("{old_text}; {new_text}"))
        }
    }

    struct AlwaysFails;

    impl LlmProvider for AlwaysFails {
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

    fn memory_with_category(category: Category) -> Memory {
        Memory::new(
            "u1",
            "I live in Beijing",
            vec![0.1, 0.2],
            category,
            0.5,
            Default::default(),
        )
    }

    #[tokio::test]
    async fn cross_category_below_floor_short_circuits_to_none() {
        let old = memory_with_category(Category::Fact);
        let records = MemoryConflictDetector::detect(
            &AlwaysSupersedes,
            "I moved to Shanghai",
            Category::Event,
            vec![(old, 0.5)],
            0.85,
        )
        .await;
        assert_eq!(records[0].verdict, ConflictVerdict::None);
    }

    #[tokio::test]
    async fn same_category_calls_llm_even_below_floor() {
        let old = memory_with_category(Category::Fact);
        let records = MemoryConflictDetector::detect(
            &AlwaysSupersedes,
            "I moved to Shanghai",
            Category::Fact,
            vec![(old, 0.5)],
            0.85,
        )
        .await;
        assert_eq!(records[0].verdict, ConflictVerdict::Supersedes);
    }

    #[tokio::test]
    async fn llm_failure_defaults_to_complementary_for_same_category() {
        let old = memory_with_category(Category::Preference);
        let records = MemoryConflictDetector::detect(
            &AlwaysFails,
            "I hate sweet coffee",
            Category::Preference,
            vec![(old, 0.9)],
            0.85,
        )
        .await;
        assert_eq!(records[0].verdict, ConflictVerdict::Complementary);
    }

    #[tokio::test]
    async fn results_sorted_descending_by_similarity() {
        let a = memory_with_category(Category::Fact);
        let b = memory_with_category(Category::Fact);
        let records = MemoryConflictDetector::detect(
            &AlwaysSupersedes,
            "anything",
            Category::Fact,
            vec![(a, 0.6), (b, 0.95)],
            0.85,
        )
        .await;
        assert!(records[0].similarity >= records[1].similarity);
    }
}
