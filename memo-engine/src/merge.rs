//! Deciding what to do with a conflict list (spec §4.8).

use memo_core::llm::{ConflictVerdict, LlmProvider};
use uuid::Uuid;

use crate::conflict::ConflictRecord;

/// The decision produced by [`MemoryMergeStrategy::decide`]. Kept as an
/// inspectable, side-effect-free value so the decision can be unit tested
/// without a live store; applying it is the lifecycle engine's job.
#[derive(Debug, Clone, PartialEq)]
pub enum MergeAction {
    /// Retire `target`, writing a new active memory with `new_content`.
    Replace {
        /// The superseded memory's id.
        target: Uuid,
        /// The new memory's content.
        new_content: String,
    },
    /// Retire `target`, writing a new active memory derived from both.
    Merge {
        /// The memory being merged away.
        target: Uuid,
        /// The LLM-synthesized merged text.
        merged_text: String,
    },
    /// Keep both memories active, linking them with a `CONTRADICTS`
    /// relationship. Used when the contradicted memory is too important
    /// to silently overwrite.
    KeepBothLink {
        /// The existing, high-importance memory being linked against.
        target: Uuid,
    },
    /// Insert the candidate as a brand new memory, linking it to every
    /// complementary prior memory via `RELATED_TO`.
    InsertNew {
        /// Ids of complementary existing memories to link against.
        complementary_links: Vec<Uuid>,
    },
}

/// Applies the first matching rule from a conflict list to decide how a
/// new memory candidate should be written.
#[derive(Debug)]
pub struct MemoryMergeStrategy;

impl MemoryMergeStrategy {
    /// Decides the action for `new_content` given its (similarity-sorted)
    /// conflict records (spec §4.8):
    ///
    /// 1. Any `SUPERSEDES` → `Replace`.
    /// 2. Any `CONTRADICTS` with `old.importance >= high_importance_threshold`
    ///    → `KeepBothLink`.
    /// 3. Any remaining `CONTRADICTS` → `Merge`, synthesizing text via
    ///    `llm.merge`.
    /// 4. Otherwise → `InsertNew`, linking every `COMPLEMENTARY` record.
    pub async fn decide(
        llm: &(impl LlmProvider + ?Sized),
        new_content: &str,
        records: &[ConflictRecord],
        high_importance_threshold: f32,
    ) -> MergeAction {
        if let Some(record) = records
            .iter()
            .find(|r| r.verdict == ConflictVerdict::Supersedes)
        {
            return MergeAction::Replace {
                target: record.old.id,
                new_content: new_content.to_string(),
            };
        }

        if let Some(record) = records.iter().find(|r| {
            r.verdict == ConflictVerdict::Contradicts
                && r.old.importance >= high_importance_threshold
        }) {
            return MergeAction::KeepBothLink {
                target: record.old.id,
            };
        }

        if let Some(record) = records
            .iter()
            .find(|r| r.verdict == ConflictVerdict::Contradicts)
        {
            let merged_text = match llm.merge(&record.old.content, new_content).await {
                Ok(text) => text,
                Err(_) => format!("{}; {}", record.old.content, new_content),
            };
            return MergeAction::Merge {
                target: record.old.id,
                merged_text,
            };
        }

        let complementary_links = records
            .iter()
            .filter(|r| r.verdict == ConflictVerdict::Complementary)
            .map(|r| r.old.id)
            .collect();
        MergeAction::InsertNew {
            complementary_links,
        }
    }
}
