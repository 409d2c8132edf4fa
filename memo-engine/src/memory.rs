//! The [`Memory`] entity and the input sanitizer guarding `add`/`update`.

use memo_core::{llm::Category, scalar::Properties};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::{EngineError, Result};

/// Content longer than this is rejected outright (spec §6).
pub const MAX_CONTENT_LEN: usize = 10_000;

/// Substrings that cause `InvalidInput` regardless of where they occur in
/// the (case-sensitive) text, per spec §6's sanitizer pattern set.
const BANNED_PATTERNS: &[&str] = &[
    "<script",
    "javascript:",
    "eval(",
    "union select",
    "drop table",
    "${",
    "#{",
];

/// Rejects content that is empty, over the length cap, or matches a banned
/// injection pattern. Matching is case-insensitive so `<SCRIPT` is caught
/// too.
pub fn sanitize(text: &str) -> Result<()> {
    if text.trim().is_empty() {
        return Err(EngineError::InvalidInput("content is empty".into()));
    }
    if text.len() > MAX_CONTENT_LEN {
        return Err(EngineError::InvalidInput(format!(
            "content exceeds {MAX_CONTENT_LEN} characters"
        )));
    }
    let lowered = text.to_ascii_lowercase();
    for pattern in BANNED_PATTERNS {
        if lowered.contains(pattern) {
            return Err(EngineError::InvalidInput(format!(
                "content matches a banned pattern: {pattern}"
            )));
        }
    }
    Ok(())
}

/// A normalized hash of `content`, used to detect identical-text re-adds
/// before an embedding is even computed (spec §8's merge-idempotence
/// property).
#[must_use]
pub fn normalized_text_key(text: &str) -> String {
    text.trim().to_ascii_lowercase()
}

/// A single attributed memory: the central entity of the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Memory {
    /// Opaque unique identifier, assigned at creation. Never reused.
    pub id: Uuid,
    /// Opaque partition key. Immutable.
    pub user_id: String,
    /// The memory's text. Mutable only via `update`.
    pub content: String,
    /// Dense embedding of `content`; length equals the engine's embedding
    /// dimension. Regenerated on every `content` change.
    pub embedding: Vec<f32>,
    /// Closed-set category assigned by the classifier.
    pub category: Category,
    /// Importance in `[0, 1]` assigned by the scorer.
    pub importance: f32,
    /// When this memory was created.
    pub created_at: OffsetDateTime,
    /// When this memory was last mutated.
    pub updated_at: OffsetDateTime,
    /// When this memory was last returned by `search`.
    pub last_accessed_at: OffsetDateTime,
    /// Incremented on every retrieval that returns this memory.
    pub access_count: u64,
    /// Set when a merge or replace retires this memory. A memory with this
    /// set is excluded from active search but kept in `getHistory`.
    pub superseded_by: Option<Uuid>,
    /// Free-form provider-specific tags.
    pub properties: Properties,
}

impl Memory {
    /// Builds a brand new, active memory.
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        content: impl Into<String>,
        embedding: Vec<f32>,
        category: Category,
        importance: f32,
        properties: Properties,
    ) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.into(),
            content: content.into(),
            embedding,
            category,
            importance,
            created_at: now,
            updated_at: now,
            last_accessed_at: now,
            access_count: 0,
            superseded_by: None,
            properties,
        }
    }

    /// Whether this memory has been superseded (soft-deleted).
    #[must_use]
    pub const fn is_superseded(&self) -> bool {
        self.superseded_by.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_rejects_empty() {
        assert!(sanitize("   ").is_err());
    }

    #[test]
    fn sanitize_rejects_over_length_cap() {
        let text = "a".repeat(MAX_CONTENT_LEN + 1);
        assert!(sanitize(&text).is_err());
    }

    #[test]
    fn sanitize_rejects_banned_patterns_case_insensitively() {
        assert!(sanitize("hello <SCRIPT>alert(1)</script>").is_err());
        assert!(sanitize("'; DROP TABLE users; --").is_err());
        assert!(sanitize("look at ${evil}").is_err());
    }

    #[test]
    fn sanitize_accepts_ordinary_text() {
        assert!(sanitize("I prefer coffee without sugar").is_ok());
    }

    #[test]
    fn normalized_text_key_ignores_case_and_edges() {
        assert_eq!(
            normalized_text_key("  Coffee Without Sugar  "),
            normalized_text_key("coffee without sugar")
        );
    }
}
