//! Structured language-model provider contract.
//!
//! The lifecycle engine never parses free LLM prose directly — every call
//! this trait exposes returns a small, closed, structured payload. Prompts
//! that pin the structured output are the provider implementation's
//! responsibility; on malformed output a provider should return
//! [`LlmError::MalformedOutput`] rather than guessing, so the engine can
//! degrade to its rule-based fallback paths (see `memo-engine::classifier`
//! and `memo-engine::conflict`).

use std::future::Future;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The closed set of memory categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    /// A stated like/dislike or preference.
    Preference,
    /// A stated fact about the user or their world.
    Fact,
    /// Something that happened at a point in time.
    Event,
    /// A skill the user has, is learning, or practices.
    Skill,
    /// A relationship between the user and another person.
    Relationship,
    /// Health-related information, including allergies and conditions.
    Health,
    /// Anything that doesn't fit the other categories.
    Other,
}

/// The verdict returned when comparing a new memory against an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConflictVerdict {
    /// The two memories have no bearing on each other.
    None,
    /// The two memories can both stay active; they complement each other.
    Complementary,
    /// The two memories state incompatible things.
    Contradicts,
    /// The new memory is a strict update that replaces the old one.
    Supersedes,
}

/// Failures an [`LlmProvider`] may report.
#[derive(Debug, Error)]
pub enum LlmError {
    /// The provider's transport or authentication failed. Retriable.
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    /// The provider's rate limit was hit. Retriable with backoff.
    #[error("provider exhausted: {0}")]
    Exhausted(String),

    /// The provider took longer than the configured timeout.
    #[error("provider timed out")]
    Timeout,

    /// The provider responded but not with the pinned structured shape.
    #[error("malformed structured output: {0}")]
    MalformedOutput(String),
}

/// A classification result: a category plus the provider's confidence in it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Classification {
    /// The predicted category.
    pub category: Category,
    /// Confidence in `[0, 1]`.
    pub confidence: f32,
}

/// The three prompted operations the lifecycle engine needs from a language
/// model.
///
/// Implementations wrap a concrete provider (OpenAI, a local model, a test
/// double) behind structured prompts; this trait only names the contract.
pub trait LlmProvider: Send + Sync {
    /// Classifies free text into one of the closed [`Category`] values.
    fn classify(
        &self,
        text: &str,
    ) -> impl Future<Output = Result<Classification, LlmError>> + Send;

    /// Judges the relationship between an existing memory's text and a
    /// candidate new memory's text.
    fn judge_conflict(
        &self,
        existing_text: &str,
        new_text: &str,
    ) -> impl Future<Output = Result<ConflictVerdict, LlmError>> + Send;

    /// Synthesizes merged text from two conflicting memories.
    ///
    /// Only called when the conflict verdict is `SUPERSEDES` or
    /// `CONTRADICTS` and the merge strategy decides to merge rather than
    /// replace outright.
    fn merge(
        &self,
        old_text: &str,
        new_text: &str,
    ) -> impl Future<Output = Result<String, LlmError>> + Send;
}
