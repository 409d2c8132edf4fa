//! The engine-level error taxonomy.
//!
//! Every public [`crate::MemoryLifecycleEngine`] operation returns
//! [`EngineError`]. Provider and store failures are wrapped rather than
//! propagated verbatim, so callers see one closed error surface regardless
//! of which collaborator failed.

use memo_core::{embedding::EmbeddingError, error::StoreError, llm::LlmError};
use thiserror::Error;

/// The closed set of failure kinds a [`crate::MemoryLifecycleEngine`] can
/// surface.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Bad input: empty text, a sanitizer hit, or content over the length
    /// cap. Not retried; surfaced immediately.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// No memory exists for the given id. `delete` treats this as success.
    #[error("memory not found: {0}")]
    NotFound(String),

    /// A provider's transport or authentication failed. Retried with
    /// backoff before surfacing.
    #[error("provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// A provider call exceeded its configured timeout. Retried with
    /// backoff before surfacing.
    #[error("provider timed out")]
    ProviderTimeout,

    /// A provider's rate limit was hit. Retried with backoff before
    /// surfacing.
    #[error("provider exhausted: {0}")]
    ProviderExhausted(String),

    /// The two-phase vector-then-graph write partially failed after the
    /// vector phase committed. The write is not rolled back; both ids are
    /// logged so the inconsistency can be reconciled out of band.
    #[error("store inconsistency: vector id {vector_id}, graph id {graph_id:?}: {source}")]
    StoreInconsistency {
        /// Id of the vector record that was committed.
        vector_id: String,
        /// Id of the graph node, if one was assigned before the failure.
        graph_id: Option<String>,
        /// The underlying store failure.
        #[source]
        source: StoreError,
    },

    /// A vector or graph store call failed (or timed out) outside the
    /// two-phase write path — a plain read, update, or delete. Distinct
    /// from [`Self::StoreInconsistency`], which is reserved for a graph
    /// failure after the vector phase already committed.
    #[error("store call failed: {0}")]
    Store(#[source] StoreError),

    /// The per-memory lock could not be acquired within the configured
    /// wait. The caller may retry.
    #[error("lock wait exceeded for memory {0}")]
    Concurrency(String),

    /// An unrecoverable configuration error: an embedding dimension
    /// mismatch, or a provider that cannot be used at all. The engine
    /// should be closed and reconstructed.
    #[error("fatal engine error: {0}")]
    Fatal(String),

    /// All retry attempts against a provider were exhausted.
    #[error("service degraded after exhausting retries: {0}")]
    ServiceDegraded(String),
}

impl From<EmbeddingError> for EngineError {
    fn from(err: EmbeddingError) -> Self {
        match err {
            EmbeddingError::InvalidInput(msg) => Self::InvalidInput(msg),
            EmbeddingError::Unavailable(msg) => Self::ProviderUnavailable(msg),
            EmbeddingError::Exhausted(msg) => Self::ProviderExhausted(msg),
            EmbeddingError::Timeout => Self::ProviderTimeout,
        }
    }
}

impl From<LlmError> for EngineError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Unavailable(msg) => Self::ProviderUnavailable(msg),
            LlmError::Exhausted(msg) => Self::ProviderExhausted(msg),
            LlmError::Timeout => Self::ProviderTimeout,
            LlmError::MalformedOutput(msg) => Self::ProviderUnavailable(msg),
        }
    }
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => Self::NotFound(id),
            StoreError::DimensionMismatch { expected, actual } => Self::Fatal(format!(
                "embedding dimension mismatch: expected {expected}, got {actual}"
            )),
            StoreError::Backend(msg) => Self::Store(StoreError::Backend(msg)),
        }
    }
}

/// Whether an [`EngineError`] is worth retrying with backoff.
impl EngineError {
    /// Returns `true` for the transient provider failures the retry policy
    /// targets (§7: `ProviderUnavailable`/`ProviderTimeout`/
    /// `ProviderExhausted`).
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        matches!(
            self,
            Self::ProviderUnavailable(_) | Self::ProviderTimeout | Self::ProviderExhausted(_)
        )
    }
}

/// Result type used throughout `memo-engine`.
pub type Result<T> = std::result::Result<T, EngineError>;
