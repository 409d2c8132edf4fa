//! Error types shared by the store and provider contracts.

use thiserror::Error;

/// Failures surfaced by a [`VectorStore`](crate::store::vector::VectorStore)
/// or [`GraphStore`](crate::store::graph::GraphStore) implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No record exists for the given id.
    #[error("not found: {0}")]
    NotFound(String),

    /// A vector was provided with a length other than the store's declared
    /// dimension.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension the store was constructed with.
        expected: usize,
        /// Dimension of the vector that was rejected.
        actual: usize,
    },

    /// The underlying backend failed in a way specific to that backend.
    #[error("backend error: {0}")]
    Backend(String),
}

/// Result type used throughout `memo-core`'s store traits.
pub type Result<T> = std::result::Result<T, StoreError>;
