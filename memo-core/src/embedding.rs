//! Text-to-vector embedding provider contract.
//!
//! An embedding provider turns text into a fixed-dimension dense vector.
//! Implementations are expected to be deterministic for identical input
//! within a single provider instance; the resulting vector's norm is
//! arbitrary — consumers normalize on demand (see
//! [`crate::store::vector::cosine_similarity`]).

use std::future::Future;

use thiserror::Error;

/// Failures an [`EmbeddingProvider`] may report.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// The input text was empty or otherwise unacceptable.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The provider's transport or authentication failed. Retriable.
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    /// The provider's rate limit was hit. Retriable with backoff.
    #[error("provider exhausted: {0}")]
    Exhausted(String),

    /// The provider took longer than the configured timeout.
    #[error("provider timed out")]
    Timeout,
}

/// Converts text into dense vector representations.
///
/// # Implementation requirements
///
/// - [`embed`](EmbeddingProvider::embed) must return a vector of length
///   exactly [`dimension`](EmbeddingProvider::dimension).
/// - [`dimension`](EmbeddingProvider::dimension) must never change over the
///   life of a provider instance; the engine relies on this to size its
///   vector store once at construction.
/// - [`embed_batch`](EmbeddingProvider::embed_batch)'s default
///   implementation just calls [`embed`](EmbeddingProvider::embed) in a
///   loop; providers whose backend has a native batch endpoint should
///   override it.
pub trait EmbeddingProvider: Send + Sync {
    /// Returns the fixed dimension of vectors this provider produces.
    fn dimension(&self) -> usize;

    /// Embeds a single piece of text.
    fn embed(&self, text: &str) -> impl Future<Output = Result<Vec<f32>, EmbeddingError>> + Send;

    /// Embeds a batch of texts, preserving input order.
    fn embed_batch(
        &self,
        texts: &[String],
    ) -> impl Future<Output = Result<Vec<Vec<f32>>, EmbeddingError>> + Send {
        async move {
            let mut out = Vec::with_capacity(texts.len());
            for text in texts {
                out.push(self.embed(text).await?);
            }
            Ok(out)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockEmbedding {
        dimension: usize,
    }

    impl EmbeddingProvider for MockEmbedding {
        fn dimension(&self) -> usize {
            self.dimension
        }

        async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            if text.is_empty() {
                return Err(EmbeddingError::InvalidInput("empty text".into()));
            }
            let len = text.len();
            Ok((0..self.dimension)
                .map(|i| (len + i) as f32 * 0.01)
                .collect())
        }
    }

    #[tokio::test]
    async fn embed_respects_dimension() {
        let provider = MockEmbedding { dimension: 8 };
        let vector = provider.embed("hello").await.unwrap();
        assert_eq!(vector.len(), 8);
    }

    #[tokio::test]
    async fn embed_batch_preserves_order() {
        let provider = MockEmbedding { dimension: 4 };
        let texts = vec!["a".to_string(), "ab".to_string(), "abc".to_string()];
        let vectors = provider.embed_batch(&texts).await.unwrap();
        assert_eq!(vectors.len(), 3);
        assert!(vectors[0][0] < vectors[1][0]);
        assert!(vectors[1][0] < vectors[2][0]);
    }

    #[tokio::test]
    async fn embed_rejects_empty_input() {
        let provider = MockEmbedding { dimension: 4 };
        let err = provider.embed("").await.unwrap_err();
        assert!(matches!(err, EmbeddingError::InvalidInput(_)));
    }
}
