//! # memo-core
//!
//! Trait abstractions for the `memo` personal memory store.
//!
//! `memo-core` defines the four capability contracts the lifecycle engine in
//! `memo-engine` composes — [`EmbeddingProvider`], [`LlmProvider`],
//! [`VectorStore`], and [`GraphStore`] — plus an in-memory reference
//! implementation of each store. Concrete LLM/embedding providers (OpenAI,
//! a local model, a test double) and concrete production stores (a real
//! vector database, a real graph database) live outside this crate; only
//! their contracts matter here.
//!
//! ## Modules
//!
//! - [`embedding`] — text-to-vector provider contract.
//! - [`llm`] — classification, conflict judgement, merge synthesis contract.
//! - [`scalar`] — the tagged-variant property bag shared by memories, vector
//!   records, and graph nodes.
//! - [`store`] — [`VectorStore`] and [`GraphStore`] traits and their
//!   in-memory reference implementations.
//! - [`error`] — the store-level error taxonomy.

pub mod embedding;
pub mod error;
pub mod llm;
pub mod scalar;
pub mod store;

#[doc(inline)]
pub use embedding::EmbeddingProvider;
#[doc(inline)]
pub use error::StoreError;
#[doc(inline)]
pub use llm::LlmProvider;
#[doc(inline)]
pub use scalar::Scalar;
#[doc(inline)]
pub use store::graph::{GraphStore, InMemoryGraphStore};
#[doc(inline)]
pub use store::vector::{InMemoryVectorStore, VectorStore};
