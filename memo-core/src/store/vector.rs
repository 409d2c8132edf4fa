//! Vector store contract and in-memory reference implementation.

use std::{
    collections::{BTreeSet, HashMap},
    future::Future,
};

use parking_lot::RwLock;

use super::{Filter, matches_filter};
use crate::{
    error::{Result, StoreError},
    scalar::{Properties, Scalar},
};

/// A stored vector plus the metadata it can be filtered/sorted on.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorRecord {
    /// Opaque unique identifier, assigned by the caller.
    pub id: String,
    /// The embedding vector. Must match the store's declared dimension.
    pub embedding: Vec<f32>,
    /// Filterable metadata (e.g. `user_id`, `category`, `superseded`).
    pub metadata: Properties,
    /// Creation time as milliseconds since the Unix epoch, used to break
    /// similarity ties (higher wins) and for deterministic ordering.
    pub created_at: i64,
}

/// One ranked search result.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    /// Id of the matched record.
    pub id: String,
    /// Cosine similarity to the query vector, in `[-1, 1]`.
    pub score: f32,
    /// The record's metadata, returned so callers don't need a second
    /// round-trip for common filtering fields.
    pub metadata: Properties,
}

/// Stores `(id, vector, metadata)` triples and serves top-k cosine-similarity
/// search with an equality metadata filter.
///
/// # Implementation requirements
///
/// - All operations are safe under concurrent callers.
/// - [`delete`](VectorStore::delete) is idempotent: deleting a missing id is
///   not an error.
/// - [`search`](VectorStore::search) ranks by cosine similarity descending;
///   ties are broken by higher `created_at`, then by lexicographically
///   smaller `id`.
pub trait VectorStore: Send + Sync {
    /// Inserts a new record, replacing any existing record with the same id.
    fn insert(&self, record: VectorRecord) -> impl Future<Output = Result<()>> + Send;

    /// Inserts multiple records.
    fn batch_insert(
        &self,
        records: Vec<VectorRecord>,
    ) -> impl Future<Output = Result<()>> + Send {
        async move {
            for record in records {
                self.insert(record).await?;
            }
            Ok(())
        }
    }

    /// Replaces an existing record. Equivalent to [`insert`](Self::insert).
    fn update(&self, record: VectorRecord) -> impl Future<Output = Result<()>> + Send {
        self.insert(record)
    }

    /// Deletes a record by id. Idempotent: missing ids are not an error.
    fn delete(&self, id: &str) -> impl Future<Output = Result<()>> + Send;

    /// Deletes every record matching `filter`. Returns the number removed.
    fn delete_by_filter(&self, filter: &Filter) -> impl Future<Output = Result<usize>> + Send;

    /// Fetches a single record by id.
    fn get(&self, id: &str) -> impl Future<Output = Result<Option<VectorRecord>>> + Send;

    /// Finds the `top_k` records matching `filter`, ranked by cosine
    /// similarity to `query`.
    fn search(
        &self,
        query: &[f32],
        top_k: usize,
        filter: &Filter,
    ) -> impl Future<Output = Result<Vec<SearchHit>>> + Send;

    /// Releases any resources held by the store. Idempotent.
    fn close(&self) -> impl Future<Output = ()> + Send;
}

/// Computes cosine similarity between two vectors.
///
/// Returns `0.0`, rather than dividing by zero, when either vector has zero
/// magnitude (e.g. a provider that returned a zero vector).
#[must_use]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f32;
    let mut mag_a = 0.0f32;
    let mut mag_b = 0.0f32;
    for (&x, &y) in a.iter().zip(b.iter()) {
        dot += x * y;
        mag_a += x * x;
        mag_b += y * y;
    }
    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }
    dot / (mag_a.sqrt() * mag_b.sqrt())
}

#[derive(Default)]
struct State {
    records: HashMap<String, VectorRecord>,
    by_user: HashMap<String, BTreeSet<String>>,
}

/// A simple in-memory [`VectorStore`]: a `HashMap<id, VectorRecord>` guarded
/// by a `RwLock`, plus a `user_id -> set<id>` reverse index so a per-user
/// `search` only scans that user's records.
#[derive(Debug)]
pub struct InMemoryVectorStore {
    dimension: usize,
    state: RwLock<State>,
}

impl std::fmt::Debug for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("State")
            .field("len", &self.records.len())
            .finish()
    }
}

impl InMemoryVectorStore {
    /// Creates an empty store sized to `dimension`.
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            state: RwLock::new(State::default()),
        }
    }

    /// Returns the dimension this store was constructed with.
    #[must_use]
    pub const fn dimension(&self) -> usize {
        self.dimension
    }

    fn user_key(metadata: &Properties) -> Option<String> {
        match metadata.get("user_id") {
            Some(Scalar::String(s)) => Some(s.clone()),
            _ => None,
        }
    }

    fn unindex(state: &mut State, record: &VectorRecord) {
        if let Some(user_id) = Self::user_key(&record.metadata) {
            if let Some(ids) = state.by_user.get_mut(&user_id) {
                ids.remove(&record.id);
                if ids.is_empty() {
                    state.by_user.remove(&user_id);
                }
            }
        }
    }

    fn index(state: &mut State, record: &VectorRecord) {
        if let Some(user_id) = Self::user_key(&record.metadata) {
            state.by_user.entry(user_id).or_default().insert(record.id.clone());
        }
    }
}

impl VectorStore for InMemoryVectorStore {
    async fn insert(&self, record: VectorRecord) -> Result<()> {
        if record.embedding.len() != self.dimension {
            return Err(StoreError::DimensionMismatch {
                expected: self.dimension,
                actual: record.embedding.len(),
            });
        }

        let mut state = self.state.write();
        if let Some(old) = state.records.get(&record.id).cloned() {
            Self::unindex(&mut state, &old);
        }
        Self::index(&mut state, &record);
        state.records.insert(record.id.clone(), record);
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let mut state = self.state.write();
        if let Some(old) = state.records.remove(id) {
            Self::unindex(&mut state, &old);
        }
        Ok(())
    }

    async fn delete_by_filter(&self, filter: &Filter) -> Result<usize> {
        let mut state = self.state.write();
        let matching: Vec<String> = state
            .records
            .values()
            .filter(|record| matches_filter(&record.metadata, filter))
            .map(|record| record.id.clone())
            .collect();

        for id in &matching {
            if let Some(old) = state.records.remove(id) {
                Self::unindex(&mut state, &old);
            }
        }
        Ok(matching.len())
    }

    async fn get(&self, id: &str) -> Result<Option<VectorRecord>> {
        Ok(self.state.read().records.get(id).cloned())
    }

    async fn search(
        &self,
        query: &[f32],
        top_k: usize,
        filter: &Filter,
    ) -> Result<Vec<SearchHit>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let state = self.state.read();
        let candidates: Box<dyn Iterator<Item = &VectorRecord>> =
            match Self::user_key(filter) {
                Some(user_id) => match state.by_user.get(&user_id) {
                    Some(ids) => Box::new(ids.iter().filter_map(|id| state.records.get(id))),
                    None => Box::new(std::iter::empty()),
                },
                None => Box::new(state.records.values()),
            };

        let mut hits: Vec<SearchHit> = candidates
            .filter(|record| matches_filter(&record.metadata, filter))
            .map(|record| SearchHit {
                id: record.id.clone(),
                score: cosine_similarity(query, &record.embedding),
                metadata: record.metadata.clone(),
            })
            .collect();

        // Keep a side table of created_at for the tie-break, since SearchHit
        // doesn't carry it (callers only need id/score/metadata).
        let created_at: HashMap<&str, i64> = state
            .records
            .values()
            .map(|r| (r.id.as_str(), r.created_at))
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| {
                    let a_created = created_at.get(a.id.as_str()).copied().unwrap_or_default();
                    let b_created = created_at.get(b.id.as_str()).copied().unwrap_or_default();
                    b_created.cmp(&a_created)
                })
                .then_with(|| a.id.cmp(&b.id))
        });
        hits.truncate(top_k);
        Ok(hits)
    }

    async fn close(&self) {
        let mut state = self.state.write();
        state.records.clear();
        state.by_user.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, user_id: &str, embedding: Vec<f32>, created_at: i64) -> VectorRecord {
        let mut metadata = Properties::new();
        metadata.insert("user_id".into(), Scalar::from(user_id));
        VectorRecord {
            id: id.into(),
            embedding,
            metadata,
            created_at,
        }
    }

    #[tokio::test]
    async fn cosine_similarity_zero_vector_is_zero_not_nan() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[tokio::test]
    async fn search_ranks_by_similarity_descending() {
        let store = InMemoryVectorStore::new(2);
        store.insert(record("a", "u1", vec![1.0, 0.0], 0)).await.unwrap();
        store.insert(record("b", "u1", vec![0.0, 1.0], 0)).await.unwrap();

        let mut filter = Filter::new();
        filter.insert("user_id".into(), Scalar::from("u1"));
        let hits = store.search(&[1.0, 0.0], 10, &filter).await.unwrap();
        assert_eq!(hits[0].id, "a");
    }

    #[tokio::test]
    async fn search_is_isolated_per_user() {
        let store = InMemoryVectorStore::new(2);
        store.insert(record("secret-a", "u1", vec![1.0, 0.0], 0)).await.unwrap();
        store.insert(record("secret-b", "u2", vec![1.0, 0.0], 0)).await.unwrap();

        let mut filter = Filter::new();
        filter.insert("user_id".into(), Scalar::from("u1"));
        let hits = store.search(&[1.0, 0.0], 10, &filter).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "secret-a");
    }

    #[tokio::test]
    async fn top_k_zero_returns_empty() {
        let store = InMemoryVectorStore::new(2);
        store.insert(record("a", "u1", vec![1.0, 0.0], 0)).await.unwrap();
        let hits = store.search(&[1.0, 0.0], 0, &Filter::new()).await.unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let store = InMemoryVectorStore::new(2);
        store.insert(record("a", "u1", vec![1.0, 0.0], 0)).await.unwrap();
        store.delete("a").await.unwrap();
        store.delete("a").await.unwrap();
        assert!(store.get("a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn insert_rejects_wrong_dimension() {
        let store = InMemoryVectorStore::new(3);
        let err = store
            .insert(record("a", "u1", vec![1.0, 0.0], 0))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DimensionMismatch { .. }));
    }

    #[tokio::test]
    async fn ties_break_by_created_at_then_id() {
        let store = InMemoryVectorStore::new(1);
        store.insert(record("b", "u1", vec![1.0], 5)).await.unwrap();
        store.insert(record("a", "u1", vec![1.0], 10)).await.unwrap();
        store.insert(record("c", "u1", vec![1.0], 10)).await.unwrap();

        let mut filter = Filter::new();
        filter.insert("user_id".into(), Scalar::from("u1"));
        let hits = store.search(&[1.0], 10, &filter).await.unwrap();
        // a and c tie on created_at=10 (newer than b); lexicographic id breaks the tie.
        assert_eq!(hits[0].id, "a");
        assert_eq!(hits[1].id, "c");
        assert_eq!(hits[2].id, "b");
    }
}
