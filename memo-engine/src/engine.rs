//! The orchestrator: composes the four provider/store handles into the
//! end-to-end `add`/`search`/`update`/`delete`/`getAll`/`getHistory`
//! pipeline (spec §4.9).

use std::{collections::HashMap, future::Future, time::Duration};

use memo_core::{
    embedding::EmbeddingProvider,
    error::StoreError,
    llm::{Category, Classification, ConflictVerdict, LlmError, LlmProvider},
    scalar::{Properties, Scalar},
    store::{
        Filter,
        graph::GraphStore,
        vector::{VectorRecord, VectorStore},
    },
};
use parking_lot::RwLock;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
    classifier::{ClassificationSource, MemoryClassifier},
    config::EngineConfig,
    conflict::MemoryConflictDetector,
    error::{EngineError, Result},
    lock_table::LockTable,
    memory::{Memory, normalized_text_key, sanitize},
    merge::{MemoryMergeStrategy, MergeAction},
    retry,
    scorer::MemoryImportanceScorer,
};

/// Composes an embedding provider, an LLM provider, a vector store, and a
/// graph store into the memory lifecycle pipeline. Owns nothing else:
/// construction takes exactly these four handles (spec §9's explicit
/// dependency injection over global singletons).
pub struct MemoryLifecycleEngine<E, L, V, G> {
    embedding: E,
    llm: L,
    vector_store: V,
    graph_store: G,
    config: EngineConfig,
    locks: LockTable,
    memories: RwLock<HashMap<Uuid, Memory>>,
    graph_node_ids: RwLock<HashMap<Uuid, String>>,
}

impl<E, L, V, G> std::fmt::Debug for MemoryLifecycleEngine<E, L, V, G> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryLifecycleEngine")
            .field("memories", &self.memories.read().len())
            .finish()
    }
}

impl<E, L, V, G> MemoryLifecycleEngine<E, L, V, G>
where
    E: EmbeddingProvider,
    L: LlmProvider,
    V: VectorStore,
    G: GraphStore,
{
    /// Builds an engine with [`EngineConfig::default`].
    pub fn new(embedding: E, llm: L, vector_store: V, graph_store: G) -> Self {
        Self::with_config(embedding, llm, vector_store, graph_store, EngineConfig::default())
    }

    /// Builds an engine with a custom configuration.
    pub fn with_config(
        embedding: E,
        llm: L,
        vector_store: V,
        graph_store: G,
        config: EngineConfig,
    ) -> Self {
        tracing::info!("memory lifecycle engine constructed");
        let locks = LockTable::new(config.lock_table_capacity());
        Self {
            embedding,
            llm,
            vector_store,
            graph_store,
            config,
            locks,
            memories: RwLock::new(HashMap::new()),
            graph_node_ids: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the active configuration.
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Ingests `text` for `user_id`, running classify → conflict-detect →
    /// merge-or-insert, and returns the id of the resulting active memory
    /// (spec §4.9).
    pub async fn add(
        &self,
        text: &str,
        user_id: &str,
        properties: Option<Properties>,
    ) -> Result<Uuid> {
        tracing::debug!(user_id, "add");
        sanitize(text)?;
        let properties = properties.unwrap_or_default();

        let embedding = self.embed(text).await?;
        if embedding.len() != self.embedding.dimension() {
            return Err(EngineError::Fatal(format!(
                "embedding provider returned {} dims, declared {}",
                embedding.len(),
                self.embedding.dimension()
            )));
        }

        let guarded_llm = TimeoutLlm {
            inner: &self.llm,
            timeout: self.config.llm_timeout(),
        };

        let classification = MemoryClassifier::classify(&guarded_llm, text).await;
        if classification.source == ClassificationSource::Rule {
            tracing::warn!(user_id, "classification fell back to the rule table");
        }
        let llm_weight = match classification.source {
            ClassificationSource::Llm => Some(classification.confidence),
            ClassificationSource::Rule => None,
        };
        let importance = MemoryImportanceScorer::score(classification.category, llm_weight);

        let mut filter = Filter::new();
        filter.insert("user_id".into(), Scalar::from(user_id));
        filter.insert("superseded".into(), Scalar::from(false));
        let hits = self
            .store_timeout(
                self.vector_store
                    .search(&embedding, self.config.top_k_candidates(), &filter),
            )
            .await
            .map_err(EngineError::from)?;

        let norm_key = normalized_text_key(text);
        let mut candidates = Vec::new();
        for hit in hits {
            if hit.score < self.config.similarity_threshold() {
                continue;
            }
            if let Some(memory) = self.load_memory(&hit.id, &hit.metadata) {
                if normalized_text_key(&memory.content) == norm_key {
                    tracing::debug!(
                        user_id,
                        memory_id = %memory.id,
                        "identical content re-add, no new memory created"
                    );
                    return Ok(memory.id);
                }
                candidates.push((memory, hit.score));
            }
        }

        let records = MemoryConflictDetector::detect(
            &guarded_llm,
            text,
            classification.category,
            candidates,
            self.config.category_conflict_threshold(),
        )
        .await;

        let action = MemoryMergeStrategy::decide(
            &guarded_llm,
            text,
            &records,
            self.config.high_importance_threshold(),
        )
        .await;

        self.apply_action(
            action,
            text,
            user_id,
            embedding,
            classification.category,
            importance,
            properties,
        )
        .await
    }

    /// Embeds `query`, searches the same-user active set, increments
    /// `access_count`/`last_accessed_at` on every hit, and returns results
    /// ordered by score desc then importance desc (spec §4.9).
    pub async fn search(
        &self,
        query: &str,
        user_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Memory>> {
        let limit = limit.unwrap_or_else(|| self.config.search_default_limit());
        tracing::debug!(user_id, limit, "search");
        let embedding = self.embed(query).await?;

        let mut filter = Filter::new();
        filter.insert("user_id".into(), Scalar::from(user_id));
        filter.insert("superseded".into(), Scalar::from(false));

        let hits = self
            .store_timeout(self.vector_store.search(&embedding, limit, &filter))
            .await
            .map_err(EngineError::from)?;

        let mut scored: Vec<(Memory, f32)> = Vec::with_capacity(hits.len());
        for hit in hits {
            if let Some(mut memory) = self.load_memory(&hit.id, &hit.metadata) {
                memory.access_count += 1;
                memory.last_accessed_at = OffsetDateTime::now_utc();
                self.memories.write().insert(memory.id, memory.clone());
                scored.push((memory, hit.score));
            }
        }

        scored.sort_by(|(memory_a, score_a), (memory_b, score_b)| {
            score_b
                .total_cmp(score_a)
                .then_with(|| memory_b.importance.total_cmp(&memory_a.importance))
        });

        Ok(scored.into_iter().map(|(memory, _)| memory).collect())
    }

    /// Re-embeds `new_text` and writes it over the existing memory `id`.
    /// Does not re-run conflict detection: updates are user-driven and
    /// authoritative (spec §4.9).
    pub async fn update(&self, id: Uuid, new_text: &str) -> Result<Memory> {
        tracing::debug!(memory_id = %id, "update");
        sanitize(new_text)?;

        let key = id.to_string();
        self.with_lock(&key, async {
            let mut memory = {
                let memories = self.memories.read();
                memories
                    .get(&id)
                    .cloned()
                    .ok_or_else(|| EngineError::NotFound(id.to_string()))?
            };
            if memory.is_superseded() {
                return Err(EngineError::NotFound(id.to_string()));
            }

            let embedding = self.embed(new_text).await?;
            memory.content = new_text.to_string();
            memory.embedding = embedding;
            memory.updated_at = OffsetDateTime::now_utc();

            let record = VectorRecord {
                id: memory.id.to_string(),
                embedding: memory.embedding.clone(),
                metadata: Self::memory_metadata(&memory),
                created_at: memory.created_at.unix_timestamp(),
            };
            self.store_timeout(self.vector_store.update(record))
                .await
                .map_err(EngineError::from)?;

            let node_id = self.graph_node_ids.read().get(&id).cloned();
            if let Some(node_id) = node_id {
                self.store_timeout(
                    self.graph_store
                        .update_node(&node_id, Self::memory_metadata(&memory)),
                )
                .await
                .map_err(EngineError::from)?;
            }

            self.memories.write().insert(id, memory.clone());
            Ok(memory)
        })
        .await
    }

    /// Hard-deletes a memory from both stores. Idempotent (spec §4.9).
    pub async fn delete(&self, id: Uuid) -> Result<()> {
        tracing::debug!(memory_id = %id, "delete");
        let key = id.to_string();
        self.with_lock(&key, async {
            self.store_timeout(self.vector_store.delete(&id.to_string()))
                .await
                .map_err(EngineError::from)?;

            let node_id = self.graph_node_ids.write().remove(&id);
            if let Some(node_id) = node_id {
                self.store_timeout(self.graph_store.delete_node(&node_id))
                    .await
                    .map_err(EngineError::from)?;
            }

            self.memories.write().remove(&id);
            Ok(())
        })
        .await
    }

    /// Fetches a memory by id, regardless of superseded state.
    pub async fn get(&self, id: Uuid) -> Result<Memory> {
        self.memories
            .read()
            .get(&id)
            .cloned()
            .ok_or_else(|| EngineError::NotFound(id.to_string()))
    }

    /// Returns every non-superseded memory for `user_id`, newest first
    /// (spec §4.9).
    pub async fn get_all(&self, user_id: &str) -> Result<Vec<Memory>> {
        let mut results: Vec<Memory> = self
            .memories
            .read()
            .values()
            .filter(|memory| memory.user_id == user_id && !memory.is_superseded())
            .cloned()
            .collect();
        results.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(results)
    }

    /// Returns every memory for `user_id`, including superseded ones,
    /// oldest first (spec §4.9).
    pub async fn get_history(&self, user_id: &str) -> Result<Vec<Memory>> {
        let mut results: Vec<Memory> = self
            .memories
            .read()
            .values()
            .filter(|memory| memory.user_id == user_id)
            .cloned()
            .collect();
        results.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(results)
    }

    /// Closes both stores and drains in-engine state. Idempotent.
    pub async fn close(&self) {
        tracing::info!("closing memory lifecycle engine");
        self.vector_store.close().await;
        self.graph_store.close().await;
        self.memories.write().clear();
        self.graph_node_ids.write().clear();
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        retry::with_retry(
            self.config.retry_attempts(),
            self.config.retry_base_backoff(),
            || async {
                tokio::time::timeout(self.config.embedding_timeout(), self.embedding.embed(text))
                    .await
                    .map_err(|_| EngineError::ProviderTimeout)?
                    .map_err(EngineError::from)
            },
        )
        .await
    }

    async fn with_lock<T>(&self, key: &str, fut: impl Future<Output = Result<T>>) -> Result<T> {
        let lock = self.locks.lock_for(key);
        let _guard = tokio::time::timeout(self.config.lock_wait(), lock.lock())
            .await
            .map_err(|_| EngineError::Concurrency(key.to_string()))?;
        fut.await
    }

    /// Runs a raw store future under the configured store timeout,
    /// surfacing the timeout as a [`StoreError::Backend`] so callers that
    /// need the raw store error (for `StoreInconsistency`'s `source`)
    /// still get one.
    async fn store_timeout<T>(
        &self,
        fut: impl Future<Output = memo_core::error::Result<T>>,
    ) -> memo_core::error::Result<T> {
        match tokio::time::timeout(self.config.store_timeout(), fut).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Backend("store call timed out".into())),
        }
    }

    async fn apply_action(
        &self,
        action: MergeAction,
        text: &str,
        user_id: &str,
        embedding: Vec<f32>,
        category: Category,
        importance: f32,
        properties: Properties,
    ) -> Result<Uuid> {
        match action {
            MergeAction::Replace { target, new_content } => {
                let key = target.to_string();
                self.with_lock(&key, async {
                    let new_memory =
                        Memory::new(user_id, new_content, embedding, category, importance, properties);
                    self.write_memory(&new_memory).await?;
                    self.mark_superseded(target, new_memory.id).await?;
                    self.link(new_memory.id, target, "SUPERSEDES").await;
                    Ok(new_memory.id)
                })
                .await
            }
            MergeAction::Merge { target, merged_text } => {
                let key = target.to_string();
                self.with_lock(&key, async {
                    let new_memory =
                        Memory::new(user_id, merged_text, embedding, category, importance, properties);
                    self.write_memory(&new_memory).await?;
                    self.mark_superseded(target, new_memory.id).await?;
                    self.link(new_memory.id, target, "DERIVED_FROM").await;
                    Ok(new_memory.id)
                })
                .await
            }
            MergeAction::KeepBothLink { target } => {
                let key = target.to_string();
                self.with_lock(&key, async {
                    let new_memory =
                        Memory::new(user_id, text, embedding, category, importance, properties);
                    self.write_memory(&new_memory).await?;
                    self.link(new_memory.id, target, "CONTRADICTS").await;
                    Ok(new_memory.id)
                })
                .await
            }
            MergeAction::InsertNew { complementary_links } => {
                let new_memory = Memory::new(user_id, text, embedding, category, importance, properties);
                self.write_memory(&new_memory).await?;
                for link_target in complementary_links {
                    self.link(new_memory.id, link_target, "RELATED_TO").await;
                }
                Ok(new_memory.id)
            }
        }
    }

    /// Two-phase write: vector store, then graph store. On graph failure,
    /// compensates by deleting the just-written vector record and
    /// surfaces `StoreInconsistency` (spec §4.9 step 6).
    async fn write_memory(&self, memory: &Memory) -> Result<()> {
        let vector_id = memory.id.to_string();
        let record = VectorRecord {
            id: vector_id.clone(),
            embedding: memory.embedding.clone(),
            metadata: Self::memory_metadata(memory),
            created_at: memory.created_at.unix_timestamp(),
        };
        self.store_timeout(self.vector_store.insert(record))
            .await
            .map_err(EngineError::from)?;

        let labels = vec!["Memory".to_string(), category_str(memory.category).to_string()];
        let node_props = Self::memory_metadata(memory);
        match self
            .store_timeout(self.graph_store.create_node(labels, node_props))
            .await
        {
            Ok(node_id) => {
                self.memories.write().insert(memory.id, memory.clone());
                self.graph_node_ids.write().insert(memory.id, node_id);
                Ok(())
            }
            Err(source) => {
                let _ = self.vector_store.delete(&vector_id).await;
                tracing::error!(
                    vector_id,
                    error = %source,
                    "graph write failed after vector commit, compensating with delete"
                );
                Err(EngineError::StoreInconsistency {
                    vector_id,
                    graph_id: None,
                    source,
                })
            }
        }
    }

    async fn mark_superseded(&self, target: Uuid, new_id: Uuid) -> Result<()> {
        let mut memory = {
            let memories = self.memories.read();
            memories
                .get(&target)
                .cloned()
                .ok_or_else(|| EngineError::NotFound(target.to_string()))?
        };
        memory.superseded_by = Some(new_id);
        memory.updated_at = OffsetDateTime::now_utc();

        let record = VectorRecord {
            id: memory.id.to_string(),
            embedding: memory.embedding.clone(),
            metadata: Self::memory_metadata(&memory),
            created_at: memory.created_at.unix_timestamp(),
        };
        self.store_timeout(self.vector_store.update(record))
            .await
            .map_err(EngineError::from)?;

        let node_id = self.graph_node_ids.read().get(&target).cloned();
        if let Some(node_id) = node_id {
            if let Err(err) = self
                .store_timeout(
                    self.graph_store
                        .update_node(&node_id, Self::memory_metadata(&memory)),
                )
                .await
            {
                tracing::error!(%err, memory_id = %target, "failed to update graph node after supersede");
            }
        }

        self.memories.write().insert(target, memory);
        Ok(())
    }

    async fn link(&self, from: Uuid, to: Uuid, rel_type: &str) {
        let (from_node, to_node) = {
            let map = self.graph_node_ids.read();
            (map.get(&from).cloned(), map.get(&to).cloned())
        };
        if let (Some(from_node), Some(to_node)) = (from_node, to_node) {
            if let Err(err) = self
                .store_timeout(self.graph_store.create_relationship(
                    &from_node,
                    &to_node,
                    rel_type,
                    Properties::new(),
                ))
                .await
            {
                tracing::error!(%err, rel_type, "failed to create relationship");
            }
        }
    }

    fn load_memory(&self, id_str: &str, metadata: &Properties) -> Option<Memory> {
        let id = Uuid::parse_str(id_str).ok()?;
        if let Some(memory) = self.memories.read().get(&id) {
            return Some(memory.clone());
        }
        Self::memory_from_metadata(id, metadata)
    }

    fn memory_metadata(memory: &Memory) -> Properties {
        let mut metadata = Properties::new();
        metadata.insert("user_id".into(), Scalar::from(memory.user_id.clone()));
        metadata.insert(
            "category".into(),
            Scalar::from(category_str(memory.category)),
        );
        metadata.insert(
            "importance".into(),
            Scalar::from(f64::from(memory.importance)),
        );
        metadata.insert("superseded".into(), Scalar::from(memory.is_superseded()));
        metadata.insert("content".into(), Scalar::from(memory.content.clone()));
        metadata.insert(
            "created_at".into(),
            Scalar::from(memory.created_at.unix_timestamp()),
        );
        metadata.insert(
            "updated_at".into(),
            Scalar::from(memory.updated_at.unix_timestamp()),
        );
        metadata.insert(
            "last_accessed_at".into(),
            Scalar::from(memory.last_accessed_at.unix_timestamp()),
        );
        metadata.insert(
            "access_count".into(),
            Scalar::from(i64::try_from(memory.access_count).unwrap_or(i64::MAX)),
        );
        if let Some(superseded_by) = memory.superseded_by {
            metadata.insert("superseded_by".into(), Scalar::from(superseded_by.to_string()));
        }
        metadata
    }

    /// Reconstructs a [`Memory`] from vector-store metadata alone, for the
    /// rare case the in-engine cache doesn't have it. `properties` (the
    /// caller-supplied free-form tags) are not recoverable this way and
    /// come back empty; the cache is the source of truth for those.
    fn memory_from_metadata(id: Uuid, metadata: &Properties) -> Option<Memory> {
        let get_str = |key: &str| match metadata.get(key) {
            Some(Scalar::String(s)) => Some(s.clone()),
            _ => None,
        };
        let get_int = |key: &str| match metadata.get(key) {
            Some(Scalar::Int(i)) => Some(*i),
            _ => None,
        };
        let get_float = |key: &str| match metadata.get(key) {
            Some(Scalar::Float(f)) => Some(*f),
            _ => None,
        };

        let user_id = get_str("user_id")?;
        let content = get_str("content")?;
        let category = category_from_str(&get_str("category")?);
        let importance = get_float("importance")? as f32;
        let created_at =
            OffsetDateTime::from_unix_timestamp(get_int("created_at").unwrap_or_default()).ok()?;
        let updated_at =
            OffsetDateTime::from_unix_timestamp(get_int("updated_at").unwrap_or_default())
                .unwrap_or(created_at);
        let last_accessed_at =
            OffsetDateTime::from_unix_timestamp(get_int("last_accessed_at").unwrap_or_default())
                .unwrap_or(created_at);
        let access_count = get_int("access_count").unwrap_or(0).max(0) as u64;
        let superseded_by = get_str("superseded_by").and_then(|s| Uuid::parse_str(&s).ok());

        Some(Memory {
            id,
            user_id,
            content,
            embedding: Vec::new(),
            category,
            importance,
            created_at,
            updated_at,
            last_accessed_at,
            access_count,
            superseded_by,
            properties: Properties::new(),
        })
    }
}

/// Bounds every call an inner [`LlmProvider`] makes with a single timeout,
/// surfacing an expired call as [`LlmError::Timeout`]. Classification,
/// conflict-judgement, and merge synthesis each tolerate an LLM failure by
/// falling back to a deterministic default (spec §4.5/§4.7/§4.8), so a
/// single timed-out attempt is enough; the retry-with-backoff policy (spec
/// §7) is reserved for the embedding provider and the stores, which have no
/// such fallback.
struct TimeoutLlm<'a, L> {
    inner: &'a L,
    timeout: Duration,
}

impl<L: LlmProvider> LlmProvider for TimeoutLlm<'_, L> {
    async fn classify(&self, text: &str) -> std::result::Result<Classification, LlmError> {
        tokio::time::timeout(self.timeout, self.inner.classify(text))
            .await
            .unwrap_or(Err(LlmError::Timeout))
    }

    async fn judge_conflict(
        &self,
        existing_text: &str,
        new_text: &str,
    ) -> std::result::Result<ConflictVerdict, LlmError> {
        tokio::time::timeout(self.timeout, self.inner.judge_conflict(existing_text, new_text))
            .await
            .unwrap_or(Err(LlmError::Timeout))
    }

    async fn merge(
        &self,
        old_text: &str,
        new_text: &str,
    ) -> std::result::Result<String, LlmError> {
        tokio::time::timeout(self.timeout, self.inner.merge(old_text, new_text))
            .await
            .unwrap_or(Err(LlmError::Timeout))
    }
}

fn category_str(category: Category) -> &'static str {
    match category {
        Category::Preference => "PREFERENCE",
        Category::Fact => "FACT",
        Category::Event => "EVENT",
        Category::Skill => "SKILL",
        Category::Relationship => "RELATIONSHIP",
        Category::Health => "HEALTH",
        Category::Other => "OTHER",
    }
}

fn category_from_str(value: &str) -> Category {
    match value {
        "PREFERENCE" => Category::Preference,
        "FACT" => Category::Fact,
        "EVENT" => Category::Event,
        "SKILL" => Category::Skill,
        "RELATIONSHIP" => Category::Relationship,
        "HEALTH" => Category::Health,
        _ => Category::Other,
    }
}
