//! Engine tuning knobs, builder-style.

use std::time::Duration;

/// Configures [`crate::MemoryLifecycleEngine`] behaviour.
///
/// `embedding_dim` is deliberately absent: it is read from the embedding
/// provider at construction time (spec §4.1), not configured here.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    top_k_candidates: usize,
    similarity_threshold: f32,
    category_conflict_threshold: f32,
    high_importance_threshold: f32,
    search_default_limit: usize,
    llm_timeout: Duration,
    embedding_timeout: Duration,
    store_timeout: Duration,
    retry_attempts: u32,
    retry_base_backoff: Duration,
    lock_wait: Duration,
    lock_table_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            top_k_candidates: 8,
            similarity_threshold: 0.75,
            category_conflict_threshold: 0.85,
            high_importance_threshold: 0.8,
            search_default_limit: 10,
            llm_timeout: Duration::from_secs(30),
            embedding_timeout: Duration::from_secs(10),
            store_timeout: Duration::from_secs(5),
            retry_attempts: 3,
            retry_base_backoff: Duration::from_millis(100),
            lock_wait: Duration::from_secs(60),
            lock_table_capacity: 10_000,
        }
    }
}

impl EngineConfig {
    /// Starts from the defaults; equivalent to [`Default::default`].
    #[must_use]
    pub fn builder() -> Self {
        Self::default()
    }

    /// Sets how many same-user candidates the conflict detector inspects
    /// (spec §4.7 default: 8).
    #[must_use]
    pub const fn with_top_k_candidates(mut self, value: usize) -> Self {
        self.top_k_candidates = value;
        self
    }

    /// Sets the minimum cosine similarity for a candidate to be considered
    /// a conflict at all (spec §4.7 default: 0.75).
    #[must_use]
    pub const fn with_similarity_threshold(mut self, value: f32) -> Self {
        self.similarity_threshold = value;
        self
    }

    /// Sets the similarity floor above which a cross-category pair is
    /// still compared rather than auto-`NONE` (spec §4.7 default: 0.85).
    #[must_use]
    pub const fn with_category_conflict_threshold(mut self, value: f32) -> Self {
        self.category_conflict_threshold = value;
        self
    }

    /// Sets the importance floor above which a `CONTRADICTS` verdict keeps
    /// both memories rather than merging (spec §4.8 default: 0.8).
    #[must_use]
    pub const fn with_high_importance_threshold(mut self, value: f32) -> Self {
        self.high_importance_threshold = value;
        self
    }

    /// Sets the default `search` result limit when the caller doesn't pass
    /// one (spec §4.9 default: 10).
    #[must_use]
    pub const fn with_search_default_limit(mut self, value: usize) -> Self {
        self.search_default_limit = value;
        self
    }

    /// Sets the LLM provider call timeout (spec §5 default: 30s).
    #[must_use]
    pub const fn with_llm_timeout(mut self, value: Duration) -> Self {
        self.llm_timeout = value;
        self
    }

    /// Sets the embedding provider call timeout (spec §5 default: 10s).
    #[must_use]
    pub const fn with_embedding_timeout(mut self, value: Duration) -> Self {
        self.embedding_timeout = value;
        self
    }

    /// Sets the vector/graph store call timeout (spec §5 default: 5s).
    #[must_use]
    pub const fn with_store_timeout(mut self, value: Duration) -> Self {
        self.store_timeout = value;
        self
    }

    /// Sets the maximum retry attempts for a retriable provider failure
    /// (spec §7 default: 3).
    #[must_use]
    pub const fn with_retry_attempts(mut self, value: u32) -> Self {
        self.retry_attempts = value;
        self
    }

    /// Sets the base (pre-jitter) exponential backoff delay.
    #[must_use]
    pub const fn with_retry_base_backoff(mut self, value: Duration) -> Self {
        self.retry_base_backoff = value;
        self
    }

    /// Sets how long a caller waits for a per-memory lock before
    /// `Concurrency` is surfaced (spec §7 default: 60s).
    #[must_use]
    pub const fn with_lock_wait(mut self, value: Duration) -> Self {
        self.lock_wait = value;
        self
    }

    /// Sets the per-memory lock table's LRU capacity (spec §5 default:
    /// 10,000).
    #[must_use]
    pub const fn with_lock_table_capacity(mut self, value: usize) -> Self {
        self.lock_table_capacity = value;
        self
    }

    /// Returns the configured candidate pool size.
    #[must_use]
    pub const fn top_k_candidates(&self) -> usize {
        self.top_k_candidates
    }

    /// Returns the configured similarity floor.
    #[must_use]
    pub const fn similarity_threshold(&self) -> f32 {
        self.similarity_threshold
    }

    /// Returns the configured cross-category similarity floor.
    #[must_use]
    pub const fn category_conflict_threshold(&self) -> f32 {
        self.category_conflict_threshold
    }

    /// Returns the configured high-importance floor.
    #[must_use]
    pub const fn high_importance_threshold(&self) -> f32 {
        self.high_importance_threshold
    }

    /// Returns the configured default search limit.
    #[must_use]
    pub const fn search_default_limit(&self) -> usize {
        self.search_default_limit
    }

    /// Returns the configured LLM provider timeout.
    #[must_use]
    pub const fn llm_timeout(&self) -> Duration {
        self.llm_timeout
    }

    /// Returns the configured embedding provider timeout.
    #[must_use]
    pub const fn embedding_timeout(&self) -> Duration {
        self.embedding_timeout
    }

    /// Returns the configured store call timeout.
    #[must_use]
    pub const fn store_timeout(&self) -> Duration {
        self.store_timeout
    }

    /// Returns the configured retry attempt count.
    #[must_use]
    pub const fn retry_attempts(&self) -> u32 {
        self.retry_attempts
    }

    /// Returns the configured base backoff delay.
    #[must_use]
    pub const fn retry_base_backoff(&self) -> Duration {
        self.retry_base_backoff
    }

    /// Returns the configured per-memory lock wait.
    #[must_use]
    pub const fn lock_wait(&self) -> Duration {
        self.lock_wait
    }

    /// Returns the configured lock table capacity.
    #[must_use]
    pub const fn lock_table_capacity(&self) -> usize {
        self.lock_table_capacity
    }
}
