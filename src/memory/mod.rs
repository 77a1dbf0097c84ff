//! Long-term memory accumulated across many threads.
//!
//! Unlike checkpoints, which belong to one run, memories are durable
//! namespaced knowledge ("indicator X responds best to style Y") that any
//! handler can read or write through the [`MemoryStore`] handle on its
//! [`NodeContext`](crate::node::NodeContext).
//!
//! Every access counts toward relevance by design, not oversight: `put` and
//! `get` both bump `access_count`, and [`search`](MemoryStore::search) ranks
//! by a linear blend of usage frequency and recency (see
//! [`relevance_score`]). Memories never auto-expire; they are deleted only
//! explicitly.
//!
//! Backends: [`InMemoryStore`] for tests and development, [`SqliteStore`]
//! (feature `sqlite`) for durable storage.

mod in_memory;
#[cfg(feature = "sqlite")]
mod sqlite;

pub use in_memory::InMemoryStore;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Weight of `access_count` in the relevance score.
pub const ACCESS_WEIGHT: f64 = 0.3;
/// Penalty per millisecond of staleness in the relevance score.
pub const RECENCY_DECAY_PER_MS: f64 = 0.000_01;

/// Usage and recency bookkeeping carried by every memory.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MemoryMetadata {
    /// Optional category tag, filterable in [`MemoryQuery::kind`].
    pub kind: Option<String>,
    /// Set once on first put, preserved across updates.
    pub created_at: DateTime<Utc>,
    /// Refreshed on every put.
    pub updated_at: DateTime<Utc>,
    /// Incremented by every put and every successful get; creation counts
    /// as the first access.
    pub access_count: u64,
    /// Set by every successful get.
    pub last_accessed: Option<DateTime<Utc>>,
}

/// One stored memory: a fully namespaced key, its value, and metadata.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    /// Fully qualified key, `namespace:key`.
    pub key: String,
    pub value: Value,
    pub metadata: MemoryMetadata,
}

impl Memory {
    pub fn new(key: impl Into<String>, value: Value, metadata: MemoryMetadata) -> Self {
        Self {
            key: key.into(),
            value,
            metadata,
        }
    }
}

/// Filters and limit for [`MemoryStore::search`].
#[derive(Clone, Debug, Default)]
pub struct MemoryQuery {
    /// Key-prefix namespace to search; defaults to the store's own.
    pub namespace: Option<String>,
    /// Only memories whose `metadata.kind` matches.
    pub kind: Option<String>,
    /// Only memories with `metadata.updated_at >= since`.
    pub since: Option<DateTime<Utc>>,
    /// Truncate the ranked result to at most this many entries.
    pub limit: Option<usize>,
}

/// Errors from memory storage backends.
#[derive(Debug, Error, Diagnostic)]
pub enum MemoryError {
    #[error("memory backend error: {message}")]
    #[diagnostic(
        code(tutorgraph::memory::backend),
        help("Check that the underlying storage is reachable and writable.")
    )]
    Backend { message: String },

    #[error("memory serialization failed: {source}")]
    #[diagnostic(code(tutorgraph::memory::serde))]
    Serde {
        #[source]
        source: serde_json::Error,
    },
}

/// Namespaced long-term key/value store with usage+recency-ranked search.
///
/// All keys are stored under `namespace:key`; the namespace is fixed per
/// store handle so concurrent engines (and subgraphs sharing a parent's
/// store) stay isolated by prefix.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// The namespace this handle reads and writes under.
    fn namespace(&self) -> &str;

    /// Store or update a value.
    ///
    /// Creates the memory on first call; later calls preserve `created_at`,
    /// refresh `updated_at`, and increment `access_count`.
    async fn put(&self, key: &str, value: Value, kind: Option<&str>) -> Result<(), MemoryError>;

    /// Fetch a value, or `None` if absent.
    ///
    /// A successful read increments `access_count` and sets `last_accessed`.
    async fn get(&self, key: &str) -> Result<Option<Value>, MemoryError>;

    /// Filtered, relevance-ranked lookup. See [`relevance_score`].
    async fn search(&self, query: MemoryQuery) -> Result<Vec<Memory>, MemoryError>;

    /// Remove a memory. Idempotent: deleting an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<(), MemoryError>;
}

/// The documented ranking formula:
/// `access_count * 0.3 - 0.00001 * millis(now - updated_at)`.
///
/// Usage frequency and recency blended linearly; higher is more relevant.
#[must_use]
pub fn relevance_score(metadata: &MemoryMetadata, now: DateTime<Utc>) -> f64 {
    let staleness_ms = (now - metadata.updated_at).num_milliseconds() as f64;
    metadata.access_count as f64 * ACCESS_WEIGHT - RECENCY_DECAY_PER_MS * staleness_ms
}

/// Rank memories in place by descending relevance, tie-broken by key so
/// results are deterministic, then truncate to `limit`.
pub(crate) fn rank_and_truncate(memories: &mut Vec<Memory>, limit: Option<usize>) {
    let now = Utc::now();
    memories.sort_by(|a, b| {
        relevance_score(&b.metadata, now)
            .partial_cmp(&relevance_score(&a.metadata, now))
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.key.cmp(&b.key))
    });
    if let Some(limit) = limit {
        memories.truncate(limit);
    }
}

/// Build the fully qualified form of a key.
pub(crate) fn qualified_key(namespace: &str, key: &str) -> String {
    format!("{namespace}:{key}")
}
