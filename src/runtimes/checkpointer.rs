//! Checkpoint model and pluggable persistence trait.
//!
//! The engine appends one [`Checkpoint`] per executed node (plus the
//! interrupted and final snapshots), so a thread's history is a full,
//! ordered audit trail. Checkpoints are immutable once written and
//! accumulate until explicitly cleared.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use miette::Diagnostic;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use thiserror::Error;
use uuid::Uuid;

use crate::state::SessionState;
use crate::types::NodeKind;

/// Which checkpoint backend the engine builds on construction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CheckpointerType {
    /// Volatile storage for tests and development.
    InMemory,
    /// Durable SQLite-backed persistence.
    #[cfg(feature = "sqlite")]
    Sqlite,
}

/// Snapshot bookkeeping stored next to the state copy.
#[derive(Clone, Debug, PartialEq)]
pub struct CheckpointMetadata {
    /// The node whose execution produced this snapshot.
    pub node: NodeKind,
    /// Ordinal within the run; strictly increases and tie-breaks equal
    /// timestamps in [`Checkpointer::load_latest`].
    pub step: u32,
    pub timestamp: DateTime<Utc>,
    /// Set on the snapshot persisted just before a run suspends.
    pub interrupted: bool,
    /// Set on the one snapshot written at run completion.
    pub is_final: bool,
    /// Persistence namespace of the engine that wrote this.
    pub namespace: String,
}

/// An immutable state snapshot taken after a node executed.
///
/// The state is an owned deep copy: later mutation of the live
/// [`SessionState`] never retroactively alters a saved checkpoint.
#[derive(Clone, Debug, PartialEq)]
pub struct Checkpoint {
    pub id: String,
    pub thread_id: String,
    pub state: SessionState,
    pub metadata: CheckpointMetadata,
}

impl Checkpoint {
    /// Snapshot the given state under a fresh id.
    pub fn new(thread_id: impl Into<String>, state: SessionState, metadata: CheckpointMetadata) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            thread_id: thread_id.into(),
            state,
            metadata,
        }
    }
}

/// Lightweight listing entry; callers sort by timestamp when order matters.
#[derive(Clone, Debug, PartialEq)]
pub struct CheckpointSummary {
    pub id: String,
    pub node: NodeKind,
    pub step: u32,
    pub timestamp: DateTime<Utc>,
    pub interrupted: bool,
    pub is_final: bool,
}

impl From<&Checkpoint> for CheckpointSummary {
    fn from(cp: &Checkpoint) -> Self {
        Self {
            id: cp.id.clone(),
            node: cp.metadata.node.clone(),
            step: cp.metadata.step,
            timestamp: cp.metadata.timestamp,
            interrupted: cp.metadata.interrupted,
            is_final: cp.metadata.is_final,
        }
    }
}

/// Errors from checkpoint storage backends.
///
/// These propagate out of `invoke` — storage loss has no safe fallback
/// state, unlike handler failures.
#[derive(Debug, Error, Diagnostic)]
pub enum CheckpointerError {
    #[error("checkpoint backend error: {message}")]
    #[diagnostic(
        code(tutorgraph::checkpointer::backend),
        help("Check that the underlying storage is reachable and writable.")
    )]
    Backend { message: String },

    #[error("checkpoint error: {message}")]
    #[diagnostic(code(tutorgraph::checkpointer::other))]
    Other { message: String },
}

pub type Result<T> = std::result::Result<T, CheckpointerError>;

/// Append-only, per-thread snapshot history.
#[async_trait]
pub trait Checkpointer: Send + Sync {
    /// Persist a checkpoint, returning its id.
    async fn save(&self, checkpoint: Checkpoint) -> Result<String>;

    /// The checkpoint with maximum `(timestamp, step)` for the thread.
    async fn load_latest(&self, thread_id: &str) -> Result<Option<Checkpoint>>;

    /// Summaries of the thread's history.
    async fn list(&self, thread_id: &str) -> Result<Vec<CheckpointSummary>>;

    /// Delete one thread's history, or all history when `None`.
    async fn clear(&self, thread_id: Option<&str>) -> Result<()>;
}

/// Volatile [`Checkpointer`] backed by a per-thread vector.
#[derive(Debug, Default)]
pub struct InMemoryCheckpointer {
    threads: RwLock<FxHashMap<String, Vec<Checkpoint>>>,
}

impl InMemoryCheckpointer {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Checkpointer for InMemoryCheckpointer {
    async fn save(&self, checkpoint: Checkpoint) -> Result<String> {
        let id = checkpoint.id.clone();
        self.threads
            .write()
            .entry(checkpoint.thread_id.clone())
            .or_default()
            .push(checkpoint);
        Ok(id)
    }

    async fn load_latest(&self, thread_id: &str) -> Result<Option<Checkpoint>> {
        Ok(self.threads.read().get(thread_id).and_then(|history| {
            history
                .iter()
                .max_by_key(|cp| (cp.metadata.timestamp, cp.metadata.step))
                .cloned()
        }))
    }

    async fn list(&self, thread_id: &str) -> Result<Vec<CheckpointSummary>> {
        Ok(self
            .threads
            .read()
            .get(thread_id)
            .map(|history| history.iter().map(CheckpointSummary::from).collect())
            .unwrap_or_default())
    }

    async fn clear(&self, thread_id: Option<&str>) -> Result<()> {
        let mut threads = self.threads.write();
        match thread_id {
            Some(thread_id) => {
                threads.remove(thread_id);
            }
            None => threads.clear(),
        }
        Ok(())
    }
}
