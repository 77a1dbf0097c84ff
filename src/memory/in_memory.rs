//! Volatile memory store for tests and development.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use serde_json::Value;

use super::{
    Memory, MemoryError, MemoryMetadata, MemoryQuery, MemoryStore, qualified_key,
    rank_and_truncate,
};

/// In-process [`MemoryStore`] backed by a hash map.
///
/// Shared across engines by cloning the `Arc<dyn MemoryStore>` handle;
/// subgraphs created from a parent engine reuse the same map.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    namespace: String,
    entries: RwLock<FxHashMap<String, Memory>>,
}

impl InMemoryStore {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            entries: RwLock::new(FxHashMap::default()),
        }
    }

    /// Load previously persisted memories (metadata intact) into a fresh
    /// store, e.g. when warming an in-process cache from a durable backend.
    pub fn restore(namespace: impl Into<String>, memories: Vec<Memory>) -> Self {
        let store = Self::new(namespace);
        {
            let mut entries = store.entries.write();
            for memory in memories {
                entries.insert(memory.key.clone(), memory);
            }
        }
        store
    }
}

#[async_trait]
impl MemoryStore for InMemoryStore {
    fn namespace(&self) -> &str {
        &self.namespace
    }

    async fn put(&self, key: &str, value: Value, kind: Option<&str>) -> Result<(), MemoryError> {
        let full_key = qualified_key(&self.namespace, key);
        let now = Utc::now();
        let mut entries = self.entries.write();
        match entries.get_mut(&full_key) {
            Some(existing) => {
                existing.value = value;
                existing.metadata.updated_at = now;
                existing.metadata.access_count += 1;
                if let Some(kind) = kind {
                    existing.metadata.kind = Some(kind.to_string());
                }
            }
            None => {
                entries.insert(
                    full_key.clone(),
                    Memory::new(
                        full_key,
                        value,
                        MemoryMetadata {
                            kind: kind.map(str::to_string),
                            created_at: now,
                            updated_at: now,
                            access_count: 1,
                            last_accessed: None,
                        },
                    ),
                );
            }
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Value>, MemoryError> {
        let full_key = qualified_key(&self.namespace, key);
        let mut entries = self.entries.write();
        Ok(entries.get_mut(&full_key).map(|memory| {
            memory.metadata.access_count += 1;
            memory.metadata.last_accessed = Some(Utc::now());
            memory.value.clone()
        }))
    }

    async fn search(&self, query: MemoryQuery) -> Result<Vec<Memory>, MemoryError> {
        let prefix = format!(
            "{}:",
            query.namespace.as_deref().unwrap_or(&self.namespace)
        );
        let entries = self.entries.read();
        let mut matches: Vec<Memory> = entries
            .values()
            .filter(|m| m.key.starts_with(&prefix))
            .filter(|m| {
                query
                    .kind
                    .as_deref()
                    .is_none_or(|kind| m.metadata.kind.as_deref() == Some(kind))
            })
            .filter(|m| query.since.is_none_or(|since| m.metadata.updated_at >= since))
            .cloned()
            .collect();
        drop(entries);
        rank_and_truncate(&mut matches, query.limit);
        Ok(matches)
    }

    async fn delete(&self, key: &str) -> Result<(), MemoryError> {
        let full_key = qualified_key(&self.namespace, key);
        self.entries.write().remove(&full_key);
        Ok(())
    }
}
