use chrono::{Duration, Utc};
use serde_json::json;

use tutorgraph::memory::{
    InMemoryStore, Memory, MemoryMetadata, MemoryQuery, MemoryStore, relevance_score,
};

fn seeded_memory(
    key: &str,
    access_count: u64,
    updated_ms_ago: i64,
    kind: Option<&str>,
) -> Memory {
    let updated_at = Utc::now() - Duration::milliseconds(updated_ms_ago);
    Memory::new(
        key,
        json!({"seed": true}),
        MemoryMetadata {
            kind: kind.map(str::to_string),
            created_at: updated_at,
            updated_at,
            access_count,
            last_accessed: None,
        },
    )
}

#[tokio::test]
async fn put_creates_then_updates_in_place() {
    let store = InMemoryStore::new("session");
    store.put("style:visual", json!("v1"), Some("style")).await.unwrap();
    store.put("style:visual", json!("v2"), None).await.unwrap();

    // Latest value wins; the kind set at creation survives a kindless update.
    assert_eq!(store.get("style:visual").await.unwrap(), Some(json!("v2")));
    let found = store.search(MemoryQuery::default()).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].metadata.kind.as_deref(), Some("style"));
}

#[tokio::test]
async fn every_access_counts_toward_relevance() {
    let store = InMemoryStore::new("session");
    store.put("k", json!(1), None).await.unwrap();
    store.put("k", json!(2), None).await.unwrap();
    let _ = store.get("k").await.unwrap();

    // Creation, update, and read each count as one access.
    let found = store.search(MemoryQuery::default()).await.unwrap();
    assert_eq!(found[0].metadata.access_count, 3);
    assert!(found[0].metadata.last_accessed.is_some());
}

#[tokio::test]
async fn get_of_absent_key_is_none_and_counts_nothing() {
    let store = InMemoryStore::new("session");
    assert_eq!(store.get("ghost").await.unwrap(), None);
    assert!(store.search(MemoryQuery::default()).await.unwrap().is_empty());
}

#[test]
fn relevance_blends_frequency_and_recency() {
    let now = Utc::now();
    let fresh_and_used = seeded_memory("session:a", 10, 0, None);
    let stale_and_used = seeded_memory("session:b", 10, 100_000, None);
    let fresh_but_rare = seeded_memory("session:c", 1, 0, None);

    let fresh_score = relevance_score(&fresh_and_used.metadata, now);
    assert!((fresh_score - 3.0).abs() < 0.01);

    // 100 seconds of staleness costs a full point.
    let stale_score = relevance_score(&stale_and_used.metadata, now);
    assert!((stale_score - 2.0).abs() < 0.01);

    let rare_score = relevance_score(&fresh_but_rare.metadata, now);
    assert!((rare_score - 0.3).abs() < 0.01);

    assert!(fresh_score > stale_score && stale_score > rare_score);
}

#[tokio::test]
async fn search_ranks_by_relevance_descending() {
    let store = InMemoryStore::restore(
        "session",
        vec![
            seeded_memory("session:rarely_used", 1, 0, None),
            seeded_memory("session:favorite", 20, 0, None),
            seeded_memory("session:stale_favorite", 20, 86_400_000, None),
        ],
    );

    let keys: Vec<String> = store
        .search(MemoryQuery::default())
        .await
        .unwrap()
        .into_iter()
        .map(|m| m.key)
        .collect();
    assert_eq!(
        keys,
        vec![
            "session:favorite",
            "session:stale_favorite",
            "session:rarely_used",
        ]
    );
}

#[tokio::test]
async fn search_filters_kind_since_and_limit() {
    let store = InMemoryStore::restore(
        "session",
        vec![
            seeded_memory("session:old_style", 5, 3_600_000, Some("style")),
            seeded_memory("session:new_style", 5, 0, Some("style")),
            seeded_memory("session:pattern", 5, 0, Some("pattern")),
        ],
    );

    let styles = store
        .search(MemoryQuery {
            kind: Some("style".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(styles.len(), 2);

    let recent = store
        .search(MemoryQuery {
            since: Some(Utc::now() - Duration::minutes(10)),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(recent.len(), 2);
    assert!(recent.iter().all(|m| !m.key.contains("old_style")));

    let top_one = store
        .search(MemoryQuery {
            limit: Some(1),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(top_one.len(), 1);
}

#[tokio::test]
async fn search_is_scoped_by_namespace_prefix() {
    let store = InMemoryStore::restore(
        "session",
        vec![
            seeded_memory("session:mine", 1, 0, None),
            seeded_memory("other:theirs", 1, 0, None),
        ],
    );

    let mine = store.search(MemoryQuery::default()).await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].key, "session:mine");

    let theirs = store
        .search(MemoryQuery {
            namespace: Some("other".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(theirs.len(), 1);
    assert_eq!(theirs[0].key, "other:theirs");
}

#[tokio::test]
async fn delete_is_idempotent() {
    let store = InMemoryStore::new("session");
    store.put("k", json!(1), None).await.unwrap();
    store.delete("k").await.unwrap();
    store.delete("k").await.unwrap();
    assert_eq!(store.get("k").await.unwrap(), None);
}

#[cfg(feature = "sqlite")]
mod sqlite {
    use super::*;
    use tutorgraph::memory::SqliteStore;

    async fn temp_store() -> (tempfile::TempDir, SqliteStore) {
        let dir = tempfile::tempdir().unwrap();
        let url = format!(
            "sqlite://{}?mode=rwc",
            dir.path().join("memories.db").display()
        );
        let store = SqliteStore::connect(&url, "session").await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn sqlite_put_get_roundtrip_counts_accesses() {
        let (_dir, store) = temp_store().await;
        store.put("k", json!({"a": 1}), Some("pattern")).await.unwrap();
        store.put("k", json!({"a": 2}), None).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(json!({"a": 2})));

        let found = store.search(MemoryQuery::default()).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].key, "session:k");
        assert_eq!(found[0].metadata.access_count, 3);
        assert_eq!(found[0].metadata.kind.as_deref(), Some("pattern"));
    }

    #[tokio::test]
    async fn sqlite_delete_is_idempotent() {
        let (_dir, store) = temp_store().await;
        store.put("k", json!(1), None).await.unwrap();
        store.delete("k").await.unwrap();
        store.delete("k").await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn sqlite_search_filters_by_kind() {
        let (_dir, store) = temp_store().await;
        store.put("a", json!(1), Some("style")).await.unwrap();
        store.put("b", json!(2), Some("pattern")).await.unwrap();

        let styles = store
            .search(MemoryQuery {
                kind: Some("style".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(styles.len(), 1);
        assert_eq!(styles[0].key, "session:a");
    }
}
