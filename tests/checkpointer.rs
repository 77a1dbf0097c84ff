use chrono::{Duration, Utc};

use tutorgraph::runtimes::{
    Checkpoint, CheckpointMetadata, Checkpointer, InMemoryCheckpointer,
};
use tutorgraph::state::{SessionState, StateUpdate};
use tutorgraph::types::NodeKind;

fn checkpoint_at(
    thread_id: &str,
    node: &str,
    step: u32,
    offset_ms: i64,
    state: SessionState,
) -> Checkpoint {
    Checkpoint::new(
        thread_id,
        state,
        CheckpointMetadata {
            node: NodeKind::from(node),
            step,
            timestamp: Utc::now() + Duration::milliseconds(offset_ms),
            interrupted: false,
            is_final: false,
            namespace: "session".to_string(),
        },
    )
}

#[tokio::test]
async fn load_latest_picks_newest_timestamp() {
    let store = InMemoryCheckpointer::new();
    let mut early = SessionState::new("t1");
    early.apply(StateUpdate::new().with_outcome("early"));
    let mut late = SessionState::new("t1");
    late.apply(StateUpdate::new().with_outcome("late"));

    store
        .save(checkpoint_at("t1", "a", 1, 0, early))
        .await
        .unwrap();
    store
        .save(checkpoint_at("t1", "b", 2, 500, late))
        .await
        .unwrap();

    let latest = store.load_latest("t1").await.unwrap().unwrap();
    assert_eq!(latest.state.outcome.as_deref(), Some("late"));
    assert_eq!(latest.metadata.node, NodeKind::from("b"));
}

#[tokio::test]
async fn load_latest_breaks_timestamp_ties_by_step() {
    let store = InMemoryCheckpointer::new();
    let ts = Utc::now();
    for (node, step) in [("a", 1), ("b", 2)] {
        let mut state = SessionState::new("t1");
        state.apply(StateUpdate::new().with_outcome(node));
        store
            .save(Checkpoint::new(
                "t1",
                state,
                CheckpointMetadata {
                    node: NodeKind::from(node),
                    step,
                    timestamp: ts,
                    interrupted: false,
                    is_final: false,
                    namespace: "session".to_string(),
                },
            ))
            .await
            .unwrap();
    }
    let latest = store.load_latest("t1").await.unwrap().unwrap();
    assert_eq!(latest.metadata.step, 2);
}

#[tokio::test]
async fn load_latest_of_unknown_thread_is_none() {
    let store = InMemoryCheckpointer::new();
    assert!(store.load_latest("nope").await.unwrap().is_none());
}

#[tokio::test]
async fn list_reconstructs_node_visitation_order() {
    let store = InMemoryCheckpointer::new();
    for (i, node) in ["detect", "analyze", "intervene"].iter().enumerate() {
        store
            .save(checkpoint_at(
                "t1",
                node,
                (i + 1) as u32,
                (i as i64) * 100,
                SessionState::new("t1"),
            ))
            .await
            .unwrap();
    }

    let visited: Vec<NodeKind> = store
        .list("t1")
        .await
        .unwrap()
        .into_iter()
        .map(|s| s.node)
        .collect();
    assert_eq!(
        visited,
        vec![
            NodeKind::from("detect"),
            NodeKind::from("analyze"),
            NodeKind::from("intervene"),
        ]
    );
}

#[tokio::test]
async fn saved_checkpoints_are_deep_copies() {
    let store = InMemoryCheckpointer::new();
    let mut state = SessionState::new("t1");
    state.apply(StateUpdate::new().with_outcome("original"));

    store
        .save(checkpoint_at("t1", "a", 1, 0, state.clone()))
        .await
        .unwrap();

    // Mutating the live state never reaches the stored snapshot.
    state.apply(
        StateUpdate::new()
            .with_outcome("mutated")
            .with_extra("late_field", serde_json::json!(true)),
    );

    let loaded = store.load_latest("t1").await.unwrap().unwrap();
    assert_eq!(loaded.state.outcome.as_deref(), Some("original"));
    assert!(loaded.state.extra.get("late_field").is_none());
}

#[tokio::test]
async fn clear_one_thread_leaves_others() {
    let store = InMemoryCheckpointer::new();
    store
        .save(checkpoint_at("t1", "a", 1, 0, SessionState::new("t1")))
        .await
        .unwrap();
    store
        .save(checkpoint_at("t2", "a", 1, 0, SessionState::new("t2")))
        .await
        .unwrap();

    store.clear(Some("t1")).await.unwrap();
    assert!(store.list("t1").await.unwrap().is_empty());
    assert_eq!(store.list("t2").await.unwrap().len(), 1);

    store.clear(None).await.unwrap();
    assert!(store.list("t2").await.unwrap().is_empty());
}

#[cfg(feature = "sqlite")]
mod sqlite {
    use super::*;
    use tutorgraph::runtimes::SqliteCheckpointer;

    async fn temp_store() -> (tempfile::TempDir, SqliteCheckpointer) {
        let dir = tempfile::tempdir().unwrap();
        let url = format!(
            "sqlite://{}?mode=rwc",
            dir.path().join("checkpoints.db").display()
        );
        let store = SqliteCheckpointer::connect(&url).await.unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn sqlite_roundtrip_preserves_state_and_metadata() {
        let (_dir, store) = temp_store().await;
        let mut state = SessionState::new("t1");
        state.apply(
            StateUpdate::new()
                .with_concept_id("fractions")
                .with_extra("hint_count", serde_json::json!(2)),
        );
        let saved = checkpoint_at("t1", "detect", 1, 0, state.clone());
        let id = store.save(saved.clone()).await.unwrap();
        assert_eq!(id, saved.id);

        let loaded = store.load_latest("t1").await.unwrap().unwrap();
        assert_eq!(loaded.id, saved.id);
        assert_eq!(loaded.state, state);
        assert_eq!(loaded.metadata.node, NodeKind::from("detect"));
        assert_eq!(loaded.metadata.namespace, "session");
    }

    #[tokio::test]
    async fn sqlite_list_orders_by_creation() {
        let (_dir, store) = temp_store().await;
        for (i, node) in ["a", "b", "c"].iter().enumerate() {
            store
                .save(checkpoint_at(
                    "t1",
                    node,
                    (i + 1) as u32,
                    (i as i64) * 100,
                    SessionState::new("t1"),
                ))
                .await
                .unwrap();
        }
        let steps: Vec<u32> = store
            .list("t1")
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.step)
            .collect();
        assert_eq!(steps, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn sqlite_clear_scopes_to_thread() {
        let (_dir, store) = temp_store().await;
        store
            .save(checkpoint_at("t1", "a", 1, 0, SessionState::new("t1")))
            .await
            .unwrap();
        store
            .save(checkpoint_at("t2", "a", 1, 0, SessionState::new("t2")))
            .await
            .unwrap();

        store.clear(Some("t1")).await.unwrap();
        assert!(store.load_latest("t1").await.unwrap().is_none());
        assert!(store.load_latest("t2").await.unwrap().is_some());
    }
}
