//! Graph and engine fixtures shared across integration tests.

use std::sync::Arc;

use tutorgraph::graphs::{ConditionFn, Graph, GraphBuilder};
use tutorgraph::memory::InMemoryStore;
use tutorgraph::runtimes::{GraphEngine, InMemoryCheckpointer};

use super::nodes::{GreetNode, InterventionPicker, StruggleDetector};

/// Start → greet → End.
pub fn linear_graph() -> Graph {
    GraphBuilder::new()
        .add_node("greet", GreetNode)
        .add_edge("Start", "greet")
        .add_edge("greet", "End")
        .compile()
        .expect("linear graph compiles")
}

/// Start → detect → (active → analyze → End | none → End).
pub fn branching_graph() -> Graph {
    let by_struggle: ConditionFn = Arc::new(|state| {
        state
            .struggle_level
            .clone()
            .unwrap_or_else(|| "none".to_string())
    });
    GraphBuilder::new()
        .add_node("detect", StruggleDetector)
        .add_node("analyze", InterventionPicker)
        .add_edge("Start", "detect")
        .add_conditional_edges("detect", by_struggle, [("active", "analyze"), ("none", "End")])
        .add_edge("analyze", "End")
        .compile()
        .expect("branching graph compiles")
}

/// Engine over fresh in-memory backends.
pub fn in_memory_engine(graph: Graph) -> GraphEngine {
    let namespace = graph.runtime_config().namespace.clone();
    GraphEngine::with_stores(
        graph,
        Arc::new(InMemoryCheckpointer::new()),
        Arc::new(InMemoryStore::new(namespace)),
    )
}
