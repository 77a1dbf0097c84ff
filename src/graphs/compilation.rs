//! Compiled graph topology, consumed by the runtime engine.

use rustc_hash::FxHashMap;
use std::sync::Arc;

use super::edges::Edge;
use crate::node::Handler;
use crate::runtimes::RuntimeConfig;
use crate::types::NodeKind;

/// Immutable node/edge registry produced by
/// [`GraphBuilder::compile`](super::GraphBuilder::compile).
///
/// A `Graph` is pure structure; execution state (checkpoints, interrupts,
/// memory) lives in [`GraphEngine`](crate::runtimes::GraphEngine).
#[derive(Clone)]
pub struct Graph {
    nodes: FxHashMap<NodeKind, Arc<dyn Handler>>,
    edges: FxHashMap<NodeKind, Edge>,
    runtime_config: RuntimeConfig,
}

impl Graph {
    pub(crate) fn new(
        nodes: FxHashMap<NodeKind, Arc<dyn Handler>>,
        edges: FxHashMap<NodeKind, Edge>,
        runtime_config: RuntimeConfig,
    ) -> Self {
        Self {
            nodes,
            edges,
            runtime_config,
        }
    }

    pub fn nodes(&self) -> &FxHashMap<NodeKind, Arc<dyn Handler>> {
        &self.nodes
    }

    pub fn edges(&self) -> &FxHashMap<NodeKind, Edge> {
        &self.edges
    }

    pub fn runtime_config(&self) -> &RuntimeConfig {
        &self.runtime_config
    }
}

impl std::fmt::Debug for Graph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Graph")
            .field("nodes", &self.nodes.keys().collect::<Vec<_>>())
            .field("edges", &self.edges)
            .finish()
    }
}
