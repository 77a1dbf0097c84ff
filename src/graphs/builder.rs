//! GraphBuilder: fluent registration of nodes and edges.

use rustc_hash::FxHashMap;
use std::sync::Arc;

use super::compilation::Graph;
use super::edges::{ConditionFn, ConditionalEdge, Edge};
use crate::node::Handler;
use crate::runtimes::RuntimeConfig;
use crate::types::NodeKind;
use miette::Diagnostic;
use thiserror::Error;

/// Registration problems detected when compiling a builder.
///
/// Deliberately narrow: the engine performs no static reachability or
/// topology validation (unknown targets resolve to `End` at runtime).
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigurationError {
    #[error("graph has no registered nodes")]
    #[diagnostic(
        code(tutorgraph::graphs::empty_graph),
        help("Register at least one node with add_node before compiling.")
    )]
    EmptyGraph,

    #[error("conditional edge from {from} has an empty route map")]
    #[diagnostic(
        code(tutorgraph::graphs::empty_route_map),
        help("Provide at least one route key, or use add_edge for a fixed transition.")
    )]
    EmptyRouteMap { from: String },
}

/// Builder for workflow graphs.
///
/// Registers nodes and edges before compiling to a [`Graph`]. Node and edge
/// registration is last-writer-wins: re-registering a name or a source node
/// silently replaces the previous entry.
///
/// `NodeKind::Start` and `NodeKind::End` are virtual endpoints and are never
/// registered as nodes; attempts are ignored with a warning. Edges *from*
/// `Start` and *to* `End` are how entry and exit are defined.
///
/// # Examples
///
/// ```rust
/// use tutorgraph::graphs::{ConditionFn, GraphBuilder};
/// use tutorgraph::node::{Handler, HandlerError, NodeContext};
/// use tutorgraph::state::{SessionState, StateUpdate};
/// use std::sync::Arc;
///
/// # struct Detect;
/// # #[async_trait::async_trait]
/// # impl Handler for Detect {
/// #     async fn run(&self, _: SessionState, _: NodeContext) -> Result<StateUpdate, HandlerError> {
/// #         Ok(StateUpdate::default())
/// #     }
/// # }
/// # struct Analyze;
/// # #[async_trait::async_trait]
/// # impl Handler for Analyze {
/// #     async fn run(&self, _: SessionState, _: NodeContext) -> Result<StateUpdate, HandlerError> {
/// #         Ok(StateUpdate::default())
/// #     }
/// # }
/// let by_struggle: ConditionFn = Arc::new(|state| {
///     state.struggle_level.clone().unwrap_or_else(|| "none".into())
/// });
///
/// let graph = GraphBuilder::new()
///     .add_node("detect", Detect)
///     .add_node("analyze", Analyze)
///     .add_edge("Start", "detect")
///     .add_conditional_edges("detect", by_struggle, [("active", "analyze"), ("none", "End")])
///     .add_edge("analyze", "End")
///     .compile()
///     .unwrap();
/// ```
pub struct GraphBuilder {
    nodes: FxHashMap<NodeKind, Arc<dyn Handler>>,
    edges: FxHashMap<NodeKind, Edge>,
    runtime_config: RuntimeConfig,
}

impl Default for GraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GraphBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: FxHashMap::default(),
            edges: FxHashMap::default(),
            runtime_config: RuntimeConfig::default(),
        }
    }

    /// Register a node. Last registration for a name wins.
    #[must_use]
    pub fn add_node(mut self, id: impl Into<NodeKind>, handler: impl Handler + 'static) -> Self {
        let id = id.into();
        match id {
            NodeKind::Start | NodeKind::End => {
                tracing::warn!(
                    ?id,
                    "ignoring registration of virtual node kind (Start/End are virtual)"
                );
            }
            _ => {
                self.nodes.insert(id, Arc::new(handler));
            }
        }
        self
    }

    /// Record a simple transition, replacing any prior edge for `from`.
    #[must_use]
    pub fn add_edge(mut self, from: impl Into<NodeKind>, to: impl Into<NodeKind>) -> Self {
        let from = from.into();
        if self.edges.contains_key(&from) {
            tracing::debug!(%from, "overwriting existing edge record");
        }
        self.edges.insert(from, Edge::Simple(to.into()));
        self
    }

    /// Record a data-dependent transition, replacing any prior edge for
    /// `from`. The condition runs on post-node state; its key is looked up
    /// in `routes`, defaulting to `End` when unmapped.
    #[must_use]
    pub fn add_conditional_edges<K, N>(
        mut self,
        from: impl Into<NodeKind>,
        condition: ConditionFn,
        routes: impl IntoIterator<Item = (K, N)>,
    ) -> Self
    where
        K: Into<String>,
        N: Into<NodeKind>,
    {
        let from = from.into();
        if self.edges.contains_key(&from) {
            tracing::debug!(%from, "overwriting existing edge record");
        }
        let routes: FxHashMap<String, NodeKind> = routes
            .into_iter()
            .map(|(k, n)| (k.into(), n.into()))
            .collect();
        self.edges
            .insert(from, Edge::Conditional(ConditionalEdge::new(condition, routes)));
        self
    }

    /// Configure runtime settings for the compiled graph.
    #[must_use]
    pub fn with_runtime_config(mut self, runtime_config: RuntimeConfig) -> Self {
        self.runtime_config = runtime_config;
        self
    }

    /// Validate registrations and produce an executable [`Graph`].
    pub fn compile(self) -> Result<Graph, ConfigurationError> {
        if self.nodes.is_empty() {
            return Err(ConfigurationError::EmptyGraph);
        }
        for (from, edge) in &self.edges {
            if let Edge::Conditional(ce) = edge
                && ce.is_empty()
            {
                return Err(ConfigurationError::EmptyRouteMap {
                    from: from.to_string(),
                });
            }
        }
        Ok(Graph::new(self.nodes, self.edges, self.runtime_config))
    }
}
