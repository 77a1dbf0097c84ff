//! Edge model and routing conditions.
//!
//! Each source node has at most one edge record: either a fixed target or a
//! conditional route evaluated on post-node state. Re-registering an edge for
//! a source overwrites the previous record.

use rustc_hash::FxHashMap;
use std::sync::Arc;

use crate::state::SessionState;
use crate::types::NodeKind;

/// Condition function for data-dependent routing.
///
/// Evaluated on the state *after* the source node ran; returns a route key
/// looked up in the edge's route map. Must be deterministic given state.
/// Keys absent from the route map fall back to `End`.
///
/// # Examples
///
/// ```rust
/// use tutorgraph::graphs::ConditionFn;
/// use std::sync::Arc;
///
/// let by_struggle: ConditionFn = Arc::new(|state| {
///     state
///         .struggle_level
///         .clone()
///         .unwrap_or_else(|| "none".to_string())
/// });
/// ```
pub type ConditionFn = Arc<dyn Fn(&SessionState) -> String + Send + Sync + 'static>;

/// Transition rule from one node to the next.
#[derive(Clone)]
pub enum Edge {
    /// Unconditional transition to a fixed target.
    Simple(NodeKind),
    /// Data-dependent transition.
    Conditional(ConditionalEdge),
}

impl std::fmt::Debug for Edge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Edge::Simple(to) => f.debug_tuple("Simple").field(to).finish(),
            Edge::Conditional(ce) => f
                .debug_struct("Conditional")
                .field("routes", &ce.routes)
                .finish(),
        }
    }
}

/// A conditional edge: condition function plus route map.
#[derive(Clone)]
pub struct ConditionalEdge {
    condition: ConditionFn,
    routes: FxHashMap<String, NodeKind>,
}

impl ConditionalEdge {
    pub fn new(condition: ConditionFn, routes: FxHashMap<String, NodeKind>) -> Self {
        Self { condition, routes }
    }

    /// Returns `true` if the route map has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Evaluate the condition and look up the target.
    ///
    /// An unmapped route key is not an error: it routes to `End` and is
    /// surfaced to operators through the warning below.
    pub fn resolve(&self, state: &SessionState) -> NodeKind {
        let key = (self.condition)(state);
        match self.routes.get(&key) {
            Some(target) => target.clone(),
            None => {
                tracing::warn!(
                    route_key = %key,
                    thread = %state.thread_id,
                    "route key not in route map; falling back to End"
                );
                NodeKind::End
            }
        }
    }
}
