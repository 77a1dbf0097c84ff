//! Workflow graph definition and compilation.
//!
//! [`GraphBuilder`] collects named nodes and their transitions; `compile()`
//! freezes them into a [`Graph`] that the runtime drives. Edges are either
//! fixed ([`Edge::Simple`]) or routed by a [`ConditionFn`] over post-node
//! state ([`Edge::Conditional`]).

mod builder;
mod compilation;
mod edges;

pub use builder::{ConfigurationError, GraphBuilder};
pub use compilation::Graph;
pub use edges::{ConditionFn, ConditionalEdge, Edge};
