//! # Tutorgraph: Graph-driven Tutoring Workflow Engine
//!
//! Tutorgraph executes tutoring workflows as graphs of named nodes with
//! per-thread checkpointing, interrupt/resume, and long-term memory shared
//! across sessions.
//!
//! ## Core Concepts
//!
//! - **Nodes**: Async [`Handler`](node::Handler)s that read the session
//!   state and return a partial [`StateUpdate`](state::StateUpdate)
//! - **State**: One [`SessionState`](state::SessionState) per run, merged
//!   field-by-field after every node
//! - **Graph**: Declarative workflow definition with conditional edges
//! - **Engine**: [`GraphEngine`](runtimes::GraphEngine) drives the graph,
//!   checkpointing after each node and honoring per-thread interrupts
//! - **Memory**: A [`MemoryStore`](memory::MemoryStore) of durable,
//!   relevance-ranked knowledge that outlives any single run
//!
//! ## Quick Start
//!
//! ```
//! use tutorgraph::{
//!     graphs::GraphBuilder,
//!     node::{Handler, HandlerError, NodeContext},
//!     runtimes::{GraphEngine, InvokeOptions},
//!     state::{SessionState, StateUpdate},
//! };
//! use async_trait::async_trait;
//!
//! struct Greet;
//!
//! #[async_trait]
//! impl Handler for Greet {
//!     async fn run(
//!         &self,
//!         _state: SessionState,
//!         _ctx: NodeContext,
//!     ) -> Result<StateUpdate, HandlerError> {
//!         Ok(StateUpdate::new().with_outcome("greeted"))
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let graph = GraphBuilder::new()
//!     .add_node("greet", Greet)
//!     .add_edge("Start", "greet")
//!     .add_edge("greet", "End")
//!     .compile()?;
//!
//! let engine = GraphEngine::new(graph).await?;
//! let state = engine
//!     .invoke(StateUpdate::new(), InvokeOptions::new().with_thread_id("demo"))
//!     .await?;
//! assert_eq!(state.outcome.as_deref(), Some("greeted"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Guide
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`types`] | Node identifiers ([`NodeKind`](types::NodeKind)) |
//! | [`state`] | Session state and the explicit merge |
//! | [`node`] | Handler trait and execution context |
//! | [`graphs`] | Graph construction and compilation |
//! | [`runtimes`] | Engine, checkpointing, interrupts |
//! | [`memory`] | Long-term relevance-ranked memory |
//! | [`telemetry`] | Tracing subscriber setup |

pub mod graphs;
pub mod memory;
pub mod node;
pub mod runtimes;
pub mod state;
pub mod telemetry;
pub mod types;
pub mod utils;
