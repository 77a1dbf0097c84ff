//! Handler contract for workflow nodes.
//!
//! A node is a named processing step; its [`Handler`] receives the current
//! [`SessionState`] and returns the [`StateUpdate`] it wants merged back.
//! Handlers are supplied by other subsystems (misconception detector,
//! mastery updater, hint generator) — the engine only cares about this
//! contract.
//!
//! # Error Handling
//!
//! Expected, business-level failures ("no hint available") belong *in the
//! returned state*, e.g. via [`StateUpdate::with_outcome`] or an `extra`
//! field. Returning `Err(HandlerError)` is for truly exceptional conditions;
//! the engine catches it, records `error`/`error_node` into state, and routes
//! to the `ERROR` node if one is registered. A handler failure is never fatal
//! to `invoke`.
//!
//! # Examples
//!
//! ```rust
//! use tutorgraph::node::{Handler, HandlerError, NodeContext};
//! use tutorgraph::state::{SessionState, StateUpdate};
//! use async_trait::async_trait;
//!
//! struct MasteryUpdater;
//!
//! #[async_trait]
//! impl Handler for MasteryUpdater {
//!     async fn run(
//!         &self,
//!         state: SessionState,
//!         ctx: NodeContext,
//!     ) -> Result<StateUpdate, HandlerError> {
//!         let concept = state
//!             .concept_id
//!             .ok_or(HandlerError::MissingInput { what: "concept_id" })?;
//!         ctx.memory
//!             .put(&format!("mastery:{concept}"), serde_json::json!(0.7), Some("mastery"))
//!             .await?;
//!         Ok(StateUpdate::new().with_outcome("mastery-updated"))
//!     }
//! }
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use miette::Diagnostic;
use thiserror::Error;

use crate::memory::{MemoryError, MemoryStore};
use crate::state::{SessionState, StateUpdate};
use crate::types::NodeKind;

/// A single unit of computation within a workflow.
///
/// Handlers should be deterministic given their input state (they may await
/// asynchronous collaborators such as an LLM call) and must not assume
/// another handler's private fields.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Execute this node against the current state.
    async fn run(&self, state: SessionState, ctx: NodeContext)
    -> Result<StateUpdate, HandlerError>;
}

/// Execution context passed to handlers.
///
/// Carries the node's identity, the run it belongs to, and a handle to the
/// shared long-term [`MemoryStore`].
#[derive(Clone)]
pub struct NodeContext {
    /// The node being executed.
    pub node: NodeKind,
    /// Ordinal of this execution within the run (1-based).
    pub step: u32,
    /// The run this execution belongs to.
    pub thread_id: String,
    /// Long-term memory shared across threads.
    pub memory: Arc<dyn MemoryStore>,
}

impl std::fmt::Debug for NodeContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeContext")
            .field("node", &self.node)
            .field("step", &self.step)
            .field("thread_id", &self.thread_id)
            .finish()
    }
}

/// Exceptional failures raised by handlers.
///
/// These halt the current node, not the run: the engine records them into
/// state and continues through the error route.
#[derive(Debug, Error, Diagnostic)]
pub enum HandlerError {
    /// Expected input data is missing from the session state.
    #[error("missing expected input: {what}")]
    #[diagnostic(
        code(tutorgraph::node::missing_input),
        help("Check that an earlier node produced the required field.")
    )]
    MissingInput { what: &'static str },

    /// External provider or service error.
    #[error("provider error ({provider}): {message}")]
    #[diagnostic(code(tutorgraph::node::provider))]
    Provider {
        provider: &'static str,
        message: String,
    },

    /// JSON serialization/deserialization error.
    #[error(transparent)]
    #[diagnostic(code(tutorgraph::node::serde_json))]
    Serde(#[from] serde_json::Error),

    /// Input validation failed.
    #[error("validation failed: {0}")]
    #[diagnostic(
        code(tutorgraph::node::validation),
        help("Check input data format and required fields.")
    )]
    ValidationFailed(String),

    /// Long-term memory access failed.
    #[error(transparent)]
    #[diagnostic(code(tutorgraph::node::memory))]
    Memory(#[from] MemoryError),
}
