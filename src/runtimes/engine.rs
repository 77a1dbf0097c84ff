/*!
GraphEngine: the driver loop that executes a compiled [`Graph`].

One engine owns the execution infrastructure a graph needs at runtime: a
[`Checkpointer`] for per-thread snapshots, a shared [`MemoryStore`] for
long-term knowledge, and the per-thread [`InterruptRegistry`]. The graph
itself stays immutable; many threads can be in flight on the same engine
concurrently.

## Driver loop

`invoke` walks the graph from `Start` (or a caller-chosen entry node):

1. Check for a pending interrupt at the node boundary; if present, persist
   an interrupted checkpoint and park until `resume` supplies an update.
2. Execute the current node's handler against a clone of the state and
   merge the returned [`StateUpdate`].
3. Persist one checkpoint per successfully executed node.
4. Follow the node's edge (fixed or conditional) to the next node.

Handler failures are recorded into state (`error`, `error_node`) and route
to the `ERROR` node when one is registered; they never make `invoke` return
`Err`. Only checkpoint storage failures do.
*/

use std::sync::Arc;

use chrono::Utc;
use miette::Diagnostic;
use serde_json::{Value, json};
use thiserror::Error;
use tracing::instrument;
use uuid::Uuid;

use super::checkpointer::{
    Checkpoint, CheckpointMetadata, Checkpointer, CheckpointerError, CheckpointerType,
    InMemoryCheckpointer,
};
use super::interrupts::{InterruptRegistry, PendingInterrupt};
use crate::graphs::{Edge, Graph};
use crate::memory::{InMemoryStore, MemoryStore};
use crate::node::NodeContext;
use crate::state::{SessionState, StateUpdate};
use crate::types::NodeKind;

/// Errors surfaced by engine entry points.
///
/// Handler failures are deliberately absent: they are recorded into session
/// state, not raised.
#[derive(Debug, Error, Diagnostic)]
pub enum EngineError {
    #[error("no run found for thread {thread_id}")]
    #[diagnostic(
        code(tutorgraph::runtime::not_found),
        help("Check the thread id, or that the run was started on this engine's backend.")
    )]
    NotFound { thread_id: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Checkpointer(#[from] CheckpointerError),
}

/// Per-call knobs for [`GraphEngine::invoke`].
#[derive(Clone, Debug, Default)]
pub struct InvokeOptions {
    /// Thread to run under; a fresh UUID is assigned when absent.
    pub thread_id: Option<String>,
    /// Entry node; defaults to the virtual `Start`.
    pub start_node: Option<NodeKind>,
    /// Restore the thread's latest checkpoint as the baseline state.
    pub resume: bool,
    /// Per-call override of the configured step cap.
    pub max_steps: Option<u32>,
}

impl InvokeOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_thread_id(mut self, thread_id: impl Into<String>) -> Self {
        self.thread_id = Some(thread_id.into());
        self
    }

    #[must_use]
    pub fn with_start_node(mut self, node: impl Into<NodeKind>) -> Self {
        self.start_node = Some(node.into());
        self
    }

    /// Continue from the thread's latest checkpoint instead of a fresh state.
    #[must_use]
    pub fn resuming(mut self) -> Self {
        self.resume = true;
        self
    }

    #[must_use]
    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = Some(max_steps);
        self
    }
}

/// Executes a compiled [`Graph`] with checkpointing, long-term memory, and
/// per-thread interrupt/resume.
pub struct GraphEngine {
    graph: Arc<Graph>,
    checkpointer: Arc<dyn Checkpointer>,
    memory: Arc<dyn MemoryStore>,
    interrupts: InterruptRegistry,
    namespace: String,
}

impl std::fmt::Debug for GraphEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphEngine")
            .field("namespace", &self.namespace)
            .field("graph", &self.graph)
            .finish()
    }
}

impl GraphEngine {
    /// Build an engine with the backends named in the graph's
    /// [`RuntimeConfig`](crate::runtimes::RuntimeConfig).
    ///
    /// The SQLite backend shares one connection pool between the
    /// checkpointer and the memory store.
    #[instrument(skip(graph), err)]
    pub async fn new(graph: Graph) -> Result<Self, EngineError> {
        let namespace = graph.runtime_config().namespace.clone();
        let (checkpointer, memory): (Arc<dyn Checkpointer>, Arc<dyn MemoryStore>) =
            match graph.runtime_config().checkpointer {
                CheckpointerType::InMemory => (
                    Arc::new(InMemoryCheckpointer::new()),
                    Arc::new(InMemoryStore::new(namespace.clone())),
                ),
                #[cfg(feature = "sqlite")]
                CheckpointerType::Sqlite => {
                    let url = resolve_sqlite_url(graph.runtime_config().sqlite_db_name.as_deref());
                    let checkpointer =
                        super::checkpointer_sqlite::SqliteCheckpointer::connect(&url).await?;
                    let memory = crate::memory::SqliteStore::with_pool(
                        namespace.clone(),
                        checkpointer.pool(),
                    );
                    (Arc::new(checkpointer), Arc::new(memory))
                }
            };
        Ok(Self {
            graph: Arc::new(graph),
            checkpointer,
            memory,
            interrupts: InterruptRegistry::new(),
            namespace,
        })
    }

    /// Build an engine over caller-supplied backends. Useful for tests and
    /// for sharing stores between engines.
    pub fn with_stores(
        graph: Graph,
        checkpointer: Arc<dyn Checkpointer>,
        memory: Arc<dyn MemoryStore>,
    ) -> Self {
        let namespace = graph.runtime_config().namespace.clone();
        Self {
            graph: Arc::new(graph),
            checkpointer,
            memory,
            interrupts: InterruptRegistry::new(),
            namespace,
        }
    }

    /// Derive a child engine for a nested workflow.
    ///
    /// The child shares this engine's checkpoint and memory backends but
    /// writes under the extended namespace `parent:name` and carries its own
    /// interrupt registry, so parent and child threads pause independently.
    pub fn create_subgraph(&self, name: &str, graph: Graph) -> GraphEngine {
        GraphEngine {
            graph: Arc::new(graph),
            checkpointer: Arc::clone(&self.checkpointer),
            memory: Arc::clone(&self.memory),
            interrupts: InterruptRegistry::new(),
            namespace: format!("{}:{name}", self.namespace),
        }
    }

    /// The long-term memory handle this engine passes to handlers.
    pub fn memory(&self) -> Arc<dyn MemoryStore> {
        Arc::clone(&self.memory)
    }

    /// The checkpoint backend, for history inspection.
    pub fn checkpointer(&self) -> Arc<dyn Checkpointer> {
        Arc::clone(&self.checkpointer)
    }

    /// Run the graph to completion (or suspension-and-resume, or the step
    /// cap) and return the final session state.
    ///
    /// `initial` is merged over the baseline state before the first node
    /// runs; with `options.resume` the baseline is the thread's latest
    /// checkpoint instead of a fresh record.
    ///
    /// Handler failures never surface here; inspect `state.error` /
    /// `state.error_node` instead. `Err` means checkpoint storage failed.
    #[instrument(skip(self, initial, options), fields(namespace = %self.namespace), err)]
    pub async fn invoke(
        &self,
        initial: StateUpdate,
        options: InvokeOptions,
    ) -> Result<SessionState, EngineError> {
        let thread_id = options
            .thread_id
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let mut state = if options.resume {
            match self.checkpointer.load_latest(&thread_id).await? {
                Some(checkpoint) => {
                    let mut state = checkpoint.state;
                    state.thread_id = thread_id.clone();
                    state
                }
                None => SessionState::new(&thread_id),
            }
        } else {
            SessionState::new(&thread_id)
        };
        state.apply(initial);

        let max_steps = options
            .max_steps
            .unwrap_or(self.graph.runtime_config().max_steps);
        let mut current = options.start_node.unwrap_or(NodeKind::Start);
        let mut step: u32 = 0;

        tracing::info!(thread = %thread_id, entry = %current, "starting run");

        while !current.is_end() {
            if let Some(pending) = self.interrupts.take_pending(&thread_id) {
                self.suspend(&thread_id, &mut state, &current, step, pending)
                    .await?;
                // resumed; re-evaluate the same node boundary
            }

            if current.is_start() {
                current = self.next_node(&current, &state);
                continue;
            }

            if step >= max_steps {
                tracing::warn!(
                    thread = %thread_id,
                    max_steps,
                    "step cap reached; terminating run"
                );
                break;
            }

            let Some(handler) = self.graph.nodes().get(&current) else {
                tracing::warn!(thread = %thread_id, node = %current, "no handler registered");
                state.apply(
                    StateUpdate::new()
                        .with_error(format!("no handler registered for node {current}"))
                        .with_error_node(current.to_string()),
                );
                current = NodeKind::End;
                continue;
            };

            step += 1;
            let ctx = NodeContext {
                node: current.clone(),
                step,
                thread_id: thread_id.clone(),
                memory: Arc::clone(&self.memory),
            };

            match handler.run(state.clone(), ctx).await {
                Ok(update) => {
                    state.apply(update);
                    state.iteration_count += 1;
                    self.save_checkpoint(&thread_id, &state, current.clone(), step, false, false)
                        .await?;
                    current = self.next_node(&current, &state);
                }
                Err(err) => {
                    tracing::warn!(
                        thread = %thread_id,
                        node = %current,
                        error = %err,
                        "handler failed; routing to recovery"
                    );
                    state.apply(
                        StateUpdate::new()
                            .with_error(err.to_string())
                            .with_error_node(current.to_string()),
                    );
                    let error_node = NodeKind::error_handler();
                    current = if current != error_node
                        && self.graph.nodes().contains_key(&error_node)
                    {
                        error_node
                    } else {
                        NodeKind::End
                    };
                }
            }
        }

        self.save_checkpoint(&thread_id, &state, NodeKind::End, step, false, true)
            .await?;
        tracing::info!(thread = %thread_id, steps = step, "run complete");
        Ok(state)
    }

    /// Flag a thread for interruption at its next node boundary.
    ///
    /// Interrupts are keyed per thread; other threads on this engine are
    /// unaffected. Interrupting a thread that is not running is harmless —
    /// the flag is simply consumed by its next invoke.
    #[instrument(skip(self, reason, pending_action))]
    pub fn interrupt(&self, thread_id: &str, reason: impl Into<String>, pending_action: Option<Value>) {
        self.interrupts.request(
            thread_id,
            PendingInterrupt {
                reason: reason.into(),
                pending_action,
            },
        );
    }

    /// Wake a suspended thread with the caller's update.
    ///
    /// Returns [`EngineError::NotFound`] when the thread is not suspended.
    #[instrument(skip(self, input), err)]
    pub fn resume(&self, thread_id: &str, input: StateUpdate) -> Result<(), EngineError> {
        if self.interrupts.resume(thread_id, input) {
            Ok(())
        } else {
            Err(EngineError::NotFound {
                thread_id: thread_id.to_string(),
            })
        }
    }

    /// Whether the thread is currently suspended awaiting [`resume`](Self::resume).
    pub fn is_interrupted(&self, thread_id: &str) -> bool {
        self.interrupts.is_suspended(thread_id)
    }

    /// The thread's latest checkpointed state.
    #[instrument(skip(self), err)]
    pub async fn get_state(&self, thread_id: &str) -> Result<SessionState, EngineError> {
        match self.checkpointer.load_latest(thread_id).await? {
            Some(checkpoint) => Ok(checkpoint.state),
            None => Err(EngineError::NotFound {
                thread_id: thread_id.to_string(),
            }),
        }
    }

    /// Apply an out-of-band update to a thread's latest state and persist
    /// the result as a new checkpoint.
    ///
    /// The prior checkpoint is untouched; history stays append-only.
    #[instrument(skip(self, update), err)]
    pub async fn update_state(
        &self,
        thread_id: &str,
        update: StateUpdate,
    ) -> Result<SessionState, EngineError> {
        let Some(checkpoint) = self.checkpointer.load_latest(thread_id).await? else {
            return Err(EngineError::NotFound {
                thread_id: thread_id.to_string(),
            });
        };
        let mut state = checkpoint.state;
        state.apply(update);
        self.save_checkpoint(
            thread_id,
            &state,
            checkpoint.metadata.node,
            checkpoint.metadata.step + 1,
            false,
            false,
        )
        .await?;
        Ok(state)
    }

    /// Persist the interrupted snapshot, park on the resume channel, and
    /// merge the resume payload once it arrives.
    async fn suspend(
        &self,
        thread_id: &str,
        state: &mut SessionState,
        current: &NodeKind,
        step: u32,
        pending: PendingInterrupt,
    ) -> Result<(), EngineError> {
        tracing::info!(thread = %thread_id, node = %current, reason = %pending.reason, "suspending run");
        state.extra.insert(
            "interrupt_reason".to_string(),
            json!(pending.reason),
        );
        if let Some(action) = pending.pending_action {
            state.extra.insert("pending_action".to_string(), action);
        }
        self.save_checkpoint(thread_id, state, current.clone(), step, true, false)
            .await?;

        let rx = self.interrupts.park(thread_id);
        match rx.await {
            Ok(update) => {
                state.apply(update);
                tracing::info!(thread = %thread_id, "resumed");
            }
            Err(_) => {
                // The sender was dropped without a resume (e.g. the thread
                // was re-parked elsewhere); continue with the state as-is.
                tracing::warn!(thread = %thread_id, "resume channel closed without input");
            }
        }
        Ok(())
    }

    async fn save_checkpoint(
        &self,
        thread_id: &str,
        state: &SessionState,
        node: NodeKind,
        step: u32,
        interrupted: bool,
        is_final: bool,
    ) -> Result<(), EngineError> {
        let metadata = CheckpointMetadata {
            node,
            step,
            timestamp: Utc::now(),
            interrupted,
            is_final,
            namespace: self.namespace.clone(),
        };
        self.checkpointer
            .save(Checkpoint::new(thread_id, state.clone(), metadata))
            .await?;
        Ok(())
    }

    /// Follow `from`'s edge; no edge means the run is over.
    fn next_node(&self, from: &NodeKind, state: &SessionState) -> NodeKind {
        match self.graph.edges().get(from) {
            Some(Edge::Simple(to)) => to.clone(),
            Some(Edge::Conditional(ce)) => ce.resolve(state),
            None => {
                tracing::debug!(node = %from, "no outgoing edge; ending run");
                NodeKind::End
            }
        }
    }
}

#[cfg(feature = "sqlite")]
fn resolve_sqlite_url(db_name: Option<&str>) -> String {
    dotenvy::dotenv().ok();
    if let Ok(url) = std::env::var("TUTORGRAPH_SQLITE_URL") {
        return url;
    }
    let name = db_name.unwrap_or("tutorgraph.db");
    format!("sqlite://{name}?mode=rwc")
}
