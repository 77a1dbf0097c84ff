//! Runtime execution: the engine driver loop, checkpoint persistence, and
//! per-thread interrupt/resume.
//!
//! - [`GraphEngine`] drives a compiled graph, one [`SessionState`] per
//!   thread, checkpointing after every executed node.
//! - [`Checkpointer`] is the pluggable snapshot store
//!   ([`InMemoryCheckpointer`] by default, [`SqliteCheckpointer`] behind the
//!   `sqlite` feature).
//! - [`InterruptRegistry`] keys interrupts by `thread_id` so pausing one run
//!   never disturbs another.
//!
//! [`SessionState`]: crate::state::SessionState

mod checkpointer;
#[cfg(feature = "sqlite")]
mod checkpointer_sqlite;
mod engine;
mod interrupts;
pub mod persistence;
mod runtime_config;

pub use checkpointer::{
    Checkpoint, CheckpointMetadata, CheckpointSummary, Checkpointer, CheckpointerError,
    CheckpointerType, InMemoryCheckpointer,
};
#[cfg(feature = "sqlite")]
pub use checkpointer_sqlite::SqliteCheckpointer;
pub use engine::{EngineError, GraphEngine, InvokeOptions};
pub use interrupts::{InterruptRegistry, PendingInterrupt};
pub use runtime_config::{DEFAULT_MAX_STEPS, RuntimeConfig};
