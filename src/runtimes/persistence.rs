/*!
Persistence primitives for serializing checkpoints (used by the SQLite
checkpointer and any future durable backends).

Design goals:
- Explicit serde-friendly shapes decoupled from the in-memory types.
- Conversion logic localized here (From / TryFrom impls) so backend code
  stays lean and declarative.
- Forward compatibility: unknown `NodeKind` encodings round-trip as
  `NodeKind::Custom(encoded_string)`.

This module performs no I/O.
*/

use serde::{Deserialize, Serialize};

use crate::runtimes::checkpointer::{Checkpoint, CheckpointMetadata};
use crate::state::SessionState;
use crate::types::NodeKind;
use crate::utils::timefmt::{encode_ts, parse_ts};

use miette::Diagnostic;
use thiserror::Error;

/// Full persisted checkpoint representation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersistedCheckpoint {
    pub id: String,
    pub thread_id: String,
    pub namespace: String,
    /// Encoded via `NodeKind::encode()`.
    pub node: String,
    pub step: u32,
    #[serde(default)]
    pub interrupted: bool,
    #[serde(default)]
    pub is_final: bool,
    /// Fixed-width RFC3339 string (keeps `chrono::DateTime` out of the
    /// serialized shape).
    pub created_at: String,
    pub state: SessionState,
}

/// Conversion and serialization errors for persistence models.
#[derive(Debug, Error, Diagnostic)]
pub enum PersistenceError {
    #[error("invalid persisted timestamp: {0}")]
    #[diagnostic(
        code(tutorgraph::persistence::timestamp),
        help("Checkpoint rows must carry fixed-width RFC3339 timestamps.")
    )]
    Timestamp(#[from] chrono::ParseError),

    #[error("JSON serialization/deserialization failed: {source}")]
    #[diagnostic(
        code(tutorgraph::persistence::serde),
        help("Ensure the JSON structure matches the Persisted* types.")
    )]
    Serde {
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, PersistenceError>;

impl From<&Checkpoint> for PersistedCheckpoint {
    fn from(cp: &Checkpoint) -> Self {
        PersistedCheckpoint {
            id: cp.id.clone(),
            thread_id: cp.thread_id.clone(),
            namespace: cp.metadata.namespace.clone(),
            node: cp.metadata.node.encode(),
            step: cp.metadata.step,
            interrupted: cp.metadata.interrupted,
            is_final: cp.metadata.is_final,
            created_at: encode_ts(cp.metadata.timestamp),
            state: cp.state.clone(),
        }
    }
}

impl TryFrom<PersistedCheckpoint> for Checkpoint {
    type Error = PersistenceError;

    fn try_from(p: PersistedCheckpoint) -> Result<Self> {
        let timestamp = parse_ts(&p.created_at)?;
        Ok(Checkpoint {
            id: p.id,
            thread_id: p.thread_id,
            state: p.state,
            metadata: CheckpointMetadata {
                node: NodeKind::decode(&p.node),
                step: p.step,
                timestamp,
                interrupted: p.interrupted,
                is_final: p.is_final,
                namespace: p.namespace,
            },
        })
    }
}

/// Serialize a session state for a JSON column.
pub fn state_to_json(state: &SessionState) -> Result<String> {
    serde_json::to_string(state).map_err(|source| PersistenceError::Serde { source })
}

/// Deserialize a session state from a JSON column.
pub fn state_from_json(json: &str) -> Result<SessionState> {
    serde_json::from_str(json).map_err(|source| PersistenceError::Serde { source })
}
