//! Core identifiers for the tutorgraph workflow model.
//!
//! A workflow graph is a set of named processing steps. [`NodeKind`] identifies
//! one step: the virtual `Start`/`End` endpoints or a named custom node. For
//! runtime execution types (thread ids, step counters), see
//! [`crate::runtimes`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a node within a workflow graph.
///
/// `Start` and `End` are virtual endpoints: they carry no handler, are never
/// registered, and exist only so edges can define where execution enters and
/// leaves the graph. Everything that runs is a `Custom` node.
///
/// Two custom node names are reserved by convention:
/// - [`NodeKind::ERROR`] — if a node with this name is registered, handler
///   failures route to it instead of `End`.
/// - [`NodeKind::ESCALATE`] — a fallback target for runs that need a human;
///   the engine never routes here on its own, it must be wired through a
///   conditional edge.
///
/// # Persistence
///
/// `NodeKind` supports serde plus a compact string form via
/// [`encode`](Self::encode)/[`decode`](Self::decode) for checkpoint rows.
///
/// # Examples
///
/// ```rust
/// use tutorgraph::types::NodeKind;
///
/// let greet = NodeKind::Custom("greet".to_string());
/// assert_eq!(greet.encode(), "Custom:greet");
/// assert_eq!(NodeKind::decode("Custom:greet"), greet);
/// assert_eq!(NodeKind::from("End"), NodeKind::End);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// Virtual entry point. Resolves its edge without executing a handler
    /// and without writing a checkpoint.
    Start,
    /// Virtual terminal. Reaching it ends the run.
    End,
    /// A named processing step with a registered handler.
    Custom(String),
}

impl NodeKind {
    /// Reserved name for the handler-failure recovery node.
    pub const ERROR: &'static str = "ERROR";
    /// Reserved name for the explicit human-escalation node.
    pub const ESCALATE: &'static str = "ESCALATE";

    /// The conventional failure-recovery node.
    #[must_use]
    pub fn error_handler() -> Self {
        NodeKind::Custom(Self::ERROR.to_string())
    }

    /// The conventional escalation node.
    #[must_use]
    pub fn escalate() -> Self {
        NodeKind::Custom(Self::ESCALATE.to_string())
    }

    /// Encode into the persisted string form.
    ///
    /// - `Start` → `"Start"`
    /// - `End` → `"End"`
    /// - `Custom("x")` → `"Custom:x"`
    #[must_use]
    pub fn encode(&self) -> String {
        match self {
            NodeKind::Start => "Start".to_string(),
            NodeKind::End => "End".to_string(),
            NodeKind::Custom(s) => format!("Custom:{s}"),
        }
    }

    /// Decode a persisted string form.
    ///
    /// Unrecognized formats fall back to `Custom(s)` so old rows keep
    /// round-tripping after format changes.
    pub fn decode(s: &str) -> Self {
        if s == "Start" {
            NodeKind::Start
        } else if s == "End" {
            NodeKind::End
        } else if let Some(rest) = s.strip_prefix("Custom:") {
            NodeKind::Custom(rest.to_string())
        } else {
            NodeKind::Custom(s.to_string())
        }
    }

    /// Returns `true` if this is the virtual [`Start`](Self::Start) node.
    #[must_use]
    pub fn is_start(&self) -> bool {
        matches!(self, Self::Start)
    }

    /// Returns `true` if this is the virtual [`End`](Self::End) node.
    #[must_use]
    pub fn is_end(&self) -> bool {
        matches!(self, Self::End)
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start => write!(f, "Start"),
            Self::End => write!(f, "End"),
            Self::Custom(name) => write!(f, "{name}"),
        }
    }
}

// Developer experience: allow string literals where a NodeKind is expected.
impl From<&str> for NodeKind {
    fn from(s: &str) -> Self {
        match s {
            "Start" => NodeKind::Start,
            "End" => NodeKind::End,
            other => NodeKind::Custom(other.to_string()),
        }
    }
}

impl From<String> for NodeKind {
    fn from(s: String) -> Self {
        NodeKind::from(s.as_str())
    }
}
