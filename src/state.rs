//! Session state and the explicit field-merge that threads it through a run.
//!
//! One run of the graph works on a single [`SessionState`] record. The fields
//! the tutoring workflow always carries (concept, struggle level, chosen
//! intervention style, outcome, iteration count) are tagged struct fields;
//! anything genuinely dynamic — mined patterns, scraped page context,
//! heuristic scores — lives in the `extra` side-channel map.
//!
//! Handlers never mutate state directly. They return a [`StateUpdate`] and the
//! engine applies it with [`SessionState::apply`], the one documented merge:
//! `Some` fields win, `extra` entries are inserted key by key, everything the
//! handler did not touch survives. No handler may assume another handler's
//! private fields.
//!
//! # Examples
//!
//! ```rust
//! use tutorgraph::state::{SessionState, StateUpdate};
//! use serde_json::json;
//!
//! let mut state = SessionState::new("thread-1");
//! state.apply(
//!     StateUpdate::new()
//!         .with_struggle_level("active")
//!         .with_extra("hint_count", json!(2)),
//! );
//! assert_eq!(state.struggle_level.as_deref(), Some("active"));
//! assert_eq!(state.extra.get("hint_count"), Some(&json!(2)));
//! ```

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The evolving context of one learner session.
///
/// Constructed by the engine from the default baseline plus the caller's
/// initial update, then threaded through every node of the run. Checkpoints
/// store deep copies of this record.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    /// Opaque id of the run; also the checkpoint namespace key.
    pub thread_id: String,
    /// The concept the learner is currently working on.
    pub concept_id: Option<String>,
    /// Detected struggle level (e.g. `"none"`, `"active"`).
    pub struggle_level: Option<String>,
    /// Intervention style chosen for this learner.
    pub intervention_style: Option<String>,
    /// Outcome of the latest intervention, once known.
    pub outcome: Option<String>,
    /// Number of nodes executed so far in this run; bumped by the engine.
    pub iteration_count: u32,
    /// Message of the most recent handler failure, if any.
    pub error: Option<String>,
    /// Name of the node that produced [`error`](Self::error).
    pub error_node: Option<String>,
    /// Side-channel for dynamic fields the tagged set does not cover.
    #[serde(default)]
    pub extra: FxHashMap<String, Value>,
}

impl SessionState {
    /// The default baseline every run starts from: empty tagged fields,
    /// iteration count zero, empty `extra`.
    pub fn new(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: thread_id.into(),
            ..Default::default()
        }
    }

    /// Merge an update over this state, last writer wins per field.
    ///
    /// `Some` fields replace the current value; `None` fields are left
    /// untouched. `extra` entries are inserted individually, so an update
    /// carrying one key never clears the others.
    pub fn apply(&mut self, update: StateUpdate) {
        if let Some(v) = update.concept_id {
            self.concept_id = Some(v);
        }
        if let Some(v) = update.struggle_level {
            self.struggle_level = Some(v);
        }
        if let Some(v) = update.intervention_style {
            self.intervention_style = Some(v);
        }
        if let Some(v) = update.outcome {
            self.outcome = Some(v);
        }
        if let Some(v) = update.iteration_count {
            self.iteration_count = v;
        }
        if let Some(v) = update.error {
            self.error = Some(v);
        }
        if let Some(v) = update.error_node {
            self.error_node = Some(v);
        }
        if let Some(extra) = update.extra {
            for (k, v) in extra {
                self.extra.insert(k, v);
            }
        }
    }
}

/// Partial state update returned by handlers (and accepted by `invoke`,
/// `resume`, and `update_state`).
///
/// All fields are optional so a handler only states what it changed.
///
/// # Examples
///
/// ```rust
/// use tutorgraph::state::StateUpdate;
/// use serde_json::json;
///
/// let update = StateUpdate::new()
///     .with_intervention_style("worked-example")
///     .with_outcome("resolved")
///     .with_extra("hint", json!("try factoring first"));
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StateUpdate {
    pub concept_id: Option<String>,
    pub struggle_level: Option<String>,
    pub intervention_style: Option<String>,
    pub outcome: Option<String>,
    pub iteration_count: Option<u32>,
    pub error: Option<String>,
    pub error_node: Option<String>,
    pub extra: Option<FxHashMap<String, Value>>,
}

impl StateUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_concept_id(mut self, concept_id: impl Into<String>) -> Self {
        self.concept_id = Some(concept_id.into());
        self
    }

    #[must_use]
    pub fn with_struggle_level(mut self, level: impl Into<String>) -> Self {
        self.struggle_level = Some(level.into());
        self
    }

    #[must_use]
    pub fn with_intervention_style(mut self, style: impl Into<String>) -> Self {
        self.intervention_style = Some(style.into());
        self
    }

    #[must_use]
    pub fn with_outcome(mut self, outcome: impl Into<String>) -> Self {
        self.outcome = Some(outcome.into());
        self
    }

    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    #[must_use]
    pub fn with_error_node(mut self, node: impl Into<String>) -> Self {
        self.error_node = Some(node.into());
        self
    }

    /// Add one `extra` entry, keeping any already staged.
    #[must_use]
    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra
            .get_or_insert_with(FxHashMap::default)
            .insert(key.into(), value);
        self
    }
}
