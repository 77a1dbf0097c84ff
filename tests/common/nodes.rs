//! Reusable test handlers.

use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;

use tutorgraph::node::{Handler, HandlerError, NodeContext};
use tutorgraph::state::{SessionState, StateUpdate};

/// Sets a greeting outcome; the simplest possible node.
pub struct GreetNode;

#[async_trait]
impl Handler for GreetNode {
    async fn run(
        &self,
        _state: SessionState,
        _ctx: NodeContext,
    ) -> Result<StateUpdate, HandlerError> {
        Ok(StateUpdate::new()
            .with_outcome("greeted")
            .with_extra("greeting", json!("hello")))
    }
}

/// Classifies struggle from the `signals` count in `extra`.
pub struct StruggleDetector;

#[async_trait]
impl Handler for StruggleDetector {
    async fn run(
        &self,
        state: SessionState,
        _ctx: NodeContext,
    ) -> Result<StateUpdate, HandlerError> {
        let signals = state
            .extra
            .get("signals")
            .and_then(|v| v.as_u64())
            .unwrap_or(0);
        let level = if signals >= 3 { "active" } else { "none" };
        Ok(StateUpdate::new().with_struggle_level(level))
    }
}

/// Picks an intervention style; stands in for the real analyzer.
pub struct InterventionPicker;

#[async_trait]
impl Handler for InterventionPicker {
    async fn run(
        &self,
        _state: SessionState,
        _ctx: NodeContext,
    ) -> Result<StateUpdate, HandlerError> {
        Ok(StateUpdate::new().with_intervention_style("worked-example"))
    }
}

/// Always fails with a provider error.
pub struct FailingNode;

#[async_trait]
impl Handler for FailingNode {
    async fn run(
        &self,
        _state: SessionState,
        _ctx: NodeContext,
    ) -> Result<StateUpdate, HandlerError> {
        Err(HandlerError::Provider {
            provider: "test-llm",
            message: "simulated outage".to_string(),
        })
    }
}

/// Recovery node registered under the reserved `ERROR` name.
pub struct RecoveryNode;

#[async_trait]
impl Handler for RecoveryNode {
    async fn run(
        &self,
        _state: SessionState,
        _ctx: NodeContext,
    ) -> Result<StateUpdate, HandlerError> {
        Ok(StateUpdate::new().with_outcome("recovered"))
    }
}

/// Never terminates on its own; used to exercise the step cap.
pub struct LoopNode;

#[async_trait]
impl Handler for LoopNode {
    async fn run(
        &self,
        state: SessionState,
        _ctx: NodeContext,
    ) -> Result<StateUpdate, HandlerError> {
        let spins = state
            .extra
            .get("spins")
            .and_then(|v| v.as_u64())
            .unwrap_or(0);
        Ok(StateUpdate::new().with_extra("spins", json!(spins + 1)))
    }
}

/// Sleeps long enough for an interrupt to land at the next node boundary.
pub struct SlowNode {
    pub label: &'static str,
    pub delay: Duration,
}

impl SlowNode {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            delay: Duration::from_millis(200),
        }
    }
}

#[async_trait]
impl Handler for SlowNode {
    async fn run(
        &self,
        _state: SessionState,
        _ctx: NodeContext,
    ) -> Result<StateUpdate, HandlerError> {
        tokio::time::sleep(self.delay).await;
        Ok(StateUpdate::new().with_extra(self.label, json!(true)))
    }
}

/// Writes what it sees to long-term memory.
pub struct MemoryWriter;

#[async_trait]
impl Handler for MemoryWriter {
    async fn run(
        &self,
        state: SessionState,
        ctx: NodeContext,
    ) -> Result<StateUpdate, HandlerError> {
        let concept = state
            .concept_id
            .ok_or(HandlerError::MissingInput { what: "concept_id" })?;
        ctx.memory
            .put(
                &format!("seen:{concept}"),
                json!({ "thread": ctx.thread_id }),
                Some("observation"),
            )
            .await?;
        Ok(StateUpdate::new().with_outcome("remembered"))
    }
}
