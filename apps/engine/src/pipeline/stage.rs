//! Stage abstraction and the state passed between stages.

use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::errors::EngineError;
use crate::merge::Fragment;
use crate::profile::Profile;

/// Everything a stage may read or rewrite. Passed by value between stages
/// (immutable-in, immutable-out); the orchestrator owns the only mutable
/// checkpoint reference, which rules out cross-stage aliasing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowState {
    pub session_id: Uuid,
    pub profile: Profile,
    /// Raw user input awaiting extraction. Drained by the extract stage.
    pub raw_inputs: Vec<String>,
    /// Structured fragments awaiting merge. Drained by the merge stage.
    pub fragments: Vec<Fragment>,
    /// Non-fatal problems accumulated across stages.
    pub warnings: Vec<String>,
    /// Free-form stage outputs (section order, render metadata).
    pub artifacts: Map<String, Value>,
}

impl WorkflowState {
    pub fn new(session_id: Uuid, profile: Profile) -> Self {
        Self {
            session_id,
            profile,
            raw_inputs: Vec::new(),
            fragments: Vec::new(),
            warnings: Vec::new(),
            artifacts: Map::new(),
        }
    }

    pub fn with_raw_inputs(mut self, raw_inputs: Vec<String>) -> Self {
        self.raw_inputs = raw_inputs;
        self
    }

    pub fn with_fragments(mut self, fragments: Vec<Fragment>) -> Self {
        self.fragments = fragments;
        self
    }
}

/// One named, ordered processing step. Stage logic belongs to the surrounding
/// application; the orchestrator only sequences, isolates, and records.
#[async_trait]
pub trait Stage: Send + Sync {
    fn name(&self) -> &str;
    async fn run(&self, state: WorkflowState) -> Result<WorkflowState, EngineError>;
}

type BoxedStageFn = Box<
    dyn Fn(WorkflowState) -> Pin<Box<dyn Future<Output = Result<WorkflowState, EngineError>> + Send>>
        + Send
        + Sync,
>;

/// Adapts a closure into a [`Stage`]. Used by tests and by callers wiring
/// one-off stages without a dedicated type.
pub struct FnStage {
    name: String,
    run: BoxedStageFn,
}

impl FnStage {
    pub fn new<F, Fut>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(WorkflowState) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<WorkflowState, EngineError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            run: Box::new(move |state| Box::pin(f(state))),
        }
    }
}

#[async_trait]
impl Stage for FnStage {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, state: WorkflowState) -> Result<WorkflowState, EngineError> {
        (self.run)(state).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fn_stage_wraps_a_closure() {
        let stage = FnStage::new("noop", |mut state: WorkflowState| async move {
            state.warnings.push("visited".to_string());
            Ok(state)
        });
        assert_eq!(stage.name(), "noop");

        let state = WorkflowState::new(Uuid::new_v4(), Profile::empty());
        let state = stage.run(state).await.unwrap();
        assert_eq!(state.warnings, vec!["visited".to_string()]);
    }

    #[test]
    fn test_workflow_state_round_trips_through_json() {
        let state = WorkflowState::new(Uuid::new_v4(), Profile::empty())
            .with_raw_inputs(vec!["I worked at Acme".to_string()]);
        let json = serde_json::to_string(&state).unwrap();
        let recovered: WorkflowState = serde_json::from_str(&json).unwrap();
        assert_eq!(recovered.session_id, state.session_id);
        assert_eq!(recovered.raw_inputs, state.raw_inputs);
    }
}
