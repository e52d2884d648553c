//! Stage pipeline orchestration: a configuration-driven ordered list of named
//! stages plus an explicit state-machine executor.
//!
//! The executor knows nothing about stage logic; it sequences, isolates, and
//! records. Stage names are fixed by configuration so stages can be added or
//! removed without touching the executor.

pub mod checkpoint;
pub mod orchestrator;
pub mod stage;
pub mod stages;

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use checkpoint::{
    CheckpointStore, InMemoryCheckpointStore, RedisCheckpointStore, StageStatus, StageTiming,
    WorkflowCheckpoint, WorkflowStatus,
};
pub use orchestrator::{CancelFlag, Orchestrator, PipelineRun};
pub use stage::{FnStage, Stage, WorkflowState};

/// Canonical stage order for a full generation run.
pub const DEFAULT_STAGE_SEQUENCE: &[&str] = &[
    "extract",
    "merge",
    "enhance",
    "order_sections",
    "select_template",
    "render",
    "optimize",
    "persist",
];

/// Ordered stage names plus the per-stage timeout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub stages: Vec<String>,
    pub stage_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            stages: DEFAULT_STAGE_SEQUENCE
                .iter()
                .map(|name| name.to_string())
                .collect(),
            stage_timeout_secs: 120,
        }
    }
}

/// Maps stage names to implementations. The orchestrator is built by
/// resolving the config's ordered name list against this registry.
#[derive(Default)]
pub struct StageRegistry {
    stages: HashMap<String, Arc<dyn Stage>>,
}

impl StageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, stage: Arc<dyn Stage>) -> &mut Self {
        self.stages.insert(stage.name().to_string(), stage);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Stage>> {
        self.stages.get(name).cloned()
    }
}
