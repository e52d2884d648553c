//! The state-machine executor: strictly sequential stages with timing, error
//! capture, a per-stage timeout, cancellation at stage boundaries, and a
//! checkpoint persisted after every stage.
//!
//! The orchestrator never retries; retry is a property individual stages may
//! implement internally (the embedding client does, for transient backend
//! failures).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::timeout;
use tracing::{info, warn};
use uuid::Uuid;

use super::checkpoint::{
    CheckpointStore, StageStatus, StageTiming, WorkflowCheckpoint, WorkflowStatus,
};
use super::stage::{Stage, WorkflowState};
use super::{PipelineConfig, StageRegistry};
use crate::errors::EngineError;
use crate::profile::Profile;

/// Cooperative cancellation, observed at stage boundaries only; a stage that
/// is already running finishes before the flag takes effect. Cancellation
/// after stage N leaves the checkpoint at stage N, resumable later.
#[derive(Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// What a pipeline invocation hands back to the caller. A stage failure is
/// reported as `status == Failed`, never as an `Err`; the profile always
/// reflects every stage that did succeed.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub status: WorkflowStatus,
    pub profile: Profile,
    pub checkpoint: WorkflowCheckpoint,
}

pub struct Orchestrator {
    stages: Vec<Arc<dyn Stage>>,
    checkpoints: Arc<dyn CheckpointStore>,
    stage_timeout: Duration,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("stages", &self.stages.iter().map(|s| s.name()).collect::<Vec<_>>())
            .field("stage_timeout", &self.stage_timeout)
            .finish()
    }
}

impl Orchestrator {
    pub fn new(
        stages: Vec<Arc<dyn Stage>>,
        checkpoints: Arc<dyn CheckpointStore>,
        stage_timeout: Duration,
    ) -> Self {
        Self {
            stages,
            checkpoints,
            stage_timeout,
        }
    }

    /// Resolves the config's ordered stage names against the registry. An
    /// unknown name is a wiring error, caught at construction time.
    pub fn from_config(
        config: &PipelineConfig,
        registry: &StageRegistry,
        checkpoints: Arc<dyn CheckpointStore>,
    ) -> Result<Self, EngineError> {
        let mut stages = Vec::with_capacity(config.stages.len());
        for name in &config.stages {
            let stage = registry.get(name).ok_or_else(|| {
                EngineError::Validation(format!("unknown pipeline stage '{name}'"))
            })?;
            stages.push(stage);
        }
        Ok(Self::new(
            stages,
            checkpoints,
            Duration::from_secs(config.stage_timeout_secs),
        ))
    }

    /// Starts a fresh workflow run from the first stage.
    pub async fn run(
        &self,
        workflow_id: Uuid,
        state: WorkflowState,
        cancel: &CancelFlag,
    ) -> Result<PipelineRun, EngineError> {
        let checkpoint = WorkflowCheckpoint::new(workflow_id, state);
        self.execute(checkpoint, 0, cancel).await
    }

    /// Continues a checkpointed workflow from the first non-completed stage.
    /// Stages before the checkpoint are not re-invoked.
    pub async fn resume(
        &self,
        workflow_id: Uuid,
        cancel: &CancelFlag,
    ) -> Result<PipelineRun, EngineError> {
        let checkpoint = self
            .checkpoints
            .load(workflow_id)
            .await?
            .ok_or(EngineError::ResumeNotFound(workflow_id))?;

        let start = match &checkpoint.last_completed_stage {
            Some(name) => self
                .stages
                .iter()
                .position(|s| s.name() == name)
                .map(|i| i + 1)
                .ok_or_else(|| {
                    EngineError::Validation(format!(
                        "checkpoint for workflow {workflow_id} references unknown stage '{name}'"
                    ))
                })?,
            None => 0,
        };

        info!("Resuming workflow {workflow_id} from stage index {start}");
        self.execute(checkpoint, start, cancel).await
    }

    async fn execute(
        &self,
        mut checkpoint: WorkflowCheckpoint,
        start: usize,
        cancel: &CancelFlag,
    ) -> Result<PipelineRun, EngineError> {
        checkpoint.status = WorkflowStatus::Running;

        for stage in self.stages.iter().skip(start) {
            if cancel.is_cancelled() {
                info!(
                    "Workflow {} cancelled before stage '{}'",
                    checkpoint.workflow_id,
                    stage.name()
                );
                checkpoint.status = WorkflowStatus::Cancelled;
                self.checkpoints.save(&checkpoint).await?;
                return Ok(Self::finish(checkpoint));
            }

            let started = Instant::now();
            let outcome = timeout(self.stage_timeout, stage.run(checkpoint.state.clone())).await;
            let duration_ms = started.elapsed().as_millis() as u64;

            match outcome {
                Ok(Ok(next_state)) => {
                    info!(
                        "Stage '{}' completed in {}ms (workflow {})",
                        stage.name(),
                        duration_ms,
                        checkpoint.workflow_id
                    );
                    checkpoint.state = next_state;
                    checkpoint.last_completed_stage = Some(stage.name().to_string());
                    checkpoint.timings.push(StageTiming {
                        stage: stage.name().to_string(),
                        duration_ms,
                        status: StageStatus::Success,
                    });
                    self.checkpoints.save(&checkpoint).await?;
                }
                Ok(Err(error)) => {
                    return self
                        .fail(checkpoint, stage.name(), duration_ms, error.to_string())
                        .await;
                }
                Err(_) => {
                    let message = format!("timed out after {}s", self.stage_timeout.as_secs());
                    return self.fail(checkpoint, stage.name(), duration_ms, message).await;
                }
            }
        }

        checkpoint.status = WorkflowStatus::Completed;
        self.checkpoints.save(&checkpoint).await?;
        Ok(Self::finish(checkpoint))
    }

    /// Records a stage failure and stops the pipeline. No stage runs after a
    /// failure; the profile committed by prior successful stages is
    /// preserved, not rolled back.
    async fn fail(
        &self,
        mut checkpoint: WorkflowCheckpoint,
        stage: &str,
        duration_ms: u64,
        message: String,
    ) -> Result<PipelineRun, EngineError> {
        warn!(
            "Stage '{}' failed for workflow {}: {}",
            stage, checkpoint.workflow_id, message
        );
        checkpoint.timings.push(StageTiming {
            stage: stage.to_string(),
            duration_ms,
            status: StageStatus::Error,
        });
        checkpoint.errors.push(format!("{stage}: {message}"));
        checkpoint.status = WorkflowStatus::Failed;
        self.checkpoints.save(&checkpoint).await?;
        Ok(Self::finish(checkpoint))
    }

    fn finish(checkpoint: WorkflowCheckpoint) -> PipelineRun {
        PipelineRun {
            status: checkpoint.status,
            profile: checkpoint.state.profile.clone(),
            checkpoint,
        }
    }
}
