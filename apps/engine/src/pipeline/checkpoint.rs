//! Workflow checkpoints: a persisted snapshot of pipeline progress enabling
//! resume from the first non-completed stage.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use redis::AsyncCommands;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::stage::WorkflowState;
use crate::errors::EngineError;
use crate::profile::Profile;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Success,
    Error,
}

/// Wall-clock record for one executed stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageTiming {
    pub stage: String,
    pub duration_ms: u64,
    pub status: StageStatus,
}

/// Owned and mutated only by the orchestrator. Persisted after every stage,
/// success or failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowCheckpoint {
    pub workflow_id: Uuid,
    pub status: WorkflowStatus,
    pub last_completed_stage: Option<String>,
    pub state: WorkflowState,
    pub timings: Vec<StageTiming>,
    pub errors: Vec<String>,
}

impl WorkflowCheckpoint {
    pub fn new(workflow_id: Uuid, state: WorkflowState) -> Self {
        Self {
            workflow_id,
            status: WorkflowStatus::Pending,
            last_completed_stage: None,
            state,
            timings: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// The profile as of the last persisted stage.
    pub fn profile(&self) -> &Profile {
        &self.state.profile
    }
}

/// Persists checkpoints keyed by workflow id.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    async fn save(&self, checkpoint: &WorkflowCheckpoint) -> Result<(), EngineError>;
    async fn load(&self, workflow_id: Uuid) -> Result<Option<WorkflowCheckpoint>, EngineError>;
}

/// In-process store for tests and single-node deployments.
#[derive(Default)]
pub struct InMemoryCheckpointStore {
    checkpoints: Mutex<HashMap<Uuid, WorkflowCheckpoint>>,
}

impl InMemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CheckpointStore for InMemoryCheckpointStore {
    async fn save(&self, checkpoint: &WorkflowCheckpoint) -> Result<(), EngineError> {
        let mut map = self
            .checkpoints
            .lock()
            .map_err(|_| EngineError::Storage("checkpoint lock poisoned".to_string()))?;
        map.insert(checkpoint.workflow_id, checkpoint.clone());
        Ok(())
    }

    async fn load(&self, workflow_id: Uuid) -> Result<Option<WorkflowCheckpoint>, EngineError> {
        let map = self
            .checkpoints
            .lock()
            .map_err(|_| EngineError::Storage("checkpoint lock poisoned".to_string()))?;
        Ok(map.get(&workflow_id).cloned())
    }
}

const REDIS_KEY_PREFIX: &str = "workflow:checkpoint:";

/// Redis-backed store: one JSON value per workflow key. Distinct workflow ids
/// never contend on a shared key.
pub struct RedisCheckpointStore {
    client: redis::Client,
}

impl RedisCheckpointStore {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }

    fn key(workflow_id: Uuid) -> String {
        format!("{REDIS_KEY_PREFIX}{workflow_id}")
    }
}

#[async_trait]
impl CheckpointStore for RedisCheckpointStore {
    async fn save(&self, checkpoint: &WorkflowCheckpoint) -> Result<(), EngineError> {
        let payload = serde_json::to_string(checkpoint)?;
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        conn.set::<_, _, ()>(Self::key(checkpoint.workflow_id), payload)
            .await?;
        Ok(())
    }

    async fn load(&self, workflow_id: Uuid) -> Result<Option<WorkflowCheckpoint>, EngineError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let payload: Option<String> = conn.get(Self::key(workflow_id)).await?;
        match payload {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }
}
