use std::sync::Arc;

use uuid::Uuid;

use crate::collaborators::{ContentEnhancer, DocumentRenderer, Extractor};
use crate::config::EngineConfig;
use crate::embedding::EmbeddingBackend;
use crate::errors::EngineError;
use crate::merge::{Fragment, MergeConfig, MergeManager, MergeReport};
use crate::pipeline::stages::{
    EnhanceStage, ExtractStage, MergeStage, OptimizeStage, OrderSectionsStage, PersistStage,
    RenderStage, SelectTemplateStage,
};
use crate::pipeline::{
    CancelFlag, CheckpointStore, Orchestrator, PipelineConfig, PipelineRun, StageRegistry,
    WorkflowState,
};
use crate::profile::Profile;
use crate::storage::SessionStore;

/// Shared engine state: every collaborator the merge and pipeline surfaces
/// need, explicitly constructed and injected. No module-level singletons;
/// construction-time wiring failures surface at startup, not mid-run.
#[derive(Clone)]
pub struct EngineState {
    pub config: EngineConfig,
    pub embedder: Arc<dyn EmbeddingBackend>,
    pub checkpoints: Arc<dyn CheckpointStore>,
    pub sessions: Arc<dyn SessionStore>,
    pub extractor: Arc<dyn Extractor>,
    pub enhancer: Arc<dyn ContentEnhancer>,
    pub renderer: Arc<dyn DocumentRenderer>,
}

impl EngineState {
    fn merge_config(&self) -> MergeConfig {
        MergeConfig {
            experience_threshold: self.config.experience_similarity_threshold,
            skill_threshold: self.config.skill_similarity_threshold,
        }
    }

    fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            stages: self.config.pipeline_stages.clone(),
            stage_timeout_secs: self.config.stage_timeout_secs,
        }
    }

    pub fn merge_manager(&self) -> MergeManager {
        MergeManager::new(self.embedder.clone(), self.merge_config())
    }

    /// Builds the canonical stage registry from the injected collaborators.
    pub fn stage_registry(&self) -> StageRegistry {
        let mut registry = StageRegistry::new();
        registry
            .register(Arc::new(ExtractStage::new(self.extractor.clone())))
            .register(Arc::new(MergeStage::new(self.merge_manager())))
            .register(Arc::new(EnhanceStage::new(self.enhancer.clone())))
            .register(Arc::new(OrderSectionsStage))
            .register(Arc::new(SelectTemplateStage))
            .register(Arc::new(RenderStage::new(self.renderer.clone())))
            .register(Arc::new(OptimizeStage::new(self.enhancer.clone())))
            .register(Arc::new(PersistStage::new(self.sessions.clone())));
        registry
    }

    fn orchestrator(&self) -> Result<Orchestrator, EngineError> {
        Orchestrator::from_config(
            &self.pipeline_config(),
            &self.stage_registry(),
            self.checkpoints.clone(),
        )
    }

    /// Merges extracted fragments into a session profile. Consumed by the
    /// session/chat layer after it calls the external extractor.
    pub async fn merge_fragments(&self, profile: Profile, fragments: &[Fragment]) -> MergeReport {
        self.merge_manager().merge(profile, fragments).await
    }

    /// Runs the configured pipeline over an initial workflow state. Distinct
    /// workflow ids may run concurrently; they share no mutable state.
    pub async fn run_pipeline(
        &self,
        workflow_id: Uuid,
        state: WorkflowState,
        cancel: &CancelFlag,
    ) -> Result<PipelineRun, EngineError> {
        self.orchestrator()?.run(workflow_id, state, cancel).await
    }

    /// Continues a checkpointed workflow from the first non-completed stage.
    pub async fn resume_pipeline(
        &self,
        workflow_id: Uuid,
        cancel: &CancelFlag,
    ) -> Result<PipelineRun, EngineError> {
        self.orchestrator()?.resume(workflow_id, cancel).await
    }
}
