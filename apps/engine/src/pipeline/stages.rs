//! Adapter stages binding the canonical sequence to collaborators.
//!
//! Extraction, enhancement, rendering, and persistence belong to external
//! collaborators and are wrapped here; section ordering and template
//! selection are cheap in-engine heuristics.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::stage::{Stage, WorkflowState};
use crate::collaborators::{ContentEnhancer, DocumentRenderer, Extractor};
use crate::errors::EngineError;
use crate::merge::MergeManager;
use crate::profile::recompute_completion;
use crate::storage::SessionStore;

/// Wraps the external extractor over the state's raw inputs.
pub struct ExtractStage {
    extractor: Arc<dyn Extractor>,
}

impl ExtractStage {
    pub fn new(extractor: Arc<dyn Extractor>) -> Self {
        Self { extractor }
    }
}

#[async_trait]
impl Stage for ExtractStage {
    fn name(&self) -> &str {
        "extract"
    }

    async fn run(&self, mut state: WorkflowState) -> Result<WorkflowState, EngineError> {
        let raw_inputs = std::mem::take(&mut state.raw_inputs);
        for raw in &raw_inputs {
            let mut fragments = self.extractor.extract(raw).await?;
            state.fragments.append(&mut fragments);
        }
        debug!("Extracted {} fragments", state.fragments.len());
        Ok(state)
    }
}

/// Drains pending fragments through the merge manager into the profile.
pub struct MergeStage {
    manager: MergeManager,
}

impl MergeStage {
    pub fn new(manager: MergeManager) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl Stage for MergeStage {
    fn name(&self) -> &str {
        "merge"
    }

    async fn run(&self, mut state: WorkflowState) -> Result<WorkflowState, EngineError> {
        let fragments = std::mem::take(&mut state.fragments);
        let report = self.manager.merge(state.profile, &fragments).await;
        state.profile = report.profile;
        state.warnings.extend(report.warnings);
        Ok(state)
    }
}

/// External content enhancer pass over free-text fields.
pub struct EnhanceStage {
    enhancer: Arc<dyn ContentEnhancer>,
}

impl EnhanceStage {
    pub fn new(enhancer: Arc<dyn ContentEnhancer>) -> Self {
        Self { enhancer }
    }
}

#[async_trait]
impl Stage for EnhanceStage {
    fn name(&self) -> &str {
        "enhance"
    }

    async fn run(&self, mut state: WorkflowState) -> Result<WorkflowState, EngineError> {
        state.profile = self.enhancer.enhance(state.profile).await?;
        Ok(state)
    }
}

/// Final ATS keyword pass, also owned by the enhancer collaborator.
pub struct OptimizeStage {
    enhancer: Arc<dyn ContentEnhancer>,
}

impl OptimizeStage {
    pub fn new(enhancer: Arc<dyn ContentEnhancer>) -> Self {
        Self { enhancer }
    }
}

#[async_trait]
impl Stage for OptimizeStage {
    fn name(&self) -> &str {
        "optimize"
    }

    async fn run(&self, mut state: WorkflowState) -> Result<WorkflowState, EngineError> {
        state.profile = self.enhancer.optimize(state.profile).await?;
        Ok(state)
    }
}

/// Preferred display order when every section has content.
const SECTION_ORDER: &[&str] = &[
    "summary",
    "experience",
    "projects",
    "education",
    "certifications",
    "skills",
    "languages",
];

/// Derives the display order of non-empty sections into the artifacts map.
/// Entry order inside a section is insertion order and is never re-sorted.
pub struct OrderSectionsStage;

#[async_trait]
impl Stage for OrderSectionsStage {
    fn name(&self) -> &str {
        "order_sections"
    }

    async fn run(&self, mut state: WorkflowState) -> Result<WorkflowState, EngineError> {
        let profile = &state.profile;
        let order: Vec<Value> = SECTION_ORDER
            .iter()
            .filter(|section| match **section {
                "summary" => !profile.summary.is_empty(),
                "experience" => !profile.experience.is_empty(),
                "projects" => !profile.projects.is_empty(),
                "education" => !profile.education.is_empty(),
                "certifications" => !profile.certifications.is_empty(),
                "skills" => !profile.skills.is_empty(),
                "languages" => !profile.languages.is_empty(),
                _ => false,
            })
            .map(|section| Value::String(section.to_string()))
            .collect();
        state
            .artifacts
            .insert("section_order".to_string(), Value::Array(order));
        Ok(state)
    }
}

/// Picks a template from section shape when no earlier choice exists. An
/// explicit earlier selection is respected.
pub struct SelectTemplateStage;

#[async_trait]
impl Stage for SelectTemplateStage {
    fn name(&self) -> &str {
        "select_template"
    }

    async fn run(&self, mut state: WorkflowState) -> Result<WorkflowState, EngineError> {
        if state.profile.selected_template.is_empty() {
            let template = if state.profile.experience.len() >= 3 {
                "professional"
            } else if state.profile.experience.is_empty() && !state.profile.education.is_empty() {
                "graduate"
            } else {
                "modern"
            };
            state.profile.selected_template = template.to_string();
            recompute_completion(&mut state.profile);
        }
        Ok(state)
    }
}

/// External renderer; stores the resulting document URL on the profile.
pub struct RenderStage {
    renderer: Arc<dyn DocumentRenderer>,
}

impl RenderStage {
    pub fn new(renderer: Arc<dyn DocumentRenderer>) -> Self {
        Self { renderer }
    }
}

#[async_trait]
impl Stage for RenderStage {
    fn name(&self) -> &str {
        "render"
    }

    async fn run(&self, mut state: WorkflowState) -> Result<WorkflowState, EngineError> {
        let url = self.renderer.render(&state.profile).await?;
        state.profile.generated_output_url = url;
        recompute_completion(&mut state.profile);
        Ok(state)
    }
}

/// Snapshots the profile through the session store.
pub struct PersistStage {
    sessions: Arc<dyn SessionStore>,
}

impl PersistStage {
    pub fn new(sessions: Arc<dyn SessionStore>) -> Self {
        Self { sessions }
    }
}

#[async_trait]
impl Stage for PersistStage {
    fn name(&self) -> &str {
        "persist"
    }

    async fn run(&self, state: WorkflowState) -> Result<WorkflowState, EngineError> {
        let revision = self.sessions.save(state.session_id, &state.profile).await?;
        debug!(
            "Persisted session {} profile at revision {}",
            state.session_id, revision
        );
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use uuid::Uuid;

    use super::*;
    use crate::embedding::testing::StubEmbedder;
    use crate::merge::{Fragment, MergeConfig};
    use crate::profile::{EducationEntry, ExperienceEntry, Profile};

    fn state_with_profile(profile: Profile) -> WorkflowState {
        WorkflowState::new(Uuid::new_v4(), profile)
    }

    #[tokio::test]
    async fn test_merge_stage_drains_fragments_into_profile() {
        let manager = MergeManager::new(Arc::new(StubEmbedder::new()), MergeConfig::default());
        let stage = MergeStage::new(manager);

        let state = state_with_profile(Profile::empty()).with_fragments(vec![Fragment::Skills {
            items: vec!["Rust".to_string()],
        }]);
        let state = stage.run(state).await.unwrap();

        assert!(state.fragments.is_empty());
        assert_eq!(state.profile.skills, vec!["Rust".to_string()]);
    }

    #[tokio::test]
    async fn test_order_sections_lists_only_non_empty_sections() {
        let mut profile = Profile::empty();
        profile.summary = "Engineer".to_string();
        profile.skills.push("Rust".to_string());

        let state = OrderSectionsStage
            .run(state_with_profile(profile))
            .await
            .unwrap();

        let order = state.artifacts.get("section_order").unwrap();
        assert_eq!(
            order,
            &serde_json::json!(["summary", "skills"]),
        );
    }

    #[tokio::test]
    async fn test_select_template_heuristic_and_respects_existing_choice() {
        let mut profile = Profile::empty();
        profile.education.push(EducationEntry::default());
        let state = SelectTemplateStage
            .run(state_with_profile(profile))
            .await
            .unwrap();
        assert_eq!(state.profile.selected_template, "graduate");
        assert!(state.profile.completion_status.template_selected);

        let mut profile = Profile::empty();
        for _ in 0..3 {
            profile.experience.push(ExperienceEntry::default());
        }
        let state = SelectTemplateStage
            .run(state_with_profile(profile))
            .await
            .unwrap();
        assert_eq!(state.profile.selected_template, "professional");

        let mut profile = Profile::empty();
        profile.selected_template = "compact".to_string();
        let state = SelectTemplateStage
            .run(state_with_profile(profile))
            .await
            .unwrap();
        assert_eq!(state.profile.selected_template, "compact");
    }
}
