use thiserror::Error;

/// Application-level error taxonomy for the engine.
///
/// Fragment-shape problems surface as `Validation` and are recovered locally
/// by skip-and-warn. `BackendUnavailable` degrades merge classification to
/// exact-text comparison instead of aborting. `Stage` halts the current
/// pipeline run and is captured in the checkpoint rather than propagated.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Embedding backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Stage '{stage}' failed: {message}")]
    Stage { stage: String, message: String },

    #[error("No checkpoint found for workflow {0}")]
    ResumeNotFound(uuid::Uuid),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl EngineError {
    /// Folds any failure into a stage-scoped error for pipeline bookkeeping.
    pub fn for_stage(stage: &str, message: impl Into<String>) -> Self {
        EngineError::Stage {
            stage: stage.to_string(),
            message: message.into(),
        }
    }
}

impl From<crate::embedding::EmbeddingError> for EngineError {
    fn from(err: crate::embedding::EmbeddingError) -> Self {
        EngineError::BackendUnavailable(err.to_string())
    }
}
