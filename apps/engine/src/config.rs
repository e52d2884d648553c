use anyhow::{Context, Result};

use crate::pipeline::DEFAULT_STAGE_SEQUENCE;

/// Engine configuration loaded from environment variables.
/// Fails at startup if required variables are missing; an unreachable
/// embedding backend is a configuration error, not a runtime surprise.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub database_url: String,
    pub redis_url: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub embedding_api_url: String,
    pub embedding_api_key: String,
    pub embedding_model: String,
    /// Minimum cosine similarity for experience-like comparison surfaces.
    pub experience_similarity_threshold: f32,
    /// Minimum cosine similarity for bare skill tokens. Higher than the
    /// experience threshold: distinct tools must not be conflated.
    pub skill_similarity_threshold: f32,
    pub stage_timeout_secs: u64,
    /// Ordered stage names for the pipeline, comma-separated in the env.
    pub pipeline_stages: Vec<String>,
    pub rust_log: String,
}

impl EngineConfig {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(EngineConfig {
            database_url: require_env("DATABASE_URL")?,
            redis_url: require_env("REDIS_URL")?,
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: require_env("S3_ENDPOINT")?,
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            embedding_api_url: require_env("EMBEDDING_API_URL")?,
            embedding_api_key: require_env("EMBEDDING_API_KEY")?,
            embedding_model: std::env::var("EMBEDDING_MODEL")
                .unwrap_or_else(|_| "voyage-3-lite".to_string()),
            experience_similarity_threshold: parse_env("EXPERIENCE_SIMILARITY_THRESHOLD", 0.85)?,
            skill_similarity_threshold: parse_env("SKILL_SIMILARITY_THRESHOLD", 0.90)?,
            stage_timeout_secs: parse_env("STAGE_TIMEOUT_SECS", 120)?,
            pipeline_stages: stage_list_from_env(),
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value")),
        Err(_) => Ok(default),
    }
}

fn stage_list_from_env() -> Vec<String> {
    match std::env::var("PIPELINE_STAGES") {
        Ok(raw) => raw
            .split(',')
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty())
            .collect(),
        Err(_) => DEFAULT_STAGE_SEQUENCE
            .iter()
            .map(|name| name.to_string())
            .collect(),
    }
}
