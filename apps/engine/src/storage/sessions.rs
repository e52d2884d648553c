//! Session profile snapshots.
//!
//! The Postgres store is append-only: every save INSERTs a new revision and
//! uploads a JSON snapshot to S3, so any historical profile state can be
//! recovered. Loads return the latest revision, migrated before anything
//! else touches it.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::errors::EngineError;
use crate::profile::{migrate, Profile};

/// Stores and loads profile snapshots by session id.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn save(&self, session_id: Uuid, profile: &Profile) -> Result<i32, EngineError>;
    async fn load(&self, session_id: Uuid) -> Result<Option<Profile>, EngineError>;
}

/// Append-only Postgres store with an S3 JSON snapshot per revision.
/// CRITICAL: never UPDATE existing rows.
pub struct PgSessionStore {
    pool: PgPool,
    s3: aws_sdk_s3::Client,
    bucket: String,
}

impl PgSessionStore {
    pub fn new(pool: PgPool, s3: aws_sdk_s3::Client, bucket: String) -> Self {
        Self { pool, s3, bucket }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn save(&self, session_id: Uuid, profile: &Profile) -> Result<i32, EngineError> {
        let payload = serde_json::to_value(profile)?;

        let current_max: Option<i32> =
            sqlx::query_scalar("SELECT MAX(revision) FROM profile_snapshots WHERE session_id = $1")
                .bind(session_id)
                .fetch_one(&self.pool)
                .await?;
        let revision = current_max.unwrap_or(0) + 1;

        sqlx::query(
            r#"
            INSERT INTO profile_snapshots (session_id, revision, profile)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(session_id)
        .bind(revision)
        .bind(&payload)
        .execute(&self.pool)
        .await?;

        let s3_key = format!("profiles/{}/v{}.json", session_id, revision);
        let body = serde_json::to_vec(&payload)?;
        self.s3
            .put_object()
            .bucket(&self.bucket)
            .key(&s3_key)
            .body(ByteStream::from(body))
            .content_type("application/json")
            .send()
            .await
            .map_err(|e| EngineError::Storage(format!("S3 upload failed: {e}")))?;

        info!(
            "Persisted session {session_id} profile at revision {revision} (s3://{}/{s3_key})",
            self.bucket
        );
        Ok(revision)
    }

    async fn load(&self, session_id: Uuid) -> Result<Option<Profile>, EngineError> {
        let row: Option<serde_json::Value> = sqlx::query_scalar(
            r#"
            SELECT profile FROM profile_snapshots
            WHERE session_id = $1
            ORDER BY revision DESC
            LIMIT 1
            "#,
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;

        // Snapshots written at any schema age are migrated before use.
        Ok(row.map(|raw| migrate(&raw)))
    }
}

/// In-process store for tests and ephemeral sessions.
#[derive(Default)]
pub struct InMemorySessionStore {
    profiles: Mutex<HashMap<Uuid, Vec<Profile>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn save(&self, session_id: Uuid, profile: &Profile) -> Result<i32, EngineError> {
        let mut map = self
            .profiles
            .lock()
            .map_err(|_| EngineError::Storage("session lock poisoned".to_string()))?;
        let revisions = map.entry(session_id).or_default();
        revisions.push(profile.clone());
        Ok(revisions.len() as i32)
    }

    async fn load(&self, session_id: Uuid) -> Result<Option<Profile>, EngineError> {
        let map = self
            .profiles
            .lock()
            .map_err(|_| EngineError::Storage("session lock poisoned".to_string()))?;
        Ok(map
            .get(&session_id)
            .and_then(|revisions| revisions.last().cloned()))
    }
}
