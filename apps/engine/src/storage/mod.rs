//! Persistence adapters: session profile snapshots and the S3 client.

pub mod sessions;

pub use sessions::{InMemorySessionStore, PgSessionStore, SessionStore};

use aws_config::Region;
use aws_sdk_s3::config::Credentials;

use crate::config::EngineConfig;

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
pub async fn build_s3_client(config: &EngineConfig) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "engine-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    aws_sdk_s3::Client::new(&s3_config)
}
