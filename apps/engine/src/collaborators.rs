//! Narrow interfaces to external collaborators.
//!
//! The engine consumes these; it never implements extraction, enhancement
//! wording, or document layout itself. Each is injected into
//! [`crate::state::EngineState`] as an `Arc<dyn ...>` so the session layer
//! decides which backend does the heavy lifting.

use async_trait::async_trait;

use crate::errors::EngineError;
use crate::merge::Fragment;
use crate::profile::Profile;

/// Turns raw user input (free text, chat turns, upload text) into
/// already-structured fragments awaiting merge.
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(&self, raw_input: &str) -> Result<Vec<Fragment>, EngineError>;
}

/// Rewrites free-text fields for tone and ATS quality. `enhance` runs early
/// in the pipeline over summaries and descriptions; `optimize` is the final
/// keyword pass after rendering decisions are made.
#[async_trait]
pub trait ContentEnhancer: Send + Sync {
    async fn enhance(&self, profile: Profile) -> Result<Profile, EngineError>;
    async fn optimize(&self, profile: Profile) -> Result<Profile, EngineError>;
}

/// Renders a profile into a document and returns the document URL.
#[async_trait]
pub trait DocumentRenderer: Send + Sync {
    async fn render(&self, profile: &Profile) -> Result<String, EngineError>;
}
