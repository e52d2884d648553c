//! Canonical Profile Store: the versioned per-session data structure, its
//! completion bookkeeping, and load-time migration.
//!
//! Knows nothing about similarity or pipelines. Profiles are mutated
//! exclusively through the merge manager; direct field assignment elsewhere
//! is a bug.

pub mod completeness;
pub mod migrate;
pub mod model;

pub use completeness::{completion_percentage, recompute_completion};
pub use migrate::{migrate, validate};
pub use model::{
    CertificationEntry, CompletionStatus, EducationEntry, ExperienceEntry, LanguageEntry,
    PersonalInfo, Profile, ProjectEntry,
};
