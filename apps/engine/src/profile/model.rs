//! Profile data model.
//!
//! Every list-valued field is always a list, never null; serde defaults keep
//! loads lenient so older snapshots deserialize without errors. Empty string
//! means "unset" for scalar fields, which keeps last-write-wins merges from
//! clearing data by omission.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Flat scalar contact fields. Last-write-wins on direct fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PersonalInfo {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub location: String,
    pub linkedin: String,
    pub github: String,
    pub website: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ExperienceEntry {
    pub job_title: String,
    pub company: String,
    pub location: String,
    pub start_date: String,
    /// Open-ended roles carry "Present" (or "Current"); empty means unknown.
    pub end_date: String,
    pub description: String,
    pub achievements: Vec<String>,
    pub technologies: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EducationEntry {
    pub degree: String,
    pub institution: String,
    pub field_of_study: String,
    pub start_date: String,
    pub end_date: String,
    pub gpa: String,
    pub relevant_courses: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CertificationEntry {
    pub name: String,
    pub issuer: String,
    pub issue_date: String,
    pub credential_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ProjectEntry {
    pub name: String,
    pub description: String,
    pub url: String,
    pub technologies: Vec<String>,
}

/// Duplicate identity is by normalized language name only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct LanguageEntry {
    pub name: String,
    pub proficiency: String,
}

/// Derived per-section completeness. Recomputed after every mutation, never
/// hand-edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CompletionStatus {
    pub personal_info: bool,
    pub experience: bool,
    pub education: bool,
    pub skills: bool,
    pub languages: bool,
    pub template_selected: bool,
    pub output_generated: bool,
}

/// The canonical per-session accumulation target.
///
/// Entry lists keep insertion order as display order; entries have no
/// persistent ids, merges operate by content. `version` is a forward-only
/// revision counter bumped once per merge batch and once per shape-changing
/// migration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub personal_info: PersonalInfo,
    /// Single free-text field with override semantics; regenerated wholesale
    /// by the enhancement stage, never incrementally assembled.
    pub summary: String,
    pub experience: Vec<ExperienceEntry>,
    pub education: Vec<EducationEntry>,
    pub certifications: Vec<CertificationEntry>,
    pub projects: Vec<ProjectEntry>,
    /// Ordered for deterministic rendering; display casing is the first-seen
    /// occurrence. No two entries are byte-identical after case/whitespace
    /// normalization.
    pub skills: Vec<String>,
    pub languages: Vec<LanguageEntry>,
    pub selected_template: String,
    pub generated_output_url: String,
    pub completion_status: CompletionStatus,
    pub version: u32,
    pub last_updated: DateTime<Utc>,
}

impl Default for Profile {
    fn default() -> Self {
        Self::empty()
    }
}

impl Profile {
    /// A fresh, empty profile at revision zero.
    pub fn empty() -> Self {
        Profile {
            personal_info: PersonalInfo::default(),
            summary: String::new(),
            experience: Vec::new(),
            education: Vec::new(),
            certifications: Vec::new(),
            projects: Vec::new(),
            skills: Vec::new(),
            languages: Vec::new(),
            selected_template: String::new(),
            generated_output_url: String::new(),
            completion_status: CompletionStatus::default(),
            version: 0,
            last_updated: Utc::now(),
        }
    }

    /// Marks a mutation: revision forward, timestamp refreshed.
    pub fn touch(&mut self) {
        self.version += 1;
        self.last_updated = Utc::now();
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_profile_has_lists_not_nulls() {
        let profile = Profile::empty();
        let json = profile.to_json();
        assert!(json.get("experience").unwrap().is_array());
        assert!(json.get("skills").unwrap().is_array());
        assert!(json.get("languages").unwrap().is_array());
        assert_eq!(profile.version, 0);
    }

    #[test]
    fn test_profile_deserializes_from_sparse_json() {
        let profile: Profile = serde_json::from_str(r#"{"summary": "Engineer"}"#).unwrap();
        assert_eq!(profile.summary, "Engineer");
        assert!(profile.experience.is_empty());
        assert!(profile.personal_info.full_name.is_empty());
    }

    #[test]
    fn test_touch_moves_revision_forward() {
        let mut profile = Profile::empty();
        let before = profile.version;
        profile.touch();
        assert_eq!(profile.version, before + 1);
    }

    #[test]
    fn test_experience_entry_round_trips() {
        let entry = ExperienceEntry {
            job_title: "Engineer".to_string(),
            company: "Acme".to_string(),
            achievements: vec!["Shipped checkout".to_string()],
            ..Default::default()
        };
        let json = serde_json::to_string(&entry).unwrap();
        let recovered: ExperienceEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(recovered, entry);
    }
}
