//! Fragment kinds and their comparison surfaces.
//!
//! A fragment is one unit of newly extracted, already-structured CV
//! information awaiting merge. The extractor collaborator produces these; the
//! merge manager classifies and applies them.

use serde::{Deserialize, Serialize};

use crate::embedding::normalize_text;
use crate::profile::{
    CertificationEntry, EducationEntry, ExperienceEntry, LanguageEntry, PersonalInfo, ProjectEntry,
};

/// Longest slice of a description that participates in similarity matching.
/// Full descriptions can run to paragraphs; the head is what identifies the
/// entry.
const SURFACE_DESCRIPTION_CHARS: usize = 240;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Fragment {
    PersonalInfo { update: PersonalInfo },
    Experience { entry: ExperienceEntry },
    Education { entry: EducationEntry },
    Certification { entry: CertificationEntry },
    Project { entry: ProjectEntry },
    Skills { items: Vec<String> },
    Languages { items: Vec<LanguageEntry> },
    Summary { text: String },
}

impl Fragment {
    pub fn kind(&self) -> &'static str {
        match self {
            Fragment::PersonalInfo { .. } => "personal_info",
            Fragment::Experience { .. } => "experience",
            Fragment::Education { .. } => "education",
            Fragment::Certification { .. } => "certification",
            Fragment::Project { .. } => "project",
            Fragment::Skills { .. } => "skills",
            Fragment::Languages { .. } => "languages",
            Fragment::Summary { .. } => "summary",
        }
    }

    /// Checks the fragment carries the minimum shape its kind requires.
    /// A malformed fragment is skipped with a warning, never fatal to the
    /// batch.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Fragment::PersonalInfo { update } => {
                if *update == PersonalInfo::default() {
                    Err("personal_info update sets no fields".to_string())
                } else {
                    Ok(())
                }
            }
            Fragment::Experience { entry } => {
                if entry.job_title.trim().is_empty() && entry.company.trim().is_empty() {
                    Err("experience entry needs a job title or company".to_string())
                } else {
                    Ok(())
                }
            }
            Fragment::Education { entry } => {
                if entry.degree.trim().is_empty() && entry.institution.trim().is_empty() {
                    Err("education entry needs a degree or institution".to_string())
                } else {
                    Ok(())
                }
            }
            Fragment::Certification { entry } => {
                if entry.name.trim().is_empty() {
                    Err("certification entry needs a name".to_string())
                } else {
                    Ok(())
                }
            }
            Fragment::Project { entry } => {
                if entry.name.trim().is_empty() {
                    Err("project entry needs a name".to_string())
                } else {
                    Ok(())
                }
            }
            Fragment::Skills { items } => {
                if items.iter().all(|s| s.trim().is_empty()) {
                    Err("skill list is empty".to_string())
                } else {
                    Ok(())
                }
            }
            Fragment::Languages { items } => {
                if items.iter().all(|l| l.name.trim().is_empty()) {
                    Err("language list is empty".to_string())
                } else {
                    Ok(())
                }
            }
            Fragment::Summary { text } => {
                if text.trim().is_empty() {
                    Err("summary text is empty".to_string())
                } else {
                    Ok(())
                }
            }
        }
    }
}

/// Comparison surface for an experience entry: job title + company +
/// truncated description.
pub fn experience_surface(entry: &ExperienceEntry) -> String {
    normalize_text(&format!(
        "{} {} {}",
        entry.job_title,
        entry.company,
        truncate(&entry.description, SURFACE_DESCRIPTION_CHARS)
    ))
}

/// Comparison surface for an education entry: degree + institution.
pub fn education_surface(entry: &EducationEntry) -> String {
    normalize_text(&format!("{} {}", entry.degree, entry.institution))
}

/// Comparison surface for a certification: name + issuer.
pub fn certification_surface(entry: &CertificationEntry) -> String {
    normalize_text(&format!("{} {}", entry.name, entry.issuer))
}

/// Comparison surface for a project: name + truncated description.
pub fn project_surface(entry: &ProjectEntry) -> String {
    normalize_text(&format!(
        "{} {}",
        entry.name,
        truncate(&entry.description, SURFACE_DESCRIPTION_CHARS)
    ))
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fragment_serializes_with_kind_tag() {
        let fragment = Fragment::Skills {
            items: vec!["Rust".to_string()],
        };
        let json = serde_json::to_value(&fragment).unwrap();
        assert_eq!(json["kind"], "skills");
        assert_eq!(json["items"][0], "Rust");

        let recovered: Fragment = serde_json::from_value(json).unwrap();
        assert_eq!(recovered, fragment);
    }

    #[test]
    fn test_validate_rejects_empty_shapes() {
        assert!(Fragment::Experience {
            entry: ExperienceEntry::default()
        }
        .validate()
        .is_err());
        assert!(Fragment::Skills { items: vec![] }.validate().is_err());
        assert!(Fragment::Summary {
            text: "  ".to_string()
        }
        .validate()
        .is_err());
    }

    #[test]
    fn test_validate_accepts_partial_but_identifiable_entries() {
        let fragment = Fragment::Experience {
            entry: ExperienceEntry {
                company: "Acme".to_string(),
                ..Default::default()
            },
        };
        assert!(fragment.validate().is_ok());
    }

    #[test]
    fn test_experience_surface_is_normalized() {
        let entry = ExperienceEntry {
            job_title: "  Software   Engineer".to_string(),
            company: "ACME".to_string(),
            description: "Built APIs\n".to_string(),
            ..Default::default()
        };
        assert_eq!(experience_surface(&entry), "software engineer acme built apis");
    }

    #[test]
    fn test_surface_truncates_long_descriptions_on_char_boundaries() {
        let entry = ProjectEntry {
            name: "atlas".to_string(),
            description: "é".repeat(500),
            ..Default::default()
        };
        let surface = project_surface(&entry);
        assert!(surface.chars().count() <= 6 + 240);
    }
}
