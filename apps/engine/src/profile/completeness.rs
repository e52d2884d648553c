//! Completion bookkeeping, recomputed after every mutation.

use super::model::{CompletionStatus, Profile};

/// Fixed weights for the completion percentage. A weighted sum rather than a
/// simple average: experience is the most decision-relevant section for
/// downstream consumers.
const COMPLETION_WEIGHTS: &[(&str, f64)] = &[
    ("personal_info", 25.0),
    ("experience", 30.0),
    ("education", 20.0),
    ("skills", 15.0),
    ("template", 10.0),
];

/// Recomputes `completion_status` from current content. Pure function of the
/// profile.
pub fn recompute_completion(profile: &mut Profile) {
    profile.completion_status = CompletionStatus {
        personal_info: !profile.personal_info.full_name.is_empty()
            && !profile.personal_info.email.is_empty(),
        experience: !profile.experience.is_empty(),
        education: !profile.education.is_empty(),
        skills: !profile.skills.is_empty(),
        languages: !profile.languages.is_empty(),
        template_selected: !profile.selected_template.is_empty(),
        output_generated: !profile.generated_output_url.is_empty(),
    };
}

/// Weighted completion percentage in [0, 100]. Reads `completion_status`, so
/// callers recompute first after any mutation.
pub fn completion_percentage(profile: &Profile) -> f64 {
    let status = &profile.completion_status;
    let mut earned = 0.0;
    let mut total = 0.0;
    for (section, weight) in COMPLETION_WEIGHTS {
        total += weight;
        let complete = match *section {
            "personal_info" => status.personal_info,
            "experience" => status.experience,
            "education" => status.education,
            "skills" => status.skills,
            "template" => status.template_selected,
            _ => false,
        };
        if complete {
            earned += weight;
        }
    }
    if total > 0.0 {
        (earned / total * 100.0).clamp(0.0, 100.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::super::model::{EducationEntry, ExperienceEntry, LanguageEntry};
    use super::*;

    #[test]
    fn test_empty_profile_scores_zero() {
        let mut profile = Profile::empty();
        recompute_completion(&mut profile);
        assert_eq!(completion_percentage(&profile), 0.0);
        assert!(!profile.completion_status.personal_info);
    }

    #[test]
    fn test_personal_info_requires_name_and_email() {
        let mut profile = Profile::empty();
        profile.personal_info.full_name = "Ada Lovelace".to_string();
        recompute_completion(&mut profile);
        assert!(!profile.completion_status.personal_info);

        profile.personal_info.email = "ada@example.com".to_string();
        recompute_completion(&mut profile);
        assert!(profile.completion_status.personal_info);
        assert_eq!(completion_percentage(&profile), 25.0);
    }

    #[test]
    fn test_experience_carries_the_largest_weight() {
        let mut profile = Profile::empty();
        profile.experience.push(ExperienceEntry::default());
        recompute_completion(&mut profile);
        assert_eq!(completion_percentage(&profile), 30.0);
    }

    #[test]
    fn test_all_weighted_sections_complete_scores_hundred() {
        let mut profile = Profile::empty();
        profile.personal_info.full_name = "Ada Lovelace".to_string();
        profile.personal_info.email = "ada@example.com".to_string();
        profile.experience.push(ExperienceEntry::default());
        profile.education.push(EducationEntry::default());
        profile.skills.push("Rust".to_string());
        profile.selected_template = "professional".to_string();
        recompute_completion(&mut profile);
        assert_eq!(completion_percentage(&profile), 100.0);
    }

    #[test]
    fn test_languages_and_output_tracked_but_unweighted() {
        let mut profile = Profile::empty();
        profile.languages.push(LanguageEntry {
            name: "Spanish".to_string(),
            proficiency: "fluent".to_string(),
        });
        profile.generated_output_url = "https://cdn.example.com/cv.pdf".to_string();
        recompute_completion(&mut profile);
        assert!(profile.completion_status.languages);
        assert!(profile.completion_status.output_generated);
        assert_eq!(completion_percentage(&profile), 0.0);
    }
}
