//! Merge Manager: classifies incoming fragments as new, duplicate-to-merge,
//! or duplicate-to-discard, and folds them into the canonical profile.
//!
//! Flow per batch: validate fragment → exact-match short-circuit → similarity
//! lookup → append or enrich → recompute completion once → bump the revision
//! once if anything changed. A batch is observably atomic to readers.

pub mod fragment;
pub mod precedence;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::embedding::{normalize_text, EmbeddingBackend, SimilarityIndex};
use crate::profile::{
    recompute_completion, CertificationEntry, EducationEntry, ExperienceEntry, LanguageEntry,
    PersonalInfo, Profile, ProjectEntry,
};

pub use fragment::Fragment;

use fragment::{certification_surface, education_surface, experience_surface, project_surface};
use precedence::{prefer_richer, union_lists, widen_end, widen_start};

/// Similarity thresholds per fragment kind. Experience prose tolerates more
/// paraphrase than a bare skill token, which needs near-exact match to avoid
/// conflating distinct tools.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MergeConfig {
    pub experience_threshold: f32,
    pub skill_threshold: f32,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            experience_threshold: 0.85,
            skill_threshold: 0.90,
        }
    }
}

/// Counters for one merge batch.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct MergeStats {
    pub appended: usize,
    pub merged: usize,
    pub discarded: usize,
}

/// Outcome of one merge batch. The profile reflects every fragment that did
/// succeed; `warnings` lists everything skipped or degraded. Never a silent
/// partial success presented as full success.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeReport {
    pub profile: Profile,
    pub warnings: Vec<String>,
    pub stats: MergeStats,
}

/// How a similarity lookup classified one fragment.
enum Classification {
    New,
    DuplicateOf(usize),
}

/// Stateless per call and safely reentrant: the candidate set is re-embedded
/// at merge time, never cached across mutations of the same profile.
#[derive(Clone)]
pub struct MergeManager {
    index: SimilarityIndex,
    config: MergeConfig,
}

impl MergeManager {
    pub fn new(backend: Arc<dyn EmbeddingBackend>, config: MergeConfig) -> Self {
        Self {
            index: SimilarityIndex::new(backend),
            config,
        }
    }

    /// Merges a fragment batch into the profile.
    ///
    /// A malformed fragment is skipped with a recorded warning and never
    /// aborts the rest of the batch. An unavailable embedding backend
    /// degrades classification to exact-text comparison, never to silently
    /// skipping dedup. Completion, revision, and timestamp are updated once
    /// per batch, and only when at least one fragment changed content.
    pub async fn merge(&self, profile: Profile, fragments: &[Fragment]) -> MergeReport {
        let mut profile = profile;
        let mut warnings = Vec::new();
        let mut stats = MergeStats::default();
        let mut changed = false;

        for fragment in fragments {
            if let Err(reason) = fragment.validate() {
                warn!("Skipping malformed {} fragment: {reason}", fragment.kind());
                warnings.push(format!("skipped {} fragment: {reason}", fragment.kind()));
                continue;
            }

            let fragment_changed = match fragment {
                Fragment::PersonalInfo { update } => {
                    apply_personal_info(&mut profile.personal_info, update)
                }
                Fragment::Summary { text } => apply_summary(&mut profile.summary, text),
                Fragment::Skills { items } => {
                    self.merge_skills(&mut profile.skills, items, &mut warnings, &mut stats)
                        .await
                }
                Fragment::Languages { items } => {
                    merge_languages(&mut profile.languages, items, &mut stats)
                }
                Fragment::Experience { entry } => {
                    self.merge_entry(
                        &mut profile.experience,
                        tidy_experience(entry),
                        experience_surface,
                        enrich_experience,
                        &mut warnings,
                        &mut stats,
                    )
                    .await
                }
                Fragment::Education { entry } => {
                    self.merge_entry(
                        &mut profile.education,
                        tidy_education(entry),
                        education_surface,
                        enrich_education,
                        &mut warnings,
                        &mut stats,
                    )
                    .await
                }
                Fragment::Certification { entry } => {
                    self.merge_entry(
                        &mut profile.certifications,
                        tidy_certification(entry),
                        certification_surface,
                        enrich_certification,
                        &mut warnings,
                        &mut stats,
                    )
                    .await
                }
                Fragment::Project { entry } => {
                    self.merge_entry(
                        &mut profile.projects,
                        tidy_project(entry),
                        project_surface,
                        enrich_project,
                        &mut warnings,
                        &mut stats,
                    )
                    .await
                }
            };
            changed |= fragment_changed;
        }

        recompute_completion(&mut profile);
        if changed {
            profile.touch();
        }

        warnings.dedup();
        MergeReport {
            profile,
            warnings,
            stats,
        }
    }

    /// Appends an entry when nothing matches, otherwise enriches the matched
    /// entry in place. Never replaces.
    async fn merge_entry<T>(
        &self,
        list: &mut Vec<T>,
        incoming: T,
        surface_of: fn(&T) -> String,
        enrich: fn(&T, &T) -> T,
        warnings: &mut Vec<String>,
        stats: &mut MergeStats,
    ) -> bool
    where
        T: Clone + PartialEq,
    {
        let surface = surface_of(&incoming);
        let candidates: Vec<String> = list.iter().map(surface_of).collect();

        match self
            .classify(
                &surface,
                &candidates,
                self.config.experience_threshold,
                warnings,
            )
            .await
        {
            Classification::New => {
                list.push(incoming);
                stats.appended += 1;
                true
            }
            Classification::DuplicateOf(i) => {
                let enriched = enrich(&list[i], &incoming);
                if enriched != list[i] {
                    list[i] = enriched;
                    stats.merged += 1;
                    true
                } else {
                    stats.discarded += 1;
                    false
                }
            }
        }
    }

    /// Appends skill tokens that match nothing on file. Comparison
    /// lowercases; display keeps the casing of the first-seen occurrence.
    async fn merge_skills(
        &self,
        skills: &mut Vec<String>,
        items: &[String],
        warnings: &mut Vec<String>,
        stats: &mut MergeStats,
    ) -> bool {
        let mut changed = false;
        for raw in items {
            let token = raw.trim();
            if token.is_empty() {
                continue;
            }
            match self
                .classify(token, skills, self.config.skill_threshold, warnings)
                .await
            {
                Classification::DuplicateOf(_) => stats.discarded += 1,
                Classification::New => {
                    skills.push(token.to_string());
                    stats.appended += 1;
                    changed = true;
                }
            }
        }
        changed
    }

    /// Classifies a comparison surface against the current candidate set.
    ///
    /// Exact normalized equality short-circuits without a backend call; an
    /// unavailable backend degrades to that exact comparison with a recorded
    /// warning instead of skipping dedup.
    async fn classify(
        &self,
        surface: &str,
        candidates: &[String],
        threshold: f32,
        warnings: &mut Vec<String>,
    ) -> Classification {
        let normalized = normalize_text(surface);
        if let Some(i) = candidates
            .iter()
            .position(|candidate| normalize_text(candidate) == normalized)
        {
            return Classification::DuplicateOf(i);
        }

        match self.index.best_match(surface, candidates, threshold).await {
            Ok(Some(m)) => {
                debug!(
                    "Similarity match at index {} (score {:.3})",
                    m.index, m.score
                );
                Classification::DuplicateOf(m.index)
            }
            Ok(None) => Classification::New,
            Err(e) => {
                warn!("Embedding backend unavailable, using exact match only: {e}");
                warnings.push(
                    "embedding backend unavailable; deduplication degraded to exact text match"
                        .to_string(),
                );
                Classification::New
            }
        }
    }
}

/// Shallow-merge: fragment values win for any field they set; omitted
/// (empty) fields never clear existing data.
fn apply_personal_info(existing: &mut PersonalInfo, update: &PersonalInfo) -> bool {
    let mut changed = false;
    let slots = [
        (&mut existing.full_name, &update.full_name),
        (&mut existing.email, &update.email),
        (&mut existing.phone, &update.phone),
        (&mut existing.location, &update.location),
        (&mut existing.linkedin, &update.linkedin),
        (&mut existing.github, &update.github),
        (&mut existing.website, &update.website),
    ];
    for (slot, value) in slots {
        let value = value.trim();
        if !value.is_empty() && slot.as_str() != value {
            *slot = value.to_string();
            changed = true;
        }
    }
    changed
}

/// Direct override; summaries are regenerated wholesale downstream, never
/// incrementally assembled.
fn apply_summary(summary: &mut String, text: &str) -> bool {
    let text = text.trim();
    if summary.as_str() == text {
        false
    } else {
        *summary = text.to_string();
        true
    }
}

/// Languages dedup by normalized name only; fuzzy-matching a small,
/// closed-ish vocabulary causes more harm than good. An existing language
/// gets its proficiency overwritten by a non-empty incoming value.
fn merge_languages(
    languages: &mut Vec<LanguageEntry>,
    items: &[LanguageEntry],
    stats: &mut MergeStats,
) -> bool {
    let mut changed = false;
    for incoming in items {
        let name = incoming.name.trim();
        if name.is_empty() {
            continue;
        }
        let normalized = normalize_text(name);
        match languages
            .iter_mut()
            .find(|l| normalize_text(&l.name) == normalized)
        {
            Some(existing) => {
                let proficiency = incoming.proficiency.trim();
                if !proficiency.is_empty() && existing.proficiency != proficiency {
                    existing.proficiency = proficiency.to_string();
                    stats.merged += 1;
                    changed = true;
                } else {
                    stats.discarded += 1;
                }
            }
            None => {
                languages.push(LanguageEntry {
                    name: name.to_string(),
                    proficiency: incoming.proficiency.trim().to_string(),
                });
                stats.appended += 1;
                changed = true;
            }
        }
    }
    changed
}

fn trim_list(items: &[String]) -> Vec<String> {
    items
        .iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn tidy_experience(entry: &ExperienceEntry) -> ExperienceEntry {
    ExperienceEntry {
        job_title: entry.job_title.trim().to_string(),
        company: entry.company.trim().to_string(),
        location: entry.location.trim().to_string(),
        start_date: entry.start_date.trim().to_string(),
        end_date: entry.end_date.trim().to_string(),
        description: entry.description.trim().to_string(),
        achievements: trim_list(&entry.achievements),
        technologies: trim_list(&entry.technologies),
    }
}

fn tidy_education(entry: &EducationEntry) -> EducationEntry {
    EducationEntry {
        degree: entry.degree.trim().to_string(),
        institution: entry.institution.trim().to_string(),
        field_of_study: entry.field_of_study.trim().to_string(),
        start_date: entry.start_date.trim().to_string(),
        end_date: entry.end_date.trim().to_string(),
        gpa: entry.gpa.trim().to_string(),
        relevant_courses: trim_list(&entry.relevant_courses),
    }
}

fn tidy_certification(entry: &CertificationEntry) -> CertificationEntry {
    CertificationEntry {
        name: entry.name.trim().to_string(),
        issuer: entry.issuer.trim().to_string(),
        issue_date: entry.issue_date.trim().to_string(),
        credential_url: entry.credential_url.trim().to_string(),
    }
}

fn tidy_project(entry: &ProjectEntry) -> ProjectEntry {
    ProjectEntry {
        name: entry.name.trim().to_string(),
        description: entry.description.trim().to_string(),
        url: entry.url.trim().to_string(),
        technologies: trim_list(&entry.technologies),
    }
}

/// Merge, don't replace: per scalar sub-field prefer the non-empty value,
/// then the longer one; union list sub-fields; keep the widest date span.
fn enrich_experience(existing: &ExperienceEntry, incoming: &ExperienceEntry) -> ExperienceEntry {
    ExperienceEntry {
        job_title: prefer_richer(&existing.job_title, &incoming.job_title),
        company: prefer_richer(&existing.company, &incoming.company),
        location: prefer_richer(&existing.location, &incoming.location),
        start_date: widen_start(&existing.start_date, &incoming.start_date),
        end_date: widen_end(&existing.end_date, &incoming.end_date),
        description: prefer_richer(&existing.description, &incoming.description),
        achievements: union_lists(&existing.achievements, &incoming.achievements),
        technologies: union_lists(&existing.technologies, &incoming.technologies),
    }
}

fn enrich_education(existing: &EducationEntry, incoming: &EducationEntry) -> EducationEntry {
    EducationEntry {
        degree: prefer_richer(&existing.degree, &incoming.degree),
        institution: prefer_richer(&existing.institution, &incoming.institution),
        field_of_study: prefer_richer(&existing.field_of_study, &incoming.field_of_study),
        start_date: widen_start(&existing.start_date, &incoming.start_date),
        end_date: widen_end(&existing.end_date, &incoming.end_date),
        gpa: prefer_richer(&existing.gpa, &incoming.gpa),
        relevant_courses: union_lists(&existing.relevant_courses, &incoming.relevant_courses),
    }
}

fn enrich_certification(
    existing: &CertificationEntry,
    incoming: &CertificationEntry,
) -> CertificationEntry {
    CertificationEntry {
        name: prefer_richer(&existing.name, &incoming.name),
        issuer: prefer_richer(&existing.issuer, &incoming.issuer),
        issue_date: prefer_richer(&existing.issue_date, &incoming.issue_date),
        credential_url: prefer_richer(&existing.credential_url, &incoming.credential_url),
    }
}

fn enrich_project(existing: &ProjectEntry, incoming: &ProjectEntry) -> ProjectEntry {
    ProjectEntry {
        name: prefer_richer(&existing.name, &incoming.name),
        description: prefer_richer(&existing.description, &incoming.description),
        url: prefer_richer(&existing.url, &incoming.url),
        technologies: union_lists(&existing.technologies, &incoming.technologies),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::testing::{FailingEmbedder, StubEmbedder};
    use crate::profile::completion_percentage;

    fn manager_with(backend: impl EmbeddingBackend + 'static) -> MergeManager {
        MergeManager::new(Arc::new(backend), MergeConfig::default())
    }

    fn experience(title: &str, company: &str, desc: &str) -> Fragment {
        Fragment::Experience {
            entry: ExperienceEntry {
                job_title: title.to_string(),
                company: company.to_string(),
                description: desc.to_string(),
                ..Default::default()
            },
        }
    }

    fn skills(items: &[&str]) -> Fragment {
        Fragment::Skills {
            items: items.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn test_new_experience_is_appended_verbatim() {
        let manager = manager_with(StubEmbedder::new());
        let report = manager
            .merge(
                Profile::empty(),
                &[experience("Software Engineer", "Acme", "Built APIs")],
            )
            .await;
        assert_eq!(report.profile.experience.len(), 1);
        assert_eq!(report.profile.experience[0].company, "Acme");
        assert_eq!(report.stats.appended, 1);
        assert!(report.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_matched_experience_keeps_longer_description() {
        // Two paraphrases pinned to vectors with cosine ~0.98, above the
        // 0.85 experience threshold.
        let backend = StubEmbedder::new()
            .pin("software engineer acme built apis", vec![1.0, 0.0])
            .pin(
                "software engineer acme built rest apis for checkout",
                vec![0.98, 0.199],
            );
        let manager = manager_with(backend);

        let report = manager
            .merge(
                Profile::empty(),
                &[experience("Software Engineer", "Acme", "Built APIs")],
            )
            .await;
        let report = manager
            .merge(
                report.profile,
                &[experience(
                    "Software Engineer",
                    "Acme",
                    "Built REST APIs for checkout",
                )],
            )
            .await;

        assert_eq!(report.profile.experience.len(), 1);
        assert_eq!(
            report.profile.experience[0].description,
            "Built REST APIs for checkout"
        );
        assert_eq!(report.stats.merged, 1);
    }

    #[tokio::test]
    async fn test_matched_experience_widens_dates_and_unions_lists() {
        let manager = manager_with(StubEmbedder::new());
        let first = Fragment::Experience {
            entry: ExperienceEntry {
                job_title: "Engineer".to_string(),
                company: "Acme".to_string(),
                description: "Platform work".to_string(),
                start_date: "2020-01".to_string(),
                end_date: "2021-06".to_string(),
                achievements: vec!["Cut latency 40%".to_string()],
                ..Default::default()
            },
        };
        // Identical comparison surface, so the exact-match path classifies
        // this as a duplicate regardless of embeddings.
        let second = Fragment::Experience {
            entry: ExperienceEntry {
                job_title: "Engineer".to_string(),
                company: "Acme".to_string(),
                description: "Platform work".to_string(),
                start_date: "2019-05".to_string(),
                end_date: "Present".to_string(),
                achievements: vec!["cut latency 40%".to_string(), "Led migration".to_string()],
                technologies: vec!["Rust".to_string()],
                ..Default::default()
            },
        };

        let report = manager.merge(Profile::empty(), &[first]).await;
        let report = manager.merge(report.profile, &[second]).await;

        let entry = &report.profile.experience[0];
        assert_eq!(report.profile.experience.len(), 1);
        assert_eq!(entry.start_date, "2019-05");
        assert_eq!(entry.end_date, "Present");
        assert_eq!(
            entry.achievements,
            vec!["Cut latency 40%".to_string(), "Led migration".to_string()]
        );
        assert_eq!(entry.technologies, vec!["Rust".to_string()]);
    }

    #[tokio::test]
    async fn test_skill_list_collapses_case_and_whitespace_variants() {
        let manager = manager_with(StubEmbedder::new());
        let report = manager
            .merge(Profile::empty(), &[skills(&["Python", "python ", "PYTHON"])])
            .await;
        assert_eq!(report.profile.skills, vec!["Python".to_string()]);
        assert_eq!(report.stats.appended, 1);
        assert_eq!(report.stats.discarded, 2);
    }

    #[tokio::test]
    async fn test_near_duplicate_skills_are_not_auto_merged() {
        // "JS" and "JavaScript" pinned to vectors with cosine ~0.70, below
        // the 0.90 skill threshold: related tools stay distinct entries.
        let backend = StubEmbedder::new()
            .pin("js", vec![1.0, 0.0])
            .pin("javascript", vec![0.7, 0.714]);
        let manager = manager_with(backend);
        let report = manager
            .merge(Profile::empty(), &[skills(&["JS", "JavaScript"])])
            .await;
        assert_eq!(report.profile.skills.len(), 2);
    }

    #[tokio::test]
    async fn test_merging_same_batch_twice_is_idempotent() {
        let manager = manager_with(StubEmbedder::new());
        let batch = vec![
            Fragment::PersonalInfo {
                update: PersonalInfo {
                    full_name: "Ada Lovelace".to_string(),
                    email: "ada@example.com".to_string(),
                    ..Default::default()
                },
            },
            experience("Software Engineer", "Acme", "Built APIs"),
            skills(&["Rust", "Postgres"]),
            Fragment::Languages {
                items: vec![LanguageEntry {
                    name: "Spanish".to_string(),
                    proficiency: "B2".to_string(),
                }],
            },
            Fragment::Summary {
                text: "Engineer with checkout experience".to_string(),
            },
        ];

        let once = manager.merge(Profile::empty(), &batch).await.profile;
        let twice = manager.merge(once.clone(), &batch).await.profile;
        assert_eq!(once, twice);
    }

    #[tokio::test]
    async fn test_independent_sections_merge_commutatively() {
        let manager = manager_with(StubEmbedder::new());
        let skill = skills(&["Rust"]);
        let exp = experience("Engineer", "Acme", "Systems work");

        let a = manager
            .merge(Profile::empty(), &[skill.clone(), exp.clone()])
            .await
            .profile;
        let b = manager.merge(Profile::empty(), &[exp, skill]).await.profile;

        assert_eq!(a.skills, b.skills);
        assert_eq!(a.experience, b.experience);
        assert_eq!(a.completion_status, b.completion_status);
        assert_eq!(a.version, b.version);
    }

    #[tokio::test]
    async fn test_completion_percentage_is_monotonic() {
        let manager = manager_with(StubEmbedder::new());
        let batches = vec![
            Fragment::PersonalInfo {
                update: PersonalInfo {
                    full_name: "Ada Lovelace".to_string(),
                    email: "ada@example.com".to_string(),
                    ..Default::default()
                },
            },
            experience("Engineer", "Acme", "Systems work"),
            Fragment::Education {
                entry: EducationEntry {
                    degree: "BSc".to_string(),
                    institution: "MIT".to_string(),
                    ..Default::default()
                },
            },
            skills(&["Rust"]),
        ];

        let mut profile = Profile::empty();
        let mut last = completion_percentage(&profile);
        for batch in batches {
            profile = manager.merge(profile, &[batch]).await.profile;
            let now = completion_percentage(&profile);
            assert!(now >= last, "completion went backwards: {now} < {last}");
            last = now;
        }
        assert_eq!(last, 90.0);
    }

    #[tokio::test]
    async fn test_backend_down_still_deduplicates_exact_text() {
        let manager = manager_with(FailingEmbedder);
        let frag = experience("Software Engineer", "Acme", "Built APIs");

        let report = manager.merge(Profile::empty(), &[frag.clone()]).await;
        let report = manager.merge(report.profile, &[frag]).await;

        assert_eq!(report.profile.experience.len(), 1);
    }

    #[tokio::test]
    async fn test_backend_down_records_degradation_warning() {
        let manager = manager_with(FailingEmbedder);
        let report = manager
            .merge(
                Profile::empty(),
                &[
                    experience("Engineer", "Acme", "one"),
                    experience("Engineer", "Acme", "two"),
                ],
            )
            .await;

        // Non-identical surfaces cannot be compared without the backend, so
        // both entries are kept and the degradation is reported.
        assert_eq!(report.profile.experience.len(), 2);
        assert!(report.warnings.iter().any(|w| w.contains("degraded")));
    }

    #[tokio::test]
    async fn test_malformed_fragment_is_skipped_not_fatal() {
        let manager = manager_with(StubEmbedder::new());
        let report = manager
            .merge(
                Profile::empty(),
                &[
                    Fragment::Experience {
                        entry: ExperienceEntry::default(),
                    },
                    skills(&["Rust"]),
                ],
            )
            .await;

        assert!(report.profile.experience.is_empty());
        assert_eq!(report.profile.skills, vec!["Rust".to_string()]);
        assert_eq!(report.warnings.len(), 1);
        assert!(report.warnings[0].contains("skipped experience fragment"));
    }

    #[tokio::test]
    async fn test_personal_info_last_write_wins_without_clearing() {
        let manager = manager_with(StubEmbedder::new());
        let report = manager
            .merge(
                Profile::empty(),
                &[Fragment::PersonalInfo {
                    update: PersonalInfo {
                        full_name: "Ada Lovelace".to_string(),
                        email: "ada@example.com".to_string(),
                        ..Default::default()
                    },
                }],
            )
            .await;

        // A later update that only sets the phone must not clear the email.
        let report = manager
            .merge(
                report.profile,
                &[Fragment::PersonalInfo {
                    update: PersonalInfo {
                        phone: "+44 20 7946 0000".to_string(),
                        full_name: "Ada King, Countess of Lovelace".to_string(),
                        ..Default::default()
                    },
                }],
            )
            .await;

        let info = &report.profile.personal_info;
        assert_eq!(info.email, "ada@example.com");
        assert_eq!(info.phone, "+44 20 7946 0000");
        assert_eq!(info.full_name, "Ada King, Countess of Lovelace");
    }

    #[tokio::test]
    async fn test_language_identity_by_name_overwrites_proficiency() {
        let manager = manager_with(StubEmbedder::new());
        let report = manager
            .merge(
                Profile::empty(),
                &[Fragment::Languages {
                    items: vec![LanguageEntry {
                        name: "Spanish".to_string(),
                        proficiency: "B1".to_string(),
                    }],
                }],
            )
            .await;
        let report = manager
            .merge(
                report.profile,
                &[Fragment::Languages {
                    items: vec![LanguageEntry {
                        name: "spanish".to_string(),
                        proficiency: "C1".to_string(),
                    }],
                }],
            )
            .await;

        assert_eq!(report.profile.languages.len(), 1);
        assert_eq!(report.profile.languages[0].name, "Spanish");
        assert_eq!(report.profile.languages[0].proficiency, "C1");
    }

    #[tokio::test]
    async fn test_summary_is_overridden_not_merged() {
        let manager = manager_with(StubEmbedder::new());
        let report = manager
            .merge(
                Profile::empty(),
                &[Fragment::Summary {
                    text: "A long and detailed summary of a career".to_string(),
                }],
            )
            .await;
        let report = manager
            .merge(
                report.profile,
                &[Fragment::Summary {
                    text: "Short".to_string(),
                }],
            )
            .await;
        assert_eq!(report.profile.summary, "Short");
    }

    #[tokio::test]
    async fn test_revision_bumps_once_per_batch_and_only_on_change() {
        let manager = manager_with(StubEmbedder::new());
        let batch = vec![skills(&["Rust", "Postgres", "Redis"]), experience("Engineer", "Acme", "Work")];

        let report = manager.merge(Profile::empty(), &batch).await;
        assert_eq!(report.profile.version, 1);

        // All duplicates: no content change, no revision bump.
        let again = manager.merge(report.profile.clone(), &batch).await;
        assert_eq!(again.profile.version, 1);
        assert_eq!(again.stats.appended, 0);
    }

    #[tokio::test]
    async fn test_certifications_and_projects_dedup_by_surface() {
        let manager = manager_with(StubEmbedder::new());
        let cert = Fragment::Certification {
            entry: CertificationEntry {
                name: "AWS Solutions Architect".to_string(),
                issuer: "Amazon".to_string(),
                ..Default::default()
            },
        };
        let project = Fragment::Project {
            entry: ProjectEntry {
                name: "atlas".to_string(),
                description: "Internal mapping tool".to_string(),
                ..Default::default()
            },
        };

        let report = manager
            .merge(Profile::empty(), &[cert.clone(), project.clone(), cert, project])
            .await;
        assert_eq!(report.profile.certifications.len(), 1);
        assert_eq!(report.profile.projects.len(), 1);
    }

    #[tokio::test]
    async fn test_completion_recomputed_after_batch() {
        let manager = manager_with(StubEmbedder::new());
        let report = manager
            .merge(Profile::empty(), &[skills(&["Rust"])])
            .await;
        assert!(report.profile.completion_status.skills);
        assert!(!report.profile.completion_status.experience);
    }
}
