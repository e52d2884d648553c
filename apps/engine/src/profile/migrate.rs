//! Profile validation and load-time migration.
//!
//! `migrate` is total and idempotent: any JSON value becomes a well-formed
//! profile. Historical field names are honored, unknown fields are dropped,
//! and the revision counter moves forward only when the stored shape actually
//! changed, so migrating a current-shape profile is a no-op.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tracing::debug;

use super::completeness::recompute_completion;
use super::model::{LanguageEntry, Profile};

enum JsonKind {
    Object,
    Array,
    String,
    Number,
}

impl JsonKind {
    fn matches(&self, value: &Value) -> bool {
        match self {
            JsonKind::Object => value.is_object(),
            JsonKind::Array => value.is_array(),
            JsonKind::String => value.is_string(),
            JsonKind::Number => value.is_number(),
        }
    }
}

/// Top-level keys a stored profile must carry, with their expected JSON
/// types. Nested entry shapes are the merge manager's concern at merge time.
const REQUIRED_KEYS: &[(&str, JsonKind)] = &[
    ("personal_info", JsonKind::Object),
    ("summary", JsonKind::String),
    ("experience", JsonKind::Array),
    ("education", JsonKind::Array),
    ("certifications", JsonKind::Array),
    ("projects", JsonKind::Array),
    ("skills", JsonKind::Array),
    ("languages", JsonKind::Array),
    ("selected_template", JsonKind::String),
    ("generated_output_url", JsonKind::String),
    ("completion_status", JsonKind::Object),
    ("version", JsonKind::Number),
    ("last_updated", JsonKind::String),
];

/// Checks presence and primitive type of every required top-level key.
pub fn validate(raw: &Value) -> bool {
    let Some(obj) = raw.as_object() else {
        return false;
    };
    REQUIRED_KEYS
        .iter()
        .all(|(key, kind)| obj.get(*key).is_some_and(|value| kind.matches(value)))
}

/// Migrates any JSON value into a well-formed profile.
///
/// Missing fields are filled from `Profile::empty()`, known historical field
/// names are renamed, unrecognized fields are dropped. Never fatal.
pub fn migrate(raw: &Value) -> Profile {
    let Some(source) = raw.as_object() else {
        let mut profile = Profile::empty();
        recompute_completion(&mut profile);
        return profile;
    };

    let canonical = apply_aliases(source);

    let mut profile = Profile::empty();
    if let Some(info) = canonical.get("personal_info") {
        profile.personal_info = serde_json::from_value(info.clone()).unwrap_or_default();
    }
    profile.summary = string_field(&canonical, "summary");
    profile.experience = entry_list(&canonical, "experience");
    profile.education = entry_list(&canonical, "education");
    profile.certifications = entry_list(&canonical, "certifications");
    profile.projects = entry_list(&canonical, "projects");
    profile.skills = skill_list(&canonical);
    profile.languages = language_list(&canonical);
    profile.selected_template = string_field(&canonical, "selected_template");
    profile.generated_output_url = string_field(&canonical, "generated_output_url");
    profile.version = canonical
        .get("version")
        .and_then(Value::as_u64)
        .unwrap_or(0) as u32;
    if let Some(parsed) = canonical
        .get("last_updated")
        .and_then(Value::as_str)
        .and_then(|ts| ts.parse::<DateTime<Utc>>().ok())
    {
        profile.last_updated = parsed;
    }
    recompute_completion(&mut profile);

    // Forward the revision only when migration changed the stored shape.
    if serde_json::to_value(&profile).ok().as_ref() != Some(raw) {
        profile.version += 1;
        debug!("Migrated profile to revision {}", profile.version);
    }

    profile
}

/// Renames known historical field names to their current equivalents.
fn apply_aliases(source: &Map<String, Value>) -> Map<String, Value> {
    let mut out = source.clone();

    // Older snapshots pluralized section names.
    for (legacy, current) in [("experiences", "experience"), ("educations", "education")] {
        if !out.contains_key(current) {
            if let Some(value) = out.remove(legacy) {
                out.insert(current.to_string(), value);
            }
        }
    }

    // "personal" predates "personal_info".
    if !out.contains_key("personal_info") {
        if let Some(value) = out.remove("personal") {
            out.insert("personal_info".to_string(), value);
        }
    }

    // Top-level full_name/name predate the personal_info block.
    let top_level_name = out
        .get("full_name")
        .or_else(|| out.get("name"))
        .and_then(Value::as_str)
        .map(str::to_string);
    if let Some(name) = top_level_name {
        let info = out
            .entry("personal_info".to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Some(info_obj) = info.as_object_mut() {
            let missing = info_obj
                .get("full_name")
                .and_then(Value::as_str)
                .map_or(true, str::is_empty);
            if missing {
                info_obj.insert("full_name".to_string(), Value::String(name));
            }
        }
    }

    out
}

fn string_field(source: &Map<String, Value>, key: &str) -> String {
    source
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Parses a list of structured entries, dropping elements that do not
/// deserialize rather than failing the whole list.
fn entry_list<T: serde::de::DeserializeOwned>(source: &Map<String, Value>, key: &str) -> Vec<T> {
    source
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| serde_json::from_value(item.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

/// Skills are plain strings today; some historical snapshots stored
/// `{"name": ...}` objects.
fn skill_list(source: &Map<String, Value>) -> Vec<String> {
    source
        .get("skills")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(s.clone()),
                    Value::Object(obj) => obj.get("name").and_then(Value::as_str).map(str::to_string),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Languages are `{name, proficiency}` pairs; bare strings are accepted with
/// an unset proficiency.
fn language_list(source: &Map<String, Value>) -> Vec<LanguageEntry> {
    source
        .get("languages")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) => Some(LanguageEntry {
                        name: s.clone(),
                        proficiency: String::new(),
                    }),
                    Value::Object(_) => serde_json::from_value(item.clone()).ok(),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default()
}
