//! Field-level merge precedence, applied when a fragment matches an existing
//! entry: prefer non-empty, prefer longer on conflict, union list fields,
//! widen date ranges.

/// Marks an end date as open-ended. An open-ended end always beats a fixed
/// end date when widening. Empty is "unknown", not open-ended.
pub fn is_open_ended(date: &str) -> bool {
    let trimmed = date.trim();
    trimmed.eq_ignore_ascii_case("present") || trimmed.eq_ignore_ascii_case("current")
}

/// Prefers the non-empty value; when both are set and differ, prefers the
/// longer string as the richer one. Ties keep the existing value.
pub fn prefer_richer(existing: &str, incoming: &str) -> String {
    let existing = existing.trim();
    let incoming = incoming.trim();
    if existing.is_empty() {
        return incoming.to_string();
    }
    if incoming.is_empty() {
        return existing.to_string();
    }
    if incoming.chars().count() > existing.chars().count() {
        incoming.to_string()
    } else {
        existing.to_string()
    }
}

/// Unions two lists, deduplicating by case-insensitive exact match and
/// preserving existing-then-new order.
pub fn union_lists(existing: &[String], incoming: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(existing.len() + incoming.len());
    for item in existing.iter().chain(incoming.iter()) {
        let trimmed = item.trim();
        if trimmed.is_empty() {
            continue;
        }
        if !out.iter().any(|seen| seen.eq_ignore_ascii_case(trimmed)) {
            out.push(trimmed.to_string());
        }
    }
    out
}

/// Earliest of two start dates. ISO-ish date strings compare
/// lexicographically; an unset side defers to the other.
pub fn widen_start(existing: &str, incoming: &str) -> String {
    let existing = existing.trim();
    let incoming = incoming.trim();
    if existing.is_empty() {
        return incoming.to_string();
    }
    if incoming.is_empty() {
        return existing.to_string();
    }
    if incoming < existing {
        incoming.to_string()
    } else {
        existing.to_string()
    }
}

/// Latest of two end dates; an open-ended end always wins over a fixed one.
pub fn widen_end(existing: &str, incoming: &str) -> String {
    let existing = existing.trim();
    let incoming = incoming.trim();
    if is_open_ended(existing) {
        return existing.to_string();
    }
    if is_open_ended(incoming) {
        return incoming.to_string();
    }
    if existing.is_empty() {
        return incoming.to_string();
    }
    if incoming.is_empty() {
        return existing.to_string();
    }
    if incoming > existing {
        incoming.to_string()
    } else {
        existing.to_string()
    }
}
