//! Container-type canonicalization (§4.1 "Container-type normalization").
//!
//! Maps free-form descriptions ("40ft high cube", "40'HC", "high cube 40")
//! to the industry codes used throughout the rest of the pipeline (`20GP`,
//! `40HC`, `40RF`, ...). An ordered regex table, same shape as the
//! detection-pattern table in `freightline-patterns`: first match wins.

use once_cell::sync::Lazy;
use regex::Regex;

struct ContainerRule {
    regex: Regex,
    code: &'static str,
}

static CONTAINER_RULES: Lazy<Vec<ContainerRule>> = Lazy::new(|| {
    let table: &[(&str, &str)] = &[
        (r"(?i)20\s*'?\s*(?:ft|foot)?\s*(?:dry)?\s*(?:standard|gp|general\s*purpose)\b", "20GP"),
        (r"(?i)40\s*'?\s*(?:ft|foot)?\s*(?:high\s*cube|hc|hq)\b", "40HC"),
        (r"(?i)40\s*'?\s*(?:ft|foot)?\s*(?:dry)?\s*(?:standard|gp|general\s*purpose)\b", "40GP"),
        (r"(?i)40\s*'?\s*(?:ft|foot)?\s*(?:reefer|rf|refrigerated)\b", "40RF"),
        (r"(?i)20\s*'?\s*(?:ft|foot)?\s*(?:reefer|rf|refrigerated)\b", "20RF"),
        (r"(?i)40\s*'?\s*(?:ft|foot)?\s*(?:open\s*top|ot)\b", "40OT"),
        (r"(?i)20\s*'?\s*(?:ft|foot)?\s*(?:open\s*top|ot)\b", "20OT"),
        (r"(?i)40\s*'?\s*(?:ft|foot)?\s*(?:flat\s*rack|fr)\b", "40FR"),
        (r"(?i)20\s*'?\s*(?:ft|foot)?\s*(?:flat\s*rack|fr)\b", "20FR"),
        (r"(?i)45\s*'?\s*(?:ft|foot)?\s*(?:high\s*cube|hc|hq)\b", "45HC"),
        (r"^20GP$|^20'GP$", "20GP"),
        (r"^40HC$|^40'HC$", "40HC"),
        (r"^40GP$|^40'GP$", "40GP"),
    ];
    table
        .iter()
        .filter_map(|(pattern, code)| {
            Regex::new(pattern)
                .ok()
                .map(|regex| ContainerRule { regex, code })
        })
        .collect()
});

/// Returns the canonical code for `raw`, or `None` when nothing in the
/// table matches (the caller keeps the original string in that case, per
/// §4.1 "unrepairable values are nulled" only applying to fields where the
/// original has no salvage value — container type still does).
#[must_use]
pub fn normalize(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    for rule in CONTAINER_RULES.iter() {
        if rule.regex.is_match(trimmed) {
            return Some(rule.code.to_string());
        }
    }
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_high_cube_variants() {
        assert_eq!(normalize("40ft high cube").as_deref(), Some("40HC"));
        assert_eq!(normalize("40'HC").as_deref(), Some("40HC"));
        assert_eq!(normalize("40HQ").as_deref(), Some("40HC"));
    }

    #[test]
    fn maps_standard_dry() {
        assert_eq!(normalize("20ft standard").as_deref(), Some("20GP"));
        assert_eq!(normalize("40 foot general purpose").as_deref(), Some("40GP"));
    }

    #[test]
    fn maps_reefer() {
        assert_eq!(normalize("40ft reefer").as_deref(), Some("40RF"));
    }

    #[test]
    fn unmatched_non_empty_passes_through() {
        assert_eq!(normalize("tank container").as_deref(), Some("tank container"));
    }

    #[test]
    fn empty_input_is_none() {
        assert_eq!(normalize("   "), None);
    }

    #[test]
    fn idempotent_on_canonical_code() {
        assert_eq!(normalize("40HC").as_deref(), Some("40HC"));
    }
}
