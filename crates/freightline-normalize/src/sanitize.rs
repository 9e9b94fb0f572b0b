//! Field-level sanitizers (§4.1 "Field sanitizers").
//!
//! These operate directly on a parsed [`ExtractedAnalysis`] and never fail:
//! a value that cannot be repaired is nulled (or, for list fields, dropped)
//! rather than rejected.

use once_cell::sync::Lazy;
use regex::Regex;

use freightline_core::model::ExtractedAnalysis;

use crate::SUMMARY_MAX_CHARS;

static CONTAINER_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z]{4}[0-9]{7}$").unwrap());
static PURE_NUMERIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]+$").unwrap());
static SE_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^SE[A-Z]{2,}").unwrap());
static NAN_LIKE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(nan|n/a|na|null|none|undefined)$").unwrap());

/// Known carrier-name words that sometimes prefix a raw MBL number in LLM
/// output (e.g. `"MAERSK 263216729"`); stripped before the pure-numeric
/// check so a leading carrier tag doesn't save a fake MBL from nulling.
const CARRIER_WORDS: &[&str] = &[
    "MAERSK", "MSC", "CMA", "CGM", "COSCO", "HAPAG", "LLOYD", "EVERGREEN", "ONE", "HMM", "ZIM",
    "OOCL", "APL", "PIL",
];

/// Runs every sanitizer over `analysis` in place (§4.1, §4.7 step 6).
pub fn sanitize(analysis: &mut ExtractedAnalysis) {
    filter_container_numbers(analysis);
    repair_mbl(analysis);
    denan_string_fields(analysis);
    truncate_summary(analysis);
}

/// Keeps only container numbers matching `[A-Z]{4}[0-9]{7}` (invariant P3).
fn filter_container_numbers(analysis: &mut ExtractedAnalysis) {
    analysis
        .container_numbers
        .retain(|c| CONTAINER_NUMBER.is_match(c.trim()));
}

/// Strips leading carrier words from `mbl_number`; if what remains is pure
/// numeric, it's a booking number masquerading as an MBL, so it's nulled
/// (scenario S5). Also relocates an `SE`-prefixed MBL to `work_order_number`
/// when that field is empty ("SE-prefix move").
fn repair_mbl(analysis: &mut ExtractedAnalysis) {
    let Some(raw) = analysis.mbl_number.take() else {
        return;
    };

    let mut candidate = raw.trim().to_string();
    for word in CARRIER_WORDS {
        let stripped = candidate.trim_start_matches(word).trim().to_string();
        if stripped != candidate {
            candidate = stripped;
        }
    }

    if SE_PREFIX.is_match(&candidate) {
        if analysis.work_order_number.is_none() {
            analysis.work_order_number = Some(candidate);
        }
        return;
    }

    if candidate.is_empty() || PURE_NUMERIC.is_match(&candidate) {
        return;
    }

    analysis.mbl_number = Some(candidate);
}

/// Nulls any scalar string field that is a NaN-like placeholder
/// (`"NaN"`, `"N/A"`, `"null"`, ...) rather than real data.
fn denan_string_fields(analysis: &mut ExtractedAnalysis) {
    denan(&mut analysis.booking_number);
    denan(&mut analysis.hbl_number);
    denan(&mut analysis.mawb_number);
    denan(&mut analysis.hawb_number);
    denan(&mut analysis.work_order_number);
    denan(&mut analysis.pro_number);
    denan(&mut analysis.vessel_name);
    denan(&mut analysis.voyage_number);
    denan(&mut analysis.flight_number);
    denan(&mut analysis.carrier_name);
    denan(&mut analysis.commodity);
    denan(&mut analysis.invoice_number);
    denan(&mut analysis.currency);
}

fn denan(field: &mut Option<String>) {
    if let Some(value) = field {
        if NAN_LIKE.is_match(value.trim()) {
            *field = None;
        }
    }
}

/// Truncates `summary` to [`SUMMARY_MAX_CHARS`] characters, appending an
/// ellipsis when truncation actually occurred.
fn truncate_summary(analysis: &mut ExtractedAnalysis) {
    if analysis.summary.chars().count() <= SUMMARY_MAX_CHARS {
        return;
    }
    let truncated: String = analysis
        .summary
        .chars()
        .take(SUMMARY_MAX_CHARS.saturating_sub(1))
        .collect();
    analysis.summary = format!("{truncated}\u{2026}");
}

/// Splits a comma- or whitespace-separated scalar string into a list,
/// trimming empties. Used by the LLM client when a list field arrives as
/// a single delimited string instead of a JSON array.
#[must_use]
pub fn split_scalar_to_list(raw: &str) -> Vec<String> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use freightline_core::enums::TransportMode;

    fn base_analysis() -> ExtractedAnalysis {
        ExtractedAnalysis {
            transport_mode: TransportMode::Ocean,
            ..Default::default()
        }
    }

    #[test]
    fn filters_malformed_container_numbers() {
        let mut a = base_analysis();
        a.container_numbers = vec![
            "MSCU1234567".to_string(),
            "bad".to_string(),
            "MSCU123456".to_string(),
        ];
        filter_container_numbers(&mut a);
        assert_eq!(a.container_numbers, vec!["MSCU1234567".to_string()]);
    }

    #[test]
    fn mbl_carrier_prefix_stripped_to_pure_numeric_is_nulled() {
        let mut a = base_analysis();
        a.mbl_number = Some("MAERSK 263216729".to_string());
        repair_mbl(&mut a);
        assert_eq!(a.mbl_number, None);
    }

    #[test]
    fn mbl_with_letters_after_carrier_strip_survives() {
        let mut a = base_analysis();
        a.mbl_number = Some("MAERSK MAEU263216729".to_string());
        repair_mbl(&mut a);
        assert_eq!(a.mbl_number.as_deref(), Some("MAEU263216729"));
    }

    #[test]
    fn se_prefixed_mbl_relocates_to_work_order() {
        let mut a = base_analysis();
        a.mbl_number = Some("SEABC12345".to_string());
        repair_mbl(&mut a);
        assert_eq!(a.mbl_number, None);
        assert_eq!(a.work_order_number.as_deref(), Some("SEABC12345"));
    }

    #[test]
    fn nan_like_values_are_nulled() {
        let mut a = base_analysis();
        a.vessel_name = Some("N/A".to_string());
        denan_string_fields(&mut a);
        assert_eq!(a.vessel_name, None);
    }

    #[test]
    fn summary_truncates_with_ellipsis() {
        let mut a = base_analysis();
        a.summary = "x".repeat(200);
        truncate_summary(&mut a);
        assert_eq!(a.summary.chars().count(), SUMMARY_MAX_CHARS);
        assert!(a.summary.ends_with('\u{2026}'));
    }

    #[test]
    fn summary_under_limit_is_untouched() {
        let mut a = base_analysis();
        a.summary = "short".to_string();
        truncate_summary(&mut a);
        assert_eq!(a.summary, "short");
    }

    #[test]
    fn idempotent_on_already_sanitized_analysis() {
        let mut a = base_analysis();
        a.container_numbers = vec!["MSCU1234567".to_string()];
        a.mbl_number = Some("MAEU263216729".to_string());
        a.summary = "fine".to_string();
        sanitize(&mut a);
        let once = a.clone();
        sanitize(&mut a);
        assert_eq!(once.container_numbers, a.container_numbers);
        assert_eq!(once.mbl_number, a.mbl_number);
        assert_eq!(once.summary, a.summary);
    }

    #[test]
    fn splits_comma_separated_scalar() {
        assert_eq!(
            split_scalar_to_list("MSCU1234567, TCLU7654321"),
            vec!["MSCU1234567".to_string(), "TCLU7654321".to_string()]
        );
    }
}
