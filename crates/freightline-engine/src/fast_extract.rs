//! Regex-based identifier/date extraction for the pattern-matched fast
//! path (§4.7 step 5: the LLM is skipped once the pattern matcher alone
//! accepts a match, but §8 scenario S1 still expects a persisted
//! `booking_number` and `vgm_cutoff` on exactly that chronicle). See
//! DESIGN.md, "Identifier extraction on the accepted-pattern-match path".
//!
//! Deliberately separate from `freightline-patterns`: the pattern matcher's
//! contract is classification-only (§4.2), and a config-driven `Pattern`
//! row has nowhere to declare which capture group means what. This module
//! never classifies anything; it only pulls obvious values out of text
//! that's already been accepted as a known document type.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

static BOOKING_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bBKG[\s#:-]*([0-9]{6,12})\b").unwrap());

static CONTAINER_NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b([A-Z]{4}[0-9]{7})\b").unwrap());

static VGM_CUTOFF: Lazy<Regex> = Lazy::new(|| labeled_date(r"VGM\s*CUTOFF"));
static SI_CUTOFF: Lazy<Regex> = Lazy::new(|| labeled_date(r"SI\s*CUTOFF"));
static CARGO_CUTOFF: Lazy<Regex> = Lazy::new(|| labeled_date(r"CARGO\s*CUTOFF"));
static DOC_CUTOFF: Lazy<Regex> = Lazy::new(|| labeled_date(r"DOC(?:UMENTATION)?\s*CUTOFF"));
static ETA: Lazy<Regex> = Lazy::new(|| labeled_date(r"\bETA\b"));
static ETD: Lazy<Regex> = Lazy::new(|| labeled_date(r"\bETD\b"));

fn labeled_date(label: &str) -> Regex {
    Regex::new(&format!(r"(?i){label}\D{{0,10}}(\d{{4}}-\d{{2}}-\d{{2}})")).expect("static regex")
}

/// Everything this pass can populate without the LLM. Every other
/// `ExtractedAnalysis` field stays at its default on the pattern-matched
/// path (§4.2's contract doesn't cover them, and nothing downstream needs
/// them when the document type was already decided by the pattern).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FastExtracted {
    pub booking_number: Option<String>,
    pub container_numbers: Vec<String>,
    pub vgm_cutoff: Option<NaiveDate>,
    pub si_cutoff: Option<NaiveDate>,
    pub cargo_cutoff: Option<NaiveDate>,
    pub doc_cutoff: Option<NaiveDate>,
    pub eta: Option<NaiveDate>,
    pub etd: Option<NaiveDate>,
}

/// Scans `subject`, `body`, and attachment text for obvious identifiers and
/// labeled cutoff/ETA/ETD dates. Malformed dates are skipped rather than
/// erroring, matching the normalizer's own "null what doesn't parse" policy
/// (§4.1) — this is a best-effort supplement, not a validator.
#[must_use]
pub fn extract(subject: &str, body: &str, attachment_texts: &[String]) -> FastExtracted {
    let combined = combined_text(subject, body, attachment_texts);

    FastExtracted {
        booking_number: first_capture(&BOOKING_NUMBER, &combined),
        container_numbers: all_captures(&CONTAINER_NUMBER, &combined),
        vgm_cutoff: first_date(&VGM_CUTOFF, &combined),
        si_cutoff: first_date(&SI_CUTOFF, &combined),
        cargo_cutoff: first_date(&CARGO_CUTOFF, &combined),
        doc_cutoff: first_date(&DOC_CUTOFF, &combined),
        eta: first_date(&ETA, &combined),
        etd: first_date(&ETD, &combined),
    }
}

fn combined_text(subject: &str, body: &str, attachment_texts: &[String]) -> String {
    let mut combined = String::with_capacity(subject.len() + body.len() + 64);
    combined.push_str(subject);
    combined.push('\n');
    combined.push_str(body);
    for text in attachment_texts {
        combined.push('\n');
        combined.push_str(text);
    }
    combined
}

fn first_capture(re: &Regex, haystack: &str) -> Option<String> {
    re.captures(haystack).and_then(|c| c.get(1)).map(|m| m.as_str().to_string())
}

fn all_captures(re: &Regex, haystack: &str) -> Vec<String> {
    re.captures_iter(haystack).filter_map(|c| c.get(1)).map(|m| m.as_str().to_string()).collect()
}

fn first_date(re: &Regex, haystack: &str) -> Option<NaiveDate> {
    let raw = first_capture(re, haystack)?;
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_s1_pulls_booking_number_and_vgm_cutoff() {
        let extracted = extract(
            "BKG 2038256270 confirmed",
            "",
            &["VGM CUTOFF 2026-01-15".to_string()],
        );
        assert_eq!(extracted.booking_number.as_deref(), Some("2038256270"));
        assert_eq!(extracted.vgm_cutoff, Some(NaiveDate::from_ymd_opt(2026, 1, 15).unwrap()));
    }

    #[test]
    fn container_numbers_collects_every_match() {
        let extracted = extract(
            "Gate-in notice",
            "Containers MSCU1234567 and TCLU7654321 have arrived.",
            &[],
        );
        assert_eq!(
            extracted.container_numbers,
            vec!["MSCU1234567".to_string(), "TCLU7654321".to_string()]
        );
    }

    #[test]
    fn no_identifiers_present_returns_defaults() {
        let extracted = extract("Hello", "Just checking in.", &[]);
        assert_eq!(extracted, FastExtracted::default());
    }

    #[test]
    fn malformed_date_is_skipped_not_erroring() {
        let extracted = extract("ETA TBD", "ETA not yet confirmed", &[]);
        assert!(extracted.eta.is_none());
    }
}
