//! Port/location string normalization (§4.1 "Port normalization").
//!
//! Accepts whatever free-form text the LLM or a pattern rule produced and
//! tries to land on a 5-letter UN/LOCODE. Falls back to returning the
//! trimmed input unchanged when nothing is recognized — normalization
//! never raises.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

static LOCODE_SHAPE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z]{5}$").unwrap());

/// Sentinel strings the LLM sometimes emits in place of a genuine null.
const SENTINELS: &[&str] = &["<UNKNOWN>", "UNKNOWN", "N/A", "NA", "NONE", "null", "-"];

/// Known city/port names mapped to their UN/LOCODE. Not exhaustive; covers
/// the ports that recur in freight-forwarder correspondence. Matching is
/// case-insensitive and tolerant of a trailing country suffix
/// (`"Shanghai, China"` still matches `"shanghai"`).
static KNOWN_PORTS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("shanghai", "CNSHA"),
        ("ningbo", "CNNGB"),
        ("shenzhen", "CNSZX"),
        ("yantian", "CNYTN"),
        ("qingdao", "CNTAO"),
        ("xiamen", "CNXMN"),
        ("hong kong", "HKHKG"),
        ("singapore", "SGSIN"),
        ("busan", "KRPUS"),
        ("ho chi minh", "VNSGN"),
        ("laem chabang", "THLCH"),
        ("jebel ali", "AEJEA"),
        ("nhava sheva", "INNSA"),
        ("mundra", "INMUN"),
        ("chennai", "INMAA"),
        ("los angeles", "USLAX"),
        ("long beach", "USLGB"),
        ("oakland", "USOAK"),
        ("new york", "USNYC"),
        ("savannah", "USSAV"),
        ("houston", "USHOU"),
        ("rotterdam", "NLRTM"),
        ("hamburg", "DEHAM"),
        ("antwerp", "BEANR"),
        ("felixstowe", "GBFXT"),
    ])
});

/// Normalizes a single port/location string. Strips recognized sentinel
/// values to an empty string (callers treat that as "no location"),
/// recognizes known city names, passes through anything already shaped
/// like a UN/LOCODE, and otherwise returns the input trimmed.
///
/// Idempotent: a UN/LOCODE or already-sentinel-free trimmed string maps to
/// itself (round-trip law R1).
#[must_use]
pub fn normalize(raw: &str) -> String {
    let trimmed = raw.trim();

    if SENTINELS
        .iter()
        .any(|s| s.eq_ignore_ascii_case(trimmed))
    {
        return String::new();
    }

    let upper = trimmed.to_uppercase();
    if LOCODE_SHAPE.is_match(&upper) {
        return upper;
    }

    let lower = trimmed.to_lowercase();
    for (city, code) in KNOWN_PORTS.iter() {
        if lower.contains(city) {
            return (*code).to_string();
        }
    }

    trimmed.to_string()
}

/// Normalizes a free-form string or a single-element list. Extra elements
/// beyond the first are dropped — callers that truly have multiple
/// locations use separate routing-point fields (§6 "4-point routing"),
/// not a list within one.
#[must_use]
pub fn normalize_one_of(values: &[String]) -> String {
    values.first().map(|s| normalize(s)).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognizes_known_city() {
        assert_eq!(normalize("Shanghai, China"), "CNSHA");
        assert_eq!(normalize("shanghai"), "CNSHA");
    }

    #[test]
    fn passes_through_existing_locode() {
        assert_eq!(normalize("USLAX"), "USLAX");
        assert_eq!(normalize("uslax"), "USLAX");
    }

    #[test]
    fn strips_sentinels() {
        assert_eq!(normalize("<UNKNOWN>"), "");
        assert_eq!(normalize("N/A"), "");
    }

    #[test]
    fn unrecognized_text_passes_through_trimmed() {
        assert_eq!(normalize("  Some Random Depot  "), "Some Random Depot");
    }

    #[test]
    fn idempotent() {
        let once = normalize("Rotterdam port, NL");
        let twice = normalize(&once);
        assert_eq!(once, twice);
    }
}
