//! Carrier name canonicalization (§4.1 "Carrier normalization").
//!
//! Maps known variants (legal-entity suffixes, abbreviations, local
//! spellings) to one of roughly fifteen canonical ocean/air carrier names.
//! Substring matching is deliberate: `"Maersk Line A/S"` and `"MAERSK"`
//! both need to land on `"Maersk"`.

use once_cell::sync::Lazy;

/// `(canonical name, substrings that identify it, all lowercase)`, checked
/// in order — first match wins, so more specific names are listed before
/// generic ones that could also match a substring of them.
static CANONICAL_CARRIERS: Lazy<Vec<(&'static str, Vec<&'static str>)>> = Lazy::new(|| {
    vec![
        ("Maersk", vec!["maersk"]),
        ("MSC", vec!["msc", "mediterranean shipping"]),
        ("CMA CGM", vec!["cma cgm", "cma-cgm"]),
        ("COSCO", vec!["cosco"]),
        ("Hapag-Lloyd", vec!["hapag"]),
        ("ONE", vec!["ocean network express", "one line"]),
        ("Evergreen", vec!["evergreen"]),
        ("Yang Ming", vec!["yang ming", "yangming"]),
        ("HMM", vec!["hmm", "hyundai merchant marine"]),
        ("ZIM", vec!["zim integrated", "zim line"]),
        ("Wan Hai", vec!["wan hai"]),
        ("PIL", vec!["pacific international lines", "pil"]),
        ("OOCL", vec!["oocl", "orient overseas"]),
        ("American President Lines", vec!["apl ", "american president"]),
        ("Emirates SkyCargo", vec!["emirates skycargo", "emirates sky cargo"]),
    ]
});

/// Normalizes a single carrier-name string. Returns the trimmed input
/// unchanged when nothing in the canonical list matches — unrecognized
/// carriers are still real data, just not canonicalized.
#[must_use]
pub fn normalize(raw: &str) -> String {
    let trimmed = raw.trim();
    let lower = trimmed.to_lowercase();

    for (canonical, substrings) in CANONICAL_CARRIERS.iter() {
        if substrings.iter().any(|s| lower.contains(s)) {
            return (*canonical).to_string();
        }
    }

    trimmed.to_string()
}
