//! Stateless normalization and validation layer (spec §4.1).
//!
//! Applied to raw LLM output before schema validation, and again
//! defensively to pattern-derived output. Every function here is pure and
//! total: malformed input is repaired where the repair is unambiguous, and
//! nulled otherwise. Nothing in this crate ever returns an `Err` for bad
//! *data* — only [`NormalizeError`] for a misconfigured caller (e.g. an
//! invalid regex supplied to a table builder).

pub mod carrier;
pub mod container;
pub mod date_repair;
pub mod enum_map;
pub mod port;
pub mod sanitize;

pub use freightline_core::error::NormalizeError;

use freightline_core::model::ExtractedAnalysis;

/// Maximum length of a persisted `summary` (§4.1 "Field sanitizers").
pub const SUMMARY_MAX_CHARS: usize = 150;

/// Runs the full normalization pass over an already-parsed analysis:
/// enum canonicalization (a no-op here since fields are already typed
/// enums — see [`enum_map`] for the raw-string entry point used by the LLM
/// client before parsing), port/carrier/container-type string repair,
/// field sanitizers, and date validity screening (§4.1, §4.3 "Response
/// handling").
///
/// `subject` is the original message subject, used by [`date_repair`] to
/// detect and correct day/month transpositions. `year_min`/`year_max` are
/// the configured validity window (default 2024-2028, §8 invariant P2).
///
/// Idempotent (round-trip law R1): running this twice on its own output is
/// a no-op, because every repair it performs produces a value that would
/// pass its own checks unchanged.
pub fn normalize(
    mut analysis: ExtractedAnalysis,
    subject: &str,
    year_min: i32,
    year_max: i32,
) -> ExtractedAnalysis {
    analysis.por.location = analysis.por.location.take().map(|s| port::normalize(&s));
    analysis.pol.location = analysis.pol.location.take().map(|s| port::normalize(&s));
    analysis.pod.location = analysis.pod.location.take().map(|s| port::normalize(&s));
    analysis.pofd.location = analysis.pofd.location.take().map(|s| port::normalize(&s));

    analysis.carrier_name = analysis.carrier_name.take().map(|s| carrier::normalize(&s));
    analysis.container_type = analysis
        .container_type
        .take()
        .and_then(|s| container::normalize(&s));

    sanitize::sanitize(&mut analysis);

    date_repair::repair_all(&mut analysis, subject);
    date_repair::screen_validity(&mut analysis, year_min, year_max);
    date_repair::cross_validate(&mut analysis);

    analysis
}
