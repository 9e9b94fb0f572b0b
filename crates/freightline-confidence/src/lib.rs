//! Confidence scoring and escalation recommendation (spec §4.4).
//!
//! A pure scoring function: no I/O, no mutation of the analysis it scores.
//! Callers (the processor) own the escalation loop — re-invoking the LLM
//! extractor at a stronger model tier and replacing the analysis in place.

use freightline_core::enums::DocumentType;
use freightline_core::model::ExtractedAnalysis;

/// Weighted signal contributions (§4.4 "Signals (weighted)"). Chosen so the
/// maximum attainable score is 100: `BASE + PATTERN_AGREEMENT + FIELD_COVERAGE
/// + SENDER_HISTORY + STRUCTURAL == 100`, leaving room only for the repair
/// penalty to push a perfect-signal analysis below 100.
const BASE: f64 = 20.0;
const PATTERN_AGREEMENT_WEIGHT: f64 = 15.0;
const FIELD_COVERAGE_WEIGHT: f64 = 30.0;
const SENDER_HISTORY_WEIGHT: f64 = 20.0;
const STRUCTURAL_WEIGHT: f64 = 15.0;
/// Penalty per normalizer repair (§4.4 "Penalty for normalizer repairs
/// triggered (each repair - small amount)"), capped at 5 repairs so a
/// single pathological message can't drive the score negative on its own.
const REPAIR_PENALTY_PER_UNIT: f64 = 4.0;
const REPAIR_PENALTY_CAP: u32 = 5;

/// Short messages skip confidence scoring entirely (§4.4 Policy, §8
/// boundary behavior): `body + attachment < 50 chars`.
pub const SHORT_MESSAGE_CHAR_THRESHOLD: usize = 50;

/// Everything the scorer needs about one analysis attempt (§4.4 "Signals").
#[derive(Debug, Clone)]
pub struct ConfidenceInput<'a> {
    pub analysis: &'a ExtractedAnalysis,
    /// Whether the pattern matcher's candidate classification (if any)
    /// agrees with the classification actually being scored.
    pub pattern_agreement: bool,
    /// Rolling historical accuracy (0.0-1.0) for this sender's domain, from
    /// `LearningEpisode`s; `None` when there's no history yet.
    pub sender_domain_accuracy: Option<f64>,
    /// Number of fields the normalizer repaired or nulled on this pass.
    pub repairs_applied: u32,
    /// `message.combined_text_len()` (body + attachment text).
    pub message_combined_len: usize,
}

/// Outcome of a confidence-scoring pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceOutcome {
    /// `None` when scoring was skipped (short message, §4.4 Policy).
    pub score: Option<u8>,
    pub recommendation: freightline_core::enums::Recommendation,
}

/// Per-`document_type` table of fields a well-formed analysis of that type
/// is expected to carry (§4.4 "per-type coverage table"). Empty slice means
/// "no specific expectations beyond the always-required schema fields" —
/// coverage defaults to full in that case so the signal doesn't penalize
/// types with no distinguishing fields.
fn expected_fields(doc_type: DocumentType) -> &'static [Field] {
    use DocumentType as D;
    use Field::*;
    match doc_type {
        D::BookingConfirmation | D::BookingRequest | D::BookingAmendment => {
            &[BookingNumber, Pol, Pod]
        }
        D::ArrivalNotice => &[Eta, Pod],
        D::VgmSubmission | D::VgmConfirmation => &[ContainerNumbers, VgmCutoff],
        D::SiSubmission | D::SiConfirmation => &[SiCutoff],
        D::DraftBl | D::FinalBl | D::BlConfirmation | D::SeaWaybill => &[MblOrHbl],
        D::TelexRelease | D::SobConfirmation | D::LeoCopy => &[MblOrHbl],
        D::ContainerRelease | D::DeliveryOrder => &[ContainerNumbers, LastFreeDay],
        D::Invoice | D::PaymentConfirmation | D::CreditNote => &[InvoiceNumber, Amount],
        D::ScheduleUpdate | D::VesselUpdate | D::RolloverNotice | D::DelayNotice => &[Eta],
        D::CustomsClearance | D::CustomsHold => &[Pod],
        _ => &[],
    }
}

#[derive(Debug, Clone, Copy)]
enum Field {
    BookingNumber,
    Pol,
    Pod,
    Eta,
    ContainerNumbers,
    VgmCutoff,
    SiCutoff,
    MblOrHbl,
    LastFreeDay,
    InvoiceNumber,
    Amount,
}

fn field_present(analysis: &ExtractedAnalysis, field: Field) -> bool {
    match field {
        Field::BookingNumber => analysis.booking_number.is_some(),
        Field::Pol => analysis.pol.location.is_some(),
        Field::Pod => analysis.pod.location.is_some(),
        Field::Eta => analysis.eta.is_some(),
        Field::ContainerNumbers => !analysis.container_numbers.is_empty(),
        Field::VgmCutoff => analysis.vgm_cutoff.is_some(),
        Field::SiCutoff => analysis.si_cutoff.is_some(),
        Field::MblOrHbl => analysis.mbl_number.is_some() || analysis.hbl_number.is_some(),
        Field::LastFreeDay => analysis.last_free_day.is_some(),
        Field::InvoiceNumber => analysis.invoice_number.is_some(),
        Field::Amount => analysis.amount.is_some(),
    }
}

/// Fraction of this document type's expected fields that are present
/// (1.0 when the type has no specific expectations).
fn field_coverage_fraction(analysis: &ExtractedAnalysis) -> f64 {
    let fields = expected_fields(analysis.document_type);
    if fields.is_empty() {
        return 1.0;
    }
    let present = fields.iter().filter(|f| field_present(analysis, **f)).count();
    present as f64 / fields.len() as f64
}

/// Fraction of present identifier-shaped fields that pass their structural
/// validator (§4.4 "Structural validators (regex shapes for container,
/// MBL, booking)"). Returns 1.0 when no identifiers are present to check.
fn structural_validity_fraction(analysis: &ExtractedAnalysis) -> f64 {
    let mut checked = 0usize;
    let mut valid = 0usize;

    if let Some(booking) = &analysis.booking_number {
        checked += 1;
        if booking.chars().all(|c| c.is_ascii_alphanumeric()) && !booking.is_empty() {
            valid += 1;
        }
    }
    if let Some(mbl) = &analysis.mbl_number {
        checked += 1;
        if !mbl.chars().all(|c| c.is_ascii_digit()) && !mbl.is_empty() {
            valid += 1;
        }
    }
    if !analysis.container_numbers.is_empty() {
        checked += analysis.container_numbers.len();
        valid += analysis
            .container_numbers
            .iter()
            .filter(|c| c.len() == 11 && c[..4].chars().all(|ch| ch.is_ascii_uppercase()))
            .count();
    }

    if checked == 0 {
        1.0
    } else {
        valid as f64 / checked as f64
    }
}

/// Scores one analysis attempt and recommends a next step (§4.4).
#[must_use]
pub fn score(input: &ConfidenceInput<'_>) -> ConfidenceOutcome {
    if input.message_combined_len < SHORT_MESSAGE_CHAR_THRESHOLD {
        return ConfidenceOutcome {
            score: None,
            recommendation: freightline_core::enums::Recommendation::Accept,
        };
    }

    let mut total = BASE;
    if input.pattern_agreement {
        total += PATTERN_AGREEMENT_WEIGHT;
    }
    total += FIELD_COVERAGE_WEIGHT * field_coverage_fraction(input.analysis);
    total += SENDER_HISTORY_WEIGHT * input.sender_domain_accuracy.unwrap_or(0.5);
    total += STRUCTURAL_WEIGHT * structural_validity_fraction(input.analysis);
    total -= REPAIR_PENALTY_PER_UNIT * f64::from(input.repairs_applied.min(REPAIR_PENALTY_CAP));

    let score = total.round().clamp(0.0, 100.0) as u8;

    let recommendation = recommend(score, input.analysis.document_type);

    ConfidenceOutcome { score: Some(score), recommendation }
}

/// Maps a numeric score to a recommendation (§4.4 "Outcome" thresholds),
/// with non-shipping document types clamped so they never escalate (§4.4
/// Policy: "there is nothing further to extract").
fn recommend(
    score: u8,
    doc_type: DocumentType,
) -> freightline_core::enums::Recommendation {
    use freightline_core::enums::Recommendation as R;

    let raw = match score {
        80..=100 => R::Accept,
        60..=79 => R::FlagReview,
        40..=59 => R::EscalateSonnet,
        _ => R::EscalateOpus,
    };

    if doc_type.is_non_shipping() {
        match raw {
            R::EscalateSonnet | R::EscalateOpus => R::FlagReview,
            other => other,
        }
    } else {
        raw
    }
}
