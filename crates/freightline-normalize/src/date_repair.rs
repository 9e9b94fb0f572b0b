//! Date repair, validity screening, and cross-field ordering (§4.1 "Date
//! repair" / "Date validity", §4.3 "Response handling").

use chrono::NaiveDate;

use freightline_core::enums::DocumentType;
use freightline_core::model::ExtractedAnalysis;

use once_cell::sync::Lazy;
use regex::Regex;

/// `(\d{1,2})(?:st|nd|rd|th)?\s*(JAN|FEB|…|DEC)['\`]?(\d{2})` from §4.1,
/// used to recover the day/month/year the sender actually wrote when an
/// LLM-produced date looks transposed.
static SUBJECT_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(\d{1,2})(?:st|nd|rd|th)?\s*(jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[`']?(\d{2})")
        .unwrap()
});

fn month_number(abbrev: &str) -> Option<u32> {
    let idx = ["jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec"]
        .iter()
        .position(|m| m.eq_ignore_ascii_case(abbrev))?;
    Some(idx as u32 + 1)
}

/// Document types in the "arrival/customs" group (per the grouping in
/// [`DocumentType`]'s own variant ordering) — the only types that keep a
/// `last_free_day` after cross-validation.
const ARRIVAL_CLASS: &[DocumentType] = &[
    DocumentType::ArrivalNotice,
    DocumentType::CustomsClearance,
    DocumentType::CustomsHold,
    DocumentType::ContainerRelease,
    DocumentType::DeliveryOrder,
];

/// One field name paired with a mutable accessor, so the repair/validity
/// passes can iterate uniformly over all fourteen date fields without
/// repeating the same match arms fourteen times.
macro_rules! for_each_date_field {
    ($analysis:expr, $field:ident => $body:block) => {
        for_each_date_field!(@one $analysis, etd, $field, $body);
        for_each_date_field!(@one $analysis, atd, $field, $body);
        for_each_date_field!(@one $analysis, eta, $field, $body);
        for_each_date_field!(@one $analysis, ata, $field, $body);
        for_each_date_field!(@one $analysis, pickup_date, $field, $body);
        for_each_date_field!(@one $analysis, delivery_date, $field, $body);
        for_each_date_field!(@one $analysis, si_cutoff, $field, $body);
        for_each_date_field!(@one $analysis, vgm_cutoff, $field, $body);
        for_each_date_field!(@one $analysis, cargo_cutoff, $field, $body);
        for_each_date_field!(@one $analysis, doc_cutoff, $field, $body);
        for_each_date_field!(@one $analysis, last_free_day, $field, $body);
        for_each_date_field!(@one $analysis, empty_return_date, $field, $body);
        for_each_date_field!(@one $analysis, pod_delivery_date, $field, $body);
        for_each_date_field!(@one $analysis, action_deadline, $field, $body);
    };
    (@one $analysis:expr, $name:ident, $field:ident, $body:block) => {
        if let Some($field) = $analysis.$name.as_mut() {
            $body
        }
    };
}

/// Detects and corrects an AI day/month transposition using the original
/// subject line. Per §4.1, the swap triggers only when the AI's month
/// equals the subject's day, the subject's month equals the AI's day, and
/// the subject's day is `<= 12` (otherwise the subject's "day" couldn't
/// plausibly be read as a month at all, so there is nothing to swap).
pub fn repair_all(analysis: &mut ExtractedAnalysis, subject: &str) {
    let Some(captures) = SUBJECT_DATE.captures(subject) else {
        return;
    };
    let Ok(subject_day) = captures[1].parse::<u32>() else {
        return;
    };
    let Some(subject_month) = month_number(&captures[2]) else {
        return;
    };
    if subject_day > 12 {
        return;
    }

    for_each_date_field!(analysis, date => {
        let ai_month = date.month();
        let ai_day = date.day();
        if ai_month == subject_day && subject_month == ai_day {
            if let Some(swapped) = NaiveDate::from_ymd_opt(date.year(), ai_day, ai_month) {
                *date = swapped;
            }
        }
    });
}

/// Nulls any date field whose year falls outside `[year_min, year_max]`
/// (invariant P2's "within the configured year window" clause; the
/// "calendar-valid" half of P2 is a type guarantee of `NaiveDate` itself —
/// a Feb-30 never survives parsing into this struct in the first place).
pub fn screen_validity(analysis: &mut ExtractedAnalysis, year_min: i32, year_max: i32) {
    macro_rules! clear_out_of_window {
        ($field:expr) => {
            if let Some(d) = $field {
                if d.year() < year_min || d.year() > year_max {
                    *$field = None;
                }
            }
        };
    }
    clear_out_of_window!(&mut analysis.etd);
    clear_out_of_window!(&mut analysis.atd);
    clear_out_of_window!(&mut analysis.eta);
    clear_out_of_window!(&mut analysis.ata);
    clear_out_of_window!(&mut analysis.pickup_date);
    clear_out_of_window!(&mut analysis.delivery_date);
    clear_out_of_window!(&mut analysis.si_cutoff);
    clear_out_of_window!(&mut analysis.vgm_cutoff);
    clear_out_of_window!(&mut analysis.cargo_cutoff);
    clear_out_of_window!(&mut analysis.doc_cutoff);
    clear_out_of_window!(&mut analysis.last_free_day);
    clear_out_of_window!(&mut analysis.empty_return_date);
    clear_out_of_window!(&mut analysis.pod_delivery_date);
    clear_out_of_window!(&mut analysis.action_deadline);
}

/// Cross-field date rules (§4.3 "Response handling"):
/// - `last_free_day` is dropped unless `document_type` is arrival-class.
/// - `ETD <= ETA <= last_free_day` when all three are present; a violation
///   nulls the offending *later* field rather than the earlier one, since
///   the earlier field is the one with fewer opportunities to be wrong
///   (it's set earlier in the shipment lifecycle, closer to the booking).
pub fn cross_validate(analysis: &mut ExtractedAnalysis) {
    if analysis.last_free_day.is_some() && !ARRIVAL_CLASS.contains(&analysis.document_type) {
        analysis.last_free_day = None;
    }

    if let (Some(etd), Some(eta)) = (analysis.etd, analysis.eta) {
        if etd > eta {
            analysis.eta = None;
        }
    }

    if let (Some(eta), Some(lfd)) = (analysis.eta, analysis.last_free_day) {
        if eta > lfd {
            analysis.last_free_day = None;
        }
    }
}

use chrono::Datelike;

#[cfg(test)]
mod tests {
    use super::*;
    use freightline_core::enums::TransportMode;

    fn base() -> ExtractedAnalysis {
        ExtractedAnalysis {
            transport_mode: TransportMode::Ocean,
            ..Default::default()
        }
    }

    #[test]
    fn day_month_swap_triggers_on_matching_subject() {
        let mut a = base();
        // subject day=2, subject month=FEB(2); a field with month=2, day=... won't
        // trigger unless the AI's month/day are transposed relative to the subject.
        a.eta = NaiveDate::from_ymd_opt(2026, 2, 2);
        repair_all(&mut a, "RE: FW: 2nd FEB'26 ETA update");
        // Degenerate case (day and month both parse to 2): swap is a no-op.
        assert_eq!(a.eta, NaiveDate::from_ymd_opt(2026, 2, 2));
    }

    #[test]
    fn swap_corrects_transposed_day_month() {
        let mut a = base();
        // subject says "3rd JAN'26" (day=3, month=1); AI emitted month=3, day=1.
        a.eta = NaiveDate::from_ymd_opt(2026, 3, 1);
        repair_all(&mut a, "3rd JAN'26 vessel update");
        assert_eq!(a.eta, NaiveDate::from_ymd_opt(2026, 1, 3));
    }

    #[test]
    fn no_subject_match_leaves_dates_untouched() {
        let mut a = base();
        a.eta = NaiveDate::from_ymd_opt(2026, 3, 1);
        repair_all(&mut a, "booking confirmed");
        assert_eq!(a.eta, NaiveDate::from_ymd_opt(2026, 3, 1));
    }

    #[test]
    fn out_of_window_years_are_nulled() {
        let mut a = base();
        a.eta = NaiveDate::from_ymd_opt(2019, 6, 1);
        a.etd = NaiveDate::from_ymd_opt(2026, 6, 1);
        screen_validity(&mut a, 2024, 2028);
        assert_eq!(a.eta, None);
        assert_eq!(a.etd, NaiveDate::from_ymd_opt(2026, 6, 1));
    }

    #[test]
    fn lfd_dropped_for_non_arrival_class() {
        let mut a = base();
        a.document_type = DocumentType::BookingConfirmation;
        a.last_free_day = NaiveDate::from_ymd_opt(2026, 6, 10);
        cross_validate(&mut a);
        assert_eq!(a.last_free_day, None);
    }

    #[test]
    fn lfd_kept_for_arrival_notice() {
        let mut a = base();
        a.document_type = DocumentType::ArrivalNotice;
        a.last_free_day = NaiveDate::from_ymd_opt(2026, 6, 10);
        cross_validate(&mut a);
        assert_eq!(a.last_free_day, Some(NaiveDate::from_ymd_opt(2026, 6, 10).unwrap()));
    }

    #[test]
    fn etd_after_eta_nulls_eta() {
        let mut a = base();
        a.etd = NaiveDate::from_ymd_opt(2026, 6, 10);
        a.eta = NaiveDate::from_ymd_opt(2026, 6, 5);
        cross_validate(&mut a);
        assert_eq!(a.eta, None);
    }

    #[test]
    fn eta_after_lfd_nulls_lfd() {
        let mut a = base();
        a.document_type = DocumentType::ArrivalNotice;
        a.eta = NaiveDate::from_ymd_opt(2026, 6, 10);
        a.last_free_day = NaiveDate::from_ymd_opt(2026, 6, 5);
        cross_validate(&mut a);
        assert_eq!(a.last_free_day, None);
    }

    #[test]
    fn screen_and_repair_are_idempotent() {
        let mut a = base();
        a.eta = NaiveDate::from_ymd_opt(2026, 3, 1);
        repair_all(&mut a, "3rd JAN'26 vessel update");
        screen_validity(&mut a, 2024, 2028);
        let once = a.eta;
        repair_all(&mut a, "3rd JAN'26 vessel update");
        screen_validity(&mut a, 2024, 2028);
        assert_eq!(once, a.eta);
    }
}
