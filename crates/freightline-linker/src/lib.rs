//! Shipment resolution: find-or-create, stage progression, auto-resolution
//! of open actions, flow validation, and known-values merge (§4.5).
//!
//! This crate holds no persistence of its own — every function takes the
//! candidate shipments/actions the caller (the store-backed processor)
//! already loaded, and returns a decision. The store is what actually
//! writes the result back.

use chrono::{DateTime, Utc};

use freightline_core::enums::{DocumentType, FlowCompatibility, Stage};
use freightline_core::model::{Action, ExtractedAnalysis, Shipment};
use freightline_rules::FlowRuleCache;

/// Finds the shipment `analysis` resolves to, by identifier priority
/// (§4.5 "Find-or-create" steps 1-4): booking number, then MBL, then work
/// order, then any container-number overlap. Returns `None` when nothing
/// matches (the caller creates a new shipment iff [`should_create`]).
#[must_use]
pub fn find_shipment<'a>(
    analysis: &ExtractedAnalysis,
    candidates: &'a [Shipment],
) -> Option<&'a Shipment> {
    if let Some(booking) = &analysis.booking_number {
        if let Some(s) = candidates.iter().find(|s| s.booking_number.as_deref() == Some(booking.as_str())) {
            return Some(s);
        }
    }
    if let Some(mbl) = &analysis.mbl_number {
        if let Some(s) = candidates.iter().find(|s| s.mbl_number.as_deref() == Some(mbl.as_str())) {
            return Some(s);
        }
    }
    if let Some(work_order) = &analysis.work_order_number {
        if let Some(s) = candidates
            .iter()
            .find(|s| s.work_order_number.as_deref() == Some(work_order.as_str()))
        {
            return Some(s);
        }
    }
    if !analysis.container_numbers.is_empty() {
        if let Some(s) = candidates.iter().find(|s| {
            s.container_numbers
                .iter()
                .any(|c| analysis.container_numbers.contains(c))
        }) {
            return Some(s);
        }
    }
    None
}

/// Whether a new shipment should be created for `analysis` when no
/// existing shipment was found (§4.5 "None - create a new shipment iff
/// `hasIdentifiers`").
#[must_use]
pub fn should_create(analysis: &ExtractedAnalysis) -> bool {
    analysis.has_identifiers()
}

/// Builds a brand-new shipment seeded from `analysis`, with the stage
/// derived from its document type (or [`Stage::Pending`] when the type
/// carries no stage signal).
#[must_use]
pub fn new_shipment(
    shipment_id: freightline_core::ids::ShipmentId,
    analysis: &ExtractedAnalysis,
    occurred_at: DateTime<Utc>,
) -> Shipment {
    let stage = Stage::for_document_type(analysis.document_type).unwrap_or(Stage::Pending);
    let mut shipment = Shipment {
        shipment_id,
        booking_number: analysis.booking_number.clone(),
        mbl_number: analysis.mbl_number.clone(),
        work_order_number: analysis.work_order_number.clone(),
        container_numbers: analysis.container_numbers.clone(),
        stage,
        stage_updated_at: occurred_at,
        stage_history: Vec::new(),
        etd: analysis.etd,
        eta: analysis.eta,
        si_cutoff: analysis.si_cutoff,
        vgm_cutoff: analysis.vgm_cutoff,
        cargo_cutoff: analysis.cargo_cutoff,
        doc_cutoff: analysis.doc_cutoff,
        last_free_day: analysis.last_free_day,
        vessel_name: analysis.vessel_name.clone(),
        carrier_name: analysis.carrier_name.clone(),
        shipper: analysis.shipper.clone(),
        consignee: analysis.consignee.clone(),
        notify: analysis.notify.clone(),
        last_activity_at: occurred_at,
    };
    shipment.stage_history.push(freightline_core::model::StageTransition {
        stage,
        triggering_document_type: analysis.document_type,
        occurred_at,
    });
    shipment
}

/// Merges non-null identifiers/dates/vessel/carrier/parties from `analysis`
/// onto `shipment`, and bumps `last_activity_at`. Later chronicles
/// unconditionally override earlier ones for any field they carry
/// (§4.5 "Known-values merge" — "later overrides earlier"); callers apply
/// chronicles to a shipment in `occurred_at` order to get that semantics.
pub fn merge_known_values(shipment: &mut Shipment, analysis: &ExtractedAnalysis, occurred_at: DateTime<Utc>) {
    macro_rules! merge {
        ($field:ident) => {
            if analysis.$field.is_some() {
                shipment.$field = analysis.$field.clone();
            }
        };
    }
    merge!(booking_number);
    merge!(mbl_number);
    merge!(work_order_number);
    merge!(etd);
    merge!(eta);
    merge!(si_cutoff);
    merge!(vgm_cutoff);
    merge!(cargo_cutoff);
    merge!(doc_cutoff);
    merge!(last_free_day);
    merge!(vessel_name);
    merge!(carrier_name);

    if !analysis.container_numbers.is_empty() {
        for c in &analysis.container_numbers {
            if !shipment.container_numbers.contains(c) {
                shipment.container_numbers.push(c.clone());
            }
        }
    }
    if analysis.shipper.name.is_some() {
        shipment.shipper = analysis.shipper.clone();
    }
    if analysis.consignee.name.is_some() {
        shipment.consignee = analysis.consignee.clone();
    }
    if analysis.notify.name.is_some() {
        shipment.notify = analysis.notify.clone();
    }

    if occurred_at > shipment.last_activity_at {
        shipment.last_activity_at = occurred_at;
    }
}

/// Advances `shipment`'s stage per the document type, if applicable
/// (§4.5 "Stage progression", invariant P4). Delegates to
/// [`Shipment::advance_stage`], which already enforces the monotone order.
pub fn advance_stage(
    shipment: &mut Shipment,
    analysis: &ExtractedAnalysis,
    occurred_at: DateTime<Utc>,
) -> bool {
    match Stage::for_document_type(analysis.document_type) {
        Some(candidate) => shipment.advance_stage(candidate, analysis.document_type, occurred_at),
        None => false,
    }
}

/// Review reasons a flow-validation / confidence check can attach to a
/// chronicle (§4.5 "Flow validation").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewReason {
    ImpossibleFlow,
    UnexpectedFlow,
    LowConfidence,
}

impl ReviewReason {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ImpossibleFlow => "impossible_flow",
            Self::UnexpectedFlow => "unexpected_flow",
            Self::LowConfidence => "low_confidence",
        }
    }
}

/// Confidence threshold below which a chronicle is flagged regardless of
/// flow compatibility (§4.5 "Flow validation": "Confidence < 60 also marks
/// `low_confidence`").
pub const LOW_CONFIDENCE_REVIEW_THRESHOLD: u8 = 60;

/// Runs flow validation for an incoming document against the shipment's
/// current stage, plus the confidence-based review flag (§4.5).
#[must_use]
pub fn flow_validate(
    flow_rules: &FlowRuleCache,
    stage: Stage,
    document_type: DocumentType,
    confidence: Option<u8>,
) -> Vec<ReviewReason> {
    let mut reasons = Vec::new();
    match flow_rules.lookup(stage, document_type) {
        FlowCompatibility::Impossible => reasons.push(ReviewReason::ImpossibleFlow),
        FlowCompatibility::Unexpected => reasons.push(ReviewReason::UnexpectedFlow),
        FlowCompatibility::Expected => {}
    }
    if confidence.is_some_and(|c| c < LOW_CONFIDENCE_REVIEW_THRESHOLD) {
        reasons.push(ReviewReason::LowConfidence);
    }
    reasons
}

/// Selects the open actions on a shipment that a confirmation-class
/// document type auto-resolves (§4.5 "Auto-resolution"): actions whose
/// description matches (case-insensitively, substring) any of the
/// document type's resolution keywords. Non-confirmation types resolve
/// nothing (`resolution_keywords()` is empty for them).
#[must_use]
pub fn actions_to_resolve<'a>(
    document_type: DocumentType,
    open_actions: &'a [Action],
) -> Vec<&'a Action> {
    let keywords = document_type.resolution_keywords();
    if keywords.is_empty() {
        return Vec::new();
    }
    open_actions
        .iter()
        .filter(|a| a.is_open())
        .filter(|a| {
            let desc = a.description.to_lowercase();
            keywords.iter().any(|k| desc.contains(&k.to_lowercase()))
        })
        .collect()
}

/// Closes `action` as of `occurred_at` (§4.5 "Closure sets the completion
/// timestamp to the message's `occurredAt`", invariant P7).
pub fn close_action(action: &mut Action, occurred_at: DateTime<Utc>) {
    action.completed_at = Some(occurred_at);
}

#[cfg(test)]
mod tests {
    use super::*;
    use freightline_core::enums::TransportMode;
    use freightline_core::ids::{ActionId, ChronicleId, ShipmentId};
    use std::time::Duration;

    fn shipment(id: &str) -> Shipment {
        Shipment {
            shipment_id: ShipmentId::new(id),
            booking_number: None,
            mbl_number: None,
            work_order_number: None,
            container_numbers: vec![],
            stage: Stage::Pending,
            stage_updated_at: Utc::now(),
            stage_history: vec![],
            etd: None,
            eta: None,
            si_cutoff: None,
            vgm_cutoff: None,
            cargo_cutoff: None,
            doc_cutoff: None,
            last_free_day: None,
            vessel_name: None,
            carrier_name: None,
            shipper: Default::default(),
            consignee: Default::default(),
            notify: Default::default(),
            last_activity_at: Utc::now(),
        }
    }

    fn analysis() -> ExtractedAnalysis {
        ExtractedAnalysis {
            transport_mode: TransportMode::Ocean,
            ..Default::default()
        }
    }

    #[test]
    fn booking_number_exact_match_wins() {
        let mut s1 = shipment("s1");
        s1.booking_number = Some("BKG1".to_string());
        let s2 = shipment("s2");
        let mut a = analysis();
        a.booking_number = Some("BKG1".to_string());
        let found = find_shipment(&a, &[s2, s1]).unwrap();
        assert_eq!(found.shipment_id.as_str(), "s1");
    }

    #[test]
    fn container_overlap_matches() {
        let mut s1 = shipment("s1");
        s1.container_numbers = vec!["MSCU1234567".to_string()];
        let mut a = analysis();
        a.container_numbers = vec!["MSCU1234567".to_string(), "TCLU7654321".to_string()];
        let found = find_shipment(&a, &[s1]).unwrap();
        assert_eq!(found.shipment_id.as_str(), "s1");
    }

    #[test]
    fn no_identifiers_does_not_create() {
        let a = analysis();
        assert!(!should_create(&a));
    }

    #[test]
    fn has_booking_creates() {
        let mut a = analysis();
        a.booking_number = Some("BKG1".to_string());
        assert!(should_create(&a));
    }

    #[test]
    fn new_shipment_stage_derives_from_document_type() {
        let mut a = analysis();
        a.document_type = DocumentType::BookingConfirmation;
        a.booking_number = Some("BKG1".to_string());
        let s = new_shipment(ShipmentId::new("s1"), &a, Utc::now());
        assert_eq!(s.stage, Stage::Booked);
    }

    #[test]
    fn stage_only_advances_forward() {
        let mut s = shipment("s1");
        s.stage = Stage::Departed;
        let mut a = analysis();
        a.document_type = DocumentType::BookingConfirmation; // maps to Booked, earlier
        let advanced = advance_stage(&mut s, &a, Utc::now());
        assert!(!advanced);
        assert_eq!(s.stage, Stage::Departed);
    }

    #[test]
    fn known_values_merge_overrides_and_bumps_activity() {
        let mut s = shipment("s1");
        let base_time = Utc::now();
        s.last_activity_at = base_time - chrono::Duration::days(5);
        let mut a = analysis();
        a.vessel_name = Some("Ever Given".to_string());
        merge_known_values(&mut s, &a, base_time);
        assert_eq!(s.vessel_name.as_deref(), Some("Ever Given"));
        assert_eq!(s.last_activity_at, base_time);
    }

    #[test]
    fn vgm_confirmation_resolves_matching_action() {
        let action = Action {
            action_id: ActionId::new("a1"),
            shipment_id: ShipmentId::new("s1"),
            chronicle_id: ChronicleId::new("c1"),
            description: "Submit VGM before cutoff".to_string(),
            owner: Default::default(),
            priority: freightline_core::enums::ActionPriority::Medium,
            deadline: None,
            opened_at: Utc::now(),
            completed_at: None,
        };
        let resolved = actions_to_resolve(DocumentType::VgmConfirmation, &[action]);
        assert_eq!(resolved.len(), 1);
    }

    #[test]
    fn non_confirmation_type_resolves_nothing() {
        let action = Action {
            action_id: ActionId::new("a1"),
            shipment_id: ShipmentId::new("s1"),
            chronicle_id: ChronicleId::new("c1"),
            description: "Submit VGM before cutoff".to_string(),
            owner: Default::default(),
            priority: freightline_core::enums::ActionPriority::Medium,
            deadline: None,
            opened_at: Utc::now(),
            completed_at: None,
        };
        let resolved = actions_to_resolve(DocumentType::Invoice, &[action]);
        assert!(resolved.is_empty());
    }

    #[test]
    fn close_action_sets_completion_timestamp() {
        let mut action = Action {
            action_id: ActionId::new("a1"),
            shipment_id: ShipmentId::new("s1"),
            chronicle_id: ChronicleId::new("c1"),
            description: "Submit VGM".to_string(),
            owner: Default::default(),
            priority: freightline_core::enums::ActionPriority::Medium,
            deadline: None,
            opened_at: Utc::now(),
            completed_at: None,
        };
        let occurred_at = Utc::now() + chrono::Duration::from_std(Duration::from_secs(60)).unwrap();
        close_action(&mut action, occurred_at);
        assert_eq!(action.completed_at, Some(occurred_at));
        assert!(!action.is_open());
    }

    #[test]
    fn flow_validate_flags_impossible_and_low_confidence() {
        let cache = FlowRuleCache::new(Duration::from_secs(300));
        cache.load(vec![freightline_core::model::FlowRule {
            stage: Stage::Delivered,
            document_type: DocumentType::BookingRequest,
            compatibility: FlowCompatibility::Impossible,
        }]);
        let reasons = flow_validate(&cache, Stage::Delivered, DocumentType::BookingRequest, Some(40));
        assert!(reasons.contains(&ReviewReason::ImpossibleFlow));
        assert!(reasons.contains(&ReviewReason::LowConfidence));
    }

    #[test]
    fn flow_validate_clean_when_expected_and_confident() {
        let cache = FlowRuleCache::new(Duration::from_secs(300));
        cache.load(vec![]);
        let reasons = flow_validate(&cache, Stage::Pending, DocumentType::BookingRequest, Some(90));
        assert!(reasons.is_empty());
    }
}
