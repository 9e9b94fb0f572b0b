//! Entities from spec §3, plus the `ExtractedAnalysis` schema from §6.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::enums::{
    ActionOwner, ActionPriority, ConfidenceSource, CutoffField, DeadlineType, Direction,
    DocumentType, FlowCompatibility, FromParty, IdentifierSource, IssueType, LocationType,
    MessageType, PatternType, Sentiment, Stage, TransportMode,
};
use crate::ids::{ActionId, ChronicleId, MessageId, ShipmentId, ThreadId};

/// A PDF (or other) attachment on a message (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub filename: String,
    pub mime_type: String,
    pub size_bytes: u64,
    /// Text extracted by the external `PdfExtractor`, bounded to a maximum
    /// character count by the processor (§4.7 step 3).
    pub extracted_text: Option<String>,
}

/// Maximum characters of extracted attachment text kept by the processor.
pub const ATTACHMENT_TEXT_MAX_CHARS: usize = 20_000;

impl Attachment {
    #[must_use]
    pub fn new(filename: impl Into<String>, mime_type: impl Into<String>, size_bytes: u64) -> Self {
        Self {
            filename: filename.into(),
            mime_type: mime_type.into(),
            size_bytes,
            extracted_text: None,
        }
    }

    /// Truncates `text` to `ATTACHMENT_TEXT_MAX_CHARS` and stores it.
    pub fn set_extracted_text(&mut self, text: String) {
        let truncated: String = text.chars().take(ATTACHMENT_TEXT_MAX_CHARS).collect();
        self.extracted_text = Some(truncated);
    }
}

/// Immutable ingest record (§3). `message_id` is the idempotency key (P1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub message_id: MessageId,
    pub thread_id: ThreadId,
    pub subject: String,
    pub body: String,
    pub sender_address: String,
    pub received_at: chrono::DateTime<chrono::Utc>,
    pub direction: Direction,
    pub attachments: Vec<Attachment>,
}

impl Message {
    /// 1 for the first message in a thread, 2+ for replies/forwards.
    /// Callers supply this from thread history; it is not self-describing.
    #[must_use]
    pub fn combined_text_len(&self) -> usize {
        let attachment_len: usize = self
            .attachments
            .iter()
            .filter_map(|a| a.extracted_text.as_ref())
            .map(|t| t.len())
            .sum();
        self.body.len() + attachment_len
    }

    #[must_use]
    pub fn has_attachment(&self) -> bool {
        !self.attachments.is_empty()
    }
}

/// A name/address/contact triple for a party referenced in an analysis (§6).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PartyContact {
    pub name: Option<String>,
    pub address: Option<String>,
    pub contact: Option<String>,
}

/// A routing point: location + its type (§6 "4-point routing").
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RoutingPoint {
    pub location: Option<String>,
    pub location_type: Option<LocationType>,
}

/// The structured extraction result (§3, schema in §6).
///
/// Dates are `NaiveDate` so invariant P2 (calendar-valid ISO date) is a type
/// guarantee once constructed; the normalizer is responsible for getting raw
/// strings into this shape or nulling them (§4.1 "Failure model").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractedAnalysis {
    pub transport_mode: TransportMode,

    // Identifiers
    pub booking_number: Option<String>,
    pub mbl_number: Option<String>,
    pub hbl_number: Option<String>,
    pub container_numbers: Vec<String>,
    pub mawb_number: Option<String>,
    pub hawb_number: Option<String>,
    pub work_order_number: Option<String>,
    pub pro_number: Option<String>,
    pub reference_numbers: Vec<String>,
    pub identifier_source: Option<IdentifierSource>,

    pub document_type: DocumentType,
    pub from_party: FromParty,

    // 4-point routing
    pub por: RoutingPoint,
    pub pol: RoutingPoint,
    pub pod: RoutingPoint,
    pub pofd: RoutingPoint,

    // Vessel / carrier
    pub vessel_name: Option<String>,
    pub voyage_number: Option<String>,
    pub flight_number: Option<String>,
    pub carrier_name: Option<String>,

    // Dates
    pub etd: Option<NaiveDate>,
    pub atd: Option<NaiveDate>,
    pub eta: Option<NaiveDate>,
    pub ata: Option<NaiveDate>,
    pub pickup_date: Option<NaiveDate>,
    pub delivery_date: Option<NaiveDate>,
    pub si_cutoff: Option<NaiveDate>,
    pub vgm_cutoff: Option<NaiveDate>,
    pub cargo_cutoff: Option<NaiveDate>,
    pub doc_cutoff: Option<NaiveDate>,
    pub last_free_day: Option<NaiveDate>,
    pub empty_return_date: Option<NaiveDate>,
    pub pod_delivery_date: Option<NaiveDate>,
    pub action_deadline: Option<NaiveDate>,

    // Cargo
    pub container_type: Option<String>,
    pub weight: Option<String>,
    pub pieces: Option<u32>,
    pub commodity: Option<String>,

    // Parties
    pub shipper: PartyContact,
    pub consignee: PartyContact,
    pub notify: PartyContact,

    // Financial
    pub invoice_number: Option<String>,
    pub amount: Option<f64>,
    pub currency: Option<String>,

    // Intelligence
    pub message_type: MessageType,
    pub sentiment: Sentiment,
    /// Truncated to 150 characters with an ellipsis by the normalizer.
    pub summary: String,
    pub has_action: bool,
    pub action_description: Option<String>,
    pub action_owner: Option<ActionOwner>,
    pub action_priority: Option<ActionPriority>,
    pub has_issue: bool,
    pub issue_type: Option<IssueType>,
    pub issue_description: Option<String>,
}

impl ExtractedAnalysis {
    /// Required fields per the tool-call schema (§6): presence is enforced
    /// by the LLM client at parse time, not here; this just names them for
    /// validators and tests that need to cross-check.
    pub const REQUIRED_FIELD_NAMES: &'static [&'static str] = &[
        "transport_mode",
        "identifier_source",
        "document_type",
        "from_party",
        "message_type",
        "sentiment",
        "summary",
        "has_action",
        "has_issue",
    ];

    /// Collects every non-null date on the analysis, paired with the field
    /// name, for date-validity and ordering checks (§4.1, §4.3).
    #[must_use]
    pub fn dated_fields(&self) -> Vec<(&'static str, NaiveDate)> {
        let mut out = Vec::new();
        macro_rules! push {
            ($field:ident) => {
                if let Some(d) = self.$field {
                    out.push((stringify!($field), d));
                }
            };
        }
        push!(etd);
        push!(atd);
        push!(eta);
        push!(ata);
        push!(pickup_date);
        push!(delivery_date);
        push!(si_cutoff);
        push!(vgm_cutoff);
        push!(cargo_cutoff);
        push!(doc_cutoff);
        push!(last_free_day);
        push!(empty_return_date);
        push!(pod_delivery_date);
        push!(action_deadline);
        out
    }

    /// Strong identifiers usable for shipment resolution, in lookup priority
    /// order (§4.5 "Find-or-create").
    #[must_use]
    pub fn has_identifiers(&self) -> bool {
        self.booking_number.is_some()
            || self.mbl_number.is_some()
            || self.work_order_number.is_some()
    }
}

/// A persisted record of one processed message (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chronicle {
    pub chronicle_id: ChronicleId,
    pub message_id: MessageId,
    pub thread_id: ThreadId,
    pub occurred_at: chrono::DateTime<chrono::Utc>,
    pub analysis: ExtractedAnalysis,
    pub confidence_source: ConfidenceSource,
    pub confidence_score: u8,
    pub escalation_reason: Option<String>,
    pub reanalysis_flags: Vec<String>,
    pub shipment_id: Option<ShipmentId>,
    pub review_reasons: Vec<String>,
}

/// Error record for a failed chronicle attempt, counted toward the 3-strike
/// cap (§5, §7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChronicleError {
    pub message_id: MessageId,
    pub occurred_at: chrono::DateTime<chrono::Utc>,
    pub reason: String,
}

/// A single open or closed action against a shipment (§3, §4.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    pub action_id: ActionId,
    pub shipment_id: ShipmentId,
    pub chronicle_id: ChronicleId,
    pub description: String,
    pub owner: ActionOwner,
    pub priority: ActionPriority,
    pub deadline: Option<chrono::DateTime<chrono::Utc>>,
    pub opened_at: chrono::DateTime<chrono::Utc>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Action {
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.completed_at.is_none()
    }

    #[must_use]
    pub fn is_overdue(&self, now: chrono::DateTime<chrono::Utc>) -> bool {
        self.is_open() && self.deadline.is_some_and(|d| d < now)
    }
}

/// An issue record against a shipment (§3 AttentionComponents "issueTypes").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub shipment_id: ShipmentId,
    pub chronicle_id: ChronicleId,
    pub issue_type: IssueType,
    pub description: String,
    pub opened_at: chrono::DateTime<chrono::Utc>,
    pub resolved_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl Issue {
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.resolved_at.is_none()
    }
}

/// A stage transition record (§4.5 "Record the transition").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageTransition {
    pub stage: Stage,
    pub triggering_document_type: DocumentType,
    pub occurred_at: chrono::DateTime<chrono::Utc>,
}

/// Shipment aggregate: many chronicles, one shipment (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shipment {
    pub shipment_id: ShipmentId,
    pub booking_number: Option<String>,
    pub mbl_number: Option<String>,
    pub work_order_number: Option<String>,
    pub container_numbers: Vec<String>,

    pub stage: Stage,
    pub stage_updated_at: chrono::DateTime<chrono::Utc>,
    pub stage_history: Vec<StageTransition>,

    pub etd: Option<NaiveDate>,
    pub eta: Option<NaiveDate>,
    pub si_cutoff: Option<NaiveDate>,
    pub vgm_cutoff: Option<NaiveDate>,
    pub cargo_cutoff: Option<NaiveDate>,
    pub doc_cutoff: Option<NaiveDate>,
    pub last_free_day: Option<NaiveDate>,

    pub vessel_name: Option<String>,
    pub carrier_name: Option<String>,

    pub shipper: PartyContact,
    pub consignee: PartyContact,
    pub notify: PartyContact,

    pub last_activity_at: chrono::DateTime<chrono::Utc>,
}

impl Shipment {
    /// Advances `stage` if `candidate` is strictly greater in the total
    /// order (§4.5 "Stage progression", invariant P4). Returns whether the
    /// stage actually changed.
    pub fn advance_stage(
        &mut self,
        candidate: Stage,
        triggering_document_type: DocumentType,
        at: chrono::DateTime<chrono::Utc>,
    ) -> bool {
        if candidate > self.stage {
            self.stage = candidate;
            self.stage_updated_at = at;
            self.stage_history.push(StageTransition {
                stage: candidate,
                triggering_document_type,
                occurred_at: at,
            });
            true
        } else {
            false
        }
    }
}

/// A detection-pattern config row (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pattern {
    pub id: String,
    pub pattern_type: PatternType,
    pub regex: String,
    pub flags: String,
    pub document_type: DocumentType,
    pub priority: i32,
    pub confidence_base: u8,
    pub requires_attachment: bool,
    pub min_thread_position: Option<u32>,
    pub max_thread_position: Option<u32>,
}

/// Lookup key for `ActionRule` (§3): `(document_type, from_party, is_reply)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionRuleKey {
    pub document_type: DocumentType,
    pub from_party: Option<FromParty>,
    pub is_reply: bool,
}

/// An action-determination rule (§3, §4.7 step 7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRule {
    pub document_type: DocumentType,
    pub from_party: Option<FromParty>,
    pub is_reply: bool,
    pub has_action: bool,
    pub verb: String,
    pub description_template: String,
    pub owner: ActionOwner,
    pub priority_base: ActionPriority,
    pub priority_boost_keywords: Vec<String>,
    pub deadline_type: DeadlineType,
    pub deadline_days: Option<u32>,
    pub cutoff_field: Option<CutoffField>,
    pub flip_to_action_keywords: Vec<String>,
    pub flip_to_no_action_keywords: Vec<String>,
    pub auto_resolve_on: Vec<DocumentType>,
}

/// A flow-compatibility config row (§3).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FlowRule {
    pub stage: Stage,
    pub document_type: DocumentType,
    pub compatibility: FlowCompatibility,
}

/// Per-chronicle learning signal (§3). Written, not consumed, by this
/// pipeline (spec §9 Open Question 3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningEpisode {
    pub chronicle_id: ChronicleId,
    pub predicted_type: DocumentType,
    pub confidence: u8,
    pub method: ConfidenceSource,
    pub sender_domain: String,
    pub thread_position: u32,
    pub flow_validation_passed: bool,
    pub review_reason: Option<String>,
}

/// Computed view used by the attention engine (§3, §4.6).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttentionComponents {
    pub has_active_issue: bool,
    pub issue_types: Vec<IssueType>,
    pub pending_actions: u32,
    pub overdue_actions: u32,
    pub max_action_priority: Option<ActionPriority>,
    pub days_since_activity: i64,
    pub days_to_etd: Option<i64>,
    pub cutoff_status: Option<crate::enums::CutoffStatus>,
    pub nearest_cutoff_days: Option<i64>,
}

/// Input to the pattern matcher (§4.2 `match(input)`).
#[derive(Debug, Clone)]
pub struct PatternMatchInput<'a> {
    pub subject: &'a str,
    pub sender_address: &'a str,
    pub body_text: &'a str,
    pub has_attachment: bool,
    pub thread_position: u32,
}

/// Extra HashMap-keyed metadata the prompt builder and normalizers pass
/// around (sender-history snippets, memory-layer context, etc.) without
/// forcing every caller to thread individual fields through. Not part of
/// the closed `ExtractedAnalysis` schema.
pub type AuxContext = HashMap<String, String>;
