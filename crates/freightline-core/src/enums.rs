//! Closed enumerations for the `ExtractedAnalysis` schema (spec §6) and the
//! entities that reference them (spec §3).
//!
//! Every enum here round-trips through `strum`'s case-insensitive `FromStr`
//! so the normalizer (§4.1) can map free-form LLM/pattern output onto a
//! canonical variant without a hand-rolled match arm per field.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, VariantNames};

/// Mode of transport for the shipment referenced by a message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter, VariantNames,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub enum TransportMode {
    Ocean,
    Air,
    Road,
    Rail,
    Multimodal,
    Unknown,
}

impl Default for TransportMode {
    fn default() -> Self {
        Self::Unknown
    }
}

/// Where in the message the winning identifier was found.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter, VariantNames,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierSource {
    Subject,
    Body,
    Attachment,
}

/// Closed catalog of freight-forwarding document types.
///
/// Grouped by the classes called out in spec §6: booking, documentation,
/// arrival/customs, delivery, trucking, financial, updates, and generic
/// correspondence. `document_type` normalization (§4.1) maps free text onto
/// one of these variants; anything that doesn't match passes through
/// unchanged and is rejected by schema validation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter, VariantNames,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    // Booking
    BookingRequest,
    BookingConfirmation,
    BookingAmendment,
    BookingCancellation,
    // Documentation
    SiSubmission,
    SiConfirmation,
    VgmSubmission,
    VgmConfirmation,
    DraftBl,
    BlConfirmation,
    FinalBl,
    SeaWaybill,
    TelexRelease,
    SobConfirmation,
    LeoCopy,
    // Arrival / customs
    ArrivalNotice,
    CustomsClearance,
    CustomsHold,
    ContainerRelease,
    // Delivery
    DeliveryOrder,
    PodProofOfDelivery,
    EmptyReturn,
    // Trucking
    TruckingDispatch,
    TruckingPod,
    // Financial
    Invoice,
    PaymentConfirmation,
    CreditNote,
    // Updates
    ScheduleUpdate,
    VesselUpdate,
    RolloverNotice,
    DelayNotice,
    // Generic
    GeneralCorrespondence,
    Notification,
    Approval,
    Request,
    Escalation,
    InternalNotification,
    Unknown,
}

impl Default for DocumentType {
    fn default() -> Self {
        Self::Unknown
    }
}

impl DocumentType {
    /// Confirmation-class types that auto-resolve matching open actions (§4.5).
    pub const CONFIRMATION_CLASS: &'static [Self] = &[
        Self::VgmConfirmation,
        Self::SiConfirmation,
        Self::SobConfirmation,
        Self::BookingConfirmation,
        Self::LeoCopy,
        Self::DraftBl,
        Self::FinalBl,
        Self::TelexRelease,
        Self::SeaWaybill,
        Self::ArrivalNotice,
        Self::ContainerRelease,
        Self::DeliveryOrder,
        Self::PodProofOfDelivery,
    ];

    /// Non-shipping document types that never escalate (§4.4 Policy).
    pub const NON_SHIPPING: &'static [Self] = &[
        Self::GeneralCorrespondence,
        Self::Notification,
        Self::Approval,
        Self::Request,
        Self::Escalation,
        Self::Unknown,
        Self::InternalNotification,
    ];

    #[must_use]
    pub fn is_confirmation_class(self) -> bool {
        Self::CONFIRMATION_CLASS.contains(&self)
    }

    #[must_use]
    pub fn is_non_shipping(self) -> bool {
        Self::NON_SHIPPING.contains(&self)
    }

    /// Keyword list used to match an open action's description for
    /// auto-resolution (§4.5). Empty slice means "this type never resolves
    /// actions" (non-confirmation types).
    #[must_use]
    pub fn resolution_keywords(self) -> &'static [&'static str] {
        match self {
            Self::VgmConfirmation => &["vgm", "verified gross mass"],
            Self::SiConfirmation => &["si", "shipping instructions"],
            Self::SobConfirmation => &["sob", "shipped on board"],
            Self::BookingConfirmation => &["booking", "confirm booking"],
            Self::LeoCopy => &["leo", "let export order"],
            Self::DraftBl => &["draft bl", "draft b/l", "bl draft"],
            Self::FinalBl => &["final bl", "final b/l", "original bl"],
            Self::TelexRelease => &["telex release", "telex"],
            Self::SeaWaybill => &["waybill", "sea waybill"],
            Self::ArrivalNotice => &["arrival notice", "vessel arrival"],
            Self::ContainerRelease => &["container release", "release container"],
            Self::DeliveryOrder => &["delivery order", "do release"],
            Self::PodProofOfDelivery => &["pod", "proof of delivery", "delivered"],
            _ => &[],
        }
    }
}

/// Counterparty role that sent the message (§6).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter, VariantNames,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub enum FromParty {
    OceanCarrier,
    Airline,
    Nvocc,
    Trucker,
    Warehouse,
    Terminal,
    CustomsBroker,
    FreightBroker,
    Shipper,
    Consignee,
    Customer,
    NotifyParty,
    Intoglo,
    System,
    Unknown,
}

impl Default for FromParty {
    fn default() -> Self {
        Self::Unknown
    }
}

/// Location type, shared by POR/POL/POD/POFD (§6 "4-point routing").
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter, VariantNames,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub enum LocationType {
    Port,
    Airport,
    Depot,
    RailYard,
    Warehouse,
    CustomerFacility,
    Unknown,
}

impl Default for LocationType {
    fn default() -> Self {
        Self::Unknown
    }
}

/// Coarse intent classification of the message, independent of document type.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter, VariantNames,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Inquiry,
    Confirmation,
    Notification,
    Instruction,
    Complaint,
    Update,
    Other,
}

impl Default for MessageType {
    fn default() -> Self {
        Self::Other
    }
}

/// Sentiment of the message body, used as a confidence/attention signal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter, VariantNames,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    Positive,
    Neutral,
    Negative,
    Urgent,
}

impl Default for Sentiment {
    fn default() -> Self {
        Self::Neutral
    }
}

/// Party responsible for completing an open action (§3 ActionRule).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter, VariantNames,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub enum ActionOwner {
    Shipper,
    Consignee,
    CustomsBroker,
    Trucker,
    OpsTeam,
    DocumentationTeam,
    FinanceTeam,
    Customer,
    Carrier,
    Unknown,
}

impl Default for ActionOwner {
    fn default() -> Self {
        Self::Unknown
    }
}

/// Priority of an open action (§4.6 "max action priority bonus").
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, EnumString, EnumIter, VariantNames,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub enum ActionPriority {
    Low,
    Medium,
    High,
    Critical,
}

/// Issue classification (§4.6 attention formula "per issue type").
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter, VariantNames,
)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub enum IssueType {
    Delay,
    Rollover,
    Hold,
    Documentation,
    Customs,
    Damage,
}

impl IssueType {
    /// Base attention-score contribution for this issue class (§4.6).
    #[must_use]
    pub fn weight(self) -> f64 {
        match self {
            Self::Delay => 50.0,
            Self::Rollover => 60.0,
            Self::Hold => 40.0,
            Self::Documentation => 30.0,
            Self::Customs => 35.0,
            Self::Damage => 45.0,
        }
    }
}

/// How a cutoff/deadline is computed for an `ActionRule` (§3, §4.7 step 7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub enum DeadlineType {
    FixedDays,
    CutoffRelative,
    Urgent,
}

/// Which cutoff field a `CutoffRelative` deadline is anchored to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub enum CutoffField {
    SiCutoff,
    VgmCutoff,
    CargoCutoff,
    DocCutoff,
}

/// Urgency tier of the nearest cutoff (§4.6 "cutoff urgency").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum CutoffStatus {
    Safe,
    Warning,
    Urgent,
    Overdue,
}

/// Output tier of the attention engine (§4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum AttentionTier {
    Strong,
    Medium,
    Weak,
    Noise,
}

/// Confidence-scorer recommendation (§4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    Accept,
    FlagReview,
    EscalateSonnet,
    EscalateOpus,
}

/// Which stage of the extraction ladder produced the final analysis (§3
/// Chronicle provenance).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceSource {
    Pattern,
    Haiku,
    Sonnet,
    Opus,
}

/// Direction of a message relative to the freight forwarder (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Inbound,
    Outbound,
}

/// Compatibility verdict between a shipment stage and an incoming document
/// type (§3 FlowRule, §4.5 "Flow validation").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub enum FlowCompatibility {
    Expected,
    Unexpected,
    Impossible,
}

/// Which field of a message a detection pattern is matched against (§3
/// Pattern).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    Subject,
    Sender,
    Body,
}

/// Shipment lifecycle stage (§3). Ordering is the total order the linker and
/// invariant P4 rely on: stage only ever advances.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, EnumIter,
)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Pending,
    Booked,
    SiStage,
    DraftBl,
    BlIssued,
    Departed,
    InTransit,
    Arrived,
    Customs,
    Cleared,
    Delivered,
}

impl Stage {
    /// Maps a document type to the stage it contributes to reaching (§4.5
    /// "Stage progression"). Types that carry no stage signal return `None`
    /// and leave the shipment's stage untouched.
    #[must_use]
    pub fn for_document_type(doc_type: DocumentType) -> Option<Self> {
        use DocumentType as D;
        match doc_type {
            D::BookingRequest | D::BookingConfirmation | D::BookingAmendment => Some(Self::Booked),
            D::SiSubmission | D::SiConfirmation | D::VgmSubmission | D::VgmConfirmation => {
                Some(Self::SiStage)
            }
            D::DraftBl | D::BlConfirmation => Some(Self::DraftBl),
            D::FinalBl | D::SeaWaybill | D::TelexRelease | D::SobConfirmation | D::LeoCopy => {
                Some(Self::BlIssued)
            }
            D::VesselUpdate | D::ScheduleUpdate => Some(Self::Departed),
            D::RolloverNotice | D::DelayNotice => None,
            D::ArrivalNotice => Some(Self::Arrived),
            D::CustomsClearance | D::CustomsHold => Some(Self::Customs),
            D::ContainerRelease => Some(Self::Cleared),
            D::DeliveryOrder | D::TruckingDispatch => Some(Self::Cleared),
            D::PodProofOfDelivery | D::TruckingPod | D::EmptyReturn => Some(Self::Delivered),
            D::BookingCancellation
            | D::Invoice
            | D::PaymentConfirmation
            | D::CreditNote
            | D::GeneralCorrespondence
            | D::Notification
            | D::Approval
            | D::Request
            | D::Escalation
            | D::InternalNotification
            | D::Unknown => None,
        }
    }
}
