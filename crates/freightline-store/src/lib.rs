//! `Store` trait: the persistence boundary the rest of the pipeline is
//! built against (§6 "Store (persisted tables)"). Production-grade
//! database wiring is an external collaborator per spec.md §1; this crate
//! defines the contract and ships [`memory::InMemoryStore`] as the
//! reference implementation used by tests and the dev-tools CLI commands.

pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use freightline_core::error::StoreError;
use freightline_core::ids::{ChronicleId, MessageId, ShipmentId, ThreadId};
use freightline_core::model::{
    Action, ActionRule, Chronicle, ChronicleError, FlowRule, Issue, LearningEpisode, Pattern,
    Shipment,
};

/// Maximum prior in-thread chronicles the processor reads for context
/// (§4.7 step 4, §4.3 "Prompt composition").
pub const THREAD_HISTORY_LIMIT: usize = 10;

/// Abstracts every persisted table in §6 behind one trait object the
/// engine depends on. All methods are async: every call may hit real I/O.
///
/// Implementors must make [`Store::save_chronicle`] idempotent on
/// `message_id` (invariant P1) — callers check
/// [`Store::find_chronicle_by_message_id`] first, but a `Store` is free to
/// enforce the uniqueness itself (e.g. a unique index) as a second line of
/// defense.
#[async_trait]
pub trait Store: Send + Sync {
    /// Idempotency lookup (§4.7 step 2, invariant P1).
    async fn find_chronicle_by_message_id(
        &self,
        message_id: &MessageId,
    ) -> Result<Option<Chronicle>, StoreError>;

    /// Persists a chronicle row. Fatal for the message on failure (§7).
    async fn save_chronicle(&self, chronicle: &Chronicle) -> Result<(), StoreError>;

    /// Up to [`THREAD_HISTORY_LIMIT`] prior chronicles in `thread_id`,
    /// ascending by `occurred_at`, strictly before `before` (§4.7 step 4).
    async fn thread_history(
        &self,
        thread_id: &ThreadId,
        before: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Chronicle>, StoreError>;

    /// Number of prior error rows recorded against `message_id` (§5 retry
    /// cap, §7).
    async fn count_errors(&self, message_id: &MessageId) -> Result<u32, StoreError>;

    /// Records a processing failure toward the retry cap (§7).
    async fn record_error(&self, error: ChronicleError) -> Result<(), StoreError>;

    /// Candidate shipments for find-or-create (§4.5): every shipment
    /// sharing at least one of `analysis`'s identifiers. A naive
    /// implementation may return every shipment; a real store indexes on
    /// the identifier columns.
    async fn shipment_candidates(
        &self,
        booking_number: Option<&str>,
        mbl_number: Option<&str>,
        work_order_number: Option<&str>,
        container_numbers: &[String],
    ) -> Result<Vec<Shipment>, StoreError>;

    async fn get_shipment(&self, shipment_id: &ShipmentId) -> Result<Option<Shipment>, StoreError>;

    /// Upserts a shipment. Stage must only move forward (§4.5, invariant
    /// P4); a conforming `Store` should reject or clamp a regression
    /// rather than accept one silently, but [`Shipment::advance_stage`]
    /// already guarantees the linker never asks for one.
    async fn save_shipment(&self, shipment: &Shipment) -> Result<(), StoreError>;

    async fn open_actions_for_shipment(
        &self,
        shipment_id: &ShipmentId,
    ) -> Result<Vec<Action>, StoreError>;

    async fn save_action(&self, action: &Action) -> Result<(), StoreError>;

    async fn active_issues_for_shipment(
        &self,
        shipment_id: &ShipmentId,
    ) -> Result<Vec<Issue>, StoreError>;

    async fn save_issue(&self, issue: &Issue) -> Result<(), StoreError>;

    /// All shipments, for attention-scoring sweeps and reanalysis planning.
    async fn all_shipments(&self) -> Result<Vec<Shipment>, StoreError>;

    async fn load_patterns(&self) -> Result<Vec<Pattern>, StoreError>;
    async fn load_action_rules(&self) -> Result<Vec<ActionRule>, StoreError>;
    async fn load_flow_rules(&self) -> Result<Vec<FlowRule>, StoreError>;

    /// Fire-and-forget hit counter (§4.2 "Hit / false-positive counters
    /// are incremented asynchronously"). Failures are tolerated by the
    /// caller, not by this method's contract.
    async fn increment_pattern_hit(&self, pattern_id: &str) -> Result<(), StoreError>;
    async fn increment_pattern_miss(&self, pattern_id: &str) -> Result<(), StoreError>;

    /// Non-fatal on failure (§7 "Learning ... side effects are
    /// fire-and-forget"); the caller decides whether to log and continue.
    async fn record_learning_episode(&self, episode: &LearningEpisode) -> Result<(), StoreError>;

    /// Rolling sender-domain accuracy used by the confidence scorer
    /// (§4.4 "Sender-domain historical accuracy"), derived from
    /// [`LearningEpisode`] history. `None` when there's no history yet.
    async fn sender_domain_accuracy(&self, sender_domain: &str) -> Result<Option<f64>, StoreError>;

    /// Per-thread sync-state bookkeeping (e.g. last-seen message cursor
    /// for a `MailSource`), §3 `chronicle_sync_state`.
    async fn get_sync_cursor(&self, key: &str) -> Result<Option<DateTime<Utc>>, StoreError>;
    async fn set_sync_cursor(&self, key: &str, value: DateTime<Utc>) -> Result<(), StoreError>;

    /// Fetches a chronicle by its own id, used by reanalysis and CLI
    /// inspection commands.
    async fn get_chronicle(&self, chronicle_id: &ChronicleId) -> Result<Option<Chronicle>, StoreError>;
}
