//! In-memory reference [`Store`] implementation. Used by engine/integration
//! tests and the `doctor`/dev-tooling CLI paths; not intended for
//! production use (spec.md §1 treats the database as an external
//! collaborator).

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use freightline_core::error::StoreError;
use freightline_core::ids::{ActionId, ChronicleId, MessageId, ShipmentId, ThreadId};
use freightline_core::model::{
    Action, ActionRule, Chronicle, ChronicleError, FlowRule, Issue, LearningEpisode, Pattern,
    Shipment,
};

use crate::Store;

#[derive(Default)]
struct Tables {
    chronicles_by_message: HashMap<MessageId, ChronicleId>,
    chronicles: HashMap<ChronicleId, Chronicle>,
    errors: HashMap<MessageId, Vec<ChronicleError>>,
    shipments: HashMap<ShipmentId, Shipment>,
    actions: HashMap<ActionId, Action>,
    issues: Vec<Issue>,
    patterns: Vec<Pattern>,
    action_rules: Vec<ActionRule>,
    flow_rules: Vec<FlowRule>,
    pattern_hits: HashMap<String, u64>,
    pattern_misses: HashMap<String, u64>,
    learning_episodes: Vec<LearningEpisode>,
    sync_cursors: HashMap<String, DateTime<Utc>>,
}

/// A single-process, `RwLock`-guarded in-memory store. Cheap to clone via
/// `Arc<InMemoryStore>` and share across worker tasks.
pub struct InMemoryStore {
    tables: RwLock<Tables>,
    next_id: AtomicU64,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self { tables: RwLock::new(Tables::default()), next_id: AtomicU64::new(1) }
    }

    /// Monotonically increasing id, useful for tests that need a fresh
    /// `ShipmentId`/`ActionId` without pulling in a UUID generator.
    #[must_use]
    pub fn next_id(&self, prefix: &str) -> String {
        let n = self.next_id.fetch_add(1, Ordering::Relaxed);
        format!("{prefix}-{n}")
    }

    /// Seeds the rule caches this store backs (patterns, action rules,
    /// flow rules). Production stores load these from config tables; this
    /// reference implementation just takes them directly.
    pub async fn seed_rules(
        &self,
        patterns: Vec<Pattern>,
        action_rules: Vec<ActionRule>,
        flow_rules: Vec<FlowRule>,
    ) {
        let mut tables = self.tables.write().await;
        tables.patterns = patterns;
        tables.action_rules = action_rules;
        tables.flow_rules = flow_rules;
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn find_chronicle_by_message_id(
        &self,
        message_id: &MessageId,
    ) -> Result<Option<Chronicle>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .chronicles_by_message
            .get(message_id)
            .and_then(|id| tables.chronicles.get(id))
            .cloned())
    }

    async fn save_chronicle(&self, chronicle: &Chronicle) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        tables
            .chronicles_by_message
            .insert(chronicle.message_id.clone(), chronicle.chronicle_id.clone());
        tables.chronicles.insert(chronicle.chronicle_id.clone(), chronicle.clone());
        Ok(())
    }

    async fn thread_history(
        &self,
        thread_id: &ThreadId,
        before: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Chronicle>, StoreError> {
        let tables = self.tables.read().await;
        let mut matching: Vec<Chronicle> = tables
            .chronicles
            .values()
            .filter(|c| &c.thread_id == thread_id && c.occurred_at < before)
            .cloned()
            .collect();
        matching.sort_by_key(|c| c.occurred_at);
        matching.truncate(limit);
        Ok(matching)
    }

    async fn count_errors(&self, message_id: &MessageId) -> Result<u32, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.errors.get(message_id).map_or(0, |v| v.len() as u32))
    }

    async fn record_error(&self, error: ChronicleError) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        tables.errors.entry(error.message_id.clone()).or_default().push(error);
        Ok(())
    }

    async fn shipment_candidates(
        &self,
        booking_number: Option<&str>,
        mbl_number: Option<&str>,
        work_order_number: Option<&str>,
        container_numbers: &[String],
    ) -> Result<Vec<Shipment>, StoreError> {
        let tables = self.tables.read().await;
        let matches = tables
            .shipments
            .values()
            .filter(|s| {
                booking_number.is_some_and(|b| s.booking_number.as_deref() == Some(b))
                    || mbl_number.is_some_and(|m| s.mbl_number.as_deref() == Some(m))
                    || work_order_number.is_some_and(|w| s.work_order_number.as_deref() == Some(w))
                    || s.container_numbers.iter().any(|c| container_numbers.contains(c))
            })
            .cloned()
            .collect();
        Ok(matches)
    }

    async fn get_shipment(&self, shipment_id: &ShipmentId) -> Result<Option<Shipment>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.shipments.get(shipment_id).cloned())
    }

    async fn save_shipment(&self, shipment: &Shipment) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if let Some(existing) = tables.shipments.get(&shipment.shipment_id) {
            if shipment.stage < existing.stage {
                return Err(StoreError::Conflict(format!(
                    "refusing to regress shipment {} from stage {:?} to {:?}",
                    shipment.shipment_id, existing.stage, shipment.stage
                )));
            }
        }
        tables.shipments.insert(shipment.shipment_id.clone(), shipment.clone());
        Ok(())
    }

    async fn open_actions_for_shipment(
        &self,
        shipment_id: &ShipmentId,
    ) -> Result<Vec<Action>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .actions
            .values()
            .filter(|a| &a.shipment_id == shipment_id && a.is_open())
            .cloned()
            .collect())
    }

    async fn save_action(&self, action: &Action) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        tables.actions.insert(action.action_id.clone(), action.clone());
        Ok(())
    }

    async fn active_issues_for_shipment(
        &self,
        shipment_id: &ShipmentId,
    ) -> Result<Vec<Issue>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .issues
            .iter()
            .filter(|i| &i.shipment_id == shipment_id && i.is_active())
            .cloned()
            .collect())
    }

    async fn save_issue(&self, issue: &Issue) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if let Some(existing) = tables
            .issues
            .iter_mut()
            .find(|i| i.shipment_id == issue.shipment_id && i.chronicle_id == issue.chronicle_id)
        {
            *existing = issue.clone();
        } else {
            tables.issues.push(issue.clone());
        }
        Ok(())
    }

    async fn all_shipments(&self) -> Result<Vec<Shipment>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.shipments.values().cloned().collect())
    }

    async fn load_patterns(&self) -> Result<Vec<Pattern>, StoreError> {
        Ok(self.tables.read().await.patterns.clone())
    }

    async fn load_action_rules(&self) -> Result<Vec<ActionRule>, StoreError> {
        Ok(self.tables.read().await.action_rules.clone())
    }

    async fn load_flow_rules(&self) -> Result<Vec<FlowRule>, StoreError> {
        Ok(self.tables.read().await.flow_rules.clone())
    }

    async fn increment_pattern_hit(&self, pattern_id: &str) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        *tables.pattern_hits.entry(pattern_id.to_string()).or_insert(0) += 1;
        Ok(())
    }

    async fn increment_pattern_miss(&self, pattern_id: &str) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        *tables.pattern_misses.entry(pattern_id.to_string()).or_insert(0) += 1;
        Ok(())
    }

    async fn record_learning_episode(&self, episode: &LearningEpisode) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        tables.learning_episodes.push(episode.clone());
        Ok(())
    }

    async fn sender_domain_accuracy(&self, sender_domain: &str) -> Result<Option<f64>, StoreError> {
        let tables = self.tables.read().await;
        let matching: Vec<&LearningEpisode> = tables
            .learning_episodes
            .iter()
            .filter(|e| e.sender_domain == sender_domain)
            .collect();
        if matching.is_empty() {
            return Ok(None);
        }
        let total: f64 = matching.iter().map(|e| f64::from(e.confidence) / 100.0).sum();
        Ok(Some(total / matching.len() as f64))
    }

    async fn get_sync_cursor(&self, key: &str) -> Result<Option<DateTime<Utc>>, StoreError> {
        Ok(self.tables.read().await.sync_cursors.get(key).copied())
    }

    async fn set_sync_cursor(&self, key: &str, value: DateTime<Utc>) -> Result<(), StoreError> {
        self.tables.write().await.sync_cursors.insert(key.to_string(), value);
        Ok(())
    }

    async fn get_chronicle(&self, chronicle_id: &ChronicleId) -> Result<Option<Chronicle>, StoreError> {
        Ok(self.tables.read().await.chronicles.get(chronicle_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use freightline_core::enums::{ConfidenceSource, Direction, TransportMode};
    use freightline_core::model::ExtractedAnalysis;

    fn chronicle(message_id: &str, thread_id: &str, occurred_at: DateTime<Utc>) -> Chronicle {
        Chronicle {
            chronicle_id: ChronicleId::new(format!("c-{message_id}")),
            message_id: MessageId::new(message_id),
            thread_id: ThreadId::new(thread_id),
            occurred_at,
            analysis: ExtractedAnalysis { transport_mode: TransportMode::Ocean, ..Default::default() },
            confidence_source: ConfidenceSource::Pattern,
            confidence_score: 90,
            escalation_reason: None,
            reanalysis_flags: vec![],
            shipment_id: None,
            review_reasons: vec![],
        }
    }

    #[tokio::test]
    async fn idempotent_save_and_lookup() {
        let store = InMemoryStore::new();
        let c = chronicle("m1", "t1", Utc::now());
        store.save_chronicle(&c).await.unwrap();
        let found = store
            .find_chronicle_by_message_id(&MessageId::new("m1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.chronicle_id, c.chronicle_id);
    }

    #[tokio::test]
    async fn thread_history_is_ascending_and_bounded() {
        let store = InMemoryStore::new();
        let now = Utc::now();
        for i in 0..15 {
            let c = chronicle(&format!("m{i}"), "t1", now - chrono::Duration::days(15 - i));
            store.save_chronicle(&c).await.unwrap();
        }
        let history = store.thread_history(&ThreadId::new("t1"), now, 10).await.unwrap();
        assert_eq!(history.len(), 10);
        assert!(history.windows(2).all(|w| w[0].occurred_at <= w[1].occurred_at));
    }

    #[tokio::test]
    async fn shipment_stage_regression_is_rejected() {
        use freightline_core::enums::Stage;
        let store = InMemoryStore::new();
        let mut shipment = test_shipment("s1");
        shipment.stage = Stage::Departed;
        store.save_shipment(&shipment).await.unwrap();

        let mut regressed = shipment.clone();
        regressed.stage = Stage::Pending;
        let result = store.save_shipment(&regressed).await;
        assert!(result.is_err());
    }

    fn test_shipment(id: &str) -> Shipment {
        Shipment {
            shipment_id: ShipmentId::new(id),
            booking_number: None,
            mbl_number: None,
            work_order_number: None,
            container_numbers: vec![],
            stage: freightline_core::enums::Stage::Pending,
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

    #[tokio::test]
    async fn error_count_tracks_retry_cap() {
        let store = InMemoryStore::new();
        let mid = MessageId::new("m1");
        for _ in 0..3 {
            store
                .record_error(ChronicleError {
                    message_id: mid.clone(),
                    occurred_at: Utc::now(),
                    reason: "boom".to_string(),
                })
                .await
                .unwrap();
        }
        assert_eq!(store.count_errors(&mid).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn sender_domain_accuracy_is_none_without_history() {
        let store = InMemoryStore::new();
        assert_eq!(store.sender_domain_accuracy("maersk.com").await.unwrap(), None);
    }
}
