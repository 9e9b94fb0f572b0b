//! Reanalysis service (§4.8 "Reanalysis"): threads are distributed
//! round-robin across a fixed worker count, but within a thread, messages
//! are processed strictly in `occurredAt` ascending order — a thread's
//! stage history and action/issue lifecycle only make sense read in the
//! order they happened, so two messages from the same thread must never
//! run concurrently with each other.
//!
//! Grounded on the same `Processor` used by [`crate::pool::WorkerPool`];
//! the difference is entirely in how work is partitioned, not in how a
//! single message is processed.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use freightline_core::ids::ThreadId;
use freightline_core::model::Message;

use crate::metrics::BatchSummary;
use crate::processor::Processor;

pub struct ReanalysisService {
    processor: Arc<Processor>,
    concurrency: usize,
}

impl ReanalysisService {
    #[must_use]
    pub fn new(processor: Arc<Processor>, concurrency: usize) -> Self {
        Self { processor, concurrency: concurrency.max(1) }
    }

    /// Groups `messages` by `thread_id` (first-seen order), sorts each
    /// group by `received_at`, then hands whole threads round-robin to a
    /// fixed pool of worker tasks. A worker runs its assigned threads
    /// fully sequentially, never interleaving two threads' messages, so
    /// per-thread chronological order is preserved end to end.
    pub async fn run(&self, messages: Vec<Message>) -> BatchSummary {
        let start = Instant::now();
        let total = messages.len();

        let mut thread_order: Vec<ThreadId> = Vec::new();
        let mut by_thread: HashMap<ThreadId, Vec<Message>> = HashMap::new();
        for message in messages {
            if !by_thread.contains_key(&message.thread_id) {
                thread_order.push(message.thread_id.clone());
            }
            by_thread.entry(message.thread_id.clone()).or_default().push(message);
        }
        for thread_id in &thread_order {
            if let Some(group) = by_thread.get_mut(thread_id) {
                group.sort_by_key(|m| m.received_at);
            }
        }

        let worker_count = self.concurrency.min(thread_order.len().max(1));
        let mut buckets: Vec<Vec<Vec<Message>>> = (0..worker_count).map(|_| Vec::new()).collect();
        for (i, thread_id) in thread_order.into_iter().enumerate() {
            if let Some(group) = by_thread.remove(&thread_id) {
                buckets[i % worker_count].push(group);
            }
        }

        let completed = Arc::new(AtomicU64::new(0));
        let succeeded = Arc::new(AtomicU64::new(0));
        let failed = Arc::new(AtomicU64::new(0));
        let linked = Arc::new(AtomicU64::new(0));

        let mut handles = Vec::with_capacity(buckets.len());
        for bucket in buckets {
            let processor = Arc::clone(&self.processor);
            let completed = Arc::clone(&completed);
            let succeeded = Arc::clone(&succeeded);
            let failed = Arc::clone(&failed);
            let linked = Arc::clone(&linked);

            handles.push(tokio::spawn(async move {
                for thread_messages in bucket {
                    for message in thread_messages {
                        match processor.process_message(&message).await {
                            Ok(outcome) => {
                                succeeded.fetch_add(1, Ordering::Relaxed);
                                if outcome.shipment_id.is_some() {
                                    linked.fetch_add(1, Ordering::Relaxed);
                                }
                            }
                            Err(err) => {
                                failed.fetch_add(1, Ordering::Relaxed);
                                warn!(message_id = %message.message_id, error = %err, "reanalysis message failed");
                            }
                        }
                        completed.fetch_add(1, Ordering::Relaxed);
                    }
                }
            }));
        }

        for handle in handles {
            let _ = handle.await;
        }

        let processed = completed.load(Ordering::Relaxed);
        info!(completed = processed, total, "reanalysis complete");

        BatchSummary {
            processed,
            succeeded: succeeded.load(Ordering::Relaxed),
            failed: failed.load(Ordering::Relaxed),
            linked: linked.load(Ordering::Relaxed),
            total_time_ms: u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            metrics: self.processor.metrics().snapshot(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use freightline_core::enums::Direction;
    use freightline_core::error::LlmError;
    use freightline_core::ids::MessageId;
    use freightline_llm::{LlmBackend, LlmInvocation, LlmResult};
    use freightline_patterns::{PatternCache, PatternCacheConfig};
    use freightline_rules::{ActionRuleCache, FlowRuleCache};
    use freightline_store::memory::InMemoryStore;
    use serde_json::json;
    use std::time::Duration;

    use crate::collaborators::StubPdfExtractor;
    use crate::metrics::Metrics;
    use crate::processor::ProcessorConfig;

    struct AlwaysEmptyBackend;

    #[async_trait]
    impl LlmBackend for AlwaysEmptyBackend {
        async fn invoke(&self, inv: LlmInvocation) -> Result<LlmResult, LlmError> {
            Ok(LlmResult {
                tool_input: json!({
                    "transport_mode": "ocean",
                    "identifier_source": "body",
                    "document_type": "general_correspondence",
                    "from_party": "unknown",
                    "message_type": "other",
                    "sentiment": "neutral",
                    "summary": "update",
                    "has_action": false,
                    "has_issue": false,
                }),
                model_used: inv.model,
                tokens_input: Some(1),
                tokens_output: Some(1),
            })
        }
    }

    fn message(id: &str, thread: &str, received_at: DateTime<Utc>) -> Message {
        Message {
            message_id: MessageId::new(id),
            thread_id: ThreadId::new(thread),
            subject: "Status update".to_string(),
            body: "Nothing actionable, just an update.".to_string(),
            sender_address: "ops@example.com".to_string(),
            received_at,
            direction: Direction::Inbound,
            attachments: vec![],
        }
    }

    #[tokio::test]
    async fn processes_every_thread_across_available_workers() {
        let store = Arc::new(InMemoryStore::new());
        let patterns = Arc::new(PatternCache::new(PatternCacheConfig { ttl: Duration::from_secs(300) }));
        patterns.load(vec![]);
        let action_rules = Arc::new(ActionRuleCache::new(Duration::from_secs(300)));
        action_rules.load(vec![]);
        let flow_rules = Arc::new(FlowRuleCache::new(Duration::from_secs(300)));
        flow_rules.load(vec![]);

        let processor = Arc::new(Processor::new(
            store,
            Arc::new(AlwaysEmptyBackend),
            Arc::new(StubPdfExtractor::new("")),
            patterns,
            action_rules,
            flow_rules,
            Arc::new(Metrics::new()),
            ProcessorConfig::default(),
        ));

        let base = Utc::now();
        let messages = vec![
            message("a1", "thread-a", base),
            message("a2", "thread-a", base + chrono::Duration::hours(1)),
            message("b1", "thread-b", base),
            message("c1", "thread-c", base),
        ];

        let service = ReanalysisService::new(processor, 2);
        let summary = service.run(messages).await;
        assert_eq!(summary.processed, 4);
        assert_eq!(summary.succeeded, 4);
    }

    #[tokio::test]
    async fn single_worker_processes_thread_strictly_in_order() {
        let store = Arc::new(InMemoryStore::new());
        let patterns = Arc::new(PatternCache::new(PatternCacheConfig::default()));
        patterns.load(vec![]);
        let action_rules = Arc::new(ActionRuleCache::new(Duration::from_secs(300)));
        action_rules.load(vec![]);
        let flow_rules = Arc::new(FlowRuleCache::new(Duration::from_secs(300)));
        flow_rules.load(vec![]);

        let processor = Arc::new(Processor::new(
            store,
            Arc::new(AlwaysEmptyBackend),
            Arc::new(StubPdfExtractor::new("")),
            patterns,
            action_rules,
            flow_rules,
            Arc::new(Metrics::new()),
            ProcessorConfig::default(),
        ));

        let base = Utc::now();
        // Out of chronological order on input; the service must sort
        // before dispatch.
        let messages = vec![
            message("m3", "thread-a", base + chrono::Duration::hours(2)),
            message("m1", "thread-a", base),
            message("m2", "thread-a", base + chrono::Duration::hours(1)),
        ];

        let service = ReanalysisService::new(processor, 1);
        let summary = service.run(messages).await;
        assert_eq!(summary.processed, 3);
    }
}
