//! Worker pool for the batch `run` path (§4.8): a shared atomic index into
//! the input batch, default `N=5` workers, progress reported every 25
//! messages and once more on completion.
//!
//! Adapted from a chunked-fan-out pattern over OS threads to `tokio::spawn`
//! tasks pulling from a shared `Arc<AtomicUsize>` index — messages vary
//! wildly in processing time (LLM calls vs. pattern-only hits), so a
//! work-stealing index keeps every worker busy instead of leaving one
//! thread idle on its last big chunk. Progress is reported as a `tracing`
//! event, since this pipeline has no IPC layer to notify.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};

use freightline_core::model::Message;

use crate::metrics::BatchSummary;
use crate::processor::Processor;

/// Progress is logged every this many completed messages (§4.8), in
/// addition to once at the end regardless of where the count lands.
const PROGRESS_INTERVAL: u64 = 25;

pub struct WorkerPool {
    processor: Arc<Processor>,
    concurrency: usize,
}

impl WorkerPool {
    #[must_use]
    pub fn new(processor: Arc<Processor>, concurrency: usize) -> Self {
        Self { processor, concurrency: concurrency.max(1) }
    }

    /// Processes every message in `messages`, distributing work across
    /// `concurrency` tasks via a shared atomic cursor. Order of completion
    /// is not guaranteed — only [`crate::reanalysis::ReanalysisService`]
    /// promises chronological ordering, and only within a thread.
    pub async fn run_batch(&self, messages: Vec<Message>) -> BatchSummary {
        let start = Instant::now();
        let total = messages.len();
        let messages = Arc::new(messages);
        let next_index = Arc::new(AtomicUsize::new(0));
        let completed = Arc::new(AtomicU64::new(0));
        let succeeded = Arc::new(AtomicU64::new(0));
        let failed = Arc::new(AtomicU64::new(0));
        let linked = Arc::new(AtomicU64::new(0));

        let worker_count = self.concurrency.min(total.max(1));
        let mut handles = Vec::with_capacity(worker_count);

        for _ in 0..worker_count {
            let processor = Arc::clone(&self.processor);
            let messages = Arc::clone(&messages);
            let next_index = Arc::clone(&next_index);
            let completed = Arc::clone(&completed);
            let succeeded = Arc::clone(&succeeded);
            let failed = Arc::clone(&failed);
            let linked = Arc::clone(&linked);

            handles.push(tokio::spawn(async move {
                loop {
                    let index = next_index.fetch_add(1, Ordering::Relaxed);
                    if index >= messages.len() {
                        break;
                    }
                    let message = &messages[index];
                    match processor.process_message(message).await {
                        Ok(outcome) => {
                            succeeded.fetch_add(1, Ordering::Relaxed);
                            if outcome.shipment_id.is_some() {
                                linked.fetch_add(1, Ordering::Relaxed);
                            }
                        }
                        Err(err) => {
                            failed.fetch_add(1, Ordering::Relaxed);
                            warn!(message_id = %message.message_id, error = %err, "message processing failed");
                        }
                    }

                    let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                    if done % PROGRESS_INTERVAL == 0 {
                        info!(completed = done, total, "batch progress");
                    }
                }
            }));
        }

        for handle in handles {
            let _ = handle.await;
        }

        let processed = completed.load(Ordering::Relaxed);
        info!(completed = processed, total, "batch complete");

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
    use chrono::Utc;
    use freightline_core::enums::Direction;
    use freightline_core::error::LlmError;
    use freightline_core::ids::{MessageId, ThreadId};
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
                    "summary": "routine update",
                    "has_action": false,
                    "has_issue": false,
                }),
                model_used: inv.model,
                tokens_input: Some(5),
                tokens_output: Some(5),
            })
        }
    }

    fn message(id: &str) -> Message {
        Message {
            message_id: MessageId::new(id),
            thread_id: ThreadId::new(format!("t-{id}")),
            subject: "Routine update".to_string(),
            body: "Just a routine status note, nothing actionable here.".to_string(),
            sender_address: "ops@example.com".to_string(),
            received_at: Utc::now(),
            direction: Direction::Inbound,
            attachments: vec![],
        }
    }

    #[tokio::test]
    async fn processes_every_message_exactly_once() {
        let store = Arc::new(InMemoryStore::new());
        let patterns = Arc::new(PatternCache::new(PatternCacheConfig { ttl: Duration::from_secs(300) }));
        patterns.load(vec![]);
        let action_rules = Arc::new(ActionRuleCache::new(Duration::from_secs(300)));
        action_rules.load(vec![]);
        let flow_rules = Arc::new(FlowRuleCache::new(Duration::from_secs(300)));
        flow_rules.load(vec![]);

        let processor = Arc::new(Processor::new(
            store.clone(),
            Arc::new(AlwaysEmptyBackend),
            Arc::new(StubPdfExtractor::new("")),
            patterns,
            action_rules,
            flow_rules,
            Arc::new(Metrics::new()),
            ProcessorConfig::default(),
        ));

        let messages: Vec<Message> = (0..12).map(|i| message(&format!("m{i}"))).collect();
        let pool = WorkerPool::new(processor, 4);
        let summary = pool.run_batch(messages).await;

        assert_eq!(summary.processed, 12);
        assert_eq!(summary.succeeded, 12);
        assert_eq!(summary.failed, 0);
    }

    #[tokio::test]
    async fn empty_batch_completes_immediately() {
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

        let pool = WorkerPool::new(processor, 5);
        let summary = pool.run_batch(vec![]).await;
        assert_eq!(summary.processed, 0);
    }
}
