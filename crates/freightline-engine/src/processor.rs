//! Per-message processing pipeline (§4.7): the twelve-step algorithm that
//! turns one [`Message`] into a persisted [`Chronicle`], linked to a
//! shipment, with actions and issues recorded.
//!
//! One sequential, fully-owned pipeline per item (analyze, extract,
//! validate, consolidate) — no fan-out inside a single message (§5 "No
//! fan-out inside a single message").

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use freightline_core::enums::{
    ActionOwner, ActionPriority, ConfidenceSource, CutoffField, DeadlineType, IssueType,
    Recommendation, Stage,
};
use freightline_core::error::FreightlineError;
use freightline_core::ids::{ActionId, ChronicleId, ShipmentId};
use freightline_core::model::{
    Action, ActionRule, Chronicle, ChronicleError, ExtractedAnalysis, Issue, LearningEpisode,
    Message, PatternMatchInput,
};
use freightline_confidence::ConfidenceInput;
use freightline_llm::prompt::{PromptInput, ThreadChronicleSummary};
use freightline_llm::{extract as llm_extract, ExtractionOutcome, ExtractionRequest, LlmBackend};
use freightline_patterns::{PatternCache, PatternMatcher};
use freightline_rules::{ActionRuleCache, FlowRuleCache};
use freightline_store::Store;

use crate::collaborators::PdfExtractor;
use crate::fast_extract;
use crate::metrics::Metrics;

/// Model identifiers for the three extraction tiers (§4.4 escalation
/// ladder). Plain aliases, resolved by configuration.
#[derive(Debug, Clone)]
pub struct ModelTiers {
    pub haiku: String,
    pub sonnet: String,
    pub opus: String,
}

impl Default for ModelTiers {
    fn default() -> Self {
        Self { haiku: "haiku".to_string(), sonnet: "sonnet".to_string(), opus: "opus".to_string() }
    }
}

/// Everything the processor needs besides its collaborators (§A.3).
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    pub model_tiers: ModelTiers,
    pub llm_timeout: Duration,
    pub date_year_min: i32,
    pub date_year_max: i32,
    pub retry_cap: u32,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            model_tiers: ModelTiers::default(),
            llm_timeout: Duration::from_secs(30),
            date_year_min: 2024,
            date_year_max: 2028,
            retry_cap: 3,
        }
    }
}

/// Outcome of [`Processor::process_message`] (§4.7 step 12).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessStatus {
    Processed,
    /// §7 "Duplicate / idempotent hit": success with a marker, no writes.
    AlreadyProcessed,
    /// §7 "Retry-cap exhausted": success-with-skip, LLM never invoked.
    SkippedRetryCapExceeded,
}

/// How the returned shipment was resolved, if any (§4.5 "Find-or-create").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkedBy {
    ExistingShipment,
    NewShipment,
}

#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    pub chronicle_id: Option<ChronicleId>,
    pub shipment_id: Option<ShipmentId>,
    pub linked_by: Option<LinkedBy>,
    pub status: ProcessStatus,
}

/// Wires every pipeline crate together for one message at a time. Cheap to
/// clone (everything inside is an `Arc`) so a [`crate::pool::WorkerPool`]
/// can hand every worker task its own handle to the same processor.
#[derive(Clone)]
pub struct Processor {
    store: Arc<dyn Store>,
    llm: Arc<dyn LlmBackend>,
    pdf: Arc<dyn PdfExtractor>,
    patterns: Arc<PatternCache>,
    action_rules: Arc<ActionRuleCache>,
    flow_rules: Arc<FlowRuleCache>,
    metrics: Arc<Metrics>,
    config: ProcessorConfig,
}

impl Processor {
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        llm: Arc<dyn LlmBackend>,
        pdf: Arc<dyn PdfExtractor>,
        patterns: Arc<PatternCache>,
        action_rules: Arc<ActionRuleCache>,
        flow_rules: Arc<FlowRuleCache>,
        metrics: Arc<Metrics>,
        config: ProcessorConfig,
    ) -> Self {
        Self { store, llm, pdf, patterns, action_rules, flow_rules, metrics, config }
    }

    #[must_use]
    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Runs the full per-message algorithm (§4.7).
    ///
    /// # Errors
    /// Propagates store/LLM/pattern failures that are fatal for this
    /// message (§7 "Store-save failures on the primary chronicle row are
    /// fatal for that message"). Learning-episode and attachment-extraction
    /// failures are logged and swallowed, never returned.
    pub async fn process_message(&self, message: &Message) -> Result<ProcessOutcome, FreightlineError> {
        // Step 1: retry cap.
        let error_count = self.store.count_errors(&message.message_id).await?;
        if error_count >= self.config.retry_cap {
            return Ok(ProcessOutcome {
                chronicle_id: None,
                shipment_id: None,
                linked_by: None,
                status: ProcessStatus::SkippedRetryCapExceeded,
            });
        }

        // Step 2: idempotency.
        if let Some(existing) = self.store.find_chronicle_by_message_id(&message.message_id).await? {
            return Ok(ProcessOutcome {
                chronicle_id: Some(existing.chronicle_id),
                shipment_id: existing.shipment_id,
                linked_by: None,
                status: ProcessStatus::AlreadyProcessed,
            });
        }

        match self.process_new_message(message).await {
            Ok(outcome) => Ok(outcome),
            Err(err) => {
                let _ = self
                    .store
                    .record_error(ChronicleError {
                        message_id: message.message_id.clone(),
                        occurred_at: Utc::now(),
                        reason: err.to_string(),
                    })
                    .await;
                Err(err)
            }
        }
    }

    async fn process_new_message(&self, message: &Message) -> Result<ProcessOutcome, FreightlineError> {
        // Step 3: attachment extraction.
        let mut attachment_texts = Vec::with_capacity(message.attachments.len());
        for attachment in &message.attachments {
            if let Some(text) = &attachment.extracted_text {
                attachment_texts.push(text.clone());
                continue;
            }
            match self.pdf.extract(attachment).await {
                Ok(text) => {
                    let mut extracted = attachment.clone();
                    extracted.set_extracted_text(text);
                    if let Some(text) = extracted.extracted_text {
                        attachment_texts.push(text);
                    }
                }
                Err(err) => {
                    warn!(message_id = %message.message_id, filename = %attachment.filename, error = %err, "attachment extraction failed");
                }
            }
        }

        // Step 4: thread context.
        let history = self
            .store
            .thread_history(&message.thread_id, message.received_at, freightline_store::THREAD_HISTORY_LIMIT)
            .await?;
        let thread_position = u32::try_from(history.len()).unwrap_or(u32::MAX).saturating_add(1);
        let thread_context: Vec<ThreadChronicleSummary> = history.iter().map(summarize_chronicle).collect();

        // Step 5: classify.
        let has_attachment = message.has_attachment();
        let pattern_input = PatternMatchInput {
            subject: &message.subject,
            sender_address: &message.sender_address,
            body_text: &message.body,
            has_attachment,
            thread_position,
        };
        let match_outcome = PatternMatcher::new(&self.patterns).match_input(&pattern_input)?;

        let pattern_accepted = match_outcome.matched && !match_outcome.requires_fallback;

        if let Some(pattern_id) = &match_outcome.pattern_id {
            if pattern_accepted {
                let _ = self.store.increment_pattern_hit(pattern_id).await;
            } else {
                let _ = self.store.increment_pattern_miss(pattern_id).await;
            }
        }

        let (mut analysis, mut confidence_source, mut repairs_applied, pattern_agreement) = if pattern_accepted {
            self.metrics.record_pattern_matched();
            let document_type = match_outcome.document_type.unwrap_or_default();
            let fast = fast_extract::extract(&message.subject, &message.body, &attachment_texts);
            let mut analysis = ExtractedAnalysis { document_type, ..Default::default() };
            analysis.booking_number = fast.booking_number;
            analysis.container_numbers = fast.container_numbers;
            analysis.vgm_cutoff = fast.vgm_cutoff;
            analysis.si_cutoff = fast.si_cutoff;
            analysis.cargo_cutoff = fast.cargo_cutoff;
            analysis.doc_cutoff = fast.doc_cutoff;
            analysis.eta = fast.eta;
            analysis.etd = fast.etd;
            analysis.summary = truncate_chars(&message.subject, 150);
            (analysis, ConfidenceSource::Pattern, 0u32, true)
        } else {
            self.metrics.record_ai_needed();
            if thread_position >= 2 {
                info!(message_id = %message.message_id, "subject untrusted for reply, omitted from LLM prompt");
            }
            let outcome = self
                .run_llm_extraction(message, &attachment_texts, thread_position, &thread_context, self.config.model_tiers.haiku.clone())
                .await?;
            let agreement = match_outcome
                .document_type
                .is_some_and(|d| d == outcome.analysis.document_type);
            (outcome.analysis, ConfidenceSource::Haiku, outcome.repairs_applied, agreement)
        };

        // Step 6: normalize + cross-validate. Idempotent (R1), so re-running
        // it on an already-normalized pattern-path analysis is harmless.
        analysis = freightline_normalize::normalize(analysis, &message.subject, self.config.date_year_min, self.config.date_year_max);

        // Step 7: action determination.
        let is_reply = thread_position >= 2;
        let rule = self.action_rules.lookup(analysis.document_type, analysis.from_party, is_reply);
        let action_plan = determine_action(rule.as_ref(), &analysis, &message.body, message.received_at);

        // Step 8: confidence + escalation.
        let sender_domain = sender_domain_of(&message.sender_address);
        let sender_domain_accuracy = self.store.sender_domain_accuracy(&sender_domain).await?;
        let combined_len = message.combined_text_len();

        let mut escalation_reason: Option<String> = None;
        let mut confidence_score;
        let mut recommendation;
        {
            let input = ConfidenceInput {
                analysis: &analysis,
                pattern_agreement,
                sender_domain_accuracy,
                repairs_applied,
                message_combined_len: combined_len,
            };
            let outcome = freightline_confidence::score(&input);
            confidence_score = outcome.score;
            recommendation = outcome.recommendation;
        }

        if recommendation == Recommendation::EscalateSonnet {
            self.metrics.record_escalated_sonnet();
            let outcome = self
                .run_llm_extraction(message, &attachment_texts, thread_position, &thread_context, self.config.model_tiers.sonnet.clone())
                .await?;
            analysis = outcome.analysis;
            repairs_applied = outcome.repairs_applied;
            confidence_source = ConfidenceSource::Sonnet;
            escalation_reason = Some("escalated_sonnet".to_string());

            let input = ConfidenceInput {
                analysis: &analysis,
                pattern_agreement: false,
                sender_domain_accuracy,
                repairs_applied,
                message_combined_len: combined_len,
            };
            let outcome = freightline_confidence::score(&input);
            confidence_score = outcome.score;
            recommendation = outcome.recommendation;
        }

        if recommendation == Recommendation::EscalateOpus {
            self.metrics.record_escalated_opus();
            let outcome = self
                .run_llm_extraction(message, &attachment_texts, thread_position, &thread_context, self.config.model_tiers.opus.clone())
                .await?;
            analysis = outcome.analysis;
            repairs_applied = outcome.repairs_applied;
            confidence_source = ConfidenceSource::Opus;
            escalation_reason = Some(match escalation_reason {
                Some(prev) => format!("{prev},escalated_opus"),
                None => "escalated_opus".to_string(),
            });

            let input = ConfidenceInput {
                analysis: &analysis,
                pattern_agreement: false,
                sender_domain_accuracy,
                repairs_applied,
                message_combined_len: combined_len,
            };
            let outcome = freightline_confidence::score(&input);
            confidence_score = outcome.score;
            recommendation = outcome.recommendation;
        }

        match recommendation {
            Recommendation::FlagReview => self.metrics.record_flagged(),
            Recommendation::Accept => self.metrics.record_accepted(),
            Recommendation::EscalateSonnet | Recommendation::EscalateOpus => {}
        }

        // Resolve the shipment before persisting, so the chronicle row
        // carries its final `shipment_id`/`review_reasons` in one write.
        let candidates = self
            .store
            .shipment_candidates(
                analysis.booking_number.as_deref(),
                analysis.mbl_number.as_deref(),
                analysis.work_order_number.as_deref(),
                &analysis.container_numbers,
            )
            .await?;

        let mut shipment = freightline_linker::find_shipment(&analysis, &candidates).cloned();
        let mut linked_by = shipment.as_ref().map(|_| LinkedBy::ExistingShipment);
        let is_new_shipment = shipment.is_none() && freightline_linker::should_create(&analysis);
        if is_new_shipment {
            let shipment_id = ShipmentId::new(format!("shipment-{}", message.message_id.as_str()));
            shipment = Some(freightline_linker::new_shipment(shipment_id, &analysis, message.received_at));
            linked_by = Some(LinkedBy::NewShipment);
        }
        let shipment_id = shipment.as_ref().map(|s| s.shipment_id.clone());

        let stage_for_flow = if is_new_shipment {
            Stage::Pending
        } else {
            shipment.as_ref().map_or(Stage::Pending, |s| s.stage)
        };
        let review_reasons = freightline_linker::flow_validate(&self.flow_rules, stage_for_flow, analysis.document_type, confidence_score);
        let review_reason_strs: Vec<String> = review_reasons.iter().map(|r| r.as_str().to_string()).collect();

        // Step 9: persist.
        let chronicle_id = ChronicleId::new(format!("chronicle-{}", message.message_id.as_str()));
        let chronicle = Chronicle {
            chronicle_id: chronicle_id.clone(),
            message_id: message.message_id.clone(),
            thread_id: message.thread_id.clone(),
            occurred_at: message.received_at,
            analysis: analysis.clone(),
            confidence_source,
            confidence_score: confidence_score.unwrap_or(0),
            escalation_reason,
            reanalysis_flags: Vec::new(),
            shipment_id: shipment_id.clone(),
            review_reasons: review_reason_strs,
        };
        self.store.save_chronicle(&chronicle).await?;
        info!(message_id = %message.message_id, document_type = %analysis.document_type, confidence = ?confidence_score, "classified");

        // Step 10: link shipment, emit action/issue records, close resolved
        // actions.
        if let Some(mut shipment) = shipment {
            if !is_new_shipment {
                freightline_linker::merge_known_values(&mut shipment, &analysis, message.received_at);
            }
            freightline_linker::advance_stage(&mut shipment, &analysis, message.received_at);

            let open_actions = self.store.open_actions_for_shipment(&shipment.shipment_id).await?;
            for action in freightline_linker::actions_to_resolve(analysis.document_type, &open_actions) {
                let mut closed = action.clone();
                freightline_linker::close_action(&mut closed, message.received_at);
                self.store.save_action(&closed).await?;
            }

            if let Some((description, owner, priority, deadline)) = action_plan {
                let action = Action {
                    action_id: ActionId::new(format!("action-{}", chronicle_id.as_str())),
                    shipment_id: shipment.shipment_id.clone(),
                    chronicle_id: chronicle_id.clone(),
                    description,
                    owner,
                    priority,
                    deadline,
                    opened_at: message.received_at,
                    completed_at: None,
                };
                self.store.save_action(&action).await?;
            }

            if analysis.has_issue {
                let issue = Issue {
                    shipment_id: shipment.shipment_id.clone(),
                    chronicle_id: chronicle_id.clone(),
                    issue_type: analysis.issue_type.unwrap_or(IssueType::Documentation),
                    description: analysis.issue_description.clone().unwrap_or_default(),
                    opened_at: message.received_at,
                    resolved_at: None,
                };
                self.store.save_issue(&issue).await?;
            }

            self.store.save_shipment(&shipment).await?;
        }

        // Step 11: record learning episode (non-fatal).
        let episode = LearningEpisode {
            chronicle_id: chronicle_id.clone(),
            predicted_type: analysis.document_type,
            confidence: confidence_score.unwrap_or(0),
            method: confidence_source,
            sender_domain,
            thread_position,
            flow_validation_passed: review_reasons.is_empty(),
            review_reason: review_reasons.first().map(|r| r.as_str().to_string()),
        };
        if let Err(err) = self.store.record_learning_episode(&episode).await {
            warn!(message_id = %message.message_id, error = %err, "failed to record learning episode");
        }

        // Step 12: return.
        Ok(ProcessOutcome { chronicle_id: Some(chronicle_id), shipment_id, linked_by, status: ProcessStatus::Processed })
    }

    async fn run_llm_extraction(
        &self,
        message: &Message,
        attachment_texts: &[String],
        thread_position: u32,
        thread_context: &[ThreadChronicleSummary],
        model: String,
    ) -> Result<ExtractionOutcome, FreightlineError> {
        let prompt_input = PromptInput {
            subject: &message.subject,
            body: &message.body,
            attachment_texts,
            thread_position,
            thread_context,
            aux_context_text: None,
        };
        let request = ExtractionRequest {
            model,
            timeout: self.config.llm_timeout,
            prompt_input,
            subject: &message.subject,
            year_min: self.config.date_year_min,
            year_max: self.config.date_year_max,
        };
        let outcome = llm_extract(self.llm.as_ref(), request).await?;
        Ok(outcome)
    }
}

fn summarize_chronicle(chronicle: &Chronicle) -> ThreadChronicleSummary {
    let mut key_identifiers = Vec::new();
    if let Some(booking) = &chronicle.analysis.booking_number {
        key_identifiers.push(booking.clone());
    }
    if let Some(mbl) = &chronicle.analysis.mbl_number {
        key_identifiers.push(mbl.clone());
    }
    key_identifiers.extend(chronicle.analysis.container_numbers.iter().cloned());

    ThreadChronicleSummary {
        document_type: chronicle.analysis.document_type.to_string(),
        summary: chronicle.analysis.summary.clone(),
        from_party: chronicle.analysis.from_party.to_string(),
        key_identifiers,
    }
}

fn sender_domain_of(address: &str) -> String {
    address.rsplit('@').next().unwrap_or(address).to_lowercase()
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        text.chars().take(max_chars).collect()
    }
}

/// One priority tier up from `priority`, saturating at `Critical` (§4.7
/// step 7 "priority boost keywords").
fn bump_priority(priority: ActionPriority) -> ActionPriority {
    match priority {
        ActionPriority::Low => ActionPriority::Medium,
        ActionPriority::Medium => ActionPriority::High,
        ActionPriority::High | ActionPriority::Critical => ActionPriority::Critical,
    }
}

fn cutoff_date(field: CutoffField, analysis: &ExtractedAnalysis) -> Option<chrono::NaiveDate> {
    match field {
        CutoffField::SiCutoff => analysis.si_cutoff,
        CutoffField::VgmCutoff => analysis.vgm_cutoff,
        CutoffField::CargoCutoff => analysis.cargo_cutoff,
        CutoffField::DocCutoff => analysis.doc_cutoff,
    }
}

/// Computes an action's deadline per its rule's `deadline_type` (§4.7 step
/// 7: "fixed days from receipt OR cutoff-relative with offset OR urgent =
/// 24h").
fn compute_deadline(rule: &ActionRule, analysis: &ExtractedAnalysis, received_at: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match rule.deadline_type {
        DeadlineType::FixedDays => {
            let days = rule.deadline_days.unwrap_or(0);
            Some(received_at + chrono::Duration::days(i64::from(days)))
        }
        DeadlineType::CutoffRelative => {
            let date = rule.cutoff_field.and_then(|field| cutoff_date(field, analysis))?;
            let cutoff_at = date.and_hms_opt(0, 0, 0)?.and_utc();
            Some(match rule.deadline_days {
                Some(days) => cutoff_at - chrono::Duration::days(i64::from(days)),
                None => cutoff_at,
            })
        }
        DeadlineType::Urgent => Some(received_at + chrono::Duration::hours(24)),
    }
}

/// §4.7 step 7: look up the rule, apply flip keywords, compute priority and
/// deadline. Returns `None` when no action should be opened.
fn determine_action(
    rule: Option<&ActionRule>,
    analysis: &ExtractedAnalysis,
    body: &str,
    received_at: DateTime<Utc>,
) -> Option<(String, ActionOwner, ActionPriority, Option<DateTime<Utc>>)> {
    let rule = rule?;
    let body_lower = body.to_lowercase();

    let mut has_action = rule.has_action;
    if rule.flip_to_action_keywords.iter().any(|k| body_lower.contains(&k.to_lowercase())) {
        has_action = true;
    }
    if rule.flip_to_no_action_keywords.iter().any(|k| body_lower.contains(&k.to_lowercase())) {
        has_action = false;
    }
    if !has_action {
        return None;
    }

    let mut priority = rule.priority_base;
    if rule.priority_boost_keywords.iter().any(|k| body_lower.contains(&k.to_lowercase())) {
        priority = bump_priority(priority);
    }

    let deadline = compute_deadline(rule, analysis, received_at);
    Some((rule.description_template.clone(), rule.owner, priority, deadline))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use freightline_core::enums::{DeadlineType, Direction, DocumentType, FromParty, TransportMode};
    use freightline_core::error::LlmError;
    use freightline_core::ids::{MessageId, ThreadId};
    use freightline_core::model::{Pattern, Shipment};
    use freightline_llm::{LlmInvocation, LlmResult};
    use freightline_patterns::PatternCacheConfig;
    use freightline_store::memory::InMemoryStore;
    use serde_json::json;
    use tokio::sync::Mutex;

    use crate::collaborators::StubPdfExtractor;

    struct ScriptedLlmBackend {
        responses: Mutex<Vec<serde_json::Value>>,
    }

    impl ScriptedLlmBackend {
        fn new(responses: Vec<serde_json::Value>) -> Self {
            Self { responses: Mutex::new(responses) }
        }
    }

    #[async_trait]
    impl LlmBackend for ScriptedLlmBackend {
        async fn invoke(&self, inv: LlmInvocation) -> Result<LlmResult, LlmError> {
            let mut responses = self.responses.lock().await;
            let input = if responses.len() > 1 { responses.remove(0) } else { responses[0].clone() };
            Ok(LlmResult { tool_input: input, model_used: inv.model, tokens_input: Some(10), tokens_output: Some(5) })
        }
    }

    fn booking_confirmation_pattern() -> Pattern {
        Pattern {
            id: "p-booking".to_string(),
            pattern_type: freightline_core::enums::PatternType::Subject,
            regex: r"(?i)\bBKG\b".to_string(),
            flags: String::new(),
            document_type: DocumentType::BookingConfirmation,
            priority: 10,
            confidence_base: 95,
            requires_attachment: false,
            min_thread_position: None,
            max_thread_position: None,
        }
    }

    fn build_processor(store: Arc<InMemoryStore>, llm: Arc<dyn LlmBackend>) -> Processor {
        let patterns = Arc::new(PatternCache::new(PatternCacheConfig { ttl: Duration::from_secs(300) }));
        patterns.load(vec![booking_confirmation_pattern()]);
        let action_rules = Arc::new(ActionRuleCache::new(Duration::from_secs(300)));
        let flow_rules = Arc::new(FlowRuleCache::new(Duration::from_secs(300)));
        flow_rules.load(vec![]);
        action_rules.load(vec![]);
        Processor::new(
            store,
            llm,
            Arc::new(StubPdfExtractor::new("")),
            patterns,
            action_rules,
            flow_rules,
            Arc::new(Metrics::new()),
            ProcessorConfig::default(),
        )
    }

    fn message(message_id: &str, subject: &str, body: &str) -> Message {
        Message {
            message_id: MessageId::new(message_id),
            thread_id: ThreadId::new("t1"),
            subject: subject.to_string(),
            body: body.to_string(),
            sender_address: "noreply@maersk.com".to_string(),
            received_at: Utc::now(),
            direction: Direction::Inbound,
            attachments: vec![],
        }
    }

    #[tokio::test]
    async fn scenario_s1_pattern_match_persists_identifiers_and_creates_shipment() {
        let store = Arc::new(InMemoryStore::new());
        let llm = Arc::new(ScriptedLlmBackend::new(vec![json!({})]));
        let processor = build_processor(store.clone(), llm);

        let mut msg = message("m1", "BKG 2038256270 confirmed", "");
        let mut attachment = freightline_core::model::Attachment::new("vgm.pdf", "application/pdf", 10);
        attachment.set_extracted_text("VGM CUTOFF 2026-01-15".to_string());
        msg.attachments.push(attachment);

        let outcome = processor.process_message(&msg).await.unwrap();
        assert_eq!(outcome.status, ProcessStatus::Processed);
        assert!(outcome.shipment_id.is_some());
        assert_eq!(outcome.linked_by, Some(LinkedBy::NewShipment));

        let chronicle = store.get_chronicle(&outcome.chronicle_id.unwrap()).await.unwrap().unwrap();
        assert_eq!(chronicle.analysis.booking_number.as_deref(), Some("2038256270"));
        assert_eq!(chronicle.analysis.vgm_cutoff, chrono::NaiveDate::from_ymd_opt(2026, 1, 15));
        assert_eq!(chronicle.confidence_source, ConfidenceSource::Pattern);

        let shipment = store.get_shipment(&outcome.shipment_id.unwrap()).await.unwrap().unwrap();
        assert_eq!(shipment.stage, Stage::Booked);
    }

    #[tokio::test]
    async fn idempotent_resubmission_returns_existing_chronicle() {
        let store = Arc::new(InMemoryStore::new());
        let llm = Arc::new(ScriptedLlmBackend::new(vec![json!({
            "transport_mode": "ocean",
            "identifier_source": "body",
            "document_type": "general_correspondence",
            "from_party": "unknown",
            "message_type": "other",
            "sentiment": "neutral",
            "summary": "hello",
            "has_action": false,
            "has_issue": false,
        })]));
        let processor = build_processor(store.clone(), llm);
        let msg = message("m1", "hello there", "just checking in, nothing shipment-related here at all");

        let first = processor.process_message(&msg).await.unwrap();
        assert_eq!(first.status, ProcessStatus::Processed);
        let second = processor.process_message(&msg).await.unwrap();
        assert_eq!(second.status, ProcessStatus::AlreadyProcessed);
        assert_eq!(second.chronicle_id, first.chronicle_id);
    }

    #[tokio::test]
    async fn retry_cap_exceeded_skips_without_invoking_llm() {
        let store = Arc::new(InMemoryStore::new());
        for _ in 0..3 {
            store
                .record_error(ChronicleError {
                    message_id: MessageId::new("m1"),
                    occurred_at: Utc::now(),
                    reason: "boom".to_string(),
                })
                .await
                .unwrap();
        }
        let llm = Arc::new(ScriptedLlmBackend::new(vec![json!({})]));
        let processor = build_processor(store, llm);
        let msg = message("m1", "unrelated subject", "unrelated body");
        let outcome = processor.process_message(&msg).await.unwrap();
        assert_eq!(outcome.status, ProcessStatus::SkippedRetryCapExceeded);
        assert!(outcome.chronicle_id.is_none());
    }

    #[tokio::test]
    async fn scenario_s4_confirmation_closes_matching_open_action() {
        let store = Arc::new(InMemoryStore::new());
        let shipment_id = ShipmentId::new("s1");
        store
            .save_shipment(&Shipment {
                shipment_id: shipment_id.clone(),
                booking_number: Some("2038256270".to_string()),
                mbl_number: None,
                work_order_number: None,
                container_numbers: vec![],
                stage: Stage::SiStage,
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
            })
            .await
            .unwrap();
        store
            .save_action(&Action {
                action_id: ActionId::new("a1"),
                shipment_id: shipment_id.clone(),
                chronicle_id: ChronicleId::new("c0"),
                description: "Submit VGM before cutoff".to_string(),
                owner: ActionOwner::Shipper,
                priority: ActionPriority::Medium,
                deadline: None,
                opened_at: Utc::now(),
                completed_at: None,
            })
            .await
            .unwrap();

        let llm = Arc::new(ScriptedLlmBackend::new(vec![json!({
            "transport_mode": "ocean",
            "identifier_source": "body",
            "document_type": "vgm_confirmation",
            "from_party": "ocean_carrier",
            "message_type": "confirmation",
            "sentiment": "neutral",
            "summary": "VGM confirmed for booking 2038256270",
            "has_action": false,
            "has_issue": false,
            "booking_number": "2038256270",
        })]));
        let processor = build_processor(store.clone(), llm);
        let msg = message("m2", "VGM Confirmed", "Your VGM submission has been confirmed for booking 2038256270.");

        let outcome = processor.process_message(&msg).await.unwrap();
        assert_eq!(outcome.shipment_id, Some(shipment_id.clone()));

        let open_actions = store.open_actions_for_shipment(&shipment_id).await.unwrap();
        assert!(open_actions.is_empty());
    }

    #[test]
    fn determine_action_fixed_days_deadline() {
        let rule = ActionRule {
            document_type: DocumentType::VgmSubmission,
            from_party: Some(FromParty::Shipper),
            is_reply: false,
            has_action: true,
            verb: "submit".to_string(),
            description_template: "Submit VGM".to_string(),
            owner: ActionOwner::Shipper,
            priority_base: ActionPriority::Medium,
            priority_boost_keywords: vec!["urgent".to_string()],
            deadline_type: DeadlineType::FixedDays,
            deadline_days: Some(2),
            cutoff_field: None,
            flip_to_action_keywords: vec![],
            flip_to_no_action_keywords: vec![],
            auto_resolve_on: vec![],
        };
        let analysis = ExtractedAnalysis { transport_mode: TransportMode::Ocean, ..Default::default() };
        let received_at = Utc::now();
        let (_, _, priority, deadline) =
            determine_action(Some(&rule), &analysis, "please submit urgent", received_at).unwrap();
        assert_eq!(priority, ActionPriority::High);
        assert_eq!(deadline, Some(received_at + chrono::Duration::days(2)));
    }

    #[test]
    fn determine_action_flip_to_no_action_suppresses_action() {
        let rule = ActionRule {
            document_type: DocumentType::VgmSubmission,
            from_party: None,
            is_reply: false,
            has_action: true,
            verb: "submit".to_string(),
            description_template: "Submit VGM".to_string(),
            owner: ActionOwner::Shipper,
            priority_base: ActionPriority::Medium,
            priority_boost_keywords: vec![],
            deadline_type: DeadlineType::Urgent,
            deadline_days: None,
            cutoff_field: None,
            flip_to_action_keywords: vec![],
            flip_to_no_action_keywords: vec!["already submitted".to_string()],
            auto_resolve_on: vec![],
        };
        let analysis = ExtractedAnalysis::default();
        let result = determine_action(Some(&rule), &analysis, "VGM already submitted, no action needed", Utc::now());
        assert!(result.is_none());
    }
}
