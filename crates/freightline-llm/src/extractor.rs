//! Ties prompt composition, the `LlmBackend`, schema parsing, and
//! normalization into one `extract()` call (§4.3 "Extraction via LLM").
//!
//! Retries are explicitly out of scope here (§4.3 "Retries are not
//! performed here") — the caller (the processor, §4.7) owns the escalation
//! ladder and decides whether to re-invoke at a stronger model tier.

use std::time::Duration;

use freightline_core::error::LlmError;
use freightline_core::model::ExtractedAnalysis;
use freightline_normalize::normalize;

use crate::backend::{LlmBackend, LlmInvocation, LlmResult};
use crate::prompt::{self, PromptInput};
use crate::schema;

/// Everything one extraction attempt needs.
#[derive(Debug, Clone)]
pub struct ExtractionRequest<'a> {
    pub model: String,
    pub timeout: Duration,
    pub prompt_input: PromptInput<'a>,
    /// Original subject, used by date-repair even though it's omitted from
    /// the prompt text itself for replies (§4.1 "Date repair").
    pub subject: &'a str,
    pub year_min: i32,
    pub year_max: i32,
}

/// Outcome of one extraction attempt, with enough provenance for the
/// confidence scorer (§4.4) and the learning episode (§3).
#[derive(Debug, Clone)]
pub struct ExtractionOutcome {
    pub analysis: ExtractedAnalysis,
    /// Count of fields the normalizer changed relative to the raw,
    /// schema-parsed tool output — the confidence scorer's repair-penalty
    /// signal (§4.4 "Penalty for normalizer repairs triggered").
    pub repairs_applied: u32,
    pub model_used: String,
    pub tokens_input: Option<u64>,
    pub tokens_output: Option<u64>,
}

/// Runs one extraction attempt: compose prompt, invoke the backend, parse
/// the forced tool call, normalize. Returns [`LlmError::SchemaMismatch`]
/// when the model's tool input fails validation (§7 "Schema rejection" —
/// fatal for the message, not retried by this layer).
pub async fn extract(
    backend: &dyn LlmBackend,
    request: ExtractionRequest<'_>,
) -> Result<ExtractionOutcome, LlmError> {
    let user_prompt = prompt::compose(&request.prompt_input);
    let tool_schema = schema::tool_schema();

    let invocation = LlmInvocation {
        model: request.model.clone(),
        timeout: request.timeout,
        system_prompt: prompt::SYSTEM_PROMPT.to_string(),
        user_prompt,
        tool_name: "analyze_freight_communication".to_string(),
        tool_schema,
        metadata: Default::default(),
    };

    let LlmResult { tool_input, model_used, tokens_input, tokens_output } =
        backend.invoke(invocation).await?;

    let raw = schema::parse(&tool_input)?;
    let before = raw.clone();
    let normalized = normalize(raw, request.subject, request.year_min, request.year_max);
    let repairs_applied = count_repairs(&before, &normalized);

    Ok(ExtractionOutcome {
        analysis: normalized,
        repairs_applied,
        model_used,
        tokens_input,
        tokens_output,
    })
}

/// Counts fields that differ between the schema-parsed analysis and its
/// normalized form — each difference is one normalizer repair (a nulled or
/// rewritten field), feeding the confidence scorer's repair penalty.
fn count_repairs(before: &ExtractedAnalysis, after: &ExtractedAnalysis) -> u32 {
    let mut repairs = 0u32;
    macro_rules! diff {
        ($field:ident) => {
            if before.$field != after.$field {
                repairs += 1;
            }
        };
    }
    diff!(por);
    diff!(pol);
    diff!(pod);
    diff!(pofd);
    diff!(carrier_name);
    diff!(container_type);
    diff!(booking_number);
    diff!(mbl_number);
    diff!(summary);
    diff!(etd);
    diff!(atd);
    diff!(eta);
    diff!(ata);
    diff!(pickup_date);
    diff!(delivery_date);
    diff!(si_cutoff);
    diff!(vgm_cutoff);
    diff!(cargo_cutoff);
    diff!(doc_cutoff);
    diff!(last_free_day);
    diff!(empty_return_date);
    diff!(pod_delivery_date);
    diff!(action_deadline);
    repairs
}
