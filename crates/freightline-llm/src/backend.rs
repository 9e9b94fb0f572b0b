//! Backend-agnostic LLM invocation types, mirroring the invocation/result
//! split a caller needs regardless of vendor.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use freightline_core::error::LlmError;

/// A single forced tool-call invocation. `tool_name`/`tool_schema`
/// together force the backend to return structured output instead of
/// free text (§6 "structured-tool call named `analyze_freight_communication`").
#[derive(Debug, Clone)]
pub struct LlmInvocation {
    pub model: String,
    pub timeout: Duration,
    pub system_prompt: String,
    pub user_prompt: String,
    pub tool_name: String,
    pub tool_schema: Value,
    pub metadata: HashMap<String, Value>,
}

/// Result of a forced tool-call invocation: the parsed tool input, plus
/// bookkeeping the caller may want to log.
#[derive(Debug, Clone)]
pub struct LlmResult {
    pub tool_input: Value,
    pub model_used: String,
    pub tokens_input: Option<u64>,
    pub tokens_output: Option<u64>,
}

/// Abstracts over LLM vendors. Implementations do not retry — the
/// processor owns escalation and retry policy (§4.3 "Retries are not
/// performed here").
#[async_trait]
pub trait LlmBackend: Send + Sync {
    async fn invoke(&self, inv: LlmInvocation) -> Result<LlmResult, LlmError>;
}
