//! Anthropic Messages API backend, using a forced tool call so the
//! response is always the structured `analyze_freight_communication`
//! payload rather than free text (§4.3, §6).

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use freightline_core::error::LlmError;

use crate::backend::{LlmBackend, LlmInvocation, LlmResult};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// HTTP-backed `LlmBackend` talking to Anthropic's Messages API.
pub struct AnthropicBackend {
    client: Arc<reqwest::Client>,
    base_url: String,
    api_key: String,
    max_tokens: u32,
}

impl AnthropicBackend {
    /// Builds a backend from an API key pulled from `ANTHROPIC_API_KEY` by
    /// the caller (§7 "Configuration missing" is fatal at process start,
    /// not here — this constructor just wires the already-resolved key).
    pub fn new(api_key: String, base_url: Option<String>) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| LlmError::Misconfiguration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client: Arc::new(client),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_key,
            max_tokens: DEFAULT_MAX_TOKENS,
        })
    }

    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

#[async_trait]
impl LlmBackend for AnthropicBackend {
    async fn invoke(&self, inv: LlmInvocation) -> Result<LlmResult, LlmError> {
        debug!(model = %inv.model, timeout_secs = inv.timeout.as_secs(), "invoking anthropic backend");

        let tool = AnthropicTool {
            name: inv.tool_name.clone(),
            input_schema: inv.tool_schema["input_schema"].clone(),
        };

        let request_body = AnthropicRequest {
            model: inv.model.clone(),
            max_tokens: self.max_tokens,
            system: inv.system_prompt.clone(),
            messages: vec![AnthropicMessage { role: "user".to_string(), content: inv.user_prompt.clone() }],
            tools: vec![tool],
            tool_choice: AnthropicToolChoice { choice_type: "tool".to_string(), name: inv.tool_name.clone() },
        };

        let response = self
            .client
            .post(&self.base_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request_body)
            .timeout(inv.timeout)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout { timeout_secs: inv.timeout.as_secs() }
                } else {
                    LlmError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Provider { status: status.as_u16(), message: body });
        }

        let parsed: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Transport(format!("failed to parse Anthropic response: {e}")))?;

        let tool_input = parsed
            .content
            .into_iter()
            .find_map(|block| match block {
                ContentBlock::ToolUse { input, .. } => Some(input),
                ContentBlock::Text { .. } => None,
            })
            .ok_or_else(|| {
                LlmError::Transport("Anthropic response contained no tool_use block".to_string())
            })?;

        Ok(LlmResult {
            tool_input,
            model_used: parsed.model,
            tokens_input: parsed.usage.as_ref().map(|u| u.input_tokens),
            tokens_output: parsed.usage.as_ref().map(|u| u.output_tokens),
        })
    }
}

#[derive(Debug, Clone, Serialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Serialize)]
struct AnthropicTool {
    name: String,
    input_schema: Value,
}

#[derive(Debug, Clone, Serialize)]
struct AnthropicToolChoice {
    #[serde(rename = "type")]
    choice_type: String,
    name: String,
}

#[derive(Debug, Clone, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    system: String,
    messages: Vec<AnthropicMessage>,
    tools: Vec<AnthropicTool>,
    tool_choice: AnthropicToolChoice,
}

#[derive(Debug, Clone, Deserialize)]
struct AnthropicResponse {
    model: String,
    content: Vec<ContentBlock>,
    usage: Option<Usage>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text { text: String },
    ToolUse { input: Value },
}

#[derive(Debug, Clone, Deserialize)]
struct Usage {
    input_tokens: u64,
    output_tokens: u64,
}
