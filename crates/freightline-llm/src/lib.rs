//! LLM extraction layer (spec §4.3, §6): prompt composition, the
//! vendor-agnostic [`LlmBackend`] trait, an Anthropic HTTP implementation,
//! the forced-tool-call schema, and [`extractor::extract`] tying them
//! together.

pub mod anthropic;
pub mod backend;
pub mod extractor;
pub mod prompt;
pub mod schema;

pub use anthropic::AnthropicBackend;
pub use backend::{LlmBackend, LlmInvocation, LlmResult};
pub use extractor::{extract, ExtractionOutcome, ExtractionRequest};
