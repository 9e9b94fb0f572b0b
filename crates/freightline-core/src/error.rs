//! Error taxonomy (spec §7).
//!
//! Each failure domain gets its own `thiserror` enum; `FreightlineError`
//! aggregates them with `#[from]` so callers that span domains (the
//! processor, the CLI) can propagate with `?` and match narrowly where it
//! matters.

use thiserror::Error;

/// Top-level error type returned by pipeline operations that can fail for
/// more than one reason.
#[derive(Error, Debug)]
pub enum FreightlineError {
    #[error("normalization error: {0}")]
    Normalize(#[from] NormalizeError),

    #[error("pattern matcher error: {0}")]
    Pattern(#[from] PatternError),

    #[error("LLM backend error: {0}")]
    Llm(#[from] LlmError),

    #[error("shipment linker error: {0}")]
    Linker(#[from] LinkerError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("schema rejection: {0}")]
    SchemaRejection(#[from] SchemaError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Normalization never raises in the steady state (§4.1 "Failure model"),
/// but the date-repair and enum-mapping helpers still need a typed error
/// for cases that are genuinely a caller mistake (e.g. malformed regex rule
/// configuration), as opposed to unrepairable field data (which nulls).
#[derive(Error, Debug)]
pub enum NormalizeError {
    #[error("invalid regex in normalization table '{table}': {reason}")]
    InvalidTable { table: String, reason: String },
}

/// Pattern-matcher failures (§4.2). Individual bad regexes are dropped and
/// logged, not surfaced as errors (§9 "Compiled-regex set") — this enum
/// covers the cases that do abort the caller's request.
#[derive(Error, Debug)]
pub enum PatternError {
    #[error("pattern cache unavailable: {0}")]
    CacheUnavailable(String),
}

/// LLM backend failures (§4.3, §6). Distinguishes transient transport
/// failures (retried by the caller's own scheduling, §7) from schema
/// rejection (fatal for the message, §7).
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("provider error ({status}): {message}")]
    Provider { status: u16, message: String },

    #[error("request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("tool-call result did not match the expected schema: {0}")]
    SchemaMismatch(#[from] SchemaError),

    #[error("misconfiguration: {0}")]
    Misconfiguration(String),
}

/// Closed-schema validation failures for `ExtractedAnalysis` (§6, §7
/// "Schema rejection").
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("missing required field: {field}")]
    MissingRequiredField { field: &'static str },

    #[error("field '{field}' failed validation: {reason}")]
    InvalidField { field: &'static str, reason: String },
}

/// Shipment-linker failures (§4.5).
#[derive(Error, Debug)]
pub enum LinkerError {
    #[error("shipment {0} not found")]
    ShipmentNotFound(String),

    #[error("store error during linking: {0}")]
    Store(#[from] StoreError),
}

/// Store/repository failures (§6 "Store").
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("query error: {0}")]
    Query(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),
}

/// Configuration failures (§7 "Configuration missing" — process-start fatal).
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnv(String),

    #[error("invalid value for '{key}': {value}")]
    InvalidValue { key: String, value: String },
}
