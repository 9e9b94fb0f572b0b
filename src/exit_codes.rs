//! Exit code constants and `FreightlineError` -> exit code mapping.

use freightline_core::error::{FreightlineError, LlmError, StoreError};

/// Exit code constants for the `freightline` binary.
pub mod codes {
    /// Success - operation completed successfully.
    pub const SUCCESS: i32 = 0;

    /// CLI arguments error - invalid or missing command-line arguments.
    pub const CLI_ARGS: i32 = 2;

    /// Configuration missing or invalid at process start (§7 "Configuration missing").
    pub const CONFIG: i32 = 3;

    /// Store unreachable or rejected a query.
    pub const STORE: i32 = 4;

    /// LLM vendor unreachable, rejected the request, or returned a payload
    /// that failed schema validation after every escalation tier.
    pub const LLM: i32 = 5;

    /// Unclassified failure.
    pub const UNKNOWN: i32 = 1;
}

/// Maps a top-level pipeline error to the process exit code it should
/// produce.
#[must_use]
pub fn error_to_exit_code(error: &FreightlineError) -> i32 {
    match error {
        FreightlineError::Config(_) => codes::CONFIG,
        FreightlineError::Store(_) => codes::STORE,
        FreightlineError::Linker(freightline_core::error::LinkerError::Store(_)) => codes::STORE,
        FreightlineError::Llm(_) => codes::LLM,
        FreightlineError::SchemaRejection(_) => codes::LLM,
        FreightlineError::Normalize(_) | FreightlineError::Pattern(_) | FreightlineError::Linker(_) => {
            codes::UNKNOWN
        }
        FreightlineError::Io(_) => codes::UNKNOWN,
    }
}

/// True for failures a `doctor` connectivity check should report as a
/// vendor outage rather than a misconfiguration.
#[must_use]
pub fn is_transient_vendor_failure(error: &FreightlineError) -> bool {
    matches!(
        error,
        FreightlineError::Llm(LlmError::Transport(_) | LlmError::Timeout { .. } | LlmError::Provider { .. })
            | FreightlineError::Store(StoreError::Connection(_))
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use freightline_core::error::ConfigError;

    #[test]
    fn config_error_maps_to_config_exit_code() {
        let err = FreightlineError::Config(ConfigError::MissingEnv("DATABASE_URL".to_string()));
        assert_eq!(error_to_exit_code(&err), codes::CONFIG);
    }

    #[test]
    fn store_connection_error_is_transient() {
        let err = FreightlineError::Store(StoreError::Connection("refused".to_string()));
        assert!(is_transient_vendor_failure(&err));
        assert_eq!(error_to_exit_code(&err), codes::STORE);
    }
}
