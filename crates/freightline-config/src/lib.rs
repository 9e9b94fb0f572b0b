//! Layered configuration: CLI flags > environment > defaults (SPEC_FULL.md
//! §A.3), read once at process start into a [`Config`].

use std::env;
use std::time::Duration;

use freightline_core::error::ConfigError;

const DEFAULT_CONCURRENCY: usize = 5;
const DEFAULT_CACHE_TTL_SECS: u64 = 300;
const DEFAULT_RETRY_CAP: u32 = 3;
const DEFAULT_YEAR_MIN: i32 = 2024;
const DEFAULT_YEAR_MAX: i32 = 2028;
const DEFAULT_ATTACHMENT_MAX_CHARS: usize = 20_000;

/// CLI-flag overrides the binary's argument parser has already resolved.
/// Kept independent of any particular CLI crate so `freightline-config`
/// doesn't need to depend on `clap` just to describe "what a flag can
/// override" (the root binary is the only thing that knows about `clap`).
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub concurrency: Option<usize>,
    pub dry_run: bool,
}

/// Resolved process configuration (SPEC_FULL.md §A.3). Construction is the
/// only place environment variables are read; everything downstream takes
/// a `&Config`.
#[derive(Debug, Clone)]
pub struct Config {
    /// Store connection string. Required unless `dry_run`.
    pub database_url: Option<String>,
    /// LLM vendor API key. Required unless `dry_run`.
    pub anthropic_api_key: Option<String>,
    pub internal_api_key: Option<String>,
    pub bypass_auth: bool,
    pub concurrency: usize,
    pub pattern_cache_ttl: Duration,
    pub action_rule_cache_ttl: Duration,
    pub flow_rule_cache_ttl: Duration,
    pub retry_cap: u32,
    pub date_year_min: i32,
    pub date_year_max: i32,
    pub attachment_max_chars: usize,
    /// When set, `run`/`reanalyze` skip the LLM vendor key requirement and
    /// the CLI prints what it would do without invoking external I/O.
    pub dry_run: bool,
}

impl Config {
    /// Loads configuration from the process environment, applying `cli`
    /// overrides on top (§A.3 "CLI > environment > defaults"). Fails fast
    /// if a required value is missing and `dry_run` wasn't requested (§7
    /// "Configuration missing" — process-start fatal).
    pub fn load(cli: CliOverrides) -> Result<Self, ConfigError> {
        let dry_run = cli.dry_run;

        let database_url = optional_env("DATABASE_URL")?;
        let anthropic_api_key = optional_env("ANTHROPIC_API_KEY")?;

        if !dry_run && database_url.is_none() {
            return Err(ConfigError::MissingEnv("DATABASE_URL".to_string()));
        }
        if !dry_run && anthropic_api_key.is_none() {
            return Err(ConfigError::MissingEnv("ANTHROPIC_API_KEY".to_string()));
        }

        let concurrency = cli
            .concurrency
            .map(Ok)
            .unwrap_or_else(|| env_parsed("FREIGHTLINE_CONCURRENCY", DEFAULT_CONCURRENCY))?;

        Ok(Self {
            database_url,
            anthropic_api_key,
            internal_api_key: optional_env("INTERNAL_API_KEY")?,
            bypass_auth: env_flag("BYPASS_AUTH"),
            concurrency,
            pattern_cache_ttl: Duration::from_secs(env_parsed(
                "FREIGHTLINE_PATTERN_CACHE_TTL_SECS",
                DEFAULT_CACHE_TTL_SECS,
            )?),
            action_rule_cache_ttl: Duration::from_secs(env_parsed(
                "FREIGHTLINE_ACTION_RULE_CACHE_TTL_SECS",
                DEFAULT_CACHE_TTL_SECS,
            )?),
            flow_rule_cache_ttl: Duration::from_secs(env_parsed(
                "FREIGHTLINE_FLOW_RULE_CACHE_TTL_SECS",
                DEFAULT_CACHE_TTL_SECS,
            )?),
            retry_cap: env_parsed("FREIGHTLINE_RETRY_CAP", DEFAULT_RETRY_CAP)?,
            date_year_min: env_parsed("FREIGHTLINE_DATE_YEAR_MIN", DEFAULT_YEAR_MIN)?,
            date_year_max: env_parsed("FREIGHTLINE_DATE_YEAR_MAX", DEFAULT_YEAR_MAX)?,
            attachment_max_chars: env_parsed(
                "FREIGHTLINE_ATTACHMENT_MAX_CHARS",
                DEFAULT_ATTACHMENT_MAX_CHARS,
            )?,
            dry_run,
        })
    }
}

fn optional_env(key: &str) -> Result<Option<String>, ConfigError> {
    match env::var(key) {
        Ok(value) if !value.is_empty() => Ok(Some(value)),
        Ok(_) | Err(env::VarError::NotPresent) => Ok(None),
        Err(env::VarError::NotUnicode(_)) => {
            Err(ConfigError::InvalidValue { key: key.to_string(), value: "<non-utf8>".to_string() })
        }
    }
}

fn env_flag(key: &str) -> bool {
    env::var(key).map(|v| v.eq_ignore_ascii_case("true") || v == "1").unwrap_or(false)
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) => value
            .parse()
            .map_err(|_| ConfigError::InvalidValue { key: key.to_string(), value }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_env() {
        for key in [
            "DATABASE_URL",
            "ANTHROPIC_API_KEY",
            "INTERNAL_API_KEY",
            "BYPASS_AUTH",
            "FREIGHTLINE_CONCURRENCY",
            "FREIGHTLINE_PATTERN_CACHE_TTL_SECS",
            "FREIGHTLINE_ACTION_RULE_CACHE_TTL_SECS",
            "FREIGHTLINE_FLOW_RULE_CACHE_TTL_SECS",
            "FREIGHTLINE_RETRY_CAP",
            "FREIGHTLINE_DATE_YEAR_MIN",
            "FREIGHTLINE_DATE_YEAR_MAX",
            "FREIGHTLINE_ATTACHMENT_MAX_CHARS",
        ] {
            // SAFETY: tests are serialized via ENV_LOCK, no concurrent env access.
            unsafe { env::remove_var(key) };
        }
    }

    #[test]
    fn missing_database_url_is_fatal() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        let err = Config::load(CliOverrides::default()).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnv(key) if key == "DATABASE_URL"));
    }

    #[test]
    fn dry_run_tolerates_missing_credentials() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        let cli = CliOverrides { dry_run: true, ..Default::default() };
        let config = Config::load(cli).unwrap();
        assert!(config.database_url.is_none());
        assert_eq!(config.concurrency, DEFAULT_CONCURRENCY);
    }

    #[test]
    fn cli_override_wins_over_env_default() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        let cli = CliOverrides { concurrency: Some(9), dry_run: true };
        let config = Config::load(cli).unwrap();
        assert_eq!(config.concurrency, 9);
    }

    #[test]
    fn invalid_numeric_env_is_an_error() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_env();
        // SAFETY: serialized via ENV_LOCK.
        unsafe { env::set_var("FREIGHTLINE_RETRY_CAP", "not-a-number") };
        let err = Config::load(CliOverrides { dry_run: true, ..Default::default() }).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key, .. } if key == "FREIGHTLINE_RETRY_CAP"));
        unsafe { env::remove_var("FREIGHTLINE_RETRY_CAP") };
    }
}
