//! Command dispatch: parses [`super::args::Cli`], assembles the engine's
//! collaborators once per invocation, and runs the requested subcommand.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use freightline_config::{CliOverrides, Config};
use freightline_engine::collaborators::{MailSource, StaticMailSource, StubPdfExtractor};
use freightline_engine::{BatchSummary, Metrics, Processor, ProcessorConfig, ReanalysisService, WorkerPool};
use freightline_llm::prompt::PromptInput;
use freightline_llm::{AnthropicBackend, ExtractionRequest, LlmBackend};
use freightline_patterns::{PatternCache, PatternCacheConfig};
use freightline_rules::{ActionRuleCache, FlowRuleCache};
use freightline_store::memory::InMemoryStore;
use freightline_store::Store;

use super::args::{Cli, Commands};
use crate::exit_codes::codes;

/// Parses argv, wires the pipeline, and runs the selected subcommand.
/// Returns the process exit code; never panics on a user- or
/// environment-caused failure.
#[must_use]
pub fn run() -> i32 {
    init_logging();

    let cli = Cli::parse();
    let overrides = CliOverrides { concurrency: cli.concurrency, dry_run: cli.dry_run };
    let config = match Config::load(overrides) {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "configuration error");
            return codes::CONFIG;
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(err) => {
            error!(error = %err, "failed to start async runtime");
            return codes::UNKNOWN;
        }
    };

    runtime.block_on(dispatch(cli.command, config))
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).json().try_init();
}

/// Collaborators built once per invocation and shared across whatever
/// subcommand actually runs.
struct Pipeline {
    store: Arc<InMemoryStore>,
    llm: Arc<dyn LlmBackend>,
    patterns: Arc<PatternCache>,
    action_rules: Arc<ActionRuleCache>,
    flow_rules: Arc<FlowRuleCache>,
    processor: Arc<Processor>,
}

async fn dispatch(command: Commands, config: Config) -> i32 {
    let store = Arc::new(InMemoryStore::new());
    let patterns = Arc::new(PatternCache::new(PatternCacheConfig { ttl: config.pattern_cache_ttl }));
    let action_rules = Arc::new(ActionRuleCache::new(config.action_rule_cache_ttl));
    let flow_rules = Arc::new(FlowRuleCache::new(config.flow_rule_cache_ttl));

    if let Err(code) = load_caches(store.as_ref(), &patterns, &action_rules, &flow_rules).await {
        return code;
    }

    let llm: Arc<dyn LlmBackend> = match build_llm_backend(&config) {
        Ok(backend) => backend,
        Err(code) => return code,
    };

    let processor_config = ProcessorConfig {
        retry_cap: config.retry_cap,
        date_year_min: config.date_year_min,
        date_year_max: config.date_year_max,
        ..ProcessorConfig::default()
    };

    let processor = Arc::new(Processor::new(
        store.clone(),
        llm.clone(),
        Arc::new(StubPdfExtractor::new("")),
        patterns.clone(),
        action_rules.clone(),
        flow_rules.clone(),
        Arc::new(Metrics::new()),
        processor_config,
    ));

    let pipeline = Pipeline { store, llm, patterns, action_rules, flow_rules, processor };

    match command {
        Commands::Run { after, before, max_results } => {
            run_batch(&pipeline, &config, after, before, max_results).await
        }
        Commands::Reanalyze { threads, after } => reanalyze(&pipeline, &config, threads, after).await,
        Commands::ReloadPatterns => reload_patterns(&pipeline).await,
        Commands::ReloadRules => reload_rules(&pipeline).await,
        Commands::Doctor => doctor(&pipeline, &config).await,
    }
}

async fn load_caches(
    store: &InMemoryStore,
    patterns: &PatternCache,
    action_rules: &ActionRuleCache,
    flow_rules: &FlowRuleCache,
) -> Result<(), i32> {
    let loaded_patterns = store.load_patterns().await.map_err(|err| {
        error!(error = %err, "failed to load patterns from store");
        codes::STORE
    })?;
    patterns.load(loaded_patterns);

    let loaded_action_rules = store.load_action_rules().await.map_err(|err| {
        error!(error = %err, "failed to load action rules from store");
        codes::STORE
    })?;
    action_rules.load(loaded_action_rules);

    let loaded_flow_rules = store.load_flow_rules().await.map_err(|err| {
        error!(error = %err, "failed to load flow rules from store");
        codes::STORE
    })?;
    flow_rules.load(loaded_flow_rules);

    Ok(())
}

fn build_llm_backend(config: &Config) -> Result<Arc<dyn LlmBackend>, i32> {
    if config.dry_run {
        return Ok(Arc::new(DryRunBackend));
    }

    let api_key = config.anthropic_api_key.clone().ok_or_else(|| {
        error!("ANTHROPIC_API_KEY is required outside of --dry-run");
        codes::CONFIG
    })?;

    AnthropicBackend::new(api_key, None)
        .map(|backend| Arc::new(backend) as Arc<dyn LlmBackend>)
        .map_err(|err| {
            error!(error = %err, "failed to build LLM backend");
            codes::LLM
        })
}

/// Stands in for the LLM vendor under `--dry-run`, matching the
/// `freightline_engine::collaborators` stub pattern so a dry run never
/// touches the network.
struct DryRunBackend;

#[async_trait::async_trait]
impl LlmBackend for DryRunBackend {
    async fn invoke(
        &self,
        inv: freightline_llm::LlmInvocation,
    ) -> Result<freightline_llm::LlmResult, freightline_core::error::LlmError> {
        Ok(freightline_llm::LlmResult {
            tool_input: serde_json::json!({
                "transport_mode": "ocean",
                "identifier_source": "body",
                "document_type": "general_correspondence",
                "from_party": "unknown",
                "message_type": "other",
                "sentiment": "neutral",
                "summary": "dry run: no extraction performed",
                "has_action": false,
                "has_issue": false,
            }),
            model_used: inv.model,
            tokens_input: Some(0),
            tokens_output: Some(0),
        })
    }
}

/// No production mail vendor ships with this pipeline (§B "`MailSource`"
/// has no bundled implementation); `run`/`reanalyze` both read through
/// this empty stand-in until a real mailbox integration is wired in.
fn mail_source() -> StaticMailSource {
    StaticMailSource::new(vec![])
}

async fn run_batch(
    pipeline: &Pipeline,
    config: &Config,
    after: DateTime<Utc>,
    before: Option<DateTime<Utc>>,
    max_results: Option<usize>,
) -> i32 {
    let messages = match mail_source().fetch_since(after, before, max_results).await {
        Ok(messages) => messages,
        Err(err) => {
            error!(error = %err, "failed to fetch messages");
            return codes::STORE;
        }
    };

    info!(count = messages.len(), dry_run = config.dry_run, "starting batch run");
    if config.dry_run {
        println!("{}", serde_json::json!({ "dry_run": true, "messages_fetched": messages.len() }));
        return codes::SUCCESS;
    }

    let pool = WorkerPool::new(pipeline.processor.clone(), config.concurrency);
    let summary = pool.run_batch(messages).await;
    print_summary(&summary);
    codes::SUCCESS
}

async fn reanalyze(pipeline: &Pipeline, config: &Config, threads: Vec<String>, after: Option<DateTime<Utc>>) -> i32 {
    let fetch_after = after.unwrap_or_else(|| DateTime::<Utc>::from_timestamp(0, 0).unwrap_or_default());
    let messages = match mail_source().fetch_since(fetch_after, None, None).await {
        Ok(messages) => messages,
        Err(err) => {
            error!(error = %err, "failed to fetch messages for reanalysis");
            return codes::STORE;
        }
    };

    let messages = if threads.is_empty() {
        messages
    } else {
        let wanted: HashSet<&str> = threads.iter().map(String::as_str).collect();
        messages.into_iter().filter(|m| wanted.contains(m.thread_id.as_str())).collect()
    };

    info!(count = messages.len(), "starting reanalysis");
    let service = ReanalysisService::new(pipeline.processor.clone(), config.concurrency);
    let summary = service.run(messages).await;
    print_summary(&summary);
    codes::SUCCESS
}

async fn reload_patterns(pipeline: &Pipeline) -> i32 {
    match pipeline.store.load_patterns().await {
        Ok(patterns) => {
            pipeline.patterns.load(patterns);
            info!("pattern cache reloaded");
            codes::SUCCESS
        }
        Err(err) => {
            error!(error = %err, "failed to reload patterns");
            codes::STORE
        }
    }
}

async fn reload_rules(pipeline: &Pipeline) -> i32 {
    let action_rules = match pipeline.store.load_action_rules().await {
        Ok(rules) => rules,
        Err(err) => {
            error!(error = %err, "failed to reload action rules");
            return codes::STORE;
        }
    };
    pipeline.action_rules.load(action_rules);

    let flow_rules = match pipeline.store.load_flow_rules().await {
        Ok(rules) => rules,
        Err(err) => {
            error!(error = %err, "failed to reload flow rules");
            return codes::STORE;
        }
    };
    pipeline.flow_rules.load(flow_rules);

    info!("rule caches reloaded");
    codes::SUCCESS
}

async fn doctor(pipeline: &Pipeline, config: &Config) -> i32 {
    let store_ok = pipeline.store.all_shipments().await.is_ok();
    println!("store: {}", if store_ok { "ok" } else { "unreachable" });

    let llm_ok = if config.dry_run {
        println!("llm: skipped (--dry-run)");
        true
    } else {
        match ping_llm(pipeline.llm.as_ref()).await {
            Ok(()) => {
                println!("llm: ok");
                true
            }
            Err(err) => {
                warn!(error = %err, "llm connectivity check failed");
                println!("llm: unreachable ({err})");
                false
            }
        }
    };

    if store_ok && llm_ok {
        codes::SUCCESS
    } else if !store_ok {
        codes::STORE
    } else {
        codes::LLM
    }
}

async fn ping_llm(llm: &dyn LlmBackend) -> Result<(), freightline_core::error::LlmError> {
    let prompt_input = PromptInput {
        subject: "connectivity check",
        body: "ping",
        attachment_texts: &[],
        thread_position: 0,
        thread_context: &[],
        aux_context_text: None,
    };
    let request = ExtractionRequest {
        model: "haiku".to_string(),
        timeout: Duration::from_secs(10),
        prompt_input,
        subject: "connectivity check",
        year_min: 2024,
        year_max: 2028,
    };
    freightline_llm::extract(llm, request).await.map(|_| ())
}

fn print_summary(summary: &BatchSummary) {
    println!(
        "{}",
        serde_json::to_string(summary).unwrap_or_else(|_| "{\"error\":\"failed to serialize summary\"}".to_string())
    );
}
