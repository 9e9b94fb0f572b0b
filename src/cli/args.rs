//! Command-line surface (SPEC_FULL.md §A.3.1), built with `clap::Parser`.

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};

/// freightline - ingestion and enrichment pipeline for freight-forwarding email
#[derive(Parser)]
#[command(name = "freightline")]
#[command(about = "Ingests, classifies, and enriches freight-forwarding email into shipment records")]
#[command(version)]
pub struct Cli {
    /// Print what would happen without invoking the store or the LLM vendor
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Override the worker concurrency resolved from config/environment
    #[arg(long, global = true)]
    pub concurrency: Option<usize>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch and process every message received after `--after` (§6 "run").
    Run {
        /// Only messages received strictly after this timestamp (RFC 3339).
        #[arg(long)]
        after: DateTime<Utc>,

        /// Only messages received at or before this timestamp (RFC 3339).
        #[arg(long)]
        before: Option<DateTime<Utc>>,

        /// Cap the number of messages fetched for this run.
        #[arg(long)]
        max_results: Option<usize>,
    },

    /// Reprocess a fixed set of messages in strict per-thread chronological
    /// order (§4.8 "Reanalysis"), selected by thread id or receipt window.
    Reanalyze {
        /// Thread ids to reanalyze. Mutually exclusive with `--after`.
        #[arg(long = "thread")]
        threads: Vec<String>,

        /// Reanalyze every message received after this timestamp instead of
        /// naming threads directly.
        #[arg(long, conflicts_with = "threads")]
        after: Option<DateTime<Utc>>,
    },

    /// Force the pattern cache to reload from the store on next use (§4.2).
    ReloadPatterns,

    /// Force the action-rule and flow-rule caches to reload on next use (§4.4).
    ReloadRules,

    /// Connectivity checks against the store and the LLM vendor (§6 "doctor").
    Doctor,
}
