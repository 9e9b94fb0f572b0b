//! Process-lifetime counters (§9 Observability: `{patternMatched, aiNeeded,
//! escalatedSonnet, escalatedOpus, accepted, flagged}`), plus the
//! per-batch summary shape.
//!
//! A plain struct accumulated across a batch and returned to the caller,
//! not pushed to an external metrics backend (none is introduced here;
//! no reporting surface is in scope).

use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot-able counters, cheap to update from any worker without
/// coordination (§5 "monotone counters" is the only cross-worker shared
/// mutable state besides the rule caches).
#[derive(Debug, Default)]
pub struct Metrics {
    pattern_matched: AtomicU64,
    ai_needed: AtomicU64,
    escalated_sonnet: AtomicU64,
    escalated_opus: AtomicU64,
    accepted: AtomicU64,
    flagged: AtomicU64,
}

/// A point-in-time read of [`Metrics`]' counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    pub pattern_matched: u64,
    pub ai_needed: u64,
    pub escalated_sonnet: u64,
    pub escalated_opus: u64,
    pub accepted: u64,
    pub flagged: u64,
}

impl Metrics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_pattern_matched(&self) {
        self.pattern_matched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ai_needed(&self) {
        self.ai_needed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_escalated_sonnet(&self) {
        self.escalated_sonnet.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_escalated_opus(&self) {
        self.escalated_opus.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_accepted(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_flagged(&self) {
        self.flagged.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            pattern_matched: self.pattern_matched.load(Ordering::Relaxed),
            ai_needed: self.ai_needed.load(Ordering::Relaxed),
            escalated_sonnet: self.escalated_sonnet.load(Ordering::Relaxed),
            escalated_opus: self.escalated_opus.load(Ordering::Relaxed),
            accepted: self.accepted.load(Ordering::Relaxed),
            flagged: self.flagged.load(Ordering::Relaxed),
        }
    }
}

/// Per-batch summary returned by the CLI `run`/`reanalyze` commands (§6
/// "returns a batch summary `{processed, succeeded, failed, linked,
/// totalTimeMs}`").
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct BatchSummary {
    pub processed: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub linked: u64,
    pub total_time_ms: u64,
    pub metrics: MetricsSnapshot,
}
