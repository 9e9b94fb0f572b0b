//! TTL-cached, atomically-swapped pattern snapshot (§4.2 step 1, §9 "Rule
//! tables as immutable snapshots").
//!
//! A snapshot is a `Vec` of precompiled patterns behind an `Arc`. Readers
//! clone the `Arc` out from under a short-lived read lock and then scan it
//! with the lock already released — matching never contends with a
//! reload in progress, and every reader sees one consistent snapshot.

use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use regex::Regex;

use freightline_core::error::PatternError;
use freightline_core::model::Pattern;

/// A pattern whose regex compiled successfully. Patterns that fail to
/// compile are dropped from the snapshot with a log line (§4.2 step 1,
/// §9 "Compiled-regex set") rather than aborting the reload.
pub struct CompiledPattern {
    pub source: Pattern,
    pub regex: Regex,
}

pub(crate) struct Snapshot {
    pub patterns: Vec<CompiledPattern>,
    loaded_at: Instant,
}

#[derive(Debug, Clone, Copy)]
pub struct PatternCacheConfig {
    pub ttl: Duration,
}

impl Default for PatternCacheConfig {
    fn default() -> Self {
        Self { ttl: Duration::from_secs(300) }
    }
}

/// Holds the current pattern snapshot plus whatever is needed to refresh
/// it. This crate does not own the store connection — callers supply
/// fresh `Pattern` rows via [`PatternCache::load`]; a `freightline-store`
/// consumer calls `load` on startup and again whenever [`PatternCache::is_stale`]
/// reports the TTL has elapsed, or after an explicit [`PatternCache::invalidate`].
pub struct PatternCache {
    config: PatternCacheConfig,
    snapshot: RwLock<Option<Arc<Snapshot>>>,
}

impl PatternCache {
    #[must_use]
    pub fn new(config: PatternCacheConfig) -> Self {
        Self { config, snapshot: RwLock::new(None) }
    }

    /// Compiles `patterns` into a fresh snapshot and atomically swaps it
    /// in. Patterns whose regex fails to compile are dropped and logged
    /// (never surfaced as an error to the caller, per §9).
    pub fn load(&self, patterns: Vec<Pattern>) {
        let mut compiled = Vec::with_capacity(patterns.len());
        for source in patterns {
            match Regex::new(&source.regex) {
                Ok(regex) => compiled.push(CompiledPattern { source, regex }),
                Err(err) => {
                    tracing::warn!(
                        pattern_id = %source.id,
                        regex = %source.regex,
                        error = %err,
                        "dropping pattern with invalid regex"
                    );
                }
            }
        }

        let snapshot = Arc::new(Snapshot { patterns: compiled, loaded_at: Instant::now() });
        let mut guard = self.snapshot.write().expect("pattern cache lock poisoned");
        *guard = Some(snapshot);
    }

    /// True once the current snapshot (if any) is older than the
    /// configured TTL, or if nothing has been loaded yet.
    #[must_use]
    pub fn is_stale(&self) -> bool {
        let guard = self.snapshot.read().expect("pattern cache lock poisoned");
        match guard.as_ref() {
            Some(snapshot) => snapshot.loaded_at.elapsed() >= self.config.ttl,
            None => true,
        }
    }

    /// Forces the next [`PatternCache::is_stale`] check to report stale
    /// regardless of TTL (§4.2 "reload() invalidates the cache"), without
    /// discarding the current snapshot — callers still get a usable
    /// (if now-stale-flagged) snapshot until they actually reload.
    pub fn invalidate(&self) {
        let mut guard = self.snapshot.write().expect("pattern cache lock poisoned");
        if let Some(snapshot) = guard.take() {
            let backdated = Instant::now()
                .checked_sub(self.config.ttl)
                .unwrap_or(snapshot.loaded_at);
            *guard = Some(Arc::new(Snapshot {
                patterns: snapshot
                    .patterns
                    .iter()
                    .map(|p| CompiledPattern {
                        source: p.source.clone(),
                        regex: p.regex.clone(),
                    })
                    .collect(),
                loaded_at: backdated,
            }));
        }
    }

    pub(crate) fn current(&self) -> Result<Arc<Snapshot>, PatternError> {
        let guard = self.snapshot.read().expect("pattern cache lock poisoned");
        guard.clone().ok_or_else(|| {
            PatternError::CacheUnavailable("pattern cache has never been loaded".to_string())
        })
    }
}
