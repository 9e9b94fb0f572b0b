//! Deterministic first-pass classification driven entirely by rules loaded
//! from the store (§4.2). No machine learning; no network calls.

mod cache;

pub use cache::{PatternCache, PatternCacheConfig};

use freightline_core::error::PatternError;
use freightline_core::model::{Pattern, PatternMatchInput};

/// Global confidence threshold below which the caller should fall back to
/// the LLM extractor (§4.2 step 5). The processor raises this to 90 for
/// replies (§4.7 step 5); this constant is the baseline used for the
/// first message in a thread.
pub const FALLBACK_THRESHOLD: u8 = 85;

/// Confidence threshold applied to replies (thread position >= 2), per
/// the boundary behavior in §8.
pub const FALLBACK_THRESHOLD_REPLY: u8 = 90;

/// Bonus applied when a pattern's `requires_attachment` predicate is
/// satisfied, capped so the total never exceeds 100 (§4.2 step 3).
const ATTACHMENT_BONUS: u8 = 5;

/// Number of leading bytes of the message body scanned for `PatternType::Body`
/// patterns (§4.2 step 2, "first ~5 kB of body").
const BODY_SCAN_BYTES: usize = 5 * 1024;

/// Outcome of [`PatternMatcher::match_input`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchOutcome {
    pub matched: bool,
    pub document_type: Option<freightline_core::enums::DocumentType>,
    pub confidence: u8,
    pub pattern_id: Option<String>,
    pub match_source: Option<freightline_core::enums::PatternType>,
    pub requires_fallback: bool,
}

impl MatchOutcome {
    fn no_match() -> Self {
        Self {
            matched: false,
            document_type: None,
            confidence: 0,
            pattern_id: None,
            match_source: None,
            requires_fallback: true,
        }
    }
}

/// The pattern matcher itself. Holds a reference to the shared cache so
/// many matcher instances (one per worker, say) can share one snapshot.
pub struct PatternMatcher<'a> {
    cache: &'a PatternCache,
}

impl<'a> PatternMatcher<'a> {
    #[must_use]
    pub fn new(cache: &'a PatternCache) -> Self {
        Self { cache }
    }

    /// Runs the full match algorithm (§4.2 "Algorithm" steps 1-5).
    ///
    /// # Errors
    /// Returns [`PatternError::CacheUnavailable`] only if the cache has
    /// never been successfully loaded (e.g. the store was unreachable at
    /// startup and no snapshot exists yet). A stale-but-present snapshot
    /// is always usable — the cache refreshes lazily, never blocking a
    /// caller on a reload it doesn't need.
    pub fn match_input(&self, input: &PatternMatchInput<'_>) -> Result<MatchOutcome, PatternError> {
        let snapshot = self.cache.current()?;

        let body_scan: String = input.body_text.chars().take(BODY_SCAN_BYTES).collect();

        let mut candidates: Vec<(i32, u8, &cache::CompiledPattern)> = Vec::new();
        for compiled in snapshot.patterns.iter() {
            if !applicability_holds(&compiled.source, input) {
                continue;
            }
            let haystack = match compiled.source.pattern_type {
                freightline_core::enums::PatternType::Subject => input.subject,
                freightline_core::enums::PatternType::Sender => input.sender_address,
                freightline_core::enums::PatternType::Body => body_scan.as_str(),
            };
            if !compiled.regex.is_match(haystack) {
                continue;
            }
            let confidence = score(&compiled.source, input);
            candidates.push((compiled.source.priority, confidence, compiled));
        }

        candidates.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.cmp(&a.1)));

        let Some((_, confidence, winner)) = candidates.into_iter().next() else {
            return Ok(MatchOutcome::no_match());
        };

        Ok(MatchOutcome {
            matched: true,
            document_type: Some(winner.source.document_type),
            confidence,
            pattern_id: Some(winner.source.id.clone()),
            match_source: Some(winner.source.pattern_type),
            requires_fallback: confidence < fallback_threshold_for(input.thread_position),
        })
    }
}

fn applicability_holds(pattern: &Pattern, input: &PatternMatchInput<'_>) -> bool {
    if pattern.requires_attachment && !input.has_attachment {
        return false;
    }
    if let Some(min) = pattern.min_thread_position {
        if input.thread_position < min {
            return false;
        }
    }
    if let Some(max) = pattern.max_thread_position {
        if input.thread_position > max {
            return false;
        }
    }
    true
}

/// `confidenceBase` times a subject-decay factor (subject-type patterns
/// only), plus an attachment bonus, capped at 100 (§4.2 step 3).
fn score(pattern: &Pattern, input: &PatternMatchInput<'_>) -> u8 {
    let mut confidence = f64::from(pattern.confidence_base);

    if pattern.pattern_type == freightline_core::enums::PatternType::Subject {
        let decay = (1.0 - 0.1 * f64::from(input.thread_position.saturating_sub(1))).max(0.5);
        confidence *= decay;
    }

    if pattern.requires_attachment && input.has_attachment {
        confidence += f64::from(ATTACHMENT_BONUS);
    }

    confidence.round().clamp(0.0, 100.0) as u8
}

/// Global threshold for the caller's position-dependent fallback decision
/// (§4.7 step 5): first message uses [`FALLBACK_THRESHOLD`], replies use
/// [`FALLBACK_THRESHOLD_REPLY`].
#[must_use]
pub fn fallback_threshold_for(thread_position: u32) -> u8 {
    if thread_position <= 1 {
        FALLBACK_THRESHOLD
    } else {
        FALLBACK_THRESHOLD_REPLY
    }
}
