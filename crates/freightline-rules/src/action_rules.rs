//! `ActionRule` lookup with wildcard fallback (§3, §4.7 step 7).
//!
//! Lookup key is `(document_type, from_party, is_reply)`. A rule keyed to
//! a specific `from_party` wins; failing that, a wildcard rule (no
//! `from_party`) for the same `(document_type, is_reply)` applies; failing
//! that, the non-reply wildcard for the same `document_type` applies.
//! This three-link fallback chain is what §4.7 calls "wildcard fallback".

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use freightline_core::enums::{DocumentType, FromParty};
use freightline_core::model::{ActionRule, ActionRuleKey};

struct Snapshot {
    by_key: HashMap<ActionRuleKey, ActionRule>,
    loaded_at: Instant,
}

/// TTL-cached, immutable-snapshot `ActionRule` table.
///
/// Invariant P6: `lookup` returns the same rule for a given
/// `(document_type, from_party, is_reply)` until the cache is reloaded —
/// guaranteed here because a lookup only ever reads one `Arc` snapshot
/// cloned out under a read lock; it is never mutated in place.
pub struct ActionRuleCache {
    ttl: Duration,
    snapshot: RwLock<Option<Arc<Snapshot>>>,
}

impl ActionRuleCache {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, snapshot: RwLock::new(None) }
    }

    /// Replaces the table wholesale. Rules are indexed by their own key
    /// fields; a caller supplying two rules with the same key gets the
    /// later one in `rules` (last write wins within one load call).
    pub fn load(&self, rules: Vec<ActionRule>) {
        let mut by_key = HashMap::with_capacity(rules.len());
        for rule in rules {
            let key = ActionRuleKey {
                document_type: rule.document_type,
                from_party: rule.from_party,
                is_reply: rule.is_reply,
            };
            by_key.insert(key, rule);
        }
        let mut guard = self.snapshot.write().expect("action rule cache lock poisoned");
        *guard = Some(Arc::new(Snapshot { by_key, loaded_at: Instant::now() }));
    }

    #[must_use]
    pub fn is_stale(&self) -> bool {
        let guard = self.snapshot.read().expect("action rule cache lock poisoned");
        match guard.as_ref() {
            Some(s) => s.loaded_at.elapsed() >= self.ttl,
            None => true,
        }
    }

    /// Looks up a rule via the fallback chain
    /// `(dt, party, false) -> (dt, *, false) -> (dt, unknown, false)`,
    /// with `is_reply` tried as given before falling back to `false` at
    /// each tier (a reply-specific rule is more specific than a
    /// non-reply rule for the same party).
    #[must_use]
    pub fn lookup(
        &self,
        document_type: DocumentType,
        from_party: FromParty,
        is_reply: bool,
    ) -> Option<ActionRule> {
        let guard = self.snapshot.read().expect("action rule cache lock poisoned");
        let snapshot = guard.as_ref()?;

        let tiers = [
            ActionRuleKey { document_type, from_party: Some(from_party), is_reply },
            ActionRuleKey { document_type, from_party: None, is_reply },
            ActionRuleKey { document_type, from_party: Some(from_party), is_reply: false },
            ActionRuleKey { document_type, from_party: None, is_reply: false },
        ];

        tiers.iter().find_map(|key| snapshot.by_key.get(key).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use freightline_core::enums::{ActionOwner, ActionPriority, DeadlineType};

    fn rule(document_type: DocumentType, from_party: Option<FromParty>, is_reply: bool) -> ActionRule {
        ActionRule {
            document_type,
            from_party,
            is_reply,
            has_action: true,
            verb: "submit".to_string(),
            description_template: "Submit VGM".to_string(),
            owner: ActionOwner::Shipper,
            priority_base: ActionPriority::Medium,
            priority_boost_keywords: vec![],
            deadline_type: DeadlineType::FixedDays,
            deadline_days: Some(2),
            cutoff_field: None,
            flip_to_action_keywords: vec![],
            flip_to_no_action_keywords: vec![],
            auto_resolve_on: vec![],
        }
    }

    #[test]
    fn exact_match_wins_over_wildcard() {
        let cache = ActionRuleCache::new(Duration::from_secs(300));
        cache.load(vec![
            rule(DocumentType::VgmSubmission, Some(FromParty::Shipper), false),
            rule(DocumentType::VgmSubmission, None, false),
        ]);
        let found = cache
            .lookup(DocumentType::VgmSubmission, FromParty::Shipper, false)
            .unwrap();
        assert_eq!(found.from_party, Some(FromParty::Shipper));
    }

    #[test]
    fn falls_back_to_wildcard_party() {
        let cache = ActionRuleCache::new(Duration::from_secs(300));
        cache.load(vec![rule(DocumentType::VgmSubmission, None, false)]);
        let found = cache
            .lookup(DocumentType::VgmSubmission, FromParty::Trucker, false)
            .unwrap();
        assert_eq!(found.from_party, None);
    }

    #[test]
    fn falls_back_to_non_reply_wildcard() {
        let cache = ActionRuleCache::new(Duration::from_secs(300));
        cache.load(vec![rule(DocumentType::VgmSubmission, None, false)]);
        let found = cache
            .lookup(DocumentType::VgmSubmission, FromParty::Trucker, true)
            .unwrap();
        assert_eq!(found.is_reply, false);
    }

    #[test]
    fn no_rule_returns_none() {
        let cache = ActionRuleCache::new(Duration::from_secs(300));
        cache.load(vec![rule(DocumentType::VgmSubmission, None, false)]);
        assert!(cache
            .lookup(DocumentType::Invoice, FromParty::Trucker, false)
            .is_none());
    }

    #[test]
    fn lookup_is_stable_across_repeated_calls() {
        let cache = ActionRuleCache::new(Duration::from_secs(300));
        cache.load(vec![rule(DocumentType::VgmSubmission, Some(FromParty::Shipper), false)]);
        let first = cache.lookup(DocumentType::VgmSubmission, FromParty::Shipper, false);
        let second = cache.lookup(DocumentType::VgmSubmission, FromParty::Shipper, false);
        assert_eq!(first.map(|r| r.verb), second.map(|r| r.verb));
    }
}
