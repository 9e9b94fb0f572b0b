//! `FlowRule` lookup (§4.5 "Flow validation").

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use freightline_core::enums::{DocumentType, FlowCompatibility, Stage};
use freightline_core::model::FlowRule;

struct Snapshot {
    by_key: HashMap<(Stage, DocumentType), FlowCompatibility>,
    loaded_at: Instant,
}

/// TTL-cached flow-compatibility table keyed by `(stage, document_type)`.
/// Unlisted pairs are treated as compatible (clean) — the table only
/// needs to enumerate exceptions.
pub struct FlowRuleCache {
    ttl: Duration,
    snapshot: RwLock<Option<Arc<Snapshot>>>,
}

impl FlowRuleCache {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, snapshot: RwLock::new(None) }
    }

    pub fn load(&self, rules: Vec<FlowRule>) {
        let by_key = rules
            .into_iter()
            .map(|r| ((r.stage, r.document_type), r.compatibility))
            .collect();
        let mut guard = self.snapshot.write().expect("flow rule cache lock poisoned");
        *guard = Some(Arc::new(Snapshot { by_key, loaded_at: Instant::now() }));
    }

    #[must_use]
    pub fn is_stale(&self) -> bool {
        let guard = self.snapshot.read().expect("flow rule cache lock poisoned");
        match guard.as_ref() {
            Some(s) => s.loaded_at.elapsed() >= self.ttl,
            None => true,
        }
    }

    /// Returns `Expected` for any pair not explicitly listed.
    #[must_use]
    pub fn lookup(&self, stage: Stage, document_type: DocumentType) -> FlowCompatibility {
        let guard = self.snapshot.read().expect("flow rule cache lock poisoned");
        guard
            .as_ref()
            .and_then(|s| s.by_key.get(&(stage, document_type)).copied())
            .unwrap_or(FlowCompatibility::Expected)
    }
}
