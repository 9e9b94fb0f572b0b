//! Action and flow rule caches (§3, §4.5, §4.7 step 7).
//!
//! Same immutable-snapshot-swap shape as `freightline-patterns`: a reload
//! replaces the whole table at once, readers never see a half-updated
//! cache (§9 "Rule tables as immutable snapshots").

mod action_rules;
mod flow_rules;

pub use action_rules::ActionRuleCache;
pub use flow_rules::FlowRuleCache;

use std::time::Duration;

/// Default TTL for both caches when a concrete value isn't supplied by
/// configuration (§8 A.3 `FREIGHTLINE_ACTION_RULE_CACHE_TTL_SECS` /
/// `..._FLOW_RULE_CACHE_TTL_SECS`, both defaulting to 300s).
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);
