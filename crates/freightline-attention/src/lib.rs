//! Attention scoring engine: a pure function over `AttentionComponents`
//! (§4.6). No I/O; callers assemble the components from shipment, action,
//! and issue state and pass the result here.

use freightline_core::enums::{ActionPriority, AttentionTier, CutoffStatus, IssueType};
use freightline_core::model::AttentionComponents;

/// Flat per-pending/overdue action weights (§4.6 "Pending actions").
const PENDING_ACTION_WEIGHT: f64 = 10.0;
const OVERDUE_ACTION_WEIGHT: f64 = 40.0;

/// Flat contribution for having at least one active issue (§4.6).
const ACTIVE_ISSUE_WEIGHT: f64 = 100.0;

/// Staleness penalties (§4.6 "Staleness").
const STALE_OVER_7_DAYS: f64 = -40.0;
const STALE_OVER_3_DAYS: f64 = -20.0;

/// Max-action-priority bonus table (§4.6).
fn priority_bonus(priority: ActionPriority) -> f64 {
    match priority {
        ActionPriority::Critical => 80.0,
        ActionPriority::High => 40.0,
        ActionPriority::Medium => 20.0,
        ActionPriority::Low => 5.0,
    }
}

/// ETD urgency bonus (§4.6 "ETD urgency"), only applied when `days_to_etd >= 0`.
fn etd_bonus(days_to_etd: i64) -> f64 {
    if days_to_etd < 0 {
        0.0
    } else if days_to_etd <= 1 {
        75.0
    } else if days_to_etd <= 3 {
        50.0
    } else if days_to_etd <= 7 {
        25.0
    } else {
        0.0
    }
}

/// Cutoff urgency bonus (§4.6 "Cutoff urgency"). `Overdue` applies
/// regardless of how many days past; the other tiers key off
/// `nearest_cutoff_days`.
fn cutoff_bonus(status: CutoffStatus, nearest_cutoff_days: Option<i64>) -> f64 {
    match status {
        CutoffStatus::Overdue => 100.0,
        CutoffStatus::Urgent => 60.0,
        CutoffStatus::Warning => 30.0,
        CutoffStatus::Safe => {
            let _ = nearest_cutoff_days;
            0.0
        }
    }
}

fn staleness_penalty(days_since_activity: i64) -> f64 {
    if days_since_activity > 7 {
        STALE_OVER_7_DAYS
    } else if days_since_activity > 3 {
        STALE_OVER_3_DAYS
    } else {
        0.0
    }
}

fn issue_weight(issue_type: IssueType) -> f64 {
    issue_type.weight()
}

/// Tier thresholds (§4.6).
fn tier_for(score: f64) -> AttentionTier {
    if score >= 60.0 {
        AttentionTier::Strong
    } else if score >= 35.0 {
        AttentionTier::Medium
    } else if score >= 15.0 {
        AttentionTier::Weak
    } else {
        AttentionTier::Noise
    }
}

/// Computes the attention score and tier for one shipment's components
/// (§4.6 "Formula"). Pure and total; `score` is always `>= 0` (invariant P5).
#[must_use]
pub fn score(components: &AttentionComponents) -> (f64, AttentionTier) {
    let mut total = 0.0;

    if components.has_active_issue {
        total += ACTIVE_ISSUE_WEIGHT;
        for issue_type in &components.issue_types {
            total += issue_weight(*issue_type);
        }
    }

    total += PENDING_ACTION_WEIGHT * f64::from(components.pending_actions);
    total += OVERDUE_ACTION_WEIGHT * f64::from(components.overdue_actions);

    if let Some(priority) = components.max_action_priority {
        total += priority_bonus(priority);
    }

    if let Some(days_to_etd) = components.days_to_etd {
        total += etd_bonus(days_to_etd);
    }

    if let Some(status) = components.cutoff_status {
        total += cutoff_bonus(status, components.nearest_cutoff_days);
    }

    total += staleness_penalty(components.days_since_activity);

    let score = total.max(0.0);
    (score, tier_for(score))
}

/// One cutoff candidate: a named field and its date, if known (§4.6
/// "Nearest-cutoff selection").
#[derive(Debug, Clone, Copy)]
pub struct CutoffCandidate {
    pub days_remaining: i64,
}

/// Picks the minimum `days_remaining` across all known cutoffs (negative
/// allowed — overdue), and derives its urgency tier. Returns `None` when no
/// cutoff date is known at all.
#[must_use]
pub fn nearest_cutoff(candidates: &[CutoffCandidate]) -> Option<(i64, CutoffStatus)> {
    let nearest = candidates.iter().map(|c| c.days_remaining).min()?;
    let status = if nearest < 0 {
        CutoffStatus::Overdue
    } else if nearest <= 1 {
        CutoffStatus::Urgent
    } else if nearest <= 3 {
        CutoffStatus::Warning
    } else {
        CutoffStatus::Safe
    };
    Some((nearest, status))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> AttentionComponents {
        AttentionComponents::default()
    }

    #[test]
    fn score_is_never_negative() {
        let mut c = base();
        c.days_since_activity = 30;
        let (score, tier) = score(&c);
        assert!(score >= 0.0);
        assert_eq!(tier, AttentionTier::Noise);
    }

    #[test]
    fn active_issue_alone_reaches_strong() {
        let mut c = base();
        c.has_active_issue = true;
        c.issue_types = vec![IssueType::Rollover];
        let (score, tier) = score(&c);
        assert_eq!(score, 160.0);
        assert_eq!(tier, AttentionTier::Strong);
    }

    #[test]
    fn pending_actions_contribute_monotonically() {
        let mut c = base();
        c.pending_actions = 2;
        let (two, _) = score(&c);
        c.pending_actions = 5;
        let (five, _) = score(&c);
        assert!(five > two);
    }

    #[test]
    fn overdue_actions_weigh_more_than_pending() {
        let mut c = base();
        c.pending_actions = 1;
        let (pending_only, _) = score(&c);
        let mut c2 = base();
        c2.overdue_actions = 1;
        let (overdue_only, _) = score(&c2);
        assert!(overdue_only > pending_only);
    }

    #[test]
    fn etd_urgency_tiers_decrease_with_distance() {
        let mut c = base();
        c.days_to_etd = Some(1);
        let (urgent, _) = score(&c);
        c.days_to_etd = Some(10);
        let (far, _) = score(&c);
        assert!(urgent > far);
    }

    #[test]
    fn negative_days_to_etd_contributes_nothing() {
        let mut c = base();
        c.days_to_etd = Some(-5);
        let (score, _) = score(&c);
        assert_eq!(score, 0.0);
    }

    #[test]
    fn staleness_penalizes_but_floors_at_zero() {
        let mut c = base();
        c.days_since_activity = 8;
        let (score, _) = score(&c);
        assert_eq!(score, 0.0); // -40 clamped to 0
    }

    #[test]
    fn tier_thresholds_match_spec() {
        assert_eq!(tier_for(60.0), AttentionTier::Strong);
        assert_eq!(tier_for(35.0), AttentionTier::Medium);
        assert_eq!(tier_for(15.0), AttentionTier::Weak);
        assert_eq!(tier_for(14.9), AttentionTier::Noise);
    }

    #[test]
    fn nearest_cutoff_picks_minimum_and_allows_overdue() {
        let candidates = [
            CutoffCandidate { days_remaining: 5 },
            CutoffCandidate { days_remaining: -2 },
            CutoffCandidate { days_remaining: 1 },
        ];
        let (days, status) = nearest_cutoff(&candidates).unwrap();
        assert_eq!(days, -2);
        assert_eq!(status, CutoffStatus::Overdue);
    }

    #[test]
    fn nearest_cutoff_empty_is_none() {
        assert!(nearest_cutoff(&[]).is_none());
    }

    proptest::proptest! {
        #[test]
        fn score_always_non_negative_under_random_components(
            has_issue in proptest::bool::ANY,
            pending in 0u32..20,
            overdue in 0u32..20,
            stale in 0i64..60,
        ) {
            let mut c = base();
            c.has_active_issue = has_issue;
            c.pending_actions = pending;
            c.overdue_actions = overdue;
            c.days_since_activity = stale;
            let (score, _) = score(&c);
            assert!(score >= 0.0);
        }
    }
}
