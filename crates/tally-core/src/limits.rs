//! Earning caps.

use crate::rules::Rule;

/// Completed points already earned in each capped scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LimitUsage {
    /// Completed points of this type since the start of the UTC day.
    pub earned_today: i64,
    /// Completed points of this type for the event, when one applies.
    pub earned_for_event: Option<i64>,
}

/// A cap the proposed award would break.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitViolation {
    /// Daily cap exceeded.
    Daily {
        /// The configured cap.
        limit: i64,
        /// Points already earned today.
        earned: i64,
        /// Points proposed.
        requested: i64,
    },
    /// Per-event cap exceeded.
    Event {
        /// The configured cap.
        limit: i64,
        /// Points already earned for the event.
        earned: i64,
        /// Points proposed.
        requested: i64,
    },
}

/// Check the daily cap first, then the per-event cap.
///
/// # Errors
///
/// Returns the first cap that `proposed` would push past.
pub fn check_limits(rule: &Rule, usage: &LimitUsage, proposed: i64) -> Result<(), LimitViolation> {
    if let Some(limit) = rule.max_daily_earnings {
        if usage.earned_today.saturating_add(proposed) > limit {
            return Err(LimitViolation::Daily {
                limit,
                earned: usage.earned_today,
                requested: proposed,
            });
        }
    }

    if let (Some(limit), Some(earned)) = (rule.max_per_event, usage.earned_for_event) {
        if earned.saturating_add(proposed) > limit {
            return Err(LimitViolation::Event {
                limit,
                earned,
                requested: proposed,
            });
        }
    }

    Ok(())
}
