//! Earning-cap enforcement.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tally_core::{check_limits, EventId, LimitUsage, LimitViolation, Rule, UserId};
use tally_store::Store;

use crate::error::{LedgerError, Result};

/// Checks proposed awards against a rule's daily and per-event caps.
pub struct LimitEnforcer {
    store: Arc<dyn Store>,
    fail_open: bool,
}

impl LimitEnforcer {
    /// Create an enforcer. With `fail_open`, store errors while summing
    /// earlier earnings let the award through.
    pub fn new(store: Arc<dyn Store>, fail_open: bool) -> Self {
        Self { store, fail_open }
    }

    /// Check `proposed` points against `rule`'s caps.
    ///
    /// The daily window starts at midnight UTC of `now`.
    ///
    /// # Errors
    ///
    /// - `LedgerError::DailyLimitExceeded` / `LedgerError::EventLimitExceeded`
    ///   when a cap would be broken.
    /// - `LedgerError::Persistence` when usage cannot be read and the
    ///   enforcer is not failing open.
    pub fn check(
        &self,
        rule: &Rule,
        user_id: &UserId,
        event_id: Option<&EventId>,
        proposed: i64,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if rule.max_daily_earnings.is_none() && rule.max_per_event.is_none() {
            return Ok(());
        }

        let usage = match self.usage(rule, user_id, event_id, now) {
            Ok(usage) => usage,
            Err(e) if self.fail_open => {
                tracing::warn!(
                    user_id = %user_id,
                    transaction_type = %rule.transaction_type,
                    error = %e,
                    "Limit check failed, allowing award"
                );
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        check_limits(rule, &usage, proposed).map_err(|violation| {
            tracing::debug!(
                user_id = %user_id,
                transaction_type = %rule.transaction_type,
                ?violation,
                "Award rejected by earning cap"
            );
            match violation {
                LimitViolation::Daily {
                    limit,
                    earned,
                    requested,
                } => LedgerError::DailyLimitExceeded {
                    limit,
                    earned,
                    requested,
                },
                LimitViolation::Event {
                    limit,
                    earned,
                    requested,
                } => LedgerError::EventLimitExceeded {
                    limit,
                    earned,
                    requested,
                },
            }
        })
    }

    fn usage(
        &self,
        rule: &Rule,
        user_id: &UserId,
        event_id: Option<&EventId>,
        now: DateTime<Utc>,
    ) -> Result<LimitUsage> {
        let earned_today = if rule.max_daily_earnings.is_some() {
            self.store
                .sum_completed_since(user_id, rule.transaction_type, start_of_day(now))?
        } else {
            0
        };

        let earned_for_event = match (rule.max_per_event, event_id) {
            (Some(_), Some(event_id)) => Some(self.store.sum_completed_for_event(
                user_id,
                event_id,
                rule.transaction_type,
            )?),
            _ => None,
        };

        Ok(LimitUsage {
            earned_today,
            earned_for_event,
        })
    }
}

/// Midnight UTC on the day of `now`.
#[must_use]
pub fn start_of_day(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive()
        .and_hms_opt(0, 0, 0)
        .map_or(now, |midnight| midnight.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn day_starts_at_midnight_utc() {
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 17, 45, 12).unwrap();
        assert_eq!(
            start_of_day(now),
            Utc.with_ymd_and_hms(2024, 3, 9, 0, 0, 0).unwrap()
        );
    }
}
