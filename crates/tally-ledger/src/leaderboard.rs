//! Leaderboard aggregation.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tally_core::leaderboard::{rank, rank_windowed};
use tally_core::{LeaderboardEntry, Timeframe, UserId};
use tally_store::Store;

use crate::error::Result;

/// Builds ranked views over balances or windowed ledger sums.
pub struct LeaderboardAggregator {
    store: Arc<dyn Store>,
}

impl LeaderboardAggregator {
    /// Create an aggregator over `store`.
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Rank users for `timeframe`, at most `limit` rows (clamped to 1..=100).
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying reads fail.
    pub fn leaderboard(
        &self,
        timeframe: Timeframe,
        limit: usize,
        now: DateTime<Utc>,
    ) -> Result<Vec<LeaderboardEntry>> {
        let Some(since) = timeframe.window_start(now) else {
            let rows = self
                .store
                .list_balances()?
                .into_iter()
                .map(|b| (b.user_id, b.total_points, b.current_level))
                .collect();
            return Ok(rank(rows, limit));
        };

        let mut totals: BTreeMap<UserId, i64> = BTreeMap::new();
        for tx in self.store.list_transactions_since(since)? {
            if tx.is_completed() {
                let total = totals.entry(tx.user_id).or_default();
                *total = total.saturating_add(tx.points_earned);
            }
        }
        Ok(rank_windowed(totals, limit))
    }
}
