//! Ledger policy knobs.

use serde::{Deserialize, Serialize};

/// Policy settings for [`crate::PointsLedger`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Allow an award when the earning-cap queries fail.
    pub fail_open_on_store_error: bool,

    /// How many levels of award are evaluated for achievements. With the
    /// default of 2 the caller's award and the bonuses it unlocks are
    /// evaluated; bonuses unlocked by a bonus are credited but not
    /// evaluated. 0 turns achievements off.
    pub achievement_depth_limit: u8,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            fail_open_on_store_error: true,
            achievement_depth_limit: 2,
        }
    }
}
