//! Core types and scoring rules for tally.
//!
//! Tally turns user actions on the event platform (creating events, checking
//! in, registering, sharing) into an auditable point balance. This crate
//! holds the domain types and every pure calculation; storage and
//! orchestration live in `tally-store` and `tally-ledger`.
//!
//! - **Identifiers**: `UserId`, `EventId`, `TransactionId`
//! - **Ledger**: `Transaction`, `TransactionType`, `TransactionStatus`
//! - **Projection**: `Balance`, `BalanceChange`, `LevelInfo`
//! - **Trust**: `SecurityProfile`, `VerificationLevel`, risk scoring
//! - **Rules**: `Rule`, `RuleStore`, `RuleBook`, earning caps, multipliers
//! - **Milestones**: `Achievement`, `AchievementKind`
//! - **Ranking**: `Timeframe`, `LeaderboardEntry`
//!
//! # Points
//!
//! Points are whole numbers stored as `i64`. Multipliers are integer
//! percentages so that the floor applied to every award is exact.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod achievement;
pub mod balance;
pub mod ids;
pub mod leaderboard;
pub mod level;
pub mod limits;
pub mod multiplier;
pub mod risk;
pub mod rules;
pub mod security;
pub mod transaction;

pub use achievement::{Achievement, AchievementKind, POINT_COLLECTOR_THRESHOLD};
pub use balance::{Balance, BalanceChange, PointsOverflow};
pub use ids::{EventId, IdError, TransactionId, UserId};
pub use leaderboard::{LeaderboardEntry, Timeframe, MAX_LEADERBOARD_LIMIT};
pub use level::{calculate_level, LevelInfo, POINTS_PER_LEVEL};
pub use limits::{check_limits, LimitUsage, LimitViolation};
pub use multiplier::final_points;
pub use risk::{RiskAssessment, RiskFlag, RiskInputs, Recommendation};
pub use rules::{Rule, RuleBook, RuleStore};
pub use security::{ManualReviewStatus, SecurityProfile, VerificationLevel};
pub use transaction::{Transaction, TransactionStatus, TransactionType, UnknownTransactionType};
