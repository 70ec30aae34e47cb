//! Award orchestration for tally.
//!
//! [`PointsLedger`] is the single entry point that turns a user action into
//! ledger state. An award runs:
//!
//! 1. rule lookup and verification gate
//! 2. multiplier (verification tier and baseline risk)
//! 3. risk assessment over the trailing hour
//! 4. daily and per-event earning caps
//! 5. one atomic commit of the ledger row and balance projection
//! 6. achievements, whose bonuses are credited from a bounded work queue
//!
//! Awards for one user are serialized; different users run in parallel.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use tally_core::{RuleBook, TransactionType, UserId};
//! use tally_ledger::{AwardRequest, LedgerConfig, PointsLedger};
//! use tally_store::MemoryStore;
//!
//! let ledger = PointsLedger::new(
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(RuleBook::standard()),
//!     LedgerConfig::default(),
//! );
//!
//! let user_id = UserId::generate();
//! let outcome = ledger
//!     .award(AwardRequest::new(user_id, TransactionType::EventCheckin, "Checked in"))
//!     .unwrap();
//!
//! // Unverified users earn half of the 20 point base.
//! assert_eq!(outcome.transaction.points_earned, 10);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod achievements;
pub mod config;
pub mod error;
pub mod leaderboard;
pub mod ledger;
pub mod limits;
pub mod locks;
pub mod risk;

pub use config::LedgerConfig;
pub use error::{LedgerError, Result};
pub use ledger::{AwardOutcome, AwardRequest, PointsLedger, ReconcileReport, SecurityUpdate};
