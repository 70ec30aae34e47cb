//! Tally Client SDK.
//!
//! Platform services use this crate to report point-earning actions and read
//! balances, history, achievements and the leaderboard.
//!
//! # Example
//!
//! ```no_run
//! use tally_client::{AwardPointsRequest, TallyClient};
//! use tally_core::{EventId, TransactionType, UserId};
//!
//! # async fn example() -> Result<(), tally_client::ClientError> {
//! let client = TallyClient::new("http://tally.points.svc:8080", "your-service-api-key")?;
//!
//! let user_id = UserId::generate();
//! let response = client
//!     .award_points(
//!         AwardPointsRequest::new(user_id, TransactionType::EventCheckin, "Checked in")
//!             .for_event(EventId::generate())
//!             .with_dedup_key("checkin-42"),
//!     )
//!     .await?;
//!
//! if let Some(balance) = response.balance {
//!     println!("Now at level {} with {} points", balance.current_level, balance.total_points);
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod client;
mod error;
mod types;

pub use client::{ClientOptions, TallyClient};
pub use error::ClientError;
pub use types::*;
