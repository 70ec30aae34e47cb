//! API handlers.

pub mod admin;
pub mod health;
pub mod leaderboard;
pub mod points;
pub mod rules;
pub mod security;
