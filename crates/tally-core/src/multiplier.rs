//! Point multipliers.
//!
//! Multipliers are held as integer percentages so the final floor is exact:
//! `final = base * verification% * risk% / 10_000`.

use crate::security::VerificationLevel;

/// Baseline risk at or below which no dampening applies.
pub const RISK_DAMPENING_FLOOR_SCORE: u8 = 30;

/// Lowest risk multiplier, in percent.
pub const MIN_RISK_MULTIPLIER_PERCENT: i64 = 10;

/// Verification multiplier in percent (none = 50%, kyc = 150%).
#[must_use]
pub const fn verification_multiplier_percent(level: VerificationLevel) -> i64 {
    match level {
        VerificationLevel::None => 50,
        VerificationLevel::Email => 100,
        VerificationLevel::Phone => 110,
        VerificationLevel::Social => 120,
        VerificationLevel::Id => 130,
        VerificationLevel::Kyc => 150,
    }
}

/// Risk multiplier in percent.
///
/// Full value up to a baseline of 30, then linear dampening that never goes
/// below 10%.
#[must_use]
pub fn risk_multiplier_percent(risk_score: u8) -> i64 {
    if risk_score <= RISK_DAMPENING_FLOOR_SCORE {
        return 100;
    }
    (100 - i64::from(risk_score.min(100))).max(MIN_RISK_MULTIPLIER_PERCENT)
}

/// Scale `base_points` by trust and risk. Never returns less than 1.
#[must_use]
pub fn final_points(base_points: i64, level: VerificationLevel, risk_score: u8) -> i64 {
    let scaled = base_points
        .saturating_mul(verification_multiplier_percent(level))
        .saturating_mul(risk_multiplier_percent(risk_score))
        / 10_000;
    scaled.max(1)
}
