//! Lead scoring heuristic.
//!
//! Businesses without a website or with a poor rating are the best prospects for a
//! digital-presence offer. Those without a phone are harder to reach and lose priority.

use crate::models::BusinessRecord;

pub const BASE_SCORE: i32 = 50;
pub const NO_WEBSITE_BONUS: i32 = 30;
pub const LOW_RATING_BONUS: i32 = 20;
pub const NO_PHONE_PENALTY: i32 = 10;
pub const MAX_SCORE: i32 = 100;

/// Computes the lead priority of a business.
///
/// Only the upper bound is clamped. With the current factors the lowest reachable
/// score is `BASE_SCORE - NO_PHONE_PENALTY`; a new negative factor would need a floor.
pub fn calculate_score(record: &BusinessRecord) -> i32 {
    let mut score = BASE_SCORE;

    if !record.has_website() {
        score += NO_WEBSITE_BONUS;
    }
    if record.has_low_rating() {
        score += LOW_RATING_BONUS;
    }
    if !record.has_phone() {
        score -= NO_PHONE_PENALTY;
    }

    score.min(MAX_SCORE)
}
