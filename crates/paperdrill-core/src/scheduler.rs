//! SM-2 variant review scheduling and mastery blending.
//!
//! The scheduler is a pure function: given the recall quality of the
//! most recent review and the paper's current interval/ease factor, it
//! returns the next interval and updated ease factor. The caller
//! derives the due date and persists the result.
//!
//! Compared to textbook SM-2, this variant resets failures to a 1-day
//! interval with a flat ease penalty, uses a 3-day (not 6-day) second
//! step, and caps intervals at 60 days.

use serde::{Deserialize, Serialize};

use crate::error::InvalidInputError;

/// Hard floor for the ease factor.
pub const MIN_EASE_FACTOR: f64 = 1.3;
/// Ease factor assigned to papers that have never been reviewed.
pub const INITIAL_EASE_FACTOR: f64 = 2.5;
/// Intervals never grow past this many days.
pub const MAX_INTERVAL_DAYS: u32 = 60;

/// Flat ease deduction applied on a failed recall.
const FAILURE_EASE_PENALTY: f64 = 0.2;
/// Weight of the previous mastery score in the rolling blend.
const MASTERY_RETENTION: f64 = 0.7;
/// Weight of the new session score in the rolling blend.
const MASTERY_SESSION_WEIGHT: f64 = 0.3;

/// The scheduler's output: the next interval and updated ease factor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReviewUpdate {
    /// Days until the next review.
    pub interval: u32,
    /// Updated ease factor.
    pub ease_factor: f64,
}

/// Compute the next review interval and ease factor.
///
/// Quality below 3 is a failed recall: the previous interval is
/// discarded and the item comes back in one day. Successful recalls
/// step 0 → 1 → 3 days, then grow by the ease factor, with the product
/// rounded half-away-from-zero (`f64::round`).
///
/// Fails fast on out-of-range quality or a non-finite ease factor;
/// the closed rating enum upstream should never produce either.
pub fn next_review(
    quality: u8,
    previous_interval: u32,
    ease_factor: f64,
) -> Result<ReviewUpdate, InvalidInputError> {
    if quality > 5 {
        return Err(InvalidInputError::QualityOutOfRange(quality));
    }
    if !ease_factor.is_finite() {
        return Err(InvalidInputError::NonFiniteEaseFactor(ease_factor));
    }

    if quality < 3 {
        return Ok(ReviewUpdate {
            interval: 1,
            ease_factor: (ease_factor - FAILURE_EASE_PENALTY).max(MIN_EASE_FACTOR),
        });
    }

    let interval = match previous_interval {
        0 => 1,
        1 => 3,
        prev => (prev as f64 * ease_factor).round() as u32,
    };

    // Standard SM-2 ease adjustment: +0.1 at quality 5, ~0 at 4,
    // negative at 3.
    let q = quality as f64;
    let ease = ease_factor + (0.1 - (5.0 - q) * (0.08 + (5.0 - q) * 0.02));

    Ok(ReviewUpdate {
        interval: interval.min(MAX_INTERVAL_DAYS),
        ease_factor: ease.max(MIN_EASE_FACTOR),
    })
}

/// Fold a session score into the rolling mastery estimate.
///
/// The first session sets the estimate directly; later sessions blend
/// 0.7 old / 0.3 new. The result is always within [0, 100].
pub fn blend_mastery(previous: Option<f64>, session_score: f64) -> f64 {
    let blended = match previous {
        Some(old) => MASTERY_RETENTION * old + MASTERY_SESSION_WEIGHT * session_score,
        None => session_score,
    };
    blended.clamp(0.0, 100.0)
}
