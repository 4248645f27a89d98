//! Priority ranking: which paper should be studied next.
//!
//! `compute_priority` turns a paper's review statistics into a single
//! comparable urgency score. Scores are only compared relatively and
//! carry no upper clamp. The current time is always passed in so the
//! function stays deterministic and testable.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};

use crate::model::{Paper, PaperReviewStats};

/// Awarded to papers that have never been reviewed.
const FIRST_REVIEW_BONUS: f64 = 50.0;
/// Linear ramp for papers whose last review recedes into the past.
const OVERDUE_POINTS_PER_DAY: f64 = 2.0;
/// The overdue ramp caps out at 15 days.
const OVERDUE_CAP: f64 = 30.0;
/// Mastery below this threshold earns the weak-recall bonus.
const LOW_MASTERY_THRESHOLD: f64 = 50.0;
const LOW_MASTERY_BONUS: f64 = 20.0;
/// Awarded when the spaced-repetition due date has passed.
const DUE_BONUS: f64 = 25.0;

/// Compute the urgency score for a paper.
///
/// `None` stats means no record exists — the paper has never been
/// reviewed. Terms are additive: the never-reviewed bonus and the
/// overdue ramp are mutually exclusive, while the low-mastery and due
/// bonuses stack with either branch. On the never-reviewed branch the
/// due-date term is skipped; a due date without a last-reviewed stamp
/// violates a data invariant and only trips a debug assertion.
pub fn compute_priority(stats: Option<&PaperReviewStats>, now: DateTime<Utc>) -> f64 {
    let Some(stats) = stats else {
        return FIRST_REVIEW_BONUS;
    };

    let mut score = 0.0;

    match stats.last_reviewed {
        None => {
            debug_assert!(
                stats.due_date.is_none(),
                "due_date set on a never-reviewed paper"
            );
            score += FIRST_REVIEW_BONUS;
        }
        Some(last) => {
            let days = (now - last).num_days().max(0) as f64;
            score += (days * OVERDUE_POINTS_PER_DAY).min(OVERDUE_CAP);

            if let Some(due) = stats.due_date {
                if due <= now {
                    score += DUE_BONUS;
                }
            }
        }
    }

    if let Some(mastery) = stats.mastery_score {
        if mastery < LOW_MASTERY_THRESHOLD {
            score += LOW_MASTERY_BONUS;
        }
    }

    score
}

/// Presentation label derived from a priority score. Carries no
/// scheduling semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewStatus {
    Due,
    Soon,
    Ok,
}

impl ReviewStatus {
    pub fn from_score(score: f64) -> Self {
        if score > 60.0 {
            ReviewStatus::Due
        } else if score > 40.0 {
            ReviewStatus::Soon
        } else {
            ReviewStatus::Ok
        }
    }
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReviewStatus::Due => write!(f, "Due"),
            ReviewStatus::Soon => write!(f, "Soon"),
            ReviewStatus::Ok => write!(f, "OK"),
        }
    }
}

/// A paper joined with its stats and urgency score.
#[derive(Debug)]
pub struct RankedPaper<'a> {
    pub paper: &'a Paper,
    pub stats: Option<&'a PaperReviewStats>,
    pub score: f64,
    pub status: ReviewStatus,
}

/// Rank papers by urgency, highest first. Ties break on title so the
/// ordering is stable across runs.
pub fn rank_papers<'a>(
    papers: &'a [Paper],
    stats: &'a HashMap<String, PaperReviewStats>,
    now: DateTime<Utc>,
) -> Vec<RankedPaper<'a>> {
    let mut ranked: Vec<RankedPaper<'a>> = papers
        .iter()
        .map(|paper| {
            let paper_stats = stats.get(&paper.id);
            let score = compute_priority(paper_stats, now);
            RankedPaper {
                paper,
                stats: paper_stats,
                score,
                status: ReviewStatus::from_score(score),
            }
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.paper.title.cmp(&b.paper.title))
    });

    ranked
}
