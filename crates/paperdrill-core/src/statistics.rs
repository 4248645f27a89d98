//! Aggregate study statistics across the whole paper collection.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Paper, PaperReviewStats};
use crate::priority::{compute_priority, ReviewStatus};

/// A snapshot of the collection's study state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyStats {
    /// Papers in the local cache.
    pub total_papers: usize,
    /// Papers with no completed session yet.
    pub never_reviewed: usize,
    /// Papers per status label.
    pub due: usize,
    pub soon: usize,
    pub ok: usize,
    /// Completed sessions across all papers.
    pub total_reviews: u32,
    /// Mean mastery over papers that have one.
    pub avg_mastery: Option<f64>,
    /// Mean ease factor over reviewed papers.
    pub avg_ease: Option<f64>,
}

/// Compute collection-level statistics.
pub fn compute_study_stats(
    papers: &[Paper],
    stats: &HashMap<String, PaperReviewStats>,
    now: DateTime<Utc>,
) -> StudyStats {
    let mut never_reviewed = 0usize;
    let mut due = 0usize;
    let mut soon = 0usize;
    let mut ok = 0usize;
    let mut total_reviews = 0u32;
    let mut mastery_values = Vec::new();
    let mut ease_values = Vec::new();

    for paper in papers {
        let paper_stats = stats.get(&paper.id);

        match ReviewStatus::from_score(compute_priority(paper_stats, now)) {
            ReviewStatus::Due => due += 1,
            ReviewStatus::Soon => soon += 1,
            ReviewStatus::Ok => ok += 1,
        }

        match paper_stats {
            None => never_reviewed += 1,
            Some(s) => {
                if s.is_new() {
                    never_reviewed += 1;
                } else {
                    ease_values.push(s.ease_factor);
                }
                total_reviews += s.review_count;
                if let Some(mastery) = s.mastery_score {
                    mastery_values.push(mastery);
                }
            }
        }
    }

    let mean = |values: &[f64]| {
        if values.is_empty() {
            None
        } else {
            Some(values.iter().sum::<f64>() / values.len() as f64)
        }
    };

    StudyStats {
        total_papers: papers.len(),
        never_reviewed,
        due,
        soon,
        ok,
        total_reviews,
        avg_mastery: mean(&mastery_values),
        avg_ease: mean(&ease_values),
    }
}
