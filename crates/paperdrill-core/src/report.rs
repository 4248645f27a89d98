//! Session report types with JSON persistence.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{QualityRating, TokenUsage};
use crate::scheduler::ReviewUpdate;

/// One question/answer pair with its grade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerRecord {
    /// The question asked.
    pub question: String,
    /// The answer the grader compared against.
    pub ideal_answer: String,
    /// What the user typed. Empty if skipped.
    pub answer: String,
    /// Grade in [0, 100].
    pub score: f64,
    /// Grader feedback.
    pub feedback: String,
    /// Token usage for the grading call (zero for skipped answers).
    pub token_usage: TokenUsage,
}

impl AnswerRecord {
    /// Whether the user skipped this question.
    pub fn skipped(&self) -> bool {
        self.answer.trim().is_empty()
    }
}

/// A complete record of one quiz session, persisted after the session
/// finishes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    /// Unique session identifier.
    pub id: Uuid,
    /// When the session finished.
    pub created_at: DateTime<Utc>,
    /// The paper that was studied.
    pub paper_id: String,
    pub paper_title: String,
    /// Backend and model that generated and graded the quiz.
    pub provider: String,
    pub model: String,
    /// Per-question records, in question order.
    pub answers: Vec<AnswerRecord>,
    /// Overall session score (mean of per-question scores).
    pub session_score: f64,
    /// The user's self-reported recall quality.
    pub rating: QualityRating,
    /// The scheduling outcome applied to the paper's stats.
    pub review: ReviewUpdate,
    /// Next due date derived from the outcome.
    pub due_date: DateTime<Utc>,
    /// Mastery score after the blend.
    pub mastery_score: f64,
    /// Token usage summed over all calls in the session.
    pub token_usage: TokenUsage,
    /// Wall-clock duration of the session in milliseconds.
    pub duration_ms: u64,
}

impl SessionReport {
    /// Save the report as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize report")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        Ok(())
    }

    /// Load a report from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read report from {}", path.display()))?;
        let report: SessionReport =
            serde_json::from_str(&content).context("failed to parse report JSON")?;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn make_report() -> SessionReport {
        let now = Utc::now();
        SessionReport {
            id: Uuid::nil(),
            created_at: now,
            paper_id: "page-1".into(),
            paper_title: "Attention Is All You Need".into(),
            provider: "mock".into(),
            model: "mock-model".into(),
            answers: vec![AnswerRecord {
                question: "Why attention?".into(),
                ideal_answer: "Parallelism.".into(),
                answer: "Faster training.".into(),
                score: 80.0,
                feedback: "Close.".into(),
                token_usage: TokenUsage::default(),
            }],
            session_score: 80.0,
            rating: QualityRating::Good,
            review: ReviewUpdate {
                interval: 1,
                ease_factor: 2.5,
            },
            due_date: now + Duration::days(1),
            mastery_score: 80.0,
            token_usage: TokenUsage::default(),
            duration_ms: 1234,
        }
    }

    #[test]
    fn json_roundtrip() {
        let report = make_report();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        report.save_json(&path).unwrap();
        let loaded = SessionReport::load_json(&path).unwrap();

        assert_eq!(loaded.paper_id, "page-1");
        assert_eq!(loaded.answers.len(), 1);
        assert_eq!(loaded.rating, QualityRating::Good);
        assert_eq!(loaded.review.interval, 1);
    }

    #[test]
    fn skipped_detection() {
        let mut record = make_report().answers.remove(0);
        assert!(!record.skipped());
        record.answer = "   ".into();
        assert!(record.skipped());
    }

    #[test]
    fn load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(SessionReport::load_json(&dir.path().join("absent.json")).is_err());
    }
}
