//! Core data model types for paperdrill.
//!
//! These are the fundamental types the entire paperdrill system uses to
//! represent papers, their review statistics, and quiz material.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::InvalidInputError;
use crate::scheduler::{blend_mastery, next_review, ReviewUpdate, INITIAL_EASE_FACTOR};

/// A paper record pulled from the Notion database and cached locally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paper {
    /// Notion page identifier.
    pub id: String,
    /// Paper title.
    pub title: String,
    /// Plain-text reading notes extracted from the page body.
    #[serde(default)]
    pub notes: String,
    /// Tags from the database's multi-select property.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Notion page URL.
    #[serde(default)]
    pub url: Option<String>,
    /// When this record was last synced.
    pub synced_at: DateTime<Utc>,
}

/// Per-paper review statistics, mutated exactly once per completed
/// quiz session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperReviewStats {
    /// When the paper was last reviewed. `None` means never reviewed.
    #[serde(default)]
    pub last_reviewed: Option<DateTime<Utc>>,
    /// Rolling 0–100 retention estimate, blended across sessions.
    /// `None` until the first completed session.
    #[serde(default)]
    pub mastery_score: Option<f64>,
    /// Total completed sessions.
    #[serde(default)]
    pub review_count: u32,
    /// SM-2 ease factor. Floor 1.3.
    #[serde(default = "default_ease_factor")]
    pub ease_factor: f64,
    /// Days until the next review. Capped at 60.
    #[serde(default)]
    pub interval: u32,
    /// Next due date, derived as `last_reviewed + interval` days.
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
}

fn default_ease_factor() -> f64 {
    INITIAL_EASE_FACTOR
}

impl Default for PaperReviewStats {
    fn default() -> Self {
        Self {
            last_reviewed: None,
            mastery_score: None,
            review_count: 0,
            ease_factor: INITIAL_EASE_FACTOR,
            interval: 0,
            due_date: None,
        }
    }
}

impl PaperReviewStats {
    /// Whether this paper has never been reviewed.
    pub fn is_new(&self) -> bool {
        self.last_reviewed.is_none()
    }

    /// Record a completed quiz session: blend the mastery score,
    /// reschedule via the SM-2 variant, and stamp the review dates.
    ///
    /// This is the only mutation point for stats, called once per
    /// completed session. The returned update mirrors the new
    /// `interval`/`ease_factor` for reporting.
    pub fn record_session(
        &mut self,
        session_score: f64,
        rating: QualityRating,
        now: DateTime<Utc>,
    ) -> Result<ReviewUpdate, InvalidInputError> {
        let update = next_review(rating.quality(), self.interval, self.ease_factor)?;

        self.mastery_score = Some(blend_mastery(self.mastery_score, session_score));
        self.review_count += 1;
        self.interval = update.interval;
        self.ease_factor = update.ease_factor;
        self.last_reviewed = Some(now);
        self.due_date = Some(now + Duration::days(i64::from(update.interval)));

        Ok(update)
    }
}

/// Self-reported recall quality after a session.
///
/// A closed four-value enum with fixed numeric mappings onto the 0–5
/// quality scale the scheduler consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityRating {
    Forgot,
    Struggled,
    Good,
    Perfect,
}

impl QualityRating {
    /// The numeric quality fed to the scheduler.
    pub fn quality(self) -> u8 {
        match self {
            QualityRating::Forgot => 0,
            QualityRating::Struggled => 2,
            QualityRating::Good => 4,
            QualityRating::Perfect => 5,
        }
    }
}

impl fmt::Display for QualityRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QualityRating::Forgot => write!(f, "forgot"),
            QualityRating::Struggled => write!(f, "struggled"),
            QualityRating::Good => write!(f, "good"),
            QualityRating::Perfect => write!(f, "perfect"),
        }
    }
}

impl FromStr for QualityRating {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "forgot" | "f" => Ok(QualityRating::Forgot),
            "struggled" | "s" => Ok(QualityRating::Struggled),
            "good" | "g" => Ok(QualityRating::Good),
            "perfect" | "p" => Ok(QualityRating::Perfect),
            other => Err(format!("unknown rating: {other}")),
        }
    }
}

/// A quiz question generated from a paper's notes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizQuestion {
    /// The question posed to the user.
    pub question: String,
    /// The answer the grader compares against.
    pub ideal_answer: String,
}

/// The grader's verdict on a single answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradedAnswer {
    /// Score in [0, 100].
    pub score: f64,
    /// Short feedback for the user.
    pub feedback: String,
}

/// Token usage for a single LLM call, or aggregated over a session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
    pub estimated_cost_usd: f64,
}

impl TokenUsage {
    /// Accumulate another call's usage into this one.
    pub fn add(&mut self, other: &TokenUsage) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.total_tokens += other.total_tokens;
        self.estimated_cost_usd += other.estimated_cost_usd;
    }
}
