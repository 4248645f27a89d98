//! Quiz session engine.
//!
//! Orchestrates one study session: question generation with retries,
//! bounded-concurrency grading of the collected answers, and the final
//! stats update. All I/O goes through the `QuizBackend` trait; the
//! engine itself never touches the network or the store.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;

use crate::error::{InvalidInputError, ProviderError};
use crate::model::{Paper, PaperReviewStats, QualityRating, QuizQuestion, TokenUsage};
use crate::report::AnswerRecord;
use crate::scheduler::ReviewUpdate;
use crate::traits::{GradeRequest, QuestionRequest, QuestionResponse, QuizBackend};

/// Configuration for the session engine.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Questions to generate per session.
    pub question_count: usize,
    /// Max tokens for generation and grading calls.
    pub max_tokens: u32,
    /// Temperature for generation and grading calls.
    pub temperature: f64,
    /// Retries on transient backend errors.
    pub max_retries: u32,
    /// Delay between retries.
    pub retry_delay: Duration,
    /// Max concurrent grading calls.
    pub grading_parallelism: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            question_count: 5,
            max_tokens: 2048,
            temperature: 0.3,
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
            grading_parallelism: 4,
        }
    }
}

/// One question paired with what the user typed.
#[derive(Debug, Clone)]
pub struct AnswerSubmission {
    pub question: QuizQuestion,
    pub answer: String,
}

/// The quiz session engine.
pub struct SessionEngine {
    backend: Arc<dyn QuizBackend>,
    config: SessionConfig,
}

impl SessionEngine {
    pub fn new(backend: Arc<dyn QuizBackend>, config: SessionConfig) -> Self {
        Self { backend, config }
    }

    /// Generate this session's questions, retrying transient backend
    /// errors and honouring rate-limit hints. Permanent errors (bad
    /// key, unknown model) abort immediately.
    pub async fn generate_questions(
        &self,
        model: &str,
        paper: &Paper,
    ) -> Result<QuestionResponse> {
        let request = QuestionRequest {
            model: model.to_string(),
            paper_title: paper.title.clone(),
            notes: paper.notes.clone(),
            question_count: self.config.question_count,
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let mut last_error: Option<anyhow::Error> = None;
        let mut retry_delay = self.config.retry_delay;

        for attempt in 1..=self.config.max_retries.max(1) {
            match self.backend.generate_questions(&request).await {
                Ok(response) => {
                    anyhow::ensure!(
                        !response.questions.is_empty(),
                        "backend returned no questions for '{}'",
                        paper.title
                    );
                    return Ok(response);
                }
                Err(e) => {
                    if let Some(provider_err) = e.downcast_ref::<ProviderError>() {
                        if provider_err.is_permanent() {
                            return Err(e);
                        }
                        if let Some(ms) = provider_err.retry_after_ms() {
                            retry_delay = Duration::from_millis(ms);
                        }
                    }
                    tracing::warn!(
                        "question generation attempt {attempt} failed for '{}': {e}",
                        paper.title
                    );
                    last_error = Some(e);
                    if attempt < self.config.max_retries.max(1) {
                        tokio::time::sleep(retry_delay).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow::anyhow!("question generation failed")))
    }

    /// Grade the collected answers concurrently, bounded by the
    /// configured parallelism. Records come back in question order.
    /// Skipped (empty) answers score 0 without an API call.
    pub async fn grade_answers(
        &self,
        model: &str,
        submissions: Vec<AnswerSubmission>,
    ) -> Result<Vec<AnswerRecord>> {
        let semaphore = Arc::new(Semaphore::new(self.config.grading_parallelism.max(1)));
        let mut futures = FuturesUnordered::new();
        let mut records: Vec<(usize, AnswerRecord)> = Vec::new();

        for (index, submission) in submissions.into_iter().enumerate() {
            if submission.answer.trim().is_empty() {
                records.push((
                    index,
                    AnswerRecord {
                        question: submission.question.question,
                        ideal_answer: submission.question.ideal_answer,
                        answer: String::new(),
                        score: 0.0,
                        feedback: "No answer given.".to_string(),
                        token_usage: TokenUsage::default(),
                    },
                ));
                continue;
            }

            let backend = Arc::clone(&self.backend);
            let semaphore = Arc::clone(&semaphore);
            let request = GradeRequest {
                model: model.to_string(),
                question: submission.question.question.clone(),
                ideal_answer: submission.question.ideal_answer.clone(),
                answer: submission.answer.clone(),
                max_tokens: self.config.max_tokens,
                temperature: self.config.temperature,
            };
            let max_retries = self.config.max_retries;
            let retry_delay = self.config.retry_delay;

            futures.push(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|_| anyhow::anyhow!("semaphore closed"))?;

                let response =
                    grade_with_retries(backend.as_ref(), &request, max_retries, retry_delay)
                        .await?;

                Ok::<(usize, AnswerRecord), anyhow::Error>((
                    index,
                    AnswerRecord {
                        question: request.question,
                        ideal_answer: request.ideal_answer,
                        answer: request.answer,
                        score: response.graded.score,
                        feedback: response.graded.feedback,
                        token_usage: response.token_usage,
                    },
                ))
            });
        }

        while let Some(result) = futures.next().await {
            records.push(result?);
        }

        records.sort_by_key(|(index, _)| *index);
        Ok(records.into_iter().map(|(_, record)| record).collect())
    }

    /// Overall session score: mean of per-question scores.
    pub fn session_score(records: &[AnswerRecord]) -> f64 {
        if records.is_empty() {
            return 0.0;
        }
        records.iter().map(|r| r.score).sum::<f64>() / records.len() as f64
    }

    /// Complete the session: blend mastery, reschedule, stamp dates.
    /// The caller persists the stats and derives the report.
    pub fn finish_session(
        &self,
        stats: &mut PaperReviewStats,
        session_score: f64,
        rating: QualityRating,
        now: DateTime<Utc>,
    ) -> Result<ReviewUpdate, InvalidInputError> {
        stats.record_session(session_score, rating, now)
    }
}

/// Retry loop for one grading call, mirroring question generation.
async fn grade_with_retries(
    backend: &dyn QuizBackend,
    request: &GradeRequest,
    max_retries: u32,
    initial_delay: Duration,
) -> Result<crate::traits::GradeResponse> {
    let mut last_error: Option<anyhow::Error> = None;
    let mut retry_delay = initial_delay;

    for attempt in 1..=max_retries.max(1) {
        match backend.grade_answer(request).await {
            Ok(response) => return Ok(response),
            Err(e) => {
                if let Some(provider_err) = e.downcast_ref::<ProviderError>() {
                    if provider_err.is_permanent() {
                        return Err(e);
                    }
                    if let Some(ms) = provider_err.retry_after_ms() {
                        retry_delay = Duration::from_millis(ms);
                    }
                }
                tracing::warn!("grading attempt {attempt} failed: {e}");
                last_error = Some(e);
                if attempt < max_retries.max(1) {
                    tokio::time::sleep(retry_delay).await;
                }
            }
        }
    }

    Err(last_error.unwrap_or_else(|| anyhow::anyhow!("grading failed")))
}
