//! Parsing of structured quiz payloads out of LLM responses.
//!
//! The model is not a trusted producer: payloads may be wrapped in
//! markdown fences, and grade scores may fall outside [0, 100]. Fences
//! are stripped via `extract_json_from_markdown`; out-of-range scores
//! are clamped with a warning rather than rejected.

use paperdrill_core::error::ProviderError;
use paperdrill_core::model::{GradedAnswer, QuizQuestion};
use paperdrill_core::traits::extract_json_from_markdown;

/// Parse a question-generation response into quiz questions.
pub(crate) fn parse_questions(content: &str) -> Result<Vec<QuizQuestion>, ProviderError> {
    let json = extract_json_from_markdown(content);
    serde_json::from_str::<Vec<QuizQuestion>>(&json).map_err(|e| {
        ProviderError::MalformedResponse(format!("expected a JSON array of questions: {e}"))
    })
}

/// Parse a grading response into a graded answer with the score
/// clamped into [0, 100].
pub(crate) fn parse_grade(content: &str) -> Result<GradedAnswer, ProviderError> {
    let json = extract_json_from_markdown(content);
    let mut graded: GradedAnswer = serde_json::from_str(&json).map_err(|e| {
        ProviderError::MalformedResponse(format!("expected a JSON grade object: {e}"))
    })?;

    if !graded.score.is_finite() {
        return Err(ProviderError::MalformedResponse(format!(
            "grade score is not finite: {}",
            graded.score
        )));
    }
    if !(0.0..=100.0).contains(&graded.score) {
        tracing::warn!("grade score {} out of range, clamping", graded.score);
        graded.score = graded.score.clamp(0.0, 100.0);
    }

    Ok(graded)
}
