//! Core trait definitions for quiz backends, paper sources, and the
//! stats store.
//!
//! The async traits are implemented by the `paperdrill-providers` and
//! `paperdrill-notion` crates; `StatsStore` by `paperdrill-store`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::model::{GradedAnswer, Paper, PaperReviewStats, QuizQuestion, TokenUsage};

// ---------------------------------------------------------------------------
// Quiz backend trait
// ---------------------------------------------------------------------------

/// Trait for LLM backends that generate quiz questions from notes and
/// grade free-text answers.
#[async_trait]
pub trait QuizBackend: Send + Sync {
    /// Human-readable backend name (e.g. "anthropic").
    fn name(&self) -> &str;

    /// Turn a paper's notes into open-ended quiz questions.
    async fn generate_questions(
        &self,
        request: &QuestionRequest,
    ) -> anyhow::Result<QuestionResponse>;

    /// Grade one answer against its ideal answer.
    async fn grade_answer(&self, request: &GradeRequest) -> anyhow::Result<GradeResponse>;

    /// List available models for this backend.
    fn available_models(&self) -> Vec<ModelInfo>;
}

/// Request to generate quiz questions from a paper's notes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionRequest {
    /// Model identifier (e.g. "claude-sonnet-4-20250514").
    pub model: String,
    /// Paper title, included for context.
    pub paper_title: String,
    /// The reading notes to quiz on.
    pub notes: String,
    /// How many questions to ask for.
    pub question_count: usize,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f64,
}

/// Response from a question-generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionResponse {
    /// The generated questions.
    pub questions: Vec<QuizQuestion>,
    /// Model that actually generated the response.
    pub model: String,
    /// Token usage.
    pub token_usage: TokenUsage,
    /// Latency in milliseconds.
    pub latency_ms: u64,
}

/// Request to grade a single answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradeRequest {
    /// Model identifier.
    pub model: String,
    /// The question that was asked.
    pub question: String,
    /// The answer the grader compares against.
    pub ideal_answer: String,
    /// The user's answer.
    pub answer: String,
    /// Maximum tokens to generate.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: f64,
}

/// Response from a grading request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradeResponse {
    /// Score and feedback.
    pub graded: GradedAnswer,
    /// Model that actually graded the answer.
    pub model: String,
    /// Token usage.
    pub token_usage: TokenUsage,
    /// Latency in milliseconds.
    pub latency_ms: u64,
}

/// Information about an available model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Model identifier.
    pub id: String,
    /// Human-readable model name.
    pub name: String,
    /// Backend name.
    pub provider: String,
    /// Maximum context window size in tokens.
    pub max_context: u32,
    /// Cost per 1K input tokens in USD.
    pub cost_per_1k_input: f64,
    /// Cost per 1K output tokens in USD.
    pub cost_per_1k_output: f64,
}

// ---------------------------------------------------------------------------
// Paper source trait
// ---------------------------------------------------------------------------

/// Trait for sources of paper records (the Notion database in
/// production).
#[async_trait]
pub trait PaperSource: Send + Sync {
    /// Human-readable source name (e.g. "notion").
    fn name(&self) -> &str;

    /// Fetch all papers with their notes.
    async fn fetch_papers(&self) -> anyhow::Result<Vec<Paper>>;
}

// ---------------------------------------------------------------------------
// Stats store trait
// ---------------------------------------------------------------------------

/// Trait for the per-paper stats persistence layer.
///
/// The scheduling core never calls this; only the application layer
/// reads and writes stats, and must `save` before starting another
/// session for the same paper.
pub trait StatsStore {
    /// Stats for one paper, if a record exists.
    fn get(&self, paper_id: &str) -> Option<PaperReviewStats>;

    /// Insert or replace one paper's stats in memory.
    fn put(&mut self, paper_id: &str, stats: PaperReviewStats);

    /// Persist all records atomically.
    fn save(&self) -> anyhow::Result<()>;
}

// ---------------------------------------------------------------------------
// System prompts
// ---------------------------------------------------------------------------

/// System prompt for question generation.
pub const QUESTION_SYSTEM_PROMPT: &str = "You are a study assistant that writes quiz questions from reading notes. Respond ONLY with a JSON array of objects, each with the keys \"question\" and \"ideal_answer\". Questions must be answerable from the notes alone. Do not include any text outside the JSON.";

/// System prompt for answer grading.
pub const GRADING_SYSTEM_PROMPT: &str = "You are grading a student's answer to a quiz question. Compare the answer to the ideal answer and respond ONLY with a JSON object with the keys \"score\" (a number from 0 to 100) and \"feedback\" (one or two sentences). Do not include any text outside the JSON.";

/// Build the user prompt for a question-generation request. Shared by
/// all backends so they stay comparable.
pub fn build_question_prompt(request: &QuestionRequest) -> String {
    format!(
        "Write exactly {count} quiz questions about the paper \"{title}\" \
         based on these reading notes:\n\n{notes}",
        count = request.question_count,
        title = request.paper_title,
        notes = request.notes,
    )
}

/// Build the user prompt for a grading request.
pub fn build_grade_prompt(request: &GradeRequest) -> String {
    format!(
        "Question: {question}\n\nIdeal answer: {ideal}\n\nStudent's answer: {answer}",
        question = request.question,
        ideal = request.ideal_answer,
        answer = request.answer,
    )
}

// ---------------------------------------------------------------------------
// Markdown JSON extraction
// ---------------------------------------------------------------------------

/// Extract a JSON payload from a possibly markdown-fenced LLM response.
///
/// Handles:
/// - A ```json fenced block (preferred)
/// - A generic ``` fenced block (if no json-specific block found)
/// - Raw JSON with no fences (returned as-is, trimmed)
pub fn extract_json_from_markdown(response: &str) -> String {
    let mut json_blocks = Vec::new();
    let mut generic_blocks = Vec::new();
    let mut in_block = false;
    let mut is_json_block = false;
    let mut is_generic_block = false;
    let mut current_block = String::new();

    for line in response.lines() {
        let trimmed = line.trim();

        if !in_block && trimmed.starts_with("```") {
            in_block = true;
            let lang = trimmed.trim_start_matches('`').trim().to_lowercase();
            is_json_block = lang == "json";
            is_generic_block = lang.is_empty();
            current_block.clear();
            continue;
        }

        if in_block && trimmed == "```" {
            in_block = false;
            if is_json_block {
                json_blocks.push(current_block.clone());
            } else if is_generic_block {
                generic_blocks.push(current_block.clone());
            }
            current_block.clear();
            continue;
        }

        if in_block {
            if !current_block.is_empty() {
                current_block.push('\n');
            }
            current_block.push_str(line);
        }
    }

    // A truncated (unclosed) block still counts.
    if in_block && !current_block.is_empty() {
        if is_json_block {
            json_blocks.push(current_block);
        } else if is_generic_block {
            generic_blocks.push(current_block);
        }
    }

    if let Some(block) = json_blocks.into_iter().next() {
        return block;
    }
    if let Some(block) = generic_blocks.into_iter().next() {
        return block;
    }

    response.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_json_fenced_block() {
        let input = "Here you go:\n\n```json\n[{\"question\": \"Q?\", \"ideal_answer\": \"A.\"}]\n```\n\nEnjoy!";
        let json = extract_json_from_markdown(input);
        assert_eq!(json, "[{\"question\": \"Q?\", \"ideal_answer\": \"A.\"}]");
    }

    #[test]
    fn extract_prefers_json_over_generic() {
        let input = "```\nnot it\n```\n\n```json\n{\"score\": 80}\n```\n";
        assert_eq!(extract_json_from_markdown(input), "{\"score\": 80}");
    }

    #[test]
    fn extract_generic_block_fallback() {
        let input = "```\n{\"score\": 50, \"feedback\": \"ok\"}\n```";
        assert_eq!(
            extract_json_from_markdown(input),
            "{\"score\": 50, \"feedback\": \"ok\"}"
        );
    }

    #[test]
    fn extract_raw_json_returned_trimmed() {
        let input = "  {\"score\": 100, \"feedback\": \"nailed it\"}\n";
        assert_eq!(
            extract_json_from_markdown(input),
            "{\"score\": 100, \"feedback\": \"nailed it\"}"
        );
    }

    #[test]
    fn extract_truncated_unclosed_block() {
        let input = "```json\n[{\"question\": \"Q?\"";
        let json = extract_json_from_markdown(input);
        assert!(json.contains("\"question\""));
    }

    #[test]
    fn question_prompt_includes_count_and_notes() {
        let request = QuestionRequest {
            model: "m".into(),
            paper_title: "Attention".into(),
            notes: "the notes".into(),
            question_count: 3,
            max_tokens: 1024,
            temperature: 0.3,
        };
        let prompt = build_question_prompt(&request);
        assert!(prompt.contains("exactly 3"));
        assert!(prompt.contains("Attention"));
        assert!(prompt.contains("the notes"));
    }

    #[test]
    fn grade_prompt_includes_all_parts() {
        let request = GradeRequest {
            model: "m".into(),
            question: "Why attention?".into(),
            ideal_answer: "Parallelism.".into(),
            answer: "It is faster.".into(),
            max_tokens: 512,
            temperature: 0.0,
        };
        let prompt = build_grade_prompt(&request);
        assert!(prompt.contains("Why attention?"));
        assert!(prompt.contains("Parallelism."));
        assert!(prompt.contains("It is faster."));
    }
}
