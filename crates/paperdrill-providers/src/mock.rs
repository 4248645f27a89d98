//! Mock quiz backend for testing.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use paperdrill_core::model::{GradedAnswer, QuizQuestion, TokenUsage};
use paperdrill_core::traits::{
    GradeRequest, GradeResponse, ModelInfo, QuestionRequest, QuestionResponse, QuizBackend,
};

/// A mock quiz backend for exercising the session engine and CLI
/// without real API calls.
///
/// Returns a fixed question set and a fixed grade score, and records
/// the requests it receives.
pub struct MockBackend {
    questions: Vec<QuizQuestion>,
    grade_score: f64,
    call_count: AtomicU32,
    last_grade_request: Mutex<Option<GradeRequest>>,
}

impl MockBackend {
    /// Create a mock that returns the given questions and grades every
    /// answer with the given score.
    pub fn new(questions: Vec<QuizQuestion>, grade_score: f64) -> Self {
        Self {
            questions,
            grade_score,
            call_count: AtomicU32::new(0),
            last_grade_request: Mutex::new(None),
        }
    }

    /// A single-question mock with a fixed grade.
    pub fn with_fixed_question(question: &str, ideal_answer: &str, grade_score: f64) -> Self {
        Self::new(
            vec![QuizQuestion {
                question: question.to_string(),
                ideal_answer: ideal_answer.to_string(),
            }],
            grade_score,
        )
    }

    /// Get the number of calls made to this backend.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Get the last grading request made to this backend.
    pub fn last_grade_request(&self) -> Option<GradeRequest> {
        self.last_grade_request.lock().unwrap().clone()
    }
}

#[async_trait]
impl QuizBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate_questions(
        &self,
        request: &QuestionRequest,
    ) -> anyhow::Result<QuestionResponse> {
        self.call_count.fetch_add(1, Ordering::Relaxed);

        let questions: Vec<QuizQuestion> = self
            .questions
            .iter()
            .cloned()
            .take(request.question_count.max(1))
            .collect();

        Ok(QuestionResponse {
            questions,
            model: request.model.clone(),
            token_usage: TokenUsage {
                prompt_tokens: (request.notes.len() / 4) as u32,
                completion_tokens: 32,
                total_tokens: (request.notes.len() / 4) as u32 + 32,
                estimated_cost_usd: 0.0,
            },
            latency_ms: 1,
        })
    }

    async fn grade_answer(&self, request: &GradeRequest) -> anyhow::Result<GradeResponse> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        *self.last_grade_request.lock().unwrap() = Some(request.clone());

        Ok(GradeResponse {
            graded: GradedAnswer {
                score: self.grade_score,
                feedback: format!("Mock grade for \"{}\".", request.question),
            },
            model: request.model.clone(),
            token_usage: TokenUsage {
                prompt_tokens: (request.answer.len() / 4) as u32,
                completion_tokens: 16,
                total_tokens: (request.answer.len() / 4) as u32 + 16,
                estimated_cost_usd: 0.0,
            },
            latency_ms: 1,
        })
    }

    fn available_models(&self) -> Vec<ModelInfo> {
        vec![ModelInfo {
            id: "mock-model".into(),
            name: "Mock Model".into(),
            provider: "mock".into(),
            max_context: 100_000,
            cost_per_1k_input: 0.0,
            cost_per_1k_output: 0.0,
        }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fixed_question_and_grade() {
        let backend = MockBackend::with_fixed_question("Why attention?", "Parallelism.", 88.0);

        let response = backend
            .generate_questions(&QuestionRequest {
                model: "mock-model".into(),
                paper_title: "T".into(),
                notes: "Some notes.".into(),
                question_count: 3,
                max_tokens: 256,
                temperature: 0.0,
            })
            .await
            .unwrap();
        assert_eq!(response.questions.len(), 1);

        let grade = backend
            .grade_answer(&GradeRequest {
                model: "mock-model".into(),
                question: "Why attention?".into(),
                ideal_answer: "Parallelism.".into(),
                answer: "Faster.".into(),
                max_tokens: 128,
                temperature: 0.0,
            })
            .await
            .unwrap();
        assert_eq!(grade.graded.score, 88.0);
        assert_eq!(backend.call_count(), 2);
        assert_eq!(
            backend.last_grade_request().unwrap().answer,
            "Faster.".to_string()
        );
    }

    #[tokio::test]
    async fn question_count_caps_the_set() {
        let questions = (0..5)
            .map(|i| QuizQuestion {
                question: format!("Q{i}?"),
                ideal_answer: "A.".into(),
            })
            .collect();
        let backend = MockBackend::new(questions, 50.0);

        let response = backend
            .generate_questions(&QuestionRequest {
                model: "mock-model".into(),
                paper_title: "T".into(),
                notes: "N".into(),
                question_count: 2,
                max_tokens: 256,
                temperature: 0.0,
            })
            .await
            .unwrap();
        assert_eq!(response.questions.len(), 2);
    }
}
