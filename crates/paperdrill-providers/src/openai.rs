//! OpenAI API quiz backend.

use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use paperdrill_core::error::ProviderError;
use paperdrill_core::model::TokenUsage;
use paperdrill_core::traits::{
    build_grade_prompt, build_question_prompt, GradeRequest, GradeResponse, ModelInfo,
    QuestionRequest, QuestionResponse, QuizBackend, GRADING_SYSTEM_PROMPT,
    QUESTION_SYSTEM_PROMPT,
};

use crate::parse::{parse_grade, parse_questions};

const DEFAULT_BASE_URL: &str = "https://api.openai.com";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// OpenAI-compatible API quiz backend.
pub struct OpenAiBackend {
    api_key: String,
    base_url: String,
    org_id: Option<String>,
    client: reqwest::Client,
}

impl OpenAiBackend {
    pub fn new(api_key: &str, base_url: Option<String>, org_id: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .expect("failed to build HTTP client");

        Self {
            api_key: api_key.to_string(),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            org_id,
            client,
        }
    }

    /// One Chat Completions round-trip: returns the text content plus
    /// usage accounting.
    async fn send_chat(
        &self,
        model: &str,
        system: &str,
        prompt: String,
        max_tokens: u32,
        temperature: f64,
    ) -> anyhow::Result<(String, String, TokenUsage, u64)> {
        let start = Instant::now();

        let body = OpenAiRequest {
            model: model.to_string(),
            max_tokens,
            temperature,
            messages: vec![
                OpenAiMessage {
                    role: "system".to_string(),
                    content: system.to_string(),
                },
                OpenAiMessage {
                    role: "user".to_string(),
                    content: prompt,
                },
            ],
        };

        let mut request_builder = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .header("authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json");

        if let Some(org) = &self.org_id {
            request_builder = request_builder.header("openai-organization", org);
        }

        let response = request_builder.json(&body).send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout(DEFAULT_TIMEOUT_SECS)
            } else {
                ProviderError::NetworkError(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        if status == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(5)
                * 1000;
            return Err(ProviderError::RateLimited {
                retry_after_ms: retry_after,
            }
            .into());
        }
        if status == 401 {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::AuthenticationFailed(body).into());
        }
        if status == 404 {
            return Err(ProviderError::ModelNotFound(model.to_string()).into());
        }
        if status >= 400 {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<OpenAiError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(ProviderError::ApiError { status, message }.into());
        }

        let api_response: OpenAiResponse =
            response.json().await.map_err(|e| ProviderError::ApiError {
                status: 0,
                message: format!("failed to parse response: {e}"),
            })?;

        let latency_ms = start.elapsed().as_millis() as u64;
        let content = api_response
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .unwrap_or_default();

        // Pricing: GPT-4.1 $2/$8 per 1M tokens
        let estimated_cost = (api_response.usage.prompt_tokens as f64 * 2.0
            + api_response.usage.completion_tokens as f64 * 8.0)
            / 1_000_000.0;

        let usage = TokenUsage {
            prompt_tokens: api_response.usage.prompt_tokens,
            completion_tokens: api_response.usage.completion_tokens,
            total_tokens: api_response.usage.total_tokens,
            estimated_cost_usd: estimated_cost,
        };

        Ok((content, api_response.model, usage, latency_ms))
    }
}

#[derive(Serialize)]
struct OpenAiRequest {
    model: String,
    max_tokens: u32,
    temperature: f64,
    messages: Vec<OpenAiMessage>,
}

#[derive(Serialize)]
struct OpenAiMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
    #[serde(default)]
    usage: OpenAiUsage,
    model: String,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiChoiceMessage,
}

#[derive(Deserialize)]
struct OpenAiChoiceMessage {
    content: String,
}

#[derive(Deserialize, Default)]
struct OpenAiUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
    #[serde(default)]
    total_tokens: u32,
}

#[derive(Deserialize)]
struct OpenAiError {
    error: OpenAiErrorBody,
}

#[derive(Deserialize)]
struct OpenAiErrorBody {
    message: String,
}

#[async_trait]
impl QuizBackend for OpenAiBackend {
    fn name(&self) -> &str {
        "openai"
    }

    #[instrument(skip(self, request), fields(model = %request.model))]
    async fn generate_questions(
        &self,
        request: &QuestionRequest,
    ) -> anyhow::Result<QuestionResponse> {
        let prompt = build_question_prompt(request);
        let (content, model, token_usage, latency_ms) = self
            .send_chat(
                &request.model,
                QUESTION_SYSTEM_PROMPT,
                prompt,
                request.max_tokens,
                request.temperature,
            )
            .await?;

        let questions = parse_questions(&content)?;

        Ok(QuestionResponse {
            questions,
            model,
            token_usage,
            latency_ms,
        })
    }

    #[instrument(skip(self, request), fields(model = %request.model))]
    async fn grade_answer(&self, request: &GradeRequest) -> anyhow::Result<GradeResponse> {
        let prompt = build_grade_prompt(request);
        let (content, model, token_usage, latency_ms) = self
            .send_chat(
                &request.model,
                GRADING_SYSTEM_PROMPT,
                prompt,
                request.max_tokens,
                request.temperature,
            )
            .await?;

        let graded = parse_grade(&content)?;

        Ok(GradeResponse {
            graded,
            model,
            token_usage,
            latency_ms,
        })
    }

    fn available_models(&self) -> Vec<ModelInfo> {
        vec![
            ModelInfo {
                id: "gpt-4.1".into(),
                name: "GPT-4.1".into(),
                provider: "openai".into(),
                max_context: 1_000_000,
                cost_per_1k_input: 0.002,
                cost_per_1k_output: 0.008,
            },
            ModelInfo {
                id: "gpt-4.1-mini".into(),
                name: "GPT-4.1 Mini".into(),
                provider: "openai".into(),
                max_context: 1_000_000,
                cost_per_1k_input: 0.0004,
                cost_per_1k_output: 0.0016,
            },
        ]
    }
}
