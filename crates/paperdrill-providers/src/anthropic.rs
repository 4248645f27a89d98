//! Anthropic API quiz backend.

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

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Anthropic API quiz backend.
pub struct AnthropicBackend {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl AnthropicBackend {
    pub fn new(api_key: &str, base_url: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .expect("failed to build HTTP client");

        Self {
            api_key: api_key.to_string(),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            client,
        }
    }

    /// One Messages API round-trip: returns the text content plus
    /// usage accounting.
    async fn send_message(
        &self,
        model: &str,
        system: &str,
        prompt: String,
        max_tokens: u32,
        temperature: f64,
    ) -> anyhow::Result<(String, String, TokenUsage, u64)> {
        let start = Instant::now();

        let body = AnthropicRequest {
            model: model.to_string(),
            max_tokens,
            temperature,
            system: Some(system.to_string()),
            messages: vec![AnthropicMessage {
                role: "user".to_string(),
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", "2023-06-01")
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
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
            let message = serde_json::from_str::<AnthropicError>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(ProviderError::ApiError { status, message }.into());
        }

        let api_response: AnthropicResponse =
            response.json().await.map_err(|e| ProviderError::ApiError {
                status: 0,
                message: format!("failed to parse response: {e}"),
            })?;

        let latency_ms = start.elapsed().as_millis() as u64;
        let content = api_response
            .content
            .first()
            .map(|c| c.text.clone())
            .unwrap_or_default();

        let total_tokens = api_response.usage.input_tokens + api_response.usage.output_tokens;
        // Pricing: Claude Sonnet $3/$15 per 1M tokens
        let estimated_cost = (api_response.usage.input_tokens as f64 * 3.0
            + api_response.usage.output_tokens as f64 * 15.0)
            / 1_000_000.0;

        let usage = TokenUsage {
            prompt_tokens: api_response.usage.input_tokens,
            completion_tokens: api_response.usage.output_tokens,
            total_tokens,
            estimated_cost_usd: estimated_cost,
        };

        Ok((content, api_response.model, usage, latency_ms))
    }
}

#[derive(Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<AnthropicMessage>,
}

#[derive(Serialize)]
struct AnthropicMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
    #[serde(default)]
    usage: AnthropicUsage,
    model: String,
}

#[derive(Deserialize)]
struct AnthropicContent {
    text: String,
}

#[derive(Deserialize, Default)]
struct AnthropicUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

#[derive(Deserialize)]
struct AnthropicError {
    error: AnthropicErrorBody,
}

#[derive(Deserialize)]
struct AnthropicErrorBody {
    message: String,
}

#[async_trait]
impl QuizBackend for AnthropicBackend {
    fn name(&self) -> &str {
        "anthropic"
    }

    #[instrument(skip(self, request), fields(model = %request.model))]
    async fn generate_questions(
        &self,
        request: &QuestionRequest,
    ) -> anyhow::Result<QuestionResponse> {
        let prompt = build_question_prompt(request);
        let (content, model, token_usage, latency_ms) = self
            .send_message(
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
            .send_message(
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
                id: "claude-sonnet-4-20250514".into(),
                name: "Claude Sonnet 4".into(),
                provider: "anthropic".into(),
                max_context: 200_000,
                cost_per_1k_input: 0.003,
                cost_per_1k_output: 0.015,
            },
            ModelInfo {
                id: "claude-haiku-4-5-20251001".into(),
                name: "Claude Haiku 4.5".into(),
                provider: "anthropic".into(),
                max_context: 200_000,
                cost_per_1k_input: 0.0008,
                cost_per_1k_output: 0.004,
            },
        ]
    }
}
