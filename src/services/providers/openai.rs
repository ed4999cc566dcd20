//! OpenAI chat completions backend
//!
//! The API key never leaves this process; clients only see the parsed
//! recommendations produced from the reply.
use crate::{
    error::{AppError, AppResult},
    services::providers::RecommendationModel,
};
use reqwest::Client as HttpClient;
use serde::{Deserialize, Serialize};

const TEMPERATURE: f32 = 0.7;

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
    #[serde(default)]
    code: Option<String>,
}

#[derive(Clone)]
pub struct OpenAiModel {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    model: String,
}

impl OpenAiModel {
    pub fn new(api_key: String, api_url: String, model: String) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_key,
            api_url: api_url.trim_end_matches('/').to_string(),
            model,
        }
    }
}

#[async_trait::async_trait]
impl RecommendationModel for OpenAiModel {
    async fn complete(&self, system: &str, prompt: &str) -> AppResult<String> {
        if self.api_key.trim().is_empty() {
            return Err(AppError::UpstreamCall(
                "OpenAI API key is not configured".to_string(),
            ));
        }

        let url = format!("{}/chat/completions", self.api_url);
        let request = ChatCompletionRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: TEMPERATURE,
        };

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| AppError::UpstreamCall(format!("OpenAI request failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::UpstreamCall(format!("OpenAI response unreadable: {}", e)))?;

        tracing::debug!(status = %status, model = %self.model, "OpenAI response received");

        if !status.is_success() {
            let detail = serde_json::from_str::<ApiErrorBody>(&body)
                .map(|b| match b.error.code {
                    Some(code) => format!("{} ({})", b.error.message, code),
                    None => b.error.message,
                })
                .unwrap_or(body);
            tracing::error!(status = %status, error = %detail, "OpenAI API error");
            return Err(AppError::UpstreamCall(format!(
                "OpenAI API returned status {}: {}",
                status, detail
            )));
        }

        let completion: ChatCompletionResponse = serde_json::from_str(&body).map_err(|e| {
            AppError::UpstreamCall(format!("Unexpected OpenAI response shape: {}", e))
        })?;

        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| AppError::UpstreamCall("OpenAI response had no content".to_string()))
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}
