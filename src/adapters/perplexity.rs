use crate::config::TextGenerationConfig;
use crate::domain::ports::{GenerationRequest, TextGenerator};
use crate::utils::error::{EhonError, Result};
use crate::utils::validation::validate_secret;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const SERVICE: &str = "perplexity";

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Chat Completions 形式的文字生成 API
pub struct PerplexityClient {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl PerplexityClient {
    pub fn new(config: &TextGenerationConfig) -> Result<Self> {
        let api_key = validate_secret("text_generation.api_key", &config.api_key)?.to_string();
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key,
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl TextGenerator for PerplexityClient {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let body = ChatCompletionRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: &request.prompt,
            }],
            temperature: request.temperature,
        };

        tracing::debug!("Making text generation request to: {}", self.endpoint);
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        tracing::debug!("Text generation response status: {}", status);
        if !status.is_success() {
            return Err(EhonError::UpstreamStatus {
                service: SERVICE.to_string(),
                status: status.as_u16(),
            });
        }

        let text = response.text().await?;
        let parsed: ChatCompletionResponse =
            serde_json::from_str(&text).map_err(|e| EhonError::malformed(SERVICE, e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .map(|content| content.trim().to_string())
            .ok_or_else(|| EhonError::malformed(SERVICE, "missing choices[0].message.content"))
    }
}
