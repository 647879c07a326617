
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::ProviderError;
use crate::config::GenerationConfig;
use crate::generation::{GenerativeModel, StructuredReply};

/// Chat-completions client for OpenAI-compatible endpoints
#[derive(Debug, Clone)]
pub struct OpenAiChatClient {
    endpoint: Url,
    model: String,
    api_key: Option<String>,
    temperature: f32,
    max_tokens: u32,
    agent: ureq::Agent,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
    response_format: ResponseFormat,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

impl OpenAiChatClient {
    #[inline]
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let endpoint = config
            .endpoint_url()?
            .join("chat/completions")
            .context("Failed to build chat completions URL")?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_seconds)))
            .build()
            .into();

        Ok(Self {
            endpoint,
            model: config.model.clone(),
            api_key: config.api_key(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            agent,
        })
    }

    #[inline]
    #[must_use]
    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key;
        self
    }

    #[inline]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Run one chat completion and parse the JSON reply. Blocking.
    #[inline]
    pub fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<StructuredReply, ProviderError> {
        let request = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let request_json = serde_json::to_string(&request)
            .map_err(|e| ProviderError::InvalidInput(e.to_string()))?;

        debug!(
            "Requesting completion from {} (model {})",
            self.endpoint, self.model
        );

        let mut builder = self
            .agent
            .post(self.endpoint.as_str())
            .header("Content-Type", "application/json");
        if let Some(api_key) = &self.api_key {
            builder = builder.header("Authorization", format!("Bearer {api_key}"));
        }

        let response_text = builder
            .send(&request_json)
            .and_then(|mut resp| resp.body_mut().read_to_string())?;

        let response: ChatResponse = serde_json::from_str(&response_text)
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ProviderError::InvalidResponse("completion had no content".to_string()))?;

        parse_structured_reply(&content)
    }
}

/// Parse the model's JSON payload, tolerating a surrounding Markdown code fence
pub(crate) fn parse_structured_reply(content: &str) -> Result<StructuredReply, ProviderError> {
    let trimmed = content.trim();
    let json = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|inner| inner.strip_suffix("```"))
        .unwrap_or(trimmed);

    let reply: StructuredReply = serde_json::from_str(json.trim())
        .map_err(|e| ProviderError::InvalidResponse(format!("reply was not valid JSON: {e}")))?;

    if reply.reply.trim().is_empty() {
        return Err(ProviderError::InvalidResponse(
            "reply field was empty".to_string(),
        ));
    }

    Ok(reply)
}

#[async_trait]
impl GenerativeModel for OpenAiChatClient {
    #[inline]
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<StructuredReply, ProviderError> {
        let client = self.clone();
        let system_prompt = system_prompt.to_string();
        let user_prompt = user_prompt.to_string();

        tokio::task::spawn_blocking(move || client.complete(&system_prompt, &user_prompt))
            .await
            .map_err(|e| ProviderError::Unreachable(format!("generation task failed: {e}")))?
    }
}
