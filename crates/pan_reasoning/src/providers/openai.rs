use crate::llm::{ChatMessage, CompletionParams, LlmClient};
use crate::retry::{with_retry, RetryConfig};
use anyhow::{Context, Result};
use pan_core::config::LlmConfig;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Any endpoint speaking the OpenAI chat-completions protocol.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    retry: RetryConfig,
}

impl OpenAiClient {
    pub fn new(config: &LlmConfig, timeout: Duration) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .context("LLM API key is not set")?;
        let base_url = config
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            api_key,
            base_url,
            model: config.model.clone(),
            retry: RetryConfig::no_retry(),
        })
    }

    pub fn with_retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

#[async_trait::async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(
        &self,
        system: &str,
        messages: Vec<ChatMessage>,
        params: CompletionParams,
    ) -> Result<String> {
        // System prompt travels as the first message
        let mut wire = vec![json!({ "role": "system", "content": system })];
        for msg in &messages {
            wire.push(serde_json::to_value(msg)?);
        }

        let payload = json!({
            "model": self.model,
            "messages": wire,
            "max_tokens": params.max_tokens,
            "temperature": params.temperature,
        });
        let url = format!("{}/chat/completions", self.base_url);

        let response = with_retry(&self.retry, "OpenAI", || {
            let req = self
                .client
                .post(&url)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .json(&payload);
            async move { req.send().await.context("Failed to send request to OpenAI") }
        })
        .await?;

        let body: Value = response.json().await.context("Invalid OpenAI response")?;
        let content = body["choices"][0]["message"]["content"]
            .as_str()
            .context("OpenAI response has no message content")?;
        Ok(content.to_string())
    }

    fn name(&self) -> &str {
        "openai"
    }
}
