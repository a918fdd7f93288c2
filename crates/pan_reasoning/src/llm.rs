use crate::prompts::system_prompt;
use anyhow::Result;
use async_trait::async_trait;
use pan_core::{CapabilityError, GenerationContext, Generator};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Sampling parameters for one completion.
#[derive(Debug, Clone, Copy)]
pub struct CompletionParams {
    pub max_tokens: u32,
    /// 0.0 - 2.0
    pub temperature: f32,
}

impl Default for CompletionParams {
    fn default() -> Self {
        Self {
            max_tokens: 512,
            temperature: 0.7,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(
        &self,
        system: &str,
        messages: Vec<ChatMessage>,
        params: CompletionParams,
    ) -> Result<String>;

    fn name(&self) -> &str;
}

/// Adapts a chat-completion client to the [`Generator`] capability.
///
/// Recent exchanges become prior turns; memories, mood and tone go into the
/// system prompt.
pub struct LlmGenerator {
    client: Arc<dyn LlmClient>,
    params: CompletionParams,
}

impl LlmGenerator {
    pub fn new(client: Arc<dyn LlmClient>, params: CompletionParams) -> Self {
        Self { client, params }
    }
}

#[async_trait]
impl Generator for LlmGenerator {
    async fn generate(
        &self,
        prompt: &str,
        context: &GenerationContext,
    ) -> Result<String, CapabilityError> {
        let system = system_prompt(context);
        let mut messages = Vec::with_capacity(context.recent_exchanges.len() * 2 + 1);
        for exchange in &context.recent_exchanges {
            messages.push(ChatMessage::user(&exchange.utterance));
            messages.push(ChatMessage::assistant(&exchange.response));
        }
        messages.push(ChatMessage::user(prompt));

        let text = self
            .client
            .complete(&system, messages, self.params)
            .await
            .map_err(|e| CapabilityError::unavailable("generation", e))?;
        let text = text.trim();
        if text.is_empty() {
            return Err(CapabilityError::unavailable("generation", "empty completion"));
        }
        Ok(text.to_string())
    }

    fn name(&self) -> &str {
        self.client.name()
    }
}
