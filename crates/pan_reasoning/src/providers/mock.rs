//! Mock LLM provider: deterministic replies for running without an API key.

use crate::llm::{ChatMessage, CompletionParams, LlmClient};
use anyhow::Result;

#[derive(Debug, Clone)]
pub struct MockProvider {
    model: String,
}

impl MockProvider {
    pub fn new(model: &str) -> Self {
        Self {
            model: model.to_string(),
        }
    }
}

#[async_trait::async_trait]
impl LlmClient for MockProvider {
    async fn complete(
        &self,
        _system: &str,
        messages: Vec<ChatMessage>,
        _params: CompletionParams,
    ) -> Result<String> {
        let last = messages.last().map(|m| m.content.as_str()).unwrap_or_default();
        Ok(format!("(Mock {} Response) You said: {}", self.model, last))
    }

    fn name(&self) -> &str {
        "mock"
    }
}
