pub mod ollama;
pub mod perplexity;
pub mod prompts;
#[cfg(test)]
pub mod scripted;

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{AppConfig, LlmProvider};
use crate::errors::AppError;
use crate::models::{Citation, ConversationTurn};

use self::ollama::OllamaAgentService;
use self::perplexity::PerplexityClient;

/// Only the most recent turns are replayed to the model.
pub const HISTORY_WINDOW: usize = 5;

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system: Option<String>,
    pub history: Vec<ConversationTurn>,
    pub prompt: String,
    pub temperature: f64,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self { system: None, history: Vec::new(), prompt: prompt.into(), temperature: 0.7 }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Keeps the last [`HISTORY_WINDOW`] turns of `history`.
    pub fn with_history(mut self, history: &[ConversationTurn]) -> Self {
        let start = history.len().saturating_sub(HISTORY_WINDOW);
        self.history = history[start..].to_vec();
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct Completion {
    pub content: String,
    pub citations: Vec<Citation>,
}

/// A text-completion backend.
#[async_trait]
pub trait ChatModel: Send + Sync {
    fn provider(&self) -> &str;

    async fn complete(&self, request: CompletionRequest) -> Result<Completion, AppError>;
}

pub fn build_model(config: &AppConfig) -> Result<Arc<dyn ChatModel>, AppError> {
    match config.llm_provider {
        LlmProvider::Perplexity => Ok(Arc::new(PerplexityClient::new(
            config.perplexity_api_key.clone(),
            &config.perplexity_api_url,
            &config.perplexity_model,
        )?)),
        LlmProvider::Ollama => Ok(Arc::new(OllamaAgentService::new(
            &config.ollama_base_url,
            &config.ollama_model,
        )?)),
    }
}
