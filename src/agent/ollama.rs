use async_trait::async_trait;
use rig::client::Nothing;
use rig::completion::Chat;
use rig::message::Message as RigMessage;
use rig::prelude::CompletionClient;
use rig::providers::ollama;
use tracing::error;

use crate::agent::{ChatModel, Completion, CompletionRequest};
use crate::errors::AppError;
use crate::models::ConversationTurn;

const PROVIDER: &str = "ollama";

/// Replays question/answer turns as alternating user and assistant messages.
fn to_rig_history(turns: &[ConversationTurn]) -> Vec<RigMessage> {
    turns
        .iter()
        .flat_map(|t| [RigMessage::user(&t.q), RigMessage::assistant(&t.a)])
        .collect()
}

/// Local model served by Ollama through the rig client.
/// A fresh agent is built per request so the system prompt and history travel with each call.
#[derive(Clone)]
pub struct OllamaAgentService {
    client: ollama::Client,
    base_url: String,
    model: String,
}

impl OllamaAgentService {
    pub fn new(base_url: &str, model: &str) -> Result<Self, AppError> {
        let client = ollama::Client::builder()
            .api_key(Nothing)
            .base_url(base_url)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build Ollama client: {e}")))?;
        Ok(Self { client, base_url: base_url.to_string(), model: model.to_string() })
    }
}

#[async_trait]
impl ChatModel for OllamaAgentService {
    fn provider(&self) -> &str {
        PROVIDER
    }

    async fn complete(&self, request: CompletionRequest) -> Result<Completion, AppError> {
        let mut builder = self.client.agent(&self.model).temperature(request.temperature);
        if let Some(system) = &request.system {
            builder = builder.preamble(system);
        }
        let agent = builder.build();

        let content = agent
            .chat(request.prompt.as_str(), to_rig_history(&request.history))
            .await
            .map_err(|e| {
                error!("Ollama inference failed: {e}");
                let msg = e.to_string();
                if msg.contains("Connection refused") || msg.contains("connect") {
                    AppError::ModelUnavailable {
                        provider: PROVIDER.to_string(),
                        reason: format!("no server at {}", self.base_url),
                    }
                } else if msg.contains("model") {
                    AppError::ModelUnavailable {
                        provider: PROVIDER.to_string(),
                        reason: format!("model '{}' not found", self.model),
                    }
                } else {
                    AppError::InferenceError { message: msg }
                }
            })?;

        Ok(Completion { content, citations: Vec::new() })
    }
}
