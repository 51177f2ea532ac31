use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::agent::prompts::{
    chat_prompt, plot_prompt, CHAT_SYSTEM_PROMPT, PLOT_KEYWORDS, PLOT_SYSTEM_PROMPT,
};
use crate::agent::{ChatModel, CompletionRequest};
use crate::errors::AppError;
use crate::markdown::{extract_code, extract_tables};
use crate::models::{
    render_sources, ChatRequest, ChatResponse, ConversationTurn, MarkdownTable, SessionTurn,
    DEFAULT_SESSION,
};
use crate::service::history_service::{validate_name, HistoryService};
use crate::workspace::Workspace;

const MAX_QUESTION_LENGTH: usize = 8000;
const PLOT_ATTEMPTS: usize = 3;
const PLOT_TEMPERATURE: f64 = 0.2;

/// True when the question asks for something chartable or the answer already holds a table.
pub fn wants_plot(question: &str, tables: &[MarkdownTable]) -> bool {
    let question = question.to_lowercase();
    !tables.is_empty() || PLOT_KEYWORDS.iter().any(|k| question.contains(k))
}

#[derive(Clone)]
pub struct ChatService {
    model: Arc<dyn ChatModel>,
    workspace: Workspace,
    history: HistoryService,
    plot_generation: bool,
}

impl ChatService {
    pub fn new(
        model: Arc<dyn ChatModel>,
        workspace: Workspace,
        history: HistoryService,
        plot_generation: bool,
    ) -> Self {
        Self { model, workspace, history, plot_generation }
    }

    pub async fn chat(&self, username: &str, request: ChatRequest) -> Result<ChatResponse, AppError> {
        // ── Validation ────────────────────────────────────────────────────────
        let question = request.question.trim();
        if question.is_empty() {
            return Err(AppError::validation("Question is required"));
        }
        let length = question.chars().count();
        if length > MAX_QUESTION_LENGTH {
            return Err(AppError::FieldTooLong {
                field_name: "question".to_string(),
                max_length: MAX_QUESTION_LENGTH,
                actual_length: length,
            });
        }

        let session_name = request
            .session_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(DEFAULT_SESSION)
            .to_string();
        validate_name(&session_name)?;
        self.workspace.ensure_session(username, &session_name).await;

        // ── Context: knowledge base and recent turns ─────────────────────────
        let knowledge_base = match request.knowledge_base.filter(|kb| !kb.trim().is_empty()) {
            Some(kb) => kb,
            None => self.workspace.knowledge_base(username).await,
        };
        let history: Vec<ConversationTurn> = match request.conversation_history {
            Some(turns) => turns,
            None => self
                .workspace
                .turns(username, &session_name)
                .await?
                .iter()
                .map(ConversationTurn::from)
                .collect(),
        };

        // ── Ask the model ─────────────────────────────────────────────────────
        let completion = self
            .model
            .complete(
                CompletionRequest::new(chat_prompt(&knowledge_base, question))
                    .with_system(CHAT_SYSTEM_PROMPT)
                    .with_history(&history),
            )
            .await?;
        let answer = completion.content;

        let tables = extract_tables(&answer);
        let plot_code = if self.plot_generation && wants_plot(question, &tables) {
            self.generate_plot_code(&knowledge_base, question, &answer).await
        } else {
            None
        };

        // ── Record the turn ───────────────────────────────────────────────────
        let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S").to_string();
        self.workspace
            .push_turn(
                username,
                &session_name,
                SessionTurn {
                    q: question.to_string(),
                    a: answer.clone(),
                    timestamp: timestamp.clone(),
                },
            )
            .await;

        if let Err(e) = self
            .history
            .record_exchange(username, &session_name, question, &answer)
            .await
        {
            error!("Failed to save chat history for {username}: {e}");
        }

        info!(
            user = %username,
            session = %session_name,
            tables = tables.len(),
            plot = plot_code.is_some(),
            "Chat answered"
        );

        Ok(ChatResponse {
            success: true,
            response: answer,
            timestamp,
            tables,
            plot: None,
            plot_code,
            sources: render_sources(&completion.citations),
        })
    }

    async fn generate_plot_code(&self, knowledge_base: &str, question: &str, answer: &str) -> Option<String> {
        for attempt in 1..=PLOT_ATTEMPTS {
            let request = CompletionRequest::new(plot_prompt(knowledge_base, question, answer))
                .with_system(PLOT_SYSTEM_PROMPT)
                .with_temperature(PLOT_TEMPERATURE);

            match self.model.complete(request).await {
                Ok(completion) => {
                    let code = extract_code(&completion.content);
                    if !code.is_empty() {
                        return Some(code);
                    }
                    debug!("Plot attempt {attempt} returned no code");
                }
                Err(e) => warn!("Plot attempt {attempt} failed: {e}"),
            }
        }
        None
    }
}
