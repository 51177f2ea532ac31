use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use crate::db::repositories::HistoryRepository;
use crate::errors::AppError;
use crate::models::{
    ChatMessage, ChatSession, ExportInfo, MessageView, SearchHit, SessionExport, SessionView,
    DEFAULT_SESSION, NEW_SESSION,
};

const MAX_SESSION_NAME_LENGTH: usize = 100;

/// Chat history operations, always scoped to the calling user.
#[derive(Clone)]
pub struct HistoryService {
    repo: Arc<dyn HistoryRepository>,
}

/// Session names are required and fit the 100-character history column.
pub fn validate_name(name: &str) -> Result<(), AppError> {
    if name.is_empty() {
        return Err(AppError::validation("Session name is required"));
    }
    let length = name.chars().count();
    if length > MAX_SESSION_NAME_LENGTH {
        return Err(AppError::FieldTooLong {
            field_name: "session_name".to_string(),
            max_length: MAX_SESSION_NAME_LENGTH,
            actual_length: length,
        });
    }
    Ok(())
}

impl HistoryService {
    pub fn new(repo: Arc<dyn HistoryRepository>) -> Self {
        Self { repo }
    }

    pub fn backend(&self) -> &'static str {
        self.repo.backend()
    }

    pub async fn ping(&self) -> Result<(), AppError> {
        self.repo.ping().await
    }

    async fn user_id(&self, username: &str) -> Result<i64, AppError> {
        Ok(self.repo.ensure_user(username).await?.id)
    }

    async fn owned_session(&self, user_id: i64, session_id: i64) -> Result<ChatSession, AppError> {
        self.repo
            .find_session(user_id, session_id)
            .await?
            .ok_or_else(|| AppError::not_found("Session", session_id))
    }

    pub async fn list(&self, username: &str) -> Result<Vec<SessionView>, AppError> {
        let user_id = self.user_id(username).await?;
        let sessions = self.repo.list_sessions(user_id).await?;
        let mut views = Vec::with_capacity(sessions.len());
        for session in sessions {
            let messages = self.repo.list_messages(session.id).await?;
            views.push(SessionView::new(session, messages));
        }
        Ok(views)
    }

    pub async fn get(&self, username: &str, session_id: i64) -> Result<SessionView, AppError> {
        let user_id = self.user_id(username).await?;
        let session = self.owned_session(user_id, session_id).await?;
        let messages = self.repo.list_messages(session.id).await?;
        Ok(SessionView::new(session, messages))
    }

    /// Creates a session; `None` means "New Session". Only `Default` may be repeated.
    pub async fn create(&self, username: &str, name: Option<&str>) -> Result<ChatSession, AppError> {
        let name = name.map(str::trim).filter(|n| !n.is_empty()).unwrap_or(NEW_SESSION);
        validate_name(name)?;
        let user_id = self.user_id(username).await?;

        if name != DEFAULT_SESSION && self.repo.name_taken(user_id, name, None).await? {
            return Err(AppError::DuplicateSession { name: name.to_string() });
        }

        let session = self.repo.create_session(user_id, name).await?;
        info!(user = %username, session = session.id, "Chat session created");
        Ok(session)
    }

    pub async fn rename(
        &self,
        username: &str,
        session_id: i64,
        name: Option<&str>,
    ) -> Result<ChatSession, AppError> {
        let name = name.map(str::trim).unwrap_or_default();
        validate_name(name)?;
        let user_id = self.user_id(username).await?;
        self.owned_session(user_id, session_id).await?;

        if self.repo.name_taken(user_id, name, Some(session_id)).await? {
            return Err(AppError::DuplicateSession { name: name.to_string() });
        }
        self.repo.rename_session(session_id, name).await
    }

    pub async fn delete(&self, username: &str, session_id: i64) -> Result<(), AppError> {
        let user_id = self.user_id(username).await?;
        self.owned_session(user_id, session_id).await?;
        self.repo.delete_session(session_id).await?;
        info!(user = %username, session = session_id, "Chat session deleted");
        Ok(())
    }

    pub async fn add_message(
        &self,
        username: &str,
        session_id: i64,
        question: &str,
        answer: &str,
    ) -> Result<ChatMessage, AppError> {
        if question.trim().is_empty() || answer.trim().is_empty() {
            return Err(AppError::validation("Question and answer are required"));
        }
        let user_id = self.user_id(username).await?;
        self.owned_session(user_id, session_id).await?;
        self.repo.add_message(session_id, question, answer).await
    }

    pub async fn delete_message(
        &self,
        username: &str,
        session_id: i64,
        message_id: i64,
    ) -> Result<(), AppError> {
        let user_id = self.user_id(username).await?;
        self.owned_session(user_id, session_id).await?;
        self.repo
            .find_message(session_id, message_id)
            .await?
            .ok_or_else(|| AppError::not_found("Message", message_id))?;
        self.repo.delete_message(message_id).await
    }

    pub async fn search(&self, username: &str, query: &str) -> Result<Vec<SearchHit>, AppError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AppError::validation("Search query is required"));
        }
        let user_id = self.user_id(username).await?;
        self.repo.search_messages(user_id, query).await
    }

    pub async fn export(&self, username: &str, session_id: i64) -> Result<SessionExport, AppError> {
        let user_id = self.user_id(username).await?;
        let session = self.owned_session(user_id, session_id).await?;
        let messages = self.repo.list_messages(session.id).await?;

        Ok(SessionExport {
            session_info: ExportInfo {
                session_id: session.id,
                session_name: session.session_name,
                created_at: session.created_at,
                exported_at: Utc::now(),
                total_messages: messages.len(),
            },
            messages: messages.into_iter().map(MessageView::from).collect(),
        })
    }

    /// Appends a chat exchange to the user's session named `session_name`,
    /// creating the session if needed.
    pub async fn record_exchange(
        &self,
        username: &str,
        session_name: &str,
        question: &str,
        answer: &str,
    ) -> Result<ChatMessage, AppError> {
        validate_name(session_name)?;
        let user_id = self.user_id(username).await?;
        let session = match self.repo.find_session_by_name(user_id, session_name).await? {
            Some(session) => session,
            None => match self.repo.create_session(user_id, session_name).await {
                Ok(session) => session,
                // A concurrent request created it between the lookup and the insert.
                Err(AppError::DuplicateSession { .. }) => self
                    .repo
                    .find_session_by_name(user_id, session_name)
                    .await?
                    .ok_or_else(|| AppError::not_found("Session", session_name))?,
                Err(e) => return Err(e),
            },
        };
        self.repo.add_message(session.id, question, answer).await
    }
}
