use async_trait::async_trait;

use crate::errors::AppError;
use crate::models::{ChatMessage, ChatSession, HistoryUser, SearchHit};

/// Durable chat history. Every session lookup is scoped to the owning user.
#[async_trait]
pub trait HistoryRepository: Send + Sync {
    /// Short label for health reporting.
    fn backend(&self) -> &'static str;

    async fn ping(&self) -> Result<(), AppError>;

    /// Returns the history user for `username`, creating it on first use.
    async fn ensure_user(&self, username: &str) -> Result<HistoryUser, AppError>;

    /// Sessions of a user, newest first.
    async fn list_sessions(&self, user_id: i64) -> Result<Vec<ChatSession>, AppError>;

    async fn find_session(
        &self,
        user_id: i64,
        session_id: i64,
    ) -> Result<Option<ChatSession>, AppError>;

    /// Oldest session of the user carrying `name`.
    async fn find_session_by_name(
        &self,
        user_id: i64,
        name: &str,
    ) -> Result<Option<ChatSession>, AppError>;

    /// Whether another session of the user (other than `exclude`) already uses `name`.
    async fn name_taken(
        &self,
        user_id: i64,
        name: &str,
        exclude: Option<i64>,
    ) -> Result<bool, AppError>;

    async fn create_session(&self, user_id: i64, name: &str) -> Result<ChatSession, AppError>;

    async fn rename_session(&self, session_id: i64, name: &str) -> Result<ChatSession, AppError>;

    /// Removes the session together with all of its messages.
    async fn delete_session(&self, session_id: i64) -> Result<(), AppError>;

    /// Messages of a session, oldest first.
    async fn list_messages(&self, session_id: i64) -> Result<Vec<ChatMessage>, AppError>;

    async fn add_message(
        &self,
        session_id: i64,
        question: &str,
        answer: &str,
    ) -> Result<ChatMessage, AppError>;

    async fn find_message(
        &self,
        session_id: i64,
        message_id: i64,
    ) -> Result<Option<ChatMessage>, AppError>;

    async fn delete_message(&self, message_id: i64) -> Result<(), AppError>;

    /// Case-insensitive substring search over questions and answers, newest first.
    async fn search_messages(&self, user_id: i64, query: &str) -> Result<Vec<SearchHit>, AppError>;
}
