use async_trait::async_trait;
use sqlx::PgPool;
use tracing::error;

use crate::db::repositories::HistoryRepository;
use crate::errors::AppError;
use crate::models::{ChatMessage, ChatSession, HistoryUser, SearchHit};

const SESSION_COLUMNS: &str = "id, user_id, session_name, created_at";
const MESSAGE_COLUMNS: &str = "id, session_id, question, answer, timestamp";

#[derive(Clone)]
pub struct PgHistoryRepository {
    pool: PgPool,
}

impl PgHistoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Escapes `%`, `_` and `\` so user input matches literally inside `ILIKE`.
fn like_pattern(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len() + 2);
    escaped.push('%');
    for ch in query.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped.push('%');
    escaped
}

fn map_unique_violation(e: sqlx::Error, name: &str, context: &str) -> AppError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::DuplicateSession { name: name.to_string() }
        }
        _ => {
            error!("{context} '{name}': {e}");
            AppError::db_query(context.to_string(), e)
        }
    }
}

#[async_trait]
impl HistoryRepository for PgHistoryRepository {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::db_query("Database ping failed", e))?;
        Ok(())
    }

    async fn ensure_user(&self, username: &str) -> Result<HistoryUser, AppError> {
        sqlx::query_as::<_, HistoryUser>(
            "INSERT INTO history_users (username) VALUES ($1)
             ON CONFLICT (username) DO UPDATE SET username = EXCLUDED.username
             RETURNING id, username, created_at",
        )
        .bind(username)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to ensure history user {username}: {e}");
            AppError::db_query("Failed to prepare chat history user", e)
        })
    }

    async fn list_sessions(&self, user_id: i64) -> Result<Vec<ChatSession>, AppError> {
        sqlx::query_as::<_, ChatSession>(&format!(
            "SELECT {SESSION_COLUMNS} FROM chat_sessions
             WHERE user_id = $1
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to list sessions for user {user_id}: {e}");
            AppError::db_query("Failed to fetch chat history", e)
        })
    }

    async fn find_session(
        &self,
        user_id: i64,
        session_id: i64,
    ) -> Result<Option<ChatSession>, AppError> {
        sqlx::query_as::<_, ChatSession>(&format!(
            "SELECT {SESSION_COLUMNS} FROM chat_sessions WHERE id = $1 AND user_id = $2"
        ))
        .bind(session_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to find session {session_id}: {e}");
            AppError::db_query(format!("Failed to find session {session_id}"), e)
        })
    }

    async fn find_session_by_name(
        &self,
        user_id: i64,
        name: &str,
    ) -> Result<Option<ChatSession>, AppError> {
        sqlx::query_as::<_, ChatSession>(&format!(
            "SELECT {SESSION_COLUMNS} FROM chat_sessions
             WHERE user_id = $1 AND session_name = $2
             ORDER BY created_at ASC, id ASC
             LIMIT 1"
        ))
        .bind(user_id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to find session '{name}': {e}");
            AppError::db_query("Failed to find session by name", e)
        })
    }

    async fn name_taken(
        &self,
        user_id: i64,
        name: &str,
        exclude: Option<i64>,
    ) -> Result<bool, AppError> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (
                 SELECT 1 FROM chat_sessions
                 WHERE user_id = $1 AND session_name = $2
                   AND ($3::BIGINT IS NULL OR id <> $3)
             )",
        )
        .bind(user_id)
        .bind(name)
        .bind(exclude)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::db_query("Failed to check session name", e))
    }

    async fn create_session(&self, user_id: i64, name: &str) -> Result<ChatSession, AppError> {
        sqlx::query_as::<_, ChatSession>(&format!(
            "INSERT INTO chat_sessions (user_id, session_name) VALUES ($1, $2)
             RETURNING {SESSION_COLUMNS}"
        ))
        .bind(user_id)
        .bind(name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, name, "Failed to create session"))
    }

    async fn rename_session(&self, session_id: i64, name: &str) -> Result<ChatSession, AppError> {
        sqlx::query_as::<_, ChatSession>(&format!(
            "UPDATE chat_sessions SET session_name = $1 WHERE id = $2
             RETURNING {SESSION_COLUMNS}"
        ))
        .bind(name)
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_unique_violation(e, name, "Failed to rename session"))?
        .ok_or_else(|| AppError::not_found("Session", session_id))
    }

    async fn delete_session(&self, session_id: i64) -> Result<(), AppError> {
        sqlx::query("DELETE FROM chat_sessions WHERE id = $1")
            .bind(session_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to delete session {session_id}: {e}");
                AppError::db_query("Failed to delete session", e)
            })?;
        Ok(())
    }

    async fn list_messages(&self, session_id: i64) -> Result<Vec<ChatMessage>, AppError> {
        sqlx::query_as::<_, ChatMessage>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM chat_messages
             WHERE session_id = $1
             ORDER BY timestamp ASC, id ASC"
        ))
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to fetch messages for session {session_id}: {e}");
            AppError::db_query(format!("Failed to fetch messages for session {session_id}"), e)
        })
    }

    async fn add_message(
        &self,
        session_id: i64,
        question: &str,
        answer: &str,
    ) -> Result<ChatMessage, AppError> {
        sqlx::query_as::<_, ChatMessage>(&format!(
            "INSERT INTO chat_messages (session_id, question, answer) VALUES ($1, $2, $3)
             RETURNING {MESSAGE_COLUMNS}"
        ))
        .bind(session_id)
        .bind(question)
        .bind(answer)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to save message in session {session_id}: {e}");
            AppError::db_query("Failed to save message", e)
        })
    }

    async fn find_message(
        &self,
        session_id: i64,
        message_id: i64,
    ) -> Result<Option<ChatMessage>, AppError> {
        sqlx::query_as::<_, ChatMessage>(&format!(
            "SELECT {MESSAGE_COLUMNS} FROM chat_messages WHERE id = $1 AND session_id = $2"
        ))
        .bind(message_id)
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::db_query(format!("Failed to find message {message_id}"), e))
    }

    async fn delete_message(&self, message_id: i64) -> Result<(), AppError> {
        sqlx::query("DELETE FROM chat_messages WHERE id = $1")
            .bind(message_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                error!("Failed to delete message {message_id}: {e}");
                AppError::db_query("Failed to delete message", e)
            })?;
        Ok(())
    }

    async fn search_messages(&self, user_id: i64, query: &str) -> Result<Vec<SearchHit>, AppError> {
        sqlx::query_as::<_, SearchHit>(
            "SELECT m.id AS message_id, m.session_id, s.session_name,
                    m.question, m.answer, m.timestamp
             FROM chat_messages m
             JOIN chat_sessions s ON s.id = m.session_id
             WHERE s.user_id = $1
               AND (m.question ILIKE $2 ESCAPE '\\' OR m.answer ILIKE $2 ESCAPE '\\')
             ORDER BY m.timestamp DESC, m.id DESC",
        )
        .bind(user_id)
        .bind(like_pattern(query))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            error!("Failed to search history for user {user_id}: {e}");
            AppError::db_query("Failed to search chat history", e)
        })
    }
}
