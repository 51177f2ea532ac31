use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::db::repositories::HistoryRepository;
use crate::errors::AppError;
use crate::models::{ChatMessage, ChatSession, HistoryUser, SearchHit, DEFAULT_SESSION};

#[derive(Default)]
struct Tables {
    users: BTreeMap<i64, HistoryUser>,
    sessions: BTreeMap<i64, ChatSession>,
    messages: BTreeMap<i64, ChatMessage>,
    next_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn name_taken(&self, user_id: i64, name: &str, exclude: Option<i64>) -> bool {
        self.sessions.values().any(|s| {
            s.user_id == user_id && s.session_name == name && Some(s.id) != exclude
        })
    }
}

/// Process-local history used when no database is configured.
/// Mirrors the Postgres schema: `Default` may repeat, other names are unique per user,
/// and deleting a session removes its messages.
#[derive(Clone, Default)]
pub struct MemoryHistoryRepository {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryHistoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryRepository for MemoryHistoryRepository {
    fn backend(&self) -> &'static str {
        "in-memory"
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn ensure_user(&self, username: &str) -> Result<HistoryUser, AppError> {
        let mut t = self.tables.write().await;
        if let Some(user) = t.users.values().find(|u| u.username == username) {
            return Ok(user.clone());
        }
        let user = HistoryUser { id: t.next_id(), username: username.to_string(), created_at: Utc::now() };
        t.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn list_sessions(&self, user_id: i64) -> Result<Vec<ChatSession>, AppError> {
        let t = self.tables.read().await;
        let mut sessions: Vec<ChatSession> =
            t.sessions.values().filter(|s| s.user_id == user_id).cloned().collect();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(sessions)
    }

    async fn find_session(
        &self,
        user_id: i64,
        session_id: i64,
    ) -> Result<Option<ChatSession>, AppError> {
        let t = self.tables.read().await;
        Ok(t.sessions.get(&session_id).filter(|s| s.user_id == user_id).cloned())
    }

    async fn find_session_by_name(
        &self,
        user_id: i64,
        name: &str,
    ) -> Result<Option<ChatSession>, AppError> {
        let t = self.tables.read().await;
        Ok(t
            .sessions
            .values()
            .filter(|s| s.user_id == user_id && s.session_name == name)
            .min_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)))
            .cloned())
    }

    async fn name_taken(
        &self,
        user_id: i64,
        name: &str,
        exclude: Option<i64>,
    ) -> Result<bool, AppError> {
        Ok(self.tables.read().await.name_taken(user_id, name, exclude))
    }

    async fn create_session(&self, user_id: i64, name: &str) -> Result<ChatSession, AppError> {
        let mut t = self.tables.write().await;
        if name != DEFAULT_SESSION && t.name_taken(user_id, name, None) {
            return Err(AppError::DuplicateSession { name: name.to_string() });
        }
        let session = ChatSession {
            id: t.next_id(),
            user_id,
            session_name: name.to_string(),
            created_at: Utc::now(),
        };
        t.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn rename_session(&self, session_id: i64, name: &str) -> Result<ChatSession, AppError> {
        let mut t = self.tables.write().await;
        let user_id = t
            .sessions
            .get(&session_id)
            .map(|s| s.user_id)
            .ok_or_else(|| AppError::not_found("Session", session_id))?;
        if name != DEFAULT_SESSION && t.name_taken(user_id, name, Some(session_id)) {
            return Err(AppError::DuplicateSession { name: name.to_string() });
        }
        let session = t
            .sessions
            .get_mut(&session_id)
            .ok_or_else(|| AppError::not_found("Session", session_id))?;
        session.session_name = name.to_string();
        Ok(session.clone())
    }

    async fn delete_session(&self, session_id: i64) -> Result<(), AppError> {
        let mut t = self.tables.write().await;
        t.sessions.remove(&session_id);
        t.messages.retain(|_, m| m.session_id != session_id);
        Ok(())
    }

    async fn list_messages(&self, session_id: i64) -> Result<Vec<ChatMessage>, AppError> {
        let t = self.tables.read().await;
        let mut messages: Vec<ChatMessage> =
            t.messages.values().filter(|m| m.session_id == session_id).cloned().collect();
        messages.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then(a.id.cmp(&b.id)));
        Ok(messages)
    }

    async fn add_message(
        &self,
        session_id: i64,
        question: &str,
        answer: &str,
    ) -> Result<ChatMessage, AppError> {
        let mut t = self.tables.write().await;
        if !t.sessions.contains_key(&session_id) {
            return Err(AppError::not_found("Session", session_id));
        }
        let message = ChatMessage {
            id: t.next_id(),
            session_id,
            question: question.to_string(),
            answer: answer.to_string(),
            timestamp: Utc::now(),
        };
        t.messages.insert(message.id, message.clone());
        Ok(message)
    }

    async fn find_message(
        &self,
        session_id: i64,
        message_id: i64,
    ) -> Result<Option<ChatMessage>, AppError> {
        let t = self.tables.read().await;
        Ok(t.messages.get(&message_id).filter(|m| m.session_id == session_id).cloned())
    }

    async fn delete_message(&self, message_id: i64) -> Result<(), AppError> {
        self.tables.write().await.messages.remove(&message_id);
        Ok(())
    }

    async fn search_messages(&self, user_id: i64, query: &str) -> Result<Vec<SearchHit>, AppError> {
        let needle = query.to_lowercase();
        let t = self.tables.read().await;
        let mut hits: Vec<SearchHit> = t
            .messages
            .values()
            .filter_map(|m| {
                let session = t.sessions.get(&m.session_id).filter(|s| s.user_id == user_id)?;
                let matched = m.question.to_lowercase().contains(&needle)
                    || m.answer.to_lowercase().contains(&needle);
                matched.then(|| SearchHit {
                    message_id: m.id,
                    session_id: m.session_id,
                    session_name: session.session_name.clone(),
                    question: m.question.clone(),
                    answer: m.answer.clone(),
                    timestamp: m.timestamp,
                })
            })
            .collect();
        hits.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.message_id.cmp(&a.message_id)));
        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ensure_user_is_idempotent() {
        let repo = MemoryHistoryRepository::new();
        let a = repo.ensure_user("demo").await.unwrap();
        let b = repo.ensure_user("demo").await.unwrap();
        let c = repo.ensure_user("other").await.unwrap();
        assert_eq!(a.id, b.id);
        assert_ne!(a.id, c.id);
    }

    #[tokio::test]
    async fn names_are_unique_except_default() {
        let repo = MemoryHistoryRepository::new();
        let user = repo.ensure_user("demo").await.unwrap();
        repo.create_session(user.id, "Plans").await.unwrap();
        assert!(matches!(
            repo.create_session(user.id, "Plans").await,
            Err(AppError::DuplicateSession { .. })
        ));
        repo.create_session(user.id, DEFAULT_SESSION).await.unwrap();
        repo.create_session(user.id, DEFAULT_SESSION).await.unwrap();

        let other = repo.ensure_user("other").await.unwrap();
        repo.create_session(other.id, "Plans").await.unwrap();
    }

    #[tokio::test]
    async fn rename_checks_other_sessions_only() {
        let repo = MemoryHistoryRepository::new();
        let user = repo.ensure_user("demo").await.unwrap();
        let a = repo.create_session(user.id, "A").await.unwrap();
        repo.create_session(user.id, "B").await.unwrap();

        assert_eq!(repo.rename_session(a.id, "A").await.unwrap().session_name, "A");
        assert!(repo.rename_session(a.id, "B").await.is_err());
        assert_eq!(repo.rename_session(a.id, "C").await.unwrap().session_name, "C");
        assert!(repo.rename_session(999, "Z").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn sessions_are_scoped_to_their_owner() {
        let repo = MemoryHistoryRepository::new();
        let owner = repo.ensure_user("owner").await.unwrap();
        let intruder = repo.ensure_user("intruder").await.unwrap();
        let session = repo.create_session(owner.id, "Private").await.unwrap();

        assert!(repo.find_session(owner.id, session.id).await.unwrap().is_some());
        assert!(repo.find_session(intruder.id, session.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_session_cascades_to_messages() {
        let repo = MemoryHistoryRepository::new();
        let user = repo.ensure_user("demo").await.unwrap();
        let s = repo.create_session(user.id, "S").await.unwrap();
        let m = repo.add_message(s.id, "q", "a").await.unwrap();

        repo.delete_session(s.id).await.unwrap();
        assert!(repo.find_message(s.id, m.id).await.unwrap().is_none());
        assert!(repo.list_messages(s.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn messages_list_oldest_first_and_search_newest_first() {
        let repo = MemoryHistoryRepository::new();
        let user = repo.ensure_user("demo").await.unwrap();
        let s = repo.create_session(user.id, "S").await.unwrap();
        let first = repo.add_message(s.id, "Revenue in Q1?", "12k").await.unwrap();
        let second = repo.add_message(s.id, "And Q2?", "15k REVENUE").await.unwrap();
        repo.add_message(s.id, "Unrelated", "nothing").await.unwrap();

        let listed = repo.list_messages(s.id).await.unwrap();
        assert_eq!(listed.first().unwrap().id, first.id);

        let hits = repo.search_messages(user.id, "revenue").await.unwrap();
        let ids: Vec<i64> = hits.iter().map(|h| h.message_id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
        assert_eq!(hits[0].session_name, "S");

        let stranger = repo.ensure_user("stranger").await.unwrap();
        assert!(repo.search_messages(stranger.id, "revenue").await.unwrap().is_empty());
    }
}
