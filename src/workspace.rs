//! Per-user volatile state: named sessions of question/answer turns and the
//! knowledge base text built from the last upload. Dropped at logout.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::errors::AppError;
use crate::models::{SessionTurn, DEFAULT_SESSION};

#[derive(Debug, Default)]
struct UserWorkspace {
    sessions: BTreeMap<String, Vec<SessionTurn>>,
    knowledge_base: String,
}

#[derive(Clone, Default)]
pub struct Workspace {
    users: Arc<RwLock<HashMap<String, UserWorkspace>>>,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes sure the user has at least the `Default` session.
    pub async fn init_user(&self, username: &str) {
        let mut users = self.users.write().await;
        users
            .entry(username.to_string())
            .or_default()
            .sessions
            .entry(DEFAULT_SESSION.to_string())
            .or_default();
    }

    pub async fn drop_user(&self, username: &str) {
        self.users.write().await.remove(username);
    }

    pub async fn session_names(&self, username: &str) -> Vec<String> {
        self.users
            .read()
            .await
            .get(username)
            .map(|ws| ws.sessions.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub async fn create_session(&self, username: &str, name: &str) -> Result<(), AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::validation("Session name is required"));
        }
        let mut users = self.users.write().await;
        let ws = users.entry(username.to_string()).or_default();
        if ws.sessions.contains_key(name) {
            return Err(AppError::validation("Session already exists"));
        }
        ws.sessions.insert(name.to_string(), Vec::new());
        Ok(())
    }

    pub async fn ensure_session(&self, username: &str, name: &str) {
        let mut users = self.users.write().await;
        users
            .entry(username.to_string())
            .or_default()
            .sessions
            .entry(name.to_string())
            .or_default();
    }

    pub async fn delete_session(&self, username: &str, name: &str) -> Result<(), AppError> {
        let mut users = self.users.write().await;
        users
            .get_mut(username)
            .and_then(|ws| ws.sessions.remove(name))
            .map(|_| ())
            .ok_or_else(|| AppError::not_found("Session", name))
    }

    pub async fn clear_session(&self, username: &str, name: &str) -> Result<(), AppError> {
        let mut users = self.users.write().await;
        let turns = users
            .get_mut(username)
            .and_then(|ws| ws.sessions.get_mut(name))
            .ok_or_else(|| AppError::not_found("Session", name))?;
        turns.clear();
        Ok(())
    }

    pub async fn turns(&self, username: &str, name: &str) -> Result<Vec<SessionTurn>, AppError> {
        self.users
            .read()
            .await
            .get(username)
            .and_then(|ws| ws.sessions.get(name))
            .cloned()
            .ok_or_else(|| AppError::not_found("Session", name))
    }

    pub async fn push_turn(&self, username: &str, name: &str, turn: SessionTurn) {
        let mut users = self.users.write().await;
        users
            .entry(username.to_string())
            .or_default()
            .sessions
            .entry(name.to_string())
            .or_default()
            .push(turn);
    }

    pub async fn knowledge_base(&self, username: &str) -> String {
        self.users
            .read()
            .await
            .get(username)
            .map(|ws| ws.knowledge_base.clone())
            .unwrap_or_default()
    }

    pub async fn set_knowledge_base(&self, username: &str, content: String) {
        let mut users = self.users.write().await;
        users.entry(username.to_string()).or_default().knowledge_base = content;
    }
}
