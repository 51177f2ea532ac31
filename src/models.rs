use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_SESSION: &str = "Default";
pub const NEW_SESSION: &str = "New Session";

// ── Chat history (durable) ───────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct HistoryUser {
    pub id: i64,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ChatSession {
    pub id: i64,
    pub user_id: i64,
    pub session_name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ChatMessage {
    pub id: i64,
    pub session_id: i64,
    pub question: String,
    pub answer: String,
    pub timestamp: DateTime<Utc>,
}

/// A message hit from a history search, joined with its session name.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct SearchHit {
    pub message_id: i64,
    pub session_id: i64,
    pub session_name: String,
    pub question: String,
    pub answer: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageView {
    pub id: i64,
    pub question: String,
    pub answer: String,
    pub timestamp: DateTime<Utc>,
}

impl From<ChatMessage> for MessageView {
    fn from(m: ChatMessage) -> Self {
        Self { id: m.id, question: m.question, answer: m.answer, timestamp: m.timestamp }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub id: i64,
    pub session_name: String,
    pub created_at: DateTime<Utc>,
}

impl From<&ChatSession> for SessionSummary {
    fn from(s: &ChatSession) -> Self {
        Self { id: s.id, session_name: s.session_name.clone(), created_at: s.created_at }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub session_id: i64,
    pub session_name: String,
    pub created_at: DateTime<Utc>,
    pub message_count: usize,
    pub messages: Vec<MessageView>,
}

impl SessionView {
    pub fn new(session: ChatSession, messages: Vec<ChatMessage>) -> Self {
        Self {
            session_id: session.id,
            session_name: session.session_name,
            created_at: session.created_at,
            message_count: messages.len(),
            messages: messages.into_iter().map(MessageView::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportInfo {
    pub session_id: i64,
    pub session_name: String,
    pub created_at: DateTime<Utc>,
    pub exported_at: DateTime<Utc>,
    pub total_messages: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionExport {
    pub session_info: ExportInfo,
    pub messages: Vec<MessageView>,
}

// ── Workspace sessions (volatile) ────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionTurn {
    pub q: String,
    pub a: String,
    pub timestamp: String,
}

/// A question/answer pair replayed to the model as context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub q: String,
    pub a: String,
}

impl From<&SessionTurn> for ConversationTurn {
    fn from(t: &SessionTurn) -> Self {
        Self { q: t.q.clone(), a: t.a.clone() }
    }
}

// ── Answer artefacts ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkdownTable {
    pub headers: Vec<String>,
    pub data: Vec<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Citation {
    pub title: String,
    pub url: String,
}

impl std::fmt::Display for Citation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} - {}", self.title, self.url)
    }
}

// ── Requests ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub remember_me: bool,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub knowledge_base: Option<String>,
    #[serde(default)]
    pub conversation_history: Option<Vec<ConversationTurn>>,
    #[serde(default)]
    pub session_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SessionNameRequest {
    #[serde(default)]
    pub session_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NewMessageRequest {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub answer: String,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

// ── Responses ────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub success: bool,
    pub response: String,
    pub timestamp: String,
    pub tables: Vec<MarkdownTable>,
    pub plot: Option<String>,
    pub plot_code: Option<String>,
    pub sources: String,
}

/// Renders citations the way the chat client displays them: one `title - url` per line.
pub fn render_sources(citations: &[Citation]) -> String {
    citations.iter().map(Citation::to_string).collect::<Vec<_>>().join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sources_render_one_per_line() {
        let cites = vec![
            Citation { title: "A".into(), url: "https://a".into() },
            Citation { title: "B".into(), url: "https://b".into() },
        ];
        assert_eq!(render_sources(&cites), "A - https://a\nB - https://b");
        assert_eq!(render_sources(&[]), "");
    }

    #[test]
    fn session_view_counts_messages() {
        let now = Utc::now();
        let session = ChatSession { id: 1, user_id: 1, session_name: "s".into(), created_at: now };
        let msg = ChatMessage {
            id: 7,
            session_id: 1,
            question: "q".into(),
            answer: "a".into(),
            timestamp: now,
        };
        let view = SessionView::new(session, vec![msg]);
        assert_eq!(view.message_count, 1);
        assert_eq!(view.messages[0].id, 7);
    }

    #[test]
    fn chat_request_fields_are_optional() {
        let req: ChatRequest = serde_json::from_str(r#"{"question":"hi"}"#).unwrap();
        assert_eq!(req.question, "hi");
        assert!(req.session_name.is_none());
        assert!(req.conversation_history.is_none());
    }
}
