pub mod auth_routes;
pub mod chat_routes;
pub mod health_routes;
pub mod history_routes;
pub mod session_routes;

use axum::extract::{DefaultBodyLimit, FromRef};
use axum::http::{header, HeaderValue, Method};
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::auth::AuthService;
use crate::service::chat_service::ChatService;
use crate::service::document_service::DocumentService;
use crate::service::history_service::HistoryService;
use crate::workspace::Workspace;

/// Shared handler state; every field is a cheap `Arc`-backed clone.
#[derive(Clone)]
pub struct AppState {
    pub auth: AuthService,
    pub chat: ChatService,
    pub documents: DocumentService,
    pub history: HistoryService,
    pub workspace: Workspace,
}

impl FromRef<AppState> for AuthService {
    fn from_ref(state: &AppState) -> Self {
        state.auth.clone()
    }
}

/// `*` anywhere in the list allows every origin.
fn allowed_origins(origins: &[String]) -> AllowOrigin {
    if origins.iter().any(|origin| origin == "*") {
        return AllowOrigin::any();
    }

    let values: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin '{origin}'");
                None
            }
        })
        .collect();
    AllowOrigin::list(values)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(allowed_origins(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

/// Builds the `/api` router.
pub fn app_router(state: AppState, allowed_origins: &[String], max_upload_bytes: usize) -> Router {
    let api = Router::new()
        .route("/login", post(auth_routes::login_handler))
        .route("/logout", post(auth_routes::logout_handler))
        .route(
            "/upload",
            post(chat_routes::upload_handler).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/chat", post(chat_routes::chat_handler))
        .route(
            "/sessions",
            get(session_routes::list_sessions_handler).post(session_routes::create_session_handler),
        )
        .route("/sessions/{name}", delete(session_routes::delete_session_handler))
        .route("/sessions/{name}/clear", post(session_routes::clear_session_handler))
        .route("/sessions/{name}/messages", get(session_routes::session_messages_handler))
        .route(
            "/chat-history",
            get(history_routes::list_history_handler).post(history_routes::create_history_handler),
        )
        .route("/chat-history/search", get(history_routes::search_history_handler))
        .route("/chat-history/export/{session_id}", get(history_routes::export_history_handler))
        .route(
            "/chat-history/{session_id}",
            get(history_routes::get_history_handler)
                .put(history_routes::rename_history_handler)
                .delete(history_routes::delete_history_handler),
        )
        .route("/chat-history/{session_id}/messages", post(history_routes::add_message_handler))
        .route(
            "/chat-history/{session_id}/messages/{message_id}",
            delete(history_routes::delete_message_handler),
        )
        .route("/health", get(health_routes::health_handler));

    Router::new()
        .nest("/api", api)
        .layer(cors_layer(allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
