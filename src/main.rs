mod agent;
mod auth;
mod config;
mod db;
mod documents;
mod errors;
mod markdown;
mod models;
mod routes;
mod service;
mod workspace;

use tracing::info;

use crate::auth::AuthService;
use crate::config::AppConfig;
use crate::routes::{app_router, AppState};
use crate::service::chat_service::ChatService;
use crate::service::document_service::DocumentService;
use crate::service::history_service::HistoryService;
use crate::workspace::Workspace;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present (development convenience)
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;

    // Initialise tracing: RUST_LOG, then LOG_LEVEL, then the crate default
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(&config.log_level))
        .unwrap_or_else(|_| "knowledge_desk=debug,tower_http=debug".into());
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // ── History store ─────────────────────────────────────────────────────────
    let history_repo = db::connect_history(config.database_url.as_deref()).await?;

    // ── Dependency wiring ─────────────────────────────────────────────────────
    let model = agent::build_model(&config)?;
    info!(provider = model.provider(), "Chat model configured");

    let workspace = Workspace::new();
    let history = HistoryService::new(history_repo);
    let state = AppState {
        auth: AuthService::new(&config.jwt_secret, config.users.clone()),
        chat: ChatService::new(model.clone(), workspace.clone(), history.clone(), config.plot_generation),
        documents: DocumentService::new(model, workspace.clone()),
        history,
        workspace,
    };

    // ── Router ────────────────────────────────────────────────────────────────
    let app = app_router(state, &config.allowed_origins, config.max_upload_bytes);

    // ── Listen ────────────────────────────────────────────────────────────────
    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{addr}/api");

    axum::serve(listener, app).await?;
    Ok(())
}
