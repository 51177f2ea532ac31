use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde_json::json;
use tracing::warn;

use crate::routes::AppState;

/// GET `/api/health`: public liveness probe that also reports the history store.
pub async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    let database = match state.history.backend() {
        "in-memory" => "in-memory".to_string(),
        _ => match state.history.ping().await {
            Ok(()) => "connected".to_string(),
            Err(e) => {
                warn!("Health check could not reach the database: {e}");
                format!("error: {e}")
            }
        },
    };

    Json(json!({
        "status": "healthy",
        "message": "Knowledge desk API is running",
        "database": database,
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::StatusCode;

    use crate::agent::scripted::ScriptedModel;
    use crate::routes::test_support::*;

    #[tokio::test]
    async fn health_is_public() {
        let app = app(state_with(Arc::new(ScriptedModel::new())));
        let (status, json) = send(&app, json_request("GET", "/api/health", None, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["database"], "in-memory");
        assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    }
}
