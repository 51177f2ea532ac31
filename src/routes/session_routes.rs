use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::models::SessionNameRequest;
use crate::routes::AppState;

/// GET `/api/sessions`
pub async fn list_sessions_handler(State(state): State<AppState>, user: AuthUser) -> impl IntoResponse {
    let sessions = state.workspace.session_names(&user.username).await;
    Json(json!({ "success": true, "sessions": sessions }))
}

/// POST `/api/sessions`
pub async fn create_session_handler(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Result<Json<SessionNameRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload?;
    let name = req.session_name.unwrap_or_default();
    state.workspace.create_session(&user.username, &name).await?;
    Ok(Json(json!({
        "success": true,
        "message": format!("Session '{}' created", name.trim()),
    })))
}

/// DELETE `/api/sessions/{name}`
pub async fn delete_session_handler(
    State(state): State<AppState>,
    user: AuthUser,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.workspace.delete_session(&user.username, &name).await?;
    Ok(Json(json!({ "success": true, "message": format!("Session '{name}' deleted") })))
}

/// POST `/api/sessions/{name}/clear`
pub async fn clear_session_handler(
    State(state): State<AppState>,
    user: AuthUser,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.workspace.clear_session(&user.username, &name).await?;
    Ok(Json(json!({ "success": true, "message": format!("Session '{name}' cleared") })))
}

/// GET `/api/sessions/{name}/messages`
pub async fn session_messages_handler(
    State(state): State<AppState>,
    user: AuthUser,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let messages = state.workspace.turns(&user.username, &name).await?;
    Ok(Json(json!({ "success": true, "messages": messages })))
}
