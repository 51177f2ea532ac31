use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use tracing::info;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::models::LoginRequest;
use crate::routes::AppState;

/// POST `/api/login`
pub async fn login_handler(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload?;
    let username = req.username.trim();
    if username.is_empty() || req.password.is_empty() {
        return Err(AppError::validation("Username and password are required"));
    }

    state.auth.check_credentials(username, &req.password)?;
    let token = state.auth.issue_token(username, req.remember_me)?;
    state.workspace.init_user(username).await;
    info!(user = %username, remember_me = req.remember_me, "User logged in");

    Ok(Json(json!({
        "success": true,
        "token": token,
        "username": username,
        "message": "Login successful",
    })))
}

/// POST `/api/logout`
pub async fn logout_handler(State(state): State<AppState>, user: AuthUser) -> impl IntoResponse {
    state.workspace.drop_user(&user.username).await;
    info!(user = %user.username, "User logged out");
    Json(json!({ "success": true, "message": "Logged out successfully" }))
}
