use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::models::{MessageView, NewMessageRequest, SearchQuery, SessionNameRequest, SessionSummary};
use crate::routes::AppState;

/// GET `/api/chat-history`: the caller's sessions, newest first.
pub async fn list_history_handler(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<impl IntoResponse, AppError> {
    let sessions = state.history.list(&user.username).await?;
    Ok(Json(json!({
        "success": true,
        "total_sessions": sessions.len(),
        "chat_history": sessions,
    })))
}

/// GET `/api/chat-history/{session_id}`
pub async fn get_history_handler(
    State(state): State<AppState>,
    user: AuthUser,
    Path(session_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let session = state.history.get(&user.username, session_id).await?;
    Ok(Json(json!({ "success": true, "session": session })))
}

/// POST `/api/chat-history`: body is optional.
pub async fn create_history_handler(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Option<Json<SessionNameRequest>>,
) -> Result<impl IntoResponse, AppError> {
    let req = payload.map(|Json(req)| req).unwrap_or_default();
    let session = state
        .history
        .create(&user.username, req.session_name.as_deref())
        .await?;
    Ok(Json(json!({
        "success": true,
        "message": "Session created",
        "session": SessionSummary::from(&session),
    })))
}

/// PUT `/api/chat-history/{session_id}`
pub async fn rename_history_handler(
    State(state): State<AppState>,
    user: AuthUser,
    Path(session_id): Path<i64>,
    payload: Result<Json<SessionNameRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload?;
    let session = state
        .history
        .rename(&user.username, session_id, req.session_name.as_deref())
        .await?;
    Ok(Json(json!({
        "success": true,
        "message": "Session renamed",
        "session": SessionSummary::from(&session),
    })))
}

/// DELETE `/api/chat-history/{session_id}`
pub async fn delete_history_handler(
    State(state): State<AppState>,
    user: AuthUser,
    Path(session_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    state.history.delete(&user.username, session_id).await?;
    Ok(Json(json!({ "success": true, "message": "Session deleted" })))
}

/// POST `/api/chat-history/{session_id}/messages`
pub async fn add_message_handler(
    State(state): State<AppState>,
    user: AuthUser,
    Path(session_id): Path<i64>,
    payload: Result<Json<NewMessageRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload?;
    let message = state
        .history
        .add_message(&user.username, session_id, &req.question, &req.answer)
        .await?;
    Ok(Json(json!({
        "success": true,
        "message": "Message added",
        "chat_message": MessageView::from(message),
    })))
}

/// DELETE `/api/chat-history/{session_id}/messages/{message_id}`
pub async fn delete_message_handler(
    State(state): State<AppState>,
    user: AuthUser,
    Path((session_id, message_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, AppError> {
    state
        .history
        .delete_message(&user.username, session_id, message_id)
        .await?;
    Ok(Json(json!({ "success": true, "message": "Message deleted" })))
}

/// GET `/api/chat-history/search?q=`
pub async fn search_history_handler(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<SearchQuery>,
) -> Result<impl IntoResponse, AppError> {
    let results = state.history.search(&user.username, &query.q).await?;
    Ok(Json(json!({
        "success": true,
        "total_results": results.len(),
        "search_results": results,
        "query": query.q.trim(),
    })))
}

/// GET `/api/chat-history/export/{session_id}`
pub async fn export_history_handler(
    State(state): State<AppState>,
    user: AuthUser,
    Path(session_id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let export = state.history.export(&user.username, session_id).await?;
    Ok(Json(json!({ "success": true, "export_data": export })))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::StatusCode;
    use serde_json::{json, Value};

    use crate::agent::scripted::ScriptedModel;
    use crate::routes::test_support::*;

    async fn create(app: &axum::Router, token: &str, name: Option<&str>) -> (StatusCode, Value) {
        let body = match name {
            Some(name) => json!({ "session_name": name }),
            None => json!({}),
        };
        send(app, json_request("POST", "/api/chat-history", Some(token), Some(body))).await
    }

    #[tokio::test]
    async fn history_requires_auth() {
        let app = app(state_with(Arc::new(ScriptedModel::new())));
        let (status, _) = send(&app, json_request("GET", "/api/chat-history", None, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn create_rename_and_delete() {
        let state = state_with(Arc::new(ScriptedModel::new()));
        let app = app(state.clone());
        let token = token(&state);

        let (status, json) = create(&app, &token, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["session"]["session_name"], "New Session");
        let id = json["session"]["id"].as_i64().unwrap();

        let (status, json) = create(&app, &token, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["message"], "Session name already exists");

        let (status, _) = create(&app, &token, Some("Default")).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = create(&app, &token, Some("Default")).await;
        assert_eq!(status, StatusCode::OK);

        let uri = format!("/api/chat-history/{id}");
        let (status, json) =
            send(&app, json_request("PUT", &uri, Some(&token), Some(json!({ "session_name": "Q3 plan" })))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["session"]["session_name"], "Q3 plan");

        let (status, _) =
            send(&app, json_request("PUT", &uri, Some(&token), Some(json!({ "session_name": "" })))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, json) = send(&app, json_request("GET", "/api/chat-history", Some(&token), None)).await;
        assert_eq!(json["total_sessions"], 3);

        let (status, _) = send(&app, json_request("DELETE", &uri, Some(&token), None)).await;
        assert_eq!(status, StatusCode::OK);
        let (status, json) = send(&app, json_request("GET", &uri, Some(&token), None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["message"], "Session not found");
    }

    #[tokio::test]
    async fn messages_search_and_export() {
        let state = state_with(Arc::new(ScriptedModel::new()));
        let app = app(state.clone());
        let token = token(&state);

        let (_, json) = create(&app, &token, Some("Campaign")).await;
        let id = json["session"]["id"].as_i64().unwrap();
        let messages_uri = format!("/api/chat-history/{id}/messages");

        let body = json!({ "question": "What is the TikTok budget?", "answer": "15000" });
        let (status, json) = send(&app, json_request("POST", &messages_uri, Some(&token), Some(body))).await;
        assert_eq!(status, StatusCode::OK);
        let message_id = json["chat_message"]["id"].as_i64().unwrap();

        let (status, _) = send(
            &app,
            json_request("POST", &messages_uri, Some(&token), Some(json!({ "question": "q" }))),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, json) =
            send(&app, json_request("GET", "/api/chat-history/search?q=tiktok", Some(&token), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["total_results"], 1);
        assert_eq!(json["search_results"][0]["session_name"], "Campaign");
        assert_eq!(json["query"], "tiktok");

        let (status, json) =
            send(&app, json_request("GET", "/api/chat-history/search?q=", Some(&token), None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["message"], "Search query is required");

        let export_uri = format!("/api/chat-history/export/{id}");
        let (status, json) = send(&app, json_request("GET", &export_uri, Some(&token), None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["export_data"]["session_info"]["total_messages"], 1);
        assert_eq!(json["export_data"]["messages"][0]["answer"], "15000");

        let missing = format!("{messages_uri}/{}", message_id + 1000);
        let (status, json) = send(&app, json_request("DELETE", &missing, Some(&token), None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["message"], "Message not found");

        let uri = format!("{messages_uri}/{message_id}");
        let (status, _) = send(&app, json_request("DELETE", &uri, Some(&token), None)).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn other_users_sessions_are_not_found() {
        let state = state_with(Arc::new(ScriptedModel::new()));
        let app = app(state.clone());
        let token = token(&state);
        let intruder = state.auth.issue_token("intruder", false).unwrap();

        let (_, json) = create(&app, &token, Some("Private")).await;
        let id = json["session"]["id"].as_i64().unwrap();

        let uri = format!("/api/chat-history/{id}");
        let (status, _) = send(&app, json_request("GET", &uri, Some(&intruder), None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&app, json_request("DELETE", &uri, Some(&intruder), None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
