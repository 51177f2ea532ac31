use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;
use tracing::info;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::models::ChatRequest;
use crate::routes::AppState;
use crate::service::document_service::UploadedFile;

const FILES_FIELD: &str = "files";

fn multipart_error(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge
    } else {
        AppError::Upload(err.body_text())
    }
}

/// POST `/api/chat`
pub async fn chat_handler(
    State(state): State<AppState>,
    user: AuthUser,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(request) = payload?;
    let response = state.chat.chat(&user.username, request).await?;
    Ok(Json(response))
}

/// POST `/api/upload`: multipart, one or more `files` parts.
pub async fn upload_handler(
    State(state): State<AppState>,
    user: AuthUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, AppError> {
    let mut multipart = multipart.map_err(|_| AppError::validation("No files provided"))?;

    let mut received = 0usize;
    let mut files = Vec::new();
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(FILES_FIELD) {
            continue;
        }
        received += 1;

        let filename = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map_err(multipart_error)?;
        if filename.is_empty() {
            continue;
        }
        files.push(UploadedFile { filename, content_type, bytes: bytes.to_vec() });
    }

    if received == 0 {
        return Err(AppError::validation("No files provided"));
    }
    if files.is_empty() {
        return Err(AppError::validation("No files selected"));
    }

    info!(user = %user.username, files = files.len(), "Processing upload");
    let knowledge_base = state.documents.ingest(&user.username, files).await?;

    Ok(Json(json!({
        "success": true,
        "message": format!("Successfully processed {received} file(s)"),
        "knowledge_base": knowledge_base,
    })))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::json;

    use crate::agent::scripted::ScriptedModel;
    use crate::routes::test_support::*;

    const BOUNDARY: &str = "XKNOWLEDGEDESKBOUNDARY";

    fn multipart_request(token: &str, parts: &[(&str, &str, &str)]) -> Request<Body> {
        let mut body = String::new();
        for (field, filename, content) in parts {
            body.push_str(&format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: text/csv\r\n\r\n{content}\r\n"
            ));
        }
        body.push_str(&format!("--{BOUNDARY}--\r\n"));

        Request::builder()
            .method("POST")
            .uri("/api/upload")
            .header("authorization", format!("Bearer {token}"))
            .header("content-type", format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn chat_requires_auth() {
        let app = app(state_with(Arc::new(ScriptedModel::new())));
        let (status, json) =
            send(&app, json_request("POST", "/api/chat", None, Some(json!({ "question": "hi" })))).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["success"], false);
    }

    #[tokio::test]
    async fn chat_returns_answer_and_tables() {
        let model = Arc::new(ScriptedModel::new().reply("| Medium | Cost |\n|---|---|\n| TV | 10 |"));
        let state = state_with(model);
        let app = app(state.clone());
        let token = token(&state);

        let (status, json) = send(
            &app,
            json_request("POST", "/api/chat", Some(&token), Some(json!({ "question": "budget?" }))),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["success"], true);
        assert_eq!(json["tables"][0]["headers"], json!(["Medium", "Cost"]));
        assert_eq!(json["tables"][0]["data"], json!([["TV", "10"]]));
        assert!(json["plot"].is_null());
        assert_eq!(json["sources"], "");
    }

    #[tokio::test]
    async fn blank_question_is_400() {
        let state = state_with(Arc::new(ScriptedModel::new()));
        let app = app(state.clone());
        let token = token(&state);

        let (status, json) =
            send(&app, json_request("POST", "/api/chat", Some(&token), Some(json!({ "question": " " })))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["message"], "Question is required");
    }

    #[tokio::test]
    async fn upload_builds_the_knowledge_base() {
        let state = state_with(Arc::new(ScriptedModel::new().reply("structured")));
        let app = app(state.clone());
        let token = token(&state);

        let request = multipart_request(&token, &[("files", "plan.csv", "a,b\n1,2")]);
        let (status, json) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["message"], "Successfully processed 1 file(s)");
        assert_eq!(json["knowledge_base"], "\n\n--- Extracted from plan.csv ---\n\nstructured");
        assert_eq!(state.workspace.knowledge_base("demo").await, "\n\n--- Extracted from plan.csv ---\n\nstructured");
    }

    #[tokio::test]
    async fn upload_without_files_is_400() {
        let state = state_with(Arc::new(ScriptedModel::new()));
        let app = app(state.clone());
        let token = token(&state);

        let (status, json) = send(&app, multipart_request(&token, &[("other", "x.csv", "a")])).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["message"], "No files provided");

        let (status, json) = send(&app, multipart_request(&token, &[("files", "", "a")])).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["message"], "No files selected");

        let (status, json) = send(&app, json_request("POST", "/api/upload", Some(&token), None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["message"], "No files provided");
    }

    #[tokio::test]
    async fn oversized_upload_is_413() {
        let state = state_with(Arc::new(ScriptedModel::new()));
        let app = app(state.clone());
        let token = token(&state);

        let big = "x".repeat(UPLOAD_LIMIT + 1);
        let (status, _) = send(&app, multipart_request(&token, &[("files", "big.csv", &big)])).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    }
}
