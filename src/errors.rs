use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;
use tracing::error;

/// Top-level application error.
/// Every variant renders as a human-readable message for the client and the logs.
#[derive(Debug, Error)]
pub enum AppError {
    // ── Database errors ──────────────────────────────────────────────────────
    #[error("Database connection failed: {0}")]
    DatabaseConnectionFailed(#[source] sqlx::Error),

    #[error("Database query failed: {message}")]
    DatabaseQueryFailed {
        message: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("{entity_type} not found")]
    RecordNotFound { entity_type: String, id: String },

    // ── Auth errors ──────────────────────────────────────────────────────────
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("{0}")]
    Unauthorized(String),

    // ── AI model errors ──────────────────────────────────────────────────────
    #[error("AI model '{provider}' is unavailable: {reason}")]
    ModelUnavailable { provider: String, reason: String },

    #[error("Inference error: {message}")]
    InferenceError { message: String },

    // ── Validation errors ────────────────────────────────────────────────────
    #[error("{message}")]
    Validation { message: String },

    #[error("Field '{field_name}' exceeds max length of {max_length} (actual: {actual_length})")]
    FieldTooLong { field_name: String, max_length: usize, actual_length: usize },

    #[error("Session name already exists")]
    DuplicateSession { name: String },

    // ── Document errors ──────────────────────────────────────────────────────
    #[error("Failed to read '{filename}': {message}")]
    DocumentParse { filename: String, message: String },

    #[error("Upload rejected: {0}")]
    Upload(String),

    #[error("Upload exceeds the size limit")]
    PayloadTooLarge,

    // ── System errors ────────────────────────────────────────────────────────
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn db_query(message: impl Into<String>, source: sqlx::Error) -> Self {
        AppError::DatabaseQueryFailed { message: message.into(), source }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        AppError::Validation { message: message.into() }
    }

    pub fn not_found(entity_type: impl Into<String>, id: impl ToString) -> Self {
        AppError::RecordNotFound { entity_type: entity_type.into(), id: id.to_string() }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::RecordNotFound { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            AppError::Validation { .. }
                | AppError::FieldTooLong { .. }
                | AppError::DuplicateSession { .. }
                | AppError::Upload(_)
        )
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, AppError::InvalidCredentials | AppError::Unauthorized(_))
    }

    pub fn is_model_unavailable(&self) -> bool {
        matches!(self, AppError::ModelUnavailable { .. })
    }

    pub fn status(&self) -> StatusCode {
        if self.is_validation() {
            StatusCode::BAD_REQUEST
        } else if self.is_unauthorized() {
            StatusCode::UNAUTHORIZED
        } else if self.is_not_found() {
            StatusCode::NOT_FOUND
        } else if matches!(self, AppError::PayloadTooLarge) {
            StatusCode::PAYLOAD_TOO_LARGE
        } else if self.is_model_unavailable() {
            StatusCode::SERVICE_UNAVAILABLE
        } else if matches!(self, AppError::InferenceError { .. }) {
            StatusCode::BAD_GATEWAY
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::validation(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            error!("Request failed: {self}");
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = serde_json::json!({ "success": false, "message": message });
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_error_kind() {
        assert_eq!(AppError::validation("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            AppError::DuplicateSession { name: "a".into() }.status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::InvalidCredentials.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::not_found("Session", 4).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::ModelUnavailable { provider: "p".into(), reason: "r".into() }.status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            AppError::InferenceError { message: "boom".into() }.status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(AppError::PayloadTooLarge.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(
            AppError::Unexpected("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn not_found_message_names_the_entity() {
        assert_eq!(AppError::not_found("Message", 9).to_string(), "Message not found");
    }
}
