//! Error types for the gateway layer

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Gateway error types
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Authorization failed: {0}")]
    AuthorizationFailed(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("Service unavailable")]
    ServiceUnavailable,
}

impl GatewayError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::AuthenticationFailed(_) => StatusCode::UNAUTHORIZED,
            GatewayError::AuthorizationFailed(_) => StatusCode::FORBIDDEN,
            GatewayError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::NotFound(_) => StatusCode::NOT_FOUND,
            GatewayError::Conflict(_) => StatusCode::CONFLICT,
            GatewayError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            GatewayError::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_response = json!({
            "error": status.as_str(),
            "message": self.to_string(),
        });

        (status, Json(error_response)).into_response()
    }
}

/// Result type for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

impl From<jordnaer_chats::ChatError> for GatewayError {
    fn from(error: jordnaer_chats::ChatError) -> Self {
        use jordnaer_chats::ChatError;

        match error {
            ChatError::DuplicateChat { id } => {
                GatewayError::Conflict(format!("Chat {id} already exists"))
            }
            ChatError::ChatNotFound { id } => GatewayError::NotFound(format!("Chat {id}")),
            ChatError::NotAParticipant { chat_id, .. } => GatewayError::AuthorizationFailed(
                format!("Caller is not a participant of chat {chat_id}"),
            ),
            ChatError::Validation { message } => GatewayError::InvalidRequest(message),
            ChatError::QueueClosed { .. } => GatewayError::ServiceUnavailable,
            ChatError::Database(error) => GatewayError::InternalError(error.to_string()),
        }
    }
}

impl From<jordnaer_database::DatabaseError> for GatewayError {
    fn from(error: jordnaer_database::DatabaseError) -> Self {
        GatewayError::InternalError(error.to_string())
    }
}
