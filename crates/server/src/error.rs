use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::coach::ChatError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Conflict(String),

    #[error(transparent)]
    Serialize(#[from] serde_json::Error),
}

impl From<ChatError> for AppError {
    fn from(err: ChatError) -> Self {
        match err {
            ChatError::EmptyMessage => AppError::BadRequest(err.to_string()),
            ChatError::Busy => AppError::Conflict(err.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg.clone()),
            AppError::Serialize(e) => {
                tracing::error!("Response encoding failed: {e}");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        (status, Json(json!({ "detail": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_gating_maps_to_status_codes() {
        let empty = AppError::from(ChatError::EmptyMessage).into_response();
        assert_eq!(empty.status(), StatusCode::BAD_REQUEST);

        let busy = AppError::from(ChatError::Busy).into_response();
        assert_eq!(busy.status(), StatusCode::CONFLICT);
    }
}
