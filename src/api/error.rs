use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::engine::error::EngineError;

impl EngineError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            EngineError::NotFound { .. } => StatusCode::NOT_FOUND,
            EngineError::InvalidTransition { .. } | EngineError::ActionNotDue { .. } => {
                StatusCode::CONFLICT
            }
            EngineError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            EngineError::Storage(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        tracing::Span::current().record("error", self.reason());

        let message = match &self {
            // Backend details stay in the logs.
            EngineError::Storage(e) => {
                error!("Storage failure: {}", e);
                "storage temporarily unavailable".to_string()
            }
            other => other.to_string(),
        };

        let mut body = json!({
            "error": message,
            "reason": self.reason(),
            "retryable": self.is_retryable(),
        });
        if let EngineError::ActionNotDue { days_remaining, .. } = &self {
            body["days_remaining"] = json!(days_remaining);
        }
        (status, Json(body)).into_response()
    }
}
