//! Common API error type shared by all handlers.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

/// API error type mapping to HTTP status codes.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid input: {0}")]
    BadRequest(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("forbidden: {0}")]
    Forbidden(String),
    #[error("internal server error: {0}")]
    InternalServerError(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::InternalServerError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = Json(serde_json::json!({
            "error": message
        }));

        (status, body).into_response()
    }
}

impl From<parlor_db::StoreError> for ApiError {
    fn from(e: parlor_db::StoreError) -> Self {
        use parlor_db::StoreError;
        match e {
            StoreError::NotFound(what) => ApiError::NotFound(what),
            StoreError::DefaultAgentProtected => {
                ApiError::Forbidden("the default agent is protected".to_string())
            }
            StoreError::InvalidReorder(why) => ApiError::BadRequest(why),
            StoreError::Db(_) | StoreError::Corrupt(_) => {
                ApiError::InternalServerError(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_statuses() {
        let api: ApiError = parlor_db::StoreError::NotFound("agent x".to_string()).into();
        assert!(matches!(api, ApiError::NotFound(_)));

        let api: ApiError = parlor_db::StoreError::DefaultAgentProtected.into();
        assert!(matches!(api, ApiError::Forbidden(_)));

        let api: ApiError = parlor_db::StoreError::InvalidReorder("bad".to_string()).into();
        assert!(matches!(api, ApiError::BadRequest(_)));
    }
}
