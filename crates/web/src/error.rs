//! HTTP error type.
//!
//! Failures are answered with an HTML page carrying the status code, never
//! with a bare panic or an empty body.

use crate::render::error_page;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use docu_core::AppError;

/// An error turned into an HTML response.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }
}

/// Status code for a domain error.
pub fn status_for(err: &AppError) -> StatusCode {
    match err {
        AppError::NotTrained => StatusCode::CONFLICT,
        AppError::Document(_) => StatusCode::UNPROCESSABLE_ENTITY,
        AppError::Llm(_) | AppError::Embedding(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self::new(status_for(&err), err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, "{}", self.message);
        } else {
            tracing::warn!(status = %self.status, "{}", self.message);
        }

        (self.status, Html(error_page(self.status, &self.message))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(&AppError::NotTrained), StatusCode::CONFLICT);
        assert_eq!(
            status_for(&AppError::Document("bad".into())),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(status_for(&AppError::Llm("down".into())), StatusCode::BAD_GATEWAY);
        assert_eq!(
            status_for(&AppError::Other("boom".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_into_response_keeps_status() {
        let response = ApiError::from(AppError::Document("broken.pdf".into())).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
