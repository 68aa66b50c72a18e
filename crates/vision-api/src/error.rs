//! API error types.

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use crate::services::SummaryError;

pub type ApiResult<T> = Result<T, ApiError>;

/// Realm announced on 401 responses of admin routes.
pub const ADMIN_REALM: &str = "Administrative Area";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Rate limited")]
    RateLimited,

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Summary error: {0}")]
    Summary(#[from] SummaryError),

    #[error("Storage error: {0}")]
    Storage(#[from] vision_storage::StorageError),

    #[error("Firestore error: {0}")]
    Firestore(#[from] vision_firestore::FirestoreError),
}

impl ApiError {
    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            // A summary of an unknown video is reported like any other failed load
            ApiError::Internal(_) | ApiError::Summary(_) | ApiError::Storage(_) | ApiError::Firestore(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn is_internal(&self) -> bool {
        self.status_code() == StatusCode::INTERNAL_SERVER_ERROR
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if self.is_internal() {
            tracing::error!("Request failed: {}", self);
        }

        // Don't expose internal error details in production
        let error = if self.is_internal()
            && std::env::var("ENVIRONMENT")
                .map(|e| e.eq_ignore_ascii_case("production"))
                .unwrap_or(false)
        {
            "An internal error occurred".to_string()
        } else {
            self.to_string()
        };

        let mut response = (status, Json(ErrorResponse { error })).into_response();

        match self {
            ApiError::Unauthorized(_) => {
                response.headers_mut().insert(
                    header::WWW_AUTHENTICATE,
                    HeaderValue::from_static("Basic realm=\"Administrative Area\""),
                );
            }
            ApiError::RateLimited => {
                response
                    .headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from_static("1"));
            }
            _ => {}
        }

        response
    }
}
