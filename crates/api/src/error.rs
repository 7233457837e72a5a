//! Error responses.

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::{error, warn};
use upvault_core::access::AccessError;
use upvault_core::registry::RegistryError;
use upvault_core::upload::UploadError;
use upvault_shared::AppError;

/// Handler error rendered as `{"error": CODE, "message": ...}`.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

macro_rules! domain_error {
    ($($ty:ty),+) => {
        $(impl From<$ty> for ApiError {
            fn from(err: $ty) -> Self {
                Self(err.into())
            }
        })+
    };
}

domain_error!(AccessError, UploadError, RegistryError);

// Extractor failures keep the framework's explanation but use the common body.
macro_rules! rejection {
    ($($ty:ty),+) => {
        $(impl From<$ty> for ApiError {
            fn from(rejection: $ty) -> Self {
                Self(AppError::Validation(rejection.body_text()))
            }
        })+
    };
}

rejection!(JsonRejection, PathRejection, QueryRejection);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let err = self.0;
        let status =
            StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let message = if err.is_client_visible() {
            if status == StatusCode::BAD_GATEWAY {
                warn!(error = %err, "upload backend failure");
            }
            err.to_string()
        } else {
            error!(error = %err, "request failed");
            "An internal error occurred".to_string()
        };

        (
            status,
            Json(json!({
                "error": err.error_code(),
                "message": message,
            })),
        )
            .into_response()
    }
}
