use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use imgcut_core::CoreError;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::SessionNotFound | CoreError::FileNotFound => {
                ApiError::NotFound(err.to_string())
            }
            CoreError::TileTooSmall { .. } | CoreError::InvalidFileName(_) => {
                ApiError::BadRequest(err.to_string())
            }
            CoreError::UnsupportedFormat(_) => ApiError::UnsupportedMediaType(err.to_string()),
            CoreError::NilSession | CoreError::Filesystem => {
                ApiError::InternalError(err.to_string())
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, message) = match self {
            ApiError::NotFound(msg) => {
                tracing::warn!("Not found: {}", msg);
                (StatusCode::NOT_FOUND, "NotFound", msg)
            }
            ApiError::BadRequest(msg) => {
                tracing::warn!("Bad request: {}", msg);
                (StatusCode::BAD_REQUEST, "BadRequest", msg)
            }
            ApiError::UnsupportedMediaType(msg) => {
                tracing::warn!("Unsupported media type: {}", msg);
                (StatusCode::UNSUPPORTED_MEDIA_TYPE, "UnsupportedMediaType", msg)
            }
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "InternalError", msg)
            }
        };

        let body = Json(ErrorResponse {
            error: error_type.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: CoreError) -> StatusCode {
        ApiError::from(err).into_response().status()
    }

    #[test]
    fn test_core_error_status_mapping() {
        assert_eq!(status_of(CoreError::FileNotFound), StatusCode::NOT_FOUND);
        assert_eq!(status_of(CoreError::SessionNotFound), StatusCode::NOT_FOUND);
        assert_eq!(
            status_of(CoreError::TileTooSmall { dx: 10, dy: 10, min: 32 }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(CoreError::UnsupportedFormat("Gif".into())),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
        assert_eq!(status_of(CoreError::NilSession), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(status_of(CoreError::Filesystem), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
