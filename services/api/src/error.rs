use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use intervu_core::{InterviewError, StoreError};
use serde_json::json;

/// Errors returned by the HTTP handlers, rendered as `{"detail": "..."}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Missing or empty X-User-Id header")]
    Unauthorized,
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Interview(#[from] InterviewError),
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        ApiError::Interview(e.into())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Interview(e) => match e {
                InterviewError::InvalidConfig(_) | InterviewError::InvalidTransition { .. } => {
                    StatusCode::BAD_REQUEST
                }
                InterviewError::SourceUnavailable(_) | InterviewError::EvaluationFailed(_) => {
                    StatusCode::BAD_GATEWAY
                }
                InterviewError::PersistenceFailed(StoreError::NotFound(_)) => StatusCode::NOT_FOUND,
                InterviewError::PersistenceFailed(StoreError::Forbidden(_)) => StatusCode::FORBIDDEN,
                InterviewError::PersistenceFailed(_)
                | InterviewError::SpeechUnsupported
                | InterviewError::CaptureFailed { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed with {}: {}", status, self);
        } else {
            tracing::warn!("Request rejected with {}: {}", status, self);
        }
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use intervu_core::interview::RecordId;

    #[test]
    fn store_errors_map_to_http_statuses() {
        let id = RecordId::generate();
        assert_eq!(ApiError::from(StoreError::NotFound(id)).status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::from(StoreError::Forbidden(id)).status(), StatusCode::FORBIDDEN);
        assert_eq!(
            ApiError::from(StoreError::Io(std::io::Error::other("disk"))).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn collaborator_failures_are_bad_gateway() {
        assert_eq!(
            ApiError::from(InterviewError::EvaluationFailed("timeout".into())).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ApiError::from(InterviewError::SourceUnavailable("empty".into())).status(),
            StatusCode::BAD_GATEWAY
        );
    }
}
