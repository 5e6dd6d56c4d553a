// ── HTTP error mapping ──
//
// Every failure leaves as `{"error": "<message>"}` with a status derived
// from the core error kind.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use casparlink_core::CoreError;
use serde_json::json;

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        let status = match &err {
            CoreError::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
            CoreError::NotFound { .. } | CoreError::UnknownInput { .. } => StatusCode::NOT_FOUND,
            CoreError::AlreadyExists { .. } => StatusCode::CONFLICT,
            CoreError::NotConnected
            | CoreError::ConnectionLost
            | CoreError::ConnectionFailed { .. } => StatusCode::SERVICE_UNAVAILABLE,
            CoreError::AckTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            CoreError::DeviceRejected { .. } => StatusCode::BAD_GATEWAY,
            CoreError::Storage { .. } | CoreError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(%status, error = %self.message, "request failed");
        } else {
            tracing::debug!(%status, error = %self.message, "request rejected");
        }
        (status, Json(json!({ "error": self.message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: CoreError) -> StatusCode {
        ApiError::from(err).status()
    }

    #[test]
    fn core_errors_map_to_statuses() {
        assert_eq!(
            status_of(CoreError::InvalidRequest {
                message: "channel must be at least 1".into()
            }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(CoreError::UnknownInput { id: "cam3".into() }),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(CoreError::AlreadyExists {
                entity_type: "input".into(),
                id: "cam3".into()
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(status_of(CoreError::NotConnected), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(status_of(CoreError::ConnectionLost), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            status_of(CoreError::AckTimeout {
                seq: 4,
                timeout_ms: 5000
            }),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            status_of(CoreError::DeviceRejected {
                code: 404,
                message: "PLAY FAILED".into()
            }),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(CoreError::Internal("boom".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
