//! Fableforge — API error types.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use fableforge_core::error::EngineError;
use serde::Serialize;

/// JSON body returned for error responses.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code.
    pub error: &'static str,
    /// Human-readable error message.
    pub message: String,
}

/// HTTP-layer wrapper around `EngineError` that implements `IntoResponse`.
#[derive(Debug)]
pub struct ApiError(pub EngineError);

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = match &self.0 {
            EngineError::NotYourTurn { .. } => (StatusCode::FORBIDDEN, "not_your_turn"),
            EngineError::UnknownEntity(_) => (StatusCode::NOT_FOUND, "unknown_entity"),
            EngineError::Validation(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            EngineError::Generation(_) => (StatusCode::BAD_GATEWAY, "generation_error"),
            EngineError::SessionClosed => (StatusCode::SERVICE_UNAVAILABLE, "session_closed"),
        };

        let body = ErrorBody {
            error: error_code,
            message: self.0.to_string(),
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: EngineError) -> StatusCode {
        ApiError(err).into_response().status()
    }

    #[test]
    fn test_not_your_turn_maps_to_403() {
        assert_eq!(
            status_of(EngineError::NotYourTurn {
                character: "Igor".into(),
                active: "Olga".into(),
            }),
            StatusCode::FORBIDDEN
        );
    }

    #[test]
    fn test_unknown_entity_maps_to_404() {
        assert_eq!(
            status_of(EngineError::UnknownEntity("ghost".into())),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_validation_maps_to_400() {
        assert_eq!(
            status_of(EngineError::Validation("empty change".into())),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_generation_maps_to_502() {
        assert_eq!(
            status_of(EngineError::Generation("upstream timeout".into())),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_session_closed_maps_to_503() {
        assert_eq!(
            status_of(EngineError::SessionClosed),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
