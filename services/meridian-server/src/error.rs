//! The single place `IngressOutcome` becomes an HTTP response (§7): no
//! internal error type or message reaches `axum::response::IntoResponse`
//! directly anywhere else in this crate.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use meridian_webhook::IngressOutcome;

/// Wraps an [`IngressOutcome`] so it can be returned directly from an axum
/// handler. The body is always one of the short, fixed strings named in §6
/// — never a `Display` of an internal error.
pub struct IngressResponse(pub IngressOutcome);

impl IntoResponse for IngressResponse {
    fn into_response(self) -> Response {
        let (status, body) = outcome_to_status(&self.0);
        (status, body).into_response()
    }
}

pub fn outcome_to_status(outcome: &IngressOutcome) -> (StatusCode, &'static str) {
    match outcome {
        IngressOutcome::Processed { dispatch_ok: true, .. } => (StatusCode::OK, "ok"),
        // A handler failure or deadline still gets 200 (§7 `HANDLER_FAILURE`,
        // `DEADLINE`) — the event is marked failed and picked up by retry.
        IngressOutcome::Processed { dispatch_ok: false, .. } => (StatusCode::OK, "ok"),
        IngressOutcome::Duplicate { .. } => (StatusCode::OK, "already processed"),
        IngressOutcome::Ignored { .. } => (StatusCode::OK, "ignored"),
        IngressOutcome::NotRegistered => (StatusCode::OK, "not registered"),
        IngressOutcome::RateLimited => (StatusCode::TOO_MANY_REQUESTS, "rate limited"),
        IngressOutcome::MalformedPayload => (StatusCode::BAD_REQUEST, "malformed payload"),
        IngressOutcome::InvalidSignature => (StatusCode::UNAUTHORIZED, "invalid signature"),
        IngressOutcome::ConfigError => (StatusCode::INTERNAL_SERVER_ERROR, "configuration error"),
    }
}

/// The error half of request handling that never reaches `run_ingress` at
/// all — a malformed request the router itself rejects (bad UTF-8 headers,
/// an absent admin token). Kept distinct from `IngressOutcome` because
/// these never touch the event log.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("unauthorized")]
    Unauthorized,
    #[error("not found")]
    NotFound,
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("internal error")]
    Internal,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            ApiError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized".to_string()),
            ApiError::NotFound => (StatusCode::NOT_FOUND, "not found".to_string()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "internal error".to_string()),
        };
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_maps_to_200_already_processed() {
        let outcome = IngressOutcome::Duplicate { event_id: uuid::Uuid::nil() };
        assert_eq!(outcome_to_status(&outcome), (StatusCode::OK, "already processed"));
    }

    #[test]
    fn rate_limited_maps_to_429() {
        assert_eq!(
            outcome_to_status(&IngressOutcome::RateLimited),
            (StatusCode::TOO_MANY_REQUESTS, "rate limited")
        );
    }

    #[test]
    fn invalid_signature_maps_to_401() {
        assert_eq!(
            outcome_to_status(&IngressOutcome::InvalidSignature),
            (StatusCode::UNAUTHORIZED, "invalid signature")
        );
    }

    #[test]
    fn config_error_maps_to_500() {
        assert_eq!(
            outcome_to_status(&IngressOutcome::ConfigError),
            (StatusCode::INTERNAL_SERVER_ERROR, "configuration error")
        );
    }
}
