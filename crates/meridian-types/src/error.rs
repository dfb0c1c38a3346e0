//! The failure-kind taxonomy from §7. Every crate boundary defines its own
//! `thiserror::Error` enum; this one is the shared vocabulary the ingress
//! pipelines and the HTTP edge translate those per-crate errors into.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A failure kind from the table in §7. Carries no internal detail — only
/// enough to pick an HTTP status and a fixed, non-leaking body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    MissingConfig,
    InvalidSignature,
    MalformedPayload,
    NotConnected,
    Duplicate,
    HandlerFailure,
    Deadline,
    AuthFailure,
}

impl FailureKind {
    /// HTTP status this failure kind maps to at the edge (§6, §7).
    pub fn status_code(&self) -> u16 {
        match self {
            FailureKind::MissingConfig => 500,
            FailureKind::InvalidSignature => 401,
            FailureKind::MalformedPayload => 400,
            // Treated as NOT_CONNECTED at the ingress boundary per §7.
            FailureKind::NotConnected | FailureKind::AuthFailure => 500,
            FailureKind::Duplicate => 200,
            FailureKind::HandlerFailure => 200,
            FailureKind::Deadline => 200,
        }
    }
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("missing configuration: {0}")]
    MissingConfig(String),
    #[error("invalid signature")]
    InvalidSignature,
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
    #[error("tenant not connected")]
    NotConnected,
    #[error("duplicate event")]
    Duplicate,
    #[error("handler failure: {0}")]
    HandlerFailure(String),
    #[error("deadline exceeded")]
    Deadline,
    #[error("credential auth failure")]
    AuthFailure,
}

impl CoreError {
    pub fn kind(&self) -> FailureKind {
        match self {
            CoreError::MissingConfig(_) => FailureKind::MissingConfig,
            CoreError::InvalidSignature => FailureKind::InvalidSignature,
            CoreError::MalformedPayload(_) => FailureKind::MalformedPayload,
            CoreError::NotConnected => FailureKind::NotConnected,
            CoreError::Duplicate => FailureKind::Duplicate,
            CoreError::HandlerFailure(_) => FailureKind::HandlerFailure,
            CoreError::Deadline => FailureKind::Deadline,
            CoreError::AuthFailure => FailureKind::AuthFailure,
        }
    }
}
