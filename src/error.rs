//! Relay error types with HTTP status code mapping.
//!
//! [`RelayError`] is the central error type for the relay. Each variant
//! maps to a specific HTTP status code and structured JSON error response.
//! Per-connection delivery failures are not part of it: they live in
//! [`crate::domain::DeliveryFailure`] and never leave the dispatcher.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 1002,
///     "message": "invalid network: goerli"
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code and human-readable message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code.
    pub code: u32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category   | HTTP Status                 |
/// |-----------|------------|-----------------------------|
/// | 1000–1999 | Validation | 400 Bad Request             |
/// | 3000–3999 | Server     | 500 Internal Server Error   |
/// | 5000–5999 | Upstream   | 502 Bad Gateway             |
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Network selector is neither `mainnet` nor `sepolia`.
    #[error("invalid network: {0}")]
    InvalidNetwork(String),

    /// A broadcast payload could not be serialized.
    #[error("failed to encode payload: {0}")]
    Encoding(#[from] serde_json::Error),

    /// Required configuration is missing or malformed.
    #[error("configuration error: {0}")]
    Config(String),

    /// Transport-level failure talking to the node provider.
    #[error("upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),

    /// The node provider answered with a JSON-RPC error object.
    #[error("rpc error {code}: {message}")]
    Rpc {
        /// JSON-RPC error code.
        code: i64,
        /// JSON-RPC error message.
        message: String,
    },

    /// An upstream log or value could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),
}

impl RelayError {
    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::InvalidNetwork(_) => 1002,
            Self::Encoding(_) => 3001,
            Self::Config(_) => 3002,
            Self::Decode(_) => 3003,
            Self::Upstream(_) => 5001,
            Self::Rpc { .. } => 5002,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) | Self::InvalidNetwork(_) => StatusCode::BAD_REQUEST,
            Self::Encoding(_) | Self::Config(_) | Self::Decode(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Upstream(_) | Self::Rpc { .. } => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                message: self.to_string(),
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}
