//! HTTP-level rejections.
//!
//! Every refusal the router or a transport sends back is an [`HttpError`]:
//! a status code plus either a JSON-RPC error envelope (`id: null`) or a
//! plain-text diagnostic.

// ============================================================================
// Imports
// ============================================================================

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::protocol::{JsonRpcError, JsonRpcResponse, PayloadError, error_codes};

// ============================================================================
// Constants
// ============================================================================

/// Message of the envelope returned for unroutable requests.
pub const NO_VALID_SESSION_MESSAGE: &str = "Bad Request: No valid session ID provided";

/// Code used when the session header names a session this transport does not own.
const SESSION_NOT_FOUND_CODE: i64 = -32001;

/// Length of the session ID prefix echoed in teardown diagnostics.
const TEARDOWN_ID_PREFIX: usize = 8;

// ============================================================================
// HttpError
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Body {
    Envelope(JsonRpcError),
    Text(String),
}

/// A request-scoped HTTP refusal.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpError {
    status: StatusCode,
    body: Body,
}

impl HttpError {
    fn envelope(status: StatusCode, code: i64, message: impl Into<String>) -> Self {
        Self {
            status,
            body: Body::Envelope(JsonRpcError::new(code, message)),
        }
    }

    /// No session ID, not an initializer, or an ID that cannot be routed.
    #[must_use]
    pub fn unroutable() -> Self {
        Self::envelope(
            StatusCode::NOT_FOUND,
            error_codes::SERVER_ERROR,
            NO_VALID_SESSION_MESSAGE,
        )
    }

    /// DELETE without a registered session.
    ///
    /// The diagnostic names at most the first eight characters of the ID.
    #[must_use]
    pub fn invalid_teardown(session_id: Option<&str>) -> Self {
        let shown = session_id
            .map(|id| id.chars().take(TEARDOWN_ID_PREFIX).collect::<String>())
            .unwrap_or_else(|| "none".to_string());
        Self {
            status: StatusCode::BAD_REQUEST,
            body: Body::Text(format!("Invalid or missing session ID: {shown}")),
        }
    }

    /// Session header does not name this transport's session.
    #[must_use]
    pub fn session_not_found() -> Self {
        Self::envelope(
            StatusCode::NOT_FOUND,
            SESSION_NOT_FOUND_CODE,
            "Session not found",
        )
    }

    /// 400 with a JSON-RPC error code.
    #[must_use]
    pub fn bad_request(code: i64, message: impl Into<String>) -> Self {
        Self::envelope(StatusCode::BAD_REQUEST, code, message)
    }

    /// `Accept` header does not allow the response media types.
    #[must_use]
    pub fn not_acceptable(message: impl Into<String>) -> Self {
        Self::envelope(
            StatusCode::NOT_ACCEPTABLE,
            error_codes::SERVER_ERROR,
            message,
        )
    }

    /// Request body is not `application/json`.
    #[must_use]
    pub fn unsupported_media_type() -> Self {
        Self::envelope(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            error_codes::SERVER_ERROR,
            "Unsupported Media Type: Content-Type must be application/json",
        )
    }

    /// A second standalone stream was requested.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::envelope(StatusCode::CONFLICT, error_codes::SERVER_ERROR, message)
    }

    /// Method other than POST, GET or DELETE.
    #[must_use]
    pub fn method_not_allowed() -> Self {
        Self::envelope(
            StatusCode::METHOD_NOT_ALLOWED,
            error_codes::SERVER_ERROR,
            "Method not allowed.",
        )
    }

    /// Server-side failure unrelated to the request.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::envelope(
            StatusCode::INTERNAL_SERVER_ERROR,
            error_codes::INTERNAL_ERROR,
            message,
        )
    }

    /// Returns the HTTP status.
    #[inline]
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the message carried in the body.
    #[must_use]
    pub fn message(&self) -> &str {
        match &self.body {
            Body::Envelope(error) => &error.message,
            Body::Text(text) => text,
        }
    }
}

impl From<PayloadError> for HttpError {
    fn from(err: PayloadError) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            body: Body::Envelope(err.to_rpc_error()),
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        match self.body {
            Body::Envelope(error) => {
                (self.status, Json(JsonRpcResponse::error(None, error))).into_response()
            }
            Body::Text(text) => (self.status, text).into_response(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unroutable() {
        let err = HttpError::unroutable();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
        assert_eq!(err.message(), NO_VALID_SESSION_MESSAGE);
    }

    #[test]
    fn test_invalid_teardown_truncates() {
        let err = HttpError::invalid_teardown(Some("123e4567-e89b-42d3-a456-426614174000"));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.message(), "Invalid or missing session ID: 123e4567");
    }

    #[test]
    fn test_invalid_teardown_short_id() {
        let err = HttpError::invalid_teardown(Some("1234"));
        assert_eq!(err.message(), "Invalid or missing session ID: 1234");
    }

    #[test]
    fn test_invalid_teardown_none() {
        let err = HttpError::invalid_teardown(None);
        assert_eq!(err.message(), "Invalid or missing session ID: none");
    }

    #[test]
    fn test_payload_error_maps_to_bad_request() {
        let err: HttpError = PayloadError::Parse("eof".into()).into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert!(err.message().starts_with("Parse error"));
    }
}
