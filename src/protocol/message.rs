//! JSON-RPC 2.0 message types.
//!
//! Defines the envelope exchanged over the Streamable HTTP transport.
//!
//! # Format
//!
//! Request:
//! ```json
//! { "jsonrpc": "2.0", "id": 1, "method": "tools/list", "params": { ... } }
//! ```
//!
//! Notification (no `id`):
//! ```json
//! { "jsonrpc": "2.0", "method": "notifications/initialized" }
//! ```
//!
//! Response:
//! ```json
//! { "jsonrpc": "2.0", "id": 1, "result": { ... } }
//! { "jsonrpc": "2.0", "id": null, "error": { "code": -32000, "message": "..." } }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// Constants
// ============================================================================

/// Method name of the session-opening handshake.
pub const INITIALIZE_METHOD: &str = "initialize";

/// Standard JSON-RPC error codes plus the MCP transport code.
pub mod error_codes {
    /// Invalid JSON was received.
    pub const PARSE_ERROR: i64 = -32700;
    /// The JSON sent is not a valid request object.
    pub const INVALID_REQUEST: i64 = -32600;
    /// The method does not exist.
    pub const METHOD_NOT_FOUND: i64 = -32601;
    /// Invalid method parameters.
    pub const INVALID_PARAMS: i64 = -32602;
    /// Internal JSON-RPC error.
    pub const INTERNAL_ERROR: i64 = -32603;
    /// Transport-level rejection (bad or missing session).
    pub const SERVER_ERROR: i64 = -32000;
}

// ============================================================================
// JsonRpcVersion
// ============================================================================

/// The `"jsonrpc": "2.0"` marker.
///
/// Deserialization fails for any other value, which keeps arbitrary objects
/// from being mistaken for responses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JsonRpcVersion;

impl Serialize for JsonRpcVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("2.0")
    }
}

impl<'de> Deserialize<'de> for JsonRpcVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let version = String::deserialize(deserializer)?;
        if version == "2.0" {
            Ok(Self)
        } else {
            Err(de::Error::custom(format!(
                "unsupported jsonrpc version: {version}"
            )))
        }
    }
}

// ============================================================================
// RequestId
// ============================================================================

/// Correlation ID of a request: number or string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// Numeric ID.
    Number(i64),
    /// String ID.
    String(String),
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => f.write_str(s),
        }
    }
}

// ============================================================================
// Request / Notification
// ============================================================================

/// A call that expects a response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    /// Protocol version marker.
    pub jsonrpc: JsonRpcVersion,
    /// Correlation ID.
    pub id: RequestId,
    /// Method name.
    pub method: String,
    /// Method parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// Creates a new request.
    #[must_use]
    pub fn new(id: RequestId, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JsonRpcVersion,
            id,
            method: method.into(),
            params,
        }
    }
}

/// A one-way message with no response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcNotification {
    /// Protocol version marker.
    pub jsonrpc: JsonRpcVersion,
    /// Method name.
    pub method: String,
    /// Method parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcNotification {
    /// Creates a new notification.
    #[must_use]
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JsonRpcVersion,
            method: method.into(),
            params,
        }
    }
}

// ============================================================================
// Response
// ============================================================================

/// Error object of a failed response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Error code (see [`error_codes`]).
    pub code: i64,
    /// Human-readable message.
    pub message: String,
    /// Optional structured detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    /// Creates an error object without data.
    #[must_use]
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }
}

/// Reply to a [`JsonRpcRequest`], or a transport-level error envelope.
///
/// `id` serializes as `null` when the request could not be correlated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// Protocol version marker.
    pub jsonrpc: JsonRpcVersion,
    /// Correlation ID, `null` for uncorrelated errors.
    pub id: Option<RequestId>,
    /// Success payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Failure payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    /// Creates a success response.
    #[must_use]
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: JsonRpcVersion,
            id: Some(id),
            result: Some(result),
            error: None,
        }
    }

    /// Creates an error response.
    #[must_use]
    pub fn error(id: Option<RequestId>, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: JsonRpcVersion,
            id,
            result: None,
            error: Some(error),
        }
    }

    /// Returns `true` if this response carries an error.
    #[inline]
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

// ============================================================================
// JsonRpcMessage
// ============================================================================

/// Any single JSON-RPC message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonRpcMessage {
    /// Call expecting a response.
    Request(JsonRpcRequest),
    /// One-way message.
    Notification(JsonRpcNotification),
    /// Reply from the client to a server request.
    Response(JsonRpcResponse),
}

impl JsonRpcMessage {
    /// Returns `true` if this is an `initialize` request.
    #[inline]
    #[must_use]
    pub fn is_initialize(&self) -> bool {
        matches!(self, Self::Request(req) if req.method == INITIALIZE_METHOD)
    }

    /// Returns `true` if this message expects a response.
    #[inline]
    #[must_use]
    pub fn is_request(&self) -> bool {
        matches!(self, Self::Request(_))
    }
}

// ============================================================================
// Payload
// ============================================================================

/// Why a POST body could not be turned into messages.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PayloadError {
    /// Body is not JSON at all.
    #[error("Parse error: {0}")]
    Parse(String),
    /// Body is JSON but not a JSON-RPC message or batch.
    #[error("Invalid Request: {0}")]
    InvalidRequest(String),
}

impl PayloadError {
    /// Converts to the matching JSON-RPC error object.
    #[must_use]
    pub fn to_rpc_error(&self) -> JsonRpcError {
        let code = match self {
            Self::Parse(_) => error_codes::PARSE_ERROR,
            Self::InvalidRequest(_) => error_codes::INVALID_REQUEST,
        };
        JsonRpcError::new(code, self.to_string())
    }
}

/// Body of a POST: one message or a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// A single message object.
    Single(JsonRpcMessage),
    /// A JSON array of messages.
    Batch(Vec<JsonRpcMessage>),
}

impl Payload {
    /// Parses a raw request body.
    ///
    /// # Errors
    ///
    /// - [`PayloadError::Parse`] if the body is not valid JSON
    /// - [`PayloadError::InvalidRequest`] if it is JSON of the wrong shape
    pub fn parse(body: &[u8]) -> Result<Self, PayloadError> {
        let value: Value =
            serde_json::from_slice(body).map_err(|e| PayloadError::Parse(e.to_string()))?;

        match value {
            Value::Array(items) => {
                if items.is_empty() {
                    return Err(PayloadError::InvalidRequest("empty batch".to_string()));
                }
                items
                    .into_iter()
                    .map(serde_json::from_value)
                    .collect::<Result<Vec<JsonRpcMessage>, _>>()
                    .map(Self::Batch)
                    .map_err(|e| PayloadError::InvalidRequest(e.to_string()))
            }
            other => serde_json::from_value(other)
                .map(Self::Single)
                .map_err(|e| PayloadError::InvalidRequest(e.to_string())),
        }
    }

    /// Returns the messages in order.
    #[must_use]
    pub fn messages(&self) -> &[JsonRpcMessage] {
        match self {
            Self::Single(message) => std::slice::from_ref(message),
            Self::Batch(messages) => messages,
        }
    }

    /// Consumes the payload, returning its messages.
    #[must_use]
    pub fn into_messages(self) -> Vec<JsonRpcMessage> {
        match self {
            Self::Single(message) => vec![message],
            Self::Batch(messages) => messages,
        }
    }

    /// Returns `true` if the body was a JSON array.
    #[inline]
    #[must_use]
    pub fn is_batch(&self) -> bool {
        matches!(self, Self::Batch(_))
    }

    /// Returns `true` if any message is an `initialize` request.
    #[must_use]
    pub fn contains_initialize(&self) -> bool {
        self.messages().iter().any(JsonRpcMessage::is_initialize)
    }
}

/// Returns `true` if a raw body holds an `initialize` request.
///
/// Unparseable bodies are not initializers.
#[must_use]
pub fn is_initialize_body(body: &[u8]) -> bool {
    Payload::parse(body).is_ok_and(|payload| payload.contains_initialize())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_parse_request() {
        let payload = Payload::parse(br#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#).unwrap();
        match payload {
            Payload::Single(JsonRpcMessage::Request(req)) => {
                assert_eq!(req.id, RequestId::Number(1));
                assert_eq!(req.method, "ping");
                assert!(req.params.is_none());
            }
            other => panic!("expected request, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_notification() {
        let payload =
            Payload::parse(br#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#).unwrap();
        assert!(matches!(
            payload,
            Payload::Single(JsonRpcMessage::Notification(_))
        ));
    }

    #[test]
    fn test_parse_response() {
        let payload = Payload::parse(br#"{"jsonrpc":"2.0","id":"a","result":{}}"#).unwrap();
        assert!(matches!(
            payload,
            Payload::Single(JsonRpcMessage::Response(_))
        ));
    }

    #[test]
    fn test_parse_batch() {
        let body = br#"[
            {"jsonrpc":"2.0","id":1,"method":"ping"},
            {"jsonrpc":"2.0","method":"notifications/initialized"}
        ]"#;
        let payload = Payload::parse(body).unwrap();
        assert!(payload.is_batch());
        assert_eq!(payload.messages().len(), 2);
        assert!(payload.messages()[0].is_request());
    }

    #[test]
    fn test_parse_rejects_invalid_json() {
        let err = Payload::parse(b"{not json").unwrap_err();
        assert!(matches!(err, PayloadError::Parse(_)));
        assert!(err.to_string().starts_with("Parse error: "));
        let rpc = err.to_rpc_error();
        assert_eq!(rpc.code, error_codes::PARSE_ERROR);
        assert_eq!(rpc.message, err.to_string());
    }

    #[test]
    fn test_parse_rejects_wrong_version() {
        let err = Payload::parse(br#"{"jsonrpc":"1.0","id":1,"method":"ping"}"#).unwrap_err();
        assert!(matches!(err, PayloadError::InvalidRequest(_)));
    }

    #[test]
    fn test_parse_rejects_arbitrary_object() {
        let err = Payload::parse(br#"{"hello":"world"}"#).unwrap_err();
        assert_eq!(err.to_rpc_error().code, error_codes::INVALID_REQUEST);
    }

    #[test]
    fn test_parse_rejects_empty_batch() {
        assert!(Payload::parse(b"[]").is_err());
    }

    #[test]
    fn test_is_initialize_body() {
        assert!(is_initialize_body(
            br#"{"jsonrpc":"2.0","id":0,"method":"initialize","params":{}}"#
        ));
        assert!(!is_initialize_body(br#"{"jsonrpc":"2.0","id":0,"method":"ping"}"#));
        assert!(!is_initialize_body(
            br#"{"jsonrpc":"2.0","method":"initialize"}"#
        ));
        assert!(!is_initialize_body(b"garbage"));
    }

    #[test]
    fn test_error_envelope_serializes_null_id() {
        let response = JsonRpcResponse::error(
            None,
            JsonRpcError::new(error_codes::SERVER_ERROR, "Bad Request: No valid session ID provided"),
        );
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(
            value,
            json!({
                "jsonrpc": "2.0",
                "error": {"code": -32000, "message": "Bad Request: No valid session ID provided"},
                "id": null
            })
        );
    }

    #[test]
    fn test_request_id_display() {
        assert_eq!(RequestId::Number(7).to_string(), "7");
        assert_eq!(RequestId::String("abc".into()).to_string(), "abc");
    }
}
