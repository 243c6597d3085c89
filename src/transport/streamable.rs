//! Streamable HTTP transport for one MCP session.
//!
//! Turns a sequence of POST/GET/DELETE exchanges into one JSON-RPC message
//! stream between a client and its [`McpServer`].
//!
//! # Construction Modes
//!
//! | Mode | Session ID | Initialized |
//! |------|------------|-------------|
//! | [`StreamableHttpTransport::with_id_generator`] | Assigned on `initialize` | On `initialize` |
//! | [`StreamableHttpTransport::with_session_id`] | Supplied up front | Immediately |
//!
//! # Request Handling
//!
//! - `POST`: deliver messages; requests are answered on an SSE stream (or a
//!   JSON body in JSON response mode), notifications alone get `202`.
//! - `GET`: open the standalone server-to-client SSE stream (one at a time).
//! - `DELETE`: close the transport.
//!
//! # Lifecycle Callbacks
//!
//! - `on_session_initialized` fires once, when a generated ID is assigned.
//! - `on_close` fires once, on the first [`close`](StreamableHttpTransport::close),
//!   whether triggered by DELETE, a client disconnect, or server shutdown.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use axum::Json;
use axum::body::Bytes;
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, header};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use crate::identifiers::SessionId;
use crate::protocol::{
    JsonRpcMessage, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, McpServer, Payload,
    error_codes,
};

use super::headers::{SESSION_ID_HEADER, collect_headers, extract_session_id};
use super::rejection::HttpError;
use super::stream::{DisconnectGuard, SessionStream};

// ============================================================================
// Constants
// ============================================================================

const JSON_MIME: &str = "application/json";
const SSE_MIME: &str = "text/event-stream";

/// SSE event name carrying JSON-RPC messages.
const MESSAGE_EVENT: &str = "message";

// ============================================================================
// Types
// ============================================================================

type IdGenerator = Box<dyn Fn() -> SessionId + Send + Sync>;

/// Called with the generated ID once the handshake completes.
type InitializedCallback = Box<dyn FnOnce(&SessionId) + Send>;

/// Called once when the transport closes, with its ID if one was assigned.
type CloseCallback = Box<dyn FnOnce(Option<&SessionId>) + Send>;

// ============================================================================
// StreamableHttpTransport
// ============================================================================

/// Per-session HTTP transport.
///
/// Shared as `Arc<StreamableHttpTransport>` between the registry and
/// in-flight requests. All methods take `&self`.
pub struct StreamableHttpTransport {
    /// Assigned session ID, if known yet.
    session_id: RwLock<Option<SessionId>>,
    /// Present only in generated mode.
    id_generator: Option<IdGenerator>,
    /// Answer POSTs with one JSON body instead of an SSE stream.
    json_response: bool,
    initialized: AtomicBool,
    closed: AtomicBool,
    server: OnceLock<Arc<McpServer>>,
    /// Sender half of the open standalone GET stream.
    standalone: Mutex<Option<mpsc::UnboundedSender<Event>>>,
    on_initialized: Mutex<Option<InitializedCallback>>,
    on_close: Mutex<Option<CloseCallback>>,
}

impl fmt::Debug for StreamableHttpTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamableHttpTransport")
            .field("session_id", &self.session_id())
            .field("initialized", &self.is_initialized())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// StreamableHttpTransport - Constructors
// ============================================================================

impl StreamableHttpTransport {
    /// Creates a transport that assigns its ID on `initialize`.
    #[must_use]
    pub fn with_id_generator(
        generator: impl Fn() -> SessionId + Send + Sync + 'static,
        json_response: bool,
    ) -> Self {
        Self::build(None, Some(Box::new(generator)), json_response)
    }

    /// Creates a transport already bound to `session_id`.
    ///
    /// Used when resuming a session whose ID the client presents; the
    /// transport accepts traffic without a new `initialize`.
    #[must_use]
    pub fn with_session_id(session_id: SessionId, json_response: bool) -> Self {
        let transport = Self::build(Some(session_id), None, json_response);
        transport.initialized.store(true, Ordering::SeqCst);
        transport
    }

    fn build(
        session_id: Option<SessionId>,
        id_generator: Option<IdGenerator>,
        json_response: bool,
    ) -> Self {
        Self {
            session_id: RwLock::new(session_id),
            id_generator,
            json_response,
            initialized: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            server: OnceLock::new(),
            standalone: Mutex::new(None),
            on_initialized: Mutex::new(None),
            on_close: Mutex::new(None),
        }
    }
}

// ============================================================================
// StreamableHttpTransport - Public API
// ============================================================================

impl StreamableHttpTransport {
    /// Returns the session ID, once assigned.
    #[must_use]
    pub fn session_id(&self) -> Option<SessionId> {
        self.session_id.read().clone()
    }

    /// Returns `true` once the session handshake has completed.
    #[inline]
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::SeqCst)
    }

    /// Returns `true` after [`close`](Self::close).
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Installs the one-shot callback fired when a generated ID is assigned.
    pub fn on_session_initialized(&self, callback: impl FnOnce(&SessionId) + Send + 'static) {
        *self.on_initialized.lock() = Some(Box::new(callback));
    }

    /// Installs the one-shot callback fired on close.
    pub fn on_close(&self, callback: impl FnOnce(Option<&SessionId>) + Send + 'static) {
        *self.on_close.lock() = Some(Box::new(callback));
    }

    /// Binds the protocol server that answers this session's messages.
    ///
    /// Only the first call has an effect.
    pub fn connect(self: &Arc<Self>, server: McpServer) {
        let server = Arc::new(server);
        server.connect(self);
        if self.server.set(server).is_err() {
            warn!("Transport already connected to a server");
        }
    }

    /// Pushes a notification onto the standalone stream.
    ///
    /// Returns `false` if no standalone stream is open.
    pub fn send_notification(&self, notification: JsonRpcNotification) -> bool {
        let data = match serde_json::to_string(&notification) {
            Ok(data) => data,
            Err(e) => {
                warn!(error = %e, "Failed to serialize notification");
                return false;
            }
        };

        let standalone = self.standalone.lock();
        match standalone.as_ref() {
            Some(tx) => tx.send(message_event(data)).is_ok(),
            None => false,
        }
    }

    /// Closes the transport.
    ///
    /// Idempotent: the close callback fires exactly once.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }

        // Ends the standalone stream, if any.
        self.standalone.lock().take();

        let session_id = self.session_id();
        info!(session_id = ?session_id, "Transport closed");

        let callback = self.on_close.lock().take();
        if let Some(callback) = callback {
            callback(session_id.as_ref());
        }
    }

    /// Handles one HTTP request routed to this session.
    pub async fn handle_request(
        self: &Arc<Self>,
        method: &Method,
        headers: &HeaderMap,
        body: Bytes,
    ) -> Response {
        if self.is_closed() {
            return HttpError::session_not_found().into_response();
        }

        let result = match *method {
            Method::POST => self.handle_post(headers, body).await,
            Method::GET => self.handle_get(headers),
            Method::DELETE => self.handle_delete(headers),
            _ => Err(HttpError::method_not_allowed()),
        };

        match result {
            Ok(response) => self.with_session_header(response),
            Err(rejection) => {
                debug!(
                    session_id = ?self.session_id(),
                    status = %rejection.status(),
                    reason = rejection.message(),
                    "Transport rejected request"
                );
                rejection.into_response()
            }
        }
    }
}

// ============================================================================
// StreamableHttpTransport - Method Handlers
// ============================================================================

impl StreamableHttpTransport {
    async fn handle_post(
        self: &Arc<Self>,
        headers: &HeaderMap,
        body: Bytes,
    ) -> Result<Response, HttpError> {
        if !accepts(headers, JSON_MIME) || !accepts(headers, SSE_MIME) {
            return Err(HttpError::not_acceptable(
                "Not Acceptable: Client must accept both application/json and text/event-stream",
            ));
        }

        if !is_json_content(headers) {
            return Err(HttpError::unsupported_media_type());
        }

        // A body that cannot be relayed ends the session.
        let payload = match Payload::parse(&body) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(session_id = ?self.session_id(), error = %e, "Malformed request body");
                self.close();
                return Err(e.into());
            }
        };

        if payload.contains_initialize() {
            if payload.messages().len() > 1 {
                return Err(HttpError::bad_request(
                    error_codes::INVALID_REQUEST,
                    "Invalid Request: Only one initialization request is allowed",
                ));
            }
            self.begin_session()?;
        } else {
            self.validate_session(headers)?;
        }

        let server = self.server()?;
        let is_batch = payload.is_batch();

        let guard = DisconnectGuard::new(self);

        let mut requests = Vec::new();
        for message in payload.into_messages() {
            match message {
                JsonRpcMessage::Request(request) => requests.push(request),
                JsonRpcMessage::Notification(notification) => {
                    server.handle_notification(notification).await;
                }
                JsonRpcMessage::Response(response) => {
                    trace!(id = ?response.id, "Client response ignored");
                }
            }
        }

        if requests.is_empty() {
            guard.disarm();
            return Ok(StatusCode::ACCEPTED.into_response());
        }

        if self.json_response {
            let mut responses = Vec::with_capacity(requests.len());
            for request in requests {
                responses.push(server.handle_request(request).await);
            }
            guard.disarm();
            let body = match responses.as_slice() {
                [single] if !is_batch => serde_json::to_value(single),
                _ => serde_json::to_value(&responses),
            };
            let body = body.map_err(|e| HttpError::internal(e.to_string()))?;
            return Ok(Json::<Value>(body).into_response());
        }

        guard.disarm();
        Ok(self.stream_responses(server, requests))
    }

    fn handle_get(self: &Arc<Self>, headers: &HeaderMap) -> Result<Response, HttpError> {
        if !accepts(headers, SSE_MIME) {
            return Err(HttpError::not_acceptable(
                "Not Acceptable: Client must accept text/event-stream",
            ));
        }

        self.validate_session(headers)?;

        let (tx, rx) = mpsc::unbounded_channel();
        {
            let mut standalone = self.standalone.lock();
            if standalone.as_ref().is_some_and(|open| !open.is_closed()) {
                return Err(HttpError::conflict(
                    "Conflict: Only one SSE stream is allowed per session",
                ));
            }
            *standalone = Some(tx);
        }

        debug!(session_id = ?self.session_id(), "Standalone stream opened");

        let stream = SessionStream::new(rx, Arc::clone(self));
        Ok(Sse::new(stream)
            .keep_alive(KeepAlive::default())
            .into_response())
    }

    fn handle_delete(&self, headers: &HeaderMap) -> Result<Response, HttpError> {
        self.validate_session(headers)?;
        self.close();
        Ok(StatusCode::OK.into_response())
    }
}

// ============================================================================
// StreamableHttpTransport - Internals
// ============================================================================

impl StreamableHttpTransport {
    /// Marks the session initialized, generating and announcing its ID in
    /// generated mode.
    fn begin_session(&self) -> Result<(), HttpError> {
        let Some(generate) = &self.id_generator else {
            self.initialized.store(true, Ordering::SeqCst);
            return Ok(());
        };

        if self.initialized.swap(true, Ordering::SeqCst) {
            return Err(HttpError::bad_request(
                error_codes::INVALID_REQUEST,
                "Invalid Request: Server already initialized",
            ));
        }

        let session_id = generate();
        *self.session_id.write() = Some(session_id.clone());
        info!(session_id = %session_id, "Session initialized");

        let callback = self.on_initialized.lock().take();
        if let Some(callback) = callback {
            callback(&session_id);
        }

        Ok(())
    }

    /// Checks that non-initialize traffic belongs to this session.
    fn validate_session(&self, headers: &HeaderMap) -> Result<(), HttpError> {
        if !self.is_initialized() {
            return Err(HttpError::bad_request(
                error_codes::SERVER_ERROR,
                "Bad Request: Server not initialized",
            ));
        }

        let Some(expected) = self.session_id() else {
            return Ok(());
        };

        match extract_session_id(&collect_headers(headers), SESSION_ID_HEADER) {
            None => Err(HttpError::bad_request(
                error_codes::SERVER_ERROR,
                "Bad Request: Mcp-Session-Id header is required",
            )),
            Some(presented) if presented != expected.as_str() => {
                Err(HttpError::session_not_found())
            }
            Some(_) => Ok(()),
        }
    }

    fn server(&self) -> Result<Arc<McpServer>, HttpError> {
        self.server
            .get()
            .cloned()
            .ok_or_else(|| HttpError::internal("Transport is not connected to a server"))
    }

    /// Answers `requests` on a fresh SSE stream, one event per response.
    fn stream_responses(
        self: &Arc<Self>,
        server: Arc<McpServer>,
        requests: Vec<JsonRpcRequest>,
    ) -> Response {
        let (tx, rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            for request in requests {
                let response: JsonRpcResponse = server.handle_request(request).await;
                let data = match serde_json::to_string(&response) {
                    Ok(data) => data,
                    Err(e) => {
                        warn!(error = %e, "Failed to serialize response");
                        continue;
                    }
                };
                if tx.send(message_event(data)).is_err() {
                    debug!("Response stream dropped before completion");
                    break;
                }
            }
        });

        Sse::new(SessionStream::new(rx, Arc::clone(self))).into_response()
    }

    fn with_session_header(&self, mut response: Response) -> Response {
        if let Some(session_id) = self.session_id()
            && let Ok(value) = HeaderValue::from_str(session_id.as_str())
        {
            response.headers_mut().insert(SESSION_ID_HEADER, value);
        }
        response
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn message_event(data: String) -> Event {
    Event::default().event(MESSAGE_EVENT).data(data)
}

/// Returns `true` if any `Accept` value lists `mime`.
fn accepts(headers: &HeaderMap, mime: &str) -> bool {
    headers
        .get_all(header::ACCEPT)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.split(',').any(|part| part.trim().starts_with(mime)))
}

fn is_json_content(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.trim_start().starts_with(JSON_MIME))
}

// ============================================================================
// Tests
// ============================================================================
