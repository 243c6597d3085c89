//! HTTP server hosting the MCP endpoint.
//!
//! # Request Flow
//!
//! ```text
//! axum ──► endpoint handler ──► SessionRouter::classify ──► transport.handle_request
//!                                        │
//!                                        └──► 404 / 400 rejection
//! ```
//!
//! # Shutdown
//!
//! When the shutdown future resolves, every live transport is closed so
//! open SSE streams end and axum can drain its connections.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::future::Future;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method};
use axum::response::Response;
use axum::routing::post;
use tokio::net::TcpListener;
use tracing::{debug, info};
use url::Url;

use crate::error::{Error, Result};
use crate::store::{FilePositionStore, MemoryPositionStore, PositionStore};
use crate::tools::ChessServerFactory;

use super::builder::{ServerBuilder, ServerConfig, Storage};
use super::router::SessionRouter;

// ============================================================================
// Axum Application
// ============================================================================

/// Builds the axum application serving POST, GET and DELETE on `path`.
pub fn app(router: Arc<SessionRouter>, path: &str) -> Router {
    Router::new()
        .route(path, post(endpoint).get(endpoint).delete(endpoint))
        .with_state(router)
}

async fn endpoint(
    State(router): State<Arc<SessionRouter>>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    router.handle(method, headers, body).await
}

// ============================================================================
// McpHttpServer
// ============================================================================

/// A bound chess MCP server, ready to [`run`](Self::run).
pub struct McpHttpServer {
    config: ServerConfig,
    listener: TcpListener,
    local_addr: SocketAddr,
    router: Arc<SessionRouter>,
}

impl fmt::Debug for McpHttpServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("McpHttpServer")
            .field("local_addr", &self.local_addr)
            .field("path", &self.config.path)
            .field("sessions", &self.router.registry().len())
            .finish_non_exhaustive()
    }
}

impl McpHttpServer {
    /// Creates a configuration builder.
    #[inline]
    #[must_use]
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// Opens the configured store and binds the listener.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the data directory cannot be created or the
    /// address cannot be bound.
    pub async fn bind(config: ServerConfig) -> Result<Self> {
        let store: Arc<dyn PositionStore> = match &config.storage {
            Storage::Directory(dir) => Arc::new(FilePositionStore::open(dir.clone()).await?),
            Storage::Memory => Arc::new(MemoryPositionStore::new()),
        };
        Self::bind_with_store(config, store).await
    }

    /// Binds the listener using a caller-supplied store.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the address cannot be bound.
    pub async fn bind_with_store(
        config: ServerConfig,
        store: Arc<dyn PositionStore>,
    ) -> Result<Self> {
        let router = Arc::new(SessionRouter::new(
            ChessServerFactory::new(store),
            config.json_response,
        ));

        let listener = TcpListener::bind(config.socket_addr()).await?;
        let local_addr = listener.local_addr()?;

        debug!(%local_addr, path = %config.path, "MCP server bound");

        Ok(Self {
            config,
            listener,
            local_addr,
            router,
        })
    }

    /// Actual bound address (resolves port `0`).
    #[inline]
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Configuration the server was bound with.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Router holding this server's session registry.
    #[inline]
    #[must_use]
    pub fn session_router(&self) -> &Arc<SessionRouter> {
        &self.router
    }

    /// URL clients should connect to.
    ///
    /// A wildcard listen address is reported as loopback.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the URL cannot be formed.
    pub fn endpoint_url(&self) -> Result<Url> {
        let ip = match self.local_addr.ip() {
            IpAddr::V4(ip) if ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
            IpAddr::V6(ip) if ip.is_unspecified() => IpAddr::V6(Ipv6Addr::LOCALHOST),
            ip => ip,
        };
        let addr = SocketAddr::new(ip, self.local_addr.port());

        Url::parse(&format!("http://{addr}{}", self.config.path))
            .map_err(|e| Error::config(format!("Invalid endpoint URL: {e}")))
    }

    /// Serves requests until `shutdown` resolves.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the server fails.
    pub async fn run(self, shutdown: impl Future<Output = ()> + Send + 'static) -> Result<()> {
        let url = self.endpoint_url()?;
        info!(%url, json_response = self.config.json_response, "MCP server listening");

        let registry = Arc::clone(self.router.registry());
        let app = app(self.router, &self.config.path);

        axum::serve(self.listener, app)
            .with_graceful_shutdown(async move {
                shutdown.await;
                info!(sessions = registry.len(), "Shutting down, closing sessions");
                registry.close_all();
            })
            .await?;

        info!("MCP server stopped");
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use axum::body::{Body, to_bytes};
    use axum::http::{HeaderValue, Request, StatusCode, header};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use crate::identifiers::{SessionId, is_valid_session_id};
    use crate::transport::{SESSION_ID_HEADER, SessionRegistry};

    const INIT: &str = r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2025-06-18","capabilities":{},"clientInfo":{"name":"t","version":"0"}}}"#;

    struct TestApp {
        router: Arc<SessionRouter>,
        app: Router,
    }

    impl TestApp {
        fn new(json_response: bool) -> Self {
            let store = Arc::new(MemoryPositionStore::new());
            let router = Arc::new(SessionRouter::new(
                ChessServerFactory::new(store),
                json_response,
            ));
            let app = app(Arc::clone(&router), "/mcp");
            Self { router, app }
        }

        fn registry(&self) -> &Arc<SessionRegistry> {
            self.router.registry()
        }

        async fn send(&self, method: Method, session_id: Option<&str>, body: &str) -> Response {
            let mut request = Request::builder()
                .method(method)
                .uri("/mcp")
                .header(header::ACCEPT, "application/json, text/event-stream")
                .header(header::CONTENT_TYPE, "application/json");
            if let Some(id) = session_id {
                request = request.header(SESSION_ID_HEADER, id);
            }
            let request = request.body(Body::from(body.to_string())).unwrap();
            self.app.clone().oneshot(request).await.unwrap()
        }

        async fn initialize(&self) -> String {
            let response = self.send(Method::POST, None, INIT).await;
            assert_eq!(response.status(), StatusCode::OK);
            let id = session_header(&response).expect("session header");
            let _ = body_bytes(response).await;
            id
        }

        async fn call_tool(&self, session_id: &str, name: &str, arguments: Value) -> Value {
            let body = json!({
                "jsonrpc": "2.0",
                "id": 10,
                "method": "tools/call",
                "params": { "name": name, "arguments": arguments },
            });
            let response = self
                .send(Method::POST, Some(session_id), &body.to_string())
                .await;
            assert_eq!(response.status(), StatusCode::OK);
            serde_json::from_slice(&body_bytes(response).await).unwrap()
        }
    }

    fn session_header(response: &Response) -> Option<String> {
        response
            .headers()
            .get(SESSION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    }

    async fn body_bytes(response: Response) -> Bytes {
        to_bytes(response.into_body(), 1 << 20).await.unwrap()
    }

    #[tokio::test]
    async fn test_scenario_a_initialize_registers_session() {
        let app = TestApp::new(true);

        let response = app.send(Method::POST, None, INIT).await;
        assert_eq!(response.status(), StatusCode::OK);

        let id = session_header(&response).expect("session header");
        assert!(is_valid_session_id(&id));
        assert_eq!(app.registry().len(), 1);
        assert!(app.registry().contains(&id));

        let body: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(body["result"]["serverInfo"]["name"], "chess-mcp-server");
    }

    #[tokio::test]
    async fn test_scenario_b_resume_existing_session() {
        let app = TestApp::new(true);
        let id = app.initialize().await;
        let transport = app.registry().get(&id).expect("registered");

        let response = app
            .send(
                Method::POST,
                Some(&id),
                r#"{"jsonrpc":"2.0","id":2,"method":"tools/list"}"#,
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(session_header(&response).as_deref(), Some(id.as_str()));

        let body: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(body["result"]["tools"].as_array().map(Vec::len), Some(5));

        assert_eq!(app.registry().len(), 1);
        let still = app.registry().get(&id).expect("registered");
        assert!(Arc::ptr_eq(&transport, &still));
    }

    #[tokio::test]
    async fn test_scenario_c_delete_unknown_session() {
        let app = TestApp::new(true);

        let response = app.send(Method::DELETE, Some("1234"), "").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_bytes(response).await;
        let text = String::from_utf8_lossy(&body);
        assert!(text.contains("Invalid or missing session ID: 1234"), "{text}");
        assert!(app.registry().is_empty());
    }

    #[tokio::test]
    async fn test_scenario_d_unroutable_envelope() {
        let app = TestApp::new(true);

        let response = app
            .send(
                Method::POST,
                None,
                r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#,
            )
            .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(
            body,
            json!({
                "jsonrpc": "2.0",
                "error": {
                    "code": -32000,
                    "message": "Bad Request: No valid session ID provided",
                },
                "id": null,
            })
        );
        assert!(app.registry().is_empty());
    }

    #[tokio::test]
    async fn test_scenario_e_concurrent_initializers() {
        let app = TestApp::new(true);

        let (first, second) = tokio::join!(
            app.send(Method::POST, None, INIT),
            app.send(Method::POST, None, INIT),
        );

        let a = session_header(&first).expect("first id");
        let b = session_header(&second).expect("second id");
        assert!(is_valid_session_id(&a));
        assert!(is_valid_session_id(&b));
        assert_ne!(a, b);

        assert_eq!(app.registry().len(), 2);
        let ta = app.registry().get(&a).expect("a registered");
        let tb = app.registry().get(&b).expect("b registered");
        assert!(!Arc::ptr_eq(&ta, &tb));
    }

    #[tokio::test]
    async fn test_delete_tears_down_session() {
        let app = TestApp::new(true);
        let id = app.initialize().await;

        let response = app.send(Method::DELETE, Some(&id), "").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(app.registry().is_empty());

        let again = app.send(Method::DELETE, Some(&id), "").await;
        assert_eq!(again.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_delete_truncates_long_ids() {
        let app = TestApp::new(true);
        let id = SessionId::generate();

        let response = app.send(Method::DELETE, Some(id.as_str()), "").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_bytes(response).await;
        assert_eq!(
            String::from_utf8_lossy(&body),
            format!("Invalid or missing session ID: {}", &id.as_str()[..8])
        );
    }

    #[tokio::test]
    async fn test_explicit_id_resumes_game() {
        let app = TestApp::new(true);
        let id = app.initialize().await;

        let played = app
            .call_tool(&id, "make_move", json!({"move": "e2e4"}))
            .await;
        assert!(played["result"].get("isError").is_none());

        // Client drops the session, then comes back with the same ID.
        let response = app.send(Method::DELETE, Some(&id), "").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(app.registry().is_empty());

        let board = app.call_tool(&id, "get_board", json!({})).await;
        assert_eq!(app.registry().len(), 1);
        let text = board["result"]["content"][0]["text"].as_str().unwrap();
        assert!(text.contains("4P3"), "{text}");
        assert!(text.contains("Turn: black"));
    }

    #[tokio::test]
    async fn test_invalid_header_never_creates_transport() {
        let app = TestApp::new(true);

        let response = app.send(Method::POST, Some("not-a-session"), INIT).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let get = app.send(Method::GET, None, "").await;
        assert_eq!(get.status(), StatusCode::NOT_FOUND);

        assert!(app.registry().is_empty());
    }

    #[tokio::test]
    async fn test_illegal_move_reported_in_band() {
        let app = TestApp::new(true);
        let id = app.initialize().await;

        let response = app
            .call_tool(&id, "make_move", json!({"move": "e2e5"}))
            .await;
        assert_eq!(response["result"]["isError"], true);
        let text = response["result"]["content"][0]["text"].as_str().unwrap();
        assert!(text.starts_with("Illegal move e2e5"), "{text}");
    }

    #[tokio::test]
    async fn test_sse_mode_streams_response() {
        let app = TestApp::new(false);

        let response = app.send(Method::POST, None, INIT).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE),
            Some(&HeaderValue::from_static("text/event-stream"))
        );
        let id = session_header(&response).expect("session header");

        let body = body_bytes(response).await;
        let text = String::from_utf8_lossy(&body);
        assert!(text.contains("event: message"), "{text}");
        assert!(text.contains("\"protocolVersion\":\"2025-06-18\""), "{text}");

        // A fully read response body does not end the session.
        assert!(app.registry().contains(&id));
    }

    #[tokio::test]
    async fn test_malformed_body_ends_session() {
        let app = TestApp::new(true);
        let id = app.initialize().await;

        let response = app.send(Method::POST, Some(&id), "{oops").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: Value = serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(body["error"]["code"], -32700);

        assert!(!app.registry().contains(&id));
        assert!(app.registry().is_empty());
    }

    #[tokio::test]
    async fn test_standalone_stream_disconnect_empties_registry() {
        let app = TestApp::new(false);
        let id = app.initialize().await;

        let stream = app.send(Method::GET, Some(&id), "").await;
        assert_eq!(stream.status(), StatusCode::OK);
        assert!(app.registry().contains(&id));

        drop(stream);
        assert!(app.registry().is_empty());
    }

    #[tokio::test]
    async fn test_unread_response_stream_disconnect_empties_registry() {
        let app = TestApp::new(false);
        let id = app.initialize().await;

        let response = app
            .send(Method::POST, Some(&id), r#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#)
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(app.registry().contains(&id));

        drop(response);
        assert!(app.registry().is_empty());
    }

    #[tokio::test]
    async fn test_bind_and_shutdown() {
        let config = McpHttpServer::builder()
            .port(0)
            .in_memory()
            .build()
            .unwrap();
        let server = McpHttpServer::bind(config).await.unwrap();

        let url = server.endpoint_url().unwrap();
        assert_eq!(url.scheme(), "http");
        assert_eq!(url.path(), "/mcp");
        assert_eq!(url.port(), Some(server.local_addr().port()));

        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let handle = tokio::spawn(server.run(async move {
            let _ = rx.await;
        }));
        tx.send(()).unwrap();
        handle.await.unwrap().unwrap();
    }
}
