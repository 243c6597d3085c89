//! Transport lifecycle manager.
//!
//! Creates per-session transports and wires their lifecycle to the
//! [`SessionRegistry`].
//!
//! # Registration
//!
//! ```text
//! explicit ID ──► construct ──► callbacks ──► connect server ──► registry.put ──► return
//! no ID       ──► construct ──► callbacks ──► connect server ──────────────────► return
//!                                   │
//!                                   └─ on `initialize`: registry.put(generated ID)
//!
//! close (DELETE / disconnect / shutdown) ──► registry.delete(ID)
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use axum::http::HeaderMap;
use tracing::debug;

use crate::identifiers::SessionId;
use crate::protocol::ServerFactory;

use super::{SessionRegistry, StreamableHttpTransport};

// ============================================================================
// TransportManager
// ============================================================================

/// Builds transports bound to one registry and one server factory.
pub struct TransportManager {
    registry: Arc<SessionRegistry>,
    factory: Arc<dyn ServerFactory>,
    json_response: bool,
}

impl fmt::Debug for TransportManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportManager")
            .field("sessions", &self.registry.len())
            .field("json_response", &self.json_response)
            .finish_non_exhaustive()
    }
}

impl TransportManager {
    /// Creates a manager.
    ///
    /// # Arguments
    ///
    /// * `registry` - Registry the created transports register in
    /// * `factory` - Produces one protocol server per session
    /// * `json_response` - Answer POSTs with JSON bodies instead of SSE
    #[must_use]
    pub fn new(
        registry: Arc<SessionRegistry>,
        factory: Arc<dyn ServerFactory>,
        json_response: bool,
    ) -> Self {
        Self {
            registry,
            factory,
            json_response,
        }
    }

    /// Returns the registry transports are registered in.
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Creates a transport for a new or resumed session.
    ///
    /// With `explicit_id`, the transport is bound to that ID and registered
    /// before this returns. Without it, registration happens when the
    /// transport processes `initialize` and generates its ID.
    ///
    /// # Arguments
    ///
    /// * `explicit_id` - ID the router decided to trust, if any
    /// * `headers` - Headers of the request opening the session, passed to
    ///   the server factory
    pub fn create_transport(
        &self,
        explicit_id: Option<SessionId>,
        headers: &HeaderMap,
    ) -> Arc<StreamableHttpTransport> {
        let transport = match &explicit_id {
            Some(session_id) => Arc::new(StreamableHttpTransport::with_session_id(
                session_id.clone(),
                self.json_response,
            )),
            None => {
                let transport = Arc::new(StreamableHttpTransport::with_id_generator(
                    SessionId::generate,
                    self.json_response,
                ));

                let registry = Arc::downgrade(&self.registry);
                let weak_transport = Arc::downgrade(&transport);
                transport.on_session_initialized(move |session_id| {
                    if let (Some(registry), Some(transport)) =
                        (registry.upgrade(), weak_transport.upgrade())
                    {
                        registry.put(session_id.clone(), transport);
                    }
                });

                transport
            }
        };

        let registry = Arc::downgrade(&self.registry);
        transport.on_close(move |session_id| {
            if let (Some(session_id), Some(registry)) = (session_id, registry.upgrade()) {
                registry.delete(session_id.as_str());
            }
        });

        transport.connect(self.factory.make_server(headers));

        if let Some(session_id) = explicit_id {
            debug!(session_id = %session_id, "Resuming session with client-supplied ID");
            self.registry.put(session_id, Arc::clone(&transport));
        }

        transport
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use axum::body::Bytes;
    use axum::http::{HeaderValue, Method, StatusCode, header};

    use crate::protocol::McpServer;
    use crate::transport::SESSION_ID_HEADER;

    fn manager() -> TransportManager {
        let factory = |_: &HeaderMap| McpServer::new("test", "0");
        TransportManager::new(Arc::new(SessionRegistry::new()), Arc::new(factory), true)
    }

    fn json_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            HeaderValue::from_static("application/json, text/event-stream"),
        );
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        headers
    }

    #[test]
    fn test_explicit_registers_immediately() {
        let manager = manager();
        let id = SessionId::generate();

        let transport = manager.create_transport(Some(id.clone()), &HeaderMap::new());

        assert_eq!(transport.session_id(), Some(id.clone()));
        let registered = manager.registry().get(id.as_str()).expect("registered");
        assert!(Arc::ptr_eq(&registered, &transport));
    }

    #[test]
    fn test_generated_registers_nothing_up_front() {
        let manager = manager();
        let transport = manager.create_transport(None, &HeaderMap::new());

        assert!(transport.session_id().is_none());
        assert!(manager.registry().is_empty());
    }

    #[tokio::test]
    async fn test_generated_registers_on_initialize() {
        let manager = manager();
        let transport = manager.create_transport(None, &HeaderMap::new());

        let body = r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#;
        let response = transport
            .handle_request(&Method::POST, &json_headers(), Bytes::from(body))
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        let id = transport.session_id().expect("assigned");
        assert_eq!(manager.registry().len(), 1);
        assert!(manager.registry().contains(id.as_str()));
    }

    #[test]
    fn test_close_removes_entry() {
        let manager = manager();
        let id = SessionId::generate();
        let transport = manager.create_transport(Some(id.clone()), &HeaderMap::new());

        transport.close();

        assert!(manager.registry().get(id.as_str()).is_none());
    }

    #[test]
    fn test_close_without_id_is_harmless() {
        let manager = manager();
        let other = SessionId::generate();
        let _kept = manager.create_transport(Some(other.clone()), &HeaderMap::new());

        let transport = manager.create_transport(None, &HeaderMap::new());
        transport.close();

        assert_eq!(manager.registry().len(), 1);
        assert!(manager.registry().contains(other.as_str()));
    }

    #[tokio::test]
    async fn test_delete_cascades_to_registry() {
        let manager = manager();
        let id = SessionId::generate();
        let transport = manager.create_transport(Some(id.clone()), &HeaderMap::new());

        let mut headers = json_headers();
        headers.insert(SESSION_ID_HEADER, HeaderValue::from_str(id.as_str()).unwrap());
        let response = transport
            .handle_request(&Method::DELETE, &headers, Bytes::new())
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert!(manager.registry().is_empty());
    }
}
