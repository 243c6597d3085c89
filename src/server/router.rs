//! Session request router.
//!
//! Decides, for every inbound request, which transport handles it.
//!
//! # Decision Table
//!
//! Evaluated in order, first match wins:
//!
//! | Method | Session ID | Condition | Route |
//! |--------|------------|-----------|-------|
//! | POST/GET | present | registered | [`Route::Resume`] |
//! | POST/GET | absent | body is `initialize` | [`Route::FreshInit`] |
//! | POST/GET | present | unregistered, valid | [`Route::FreshExplicit`] |
//! | POST/GET | any | otherwise | [`Route::RejectUnroutable`] (404) |
//! | DELETE | present | registered | [`Route::Teardown`] |
//! | DELETE | any | otherwise | [`Route::InvalidTeardown`] (400) |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use axum::body::Bytes;
use axum::http::{HeaderMap, Method};
use axum::response::{IntoResponse, Response};
use tracing::{debug, warn};

use crate::identifiers::{SessionId, is_valid_session_id};
use crate::protocol::{ServerFactory, is_initialize_body};
use crate::transport::{
    HttpError, SESSION_ID_HEADER, SessionRegistry, StreamableHttpTransport, TransportManager,
    collect_headers, extract_session_id,
};

// ============================================================================
// Route
// ============================================================================

/// Outcome of classifying one request.
pub enum Route {
    /// Existing session; forward to its transport.
    Resume(Arc<StreamableHttpTransport>),
    /// New session; the transport generates the ID on `initialize`.
    FreshInit,
    /// New transport bound to a client-supplied, valid, unregistered ID.
    FreshExplicit(SessionId),
    /// No transport can take this request.
    RejectUnroutable,
    /// DELETE of a registered session.
    Teardown(Arc<StreamableHttpTransport>),
    /// DELETE without a registered session; carries the presented ID.
    InvalidTeardown(Option<String>),
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resume(t) => f.debug_tuple("Resume").field(&t.session_id()).finish(),
            Self::FreshInit => f.write_str("FreshInit"),
            Self::FreshExplicit(id) => f.debug_tuple("FreshExplicit").field(id).finish(),
            Self::RejectUnroutable => f.write_str("RejectUnroutable"),
            Self::Teardown(t) => f.debug_tuple("Teardown").field(&t.session_id()).finish(),
            Self::InvalidTeardown(id) => f.debug_tuple("InvalidTeardown").field(id).finish(),
        }
    }
}

// ============================================================================
// SessionRouter
// ============================================================================

/// Routes HTTP requests to per-session transports.
///
/// Owns its registry, so several routers can coexist in one process.
pub struct SessionRouter {
    manager: TransportManager,
}

impl fmt::Debug for SessionRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionRouter")
            .field("manager", &self.manager)
            .finish()
    }
}

impl SessionRouter {
    /// Creates a router with an empty registry.
    ///
    /// # Arguments
    ///
    /// * `factory` - Produces one protocol server per session
    /// * `json_response` - Answer POSTs with JSON bodies instead of SSE
    #[must_use]
    pub fn new(factory: impl ServerFactory, json_response: bool) -> Self {
        let registry = Arc::new(SessionRegistry::new());
        Self {
            manager: TransportManager::new(registry, Arc::new(factory), json_response),
        }
    }

    /// Returns the live session registry.
    #[inline]
    #[must_use]
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        self.manager.registry()
    }

    /// Classifies a request.
    ///
    /// # Arguments
    ///
    /// * `method` - HTTP method
    /// * `session_id` - Extracted session header value, if any
    /// * `is_initialize` - Whether the body holds an `initialize` request
    #[must_use]
    pub fn classify(&self, method: &Method, session_id: Option<&str>, is_initialize: bool) -> Route {
        let registered = session_id.and_then(|id| self.registry().get(id));

        if *method == Method::DELETE {
            return match registered {
                Some(transport) => Route::Teardown(transport),
                None => Route::InvalidTeardown(session_id.map(str::to_string)),
            };
        }

        if *method != Method::POST && *method != Method::GET {
            return Route::RejectUnroutable;
        }

        if let Some(transport) = registered {
            return Route::Resume(transport);
        }

        match session_id {
            None if is_initialize => Route::FreshInit,
            Some(id) if is_valid_session_id(id) => match SessionId::parse(id) {
                Ok(session_id) => Route::FreshExplicit(session_id),
                Err(_) => Route::RejectUnroutable,
            },
            _ => Route::RejectUnroutable,
        }
    }

    /// Handles one HTTP request.
    pub async fn handle(&self, method: Method, headers: HeaderMap, body: Bytes) -> Response {
        let session_id = extract_session_id(&collect_headers(&headers), SESSION_ID_HEADER);
        let is_initialize = method == Method::POST && is_initialize_body(&body);

        let route = self.classify(&method, session_id.as_deref(), is_initialize);
        debug!(%method, session_id = ?session_id, route = ?route, "Routing request");

        match route {
            Route::Resume(transport) | Route::Teardown(transport) => {
                transport.handle_request(&method, &headers, body).await
            }
            Route::FreshInit => {
                let transport = self.manager.create_transport(None, &headers);
                transport.handle_request(&method, &headers, body).await
            }
            Route::FreshExplicit(session_id) => {
                let transport = self.manager.create_transport(Some(session_id), &headers);
                transport.handle_request(&method, &headers, body).await
            }
            Route::RejectUnroutable => {
                warn!(%method, session_id = ?session_id, "No valid session for request");
                HttpError::unroutable().into_response()
            }
            Route::InvalidTeardown(presented) => {
                warn!(session_id = ?presented, "DELETE for unknown session");
                HttpError::invalid_teardown(presented.as_deref()).into_response()
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use axum::http::HeaderMap;

    use crate::protocol::McpServer;

    fn router() -> SessionRouter {
        SessionRouter::new(|_: &HeaderMap| McpServer::new("test", "0"), true)
    }

    #[test]
    fn test_post_without_id_initialize_is_fresh() {
        let router = router();
        assert!(matches!(
            router.classify(&Method::POST, None, true),
            Route::FreshInit
        ));
    }

    #[test]
    fn test_post_without_id_non_initialize_is_rejected() {
        let router = router();
        assert!(matches!(
            router.classify(&Method::POST, None, false),
            Route::RejectUnroutable
        ));
    }

    #[test]
    fn test_registered_id_resumes() {
        let router = router();
        let id = SessionId::generate();
        let _transport = router
            .manager
            .create_transport(Some(id.clone()), &HeaderMap::new());

        assert!(matches!(
            router.classify(&Method::POST, Some(id.as_str()), false),
            Route::Resume(_)
        ));
        // A registered ID wins even when the body is an initializer.
        assert!(matches!(
            router.classify(&Method::GET, Some(id.as_str()), true),
            Route::Resume(_)
        ));
    }

    #[test]
    fn test_unregistered_valid_id_is_explicit() {
        let router = router();
        let id = "123e4567-e89b-42d3-a456-426614174000";
        match router.classify(&Method::GET, Some(id), false) {
            Route::FreshExplicit(session_id) => assert_eq!(session_id.as_str(), id),
            other => panic!("expected FreshExplicit, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_id_is_rejected_even_with_initialize() {
        let router = router();
        assert!(matches!(
            router.classify(&Method::POST, Some("1234"), true),
            Route::RejectUnroutable
        ));
    }

    #[test]
    fn test_delete_routes() {
        let router = router();
        let id = SessionId::generate();
        let _transport = router
            .manager
            .create_transport(Some(id.clone()), &HeaderMap::new());

        assert!(matches!(
            router.classify(&Method::DELETE, Some(id.as_str()), false),
            Route::Teardown(_)
        ));
        assert!(matches!(
            router.classify(&Method::DELETE, Some("1234"), false),
            Route::InvalidTeardown(Some(ref presented)) if presented == "1234"
        ));
        assert!(matches!(
            router.classify(&Method::DELETE, None, false),
            Route::InvalidTeardown(None)
        ));
    }

    #[test]
    fn test_other_methods_rejected() {
        let router = router();
        assert!(matches!(
            router.classify(&Method::PUT, None, true),
            Route::RejectUnroutable
        ));
    }

    #[test]
    fn test_routers_do_not_share_registries() {
        let a = router();
        let b = router();
        let id = SessionId::generate();
        let _transport = a.manager.create_transport(Some(id.clone()), &HeaderMap::new());

        assert!(a.registry().contains(id.as_str()));
        assert!(!b.registry().contains(id.as_str()));
    }
}
