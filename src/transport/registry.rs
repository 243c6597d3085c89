//! Session registry.
//!
//! Maps live session IDs to their transports. Owned by one router; several
//! routers in a process each keep their own registry.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │           SessionRegistry               │
//! │  ┌─────────────────────────────────┐    │
//! │  │ 3f2a…c1 → Transport (session A) │    │
//! │  │ 9b07…4e → Transport (session B) │    │
//! │  └─────────────────────────────────┘    │
//! └─────────────────────────────────────────┘
//! ```
//!
//! Entries are added when a session's ID becomes known and removed only by
//! the transport's close callback.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::identifiers::SessionId;

use super::StreamableHttpTransport;

// ============================================================================
// SessionRegistry
// ============================================================================

/// Live session ID → transport mapping.
///
/// Every operation takes the lock once and releases it before returning,
/// so no critical section spans an await point.
#[derive(Default)]
pub struct SessionRegistry {
    entries: RwLock<FxHashMap<SessionId, Arc<StreamableHttpTransport>>>,
}

impl SessionRegistry {
    /// Creates an empty registry.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `transport` under `session_id`, replacing any previous entry.
    pub fn put(&self, session_id: SessionId, transport: Arc<StreamableHttpTransport>) {
        debug!(session_id = %session_id, "Session registered");
        self.entries.write().insert(session_id, transport);
    }

    /// Returns the transport for `session_id`.
    #[must_use]
    pub fn get(&self, session_id: &str) -> Option<Arc<StreamableHttpTransport>> {
        self.entries.read().get(session_id).cloned()
    }

    /// Removes `session_id`. Unknown IDs are ignored.
    pub fn delete(&self, session_id: &str) {
        if self.entries.write().remove(session_id).is_some() {
            debug!(session_id = %session_id, "Session removed from registry");
        }
    }

    /// Returns `true` if `session_id` is registered.
    #[inline]
    #[must_use]
    pub fn contains(&self, session_id: &str) -> bool {
        self.entries.read().contains_key(session_id)
    }

    /// Returns the number of live sessions.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns `true` if no session is registered.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Returns a snapshot of the registered IDs.
    #[must_use]
    pub fn ids(&self) -> Vec<SessionId> {
        self.entries.read().keys().cloned().collect()
    }

    /// Closes every registered transport.
    ///
    /// Each close callback removes its own entry.
    pub fn close_all(&self) {
        // Snapshot first: close callbacks take the write lock.
        let transports: Vec<_> = self.entries.read().values().cloned().collect();
        for transport in transports {
            transport.close();
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn transport() -> Arc<StreamableHttpTransport> {
        Arc::new(StreamableHttpTransport::with_session_id(
            SessionId::generate(),
            false,
        ))
    }

    #[test]
    fn test_new_registry_is_empty() {
        let registry = SessionRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_put_get_delete_round_trip() {
        let registry = SessionRegistry::new();
        let id = SessionId::generate();
        let t = transport();

        registry.put(id.clone(), Arc::clone(&t));
        let found = registry.get(id.as_str()).expect("registered");
        assert!(Arc::ptr_eq(&found, &t));
        assert!(registry.contains(id.as_str()));

        registry.delete(id.as_str());
        assert!(registry.get(id.as_str()).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_put_replaces() {
        let registry = SessionRegistry::new();
        let id = SessionId::generate();
        let second = transport();

        registry.put(id.clone(), transport());
        registry.put(id.clone(), Arc::clone(&second));

        assert_eq!(registry.len(), 1);
        assert!(Arc::ptr_eq(&registry.get(id.as_str()).unwrap(), &second));
    }

    #[test]
    fn test_delete_unknown_is_noop() {
        let registry = SessionRegistry::new();
        registry.put(SessionId::generate(), transport());
        registry.delete("1234");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_ids_snapshot() {
        let registry = SessionRegistry::new();
        let a = SessionId::generate();
        let b = SessionId::generate();
        registry.put(a.clone(), transport());
        registry.put(b.clone(), transport());

        let mut ids = registry.ids();
        ids.sort();
        let mut expected = vec![a, b];
        expected.sort();
        assert_eq!(ids, expected);
    }
}
