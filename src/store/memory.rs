//! In-memory position store.

use async_trait::async_trait;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use crate::chess::Position;
use crate::error::Result;
use crate::identifiers::SessionId;

use super::PositionStore;

/// Keeps positions in a map for the lifetime of the process.
#[derive(Debug, Default)]
pub struct MemoryPositionStore {
    positions: Mutex<FxHashMap<SessionId, Position>>,
}

impl MemoryPositionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sessions with a saved position.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.positions.lock().len()
    }

    /// Returns `true` if nothing has been saved.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.lock().is_empty()
    }
}

#[async_trait]
impl PositionStore for MemoryPositionStore {
    async fn load(&self, session_id: &SessionId) -> Result<Option<Position>> {
        Ok(self.positions.lock().get(session_id).cloned())
    }

    async fn save(&self, session_id: &SessionId, position: &Position) -> Result<()> {
        self.positions
            .lock()
            .insert(session_id.clone(), position.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_then_load() {
        let store = MemoryPositionStore::new();
        let id = SessionId::generate();
        assert!(store.load(&id).await.unwrap().is_none());

        let position = Position::starting().apply_uci("e2e4").unwrap();
        store.save(&id, &position).await.unwrap();

        assert_eq!(store.load(&id).await.unwrap(), Some(position));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let store = MemoryPositionStore::new();
        let a = SessionId::generate();
        let b = SessionId::generate();

        store
            .save(&a, &Position::starting().apply_uci("d2d4").unwrap())
            .await
            .unwrap();

        assert!(store.load(&b).await.unwrap().is_none());
    }
}
