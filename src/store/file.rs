//! Directory-backed position store.
//!
//! Each session's position is one line of FEN in `<dir>/<session-id>.fen`.
//! Saves write a uniquely named temporary file in the same directory and
//! rename it over the target, so a crash never leaves a half-written
//! position behind and concurrent saves never share a temporary file.

// ============================================================================
// Imports
// ============================================================================

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tempfile::NamedTempFile;
use tokio::fs;
use tracing::debug;

use crate::chess::Position;
use crate::error::{Error, Result};
use crate::identifiers::{SessionId, is_valid_session_id};

use super::PositionStore;

// ============================================================================
// FilePositionStore
// ============================================================================

/// Stores positions as FEN files in one directory.
#[derive(Debug, Clone)]
pub struct FilePositionStore {
    dir: PathBuf,
}

impl FilePositionStore {
    /// Opens a store rooted at `dir`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the directory cannot be created.
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).await?;
        debug!(dir = %dir.display(), "Opened position store");
        Ok(Self { dir })
    }

    /// Directory holding the position files.
    #[inline]
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of a session's position file.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSessionId`] if the ID is not canonical, which
    /// keeps every path inside the store directory.
    pub fn path_for(&self, session_id: &SessionId) -> Result<PathBuf> {
        if !is_valid_session_id(session_id.as_str()) {
            return Err(Error::invalid_session_id(session_id.as_str()));
        }
        Ok(self.dir.join(format!("{session_id}.fen")))
    }
}

#[async_trait]
impl PositionStore for FilePositionStore {
    async fn load(&self, session_id: &SessionId) -> Result<Option<Position>> {
        let path = self.path_for(session_id)?;

        let text = match fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        Position::from_fen(text.trim())
            .map(Some)
            .map_err(|e| Error::store(format!("{}: {e}", path.display())))
    }

    async fn save(&self, session_id: &SessionId, position: &Position) -> Result<()> {
        let path = self.path_for(session_id)?;
        let dir = self.dir.clone();
        let target = path.clone();
        let contents = format!("{}\n", position.fen());

        tokio::task::spawn_blocking(move || write_atomically(&dir, &target, &contents))
            .await
            .map_err(|e| Error::store(format!("save task failed: {e}")))??;

        debug!(session_id = %session_id, path = %path.display(), "Saved position");
        Ok(())
    }
}

fn write_atomically(dir: &Path, target: &Path, contents: &str) -> Result<()> {
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(contents.as_bytes())?;
    tmp.persist(target).map_err(|e| e.error)?;
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    fn files_in(dir: &Path) -> Vec<PathBuf> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect()
    }

    async fn store() -> (TempDir, FilePositionStore) {
        let dir = TempDir::new().expect("temp dir");
        let store = FilePositionStore::open(dir.path().join("games"))
            .await
            .expect("open store");
        (dir, store)
    }

    #[tokio::test]
    async fn test_open_creates_directory() {
        let (_guard, store) = store().await;
        assert!(store.dir().is_dir());
    }

    #[tokio::test]
    async fn test_missing_is_none() {
        let (_guard, store) = store().await;
        let loaded = store.load(&SessionId::generate()).await.unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let (_guard, store) = store().await;
        let id = SessionId::generate();
        let position = Position::starting()
            .apply_uci("e2e4")
            .and_then(|p| p.apply_uci("c7c5"))
            .unwrap();

        store.save(&id, &position).await.unwrap();

        let path = store.path_for(&id).unwrap();
        assert!(path.is_file());
        assert_eq!(files_in(store.dir()), vec![path]);
        assert_eq!(store.load(&id).await.unwrap(), Some(position));
    }

    #[tokio::test]
    async fn test_concurrent_saves_same_session() {
        let (_guard, store) = store().await;
        let id = SessionId::generate();
        let positions: Vec<Position> = ["e2e4", "d2d4", "g1f3", "c2c4", "b1c3", "g2g3"]
            .into_iter()
            .map(|uci| Position::starting().apply_uci(uci).unwrap())
            .collect();

        let saves = positions.iter().map(|position| store.save(&id, position));
        for result in futures_util::future::join_all(saves).await {
            result.unwrap();
        }

        let loaded = store.load(&id).await.unwrap().unwrap();
        assert!(positions.contains(&loaded));
        assert_eq!(files_in(store.dir()), vec![store.path_for(&id).unwrap()]);
    }

    #[tokio::test]
    async fn test_save_overwrites() {
        let (_guard, store) = store().await;
        let id = SessionId::generate();

        store.save(&id, &Position::starting()).await.unwrap();
        let moved = Position::starting().apply_uci("g1f3").unwrap();
        store.save(&id, &moved).await.unwrap();

        assert_eq!(store.load(&id).await.unwrap(), Some(moved));
    }

    #[tokio::test]
    async fn test_corrupt_file_is_store_error() {
        let (_guard, store) = store().await;
        let id = SessionId::generate();
        std::fs::write(store.path_for(&id).unwrap(), "not a fen").unwrap();

        let err = store.load(&id).await.unwrap_err();
        assert!(matches!(err, Error::Store { .. }));
    }

    #[tokio::test]
    async fn test_traversal_ids_rejected() {
        let (_guard, store) = store().await;
        let hostile: SessionId = serde_json::from_str("\"../../etc/passwd\"").unwrap();

        assert!(matches!(
            store.path_for(&hostile).unwrap_err(),
            Error::InvalidSessionId { .. }
        ));
        assert!(store.load(&hostile).await.is_err());
        assert!(store.save(&hostile, &Position::starting()).await.is_err());
    }
}
