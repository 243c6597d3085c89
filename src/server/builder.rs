//! Builder pattern for server configuration.
//!
//! # Example
//!
//! ```
//! use chess_mcp_server::McpHttpServer;
//!
//! # fn example() -> chess_mcp_server::Result<()> {
//! let config = McpHttpServer::builder()
//!     .port(8080)
//!     .path("/mcp")
//!     .in_memory()
//!     .build()?;
//! assert_eq!(config.port, 8080);
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Default listen port.
pub const DEFAULT_PORT: u16 = 3000;

/// Default MCP endpoint path.
pub const DEFAULT_PATH: &str = "/mcp";

/// Default data directory for saved games.
pub const DEFAULT_DATA_DIR: &str = "./games";

// ============================================================================
// Storage
// ============================================================================

/// Where session positions are kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Storage {
    /// One FEN file per session under this directory.
    Directory(PathBuf),
    /// Process memory only.
    Memory,
}

impl Default for Storage {
    fn default() -> Self {
        Self::Directory(PathBuf::from(DEFAULT_DATA_DIR))
    }
}

// ============================================================================
// ServerConfig
// ============================================================================

/// Validated server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Address to listen on.
    pub host: IpAddr,
    /// Port to listen on; `0` picks a free port.
    pub port: u16,
    /// Endpoint path, always starting with `/`.
    pub path: String,
    /// Position storage.
    pub storage: Storage,
    /// Answer POSTs with plain JSON instead of SSE.
    pub json_response: bool,
}

impl ServerConfig {
    /// Socket address to bind.
    #[inline]
    #[must_use]
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

// ============================================================================
// ServerBuilder
// ============================================================================

/// Builder for a [`ServerConfig`].
///
/// Use [`McpHttpServer::builder()`](super::McpHttpServer::builder) to create one.
#[derive(Debug, Default, Clone)]
pub struct ServerBuilder {
    host: Option<IpAddr>,
    port: Option<u16>,
    path: Option<String>,
    storage: Option<Storage>,
    json_response: bool,
}

impl ServerBuilder {
    /// Creates a builder with default settings.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the listen address. Defaults to `127.0.0.1`.
    #[inline]
    #[must_use]
    pub fn host(mut self, host: IpAddr) -> Self {
        self.host = Some(host);
        self
    }

    /// Sets the listen port. Defaults to [`DEFAULT_PORT`].
    #[inline]
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Sets the endpoint path. Defaults to [`DEFAULT_PATH`].
    #[inline]
    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Stores positions as files under `dir`.
    #[inline]
    #[must_use]
    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.storage = Some(Storage::Directory(dir.into()));
        self
    }

    /// Keeps positions in memory only.
    #[inline]
    #[must_use]
    pub fn in_memory(mut self) -> Self {
        self.storage = Some(Storage::Memory);
        self
    }

    /// Answers POSTs with JSON bodies instead of SSE streams.
    #[inline]
    #[must_use]
    pub fn json_response(mut self, enabled: bool) -> Self {
        self.json_response = enabled;
        self
    }

    /// Builds the configuration with validation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the path does not start with `/`,
    /// contains whitespace or a query, or if the data directory is empty.
    pub fn build(self) -> Result<ServerConfig> {
        let path = self.validate_path()?;
        let storage = self.validate_storage()?;

        Ok(ServerConfig {
            host: self.host.unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST)),
            port: self.port.unwrap_or(DEFAULT_PORT),
            path,
            storage,
            json_response: self.json_response,
        })
    }
}

// ============================================================================
// Validation
// ============================================================================

impl ServerBuilder {
    fn validate_path(&self) -> Result<String> {
        let path = self.path.as_deref().unwrap_or(DEFAULT_PATH);

        if !path.starts_with('/') {
            return Err(Error::config(format!(
                "Endpoint path must start with '/': {path}"
            )));
        }
        if path.chars().any(|c| c.is_whitespace() || c == '?' || c == '#') {
            return Err(Error::config(format!(
                "Endpoint path must be a plain path without query or whitespace: {path}"
            )));
        }

        Ok(path.to_string())
    }

    fn validate_storage(&self) -> Result<Storage> {
        match self.storage.clone().unwrap_or_default() {
            Storage::Directory(dir) if dir.as_os_str().is_empty() => Err(Error::config(
                "Data directory must not be empty. Use .in_memory() to skip persistence.",
            )),
            storage => Ok(storage),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
