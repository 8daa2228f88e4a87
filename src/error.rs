//! Error types for NetCopy
//!
//! This module defines the error type shared by the client, the server
//! and the local copier, plus small helpers for attaching path context
//! to I/O failures.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for NetCopy operations
#[derive(Error, Debug)]
pub enum NetCopyError {
    /// I/O error during file operations
    #[error("I/O error at '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File or directory not found
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// A relative path that cannot be used on the wire or on disk
    #[error("Invalid relative path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// Network connection error
    #[error("Connection error to '{host}': {message}")]
    ConnectionError { host: String, message: String },

    /// Connectivity probe did not get the expected reply
    #[error("Connectivity probe to '{host}' failed: {message}")]
    ProbeFailed { host: String, message: String },

    /// The peer sent something the line protocol does not allow
    #[error("Protocol error: {0}")]
    ProtocolError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Worker thread could not be started or panicked
    #[error("Thread pool error: {0}")]
    ThreadPoolError(String),

    /// Summary serialization failed
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl NetCopyError {
    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a connection error
    pub fn connection(host: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConnectionError {
            host: host.into(),
            message: message.into(),
        }
    }

    /// Create a probe failure
    pub fn probe(host: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ProbeFailed {
            host: host.into(),
            message: message.into(),
        }
    }

    /// Create an invalid path error
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError(message.into())
    }

    /// Whether this error must abort the whole run rather than one file
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::ConfigError(_) | Self::ProbeFailed { .. })
    }

    /// Get the path associated with this error, if any
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::Io { path, .. } | Self::NotFound(path) => Some(path),
            _ => None,
        }
    }
}

/// Result type alias for NetCopy operations
pub type Result<T> = std::result::Result<T, NetCopyError>;

impl From<std::io::Error> for NetCopyError {
    fn from(err: std::io::Error) -> Self {
        NetCopyError::Io {
            path: PathBuf::new(),
            source: err,
        }
    }
}

impl From<serde_json::Error> for NetCopyError {
    fn from(err: serde_json::Error) -> Self {
        NetCopyError::SerializationError(err.to_string())
    }
}

/// Extension trait for adding path context to std::io::Result
pub trait IoResultExt<T> {
    /// Add path context to an I/O error
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|e| NetCopyError::io(path, e))
    }
}
