//! Error types for scanning operations.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Fatal errors that stop a run before traversal starts.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Permission denied for a path.
    #[error("Permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    /// Path not found.
    #[error("Path not found: {path}")]
    NotFound { path: PathBuf },

    /// Generic I/O error.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Root path is not a directory.
    #[error("Root path is not a directory: {path}")]
    NotADirectory { path: PathBuf },

    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ScanError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied { path },
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            _ => Self::Io { path, source },
        }
    }
}

/// Startup configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// More tags than the service accepts.
    #[error("tags accepts up to 8 strings, got {count}")]
    TooManyTags { count: usize },

    /// Worker count that is neither positive nor the unlimited sentinel.
    #[error("invalid max workers '{value}': use a positive number, or -1 for unlimited")]
    InvalidConcurrency { value: String },

    /// Invalid configuration.
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },
}

/// Failures of the external scanning capability.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The scanner could not be reached or reported a failure.
    #[error("scan transport error: {message}")]
    Transport { message: String },

    /// The scanner rejected the credentials.
    #[error("authentication failed: {message}")]
    Authentication { message: String },

    /// The scan call did not finish within the configured timeout.
    #[error("scan timed out after {limit:?}")]
    Timeout { limit: Duration },

    /// Local I/O while talking to the scanner.
    #[error("scanner I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BackendError {
    /// Create a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }
}

/// File-local failures. These are logged and never abort a run.
#[derive(Debug, Error)]
pub enum FileScanError {
    /// File metadata could not be read.
    #[error("cannot stat {path}: {source}")]
    Metadata {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The scan call failed.
    #[error("scan of {path} failed: {source}")]
    Backend {
        path: PathBuf,
        #[source]
        source: BackendError,
    },

    /// The scan call succeeded but its verdict was not valid JSON.
    #[error("Error parsing scan result for file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The run was cancelled while this file waited or was being scanned.
    #[error("scan of {path} cancelled")]
    Cancelled { path: PathBuf },
}

impl FileScanError {
    /// Whether the scan call itself was made before the failure.
    pub fn reached_scanner(&self) -> bool {
        matches!(self, Self::Backend { .. } | Self::Parse { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_error_io() {
        let err = ScanError::io(
            "/test/path",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(matches!(err, ScanError::PermissionDenied { .. }));

        let err = ScanError::io(
            "/test/path",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(matches!(err, ScanError::NotFound { .. }));
    }

    #[test]
    fn test_reached_scanner() {
        let parse = FileScanError::Parse {
            path: "/a".into(),
            source: serde_json::from_str::<u8>("x").unwrap_err(),
        };
        assert!(parse.reached_scanner());

        let cancelled = FileScanError::Cancelled { path: "/a".into() };
        assert!(!cancelled.reached_scanner());
    }
}
