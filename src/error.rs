//! Error types for CopyBench
//!
//! Setup failures (configuration, fixtures, runtime) surface as
//! [`BenchError`]. Per-task copy failures are wrapped in [`CopyError`] and
//! travel as data inside a benchmark run instead of being propagated.

use crate::core::CopyTask;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for CopyBench operations
#[derive(Error, Debug)]
pub enum BenchError {
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

    /// A copy task could not be constructed
    #[error("Invalid copy task: {0}")]
    InvalidTask(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Two strategies registered under the same name
    #[error("Strategy '{0}' is already registered")]
    DuplicateStrategy(String),

    /// Lookup of a strategy name that was never registered
    #[error("Unknown strategy: {0}")]
    UnknownStrategy(String),

    /// A strategy invocation panicked
    #[error("Strategy panicked: {0}")]
    StrategyPanicked(String),

    /// Thread pool error
    #[error("Thread pool error: {0}")]
    ThreadPool(String),

    /// Async runtime error
    #[error("Runtime error: {0}")]
    Runtime(String),
}

impl BenchError {
    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Check if the underlying cause is a missing file
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::Io { source, .. } => source.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }

    /// Get the path associated with this error, if any
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::Io { path, .. } | Self::NotFound(path) => Some(path),
            _ => None,
        }
    }
}

/// Result type alias for CopyBench operations
pub type Result<T> = std::result::Result<T, BenchError>;

impl From<std::io::Error> for BenchError {
    fn from(err: std::io::Error) -> Self {
        BenchError::Io {
            path: PathBuf::new(),
            source: err,
        }
    }
}

impl From<serde_json::Error> for BenchError {
    fn from(err: serde_json::Error) -> Self {
        BenchError::Config(err.to_string())
    }
}

/// Failure of one copy task under one strategy
#[derive(Error, Debug)]
#[error("copy '{}' -> '{}' failed: {cause}", .task.source.display(), .task.destination.display())]
pub struct CopyError {
    /// The task that failed
    pub task: CopyTask,
    /// Underlying cause
    #[source]
    pub cause: BenchError,
}

impl CopyError {
    /// Wrap a cause with the task it belongs to
    pub fn new(task: CopyTask, cause: BenchError) -> Self {
        Self { task, cause }
    }
}

/// Extension trait for adding path context to std::io::Result
pub trait IoResultExt<T> {
    /// Add path context to an I/O error
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|e| BenchError::io(path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_with_path() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = BenchError::io("/test/path", io_err);
        assert!(err.is_not_found());
        assert_eq!(err.path().unwrap(), &PathBuf::from("/test/path"));
    }

    #[test]
    fn test_with_path_extension() {
        let result: std::io::Result<()> = Err(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "denied",
        ));
        let err = result.with_path("/locked").unwrap_err();
        assert!(!err.is_not_found());
        assert!(err.to_string().contains("/locked"));
    }

    #[test]
    fn test_copy_error_display() {
        let task = CopyTask::new("/src/a.bin", "/dst/a.bin").unwrap();
        let err = CopyError::new(task, BenchError::NotFound(PathBuf::from("/src/a.bin")));
        let message = err.to_string();
        assert!(message.contains("/src/a.bin"));
        assert!(message.contains("/dst/a.bin"));
        assert!(message.contains("Path not found"));
    }
}
