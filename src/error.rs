//! Error handling for the resumable sort

use std::io;
use thiserror::Error;

/// Custom error type for sort operations
#[derive(Error, Debug)]
pub enum SortError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Permission denied: {file}")]
    PermissionDenied { file: String },

    #[error("No such file or directory: {file}")]
    FileNotFound { file: String },

    #[error("Is a directory: {file}")]
    IsDirectory { file: String },

    #[error("Invalid sort state: {reason}")]
    InvalidState { reason: String },

    #[error("Protocol violation: {message}")]
    ProtocolViolation { message: String },

    #[error("Truncated checkpoint: needed {needed} bytes, found {found}")]
    Truncated { needed: usize, found: usize },

    #[error("Conflicting sort options: {message}")]
    ConflictingOptions { message: String },

    #[error("Step limit of {limit} exceeded before the sort finished")]
    StepLimitExceeded { limit: u64 },

    #[error("Thread pool error: {message}")]
    ThreadPoolError { message: String },

    #[error("Parse error: {message}")]
    ParseError { message: String },
}

impl SortError {
    /// Returns the appropriate exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            SortError::PermissionDenied { .. }
            | SortError::FileNotFound { .. }
            | SortError::IsDirectory { .. }
            | SortError::Truncated { .. }
            | SortError::Io(_) => crate::SORT_FAILURE,

            _ => crate::EXIT_FAILURE,
        }
    }

    /// Create a permission denied error
    pub fn permission_denied(file: &str) -> Self {
        SortError::PermissionDenied {
            file: file.to_string(),
        }
    }

    /// Create a file not found error
    pub fn file_not_found(file: &str) -> Self {
        SortError::FileNotFound {
            file: file.to_string(),
        }
    }

    /// Create an is directory error
    pub fn is_directory(file: &str) -> Self {
        SortError::IsDirectory {
            file: file.to_string(),
        }
    }

    /// Create an invalid state error
    pub fn invalid_state(reason: &str) -> Self {
        SortError::InvalidState {
            reason: reason.to_string(),
        }
    }

    /// Create a protocol violation error
    pub fn protocol_violation(message: &str) -> Self {
        SortError::ProtocolViolation {
            message: message.to_string(),
        }
    }

    /// Create a truncated checkpoint error
    pub fn truncated(needed: usize, found: usize) -> Self {
        SortError::Truncated { needed, found }
    }

    /// Create a conflicting options error
    pub fn conflicting_options(message: &str) -> Self {
        SortError::ConflictingOptions {
            message: message.to_string(),
        }
    }

    /// Create a step limit error
    pub fn step_limit_exceeded(limit: u64) -> Self {
        SortError::StepLimitExceeded { limit }
    }

    /// Create a thread pool error
    pub fn thread_pool_error(message: &str) -> Self {
        SortError::ThreadPoolError {
            message: message.to_string(),
        }
    }

    /// Create a parse error
    pub fn parse_error(message: &str) -> Self {
        SortError::ParseError {
            message: message.to_string(),
        }
    }

    /// True for failures caused by a malformed state value
    pub fn is_invalid_state(&self) -> bool {
        matches!(self, SortError::InvalidState { .. })
    }

    /// True when the caller advanced without supplying an owed comparison
    pub fn is_protocol_violation(&self) -> bool {
        matches!(self, SortError::ProtocolViolation { .. })
    }
}

/// Result type for sort operations
pub type SortResult<T> = Result<T, SortError>;

/// Context trait for adding context to errors
pub trait SortContext<T> {
    fn with_context<F>(self, f: F) -> SortResult<T>
    where
        F: FnOnce() -> String;

    fn with_file_context(self, filename: &str) -> SortResult<T>;
}

impl<T> SortContext<T> for SortResult<T> {
    fn with_context<F>(self, f: F) -> SortResult<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|err| match err {
            SortError::Io(io_err) => SortError::Io(io::Error::new(
                io_err.kind(),
                format!("{}: {}", f(), io_err),
            )),
            other => other,
        })
    }

    fn with_file_context(self, filename: &str) -> SortResult<T> {
        self.map_err(|err| match err {
            SortError::Io(io_err) => file_error(io_err, filename),
            other => other,
        })
    }
}

impl<T> SortContext<T> for Result<T, io::Error> {
    fn with_context<F>(self, f: F) -> SortResult<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|io_err| {
            SortError::Io(io::Error::new(
                io_err.kind(),
                format!("{}: {}", f(), io_err),
            ))
        })
    }

    fn with_file_context(self, filename: &str) -> SortResult<T> {
        self.map_err(|io_err| file_error(io_err, filename))
    }
}

fn file_error(io_err: io::Error, filename: &str) -> SortError {
    match io_err.kind() {
        io::ErrorKind::PermissionDenied => SortError::permission_denied(filename),
        io::ErrorKind::NotFound => SortError::file_not_found(filename),
        _ if std::path::Path::new(filename).is_dir() => SortError::is_directory(filename),
        _ => SortError::Io(io::Error::new(
            io_err.kind(),
            format!("{}: {}", filename, io_err),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(SortError::file_not_found("x").exit_code(), crate::SORT_FAILURE);
        assert_eq!(SortError::truncated(40, 3).exit_code(), crate::SORT_FAILURE);
        assert_eq!(SortError::invalid_state("n is zero").exit_code(), crate::EXIT_FAILURE);
        assert_eq!(
            SortError::protocol_violation("owed").exit_code(),
            crate::EXIT_FAILURE
        );
    }

    #[test]
    fn test_file_context_maps_not_found() {
        let result: Result<(), io::Error> =
            Err(io::Error::new(io::ErrorKind::NotFound, "gone"));
        match result.with_file_context("state.bin") {
            Err(SortError::FileNotFound { file }) => assert_eq!(file, "state.bin"),
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn test_with_context_keeps_non_io_errors() {
        let result: SortResult<()> = Err(SortError::invalid_state("bad"));
        let mapped = result.with_context(|| "loading".to_string());
        assert!(matches!(mapped, Err(e) if e.is_invalid_state()));
    }
}
