//! Error types module
//!
//! `AppError` covers failures the host or the CLI has to report: configuration
//! problems, collaborator store failures and bootstrap errors. Adapter-level
//! failures stay in `cloudbridge_storage::StorageError` and are collapsed before
//! they reach this layer.

use std::io;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like bad input
    Debug,
    /// Warning level - for recoverable issues
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata describing how an error should be reported
pub trait ErrorMetadata {
    /// Machine-readable error code (e.g., "CONFIG_ERROR")
    fn error_code(&self) -> &'static str;

    /// Whether repeating the operation may succeed
    fn is_recoverable(&self) -> bool;

    /// Process exit code for command-line front ends
    fn exit_code(&self) -> i32;

    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for AppError {
    fn from(err: io::Error) -> Self {
        AppError::Internal(format!("IO error: {}", err))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

/// Static metadata for each variant: (error_code, recoverable, exit_code, log_level).
fn app_error_static_metadata(err: &AppError) -> (&'static str, bool, i32, LogLevel) {
    match err {
        AppError::Config(_) => ("CONFIG_ERROR", false, 78, LogLevel::Error),
        AppError::Storage(_) => ("STORAGE_ERROR", true, 74, LogLevel::Warn),
        AppError::InvalidInput(_) => ("INVALID_INPUT", false, 64, LogLevel::Debug),
        AppError::NotFound(_) => ("NOT_FOUND", false, 66, LogLevel::Debug),
        AppError::Internal(_) | AppError::InternalWithSource { .. } => {
            ("INTERNAL_ERROR", true, 70, LogLevel::Error)
        }
    }
}

impl AppError {
    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for AppError {
    fn error_code(&self) -> &'static str {
        app_error_static_metadata(self).0
    }

    fn is_recoverable(&self) -> bool {
        app_error_static_metadata(self).1
    }

    fn exit_code(&self) -> i32 {
        app_error_static_metadata(self).2
    }

    fn log_level(&self) -> LogLevel {
        app_error_static_metadata(self).3
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_metadata_config() {
        let err = AppError::Config("CLOUDBRIDGE_LOCAL_ROOT must be set".to_string());
        assert_eq!(err.error_code(), "CONFIG_ERROR");
        assert!(!err.is_recoverable());
        assert_eq!(err.exit_code(), 78);
        assert_eq!(err.log_level(), LogLevel::Error);
    }

    #[test]
    fn test_error_metadata_storage_is_recoverable() {
        let err = AppError::Storage("1 backend connection test(s) failed".to_string());
        assert!(err.is_recoverable());
        assert_eq!(err.exit_code(), 74);
        assert_eq!(err.log_level(), LogLevel::Warn);
    }

    #[test]
    fn test_error_metadata_not_found() {
        let err = AppError::NotFound("asset".to_string());
        assert_eq!(err.error_code(), "NOT_FOUND");
        assert_eq!(err.log_level(), LogLevel::Debug);
    }

    #[test]
    fn test_detailed_message_includes_source_chain() {
        let source = anyhow::anyhow!("disk full").context("writing metadata");
        let err = AppError::from(source);
        let details = err.detailed_message();
        assert!(details.starts_with("Internal error with source"));
        assert!(details.contains("Caused by: writing metadata"));
    }
}
