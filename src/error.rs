// src/error.rs
//! Error types for the walk tracker

use std::fmt;

pub type Result<T> = std::result::Result<T, TrackerError>;

#[derive(Debug)]
pub enum TrackerError {
    Io(std::io::Error),
    Json(serde_json::Error),
    Connection(String),
    Parse(String),
    Timeout(String),
    Unavailable(String),
    PermissionDenied(String),
    Other(String),
}

/// Reportable category of a fix-source failure, carried on error events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    PermissionDenied,
    Unavailable,
    Timeout,
    Unknown,
}

impl TrackerError {
    /// Collapse the error into the category surfaced to collaborators.
    pub fn category(&self) -> ErrorCategory {
        match self {
            TrackerError::PermissionDenied(_) => ErrorCategory::PermissionDenied,
            TrackerError::Timeout(_) => ErrorCategory::Timeout,
            TrackerError::Unavailable(_)
            | TrackerError::Connection(_)
            | TrackerError::Io(_) => ErrorCategory::Unavailable,
            TrackerError::Json(_) | TrackerError::Parse(_) | TrackerError::Other(_) => {
                ErrorCategory::Unknown
            }
        }
    }
}

impl fmt::Display for TrackerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackerError::Io(e) => write!(f, "IO error: {}", e),
            TrackerError::Json(e) => write!(f, "JSON error: {}", e),
            TrackerError::Connection(msg) => write!(f, "Connection error: {}", msg),
            TrackerError::Parse(msg) => write!(f, "Parse error: {}", msg),
            TrackerError::Timeout(msg) => write!(f, "Timeout: {}", msg),
            TrackerError::Unavailable(msg) => write!(f, "Location unavailable: {}", msg),
            TrackerError::PermissionDenied(msg) => write!(f, "Permission denied: {}", msg),
            TrackerError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorCategory::PermissionDenied => "permission-denied",
            ErrorCategory::Unavailable => "unavailable",
            ErrorCategory::Timeout => "timeout",
            ErrorCategory::Unknown => "unknown",
        };
        write!(f, "{}", name)
    }
}

impl std::error::Error for TrackerError {}

impl From<std::io::Error> for TrackerError {
    fn from(error: std::io::Error) -> Self {
        TrackerError::Io(error)
    }
}

impl From<serde_json::Error> for TrackerError {
    fn from(error: serde_json::Error) -> Self {
        TrackerError::Json(error)
    }
}

impl From<anyhow::Error> for TrackerError {
    fn from(error: anyhow::Error) -> Self {
        TrackerError::Other(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sensor_failure_categories() {
        let denied = TrackerError::PermissionDenied("user refused".to_string());
        assert_eq!(denied.category(), ErrorCategory::PermissionDenied);

        let timeout = TrackerError::Timeout("no fix within 10s".to_string());
        assert_eq!(timeout.category(), ErrorCategory::Timeout);

        let refused = TrackerError::Connection("connection refused".to_string());
        assert_eq!(refused.category(), ErrorCategory::Unavailable);

        let parse = TrackerError::Parse("bad line".to_string());
        assert_eq!(parse.category(), ErrorCategory::Unknown);
    }

    #[test]
    fn test_category_display() {
        assert_eq!(ErrorCategory::PermissionDenied.to_string(), "permission-denied");
        assert_eq!(ErrorCategory::Timeout.to_string(), "timeout");
    }
}
