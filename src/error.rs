use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised anywhere in the extraction, merge and delete pipeline
#[derive(Debug, Error)]
pub enum ScrapeError {
    /// No foreground page to extract from
    #[error("No active tab found")]
    NoTarget,

    /// The request could not reach the page or its reply never came back
    #[error("{0}")]
    Transport(String),

    /// The page is not one of the supported CRM views
    #[error("No supported view detected")]
    NoSupportedView,

    /// Reading or writing the persisted dataset failed
    #[error("Storage failure: {0}")]
    Storage(String),

    #[error("Invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to launch browser: {0}")]
    LaunchFailed(String),

    #[error("Failed to connect to browser: {0}")]
    ConnectionFailed(String),

    #[error("Tab operation failed: {0}")]
    TabOperationFailed(String),

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    #[error("JavaScript evaluation failed: {0}")]
    EvaluationFailed(String),

    #[error("Failed to capture page snapshot: {0}")]
    SnapshotFailed(String),
}

/// Failure categories reported to callers alongside the message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    NoTarget,
    TransportFailure,
    NoSupportedView,
    StorageFailure,
    Internal,
}

impl ScrapeError {
    /// Map the error onto the category a caller sees
    pub fn kind(&self) -> ErrorKind {
        match self {
            ScrapeError::NoTarget => ErrorKind::NoTarget,
            ScrapeError::Transport(_)
            | ScrapeError::ConnectionFailed(_)
            | ScrapeError::TabOperationFailed(_)
            | ScrapeError::NavigationFailed(_)
            | ScrapeError::EvaluationFailed(_)
            | ScrapeError::SnapshotFailed(_) => ErrorKind::TransportFailure,
            ScrapeError::NoSupportedView => ErrorKind::NoSupportedView,
            ScrapeError::Storage(_) => ErrorKind::StorageFailure,
            ScrapeError::InvalidSelector { .. }
            | ScrapeError::Config(_)
            | ScrapeError::LaunchFailed(_) => ErrorKind::Internal,
        }
    }

    pub(crate) fn storage(context: &str, err: impl std::fmt::Display) -> Self {
        ScrapeError::Storage(format!("{}: {}", context, err))
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, ScrapeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_match_caller_strings() {
        assert_eq!(ScrapeError::NoTarget.to_string(), "No active tab found");
        assert_eq!(
            ScrapeError::NoSupportedView.to_string(),
            "No supported view detected"
        );
        assert_eq!(
            ScrapeError::Storage("disk full".to_string()).to_string(),
            "Storage failure: disk full"
        );
    }

    #[test]
    fn test_kind_mapping() {
        assert_eq!(ScrapeError::NoTarget.kind(), ErrorKind::NoTarget);
        assert_eq!(
            ScrapeError::EvaluationFailed("boom".into()).kind(),
            ErrorKind::TransportFailure
        );
        assert_eq!(
            ScrapeError::Storage("x".into()).kind(),
            ErrorKind::StorageFailure
        );
        assert_eq!(ScrapeError::Config("x".into()).kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_kind_serialization() {
        let json = serde_json::to_string(&ErrorKind::TransportFailure).unwrap();
        assert_eq!(json, "\"transportFailure\"");
    }
}
