//! Error types for the documentation hub
//!
//! This module defines the domain errors raised at the I/O seams: fetching
//! descriptors from instances and listing the fleet.

use thiserror::Error;

/// Errors that can occur while fetching from a service instance
#[derive(Error, Debug)]
pub enum FetchError {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status returned by the instance
    #[error("Unexpected status {status} from {url}")]
    Status { status: u16, url: String },

    /// Request timeout
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// Body could not be rendered to text
    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Instance address or resource path could not form a URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl FetchError {
    /// Classify a reqwest error, keeping timeouts distinct
    pub fn from_request(err: reqwest::Error, url: &str) -> Self {
        if err.is_timeout() {
            Self::Timeout(url.to_string())
        } else {
            Self::Http(err)
        }
    }

    /// Whether the next cycle may succeed where this one failed
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Http(_) | Self::Timeout(_) => true,
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            Self::Serialize(_) | Self::InvalidUrl(_) => false,
        }
    }
}

/// Errors that can occur while listing the fleet
#[derive(Error, Debug)]
pub enum DirectoryError {
    /// Registry could not be reached
    #[error("Service registry unavailable: {0}")]
    Unavailable(#[from] reqwest::Error),

    /// Registry answered with a non-success status
    #[error("Service registry returned status {status} for {url}")]
    Status { status: u16, url: String },

    /// Registry answered with an unexpected body
    #[error("Failed to decode registry response: {0}")]
    Decode(String),

    /// Registry URL is malformed
    #[error("Invalid registry URL: {0}")]
    InvalidUrl(String),
}

impl DirectoryError {
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::InvalidUrl(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_display() {
        let err = FetchError::Status {
            status: 503,
            url: "http://orders:8080/swagger-resources".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Unexpected status 503 from http://orders:8080/swagger-resources"
        );
    }

    #[test]
    fn test_fetch_error_recoverable() {
        assert!(FetchError::Timeout("http://a".to_string()).is_recoverable());
        assert!(FetchError::Status { status: 502, url: String::new() }.is_recoverable());
        assert!(!FetchError::Status { status: 404, url: String::new() }.is_recoverable());
        assert!(!FetchError::InvalidUrl("::".to_string()).is_recoverable());
    }

    #[test]
    fn test_directory_error_recoverable() {
        assert!(DirectoryError::Decode("bad".to_string()).is_recoverable());
        assert!(!DirectoryError::InvalidUrl("bad".to_string()).is_recoverable());
    }
}
