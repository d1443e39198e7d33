//! Unified error handling for the docshub crate
//!
//! Each subsystem keeps its own error type; [`Error`] wraps them all so the
//! binary and library users can deal with a single type at the edges.
//!
//! - [`HubErrorTrait`] - Common interface implemented by all error types
//! - [`ErrorCategory`] - Classification of errors for handling strategies
//! - [`Error`] - Unified error enum wrapping all domain-specific errors
//!
//! # Usage
//!
//! ```rust
//! use docshub::error::{Error, ErrorCategory, HubErrorTrait};
//!
//! let err = Error::config("refresh.interval_secs must be greater than 0");
//! assert_eq!(err.category(), ErrorCategory::Config);
//! assert!(!err.is_recoverable());
//! ```

use std::io;
use thiserror::Error;

pub use crate::hub::ServerError;
pub use crate::utils::error::{DirectoryError, FetchError};

/// Common trait for all docshub error types
pub trait HubErrorTrait: std::error::Error {
    /// Check if a later attempt (usually the next refresh cycle) may succeed
    fn is_recoverable(&self) -> bool;

    /// Get the error category for handling strategies
    fn category(&self) -> ErrorCategory;
}

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Instance unreachable, timeout, non-success status
    Network,
    /// Fleet directory could not be listed
    Directory,
    /// Body could not be decoded or rendered
    Serialization,
    /// Configuration and validation errors
    Config,
    /// HTTP server errors (bind, serve)
    Server,
    /// Other/unknown errors
    Other,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Directory => "directory",
            Self::Serialization => "serialization",
            Self::Config => "config",
            Self::Server => "server",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl HubErrorTrait for FetchError {
    fn is_recoverable(&self) -> bool {
        FetchError::is_recoverable(self)
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Serialize(_) => ErrorCategory::Serialization,
            Self::InvalidUrl(_) => ErrorCategory::Config,
            Self::Http(_) | Self::Status { .. } | Self::Timeout(_) => ErrorCategory::Network,
        }
    }
}

impl HubErrorTrait for DirectoryError {
    fn is_recoverable(&self) -> bool {
        DirectoryError::is_recoverable(self)
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidUrl(_) => ErrorCategory::Config,
            Self::Decode(_) => ErrorCategory::Serialization,
            Self::Unavailable(_) | Self::Status { .. } => ErrorCategory::Directory,
        }
    }
}

/// Unified error type for the docshub crate
#[derive(Error, Debug)]
pub enum Error {
    /// Descriptor fetch errors
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Fleet directory errors
    #[error("Directory error: {0}")]
    Directory(#[from] DirectoryError),

    /// HTTP server errors
    #[error("Server error: {0}")]
    Server(#[from] ServerError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors
    #[error("Config error: {0}")]
    Config(String),

    /// Generic error with context
    #[error("{context}")]
    Other {
        context: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl HubErrorTrait for Error {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Fetch(e) => HubErrorTrait::is_recoverable(e),
            Self::Directory(e) => HubErrorTrait::is_recoverable(e),
            Self::Server(_) => false,
            Self::Io(_) => true,
            Self::Json(_) => false,
            Self::Config(_) => false,
            Self::Other { .. } => false,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Fetch(e) => e.category(),
            Self::Directory(e) => e.category(),
            Self::Server(ServerError::ConfigError(_)) => ErrorCategory::Config,
            Self::Server(_) => ErrorCategory::Server,
            Self::Io(_) => ErrorCategory::Other,
            Self::Json(_) => ErrorCategory::Serialization,
            Self::Config(_) => ErrorCategory::Config,
            Self::Other { .. } => ErrorCategory::Other,
        }
    }
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a generic error with context
    pub fn other(context: impl Into<String>) -> Self {
        Self::Other {
            context: context.into(),
            source: None,
        }
    }

    /// Create a generic error with context and source
    pub fn with_source(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Other {
            context: context.into(),
            source: Some(Box::new(source)),
        }
    }
}

// Conversion from anyhow::Error
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other {
            context: format!("{err:#}"),
            source: None,
        }
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
