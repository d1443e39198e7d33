//! Common utilities and helper functions
//!
//! This module provides shared utilities used across the application.

pub mod error;

use url::Url;

use error::FetchError;

/// Join an instance base URI and a relative path.
///
/// The path is appended verbatim (query string included), so a base that
/// carries a context path such as `http://host:8080/orders` keeps it.
pub fn join_url(base: &str, path: &str) -> Result<Url, FetchError> {
    let base = base.trim_end_matches('/');
    let full = if path.is_empty() {
        base.to_string()
    } else if path.starts_with('/') {
        format!("{base}{path}")
    } else {
        format!("{base}/{path}")
    };

    Url::parse(&full).map_err(|e| FetchError::InvalidUrl(format!("{full}: {e}")))
}
