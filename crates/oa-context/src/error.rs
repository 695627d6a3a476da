//! # Error Types
//!
//! [`FetchError`] describes why one attempt to obtain a context failed.
//! [`ContextError`] is what resolvers hand back; it is `Clone` because a
//! single failed fetch is reported to every caller waiting on that URL.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

/// Failure of a single context fetch, from disk or from the network.
#[derive(Error, Debug)]
pub enum FetchError {
    /// HTTP transport error.
    #[error("HTTP error fetching {url}: {source}")]
    Http {
        /// The URL being fetched (or `client_init` when building the client).
        url: String,
        /// Underlying transport error.
        source: reqwest::Error,
    },

    /// The server answered with a non-2xx status.
    #[error("{url} returned HTTP {status}")]
    Status {
        /// The URL being fetched.
        url: String,
        /// Response status code.
        status: u16,
    },

    /// A local context file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        /// Local file path derived from the URL.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// The fetched body was not JSON.
    #[error("context {url} is not valid JSON: {source}")]
    Parse {
        /// The URL being fetched.
        url: String,
        /// Parser error.
        source: serde_json::Error,
    },

    /// The URL could not be mapped to a fetchable location.
    #[error("invalid context URL {url}: {reason}")]
    InvalidUrl {
        /// The offending URL.
        url: String,
        /// What was wrong with it.
        reason: String,
    },

    /// The fetch task ended without recording an outcome.
    #[error("fetch of {url} ended without an outcome")]
    Abandoned {
        /// The URL being fetched.
        url: String,
    },
}

/// Failure to resolve a context URL.
#[derive(Error, Debug, Clone)]
pub enum ContextError {
    /// The builtin-only strategy was asked for a URL it does not embed.
    #[error("context {url} is not built in")]
    NotBuiltIn {
        /// The requested URL.
        url: String,
    },

    /// Fetching the context failed. Shared by every caller of the URL.
    #[error("failed to resolve context {url}: {source}")]
    ResolutionFailed {
        /// The requested URL.
        url: String,
        /// The fetch failure.
        source: Arc<FetchError>,
    },
}

impl ContextError {
    /// The URL this error is about.
    pub fn url(&self) -> &str {
        match self {
            Self::NotBuiltIn { url } | Self::ResolutionFailed { url, .. } => url,
        }
    }

    pub(crate) fn resolution_failed(url: &str, source: FetchError) -> Self {
        Self::ResolutionFailed {
            url: url.to_string(),
            source: Arc::new(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_built_in_message() {
        let err = ContextError::NotBuiltIn {
            url: "https://example.com/ctx".to_string(),
        };
        assert_eq!(err.to_string(), "context https://example.com/ctx is not built in");
        assert_eq!(err.url(), "https://example.com/ctx");
    }

    #[test]
    fn test_resolution_failed_keeps_source() {
        let err = ContextError::resolution_failed(
            "https://example.com/ctx",
            FetchError::Status {
                url: "https://example.com/ctx".to_string(),
                status: 404,
            },
        );
        let cloned = err.clone();
        assert!(cloned.to_string().contains("HTTP 404"));
        assert!(std::error::Error::source(&cloned).is_some());
    }
}
