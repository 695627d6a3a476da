//! # Context Transport
//!
//! [`ContextFetcher`] is the seam between the loaders and the network. The
//! production implementation, [`HttpContextFetcher`], is a thin `reqwest`
//! client; tests substitute in-process fetchers that count their calls.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use serde_json::Value;
use tracing::debug;

use crate::error::FetchError;

/// Media types accepted when fetching a context.
pub const CONTEXT_ACCEPT: &str = "application/ld+json, application/json";

/// Fetches the raw JSON of a context URL.
#[async_trait]
pub trait ContextFetcher: Send + Sync {
    /// Fetch and parse the document at `url`.
    async fn fetch(&self, url: &str) -> Result<Value, FetchError>;
}

/// Fetches contexts over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpContextFetcher {
    http: reqwest::Client,
}

impl HttpContextFetcher {
    /// Build a fetcher with the given request timeout.
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Http` if the HTTP client cannot be initialized.
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers({
                let mut headers = HeaderMap::new();
                headers.insert(ACCEPT, HeaderValue::from_static(CONTEXT_ACCEPT));
                headers
            })
            .build()
            .map_err(|e| FetchError::Http {
                url: "client_init".into(),
                source: e,
            })?;
        Ok(Self { http })
    }

    /// Wrap an existing client. Its default headers are used as they are.
    pub fn with_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl ContextFetcher for HttpContextFetcher {
    async fn fetch(&self, url: &str) -> Result<Value, FetchError> {
        debug!(url, "GET context");
        let resp = self.http.get(url).send().await.map_err(|e| FetchError::Http {
            url: url.to_string(),
            source: e,
        })?;

        if !resp.status().is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: resp.status().as_u16(),
            });
        }

        let body = resp.text().await.map_err(|e| FetchError::Http {
            url: url.to_string(),
            source: e,
        })?;
        serde_json::from_str(&body).map_err(|e| FetchError::Parse {
            url: url.to_string(),
            source: e,
        })
    }
}
