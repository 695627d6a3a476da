//! # Context Loaders
//!
//! Three strategies for turning a context URL into a [`RemoteDocument`]:
//!
//! | Strategy | Source | Unknown URL |
//! |---|---|---|
//! | [`BuiltinOnlyLoader`] | embedded contexts | `NotBuiltIn` |
//! | [`CacheOnFirstCallLoader`] | network, cached; well-known list preloaded on first call | fetched and cached |
//! | [`LocalFirstLoader`] | cache, then `<root>/<host><path>`, then the network | fetched and cached, or failed |
//!
//! The two caching strategies put every source behind the same
//! single-flight cache slot, so a URL is read at most once per cache.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::{Arc, Once};

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info};
use url::Url;

use crate::builtin::BuiltinContexts;
use crate::cache::ContextCache;
use crate::document::RemoteDocument;
use crate::error::{ContextError, FetchError};
use crate::fetch::ContextFetcher;

/// Resolves a JSON-LD context URL.
#[async_trait]
pub trait ContextResolver: Send + Sync {
    /// Resolve `url` to its context document.
    async fn resolve(&self, url: &str) -> Result<RemoteDocument, ContextError>;
}

/// Serves only the embedded contexts.
#[derive(Debug, Clone)]
pub struct BuiltinOnlyLoader {
    builtins: Arc<BuiltinContexts>,
}

impl BuiltinOnlyLoader {
    /// A loader over the crate's embedded contexts.
    ///
    /// # Errors
    ///
    /// Fails only if an embedded context is not valid JSON.
    pub fn new() -> Result<Self, ContextError> {
        Ok(Self::with_builtins(Arc::new(BuiltinContexts::load()?)))
    }

    /// A loader over an already parsed set of builtins.
    pub fn with_builtins(builtins: Arc<BuiltinContexts>) -> Self {
        Self { builtins }
    }
}

#[async_trait]
impl ContextResolver for BuiltinOnlyLoader {
    async fn resolve(&self, url: &str) -> Result<RemoteDocument, ContextError> {
        match self.builtins.get(url) {
            Some(doc) => {
                debug!(url, "builtin context");
                Ok(RemoteDocument::new(url, doc))
            }
            None => Err(ContextError::NotBuiltIn {
                url: url.to_string(),
            }),
        }
    }
}

type FetchFuture = Pin<Box<dyn Future<Output = Result<Value, FetchError>> + Send>>;

fn network_fetch(fetcher: &Arc<dyn ContextFetcher>, url: &str) -> impl FnOnce() -> FetchFuture {
    let fetcher = Arc::clone(fetcher);
    let url = url.to_string();
    move || -> FetchFuture { Box::pin(async move { fetcher.fetch(&url).await }) }
}

/// Fetches on demand and caches every URL; the first call also starts
/// fetching the well-known list in the background.
pub struct CacheOnFirstCallLoader {
    cache: ContextCache,
    fetcher: Arc<dyn ContextFetcher>,
    well_known: Vec<String>,
    preload: Once,
}

impl CacheOnFirstCallLoader {
    /// A loader with a fresh, empty cache.
    pub fn new(fetcher: Arc<dyn ContextFetcher>, well_known: Vec<String>) -> Self {
        Self::with_cache(ContextCache::new(), fetcher, well_known)
    }

    /// A loader over an existing (possibly seeded, possibly shared) cache.
    pub fn with_cache(
        cache: ContextCache,
        fetcher: Arc<dyn ContextFetcher>,
        well_known: Vec<String>,
    ) -> Self {
        Self {
            cache,
            fetcher,
            well_known,
            preload: Once::new(),
        }
    }

    /// The cache this loader fills.
    pub fn cache(&self) -> &ContextCache {
        &self.cache
    }

    fn preload_well_known(&self) {
        self.preload.call_once(|| {
            info!(count = self.well_known.len(), "preloading well-known contexts");
            for url in &self.well_known {
                // Outcomes land in the cache; nobody awaits them here.
                drop(self.cache.begin(url, network_fetch(&self.fetcher, url)));
            }
        });
    }
}

impl std::fmt::Debug for CacheOnFirstCallLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheOnFirstCallLoader")
            .field("cached", &self.cache.len())
            .field("well_known", &self.well_known)
            .field("preloaded", &self.preload.is_completed())
            .finish()
    }
}

#[async_trait]
impl ContextResolver for CacheOnFirstCallLoader {
    async fn resolve(&self, url: &str) -> Result<RemoteDocument, ContextError> {
        self.preload_well_known();
        let doc = self
            .cache
            .get_or_fetch(url, network_fetch(&self.fetcher, url))
            .await?;
        Ok(RemoteDocument::new(url, doc))
    }
}

/// Maps a context URL to `<root>/<host><path>`.
///
/// # Errors
///
/// Returns `FetchError::InvalidUrl` if the URL does not parse or has no host.
pub fn local_path(root: &Path, url: &str) -> Result<PathBuf, FetchError> {
    let invalid = |reason: String| FetchError::InvalidUrl {
        url: url.to_string(),
        reason,
    };
    let parsed = Url::parse(url).map_err(|e| invalid(e.to_string()))?;
    let host = parsed
        .host_str()
        .ok_or_else(|| invalid("URL has no host".to_string()))?;
    let mut path = root.join(host);
    for segment in parsed.path().split('/').filter(|s| !s.is_empty()) {
        if segment == ".." || segment == "." {
            return Err(invalid("dot segment in path".to_string()));
        }
        path.push(segment);
    }
    Ok(path)
}

async fn read_local_then_fetch(
    root: PathBuf,
    url: String,
    fetcher: Option<Arc<dyn ContextFetcher>>,
) -> Result<Value, FetchError> {
    let path = local_path(&root, &url)?;
    match tokio::fs::read_to_string(&path).await {
        Ok(raw) => {
            debug!(url = %url, path = %path.display(), "local context");
            serde_json::from_str(&raw).map_err(|e| FetchError::Parse { url, source: e })
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => match fetcher {
            Some(fetcher) => {
                debug!(url = %url, "no local copy, fetching");
                fetcher.fetch(&url).await
            }
            None => Err(FetchError::Io { path, source: e }),
        },
        Err(e) => Err(FetchError::Io { path, source: e }),
    }
}

/// Looks for a context on disk before going to the network.
pub struct LocalFirstLoader {
    cache: ContextCache,
    root: PathBuf,
    fetcher: Option<Arc<dyn ContextFetcher>>,
}

impl LocalFirstLoader {
    /// A loader reading `<root>/<host><path>`, with no network fallback.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            cache: ContextCache::new(),
            root: root.into(),
            fetcher: None,
        }
    }

    /// Fall back to `fetcher` when no local copy exists.
    pub fn with_fetcher(mut self, fetcher: Arc<dyn ContextFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Use an existing cache.
    pub fn with_cache(mut self, cache: ContextCache) -> Self {
        self.cache = cache;
        self
    }

    /// The local context directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The cache this loader fills.
    pub fn cache(&self) -> &ContextCache {
        &self.cache
    }
}

impl std::fmt::Debug for LocalFirstLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalFirstLoader")
            .field("root", &self.root)
            .field("cached", &self.cache.len())
            .field("network", &self.fetcher.is_some())
            .finish()
    }
}

#[async_trait]
impl ContextResolver for LocalFirstLoader {
    async fn resolve(&self, url: &str) -> Result<RemoteDocument, ContextError> {
        let root = self.root.clone();
        let owned = url.to_string();
        let fetcher = self.fetcher.clone();
        let doc = self
            .cache
            .get_or_fetch(url, move || read_local_then_fetch(root, owned, fetcher))
            .await?;
        Ok(RemoteDocument::new(url, doc))
    }
}
