//! Context loader configuration.
//!
//! Defaults match the contexts a typical proof-object document names.
//! Override via environment variables or explicit construction for tests.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use url::Url;

use crate::builtin::{
    BuiltinContexts, CREDENTIALS_EXAMPLES_V1, CREDENTIALS_V1, CUSTOM_CONTEXT,
    DRIVING_LICENCE_CREDENTIAL, OPEN_ATTESTATION_V3,
};
use crate::cache::ContextCache;
use crate::error::{ContextError, FetchError};
use crate::fetch::{ContextFetcher, HttpContextFetcher};
use crate::loader::{BuiltinOnlyLoader, CacheOnFirstCallLoader, ContextResolver, LocalFirstLoader};

/// Contexts fetched on the first call of the lazy strategy.
pub const DEFAULT_WELL_KNOWN_CONTEXTS: [&str; 5] = [
    CREDENTIALS_V1,
    CREDENTIALS_EXAMPLES_V1,
    DRIVING_LICENCE_CREDENTIAL,
    OPEN_ATTESTATION_V3,
    CUSTOM_CONTEXT,
];

/// Configuration shared by the context loaders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderConfig {
    /// URLs the lazy strategy preloads on its first call.
    pub well_known_contexts: Vec<String>,
    /// Root of the `<host>/<path>` tree read by the local-first strategy.
    pub local_root: PathBuf,
    /// Network request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self::new("contexts")
    }
}

impl LoaderConfig {
    /// Default settings with an explicit local context directory.
    pub fn new(local_root: impl Into<PathBuf>) -> Self {
        Self {
            well_known_contexts: DEFAULT_WELL_KNOWN_CONTEXTS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            local_root: local_root.into(),
            timeout_secs: 30,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `OA_CONTEXT_DIR` (default: `contexts`)
    /// - `OA_CONTEXT_TIMEOUT_SECS` (default: 30)
    /// - `OA_WELL_KNOWN_CONTEXTS` (comma-separated URLs; default: the five
    ///   well-known contexts)
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for a non-numeric or zero timeout or a
    /// well-known entry that is not an absolute URL.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::new(
            std::env::var("OA_CONTEXT_DIR").unwrap_or_else(|_| "contexts".to_string()),
        );
        if let Ok(raw) = std::env::var("OA_CONTEXT_TIMEOUT_SECS") {
            config.timeout_secs = parse_timeout("OA_CONTEXT_TIMEOUT_SECS", &raw)?;
        }
        if let Ok(raw) = std::env::var("OA_WELL_KNOWN_CONTEXTS") {
            config.well_known_contexts = parse_url_list("OA_WELL_KNOWN_CONTEXTS", &raw)?;
        }
        Ok(config)
    }

    /// Request timeout as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn parse_timeout(var: &str, raw: &str) -> Result<u64, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(0) | Err(_) => Err(ConfigError::InvalidTimeout(var.to_string(), raw.to_string())),
        Ok(secs) => Ok(secs),
    }
}

fn parse_url_list(var: &str, raw: &str) -> Result<Vec<String>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            Url::parse(s)
                .map(|_| s.to_string())
                .map_err(|e| ConfigError::InvalidUrl(var.to_string(), format!("{s}: {e}")))
        })
        .collect()
}

/// Which loader strategy to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ContextStrategy {
    /// Embedded contexts only.
    BuiltinOnly,
    /// Network with a cache, preloading the well-known list.
    #[default]
    CacheOnFirstCall,
    /// Local directory first, network as fallback.
    LocalFirst,
}

impl FromStr for ContextStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "builtin-only" => Ok(Self::BuiltinOnly),
            "cache-on-first-call" => Ok(Self::CacheOnFirstCall),
            "local-first" => Ok(Self::LocalFirst),
            other => Err(ConfigError::UnknownStrategy(other.to_string())),
        }
    }
}

/// Build a resolver for `strategy` from `config`.
///
/// # Errors
///
/// Returns `ConfigError::HttpClient` if the HTTP client cannot be built and
/// `ConfigError::Builtin` if an embedded context fails to parse.
pub fn build_resolver(
    strategy: ContextStrategy,
    config: &LoaderConfig,
) -> Result<Arc<dyn ContextResolver>, ConfigError> {
    if strategy == ContextStrategy::BuiltinOnly {
        return Ok(Arc::new(BuiltinOnlyLoader::new()?));
    }
    let fetcher = Arc::new(HttpContextFetcher::new(config.timeout())?);
    build_resolver_with_fetcher(strategy, config, fetcher)
}

/// Build a resolver for `strategy` that reaches the network through
/// `fetcher`.
///
/// The caching strategies start from a cache seeded with every builtin
/// context, so builtins resolve without network or disk access. The lazy
/// strategy leaves its well-known URLs unseeded; its first call fetches
/// them.
///
/// # Errors
///
/// Returns `ConfigError::Builtin` if an embedded context fails to parse.
pub fn build_resolver_with_fetcher(
    strategy: ContextStrategy,
    config: &LoaderConfig,
    fetcher: Arc<dyn ContextFetcher>,
) -> Result<Arc<dyn ContextResolver>, ConfigError> {
    let builtins = Arc::new(BuiltinContexts::load()?);
    let resolver: Arc<dyn ContextResolver> = match strategy {
        ContextStrategy::BuiltinOnly => Arc::new(BuiltinOnlyLoader::with_builtins(builtins)),
        ContextStrategy::CacheOnFirstCall => Arc::new(CacheOnFirstCallLoader::with_cache(
            seeded_cache(&builtins, &config.well_known_contexts),
            fetcher,
            config.well_known_contexts.clone(),
        )),
        ContextStrategy::LocalFirst => Arc::new(
            LocalFirstLoader::new(config.local_root.clone())
                .with_fetcher(fetcher)
                .with_cache(seeded_cache(&builtins, &[])),
        ),
    };
    Ok(resolver)
}

/// A cache holding every builtin context except the URLs in `skip`.
fn seeded_cache(builtins: &BuiltinContexts, skip: &[String]) -> ContextCache {
    let cache = ContextCache::new();
    for url in builtins.urls() {
        if skip.iter().any(|s| s == url) {
            continue;
        }
        if let Some(doc) = builtins.get(url) {
            cache.insert_resolved(url, doc);
        }
    }
    cache
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid timeout for {0}: {1}")]
    InvalidTimeout(String, String),
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    #[error("unknown context strategy '{0}'")]
    UnknownStrategy(String),
    #[error("cannot build HTTP client: {0}")]
    HttpClient(#[from] FetchError),
    #[error("cannot load builtin contexts: {0}")]
    Builtin(#[from] ContextError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_lists_five_well_known_contexts() {
        let cfg = LoaderConfig::default();
        assert_eq!(cfg.well_known_contexts.len(), 5);
        assert_eq!(cfg.local_root, PathBuf::from("contexts"));
        assert_eq!(cfg.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn timeout_must_be_positive_integer() {
        assert_eq!(parse_timeout("T", "12").unwrap(), 12);
        assert!(parse_timeout("T", "0").is_err());
        assert!(parse_timeout("T", "soon").is_err());
    }

    #[test]
    fn url_list_is_trimmed_and_validated() {
        let urls = parse_url_list("V", " https://a.example/x , https://b.example/y,").unwrap();
        assert_eq!(urls, vec!["https://a.example/x", "https://b.example/y"]);
        assert!(parse_url_list("V", "https://ok.example, not a url").is_err());
    }

    #[test]
    fn from_env_reads_overrides() {
        std::env::set_var("OA_CONTEXT_DIR", "/tmp/oa-contexts-test");
        std::env::set_var("OA_CONTEXT_TIMEOUT_SECS", "7");
        std::env::set_var("OA_WELL_KNOWN_CONTEXTS", "https://example.com/ctx");
        let cfg = LoaderConfig::from_env();
        std::env::remove_var("OA_CONTEXT_DIR");
        std::env::remove_var("OA_CONTEXT_TIMEOUT_SECS");
        std::env::remove_var("OA_WELL_KNOWN_CONTEXTS");
        let cfg = cfg.unwrap();
        assert_eq!(cfg.local_root, PathBuf::from("/tmp/oa-contexts-test"));
        assert_eq!(cfg.timeout_secs, 7);
        assert_eq!(cfg.well_known_contexts, vec!["https://example.com/ctx"]);
    }

    #[test]
    fn strategy_names_parse() {
        assert_eq!("builtin-only".parse::<ContextStrategy>().unwrap(), ContextStrategy::BuiltinOnly);
        assert_eq!("local-first".parse::<ContextStrategy>().unwrap(), ContextStrategy::LocalFirst);
        assert!("eager".parse::<ContextStrategy>().is_err());
    }

    #[test]
    fn builtin_strategy_builds_without_network() {
        assert!(build_resolver(ContextStrategy::BuiltinOnly, &LoaderConfig::default()).is_ok());
    }

    #[test]
    fn seeded_cache_skips_listed_urls() {
        let builtins = BuiltinContexts::load().unwrap();
        let cache = seeded_cache(&builtins, &LoaderConfig::default().well_known_contexts);
        assert_eq!(cache.len(), builtins.urls().len() - 5);
        assert_eq!(cache.state(crate::builtin::ODRL), Some(crate::cache::SlotState::Resolved));
        assert_eq!(cache.state(CREDENTIALS_V1), None);
        assert_eq!(seeded_cache(&builtins, &[]).len(), builtins.urls().len());
    }
}
