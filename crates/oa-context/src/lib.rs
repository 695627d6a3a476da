//! # oa-context — JSON-LD Context Resolution
//!
//! Proof-object documents declare their vocabulary through `@context` URLs.
//! Validating such a document means resolving every one of those URLs, and
//! a batch of documents tends to name the same handful of contexts many
//! times over. This crate makes that cheap and deterministic:
//!
//! - **Cache** (`cache.rs`): a per-URL state machine
//!   (absent → pending → resolved | failed) behind a concurrent map. The
//!   first caller for a URL starts the fetch; everyone else awaits it.
//! - **Loaders** (`loader.rs`): three strategies implementing
//!   [`ContextResolver`]: builtin only, cache on first call, local first.
//! - **Builtins** (`builtin.rs`): the well-known contexts, embedded at
//!   compile time from the crate's `contexts/` tree.
//! - **Transport** (`fetch.rs`): [`ContextFetcher`] and its `reqwest`
//!   implementation.
//! - **Configuration** (`config.rs`): [`LoaderConfig`] from the environment.
//!
//! ## Crate Policy
//!
//! - No global state. Every cache and loader is an explicitly constructed
//!   value; two loaders never share a cache unless handed the same one.
//! - Outcomes are sticky. A URL that failed once keeps failing for the life
//!   of its cache, exactly like a URL that resolved keeps resolving.
//! - Library code never installs a tracing subscriber.

pub mod builtin;
pub mod cache;
pub mod config;
pub mod document;
pub mod error;
pub mod fetch;
pub mod loader;

pub use builtin::BuiltinContexts;
pub use cache::{ContextCache, Lookup, SlotState};
pub use config::{
    build_resolver, build_resolver_with_fetcher, ConfigError, ContextStrategy, LoaderConfig,
};
pub use document::RemoteDocument;
pub use error::{ContextError, FetchError};
pub use fetch::{ContextFetcher, HttpContextFetcher};
pub use loader::{BuiltinOnlyLoader, CacheOnFirstCallLoader, ContextResolver, LocalFirstLoader};
