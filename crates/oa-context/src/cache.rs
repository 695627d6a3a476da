//! # Context Cache
//!
//! A concurrent map from context URL to the state of that URL's fetch:
//!
//! ```text
//! absent ──begin──▶ pending ──fetch ok──▶ resolved
//!                          └─fetch err──▶ failed
//! ```
//!
//! The transition out of *absent* happens under the map's entry lock, so of
//! any number of concurrent callers exactly one starts a fetch. The fetch
//! runs as its own tokio task: it completes and records its outcome even if
//! every caller that was waiting on it has been dropped.
//!
//! *Resolved* and *failed* are terminal. There is no eviction and no retry.
//! A fetch task that ends without an outcome (the fetch panicked, or the
//! runtime dropped the task) leaves the slot *failed* with
//! `FetchError::Abandoned`.
//!
//! `begin` spawns onto the current tokio runtime and must be called from
//! within one.

use std::future::Future;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::{ContextError, FetchError};

type Outcome = Result<Arc<Value>, ContextError>;

#[derive(Debug, Clone)]
enum Slot {
    Pending(watch::Receiver<Option<Outcome>>),
    Resolved(Arc<Value>),
    Failed(ContextError),
}

/// Observable state of one cache slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// A fetch is in flight.
    Pending,
    /// The context was fetched and parsed.
    Resolved,
    /// The fetch failed; the failure is kept.
    Failed,
}

/// Handle on a cached or in-flight context.
#[derive(Debug)]
pub enum Lookup {
    /// The outcome was already known.
    Ready(Outcome),
    /// A fetch is in flight.
    Waiting {
        /// The URL being fetched.
        url: String,
        /// Receives the outcome once the fetch task records it.
        rx: watch::Receiver<Option<Outcome>>,
    },
}

impl Lookup {
    /// Wait for the outcome.
    pub async fn wait(self) -> Outcome {
        match self {
            Self::Ready(outcome) => outcome,
            Self::Waiting { url, mut rx } => {
                let outcome = match rx.wait_for(Option::is_some).await {
                    Ok(current) => current.clone(),
                    Err(_) => None,
                };
                outcome.unwrap_or_else(|| {
                    Err(ContextError::resolution_failed(
                        &url,
                        FetchError::Abandoned { url: url.clone() },
                    ))
                })
            }
        }
    }
}

/// Writes a fetch outcome into its slot exactly once. Dropped without an
/// outcome, it records `FetchError::Abandoned`.
struct Recorder {
    slots: Arc<DashMap<String, Slot>>,
    url: String,
    tx: Option<watch::Sender<Option<Outcome>>>,
}

impl Recorder {
    fn record(&mut self, outcome: Outcome) {
        let Some(tx) = self.tx.take() else {
            return;
        };
        let slot = match &outcome {
            Ok(doc) => Slot::Resolved(Arc::clone(doc)),
            Err(err) => Slot::Failed(err.clone()),
        };
        self.slots.insert(self.url.clone(), slot);
        tx.send_replace(Some(outcome));
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        if self.tx.is_some() {
            warn!(url = %self.url, "context fetch ended without an outcome");
            let abandoned = FetchError::Abandoned {
                url: self.url.clone(),
            };
            let err = ContextError::resolution_failed(&self.url, abandoned);
            self.record(Err(err));
        }
    }
}

/// A cloneable handle on a shared context cache.
///
/// Clones share the same slots.
#[derive(Debug, Clone, Default)]
pub struct ContextCache {
    slots: Arc<DashMap<String, Slot>>,
}

impl ContextCache {
    /// An empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of URLs in any state.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns true if no URL has been seen.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// State of the slot for `url`, or `None` if the URL is absent.
    pub fn state(&self, url: &str) -> Option<SlotState> {
        self.slots.get(url).map(|slot| match slot.value() {
            Slot::Pending(_) => SlotState::Pending,
            Slot::Resolved(_) => SlotState::Resolved,
            Slot::Failed(_) => SlotState::Failed,
        })
    }

    /// Seed an already known document. Returns false (and changes nothing)
    /// if the URL is already present in any state.
    pub fn insert_resolved(&self, url: &str, document: impl Into<Arc<Value>>) -> bool {
        match self.slots.entry(url.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(Slot::Resolved(document.into()));
                true
            }
        }
    }

    /// Look up `url`, starting a fetch with `fetch` if the URL is absent.
    ///
    /// `fetch` is only called when this call is the one that moves the slot
    /// out of *absent*.
    pub fn begin<F, Fut>(&self, url: &str, fetch: F) -> Lookup
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, FetchError>> + Send + 'static,
    {
        let (tx, rx) = match self.slots.entry(url.to_string()) {
            Entry::Occupied(slot) => {
                return match slot.get() {
                    Slot::Resolved(doc) => {
                        debug!(url, "context cache hit");
                        Lookup::Ready(Ok(Arc::clone(doc)))
                    }
                    Slot::Failed(err) => {
                        debug!(url, "context cache hit (failed)");
                        Lookup::Ready(Err(err.clone()))
                    }
                    Slot::Pending(rx) => {
                        debug!(url, "joining in-flight context fetch");
                        Lookup::Waiting {
                            url: url.to_string(),
                            rx: rx.clone(),
                        }
                    }
                };
            }
            Entry::Vacant(slot) => {
                let (tx, rx) = watch::channel(None);
                slot.insert(Slot::Pending(rx.clone()));
                (tx, rx)
            }
        };

        let mut recorder = Recorder {
            slots: Arc::clone(&self.slots),
            url: url.to_string(),
            tx: Some(tx),
        };
        let fut = fetch();
        tokio::spawn(async move {
            info!(url = %recorder.url, "fetching context");
            let outcome = match fut.await {
                Ok(doc) => {
                    info!(url = %recorder.url, "context resolved");
                    Ok(Arc::new(doc))
                }
                Err(e) => {
                    warn!(url = %recorder.url, error = %e, "context fetch failed");
                    Err(ContextError::resolution_failed(&recorder.url, e))
                }
            };
            recorder.record(outcome);
        });

        Lookup::Waiting {
            url: url.to_string(),
            rx,
        }
    }

    /// Resolve `url` through the cache, fetching it with `fetch` on a miss.
    pub async fn get_or_fetch<F, Fut>(&self, url: &str, fetch: F) -> Outcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, FetchError>> + Send + 'static,
    {
        self.begin(url, fetch).wait().await
    }
}
