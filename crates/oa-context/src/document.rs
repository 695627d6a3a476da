//! The value a context resolver hands back for a URL.

use std::sync::Arc;

use serde_json::Value;

/// A resolved JSON-LD context document.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteDocument {
    /// Context URL announced through a `Link` header. Never set by the
    /// loaders in this crate.
    pub context_url: Option<String>,
    /// The parsed document. Shared with the cache that produced it.
    pub document: Arc<Value>,
    /// The URL the document was requested under.
    pub document_url: String,
}

impl RemoteDocument {
    /// A document resolved directly under `url`.
    pub fn new(url: &str, document: Arc<Value>) -> Self {
        Self {
            context_url: None,
            document,
            document_url: url.to_string(),
        }
    }

    /// The document's `@context` member, if it has one.
    pub fn context(&self) -> Option<&Value> {
        self.document.get("@context")
    }
}
