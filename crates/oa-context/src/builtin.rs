//! # Builtin Contexts
//!
//! The well-known contexts compiled into the binary. Files live under the
//! crate's `contexts/<host>/<path>` tree, which is also the layout the
//! local-first loader reads at runtime, so the tree doubles as a ready-made
//! local context directory.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::error::{ContextError, FetchError};

/// W3C Verifiable Credentials v1.
pub const CREDENTIALS_V1: &str = "https://www.w3.org/2018/credentials/v1";
/// W3C Verifiable Credentials examples v1.
pub const CREDENTIALS_EXAMPLES_V1: &str = "https://www.w3.org/2018/credentials/examples/v1";
/// ODRL vocabulary, imported by the credentials examples context.
pub const ODRL: &str = "https://www.w3.org/ns/odrl.jsonld";
/// OpenAttestation v3 vocabulary.
pub const OPEN_ATTESTATION_V3: &str =
    "https://schemata.openattestation.com/com/openattestation/1.0/OpenAttestation.v3.json";
/// Sample custom context (`reference`, `validFrom`, `name`).
pub const CUSTOM_CONTEXT: &str =
    "https://schemata.openattestation.com/com/openattestation/1.0/CustomContext.json";
/// Sample driving licence credential context.
pub const DRIVING_LICENCE_CREDENTIAL: &str =
    "https://schemata.openattestation.com/com/openattestation/1.0/DrivingLicenceCredential.json";

const EMBEDDED: &[(&str, &str)] = &[
    (
        CREDENTIALS_V1,
        include_str!("../contexts/www.w3.org/2018/credentials/v1"),
    ),
    (
        CREDENTIALS_EXAMPLES_V1,
        include_str!("../contexts/www.w3.org/2018/credentials/examples/v1"),
    ),
    (ODRL, include_str!("../contexts/www.w3.org/ns/odrl.jsonld")),
    (
        OPEN_ATTESTATION_V3,
        include_str!(
            "../contexts/schemata.openattestation.com/com/openattestation/1.0/OpenAttestation.v3.json"
        ),
    ),
    (
        CUSTOM_CONTEXT,
        include_str!(
            "../contexts/schemata.openattestation.com/com/openattestation/1.0/CustomContext.json"
        ),
    ),
    (
        DRIVING_LICENCE_CREDENTIAL,
        include_str!(
            "../contexts/schemata.openattestation.com/com/openattestation/1.0/DrivingLicenceCredential.json"
        ),
    ),
];

/// The embedded contexts, parsed once.
#[derive(Debug, Clone)]
pub struct BuiltinContexts {
    docs: HashMap<&'static str, Arc<Value>>,
}

impl BuiltinContexts {
    /// Parse every embedded context.
    ///
    /// # Errors
    ///
    /// Returns `ContextError::ResolutionFailed` naming the first embedded
    /// context that is not valid JSON.
    pub fn load() -> Result<Self, ContextError> {
        let mut docs = HashMap::with_capacity(EMBEDDED.len());
        for (url, raw) in EMBEDDED {
            let doc: Value = serde_json::from_str(raw).map_err(|e| {
                ContextError::resolution_failed(
                    url,
                    FetchError::Parse {
                        url: (*url).to_string(),
                        source: e,
                    },
                )
            })?;
            docs.insert(*url, Arc::new(doc));
        }
        Ok(Self { docs })
    }

    /// Look up an embedded context.
    pub fn get(&self, url: &str) -> Option<Arc<Value>> {
        self.docs.get(url).cloned()
    }

    /// Returns true if `url` is embedded.
    pub fn contains(&self, url: &str) -> bool {
        self.docs.contains_key(url)
    }

    /// The embedded URLs, sorted.
    pub fn urls(&self) -> Vec<&'static str> {
        let mut urls: Vec<&'static str> = self.docs.keys().copied().collect();
        urls.sort_unstable();
        urls
    }
}
