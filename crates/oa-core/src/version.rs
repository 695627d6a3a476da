//! # Schema Versions
//!
//! The two document schema generations. The version tag alone never decides
//! how a document is read (recognition is structural, see `oa-document`),
//! but it selects which schema a raw document is validated against and is
//! stamped onto wrapped flat-salt documents.

use serde::{Deserialize, Serialize};

/// A supported document schema generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SchemaVersion {
    /// Flat-salt documents: salted `data` payload plus a `signature` object.
    #[serde(rename = "https://schema.openattestation.com/2.0/schema.json")]
    V2,
    /// Proof-object documents: JSON-LD credential plus a `proof` object.
    #[serde(rename = "https://schema.openattestation.com/3.0/schema.json")]
    V3,
}

impl SchemaVersion {
    /// The schema identifier URI.
    pub fn id(&self) -> &'static str {
        match self {
            Self::V2 => "https://schema.openattestation.com/2.0/schema.json",
            Self::V3 => "https://schema.openattestation.com/3.0/schema.json",
        }
    }

    /// Filename of the JSON Schema that validates raw documents of this version.
    pub fn schema_name(&self) -> &'static str {
        match self {
            Self::V2 => "flat-salt.schema.json",
            Self::V3 => "proof-object.schema.json",
        }
    }
}

impl std::fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}
