//! # Schema Validation
//!
//! Raw documents are checked against JSON Schema (Draft 2020-12) before they
//! are wrapped. A failing document is never salted or hashed; the error
//! carries every violation and the document itself.
//!
//! Schemas are compiled once, when the [`SchemaValidator`] is built. Cross
//! schema `$ref`s resolve against the loaded set only, keyed by `$id` and by
//! filename. A `$ref` outside that set fails compilation instead of reaching
//! the network.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};

use jsonschema::{Retrieve, Uri, Validator};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use oa_context::ContextError;

const FLAT_SALT_SCHEMA: &str = include_str!("../schemas/flat-salt.schema.json");
const PROOF_OBJECT_SCHEMA: &str = include_str!("../schemas/proof-object.schema.json");

/// Suffix that marks a file in a schema directory as a schema.
const SCHEMA_SUFFIX: &str = ".schema.json";

/// Error from schema loading or document validation.
#[derive(Error, Debug)]
pub enum SchemaValidationError {
    /// The document did not conform to the schema (or to its `@context`).
    #[error("document rejected by '{schema_name}':\n{violations}")]
    ValidationFailed {
        /// Schema the document was checked against.
        schema_name: String,
        /// Every violation found.
        violations: ValidationViolations,
        /// The rejected document.
        document: Box<Value>,
    },

    /// A `@context` could not be resolved.
    #[error(transparent)]
    Context(#[from] ContextError),

    /// A schema source is not valid JSON.
    #[error("cannot parse schema '{schema_name}': {reason}")]
    SchemaLoadError {
        /// Filename of the schema.
        schema_name: String,
        /// Parser message.
        reason: String,
    },

    /// A schema parsed but could not be compiled.
    #[error("cannot compile schema '{schema_name}': {reason}")]
    ValidatorBuildError {
        /// Filename of the schema.
        schema_name: String,
        /// Compiler message.
        reason: String,
    },

    /// No schema of that name is loaded.
    #[error("unknown schema '{schema_name}'")]
    UnknownSchema {
        /// The requested filename.
        schema_name: String,
    },

    /// A schema directory or file could not be read.
    #[error("cannot read '{}': {source}", path.display())]
    Io {
        /// The directory or file.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
}

impl SchemaValidationError {
    /// The violations, if this is a validation failure.
    pub fn violations(&self) -> Option<&ValidationViolations> {
        match self {
            Self::ValidationFailed { violations, .. } => Some(violations),
            _ => None,
        }
    }
}

/// One reason a document was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// JSON Pointer to the offending part of the document (`""` for the root).
    pub instance_path: String,
    /// JSON Pointer into the schema, or `@context` for JSON-LD term violations.
    pub schema_path: String,
    /// What was wrong.
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let at = if self.instance_path.is_empty() {
            "/"
        } else {
            self.instance_path.as_str()
        };
        write!(f, "  {at}: {} [{}]", self.message, self.schema_path)
    }
}

/// The violations of one rejected document, in discovery order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationViolations(Vec<Violation>);

impl ValidationViolations {
    /// Collect violations.
    pub fn new(violations: Vec<Violation>) -> Self {
        Self(violations)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// All violations.
    pub fn violations(&self) -> &[Violation] {
        &self.0
    }

    /// Instance paths of all violations.
    pub fn instance_paths(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|v| v.instance_path.as_str())
    }
}

impl fmt::Display for ValidationViolations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lines: Vec<String> = self.0.iter().map(Violation::to_string).collect();
        f.write_str(&lines.join("\n"))
    }
}

/// Serves `$ref`s from the loaded schemas.
struct LoadedSchemas(HashMap<String, Value>);

impl Retrieve for LoadedSchemas {
    fn retrieve(
        &self,
        uri: &Uri<&str>,
    ) -> Result<Value, Box<dyn std::error::Error + Send + Sync>> {
        let uri = uri.as_str();
        let filename = uri.rsplit('/').next().unwrap_or(uri);
        self.0
            .get(uri)
            .or_else(|| self.0.get(filename))
            .cloned()
            .ok_or_else(|| format!("'{uri}' is not among the loaded schemas").into())
    }
}

/// Where a validator's schemas came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaOrigin {
    /// The schemas compiled into this crate.
    Embedded,
    /// Every `*.schema.json` in a directory.
    Directory(PathBuf),
}

/// Compiled schemas, by filename.
pub struct SchemaValidator {
    origin: SchemaOrigin,
    sources: BTreeMap<String, Value>,
    compiled: HashMap<String, Validator>,
}

impl fmt::Debug for SchemaValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaValidator")
            .field("origin", &self.origin)
            .field("schemas", &self.schema_names())
            .finish()
    }
}

fn parse_schema(name: &str, source: &str) -> Result<Value, SchemaValidationError> {
    serde_json::from_str(source).map_err(|e| SchemaValidationError::SchemaLoadError {
        schema_name: name.to_string(),
        reason: e.to_string(),
    })
}

impl SchemaValidator {
    /// `flat-salt.schema.json` and `proof-object.schema.json`.
    ///
    /// # Errors
    ///
    /// `SchemaLoadError` or `ValidatorBuildError` if an embedded schema is
    /// broken.
    pub fn builtin() -> Result<Self, SchemaValidationError> {
        let sources: BTreeMap<String, Value> = [
            ("flat-salt.schema.json", FLAT_SALT_SCHEMA),
            ("proof-object.schema.json", PROOF_OBJECT_SCHEMA),
        ]
        .into_iter()
        .map(|(name, source)| parse_schema(name, source).map(|schema| (name.to_string(), schema)))
        .collect::<Result<_, _>>()?;
        Self::compile(SchemaOrigin::Embedded, sources)
    }

    /// Every `*.schema.json` file directly inside `dir`.
    ///
    /// # Errors
    ///
    /// `Io` if the directory or a file cannot be read; `SchemaLoadError` or
    /// `ValidatorBuildError` for a broken schema.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self, SchemaValidationError> {
        let dir = dir.as_ref().to_path_buf();
        let io = |path: &Path| {
            let path = path.to_path_buf();
            move |source| SchemaValidationError::Io { path, source }
        };

        let mut sources = BTreeMap::new();
        for entry in std::fs::read_dir(&dir).map_err(io(&dir))? {
            let path = entry.map_err(io(&dir))?.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !name.ends_with(SCHEMA_SUFFIX) {
                continue;
            }
            let source = std::fs::read_to_string(&path).map_err(io(&path))?;
            sources.insert(name.to_string(), parse_schema(name, &source)?);
        }
        Self::compile(SchemaOrigin::Directory(dir), sources)
    }

    fn compile(
        origin: SchemaOrigin,
        sources: BTreeMap<String, Value>,
    ) -> Result<Self, SchemaValidationError> {
        let mut by_ref = HashMap::new();
        for (name, schema) in &sources {
            if let Some(id) = schema.get("$id").and_then(Value::as_str) {
                by_ref.insert(id.to_string(), schema.clone());
            }
            by_ref.insert(name.clone(), schema.clone());
        }

        let mut options = jsonschema::options();
        options
            .with_draft(jsonschema::Draft::Draft202012)
            .with_retriever(LoadedSchemas(by_ref));

        let mut compiled = HashMap::with_capacity(sources.len());
        for (name, schema) in &sources {
            let validator =
                options
                    .build(schema)
                    .map_err(|e| SchemaValidationError::ValidatorBuildError {
                        schema_name: name.clone(),
                        reason: e.to_string(),
                    })?;
            compiled.insert(name.clone(), validator);
        }
        debug!(origin = ?origin, count = compiled.len(), "schemas compiled");
        Ok(Self {
            origin,
            sources,
            compiled,
        })
    }

    /// Where the schemas came from.
    pub fn origin(&self) -> &SchemaOrigin {
        &self.origin
    }

    /// Loaded schema filenames, sorted.
    pub fn schema_names(&self) -> Vec<&str> {
        self.sources.keys().map(String::as_str).collect()
    }

    /// The parsed schema named `name`.
    pub fn get_schema(&self, name: &str) -> Option<&Value> {
        self.sources.get(name)
    }

    /// Check `document` against the schema named `schema_name`.
    ///
    /// # Errors
    ///
    /// `ValidationFailed` listing every violation; `UnknownSchema` if no
    /// such schema is loaded.
    pub fn validate_document(
        &self,
        document: &Value,
        schema_name: &str,
    ) -> Result<(), SchemaValidationError> {
        let validator =
            self.compiled
                .get(schema_name)
                .ok_or_else(|| SchemaValidationError::UnknownSchema {
                    schema_name: schema_name.to_string(),
                })?;

        let violations: Vec<Violation> = validator
            .iter_errors(document)
            .map(|e| Violation {
                instance_path: e.instance_path.to_string(),
                schema_path: e.schema_path.to_string(),
                message: e.to_string(),
            })
            .collect();
        if violations.is_empty() {
            return Ok(());
        }
        Err(SchemaValidationError::ValidationFailed {
            schema_name: schema_name.to_string(),
            violations: ValidationViolations::new(violations),
            document: Box::new(document.clone()),
        })
    }
}
