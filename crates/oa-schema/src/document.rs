//! The validator a wrapper owns: schema check, then the JSON-LD term check
//! for proof-object documents.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use oa_context::ContextResolver;
use oa_core::SchemaVersion;

use crate::jsonld::check_terms;
use crate::validate::{SchemaValidationError, SchemaValidator, ValidationViolations};

/// Validates raw documents of either schema version.
pub struct DocumentValidator {
    schemas: SchemaValidator,
    resolver: Arc<dyn ContextResolver>,
}

impl DocumentValidator {
    /// A validator over explicit schemas and a context resolver.
    pub fn new(schemas: SchemaValidator, resolver: Arc<dyn ContextResolver>) -> Self {
        Self { schemas, resolver }
    }

    /// A validator over the embedded schemas.
    ///
    /// # Errors
    ///
    /// Returns `SchemaValidationError::SchemaLoadError` if an embedded
    /// schema does not parse.
    pub fn builtin(resolver: Arc<dyn ContextResolver>) -> Result<Self, SchemaValidationError> {
        Ok(Self::new(SchemaValidator::builtin()?, resolver))
    }

    /// The schemas in use.
    pub fn schemas(&self) -> &SchemaValidator {
        &self.schemas
    }

    /// The resolver used for `@context` lookups.
    pub fn resolver(&self) -> &Arc<dyn ContextResolver> {
        &self.resolver
    }

    /// Validate a raw document.
    ///
    /// # Errors
    ///
    /// - `ValidationFailed` if the document violates its schema or uses a
    ///   term no resolved `@context` defines. Term violations are reported
    ///   under a schema name ending in `(JSON-LD @context)`.
    /// - `Context` if a `@context` cannot be resolved.
    pub async fn validate(
        &self,
        document: &Value,
        version: SchemaVersion,
    ) -> Result<(), SchemaValidationError> {
        self.schemas
            .validate_document(document, version.schema_name())?;

        if version == SchemaVersion::V3 {
            let violations = check_terms(document, self.resolver.as_ref()).await?;
            if !violations.is_empty() {
                warn!(
                    count = violations.len(),
                    "document uses terms outside its @context"
                );
                return Err(SchemaValidationError::ValidationFailed {
                    schema_name: format!("{} (JSON-LD @context)", version.schema_name()),
                    violations: ValidationViolations::new(violations),
                    document: Box::new(document.clone()),
                });
            }
        }
        debug!(version = %version, "document validated");
        Ok(())
    }
}

impl std::fmt::Debug for DocumentValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentValidator")
            .field("schemas", &self.schemas.schema_names())
            .finish_non_exhaustive()
    }
}
