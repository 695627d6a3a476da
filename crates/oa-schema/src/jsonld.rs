//! # JSON-LD Term Check
//!
//! A proof-object document is only meaningful as linked data if every
//! property it uses is defined by one of its `@context`s. This module
//! resolves the contexts and walks the document with an active context,
//! following the JSON-LD 1.1 scoping rules that matter for that question:
//!
//! - embedded `@context` members extend the active context for their node
//!   and everything below it;
//! - property-scoped contexts apply to the value of that property;
//! - type-scoped contexts apply to the properties of the typed node only
//!   and do not propagate into nested nodes;
//! - `@vocab` makes every term resolvable;
//! - `@json`-typed values are opaque and never inspected;
//! - compact IRIs (`prefix:suffix`) and keywords are always allowed.
//!
//! Resolution is async (it goes through a [`ContextResolver`]); the walk
//! itself is synchronous over the resolved set.

use std::collections::{HashMap, VecDeque};

use serde_json::{Map, Value};
use tracing::debug;

use oa_context::{ContextError, ContextResolver};

use crate::validate::Violation;

/// Schema path reported for term violations.
const CONTEXT_SCHEMA_PATH: &str = "@context";

/// Resolve every context URL named anywhere in `document`, including
/// contexts imported by other contexts.
///
/// Returns a map from URL to the resolved document's `@context` member.
///
/// # Errors
///
/// Returns the first `ContextError` the resolver reports.
pub async fn resolve_contexts(
    document: &Value,
    resolver: &dyn ContextResolver,
) -> Result<HashMap<String, Value>, ContextError> {
    let mut pending = VecDeque::new();
    collect_context_urls(document, &mut pending);

    let mut resolved = HashMap::new();
    while let Some(url) = pending.pop_front() {
        if resolved.contains_key(&url) {
            continue;
        }
        let remote = resolver.resolve(&url).await?;
        collect_context_urls(remote.document.as_ref(), &mut pending);
        let context = remote
            .context()
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()));
        debug!(url = %url, "context resolved for term check");
        resolved.insert(url, context);
    }
    Ok(resolved)
}

/// Resolve the document's contexts and report every undefined term.
///
/// An empty list means every property is defined.
///
/// # Errors
///
/// Returns `ContextError` if any context cannot be resolved.
pub async fn check_terms(
    document: &Value,
    resolver: &dyn ContextResolver,
) -> Result<Vec<Violation>, ContextError> {
    let resolved = resolve_contexts(document, resolver).await?;
    Ok(undefined_terms(document, &resolved))
}

/// Report undefined terms against an already resolved context set.
///
/// URLs missing from `resolved` contribute no terms.
pub fn undefined_terms(document: &Value, resolved: &HashMap<String, Value>) -> Vec<Violation> {
    let mut checker = TermChecker {
        resolved,
        violations: Vec::new(),
    };
    if let Value::Object(node) = document {
        checker.check_node(node, &ActiveContext::default(), "", true);
    }
    checker.violations
}

fn collect_context_urls(value: &Value, out: &mut VecDeque<String>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                if key == "@context" {
                    push_context_refs(child, out);
                }
                collect_context_urls(child, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_context_urls(item, out);
            }
        }
        _ => {}
    }
}

fn push_context_refs(context: &Value, out: &mut VecDeque<String>) {
    match context {
        Value::String(url) => out.push_back(url.clone()),
        Value::Array(items) => {
            for item in items {
                if let Value::String(url) = item {
                    out.push_back(url.clone());
                }
            }
        }
        _ => {}
    }
}

#[derive(Debug, Clone, Default)]
struct TermDefinition {
    scoped: Option<Value>,
    opaque: bool,
}

#[derive(Debug, Clone, Default)]
struct ActiveContext {
    terms: HashMap<String, TermDefinition>,
    vocab: bool,
}

impl ActiveContext {
    fn apply(&mut self, context: &Value, resolved: &HashMap<String, Value>, stack: &mut Vec<String>) {
        match context {
            Value::Null => *self = Self::default(),
            Value::String(url) => {
                // A context importing itself (directly or not) adds nothing new.
                if stack.contains(url) {
                    return;
                }
                if let Some(remote) = resolved.get(url) {
                    stack.push(url.clone());
                    self.apply(remote, resolved, stack);
                    stack.pop();
                }
            }
            Value::Array(items) => {
                for item in items {
                    self.apply(item, resolved, stack);
                }
            }
            Value::Object(definitions) => {
                for (term, definition) in definitions {
                    if term == "@vocab" {
                        self.vocab = !definition.is_null();
                        continue;
                    }
                    if term.starts_with('@') {
                        continue;
                    }
                    match definition {
                        Value::Null => {
                            self.terms.remove(term);
                        }
                        Value::Object(expanded) => {
                            self.terms.insert(
                                term.clone(),
                                TermDefinition {
                                    scoped: expanded.get("@context").cloned(),
                                    opaque: expanded.get("@type").and_then(Value::as_str)
                                        == Some("@json"),
                                },
                            );
                        }
                        _ => {
                            self.terms.insert(term.clone(), TermDefinition::default());
                        }
                    }
                }
            }
            _ => {}
        }
    }

    fn defines(&self, term: &str) -> bool {
        self.vocab || term.contains(':') || self.terms.contains_key(term)
    }
}

struct TermChecker<'a> {
    resolved: &'a HashMap<String, Value>,
    violations: Vec<Violation>,
}

impl TermChecker<'_> {
    fn extend(&self, base: &ActiveContext, context: &Value) -> ActiveContext {
        let mut next = base.clone();
        next.apply(context, self.resolved, &mut Vec::new());
        next
    }

    fn report(&mut self, instance_path: String, message: String) {
        self.violations.push(Violation {
            instance_path,
            schema_path: CONTEXT_SCHEMA_PATH.to_string(),
            message,
        });
    }

    fn check_value(&mut self, value: &Value, active: &ActiveContext, pointer: &str) {
        match value {
            Value::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    self.check_value(item, active, &format!("{pointer}/{i}"));
                }
            }
            Value::Object(node) => self.check_node(node, active, pointer, false),
            _ => {}
        }
    }

    fn check_node(
        &mut self,
        node: &Map<String, Value>,
        active: &ActiveContext,
        pointer: &str,
        top_level: bool,
    ) {
        let propagated = match node.get("@context") {
            Some(embedded) => self.extend(active, embedded),
            None => active.clone(),
        };

        let types = node_types(node);
        let mut local = propagated.clone();
        for ty in &types {
            if let Some(scoped) = propagated.terms.get(*ty).and_then(|d| d.scoped.as_ref()) {
                local.apply(scoped, self.resolved, &mut Vec::new());
            }
        }

        if top_level {
            for ty in &types {
                if !local.defines(ty) {
                    self.report(
                        format!("{pointer}/type"),
                        format!("type \"{ty}\" is not defined by any resolved @context"),
                    );
                }
            }
        }

        for (key, value) in node {
            if key.starts_with('@') || key.contains(':') {
                continue;
            }
            let child_pointer = format!("{pointer}/{}", escape_pointer(key));
            let child = match local.terms.get(key) {
                Some(definition) if definition.opaque => continue,
                Some(definition) => match &definition.scoped {
                    Some(scoped) => self.extend(&propagated, scoped),
                    None => propagated.clone(),
                },
                None if local.vocab => propagated.clone(),
                None => {
                    self.report(
                        child_pointer,
                        format!("term \"{key}\" is not defined by any resolved @context"),
                    );
                    continue;
                }
            };
            self.check_value(value, &child, &child_pointer);
        }
    }
}

fn node_types(node: &Map<String, Value>) -> Vec<&str> {
    let mut types: Vec<&str> = ["type", "@type"]
        .iter()
        .filter_map(|key| node.get(*key))
        .flat_map(|value| match value {
            Value::String(s) => vec![s.as_str()],
            Value::Array(items) => items.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        })
        .collect();
    types.sort_unstable();
    types.dedup();
    types
}

fn escape_pointer(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}
