//! Schema to plan compilation.
//!
//! Every schema node is keyed by a SHA-256 over its compact JSON text. Nodes
//! whose meaning depends on where they sit (they contain `$ref`, `extends`
//! or `id`) additionally hash their resolution scope: the base URI and the
//! root document. A key already in the store is reused as-is; a key whose
//! compilation is still running on the current stack becomes a weak back
//! edge, which is how recursive schemas terminate.

use std::collections::HashMap;
use std::sync::Arc;

use regex::Regex;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::debug;

use super::node::{PlanCell, PlanLink, PlanNode};
use crate::constraints::{KeywordSource, Keywords};
use crate::error::ConfigError;
use crate::loader::navigate_fragment;
use crate::reference::{resolve, Scope, Target};
use crate::types::{json_type_name, CheckOptions};

pub(crate) struct Compiler<'o, 'c> {
    options: &'o CheckOptions,
    /// Finished plans from earlier compilations.
    store: &'c HashMap<String, Arc<PlanCell>>,
    /// Finished during this compilation, installed only if it succeeds.
    fresh: HashMap<String, Arc<PlanCell>>,
    in_progress: HashMap<String, Arc<PlanCell>>,
    /// Fetched documents stay alive for the whole compilation, so document
    /// addresses identify documents.
    documents: Vec<Arc<Value>>,
    document_hashes: HashMap<usize, String>,
    depth: usize,
    /// Set when the retriever could not supply a referenced document.
    fetch_failed: bool,
}

impl<'o, 'c> Compiler<'o, 'c> {
    pub fn new(options: &'o CheckOptions, store: &'c HashMap<String, Arc<PlanCell>>) -> Self {
        Self {
            options,
            store,
            fresh: HashMap::new(),
            in_progress: HashMap::new(),
            documents: Vec::new(),
            document_hashes: HashMap::new(),
            depth: 0,
            fetch_failed: false,
        }
    }

    /// True when some reference failed in the retriever. Such a failure may
    /// not repeat, so plans from this compilation must not be shared.
    pub fn fetch_failed(&self) -> bool {
        self.fetch_failed
    }

    /// Plans built by this compilation, to be installed in the store.
    pub fn into_fresh(self) -> HashMap<String, Arc<PlanCell>> {
        self.fresh
    }

    /// Compile the root of a schema document.
    pub fn compile_root(&mut self, schema: &Value) -> Result<Arc<PlanCell>, ConfigError> {
        let base = self.options.base_uri.clone().map(Arc::new);
        match self.compile(schema, &Scope::new(schema, base))? {
            PlanLink::Owned(cell) => Ok(cell),
            PlanLink::Back { key, .. } => Err(ConfigError::IncompletePlan { key }),
        }
    }

    fn compile<'s>(&mut self, schema: &'s Value, scope: &Scope<'s>) -> Result<PlanLink, ConfigError> {
        let key = self.content_key(schema, scope);
        if let Some(link) = self.lookup(&key) {
            return Ok(link);
        }
        self.build(key, |compiler| compiler.schema_node(schema, scope))
    }

    fn compile_reference<'s>(&mut self, uri: &'s str, scope: &Scope<'s>) -> Result<PlanLink, ConfigError> {
        let mut hasher = Sha256::new();
        hasher.update(b"extends\0");
        hasher.update(uri.as_bytes());
        self.hash_scope(&mut hasher, scope);
        let key = hex::encode(hasher.finalize());
        if let Some(link) = self.lookup(&key) {
            return Ok(link);
        }
        self.build(key, |compiler| compiler.reference_node(uri, scope))
    }

    fn lookup(&self, key: &str) -> Option<PlanLink> {
        if let Some(cell) = self.store.get(key).or_else(|| self.fresh.get(key)) {
            debug!(key, "plan cache hit");
            return Some(PlanLink::Owned(Arc::clone(cell)));
        }
        self.in_progress.get(key).map(|cell| {
            debug!(key, "plan back-reference");
            PlanLink::Back {
                key: key.to_string(),
                cell: Arc::downgrade(cell),
            }
        })
    }

    fn build(
        &mut self,
        key: String,
        node: impl FnOnce(&mut Self) -> Result<PlanNode, ConfigError>,
    ) -> Result<PlanLink, ConfigError> {
        if self.depth >= self.options.max_depth {
            return Err(ConfigError::DepthExceeded {
                path: format!("plan {}", key),
                limit: self.options.max_depth,
            });
        }
        debug!(key = %key, "plan cache miss");

        let cell = Arc::new(PlanCell::new(key.clone()));
        self.in_progress.insert(key.clone(), Arc::clone(&cell));
        self.depth += 1;
        let result = node(self);
        self.depth -= 1;
        self.in_progress.remove(&key);

        if !cell.finish(result?) {
            return Err(ConfigError::IncompletePlan { key });
        }
        self.fresh.insert(key, Arc::clone(&cell));
        Ok(PlanLink::Owned(cell))
    }

    fn schema_node<'s>(&mut self, schema: &'s Value, scope: &Scope<'s>) -> Result<PlanNode, ConfigError> {
        let map = match schema {
            Value::Object(map) => map,
            Value::Null | Value::Bool(true) => return Ok(PlanNode::Accept),
            other => return Ok(PlanNode::NotAnObject(json_type_name(other))),
        };

        let scope = match scope.enter(map) {
            Ok(scope) => scope,
            Err(error) => return Ok(PlanNode::Fatal(error)),
        };
        if let Some(Value::String(uri)) = map.get("$ref") {
            return self.reference_node(uri, &scope);
        }

        let keywords = Keywords::parse(
            map,
            &mut Source {
                compiler: self,
                scope: &scope,
            },
        )?;
        Ok(PlanNode::Keywords(Box::new(keywords)))
    }

    // Resolution happens once, here; a failure is replayed on every check
    // that reaches the node.
    fn reference_node<'s>(&mut self, uri: &str, scope: &Scope<'s>) -> Result<PlanNode, ConfigError> {
        let target = match resolve(uri, scope, self.options) {
            Ok(target) => target,
            Err(error) => {
                // Fragment-only misses depend on the keyed document alone.
                if !uri.starts_with('#') && matches!(error, ConfigError::UnresolvableReference { .. }) {
                    self.fetch_failed = true;
                }
                return Ok(PlanNode::Fatal(error));
            }
        };
        let link = match target {
            Target::Local(node) => self.compile(node, scope)?,
            Target::Remote {
                document,
                fragment,
                base,
                location,
            } => {
                self.documents.push(Arc::clone(&document));
                let root: &Value = &document;
                let Some(node) = navigate_fragment(root, &fragment) else {
                    self.fetch_failed = true;
                    return Ok(PlanNode::Fatal(ConfigError::UnresolvableReference {
                        uri: uri.to_string(),
                        message: format!("fragment \"{}\" not found in {}", fragment, location),
                    }));
                };
                self.compile(node, &Scope::new(root, base))?
            }
        };
        Ok(PlanNode::Reference(link))
    }

    fn content_key(&mut self, schema: &Value, scope: &Scope<'_>) -> String {
        let mut hasher = Sha256::new();
        hasher.update(schema.to_string().as_bytes());
        if depends_on_scope(schema) {
            self.hash_scope(&mut hasher, scope);
        }
        hex::encode(hasher.finalize())
    }

    fn hash_scope(&mut self, hasher: &mut Sha256, scope: &Scope<'_>) {
        hasher.update(b"\0base:");
        if let Some(base) = &scope.base {
            hasher.update(base.as_str().as_bytes());
        }
        hasher.update(b"\0root:");
        let root = scope.root;
        let hash = self
            .document_hashes
            .entry(root as *const Value as usize)
            .or_insert_with(|| hex::encode(Sha256::digest(root.to_string().as_bytes())));
        hasher.update(hash.as_bytes());
    }
}

/// True when the subtree's meaning depends on its resolution scope.
fn depends_on_scope(schema: &Value) -> bool {
    match schema {
        Value::Object(map) => {
            map.contains_key("$ref")
                || map.contains_key("extends")
                || map.contains_key("id")
                || map.values().any(depends_on_scope)
        }
        Value::Array(items) => items.iter().any(depends_on_scope),
        _ => false,
    }
}

struct Source<'a, 'o, 'c, 's> {
    compiler: &'a mut Compiler<'o, 'c>,
    scope: &'a Scope<'s>,
}

impl<'s> KeywordSource<'s> for Source<'_, '_, '_, 's> {
    type Sub = PlanLink;

    fn subschema(&mut self, schema: &'s Value) -> Result<PlanLink, ConfigError> {
        self.compiler.compile(schema, self.scope)
    }

    fn reference(&mut self, uri: &'s str) -> Result<PlanLink, ConfigError> {
        self.compiler.compile_reference(uri, self.scope)
    }

    fn regex(&mut self, pattern: &str) -> Result<Regex, String> {
        Regex::new(pattern).map_err(|e| e.to_string())
    }
}
