//! Core types: check modes, options and the primitive type names.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::format::FormatRegistry;
use crate::instance::Instance;
use crate::retriever::{default_retriever, UriRetriever};

/// Default recursion limit for evaluation and plan compilation.
pub const DEFAULT_MAX_DEPTH: usize = 100;

/// Property name that carries an inline schema inside an instance.
/// Exempt from `additionalProperties: false`.
pub const INLINE_SCHEMA_PROPERTY: &str = "$schema";

/// Returns the JSON type name of a schema node for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// How strictly instance kinds are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckMode {
    /// Kinds are taken as decoded.
    #[default]
    Normal,
    /// Strings holding a number also count as numbers.
    Coerce,
}

/// Parse a string as a number when coercion applies.
pub(crate) fn coerce_numeric(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Names accepted by the `type` keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveType {
    Integer,
    Number,
    Boolean,
    Object,
    Array,
    String,
    Null,
    Any,
}

impl PrimitiveType {
    /// Parse a type name. Returns `None` for unknown names (caller should error).
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "integer" => Some(PrimitiveType::Integer),
            "number" => Some(PrimitiveType::Number),
            "boolean" => Some(PrimitiveType::Boolean),
            "object" => Some(PrimitiveType::Object),
            "array" => Some(PrimitiveType::Array),
            "string" => Some(PrimitiveType::String),
            "null" => Some(PrimitiveType::Null),
            "any" => Some(PrimitiveType::Any),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PrimitiveType::Integer => "integer",
            PrimitiveType::Number => "number",
            PrimitiveType::Boolean => "boolean",
            PrimitiveType::Object => "object",
            PrimitiveType::Array => "array",
            PrimitiveType::String => "string",
            PrimitiveType::Null => "null",
            PrimitiveType::Any => "any",
        }
    }

    /// Whether `instance` is of this type under `mode`.
    pub fn matches(&self, instance: &Instance<'_>, mode: CheckMode) -> bool {
        match (self, instance) {
            (PrimitiveType::Any, _) => true,
            (PrimitiveType::Integer, Instance::Number(n)) => n.is_i64() || n.is_u64(),
            (PrimitiveType::Number, Instance::Number(_)) => true,
            (PrimitiveType::Integer, Instance::String(s)) if mode == CheckMode::Coerce => {
                coerce_numeric(s).map(|n| n.fract() == 0.0).unwrap_or(false)
            }
            (PrimitiveType::Number, Instance::String(s)) if mode == CheckMode::Coerce => {
                coerce_numeric(s).is_some()
            }
            (PrimitiveType::Boolean, Instance::Bool(_)) => true,
            (PrimitiveType::Object, Instance::Object(_)) => true,
            (PrimitiveType::Array, Instance::Array(_)) => true,
            (PrimitiveType::String, Instance::String(_)) => true,
            (PrimitiveType::Null, Instance::Null) => true,
            _ => false,
        }
    }
}

/// Options for a check or a compilation.
///
/// Plans remember the options they were compiled with; the retriever is
/// consulted at compile time, the mode, formats and depth limit at check time.
#[derive(Clone)]
pub struct CheckOptions {
    pub mode: CheckMode,
    /// Recursion limit; exceeding it aborts with `ConfigError::DepthExceeded`.
    pub max_depth: usize,
    pub retriever: Arc<dyn UriRetriever>,
    pub formats: Arc<FormatRegistry>,
    /// Resolution base of the root document; relative references with no
    /// enclosing `id` are joined onto it.
    pub base_uri: Option<Url>,
}

impl CheckOptions {
    /// Normal mode, default depth limit, caching file/HTTP retriever and the
    /// built-in format registry.
    pub fn new() -> Self {
        Self {
            mode: CheckMode::Normal,
            max_depth: DEFAULT_MAX_DEPTH,
            retriever: default_retriever(),
            formats: Arc::new(FormatRegistry::with_defaults()),
            base_uri: None,
        }
    }

    pub fn mode(mut self, mode: CheckMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn retriever(mut self, retriever: impl UriRetriever + 'static) -> Self {
        self.retriever = Arc::new(retriever);
        self
    }

    pub fn shared_retriever(mut self, retriever: Arc<dyn UriRetriever>) -> Self {
        self.retriever = retriever;
        self
    }

    pub fn formats(mut self, formats: FormatRegistry) -> Self {
        self.formats = Arc::new(formats);
        self
    }

    pub fn base_uri(mut self, base_uri: Url) -> Self {
        self.base_uri = Some(base_uri);
        self
    }
}

impl Default for CheckOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CheckOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckOptions")
            .field("mode", &self.mode)
            .field("max_depth", &self.max_depth)
            .field("formats", &self.formats)
            .field("base_uri", &self.base_uri.as_ref().map(Url::as_str))
            .finish_non_exhaustive()
    }
}
