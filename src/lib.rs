//! JSON Constraint
//!
//! JSON Schema (draft 3 and draft 4) validation with two interchangeable
//! backends: an interpreter that walks the schema on every check, and a plan
//! compiler that turns each distinct schema shape into a reusable plan once.
//! Both report the same violations, with the same paths, in the same order.
//!
//! # Example
//!
//! ```
//! use json_constraint::{check, compile};
//! use serde_json::json;
//!
//! let schema = json!({
//!     "type": "object",
//!     "properties": {
//!         "id": { "type": "integer" },
//!         "tags": { "type": "array", "uniqueItems": true }
//!     },
//!     "required": ["id"]
//! });
//! let instance = json!({ "id": "7", "tags": ["a", "a"] });
//!
//! let errors = check(&instance, &schema).unwrap();
//! assert_eq!(errors.len(), 2);
//! assert_eq!(errors.as_slice()[0].path, "id");
//!
//! let plan = compile(&schema).unwrap();
//! assert_eq!(plan.check(&instance).unwrap(), errors);
//! ```
//!
//! # Errors
//!
//! | Kind | Meaning | Surface |
//! |------|---------|---------|
//! | [`ValidationError`] | the instance does not conform | collected in an [`ErrorSet`] |
//! | [`ConfigError`] | the schema cannot be applied (bad type name, bad `pattern`, unresolvable `$ref`, recursion limit) | aborts the check |
//!
//! # Coercion
//!
//! With [`CheckMode::Coerce`], strings holding a number are also checked as
//! numbers, which suits form and query-string input:
//!
//! ```
//! use json_constraint::{check_with, CheckMode, CheckOptions};
//! use serde_json::json;
//!
//! let options = CheckOptions::new().mode(CheckMode::Coerce);
//! let errors = check_with(&json!("42"), &json!({"type": "integer", "maximum": 10}), &options).unwrap();
//! assert_eq!(errors.as_slice()[0].message, "must have a maximum value of 10");
//! ```

mod constraints;
mod context;
mod error;
mod format;
mod instance;
mod interpreter;
mod loader;
mod plan;
mod reference;
mod retriever;
mod types;
mod validator;

pub use error::{CheckError, ConfigError, ErrorSet, RetrieveError, ValidationError};
pub use format::{FormatRegistry, FormatValidator};
pub use instance::{increment_path, Instance, Segment};
pub use loader::{is_url, load_document, load_document_auto, load_document_str, navigate_fragment};
pub use plan::{CompiledPlan, PlanCache};
pub use retriever::{
    default_retriever, file_base_uri, CachingRetriever, FileRetriever, MemoryRetriever,
    SourceRetriever, UriRetriever,
};
pub use types::{json_type_name, CheckMode, CheckOptions, PrimitiveType, DEFAULT_MAX_DEPTH};
pub use validator::{
    check, check_inline, check_inline_with, check_with, compile, compile_with, validate, Validator,
};

#[cfg(feature = "remote")]
pub use loader::load_document_url;
#[cfg(feature = "remote")]
pub use retriever::HttpRetriever;
