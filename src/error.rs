//! Error types for schema checking.
//!
//! Two taxonomies are kept apart: [`ValidationError`] records collected in an
//! [`ErrorSet`] describe data that does not conform, while [`ConfigError`]
//! aborts a check because the schema itself cannot be evaluated.

use std::collections::HashSet;
use std::path::PathBuf;

use serde::ser::SerializeSeq;
use serde::{Serialize, Serializer};
use thiserror::Error;

/// Single validation error with path context.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ValidationError {
    /// Dotted/bracketed address of the offending value (`items[2].name`).
    /// Empty for the root.
    pub path: String,
    /// Human-readable error message.
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// Ordered, deduplicated collection of validation errors.
///
/// A record identical to one already present (same path and message) is
/// dropped on insertion, so iteration order is the order of first occurrence.
#[derive(Debug, Clone, Default)]
pub struct ErrorSet {
    errors: Vec<ValidationError>,
    seen: HashSet<ValidationError>,
}

impl ErrorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an error at `path`.
    pub fn add_error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.push(ValidationError::new(path, message));
    }

    /// Append a record, returning false when it was a duplicate.
    pub fn push(&mut self, error: ValidationError) -> bool {
        if self.seen.contains(&error) {
            return false;
        }
        self.seen.insert(error.clone());
        self.errors.push(error);
        true
    }

    /// Append every record of `other`, keeping first occurrences.
    pub fn extend(&mut self, other: ErrorSet) {
        for error in other.errors {
            self.push(error);
        }
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// True when no errors were recorded.
    pub fn is_valid(&self) -> bool {
        self.is_empty()
    }

    /// Clear all errors. Meant for reuse between independent checks.
    pub fn reset(&mut self) {
        self.errors.clear();
        self.seen.clear();
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ValidationError> {
        self.errors.iter()
    }

    pub fn as_slice(&self) -> &[ValidationError] {
        &self.errors
    }

    pub fn into_vec(self) -> Vec<ValidationError> {
        self.errors
    }

    /// Mark the current length so a combinator can roll back to it.
    pub(crate) fn checkpoint(&self) -> usize {
        self.errors.len()
    }

    /// Drop every record added after `checkpoint`.
    pub(crate) fn rollback(&mut self, checkpoint: usize) {
        drop(self.split_off(checkpoint));
    }

    /// Remove and return the records added after `checkpoint`.
    pub(crate) fn split_off(&mut self, checkpoint: usize) -> Vec<ValidationError> {
        let tail = self.errors.split_off(checkpoint.min(self.errors.len()));
        for error in &tail {
            self.seen.remove(error);
        }
        tail
    }
}

impl PartialEq for ErrorSet {
    fn eq(&self, other: &Self) -> bool {
        self.errors == other.errors
    }
}

impl Eq for ErrorSet {}

impl FromIterator<ValidationError> for ErrorSet {
    fn from_iter<I: IntoIterator<Item = ValidationError>>(iter: I) -> Self {
        let mut set = ErrorSet::new();
        for error in iter {
            set.push(error);
        }
        set
    }
}

impl IntoIterator for ErrorSet {
    type Item = ValidationError;
    type IntoIter = std::vec::IntoIter<ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.into_iter()
    }
}

impl<'a> IntoIterator for &'a ErrorSet {
    type Item = &'a ValidationError;
    type IntoIter = std::slice::Iter<'a, ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.errors.iter()
    }
}

impl Serialize for ErrorSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.errors.len()))?;
        for error in &self.errors {
            seq.serialize_element(error)?;
        }
        seq.end()
    }
}

/// Fatal errors: the schema cannot be evaluated, so the check is aborted.
///
/// Cloneable because compiled plans store a failure found at compile time and
/// raise it when execution reaches the offending node.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("given schema must be an object in \"{path}\" but is a {actual}")]
    NotAnObject { path: String, actual: String },

    #[error("{name} is an invalid type at \"{path}\"")]
    UnknownType { path: String, name: String },

    #[error("invalid regex pattern \"{pattern}\" at \"{path}\": {message}")]
    InvalidPattern {
        path: String,
        pattern: String,
        message: String,
    },

    #[error("cannot resolve reference \"{uri}\": {message}")]
    UnresolvableReference { uri: String, message: String },

    #[error("malformed reference URI \"{uri}\": {message}")]
    InvalidUri { uri: String, message: String },

    #[error("maximum schema depth of {limit} exceeded at \"{path}\"")]
    DepthExceeded { path: String, limit: usize },

    #[error("no schema found to verify against")]
    MissingSchema,

    #[error("plan {key} was used before compilation finished")]
    IncompletePlan { key: String },
}

/// Failures of the retrieval collaborator.
#[derive(Debug, Error)]
pub enum RetrieveError {
    // IO errors
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "remote")]
    #[error("failed to fetch {url}: {source}")]
    NetworkError {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    // Parse errors
    #[error("invalid JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
    },

    #[error("no schema registered for {uri}")]
    NotFound { uri: String },

    #[error("unsupported URI scheme in {uri}")]
    UnsupportedUri { uri: String },
}

impl RetrieveError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            RetrieveError::FileNotFound { .. } | RetrieveError::ReadError { .. } => 3,
            #[cfg(feature = "remote")]
            RetrieveError::NetworkError { .. } => 3,
            _ => 2,
        }
    }
}

/// Errors of the convenience [`validate`](crate::validate) entry point.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("validation failed with {} error(s)", errors.len())]
    Invalid { errors: ErrorSet },
}

impl CheckError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            CheckError::Config(_) => 2,
            CheckError::Invalid { .. } => 1,
        }
    }
}
