//! Per-check state shared by every evaluator of one check.

use std::collections::HashMap;

use regex::Regex;

use crate::error::{ConfigError, ErrorSet};
use crate::types::{CheckMode, CheckOptions};

/// Carrier for a single top-level check: mode, options, the accumulated
/// errors and the recursion guard. Never shared between concurrent checks.
pub(crate) struct ValidationContext<'o> {
    pub mode: CheckMode,
    pub options: &'o CheckOptions,
    pub errors: ErrorSet,
    depth: usize,
    regexes: HashMap<String, Result<Regex, String>>,
}

impl<'o> ValidationContext<'o> {
    pub fn new(options: &'o CheckOptions) -> Self {
        Self {
            mode: options.mode,
            options,
            errors: ErrorSet::new(),
            depth: 0,
            regexes: HashMap::new(),
        }
    }

    /// Enter one level of subschema recursion.
    pub fn enter(&mut self, path: &str) -> Result<(), ConfigError> {
        if self.depth >= self.options.max_depth {
            return Err(ConfigError::DepthExceeded {
                path: path.to_string(),
                limit: self.options.max_depth,
            });
        }
        self.depth += 1;
        Ok(())
    }

    pub fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    pub fn add_error(&mut self, path: &str, message: impl Into<String>) {
        self.errors.add_error(path, message);
    }

    /// Number of errors recorded so far, for "did this branch add errors" tests.
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Swap in an empty error set, returning the previous one.
    pub fn isolate(&mut self) -> ErrorSet {
        std::mem::take(&mut self.errors)
    }

    /// Put back a set taken with [`isolate`](Self::isolate), returning the
    /// errors produced meanwhile.
    pub fn restore(&mut self, saved: ErrorSet) -> ErrorSet {
        std::mem::replace(&mut self.errors, saved)
    }

    /// Compile `pattern`, reusing earlier compilations within this check.
    pub fn regex(&mut self, pattern: &str) -> Result<Regex, String> {
        if let Some(compiled) = self.regexes.get(pattern) {
            return compiled.clone();
        }
        let compiled = Regex::new(pattern).map_err(|e| e.to_string());
        self.regexes.insert(pattern.to_string(), compiled.clone());
        compiled
    }
}
