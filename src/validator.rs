//! Top-level entry points.

use serde_json::Value;

use crate::context::ValidationContext;
use crate::error::{CheckError, ConfigError, ErrorSet};
use crate::interpreter::{evaluate, interpret};
use crate::plan::{CompiledPlan, PlanCache};
use crate::types::{CheckOptions, INLINE_SCHEMA_PROPERTY};

/// Check `instance` against `schema` with default options.
///
/// Returns the (possibly empty) set of violations. Data problems never make
/// this fail; a `ConfigError` means the schema itself could not be applied.
pub fn check(instance: &Value, schema: &Value) -> Result<ErrorSet, ConfigError> {
    check_with(instance, schema, &CheckOptions::default())
}

/// Check `instance` against `schema`.
pub fn check_with(
    instance: &Value,
    schema: &Value,
    options: &CheckOptions,
) -> Result<ErrorSet, ConfigError> {
    interpret(instance, schema, options)
}

/// Check an instance that carries its own schema under `$schema`.
///
/// # Errors
///
/// `ConfigError::MissingSchema` when the instance has no such property.
pub fn check_inline(instance: &Value) -> Result<ErrorSet, ConfigError> {
    check_inline_with(instance, &CheckOptions::default())
}

pub fn check_inline_with(instance: &Value, options: &CheckOptions) -> Result<ErrorSet, ConfigError> {
    let schema = instance
        .get(INLINE_SCHEMA_PROPERTY)
        .ok_or(ConfigError::MissingSchema)?;
    check_with(instance, schema, options)
}

/// Validate `instance`, turning any violation into an error.
///
/// # Errors
///
/// Returns `CheckError::Config` if the schema cannot be applied, or
/// `CheckError::Invalid` with every violation if the instance does not
/// conform.
pub fn validate(schema: &Value, instance: &Value) -> Result<(), CheckError> {
    let errors = check(instance, schema)?;
    if errors.is_empty() {
        Ok(())
    } else {
        Err(CheckError::Invalid { errors })
    }
}

/// Compile `schema` through the process-wide [`PlanCache`] with default
/// options.
pub fn compile(schema: &Value) -> Result<CompiledPlan, ConfigError> {
    compile_with(schema, &CheckOptions::default())
}

/// Compile `schema` through the process-wide [`PlanCache`].
pub fn compile_with(schema: &Value, options: &CheckOptions) -> Result<CompiledPlan, ConfigError> {
    PlanCache::global().compile(schema, options)
}

/// A reusable evaluator that accumulates violations across checks until
/// [`reset`](Validator::reset).
///
/// One `Validator` must not be shared between concurrent checks; create one
/// per thread.
#[derive(Debug, Default)]
pub struct Validator {
    options: CheckOptions,
    errors: ErrorSet,
}

impl Validator {
    pub fn new(options: CheckOptions) -> Self {
        Self {
            options,
            errors: ErrorSet::new(),
        }
    }

    /// Check `instance` against `schema`, adding violations to those already
    /// held. Returns whether this check added none.
    ///
    /// On a `ConfigError` the held violations are left as they were.
    pub fn check(&mut self, instance: &Value, schema: &Value) -> Result<bool, ConfigError> {
        let before = self.errors.len();
        let mut ctx = ValidationContext::new(&self.options);
        ctx.errors = self.errors.clone();
        evaluate(&mut ctx, instance, schema)?;
        self.errors = ctx.errors;
        Ok(self.errors.len() == before)
    }

    pub fn errors(&self) -> &ErrorSet {
        &self.errors
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_valid()
    }

    /// Forget every recorded violation.
    pub fn reset(&mut self) {
        self.errors.reset();
    }

    pub fn options(&self) -> &CheckOptions {
        &self.options
    }
}
