//! The keyword model shared by both backends.
//!
//! A schema object is digested into [`Keywords`], generic over the handle
//! used for nested subschemas. The interpreter digests a node every time it
//! visits it and uses borrowed schema nodes as handles; the plan compiler
//! digests each distinct node once and uses links to other plans. Both then
//! run the same [`Keywords::evaluate`], which is what keeps their error
//! sets identical.

mod collection;
mod combinator;
mod enumeration;
mod number;
mod object;
mod string;
mod type_rule;

use regex::Regex;
use serde_json::{Map, Value};

use crate::context::ValidationContext;
use crate::error::ConfigError;
use crate::instance::{Instance, Segment};
use crate::types::{coerce_numeric, CheckMode};

pub(crate) use collection::CollectionRules;
pub(crate) use combinator::{CombinatorRules, CommonRules};
pub(crate) use enumeration::EnumRule;
pub(crate) use number::NumberRules;
pub(crate) use object::ObjectRules;
pub(crate) use string::StringRules;
pub(crate) use type_rule::TypeRule;

/// A handle to a nested schema that can check an instance.
pub(crate) trait Subschema {
    /// Check `instance`, found at `parent` extended by `segment`.
    fn check(
        &self,
        ctx: &mut ValidationContext<'_>,
        instance: Instance<'_>,
        parent: &str,
        segment: Segment<'_>,
    ) -> Result<(), ConfigError>;
}

/// Produces subschema handles while a schema object is digested.
pub(crate) trait KeywordSource<'s> {
    type Sub: Subschema;

    /// Handle for a nested schema value (of any JSON kind).
    fn subschema(&mut self, schema: &'s Value) -> Result<Self::Sub, ConfigError>;

    /// Handle for a URI reference (string `extends`).
    fn reference(&mut self, uri: &'s str) -> Result<Self::Sub, ConfigError>;

    fn regex(&mut self, pattern: &str) -> Result<Regex, String>;
}

/// A numeric keyword value together with its schema text for messages.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Limit {
    pub value: f64,
    pub text: String,
}

impl Limit {
    pub fn parse(value: Option<&Value>) -> Option<Limit> {
        match value? {
            Value::Number(n) => Some(Limit {
                value: n.as_f64()?,
                text: n.to_string(),
            }),
            _ => None,
        }
    }
}

impl std::fmt::Display for Limit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

/// Treatment of members not covered by `properties`/`items`.
#[derive(Debug)]
pub(crate) enum Additional<S> {
    Absent,
    Allow,
    Deny,
    Schema(S),
}

impl<S> Additional<S> {
    pub fn parse<'s, B>(value: Option<&'s Value>, source: &mut B) -> Result<Self, ConfigError>
    where
        B: KeywordSource<'s, Sub = S>,
    {
        Ok(match value {
            None | Some(Value::Null) => Additional::Absent,
            Some(Value::Bool(true)) => Additional::Allow,
            Some(Value::Bool(false)) => Additional::Deny,
            Some(schema) => Additional::Schema(source.subschema(schema)?),
        })
    }
}

/// Everything a schema object says, digested.
#[derive(Debug)]
pub(crate) struct Keywords<S> {
    common: CommonRules<S>,
    combinators: CombinatorRules<S>,
    object: Option<ObjectRules<S>>,
    collection: CollectionRules<S>,
    string: StringRules,
    number: NumberRules,
    format: Option<String>,
    enumeration: Option<EnumRule>,
}

impl<S: Subschema> Keywords<S> {
    pub fn parse<'s, B>(schema: &'s Map<String, Value>, source: &mut B) -> Result<Self, ConfigError>
    where
        B: KeywordSource<'s, Sub = S>,
    {
        let common = CommonRules::parse(schema, source)?;
        let combinators = CombinatorRules::parse(schema, source)?;
        let object = ObjectRules::parse(schema, source)?;
        let collection = CollectionRules::parse(schema, source)?;
        let string = StringRules::parse(schema, source);
        let number = NumberRules::parse(schema);
        let format = schema
            .get("format")
            .and_then(Value::as_str)
            .map(str::to_string);
        let enumeration = EnumRule::parse(schema, common.required_is_truthy());

        Ok(Self {
            common,
            combinators,
            object,
            collection,
            string,
            number,
            format,
            enumeration,
        })
    }

    /// Run every applicable rule against `instance` located at `path`.
    /// `segment` is the last step of `path`, used in some messages.
    pub fn evaluate(
        &self,
        ctx: &mut ValidationContext<'_>,
        instance: Instance<'_>,
        path: &str,
        segment: Segment<'_>,
    ) -> Result<(), ConfigError> {
        self.common.evaluate(ctx, instance, path)?;
        self.combinators.evaluate(ctx, instance, path)?;
        self.dispatch(ctx, instance, path, segment)
    }

    // Every evaluator applicable to the runtime kind runs, in this order.
    fn dispatch(
        &self,
        ctx: &mut ValidationContext<'_>,
        instance: Instance<'_>,
        path: &str,
        segment: Segment<'_>,
    ) -> Result<(), ConfigError> {
        match instance {
            Instance::Array(items) => self.collection.evaluate(ctx, items, path, segment)?,
            Instance::Object(map) => {
                if let Some(object) = &self.object {
                    object.evaluate(ctx, map, path)?;
                }
            }
            Instance::String(text) => {
                self.string.evaluate(ctx, text, path)?;
                self.check_format(ctx, instance, path);
                if ctx.mode == CheckMode::Coerce {
                    if let Some(number) = coerce_numeric(text) {
                        self.number.evaluate(ctx, number, text.trim(), path);
                    }
                }
            }
            Instance::Number(n) => {
                if let Some(number) = n.as_f64() {
                    self.number.evaluate(ctx, number, &n.to_string(), path);
                }
                self.check_format(ctx, instance, path);
            }
            _ => {}
        }

        if let Some(enumeration) = &self.enumeration {
            enumeration.evaluate(ctx, instance, path);
        }
        Ok(())
    }

    fn check_format(&self, ctx: &mut ValidationContext<'_>, instance: Instance<'_>, path: &str) {
        if let Some(format) = &self.format {
            let options = ctx.options;
            options.formats.validate(format, &instance, path, &mut ctx.errors);
        }
    }
}

/// Parse a keyword holding a list of subschemas.
pub(crate) fn parse_schema_list<'s, B>(
    value: Option<&'s Value>,
    source: &mut B,
) -> Result<Option<Vec<B::Sub>>, ConfigError>
where
    B: KeywordSource<'s>,
{
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| source.subschema(item))
            .collect::<Result<Vec<_>, _>>()
            .map(Some),
        Some(single) => Ok(Some(vec![source.subschema(single)?])),
    }
}
