//! Cross-cutting rules evaluated on every schema node before type dispatch:
//! `extends`, `required`, `type`, `disallow`, `not`, property counts,
//! `dependencies`, and the `allOf`/`anyOf`/`oneOf` combinators.

use serde_json::{Map, Value};
use tracing::trace;

use super::{parse_schema_list, KeywordSource, Limit, Subschema, TypeRule};
use crate::context::ValidationContext;
use crate::error::{ConfigError, ErrorSet};
use crate::instance::{Instance, Segment};

/// `required` in its two drafts.
#[derive(Debug)]
pub(crate) enum Required {
    Absent,
    /// Draft 3: a flag on the property's own schema.
    Flag(bool),
    /// Draft 4: names the object must contain.
    Names(Vec<String>),
}

#[derive(Debug)]
pub(crate) enum Dependency<S> {
    Property(String),
    Properties(Vec<String>),
    Schema(S),
    Ignored,
}

#[derive(Debug)]
pub(crate) struct CommonRules<S> {
    extends: Vec<S>,
    required: Required,
    type_rule: Option<TypeRule<S>>,
    disallow: Option<TypeRule<S>>,
    not: Option<S>,
    min_properties: Option<Limit>,
    max_properties: Option<Limit>,
    dependencies: Vec<(String, Dependency<S>)>,
}

impl<S: Subschema> CommonRules<S> {
    pub fn parse<'s, B>(schema: &'s Map<String, Value>, source: &mut B) -> Result<Self, ConfigError>
    where
        B: KeywordSource<'s, Sub = S>,
    {
        let extends = match schema.get("extends") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::String(uri)) => vec![source.reference(uri)?],
            Some(Value::Array(items)) => items
                .iter()
                .map(|item| match item {
                    Value::String(uri) => source.reference(uri),
                    other => source.subschema(other),
                })
                .collect::<Result<_, _>>()?,
            Some(other) => vec![source.subschema(other)?],
        };

        let required = match schema.get("required") {
            None | Some(Value::Null) => Required::Absent,
            Some(Value::Array(names)) => Required::Names(
                names
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect(),
            ),
            Some(Value::Bool(flag)) => Required::Flag(*flag),
            Some(_) => Required::Flag(true),
        };

        let type_rule = match schema.get("type") {
            None => None,
            Some(value) => Some(TypeRule::parse(value, source)?),
        };
        let disallow = match schema.get("disallow") {
            None | Some(Value::Null) => None,
            Some(value) => Some(TypeRule::parse(value, source)?),
        };
        let not = match schema.get("not") {
            None | Some(Value::Null) => None,
            Some(value) => Some(source.subschema(value)?),
        };

        let mut dependencies = Vec::new();
        if let Some(Value::Object(declared)) = schema.get("dependencies") {
            for (key, dependency) in declared {
                let dependency = match dependency {
                    Value::String(name) => Dependency::Property(name.clone()),
                    Value::Array(names) => Dependency::Properties(
                        names
                            .iter()
                            .filter_map(Value::as_str)
                            .map(str::to_string)
                            .collect(),
                    ),
                    Value::Object(_) => Dependency::Schema(source.subschema(dependency)?),
                    _ => Dependency::Ignored,
                };
                dependencies.push((key.clone(), dependency));
            }
        }

        Ok(Self {
            extends,
            required,
            type_rule,
            disallow,
            not,
            min_properties: Limit::parse(schema.get("minProperties")),
            max_properties: Limit::parse(schema.get("maxProperties")),
            dependencies,
        })
    }

    /// A truthy `required` also makes `enum` apply to absent values.
    pub fn required_is_truthy(&self) -> bool {
        match &self.required {
            Required::Absent => false,
            Required::Flag(flag) => *flag,
            Required::Names(names) => !names.is_empty(),
        }
    }

    pub fn evaluate(
        &self,
        ctx: &mut ValidationContext<'_>,
        instance: Instance<'_>,
        path: &str,
    ) -> Result<(), ConfigError> {
        for extended in &self.extends {
            extended.check(ctx, instance, path, Segment::None)?;
        }

        match (&self.required, instance) {
            (Required::Names(names), Instance::Object(map)) => {
                for name in names {
                    if !map.contains_key(name) {
                        ctx.add_error(path, format!("the property {} is required", name));
                    }
                }
            }
            (Required::Flag(true), Instance::Undefined) => {
                ctx.add_error(path, "is missing and it is required");
            }
            _ => {}
        }

        // An absent value has no type, but `disallow` and `not` still apply.
        if let Some(type_rule) = self.type_rule.as_ref().filter(|_| !instance.is_undefined()) {
            type_rule.check(ctx, instance, path)?;
        }

        if let Some(disallow) = &self.disallow {
            let baseline = ctx.error_count();
            disallow.check(ctx, instance, path)?;
            if ctx.error_count() == baseline {
                ctx.add_error(path, "disallowed value was matched");
            } else {
                trace!(path, "disallow rolled back type errors");
                ctx.errors.rollback(baseline);
            }
        }

        if let Some(not) = &self.not {
            let baseline = ctx.error_count();
            not.check(ctx, instance, path, Segment::None)?;
            if ctx.error_count() == baseline {
                ctx.add_error(path, "matched a schema which it should not");
            } else {
                trace!(path, "not rolled back branch errors");
                ctx.errors.rollback(baseline);
            }
        }

        if let Instance::Object(map) = instance {
            let count = map.len() as f64;
            if let Some(min) = &self.min_properties {
                if count < min.value {
                    ctx.add_error(path, format!("must contain a minimum of {} properties", min));
                }
            }
            if let Some(max) = &self.max_properties {
                if count > max.value {
                    ctx.add_error(path, format!("must contain no more than {} properties", max));
                }
            }

            for (key, dependency) in &self.dependencies {
                if !map.contains_key(key) {
                    continue;
                }
                match dependency {
                    Dependency::Property(name) => {
                        if !map.contains_key(name) {
                            ctx.add_error(path, missing_dependency(key, name));
                        }
                    }
                    Dependency::Properties(names) => {
                        for name in names {
                            if !map.contains_key(name) {
                                ctx.add_error(path, missing_dependency(key, name));
                            }
                        }
                    }
                    Dependency::Schema(schema) => {
                        schema.check(ctx, instance, path, Segment::None)?;
                    }
                    Dependency::Ignored => {}
                }
            }
        }

        Ok(())
    }
}

fn missing_dependency(key: &str, name: &str) -> String {
    format!("{} depends on {} and {} is missing", key, name, name)
}

#[derive(Debug)]
pub(crate) struct CombinatorRules<S> {
    all_of: Option<Vec<S>>,
    any_of: Option<Vec<S>>,
    one_of: Option<Vec<S>>,
}

impl<S: Subschema> CombinatorRules<S> {
    pub fn parse<'s, B>(schema: &'s Map<String, Value>, source: &mut B) -> Result<Self, ConfigError>
    where
        B: KeywordSource<'s, Sub = S>,
    {
        Ok(Self {
            all_of: parse_schema_list(schema.get("allOf"), source)?,
            any_of: parse_schema_list(schema.get("anyOf"), source)?,
            one_of: parse_schema_list(schema.get("oneOf"), source)?,
        })
    }

    pub fn evaluate(
        &self,
        ctx: &mut ValidationContext<'_>,
        instance: Instance<'_>,
        path: &str,
    ) -> Result<(), ConfigError> {
        if instance.is_undefined() {
            return Ok(());
        }

        if let Some(branches) = &self.all_of {
            let mut valid = true;
            for branch in branches {
                let baseline = ctx.error_count();
                branch.check(ctx, instance, path, Segment::None)?;
                valid &= ctx.error_count() == baseline;
            }
            if !valid {
                ctx.add_error(path, "failed to match all schemas");
            }
        }

        if let Some(branches) = &self.any_of {
            let baseline = ctx.error_count();
            let mut valid = false;
            for branch in branches {
                ctx.errors.rollback(baseline);
                branch.check(ctx, instance, path, Segment::None)?;
                if ctx.error_count() == baseline {
                    valid = true;
                    break;
                }
            }
            if valid {
                trace!(path, "anyOf matched, discarding branch errors");
                ctx.errors.rollback(baseline);
            } else {
                ctx.add_error(path, "failed to match at least one schema");
            }
        }

        if let Some(branches) = &self.one_of {
            let baseline = ctx.isolate();
            let mut collected = ErrorSet::new();
            let mut matched = 0;
            for branch in branches {
                branch.check(ctx, instance, path, Segment::None)?;
                let attempt = ctx.isolate();
                if attempt.is_empty() {
                    matched += 1;
                }
                collected.extend(attempt);
            }
            ctx.restore(baseline);
            if matched == 1 {
                trace!(path, "oneOf matched, discarding branch errors");
            } else {
                ctx.errors.extend(collected);
                ctx.add_error(path, "failed to match exactly one schema");
            }
        }

        Ok(())
    }
}
