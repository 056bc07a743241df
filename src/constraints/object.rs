//! Object evaluation: `properties`, `patternProperties`,
//! `additionalProperties` and the draft 3 `requires`.

use regex::Regex;
use serde_json::{Map, Value};
use tracing::warn;

use super::{Additional, KeywordSource, Subschema};
use crate::context::ValidationContext;
use crate::error::ConfigError;
use crate::instance::{increment_path, Instance, Segment};
use crate::types::INLINE_SCHEMA_PROPERTY;

#[derive(Debug)]
struct PropertyRule<S> {
    name: String,
    schema: S,
    /// A `null` definition counts as undeclared for the additional check.
    declared: bool,
    requires: Option<String>,
}

#[derive(Debug)]
struct PatternRule<S> {
    pattern: String,
    regex: Result<Regex, String>,
    schema: S,
}

/// Present only when the schema declares `properties` or `patternProperties`.
#[derive(Debug)]
pub(crate) struct ObjectRules<S> {
    patterns: Vec<PatternRule<S>>,
    properties: Vec<PropertyRule<S>>,
    additional: Additional<S>,
}

impl<S: Subschema> ObjectRules<S> {
    pub fn parse<'s, B>(
        schema: &'s Map<String, Value>,
        source: &mut B,
    ) -> Result<Option<Self>, ConfigError>
    where
        B: KeywordSource<'s, Sub = S>,
    {
        let declared = schema.get("properties").filter(|v| !v.is_null());
        let pattern_declared = schema.get("patternProperties").filter(|v| !v.is_null());
        if declared.is_none() && pattern_declared.is_none() {
            return Ok(None);
        }

        let mut patterns = Vec::new();
        if let Some(Value::Object(map)) = pattern_declared {
            for (pattern, sub) in map {
                patterns.push(PatternRule {
                    pattern: pattern.clone(),
                    regex: source.regex(pattern),
                    schema: source.subschema(sub)?,
                });
            }
        }

        let mut properties = Vec::new();
        if let Some(Value::Object(map)) = declared {
            for (name, sub) in map {
                let requires = sub
                    .get("requires")
                    .and_then(Value::as_str)
                    .map(str::to_string);
                properties.push(PropertyRule {
                    name: name.clone(),
                    schema: source.subschema(sub)?,
                    declared: !sub.is_null(),
                    requires,
                });
            }
        }

        let additional = Additional::parse(schema.get("additionalProperties"), source)?;

        Ok(Some(Self {
            patterns,
            properties,
            additional,
        }))
    }

    fn property(&self, name: &str) -> Option<&PropertyRule<S>> {
        self.properties
            .iter()
            .find(|rule| rule.declared && rule.name == name)
    }

    pub fn evaluate(
        &self,
        ctx: &mut ValidationContext<'_>,
        object: &Map<String, Value>,
        path: &str,
    ) -> Result<(), ConfigError> {
        let mut matched: Vec<&str> = Vec::new();
        for rule in &self.patterns {
            let regex = match &rule.regex {
                Ok(regex) => regex,
                Err(reason) => {
                    warn!(path, pattern = %rule.pattern, %reason, "skipping invalid patternProperties regex");
                    ctx.add_error(path, format!("The pattern \"{}\" is invalid", rule.pattern));
                    continue;
                }
            };
            for (key, value) in object {
                if regex.is_match(key) {
                    matched.push(key.as_str());
                    rule.schema
                        .check(ctx, Instance::from(value), path, Segment::Key(key))?;
                }
            }
        }

        for rule in &self.properties {
            let value = object
                .get(&rule.name)
                .map(Instance::from)
                .unwrap_or(Instance::Undefined);
            rule.schema
                .check(ctx, value, path, Segment::Key(&rule.name))?;
        }

        for (key, value) in object {
            let definition = self.property(key);
            let covered = definition.is_some() || matched.contains(&key.as_str());

            if !covered {
                match &self.additional {
                    Additional::Deny if key != INLINE_SCHEMA_PROPERTY => {
                        ctx.add_error(
                            &increment_path(path, Segment::Key(key)),
                            format!(
                                "The property {} is not defined and the definition does not allow additional properties",
                                key
                            ),
                        );
                    }
                    Additional::Schema(schema) => {
                        schema.check(ctx, Instance::from(value), path, Segment::Key(key))?;
                    }
                    _ => {}
                }
            }

            if let Some(required) = definition.and_then(|rule| rule.requires.as_deref()) {
                if !object.contains_key(required) {
                    ctx.add_error(
                        path,
                        format!(
                            "the presence of the property {} requires that {} also be present",
                            key, required
                        ),
                    );
                }
            }
        }

        Ok(())
    }
}
