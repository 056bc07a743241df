//! Array evaluation: item counts, uniqueness, `items` and `additionalItems`.

use std::collections::HashSet;

use serde_json::{Map, Value};

use super::{Additional, KeywordSource, Limit, Subschema};
use crate::context::ValidationContext;
use crate::error::ConfigError;
use crate::instance::{Instance, Segment};

#[derive(Debug)]
enum Items<S> {
    Absent,
    /// One schema for every element.
    Single(S),
    /// One schema per position.
    Positional(Vec<S>),
}

#[derive(Debug)]
pub(crate) struct CollectionRules<S> {
    min_items: Option<Limit>,
    max_items: Option<Limit>,
    unique_items: bool,
    items: Items<S>,
    additional: Additional<S>,
}

impl<S: Subschema> CollectionRules<S> {
    pub fn parse<'s, B>(schema: &'s Map<String, Value>, source: &mut B) -> Result<Self, ConfigError>
    where
        B: KeywordSource<'s, Sub = S>,
    {
        let items = match schema.get("items") {
            Some(value @ Value::Object(_)) => Items::Single(source.subschema(value)?),
            Some(Value::Array(positional)) => Items::Positional(
                positional
                    .iter()
                    .map(|item| source.subschema(item))
                    .collect::<Result<_, _>>()?,
            ),
            _ => Items::Absent,
        };

        Ok(Self {
            min_items: Limit::parse(schema.get("minItems")),
            max_items: Limit::parse(schema.get("maxItems")),
            unique_items: schema.get("uniqueItems") == Some(&Value::Bool(true)),
            items,
            additional: Additional::parse(schema.get("additionalItems"), source)?,
        })
    }

    pub fn evaluate(
        &self,
        ctx: &mut ValidationContext<'_>,
        elements: &[Value],
        path: &str,
        segment: Segment<'_>,
    ) -> Result<(), ConfigError> {
        let count = elements.len() as f64;
        if let Some(min) = &self.min_items {
            if count < min.value {
                ctx.add_error(path, format!("There must be a minimum of {} in the array", min));
            }
        }
        if let Some(max) = &self.max_items {
            if count > max.value {
                ctx.add_error(path, format!("There must be a maximum of {} in the array", max));
            }
        }
        if self.unique_items && has_duplicates(elements) {
            ctx.add_error(path, "There are no duplicates allowed in the array");
        }

        match &self.items {
            Items::Absent => Ok(()),
            Items::Single(schema) => self.check_each(ctx, schema, elements, path),
            Items::Positional(schemas) => {
                self.check_positional(ctx, schemas, elements, path, segment)
            }
        }
    }

    // A failing element gets a second chance against `additionalItems`;
    // the attempt with fewer errors is kept, ties going to `items`.
    fn check_each(
        &self,
        ctx: &mut ValidationContext<'_>,
        schema: &S,
        elements: &[Value],
        path: &str,
    ) -> Result<(), ConfigError> {
        for (index, element) in elements.iter().enumerate() {
            let instance = Instance::from(element);
            let baseline = ctx.error_count();
            schema.check(ctx, instance, path, Segment::Index(index))?;

            let retry = match &self.additional {
                Additional::Absent | Additional::Deny => continue,
                retry => retry,
            };
            if ctx.error_count() == baseline {
                continue;
            }

            let first = ctx.errors.split_off(baseline);
            if let Additional::Schema(additional) = retry {
                additional.check(ctx, instance, path, Segment::Index(index))?;
            }
            if ctx.error_count() - baseline >= first.len() {
                ctx.errors.rollback(baseline);
                for error in first {
                    ctx.errors.push(error);
                }
            }
        }
        Ok(())
    }

    fn check_positional(
        &self,
        ctx: &mut ValidationContext<'_>,
        schemas: &[S],
        elements: &[Value],
        path: &str,
        segment: Segment<'_>,
    ) -> Result<(), ConfigError> {
        for (index, element) in elements.iter().enumerate() {
            let instance = Instance::from(element);
            if let Some(schema) = schemas.get(index) {
                schema.check(ctx, instance, path, Segment::Index(index))?;
                continue;
            }
            match &self.additional {
                Additional::Schema(additional) => {
                    additional.check(ctx, instance, path, Segment::Index(index))?;
                }
                Additional::Deny => ctx.add_error(
                    path,
                    format!(
                        "The item {}[{}] is not defined and the definition does not allow additional items",
                        segment, index
                    ),
                ),
                Additional::Allow | Additional::Absent => {}
            }
        }

        // More schemas than data: the missing positions are checked as absent.
        if !elements.is_empty() {
            for (index, schema) in schemas.iter().enumerate().skip(elements.len()) {
                schema.check(ctx, Instance::Undefined, path, Segment::Index(index))?;
            }
        }
        Ok(())
    }
}

/// Distinctness over each element's compact JSON rendering.
fn has_duplicates(elements: &[Value]) -> bool {
    let mut seen = HashSet::with_capacity(elements.len());
    elements
        .iter()
        .map(|element| element.to_string())
        .any(|rendered| !seen.insert(rendered))
}
