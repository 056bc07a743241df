//! The `type` keyword (and `disallow`, which reuses it).

use serde_json::Value;

use super::{KeywordSource, Subschema};
use crate::context::ValidationContext;
use crate::error::{ConfigError, ErrorSet};
use crate::instance::{Instance, Segment};
use crate::types::PrimitiveType;

#[derive(Debug)]
pub(crate) enum TypeRule<S> {
    /// Empty, `null` or `false`: anything goes.
    Any,
    Named(PrimitiveType),
    /// An embedded schema the value must satisfy.
    Schema(S),
    /// Candidates tried in order.
    Union(Vec<TypeRule<S>>),
    /// Not a type name; fatal once a value reaches it.
    Unknown(String),
}

impl<S: Subschema> TypeRule<S> {
    pub fn parse<'s, B>(value: &'s Value, source: &mut B) -> Result<Self, ConfigError>
    where
        B: KeywordSource<'s, Sub = S>,
    {
        Ok(match value {
            Value::Null | Value::Bool(false) => TypeRule::Any,
            Value::String(name) if name.is_empty() => TypeRule::Any,
            Value::String(name) => match PrimitiveType::parse(name) {
                Some(primitive) => TypeRule::Named(primitive),
                None => TypeRule::Unknown(name.clone()),
            },
            Value::Number(n) if n.as_f64() == Some(0.0) => TypeRule::Any,
            Value::Array(candidates) => TypeRule::Union(
                candidates
                    .iter()
                    .map(|candidate| TypeRule::parse(candidate, source))
                    .collect::<Result<_, _>>()?,
            ),
            Value::Object(_) => TypeRule::Schema(source.subschema(value)?),
            other => TypeRule::Unknown(other.to_string()),
        })
    }

    pub fn check(
        &self,
        ctx: &mut ValidationContext<'_>,
        instance: Instance<'_>,
        path: &str,
    ) -> Result<(), ConfigError> {
        match self {
            TypeRule::Any => Ok(()),
            TypeRule::Named(primitive) => {
                if !primitive.matches(&instance, ctx.mode) {
                    ctx.add_error(
                        path,
                        format!(
                            "{} value found, but a {} is required",
                            instance.kind(),
                            primitive.as_str()
                        ),
                    );
                }
                Ok(())
            }
            TypeRule::Schema(schema) => schema.check(ctx, instance, path, Segment::None),
            TypeRule::Unknown(name) => Err(ConfigError::UnknownType {
                path: path.to_string(),
                name: name.clone(),
            }),
            TypeRule::Union(candidates) => {
                // Each candidate runs in isolation; only the last failure is kept.
                let saved = ctx.isolate();
                let mut last = ErrorSet::new();
                let mut matched = candidates.is_empty();
                for candidate in candidates {
                    candidate.check(ctx, instance, path)?;
                    let attempt = ctx.isolate();
                    if attempt.is_empty() {
                        matched = true;
                        break;
                    }
                    last = attempt;
                }
                ctx.restore(saved);
                if !matched {
                    ctx.errors.extend(last);
                }
                Ok(())
            }
        }
    }
}
