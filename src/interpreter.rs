//! The interpreted backend: walks the raw schema tree on every check.

use std::sync::Arc;

use regex::Regex;
use serde_json::Value;

use crate::constraints::{KeywordSource, Keywords, Subschema};
use crate::context::ValidationContext;
use crate::error::{ConfigError, ErrorSet};
use crate::instance::{increment_path, Instance, Segment};
use crate::loader::navigate_fragment;
use crate::reference::{resolve, Scope, Target};
use crate::types::{json_type_name, CheckOptions};

/// A schema node to visit, with the scope it was found in.
pub(crate) struct Interp<'s> {
    node: Node<'s>,
    scope: Scope<'s>,
}

enum Node<'s> {
    Schema(&'s Value),
    /// A string `extends` entry, resolved when visited.
    Reference(&'s str),
}

impl Subschema for Interp<'_> {
    fn check(
        &self,
        ctx: &mut ValidationContext<'_>,
        instance: Instance<'_>,
        parent: &str,
        segment: Segment<'_>,
    ) -> Result<(), ConfigError> {
        let path = increment_path(parent, segment);
        self.run(ctx, instance, &path, segment)
    }
}

impl<'s> Interp<'s> {
    fn run(
        &self,
        ctx: &mut ValidationContext<'_>,
        instance: Instance<'_>,
        path: &str,
        segment: Segment<'_>,
    ) -> Result<(), ConfigError> {
        ctx.enter(path)?;
        let result = match self.node {
            Node::Schema(schema) => visit(schema, &self.scope, ctx, instance, path, segment),
            Node::Reference(uri) => follow(uri, &self.scope, ctx, instance, path, segment),
        };
        ctx.leave();
        result
    }
}

fn visit<'s>(
    schema: &'s Value,
    scope: &Scope<'s>,
    ctx: &mut ValidationContext<'_>,
    instance: Instance<'_>,
    path: &str,
    segment: Segment<'_>,
) -> Result<(), ConfigError> {
    let map = match schema {
        Value::Object(map) => map,
        Value::Null | Value::Bool(true) => return Ok(()),
        other => {
            return Err(ConfigError::NotAnObject {
                path: path.to_string(),
                actual: json_type_name(other).to_string(),
            })
        }
    };

    let scope = scope.enter(map)?;
    if let Some(Value::String(uri)) = map.get("$ref") {
        return follow(uri, &scope, ctx, instance, path, segment);
    }

    let keywords = Keywords::parse(
        map,
        &mut Source {
            ctx: &mut *ctx,
            scope: &scope,
        },
    )?;
    keywords.evaluate(ctx, instance, path, segment)
}

// The target replaces the referring node at the same path, one level deeper.
fn follow<'s>(
    uri: &str,
    scope: &Scope<'s>,
    ctx: &mut ValidationContext<'_>,
    instance: Instance<'_>,
    path: &str,
    segment: Segment<'_>,
) -> Result<(), ConfigError> {
    match resolve(uri, scope, ctx.options)? {
        Target::Local(node) => Interp {
            node: Node::Schema(node),
            scope: scope.clone(),
        }
        .run(ctx, instance, path, segment),
        Target::Remote {
            document,
            fragment,
            base,
            ..
        } => {
            let root: &Value = &document;
            let node = navigate_fragment(root, &fragment).ok_or_else(|| {
                ConfigError::UnresolvableReference {
                    uri: uri.to_string(),
                    message: format!("fragment \"{}\" not found", fragment),
                }
            })?;
            Interp {
                node: Node::Schema(node),
                scope: Scope::new(root, base),
            }
            .run(ctx, instance, path, segment)
        }
    }
}

struct Source<'a, 's, 'o> {
    ctx: &'a mut ValidationContext<'o>,
    scope: &'a Scope<'s>,
}

impl<'s> KeywordSource<'s> for Source<'_, 's, '_> {
    type Sub = Interp<'s>;

    fn subschema(&mut self, schema: &'s Value) -> Result<Interp<'s>, ConfigError> {
        Ok(Interp {
            node: Node::Schema(schema),
            scope: self.scope.clone(),
        })
    }

    fn reference(&mut self, uri: &'s str) -> Result<Interp<'s>, ConfigError> {
        Ok(Interp {
            node: Node::Reference(uri),
            scope: self.scope.clone(),
        })
    }

    fn regex(&mut self, pattern: &str) -> Result<Regex, String> {
        self.ctx.regex(pattern)
    }
}

/// Check `instance` against `schema`, adding to the errors already in `ctx`.
pub(crate) fn evaluate(
    ctx: &mut ValidationContext<'_>,
    instance: &Value,
    schema: &Value,
) -> Result<(), ConfigError> {
    let base = ctx.options.base_uri.clone().map(Arc::new);
    Interp {
        node: Node::Schema(schema),
        scope: Scope::new(schema, base),
    }
    .run(ctx, Instance::from(instance), "", Segment::None)
}

/// Check `instance` against `schema` with a fresh context.
pub(crate) fn interpret(
    instance: &Value,
    schema: &Value,
    options: &CheckOptions,
) -> Result<ErrorSet, ConfigError> {
    let mut ctx = ValidationContext::new(options);
    evaluate(&mut ctx, instance, schema)?;
    Ok(ctx.errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retriever::MemoryRetriever;
    use serde_json::json;

    fn messages(instance: Value, schema: Value) -> Vec<(String, String)> {
        interpret(&instance, &schema, &CheckOptions::new())
            .unwrap()
            .into_iter()
            .map(|e| (e.path, e.message))
            .collect()
    }

    #[test]
    fn nested_property_paths() {
        let schema = json!({
            "properties": {
                "items": {"items": {"properties": {"name": {"type": "string"}}}}
            }
        });
        let errors = messages(json!({"items": [{"name": "a"}, {"name": 3}]}), schema);
        assert_eq!(
            errors,
            [(
                "items[1].name".to_string(),
                "integer value found, but a string is required".to_string()
            )]
        );
    }

    #[test]
    fn local_reference_replaces_node() {
        let schema = json!({
            "definitions": {"positive": {"minimum": 0, "exclusiveMinimum": true}},
            "properties": {"n": {"$ref": "#/definitions/positive", "maximum": 10}}
        });
        assert!(messages(json!({"n": 50}), schema.clone()).is_empty());
        assert_eq!(messages(json!({"n": 0}), schema).len(), 1);
    }

    #[test]
    fn recursive_reference_walks_nested_data() {
        let schema = json!({
            "type": "object",
            "properties": {"child": {"$ref": "#"}, "n": {"type": "integer"}}
        });
        let errors = messages(json!({"child": {"child": {"n": "x"}}}), schema);
        assert_eq!(errors[0].0, "child.child.n");
    }

    #[test]
    fn self_reference_without_progress_exceeds_depth() {
        let schema = json!({"$ref": "#"});
        let err = interpret(&json!(1), &schema, &CheckOptions::new().max_depth(8)).unwrap_err();
        assert_eq!(
            err,
            ConfigError::DepthExceeded {
                path: String::new(),
                limit: 8
            }
        );
    }

    #[test]
    fn non_object_subschema_is_fatal() {
        let err = interpret(&json!({"a": 1}), &json!({"properties": {"a": 5}}), &CheckOptions::new())
            .unwrap_err();
        assert_eq!(
            err,
            ConfigError::NotAnObject {
                path: "a".into(),
                actual: "number".into()
            }
        );
    }

    #[test]
    fn string_extends_resolves_through_retriever() {
        let options = CheckOptions::new().retriever(
            MemoryRetriever::new().with_document("http://example.com/base.json", json!({"minLength": 2})),
        );
        let schema = json!({"extends": "http://example.com/base.json", "maxLength": 4});
        assert_eq!(
            interpret(&json!("a"), &schema, &options).unwrap().as_slice()[0].message,
            "must be at least 2 characters long"
        );
        assert!(interpret(&json!("abc"), &schema, &options).unwrap().is_empty());
    }

    #[test]
    fn unresolvable_reference_is_fatal_only_when_reached() {
        let schema = json!({"properties": {"a": {"$ref": "#/missing"}}});
        assert!(interpret(&json!("text"), &schema, &CheckOptions::new()).unwrap().is_empty());
        let err = interpret(&json!({"a": 1}), &schema, &CheckOptions::new()).unwrap_err();
        assert!(matches!(err, ConfigError::UnresolvableReference { .. }));
    }
}
