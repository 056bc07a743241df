//! Property tests: backend equivalence and the combinator laws.

use json_constraint::{check_with, CheckMode, CheckOptions, ConfigError, ErrorSet, PlanCache};
use proptest::prelude::*;
use serde_json::{json, Map, Value};

fn interpret(instance: &Value, schema: &Value, options: &CheckOptions) -> Result<ErrorSet, ConfigError> {
    check_with(instance, schema, options)
}

fn compiled(instance: &Value, schema: &Value, options: &CheckOptions) -> Result<ErrorSet, ConfigError> {
    PlanCache::new()
        .compile(schema, options)
        .and_then(|plan| plan.check(instance))
}

/// Small instances over a narrow alphabet so that schemas actually bite.
fn instance() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        (-3i64..6).prop_map(|n| json!(n)),
        (-3.0f64..6.0).prop_map(|n| json!(n)),
        "[ab0-9]{0,3}".prop_map(Value::String),
        Just(json!("a@b.c")),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map(prop::sample::select(vec!["a", "b", "c"]), inner, 0..3)
                .prop_map(|m| {
                    let map: Map<String, Value> =
                        m.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
                    Value::Object(map)
                }),
        ]
    })
}

fn schema() -> impl Strategy<Value = Value> {
    let types = vec![
        "string", "integer", "number", "boolean", "null", "array", "object", "any",
    ];
    let leaf = prop_oneof![
        Just(json!({})),
        prop::sample::select(types.clone()).prop_map(|t| json!({"type": t})),
        prop::sample::subsequence(types, 2).prop_map(|ts| json!({"type": ts})),
        (0i64..4).prop_map(|n| json!({"minimum": n})),
        (0i64..4).prop_map(|n| json!({"maximum": n, "exclusiveMaximum": true})),
        (0usize..3).prop_map(|n| json!({"maxLength": n})),
        (1usize..3).prop_map(|n| json!({"minItems": n})),
        Just(json!({"pattern": "^[ab]"})),
        Just(json!({"enum": [null, 1, "a", [1]]})),
        Just(json!({"uniqueItems": true})),
        Just(json!({"multipleOf": 2})),
        Just(json!({"required": ["a"]})),
        Just(json!({"format": "email"})),
        Just(json!({"disallow": "string"})),
    ];
    leaf.prop_recursive(3, 16, 3, |inner| {
        prop_oneof![
            (inner.clone(), inner.clone())
                .prop_map(|(a, b)| json!({"properties": {"a": a, "b": b}})),
            (inner.clone(), inner.clone()).prop_map(
                |(a, extra)| json!({"properties": {"a": a}, "additionalProperties": extra})
            ),
            Just(json!({"properties": {"a": {}}, "additionalProperties": false})),
            inner.clone().prop_map(|s| json!({"patternProperties": {"^b": s}})),
            inner.clone().prop_map(|s| json!({"items": s})),
            (inner.clone(), inner.clone(), inner.clone()).prop_map(
                |(a, b, extra)| json!({"items": [a, b], "additionalItems": extra})
            ),
            prop::collection::vec(inner.clone(), 1..3).prop_map(|v| json!({"anyOf": v})),
            prop::collection::vec(inner.clone(), 1..3).prop_map(|v| json!({"oneOf": v})),
            prop::collection::vec(inner.clone(), 1..3).prop_map(|v| json!({"allOf": v})),
            inner.clone().prop_map(|s| json!({"not": s})),
            inner.clone().prop_map(|s| json!({"extends": s})),
            inner.clone().prop_map(|s| json!({
                "definitions": {"d": s},
                "items": {"$ref": "#/definitions/d"}
            })),
            inner.prop_map(|s| json!({"dependencies": {"a": s, "b": "c"}})),
        ]
    })
}

proptest! {
    /// The interpreter and a compiled plan report the same outcome.
    #[test]
    fn backends_agree(schema in schema(), instance in instance()) {
        let options = CheckOptions::new();
        prop_assert_eq!(
            interpret(&instance, &schema, &options),
            compiled(&instance, &schema, &options)
        );
    }

    /// Equivalence also holds when numeric strings are coerced.
    #[test]
    fn backends_agree_when_coercing(schema in schema(), instance in instance()) {
        let options = CheckOptions::new().mode(CheckMode::Coerce);
        prop_assert_eq!(
            interpret(&instance, &schema, &options),
            compiled(&instance, &schema, &options)
        );
    }

    /// `not` accepts exactly what its subschema rejects.
    #[test]
    fn not_inverts(schema in schema(), instance in instance()) {
        let options = CheckOptions::new();
        let negated = json!({"not": schema.clone()});
        if let (Ok(plain), Ok(inverted)) = (
            interpret(&instance, &schema, &options),
            interpret(&instance, &negated, &options),
        ) {
            prop_assert_eq!(inverted.is_valid(), !plain.is_valid());
        }
    }

    /// `oneOf` accepts when exactly one branch does; `anyOf` when any does.
    #[test]
    fn branch_counting(a in schema(), b in schema(), instance in instance()) {
        let options = CheckOptions::new();
        let one_of = json!({"oneOf": [a.clone(), b.clone()]});
        let any_of = json!({"anyOf": [a.clone(), b.clone()]});
        if let (Ok(first), Ok(second), Ok(one), Ok(any)) = (
            interpret(&instance, &a, &options),
            interpret(&instance, &b, &options),
            interpret(&instance, &one_of, &options),
            interpret(&instance, &any_of, &options),
        ) {
            let matched = usize::from(first.is_valid()) + usize::from(second.is_valid());
            prop_assert_eq!(one.is_valid(), matched == 1);
            prop_assert_eq!(any.is_valid(), matched >= 1);
        }
    }

    /// Checking is a pure function of its inputs, and compiling is memoized.
    #[test]
    fn checks_are_deterministic(schema in schema(), instance in instance()) {
        let options = CheckOptions::new();
        prop_assert_eq!(
            interpret(&instance, &schema, &options),
            interpret(&instance, &schema, &options)
        );

        let cache = PlanCache::new();
        if let (Ok(first), Ok(second)) = (
            cache.compile(&schema, &options),
            cache.compile(&schema, &options),
        ) {
            prop_assert!(first.same_plan(&second));
            prop_assert_eq!(first.check(&instance), second.check(&instance));
        }
    }
}
