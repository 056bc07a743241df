//! Plan cache behaviour: memoization, sharing, cycles and concurrency.

use std::sync::Arc;
use std::thread;

use json_constraint::{
    check_with, compile_with, CheckOptions, ConfigError, MemoryRetriever, PlanCache,
};
use serde_json::{json, Value};

fn tree_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "value": {"type": "integer"},
            "children": {"type": "array", "items": {"$ref": "#"}}
        },
        "required": ["value"]
    })
}

#[test]
fn compiling_twice_yields_the_same_plan() {
    let cache = PlanCache::new();
    let options = CheckOptions::new();
    let first = cache.compile(&tree_schema(), &options).unwrap();
    let plans = cache.len();
    let second = cache.compile(&tree_schema(), &options).unwrap();

    assert!(first.same_plan(&second));
    assert_eq!(first.key(), second.key());
    assert_eq!(cache.len(), plans);
}

#[test]
fn key_order_is_part_of_the_shape() {
    // Property order decides error order, so reordered schemas differ.
    let cache = PlanCache::new();
    let options = CheckOptions::new();
    let ab = cache
        .compile(&json!({"properties": {"a": {}, "b": {}}}), &options)
        .unwrap();
    let ba = cache
        .compile(&json!({"properties": {"b": {}, "a": {}}}), &options)
        .unwrap();
    assert!(!ab.same_plan(&ba));
}

#[test]
fn identical_subschemas_compile_once() {
    let cache = PlanCache::new();
    let leaf = json!({"type": "string", "maxLength": 8});
    let schema = json!({
        "properties": {"a": leaf.clone(), "b": leaf.clone()},
        "items": leaf.clone(),
        "anyOf": [leaf.clone(), {"not": leaf}]
    });
    cache.compile(&schema, &CheckOptions::new()).unwrap();
    // root, leaf, and the `not` wrapper
    assert_eq!(cache.len(), 3);
}

#[test]
fn recursive_schema_matches_interpreter() {
    let cache = PlanCache::new();
    let options = CheckOptions::new();
    let schema = tree_schema();
    let plan = cache.compile(&schema, &options).unwrap();

    let instance = json!({
        "value": 1,
        "children": [
            {"value": 2, "children": []},
            {"value": "three", "children": [{"children": []}]}
        ]
    });
    let compiled = plan.check(&instance).unwrap();
    let interpreted = check_with(&instance, &schema, &options).unwrap();
    assert_eq!(compiled, interpreted);

    let paths: Vec<_> = compiled.iter().map(|e| e.path.as_str()).collect();
    assert_eq!(paths, ["children[1].value", "children[1].children[0]"]);
}

#[test]
fn same_reference_text_in_different_documents_is_not_shared() {
    let cache = PlanCache::new();
    let options = CheckOptions::new();
    let strings = json!({"definitions": {"x": {"type": "string"}}, "items": {"$ref": "#/definitions/x"}});
    let nulls = json!({"definitions": {"x": {"type": "null"}}, "items": {"$ref": "#/definitions/x"}});

    let strings_plan = cache.compile(&strings, &options).unwrap();
    let nulls_plan = cache.compile(&nulls, &options).unwrap();

    assert!(strings_plan.check(&json!(["a"])).unwrap().is_valid());
    assert!(!nulls_plan.check(&json!(["a"])).unwrap().is_valid());
    assert!(nulls_plan.check(&json!([null])).unwrap().is_valid());
}

#[test]
fn remote_documents_are_fetched_at_compile_time() {
    let retriever = Arc::new(
        MemoryRetriever::new().with_document("http://example.com/id.json", json!({"type": "integer"})),
    );
    let options = CheckOptions::new().shared_retriever(retriever);
    let cache = PlanCache::new();
    let plan = cache
        .compile(&json!({"items": {"$ref": "http://example.com/id.json"}}), &options)
        .unwrap();

    let errors = plan.check(&json!([1, "x"])).unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors.as_slice()[0].path, "[1]");
}

#[test]
fn unresolvable_reference_surfaces_when_reached() {
    let cache = PlanCache::new();
    let options = CheckOptions::new();
    let plan = cache
        .compile(&json!({"properties": {"a": {"$ref": "#/nowhere"}}}), &options)
        .unwrap();

    assert!(plan.check(&json!("not an object")).unwrap().is_valid());
    assert!(matches!(
        plan.check(&json!({"a": 1})),
        Err(ConfigError::UnresolvableReference { .. })
    ));
}

#[test]
fn failed_retrieval_is_retried_on_next_compile() {
    let schema = json!({"items": {"$ref": "mem://later/count.json"}});
    let cache = PlanCache::new();

    let missing = CheckOptions::new().retriever(MemoryRetriever::new());
    let plan = cache.compile(&schema, &missing).unwrap();
    assert!(matches!(
        plan.check(&json!([1])),
        Err(ConfigError::UnresolvableReference { .. })
    ));

    let present = CheckOptions::new().retriever(
        MemoryRetriever::new().with_document("mem://later/count.json", json!({"type": "integer"})),
    );
    let plan = cache.compile(&schema, &present).unwrap();
    let instance = json!([1, "x"]);
    assert_eq!(plan.check(&instance), check_with(&instance, &schema, &present));
    assert_eq!(plan.check(&instance).unwrap().len(), 1);
}

#[test]
fn failed_retrieval_leaves_global_cache_clean() {
    let schema = json!({"properties": {"n": {"$ref": "mem://global-later/n.json"}}});
    let missing = CheckOptions::new().retriever(MemoryRetriever::new());
    assert!(compile_with(&schema, &missing).is_ok());

    let present = CheckOptions::new().retriever(
        MemoryRetriever::new().with_document("mem://global-later/n.json", json!({"minimum": 5})),
    );
    let instance = json!({"n": 1});
    assert_eq!(
        compile_with(&schema, &present).unwrap().check(&instance),
        check_with(&instance, &schema, &present)
    );
}

#[test]
fn compile_depth_limit_fails_compile() {
    let mut schema = json!({});
    for _ in 0..20 {
        schema = json!({"properties": {"next": schema}});
    }
    let cache = PlanCache::new();
    let err = cache
        .compile(&schema, &CheckOptions::new().max_depth(10))
        .unwrap_err();
    assert!(matches!(err, ConfigError::DepthExceeded { limit: 10, .. }));
    assert!(cache.is_empty());

    assert!(cache.compile(&schema, &CheckOptions::new()).is_ok());
}

#[test]
fn concurrent_compilation_installs_one_plan() {
    let cache = PlanCache::new();
    let schema = Arc::new(tree_schema());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let cache = cache.clone();
            let schema = Arc::clone(&schema);
            thread::spawn(move || cache.compile(&schema, &CheckOptions::new()).unwrap())
        })
        .collect();
    let plans: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    for plan in &plans[1..] {
        assert!(plans[0].same_plan(plan));
    }
    let single = PlanCache::new();
    single.compile(&schema, &CheckOptions::new()).unwrap();
    assert_eq!(cache.len(), single.len());
}

#[test]
fn plans_are_shared_across_threads() {
    let cache = PlanCache::new();
    let plan = cache.compile(&tree_schema(), &CheckOptions::new()).unwrap();
    let expected = plan.check(&json!({"value": "x"})).unwrap();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let plan = plan.clone();
            thread::spawn(move || plan.check(&json!({"value": "x"})).unwrap())
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap(), expected);
    }
}
