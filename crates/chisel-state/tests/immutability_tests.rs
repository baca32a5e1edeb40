//! Immutability guarantees of the produce pipeline.

use chisel_state::{batch_produce, produce, RecipeFn, Snapshot, StateError};
use serde_json::json;

#[test]
fn test_original_never_mutated() {
    let original = json!({
        "user": {"name": "alice", "roles": ["admin"]},
        "counters": {"visits": 10},
        "items": [1, 2, 3]
    });
    let state = Snapshot::from_value(&original);

    let _ = produce(&state, |d| {
        d.get_draft("user")?.set("name", "bob")?;
        d.get_draft("user")?.get_draft("roles")?.push("editor")?;
        d.get_draft("counters")?.increment("visits", 5)?;
        d.get_draft("items")?.remove(0)?;
        d.set("extra", json!({"new": true}))
    })
    .unwrap();

    assert_eq!(state.to_value().unwrap(), original);
}

#[test]
fn test_recipe_application() {
    let state = Snapshot::from_value(&json!({"count": 0}));
    let next = produce(&state, |d| d.increment("count", 1)).unwrap();
    assert_eq!(next.to_value().unwrap(), json!({"count": 1}));
    assert_eq!(state.to_value().unwrap(), json!({"count": 0}));
}

#[test]
fn test_result_references_are_distinct() {
    let state = Snapshot::from_value(&json!({"a": {"v": 1}, "b": {"v": 2}}));
    let next = produce(&state, |d| d.get_draft("a")?.set("v", 10)).unwrap();

    // Roots live in different arenas entirely.
    assert!(!state.root().ptr_eq(&next.root()));
    assert!(!state
        .root()
        .get("a")
        .unwrap()
        .ptr_eq(&next.root().get("a").unwrap()));
    assert_eq!(next.root().get("a").unwrap().get("v").unwrap().as_i64(), Some(10));
    assert_eq!(next.root().get("b").unwrap().get("v").unwrap().as_i64(), Some(2));
}

#[test]
fn test_failure_atomicity() {
    let state = Snapshot::from_value(&json!({"count": 0}));
    // Mutate first, then fail: the mutation must not leak anywhere.
    let err = produce(&state, |d| {
        d.set("count", 99)?;
        d.increment("missing", 1)
    })
    .unwrap_err();

    assert!(matches!(err, StateError::RecipeFailure { .. }));
    assert_eq!(state.to_value().unwrap(), json!({"count": 0}));
}

#[test]
fn test_batch_single_clone_and_ordering() {
    let state = Snapshot::from_value(&json!({"count": 0, "log": []}));
    let first: &RecipeFn = &|d| {
        d.increment("count", 1)?;
        d.get_draft("log")?.push("first")
    };
    let second: &RecipeFn = &|d| {
        // Observes the first recipe's effects within the same batch.
        let count = d.get("count")?.unwrap().as_i64().unwrap();
        d.set("count", count + 2)?;
        d.get_draft("log")?.push("second")
    };

    let next = batch_produce(&state, &[first, second]).unwrap();
    assert_eq!(
        next.to_value().unwrap(),
        json!({"count": 3, "log": ["first", "second"]})
    );
    assert_eq!(state.to_value().unwrap(), json!({"count": 0, "log": []}));
}

#[test]
fn test_batch_failure_leaves_original_untouched() {
    let state = Snapshot::from_value(&json!({"count": 0}));
    let good: &RecipeFn = &|d| d.increment("count", 1);
    let bad: &RecipeFn = &|d| d.increment("missing", 1);

    let err = batch_produce(&state, &[good, bad]).unwrap_err();
    assert!(matches!(err, StateError::RecipeFailure { .. }));
    assert_eq!(state.to_value().unwrap(), json!({"count": 0}));
}

#[test]
fn test_empty_batch_is_identity() {
    let state = Snapshot::from_value(&json!({"a": 1}));
    let next = batch_produce(&state, &[]).unwrap();
    assert_eq!(next, state);
}

#[test]
fn test_produce_on_null_and_scalars() {
    for v in [json!(null), json!(true), json!(3.5), json!("s")] {
        let state = Snapshot::from_value(&v);
        let next = produce(&state, |_| Ok(())).unwrap();
        assert_eq!(next.to_value().unwrap(), v);
    }
}
