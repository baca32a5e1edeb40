//! Error taxonomy and propagation behavior.

use chisel_state::{produce, produce_sharded, KeySharder, RecipeFn, Snapshot, StateError};
use serde_json::json;

#[test]
fn test_recipe_failure_wraps_original_message() {
    let state = Snapshot::from_value(&json!({"items": [1]}));
    let err = produce(&state, |d| {
        d.get_draft("items")?.remove(5)?;
        Ok(())
    })
    .unwrap_err();

    match err {
        StateError::RecipeFailure { message } => {
            assert!(message.contains("index 5 out of bounds"));
            assert!(message.contains("$.items"));
        }
        other => panic!("expected RecipeFailure, got {other}"),
    }
}

#[test]
fn test_recipe_failure_is_single_kind() {
    let state = Snapshot::from_value(&json!({"n": 1, "s": "x", "a": []}));
    let failing: Vec<Box<RecipeFn>> = vec![
        Box::new(|d| d.increment("s", 1)),
        Box::new(|d| d.get_draft("n").map(|_| ())),
        Box::new(|d| d.get_draft("a")?.set("k", 1)),
        Box::new(|d| {
            d.delete("missing")?;
            d.increment("missing", 1)
        }),
    ];
    for recipe in &failing {
        let err = produce(&state, |d| recipe(d)).unwrap_err();
        assert!(
            matches!(err, StateError::RecipeFailure { .. }),
            "expected RecipeFailure, got {err}"
        );
    }
}

#[test]
fn test_reversed_remove_range_fails_without_panicking() {
    let state = Snapshot::from_value(&json!({"items": [1, 2, 3, 4]}));
    let err = produce(&state, |d| d.get_draft("items")?.remove_range(3..1)).unwrap_err();

    match err {
        StateError::RecipeFailure { message } => {
            assert!(message.contains("range start 3 exceeds range end 1"));
        }
        other => panic!("expected RecipeFailure, got {other}"),
    }
    assert_eq!(state.to_value().unwrap(), json!({"items": [1, 2, 3, 4]}));
}

#[test]
fn test_shard_mismatch_is_fail_fast() {
    let state = Snapshot::from_value(&json!({"a": 1, "b": 2, "c": 3}));
    let noop: &RecipeFn = &|_| Ok(());

    let err = produce_sharded(&state, &[noop, noop], &KeySharder::new(3)).unwrap_err();
    match err {
        StateError::ShardMismatch { chunks, recipes } => {
            assert_eq!((chunks, recipes), (3, 2));
        }
        other => panic!("expected ShardMismatch, got {other}"),
    }
}

#[test]
fn test_shard_chunk_failure_propagates() {
    let state = Snapshot::from_value(&json!({"a": {"n": 1}, "b": {"n": 2}}));
    let good: &RecipeFn = &|_| Ok(());
    let bad: &RecipeFn = &|d| d.increment("nope", 1);

    let err = produce_sharded(&state, &[good, bad], &KeySharder::new(2)).unwrap_err();
    assert!(matches!(err, StateError::RecipeFailure { .. }));
    assert_eq!(state.to_value().unwrap(), json!({"a": {"n": 1}, "b": {"n": 2}}));
}

#[test]
fn test_errors_display_paths() {
    let state = Snapshot::from_value(&json!({"user": {"roles": ["admin"]}}));
    let err = produce(&state, |d| {
        d.get_draft("user")?.get_draft("roles")?.set("k", 1)
    })
    .unwrap_err();
    // The wrapped message points at the offending nested path.
    assert!(err.to_string().contains("$.user.roles"));
}
