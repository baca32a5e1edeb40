//! Property tests for cache-key derivation over arbitrary states.

use chisel_memo::{MemoCache, MemoConfig, MemoRecipe};
use chisel_state::Snapshot;
use proptest::prelude::*;
use serde_json::Value;

fn arb_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i32>().prop_map(|n| Value::from(n as i64)),
        "[a-z]{0,8}".prop_map(Value::String),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::Array),
            prop::collection::btree_map("[a-z]{1,4}", inner, 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

proptest! {
    /// Equal content always derives the same key, regardless of how many
    /// snapshots it was loaded into.
    #[test]
    fn prop_key_deterministic_for_equal_content(value in arb_value()) {
        let cache = MemoCache::new(MemoConfig::default());
        let recipe = MemoRecipe::new("noop", |_| Ok(()));
        let a = Snapshot::from_value(&value);
        let b = Snapshot::from_value(&value);
        prop_assert_eq!(
            cache.derive_key(&a, &recipe, None),
            cache.derive_key(&b, &recipe, None)
        );
    }

    /// Distinct content derives distinct keys.
    #[test]
    fn prop_key_separates_distinct_content(a in arb_value(), b in arb_value()) {
        prop_assume!(a != b);
        let cache = MemoCache::new(MemoConfig::default());
        let recipe = MemoRecipe::new("noop", |_| Ok(()));
        prop_assert_ne!(
            cache.derive_key(&Snapshot::from_value(&a), &recipe, None),
            cache.derive_key(&Snapshot::from_value(&b), &recipe, None)
        );
    }
}
