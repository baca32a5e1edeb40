//! Cycle handling across the clone, draft and finalize stages.

use chisel_state::{produce, Snapshot, StateError};
use serde_json::json;

/// Build a snapshot whose `data` object holds a `self` reference to itself.
fn cyclic_state() -> Snapshot {
    let base = Snapshot::from_value(&json!({"data": {"name": "x"}}));
    produce(&base, |d| {
        let data = d.get_draft("data")?;
        data.set("self", &data)
    })
    .unwrap()
}

#[test]
fn test_cycle_preserved_through_produce() {
    let state = cyclic_state();
    let next = produce(&state, |d| d.get_draft("data")?.set("name", "y")).unwrap();

    let data = next.root().get("data").unwrap();
    assert_eq!(data.get("name").unwrap().as_str(), Some("y"));
    assert!(data.get("self").unwrap().ptr_eq(&data));

    // The original cycle is intact and untouched.
    let original = state.root().get("data").unwrap();
    assert_eq!(original.get("name").unwrap().as_str(), Some("x"));
    assert!(original.get("self").unwrap().ptr_eq(&original));
}

#[test]
fn test_cycle_observable_through_draft() {
    let state = cyclic_state();
    produce(&state, |d| {
        let data = d.get_draft("data")?;
        let back = data.get_draft("self")?;
        assert!(back.ptr_eq(&data));
        // Mutating through either handle is the same mutation.
        back.set("name", "via-self")?;
        assert_eq!(data.get("name")?.unwrap().as_str(), Some("via-self"));
        Ok(())
    })
    .unwrap();
}

#[test]
fn test_mutual_references() {
    let base = Snapshot::from_value(&json!({"a": {"id": 1}, "b": {"id": 2}}));
    let state = produce(&base, |d| {
        let a = d.get_draft("a")?;
        let b = d.get_draft("b")?;
        a.set("peer", &b)?;
        b.set("peer", &a)
    })
    .unwrap();

    let a = state.root().get("a").unwrap();
    let b = state.root().get("b").unwrap();
    assert!(a.get("peer").unwrap().ptr_eq(&b));
    assert!(b.get("peer").unwrap().ptr_eq(&a));
}

#[test]
fn test_shared_node_not_duplicated() {
    let base = Snapshot::from_value(&json!({"shared": {"v": 1}}));
    let state = produce(&base, |d| {
        let shared = d.get_draft("shared")?;
        d.set("alias", &shared)
    })
    .unwrap();

    let shared = state.root().get("shared").unwrap();
    let alias = state.root().get("alias").unwrap();
    assert!(shared.ptr_eq(&alias));

    // Mutating through one path is visible through the other in the next
    // generation, because they are the same node.
    let next = produce(&state, |d| d.get_draft("alias")?.set("v", 2)).unwrap();
    assert_eq!(
        next.root().get("shared").unwrap().get("v").unwrap().as_i64(),
        Some(2)
    );
}

#[test]
fn test_cyclic_snapshot_equality() {
    let a = cyclic_state();
    let b = cyclic_state();
    assert_eq!(a, b);

    let c = produce(&a, |d| d.get_draft("data")?.set("name", "z")).unwrap();
    assert_ne!(a, c);
}

#[test]
fn test_to_value_rejects_cycles() {
    let state = cyclic_state();
    assert!(matches!(
        state.to_value().unwrap_err(),
        StateError::CyclicValue { .. }
    ));
    // Debug must not loop either.
    let rendered = format!("{:?}", state);
    assert!(rendered.contains("cyclic"));
}

#[test]
fn test_array_cycles() {
    let base = Snapshot::from_value(&json!({"list": [1]}));
    let state = produce(&base, |d| {
        let list = d.get_draft("list")?;
        list.push(&list)
    })
    .unwrap();

    let list = state.root().get("list").unwrap();
    assert!(list.index(1).unwrap().ptr_eq(&list));
    assert_eq!(list.index(0).unwrap().as_i64(), Some(1));
}
