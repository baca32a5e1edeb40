//! The produce engine: clone → draft → recipe → finalize.
//!
//! `produce` is the single primitive everything else consumes: batching
//! loops over it with one shared draft, the memoized variant wraps it with a
//! cache, and the shard collaborator applies it per chunk.

use crate::draft::Draft;
use crate::finalize::finalize;
use crate::snapshot::Snapshot;
use crate::{Path, StateError, StateResult};
use std::collections::BTreeSet;
use tracing::{debug, trace};

/// Object-safe recipe signature, used where several recipes run against one
/// draft ([`batch_produce`], [`produce_sharded`](crate::produce_sharded)).
pub type RecipeFn<'a> = dyn Fn(&Draft) -> StateResult<()> + 'a;

/// Produce a new snapshot by running `recipe` against a draft of `state`.
///
/// The input snapshot is cloned into a private working copy, the recipe
/// mutates the working copy through the draft, and the mutated graph is
/// finalized into a fresh frozen snapshot. `state` itself is never touched:
/// if the recipe fails, the error is surfaced as
/// [`StateError::RecipeFailure`] and the working copy is discarded.
///
/// Scalar-rooted snapshots bypass the pipeline: the recipe runs for effect
/// against a detached scalar draft and the input value is returned
/// unchanged.
///
/// # Examples
///
/// ```
/// use chisel_state::{produce, Snapshot};
/// use serde_json::json;
///
/// let state = Snapshot::from_value(&json!({"count": 0}));
/// let next = produce(&state, |d| {
///     d.increment("count", 1)?;
///     d.set("updated", true)
/// })
/// .unwrap();
///
/// assert_eq!(next.to_value().unwrap(), json!({"count": 1, "updated": true}));
/// assert_eq!(state.to_value().unwrap(), json!({"count": 0}));
/// ```
pub fn produce(
    state: &Snapshot,
    recipe: impl FnOnce(&Draft) -> StateResult<()>,
) -> StateResult<Snapshot> {
    let (snapshot, _touched) = produce_with_report(state, recipe)?;
    Ok(snapshot)
}

/// Like [`produce`], but also returns the set of paths the recipe touched.
///
/// The touched record is informational: it never gates what gets cloned or
/// finalized.
pub fn produce_with_report(
    state: &Snapshot,
    recipe: impl FnOnce(&Draft) -> StateResult<()>,
) -> StateResult<(Snapshot, BTreeSet<Path>)> {
    trace!(nodes = state.node_count(), "produce start");
    if state.root().is_scalar() {
        // Scalars have no meaningful draft surface; skip the pipeline, run
        // the recipe for effect against a detached single-node draft and
        // hand the input back unchanged.
        let draft = Draft::new_root(state);
        recipe(&draft).map_err(|e| StateError::recipe_failure(&e))?;
        return Ok((state.clone(), draft.touched()));
    }
    let draft = Draft::new_root(state);
    recipe(&draft).map_err(|e| StateError::recipe_failure(&e))?;
    let touched = draft.touched();
    let snapshot = finalize(&draft);
    debug!(
        touched = touched.len(),
        nodes = snapshot.node_count(),
        "produce finished"
    );
    Ok((snapshot, touched))
}

/// Run every recipe, in order, against one draft of `state`, then finalize
/// once.
///
/// Exactly one clone and one finalize happen regardless of recipe count,
/// and a later recipe observes the mutations of earlier ones. Any recipe
/// failure aborts the batch with [`StateError::RecipeFailure`], leaving
/// `state` untouched.
pub fn batch_produce(state: &Snapshot, recipes: &[&RecipeFn]) -> StateResult<Snapshot> {
    trace!(recipes = recipes.len(), "batch produce start");
    if state.root().is_scalar() {
        let draft = Draft::new_root(state);
        for recipe in recipes {
            recipe(&draft).map_err(|e| StateError::recipe_failure(&e))?;
        }
        return Ok(state.clone());
    }
    let draft = Draft::new_root(state);
    for recipe in recipes {
        recipe(&draft).map_err(|e| StateError::recipe_failure(&e))?;
    }
    Ok(finalize(&draft))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_produce_basic() {
        let state = Snapshot::from_value(&json!({"count": 0}));
        let next = produce(&state, |d| d.increment("count", 1)).unwrap();
        assert_eq!(next.to_value().unwrap(), json!({"count": 1}));
        assert_eq!(state.to_value().unwrap(), json!({"count": 0}));
    }

    #[test]
    fn test_produce_wraps_recipe_errors() {
        let state = Snapshot::from_value(&json!({"count": 0}));
        let err = produce(&state, |d| d.increment("missing", 1)).unwrap_err();
        match err {
            StateError::RecipeFailure { message } => {
                assert!(message.contains("path not found"));
            }
            other => panic!("expected RecipeFailure, got {other}"),
        }
    }

    #[test]
    fn test_scalar_state_bypasses_pipeline() {
        let state = Snapshot::from_value(&json!(42));
        let next = produce(&state, |_| Ok(())).unwrap();
        assert_eq!(next.to_value().unwrap(), json!(42));
    }

    #[test]
    fn test_scalar_state_runs_recipe_for_effect_only() {
        use std::cell::Cell;

        let calls = Cell::new(0usize);
        let state = Snapshot::from_value(&json!("s"));
        let next = produce(&state, |d| {
            calls.set(calls.get() + 1);
            assert!(d.is_scalar());
            Ok(())
        })
        .unwrap();

        assert_eq!(calls.get(), 1);
        assert_eq!(next.to_value().unwrap(), json!("s"));
        // The result is a plain clone of the input, not a finalized draft.
        assert_eq!(next.node_count(), state.node_count());
    }

    #[test]
    fn test_batch_ordering() {
        let state = Snapshot::from_value(&json!({"count": 0}));
        let add_one: &RecipeFn = &|d| d.increment("count", 1);
        let add_two: &RecipeFn = &|d| d.increment("count", 2);
        let next = batch_produce(&state, &[add_one, add_two]).unwrap();
        assert_eq!(next.to_value().unwrap(), json!({"count": 3}));
    }

    #[test]
    fn test_produce_with_report() {
        let state = Snapshot::from_value(&json!({"a": 1, "b": 2}));
        let (next, touched) = produce_with_report(&state, |d| d.set("a", 10)).unwrap();
        assert_eq!(next.to_value().unwrap(), json!({"a": 10, "b": 2}));
        assert!(touched.contains(&crate::path!("a")));
        assert_eq!(touched.len(), 1);
    }
}
