//! Finalization: turning a mutated working copy into a frozen snapshot.
//!
//! The finalizer walks the working-copy graph and rebuilds every reachable
//! node into a brand-new arena, registering each result shell in a
//! processed-node map before descending into children. Cyclic or repeatedly
//! referenced nodes therefore resolve to a single shared result node. The
//! result is returned as a [`Snapshot`], which exposes no mutating API and
//! is therefore frozen by construction.

use crate::clone::clone_graph;
use crate::draft::Draft;
use crate::snapshot::Snapshot;
use tracing::trace;

/// Finalize the working copy behind `draft` into an immutable snapshot.
///
/// The draft (and every other handle onto the same working copy) is left
/// behind; only the frozen result survives the `produce` call.
pub(crate) fn finalize(draft: &Draft) -> Snapshot {
    let store = draft.store().borrow();
    let graph = clone_graph(&store.graph);
    trace!(nodes = graph.len(), "finalized draft into snapshot");
    Snapshot::from_graph(graph)
}
