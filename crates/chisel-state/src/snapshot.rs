//! Immutable snapshots and read-only cursors.
//!
//! A [`Snapshot`] owns a value graph and exposes no mutating API: the Rust
//! rendering of a deeply frozen value. Reads go through [`SnapshotRef`]
//! cursors, which navigate by key or index and support identity comparison
//! so preserved cycles are observable.

use crate::value::{deep_eq, Graph, Node, NodeId, Scalar};
use crate::StateResult;
use serde_json::Value;
use std::fmt;

/// An immutable value graph.
///
/// Snapshots are produced by [`produce`](crate::produce) (or built from a
/// tree value) and never change afterwards. Cloning a snapshot copies the
/// arena; both copies remain frozen.
///
/// # Examples
///
/// ```
/// use chisel_state::Snapshot;
/// use serde_json::json;
///
/// let snap = Snapshot::from_value(&json!({"count": 0}));
/// assert_eq!(snap.root().get("count").unwrap().as_i64(), Some(0));
/// assert_eq!(snap.to_value().unwrap(), json!({"count": 0}));
/// ```
#[derive(Clone)]
pub struct Snapshot {
    graph: Graph,
}

impl Snapshot {
    /// Build a snapshot from a tree value.
    pub fn from_value(value: &Value) -> Snapshot {
        Snapshot {
            graph: Graph::from_value(value),
        }
    }

    /// A snapshot holding a single null value.
    pub fn null() -> Snapshot {
        Snapshot {
            graph: Graph::null(),
        }
    }

    /// Render this snapshot as a tree value.
    ///
    /// Fails with [`StateError::CyclicValue`](crate::StateError::CyclicValue)
    /// if the graph contains a cycle.
    pub fn to_value(&self) -> StateResult<Value> {
        self.graph.to_value(self.graph.root)
    }

    /// Cursor positioned at the root node.
    pub fn root(&self) -> SnapshotRef<'_> {
        SnapshotRef {
            graph: &self.graph,
            node: self.graph.root,
        }
    }

    /// Number of nodes in the underlying arena.
    pub fn node_count(&self) -> usize {
        self.graph.len()
    }

    pub(crate) fn from_graph(graph: Graph) -> Snapshot {
        Snapshot { graph }
    }

    pub(crate) fn graph(&self) -> &Graph {
        &self.graph
    }
}

impl PartialEq for Snapshot {
    fn eq(&self, other: &Self) -> bool {
        deep_eq(&self.graph, self.graph.root, &other.graph, other.graph.root)
    }
}

impl PartialEq<Value> for Snapshot {
    fn eq(&self, other: &Value) -> bool {
        let theirs = Graph::from_value(other);
        deep_eq(&self.graph, self.graph.root, &theirs, theirs.root)
    }
}

impl fmt::Debug for Snapshot {
    // Cyclic graphs cannot be rendered as a tree; fall back to a summary.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_value() {
            Ok(v) => write!(f, "Snapshot({})", v),
            Err(_) => write!(f, "Snapshot(<cyclic, {} nodes>)", self.node_count()),
        }
    }
}

/// A read-only cursor over a node in a snapshot.
#[derive(Clone, Copy)]
pub struct SnapshotRef<'a> {
    graph: &'a Graph,
    node: NodeId,
}

impl<'a> SnapshotRef<'a> {
    /// Get the child under `key`, if this node is an object holding one.
    pub fn get(&self, key: &str) -> Option<SnapshotRef<'a>> {
        match &self.graph.nodes[self.node] {
            Node::Object(entries) => entries.get(key).map(|&child| SnapshotRef {
                graph: self.graph,
                node: child,
            }),
            _ => None,
        }
    }

    /// Get the element at `index`, if this node is an array holding one.
    pub fn index(&self, index: usize) -> Option<SnapshotRef<'a>> {
        match &self.graph.nodes[self.node] {
            Node::Array(items) => items.get(index).map(|&child| SnapshotRef {
                graph: self.graph,
                node: child,
            }),
            _ => None,
        }
    }

    /// Number of elements (array) or entries (object).
    pub fn len(&self) -> Option<usize> {
        match &self.graph.nodes[self.node] {
            Node::Array(items) => Some(items.len()),
            Node::Object(entries) => Some(entries.len()),
            Node::Scalar(_) => None,
        }
    }

    /// Whether this container is empty. `None` for scalars.
    pub fn is_empty(&self) -> Option<bool> {
        self.len().map(|n| n == 0)
    }

    /// Keys of this object node, in sorted order.
    pub fn keys(&self) -> Vec<String> {
        match &self.graph.nodes[self.node] {
            Node::Object(entries) => entries.keys().cloned().collect(),
            _ => Vec::new(),
        }
    }

    /// True if both cursors point at the very same node of the same
    /// snapshot. This is identity, not structural equality; it is the test
    /// that makes preserved cycles observable.
    pub fn ptr_eq(&self, other: &SnapshotRef<'_>) -> bool {
        std::ptr::eq(self.graph, other.graph) && self.node == other.node
    }

    /// Opaque identity of the underlying node.
    ///
    /// Unique within one snapshot and stable for its lifetime; not
    /// meaningful across snapshots. Useful for identity-keyed graph walks
    /// (deduplication, key derivation) without holding cursors.
    pub fn node_token(&self) -> u64 {
        use slotmap::Key;
        self.node.data().as_ffi()
    }

    /// Kind name of this node ("null", "boolean", "number", "string",
    /// "array" or "object").
    pub fn kind(&self) -> &'static str {
        self.graph.nodes[self.node].kind_name()
    }

    /// True if this node is an object.
    pub fn is_object(&self) -> bool {
        matches!(self.graph.nodes[self.node], Node::Object(_))
    }

    /// True if this node is an array.
    pub fn is_array(&self) -> bool {
        matches!(self.graph.nodes[self.node], Node::Array(_))
    }

    /// True if this node is a scalar.
    pub fn is_scalar(&self) -> bool {
        matches!(self.graph.nodes[self.node], Node::Scalar(_))
    }

    /// True if this node is null.
    pub fn is_null(&self) -> bool {
        matches!(self.graph.nodes[self.node], Node::Scalar(Scalar::Null))
    }

    /// Boolean value, if this node holds one.
    pub fn as_bool(&self) -> Option<bool> {
        match &self.graph.nodes[self.node] {
            Node::Scalar(Scalar::Bool(b)) => Some(*b),
            _ => None,
        }
    }

    /// Integer value, if this node holds one.
    pub fn as_i64(&self) -> Option<i64> {
        match &self.graph.nodes[self.node] {
            Node::Scalar(Scalar::Number(n)) => n.as_i64(),
            _ => None,
        }
    }

    /// Floating-point value, if this node holds a number.
    pub fn as_f64(&self) -> Option<f64> {
        match &self.graph.nodes[self.node] {
            Node::Scalar(Scalar::Number(n)) => n.as_f64(),
            _ => None,
        }
    }

    /// The raw number, if this node holds one.
    pub fn as_number(&self) -> Option<&'a serde_json::Number> {
        match &self.graph.nodes[self.node] {
            Node::Scalar(Scalar::Number(n)) => Some(n),
            _ => None,
        }
    }

    /// String value, if this node holds one.
    pub fn as_str(&self) -> Option<&'a str> {
        match &self.graph.nodes[self.node] {
            Node::Scalar(Scalar::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Render the subgraph under this cursor as a tree value.
    pub fn to_value(&self) -> StateResult<Value> {
        self.graph.to_value(self.node)
    }
}

impl fmt::Debug for SnapshotRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_value() {
            Ok(v) => write!(f, "SnapshotRef({})", v),
            Err(_) => write!(f, "SnapshotRef(<cyclic {}>)", self.kind()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cursor_navigation() {
        let snap = Snapshot::from_value(&json!({
            "users": [{"name": "alice"}, {"name": "bob"}],
            "total": 2
        }));
        let root = snap.root();
        assert!(root.is_object());
        assert_eq!(root.get("total").unwrap().as_i64(), Some(2));

        let users = root.get("users").unwrap();
        assert!(users.is_array());
        assert_eq!(users.len(), Some(2));
        assert_eq!(
            users.index(1).unwrap().get("name").unwrap().as_str(),
            Some("bob")
        );
        assert!(users.index(2).is_none());
        assert!(root.get("missing").is_none());
    }

    #[test]
    fn test_snapshot_equality() {
        let a = Snapshot::from_value(&json!({"x": [1, 2]}));
        let b = Snapshot::from_value(&json!({"x": [1, 2]}));
        let c = Snapshot::from_value(&json!({"x": [1]}));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a == json!({"x": [1, 2]}));
    }

    #[test]
    fn test_ptr_eq_distinguishes_identity() {
        let snap = Snapshot::from_value(&json!({"a": {"v": 1}, "b": {"v": 1}}));
        let root = snap.root();
        let a = root.get("a").unwrap();
        let b = root.get("b").unwrap();
        // Structurally equal but distinct nodes.
        assert_eq!(a.to_value().unwrap(), b.to_value().unwrap());
        assert!(!a.ptr_eq(&b));
        assert!(a.ptr_eq(&root.get("a").unwrap()));
    }

    #[test]
    fn test_scalar_accessors() {
        let snap = Snapshot::from_value(&json!({"s": "x", "n": 1.5, "b": true, "z": null}));
        let root = snap.root();
        assert_eq!(root.get("s").unwrap().as_str(), Some("x"));
        assert_eq!(root.get("n").unwrap().as_f64(), Some(1.5));
        assert_eq!(root.get("b").unwrap().as_bool(), Some(true));
        assert!(root.get("z").unwrap().is_null());
        assert_eq!(root.get("s").unwrap().kind(), "string");
    }
}
