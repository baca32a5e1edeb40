//! Deep cloning of value graphs.
//!
//! The cloner performs a reachable copy: it walks the graph from a root and
//! rebuilds every node in a fresh arena. A visited map from source id to
//! clone id is populated *before* recursing into a container's children, so
//! self-references and mutual references resolve to the already-allocated
//! clone shell instead of looping forever. Nodes that are no longer
//! reachable from the root are not copied, which compacts the arena as a
//! side effect.

use crate::value::{Graph, Node, NodeId};
use slotmap::SlotMap;
use std::collections::HashMap;

/// Clone the whole graph reachable from its root into a fresh arena.
///
/// The returned graph shares no node with the input; mutating it never
/// affects the original.
pub(crate) fn clone_graph(src: &Graph) -> Graph {
    let mut nodes = SlotMap::with_key();
    let mut visited = HashMap::new();
    let root = copy_subgraph(src, src.root, &mut nodes, &mut visited);
    Graph { nodes, root }
}

/// Copy the subgraph under `node` from `src` into `dst`, returning the id of
/// the copy. `visited` maps source ids to destination ids and may be shared
/// across multiple calls to preserve sharing between subgraphs.
pub(crate) fn copy_subgraph(
    src: &Graph,
    node: NodeId,
    dst: &mut SlotMap<NodeId, Node>,
    visited: &mut HashMap<NodeId, NodeId>,
) -> NodeId {
    if let Some(&copied) = visited.get(&node) {
        return copied;
    }
    match &src.nodes[node] {
        Node::Scalar(s) => {
            let id = dst.insert(Node::Scalar(s.clone()));
            visited.insert(node, id);
            id
        }
        Node::Array(items) => {
            // Register the shell before descending so cycles resolve to it.
            let id = dst.insert(Node::Array(Vec::new()));
            visited.insert(node, id);
            let children: Vec<NodeId> = items
                .iter()
                .map(|child| copy_subgraph(src, *child, dst, visited))
                .collect();
            dst[id] = Node::Array(children);
            id
        }
        Node::Object(entries) => {
            let id = dst.insert(Node::Object(Default::default()));
            visited.insert(node, id);
            let children = entries
                .iter()
                .map(|(k, child)| (k.clone(), copy_subgraph(src, *child, dst, visited)))
                .collect();
            dst[id] = Node::Object(children);
            id
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::deep_eq;
    use serde_json::json;

    #[test]
    fn test_clone_is_independent() {
        let src = Graph::from_value(&json!({"a": {"b": [1, 2]}}));
        let mut cloned = clone_graph(&src);
        assert!(deep_eq(&src, src.root, &cloned, cloned.root));

        // Mutating the clone leaves the source untouched.
        let root = cloned.root;
        if let Node::Object(entries) = &mut cloned.nodes[root] {
            entries.remove("a");
        }
        assert!(!deep_eq(&src, src.root, &cloned, cloned.root));
        assert_eq!(src.to_value(src.root).unwrap(), json!({"a": {"b": [1, 2]}}));
    }

    #[test]
    fn test_clone_preserves_cycles() {
        let mut src = Graph::from_value(&json!({"name": "x"}));
        let src_root = src.root;
        if let Node::Object(entries) = &mut src.nodes[src_root] {
            entries.insert("self".into(), src_root);
        }

        let cloned = clone_graph(&src);
        if let Node::Object(entries) = &cloned.nodes[cloned.root] {
            assert_eq!(*entries.get("self").unwrap(), cloned.root);
        } else {
            panic!("expected object root");
        }
    }

    #[test]
    fn test_clone_preserves_shared_nodes() {
        let mut src = Graph::from_value(&json!({"a": {"v": 1}}));
        let src_root = src.root;
        let shared = if let Node::Object(entries) = &src.nodes[src_root] {
            *entries.get("a").unwrap()
        } else {
            unreachable!()
        };
        if let Node::Object(entries) = &mut src.nodes[src_root] {
            entries.insert("b".into(), shared);
        }

        let cloned = clone_graph(&src);
        if let Node::Object(entries) = &cloned.nodes[cloned.root] {
            assert_eq!(entries.get("a"), entries.get("b"));
        } else {
            panic!("expected object root");
        }
    }

    #[test]
    fn test_clone_drops_unreachable_nodes() {
        let mut src = Graph::from_value(&json!({"a": 1}));
        src.import(&json!({"orphan": true}));
        assert!(src.len() > 2);

        let cloned = clone_graph(&src);
        assert_eq!(cloned.len(), 2);
    }
}
