//! Arena-backed value graphs.
//!
//! Snapshots and working copies store their data as an arena of nodes
//! indexed by [`NodeId`]. Containers reference their children by id, which
//! is what lets a graph contain cycles, something a plain tree value such
//! as `serde_json::Value` cannot represent. `serde_json::Value` remains the
//! interchange format at the boundary.

use crate::{StateError, StateResult};
use crate::{Path, Seg};
use serde_json::{Map, Value};
use slotmap::SlotMap;
use std::collections::{BTreeMap, HashSet};

slotmap::new_key_type! {
    /// Identity of a node within a value graph arena.
    pub struct NodeId;
}

/// A leaf value stored in a graph node.
#[derive(Clone, Debug, PartialEq)]
pub enum Scalar {
    /// JSON null.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Numeric value.
    Number(serde_json::Number),
    /// String value.
    String(String),
}

impl Scalar {
    /// Convert this scalar to a `serde_json::Value`.
    #[inline]
    pub fn to_value(&self) -> Value {
        match self {
            Scalar::Null => Value::Null,
            Scalar::Bool(b) => Value::Bool(*b),
            Scalar::Number(n) => Value::Number(n.clone()),
            Scalar::String(s) => Value::String(s.clone()),
        }
    }
}

/// A numeric amount for increment/decrement operations.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Number {
    /// Integer amount.
    Int(i64),
    /// Floating-point amount.
    Float(f64),
}

impl Number {
    /// Convert to f64.
    #[inline]
    pub fn as_f64(&self) -> f64 {
        match self {
            Number::Int(i) => *i as f64,
            Number::Float(f) => *f,
        }
    }

    /// Check if this is an integer.
    #[inline]
    pub fn is_int(&self) -> bool {
        matches!(self, Number::Int(_))
    }
}

impl From<i64> for Number {
    fn from(v: i64) -> Self {
        Number::Int(v)
    }
}

impl From<i32> for Number {
    fn from(v: i32) -> Self {
        Number::Int(v as i64)
    }
}

impl From<u32> for Number {
    fn from(v: u32) -> Self {
        Number::Int(v as i64)
    }
}

impl From<f64> for Number {
    fn from(v: f64) -> Self {
        Number::Float(v)
    }
}

impl From<f32> for Number {
    fn from(v: f32) -> Self {
        Number::Float(v as f64)
    }
}

/// A single node in a value graph.
#[derive(Clone, Debug)]
pub(crate) enum Node {
    /// Leaf value.
    Scalar(Scalar),
    /// Ordered sequence of child nodes.
    Array(Vec<NodeId>),
    /// Key/value map of child nodes, sorted by key.
    Object(BTreeMap<String, NodeId>),
}

impl Node {
    /// Human-readable kind name, used in error messages.
    pub(crate) fn kind_name(&self) -> &'static str {
        match self {
            Node::Scalar(Scalar::Null) => "null",
            Node::Scalar(Scalar::Bool(_)) => "boolean",
            Node::Scalar(Scalar::Number(_)) => "number",
            Node::Scalar(Scalar::String(_)) => "string",
            Node::Array(_) => "array",
            Node::Object(_) => "object",
        }
    }
}

/// An arena of nodes plus a distinguished root.
#[derive(Clone, Debug)]
pub(crate) struct Graph {
    pub(crate) nodes: SlotMap<NodeId, Node>,
    pub(crate) root: NodeId,
}

impl Graph {
    /// Build a graph from a tree value. Never fails: every JSON tree is a
    /// valid (acyclic) graph.
    pub(crate) fn from_value(value: &Value) -> Graph {
        let mut nodes = SlotMap::with_key();
        let root = import_value(&mut nodes, value);
        Graph { nodes, root }
    }

    /// Create a graph holding a single null node.
    pub(crate) fn null() -> Graph {
        let mut nodes = SlotMap::with_key();
        let root = nodes.insert(Node::Scalar(Scalar::Null));
        Graph { nodes, root }
    }

    /// Import a tree value into this graph's arena, returning the id of the
    /// imported subtree's root.
    pub(crate) fn import(&mut self, value: &Value) -> NodeId {
        import_value(&mut self.nodes, value)
    }

    /// Render the subgraph under `node` as a tree value.
    ///
    /// Fails with [`StateError::CyclicValue`] if the subgraph contains a
    /// cycle, since tree values cannot express one.
    pub(crate) fn to_value(&self, node: NodeId) -> StateResult<Value> {
        let mut in_progress = HashSet::new();
        self.render(node, &Path::root(), &mut in_progress)
    }

    fn render(
        &self,
        node: NodeId,
        path: &Path,
        in_progress: &mut HashSet<NodeId>,
    ) -> StateResult<Value> {
        match &self.nodes[node] {
            Node::Scalar(s) => Ok(s.to_value()),
            Node::Array(items) => {
                if !in_progress.insert(node) {
                    return Err(StateError::cyclic_value(path.clone()));
                }
                let mut out = Vec::with_capacity(items.len());
                for (i, child) in items.iter().enumerate() {
                    let child_path = path.with_segment(Seg::Index(i));
                    out.push(self.render(*child, &child_path, in_progress)?);
                }
                in_progress.remove(&node);
                Ok(Value::Array(out))
            }
            Node::Object(entries) => {
                if !in_progress.insert(node) {
                    return Err(StateError::cyclic_value(path.clone()));
                }
                let mut out = Map::new();
                for (key, child) in entries {
                    let child_path = path.with_segment(Seg::key(key));
                    out.insert(key.clone(), self.render(*child, &child_path, in_progress)?);
                }
                in_progress.remove(&node);
                Ok(Value::Object(out))
            }
        }
    }

    /// Number of nodes in the arena.
    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }
}

fn import_value(nodes: &mut SlotMap<NodeId, Node>, value: &Value) -> NodeId {
    match value {
        Value::Null => nodes.insert(Node::Scalar(Scalar::Null)),
        Value::Bool(b) => nodes.insert(Node::Scalar(Scalar::Bool(*b))),
        Value::Number(n) => nodes.insert(Node::Scalar(Scalar::Number(n.clone()))),
        Value::String(s) => nodes.insert(Node::Scalar(Scalar::String(s.clone()))),
        Value::Array(items) => {
            let children: Vec<NodeId> = items.iter().map(|v| import_value(nodes, v)).collect();
            nodes.insert(Node::Array(children))
        }
        Value::Object(entries) => {
            let children: BTreeMap<String, NodeId> = entries
                .iter()
                .map(|(k, v)| (k.clone(), import_value(nodes, v)))
                .collect();
            nodes.insert(Node::Object(children))
        }
    }
}

/// Cycle-safe structural equality between two graph nodes.
///
/// A pair of nodes already under comparison is assumed equal, so cyclic
/// graphs compare by bisimulation rather than recursing forever.
pub(crate) fn deep_eq(a: &Graph, a_node: NodeId, b: &Graph, b_node: NodeId) -> bool {
    let mut visiting = HashSet::new();
    deep_eq_inner(a, a_node, b, b_node, &mut visiting)
}

fn deep_eq_inner(
    a: &Graph,
    a_node: NodeId,
    b: &Graph,
    b_node: NodeId,
    visiting: &mut HashSet<(NodeId, NodeId)>,
) -> bool {
    match (&a.nodes[a_node], &b.nodes[b_node]) {
        (Node::Scalar(x), Node::Scalar(y)) => x == y,
        (Node::Array(xs), Node::Array(ys)) => {
            if xs.len() != ys.len() {
                return false;
            }
            if !visiting.insert((a_node, b_node)) {
                return true;
            }
            let eq = xs
                .iter()
                .zip(ys.iter())
                .all(|(x, y)| deep_eq_inner(a, *x, b, *y, visiting));
            visiting.remove(&(a_node, b_node));
            eq
        }
        (Node::Object(xs), Node::Object(ys)) => {
            if xs.len() != ys.len() {
                return false;
            }
            if !visiting.insert((a_node, b_node)) {
                return true;
            }
            let eq = xs.iter().zip(ys.iter()).all(|((kx, x), (ky, y))| {
                kx == ky && deep_eq_inner(a, *x, b, *y, visiting)
            });
            visiting.remove(&(a_node, b_node));
            eq
        }
        _ => false,
    }
}

/// Classify a tree value's kind, used in error messages.
#[inline]
pub fn value_type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
