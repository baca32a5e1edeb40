//! Draft handles: mutable views over a working copy.
//!
//! A [`Draft`] is a cheap handle `{ store, node, path }` onto the private
//! working-copy arena owned by one `produce` call. Reading a nested
//! container through a parent draft materializes a child handle lazily, and
//! because handles address nodes by arena identity, every handle for the
//! same logical node is identity-equal ([`Draft::ptr_eq`]); the per-call
//! node registry of the draft layer is the arena itself.
//!
//! Writes and deletes apply immediately to the working copy and record the
//! touched path. The touched record is reported (see
//! [`produce_with_report`](crate::produce_with_report)) but never gates what
//! gets cloned or finalized.

use crate::clone::clone_graph;
use crate::snapshot::Snapshot;
use crate::value::{Node, NodeId, Number, Scalar};
use crate::{Path, Seg, StateError, StateResult};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;

/// The working copy underlying all draft handles of one `produce` call.
pub(crate) struct DraftStore {
    pub(crate) graph: crate::value::Graph,
    touched: BTreeSet<Path>,
}

/// A mutable view over one node of a working copy.
///
/// Handles are cheap to clone and all handles onto the same node behave as
/// one draft. Mutations are applied immediately to the working copy; the
/// original snapshot a draft was created from is never touched.
#[derive(Clone)]
pub struct Draft {
    store: Rc<RefCell<DraftStore>>,
    node: NodeId,
    path: Path,
}

impl Draft {
    /// Create a root draft over a fresh working copy cloned from `snapshot`.
    pub(crate) fn new_root(snapshot: &Snapshot) -> Draft {
        let graph = clone_graph(snapshot.graph());
        let node = graph.root;
        Draft {
            store: Rc::new(RefCell::new(DraftStore {
                graph,
                touched: BTreeSet::new(),
            })),
            node,
            path: Path::root(),
        }
    }

    /// The access path of this draft, relative to the root draft.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Kind name of the underlying node.
    pub fn kind(&self) -> &'static str {
        self.store.borrow().graph.nodes[self.node].kind_name()
    }

    /// True if the underlying node is an object.
    pub fn is_object(&self) -> bool {
        matches!(self.store.borrow().graph.nodes[self.node], Node::Object(_))
    }

    /// True if the underlying node is an array.
    pub fn is_array(&self) -> bool {
        matches!(self.store.borrow().graph.nodes[self.node], Node::Array(_))
    }

    /// True if the underlying node is a scalar.
    pub fn is_scalar(&self) -> bool {
        matches!(self.store.borrow().graph.nodes[self.node], Node::Scalar(_))
    }

    /// True if two handles address the very same node of the same working
    /// copy. Repeated reads of the same child yield `ptr_eq` handles.
    pub fn ptr_eq(&self, other: &Draft) -> bool {
        Rc::ptr_eq(&self.store, &other.store) && self.node == other.node
    }

    /// Read the child under `key` of this object draft.
    ///
    /// Returns `Ok(None)` when the key is absent. Scalars come back by
    /// value; containers come back as lazily materialized child drafts.
    pub fn get(&self, key: &str) -> StateResult<Option<DraftValue>> {
        let store = self.store.borrow();
        match &store.graph.nodes[self.node] {
            Node::Object(entries) => Ok(entries
                .get(key)
                .map(|&child| self.wrap(&store, child, self.path.with_segment(Seg::key(key))))),
            other => Err(StateError::type_mismatch(
                self.path.clone(),
                "object",
                other.kind_name(),
            )),
        }
    }

    /// Read the child under `key`, requiring it to exist and be a container.
    pub fn get_draft(&self, key: &str) -> StateResult<Draft> {
        let child_path = self.path.with_segment(Seg::key(key));
        match self.get(key)? {
            None => Err(StateError::path_not_found(child_path)),
            Some(DraftValue::Draft(d)) => Ok(d),
            Some(_) => {
                let found = {
                    let store = self.store.borrow();
                    match &store.graph.nodes[self.node] {
                        Node::Object(entries) => entries
                            .get(key)
                            .map(|&c| store.graph.nodes[c].kind_name())
                            .unwrap_or("null"),
                        other => other.kind_name(),
                    }
                };
                Err(StateError::type_mismatch(
                    child_path,
                    "object or array",
                    found,
                ))
            }
        }
    }

    /// Read the element at `index` of this array draft.
    pub fn at(&self, index: usize) -> StateResult<DraftValue> {
        let store = self.store.borrow();
        match &store.graph.nodes[self.node] {
            Node::Array(items) => match items.get(index) {
                Some(&child) => {
                    Ok(self.wrap(&store, child, self.path.with_segment(Seg::Index(index))))
                }
                None => Err(StateError::index_out_of_bounds(
                    self.path.clone(),
                    index,
                    items.len(),
                )),
            },
            other => Err(StateError::type_mismatch(
                self.path.clone(),
                "array",
                other.kind_name(),
            )),
        }
    }

    /// Read the element at `index`, requiring it to be a container.
    pub fn index_draft(&self, index: usize) -> StateResult<Draft> {
        match self.at(index)? {
            DraftValue::Draft(d) => Ok(d),
            other => Err(StateError::type_mismatch(
                self.path.with_segment(Seg::Index(index)),
                "object or array",
                other.kind_name(),
            )),
        }
    }

    /// Number of elements (array) or entries (object).
    pub fn len(&self) -> StateResult<usize> {
        let store = self.store.borrow();
        match &store.graph.nodes[self.node] {
            Node::Array(items) => Ok(items.len()),
            Node::Object(entries) => Ok(entries.len()),
            other => Err(StateError::type_mismatch(
                self.path.clone(),
                "object or array",
                other.kind_name(),
            )),
        }
    }

    /// Whether this container is empty.
    pub fn is_empty(&self) -> StateResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Keys of this object draft, in sorted order.
    pub fn keys(&self) -> StateResult<Vec<String>> {
        let store = self.store.borrow();
        match &store.graph.nodes[self.node] {
            Node::Object(entries) => Ok(entries.keys().cloned().collect()),
            other => Err(StateError::type_mismatch(
                self.path.clone(),
                "object",
                other.kind_name(),
            )),
        }
    }

    /// Set `key` of this object draft to `value`.
    ///
    /// The value may be a scalar, a tree value imported into the working
    /// copy, or another draft handle from the same `produce` call. The
    /// latter aliases the target node, which is how cycles are built.
    pub fn set(&self, key: &str, value: impl Into<DraftSource>) -> StateResult<()> {
        let child_path = self.path.with_segment(Seg::key(key));
        let mut store = self.store.borrow_mut();
        let id = self.resolve_source(&mut store, value.into())?;
        match &mut store.graph.nodes[self.node] {
            Node::Object(entries) => {
                entries.insert(key.to_owned(), id);
            }
            other => {
                let found = other.kind_name();
                return Err(StateError::type_mismatch(self.path.clone(), "object", found));
            }
        }
        store.touched.insert(child_path);
        Ok(())
    }

    /// Replace the element at `index` of this array draft.
    pub fn set_index(&self, index: usize, value: impl Into<DraftSource>) -> StateResult<()> {
        let child_path = self.path.with_segment(Seg::Index(index));
        let mut store = self.store.borrow_mut();
        let id = self.resolve_source(&mut store, value.into())?;
        match &mut store.graph.nodes[self.node] {
            Node::Array(items) => {
                let len = items.len();
                match items.get_mut(index) {
                    Some(slot) => *slot = id,
                    None => {
                        return Err(StateError::index_out_of_bounds(
                            self.path.clone(),
                            index,
                            len,
                        ))
                    }
                }
            }
            other => {
                let found = other.kind_name();
                return Err(StateError::type_mismatch(self.path.clone(), "array", found));
            }
        }
        store.touched.insert(child_path);
        Ok(())
    }

    /// Delete `key` from this object draft. Returns whether it existed.
    pub fn delete(&self, key: &str) -> StateResult<bool> {
        let child_path = self.path.with_segment(Seg::key(key));
        let mut store = self.store.borrow_mut();
        let existed = match &mut store.graph.nodes[self.node] {
            Node::Object(entries) => entries.remove(key).is_some(),
            other => {
                let found = other.kind_name();
                return Err(StateError::type_mismatch(self.path.clone(), "object", found));
            }
        };
        if existed {
            store.touched.insert(child_path);
        }
        Ok(existed)
    }

    /// Append `value` to this array draft.
    pub fn push(&self, value: impl Into<DraftSource>) -> StateResult<()> {
        let mut store = self.store.borrow_mut();
        let id = self.resolve_source(&mut store, value.into())?;
        match &mut store.graph.nodes[self.node] {
            Node::Array(items) => items.push(id),
            other => {
                let found = other.kind_name();
                return Err(StateError::type_mismatch(self.path.clone(), "array", found));
            }
        }
        store.touched.insert(self.path.clone());
        Ok(())
    }

    /// Insert `value` at `index` of this array draft, shifting later
    /// elements right. `index` may equal the current length.
    pub fn insert(&self, index: usize, value: impl Into<DraftSource>) -> StateResult<()> {
        let mut store = self.store.borrow_mut();
        let id = self.resolve_source(&mut store, value.into())?;
        match &mut store.graph.nodes[self.node] {
            Node::Array(items) => {
                if index > items.len() {
                    let len = items.len();
                    return Err(StateError::index_out_of_bounds(
                        self.path.clone(),
                        index,
                        len,
                    ));
                }
                items.insert(index, id);
            }
            other => {
                let found = other.kind_name();
                return Err(StateError::type_mismatch(self.path.clone(), "array", found));
            }
        }
        store.touched.insert(self.path.clone());
        Ok(())
    }

    /// Remove the element at `index` of this array draft.
    pub fn remove(&self, index: usize) -> StateResult<()> {
        let mut store = self.store.borrow_mut();
        match &mut store.graph.nodes[self.node] {
            Node::Array(items) => {
                if index >= items.len() {
                    let len = items.len();
                    return Err(StateError::index_out_of_bounds(
                        self.path.clone(),
                        index,
                        len,
                    ));
                }
                items.remove(index);
            }
            other => {
                let found = other.kind_name();
                return Err(StateError::type_mismatch(self.path.clone(), "array", found));
            }
        }
        store.touched.insert(self.path.clone());
        Ok(())
    }

    /// Remove `range` from this array draft in one operation.
    pub fn remove_range(&self, range: std::ops::Range<usize>) -> StateResult<()> {
        if range.start > range.end {
            return Err(StateError::invalid_operation(format!(
                "range start {} exceeds range end {} in remove_range",
                range.start, range.end
            )));
        }
        let mut store = self.store.borrow_mut();
        match &mut store.graph.nodes[self.node] {
            Node::Array(items) => {
                if range.end > items.len() {
                    let len = items.len();
                    return Err(StateError::index_out_of_bounds(
                        self.path.clone(),
                        range.end,
                        len,
                    ));
                }
                items.drain(range);
            }
            other => {
                let found = other.kind_name();
                return Err(StateError::type_mismatch(self.path.clone(), "array", found));
            }
        }
        store.touched.insert(self.path.clone());
        Ok(())
    }

    /// Add `amount` to the number stored under `key`.
    ///
    /// Integer arithmetic is used while both sides are integers; otherwise
    /// the result is a float. The number node is replaced, not mutated, so
    /// aliases of the old value are unaffected.
    pub fn increment(&self, key: &str, amount: impl Into<Number>) -> StateResult<()> {
        self.add_number(key, amount.into())
    }

    /// Subtract `amount` from the number stored under `key`.
    pub fn decrement(&self, key: &str, amount: impl Into<Number>) -> StateResult<()> {
        let amount = match amount.into() {
            Number::Int(i) => Number::Int(-i),
            Number::Float(f) => Number::Float(-f),
        };
        self.add_number(key, amount)
    }

    fn add_number(&self, key: &str, amount: Number) -> StateResult<()> {
        let child_path = self.path.with_segment(Seg::key(key));
        let mut store = self.store.borrow_mut();
        let child = match &store.graph.nodes[self.node] {
            Node::Object(entries) => match entries.get(key) {
                Some(&c) => c,
                None => return Err(StateError::path_not_found(child_path)),
            },
            other => {
                let found = other.kind_name();
                return Err(StateError::type_mismatch(self.path.clone(), "object", found));
            }
        };
        let current = match &store.graph.nodes[child] {
            Node::Scalar(Scalar::Number(n)) => n.clone(),
            other => {
                let found = other.kind_name();
                return Err(StateError::type_mismatch(child_path, "number", found));
            }
        };
        let next = match (current.as_i64(), amount) {
            (Some(i), Number::Int(a)) => {
                let sum = i.checked_add(a).ok_or_else(|| {
                    StateError::invalid_operation("numeric overflow in increment")
                })?;
                serde_json::Number::from(sum)
            }
            _ => {
                let base = current.as_f64().ok_or_else(|| {
                    StateError::invalid_operation("numeric value out of f64 range")
                })?;
                serde_json::Number::from_f64(base + amount.as_f64()).ok_or_else(|| {
                    StateError::invalid_operation("increment produced a non-finite number")
                })?
            }
        };
        let id = store
            .graph
            .nodes
            .insert(Node::Scalar(Scalar::Number(next)));
        if let Node::Object(entries) = &mut store.graph.nodes[self.node] {
            entries.insert(key.to_owned(), id);
        }
        store
            .touched
            .insert(self.path.with_segment(Seg::key(key)));
        Ok(())
    }

    /// Render the subgraph under this draft as a tree value, transparently
    /// resolving to the underlying working-copy nodes.
    pub fn to_value(&self) -> StateResult<Value> {
        let store = self.store.borrow();
        store.graph.to_value(self.node)
    }

    /// The set of paths touched through this working copy so far.
    pub fn touched(&self) -> BTreeSet<Path> {
        self.store.borrow().touched.clone()
    }

    fn wrap(&self, store: &DraftStore, node: NodeId, path: Path) -> DraftValue {
        match &store.graph.nodes[node] {
            Node::Scalar(Scalar::Null) => DraftValue::Null,
            Node::Scalar(Scalar::Bool(b)) => DraftValue::Bool(*b),
            Node::Scalar(Scalar::Number(n)) => DraftValue::Number(n.clone()),
            Node::Scalar(Scalar::String(s)) => DraftValue::String(s.clone()),
            Node::Array(_) | Node::Object(_) => DraftValue::Draft(Draft {
                store: Rc::clone(&self.store),
                node,
                path,
            }),
        }
    }

    fn resolve_source(&self, store: &mut DraftStore, source: DraftSource) -> StateResult<NodeId> {
        match source {
            DraftSource::Value(v) => Ok(store.graph.import(&v)),
            DraftSource::Alias(d) => {
                if !Rc::ptr_eq(&d.store, &self.store) {
                    return Err(StateError::invalid_operation(
                        "draft belongs to a different produce call",
                    ));
                }
                Ok(d.node)
            }
        }
    }

    pub(crate) fn store(&self) -> &Rc<RefCell<DraftStore>> {
        &self.store
    }

    pub(crate) fn node(&self) -> NodeId {
        self.node
    }
}

impl fmt::Debug for Draft {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.store.try_borrow() {
            Ok(store) => write!(
                f,
                "Draft({} {})",
                store.graph.nodes[self.node].kind_name(),
                self.path
            ),
            Err(_) => write!(f, "Draft(<borrowed> {})", self.path),
        }
    }
}

/// A value read through a draft: scalars by value, containers as drafts.
#[derive(Clone, Debug)]
pub enum DraftValue {
    /// JSON null.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Numeric value.
    Number(serde_json::Number),
    /// String value.
    String(String),
    /// Nested container, materialized as a child draft.
    Draft(Draft),
}

impl DraftValue {
    /// True if this is null.
    pub fn is_null(&self) -> bool {
        matches!(self, DraftValue::Null)
    }

    /// Boolean value, if present.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            DraftValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Integer value, if present.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            DraftValue::Number(n) => n.as_i64(),
            _ => None,
        }
    }

    /// Floating-point value, if this holds a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            DraftValue::Number(n) => n.as_f64(),
            _ => None,
        }
    }

    /// String value, if present.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            DraftValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Borrow the nested draft, if this is a container.
    pub fn as_draft(&self) -> Option<&Draft> {
        match self {
            DraftValue::Draft(d) => Some(d),
            _ => None,
        }
    }

    /// Take the nested draft, if this is a container.
    pub fn into_draft(self) -> Option<Draft> {
        match self {
            DraftValue::Draft(d) => Some(d),
            _ => None,
        }
    }

    /// Kind name of this value.
    pub fn kind_name(&self) -> &'static str {
        match self {
            DraftValue::Null => "null",
            DraftValue::Bool(_) => "boolean",
            DraftValue::Number(_) => "number",
            DraftValue::String(_) => "string",
            DraftValue::Draft(d) => d.kind(),
        }
    }

    /// Render this value as a tree value.
    pub fn to_value(&self) -> StateResult<Value> {
        match self {
            DraftValue::Null => Ok(Value::Null),
            DraftValue::Bool(b) => Ok(Value::Bool(*b)),
            DraftValue::Number(n) => Ok(Value::Number(n.clone())),
            DraftValue::String(s) => Ok(Value::String(s.clone())),
            DraftValue::Draft(d) => d.to_value(),
        }
    }
}

/// What can be written into a draft: a tree value or an alias to another
/// draft node from the same `produce` call.
pub enum DraftSource {
    /// A tree value, imported into the working copy recursively.
    Value(Value),
    /// An alias to an existing draft node (builds shared nodes and cycles).
    Alias(Draft),
}

impl From<Value> for DraftSource {
    fn from(v: Value) -> Self {
        DraftSource::Value(v)
    }
}

impl From<&Value> for DraftSource {
    fn from(v: &Value) -> Self {
        DraftSource::Value(v.clone())
    }
}

impl From<bool> for DraftSource {
    fn from(v: bool) -> Self {
        DraftSource::Value(Value::Bool(v))
    }
}

impl From<i32> for DraftSource {
    fn from(v: i32) -> Self {
        DraftSource::Value(Value::from(v))
    }
}

impl From<i64> for DraftSource {
    fn from(v: i64) -> Self {
        DraftSource::Value(Value::from(v))
    }
}

impl From<u32> for DraftSource {
    fn from(v: u32) -> Self {
        DraftSource::Value(Value::from(v))
    }
}

impl From<f64> for DraftSource {
    fn from(v: f64) -> Self {
        DraftSource::Value(Value::from(v))
    }
}

impl From<&str> for DraftSource {
    fn from(v: &str) -> Self {
        DraftSource::Value(Value::String(v.to_owned()))
    }
}

impl From<String> for DraftSource {
    fn from(v: String) -> Self {
        DraftSource::Value(Value::String(v))
    }
}

impl From<Draft> for DraftSource {
    fn from(d: Draft) -> Self {
        DraftSource::Alias(d)
    }
}

impl From<&Draft> for DraftSource {
    fn from(d: &Draft) -> Self {
        DraftSource::Alias(d.clone())
    }
}
