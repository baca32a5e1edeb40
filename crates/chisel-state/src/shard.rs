//! Shard/merge collaborator surface.
//!
//! Partitioning a snapshot into independent chunks and recombining chunk
//! results is external to the produce core: the engine only requires that
//! the chunk count equals the recipe count and applies [`produce`] once per
//! chunk. [`KeySharder`] is the default strategy (round-robin distribution
//! of top-level object keys) and satisfies `merge(shard(s)) == s`.

use crate::clone::copy_subgraph;
use crate::produce::{produce, RecipeFn};
use crate::snapshot::Snapshot;
use crate::value::{Graph, Node, NodeId};
use crate::{StateError, StateResult};
use slotmap::SlotMap;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// A strategy for splitting a snapshot into chunks and recombining them.
///
/// Both operations are expected to be pure; the produce core never retries
/// or reorders them.
pub trait Sharder {
    /// Split `state` into independent chunks.
    fn shard(&self, state: &Snapshot) -> StateResult<Vec<Snapshot>>;

    /// Recombine chunk results into one snapshot.
    fn merge(&self, chunks: Vec<Snapshot>) -> StateResult<Snapshot>;
}

/// Default sharder: distributes top-level object keys round-robin across a
/// fixed number of chunks. Each chunk is an object snapshot holding its
/// share of the keys; merging unions the chunks back together.
#[derive(Clone, Copy, Debug)]
pub struct KeySharder {
    chunks: usize,
}

impl KeySharder {
    /// Create a sharder producing `chunks` chunks.
    pub fn new(chunks: usize) -> Self {
        KeySharder { chunks }
    }
}

impl Sharder for KeySharder {
    fn shard(&self, state: &Snapshot) -> StateResult<Vec<Snapshot>> {
        if self.chunks == 0 {
            return Err(StateError::invalid_operation(
                "sharder must produce at least one chunk",
            ));
        }
        let graph = state.graph();
        let entries = match &graph.nodes[graph.root] {
            Node::Object(entries) => entries,
            other => {
                return Err(StateError::type_mismatch(
                    crate::Path::root(),
                    "object",
                    other.kind_name(),
                ))
            }
        };

        let mut builders: Vec<ChunkBuilder> =
            (0..self.chunks).map(|_| ChunkBuilder::default()).collect();

        for (i, (key, &child)) in entries.iter().enumerate() {
            let builder = &mut builders[i % self.chunks];
            let copied = copy_subgraph(graph, child, &mut builder.nodes, &mut builder.visited);
            builder.entries.insert(key.clone(), copied);
        }

        Ok(builders.into_iter().map(ChunkBuilder::finish).collect())
    }

    fn merge(&self, chunks: Vec<Snapshot>) -> StateResult<Snapshot> {
        let mut nodes = SlotMap::with_key();
        let mut merged = BTreeMap::new();
        for chunk in &chunks {
            let graph = chunk.graph();
            let entries = match &graph.nodes[graph.root] {
                Node::Object(entries) => entries,
                other => {
                    return Err(StateError::type_mismatch(
                        crate::Path::root(),
                        "object",
                        other.kind_name(),
                    ))
                }
            };
            let mut visited = HashMap::new();
            for (key, &child) in entries {
                let copied = copy_subgraph(graph, child, &mut nodes, &mut visited);
                merged.insert(key.clone(), copied);
            }
        }
        let root = nodes.insert(Node::Object(merged));
        Ok(Snapshot::from_graph(Graph { nodes, root }))
    }
}

/// Accumulates one chunk's arena while sharding.
#[derive(Default)]
struct ChunkBuilder {
    nodes: SlotMap<NodeId, Node>,
    entries: BTreeMap<String, NodeId>,
    visited: HashMap<NodeId, NodeId>,
}

impl ChunkBuilder {
    fn finish(mut self) -> Snapshot {
        let root = self.nodes.insert(Node::Object(self.entries));
        Snapshot::from_graph(Graph {
            nodes: self.nodes,
            root,
        })
    }
}

/// Apply one recipe per chunk of `state` and merge the results.
///
/// Fails fast with [`StateError::ShardMismatch`], before any chunk is
/// processed, when the sharder's chunk count differs from the recipe
/// count.
pub fn produce_sharded(
    state: &Snapshot,
    recipes: &[&RecipeFn],
    sharder: &impl Sharder,
) -> StateResult<Snapshot> {
    let chunks = sharder.shard(state)?;
    if chunks.len() != recipes.len() {
        return Err(StateError::shard_mismatch(chunks.len(), recipes.len()));
    }
    debug!(chunks = chunks.len(), "producing per shard");
    let mut produced = Vec::with_capacity(chunks.len());
    for (chunk, recipe) in chunks.iter().zip(recipes) {
        produced.push(produce(chunk, |d| recipe(d))?);
    }
    sharder.merge(produced)
}
