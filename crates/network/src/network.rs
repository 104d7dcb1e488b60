//! # Detailed Network
//!
//! A frozen, per-example snapshot of the neurons reachable from the query
//! literals. Nodes are stored in topological order and refer to their inputs
//! by local position, so evaluation never consults the shared
//! [`NeuronMaps`](crate::maps::NeuronMaps) again.

use serde::Serialize;

use crate::neuron::{NeuronId, NeuronKind};
use crate::states::{StatesCache, StorageStrategy};
use crate::weight::WeightId;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NetworkNode {
    /// Id in the scope's neuron arena.
    pub neuron: NeuronId,
    pub kind: NeuronKind,
    pub label: String,
    /// Local positions of the inputs; every entry is below this node's own.
    pub inputs: Vec<usize>,
    /// Parallel to `inputs` for weighted kinds.
    pub weights: Vec<WeightId>,
    pub shared: bool,
    /// Longest input path down to a leaf.
    pub depth: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailedNetwork {
    pub id: String,
    pub(crate) nodes: Vec<NetworkNode>,
    pub(crate) roots: Vec<usize>,
    pub(crate) shared_count: usize,
    /// `None` when no neuron is shared: evaluation uses a transient linear store.
    pub(crate) storage: Option<StorageStrategy>,
    /// For each node, the positions of its parents (one entry per edge).
    pub(crate) output_mapping: Option<Vec<Vec<usize>>>,
}

impl DetailedNetwork {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &[NetworkNode] {
        &self.nodes
    }

    pub fn node(&self, position: usize) -> Option<&NetworkNode> {
        self.nodes.get(position)
    }

    /// Positions of the query neurons, in query order.
    pub fn roots(&self) -> &[usize] {
        &self.roots
    }

    pub fn shared_count(&self) -> usize {
        self.shared_count
    }

    pub fn storage(&self) -> Option<StorageStrategy> {
        self.storage
    }

    pub fn output_mapping(&self) -> Option<&[Vec<usize>]> {
        self.output_mapping.as_deref()
    }

    /// Number of parent edges of a node, if an output mapping was computed.
    pub fn parent_count(&self, position: usize) -> Option<usize> {
        self.output_mapping
            .as_ref()
            .and_then(|m| m.get(position))
            .map(Vec::len)
    }

    pub fn edge_count(&self) -> usize {
        self.nodes.iter().map(|n| n.inputs.len()).sum()
    }

    /// Fresh states for one forward/backward run.
    pub fn new_states(&self) -> StatesCache {
        let strategy = self.storage.unwrap_or(StorageStrategy::Linear);
        StatesCache::new(
            strategy,
            self.nodes
                .iter()
                .enumerate()
                .map(|(pos, n)| (n.neuron, self.parent_count(pos).unwrap_or(0))),
        )
    }

    pub(crate) fn compute_output_mapping(&mut self) {
        let mut mapping = vec![Vec::new(); self.nodes.len()];
        for (pos, node) in self.nodes.iter().enumerate() {
            for &input in &node.inputs {
                mapping[input].push(pos);
            }
        }
        self.output_mapping = Some(mapping);
    }
}
