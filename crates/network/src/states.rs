//! # Evaluation States
//!
//! Per-run computation state of every neuron in a network: output value,
//! summed input, accumulated gradient and the number of parents that still
//! owe a gradient.
//!
//! The container is chosen once per network by [`StorageStrategy::select`]:
//! small networks index a dense array by topological position, larger ones
//! key a tree or a hash map by neuron id.

use std::collections::{BTreeMap, HashMap};

use lrnn_core::{Settings, Value};
use serde::{Deserialize, Serialize};

use crate::neuron::NeuronId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StorageStrategy {
    Linear,
    Tree,
    Hash,
}

impl StorageStrategy {
    /// `< lin2bst` neurons: Linear, `< bst2hashmap`: Tree, otherwise Hash.
    pub fn select(neurons: usize, settings: &Settings) -> Self {
        if neurons < settings.lin2bst {
            StorageStrategy::Linear
        } else if neurons < settings.bst2hashmap {
            StorageStrategy::Tree
        } else {
            StorageStrategy::Hash
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NeuronState {
    pub value: Option<Value>,
    /// Input before activation, kept for the activation derivative.
    pub summed_input: Option<Value>,
    pub gradient: Option<Value>,
    pub remaining_parents: usize,
}

impl NeuronState {
    fn with_parents(parents: usize) -> Self {
        Self {
            remaining_parents: parents,
            ..Self::default()
        }
    }

    /// Add to the accumulated gradient.
    pub fn add_gradient(&mut self, gradient: &Value) -> Result<(), lrnn_core::AlgebraError> {
        match &mut self.gradient {
            Some(acc) => acc.increment_by(gradient),
            slot @ None => {
                *slot = Some(gradient.clone());
                Ok(())
            }
        }
    }
}

/// States addressed by `(position, neuron id)`. Linear stores use the
/// position, keyed stores use the id.
#[derive(Debug, Clone, PartialEq)]
pub enum StatesCache {
    Linear(Vec<NeuronState>),
    Tree(BTreeMap<NeuronId, NeuronState>),
    Hash(HashMap<NeuronId, NeuronState>),
}

impl StatesCache {
    /// `neurons` yields each neuron id with its parent count, in position order.
    pub fn new(strategy: StorageStrategy, neurons: impl Iterator<Item = (NeuronId, usize)>) -> Self {
        match strategy {
            StorageStrategy::Linear => {
                StatesCache::Linear(neurons.map(|(_, p)| NeuronState::with_parents(p)).collect())
            }
            StorageStrategy::Tree => StatesCache::Tree(
                neurons
                    .map(|(id, p)| (id, NeuronState::with_parents(p)))
                    .collect(),
            ),
            StorageStrategy::Hash => StatesCache::Hash(
                neurons
                    .map(|(id, p)| (id, NeuronState::with_parents(p)))
                    .collect(),
            ),
        }
    }

    pub fn strategy(&self) -> StorageStrategy {
        match self {
            StatesCache::Linear(_) => StorageStrategy::Linear,
            StatesCache::Tree(_) => StorageStrategy::Tree,
            StatesCache::Hash(_) => StorageStrategy::Hash,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            StatesCache::Linear(v) => v.len(),
            StatesCache::Tree(m) => m.len(),
            StatesCache::Hash(m) => m.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, position: usize, id: NeuronId) -> Option<&NeuronState> {
        match self {
            StatesCache::Linear(v) => v.get(position),
            StatesCache::Tree(m) => m.get(&id),
            StatesCache::Hash(m) => m.get(&id),
        }
    }

    pub fn get_mut(&mut self, position: usize, id: NeuronId) -> Option<&mut NeuronState> {
        match self {
            StatesCache::Linear(v) => v.get_mut(position),
            StatesCache::Tree(m) => m.get_mut(&id),
            StatesCache::Hash(m) => m.get_mut(&id),
        }
    }

    /// Drop gradients but keep forward values.
    pub fn clear_gradients(&mut self) {
        self.for_each_mut(|s| s.gradient = None);
    }

    fn for_each_mut(&mut self, mut f: impl FnMut(&mut NeuronState)) {
        match self {
            StatesCache::Linear(v) => v.iter_mut().for_each(f),
            StatesCache::Tree(m) => m.values_mut().for_each(&mut f),
            StatesCache::Hash(m) => m.values_mut().for_each(&mut f),
        }
    }
}
