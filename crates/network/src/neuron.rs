//! Neuron records stored in the [`NeuronMaps`](crate::maps::NeuronMaps) arena.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::functions::{Activation, Aggregation};
use crate::weight::WeightId;

/// Index of a neuron in its arena. Stable for the arena's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NeuronId(pub usize);

impl fmt::Display for NeuronId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NeuronKind {
    /// Leaf; outputs the value of its weight.
    Fact { weight: WeightId },
    /// Head literal; weighted sum over its aggregations.
    Atom { activation: Activation },
    /// One lifted rule for one head.
    Aggregation { aggregation: Aggregation },
    /// One grounding; weighted only when a body literal carries a weight.
    Rule { activation: Activation, weighted: bool },
    /// `1 − x` of its single input.
    Negation,
}

impl NeuronKind {
    /// Inputs of weighted neurons each carry a weight.
    pub fn is_weighted(&self) -> bool {
        match self {
            NeuronKind::Atom { .. } => true,
            NeuronKind::Rule { weighted, .. } => *weighted,
            _ => false,
        }
    }

    /// Whether permuting the inputs leaves the output unchanged.
    pub fn is_input_symmetric(&self) -> bool {
        match self {
            NeuronKind::Atom { .. } | NeuronKind::Rule { .. } => true,
            NeuronKind::Aggregation { aggregation } => aggregation.is_input_symmetric(),
            NeuronKind::Fact { .. } | NeuronKind::Negation => false,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            NeuronKind::Fact { .. } => "fact",
            NeuronKind::Atom { .. } => "atom",
            NeuronKind::Aggregation { .. } => "aggregation",
            NeuronKind::Rule { .. } => "rule",
            NeuronKind::Negation => "negation",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Neuron {
    pub id: NeuronId,
    pub kind: NeuronKind,
    pub label: String,
    /// Inputs wired during the build that created this neuron. Inputs added
    /// by later builds live in input overlays.
    pub inputs: Vec<NeuronId>,
    /// Parallel to `inputs` for weighted kinds, empty otherwise.
    pub weights: Vec<WeightId>,
    /// Reachable from more than one example network.
    pub shared: bool,
    /// Build session that created the neuron.
    pub build: u32,
}

impl Neuron {
    pub(crate) fn new(id: NeuronId, kind: NeuronKind, label: String, build: u32) -> Self {
        Self {
            id,
            kind,
            label,
            inputs: Vec::new(),
            weights: Vec::new(),
            shared: false,
            build,
        }
    }

    pub(crate) fn add_input(&mut self, input: NeuronId, weight: Option<WeightId>) {
        self.inputs.push(input);
        if let Some(weight) = weight {
            self.weights.push(weight);
        }
    }

    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }
}

impl fmt::Display for Neuron {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}[{}]", self.id, self.kind.name(), self.label)
    }
}
