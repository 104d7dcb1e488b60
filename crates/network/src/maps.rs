//! # Neuron Maps
//!
//! The arena of every neuron created from one logic source, plus the lookup
//! tables the builder uses to reuse neurons across examples:
//!
//! | table          | key                          | neuron kind   |
//! |----------------|------------------------------|---------------|
//! | atoms          | head [`Literal`]             | Atom          |
//! | aggregations   | `(RuleId, head Literal)`     | Aggregation   |
//! | rules          | [`GroundRule`]               | Rule          |
//! | facts          | fact [`Literal`]             | Fact          |
//!
//! ## Input overlays
//!
//! A neuron created by an earlier build may be part of networks that are
//! already finalized. New inputs discovered by a later build are never pushed
//! into its base input list. They go into an [`InputOverlay`] keyed by the
//! neuron; a later build wraps the previous overlay instead of editing it. The
//! effective inputs of a neuron are its base inputs followed by every overlay
//! level, oldest first.

use std::collections::HashMap;

use indexmap::IndexMap;
use tracing::debug;

use crate::error::NetworkError;
use crate::logic::{GroundRule, Literal, RuleId};
use crate::neuron::{Neuron, NeuronId, NeuronKind};
use crate::weight::{WeightId, WeightRegistry};

/// Inputs appended to a neuron by one build after the one that created it.
#[derive(Debug, Clone, PartialEq)]
pub struct InputOverlay {
    previous: Option<Box<InputOverlay>>,
    build: u32,
    inputs: Vec<NeuronId>,
    weights: Vec<WeightId>,
}

impl InputOverlay {
    fn wrap(previous: Option<InputOverlay>, build: u32) -> Self {
        Self {
            previous: previous.map(Box::new),
            build,
            inputs: Vec::new(),
            weights: Vec::new(),
        }
    }

    fn push(&mut self, input: NeuronId, weight: Option<WeightId>) {
        self.inputs.push(input);
        if let Some(weight) = weight {
            self.weights.push(weight);
        }
    }

    pub fn build(&self) -> u32 {
        self.build
    }

    /// Inputs added at this level only.
    pub fn inputs(&self) -> &[NeuronId] {
        &self.inputs
    }

    pub fn weights(&self) -> &[WeightId] {
        &self.weights
    }

    pub fn previous(&self) -> Option<&InputOverlay> {
        self.previous.as_deref()
    }

    /// Number of stacked levels.
    pub fn depth(&self) -> usize {
        1 + self.previous.as_ref().map_or(0, |p| p.depth())
    }

    fn flatten_into(&self, inputs: &mut Vec<NeuronId>, weights: &mut Vec<WeightId>) {
        if let Some(previous) = &self.previous {
            previous.flatten_into(inputs, weights);
        }
        inputs.extend_from_slice(&self.inputs);
        weights.extend_from_slice(&self.weights);
    }
}

#[derive(Debug, Clone, Default)]
pub struct NeuronMaps {
    neurons: Vec<Neuron>,
    atoms: IndexMap<Literal, NeuronId>,
    aggregations: IndexMap<(RuleId, Literal), NeuronId>,
    rules: IndexMap<GroundRule, NeuronId>,
    facts: IndexMap<Literal, NeuronId>,
    negations: Vec<NeuronId>,
    overlays: HashMap<NeuronId, InputOverlay>,
    build: u32,
}

impl NeuronMaps {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new build session. Neurons created before this call are
    /// treated as belonging to finalized networks.
    pub fn begin_build(&mut self) -> u32 {
        self.build += 1;
        debug!(build = self.build, neurons = self.neurons.len(), "begin build");
        self.build
    }

    pub fn current_build(&self) -> u32 {
        self.build
    }

    pub fn len(&self) -> usize {
        self.neurons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.neurons.is_empty()
    }

    pub fn neuron(&self, id: NeuronId) -> Result<&Neuron, NetworkError> {
        self.neurons.get(id.0).ok_or(NetworkError::UnknownNeuron(id))
    }

    pub(crate) fn neuron_mut(&mut self, id: NeuronId) -> Result<&mut Neuron, NetworkError> {
        self.neurons.get_mut(id.0).ok_or(NetworkError::UnknownNeuron(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Neuron> {
        self.neurons.iter()
    }

    pub fn atom(&self, literal: &Literal) -> Option<NeuronId> {
        self.atoms.get(literal).copied()
    }

    pub fn fact(&self, literal: &Literal) -> Option<NeuronId> {
        self.facts.get(literal).copied()
    }

    pub fn aggregation(&self, rule: RuleId, head: &Literal) -> Option<NeuronId> {
        self.aggregations.get(&(rule, head.clone())).copied()
    }

    pub fn rule(&self, grounding: &GroundRule) -> Option<NeuronId> {
        self.rules.get(grounding).copied()
    }

    /// Atom neuron for a literal, falling back to its fact neuron.
    pub fn resolve(&self, literal: &Literal) -> Option<NeuronId> {
        self.atom(literal).or_else(|| self.fact(literal))
    }

    pub fn rules(&self) -> impl Iterator<Item = (&GroundRule, NeuronId)> {
        self.rules.iter().map(|(g, &id)| (g, id))
    }

    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    pub fn aggregation_count(&self) -> usize {
        self.aggregations.len()
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn fact_count(&self) -> usize {
        self.facts.len()
    }

    pub fn negation_count(&self) -> usize {
        self.negations.len()
    }

    pub fn overlay(&self, id: NeuronId) -> Option<&InputOverlay> {
        self.overlays.get(&id)
    }

    /// Base inputs followed by all overlay levels.
    pub fn effective_inputs(&self, id: NeuronId) -> Result<(Vec<NeuronId>, Vec<WeightId>), NetworkError> {
        let neuron = self.neuron(id)?;
        let mut inputs = neuron.inputs.clone();
        let mut weights = neuron.weights.clone();
        if let Some(overlay) = self.overlays.get(&id) {
            overlay.flatten_into(&mut inputs, &mut weights);
        }
        Ok((inputs, weights))
    }

    pub fn effective_input_count(&self, id: NeuronId) -> Result<usize, NetworkError> {
        let base = self.neuron(id)?.inputs.len();
        let mut extra = 0;
        let mut level = self.overlays.get(&id);
        while let Some(overlay) = level {
            extra += overlay.inputs.len();
            level = overlay.previous();
        }
        Ok(base + extra)
    }

    fn create(&mut self, kind: NeuronKind, label: String) -> NeuronId {
        let id = NeuronId(self.neurons.len());
        self.neurons.push(Neuron::new(id, kind, label, self.build));
        id
    }

    pub(crate) fn create_atom(&mut self, literal: &Literal, kind: NeuronKind) -> NeuronId {
        let id = self.create(kind, literal.to_string());
        self.atoms.insert(literal.clone(), id);
        id
    }

    pub(crate) fn create_aggregation(&mut self, rule: RuleId, head: &Literal, kind: NeuronKind, label: String) -> NeuronId {
        let id = self.create(kind, label);
        self.aggregations.insert((rule, head.clone()), id);
        id
    }

    pub(crate) fn create_rule(&mut self, grounding: &GroundRule, kind: NeuronKind) -> NeuronId {
        let id = self.create(kind, grounding.to_string());
        self.rules.insert(grounding.clone(), id);
        id
    }

    pub(crate) fn create_fact(&mut self, literal: &Literal, weight: WeightId) -> NeuronId {
        let id = self.create(NeuronKind::Fact { weight }, literal.to_string());
        self.facts.insert(literal.clone(), id);
        id
    }

    pub(crate) fn create_negation(&mut self, input: NeuronId) -> Result<NeuronId, NetworkError> {
        let label = format!("~{}", self.neuron(input)?.label);
        let id = self.create(NeuronKind::Negation, label);
        self.neurons[id.0].add_input(input, None);
        self.negations.push(id);
        Ok(id)
    }

    /// Mark a neuron shared if it was created by an earlier build.
    pub(crate) fn touch(&mut self, id: NeuronId) -> Result<(), NetworkError> {
        let build = self.build;
        let neuron = self.neuron_mut(id)?;
        if neuron.build != build {
            neuron.shared = true;
        }
        Ok(())
    }

    /// Append an input to `target`. Neurons from earlier builds receive it
    /// through an overlay for the current build.
    pub(crate) fn append_input(
        &mut self,
        target: NeuronId,
        input: NeuronId,
        weight: Option<WeightId>,
    ) -> Result<(), NetworkError> {
        let build = self.build;
        let neuron = self.neuron_mut(target)?;
        if neuron.build == build {
            neuron.add_input(input, weight);
            return Ok(());
        }
        neuron.shared = true;
        let overlay = match self.overlays.remove(&target) {
            Some(existing) if existing.build == build => existing,
            previous => {
                debug!(neuron = %target, build, "new input overlay");
                InputOverlay::wrap(previous, build)
            }
        };
        let overlay = self.overlays.entry(target).or_insert(overlay);
        overlay.push(input, weight);
        Ok(())
    }
}

/// Everything derived from one logic source: the weights and the neurons
/// built over them. Passed by mutable reference through the build pipeline.
#[derive(Debug, Clone, Default)]
pub struct LogicScope {
    pub weights: WeightRegistry,
    pub maps: NeuronMaps,
}

impl LogicScope {
    pub fn new() -> Self {
        Self::default()
    }
}
