//! # Error Types
//!
//! Build errors abort construction of the current example's network. They are
//! raised before any shared neuron is touched, so networks finalized for other
//! examples stay valid.

use lrnn_core::AlgebraError;
use thiserror::Error;

use crate::neuron::NeuronId;
use crate::weight::WeightId;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum NetworkError {
    /// Arithmetic on neuron values failed.
    #[error(transparent)]
    Algebra(#[from] AlgebraError),

    /// A body literal resolves to neither an atom neuron nor a fact neuron.
    #[error("No input found for body literal {literal} of grounding {grounding}")]
    MissingInput { literal: String, grounding: String },

    /// A grounding already owns a rule neuron: the upstream grounder handed
    /// the same ground rule over twice.
    #[error("Grounding {grounding} already has a rule neuron")]
    GroundingKeyCollision { grounding: String },

    /// A grounding was listed under a lifted rule it does not instantiate.
    #[error("Grounding {grounding} does not belong to rule {rule}")]
    MismatchedGrounding { grounding: String, rule: String },

    #[error("Network contains a cycle through {neuron}")]
    Cyclic { neuron: String },

    #[error("Query literal {0} has no neuron")]
    UnknownQuery(String),

    #[error("Unknown weight {0}")]
    UnknownWeight(WeightId),

    #[error("Unknown neuron {0}")]
    UnknownNeuron(NeuronId),

    /// Evaluation reached a neuron whose inputs were never computed.
    #[error("Neuron {neuron} has no {what}")]
    MissingState { neuron: String, what: &'static str },

    #[error("Neuron {neuron} needs at least one input")]
    EmptyInputs { neuron: String },

    #[error("Expected {expected} output gradients, got {got}")]
    GradientCount { expected: usize, got: usize },
}
