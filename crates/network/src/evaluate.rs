//! # Network Evaluation
//!
//! Forward and backward passes over a [`DetailedNetwork`].
//!
//! ## Neuron functions
//!
//! | kind        | output                                  |
//! |-------------|-----------------------------------------|
//! | Fact        | value of its weight                     |
//! | Negation    | `1 − x`                                 |
//! | Rule        | `act(Σ x_i)` or `act(Σ w_i · x_i)`      |
//! | Aggregation | aggregation function over the inputs    |
//! | Atom        | `act(Σ w_r · agg_r)`                    |
//!
//! Gradients are derivatives of the error with respect to a node's output.
//! Weight gradients land in a caller-owned [`WeightUpdates`] buffer; the
//! registry itself is never written here.

use std::collections::VecDeque;

use lrnn_core::{AlgebraError, IterationMode, Value};

use crate::error::NetworkError;
use crate::functions::reduce_to_shape;
use crate::network::DetailedNetwork;
use crate::neuron::NeuronKind;
use crate::states::StatesCache;
use crate::weight::{WeightRegistry, WeightUpdates};

/// Compute every node in topological order; returns the root outputs.
pub fn forward(
    network: &DetailedNetwork,
    weights: &WeightRegistry,
    states: &mut StatesCache,
) -> Result<Vec<Value>, NetworkError> {
    for (pos, node) in network.nodes.iter().enumerate() {
        let inputs = input_values(network, states, pos)?;
        let (value, summed_input) = match node.kind {
            NeuronKind::Fact { weight } => (weights.value(weight)?.clone(), None),
            NeuronKind::Negation => {
                let x = inputs.first().ok_or_else(|| NetworkError::EmptyInputs {
                    neuron: node.label.clone(),
                })?;
                (Value::one().subtract(x)?, None)
            }
            NeuronKind::Aggregation { aggregation } => {
                if inputs.is_empty() {
                    return Err(NetworkError::EmptyInputs {
                        neuron: node.label.clone(),
                    });
                }
                (aggregation.evaluate(&inputs)?, None)
            }
            NeuronKind::Rule { activation, .. } | NeuronKind::Atom { activation } => {
                let z = if node.kind.is_weighted() {
                    let terms = node
                        .weights
                        .iter()
                        .zip(inputs.iter())
                        .map(|(&w, x)| -> Result<Value, NetworkError> { Ok(weights.value(w)?.multiply(x)?) })
                        .collect::<Result<Vec<_>, NetworkError>>()?;
                    sum_terms(&terms)?
                } else {
                    sum_terms(&inputs)?
                };
                (activation.evaluate(&z), Some(z))
            }
        };
        let state = state_mut(states, network, pos)?;
        state.value = Some(value);
        state.summed_input = summed_input;
    }

    network
        .roots
        .iter()
        .map(|&pos| {
            let node = &network.nodes[pos];
            states
                .get(pos, node.neuron)
                .and_then(|s| s.value.clone())
                .ok_or_else(|| missing(network, pos, "value"))
        })
        .collect()
}

/// Propagate `output_gradients` (one per root) back to every node and
/// accumulate learnable weight gradients into `updates`.
///
/// Requires the states filled by [`forward`]. Parent counting needs a
/// network finalized with an output mapping.
pub fn backward(
    network: &DetailedNetwork,
    weights: &WeightRegistry,
    states: &mut StatesCache,
    output_gradients: &[Value],
    updates: &mut WeightUpdates,
    mode: IterationMode,
) -> Result<(), NetworkError> {
    if output_gradients.len() != network.roots.len() {
        return Err(NetworkError::GradientCount {
            expected: network.roots.len(),
            got: output_gradients.len(),
        });
    }
    for (&pos, gradient) in network.roots.iter().zip(output_gradients) {
        state_mut(states, network, pos)?.add_gradient(gradient)?;
    }

    match (mode, network.output_mapping.as_ref()) {
        (IterationMode::ParentCounting, Some(mapping)) => {
            let mut ready: VecDeque<usize> = (0..network.len())
                .filter(|&pos| mapping[pos].is_empty())
                .collect();
            while let Some(pos) = ready.pop_front() {
                propagate(network, weights, states, pos, updates)?;
                for &input in &network.nodes[pos].inputs {
                    let state = state_mut(states, network, input)?;
                    state.remaining_parents = state.remaining_parents.saturating_sub(1);
                    if state.remaining_parents == 0 {
                        ready.push_back(input);
                    }
                }
            }
        }
        _ => {
            for pos in (0..network.len()).rev() {
                propagate(network, weights, states, pos, updates)?;
            }
        }
    }
    Ok(())
}

/// Push the accumulated gradient of one node into its inputs and weights.
fn propagate(
    network: &DetailedNetwork,
    weights: &WeightRegistry,
    states: &mut StatesCache,
    pos: usize,
    updates: &mut WeightUpdates,
) -> Result<(), NetworkError> {
    let node = &network.nodes[pos];
    let state = states
        .get(pos, node.neuron)
        .ok_or_else(|| missing(network, pos, "state"))?;
    let Some(delta) = state.gradient.clone() else {
        return Ok(());
    };
    let summed_input = state.summed_input.clone();

    match node.kind {
        NeuronKind::Fact { weight } => {
            if weights.is_learnable(weight) {
                updates.accumulate(weight, &delta)?;
            }
        }
        NeuronKind::Negation => {
            let input = node.inputs[0];
            state_mut(states, network, input)?.add_gradient(&delta.scale(-1.0))?;
        }
        NeuronKind::Aggregation { aggregation } => {
            let inputs = input_values(network, states, pos)?;
            let grads = aggregation.backprop(&inputs, &delta)?;
            for (&input, grad) in node.inputs.iter().zip(grads.iter()) {
                state_mut(states, network, input)?.add_gradient(grad)?;
            }
        }
        NeuronKind::Rule { activation, .. } | NeuronKind::Atom { activation } => {
            let z = summed_input.ok_or_else(|| missing(network, pos, "summed input"))?;
            let delta_z = delta.element_multiply(&activation.derivative(&z))?;
            let inputs = input_values(network, states, pos)?;

            if node.kind.is_weighted() {
                for ((&input, &w), x) in node.inputs.iter().zip(node.weights.iter()).zip(inputs.iter()) {
                    let w_value = weights.value(w)?;
                    let term_shape = w_value.multiply(x)?.shape();
                    let delta_term = reduce_to_shape(&delta_z, &term_shape)?;
                    let (dw, dx) = weighted_backprop(w_value, x, &delta_term)?;
                    if weights.is_learnable(w) {
                        updates.accumulate(w, &dw)?;
                    }
                    state_mut(states, network, input)?.add_gradient(&dx)?;
                }
            } else {
                for (&input, x) in node.inputs.iter().zip(inputs.iter()) {
                    let dx = reduce_to_shape(&delta_z, &x.shape())?;
                    state_mut(states, network, input)?.add_gradient(&dx)?;
                }
            }
        }
    }
    Ok(())
}

/// Gradients of `t = w · x` with respect to `w` and `x`, given `∂E/∂t`.
pub fn weighted_backprop(w: &Value, x: &Value, delta: &Value) -> Result<(Value, Value), AlgebraError> {
    match (w, x) {
        (Value::Scalar(s), _) => Ok((Value::scalar(delta.element_multiply(x)?.sum()), delta.scale(*s))),
        (_, Value::Scalar(s)) => Ok((delta.scale(*s), Value::scalar(delta.element_multiply(w)?.sum()))),
        (Value::Vector(_), Value::Vector(_)) => {
            let d = delta.as_scalar().ok_or_else(|| AlgebraError::ShapeMismatch {
                op: "weighted_backprop",
                lhs: delta.shape(),
                rhs: lrnn_core::Shape::scalar(),
            })?;
            Ok((x.scale(d), w.scale(d)))
        }
        (Value::Matrix(_), Value::Vector(_)) => Ok((delta.outer(x)?, delta.multiply(w)?)),
        (Value::Vector(_), Value::Matrix(_)) => Ok((x.multiply(delta)?, w.outer(delta)?)),
        (Value::Matrix(_), Value::Matrix(_)) => {
            let dw = delta.multiply(&x.transpose()?)?;
            let dx = w.transpose()?.multiply(delta)?;
            Ok((dw, dx))
        }
    }
}

fn sum_terms(terms: &[Value]) -> Result<Value, AlgebraError> {
    let Some((first, rest)) = terms.split_first() else {
        return Ok(Value::scalar(0.0));
    };
    let mut acc = first.clone();
    for term in rest {
        acc = acc.add(term)?;
    }
    Ok(acc)
}

fn input_values(network: &DetailedNetwork, states: &StatesCache, pos: usize) -> Result<Vec<Value>, NetworkError> {
    network.nodes[pos]
        .inputs
        .iter()
        .map(|&input| {
            states
                .get(input, network.nodes[input].neuron)
                .and_then(|s| s.value.clone())
                .ok_or_else(|| missing(network, input, "value"))
        })
        .collect()
}

fn state_mut<'s>(
    states: &'s mut StatesCache,
    network: &DetailedNetwork,
    pos: usize,
) -> Result<&'s mut crate::states::NeuronState, NetworkError> {
    let neuron = network.nodes[pos].neuron;
    states
        .get_mut(pos, neuron)
        .ok_or_else(|| missing(network, pos, "state"))
}

fn missing(network: &DetailedNetwork, pos: usize, what: &'static str) -> NetworkError {
    NetworkError::MissingState {
        neuron: network.nodes[pos].label.clone(),
        what,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lrnn_core::Matrix;

    fn close(a: &Value, b: &Value) -> bool {
        a.approx_eq(b, 1e-9)
    }

    #[test]
    fn test_weighted_backprop_matrix_vector() {
        let w = Value::Matrix(Matrix::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap());
        let x = Value::vector(vec![1.0, -1.0]);
        let delta = Value::vector(vec![1.0, 0.5]);
        let (dw, dx) = weighted_backprop(&w, &x, &delta).unwrap();
        assert!(close(&dw, &Value::matrix(2, 2, vec![1.0, -1.0, 0.5, -0.5]).unwrap()));
        assert!(close(&dx, &Value::vector(vec![2.5, 4.0])));
    }

    #[test]
    fn test_weighted_backprop_scalar_weight() {
        let (dw, dx) = weighted_backprop(
            &Value::scalar(2.0),
            &Value::vector(vec![1.0, 3.0]),
            &Value::vector(vec![0.5, 0.5]),
        )
        .unwrap();
        assert!(close(&dw, &Value::scalar(2.0)));
        assert!(close(&dx, &Value::vector(vec![1.0, 1.0])));
    }

    #[test]
    fn test_weighted_backprop_vector_dot() {
        let (dw, dx) = weighted_backprop(
            &Value::vector(vec![1.0, 2.0]),
            &Value::vector(vec![3.0, 4.0]),
            &Value::scalar(2.0),
        )
        .unwrap();
        assert!(close(&dw, &Value::vector(vec![6.0, 8.0])));
        assert!(close(&dx, &Value::vector(vec![2.0, 4.0])));
    }

    #[test]
    fn test_weighted_backprop_matrix_matrix() {
        let w = Value::matrix(1, 2, vec![1.0, 2.0]).unwrap();
        let x = Value::matrix(2, 1, vec![3.0, 4.0]).unwrap();
        let delta = Value::matrix(1, 1, vec![1.0]).unwrap();
        let (dw, dx) = weighted_backprop(&w, &x, &delta).unwrap();
        assert!(close(&dw, &Value::matrix(1, 2, vec![3.0, 4.0]).unwrap()));
        assert!(close(&dx, &Value::matrix(2, 1, vec![1.0, 2.0]).unwrap()));
    }

    #[test]
    fn test_empty_weighted_sum_is_zero() {
        assert_eq!(sum_terms(&[]).unwrap(), Value::scalar(0.0));
    }
}
