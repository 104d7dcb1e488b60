//! # Neuron Functions
//!
//! Activations are applied element-wise to a neuron's summed input.
//! Aggregations fold the outputs of all rule neurons grounding one lifted rule
//! into a single value.
//!
//! ## Input symmetry
//!
//! An aggregation is *input-symmetric* when permuting its inputs cannot change
//! its output. Only symmetric neurons may have parallel inputs pruned or
//! merged by [`ParallelEdgeMerger`](crate::reduce::ParallelEdgeMerger).

use lrnn_core::{AlgebraError, Shape, Value};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    Identity,
    #[default]
    Sigmoid,
    Tanh,
    Relu,
}

impl Activation {
    pub fn evaluate(&self, input: &Value) -> Value {
        match self {
            Activation::Identity => input.clone(),
            Activation::Sigmoid => input.apply(sigmoid),
            Activation::Tanh => input.apply(f64::tanh),
            Activation::Relu => input.apply(|x| x.max(0.0)),
        }
    }

    /// Derivative with respect to the summed input `input`.
    pub fn derivative(&self, input: &Value) -> Value {
        match self {
            Activation::Identity => input.apply(|_| 1.0),
            Activation::Sigmoid => input.apply(|x| {
                let s = sigmoid(x);
                s * (1.0 - s)
            }),
            Activation::Tanh => input.apply(|x| 1.0 - x.tanh().powi(2)),
            Activation::Relu => input.apply(|x| if x > 0.0 { 1.0 } else { 0.0 }),
        }
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    Sum,
    #[default]
    Average,
    Maximum,
    Minimum,
    /// Scalars and vectors laid end to end into one vector.
    Concatenation,
}

impl Aggregation {
    pub fn is_input_symmetric(&self) -> bool {
        !matches!(self, Aggregation::Concatenation)
    }

    pub fn evaluate(&self, inputs: &[Value]) -> Result<Value, AlgebraError> {
        let (first, rest) = inputs.split_first().ok_or_else(|| AlgebraError::InvalidData {
            reason: "aggregation over no inputs".into(),
        })?;
        match self {
            Aggregation::Sum => sum(first, rest),
            Aggregation::Average => Ok(sum(first, rest)?.scale(1.0 / inputs.len() as f64)),
            Aggregation::Maximum => extreme(inputs, |candidate, best| candidate > best)
                .map(|(value, _)| value),
            Aggregation::Minimum => extreme(inputs, |candidate, best| candidate < best)
                .map(|(value, _)| value),
            Aggregation::Concatenation => {
                let mut out = Vec::new();
                for input in inputs {
                    concat_piece(input)?;
                    out.extend_from_slice(input.as_slice());
                }
                Ok(Value::vector(out))
            }
        }
    }

    /// Gradient for each input, given the forward inputs and the gradient
    /// arriving at the aggregation output.
    pub fn backprop(&self, inputs: &[Value], gradient: &Value) -> Result<Vec<Value>, AlgebraError> {
        match self {
            Aggregation::Sum => inputs
                .iter()
                .map(|x| reduce_to_shape(gradient, &x.shape()))
                .collect(),
            Aggregation::Average => {
                let scaled = gradient.scale(1.0 / inputs.len().max(1) as f64);
                inputs
                    .iter()
                    .map(|x| reduce_to_shape(&scaled, &x.shape()))
                    .collect()
            }
            Aggregation::Maximum | Aggregation::Minimum => {
                let winners = match self {
                    Aggregation::Maximum => extreme(inputs, |c, b| c > b)?.1,
                    _ => extreme(inputs, |c, b| c < b)?.1,
                };
                let mut grads: Vec<Value> = inputs.iter().map(Value::zeros_like).collect();
                let delta = gradient.as_slice();
                for (pos, &winner) in winners.iter().enumerate() {
                    let d = if delta.len() == 1 { delta[0] } else { delta[pos] };
                    grads[winner].as_mut_slice()[pos] += d;
                }
                Ok(grads)
            }
            Aggregation::Concatenation => {
                let delta = gradient.as_slice();
                let mut offset = 0;
                let mut grads = Vec::with_capacity(inputs.len());
                for input in inputs {
                    let len = input.len();
                    let piece = delta.get(offset..offset + len).ok_or_else(|| {
                        AlgebraError::ShapeMismatch {
                            op: "concatenation_backprop",
                            lhs: gradient.shape(),
                            rhs: input.shape(),
                        }
                    })?;
                    grads.push(match input {
                        Value::Scalar(_) => Value::scalar(piece[0]),
                        _ => Value::vector(piece.to_vec()),
                    });
                    offset += len;
                }
                Ok(grads)
            }
        }
    }
}

fn sum(first: &Value, rest: &[Value]) -> Result<Value, AlgebraError> {
    let mut acc = first.clone();
    for value in rest {
        acc = acc.add(value)?;
    }
    Ok(acc)
}

/// Element-wise extreme of equally shaped inputs, with the index of the
/// winning input per element. Ties keep the earliest input.
fn extreme(inputs: &[Value], better: impl Fn(f64, f64) -> bool) -> Result<(Value, Vec<usize>), AlgebraError> {
    let first = inputs.first().ok_or_else(|| AlgebraError::InvalidData {
        reason: "aggregation over no inputs".into(),
    })?;
    let shape = first.shape();
    let mut best = first.clone();
    let mut winners = vec![0; first.len()];
    for (i, input) in inputs.iter().enumerate().skip(1) {
        if input.shape() != shape {
            return Err(AlgebraError::ShapeMismatch {
                op: "extreme",
                lhs: shape,
                rhs: input.shape(),
            });
        }
        for (pos, (b, &c)) in best.as_mut_slice().iter_mut().zip(input.iter()).enumerate() {
            if better(c, *b) {
                *b = c;
                winners[pos] = i;
            }
        }
    }
    Ok((best, winners))
}

fn concat_piece(input: &Value) -> Result<(), AlgebraError> {
    match input {
        Value::Matrix(_) => Err(AlgebraError::UnsupportedOperation {
            op: "concatenation",
            shape: input.shape(),
        }),
        _ => Ok(()),
    }
}

/// Collapse a gradient onto the shape of an operand that was broadcast.
///
/// A scalar operand broadcast into a container receives the sum of the
/// container gradient.
pub(crate) fn reduce_to_shape(gradient: &Value, shape: &Shape) -> Result<Value, AlgebraError> {
    let grad_shape = gradient.shape();
    if &grad_shape == shape {
        Ok(gradient.clone())
    } else if shape.is_scalar() {
        Ok(Value::scalar(gradient.sum()))
    } else if grad_shape.is_scalar() {
        let mut expanded = Value::zeros(shape)?;
        expanded.increment_by(gradient)?;
        Ok(expanded)
    } else {
        Err(AlgebraError::ShapeMismatch {
            op: "reduce_to_shape",
            lhs: grad_shape,
            rhs: shape.clone(),
        })
    }
}
