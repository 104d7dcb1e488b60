//! # Shapes - Container Dimensions
//!
//! Every [`Value`](crate::value::Value) has a shape. Binary operations are only
//! defined for compatible shapes, so the shape is what an error reports when an
//! operation is rejected.
//!
//! Shapes are checked at runtime (`Vec<usize>`): neuron graphs are assembled
//! from data, so nothing about their dimensions is known at compile time.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The dimensions of a value.
///
/// - `[]` is a scalar
/// - `[n]` is a vector of length `n`
/// - `[rows, cols]` is a row-major matrix
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Shape {
    /// Dimension sizes (empty = scalar, [n] = vector, [m,n] = matrix)
    pub dims: Vec<usize>,
}

impl Shape {
    /// Scalar shape (0-dimensional).
    pub fn scalar() -> Self {
        Self { dims: vec![] }
    }

    /// Vector shape (1-dimensional).
    pub fn vector(len: usize) -> Self {
        Self { dims: vec![len] }
    }

    /// Matrix shape (2-dimensional).
    pub fn matrix(rows: usize, cols: usize) -> Self {
        Self {
            dims: vec![rows, cols],
        }
    }

    /// Number of dimensions (rank).
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Total number of elements.
    pub fn numel(&self) -> usize {
        self.dims.iter().product()
    }

    pub fn is_scalar(&self) -> bool {
        self.dims.is_empty()
    }

    /// Element-wise operations need identical shapes.
    pub fn is_compatible(&self, other: &Shape) -> bool {
        self == other
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.dims.as_slice() {
            [] => write!(f, "scalar"),
            [len] => write!(f, "vector[{len}]"),
            dims => write!(
                f,
                "matrix[{}]",
                dims.iter()
                    .map(|d| d.to_string())
                    .collect::<Vec<_>>()
                    .join("x")
            ),
        }
    }
}
