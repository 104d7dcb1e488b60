//! # Values - Scalar, Vector and Matrix Operands
//!
//! Every neuron output, gradient and weight in a lifted network is a [`Value`].
//! A value is one of three containers:
//!
//! | Variant | Storage | Shape |
//! |---------|---------|-------|
//! | `Scalar` | one `f64` | `[]` |
//! | `Vector` | `Vec<f64>` | `[n]` |
//! | `Matrix` | row-major `Vec<f64>` | `[rows, cols]` |
//!
//! ## Dispatch
//!
//! Binary operations match on the *pair* of runtime variants. The left
//! operand is never privileged: `Scalar × Matrix` and `Matrix × Scalar` both
//! broadcast, while `Vector × Matrix` and `Matrix × Vector` are distinct
//! linear-algebra products with different shape requirements.
//!
//! | lhs \ rhs | Scalar | Vector(n) | Matrix(r×c) |
//! |-----------|--------|-----------|-------------|
//! | Scalar | scalar | broadcast | broadcast |
//! | Vector(n) | broadcast | dot → Scalar | `n = r` → Vector(c) |
//! | Matrix(r×c) | broadcast | `c = n` → Vector(r) | `c = r'` → Matrix |
//!
//! Shape mismatches are reported as [`AlgebraError::ShapeMismatch`] and never
//! coerced. The only shape-changing leniency is scalar broadcast.
//!
//! ## Example
//!
//! ```rust
//! use lrnn_core::Value;
//!
//! let m = Value::matrix(2, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
//! let v = Value::vector(vec![1.0, 0.0, 1.0]);
//!
//! // Matrix(2x3) * Vector(3) -> Vector(2)
//! let mv = m.multiply(&v).unwrap();
//! assert_eq!(mv, Value::vector(vec![4.0, 10.0]));
//!
//! // Vector(3) * Vector(2) is undefined
//! assert!(v.multiply(&mv).is_err());
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::AlgebraError;
use crate::shape::Shape;

/// A dense row-major matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matrix {
    rows: usize,
    cols: usize,
    /// Row-major data: all of row 0, then row 1, ...
    data: Vec<f64>,
}

impl Matrix {
    /// Build a matrix from row-major data.
    pub fn new(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self, AlgebraError> {
        if data.len() != rows * cols {
            return Err(AlgebraError::InvalidData {
                reason: format!(
                    "{} elements cannot fill a {}x{} matrix",
                    data.len(),
                    rows,
                    cols
                ),
            });
        }
        Ok(Self { rows, cols, data })
    }

    /// Build a matrix from a list of equally long rows.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self, AlgebraError> {
        let cols = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|r| r.len() != cols) {
            return Err(AlgebraError::InvalidData {
                reason: "matrix rows have different lengths".to_string(),
            });
        }
        let n_rows = rows.len();
        Ok(Self {
            rows: n_rows,
            cols,
            data: rows.into_iter().flatten().collect(),
        })
    }

    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![0.0; rows * cols],
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Element at (row, col).
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }

    /// One row as a slice.
    pub fn row(&self, row: usize) -> &[f64] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    /// Raw row-major data.
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Materialized transposed copy.
    pub fn transposed(&self) -> Matrix {
        let mut data = vec![0.0; self.rows * self.cols];
        for i in 0..self.rows {
            for j in 0..self.cols {
                data[j * self.rows + i] = self.data[i * self.cols + j];
            }
        }
        Matrix {
            rows: self.cols,
            cols: self.rows,
            data,
        }
    }

    fn same_dims(&self, other: &Matrix) -> bool {
        self.rows == other.rows && self.cols == other.cols
    }
}

/// A numeric operand: scalar, vector or row-major matrix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Scalar(f64),
    Vector(Vec<f64>),
    Matrix(Matrix),
}

impl Default for Value {
    fn default() -> Self {
        Value::Scalar(0.0)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Scalar(value)
    }
}

impl From<Vec<f64>> for Value {
    fn from(values: Vec<f64>) -> Self {
        Value::Vector(values)
    }
}

impl From<Matrix> for Value {
    fn from(matrix: Matrix) -> Self {
        Value::Matrix(matrix)
    }
}

fn mismatch(op: &'static str, lhs: &Value, rhs: &Value) -> AlgebraError {
    AlgebraError::ShapeMismatch {
        op,
        lhs: lhs.shape(),
        rhs: rhs.shape(),
    }
}

fn zip(a: &[f64], b: &[f64], f: &impl Fn(f64, f64) -> f64) -> Vec<f64> {
    a.iter().zip(b.iter()).map(|(&x, &y)| f(x, y)).collect()
}

impl Value {
    // ========================================================================
    // Constructors
    // ========================================================================

    pub fn scalar(value: f64) -> Self {
        Value::Scalar(value)
    }

    pub fn vector(values: Vec<f64>) -> Self {
        Value::Vector(values)
    }

    /// Build a matrix value from row-major data.
    pub fn matrix(rows: usize, cols: usize, data: Vec<f64>) -> Result<Self, AlgebraError> {
        Matrix::new(rows, cols, data).map(Value::Matrix)
    }

    /// The scalar one, used as the unit weight.
    pub fn one() -> Self {
        Value::Scalar(1.0)
    }

    /// A zero-filled value of the given shape.
    pub fn zeros(shape: &Shape) -> Result<Self, AlgebraError> {
        match shape.dims.as_slice() {
            [] => Ok(Value::Scalar(0.0)),
            [len] => Ok(Value::Vector(vec![0.0; *len])),
            [rows, cols] => Ok(Value::Matrix(Matrix::zeros(*rows, *cols))),
            _ => Err(AlgebraError::UnsupportedOperation {
                op: "zeros",
                shape: shape.clone(),
            }),
        }
    }

    // ========================================================================
    // Inspection
    // ========================================================================

    pub fn shape(&self) -> Shape {
        match self {
            Value::Scalar(_) => Shape::scalar(),
            Value::Vector(v) => Shape::vector(v.len()),
            Value::Matrix(m) => Shape::matrix(m.rows, m.cols),
        }
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        match self {
            Value::Scalar(_) => 1,
            Value::Vector(v) => v.len(),
            Value::Matrix(m) => m.data.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Elements in storage order (row-major for matrices).
    pub fn as_slice(&self) -> &[f64] {
        match self {
            Value::Scalar(s) => std::slice::from_ref(s),
            Value::Vector(v) => v.as_slice(),
            Value::Matrix(m) => m.data.as_slice(),
        }
    }

    /// Mutable elements in storage order.
    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        match self {
            Value::Scalar(s) => std::slice::from_mut(s),
            Value::Vector(v) => v.as_mut_slice(),
            Value::Matrix(m) => m.data.as_mut_slice(),
        }
    }

    /// Row-major iteration over all elements.
    pub fn iter(&self) -> std::slice::Iter<'_, f64> {
        self.as_slice().iter()
    }

    /// The value of a scalar, `None` for containers.
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Value::Scalar(s) => Some(*s),
            _ => None,
        }
    }

    /// Sum of all elements.
    pub fn sum(&self) -> f64 {
        self.iter().sum()
    }

    /// Element-wise comparison within an absolute tolerance.
    pub fn approx_eq(&self, other: &Value, tolerance: f64) -> bool {
        self.shape() == other.shape()
            && self
                .iter()
                .zip(other.iter())
                .all(|(a, b)| (a - b).abs() <= tolerance)
    }

    // ========================================================================
    // Unary operations
    // ========================================================================

    /// A zero-filled value with the same shape.
    pub fn zeros_like(&self) -> Value {
        self.apply(|_| 0.0)
    }

    /// Zero-fill in place.
    pub fn zero_fill(&mut self) {
        self.as_mut_slice().iter_mut().for_each(|x| *x = 0.0);
    }

    /// Overwrite every element with successive results of `f`.
    pub fn fill_with(&mut self, mut f: impl FnMut() -> f64) {
        self.as_mut_slice().iter_mut().for_each(|x| *x = f());
    }

    /// Element-wise map into a new value of the same shape.
    pub fn apply(&self, f: impl Fn(f64) -> f64) -> Value {
        match self {
            Value::Scalar(s) => Value::Scalar(f(*s)),
            Value::Vector(v) => Value::Vector(v.iter().map(|&x| f(x)).collect()),
            Value::Matrix(m) => Value::Matrix(Matrix {
                rows: m.rows,
                cols: m.cols,
                data: m.data.iter().map(|&x| f(x)).collect(),
            }),
        }
    }

    /// Multiply every element by a constant.
    pub fn scale(&self, factor: f64) -> Value {
        self.apply(|x| x * factor)
    }

    /// Transposed copy. Only matrices can be transposed.
    pub fn transpose(&self) -> Result<Value, AlgebraError> {
        match self {
            Value::Matrix(m) => Ok(Value::Matrix(m.transposed())),
            other => Err(AlgebraError::UnsupportedOperation {
                op: "transpose",
                shape: other.shape(),
            }),
        }
    }

    // ========================================================================
    // Binary operations (double dispatch on the variant pair)
    // ========================================================================

    /// Element-wise combination with scalar broadcast on either side.
    fn zip_with(
        &self,
        rhs: &Value,
        op: &'static str,
        f: impl Fn(f64, f64) -> f64,
    ) -> Result<Value, AlgebraError> {
        match (self, rhs) {
            (Value::Scalar(a), other) => Ok(other.apply(|b| f(*a, b))),
            (this, Value::Scalar(b)) => Ok(this.apply(|a| f(a, *b))),
            (Value::Vector(a), Value::Vector(b)) if a.len() == b.len() => {
                Ok(Value::Vector(zip(a, b, &f)))
            }
            (Value::Matrix(a), Value::Matrix(b)) if a.same_dims(b) => Ok(Value::Matrix(Matrix {
                rows: a.rows,
                cols: a.cols,
                data: zip(&a.data, &b.data, &f),
            })),
            _ => Err(mismatch(op, self, rhs)),
        }
    }

    /// `self + rhs`
    pub fn add(&self, rhs: &Value) -> Result<Value, AlgebraError> {
        self.zip_with(rhs, "add", |a, b| a + b)
    }

    /// `self - rhs`
    pub fn subtract(&self, rhs: &Value) -> Result<Value, AlgebraError> {
        self.zip_with(rhs, "subtract", |a, b| a - b)
    }

    /// Hadamard product `self ⊙ rhs`.
    pub fn element_multiply(&self, rhs: &Value) -> Result<Value, AlgebraError> {
        self.zip_with(rhs, "element_multiply", |a, b| a * b)
    }

    /// Linear-algebra product `self · rhs` (see the module table).
    pub fn multiply(&self, rhs: &Value) -> Result<Value, AlgebraError> {
        match (self, rhs) {
            (Value::Scalar(a), other) => Ok(other.scale(*a)),
            (this, Value::Scalar(b)) => Ok(this.scale(*b)),
            (Value::Vector(a), Value::Vector(b)) if a.len() == b.len() => Ok(Value::Scalar(
                a.iter().zip(b.iter()).map(|(x, y)| x * y).sum::<f64>(),
            )),
            (Value::Matrix(m), Value::Vector(v)) if m.cols == v.len() => {
                let out = (0..m.rows)
                    .map(|i| m.row(i).iter().zip(v.iter()).map(|(x, y)| x * y).sum::<f64>())
                    .collect();
                Ok(Value::Vector(out))
            }
            (Value::Vector(v), Value::Matrix(m)) if m.rows == v.len() => {
                let mut out = vec![0.0; m.cols];
                for (i, &vi) in v.iter().enumerate() {
                    for (j, o) in out.iter_mut().enumerate() {
                        *o += vi * m.get(i, j);
                    }
                }
                Ok(Value::Vector(out))
            }
            (Value::Matrix(a), Value::Matrix(b)) if a.cols == b.rows => {
                let mut out = Matrix::zeros(a.rows, b.cols);
                for i in 0..a.rows {
                    for k in 0..a.cols {
                        let aik = a.get(i, k);
                        for j in 0..b.cols {
                            out.data[i * b.cols + j] += aik * b.get(k, j);
                        }
                    }
                }
                Ok(Value::Matrix(out))
            }
            _ => Err(mismatch("multiply", self, rhs)),
        }
    }

    /// Outer product of two vectors: `Vector(m) ⊗ Vector(n) -> Matrix(m×n)`.
    pub fn outer(&self, rhs: &Value) -> Result<Value, AlgebraError> {
        match (self, rhs) {
            (Value::Vector(a), Value::Vector(b)) => {
                let data = a
                    .iter()
                    .flat_map(|&x| b.iter().map(move |&y| x * y))
                    .collect();
                Ok(Value::Matrix(Matrix {
                    rows: a.len(),
                    cols: b.len(),
                    data,
                }))
            }
            _ => Err(mismatch("outer", self, rhs)),
        }
    }

    /// In-place `self += rhs`.
    ///
    /// A scalar `rhs` is broadcast into a container; a scalar `self` cannot
    /// absorb a container.
    pub fn increment_by(&mut self, rhs: &Value) -> Result<(), AlgebraError> {
        match (self, rhs) {
            (Value::Scalar(a), Value::Scalar(b)) => *a += b,
            (Value::Vector(a), Value::Vector(b)) if a.len() == b.len() => {
                a.iter_mut().zip(b.iter()).for_each(|(x, y)| *x += y);
            }
            (Value::Matrix(a), Value::Matrix(b)) if a.same_dims(b) => {
                a.data.iter_mut().zip(b.data.iter()).for_each(|(x, y)| *x += y);
            }
            (this @ (Value::Vector(_) | Value::Matrix(_)), Value::Scalar(b)) => {
                this.as_mut_slice().iter_mut().for_each(|x| *x += b);
            }
            (this, other) => return Err(mismatch("increment_by", this, other)),
        }
        Ok(())
    }

    /// Majority comparison: true iff strictly more than half of the
    /// (broadcast) element pairs satisfy `rhs_i < self_i`.
    ///
    /// `Scalar(s).greater_than(container)` is therefore true when more than
    /// half of the container's elements are below `s`, not when all are.
    pub fn greater_than(&self, rhs: &Value) -> Result<bool, AlgebraError> {
        let (below, total) = match (self, rhs) {
            (Value::Scalar(a), other) => (other.iter().filter(|&&b| b < *a).count(), other.len()),
            (this, Value::Scalar(b)) => (this.iter().filter(|&&a| *b < a).count(), this.len()),
            (Value::Vector(a), Value::Vector(b)) if a.len() == b.len() => (
                a.iter().zip(b.iter()).filter(|(x, y)| y < x).count(),
                a.len(),
            ),
            (Value::Matrix(a), Value::Matrix(b)) if a.same_dims(b) => (
                a.data.iter().zip(b.data.iter()).filter(|(x, y)| y < x).count(),
                a.data.len(),
            ),
            _ => return Err(mismatch("greater_than", self, rhs)),
        };
        Ok(2 * below > total)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn list(values: &[f64]) -> String {
            values
                .iter()
                .map(|v| format!("{v:.4}"))
                .collect::<Vec<_>>()
                .join(", ")
        }
        match self {
            Value::Scalar(s) => write!(f, "{s:.4}"),
            Value::Vector(v) => write!(f, "[{}]", list(v)),
            Value::Matrix(m) => {
                let rows: Vec<String> = (0..m.rows)
                    .map(|i| format!("[{}]", list(m.row(i))))
                    .collect();
                write!(f, "[{}]", rows.join(", "))
            }
        }
    }
}
