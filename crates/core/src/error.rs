//! # Error Types
//!
//! Algebra errors are composition failures: an operation was asked to
//! combine values whose shapes it has no meaning for. They are never
//! silently coerced.

use thiserror::Error;

use crate::shape::Shape;

/// Errors raised by the value algebra.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum AlgebraError {
    /// Two operands have shapes the operation cannot combine.
    #[error("Shape mismatch in {op}: {lhs} vs {rhs}")]
    ShapeMismatch {
        op: &'static str,
        lhs: Shape,
        rhs: Shape,
    },

    /// The operation is undefined for this kind of value (e.g. transposing a scalar).
    #[error("Unsupported operation {op} on {shape}")]
    UnsupportedOperation { op: &'static str, shape: Shape },

    /// A value was built from inconsistent raw data.
    #[error("Invalid value data: {reason}")]
    InvalidData { reason: String },
}

/// Errors raised while loading or validating [`Settings`](crate::settings::Settings).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read settings file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse settings: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid setting {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}
