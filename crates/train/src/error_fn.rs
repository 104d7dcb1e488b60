//! # Error Functions
//!
//! Per-sample error between a network output and its target, and the
//! gradient of that error with respect to the output.

use lrnn_core::{AlgebraError, ErrorFunction, Value};

pub trait ErrorFcn: Send + Sync {
    fn evaluate(&self, output: &Value, target: &Value) -> Result<f64, AlgebraError>;

    /// `∂E/∂output`, shaped like `output`.
    fn differentiate(&self, output: &Value, target: &Value) -> Result<Value, AlgebraError>;

    fn name(&self) -> &'static str;
}

/// `½ Σ (o − t)²`; gradient `o − t`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SquaredDiff;

impl ErrorFcn for SquaredDiff {
    fn evaluate(&self, output: &Value, target: &Value) -> Result<f64, AlgebraError> {
        let diff = output.subtract(target)?;
        Ok(0.5 * diff.iter().map(|d| d * d).sum::<f64>())
    }

    fn differentiate(&self, output: &Value, target: &Value) -> Result<Value, AlgebraError> {
        output.subtract(target)
    }

    fn name(&self) -> &'static str {
        "squared_diff"
    }
}

/// `Σ |o − t|`; gradient `sign(o − t)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct AbsDiff;

impl ErrorFcn for AbsDiff {
    fn evaluate(&self, output: &Value, target: &Value) -> Result<f64, AlgebraError> {
        Ok(output.subtract(target)?.iter().map(|d| d.abs()).sum())
    }

    fn differentiate(&self, output: &Value, target: &Value) -> Result<Value, AlgebraError> {
        Ok(output.subtract(target)?.apply(|d| {
            if d > 0.0 {
                1.0
            } else if d < 0.0 {
                -1.0
            } else {
                0.0
            }
        }))
    }

    fn name(&self) -> &'static str {
        "abs_diff"
    }
}

pub fn for_setting(setting: ErrorFunction) -> Box<dyn ErrorFcn> {
    match setting {
        ErrorFunction::SquaredDiff => Box::new(SquaredDiff),
        ErrorFunction::AbsDiff => Box::new(AbsDiff),
    }
}
