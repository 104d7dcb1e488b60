//! # Results
//!
//! One [`SampleResult`] per evaluated sample, and [`Results`] summarizing an
//! epoch or an evaluation run. When every target is a scalar 0 or 1 the
//! summary also carries classification statistics at a 0.5 threshold.

use std::cmp::Ordering;

use lrnn_core::Value;
use serde::Serialize;

use crate::error::TrainError;
use crate::error_fn::ErrorFcn;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleResult {
    pub sample_id: String,
    pub output: Value,
    pub target: Value,
    pub error: f64,
}

/// Builds [`SampleResult`]s with a fixed error function.
pub struct ResultFactory<'a> {
    error_fn: &'a dyn ErrorFcn,
}

impl<'a> ResultFactory<'a> {
    pub fn new(error_fn: &'a dyn ErrorFcn) -> Self {
        Self { error_fn }
    }

    pub fn create(&self, sample_id: &str, output: Value, target: &Value) -> Result<SampleResult, TrainError> {
        let error = self.error_fn.evaluate(&output, target)?;
        Ok(SampleResult {
            sample_id: sample_id.to_string(),
            output,
            target: target.clone(),
            error,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClassificationStats {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f_measure: f64,
    /// Error of always predicting the majority class.
    pub majority_error: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Results {
    pub results: Vec<SampleResult>,
    /// Mean per-sample error.
    pub error: f64,
    pub classification: Option<ClassificationStats>,
}

impl Results {
    pub fn new(results: Vec<SampleResult>) -> Self {
        let error = if results.is_empty() {
            0.0
        } else {
            results.iter().map(|r| r.error).sum::<f64>() / results.len() as f64
        };
        let classification = classify(&results);
        Self {
            results,
            error,
            classification,
        }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Lower error is better; NaN errors never win.
    pub fn is_better_than(&self, other: &Results) -> bool {
        matches!(self.error.partial_cmp(&other.error), Some(Ordering::Less))
    }
}

fn classify(results: &[SampleResult]) -> Option<ClassificationStats> {
    if results.is_empty() {
        return None;
    }
    let mut pairs = Vec::with_capacity(results.len());
    for r in results {
        let target = r.target.as_scalar()?;
        if target != 0.0 && target != 1.0 {
            return None;
        }
        pairs.push((r.output.as_scalar()? > 0.5, target == 1.0));
    }

    let count = |predicted: bool, actual: bool| {
        pairs.iter().filter(|&&p| p == (predicted, actual)).count() as f64
    };
    let (tp, fp, tn, fn_) = (count(true, true), count(true, false), count(false, false), count(false, true));
    let n = pairs.len() as f64;
    let ratio = |a: f64, b: f64| if b > 0.0 { a / b } else { 0.0 };
    let precision = ratio(tp, tp + fp);
    let recall = ratio(tp, tp + fn_);
    let positives = tp + fn_;

    Some(ClassificationStats {
        accuracy: (tp + tn) / n,
        precision,
        recall,
        f_measure: ratio(2.0 * precision * recall, precision + recall),
        majority_error: positives.min(n - positives) / n,
    })
}
