//! # Evaluation
//!
//! Forward-only runs over a sample list, and the per-sample learning step
//! shared with [`MiniBatchTraining`](crate::strategy::MiniBatchTraining).

use lrnn_core::{IterationMode, Settings};
use lrnn_network::{backward, forward, WeightRegistry, WeightUpdates};
use rayon::prelude::*;
use tracing::debug;

use crate::error::TrainError;
use crate::error_fn::{self, ErrorFcn};
use crate::results::{ResultFactory, Results, SampleResult};
use crate::sample::NeuralSample;

pub struct Evaluator {
    error_fn: Box<dyn ErrorFcn>,
    parallel: bool,
}

impl Evaluator {
    pub fn new(settings: &Settings) -> Self {
        Self {
            error_fn: error_fn::for_setting(settings.error_function),
            parallel: settings.parallel,
        }
    }

    pub fn evaluate_sample(&self, sample: &NeuralSample, weights: &WeightRegistry) -> Result<SampleResult, TrainError> {
        let mut states = sample.network.new_states();
        let outputs = forward(&sample.network, weights, &mut states)?;
        let output = single_output(sample, outputs)?;
        ResultFactory::new(self.error_fn.as_ref()).create(&sample.id, output, &sample.target)
    }

    pub fn evaluate(&self, samples: &[NeuralSample], weights: &WeightRegistry) -> Result<Results, TrainError> {
        let results = if self.parallel {
            samples
                .par_iter()
                .map(|s| self.evaluate_sample(s, weights))
                .collect::<Result<Vec<_>, _>>()?
        } else {
            samples
                .iter()
                .map(|s| self.evaluate_sample(s, weights))
                .collect::<Result<Vec<_>, _>>()?
        };
        let results = Results::new(results);
        debug!(samples = results.len(), error = results.error, "evaluated");
        Ok(results)
    }
}

/// Forward and backward pass for one sample. Weight gradients go into a
/// fresh buffer owned by the caller; `weights` is only read.
pub fn learn_sample(
    sample: &NeuralSample,
    weights: &WeightRegistry,
    error_fn: &dyn ErrorFcn,
    mode: IterationMode,
) -> Result<(SampleResult, WeightUpdates), TrainError> {
    let mut states = sample.network.new_states();
    let outputs = forward(&sample.network, weights, &mut states)?;
    let output = single_output(sample, outputs)?;

    let gradient = error_fn
        .differentiate(&output, &sample.target)?
        .scale(sample.importance);
    let mut updates = WeightUpdates::new(weights.len());
    backward(
        &sample.network,
        weights,
        &mut states,
        &[gradient],
        &mut updates,
        mode,
    )?;

    let result = ResultFactory::new(error_fn).create(&sample.id, output, &sample.target)?;
    Ok((result, updates))
}

fn single_output(sample: &NeuralSample, outputs: Vec<lrnn_core::Value>) -> Result<lrnn_core::Value, TrainError> {
    let count = outputs.len();
    let mut outputs = outputs.into_iter();
    match (outputs.next(), count) {
        (Some(output), 1) => Ok(output),
        _ => Err(TrainError::OutputCount {
            sample: sample.id.clone(),
            outputs: count,
        }),
    }
}
