//! # Minibatch Training
//!
//! Training runs as a small state machine:
//!
//! ```text
//! InitTraining ─► InitRestart ─► InitEpoch ─► LearnEpoch
//!                    ▲  │           ▲  │          │
//!                    │  ▼           │  └──────────┘
//!                    │ Finished     │
//!                    └──────────────┘ (restart over)
//! ```
//!
//! Within an epoch the samples are split into minibatches. Every sample of a
//! batch runs forward and backward against the same weights, each into its
//! own [`WeightUpdates`] buffer; the buffers are summed in sample order at
//! the end of the batch and applied in one optimizer step. Results are
//! therefore identical with and without the rayon pool.
//!
//! The error recorded for an epoch is a forward-only evaluation of the weights
//! left by that epoch, so a retained model and its error always agree.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use lrnn_core::{Settings, SimpleInitializer};
use lrnn_network::{WeightRegistry, WeightUpdates};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::TrainError;
use crate::error_fn::{self, ErrorFcn};
use crate::evaluator::{learn_sample, Evaluator};
use crate::minibatch::BatchIterator;
use crate::model::NeuralModel;
use crate::optim::Sgd;
use crate::restart::{self, Progress, RestartingStrategy};
use crate::results::{Results, SampleResult};
use crate::sample::NeuralSample;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TrainingPhase {
    InitTraining,
    InitRestart,
    InitEpoch,
    LearnEpoch,
    Finished,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingReport {
    pub restarts: usize,
    pub epochs: usize,
    /// Epoch errors, one list per restart.
    pub epoch_errors: Vec<Vec<f64>>,
    pub best_error: Option<f64>,
    /// Ended by the stop signal rather than the restart strategy.
    pub stopped: bool,
}

pub struct MiniBatchTraining {
    settings: Settings,
    samples: Vec<NeuralSample>,
    error_fn: Box<dyn ErrorFcn>,
    evaluator: Evaluator,
    restart_strategy: Box<dyn RestartingStrategy>,
    optimizer: Sgd,
    initializer: SimpleInitializer,
    rng: StdRng,
    stop: Arc<AtomicBool>,
    phase: TrainingPhase,
    restart: usize,
    progress: Progress,
    history: Vec<Vec<f64>>,
    best: Option<NeuralModel>,
    best_results: Option<Results>,
}

impl MiniBatchTraining {
    pub fn new(settings: Settings, samples: Vec<NeuralSample>) -> Result<Self, TrainError> {
        settings.validate()?;
        if samples.is_empty() {
            return Err(TrainError::NoSamples);
        }
        Ok(Self {
            error_fn: error_fn::for_setting(settings.error_function),
            evaluator: Evaluator::new(&settings),
            restart_strategy: restart::for_settings(&settings),
            optimizer: Sgd::new(settings.learning_rate),
            initializer: SimpleInitializer::new(settings.initializer, settings.seed),
            rng: StdRng::seed_from_u64(settings.seed),
            stop: Arc::new(AtomicBool::new(false)),
            phase: TrainingPhase::InitTraining,
            restart: 0,
            progress: Progress::new(0),
            history: Vec::new(),
            best: None,
            best_results: None,
            settings,
            samples,
        })
    }

    /// Setting the flag ends training at the next epoch boundary.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    pub fn phase(&self) -> TrainingPhase {
        self.phase
    }

    pub fn progress(&self) -> &Progress {
        &self.progress
    }

    pub fn best_model(&self) -> Option<&NeuralModel> {
        self.best.as_ref()
    }

    fn stopped(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }

    /// Run one transition of the state machine.
    pub fn step(&mut self, weights: &mut WeightRegistry) -> Result<TrainingPhase, TrainError> {
        self.phase = match self.phase {
            TrainingPhase::InitTraining => {
                info!(
                    samples = self.samples.len(),
                    restarts = self.settings.max_restarts,
                    batch = self.settings.minibatch_size,
                    learnable = weights.learnable_ids().len(),
                    "training started"
                );
                TrainingPhase::InitRestart
            }
            TrainingPhase::InitRestart => {
                if self.restart >= self.settings.max_restarts || self.stopped() {
                    TrainingPhase::Finished
                } else {
                    weights.initialize(&mut self.initializer);
                    self.progress = Progress::new(self.restart);
                    debug!(restart = self.restart, "restart initialized");
                    TrainingPhase::InitEpoch
                }
            }
            TrainingPhase::InitEpoch => {
                if self.stopped() || !self.restart_strategy.continue_restart(&self.progress) {
                    info!(
                        restart = self.restart,
                        epochs = self.progress.epoch,
                        best_error = ?self.progress.best_error,
                        "restart finished"
                    );
                    self.history.push(self.progress.epoch_errors.clone());
                    self.restart += 1;
                    TrainingPhase::InitRestart
                } else {
                    if self.settings.minibatch_shuffle {
                        self.samples.shuffle(&mut self.rng);
                    }
                    TrainingPhase::LearnEpoch
                }
            }
            TrainingPhase::LearnEpoch => {
                let learned = self.learn_epoch(weights)?;
                let scored = self.evaluator.evaluate(&self.samples, weights)?;
                self.progress.record_epoch(scored.error);
                debug!(
                    restart = self.restart,
                    epoch = self.progress.epoch,
                    training_error = learned.error,
                    error = scored.error,
                    "epoch finished"
                );
                let improved = self
                    .best_results
                    .as_ref()
                    .map_or(true, |best| best.error.is_nan() || scored.is_better_than(best));
                if improved {
                    self.best = Some(NeuralModel::snapshot(weights, Some(scored.error)));
                    self.best_results = Some(scored);
                }
                TrainingPhase::InitEpoch
            }
            TrainingPhase::Finished => TrainingPhase::Finished,
        };
        Ok(self.phase)
    }

    /// Run to completion and leave the best weights in `weights`.
    pub fn train(&mut self, weights: &mut WeightRegistry) -> Result<TrainingReport, TrainError> {
        while self.step(weights)? != TrainingPhase::Finished {}
        if let Some(best) = &self.best {
            best.restore_into(weights)?;
        }
        let report = TrainingReport {
            restarts: self.history.len(),
            epochs: self.history.iter().map(Vec::len).sum(),
            epoch_errors: self.history.clone(),
            best_error: self.best.as_ref().and_then(|b| b.error),
            stopped: self.stopped(),
        };
        info!(
            restarts = report.restarts,
            epochs = report.epochs,
            best_error = ?report.best_error,
            "training finished"
        );
        Ok(report)
    }

    /// One pass over all samples; returns the results observed before each
    /// batch's update.
    pub fn learn_epoch(&mut self, weights: &mut WeightRegistry) -> Result<Results, TrainError> {
        let mut all = Vec::with_capacity(self.samples.len());
        for batch in BatchIterator::new(&self.samples, self.settings.minibatch_size) {
            let (results, updates) = learn_batch(
                batch,
                weights,
                self.error_fn.as_ref(),
                &self.settings,
            )?;
            self.optimizer.step(weights, &updates)?;
            all.extend(results);
        }
        Ok(Results::new(all))
    }
}

fn learn_batch(
    batch: &[NeuralSample],
    weights: &WeightRegistry,
    error_fn: &dyn ErrorFcn,
    settings: &Settings,
) -> Result<(Vec<SampleResult>, WeightUpdates), TrainError> {
    let mode = settings.iteration_mode;
    let per_sample = if settings.parallel {
        batch
            .par_iter()
            .map(|s| learn_sample(s, weights, error_fn, mode))
            .collect::<Result<Vec<_>, _>>()?
    } else {
        batch
            .iter()
            .map(|s| learn_sample(s, weights, error_fn, mode))
            .collect::<Result<Vec<_>, _>>()?
    };

    let mut merged = WeightUpdates::new(weights.len());
    let mut results = Vec::with_capacity(per_sample.len());
    for (result, updates) in per_sample {
        merged.merge(updates)?;
        results.push(result);
    }
    Ok((results, merged))
}
