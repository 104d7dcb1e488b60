//! # lrnn-train
//!
//! Trains the weights shared by a set of per-example networks.
//!
//! ## Key Concepts
//!
//! - **Samples**: a finalized network, a target value and an importance
//! - **Minibatches**: samples of one batch are evaluated independently
//!   (optionally in parallel) and their gradients summed before the update
//! - **Restarts**: training may restart from fresh weights; the best model
//!   seen across all restarts is kept

pub mod error;
pub mod error_fn;
pub mod evaluator;
pub mod minibatch;
pub mod model;
pub mod optim;
pub mod restart;
pub mod results;
pub mod sample;
pub mod strategy;

pub use error::TrainError;
pub use error_fn::{AbsDiff, ErrorFcn, SquaredDiff};
pub use evaluator::Evaluator;
pub use minibatch::BatchIterator;
pub use model::NeuralModel;
pub use optim::Sgd;
pub use restart::{NoImprovementStrategy, Progress, RestartingStrategy, StaticRestartingStrategy};
pub use results::{ClassificationStats, ResultFactory, Results, SampleResult};
pub use sample::NeuralSample;
pub use strategy::{MiniBatchTraining, TrainingPhase, TrainingReport};
