//! Training errors.

use lrnn_core::{AlgebraError, ConfigError};
use lrnn_network::NetworkError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrainError {
    #[error(transparent)]
    Network(#[from] NetworkError),

    #[error(transparent)]
    Algebra(#[from] AlgebraError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("No samples to train on")]
    NoSamples,

    /// A sample's network has a number of query outputs other than one.
    #[error("Sample {sample} has {outputs} outputs, expected 1")]
    OutputCount { sample: String, outputs: usize },

    #[error("Failed to write model: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize model: {0}")]
    Serialize(#[from] serde_json::Error),
}
