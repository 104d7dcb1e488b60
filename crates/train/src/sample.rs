//! Training samples: a finalized network paired with its target.

use std::sync::Arc;

use lrnn_core::Value;
use lrnn_network::DetailedNetwork;

#[derive(Debug, Clone)]
pub struct NeuralSample {
    pub id: String,
    /// Networks are immutable once finalized and shared between epochs and
    /// worker threads.
    pub network: Arc<DetailedNetwork>,
    pub target: Value,
    /// Multiplier on this sample's gradient.
    pub importance: f64,
}

impl NeuralSample {
    pub fn new(id: impl Into<String>, network: Arc<DetailedNetwork>, target: Value) -> Self {
        Self {
            id: id.into(),
            network,
            target,
            importance: 1.0,
        }
    }

    pub fn with_importance(mut self, importance: f64) -> Self {
        self.importance = importance;
        self
    }
}
