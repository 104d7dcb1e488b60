//! # Optimization
//!
//! Applies summed minibatch gradients to the learnable weights.
//!
//! ```rust
//! use lrnn_core::Value;
//! use lrnn_network::{WeightRegistry, WeightUpdates};
//! use lrnn_train::optim::Sgd;
//!
//! let mut weights = WeightRegistry::new();
//! let w = weights.learnable("w", Value::scalar(1.0));
//! let mut updates = WeightUpdates::new(weights.len());
//! updates.accumulate(w, &Value::scalar(0.5)).unwrap();
//!
//! Sgd::new(0.1).step(&mut weights, &updates).unwrap();
//! assert!((weights.value(w).unwrap().as_scalar().unwrap() - 0.95).abs() < 1e-12);
//! ```

use lrnn_network::{WeightRegistry, WeightUpdates};

use crate::error::TrainError;

/// Stochastic gradient descent: `θ = θ − lr · ∇E`
#[derive(Debug, Clone, Copy)]
pub struct Sgd {
    pub learning_rate: f64,
}

impl Sgd {
    pub fn new(learning_rate: f64) -> Self {
        Self { learning_rate }
    }

    /// Update every learnable weight with a gradient in `updates`. Gradients
    /// for fixed weights are ignored.
    pub fn step(&self, weights: &mut WeightRegistry, updates: &WeightUpdates) -> Result<usize, TrainError> {
        let mut updated = 0;
        for (id, gradient) in updates.iter() {
            if !weights.is_learnable(id) {
                continue;
            }
            let next = weights.value(id)?.subtract(&gradient.scale(self.learning_rate))?;
            weights.set_value(id, next)?;
            updated += 1;
        }
        Ok(updated)
    }
}
