//! Serializable snapshot of trained weights.

use std::path::Path;

use lrnn_network::{Weight, WeightRegistry};
use serde::{Deserialize, Serialize};

use crate::error::TrainError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NeuralModel {
    pub weights: Vec<Weight>,
    /// Mean training error when the snapshot was taken.
    pub error: Option<f64>,
}

impl NeuralModel {
    pub fn snapshot(registry: &WeightRegistry, error: Option<f64>) -> Self {
        Self {
            weights: registry.iter().cloned().collect(),
            error,
        }
    }

    /// Write the stored values back into `registry`.
    pub fn restore_into(&self, registry: &mut WeightRegistry) -> Result<(), TrainError> {
        for weight in &self.weights {
            registry.set_value(weight.id, weight.value.clone())?;
        }
        Ok(())
    }

    pub fn to_json(&self) -> Result<String, TrainError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, TrainError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), TrainError> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lrnn_core::Value;

    #[test]
    fn test_snapshot_restore_and_json() {
        let mut registry = WeightRegistry::new();
        let w = registry.learnable("w", Value::vector(vec![0.1, 0.2]));
        let model = NeuralModel::snapshot(&registry, Some(0.3));

        registry.set_value(w, Value::vector(vec![9.0, 9.0])).unwrap();
        model.restore_into(&mut registry).unwrap();
        assert_eq!(registry.value(w).unwrap(), &Value::vector(vec![0.1, 0.2]));

        let parsed = NeuralModel::from_json(&model.to_json().unwrap()).unwrap();
        assert_eq!(parsed, model);
    }
}
