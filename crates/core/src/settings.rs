//! # Settings
//!
//! One configuration object drives building, finalization, structural
//! reduction and training. Every field has a default, so a settings file only
//! needs to name what it changes:
//!
//! ```rust
//! use lrnn_core::settings::{IterationMode, Settings};
//!
//! let settings = Settings::from_json_str(r#"{ "minibatch_size": 4, "iteration_mode": "parent_counting" }"#).unwrap();
//! assert_eq!(settings.minibatch_size, 4);
//! assert_eq!(settings.iteration_mode, IterationMode::ParentCounting);
//! assert!(settings.validate().is_ok());
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ConfigError;
use crate::init::Distribution;

/// Order in which a finalized network is traversed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IterationMode {
    /// Forward in topological order, backward in reverse topological order.
    Topologic,
    /// Backward traversal releases a neuron once every parent edge has
    /// delivered its gradient. Needs the child→parents output mapping.
    ParentCounting,
}

/// Per-sample error function selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorFunction {
    /// `½ Σ (output − target)²`
    SquaredDiff,
    /// `Σ |output − target|`
    AbsDiff,
}

/// When a training restart ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RestartPolicy {
    /// Run exactly `max_epochs` epochs.
    Static,
    /// Stop early once the epoch error has not improved for `patience` epochs.
    NoImprovement { patience: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Networks with fewer neurons than this use a linear state store.
    pub lin2bst: usize,
    /// Networks with at least this many neurons use a hash state store;
    /// sizes in between use a tree store.
    pub bst2hashmap: usize,

    /// Prune duplicate inputs of unweighted, input-symmetric neurons.
    pub remove_identical_unweighted_inputs: bool,
    /// Merge duplicate inputs of weighted neurons whose weights are all fixed.
    pub merge_identical_weighted_inputs: bool,

    pub iteration_mode: IterationMode,

    pub minibatch_size: usize,
    /// Shuffle the sample list at the start of every epoch.
    pub minibatch_shuffle: bool,
    /// Seed for shuffling and weight initialization.
    pub seed: u64,

    pub max_restarts: usize,
    pub max_epochs: usize,
    pub restart_policy: RestartPolicy,

    pub error_function: ErrorFunction,
    pub learning_rate: f64,
    pub initializer: Distribution,

    /// Evaluate the samples of a minibatch on the rayon pool.
    pub parallel: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            lin2bst: 100,
            bst2hashmap: 10_000,
            remove_identical_unweighted_inputs: false,
            merge_identical_weighted_inputs: false,
            iteration_mode: IterationMode::Topologic,
            minibatch_size: 16,
            minibatch_shuffle: true,
            seed: 0,
            max_restarts: 1,
            max_epochs: 100,
            restart_policy: RestartPolicy::Static,
            error_function: ErrorFunction::SquaredDiff,
            learning_rate: 0.1,
            initializer: Distribution::default(),
            parallel: true,
        }
    }
}

impl Settings {
    /// Parse settings from a JSON document. Missing fields take defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let settings: Settings = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Read settings from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let settings = Self::from_json_str(&text)?;
        debug!(path = %path.display(), "loaded settings");
        Ok(settings)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.lin2bst > self.bst2hashmap {
            return Err(ConfigError::Invalid {
                field: "lin2bst",
                reason: format!(
                    "must not exceed bst2hashmap ({} > {})",
                    self.lin2bst, self.bst2hashmap
                ),
            });
        }
        if self.minibatch_size == 0 {
            return Err(ConfigError::Invalid {
                field: "minibatch_size",
                reason: "must be positive".to_string(),
            });
        }
        if self.max_restarts == 0 {
            return Err(ConfigError::Invalid {
                field: "max_restarts",
                reason: "must be positive".to_string(),
            });
        }
        if self.max_epochs == 0 {
            return Err(ConfigError::Invalid {
                field: "max_epochs",
                reason: "must be positive".to_string(),
            });
        }
        if let RestartPolicy::NoImprovement { patience: 0 } = self.restart_policy {
            return Err(ConfigError::Invalid {
                field: "restart_policy",
                reason: "no-improvement patience must be positive".to_string(),
            });
        }
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(ConfigError::Invalid {
                field: "learning_rate",
                reason: format!("must be a positive number, got {}", self.learning_rate),
            });
        }
        match self.initializer {
            Distribution::Uniform { low, high } if low > high => Err(ConfigError::Invalid {
                field: "initializer",
                reason: format!("uniform bounds reversed ({low} > {high})"),
            }),
            Distribution::Normal { std, .. } if std < 0.0 => Err(ConfigError::Invalid {
                field: "initializer",
                reason: format!("negative standard deviation {std}"),
            }),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(Settings::default().validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let settings = Settings::from_json_str(
            r#"{
                "lin2bst": 5,
                "bst2hashmap": 50,
                "restart_policy": { "kind": "no_improvement", "patience": 3 },
                "initializer": { "kind": "constant", "value": 0.5 }
            }"#,
        )
        .unwrap();
        assert_eq!(settings.lin2bst, 5);
        assert_eq!(settings.bst2hashmap, 50);
        assert_eq!(settings.restart_policy, RestartPolicy::NoImprovement { patience: 3 });
        assert_eq!(settings.initializer, Distribution::Constant { value: 0.5 });
        assert_eq!(settings.minibatch_size, Settings::default().minibatch_size);
    }

    #[test]
    fn test_invalid_settings_rejected() {
        let err = Settings::from_json_str(r#"{ "minibatch_size": 0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "minibatch_size", .. }));

        let err = Settings::from_json_str(r#"{ "lin2bst": 10, "bst2hashmap": 5 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "lin2bst", .. }));

        let err = Settings::from_json_str(
            r#"{ "restart_policy": { "kind": "no_improvement", "patience": 0 } }"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field: "restart_policy", .. }));

        assert!(matches!(
            Settings::from_json_str("{ not json").unwrap_err(),
            ConfigError::Parse(_)
        ));
    }

    #[test]
    fn test_json_round_trip() {
        let settings = Settings {
            seed: 42,
            parallel: false,
            ..Settings::default()
        };
        let json = settings.to_json().unwrap();
        assert_eq!(Settings::from_json_str(&json).unwrap(), settings);
    }
}
