//! # Value Initialization
//!
//! Learnable weights are (re)filled from a configured distribution at the
//! start of every training restart. The generator is seeded, so two runs
//! with the same settings start from the same weights.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Distribution that initial weight elements are drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Distribution {
    Uniform { low: f64, high: f64 },
    Normal { mean: f64, std: f64 },
    Constant { value: f64 },
}

impl Default for Distribution {
    fn default() -> Self {
        Distribution::Uniform {
            low: -1.0,
            high: 1.0,
        }
    }
}

/// Something that can fill a value in place.
pub trait ValueInitializer {
    fn init_value(&mut self, value: &mut Value);
}

/// Draws every element independently from one distribution.
#[derive(Debug, Clone)]
pub struct SimpleInitializer {
    distribution: Distribution,
    rng: StdRng,
}

impl SimpleInitializer {
    pub fn new(distribution: Distribution, seed: u64) -> Self {
        Self {
            distribution,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Draw one element.
    pub fn sample(&mut self) -> f64 {
        match self.distribution {
            Distribution::Uniform { low, high } => {
                if low < high {
                    self.rng.gen_range(low..high)
                } else {
                    low
                }
            }
            Distribution::Normal { mean, std } => {
                // Box-Muller transform
                let u1: f64 = self.rng.gen::<f64>().max(1e-12);
                let u2: f64 = self.rng.gen();
                let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
                mean + std * z
            }
            Distribution::Constant { value } => value,
        }
    }
}

impl ValueInitializer for SimpleInitializer {
    fn init_value(&mut self, value: &mut Value) {
        value.fill_with(|| self.sample());
    }
}
