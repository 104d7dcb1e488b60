//! # Weights
//!
//! Weights are owned by a [`WeightRegistry`] and referenced everywhere else by
//! [`WeightId`]. A named weight is created once; constructing it again from a
//! second rule returns the same id and flags the weight as shared. Anonymous
//! weights are never deduplicated.
//!
//! During training every worker accumulates gradients into its own
//! [`WeightUpdates`] buffer. Buffers are summed at the minibatch barrier and
//! only then applied to the registry.

use std::collections::HashMap;
use std::fmt;

use lrnn_core::{AlgebraError, Value, ValueInitializer};
use serde::{Deserialize, Serialize};

use crate::error::NetworkError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WeightId(pub usize);

impl fmt::Display for WeightId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "w{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Weight {
    pub id: WeightId,
    pub name: Option<String>,
    pub value: Value,
    /// Fixed weights are never updated by training.
    pub fixed: bool,
    /// Referenced by more than one lifted rule.
    pub shared: bool,
}

impl Weight {
    pub fn is_learnable(&self) -> bool {
        !self.fixed
    }

    /// The name, or `w<id>` for anonymous weights.
    pub fn display_name(&self) -> String {
        self.name.clone().unwrap_or_else(|| self.id.to_string())
    }
}

#[derive(Debug, Clone, Default)]
pub struct WeightRegistry {
    weights: Vec<Weight>,
    by_name: HashMap<String, WeightId>,
}

impl WeightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a weight, or return the existing one with the same name.
    ///
    /// On reuse the stored value and fixed flag are kept and the weight is
    /// marked shared.
    pub fn construct(&mut self, name: Option<&str>, value: Value, fixed: bool) -> WeightId {
        if let Some(name) = name {
            if let Some(&id) = self.by_name.get(name) {
                self.weights[id.0].shared = true;
                return id;
            }
        }
        let id = self.push(name.map(str::to_string), value, fixed);
        if let Some(name) = name {
            self.by_name.insert(name.to_string(), id);
        }
        id
    }

    /// Named learnable weight.
    pub fn learnable(&mut self, name: &str, value: Value) -> WeightId {
        self.construct(Some(name), value, false)
    }

    /// Anonymous fixed weight.
    pub fn fixed(&mut self, value: Value) -> WeightId {
        self.construct(None, value, true)
    }

    /// Anonymous fixed scalar 1, used for body literals without their own weight.
    pub fn unit(&mut self) -> WeightId {
        self.fixed(Value::one())
    }

    /// Fixed weight produced by the parallel edge merger. Synthetic names do
    /// not take part in name deduplication.
    pub(crate) fn synthetic(&mut self, name: String, value: Value) -> WeightId {
        self.push(Some(name), value, true)
    }

    fn push(&mut self, name: Option<String>, value: Value, fixed: bool) -> WeightId {
        let id = WeightId(self.weights.len());
        self.weights.push(Weight {
            id,
            name,
            value,
            fixed,
            shared: false,
        });
        id
    }

    pub fn get(&self, id: WeightId) -> Result<&Weight, NetworkError> {
        self.weights.get(id.0).ok_or(NetworkError::UnknownWeight(id))
    }

    pub fn value(&self, id: WeightId) -> Result<&Value, NetworkError> {
        self.get(id).map(|w| &w.value)
    }

    pub fn by_name(&self, name: &str) -> Option<&Weight> {
        self.by_name.get(name).map(|id| &self.weights[id.0])
    }

    pub fn is_learnable(&self, id: WeightId) -> bool {
        self.weights.get(id.0).is_some_and(Weight::is_learnable)
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Weight> {
        self.weights.iter()
    }

    pub fn learnable_ids(&self) -> Vec<WeightId> {
        self.weights
            .iter()
            .filter(|w| w.is_learnable())
            .map(|w| w.id)
            .collect()
    }

    /// Re-initialize every learnable weight in place.
    pub fn initialize(&mut self, init: &mut dyn ValueInitializer) {
        for weight in self.weights.iter_mut().filter(|w| w.is_learnable()) {
            init.init_value(&mut weight.value);
        }
    }

    /// Overwrite a weight's value. Shapes must agree.
    pub fn set_value(&mut self, id: WeightId, value: Value) -> Result<(), NetworkError> {
        let weight = self.weights.get_mut(id.0).ok_or(NetworkError::UnknownWeight(id))?;
        if weight.value.shape() != value.shape() {
            return Err(AlgebraError::ShapeMismatch {
                op: "set_value",
                lhs: weight.value.shape(),
                rhs: value.shape(),
            }
            .into());
        }
        weight.value = value;
        Ok(())
    }

    /// Values of all weights, indexed by id.
    pub fn snapshot(&self) -> Vec<Value> {
        self.weights.iter().map(|w| w.value.clone()).collect()
    }

    /// Restore values taken by [`snapshot`](Self::snapshot).
    pub fn restore(&mut self, values: &[Value]) -> Result<(), NetworkError> {
        for (i, value) in values.iter().enumerate() {
            self.set_value(WeightId(i), value.clone())?;
        }
        Ok(())
    }
}

/// Gradient accumulator for one worker, indexed by weight id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeightUpdates {
    slots: Vec<Option<Value>>,
}

impl WeightUpdates {
    pub fn new(weight_count: usize) -> Self {
        Self {
            slots: vec![None; weight_count],
        }
    }

    /// Add `gradient` to the slot of `id`, growing the buffer if needed.
    pub fn accumulate(&mut self, id: WeightId, gradient: &Value) -> Result<(), AlgebraError> {
        if id.0 >= self.slots.len() {
            self.slots.resize(id.0 + 1, None);
        }
        match &mut self.slots[id.0] {
            Some(acc) => acc.increment_by(gradient),
            slot @ None => {
                *slot = Some(gradient.clone());
                Ok(())
            }
        }
    }

    /// Sum another worker's buffer into this one.
    pub fn merge(&mut self, other: WeightUpdates) -> Result<(), AlgebraError> {
        for (i, slot) in other.slots.into_iter().enumerate() {
            if let Some(gradient) = slot {
                self.accumulate(WeightId(i), &gradient)?;
            }
        }
        Ok(())
    }

    pub fn get(&self, id: WeightId) -> Option<&Value> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    /// Non-empty slots in id order.
    pub fn iter(&self) -> impl Iterator<Item = (WeightId, &Value)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|v| (WeightId(i), v)))
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|s| *s = None);
    }
}
