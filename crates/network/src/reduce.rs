//! # Parallel Edge Reduction
//!
//! Optional structural simplification of a finalized network. A neuron may
//! receive the same input more than once (two groundings sharing a body, or
//! the same aggregation reached twice). For input-symmetric neurons:
//!
//! - unweighted neurons keep only the first of each identical input;
//! - weighted neurons fold a group of parallel edges into one edge carrying a
//!   fresh fixed weight whose value is the sum of the group's weights.
//!
//! A group is merged only if none of its weights is learnable or shared.
//! Otherwise the group is left as it is and the skip is logged.

use indexmap::IndexMap;
use lrnn_core::{IterationMode, Settings};
use tracing::debug;

use crate::error::NetworkError;
use crate::network::DetailedNetwork;
use crate::weight::{WeightId, WeightRegistry};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReductionReport {
    pub pruned_edges: usize,
    pub merged_groups: usize,
    /// Weighted groups left alone because a weight is learnable or shared.
    pub skipped_groups: usize,
}

impl ReductionReport {
    pub fn changed(&self) -> bool {
        self.pruned_edges > 0 || self.merged_groups > 0
    }
}

pub struct ParallelEdgeMerger<'a> {
    settings: &'a Settings,
}

impl<'a> ParallelEdgeMerger<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        Self { settings }
    }

    pub fn is_enabled(&self) -> bool {
        self.settings.remove_identical_unweighted_inputs || self.settings.merge_identical_weighted_inputs
    }

    /// Reduce the network in place, visiting nodes top-down from the roots.
    pub fn reduce(
        &self,
        network: &mut DetailedNetwork,
        weights: &mut WeightRegistry,
    ) -> Result<ReductionReport, NetworkError> {
        let mut report = ReductionReport::default();
        if !self.is_enabled() {
            return Ok(report);
        }

        for pos in (0..network.nodes.len()).rev() {
            let node = &network.nodes[pos];
            if !node.kind.is_input_symmetric() || node.inputs.len() < 2 {
                continue;
            }
            if node.kind.is_weighted() {
                if self.settings.merge_identical_weighted_inputs {
                    self.merge_weighted(network, weights, pos, &mut report)?;
                }
            } else if self.settings.remove_identical_unweighted_inputs {
                let node = &mut network.nodes[pos];
                let before = node.inputs.len();
                let mut seen = Vec::with_capacity(before);
                node.inputs.retain(|input| {
                    if seen.contains(input) {
                        false
                    } else {
                        seen.push(*input);
                        true
                    }
                });
                report.pruned_edges += before - node.inputs.len();
            }
        }

        if report.changed() && self.settings.iteration_mode != IterationMode::Topologic {
            network.compute_output_mapping();
        }
        debug!(
            network = %network.id,
            pruned = report.pruned_edges,
            merged = report.merged_groups,
            skipped = report.skipped_groups,
            "reduced parallel edges"
        );
        Ok(report)
    }

    fn merge_weighted(
        &self,
        network: &mut DetailedNetwork,
        weights: &mut WeightRegistry,
        pos: usize,
        report: &mut ReductionReport,
    ) -> Result<(), NetworkError> {
        let node = &network.nodes[pos];
        let mut groups: IndexMap<usize, Vec<WeightId>> = IndexMap::new();
        for (&input, &weight) in node.inputs.iter().zip(node.weights.iter()) {
            groups.entry(input).or_default().push(weight);
        }
        if groups.len() == node.inputs.len() {
            return Ok(());
        }

        let mut inputs = Vec::with_capacity(groups.len());
        let mut merged_weights = Vec::with_capacity(groups.len());
        for (input, group) in groups {
            if group.len() == 1 {
                inputs.push(input);
                merged_weights.push(group[0]);
                continue;
            }
            let mergeable = group
                .iter()
                .map(|&w| weights.get(w).map(|w| !w.is_learnable() && !w.shared))
                .collect::<Result<Vec<_>, _>>()?
                .into_iter()
                .all(|ok| ok);
            if !mergeable {
                debug!(
                    network = %network.id,
                    neuron = %network.nodes[pos].label,
                    edges = group.len(),
                    "unsupported merge: group holds a learnable or shared weight"
                );
                report.skipped_groups += 1;
                for w in group {
                    inputs.push(input);
                    merged_weights.push(w);
                }
                continue;
            }

            let mut name = String::from("MERGED:");
            let mut sum = weights.value(group[0])?.clone();
            for (i, &w) in group.iter().enumerate() {
                let weight = weights.get(w)?;
                name.push('_');
                name.push_str(&weight.display_name());
                if i > 0 {
                    sum.increment_by(&weight.value)?;
                }
            }
            let merged = weights.synthetic(name, sum);
            inputs.push(input);
            merged_weights.push(merged);
            report.merged_groups += 1;
        }

        let node = &mut network.nodes[pos];
        node.inputs = inputs;
        node.weights = merged_weights;
        Ok(())
    }
}
