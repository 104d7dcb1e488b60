//! # Network Finalization
//!
//! Collects the neurons reachable from the query literals, orders them and
//! freezes them into a [`DetailedNetwork`].
//!
//! ## Ordering
//!
//! The reachable subgraph goes into a `petgraph` graph with an edge from each
//! input to its consumer; `toposort` yields a valid order or the cycle. Nodes
//! are then grouped by depth (facts first, query atoms last), ties kept in
//! toposort order.
//!
//! ## Shared flags
//!
//! A neuron reachable from a shared neuron is itself shared: its value may be
//! read through a network other than this one.

use std::collections::HashMap;

use lrnn_core::{IterationMode, Settings};
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use tracing::debug;

use crate::error::NetworkError;
use crate::logic::Literal;
use crate::maps::NeuronMaps;
use crate::network::{DetailedNetwork, NetworkNode};
use crate::neuron::NeuronId;
use crate::states::StorageStrategy;
use crate::weight::WeightId;

pub struct NetworkFinalizer<'a> {
    settings: &'a Settings,
}

impl<'a> NetworkFinalizer<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        Self { settings }
    }

    pub fn finalize(
        &self,
        maps: &NeuronMaps,
        id: impl Into<String>,
        queries: &[Literal],
    ) -> Result<DetailedNetwork, NetworkError> {
        let roots = queries
            .iter()
            .map(|q| maps.resolve(q).ok_or_else(|| NetworkError::UnknownQuery(q.to_string())))
            .collect::<Result<Vec<_>, _>>()?;

        // Reachable neurons with their effective inputs, in discovery order.
        let mut graph: DiGraph<NeuronId, ()> = DiGraph::new();
        let mut index: HashMap<NeuronId, NodeIndex> = HashMap::new();
        let mut wiring: HashMap<NeuronId, (Vec<NeuronId>, Vec<WeightId>)> = HashMap::new();
        let mut stack = roots.clone();
        while let Some(neuron) = stack.pop() {
            if index.contains_key(&neuron) {
                continue;
            }
            index.insert(neuron, graph.add_node(neuron));
            let (inputs, weights) = maps.effective_inputs(neuron)?;
            stack.extend(inputs.iter().copied());
            wiring.insert(neuron, (inputs, weights));
        }
        for (&neuron, (inputs, _)) in &wiring {
            for input in inputs {
                graph.add_edge(index[input], index[&neuron], ());
            }
        }

        let order = toposort(&graph, None).map_err(|cycle| {
            let neuron = graph[cycle.node_id()];
            NetworkError::Cyclic {
                neuron: maps
                    .neuron(neuron)
                    .map(|n| n.label.clone())
                    .unwrap_or_else(|_| neuron.to_string()),
            }
        })?;

        let mut depth: HashMap<NeuronId, usize> = HashMap::with_capacity(order.len());
        for &ix in &order {
            let neuron = graph[ix];
            let d = wiring[&neuron]
                .0
                .iter()
                .map(|input| depth[input] + 1)
                .max()
                .unwrap_or(0);
            depth.insert(neuron, d);
        }
        let mut ordered: Vec<NeuronId> = order.iter().map(|&ix| graph[ix]).collect();
        ordered.sort_by_key(|n| depth[n]);

        let position: HashMap<NeuronId, usize> =
            ordered.iter().enumerate().map(|(pos, &n)| (n, pos)).collect();

        let mut nodes = Vec::with_capacity(ordered.len());
        for &neuron_id in &ordered {
            let neuron = maps.neuron(neuron_id)?;
            let (inputs, weights) = wiring
                .remove(&neuron_id)
                .unwrap_or_default();
            nodes.push(NetworkNode {
                neuron: neuron_id,
                kind: neuron.kind,
                label: neuron.label.clone(),
                inputs: inputs.iter().map(|i| position[i]).collect(),
                weights,
                shared: neuron.shared,
                depth: depth[&neuron_id],
            });
        }

        let shared_count = flag_shared(&mut nodes);
        let storage = (shared_count > 0).then(|| StorageStrategy::select(nodes.len(), self.settings));

        let mut network = DetailedNetwork {
            id: id.into(),
            roots: roots.iter().map(|r| position[r]).collect(),
            nodes,
            shared_count,
            storage,
            output_mapping: None,
        };
        if self.settings.iteration_mode != IterationMode::Topologic {
            network.compute_output_mapping();
        }

        debug!(
            network = %network.id,
            neurons = network.len(),
            edges = network.edge_count(),
            storage = ?network.storage,
            "network ordered"
        );
        Ok(network)
    }
}

/// Propagate shared flags from consumers down to their inputs. Returns the
/// number of shared nodes.
fn flag_shared(nodes: &mut [NetworkNode]) -> usize {
    for pos in (0..nodes.len()).rev() {
        if nodes[pos].shared {
            let inputs = nodes[pos].inputs.clone();
            for input in inputs {
                nodes[input].shared = true;
            }
        }
    }
    nodes.iter().filter(|n| n.shared).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::Activation;
    use crate::neuron::NeuronKind;

    fn atom() -> NeuronKind {
        NeuronKind::Atom {
            activation: Activation::Identity,
        }
    }

    #[test]
    fn test_depth_layering() {
        let mut maps = NeuronMaps::new();
        maps.begin_build();
        let top = maps.create_atom(&Literal::atom("top"), atom());
        let mid = maps.create_atom(&Literal::atom("mid"), atom());
        let leaf = maps.create_fact(&Literal::atom("leaf"), WeightId(0));
        maps.append_input(top, mid, Some(WeightId(0))).unwrap();
        maps.append_input(top, leaf, Some(WeightId(0))).unwrap();
        maps.append_input(mid, leaf, Some(WeightId(0))).unwrap();

        let settings = Settings::default();
        let net = NetworkFinalizer::new(&settings)
            .finalize(&maps, "n", &[Literal::atom("top")])
            .unwrap();

        let labels: Vec<&str> = net.nodes().iter().map(|n| n.label.as_str()).collect();
        assert_eq!(labels, vec!["leaf", "mid", "top"]);
        assert_eq!(net.roots(), &[2]);
        assert_eq!(net.node(2).unwrap().inputs, vec![1, 0]);
        assert_eq!(net.storage(), None);
        assert!(net.output_mapping().is_none());
    }

    #[test]
    fn test_cycle_is_reported() {
        let mut maps = NeuronMaps::new();
        let a = maps.create_atom(&Literal::atom("a"), atom());
        let b = maps.create_atom(&Literal::atom("b"), atom());
        maps.append_input(a, b, Some(WeightId(0))).unwrap();
        maps.append_input(b, a, Some(WeightId(0))).unwrap();

        let settings = Settings::default();
        let err = NetworkFinalizer::new(&settings)
            .finalize(&maps, "n", &[Literal::atom("a")])
            .unwrap_err();
        assert!(matches!(err, NetworkError::Cyclic { .. }));
    }

    #[test]
    fn test_unknown_query() {
        let maps = NeuronMaps::new();
        let settings = Settings::default();
        let err = NetworkFinalizer::new(&settings)
            .finalize(&maps, "n", &[Literal::atom("nope")])
            .unwrap_err();
        assert_eq!(err, NetworkError::UnknownQuery("nope".into()));
    }

    #[test]
    fn test_shared_flag_reaches_descendants_and_parent_counts() {
        let mut maps = NeuronMaps::new();
        maps.begin_build();
        let leaf = maps.create_fact(&Literal::atom("leaf"), WeightId(0));
        let mid = maps.create_atom(&Literal::atom("mid"), atom());
        maps.append_input(mid, leaf, Some(WeightId(0))).unwrap();

        maps.begin_build();
        let top = maps.create_atom(&Literal::atom("top"), atom());
        maps.append_input(top, mid, Some(WeightId(0))).unwrap();
        maps.append_input(top, leaf, Some(WeightId(0))).unwrap();
        maps.touch(mid).unwrap();

        let settings = Settings {
            iteration_mode: IterationMode::ParentCounting,
            lin2bst: 2,
            ..Settings::default()
        };
        let net = NetworkFinalizer::new(&settings)
            .finalize(&maps, "n", &[Literal::atom("top")])
            .unwrap();

        assert_eq!(net.shared_count(), 2);
        assert!(!net.node(2).unwrap().shared);
        assert_eq!(net.storage(), Some(StorageStrategy::Tree));
        assert_eq!(net.parent_count(0), Some(2));
        assert_eq!(net.parent_count(2), Some(0));
        assert_eq!(net.new_states().get(0, leaf).unwrap().remaining_parents, 2);
    }
}
