//! # Network Builder
//!
//! Turns grounded logic into neurons inside a [`LogicScope`]. Building one
//! example's network takes four calls:
//!
//! 1. [`load_neurons_from_facts`](NeuralNetBuilder::load_neurons_from_facts)
//! 2. [`load_neurons_from_rules`](NeuralNetBuilder::load_neurons_from_rules) once per head literal
//! 3. [`connect_all_neurons`](NeuralNetBuilder::connect_all_neurons)
//! 4. [`finalize_stored_network`](NeuralNetBuilder::finalize_stored_network)
//!
//! ## Key Concepts
//!
//! - Neurons are reused across examples through the scope's lookup tables.
//! - A neuron reused from an earlier build is flagged *shared*.
//! - Inputs added to an earlier build's neuron go into an input overlay, so
//!   finalized networks never see their structure change.
//!
//! ```
//! use indexmap::IndexSet;
//! use lrnn_core::{Settings, Value};
//! use lrnn_network::builder::NeuralNetBuilder;
//! use lrnn_network::functions::{Activation, Aggregation};
//! use lrnn_network::logic::{BodyAtom, GroundFacts, GroundRule, LiftedRule, Literal, RuleGroundings, ValuedFact};
//! use lrnn_network::maps::LogicScope;
//!
//! let settings = Settings::default();
//! let builder = NeuralNetBuilder::new(&settings);
//! let mut scope = LogicScope::new();
//! scope.maps.begin_build();
//!
//! let mut facts = GroundFacts::new();
//! let p_a = Literal::new("p", ["a"]);
//! let w = scope.weights.fixed(Value::scalar(0.4));
//! facts.insert(p_a.clone(), ValuedFact::new(p_a.clone(), w));
//! builder.load_neurons_from_facts(&mut scope, &facts).unwrap();
//!
//! let unit = scope.weights.unit();
//! let rule = LiftedRule::new(0, "q :- p(X)", unit)
//!     .with_aggregation(Aggregation::Sum)
//!     .with_activations(Activation::Identity, Activation::Identity);
//! let q = Literal::atom("q");
//! let mut rules = RuleGroundings::new();
//! rules.insert(
//!     rule.clone(),
//!     IndexSet::from([GroundRule::new(rule.id, q.clone(), vec![BodyAtom::positive(p_a)])]),
//! );
//! builder.load_neurons_from_rules(&mut scope, &q, &rules).unwrap();
//! builder.connect_all_neurons(&mut scope).unwrap();
//!
//! let network = builder.finalize_stored_network(&scope, "example-0", &[q]).unwrap();
//! assert_eq!(network.len(), 4);
//! ```

use lrnn_core::Settings;
use tracing::{debug, info};

use crate::error::NetworkError;
use crate::finalize::NetworkFinalizer;
use crate::logic::{GroundFacts, Literal, RuleGroundings};
use crate::maps::LogicScope;
use crate::network::DetailedNetwork;
use crate::neuron::{NeuronId, NeuronKind};
use crate::weight::WeightId;

/// Counts of what a build call created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildStats {
    pub atoms: usize,
    pub aggregations: usize,
    pub rules: usize,
    pub facts: usize,
    pub negations: usize,
    pub connected: usize,
}

pub struct NeuralNetBuilder<'a> {
    settings: &'a Settings,
}

impl<'a> NeuralNetBuilder<'a> {
    pub fn new(settings: &'a Settings) -> Self {
        Self { settings }
    }

    /// Create a fact neuron for every fact without one.
    pub fn load_neurons_from_facts(
        &self,
        scope: &mut LogicScope,
        facts: &GroundFacts,
    ) -> Result<BuildStats, NetworkError> {
        let mut stats = BuildStats::default();
        for (literal, fact) in facts {
            scope.weights.get(fact.weight)?;
            if scope.maps.fact(literal).is_none() {
                scope.maps.create_fact(literal, fact.weight);
                stats.facts += 1;
            }
        }
        debug!(created = stats.facts, total = facts.len(), "loaded fact neurons");
        Ok(stats)
    }

    /// Create the head atom, one aggregation per lifted rule and one rule
    /// neuron per grounding for `head`, and link them upwards.
    ///
    /// Fails without modifying the scope if any grounding already has a rule
    /// neuron or is listed under the wrong lifted rule.
    pub fn load_neurons_from_rules(
        &self,
        scope: &mut LogicScope,
        head: &Literal,
        rules: &RuleGroundings,
    ) -> Result<BuildStats, NetworkError> {
        for (lifted, groundings) in rules {
            for grounding in groundings {
                if grounding.rule != lifted.id {
                    return Err(NetworkError::MismatchedGrounding {
                        grounding: grounding.to_string(),
                        rule: lifted.to_string(),
                    });
                }
                if scope.maps.rule(grounding).is_some() {
                    return Err(NetworkError::GroundingKeyCollision {
                        grounding: grounding.to_string(),
                    });
                }
            }
            scope.weights.get(lifted.weight)?;
        }

        let mut stats = BuildStats::default();
        let Some(first) = rules.keys().next() else {
            return Ok(stats);
        };
        let maps = &mut scope.maps;

        let head_id = match maps.atom(head) {
            Some(id) => {
                maps.touch(id)?;
                id
            }
            None => {
                stats.atoms += 1;
                maps.create_atom(
                    head,
                    NeuronKind::Atom {
                        activation: first.head_activation,
                    },
                )
            }
        };

        for (lifted, groundings) in rules {
            let agg_id = match maps.aggregation(lifted.id, head) {
                Some(id) => {
                    maps.touch(id)?;
                    id
                }
                None => {
                    let id = maps.create_aggregation(
                        lifted.id,
                        head,
                        NeuronKind::Aggregation {
                            aggregation: lifted.aggregation,
                        },
                        format!("{}@{}", lifted, head),
                    );
                    maps.append_input(head_id, id, Some(lifted.weight))?;
                    stats.aggregations += 1;
                    id
                }
            };

            for grounding in groundings {
                let rule_id = maps.create_rule(
                    grounding,
                    NeuronKind::Rule {
                        activation: lifted.rule_activation,
                        weighted: grounding.has_weighted_body(),
                    },
                );
                maps.append_input(agg_id, rule_id, None)?;
                stats.rules += 1;
            }
        }

        debug!(
            head = %head,
            atoms = stats.atoms,
            aggregations = stats.aggregations,
            rules = stats.rules,
            "loaded rule neurons"
        );
        Ok(stats)
    }

    /// Wire every rule neuron to the neurons of its body literals.
    ///
    /// Rule neurons whose input count already equals their body size are
    /// skipped, so repeated calls are harmless. All body literals are resolved
    /// before any input is added.
    pub fn connect_all_neurons(&self, scope: &mut LogicScope) -> Result<BuildStats, NetworkError> {
        let LogicScope { weights, maps } = scope;

        let mut plan: Vec<(NeuronId, bool, Vec<(NeuronId, bool, Option<WeightId>)>)> = Vec::new();
        for (grounding, rule_id) in maps.rules() {
            if maps.effective_input_count(rule_id)? == grounding.body.len() {
                continue;
            }
            let mut inputs = Vec::with_capacity(grounding.body.len());
            for atom in &grounding.body {
                let input = maps
                    .resolve(&atom.literal)
                    .ok_or_else(|| NetworkError::MissingInput {
                        literal: atom.literal.to_string(),
                        grounding: grounding.to_string(),
                    })?;
                inputs.push((input, atom.negated, atom.weight));
            }
            plan.push((rule_id, grounding.has_weighted_body(), inputs));
        }

        let mut stats = BuildStats::default();
        for (rule_id, weighted, inputs) in plan {
            for (input, negated, weight) in inputs {
                maps.touch(input)?;
                let source = if negated {
                    stats.negations += 1;
                    maps.create_negation(input)?
                } else {
                    input
                };
                let weight = weighted.then(|| weight.unwrap_or_else(|| weights.unit()));
                maps.append_input(rule_id, source, weight)?;
            }
            stats.connected += 1;
        }

        debug!(
            connected = stats.connected,
            negations = stats.negations,
            "connected rule neurons"
        );
        Ok(stats)
    }

    /// Freeze the part of the scope reachable from `queries` into a network.
    pub fn finalize_stored_network(
        &self,
        scope: &LogicScope,
        id: impl Into<String>,
        queries: &[Literal],
    ) -> Result<DetailedNetwork, NetworkError> {
        let network = NetworkFinalizer::new(self.settings).finalize(&scope.maps, id, queries)?;
        info!(
            network = %network.id,
            neurons = network.len(),
            shared = network.shared_count(),
            "finalized network"
        );
        Ok(network)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::functions::{Activation, Aggregation};
    use crate::logic::{BodyAtom, GroundRule, LiftedRule, ValuedFact};
    use indexmap::IndexSet;
    use lrnn_core::Value;

    fn fact(scope: &mut LogicScope, facts: &mut GroundFacts, literal: Literal, value: f64) {
        let w = scope.weights.fixed(Value::scalar(value));
        facts.insert(literal.clone(), ValuedFact::new(literal, w));
    }

    fn avg_rule(scope: &mut LogicScope, id: u32) -> LiftedRule {
        let unit = scope.weights.unit();
        LiftedRule::new(id, format!("rule{id}"), unit)
            .with_aggregation(Aggregation::Average)
            .with_activations(Activation::Identity, Activation::Identity)
    }

    fn groundings(rule: &LiftedRule, head: &Literal, body: &[&str]) -> IndexSet<GroundRule> {
        body.iter()
            .map(|c| {
                GroundRule::new(
                    rule.id,
                    head.clone(),
                    vec![BodyAtom::positive(Literal::new("p", [*c]))],
                )
            })
            .collect()
    }

    #[test]
    fn test_rule_pass_creates_one_neuron_per_grounding() {
        let settings = Settings::default();
        let builder = NeuralNetBuilder::new(&settings);
        let mut scope = LogicScope::new();
        scope.maps.begin_build();

        let rule = avg_rule(&mut scope, 0);
        let q = Literal::atom("q");
        let mut rules = RuleGroundings::new();
        rules.insert(rule.clone(), groundings(&rule, &q, &["a", "b", "c"]));

        let stats = builder.load_neurons_from_rules(&mut scope, &q, &rules).unwrap();
        assert_eq!(stats.atoms, 1);
        assert_eq!(stats.aggregations, 1);
        assert_eq!(stats.rules, 3);

        let head = scope.maps.atom(&q).unwrap();
        let agg = scope.maps.aggregation(rule.id, &q).unwrap();
        assert_eq!(scope.maps.neuron(head).unwrap().inputs, vec![agg]);
        assert_eq!(scope.maps.neuron(agg).unwrap().inputs.len(), 3);
    }

    #[test]
    fn test_collision_leaves_scope_untouched() {
        let settings = Settings::default();
        let builder = NeuralNetBuilder::new(&settings);
        let mut scope = LogicScope::new();
        scope.maps.begin_build();

        let rule = avg_rule(&mut scope, 0);
        let q = Literal::atom("q");
        let mut rules = RuleGroundings::new();
        rules.insert(rule.clone(), groundings(&rule, &q, &["a"]));
        builder.load_neurons_from_rules(&mut scope, &q, &rules).unwrap();
        let before = scope.maps.len();

        let r = Literal::atom("r");
        let other = avg_rule(&mut scope, 1);
        let mut again = RuleGroundings::new();
        again.insert(other.clone(), groundings(&other, &r, &["z"]));
        again.insert(rule.clone(), groundings(&rule, &q, &["a"]));

        let err = builder.load_neurons_from_rules(&mut scope, &r, &again).unwrap_err();
        assert!(matches!(err, NetworkError::GroundingKeyCollision { .. }));
        assert_eq!(scope.maps.len(), before);
        assert!(scope.maps.atom(&r).is_none());
    }

    #[test]
    fn test_mismatched_grounding_is_rejected() {
        let settings = Settings::default();
        let builder = NeuralNetBuilder::new(&settings);
        let mut scope = LogicScope::new();
        let rule = avg_rule(&mut scope, 0);
        let other = avg_rule(&mut scope, 1);
        let q = Literal::atom("q");
        let mut rules = RuleGroundings::new();
        rules.insert(rule, groundings(&other, &q, &["a"]));

        let err = builder.load_neurons_from_rules(&mut scope, &q, &rules).unwrap_err();
        assert!(matches!(err, NetworkError::MismatchedGrounding { .. }));
        assert!(scope.maps.is_empty());
    }

    #[test]
    fn test_connect_is_idempotent_and_reports_missing_inputs() {
        let settings = Settings::default();
        let builder = NeuralNetBuilder::new(&settings);
        let mut scope = LogicScope::new();
        scope.maps.begin_build();

        let mut facts = GroundFacts::new();
        fact(&mut scope, &mut facts, Literal::new("p", ["a"]), 0.2);
        builder.load_neurons_from_facts(&mut scope, &facts).unwrap();

        let rule = avg_rule(&mut scope, 0);
        let q = Literal::atom("q");
        let mut rules = RuleGroundings::new();
        rules.insert(rule.clone(), groundings(&rule, &q, &["a", "b"]));
        builder.load_neurons_from_rules(&mut scope, &q, &rules).unwrap();

        let err = builder.connect_all_neurons(&mut scope).unwrap_err();
        assert_eq!(
            err,
            NetworkError::MissingInput {
                literal: "p(b)".into(),
                grounding: "q :- p(b)".into(),
            }
        );
        for (_, id) in scope.maps.rules() {
            assert_eq!(scope.maps.neuron(id).unwrap().input_count(), 0);
        }

        fact(&mut scope, &mut facts, Literal::new("p", ["b"]), 0.7);
        builder.load_neurons_from_facts(&mut scope, &facts).unwrap();
        assert_eq!(builder.connect_all_neurons(&mut scope).unwrap().connected, 2);
        assert_eq!(builder.connect_all_neurons(&mut scope).unwrap().connected, 0);
    }

    #[test]
    fn test_negated_and_weighted_body() {
        let settings = Settings::default();
        let builder = NeuralNetBuilder::new(&settings);
        let mut scope = LogicScope::new();
        scope.maps.begin_build();

        let mut facts = GroundFacts::new();
        fact(&mut scope, &mut facts, Literal::new("p", ["a"]), 0.2);
        fact(&mut scope, &mut facts, Literal::new("r", ["a"]), 0.9);
        builder.load_neurons_from_facts(&mut scope, &facts).unwrap();

        let rule = avg_rule(&mut scope, 0);
        let w = scope.weights.learnable("w_p", Value::scalar(0.5));
        let q = Literal::atom("q");
        let grounding = GroundRule::new(
            rule.id,
            q.clone(),
            vec![
                BodyAtom::positive(Literal::new("p", ["a"])).with_weight(w),
                BodyAtom::negated(Literal::new("r", ["a"])),
            ],
        );
        let mut rules = RuleGroundings::new();
        rules.insert(rule, IndexSet::from([grounding.clone()]));
        builder.load_neurons_from_rules(&mut scope, &q, &rules).unwrap();
        let stats = builder.connect_all_neurons(&mut scope).unwrap();
        assert_eq!(stats.negations, 1);

        let neuron = scope.maps.neuron(scope.maps.rule(&grounding).unwrap()).unwrap();
        assert!(neuron.kind.is_weighted());
        assert_eq!(neuron.inputs.len(), 2);
        assert_eq!(neuron.weights.len(), 2);
        assert_eq!(neuron.weights[0], w);
        assert!(!scope.weights.is_learnable(neuron.weights[1]));
        let negation = scope.maps.neuron(neuron.inputs[1]).unwrap();
        assert_eq!(negation.kind, NeuronKind::Negation);
    }
}
