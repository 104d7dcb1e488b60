//! Averaging query: build, evaluate and train a small lifted network.
//!
//! Run with: cargo run -p lrnn-train --example average_query
//!
//! This example demonstrates:
//! - Loading facts and rule groundings into a shared logic scope
//! - Finalizing one network per example
//! - Forward evaluation of `q :- p(X)` with average aggregation
//! - Minibatch training of a shared rule weight
//!
//! Set `RUST_LOG=debug` to see the builder and trainer at work.

use std::sync::Arc;

use indexmap::IndexSet;
use lrnn_core::{logging, Settings, Value};
use lrnn_network::{
    forward, Activation, Aggregation, BodyAtom, GroundFacts, GroundRule, LiftedRule, Literal, LogicScope,
    NeuralNetBuilder, RuleGroundings, ValuedFact,
};
use lrnn_train::{Evaluator, MiniBatchTraining, NeuralSample, TrainError};

fn main() -> Result<(), TrainError> {
    logging::init("info");
    println!("=== Averaging query ===\n");

    // -------------------------------------------------------------------------
    // 1. Facts and a rule
    // -------------------------------------------------------------------------
    let settings = Settings {
        learning_rate: 0.5,
        max_epochs: 50,
        minibatch_size: 2,
        ..Settings::default()
    };
    let builder = NeuralNetBuilder::new(&settings);
    let mut scope = LogicScope::new();

    let mut facts = GroundFacts::new();
    for (c, v) in [("a", 0.2), ("b", 0.7), ("c", 0.9), ("d", 0.1)] {
        let literal = Literal::new("p", [c]);
        let w = scope.weights.fixed(Value::scalar(v));
        facts.insert(literal.clone(), ValuedFact::new(literal, w));
        println!("fact   p({c}) = {v}");
    }

    let w = scope.weights.learnable("w_q", Value::scalar(1.0));
    let rule = LiftedRule::new(0, "q(G) :- p(X)", w)
        .with_aggregation(Aggregation::Average)
        .with_activations(Activation::Identity, Activation::Sigmoid);
    println!("rule   {rule}\n");

    // -------------------------------------------------------------------------
    // 2. One network per example
    // -------------------------------------------------------------------------
    let examples: [(&str, &[&str], f64); 2] = [("g1", &["a", "b", "c"], 1.0), ("g2", &["a", "d"], 0.0)];
    let mut samples = Vec::new();
    for (group, members, target) in examples {
        scope.maps.begin_build();
        builder.load_neurons_from_facts(&mut scope, &facts)?;
        let head = Literal::new("q", [group]);
        let groundings: IndexSet<GroundRule> = members
            .iter()
            .map(|m| GroundRule::new(rule.id, head.clone(), vec![BodyAtom::positive(Literal::new("p", [*m]))]))
            .collect();
        let mut rules = RuleGroundings::new();
        rules.insert(rule.clone(), groundings);
        builder.load_neurons_from_rules(&mut scope, &head, &rules)?;
        builder.connect_all_neurons(&mut scope)?;
        let network = builder.finalize_stored_network(&scope, group, &[head.clone()])?;

        let mut states = network.new_states();
        let out = forward(&network, &scope.weights, &mut states)?;
        println!(
            "{head}: {} neurons, {} shared, output {}",
            network.len(),
            network.shared_count(),
            out[0]
        );
        samples.push(NeuralSample::new(group, Arc::new(network), Value::scalar(target)));
    }
    println!();

    // -------------------------------------------------------------------------
    // 3. Training
    // -------------------------------------------------------------------------
    let mut training = MiniBatchTraining::new(settings.clone(), samples.clone())?;
    let report = training.train(&mut scope.weights)?;
    println!(
        "trained {} epochs, best error {:?}, w_q = {}",
        report.epochs,
        report.best_error,
        scope.weights.value(w)?
    );

    let results = Evaluator::new(&settings).evaluate(&samples, &scope.weights)?;
    for r in &results.results {
        println!("  {} -> {} (target {})", r.sample_id, r.output, r.target);
    }
    if let Some(stats) = results.classification {
        println!("accuracy {:.2}", stats.accuracy);
    }
    Ok(())
}
