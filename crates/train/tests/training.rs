//! End-to-end training over networks built from grounded rules.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use indexmap::IndexSet;
use lrnn_core::{Distribution, RestartPolicy, Settings, Value};
use lrnn_network::{
    Activation, Aggregation, BodyAtom, GroundFacts, GroundRule, LiftedRule, Literal, LogicScope,
    NeuralNetBuilder, RuleGroundings, ValuedFact, WeightId,
};
use lrnn_train::evaluator::learn_sample;
use lrnn_train::{Evaluator, MiniBatchTraining, NeuralSample, SquaredDiff, TrainError, TrainingPhase};

const FACTS: [(&str, f64); 3] = [("a", 0.2), ("b", 0.5), ("c", 0.9)];

/// One example per fact: `q_c :- p(c)` with a shared learnable rule weight,
/// identity activations and target `2 · p(c)`.
fn doubling_task(settings: &Settings) -> (LogicScope, Vec<NeuralSample>, WeightId) {
    let builder = NeuralNetBuilder::new(settings);
    let mut scope = LogicScope::new();
    let w = scope.weights.learnable("w", Value::scalar(0.0));
    let rule = LiftedRule::new(0, "q(X) :- p(X)", w)
        .with_aggregation(Aggregation::Sum)
        .with_activations(Activation::Identity, Activation::Identity);

    let mut facts = GroundFacts::new();
    for (c, v) in FACTS {
        let literal = Literal::new("p", [c]);
        let fw = scope.weights.fixed(Value::scalar(v));
        facts.insert(literal.clone(), ValuedFact::new(literal, fw));
    }

    let mut samples = Vec::new();
    for (c, v) in FACTS {
        scope.maps.begin_build();
        builder.load_neurons_from_facts(&mut scope, &facts).unwrap();
        let head = Literal::new("q", [c]);
        let mut rules = RuleGroundings::new();
        rules.insert(
            rule.clone(),
            IndexSet::from([GroundRule::new(
                rule.id,
                head.clone(),
                vec![BodyAtom::positive(Literal::new("p", [c]))],
            )]),
        );
        builder.load_neurons_from_rules(&mut scope, &head, &rules).unwrap();
        builder.connect_all_neurons(&mut scope).unwrap();
        let network = builder
            .finalize_stored_network(&scope, format!("ex-{c}"), &[head])
            .unwrap();
        samples.push(NeuralSample::new(c, Arc::new(network), Value::scalar(2.0 * v)));
    }
    (scope, samples, w)
}

fn settings() -> Settings {
    Settings {
        learning_rate: 0.5,
        max_epochs: 200,
        minibatch_size: 1,
        seed: 7,
        ..Settings::default()
    }
}

fn scalar(v: &Value) -> f64 {
    v.as_scalar().expect("scalar")
}

// ============================================================================
// Convergence
// ============================================================================

#[test]
fn test_training_fits_shared_rule_weight() {
    let _ = lrnn_core::logging::init_for_tests();
    let settings = settings();
    let (mut scope, samples, w) = doubling_task(&settings);
    let fact_values: Vec<Value> = scope
        .weights
        .iter()
        .filter(|w| !w.is_learnable())
        .map(|w| w.value.clone())
        .collect();

    let mut training = MiniBatchTraining::new(settings.clone(), samples.clone()).unwrap();
    let report = training.train(&mut scope.weights).unwrap();

    assert_eq!(report.restarts, 1);
    assert_eq!(report.epochs, 200);
    assert!(!report.stopped);
    assert!(report.best_error.unwrap() < 1e-8);
    assert!((scalar(scope.weights.value(w).unwrap()) - 2.0).abs() < 1e-3);

    let after: Vec<Value> = scope
        .weights
        .iter()
        .filter(|w| !w.is_learnable())
        .map(|w| w.value.clone())
        .collect();
    assert_eq!(after, fact_values);

    let results = Evaluator::new(&settings).evaluate(&samples, &scope.weights).unwrap();
    assert_eq!(results.len(), 3);
    assert!(results.error < 1e-6);
}

#[test]
fn test_parallel_and_sequential_training_agree() {
    let mut finals = Vec::new();
    for parallel in [true, false] {
        let settings = Settings {
            parallel,
            minibatch_size: 2,
            max_epochs: 20,
            ..settings()
        };
        let (mut scope, samples, w) = doubling_task(&settings);
        MiniBatchTraining::new(settings, samples)
            .unwrap()
            .train(&mut scope.weights)
            .unwrap();
        finals.push(scalar(scope.weights.value(w).unwrap()));
    }
    assert_eq!(finals[0], finals[1]);
}

#[test]
fn test_restarts_keep_best_model() {
    let settings = Settings {
        max_restarts: 3,
        max_epochs: 5,
        ..settings()
    };
    let (mut scope, samples, _) = doubling_task(&settings);
    let mut training = MiniBatchTraining::new(settings, samples).unwrap();
    let report = training.train(&mut scope.weights).unwrap();

    assert_eq!(report.restarts, 3);
    assert_eq!(report.epoch_errors.len(), 3);
    assert!(report.epoch_errors.iter().all(|e| e.len() == 5));
    let best = report
        .epoch_errors
        .iter()
        .flatten()
        .copied()
        .fold(f64::INFINITY, f64::min);
    assert_eq!(report.best_error, Some(best));
    assert_eq!(training.best_model().unwrap().error, Some(best));
}

#[test]
fn test_restored_model_matches_reported_best_error() {
    // Step size large enough that every update overshoots: w oscillates
    // around 2 with growing amplitude, so the first epoch's weights win.
    let settings = Settings {
        learning_rate: 5.0,
        initializer: Distribution::Constant { value: 1.9 },
        minibatch_size: 3,
        minibatch_shuffle: false,
        max_epochs: 4,
        ..settings()
    };
    let (mut scope, samples, w) = doubling_task(&settings);
    let report = MiniBatchTraining::new(settings.clone(), samples.clone())
        .unwrap()
        .train(&mut scope.weights)
        .unwrap();

    let errors = &report.epoch_errors[0];
    assert_eq!(errors.len(), 4);
    assert!(errors.windows(2).all(|pair| pair[0] < pair[1]));
    assert_eq!(report.best_error, Some(errors[0]));

    // One batch step from 1.9: w += 5 · 0.1 · (0.04 + 0.25 + 0.81)
    assert!((scalar(scope.weights.value(w).unwrap()) - 2.45).abs() < 1e-9);
    let restored = Evaluator::new(&settings).evaluate(&samples, &scope.weights).unwrap();
    assert_eq!(Some(restored.error), report.best_error);
}

// ============================================================================
// Control flow
// ============================================================================

#[test]
fn test_no_improvement_stops_early() {
    let settings = Settings {
        restart_policy: RestartPolicy::NoImprovement { patience: 3 },
        initializer: Distribution::Constant { value: 2.0 },
        ..settings()
    };
    let (mut scope, samples, _) = doubling_task(&settings);
    let report = MiniBatchTraining::new(settings, samples)
        .unwrap()
        .train(&mut scope.weights)
        .unwrap();
    assert_eq!(report.epochs, 4);
    assert_eq!(report.best_error, Some(0.0));
}

#[test]
fn test_stop_signal_before_training() {
    let settings = settings();
    let (mut scope, samples, w) = doubling_task(&settings);
    let mut training = MiniBatchTraining::new(settings, samples).unwrap();
    training.stop_handle().store(true, Ordering::Relaxed);

    let report = training.train(&mut scope.weights).unwrap();
    assert!(report.stopped);
    assert_eq!(report.epochs, 0);
    assert_eq!(report.best_error, None);
    assert_eq!(scope.weights.value(w).unwrap(), &Value::scalar(0.0));
}

#[test]
fn test_state_machine_transitions() {
    let settings = Settings {
        max_epochs: 1,
        ..settings()
    };
    let (mut scope, samples, _) = doubling_task(&settings);
    let mut training = MiniBatchTraining::new(settings, samples).unwrap();
    assert_eq!(training.phase(), TrainingPhase::InitTraining);

    let mut phases = Vec::new();
    loop {
        let phase = training.step(&mut scope.weights).unwrap();
        phases.push(phase);
        if phase == TrainingPhase::Finished {
            break;
        }
    }
    assert_eq!(
        phases,
        vec![
            TrainingPhase::InitRestart,
            TrainingPhase::InitEpoch,
            TrainingPhase::LearnEpoch,
            TrainingPhase::InitEpoch,
            TrainingPhase::InitRestart,
            TrainingPhase::Finished,
        ]
    );
    assert_eq!(training.progress().epoch, 1);
}

#[test]
fn test_empty_sample_list_is_rejected() {
    let err = MiniBatchTraining::new(settings(), Vec::new()).err().unwrap();
    assert!(matches!(err, TrainError::NoSamples));

    let invalid = Settings {
        minibatch_size: 0,
        ..settings()
    };
    let (_, samples, _) = doubling_task(&invalid);
    assert!(matches!(
        MiniBatchTraining::new(invalid, samples),
        Err(TrainError::Config(_))
    ));
}

// ============================================================================
// Per-sample learning
// ============================================================================

#[test]
fn test_importance_scales_gradient() {
    let settings = settings();
    let (mut scope, samples, w) = doubling_task(&settings);
    scope.weights.set_value(w, Value::scalar(1.0)).unwrap();
    let sample = samples[2].clone();

    let (result, full) = learn_sample(&sample, &scope.weights, &SquaredDiff, settings.iteration_mode).unwrap();
    assert!((scalar(&result.output) - 0.9).abs() < 1e-12);
    // dE/dw = (w·p − 2p)·p = (0.9 − 1.8)·0.9
    assert!((scalar(full.get(w).unwrap()) + 0.81).abs() < 1e-12);

    let weighted = sample.with_importance(0.5);
    let (_, half) = learn_sample(&weighted, &scope.weights, &SquaredDiff, settings.iteration_mode).unwrap();
    assert!((scalar(half.get(w).unwrap()) + 0.405).abs() < 1e-12);
    assert!(half.iter().all(|(id, _)| id == w));
}
