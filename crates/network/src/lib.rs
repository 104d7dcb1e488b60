//! # lrnn-network
//!
//! Builds per-example neural networks out of grounded logic and evaluates
//! them.
//!
//! ## Key Concepts
//!
//! - **Neuron maps**: one arena of neurons per logic source, reused across
//!   all examples built from it
//! - **Shared neurons**: neurons reachable from more than one example network
//! - **Input overlays**: per-build input extensions that leave finalized
//!   networks untouched
//! - **Detailed network**: a frozen, topologically ordered snapshot for one
//!   example, evaluated forward and backward
//!
//! ## Pipeline
//!
//! ```text
//! facts ──► load_neurons_from_facts ─┐
//! rules ──► load_neurons_from_rules ─┼─► connect_all_neurons ─► finalize ─► reduce ─► forward/backward
//! ```

pub mod builder;
pub mod error;
pub mod evaluate;
pub mod finalize;
pub mod functions;
pub mod logic;
pub mod maps;
pub mod network;
pub mod neuron;
pub mod reduce;
pub mod states;
pub mod weight;

pub use builder::{BuildStats, NeuralNetBuilder};
pub use error::NetworkError;
pub use evaluate::{backward, forward};
pub use finalize::NetworkFinalizer;
pub use functions::{Activation, Aggregation};
pub use logic::{BodyAtom, GroundFacts, GroundRule, LiftedRule, Literal, RuleGroundings, RuleId, ValuedFact};
pub use maps::{InputOverlay, LogicScope, NeuronMaps};
pub use network::{DetailedNetwork, NetworkNode};
pub use neuron::{Neuron, NeuronId, NeuronKind};
pub use reduce::{ParallelEdgeMerger, ReductionReport};
pub use states::{NeuronState, StatesCache, StorageStrategy};
pub use weight::{Weight, WeightId, WeightRegistry, WeightUpdates};
