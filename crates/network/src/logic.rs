//! # Logic Inputs
//!
//! The fixed data structures handed over by the grounding stage. Parsing and
//! grounding live elsewhere; this module only describes their results:
//!
//! - [`Literal`]: a ground (or head) atom such as `p(a, b)`
//! - [`LiftedRule`]: a template rule, shared by all of its groundings
//! - [`GroundRule`]: one concrete instantiation of a lifted rule
//! - [`ValuedFact`]: a ground fact and the weight holding its value
//!
//! A builder input for one head literal is a [`RuleGroundings`] map: every
//! lifted rule proving the head, each with the set of its groundings.

use std::fmt;
use std::hash::{Hash, Hasher};

use indexmap::{IndexMap, IndexSet};

use crate::functions::{Activation, Aggregation};
use crate::weight::WeightId;

/// A predicate applied to constant terms.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Literal {
    predicate: String,
    terms: Vec<String>,
}

impl Literal {
    pub fn new<T: Into<String>>(predicate: impl Into<String>, terms: impl IntoIterator<Item = T>) -> Self {
        Self {
            predicate: predicate.into(),
            terms: terms.into_iter().map(Into::into).collect(),
        }
    }

    /// A literal without terms, e.g. a propositional query `q`.
    pub fn atom(predicate: impl Into<String>) -> Self {
        Self {
            predicate: predicate.into(),
            terms: Vec::new(),
        }
    }

    pub fn predicate(&self) -> &str {
        &self.predicate
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn arity(&self) -> usize {
        self.terms.len()
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.terms.is_empty() {
            write!(f, "{}", self.predicate)
        } else {
            write!(f, "{}({})", self.predicate, self.terms.join(", "))
        }
    }
}

/// A literal occurrence in a rule body.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BodyAtom {
    pub literal: Literal,
    pub negated: bool,
    /// Per-literal (conjunction) weight, if the rule body is weighted.
    pub weight: Option<WeightId>,
}

impl BodyAtom {
    pub fn positive(literal: Literal) -> Self {
        Self {
            literal,
            negated: false,
            weight: None,
        }
    }

    pub fn negated(literal: Literal) -> Self {
        Self {
            literal,
            negated: true,
            weight: None,
        }
    }

    pub fn with_weight(mut self, weight: WeightId) -> Self {
        self.weight = Some(weight);
        self
    }
}

impl fmt::Display for BodyAtom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negated {
            write!(f, "~{}", self.literal)
        } else {
            write!(f, "{}", self.literal)
        }
    }
}

/// Identity of a lifted (template) rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleId(pub u32);

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// A template rule. Equality and hashing use the id only.
#[derive(Debug, Clone)]
pub struct LiftedRule {
    pub id: RuleId,
    pub label: String,
    /// Weight of the edge from this rule's aggregation into the head atom.
    pub weight: WeightId,
    pub aggregation: Aggregation,
    /// Activation of each grounding's rule neuron.
    pub rule_activation: Activation,
    /// Activation of the head atom neuron.
    pub head_activation: Activation,
}

impl LiftedRule {
    pub fn new(id: u32, label: impl Into<String>, weight: WeightId) -> Self {
        Self {
            id: RuleId(id),
            label: label.into(),
            weight,
            aggregation: Aggregation::Average,
            rule_activation: Activation::Sigmoid,
            head_activation: Activation::Sigmoid,
        }
    }

    pub fn with_aggregation(mut self, aggregation: Aggregation) -> Self {
        self.aggregation = aggregation;
        self
    }

    pub fn with_activations(mut self, rule: Activation, head: Activation) -> Self {
        self.rule_activation = rule;
        self.head_activation = head;
        self
    }
}

impl PartialEq for LiftedRule {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for LiftedRule {}

impl Hash for LiftedRule {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for LiftedRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.id, self.label)
    }
}

/// One grounding of a lifted rule. The whole struct is the grounding key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroundRule {
    pub rule: RuleId,
    pub head: Literal,
    pub body: Vec<BodyAtom>,
}

impl GroundRule {
    pub fn new(rule: RuleId, head: Literal, body: Vec<BodyAtom>) -> Self {
        Self { rule, head, body }
    }

    /// True if any body literal carries its own weight.
    pub fn has_weighted_body(&self) -> bool {
        self.body.iter().any(|atom| atom.weight.is_some())
    }
}

impl fmt::Display for GroundRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let body: Vec<String> = self.body.iter().map(|b| b.to_string()).collect();
        write!(f, "{} :- {}", self.head, body.join(", "))
    }
}

/// A ground fact. Its value is the value of `weight`, which may be fixed or
/// learnable.
#[derive(Debug, Clone, PartialEq)]
pub struct ValuedFact {
    pub literal: Literal,
    pub weight: WeightId,
}

impl ValuedFact {
    pub fn new(literal: Literal, weight: WeightId) -> Self {
        Self { literal, weight }
    }
}

/// Every lifted rule with a given head, each with its groundings, in
/// insertion order.
pub type RuleGroundings = IndexMap<LiftedRule, IndexSet<GroundRule>>;

/// Ground facts by literal.
pub type GroundFacts = IndexMap<Literal, ValuedFact>;
