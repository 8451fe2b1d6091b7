//! Criterion registry.
//!
//! A [`CriterionRegistry`] is the single source of truth for which
//! evaluation criteria exist in a given evaluator mode, what values each
//! one accepts and which way is "better". Registries are filled once,
//! frozen, and then shared read-only by every run that uses them.

use crate::error::{Result, ScorecardError};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Set of values a criterion accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueDomain {
    /// Integral grades 0 through 5 (LLM judge rubric).
    Ordinal0to5,
    /// Any real number in the closed unit interval.
    Unit0to1,
    /// Exactly 0 or 1.
    Binary,
}

impl ValueDomain {
    /// Check whether a raw value belongs to this domain.
    ///
    /// Non-finite values belong to no domain.
    pub fn contains(&self, value: f64) -> bool {
        if !value.is_finite() {
            return false;
        }
        match self {
            ValueDomain::Ordinal0to5 => (0.0..=5.0).contains(&value) && value.fract() == 0.0,
            ValueDomain::Unit0to1 => (0.0..=1.0).contains(&value),
            ValueDomain::Binary => value == 0.0 || value == 1.0,
        }
    }
}

impl fmt::Display for ValueDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueDomain::Ordinal0to5 => write!(f, "ordinal 0-5"),
            ValueDomain::Unit0to1 => write!(f, "unit interval [0, 1]"),
            ValueDomain::Binary => write!(f, "binary {{0, 1}}"),
        }
    }
}

/// Direction in which a criterion's values improve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    HigherIsBetter,
    LowerIsBetter,
}

/// A named, fixed-domain evaluation dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Criterion {
    /// Stable identifier, e.g. `faithfulness`.
    pub id: String,
    /// Human readable label used in reports.
    pub label: String,
    /// Accepted values.
    pub domain: ValueDomain,
    /// Which direction is better.
    pub polarity: Polarity,
    /// Whether every subject must report this criterion.
    pub required: bool,
}

impl Criterion {
    /// Create a required, higher-is-better criterion.
    pub fn new(id: impl Into<String>, label: impl Into<String>, domain: ValueDomain) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            domain,
            polarity: Polarity::HigherIsBetter,
            required: true,
        }
    }

    /// Set the polarity.
    pub fn with_polarity(mut self, polarity: Polarity) -> Self {
        self.polarity = polarity;
        self
    }

    /// Mark the criterion as optional.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }
}

/// Registry of the criteria declared for one evaluator mode.
#[derive(Debug, Clone, Default)]
pub struct CriterionRegistry {
    criteria: IndexMap<String, Criterion>,
    frozen: bool,
}

impl CriterionRegistry {
    /// Create an empty, unfrozen registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a criterion.
    pub fn register(&mut self, criterion: Criterion) -> Result<()> {
        if self.frozen {
            return Err(ScorecardError::RegistryFrozen(criterion.id));
        }
        if self.criteria.contains_key(&criterion.id) {
            return Err(ScorecardError::DuplicateCriterion(criterion.id));
        }
        debug!(criterion = %criterion.id, domain = %criterion.domain, "registered criterion");
        self.criteria.insert(criterion.id.clone(), criterion);
        Ok(())
    }

    /// Stop accepting registrations. Freezing twice is harmless.
    pub fn freeze(&mut self) {
        if !self.frozen {
            debug!(criteria = self.criteria.len(), "criterion registry frozen");
        }
        self.frozen = true;
    }

    /// Whether the registry has been frozen.
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Look up a criterion.
    pub fn get(&self, criterion_id: &str) -> Result<&Criterion> {
        self.criteria
            .get(criterion_id)
            .ok_or_else(|| ScorecardError::UnknownCriterion(criterion_id.to_string()))
    }

    /// Domain of a criterion.
    pub fn domain_of(&self, criterion_id: &str) -> Result<ValueDomain> {
        self.get(criterion_id).map(|c| c.domain)
    }

    /// Polarity of a criterion.
    pub fn polarity_of(&self, criterion_id: &str) -> Result<Polarity> {
        self.get(criterion_id).map(|c| c.polarity)
    }

    /// Required flag of a criterion.
    pub fn is_required(&self, criterion_id: &str) -> Result<bool> {
        self.get(criterion_id).map(|c| c.required)
    }

    /// Whether a criterion is declared.
    pub fn contains(&self, criterion_id: &str) -> bool {
        self.criteria.contains_key(criterion_id)
    }

    /// All criteria in declaration order.
    pub fn criteria(&self) -> impl Iterator<Item = &Criterion> {
        self.criteria.values()
    }

    /// All criterion ids in declaration order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.criteria.keys().map(String::as_str)
    }

    /// Number of declared criteria.
    pub fn len(&self) -> usize {
        self.criteria.len()
    }

    /// Check if no criteria are declared.
    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }
}

/// The evaluator flavours that ship with a fixed criterion set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EvaluatorMode {
    /// LLM-judged summarization quality, graded 0-5.
    #[default]
    Summarization,
    /// RAGAS metrics for a retrieval-augmented pipeline.
    Rag,
}

const SUMMARIZATION_CRITERIA: &[(&str, &str)] = &[
    ("cost_efficiency", "Cost Efficiency"),
    ("speed", "Speed"),
    ("accuracy", "Accuracy"),
    ("completeness", "Completeness"),
    ("logical_flow", "Logical Flow"),
    ("structure", "Paragraph and Sentence Structure"),
    ("conciseness", "Conciseness"),
    ("clarity", "Clarity"),
    ("objectivity", "Objectivity"),
    ("tone_consistency", "Tone Consistency"),
    ("adherence_to_instructions", "Adherence to Instructions"),
];

const RAG_CRITERIA: &[(&str, &str, ValueDomain, Polarity)] = &[
    ("cost_efficiency", "Cost Efficiency", ValueDomain::Unit0to1, Polarity::HigherIsBetter),
    ("speed", "Speed", ValueDomain::Unit0to1, Polarity::HigherIsBetter),
    ("faithfulness", "Faithfulness", ValueDomain::Unit0to1, Polarity::HigherIsBetter),
    ("answer_relevancy", "Answer Relevancy", ValueDomain::Unit0to1, Polarity::HigherIsBetter),
    ("context_recall", "Context Recall", ValueDomain::Unit0to1, Polarity::HigherIsBetter),
    ("context_precision", "Context Precision", ValueDomain::Unit0to1, Polarity::HigherIsBetter),
    ("context_entity_recall", "Context Entity Recall", ValueDomain::Unit0to1, Polarity::HigherIsBetter),
    ("answer_similarity", "Answer Similarity", ValueDomain::Unit0to1, Polarity::HigherIsBetter),
    ("answer_correctness", "Answer Correctness", ValueDomain::Unit0to1, Polarity::HigherIsBetter),
    ("harmfulness", "Harmfulness", ValueDomain::Binary, Polarity::LowerIsBetter),
    ("maliciousness", "Maliciousness", ValueDomain::Binary, Polarity::LowerIsBetter),
    ("coherence", "Coherence", ValueDomain::Binary, Polarity::HigherIsBetter),
    ("correctness", "Correctness", ValueDomain::Binary, Polarity::HigherIsBetter),
    ("conciseness", "Conciseness", ValueDomain::Binary, Polarity::HigherIsBetter),
];

impl EvaluatorMode {
    /// Canonical lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            EvaluatorMode::Summarization => "summarization",
            EvaluatorMode::Rag => "rag",
        }
    }

    /// Build the frozen registry of criteria shipped with this mode.
    pub fn registry(&self) -> CriterionRegistry {
        let criteria: IndexMap<String, Criterion> = match self {
            EvaluatorMode::Summarization => SUMMARIZATION_CRITERIA
                .iter()
                .map(|(id, label)| Criterion::new(*id, *label, ValueDomain::Ordinal0to5))
                .map(|c| (c.id.clone(), c))
                .collect(),
            EvaluatorMode::Rag => RAG_CRITERIA
                .iter()
                .map(|(id, label, domain, polarity)| {
                    Criterion::new(*id, *label, *domain).with_polarity(*polarity)
                })
                .map(|c| (c.id.clone(), c))
                .collect(),
        };
        debug!(mode = self.as_str(), criteria = criteria.len(), "built shipped criterion registry");
        CriterionRegistry {
            criteria,
            frozen: true,
        }
    }
}

impl FromStr for EvaluatorMode {
    type Err = ScorecardError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "summarization" | "summary" => Ok(EvaluatorMode::Summarization),
            "rag" => Ok(EvaluatorMode::Rag),
            other => Err(ScorecardError::UnknownMode(other.to_string())),
        }
    }
}

impl fmt::Display for EvaluatorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
