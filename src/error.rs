//! Error types for scorecard aggregation.

use std::path::PathBuf;
use thiserror::Error;

use crate::criterion::ValueDomain;

/// Result type alias using our custom error.
pub type Result<T> = std::result::Result<T, ScorecardError>;

/// Errors that can occur while building, validating or comparing scorecards.
///
/// Every rejection names the offending subject and/or criterion so the
/// caller can correct the upstream batch and resubmit it.
#[derive(Error, Debug)]
pub enum ScorecardError {
    /// The subject was not registered for this run.
    #[error("Unknown subject '{0}' is not registered for this run")]
    UnknownSubject(String),

    /// The criterion is not declared in the registry.
    #[error("Unknown criterion '{0}'")]
    UnknownCriterion(String),

    /// A criterion with this id was already registered.
    #[error("Criterion '{0}' is already registered")]
    DuplicateCriterion(String),

    /// A subject with this id was already registered for the run.
    #[error("Subject '{0}' is already registered for this run")]
    DuplicateSubject(String),

    /// The raw value lies outside the criterion's declared domain.
    #[error("Value {value} for criterion '{criterion_id}' of subject '{subject_id}' is outside domain {domain}")]
    OutOfDomain {
        subject_id: String,
        criterion_id: String,
        value: f64,
        domain: ValueDomain,
    },

    /// A different record for the same subject/criterion pair was already ingested.
    #[error("Subject '{subject_id}' already has a score for criterion '{criterion_id}'")]
    DuplicateMetric {
        subject_id: String,
        criterion_id: String,
    },

    /// A different operational measurement was already recorded for the subject.
    #[error("Subject '{0}' already has an operational measurement")]
    DuplicateMeasurement(String),

    /// Cost or elapsed time is negative or not a finite number.
    #[error("Invalid operational measurement for subject '{subject_id}': {reason}")]
    InvalidMeasurement { subject_id: String, reason: String },

    /// The scorecard is missing required criteria or its measurement.
    #[error("{}", incomplete_message(.subject_id, .missing_criteria, .missing_measurement))]
    IncompleteScorecard {
        subject_id: String,
        missing_criteria: Vec<String>,
        missing_measurement: bool,
    },

    /// A comparison was requested over zero scorecards.
    #[error("Cannot build a comparison table from an empty run")]
    EmptyRun,

    /// The registry no longer accepts new criteria.
    #[error("Criterion registry is frozen; cannot register '{0}'")]
    RegistryFrozen(String),

    /// A run was started from a registry that is still open for registration.
    #[error("Criterion registry must be frozen before a run starts")]
    RegistryNotFrozen,

    /// The evaluator mode name is not recognised.
    #[error("Unknown evaluator mode '{0}' (expected 'summarization' or 'rag')")]
    UnknownMode(String),

    /// No token prices are known for the model.
    #[error("No token pricing known for model '{0}'")]
    UnknownModelPrice(String),

    /// The judge output could not be turned into a score.
    #[error("Failed to parse judge output: {0}")]
    JudgeParse(String),

    /// Error reading or writing files.
    #[error("I/O error for path '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Error during serialization/deserialization.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration file or value error.
    #[error("Configuration error: {0}")]
    Config(String),
}

fn incomplete_message(subject_id: &str, missing: &[String], missing_measurement: &bool) -> String {
    let mut parts = Vec::new();
    if !missing.is_empty() {
        parts.push(format!("missing criteria [{}]", missing.join(", ")));
    }
    if *missing_measurement {
        parts.push("missing operational measurement".to_string());
    }
    format!(
        "Scorecard for subject '{}' is incomplete: {}",
        subject_id,
        parts.join("; ")
    )
}

impl ScorecardError {
    /// Create an I/O error with path context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<serde_json::Error> for ScorecardError {
    fn from(err: serde_json::Error) -> Self {
        ScorecardError::Serialization(err.to_string())
    }
}

impl From<csv::Error> for ScorecardError {
    fn from(err: csv::Error) -> Self {
        ScorecardError::Serialization(err.to_string())
    }
}
