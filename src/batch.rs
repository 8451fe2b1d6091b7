//! Judge output batches.
//!
//! A batch is what the upstream judge (LLM evaluator or RAGAS) hands over
//! for one run: raw per-criterion scores and per-subject cost/time.
//!
//! Supported files:
//! - JSON / YAML: the serialized [`EvaluationBatch`]
//! - CSV: one row per subject, `subject_id,total_cost,elapsed_secs,<criterion>...`

use crate::criterion::EvaluatorMode;
use crate::error::{Result, ScorecardError};
use chrono::{DateTime, Utc};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// One raw score as reported by the judge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawScore {
    pub subject_id: String,
    pub criterion_id: String,
    pub value: f64,
}

/// One raw cost/time pair as reported by the judge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMeasurement {
    pub subject_id: String,
    pub total_cost: f64,
    pub elapsed_secs: f64,
}

/// Everything the judge produced for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvaluationBatch {
    /// Display name of the batch.
    #[serde(default)]
    pub name: String,
    /// Mode the scores were produced for, if the producer recorded it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<EvaluatorMode>,
    /// When the judge produced the scores. Defaults to load time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    /// Explicit subject order. Subjects only mentioned in scores are appended.
    #[serde(default)]
    pub subjects: Vec<String>,
    #[serde(default)]
    pub scores: Vec<RawScore>,
    #[serde(default)]
    pub measurements: Vec<RawMeasurement>,
}

/// Supported batch file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchFormat {
    Json,
    Yaml,
    Csv,
}

impl BatchFormat {
    /// Determine format from file extension.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => BatchFormat::Yaml,
            Some("csv") => BatchFormat::Csv,
            _ => BatchFormat::Json,
        }
    }
}

const SUBJECT_COLUMN: &str = "subject_id";
const COST_COLUMN: &str = "total_cost";
const ELAPSED_COLUMN: &str = "elapsed_secs";

impl EvaluationBatch {
    /// Create an empty batch.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Add a raw score.
    pub fn add_score(&mut self, subject_id: impl Into<String>, criterion_id: impl Into<String>, value: f64) {
        self.scores.push(RawScore {
            subject_id: subject_id.into(),
            criterion_id: criterion_id.into(),
            value,
        });
    }

    /// Add a raw cost/time pair.
    pub fn add_measurement(&mut self, subject_id: impl Into<String>, total_cost: f64, elapsed_secs: f64) {
        self.measurements.push(RawMeasurement {
            subject_id: subject_id.into(),
            total_cost,
            elapsed_secs,
        });
    }

    /// Subjects in run order: the explicit list first, then first appearance.
    pub fn subject_order(&self) -> Vec<String> {
        let mut order: IndexSet<&str> = self.subjects.iter().map(String::as_str).collect();
        order.extend(self.scores.iter().map(|s| s.subject_id.as_str()));
        order.extend(self.measurements.iter().map(|m| m.subject_id.as_str()));
        order.into_iter().map(str::to_string).collect()
    }

    /// Load a batch, picking the format from the extension.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| ScorecardError::io(path, e))?;
        let mut batch = match BatchFormat::from_path(path) {
            BatchFormat::Json => serde_json::from_str(&content)?,
            BatchFormat::Yaml => serde_yaml::from_str(&content)
                .map_err(|e| ScorecardError::Serialization(e.to_string()))?,
            BatchFormat::Csv => Self::from_csv(&content)?,
        };
        if batch.name.is_empty() {
            batch.name = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("batch")
                .to_string();
        }
        Ok(batch)
    }

    /// Parse the wide CSV layout. Blank cells mean "not reported".
    pub fn from_csv(content: &str) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());
        let headers = reader.headers()?.clone();

        let subject_idx = headers
            .iter()
            .position(|h| h == SUBJECT_COLUMN)
            .ok_or_else(|| {
                ScorecardError::Serialization(format!("CSV batch has no '{}' column", SUBJECT_COLUMN))
            })?;
        let cost_idx = headers.iter().position(|h| h == COST_COLUMN);
        let elapsed_idx = headers.iter().position(|h| h == ELAPSED_COLUMN);

        let mut batch = EvaluationBatch::default();
        for (line, row) in reader.records().enumerate() {
            let row = row?;
            let subject_id = row.get(subject_idx).unwrap_or_default().to_string();
            if subject_id.is_empty() {
                return Err(ScorecardError::Serialization(format!(
                    "CSV row {} has an empty subject id",
                    line + 2
                )));
            }
            batch.subjects.push(subject_id.clone());

            let cell = |idx: usize| -> Result<Option<f64>> {
                let raw = row.get(idx).unwrap_or_default();
                if raw.is_empty() {
                    return Ok(None);
                }
                raw.parse::<f64>().map(Some).map_err(|_| {
                    ScorecardError::Serialization(format!(
                        "CSV row {} column '{}': '{}' is not a number",
                        line + 2,
                        &headers[idx],
                        raw
                    ))
                })
            };

            for idx in 0..headers.len() {
                if idx == subject_idx || Some(idx) == cost_idx || Some(idx) == elapsed_idx {
                    continue;
                }
                if let Some(value) = cell(idx)? {
                    batch.add_score(subject_id.clone(), &headers[idx], value);
                }
            }

            let cost = cost_idx.map(&cell).transpose()?.flatten();
            let elapsed = elapsed_idx.map(&cell).transpose()?.flatten();
            match (cost, elapsed) {
                (Some(total_cost), Some(elapsed_secs)) => {
                    batch.add_measurement(subject_id, total_cost, elapsed_secs);
                }
                (None, None) => {}
                (Some(_), None) | (None, Some(_)) => {
                    let blank = if cost.is_none() { COST_COLUMN } else { ELAPSED_COLUMN };
                    return Err(ScorecardError::Serialization(format!(
                        "CSV row {} for subject '{}' has no '{}' value; cost and elapsed time must be given together",
                        line + 2,
                        subject_id,
                        blank
                    )));
                }
            }
        }
        Ok(batch)
    }

    /// Save the batch as JSON.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).map_err(|e| ScorecardError::io(path, e))
    }
}
