//! Metric records and operational measurements.

use crate::error::{Result, ScorecardError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One validated (subject, criterion, value) observation.
///
/// Records are produced by [`RunContext::validate`](crate::run::RunContext::validate);
/// holding one means the value was inside the criterion's domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    /// Evaluated model or knowledge base.
    pub subject_id: String,
    /// Criterion the value belongs to.
    pub criterion_id: String,
    /// Score exactly as supplied by the judge.
    pub value: f64,
    /// When the judge produced the value.
    pub run_timestamp: DateTime<Utc>,
}

/// Cost and latency of producing one subject's output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationalMeasurement {
    /// Evaluated model or knowledge base.
    pub subject_id: String,
    /// Total invocation cost in dollars.
    pub total_cost: f64,
    /// Wall clock time of the invocation.
    pub elapsed: Duration,
}

impl OperationalMeasurement {
    /// Create a measurement, rejecting negative cost.
    pub fn new(subject_id: impl Into<String>, total_cost: f64, elapsed: Duration) -> Result<Self> {
        let subject_id = subject_id.into();
        if !total_cost.is_finite() || total_cost < 0.0 {
            return Err(ScorecardError::InvalidMeasurement {
                subject_id,
                reason: format!("total cost must be a non-negative amount, got {}", total_cost),
            });
        }
        Ok(Self {
            subject_id,
            total_cost,
            elapsed,
        })
    }

    /// Create a measurement from elapsed seconds as reported by the judge batch.
    pub fn from_secs(subject_id: impl Into<String>, total_cost: f64, elapsed_secs: f64) -> Result<Self> {
        let subject_id = subject_id.into();
        let elapsed = Duration::try_from_secs_f64(elapsed_secs).map_err(|_| {
            ScorecardError::InvalidMeasurement {
                subject_id: subject_id.clone(),
                reason: format!(
                    "elapsed time must be a non-negative number of seconds, got {}",
                    elapsed_secs
                ),
            }
        })?;
        Self::new(subject_id, total_cost, elapsed)
    }

    /// Elapsed time in seconds.
    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed.as_secs_f64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measurement_from_secs() {
        let m = OperationalMeasurement::from_secs("claude-3-haiku", 0.002, 1.3).unwrap();
        assert_eq!(m.total_cost, 0.002);
        assert!((m.elapsed_secs() - 1.3).abs() < 1e-9);
    }

    #[test]
    fn test_measurement_rejects_negative_values() {
        assert!(matches!(
            OperationalMeasurement::from_secs("m", -0.01, 1.0),
            Err(ScorecardError::InvalidMeasurement { .. })
        ));
        assert!(matches!(
            OperationalMeasurement::from_secs("m", 0.01, -1.0),
            Err(ScorecardError::InvalidMeasurement { .. })
        ));
        assert!(matches!(
            OperationalMeasurement::from_secs("m", f64::NAN, 1.0),
            Err(ScorecardError::InvalidMeasurement { .. })
        ));
    }

    #[test]
    fn test_zero_is_allowed() {
        let m = OperationalMeasurement::new("m", 0.0, Duration::ZERO).unwrap();
        assert_eq!(m.elapsed_secs(), 0.0);
    }
}
