//! Scorecard aggregation.
//!
//! The [`Aggregator`] collects validated metric records and operational
//! measurements for one run and turns them into per-subject
//! [`Scorecard`]s. It never averages or weights criteria: every score
//! stands alone on the scorecard next to the raw cost and time.
//!
//! Ingestion needs `&mut Aggregator`, so a run has exactly one writer.
//! Once ingestion is done, [`Aggregator::seal`] turns it into a
//! [`SealedRun`] that can be shared across threads for finalization.

use crate::error::{Result, ScorecardError};
use crate::record::{MetricRecord, OperationalMeasurement};
use crate::run::RunContext;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Complete set of criterion scores plus cost/time for one subject.
///
/// Only produced by finalizing an [`Aggregator`] or [`SealedRun`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scorecard {
    subject_id: String,
    records: Vec<MetricRecord>,
    measurement: OperationalMeasurement,
}

impl Scorecard {
    /// Evaluated model or knowledge base.
    pub fn subject_id(&self) -> &str {
        &self.subject_id
    }

    /// One record per reported criterion, in registry order.
    pub fn records(&self) -> &[MetricRecord] {
        &self.records
    }

    /// Cost and latency of the subject's invocation.
    pub fn measurement(&self) -> &OperationalMeasurement {
        &self.measurement
    }

    /// Record for a criterion, if reported.
    pub fn record(&self, criterion_id: &str) -> Option<&MetricRecord> {
        self.records.iter().find(|r| r.criterion_id == criterion_id)
    }

    /// Value for a criterion, if reported.
    pub fn value(&self, criterion_id: &str) -> Option<f64> {
        self.record(criterion_id).map(|r| r.value)
    }

    /// Total invocation cost.
    pub fn total_cost(&self) -> f64 {
        self.measurement.total_cost
    }

    /// Elapsed seconds.
    pub fn elapsed_secs(&self) -> f64 {
        self.measurement.elapsed_secs()
    }
}

#[derive(Debug, Clone, Default)]
struct SubjectEntry {
    records: HashMap<String, MetricRecord>,
    measurement: Option<OperationalMeasurement>,
}

/// Collects records for one run.
#[derive(Debug, Clone)]
pub struct Aggregator {
    ctx: RunContext,
    entries: IndexMap<String, SubjectEntry>,
}

impl Aggregator {
    /// Create an aggregator for a run.
    pub fn new(ctx: RunContext) -> Self {
        Self {
            ctx,
            entries: IndexMap::new(),
        }
    }

    /// The run this aggregator belongs to.
    pub fn context(&self) -> &RunContext {
        &self.ctx
    }

    /// Mutable access to the run, e.g. to register more subjects before ingestion.
    pub fn context_mut(&mut self) -> &mut RunContext {
        &mut self.ctx
    }

    /// Add a validated record.
    ///
    /// Re-submitting an identical record is a no-op. A different record
    /// for the same subject/criterion pair is rejected with
    /// [`ScorecardError::DuplicateMetric`] unless `allow_overwrite` is set,
    /// in which case it replaces the earlier one.
    pub fn ingest(&mut self, record: MetricRecord, allow_overwrite: bool) -> Result<()> {
        self.ctx.check_record(&record)?;

        let entry = self.entries.entry(record.subject_id.clone()).or_default();
        if let Some(existing) = entry.records.get(&record.criterion_id) {
            if *existing == record {
                debug!(
                    subject = %record.subject_id,
                    criterion = %record.criterion_id,
                    "identical record re-submitted, ignoring"
                );
                return Ok(());
            }
            if !allow_overwrite {
                return Err(ScorecardError::DuplicateMetric {
                    subject_id: record.subject_id,
                    criterion_id: record.criterion_id,
                });
            }
            warn!(
                subject = %record.subject_id,
                criterion = %record.criterion_id,
                old = existing.value,
                new = record.value,
                "overwriting metric record"
            );
        }

        debug!(
            subject = %record.subject_id,
            criterion = %record.criterion_id,
            value = record.value,
            "ingested metric record"
        );
        entry.records.insert(record.criterion_id.clone(), record);
        Ok(())
    }

    /// Add a subject's cost/time measurement, with the same duplicate rule as [`ingest`](Self::ingest).
    pub fn record_measurement(
        &mut self,
        measurement: OperationalMeasurement,
        allow_overwrite: bool,
    ) -> Result<()> {
        if !self.ctx.has_subject(&measurement.subject_id) {
            return Err(ScorecardError::UnknownSubject(measurement.subject_id));
        }

        let entry = self.entries.entry(measurement.subject_id.clone()).or_default();
        match &entry.measurement {
            Some(existing) if *existing == measurement => return Ok(()),
            Some(_) if !allow_overwrite => {
                return Err(ScorecardError::DuplicateMeasurement(measurement.subject_id));
            }
            Some(_) => warn!(subject = %measurement.subject_id, "overwriting operational measurement"),
            None => {}
        }

        debug!(
            subject = %measurement.subject_id,
            total_cost = measurement.total_cost,
            elapsed_secs = measurement.elapsed_secs(),
            "recorded operational measurement"
        );
        entry.measurement = Some(measurement);
        Ok(())
    }

    /// Build the scorecard for one subject.
    pub fn finalize(&self, subject_id: &str) -> Result<Scorecard> {
        finalize_entry(&self.ctx, &self.entries, subject_id)
    }

    /// Build scorecards for every registered subject, in registration order.
    pub fn finalize_all(&self) -> Result<Vec<Scorecard>> {
        finalize_entries(&self.ctx, &self.entries)
    }

    /// End ingestion. The returned run is immutable.
    pub fn seal(self) -> SealedRun {
        info!(
            run_id = %self.ctx.id(),
            subjects = self.ctx.subject_count(),
            "ingestion sealed"
        );
        SealedRun {
            ctx: self.ctx,
            entries: self.entries,
        }
    }
}

/// A run whose ingestion has finished.
///
/// Holds no interior mutability, so it is `Send + Sync` and can be
/// finalized from any thread.
#[derive(Debug, Clone)]
pub struct SealedRun {
    ctx: RunContext,
    entries: IndexMap<String, SubjectEntry>,
}

impl SealedRun {
    /// The run this data belongs to.
    pub fn context(&self) -> &RunContext {
        &self.ctx
    }

    /// Build the scorecard for one subject.
    pub fn finalize(&self, subject_id: &str) -> Result<Scorecard> {
        finalize_entry(&self.ctx, &self.entries, subject_id)
    }

    /// Build scorecards for every registered subject, in registration order.
    pub fn finalize_all(&self) -> Result<Vec<Scorecard>> {
        finalize_entries(&self.ctx, &self.entries)
    }
}

fn finalize_entries(ctx: &RunContext, entries: &IndexMap<String, SubjectEntry>) -> Result<Vec<Scorecard>> {
    let scorecards = ctx
        .subjects()
        .map(|subject_id| finalize_entry(ctx, entries, subject_id))
        .collect::<Result<Vec<_>>>()?;
    info!(run_id = %ctx.id(), scorecards = scorecards.len(), "finalized run");
    Ok(scorecards)
}

fn finalize_entry(
    ctx: &RunContext,
    entries: &IndexMap<String, SubjectEntry>,
    subject_id: &str,
) -> Result<Scorecard> {
    if !ctx.has_subject(subject_id) {
        return Err(ScorecardError::UnknownSubject(subject_id.to_string()));
    }

    let empty = SubjectEntry::default();
    let entry = entries.get(subject_id).unwrap_or(&empty);

    let mut records = Vec::with_capacity(entry.records.len());
    let mut missing = Vec::new();
    for criterion in ctx.registry().criteria() {
        match entry.records.get(&criterion.id) {
            Some(record) => records.push(record.clone()),
            None if criterion.required => missing.push(criterion.id.clone()),
            None => {}
        }
    }

    match (&entry.measurement, missing.is_empty()) {
        (Some(measurement), true) => Ok(Scorecard {
            subject_id: subject_id.to_string(),
            records,
            measurement: measurement.clone(),
        }),
        (measurement, _) => Err(ScorecardError::IncompleteScorecard {
            subject_id: subject_id.to_string(),
            missing_criteria: missing,
            missing_measurement: measurement.is_none(),
        }),
    }
}
