//! Evaluation run context and metric validation.
//!
//! One [`RunContext`] exists per evaluation run. It owns the list of
//! subjects being compared and shares the frozen criterion registry, so
//! independent runs can be validated side by side without any shared
//! mutable state.

use crate::criterion::CriterionRegistry;
use crate::error::{Result, ScorecardError};
use crate::record::MetricRecord;
use chrono::{DateTime, Utc};
use indexmap::IndexSet;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Per-run state: frozen criteria plus the registered subjects.
#[derive(Debug, Clone)]
pub struct RunContext {
    id: Uuid,
    started_at: DateTime<Utc>,
    registry: Arc<CriterionRegistry>,
    subjects: IndexSet<String>,
}

impl RunContext {
    /// Start a run over a frozen registry.
    pub fn new(registry: Arc<CriterionRegistry>) -> Result<Self> {
        if !registry.is_frozen() {
            return Err(ScorecardError::RegistryNotFrozen);
        }
        let ctx = Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            registry,
            subjects: IndexSet::new(),
        };
        info!(run_id = %ctx.id, criteria = ctx.registry.len(), "evaluation run started");
        Ok(ctx)
    }

    /// Unique id of this run.
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// When the run was started.
    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// The criteria this run validates against.
    pub fn registry(&self) -> &CriterionRegistry {
        &self.registry
    }

    /// Shared handle to the registry.
    pub fn registry_handle(&self) -> Arc<CriterionRegistry> {
        Arc::clone(&self.registry)
    }

    /// Register a subject. Registration order is the scorecard order.
    pub fn register_subject(&mut self, subject_id: impl Into<String>) -> Result<()> {
        let subject_id = subject_id.into();
        if self.subjects.contains(&subject_id) {
            return Err(ScorecardError::DuplicateSubject(subject_id));
        }
        debug!(run_id = %self.id, subject = %subject_id, "registered subject");
        self.subjects.insert(subject_id);
        Ok(())
    }

    /// Whether the subject takes part in this run.
    pub fn has_subject(&self, subject_id: &str) -> bool {
        self.subjects.contains(subject_id)
    }

    /// Subjects in registration order.
    pub fn subjects(&self) -> impl Iterator<Item = &str> {
        self.subjects.iter().map(String::as_str)
    }

    /// Number of registered subjects.
    pub fn subject_count(&self) -> usize {
        self.subjects.len()
    }

    /// Validate a raw judge score, stamping it with the current time.
    pub fn validate(&self, subject_id: &str, criterion_id: &str, raw_value: f64) -> Result<MetricRecord> {
        self.validate_at(subject_id, criterion_id, raw_value, Utc::now())
    }

    /// Validate a raw judge score produced at `run_timestamp`.
    ///
    /// The value is checked against the criterion's domain and returned
    /// unchanged; nothing is clamped or rounded.
    pub fn validate_at(
        &self,
        subject_id: &str,
        criterion_id: &str,
        raw_value: f64,
        run_timestamp: DateTime<Utc>,
    ) -> Result<MetricRecord> {
        self.check(subject_id, criterion_id, raw_value)?;
        Ok(MetricRecord {
            subject_id: subject_id.to_string(),
            criterion_id: criterion_id.to_string(),
            value: raw_value,
            run_timestamp,
        })
    }

    /// Re-check an existing record against this run.
    pub(crate) fn check_record(&self, record: &MetricRecord) -> Result<()> {
        self.check(&record.subject_id, &record.criterion_id, record.value)
    }

    fn check(&self, subject_id: &str, criterion_id: &str, value: f64) -> Result<()> {
        if !self.has_subject(subject_id) {
            return Err(ScorecardError::UnknownSubject(subject_id.to_string()));
        }
        let domain = self.registry.domain_of(criterion_id)?;
        if !domain.contains(value) {
            return Err(ScorecardError::OutOfDomain {
                subject_id: subject_id.to_string(),
                criterion_id: criterion_id.to_string(),
                value,
                domain,
            });
        }
        Ok(())
    }
}
