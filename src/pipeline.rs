//! One-shot scoring of a judge batch.

use crate::aggregator::{Aggregator, Scorecard};
use crate::batch::EvaluationBatch;
use crate::comparison::ComparisonTable;
use crate::criterion::CriterionRegistry;
use crate::error::Result;
use crate::record::OperationalMeasurement;
use crate::run::RunContext;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Options for [`evaluate_batch`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PipelineOptions {
    /// Let later scores for the same subject/criterion replace earlier ones.
    pub allow_overwrite: bool,
}

/// Outcome of scoring one batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub batch_name: String,
    pub finished_at: DateTime<Utc>,
    pub scorecards: Vec<Scorecard>,
    pub table: ComparisonTable,
}

/// Register, validate, ingest and finalize every entry of a batch.
///
/// The first invalid entry aborts the run; nothing partial is returned.
#[instrument(skip(registry, batch, options), fields(batch = %batch.name))]
pub fn evaluate_batch(
    registry: Arc<CriterionRegistry>,
    batch: &EvaluationBatch,
    options: PipelineOptions,
) -> Result<RunReport> {
    let mut ctx = RunContext::new(registry)?;
    for subject in batch.subject_order() {
        ctx.register_subject(subject)?;
    }

    let timestamp = batch.timestamp.unwrap_or_else(Utc::now);
    let mut aggregator = Aggregator::new(ctx);

    for score in &batch.scores {
        let record = aggregator.context().validate_at(
            &score.subject_id,
            &score.criterion_id,
            score.value,
            timestamp,
        )?;
        aggregator.ingest(record, options.allow_overwrite)?;
    }

    for m in &batch.measurements {
        let measurement = OperationalMeasurement::from_secs(&m.subject_id, m.total_cost, m.elapsed_secs)?;
        aggregator.record_measurement(measurement, options.allow_overwrite)?;
    }

    let sealed = aggregator.seal();
    let scorecards = sealed.finalize_all()?;
    let table = ComparisonTable::build(sealed.context().registry(), &scorecards)?;

    info!(
        run_id = %sealed.context().id(),
        subjects = scorecards.len(),
        "batch scored"
    );

    Ok(RunReport {
        run_id: sealed.context().id(),
        batch_name: batch.name.clone(),
        finished_at: Utc::now(),
        scorecards,
        table,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::criterion::EvaluatorMode;
    use crate::error::ScorecardError;

    fn rag_batch() -> EvaluationBatch {
        let registry = EvaluatorMode::Rag.registry();
        let mut batch = EvaluationBatch::new("rag");
        for (subject, faith) in [("kb-a", 0.7), ("kb-b", 0.9)] {
            for criterion in registry.ids() {
                let value = if criterion == "faithfulness" { faith } else { 1.0 };
                batch.add_score(subject, criterion, value);
            }
            batch.add_measurement(subject, 0.01, 2.0);
        }
        batch
    }

    #[test]
    fn test_evaluate_batch() {
        let report = evaluate_batch(
            Arc::new(EvaluatorMode::Rag.registry()),
            &rag_batch(),
            PipelineOptions::default(),
        )
        .unwrap();
        assert_eq!(report.scorecards.len(), 2);
        assert_eq!(report.table.value("kb-b", "faithfulness"), Some(0.9));
    }

    #[test]
    fn test_empty_batch() {
        let result = evaluate_batch(
            Arc::new(EvaluatorMode::Rag.registry()),
            &EvaluationBatch::new("empty"),
            PipelineOptions::default(),
        );
        assert!(matches!(result, Err(ScorecardError::EmptyRun)));
    }

    #[test]
    fn test_resubmitted_entries_are_idempotent() {
        let mut batch = rag_batch();
        let repeated = batch.scores[0].clone();
        batch.scores.push(repeated);
        assert!(evaluate_batch(
            Arc::new(EvaluatorMode::Rag.registry()),
            &batch,
            PipelineOptions::default()
        )
        .is_ok());
    }

    #[test]
    fn test_conflicting_entries_need_overwrite() {
        let mut batch = rag_batch();
        let mut conflicting = batch.scores[0].clone();
        conflicting.value = 0.0;
        batch.scores.push(conflicting);

        let registry = Arc::new(EvaluatorMode::Rag.registry());
        assert!(matches!(
            evaluate_batch(registry.clone(), &batch, PipelineOptions::default()),
            Err(ScorecardError::DuplicateMetric { .. })
        ));
        let report = evaluate_batch(
            registry,
            &batch,
            PipelineOptions {
                allow_overwrite: true,
            },
        )
        .unwrap();
        let first = &batch.scores[0];
        assert_eq!(
            report.table.value(&first.subject_id, &first.criterion_id),
            Some(0.0)
        );
    }
}
