//! End-to-end scoring scenarios for both evaluator modes.

use chrono::{TimeZone, Utc};
use llm_scorecard::{
    Aggregator, ComparisonTable, Criterion, CriterionRegistry, EvaluationBatch, EvaluatorMode,
    OperationalMeasurement, PipelineOptions, RunContext, ScorecardError, ValueDomain, evaluate_batch,
    persistence::{load_table, save_report, save_table},
    rank_by, rank_by_cost,
};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

const HAIKU: &str = "anthropic.claude-3-haiku-20240307-v1:0";

fn haiku_scores() -> Vec<(&'static str, f64)> {
    vec![
        ("cost_efficiency", 5.0),
        ("speed", 4.0),
        ("accuracy", 4.0),
        ("completeness", 3.0),
        ("logical_flow", 4.0),
        ("structure", 5.0),
        ("conciseness", 3.0),
        ("clarity", 4.0),
        ("objectivity", 5.0),
        ("tone_consistency", 4.0),
        ("adherence_to_instructions", 2.0),
    ]
}

#[test]
fn test_claude_3_haiku_summarization_scenario() {
    let expected = [
        ("cost_efficiency", 4.0),
        ("speed", 5.0),
        ("accuracy", 3.0),
        ("completeness", 4.0),
        ("logical_flow", 4.0),
        ("structure", 3.0),
        ("conciseness", 5.0),
        ("clarity", 4.0),
        ("objectivity", 5.0),
        ("tone_consistency", 4.0),
        ("adherence_to_instructions", 5.0),
    ];

    let registry = Arc::new(EvaluatorMode::Summarization.registry());
    let mut ctx = RunContext::new(registry).unwrap();
    ctx.register_subject("claude-3-haiku").unwrap();

    let mut aggregator = Aggregator::new(ctx);
    for (criterion, value) in expected {
        let record = aggregator
            .context()
            .validate("claude-3-haiku", criterion, value)
            .unwrap();
        aggregator.ingest(record, false).unwrap();
    }
    aggregator
        .record_measurement(
            OperationalMeasurement::from_secs("claude-3-haiku", 0.002, 1.3).unwrap(),
            false,
        )
        .unwrap();

    let card = aggregator.seal().finalize("claude-3-haiku").unwrap();
    assert_eq!(card.subject_id(), "claude-3-haiku");
    assert_eq!(card.records().len(), 11);
    for (criterion, value) in expected {
        assert_eq!(card.value(criterion), Some(value), "{}", criterion);
    }
    assert_eq!(card.measurement().total_cost, 0.002);
    assert!((card.elapsed_secs() - 1.3).abs() < 1e-9);
}

#[test]
fn test_haiku_summarization_scorecard() {
    let registry = Arc::new(EvaluatorMode::Summarization.registry());
    let mut ctx = RunContext::new(registry.clone()).unwrap();
    ctx.register_subject(HAIKU).unwrap();

    let mut aggregator = Aggregator::new(ctx);
    for (criterion, value) in haiku_scores() {
        let record = aggregator.context().validate(HAIKU, criterion, value).unwrap();
        aggregator.ingest(record, false).unwrap();
    }
    aggregator
        .record_measurement(
            OperationalMeasurement::new(HAIKU, 0.002, Duration::from_millis(1300)).unwrap(),
            false,
        )
        .unwrap();

    let card = aggregator.seal().finalize(HAIKU).unwrap();
    assert_eq!(card.records().len(), 11);
    for (criterion, value) in haiku_scores() {
        assert_eq!(card.value(criterion), Some(value), "{}", criterion);
    }
    assert_eq!(card.total_cost(), 0.002);
    assert!((card.elapsed_secs() - 1.3).abs() < 1e-9);

    let ids: Vec<&str> = card.records().iter().map(|r| r.criterion_id.as_str()).collect();
    let declared: Vec<&str> = registry.ids().collect();
    assert_eq!(ids, declared);
}

#[test]
fn test_rag_binary_criterion_rejects_two() {
    let registry = Arc::new(EvaluatorMode::Rag.registry());
    let mut ctx = RunContext::new(registry).unwrap();
    ctx.register_subject("kb-chunk-200-overlap-20").unwrap();

    let err = ctx
        .validate("kb-chunk-200-overlap-20", "harmfulness", 2.0)
        .unwrap_err();
    match err {
        ScorecardError::OutOfDomain {
            subject_id,
            criterion_id,
            value,
            domain,
        } => {
            assert_eq!(subject_id, "kb-chunk-200-overlap-20");
            assert_eq!(criterion_id, "harmfulness");
            assert_eq!(value, 2.0);
            assert_eq!(domain, ValueDomain::Binary);
        }
        other => panic!("expected OutOfDomain, got {:?}", other),
    }
}

#[test]
fn test_incomplete_scorecard_names_missing_criteria() {
    let registry = Arc::new(EvaluatorMode::Summarization.registry());
    let mut ctx = RunContext::new(registry).unwrap();
    ctx.register_subject(HAIKU).unwrap();

    let mut aggregator = Aggregator::new(ctx);
    for (criterion, value) in haiku_scores()
        .into_iter()
        .filter(|(c, _)| *c != "clarity" && *c != "speed")
    {
        let record = aggregator.context().validate(HAIKU, criterion, value).unwrap();
        aggregator.ingest(record, false).unwrap();
    }

    match aggregator.finalize(HAIKU).unwrap_err() {
        ScorecardError::IncompleteScorecard {
            subject_id,
            missing_criteria,
            missing_measurement,
        } => {
            assert_eq!(subject_id, HAIKU);
            assert_eq!(missing_criteria, vec!["speed", "clarity"]);
            assert!(missing_measurement);
        }
        other => panic!("expected IncompleteScorecard, got {:?}", other),
    }
}

#[test]
fn test_duplicate_and_overwrite() {
    let registry = Arc::new(EvaluatorMode::Summarization.registry());
    let mut ctx = RunContext::new(registry).unwrap();
    ctx.register_subject(HAIKU).unwrap();
    let mut aggregator = Aggregator::new(ctx);

    let first_at = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
    let second_at = Utc.with_ymd_and_hms(2024, 5, 1, 11, 0, 0).unwrap();

    let first = aggregator.context().validate_at(HAIKU, "accuracy", 3.0, first_at).unwrap();
    let second = aggregator.context().validate_at(HAIKU, "accuracy", 3.0, second_at).unwrap();

    aggregator.ingest(first.clone(), false).unwrap();
    aggregator.ingest(first, false).unwrap();
    assert!(matches!(
        aggregator.ingest(second.clone(), false),
        Err(ScorecardError::DuplicateMetric { .. })
    ));
    aggregator.ingest(second, true).unwrap();
}

#[test]
fn test_rank_ties_broken_by_subject() {
    let mut registry = CriterionRegistry::new();
    registry
        .register(Criterion::new("clarity", "Clarity", ValueDomain::Ordinal0to5))
        .unwrap();
    registry.freeze();

    let mut batch = EvaluationBatch::new("ties");
    for (subject, value) in [("A", 3.0), ("B", 5.0), ("C", 5.0)] {
        batch.add_score(subject, "clarity", value);
        batch.add_measurement(subject, 0.01, 1.0);
    }

    let report = evaluate_batch(Arc::new(registry), &batch, PipelineOptions::default()).unwrap();
    assert_eq!(rank_by(&report.table, "clarity").unwrap(), vec!["B", "C", "A"]);
    assert!(matches!(
        rank_by(&report.table, "accuracy"),
        Err(ScorecardError::UnknownCriterion(_))
    ));
}

#[test]
fn test_signed_zero_scores_tie_by_subject() {
    let mut registry = CriterionRegistry::new();
    registry
        .register(Criterion::new("faithfulness", "Faithfulness", ValueDomain::Unit0to1))
        .unwrap();
    registry.freeze();

    let csv = "subject_id,faithfulness,elapsed_secs,total_cost\n\
               A,-0,1,-0\n\
               B,0,1,0\n";
    let mut batch = EvaluationBatch::from_csv(csv).unwrap();
    batch.subjects.reverse();

    let report = evaluate_batch(Arc::new(registry), &batch, PipelineOptions::default()).unwrap();
    assert_eq!(rank_by(&report.table, "faithfulness").unwrap(), vec!["A", "B"]);
    assert_eq!(rank_by_cost(&report.table), vec!["A", "B"]);
}

#[test]
fn test_empty_run() {
    let registry = EvaluatorMode::Rag.registry();
    assert!(matches!(
        ComparisonTable::build(&registry, &[]),
        Err(ScorecardError::EmptyRun)
    ));
}

fn rag_batch(name: &str, subjects: &[(&str, f64, f64)]) -> EvaluationBatch {
    let registry = EvaluatorMode::Rag.registry();
    let mut batch = EvaluationBatch::new(name);
    batch.mode = Some(EvaluatorMode::Rag);
    for (subject, faithfulness, cost) in subjects {
        for criterion in registry.ids() {
            let value = match criterion {
                "faithfulness" => *faithfulness,
                "harmfulness" | "maliciousness" => 0.0,
                _ => 1.0,
            };
            batch.add_score(*subject, criterion, value);
        }
        batch.add_measurement(*subject, *cost, 3.0);
    }
    batch
}

#[test]
fn test_rag_batch_ranking_and_report() {
    let batch = rag_batch(
        "kb-sweep",
        &[
            ("kb-chunk-200-overlap-20", 0.81, 0.012),
            ("kb-chunk-500-overlap-50", 0.93, 0.020),
            ("kb-chunk-1000-overlap-100", 0.77, 0.009),
        ],
    );
    let report = evaluate_batch(
        Arc::new(EvaluatorMode::Rag.registry()),
        &batch,
        PipelineOptions::default(),
    )
    .unwrap();

    assert_eq!(report.table.columns().len(), 14);
    assert_eq!(
        rank_by(&report.table, "faithfulness").unwrap(),
        vec![
            "kb-chunk-500-overlap-50",
            "kb-chunk-200-overlap-20",
            "kb-chunk-1000-overlap-100"
        ]
    );
    assert_eq!(rank_by_cost(&report.table)[0], "kb-chunk-1000-overlap-100");

    let dir = TempDir::new().unwrap();
    let table_path = dir.path().join("table.bin");
    save_table(&report.table, &table_path).unwrap();
    assert_eq!(load_table(&table_path).unwrap(), report.table);

    let report_path = dir.path().join("report.json");
    save_report(&report, &report_path).unwrap();
    let saved: llm_scorecard::RunReport =
        serde_json::from_str(&std::fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(saved.run_id, report.run_id);
}

#[test]
fn test_parallel_runs_are_independent() {
    let registry = Arc::new(EvaluatorMode::Rag.registry());

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                let subject = format!("kb-{}", i);
                let batch = rag_batch(&format!("run-{}", i), &[(subject.as_str(), 0.5, 0.01)]);
                evaluate_batch(registry, &batch, PipelineOptions::default()).unwrap()
            })
        })
        .collect();

    let reports: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    for (i, report) in reports.iter().enumerate() {
        let subjects: Vec<&str> = report.table.subjects().collect();
        assert_eq!(subjects, vec![format!("kb-{}", i)]);
    }
    let mut run_ids: Vec<_> = reports.iter().map(|r| r.run_id).collect();
    run_ids.sort();
    run_ids.dedup();
    assert_eq!(run_ids.len(), 4);
}

#[test]
fn test_sealed_run_shared_across_threads() {
    let registry = Arc::new(EvaluatorMode::Summarization.registry());
    let mut ctx = RunContext::new(registry).unwrap();
    ctx.register_subject(HAIKU).unwrap();
    let mut aggregator = Aggregator::new(ctx);
    for (criterion, value) in haiku_scores() {
        let record = aggregator.context().validate(HAIKU, criterion, value).unwrap();
        aggregator.ingest(record, false).unwrap();
    }
    aggregator
        .record_measurement(OperationalMeasurement::from_secs(HAIKU, 0.002, 1.3).unwrap(), false)
        .unwrap();

    let sealed = Arc::new(aggregator.seal());
    let handles: Vec<_> = (0..3)
        .map(|_| {
            let sealed = Arc::clone(&sealed);
            thread::spawn(move || sealed.finalize_all().unwrap())
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert!(results.windows(2).all(|w| w[0] == w[1]));
}
