//! LLM Scorecard - criterion scoring and result aggregation for model and
//! RAG knowledge-base evaluations.
//!
//! Raw per-subject, per-criterion scores produced by an external judge
//! (an LLM evaluator or RAGAS) are validated against a fixed criterion
//! registry, assembled into per-subject scorecards, and turned into a
//! comparison table with rankings and deltas.
//!
//! # Overview
//!
//! A run goes through these stages:
//! 1. Build and freeze a [`CriterionRegistry`] (usually [`EvaluatorMode::registry`])
//! 2. Create a [`RunContext`] from it and register the subjects
//! 3. Validate raw scores into [`MetricRecord`]s and ingest them into an [`Aggregator`]
//! 4. Seal the aggregator and finalize one [`Scorecard`] per subject
//! 5. Build a [`ComparisonTable`] and rank subjects with [`rank_by`]
//!
//! # Quick Start
//!
//! ```no_run
//! use llm_scorecard::{
//!     Aggregator, ComparisonTable, EvaluatorMode, OperationalMeasurement, RunContext, rank_by,
//! };
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! fn main() -> llm_scorecard::Result<()> {
//!     let registry = Arc::new(EvaluatorMode::Summarization.registry());
//!
//!     let mut ctx = RunContext::new(registry.clone())?;
//!     ctx.register_subject("anthropic.claude-3-haiku-20240307-v1:0")?;
//!
//!     let mut aggregator = Aggregator::new(ctx);
//!     for criterion in registry.ids() {
//!         let record = aggregator
//!             .context()
//!             .validate("anthropic.claude-3-haiku-20240307-v1:0", criterion, 4.0)?;
//!         aggregator.ingest(record, false)?;
//!     }
//!     aggregator.record_measurement(
//!         OperationalMeasurement::new(
//!             "anthropic.claude-3-haiku-20240307-v1:0",
//!             0.002,
//!             Duration::from_millis(1300),
//!         )?,
//!         false,
//!     )?;
//!
//!     let scorecards = aggregator.seal().finalize_all()?;
//!     let table = ComparisonTable::build(&registry, &scorecards)?;
//!     println!("{}", table.format());
//!     println!("{:?}", rank_by(&table, "accuracy")?);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - **CriterionRegistry**: Declared criteria with value domains and polarity
//! - **RunContext**: Per-run state; no process-wide globals
//! - **Aggregator / SealedRun**: Ingestion, then read-only finalization
//! - **ComparisonTable**: Derived view with rankings and deltas
//! - **EvaluationBatch / evaluate_batch**: File-driven one-shot runs

pub mod aggregator;
pub mod batch;
pub mod comparison;
pub mod config;
pub mod criterion;
pub mod error;
pub mod judge;
pub mod persistence;
pub mod pipeline;
pub mod pricing;
pub mod record;
pub mod run;
pub mod telemetry;

// Re-export commonly used types
pub use aggregator::{Aggregator, Scorecard, SealedRun};
pub use batch::EvaluationBatch;
pub use comparison::{ComparisonTable, Delta, deltas, rank_by, rank_by_cost, rank_by_elapsed};
pub use config::Config;
pub use criterion::{Criterion, CriterionRegistry, EvaluatorMode, Polarity, ValueDomain};
pub use error::{Result, ScorecardError};
pub use judge::{JudgeVerdict, parse_verdict};
pub use persistence::{load_table, save_table};
pub use pipeline::{PipelineOptions, RunReport, evaluate_batch};
pub use pricing::{InvocationCost, PriceTable, TokenPrice};
pub use record::{MetricRecord, OperationalMeasurement};
pub use run::RunContext;
