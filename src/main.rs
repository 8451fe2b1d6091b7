//! LLM Scorecard CLI
//!
//! Scores judge batches against a criterion set and compares the subjects.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use llm_scorecard::{
    EvaluationBatch, EvaluatorMode, RunReport,
    comparison::{Delta, cost_deltas, deltas, elapsed_deltas, rank_by, rank_by_cost, rank_by_elapsed},
    config::Config,
    criterion::Polarity,
    judge::parse_verdict,
    persistence::{ReportFormat, load_table, report_path, save_table},
    pipeline::{PipelineOptions, evaluate_batch},
    telemetry::init_tracing,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;

/// LLM Scorecard - validate, aggregate and compare evaluation scores
#[derive(Parser)]
#[command(name = "scorecard")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the criteria of an evaluator mode
    Criteria {
        /// Evaluator mode (summarization or rag)
        #[arg(short, long)]
        mode: Option<EvaluatorMode>,
    },

    /// Score one or more judge batches, each as an independent run
    Score {
        /// Batch files (JSON, YAML or CSV)
        #[arg(required = true)]
        batches: Vec<PathBuf>,

        /// Evaluator mode, overriding the batch and config
        #[arg(short, long)]
        mode: Option<EvaluatorMode>,

        /// Output path for the comparison table (single batch only)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Let later scores replace earlier ones for the same subject and criterion
        #[arg(long)]
        allow_overwrite: bool,

        /// Print the full run report as JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Rank the subjects of a batch
    Rank {
        /// Batch file (JSON, YAML or CSV)
        batch: PathBuf,

        /// Criterion to rank on
        #[arg(short, long, conflicts_with_all = ["cost", "elapsed"])]
        criterion: Option<String>,

        /// Rank by total cost, cheapest first
        #[arg(long, conflicts_with = "elapsed")]
        cost: bool,

        /// Rank by elapsed time, fastest first
        #[arg(long)]
        elapsed: bool,

        /// Evaluator mode, overriding the batch and config
        #[arg(short, long)]
        mode: Option<EvaluatorMode>,
    },

    /// Calculate the cost of one model invocation
    Price {
        /// Model id (e.g. anthropic.claude-3-haiku-20240307-v1:0)
        #[arg(long)]
        model: String,

        /// Input token count
        #[arg(long)]
        input_tokens: u64,

        /// Output token count
        #[arg(long)]
        output_tokens: u64,
    },

    /// Parse a raw judge response and optionally check it against a criterion
    Verdict {
        /// File containing the judge response
        file: PathBuf,

        /// Criterion whose domain the score must fall in
        #[arg(short, long)]
        criterion: Option<String>,

        /// Evaluator mode used to look up the criterion
        #[arg(short, long)]
        mode: Option<EvaluatorMode>,
    },

    /// Display a saved comparison table
    Show {
        /// Path to the table file (JSON or bincode)
        table: PathBuf,

        /// Output as JSON instead of formatted table
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load().context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;
    init_tracing(&config.logging).context("Failed to initialize logging")?;

    match cli.command {
        Commands::Criteria { mode } => cmd_criteria(&config, mode),
        Commands::Score {
            batches,
            mode,
            output,
            allow_overwrite,
            json,
        } => cmd_score(&config, batches, mode, output, allow_overwrite, json).await,
        Commands::Rank {
            batch,
            criterion,
            cost,
            elapsed,
            mode,
        } => cmd_rank(&config, batch, criterion, cost, elapsed, mode),
        Commands::Price {
            model,
            input_tokens,
            output_tokens,
        } => cmd_price(&config, &model, input_tokens, output_tokens),
        Commands::Verdict {
            file,
            criterion,
            mode,
        } => cmd_verdict(&config, file, criterion, mode),
        Commands::Show { table, json } => cmd_show(table, json),
    }
}

/// Command line mode first, then the batch's own mode, then config.
fn resolve_mode(config: &Config, cli_mode: Option<EvaluatorMode>, batch: &EvaluationBatch) -> EvaluatorMode {
    cli_mode.or(batch.mode).unwrap_or(config.evaluation.mode)
}

fn cmd_criteria(config: &Config, mode: Option<EvaluatorMode>) -> Result<()> {
    let mode = mode.unwrap_or(config.evaluation.mode);
    let registry = mode.registry();

    println!("Criteria for {} mode ({})", mode, registry.len());
    println!("{}", "─".repeat(72));
    for criterion in registry.criteria() {
        let direction = match criterion.polarity {
            Polarity::HigherIsBetter => "higher is better",
            Polarity::LowerIsBetter => "lower is better",
        };
        println!(
            "  {:<28} {:<22} {}{}",
            criterion.id,
            criterion.domain.to_string(),
            direction,
            if criterion.required { "" } else { " (optional)" }
        );
    }

    Ok(())
}

async fn cmd_score(
    config: &Config,
    batches: Vec<PathBuf>,
    mode: Option<EvaluatorMode>,
    output: Option<PathBuf>,
    allow_overwrite: bool,
    json: bool,
) -> Result<()> {
    if output.is_some() && batches.len() > 1 {
        anyhow::bail!("--output can only be used with a single batch");
    }

    let options = PipelineOptions {
        allow_overwrite: allow_overwrite || config.evaluation.allow_overwrite,
    };
    let summarization = Arc::new(EvaluatorMode::Summarization.registry());
    let rag = Arc::new(EvaluatorMode::Rag.registry());

    let start = Instant::now();
    let mut runs = JoinSet::new();
    for (idx, path) in batches.iter().enumerate() {
        let batch = EvaluationBatch::load(path)
            .with_context(|| format!("Failed to load batch '{}'", path.display()))?;
        let registry = match resolve_mode(config, mode, &batch) {
            EvaluatorMode::Summarization => summarization.clone(),
            EvaluatorMode::Rag => rag.clone(),
        };
        runs.spawn_blocking(move || (idx, evaluate_batch(registry, &batch, options)));
    }

    let mut reports: Vec<Option<RunReport>> = vec![None; batches.len()];
    while let Some(joined) = runs.join_next().await {
        let (idx, result) = joined.context("Scoring task panicked")?;
        let report = result.with_context(|| format!("Failed to score '{}'", batches[idx].display()))?;
        reports[idx] = Some(report);
    }

    for report in reports.into_iter().flatten() {
        if json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            println!("Batch: {} (run {})", report.batch_name, report.run_id);
            println!("{}", "─".repeat(60));
            println!("{}", report.table.format());
        }

        let path = output.clone().unwrap_or_else(|| {
            report_path(
                &config.reports.output_dir,
                &report.batch_name,
                ReportFormat::Json,
                Utc::now(),
            )
        });
        save_table(&report.table, &path).context("Failed to save comparison table")?;
        if !json {
            println!("Table saved to: {}\n", path.display());
        }
    }

    if !json {
        println!("Scored {} batch(es) in {:.2?}", batches.len(), start.elapsed());
    }

    Ok(())
}

fn print_deltas(deltas: &[Delta]) {
    for delta in deltas {
        let percent = delta
            .percent
            .map(|p| format!("{:+.1}%", p))
            .unwrap_or_else(|| "n/a".to_string());
        println!(
            "    {:<40} {:>12.6} ({:+.6}, {})",
            delta.subject_id, delta.value, delta.absolute, percent
        );
    }
}

fn cmd_rank(
    config: &Config,
    batch_path: PathBuf,
    criterion: Option<String>,
    cost: bool,
    elapsed: bool,
    mode: Option<EvaluatorMode>,
) -> Result<()> {
    let batch = EvaluationBatch::load(&batch_path).context("Failed to load batch")?;
    let registry = Arc::new(resolve_mode(config, mode, &batch).registry());
    let options = PipelineOptions {
        allow_overwrite: config.evaluation.allow_overwrite,
    };
    let report = evaluate_batch(registry, &batch, options).context("Failed to score batch")?;
    let table = &report.table;

    let (title, ranking, diffs) = if cost {
        ("total cost".to_string(), rank_by_cost(table), cost_deltas(table))
    } else if elapsed {
        ("elapsed time".to_string(), rank_by_elapsed(table), elapsed_deltas(table))
    } else {
        let Some(criterion) = criterion else {
            anyhow::bail!("Specify --criterion <id>, --cost or --elapsed");
        };
        let ranking = rank_by(table, &criterion)?;
        let diffs = deltas(table, &criterion)?;
        (criterion, ranking, diffs)
    };

    println!("Ranking by {}:", title);
    println!("{}", "─".repeat(60));
    for (i, subject) in ranking.iter().enumerate() {
        println!("{:>3}. {}", i + 1, subject);
    }
    println!();
    println!("  Difference from best:");
    print_deltas(&diffs);

    Ok(())
}

fn cmd_price(config: &Config, model: &str, input_tokens: u64, output_tokens: u64) -> Result<()> {
    let table = config.price_table();
    let cost = table
        .calculate(model, input_tokens, output_tokens)
        .context("Failed to calculate cost")?;

    println!("Invocation cost for {}", model);
    println!("{}", "─".repeat(40));
    println!("  Input tokens:    {}", input_tokens);
    println!("  Output tokens:   {}", output_tokens);
    println!("  Input cost:      ${:.8}", cost.input_cost);
    println!("  Output cost:     ${:.8}", cost.output_cost);
    println!("  Total cost:      ${:.6}", cost.total_cost);
    println!("  Per 1000 calls:  ${:.6}", cost.total_cost_per_1000);

    Ok(())
}

fn cmd_verdict(
    config: &Config,
    file: PathBuf,
    criterion: Option<String>,
    mode: Option<EvaluatorMode>,
) -> Result<()> {
    let response = std::fs::read_to_string(&file)
        .with_context(|| format!("Failed to read '{}'", file.display()))?;
    let verdict = parse_verdict(&response).context("Failed to parse judge response")?;

    println!("Score:    {}", verdict.score);
    if !verdict.thoughts.is_empty() {
        println!("Thoughts: {}", verdict.thoughts);
    }

    if let Some(criterion) = criterion {
        let registry = mode.unwrap_or(config.evaluation.mode).registry();
        let domain = registry.domain_of(&criterion)?;
        if domain.contains(verdict.score) {
            println!("Valid for '{}' ({})", criterion, domain);
        } else {
            anyhow::bail!(
                "Score {} is outside the {} domain of '{}'",
                verdict.score,
                domain,
                criterion
            );
        }
    }

    Ok(())
}

fn cmd_show(table_path: PathBuf, json: bool) -> Result<()> {
    let table = load_table(&table_path).context("Failed to load comparison table")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&table)?);
    } else {
        println!("{}", table.format());
    }

    Ok(())
}
