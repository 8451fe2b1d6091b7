//! Cross-subject comparison tables, rankings and deltas.
//!
//! Everything here is a pure function of its inputs: the same scorecards
//! always produce the same table, and the same table always produces the
//! same ranking. Ties are broken by subject id so output never depends
//! on hash or insertion order.

use crate::aggregator::Scorecard;
use crate::criterion::{CriterionRegistry, Polarity, ValueDomain};
use crate::error::{Result, ScorecardError};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use tracing::debug;

/// Column metadata for one criterion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriterionColumn {
    pub id: String,
    pub label: String,
    pub domain: ValueDomain,
    pub polarity: Polarity,
}

/// One subject's row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRow {
    subject_id: String,
    values: Vec<Option<f64>>,
    total_cost: f64,
    elapsed_secs: f64,
}

impl ComparisonRow {
    /// Evaluated model or knowledge base.
    pub fn subject_id(&self) -> &str {
        &self.subject_id
    }

    /// Values aligned with [`ComparisonTable::columns`]; `None` for an unreported optional criterion.
    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }

    /// Total invocation cost.
    pub fn total_cost(&self) -> f64 {
        self.total_cost
    }

    /// Elapsed seconds.
    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed_secs
    }

    fn value_at(&self, idx: usize) -> Option<f64> {
        self.values.get(idx).copied().flatten()
    }
}

/// Read-only view over all scorecards of a run.
///
/// Only [`ComparisonTable::build`] and deserialization create tables, and
/// both guarantee one value per column in every row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TableData")]
pub struct ComparisonTable {
    columns: Vec<CriterionColumn>,
    rows: Vec<ComparisonRow>,
}

/// Unchecked wire form of [`ComparisonTable`].
#[derive(Deserialize)]
struct TableData {
    columns: Vec<CriterionColumn>,
    rows: Vec<ComparisonRow>,
}

impl TryFrom<TableData> for ComparisonTable {
    type Error = ScorecardError;

    fn try_from(data: TableData) -> Result<Self> {
        let width = data.columns.len();
        if let Some(row) = data.rows.iter().find(|r| r.values.len() != width) {
            return Err(ScorecardError::Serialization(format!(
                "row '{}' has {} values for {} columns",
                row.subject_id,
                row.values.len(),
                width
            )));
        }
        Ok(Self {
            columns: data.columns,
            rows: data.rows,
        })
    }
}

/// Difference between one subject and the best subject on a column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delta {
    pub subject_id: String,
    pub value: f64,
    /// Best value on the column under its polarity.
    pub best: f64,
    /// `value - best`.
    pub absolute: f64,
    /// `absolute / best * 100`, or `None` when `best` is zero.
    pub percent: Option<f64>,
}

impl ComparisonTable {
    /// Build the table for a set of finalized scorecards.
    pub fn build(registry: &CriterionRegistry, scorecards: &[Scorecard]) -> Result<Self> {
        if scorecards.is_empty() {
            return Err(ScorecardError::EmptyRun);
        }

        let columns: Vec<CriterionColumn> = registry
            .criteria()
            .map(|c| CriterionColumn {
                id: c.id.clone(),
                label: c.label.clone(),
                domain: c.domain,
                polarity: c.polarity,
            })
            .collect();

        let rows = scorecards
            .iter()
            .map(|card| ComparisonRow {
                subject_id: card.subject_id().to_string(),
                values: columns.iter().map(|col| card.value(&col.id)).collect(),
                total_cost: card.total_cost(),
                elapsed_secs: card.elapsed_secs(),
            })
            .collect::<Vec<_>>();

        debug!(rows = rows.len(), columns = columns.len(), "built comparison table");
        Ok(Self { columns, rows })
    }

    /// Criterion columns in registry order.
    pub fn columns(&self) -> &[CriterionColumn] {
        &self.columns
    }

    /// One row per scorecard, in scorecard order.
    pub fn rows(&self) -> &[ComparisonRow] {
        &self.rows
    }

    /// Position of a criterion column.
    pub fn column_index(&self, criterion_id: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c.id == criterion_id)
            .ok_or_else(|| ScorecardError::UnknownCriterion(criterion_id.to_string()))
    }

    /// Value of a cell.
    pub fn value(&self, subject_id: &str, criterion_id: &str) -> Option<f64> {
        let idx = self.column_index(criterion_id).ok()?;
        self.row(subject_id).and_then(|row| row.value_at(idx))
    }

    /// Row for a subject.
    pub fn row(&self, subject_id: &str) -> Option<&ComparisonRow> {
        self.rows.iter().find(|r| r.subject_id == subject_id)
    }

    /// Subject ids in row order.
    pub fn subjects(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(|r| r.subject_id.as_str())
    }

    /// Format the table as fixed-width text for terminals.
    pub fn format(&self) -> String {
        let subject_width = self
            .rows
            .iter()
            .map(|r| r.subject_id.len())
            .max()
            .unwrap_or(0)
            .max("subject".len());

        let mut out = format!("{:<width$}", "subject", width = subject_width);
        for col in &self.columns {
            out.push_str(&format!("  {:>w$}", col.id, w = col.id.len().max(6)));
        }
        out.push_str(&format!("  {:>12}  {:>10}\n", "total_cost", "elapsed_s"));

        for row in &self.rows {
            out.push_str(&format!("{:<width$}", row.subject_id, width = subject_width));
            for (col, value) in self.columns.iter().zip(&row.values) {
                let w = col.id.len().max(6);
                match value {
                    Some(v) => out.push_str(&format!("  {:>w$}", format_value(*v, col.domain), w = w)),
                    None => out.push_str(&format!("  {:>w$}", "-", w = w)),
                }
            }
            out.push_str(&format!("  {:>12.6}  {:>10.2}\n", row.total_cost, row.elapsed_secs));
        }
        out
    }
}

fn format_value(value: f64, domain: ValueDomain) -> String {
    match domain {
        ValueDomain::Ordinal0to5 | ValueDomain::Binary => format!("{:.0}", value),
        ValueDomain::Unit0to1 => format!("{:.3}", value),
    }
}

/// Order two optional values so that better ones come first and missing ones last.
fn compare_values(a: Option<f64>, b: Option<f64>, polarity: Polarity) -> Ordering {
    match (a, b) {
        // Values are finite, so partial_cmp is total and -0.0 equals 0.0.
        (Some(a), Some(b)) => {
            let ord = a.partial_cmp(&b).unwrap_or(Ordering::Equal);
            match polarity {
                Polarity::HigherIsBetter => ord.reverse(),
                Polarity::LowerIsBetter => ord,
            }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn rank_rows<F>(table: &ComparisonTable, polarity: Polarity, key: F) -> Vec<String>
where
    F: Fn(&ComparisonRow) -> Option<f64>,
{
    let mut rows: Vec<&ComparisonRow> = table.rows.iter().collect();
    rows.sort_by(|a, b| {
        compare_values(key(a), key(b), polarity).then_with(|| a.subject_id.cmp(&b.subject_id))
    });
    rows.into_iter().map(|r| r.subject_id.clone()).collect()
}

/// Rank subjects on one criterion, best first.
///
/// Higher-is-better criteria sort descending, lower-is-better ascending.
/// Equal values are ordered by subject id.
pub fn rank_by(table: &ComparisonTable, criterion_id: &str) -> Result<Vec<String>> {
    let idx = table.column_index(criterion_id)?;
    let polarity = table.columns[idx].polarity;
    Ok(rank_rows(table, polarity, |row| row.value_at(idx)))
}

/// Rank subjects from cheapest to most expensive.
pub fn rank_by_cost(table: &ComparisonTable) -> Vec<String> {
    rank_rows(table, Polarity::LowerIsBetter, |row| Some(row.total_cost))
}

/// Rank subjects from fastest to slowest.
pub fn rank_by_elapsed(table: &ComparisonTable) -> Vec<String> {
    rank_rows(table, Polarity::LowerIsBetter, |row| Some(row.elapsed_secs))
}

fn deltas_for<F>(table: &ComparisonTable, polarity: Polarity, key: F) -> Vec<Delta>
where
    F: Fn(&ComparisonRow) -> Option<f64>,
{
    let best = table
        .rows
        .iter()
        .filter_map(&key)
        .min_by(|a, b| compare_values(Some(*a), Some(*b), polarity));

    let Some(best) = best else {
        return Vec::new();
    };

    table
        .rows
        .iter()
        .filter_map(|row| {
            key(row).map(|value| {
                let absolute = value - best;
                Delta {
                    subject_id: row.subject_id.clone(),
                    value,
                    best,
                    absolute,
                    percent: (best != 0.0).then(|| absolute / best * 100.0),
                }
            })
        })
        .collect()
}

/// Differences from the best subject on one criterion, in row order.
///
/// Subjects without a value for an optional criterion are left out.
pub fn deltas(table: &ComparisonTable, criterion_id: &str) -> Result<Vec<Delta>> {
    let idx = table.column_index(criterion_id)?;
    let polarity = table.columns[idx].polarity;
    Ok(deltas_for(table, polarity, |row| row.value_at(idx)))
}

/// Cost differences from the cheapest subject.
pub fn cost_deltas(table: &ComparisonTable) -> Vec<Delta> {
    deltas_for(table, Polarity::LowerIsBetter, |row| Some(row.total_cost))
}

/// Elapsed time differences from the fastest subject.
pub fn elapsed_deltas(table: &ComparisonTable) -> Vec<Delta> {
    deltas_for(table, Polarity::LowerIsBetter, |row| Some(row.elapsed_secs))
}
