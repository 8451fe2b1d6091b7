//! Persistence layer for comparison tables and run reports.
//!
//! Tables can be saved as JSON (human-readable), CSV (for spreadsheets and
//! charting tools) or bincode (compact binary). CSV drops the column
//! metadata, so it is export-only.

use crate::comparison::ComparisonTable;
use crate::error::{Result, ScorecardError};
use crate::pipeline::RunReport;
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Path, PathBuf};

/// Save format for comparison tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    /// JSON format (human-readable, larger).
    Json,
    /// CSV, one row per subject.
    Csv,
    /// Bincode format (binary, compact).
    Bincode,
}

impl ReportFormat {
    /// Determine format from file extension.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("csv") => ReportFormat::Csv,
            Some("bin") | Some("bincode") => ReportFormat::Bincode,
            _ => ReportFormat::Json, // Default to JSON
        }
    }

    /// File extension for the format.
    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Json => "json",
            ReportFormat::Csv => "csv",
            ReportFormat::Bincode => "bin",
        }
    }
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| ScorecardError::io(parent, e))?;
        }
    }
    Ok(())
}

/// Save a table, picking the format from the extension.
pub fn save_table(table: &ComparisonTable, path: &Path) -> Result<()> {
    save_table_with_format(table, path, ReportFormat::from_path(path))
}

/// Save a table with a specific format.
pub fn save_table_with_format(table: &ComparisonTable, path: &Path, format: ReportFormat) -> Result<()> {
    ensure_parent(path)?;

    let data = match format {
        ReportFormat::Json => serde_json::to_string_pretty(table)?.into_bytes(),
        ReportFormat::Csv => table_to_csv(table)?,
        ReportFormat::Bincode => {
            let config = bincode::config::standard();
            bincode::serde::encode_to_vec(table, config)
                .map_err(|e| ScorecardError::Serialization(e.to_string()))?
        }
    };

    fs::write(path, &data).map_err(|e| ScorecardError::io(path, e))
}

fn table_to_csv(table: &ComparisonTable) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    let mut header = vec!["subject_id".to_string()];
    header.extend(table.columns().iter().map(|c| c.id.clone()));
    header.push("total_cost".to_string());
    header.push("elapsed_secs".to_string());
    writer.write_record(&header)?;

    for row in table.rows() {
        let mut record = vec![row.subject_id().to_string()];
        record.extend(
            row.values()
                .iter()
                .map(|v| v.map(|v| v.to_string()).unwrap_or_default()),
        );
        record.push(row.total_cost().to_string());
        record.push(row.elapsed_secs().to_string());
        writer.write_record(&record)?;
    }

    writer
        .into_inner()
        .map_err(|e| ScorecardError::Serialization(e.to_string()))
}

/// Load a table saved as JSON or bincode.
pub fn load_table(path: &Path) -> Result<ComparisonTable> {
    if !path.exists() {
        return Err(ScorecardError::io(
            path,
            std::io::Error::new(std::io::ErrorKind::NotFound, "report not found"),
        ));
    }

    let data = fs::read(path).map_err(|e| ScorecardError::io(path, e))?;
    match ReportFormat::from_path(path) {
        ReportFormat::Json => Ok(serde_json::from_slice(&data)?),
        ReportFormat::Bincode => {
            let config = bincode::config::standard();
            let (table, _): (ComparisonTable, usize) =
                bincode::serde::decode_from_slice(&data, config)
                    .map_err(|e| ScorecardError::Serialization(e.to_string()))?;
            Ok(table)
        }
        ReportFormat::Csv => Err(ScorecardError::Serialization(
            "CSV reports are export-only; load the JSON or bincode report instead".to_string(),
        )),
    }
}

/// Save a full run report (scorecards and table) as JSON.
pub fn save_report(report: &RunReport, path: &Path) -> Result<()> {
    ensure_parent(path)?;
    let content = serde_json::to_string_pretty(report)?;
    fs::write(path, content).map_err(|e| ScorecardError::io(path, e))
}

/// Timestamped report path: `<dir>/<name>-comparison-<ddmmyyyyHHMMSS>.<ext>`.
pub fn report_path(dir: &Path, name: &str, format: ReportFormat, at: DateTime<Utc>) -> PathBuf {
    dir.join(format!(
        "{}-comparison-{}.{}",
        name,
        at.format("%d%m%Y%H%M%S"),
        format.extension()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::Aggregator;
    use crate::criterion::EvaluatorMode;
    use crate::record::OperationalMeasurement;
    use crate::run::RunContext;
    use chrono::TimeZone;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    fn create_test_table() -> ComparisonTable {
        let registry = Arc::new(EvaluatorMode::Summarization.registry());
        let mut ctx = RunContext::new(registry.clone()).unwrap();
        ctx.register_subject("model-a").unwrap();
        ctx.register_subject("model-b").unwrap();

        let mut agg = Aggregator::new(ctx);
        for (i, subject) in ["model-a", "model-b"].iter().enumerate() {
            for criterion in registry.ids() {
                let record = agg
                    .context()
                    .validate(subject, criterion, (i + 3) as f64)
                    .unwrap();
                agg.ingest(record, false).unwrap();
            }
            agg.record_measurement(
                OperationalMeasurement::new(*subject, 0.001 * (i + 1) as f64, Duration::from_millis(1500))
                    .unwrap(),
                false,
            )
            .unwrap();
        }

        let cards = agg.seal().finalize_all().unwrap();
        ComparisonTable::build(&registry, &cards).unwrap()
    }

    #[test]
    fn test_save_and_load_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("table.json");

        let original = create_test_table();
        save_table(&original, &path).unwrap();
        assert_eq!(load_table(&path).unwrap(), original);
    }

    #[test]
    fn test_save_and_load_bincode() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("table.bin");

        let original = create_test_table();
        save_table(&original, &path).unwrap();
        assert_eq!(load_table(&path).unwrap(), original);
    }

    #[test]
    fn test_csv_export() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("table.csv");

        save_table(&create_test_table(), &path).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        let header = lines.next().unwrap();
        assert!(header.starts_with("subject_id,cost_efficiency,speed"));
        assert!(header.ends_with("total_cost,elapsed_secs"));
        assert!(lines.next().unwrap().starts_with("model-a,3,3"));

        assert!(matches!(
            load_table(&path),
            Err(ScorecardError::Serialization(_))
        ));
    }

    #[test]
    fn test_format_detection() {
        assert_eq!(ReportFormat::from_path(Path::new("r.json")), ReportFormat::Json);
        assert_eq!(ReportFormat::from_path(Path::new("r.csv")), ReportFormat::Csv);
        assert_eq!(ReportFormat::from_path(Path::new("r.bincode")), ReportFormat::Bincode);
        assert_eq!(ReportFormat::from_path(Path::new("r")), ReportFormat::Json);
    }

    #[test]
    fn test_load_rejects_rows_without_one_value_per_column() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("edited.json");

        let mut json = serde_json::to_value(create_test_table()).unwrap();
        json["rows"][1]["values"] = serde_json::json!([4.0]);
        fs::write(&path, serde_json::to_string(&json).unwrap()).unwrap();

        assert!(matches!(
            load_table(&path),
            Err(ScorecardError::Serialization(_))
        ));
    }

    #[test]
    fn test_load_nonexistent() {
        assert!(load_table(Path::new("/nonexistent/table.json")).is_err());
    }

    #[test]
    fn test_report_path() {
        let at = Utc.with_ymd_and_hms(2024, 3, 7, 9, 5, 1).unwrap();
        let path = report_path(Path::new("reports"), "summary", ReportFormat::Csv, at);
        assert_eq!(path, Path::new("reports/summary-comparison-07032024090501.csv"));
    }
}
