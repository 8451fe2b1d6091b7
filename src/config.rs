//! Configuration for scorecard runs.
//!
//! Supports both environment variables and YAML config file.
//! Environment variables take precedence over config file values.

use crate::criterion::EvaluatorMode;
use crate::error::{Result, ScorecardError};
use crate::pricing::{PriceTable, TokenPrice};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};

/// Evaluation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationConfig {
    /// Criterion set to validate against.
    #[serde(default)]
    pub mode: EvaluatorMode,

    /// Let re-submitted scores replace earlier ones.
    #[serde(default)]
    pub allow_overwrite: bool,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            mode: EvaluatorMode::Summarization,
            allow_overwrite: false,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset (e.g. "info", "llm_scorecard=debug").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Report output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Directory for timestamped reports.
    #[serde(default = "default_report_dir")]
    pub output_dir: PathBuf,
}

fn default_report_dir() -> PathBuf {
    PathBuf::from("reports")
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_dir: default_report_dir(),
        }
    }
}

/// Full application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub evaluation: EvaluationConfig,
    pub logging: LoggingConfig,
    pub reports: ReportConfig,
    /// Per-model price overrides, merged over the built-in table.
    pub pricing: BTreeMap<String, TokenPrice>,
}

/// Configuration file structure (YAML format).
#[derive(Debug, Deserialize)]
struct ConfigFile {
    evaluation: Option<EvaluationFileSection>,
    logging: Option<LoggingFileSection>,
    reports: Option<ReportFileSection>,
    pricing: Option<BTreeMap<String, TokenPrice>>,
}

#[derive(Debug, Deserialize)]
struct EvaluationFileSection {
    mode: Option<String>,
    allow_overwrite: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct LoggingFileSection {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct ReportFileSection {
    output_dir: Option<PathBuf>,
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl Config {
    /// Load configuration from environment variables and optional config file.
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (SCORECARD_MODE, SCORECARD_ALLOW_OVERWRITE,
    ///    SCORECARD_LOG_LEVEL, SCORECARD_LOG_JSON, SCORECARD_REPORT_DIR)
    /// 2. Config file (~/.config/llm-scorecard/config.yaml)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        let mut config = Config::default();

        if let Some(config_path) = Self::config_file_path() {
            if config_path.exists() {
                config = Self::load_from_file(&config_path)?;
            }
        }

        config.apply_env()?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(mode) = env::var("SCORECARD_MODE") {
            self.evaluation.mode = mode.parse()?;
        }

        if let Ok(overwrite) = env::var("SCORECARD_ALLOW_OVERWRITE") {
            if let Some(flag) = parse_bool(&overwrite) {
                self.evaluation.allow_overwrite = flag;
            }
        }

        if let Ok(level) = env::var("SCORECARD_LOG_LEVEL") {
            self.logging.level = level;
        }

        if let Ok(json) = env::var("SCORECARD_LOG_JSON") {
            if let Some(flag) = parse_bool(&json) {
                self.logging.json = flag;
            }
        }

        if let Ok(dir) = env::var("SCORECARD_REPORT_DIR") {
            self.reports.output_dir = PathBuf::from(dir);
        }

        Ok(())
    }

    /// Load configuration from a specific file path.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ScorecardError::io(path, e))?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML text.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let file_config: ConfigFile = serde_yaml::from_str(content)
            .map_err(|e| ScorecardError::Config(format!("Failed to parse config file: {}", e)))?;

        let mut config = Config::default();

        if let Some(evaluation) = file_config.evaluation {
            if let Some(mode) = evaluation.mode {
                config.evaluation.mode = mode.parse()?;
            }
            if let Some(allow_overwrite) = evaluation.allow_overwrite {
                config.evaluation.allow_overwrite = allow_overwrite;
            }
        }

        if let Some(logging) = file_config.logging {
            if let Some(level) = logging.level {
                config.logging.level = level;
            }
            if let Some(json) = logging.json {
                config.logging.json = json;
            }
        }

        if let Some(reports) = file_config.reports {
            if let Some(output_dir) = reports.output_dir {
                config.reports.output_dir = output_dir;
            }
        }

        if let Some(pricing) = file_config.pricing {
            config.pricing = pricing;
        }

        Ok(config)
    }

    /// Get the default config file path.
    pub fn config_file_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "llm-scorecard")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Validate the configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.logging.level.trim().is_empty() {
            return Err(ScorecardError::Config(
                "Log level must not be empty. Set SCORECARD_LOG_LEVEL or logging.level in the config file.".to_string(),
            ));
        }

        for (model, price) in &self.pricing {
            let valid = |v: f64| v.is_finite() && v >= 0.0;
            if !valid(price.input_per_1k) || !valid(price.output_per_1k) {
                return Err(ScorecardError::Config(format!(
                    "Prices for model '{}' must be non-negative numbers",
                    model
                )));
            }
        }

        Ok(())
    }

    /// Built-in prices with the configured overrides applied.
    pub fn price_table(&self) -> PriceTable {
        let mut table = PriceTable::default();
        for (model, price) in &self.pricing {
            table.set(model.clone(), *price);
        }
        table
    }

    /// Create a config for a mode (useful for testing).
    pub fn with_mode(mode: EvaluatorMode) -> Self {
        Self {
            evaluation: EvaluationConfig {
                mode,
                ..Default::default()
            },
            ..Default::default()
        }
    }
}
