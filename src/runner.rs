use crate::client::ReviewModel;
use crate::config::Config;
use crate::dataset::load_dataset;
use crate::evaluation::Evaluator;
use crate::models::{EvaluationRow, RunReport, VariantReport};
use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Main runner that orchestrates a full harness run
pub struct Runner {
    config: Config,
    evaluator: Evaluator,
}

impl Runner {
    /// Create a runner that sends every prompt to `model`
    pub fn new(config: Config, model: Arc<dyn ReviewModel>) -> Self {
        let evaluator = Evaluator::new(
            model,
            config.rate_limit.build(),
            config.sample_size,
            config.seed,
        );
        Self { config, evaluator }
    }

    /// Evaluate every configured variant and persist the results.
    ///
    /// The dataset is loaded and validated before any model call is made.
    pub async fn run(&self) -> Result<RunReport> {
        let dataset = load_dataset(&self.config.dataset_path).with_context(|| {
            format!("Failed to load dataset: {}", self.config.dataset_path.display())
        })?;
        info!(
            path = %self.config.dataset_path.display(),
            rows = dataset.len(),
            "dataset loaded"
        );

        let mut all_rows = Vec::new();
        let mut variants = Vec::with_capacity(self.config.variants.len());
        for &variant in &self.config.variants {
            let evaluation = self.evaluator.evaluate(&dataset, variant).await;
            variants.push(VariantReport {
                prompt_version: evaluation.variant.label().to_string(),
                metrics: evaluation.metrics,
            });
            all_rows.extend(evaluation.rows);
        }

        write_results(&self.config.results_path, &all_rows)?;
        info!(path = %self.config.results_path.display(), rows = all_rows.len(), "results saved");

        let report = RunReport {
            variants,
            total_rows: all_rows.len(),
            results_path: self.config.results_path.clone(),
        };

        if let Some(summary_path) = &self.config.summary_path {
            write_summary(summary_path, &report)?;
            info!(path = %summary_path.display(), "summary saved");
        }

        Ok(report)
    }
}

/// Write the combined results table, replacing any previous file
fn write_results(path: &Path, rows: &[EvaluationRow]) -> Result<()> {
    ensure_directory_exists(path)?;
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create results file: {}", path.display()))?;

    if rows.is_empty() {
        writer.write_record([
            "original_stars",
            "predicted_stars",
            "explanation",
            "is_valid_json",
            "prompt_version",
        ])?;
    }
    for row in rows {
        writer
            .serialize(row)
            .with_context(|| format!("Failed to write results to: {}", path.display()))?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to write results to: {}", path.display()))
}

fn write_summary(path: &Path, report: &RunReport) -> Result<()> {
    let json_content =
        serde_json::to_string_pretty(report).context("Failed to serialize summary to JSON")?;
    ensure_directory_exists(path)?;
    std::fs::write(path, json_content)
        .with_context(|| format!("Failed to write summary to: {}", path.display()))
}

/// Ensure the directory for an output file exists
fn ensure_directory_exists(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display())),
        _ => Ok(()),
    }
}
