use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Prediction recorded for a reply that could not be decoded.
pub const SENTINEL_PREDICTION: i64 = 0;

/// One labeled review from the input dataset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetRow {
    pub text: String,
    /// Ground-truth rating, always in 1..=5
    pub stars: u8,
}

/// Structured data decoded from a raw model reply
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedPrediction {
    pub predicted_stars: Option<i64>,
    pub explanation: Option<String>,
    /// Whether the reply decoded into a single JSON object
    pub is_valid: bool,
}

impl ParsedPrediction {
    pub fn invalid() -> Self {
        Self::default()
    }
}

/// One row of the results table: a sampled dataset row scored under one variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRow {
    pub original_stars: u8,
    pub predicted_stars: Option<i64>,
    pub explanation: Option<String>,
    pub is_valid_json: bool,
    pub prompt_version: String,
}

impl EvaluationRow {
    /// Valid rows whose prediction matches the label
    pub fn is_correct(&self) -> bool {
        self.is_valid_json && self.predicted_stars == Some(i64::from(self.original_stars))
    }
}

/// Aggregate scores for one prompt variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// Correct / valid, 0.0 when no reply was valid
    pub accuracy: f64,
    /// Valid / sampled, 0.0 when nothing was sampled
    pub json_validity_rate: f64,
    pub sampled: usize,
    pub valid: usize,
    pub correct: usize,
    /// Valid rows only, indexed `[actual - 1][predicted - 1]`
    pub confusion: [[usize; 5]; 5],
    /// Valid rows whose prediction is absent or outside 1..=5
    pub out_of_range: usize,
}

/// Per-variant slice of a run report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantReport {
    pub prompt_version: String,
    pub metrics: Metrics,
}

/// Summary of a complete harness run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub variants: Vec<VariantReport>,
    /// Number of rows written to the results file
    pub total_rows: usize,
    pub results_path: PathBuf,
}
