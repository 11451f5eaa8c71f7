use crate::client::ReviewModel;
use crate::dataset::sample_rows;
use crate::models::{DatasetRow, EvaluationRow, Metrics, SENTINEL_PREDICTION};
use crate::parser::parse_reply;
use crate::prompts::PromptVariant;
use crate::rate_limit::RateLimiter;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Output of evaluating one prompt variant
#[derive(Debug, Clone)]
pub struct VariantEvaluation {
    pub variant: PromptVariant,
    pub rows: Vec<EvaluationRow>,
    pub metrics: Metrics,
}

/// Scores prompt variants against a labeled dataset, one model call at a time
pub struct Evaluator {
    model: Arc<dyn ReviewModel>,
    rate_limiter: Box<dyn RateLimiter>,
    sample_size: usize,
    seed: u64,
}

impl Evaluator {
    pub fn new(
        model: Arc<dyn ReviewModel>,
        rate_limiter: Box<dyn RateLimiter>,
        sample_size: usize,
        seed: u64,
    ) -> Self {
        Self {
            model,
            rate_limiter,
            sample_size,
            seed,
        }
    }

    /// Run every sampled row through `variant` and score the replies
    pub async fn evaluate(&self, dataset: &[DatasetRow], variant: PromptVariant) -> VariantEvaluation {
        let sample = sample_rows(dataset, self.sample_size, self.seed);
        let total = sample.len();
        info!(variant = %variant, rows = total, "running experiment");

        let mut rows = Vec::with_capacity(total);
        for (index, row) in sample.into_iter().enumerate() {
            debug!(variant = %variant, "row {}/{}", index + 1, total);
            rows.push(self.evaluate_row(row, variant).await);
        }

        let metrics = compute_metrics(&rows);
        info!(
            variant = %variant,
            accuracy = metrics.accuracy,
            json_validity_rate = metrics.json_validity_rate,
            "experiment finished"
        );

        VariantEvaluation {
            variant,
            rows,
            metrics,
        }
    }

    async fn evaluate_row(&self, row: &DatasetRow, variant: PromptVariant) -> EvaluationRow {
        self.rate_limiter.acquire().await;

        let prompt = variant.render(&row.text);
        let reply = match self.model.complete(&prompt).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(variant = %variant, error = %e, "model call failed");
                String::new()
            }
        };

        let parsed = parse_reply(&reply);
        if !parsed.is_valid {
            debug!(variant = %variant, reply = %reply, "reply is not a JSON object");
        }

        EvaluationRow {
            original_stars: row.stars,
            predicted_stars: if parsed.is_valid {
                parsed.predicted_stars
            } else {
                Some(SENTINEL_PREDICTION)
            },
            explanation: parsed.explanation,
            is_valid_json: parsed.is_valid,
            prompt_version: variant.label().to_string(),
        }
    }
}

/// Aggregate accuracy and validity over one variant's rows.
///
/// Accuracy only considers rows whose reply was valid; the validity rate is
/// taken over every attempted row. Both are 0.0 when their denominator is empty.
pub fn compute_metrics(rows: &[EvaluationRow]) -> Metrics {
    let mut confusion = [[0usize; 5]; 5];
    let mut valid = 0;
    let mut correct = 0;
    let mut out_of_range = 0;

    for row in rows.iter().filter(|r| r.is_valid_json) {
        valid += 1;
        if row.is_correct() {
            correct += 1;
        }
        match row.predicted_stars {
            Some(predicted @ 1..=5) if (1..=5).contains(&row.original_stars) => {
                confusion[usize::from(row.original_stars) - 1][predicted as usize - 1] += 1;
            }
            _ => out_of_range += 1,
        }
    }

    let ratio = |num: usize, den: usize| if den == 0 { 0.0 } else { num as f64 / den as f64 };

    Metrics {
        accuracy: ratio(correct, valid),
        json_validity_rate: ratio(valid, rows.len()),
        sampled: rows.len(),
        valid,
        correct,
        confusion,
        out_of_range,
    }
}
