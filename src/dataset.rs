use crate::models::DatasetRow;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::path::{Path, PathBuf};
use thiserror::Error;

const TEXT_COLUMN: &str = "text";
const STARS_COLUMN: &str = "stars";

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("dataset file not found: {0}")]
    NotFound(PathBuf),

    #[error("dataset must contain 'text' and 'stars' columns, missing '{0}'")]
    MissingColumn(&'static str),

    #[error("row {row}: '{value}' is not a star rating between 1 and 5")]
    InvalidStars { row: usize, value: String },

    #[error("failed to read dataset: {0}")]
    Csv(#[from] csv::Error),
}

/// Load a labeled review dataset from a CSV file with a header row.
///
/// Only the `text` and `stars` columns are read; any others are ignored.
pub fn load_dataset(path: &Path) -> Result<Vec<DatasetRow>, DatasetError> {
    if !path.is_file() {
        return Err(DatasetError::NotFound(path.to_path_buf()));
    }
    let reader = csv::Reader::from_path(path)?;
    read_dataset(reader)
}

fn read_dataset<R: std::io::Read>(mut reader: csv::Reader<R>) -> Result<Vec<DatasetRow>, DatasetError> {
    let headers = reader.headers()?.clone();
    let column = |name: &'static str| {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .ok_or(DatasetError::MissingColumn(name))
    };
    let text_idx = column(TEXT_COLUMN)?;
    let stars_idx = column(STARS_COLUMN)?;

    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record?;
        let row = index + 1;
        let raw_stars = record.get(stars_idx).unwrap_or_default();
        let stars = parse_stars(raw_stars).ok_or_else(|| DatasetError::InvalidStars {
            row,
            value: raw_stars.to_string(),
        })?;
        rows.push(DatasetRow {
            text: record.get(text_idx).unwrap_or_default().to_string(),
            stars,
        });
    }

    Ok(rows)
}

fn parse_stars(raw: &str) -> Option<u8> {
    let raw = raw.trim();
    let stars = raw.parse::<i64>().ok().or_else(|| {
        raw.parse::<f64>()
            .ok()
            .filter(|f| f.fract() == 0.0)
            .map(|f| f as i64)
    })?;
    (1..=5).contains(&stars).then_some(stars as u8)
}

/// Pick the rows to evaluate.
///
/// Datasets no larger than `limit` are used whole. Larger ones are sampled
/// down to exactly `limit` rows with an RNG seeded from `seed`, so the same
/// inputs always yield the same subset. Rows keep their dataset order.
pub fn sample_rows(dataset: &[DatasetRow], limit: usize, seed: u64) -> Vec<&DatasetRow> {
    if dataset.len() <= limit {
        return dataset.iter().collect();
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let mut indices = rand::seq::index::sample(&mut rng, dataset.len(), limit).into_vec();
    indices.sort_unstable();
    indices.into_iter().map(|i| &dataset[i]).collect()
}
