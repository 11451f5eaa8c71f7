use crate::prompts::PromptVariant;
use crate::rate_limit::{ConstantDelay, RateLimiter, TokenBucket, Unlimited};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Settings for the external model endpoint
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ModelConfig {
    /// OpenAI-compatible API base URL
    #[serde(default = "default_api_endpoint")]
    pub api_endpoint: String,
    /// Environment variable name containing the API key
    #[serde(default = "default_env_var_api_key")]
    pub env_var_api_key: String,
    /// Model to use for rating reviews
    #[serde(default = "default_model")]
    pub model: String,
    /// Sampling temperature; the provider default when unset
    #[serde(default)]
    pub temperature: Option<f64>,
    /// Maximum tokens for each reply
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u16,
    /// Optional system message sent ahead of every prompt
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// Per-request timeout; the transport default when unset
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl ModelConfig {
    /// Read the credential from the configured environment variable.
    /// Unset and blank values both count as missing.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.env_var_api_key)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            api_endpoint: default_api_endpoint(),
            env_var_api_key: default_env_var_api_key(),
            model: default_model(),
            temperature: None,
            max_tokens: default_max_tokens(),
            system_prompt: None,
            timeout_secs: None,
        }
    }
}

/// Pacing between successive model calls
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RateLimitConfig {
    Unlimited,
    ConstantDelay {
        #[serde(default = "default_delay_ms")]
        delay_ms: u64,
    },
    TokenBucket {
        capacity: f64,
        refill_per_sec: f64,
    },
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        RateLimitConfig::ConstantDelay {
            delay_ms: default_delay_ms(),
        }
    }
}

impl RateLimitConfig {
    /// Build the limiter described by this configuration
    pub fn build(&self) -> Box<dyn RateLimiter> {
        match self {
            RateLimitConfig::Unlimited => Box::new(Unlimited),
            RateLimitConfig::ConstantDelay { delay_ms } => {
                Box::new(ConstantDelay::new(Duration::from_millis(*delay_ms)))
            }
            RateLimitConfig::TokenBucket {
                capacity,
                refill_per_sec,
            } => Box::new(TokenBucket::new(*capacity, *refill_per_sec)),
        }
    }
}

/// Root configuration for a harness run
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// CSV file with at least `text` and `stars` columns
    #[serde(default = "default_dataset_path")]
    pub dataset_path: PathBuf,
    /// Where the combined per-row results are written
    #[serde(default = "default_results_path")]
    pub results_path: PathBuf,
    /// Optional JSON file for the aggregated metrics
    #[serde(default)]
    pub summary_path: Option<PathBuf>,
    /// Datasets larger than this are sampled down to it
    #[serde(default = "default_sample_size")]
    pub sample_size: usize,
    /// Seed for the sampling RNG
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Prompt variants to evaluate, in order
    #[serde(default = "default_variants")]
    pub variants: Vec<PromptVariant>,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

fn default_api_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta/openai".to_string()
}

fn default_env_var_api_key() -> String {
    "GEMINI_API_KEY".to_string()
}

fn default_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_max_tokens() -> u16 {
    1000
}

fn default_delay_ms() -> u64 {
    1000
}

fn default_dataset_path() -> PathBuf {
    PathBuf::from("data/yelp.csv")
}

fn default_results_path() -> PathBuf {
    PathBuf::from("data/evaluation_results.csv")
}

fn default_sample_size() -> usize {
    200
}

fn default_seed() -> u64 {
    42
}

fn default_variants() -> Vec<PromptVariant> {
    PromptVariant::ALL.to_vec()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dataset_path: default_dataset_path(),
            results_path: default_results_path(),
            summary_path: None,
            sample_size: default_sample_size(),
            seed: default_seed(),
            variants: default_variants(),
            model: ModelConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would make a run meaningless
    pub fn validate(&self) -> Result<()> {
        if self.sample_size == 0 {
            anyhow::bail!("sample_size must be at least 1");
        }
        if self.variants.is_empty() {
            anyhow::bail!("at least one prompt variant must be configured");
        }
        if let RateLimitConfig::TokenBucket {
            capacity,
            refill_per_sec,
        } = self.rate_limit
        {
            if !capacity.is_finite()
                || !refill_per_sec.is_finite()
                || capacity < 1.0
                || refill_per_sec <= 0.0
            {
                anyhow::bail!(
                    "token bucket needs capacity >= 1 and a positive refill rate, got {capacity} and {refill_per_sec}"
                );
            }
        }
        Ok(())
    }
}
