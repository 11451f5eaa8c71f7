use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod client;
mod config;
mod dataset;
mod evaluation;
mod models;
mod output;
mod parser;
mod prompts;
mod rate_limit;
mod runner;

use crate::client::{ReviewModel, StubModel, build_model};
use crate::config::Config;
use crate::output::OutputFormat;
use crate::prompts::PromptVariant;
use crate::runner::Runner;
use std::sync::Arc;

/// Review Prompt Evaluation - score prompt strategies for star-rating prediction
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the TOML run file; built-in defaults when omitted
    run_file: Option<PathBuf>,

    /// Dataset CSV with `text` and `stars` columns
    #[arg(long)]
    dataset: Option<PathBuf>,

    /// Where to write the per-row results CSV
    #[arg(long)]
    results: Option<PathBuf>,

    /// Also write the aggregated metrics as JSON
    #[arg(long)]
    summary: Option<PathBuf>,

    /// Only evaluate these variants (repeatable)
    #[arg(long = "variant", value_enum)]
    variants: Vec<PromptVariant>,

    /// Use the placeholder model even if an API key is configured
    #[arg(long)]
    offline: bool,

    /// Output format: plain or json
    #[arg(short, long, default_value = "plain")]
    output: OutputFormat,

    /// Verbose output - log progress for each model call
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn load_config(&self) -> anyhow::Result<Config> {
        let mut config = match &self.run_file {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };
        if let Some(dataset) = &self.dataset {
            config.dataset_path = dataset.clone();
        }
        if let Some(results) = &self.results {
            config.results_path = results.clone();
        }
        if let Some(summary) = &self.summary {
            config.summary_path = Some(summary.clone());
        }
        if !self.variants.is_empty() {
            config.variants = self.variants.clone();
        }
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), default_level))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = args.load_config()?;
    let model: Arc<dyn ReviewModel> = if args.offline {
        Arc::new(StubModel::new())
    } else {
        build_model(&config.model, config.model.api_key())?
    };

    let report = Runner::new(config, model).run().await?;

    output::print_report(&report, args.output);

    Ok(())
}
