use crate::models::{Metrics, RunReport};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write};

/// Output format options
#[derive(Debug, Clone, Copy, ValueEnum, Serialize, Deserialize)]
pub enum OutputFormat {
    Plain,
    Json,
}

/// Print a run report in the specified format
pub fn print_report(report: &RunReport, format: OutputFormat) {
    match format {
        OutputFormat::Plain => match render_plain(report) {
            Ok(text) => print!("{}", text),
            Err(e) => eprintln!("Error rendering report: {}", e),
        },
        OutputFormat::Json => match render_json(report) {
            Ok(json) => println!("{}", json),
            Err(e) => eprintln!("Error serializing report to JSON: {}", e),
        },
    }
}

fn render_json(report: &RunReport) -> serde_json::Result<String> {
    serde_json::to_string_pretty(report)
}

/// Render the report as a plain-text table
fn render_plain(report: &RunReport) -> Result<String, fmt::Error> {
    let mut out = String::new();

    writeln!(out, "=== Prompt Evaluation ===")?;
    writeln!(out)?;
    if report.variants.is_empty() {
        writeln!(out, "No variants evaluated.")?;
    } else {
        writeln!(
            out,
            "{:<22} {:>9} {:>9} {:>8} {:>6} {:>8}",
            "Prompt", "Accuracy", "Validity", "Sampled", "Valid", "Correct"
        )?;
        writeln!(out, "{}", "-".repeat(67))?;
        for variant in &report.variants {
            let m = &variant.metrics;
            writeln!(
                out,
                "{:<22} {:>9.2} {:>9.2} {:>8} {:>6} {:>8}",
                variant.prompt_version, m.accuracy, m.json_validity_rate, m.sampled, m.valid, m.correct
            )?;
        }

        for variant in &report.variants {
            writeln!(out)?;
            writeln!(
                out,
                "Confusion matrix: {} (rows = actual, columns = predicted)",
                variant.prompt_version
            )?;
            render_confusion(&mut out, &variant.metrics)?;
        }
    }

    writeln!(out)?;
    writeln!(
        out,
        "Evaluation complete. {} rows saved to {}",
        report.total_rows,
        report.results_path.display()
    )?;
    Ok(out)
}

fn render_confusion(out: &mut String, metrics: &Metrics) -> fmt::Result {
    writeln!(out, "      {:>5} {:>5} {:>5} {:>5} {:>5}", 1, 2, 3, 4, 5)?;
    for (actual, counts) in metrics.confusion.iter().enumerate() {
        write!(out, "  {:>2}  ", actual + 1)?;
        for count in counts {
            write!(out, "{:>5} ", count)?;
        }
        writeln!(out)?;
    }
    if metrics.out_of_range > 0 {
        writeln!(out, "  out of range: {}", metrics.out_of_range)?;
    }
    Ok(())
}
