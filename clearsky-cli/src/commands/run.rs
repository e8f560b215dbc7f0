//! `clearsky run`: value revs and write the JSON report.

use std::fs;
use std::path::PathBuf;

use chrono::Local;
use clap::Args;
use clearsky::pipeline::{RevPipeline, RevReport};
use clearsky::source::{DataSource, RevInputs};
use clearsky::visibility::distinct_revs;
use clearsky::RevNumber;
use tracing::info;

use super::common::DataArgs;
use crate::error::CliError;

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Rev numbers to value
    #[arg(long = "rev", value_name = "REV", num_args = 1.., required_unless_present = "all", conflicts_with = "all")]
    pub revs: Vec<RevNumber>,

    /// Value every rev in the visibility layer
    #[arg(long)]
    pub all: bool,

    /// Select every touching order regardless of its ONA limit
    #[arg(long)]
    pub ignore_ona: bool,

    /// Report file (default: clearsky_report_<timestamp>.json)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    #[command(flatten)]
    pub data: DataArgs,
}

/// Run the `run` command.
pub fn run(args: RunArgs) -> Result<(), CliError> {
    let mut config = args.data.load_config()?;
    if args.ignore_ona {
        config = config.with_respect_ona(false);
    }

    let source = DataArgs::source(&config);
    let revs: Vec<RevNumber> = if args.all {
        distinct_revs(&source.visibility_cells()?).into_iter().collect()
    } else {
        args.revs
    };
    if revs.is_empty() {
        return Err(CliError::Config("no revs to value".to_string()));
    }

    let inputs = RevInputs::load(&source, &revs)?;
    let reports = RevPipeline::from_config(&config).run_revs(&inputs, &revs)?;

    print_summary(&reports);

    let output = args.output.unwrap_or_else(default_report_path);
    let json = serde_json::to_string_pretty(&reports)?;
    fs::write(&output, json).map_err(|source| CliError::Write {
        path: output.clone(),
        source,
    })?;
    info!(path = %output.display(), revs = reports.len(), "Report written");
    println!();
    println!("Report: {}", output.display());

    Ok(())
}

fn default_report_path() -> PathBuf {
    PathBuf::from(format!(
        "clearsky_report_{}.json",
        Local::now().format("%Y%m%d_%H%M%S")
    ))
}

fn print_summary(reports: &[RevReport]) {
    println!(
        "{:>8}  {:>9}  {:>8}  {:>10}  {:>7}  {:>11}  {:>5}  {:>6}",
        "rev", "candidate", "selected", "locked_out", "regions", "total_value", "clear", "cloudy"
    );
    for report in reports {
        println!(
            "{:>8}  {:>9}  {:>8}  {:>10}  {:>7}  {:>11}  {:>5}  {:>6}",
            report.rev,
            report.candidate_count,
            report.selected.len(),
            report.locked_out.len(),
            report.surface.regions.len(),
            report.total_value,
            report.metrics.clear_count,
            report.metrics.cloudy_count,
        );
        if !report.skipped.is_empty() || !report.rejected.is_empty() {
            println!(
                "          ({} skipped for priority, {} geometry parts rejected)",
                report.skipped.len(),
                report.rejected.len()
            );
        }
    }
}
