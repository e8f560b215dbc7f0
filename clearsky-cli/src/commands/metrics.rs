//! `clearsky metrics`: clear/cloudy counts from the inventory log.

use clap::Args;
use clearsky::source::DataSource;
use clearsky::RevNumber;

use super::common::DataArgs;
use crate::error::CliError;

#[derive(Debug, Args)]
pub struct MetricsArgs {
    /// Only this rev (default: every rev in the inventory)
    #[arg(long)]
    pub rev: Option<RevNumber>,

    /// Cloud-cover percentage splitting clear from cloudy
    #[arg(long)]
    pub threshold: Option<f64>,

    #[command(flatten)]
    pub data: DataArgs,
}

/// Run the `metrics` command.
pub fn run(args: MetricsArgs) -> Result<(), CliError> {
    let mut config = args.data.load_config()?;
    if let Some(threshold) = args.threshold {
        config = config.with_cloud_threshold(threshold);
    }

    let records = DataArgs::source(&config).inventory()?;
    let collector = config.metrics();
    let metrics = match args.rev {
        Some(rev) => vec![collector.collect(&records, rev)],
        None => collector.collect_all(&records),
    };

    println!("Threshold: {}%", collector.threshold());
    println!("{:>8}  {:>5}  {:>6}", "rev", "clear", "cloudy");
    for m in metrics {
        println!("{:>8}  {:>5}  {:>6}", m.rev, m.clear_count, m.cloudy_count);
    }
    Ok(())
}
