//! `clearsky revs`: list revs in the visibility layer.

use std::collections::BTreeMap;

use clap::Args;
use clearsky::source::DataSource;
use clearsky::RevNumber;

use super::common::DataArgs;
use crate::error::CliError;

#[derive(Debug, Args)]
pub struct RevsArgs {
    #[command(flatten)]
    pub data: DataArgs,
}

/// Run the `revs` command.
pub fn run(args: RevsArgs) -> Result<(), CliError> {
    let config = args.data.load_config()?;
    let cells = DataArgs::source(&config).visibility_cells()?;

    let counts = cells.iter().fold(BTreeMap::<RevNumber, usize>::new(), |mut m, c| {
        *m.entry(c.rev_num).or_default() += 1;
        m
    });

    if counts.is_empty() {
        println!("No revs in {}", config.data.visibility);
        return Ok(());
    }

    println!("{:>8}  {:>5}", "rev", "cells");
    for (rev, count) in counts {
        println!("{:>8}  {:>5}", rev, count);
    }
    Ok(())
}
