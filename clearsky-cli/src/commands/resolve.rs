//! `clearsky resolve`: per-order extents for a rev's selection.

use clap::Args;
use clearsky::resolver::{GeoJsonExporter, OrderGeometryResolver};
use clearsky::source::DataSource;
use clearsky::RevNumber;

use super::common::{format_opt, DataArgs};
use crate::error::CliError;

#[derive(Debug, Args)]
pub struct ResolveArgs {
    /// Rev whose selected orders are resolved
    #[arg(long)]
    pub rev: RevNumber,

    /// Select every touching order regardless of its ONA limit
    #[arg(long)]
    pub ignore_ona: bool,

    #[command(flatten)]
    pub data: DataArgs,
}

/// Run the `resolve` command.
pub fn run(args: ResolveArgs) -> Result<(), CliError> {
    let mut config = args.data.load_config()?;
    if args.ignore_ona {
        config = config.with_respect_ona(false);
    }

    let source = DataArgs::source(&config);
    let orders = source.orders()?;
    let cells = source.visibility_cells()?;
    let selection = config.selector().select(&orders, &cells, args.rev);
    if selection.is_empty() {
        println!("No orders selected for rev {}", args.rev);
        return Ok(());
    }

    let resolved =
        OrderGeometryResolver::new().resolve_orders(&selection.orders, &GeoJsonExporter::new())?;

    println!(
        "{:<16}  {:>11}  {:>11}  {:>11}  {:>11}  {:>10}  {:>10}",
        "id", "x_min", "x_max", "y_min", "y_max", "width_km", "height_km"
    );
    for order in &resolved {
        println!(
            "{:<16}  {:>11}  {:>11}  {:>11}  {:>11}  {:>10}  {:>10}",
            order.id.as_str(),
            format_opt(order.x_min, 6),
            format_opt(order.x_max, 6),
            format_opt(order.y_min, 6),
            format_opt(order.y_max, 6),
            format_opt(order.width, 2),
            format_opt(order.height, 2),
        );
    }
    println!();
    println!(
        "{} orders resolved for rev {} ({} locked out by ONA)",
        resolved.len(),
        args.rev,
        selection.locked_out.len()
    );
    Ok(())
}
