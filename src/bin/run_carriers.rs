//! Parallel batch driver: assembles each carrier's price sheet on its own
//! rayon worker and merges the per-carrier reports into one summary.
//!
//! Usage:
//!   run_carriers --support data/support.csv --sk-price sk.csv --kt-price kt.csv --lg-price lg.csv

use anyhow::Context;
use chrono::NaiveDate;
use clap::Parser;
use pricing_engine::tables::{loader, Carrier, PriceSheet};
use pricing_engine::{
    output, RateTableStore, RebateConfig, RebateEngine, SummaryAssembler, SummaryReport,
};
use rayon::prelude::*;
use std::path::PathBuf;
use std::time::Instant;

#[derive(Debug, Parser)]
#[command(name = "run_carriers", about = "Assemble all carrier sheets in parallel")]
struct Args {
    #[arg(long, default_value = "data/support.csv")]
    support: PathBuf,

    #[arg(long)]
    sk_price: Option<PathBuf>,

    #[arg(long)]
    kt_price: Option<PathBuf>,

    #[arg(long)]
    lg_price: Option<PathBuf>,

    #[arg(long, default_value = "data/product_group_nm.csv")]
    product_groups: PathBuf,

    #[arg(long, default_value = "data/rebate_config.json")]
    rebate_config: PathBuf,

    #[arg(long, default_value = "summary.csv")]
    summary_out: PathBuf,

    #[arg(long, default_value = "unmatched_products.csv")]
    unmatched_out: PathBuf,

    #[arg(long)]
    as_of: Option<NaiveDate>,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let load_start = Instant::now();
    let support = loader::load_support_csv(&args.support)
        .with_context(|| format!("loading support table from {}", args.support.display()))?;
    let mappings = loader::load_product_groups_csv(&args.product_groups)
        .with_context(|| format!("loading product-group table from {}", args.product_groups.display()))?;
    let config = RebateConfig::from_path(&args.rebate_config)
        .with_context(|| format!("loading rebate config from {}", args.rebate_config.display()))?;

    let mut sheets: Vec<PriceSheet> = Vec::new();
    for (carrier, path) in [
        (Carrier::Sk, &args.sk_price),
        (Carrier::Kt, &args.kt_price),
        (Carrier::Lg, &args.lg_price),
    ] {
        if let Some(path) = path {
            sheets.push(
                loader::load_price_sheet_csv(carrier, path)
                    .with_context(|| format!("loading {} price sheet", carrier))?,
            );
        }
    }
    anyhow::ensure!(!sheets.is_empty(), "no price sheets given");
    println!(
        "Loaded {} support rows, {} mappings, {} sheets in {:?}",
        support.len(),
        mappings.len(),
        sheets.len(),
        load_start.elapsed()
    );

    let as_of = args.as_of.unwrap_or_else(|| chrono::Local::now().date_naive());
    let store = RateTableStore::build(support, mappings);
    let engine = RebateEngine::new(config, as_of);
    let assembler = SummaryAssembler::new(&store, &engine);

    let assemble_start = Instant::now();
    let report = sheets
        .par_iter()
        .map(|sheet| {
            let sheet_start = Instant::now();
            let segment = assembler.assemble_sheet(sheet);
            println!(
                "  {}: {} rows, {} cells, {} dropped ({:?})",
                sheet.carrier,
                segment.rows.len(),
                segment.diagnostics.cells_considered,
                segment.diagnostics.dropped_cells(),
                sheet_start.elapsed()
            );
            segment
        })
        .reduce(SummaryReport::default, |mut merged, segment| {
            merged.merge(segment);
            merged
        });
    println!(
        "Assembled {} rows total in {:?}",
        report.rows.len(),
        assemble_start.elapsed()
    );

    output::write_summary_csv(&args.summary_out, &report.rows)?;
    output::write_unmatched_csv(&args.unmatched_out, &report.diagnostics)?;
    println!(
        "Wrote {} and {}",
        args.summary_out.display(),
        args.unmatched_out.display()
    );

    if report.rebate_stats.total_applied > 0 {
        println!(
            "Rebates: {} rows adjusted, {}원 total",
            report.rebate_stats.total_applied, report.rebate_stats.total_rebate_amount
        );
    }

    Ok(())
}
