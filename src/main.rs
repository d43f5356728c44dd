//! Pricing Engine CLI
//!
//! Loads the three source tables and the rebate configuration, assembles the
//! summary table, writes the CSV outputs, and prints the run report.

use anyhow::Context;
use chrono::NaiveDate;
use clap::Parser;
use pricing_engine::assembler::Diagnostics;
use pricing_engine::rebate::RebateStats;
use pricing_engine::tables::{loader, Carrier, PriceSheet};
use pricing_engine::{output, RateTableStore, RebateConfig, RebateEngine, SummaryAssembler, SummaryRow};
use std::path::PathBuf;
use std::time::Instant;

#[derive(Debug, Parser)]
#[command(name = "pricing_engine", about = "Build the dealer price summary table")]
struct Args {
    /// Crawled carrier support table (CSV)
    #[arg(long, default_value = "data/support.csv")]
    support: PathBuf,

    /// SK dealer price sheet (CSV)
    #[arg(long)]
    sk_price: Option<PathBuf>,

    /// KT dealer price sheet (CSV)
    #[arg(long)]
    kt_price: Option<PathBuf>,

    /// LG dealer price sheet (CSV)
    #[arg(long)]
    lg_price: Option<PathBuf>,

    /// Device -> product-group mapping table (CSV)
    #[arg(long, default_value = "data/product_group_nm.csv")]
    product_groups: PathBuf,

    /// Per-dealer rebate rule configuration (JSON)
    #[arg(long, default_value = "data/rebate_config.json")]
    rebate_config: PathBuf,

    /// Output path for the summary table
    #[arg(long, default_value = "summary.csv")]
    summary_out: PathBuf,

    /// Output path for the unmatched-combination report
    #[arg(long, default_value = "unmatched_products.csv")]
    unmatched_out: PathBuf,

    /// Evaluation date for rebate validity windows (defaults to today)
    #[arg(long)]
    as_of: Option<NaiveDate>,

    /// How many unmatched combinations to print to the console
    #[arg(long, default_value_t = 10)]
    top: usize,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    println!("Pricing Engine v0.1.0");
    println!("=====================\n");

    let start = Instant::now();

    let support = loader::load_support_csv(&args.support)
        .with_context(|| format!("loading support table from {}", args.support.display()))?;
    println!("Support: {} rows", support.len());

    let mappings = loader::load_product_groups_csv(&args.product_groups).with_context(|| {
        format!(
            "loading product-group table from {}",
            args.product_groups.display()
        )
    })?;
    println!("Product groups: {} rows", mappings.len());

    let mut sheets: Vec<PriceSheet> = Vec::new();
    for (carrier, path) in [
        (Carrier::Sk, &args.sk_price),
        (Carrier::Kt, &args.kt_price),
        (Carrier::Lg, &args.lg_price),
    ] {
        if let Some(path) = path {
            let sheet = loader::load_price_sheet_csv(carrier, path)
                .with_context(|| format!("loading {} price sheet from {}", carrier, path.display()))?;
            println!(
                "{} price sheet: {} dealers x {} plan columns",
                carrier,
                sheet.rows.len(),
                sheet.columns.len()
            );
            sheets.push(sheet);
        }
    }
    anyhow::ensure!(!sheets.is_empty(), "no price sheets given; pass at least one of --sk-price/--kt-price/--lg-price");

    let config = RebateConfig::from_path(&args.rebate_config).with_context(|| {
        format!(
            "loading rebate configuration from {}",
            args.rebate_config.display()
        )
    })?;
    println!("\n{}\n", config.summary());

    let as_of = args.as_of.unwrap_or_else(|| chrono::Local::now().date_naive());
    println!("Evaluation date: {}", as_of);

    let store = RateTableStore::build(support, mappings);
    let engine = RebateEngine::new(config, as_of);
    let assembler = SummaryAssembler::new(&store, &engine);

    let report = assembler.assemble(&sheets);
    println!(
        "\nAssembled {} summary rows in {:?} ({} cells considered, {} dropped)",
        report.rows.len(),
        start.elapsed(),
        report.diagnostics.cells_considered,
        report.diagnostics.dropped_cells()
    );

    output::write_summary_csv(&args.summary_out, &report.rows)?;
    println!("Summary written to: {}", args.summary_out.display());
    output::write_unmatched_csv(&args.unmatched_out, &report.diagnostics)?;
    println!("Unmatched report written to: {}", args.unmatched_out.display());

    print_match_failures(&report.diagnostics, args.top);
    check_high_dealer_subsidy(&report.rows);
    print_rebate_stats(&report.rebate_stats);
    print_high_rebate_report(&report.rebate_stats);

    Ok(())
}

/// Per-category match-failure listing, mirroring the unmatched CSV
fn print_match_failures(diagnostics: &Diagnostics, top: usize) {
    println!("\n=== Match failures ===");

    println!(
        "\n1. No product-group mapping: {} devices",
        diagnostics.unmapped_devices.len()
    );
    for (carrier, device) in &diagnostics.unmapped_devices {
        println!("   - {}: {}", carrier, device);
    }

    println!(
        "\n2. No storage info: {} devices",
        diagnostics.missing_storage_devices.len()
    );
    for (carrier, device) in &diagnostics.missing_storage_devices {
        println!("   - {}: {}", carrier, device);
    }

    println!(
        "\n3. No support match: {} combinations",
        diagnostics.no_support_match.len()
    );
    let mut entries: Vec<_> = diagnostics.no_support_match.iter().collect();
    entries.sort_by(|a, b| b.1.cmp(a.1));
    if !entries.is_empty() {
        println!("   (top {} shown)", top.min(entries.len()));
    }
    for (key, count) in entries.into_iter().take(top) {
        println!(
            "   - {} {} ({}, {}): {} times",
            key.carrier, key.device_nm, key.support_type, key.tier, count
        );
    }

    if diagnostics.cells_missing_fields > 0 {
        println!(
            "\n4. Missing numeric fields: {} cells dropped",
            diagnostics.cells_missing_fields
        );
    }
}

/// List resolved rows whose dealer subsidy is 1,000,000원 or more; amounts
/// this large usually mean a sheet typo and deserve a manual check
fn check_high_dealer_subsidy(rows: &[SummaryRow]) {
    let mut high: Vec<&SummaryRow> = rows
        .iter()
        .filter(|row| row.dealer_subsidy >= 1_000_000)
        .collect();
    if high.is_empty() {
        return;
    }
    high.sort_by(|a, b| b.dealer_subsidy.cmp(&a.dealer_subsidy));

    println!("\n=== High dealer subsidies (>= 1,000,000원) ===");
    for (idx, row) in high.iter().enumerate() {
        println!(
            "{}. {} | {} {} | {} {} {} | {}원",
            idx + 1,
            row.device_nm,
            row.carrier,
            row.dealer,
            row.join_type,
            row.support_type,
            row.rate_plan,
            row.dealer_subsidy
        );
    }
}

fn print_rebate_stats(stats: &RebateStats) {
    if stats.total_applied == 0 {
        return;
    }

    println!("\n=== Dealer rebate statistics ===");
    println!("Applied: {} rows", stats.total_applied);
    println!("Total rebate: {}원", stats.total_rebate_amount);
    println!(
        "Average rebate: {}원",
        stats.total_rebate_amount / stats.total_applied as i64
    );

    println!("\nBy dealer:");
    let mut dealers: Vec<_> = stats.by_dealer.iter().collect();
    dealers.sort_by(|a, b| b.1.total_rebate.cmp(&a.1.total_rebate));
    for (dealer, tally) in dealers.into_iter().take(10) {
        println!(
            "   {}: {} rows, total {}원",
            dealer, tally.count, tally.total_rebate
        );
    }

    println!("\nBy policy:");
    let mut policies: Vec<_> = stats.by_description.iter().collect();
    policies.sort_by(|a, b| b.1.count.cmp(&a.1.count));
    for (policy, tally) in policies.into_iter().take(10) {
        println!(
            "   {}: {} rows, total {}원",
            policy, tally.count, tally.total_rebate
        );
    }
}

fn print_high_rebate_report(stats: &RebateStats) {
    if stats.high_rebate_items.is_empty() {
        return;
    }

    println!("\n=== High rebates (>= 200,000원) ===");
    let mut items: Vec<_> = stats.high_rebate_items.iter().collect();
    items.sort_by(|a, b| b.rebate_amount.cmp(&a.rebate_amount));

    for item in &items {
        println!(
            "{:<15} {:<25} {:<8} {:>4}k +{}원  {}",
            item.dealer,
            item.device_nm,
            item.join_type,
            item.tier_k,
            item.rebate_amount,
            item.description
        );
    }

    if let Some(highest) = items.first() {
        println!(
            "\nHighest: {} - {} ({}, {}k) = +{}원",
            highest.dealer, highest.device_nm, highest.join_type, highest.tier_k, highest.rebate_amount
        );
    }
}
