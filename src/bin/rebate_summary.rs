//! Prints the active rebate configuration in a human-readable form.

use anyhow::Context;
use clap::Parser;
use pricing_engine::RebateConfig;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "rebate_summary", about = "Show the current dealer rebate rules")]
struct Args {
    /// Rebate rule configuration (JSON)
    #[arg(long, default_value = "data/rebate_config.json")]
    rebate_config: PathBuf,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = RebateConfig::from_path(&args.rebate_config).with_context(|| {
        format!(
            "loading rebate configuration from {}",
            args.rebate_config.display()
        )
    })?;
    println!("{}", config.summary());

    Ok(())
}
