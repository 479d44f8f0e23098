//! Price an entire policy block from CSV inputs
//!
//! Loads a mortality table, discount curve, expense spec and policy batch,
//! solves breakeven premiums across worker threads partitioned by policy, and
//! writes one price per policy id.

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use rayon::prelude::*;
use serde::Serialize;

use pricing_system::assumptions::loader::{
    load_discount_curve, load_expense_spec, load_mortality_table,
};
use pricing_system::policy::loader::load_policy_batch;
use pricing_system::{PolicyPrice, PricingEngine};

#[derive(Parser, Debug)]
#[command(name = "price_block", about = "Batch breakeven pricing for a policy block")]
struct Args {
    /// Mortality table CSV (age,qx)
    #[arg(long)]
    mortality: PathBuf,

    /// Mortality table name
    #[arg(long, default_value = "mortality")]
    mortality_name: String,

    /// Discount curve CSV (year,rate)
    #[arg(long)]
    curve: PathBuf,

    /// Expense specification CSV (Product,Description,Basis,Type,Amount)
    #[arg(long)]
    expenses: PathBuf,

    /// Policy batch CSV
    #[arg(long)]
    policies: PathBuf,

    /// Annual expense inflation rate
    #[arg(long, default_value_t = 0.03)]
    inflation: f64,

    /// Policies per worker chunk
    #[arg(long, default_value_t = 512)]
    chunk_size: usize,

    /// Output CSV path
    #[arg(long, default_value = "premiums.csv")]
    output: PathBuf,

    /// Also write a JSON run summary next to the output
    #[arg(long)]
    json_summary: bool,
}

#[derive(Debug, Serialize)]
struct RunSummary {
    policies: usize,
    chunks: usize,
    elapsed_ms: u128,
    total_premium: f64,
    min_premium: f64,
    max_premium: f64,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let start = Instant::now();

    let mortality = Arc::new(
        load_mortality_table(&args.mortality, &args.mortality_name)
            .map_err(|e| anyhow::anyhow!("{e}"))
            .context("loading mortality table")?,
    );
    let curve = Arc::new(
        load_discount_curve(&args.curve, "curve")
            .map_err(|e| anyhow::anyhow!("{e}"))
            .context("loading discount curve")?,
    );
    let expense_spec = load_expense_spec(&args.expenses)
        .map_err(|e| anyhow::anyhow!("{e}"))
        .context("loading expense spec")?;
    let batch = load_policy_batch(&args.policies)
        .map_err(|e| anyhow::anyhow!("{e}"))
        .context("loading policy batch")?;

    println!(
        "Loaded {} policies, {} expense lines in {:?}",
        batch.len(),
        expense_spec.len(),
        start.elapsed()
    );

    let engine = PricingEngine::new(mortality, curve, expense_spec, args.inflation);

    // No policy couples to another, so the block partitions freely across
    // workers; the probability surfaces are shared read-only.
    let price_start = Instant::now();
    let indices: Vec<usize> = (0..batch.len()).collect();
    let chunks: Vec<&[usize]> = indices.chunks(args.chunk_size.max(1)).collect();
    let chunk_count = chunks.len();

    let prices: Vec<PolicyPrice> = chunks
        .into_par_iter()
        .map(|chunk| {
            let subset = batch.subset(chunk);
            engine.price_policy_batch(&subset)
        })
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .flatten()
        .collect();

    println!(
        "Priced {} policies across {} chunks in {:?}",
        prices.len(),
        chunk_count,
        price_start.elapsed()
    );

    let mut file = File::create(&args.output).context("creating output file")?;
    writeln!(file, "policy_id,premium")?;
    for price in &prices {
        writeln!(file, "{},{:.6}", price.policy_id, price.premium)?;
    }
    println!("Premiums written to {}", args.output.display());

    if args.json_summary {
        let total: f64 = prices.iter().map(|p| p.premium).sum();
        let summary = RunSummary {
            policies: prices.len(),
            chunks: chunk_count,
            elapsed_ms: start.elapsed().as_millis(),
            total_premium: total,
            min_premium: prices.iter().map(|p| p.premium).fold(f64::INFINITY, f64::min),
            max_premium: prices.iter().map(|p| p.premium).fold(f64::NEG_INFINITY, f64::max),
        };
        let summary_path = args.output.with_extension("summary.json");
        let mut file = File::create(&summary_path).context("creating summary file")?;
        writeln!(file, "{}", serde_json::to_string_pretty(&summary)?)?;
        println!("Summary written to {}", summary_path.display());
    }

    Ok(())
}
