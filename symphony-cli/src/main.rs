//! Symphony CLI — compile strategy trees into allocation matrices.
//!
//! Commands:
//! - `run` — compile one tree document against a price CSV
//! - `batch` — compile many trees from a TOML batch config, in parallel

mod config;
mod export;
mod loader;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use symphony_core::tree::collect_branch_conditions;
use symphony_core::{align_and_check, compile, parse_str, Aligned, PriceTable, StrategyNode};

use config::BatchConfig;
use export::save_artifacts;
use loader::load_price_csv;

#[derive(Parser)]
#[command(
    name = "symphony",
    about = "Symphony CLI — strategy-tree compiler and allocation validator"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile one tree document against a close-price CSV.
    Run {
        /// Path to the JSON tree document.
        #[arg(long)]
        tree: PathBuf,

        /// Path to the wide close-price CSV (date column + one close column per ticker).
        #[arg(long)]
        prices: PathBuf,

        /// Artifact name. Defaults to the tree file stem.
        #[arg(long)]
        name: Option<String>,

        /// Output directory for artifacts.
        #[arg(long, default_value = "out")]
        output_dir: PathBuf,
    },
    /// Compile every symphony listed in a TOML batch config.
    Batch {
        /// Path to the batch config file.
        #[arg(long)]
        config: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { tree, prices, name, output_dir } => {
            run_single(&tree, &prices, name, &output_dir)
        }
        Commands::Batch { config } => run_batch(&config),
    }
}

fn run_single(
    tree_path: &Path,
    prices_path: &Path,
    name: Option<String>,
    output_dir: &Path,
) -> Result<()> {
    let name = name.unwrap_or_else(|| {
        tree_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "symphony".to_string())
    });
    let tree = load_tree(tree_path)?;
    let prices = load_price_csv(prices_path)?;

    let aligned = compile_one(&tree, &prices)?;
    print_summary(&name, &aligned, &tree);

    let run_dir = save_artifacts(&name, &aligned, output_dir)?;
    println!("Artifacts saved to: {}", run_dir.display());
    Ok(())
}

fn run_batch(config_path: &Path) -> Result<()> {
    let config = BatchConfig::from_file(config_path)?;
    let prices = load_price_csv(&config.prices)?;

    // One failed symphony must not sink the batch: each entry reports its
    // own outcome and the process exits nonzero only if all of them failed.
    let outcomes: Vec<(String, Result<PathBuf>)> = config
        .symphonies
        .par_iter()
        .map(|entry| {
            let outcome = load_tree(&entry.tree)
                .and_then(|tree| compile_one(&tree, &prices))
                .and_then(|aligned| save_artifacts(&entry.name, &aligned, &config.out_dir));
            (entry.name.clone(), outcome)
        })
        .collect();

    let mut succeeded = 0;
    for (name, outcome) in &outcomes {
        match outcome {
            Ok(run_dir) => {
                succeeded += 1;
                println!("{name}: ok ({})", run_dir.display());
            }
            Err(err) => eprintln!("{name}: skipped: {err:#}"),
        }
    }
    println!("{succeeded}/{} symphonies compiled", outcomes.len());

    if succeeded == 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn load_tree(path: &Path) -> Result<StrategyNode> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_str(&text).with_context(|| format!("invalid tree document {}", path.display()))
}

fn compile_one(tree: &StrategyNode, prices: &PriceTable) -> Result<Aligned> {
    let compiled = compile(tree, prices)?;
    let aligned = align_and_check(compiled, prices, tree)?;
    Ok(aligned)
}

fn print_summary(name: &str, aligned: &Aligned, tree: &StrategyNode) {
    println!("Symphony:   {name}");
    println!("Start date: {}", aligned.start_date.format("%Y-%m-%d"));
    println!("Dates:      {}", aligned.allocations.len());
    println!(
        "Tickers:    {}",
        aligned
            .allocations
            .column_names()
            .collect::<Vec<_>>()
            .join(", ")
    );
    if aligned.failures.is_empty() {
        println!("Validation: every row sums to 1");
    } else {
        println!("Validation: {} failed rows", aligned.failures.len());
        for failure in &aligned.failures {
            println!(
                "  {} sums to {:.6}; suspect branches: {}",
                failure.date.format("%Y-%m-%d"),
                failure.sum,
                failure
                    .branch_ids
                    .iter()
                    .map(|id| id.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            );
        }
        // The guard chain of each suspect leaf tells the investigator which
        // conditions were in force when the row went wrong.
        let conditions = collect_branch_conditions(tree);
        for id in aligned.suspect_branches() {
            if let Some(guards) = conditions.get(&id) {
                println!("  branch {id}: {}", guards.join(" AND "));
            }
        }
    }
}
