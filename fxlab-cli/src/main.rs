//! FxLab CLI — run, batch, and synthetic data commands.
//!
//! Commands:
//! - `run` — execute a backtest from a TOML config file
//! - `batch` — execute several configs in parallel
//! - `synth` — write a seeded synthetic bar series as CSV
//!
//! Log verbosity follows `RUST_LOG` (default `info`); logs go to stderr.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use fxlab_core::engine::RunOutcome;
use fxlab_runner::runner::{run_batch, run_single_backtest};
use fxlab_runner::{
    generate_synthetic_bars, save_artifacts, write_bars_csv, BacktestConfig, BacktestResult,
};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fxlab", about = "FxLab: single-instrument bar backtester")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a backtest from a TOML config file.
    Run {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// CSV of bars; overrides `data.path` in the config.
        #[arg(long)]
        data: Option<PathBuf>,

        /// Output directory for run artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,

        /// Print the summary only; write no artifacts.
        #[arg(long, default_value_t = false)]
        no_save: bool,
    },
    /// Execute several config files in parallel.
    Batch {
        /// TOML config files.
        #[arg(long, required = true, num_args = 1..)]
        config: Vec<PathBuf>,

        /// Output directory for run artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,

        /// Print the summary only; write no artifacts.
        #[arg(long, default_value_t = false)]
        no_save: bool,
    },
    /// Write a synthetic random-walk series as CSV.
    Synth {
        /// Number of bars.
        #[arg(long, default_value_t = 10_000)]
        bars: usize,

        /// RNG seed.
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Price of the first bar.
        #[arg(long, default_value_t = 100.0)]
        start_price: f64,

        /// Output CSV path.
        #[arg(long)]
        out: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            data,
            output_dir,
            no_save,
        } => run_cmd(&config, data, &output_dir, no_save),
        Commands::Batch {
            config,
            output_dir,
            no_save,
        } => batch_cmd(&config, &output_dir, no_save),
        Commands::Synth {
            bars,
            seed,
            start_price,
            out,
        } => synth_cmd(bars, seed, start_price, &out),
    }
}

fn load_config(path: &Path) -> Result<BacktestConfig> {
    BacktestConfig::from_file(path).with_context(|| format!("loading {}", path.display()))
}

fn run_cmd(
    config_path: &Path,
    data: Option<PathBuf>,
    output_dir: &Path,
    no_save: bool,
) -> Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(path) = data {
        config.data.path = Some(path);
    }

    let result = run_single_backtest(&config)?;
    print_summary(&result);

    if !no_save {
        let run_dir = save_artifacts(&result, output_dir)?;
        println!("Artifacts saved to: {}", run_dir.display());
    }
    Ok(())
}

fn batch_cmd(config_paths: &[PathBuf], output_dir: &Path, no_save: bool) -> Result<()> {
    let configs = config_paths
        .iter()
        .map(|p| load_config(p))
        .collect::<Result<Vec<_>>>()?;

    info!(runs = configs.len(), "starting batch");
    let results = run_batch(&configs);

    println!();
    println!(
        "{:<32} {:<10} {:<16} {:>7} {:>9} {:>14}",
        "config", "symbol", "signal", "trades", "win rate", "final balance"
    );

    let mut failures = 0;
    for (path, result) in config_paths.iter().zip(results) {
        let name = path.file_name().map_or_else(
            || path.display().to_string(),
            |n| n.to_string_lossy().to_string(),
        );
        match result {
            Ok(result) => {
                let r = &result.report;
                println!(
                    "{:<32} {:<10} {:<16} {:>7} {:>8.1}% {:>14.2}{}",
                    name,
                    result.symbol,
                    result.signal_name,
                    r.trade_count,
                    r.win_rate * 100.0,
                    r.final_balance,
                    if result.is_ruined() { "  RUINED" } else { "" }
                );
                if !no_save {
                    let run_dir = save_artifacts(&result, output_dir)?;
                    info!(dir = %run_dir.display(), "artifacts saved");
                }
            }
            Err(e) => {
                failures += 1;
                error!(config = %name, error = %e, "run failed");
                println!("{name:<32} FAILED: {e}");
            }
        }
    }

    if failures > 0 {
        bail!("{failures} of {} runs failed", config_paths.len());
    }
    Ok(())
}

fn synth_cmd(bars: usize, seed: u64, start_price: f64, out: &Path) -> Result<()> {
    if bars == 0 {
        bail!("--bars must be at least 1");
    }
    if !start_price.is_finite() || start_price <= 0.0 {
        bail!("--start-price must be positive");
    }

    let series = generate_synthetic_bars(bars, seed, start_price);
    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let file = std::fs::File::create(out)
        .with_context(|| format!("failed to create {}", out.display()))?;
    write_bars_csv(file, &series)?;

    println!("Wrote {bars} bars (seed {seed}) to {}", out.display());
    Ok(())
}

fn print_summary(result: &BacktestResult) {
    println!();
    println!("=== Backtest Result ===");
    println!("Symbol:         {}", result.symbol);
    println!("Signal:         {}", result.signal_name);
    if let (Some(first), Some(last)) = (result.first_timestamp, result.last_timestamp) {
        println!("Period:         {first} to {last}");
    }
    println!(
        "Bars:           {} ({} warmup)",
        result.bar_count, result.warmup_bars
    );
    println!(
        "Signals:        {} ({} skipped by sizing)",
        result.signal_count, result.skipped_entries
    );
    println!();
    println!("--- Performance ---");
    println!("{}", result.report);
    println!("{}", result.benchmark);

    if let RunOutcome::Ruined { bar_index } = result.outcome {
        println!();
        println!("WARNING: account ruined at bar {bar_index}; later bars were not processed");
    }
    if result.synthetic {
        println!();
        println!("WARNING: Results based on SYNTHETIC data");
    }
}
