//! Integration tests for the runner: CSV on disk → config → engine → report.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use fxlab_core::domain::{ExitReason, Signal};
use fxlab_core::engine::{run_backtest, EngineConfig, RunOutcome};
use fxlab_runner::config::{BacktestConfig, DataConfig};
use fxlab_runner::data_loader::{generate_synthetic_bars, load_bars_csv, write_bars_csv};
use fxlab_runner::metrics::PerformanceReport;
use fxlab_runner::runner::{run_batch, run_single_backtest, RunError};

// ─── Fixtures ────────────────────────────────────────────────────────

fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    let mut f = std::fs::File::create(&path).unwrap();
    f.write_all(contents.as_bytes()).unwrap();
    path
}

/// Synthetic series saved in the generic layout.
fn write_synthetic_csv(dir: &Path, n: usize, seed: u64) -> PathBuf {
    let bars = generate_synthetic_bars(n, seed, 145.0);
    let path = dir.join(format!("syn_{seed}.csv"));
    let file = std::fs::File::create(&path).unwrap();
    write_bars_csv(file, &bars).unwrap();
    path
}

fn config_toml(data_path: &Path, signal: &str) -> String {
    format!(
        r#"
[data]
path = "{}"
symbol = "USDJPY"

[engine]
initial_capital = 100000.0
risk_fraction = 0.01
stop_loss_distance = 0.15
take_profit_distance = 0.30
spread = 0.01
point_value = 100000.0
max_position_size = 10.0
min_position_size = 0.01
size_step = 0.01

[signal]
{signal}
"#,
        data_path.display().to_string().replace('\\', "/")
    )
}

// ─── Worked example through the loader ───────────────────────────────

#[test]
fn metatrader_csv_worked_example() {
    let dir = TempDir::new().unwrap();
    let path = write_file(
        dir.path(),
        "three.csv",
        "<DTYYYYMMDD>,<TIME>,<OPEN>,<HIGH>,<LOW>,<CLOSE>,<TICKVOL>\n\
         20240102,0,100,101,99,100.5,10\n\
         20240102,15,100.5,102,100,101.8,10\n\
         20240102,30,101.8,103,101,102.5,10\n",
    );

    let series = load_bars_csv(&path, &DataConfig::default()).unwrap();
    assert_eq!(series.bars.len(), 3);

    let signals = [Signal::Long, Signal::Long, Signal::Flat];
    let config = EngineConfig::new(10_000.0, 0.01, 1.0, 2.0);
    let run = run_backtest(&series.bars, &signals, &config).unwrap();

    assert_eq!(run.trades.len(), 1);
    let trade = &run.trades[0];
    assert_eq!(trade.entry_price, 100.5);
    assert_eq!(trade.exit_price, 102.5);
    assert_eq!(trade.exit_reason, ExitReason::TakeProfit);
    assert!((trade.size - 100.0).abs() < 1e-9);
    assert!((trade.pnl_amount - 200.0).abs() < 1e-9);

    let report = PerformanceReport::compute(&run.trades, &run.balance_history);
    assert_eq!(report.trade_count, 1);
    assert_eq!(report.win_rate, 1.0);
    assert_eq!(report.profit_factor, f64::INFINITY);
    assert!((report.final_balance - 10_200.0).abs() < 1e-9);
}

// ─── Config file end to end ──────────────────────────────────────────

#[test]
fn run_from_config_file() {
    let dir = TempDir::new().unwrap();
    let data = write_synthetic_csv(dir.path(), 2_000, 11);
    let cfg_path = write_file(
        dir.path(),
        "run.toml",
        &config_toml(&data, "type = \"ma_crossover\"\nfast_period = 10\nslow_period = 40"),
    );

    let config = BacktestConfig::from_file(&cfg_path).unwrap();
    let result = run_single_backtest(&config).unwrap();

    assert_eq!(result.symbol, "USDJPY");
    assert_eq!(result.bar_count, 2_000);
    assert_eq!(result.warmup_bars, 39);
    assert!(!result.synthetic);
    assert!(!result.trades.is_empty());

    // balance identity
    let total: f64 = result.trades.iter().map(|t| t.pnl_amount).sum();
    let final_balance = *result.balance_history.last().unwrap();
    assert!((final_balance - (100_000.0 + total)).abs() < 1e-6);
    assert_eq!(result.balance_history.len(), result.trades.len() + 1);

    // sizing respects the lot step and cap
    for t in &result.trades {
        assert!(t.size <= 10.0 + 1e-9);
        let lots = t.size / 0.01;
        assert!((lots - lots.round()).abs() < 1e-6, "size {} off step", t.size);
    }

    // the report is a pure function of the ledger
    let recomputed = PerformanceReport::compute(&result.trades, &result.balance_history);
    assert_eq!(recomputed.trade_count, result.report.trade_count);
    assert_eq!(recomputed.total_pnl, result.report.total_pnl);
}

#[test]
fn every_signal_type_runs() {
    let dir = TempDir::new().unwrap();
    let data = write_synthetic_csv(dir.path(), 1_500, 21);
    let signals = [
        "type = \"ma_crossover\"\nfast_period = 5\nslow_period = 30\nma_type = \"ema\"",
        "type = \"momentum\"\nwindow = 24",
        "type = \"mean_reversion\"\nsma_period = 50\nthreshold = 0.2",
        concat!(
            "type = \"trend_filter\"\nfast_period = 10\nslow_period = 30\n",
            "trend_period = 60\nadx_threshold = 15.0",
        ),
    ];
    for signal in signals {
        let config = BacktestConfig::from_toml(&config_toml(&data, signal)).unwrap();
        let result = run_single_backtest(&config).unwrap();
        assert_eq!(result.signal_name, config.signal.name());
        assert_eq!(result.outcome, RunOutcome::Completed);
        assert!(result.trades.iter().all(|t| t.entry_bar > result.warmup_bars));
    }
}

#[test]
fn repeated_runs_are_identical() {
    let dir = TempDir::new().unwrap();
    let data = write_synthetic_csv(dir.path(), 1_000, 5);
    let config =
        BacktestConfig::from_toml(&config_toml(&data, "type = \"momentum\"\nwindow = 12")).unwrap();

    let a = run_single_backtest(&config).unwrap();
    let b = run_single_backtest(&config).unwrap();
    assert_eq!(a.trades, b.trades);
    assert_eq!(a.balance_history, b.balance_history);
    assert_eq!(a.equity_curve, b.equity_curve);
    assert_eq!(a.dataset_hash, b.dataset_hash);
    assert_eq!(a.config_hash, b.config_hash);
}

#[test]
fn missing_data_file_is_a_data_error() {
    let dir = TempDir::new().unwrap();
    let config = BacktestConfig::from_toml(&config_toml(
        &dir.path().join("nope.csv"),
        "type = \"momentum\"\nwindow = 12",
    ))
    .unwrap();
    assert!(matches!(
        run_single_backtest(&config),
        Err(RunError::Data(_))
    ));
}

#[test]
fn batch_over_files() {
    let dir = TempDir::new().unwrap();
    let configs: Vec<BacktestConfig> = (0..4)
        .map(|seed| {
            let data = write_synthetic_csv(dir.path(), 800, seed);
            BacktestConfig::from_toml(&config_toml(&data, "type = \"momentum\"\nwindow = 16"))
                .unwrap()
        })
        .collect();

    let results = run_batch(&configs);
    assert_eq!(results.len(), 4);
    let hashes: Vec<String> = results
        .into_iter()
        .map(|r| r.unwrap().dataset_hash)
        .collect();
    // distinct seeds → distinct data
    for i in 0..hashes.len() {
        for j in i + 1..hashes.len() {
            assert_ne!(hashes[i], hashes[j]);
        }
    }
}
