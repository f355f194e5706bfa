//! Backtest runner — wires together config, data, signals, engine, and report.
//!
//! Three entry points:
//! - `run_single_backtest()`: loads data per the config, then runs. Used by CLI.
//! - `run_backtest_from_bars()`: takes pre-loaded bars. No I/O.
//! - `run_batch()`: independent configs in parallel.

use chrono::NaiveDateTime;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use fxlab_core::domain::{Bar, Trade};
use fxlab_core::engine::{run_backtest, run_backtest_gated, EngineError, RunOutcome};

use crate::config::{BacktestConfig, ConfigError};
use crate::data_loader::{load_series, LoadError};
use crate::metrics::{Benchmark, PerformanceReport};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
}

/// Current schema version for persisted artifacts.
pub const SCHEMA_VERSION: u32 = 1;

/// Complete result of a single backtest run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub symbol: String,
    pub config_hash: String,
    pub dataset_hash: String,
    #[serde(default)]
    pub synthetic: bool,
    pub signal_name: String,
    pub report: PerformanceReport,
    /// Missing in manifests written before the benchmark existed.
    #[serde(default)]
    pub benchmark: Benchmark,
    pub trades: Vec<Trade>,
    pub balance_history: Vec<f64>,
    pub equity_curve: Vec<f64>,
    pub bar_count: usize,
    pub warmup_bars: usize,
    pub signal_count: usize,
    pub skipped_entries: usize,
    pub outcome: RunOutcome,
    pub first_timestamp: Option<NaiveDateTime>,
    pub last_timestamp: Option<NaiveDateTime>,
}

/// Default schema version for serde deserialization of older JSON without the field.
fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl BacktestResult {
    pub fn is_ruined(&self) -> bool {
        matches!(self.outcome, RunOutcome::Ruined { .. })
    }
}

/// Run a single backtest from a BacktestConfig, loading its data source.
pub fn run_single_backtest(config: &BacktestConfig) -> Result<BacktestResult, RunError> {
    config.validate()?;
    let series = load_series(&config.data)?;
    let mut result = run_backtest_from_bars(config, &series.bars, &series.dataset_hash)?;
    result.synthetic = series.synthetic;
    Ok(result)
}

/// Run a backtest on pre-loaded bars. No I/O.
///
/// The engine's warmup is raised to the generator's lookback so that no
/// signal from an indicator's undefined region is ever evaluated.
pub fn run_backtest_from_bars(
    config: &BacktestConfig,
    bars: &[Bar],
    dataset_hash: &str,
) -> Result<BacktestResult, RunError> {
    let generator = config.signal.build()?;

    let signals = generator.generate(bars);

    let warmup = config.engine.warmup_bars.max(generator.lookback());
    let engine_config = config.engine.clone().with_warmup(warmup);
    let run = match &config.session {
        Some(session) => {
            run_backtest_gated(bars, &signals, &session.entry_mask(bars), &engine_config)?
        }
        None => run_backtest(bars, &signals, &engine_config)?,
    };

    let report = PerformanceReport::compute(&run.trades, &run.balance_history);
    let benchmark = Benchmark::compute(bars, &report);

    info!(
        symbol = %config.data.symbol,
        signal = generator.name(),
        trades = report.trade_count,
        final_balance = report.final_balance,
        vs_buy_and_hold = benchmark.outperformance,
        "run complete"
    );

    Ok(BacktestResult {
        schema_version: SCHEMA_VERSION,
        symbol: config.data.symbol.clone(),
        config_hash: config.config_hash()?,
        dataset_hash: dataset_hash.to_string(),
        synthetic: false,
        signal_name: generator.name().to_string(),
        report,
        benchmark,
        trades: run.trades,
        balance_history: run.balance_history,
        equity_curve: run.equity_curve,
        bar_count: run.bar_count,
        warmup_bars: run.warmup_bars,
        signal_count: run.signal_count,
        skipped_entries: run.skipped_entries,
        outcome: run.outcome,
        first_timestamp: bars.first().map(|b| b.timestamp),
        last_timestamp: bars.last().map(|b| b.timestamp),
    })
}

/// Run independent configurations in parallel.
///
/// Results come back in input order; one failing config does not abort
/// the others.
pub fn run_batch(configs: &[BacktestConfig]) -> Vec<Result<BacktestResult, RunError>> {
    configs.par_iter().map(run_single_backtest).collect()
}
