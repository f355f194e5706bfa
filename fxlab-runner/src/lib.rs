//! FxLab Runner — backtest orchestration, data loading, reporting, export.
//!
//! This crate builds on `fxlab-core` to provide:
//! - TOML run configuration with signal generator selection
//! - CSV bar loading (MetaTrader and generic layouts) and synthetic series
//! - Single and batch runners producing a versioned `BacktestResult`
//! - Trade-level performance report
//! - JSON / CSV / Markdown artifacts

pub mod config;
pub mod data_loader;
pub mod export;
pub mod metrics;
pub mod runner;

pub use config::{BacktestConfig, ConfigError, DataConfig, SignalConfig, SyntheticSpec};
pub use data_loader::{
    generate_synthetic_bars, load_bars_csv, load_series, parse_bars_csv, write_bars_csv,
    LoadError, LoadedSeries,
};
pub use export::{
    export_balance_csv, export_equity_csv, export_json, export_trades_csv, generate_report,
    import_json, load_artifacts, save_artifacts,
};
pub use metrics::{Benchmark, ExitReasonCounts, PerformanceReport};
pub use runner::{
    run_backtest_from_bars, run_batch, run_single_backtest, BacktestResult, RunError,
    SCHEMA_VERSION,
};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn performance_report_is_send_sync() {
        assert_send::<PerformanceReport>();
        assert_sync::<PerformanceReport>();
    }

    #[test]
    fn backtest_result_is_send_sync() {
        assert_send::<BacktestResult>();
        assert_sync::<BacktestResult>();
    }

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<BacktestConfig>();
        assert_sync::<BacktestConfig>();
        assert_send::<LoadedSeries>();
        assert_sync::<LoadedSeries>();
    }

    #[test]
    fn errors_are_send_sync() {
        assert_send::<RunError>();
        assert_sync::<RunError>();
    }
}
