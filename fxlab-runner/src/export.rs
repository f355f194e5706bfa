//! Run artifacts: manifest JSON, CSV ledgers, and a Markdown summary.
//!
//! A saved run is a directory holding everything needed to audit it later
//! without re-running the engine. The manifest is the source of truth; the
//! CSV and Markdown files are derived views. Manifests written by a newer
//! `SCHEMA_VERSION` than this build understands are refused on load.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use fxlab_core::domain::{ExitReason, Trade};
use fxlab_core::engine::RunOutcome;

use crate::metrics::{Num, Pct};
use crate::runner::{BacktestResult, SCHEMA_VERSION};

/// Trades listed individually in the Markdown report.
const REPORT_TRADE_ROWS: usize = 20;

// ─── Manifest ───────────────────────────────────────────────────────

/// Pretty-printed manifest JSON for one run.
pub fn export_json(result: &BacktestResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("serializing backtest manifest")
}

/// Parse a manifest, refusing schema versions newer than this build.
pub fn import_json(json: &str) -> Result<BacktestResult> {
    let result: BacktestResult = serde_json::from_str(json).context("parsing backtest manifest")?;
    if result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (this build reads up to {SCHEMA_VERSION})",
            result.schema_version
        );
    }
    Ok(result)
}

// ─── CSV ledgers ────────────────────────────────────────────────────

const TRADE_COLUMNS: [&str; 13] = [
    "direction",
    "entry_bar",
    "entry_time",
    "entry_price",
    "exit_bar",
    "exit_time",
    "exit_price",
    "exit_reason",
    "size",
    "gross_pnl",
    "cost",
    "pnl_amount",
    "bars_held",
];

/// One row per closed trade. Prices keep 6 decimals, money 2.
pub fn export_trades_csv(trades: &[Trade]) -> Result<String> {
    let mut out = csv::Writer::from_writer(Vec::new());
    out.write_record(TRADE_COLUMNS)?;
    for trade in trades {
        out.write_record([
            trade.direction.to_string(),
            trade.entry_bar.to_string(),
            trade.entry_time.to_string(),
            format!("{:.6}", trade.entry_price),
            trade.exit_bar.to_string(),
            trade.exit_time.to_string(),
            format!("{:.6}", trade.exit_price),
            trade.exit_reason.to_string(),
            format!("{:.4}", trade.size),
            format!("{:.2}", trade.gross_pnl),
            format!("{:.2}", trade.cost),
            format!("{:.2}", trade.pnl_amount),
            trade.bars_held().to_string(),
        ])?;
    }
    into_string(out)
}

/// Balance history: row 0 is the starting capital, then one row per trade.
pub fn export_balance_csv(balance_history: &[f64]) -> Result<String> {
    indexed_series_csv(("trade_index", "balance"), balance_history)
}

/// Mark-to-market equity, one row per bar.
pub fn export_equity_csv(equity_curve: &[f64]) -> Result<String> {
    indexed_series_csv(("bar_index", "equity"), equity_curve)
}

fn indexed_series_csv((index_col, value_col): (&str, &str), series: &[f64]) -> Result<String> {
    let mut out = csv::Writer::from_writer(Vec::new());
    out.write_record([index_col, value_col])?;
    for (i, value) in series.iter().enumerate() {
        out.write_record([i.to_string(), format!("{value:.2}")])?;
    }
    into_string(out)
}

fn into_string(writer: csv::Writer<Vec<u8>>) -> Result<String> {
    let bytes = writer.into_inner().context("flushing csv buffer")?;
    String::from_utf8(bytes).context("csv buffer held invalid utf-8")
}

// ─── Artifact directory ─────────────────────────────────────────────

/// Write a run's artifacts into a fresh directory under `output_dir`.
///
/// The directory is `{symbol}_{signal}_{local time}_{config hash prefix}` and
/// holds `manifest.json`, `trades.csv`, `balance.csv`, `equity.csv` and
/// `report.md`.
pub fn save_artifacts(result: &BacktestResult, output_dir: &Path) -> Result<PathBuf> {
    let hash_prefix = &result.config_hash[..result.config_hash.len().min(8)];
    let run_dir = output_dir.join(format!(
        "{}_{}_{}_{hash_prefix}",
        result.symbol,
        result.signal_name,
        chrono::Local::now().format("%Y%m%d_%H%M%S"),
    ));
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("creating {}", run_dir.display()))?;

    let files = [
        ("manifest.json", export_json(result)?),
        ("trades.csv", export_trades_csv(&result.trades)?),
        ("balance.csv", export_balance_csv(&result.balance_history)?),
        ("equity.csv", export_equity_csv(&result.equity_curve)?),
        ("report.md", generate_report(result)),
    ];
    for (name, contents) in files {
        let path = run_dir.join(name);
        std::fs::write(&path, contents).with_context(|| format!("writing {}", path.display()))?;
    }

    Ok(run_dir)
}

/// Read back the manifest of a saved run.
pub fn load_artifacts(dir: &Path) -> Result<BacktestResult> {
    let path = dir.join("manifest.json");
    let json =
        std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))?;
    import_json(&json)
}

// ─── Markdown ───────────────────────────────────────────────────────

/// Two-column Markdown table accumulated into the report buffer.
struct Table<'a> {
    md: &'a mut String,
}

impl<'a> Table<'a> {
    fn start(md: &'a mut String, title: &str, columns: [&str; 2]) -> Self {
        let _ = write!(md, "## {title}\n\n| {} | {} |\n| --- | --- |\n", columns[0], columns[1]);
        Self { md }
    }

    fn row(&mut self, key: impl std::fmt::Display, value: impl std::fmt::Display) -> &mut Self {
        let _ = writeln!(self.md, "| {key} | {value} |");
        self
    }
}

impl Drop for Table<'_> {
    fn drop(&mut self) {
        self.md.push('\n');
    }
}

/// Render the Markdown summary written as `report.md`.
pub fn generate_report(result: &BacktestResult) -> String {
    let mut md = String::from("# Backtest Report\n\n");

    {
        let mut meta = Table::start(&mut md, "Metadata", ["Field", "Value"]);
        meta.row("Symbol", &result.symbol)
            .row("Signal", &result.signal_name);
        match (result.first_timestamp, result.last_timestamp) {
            (Some(first), Some(last)) => meta.row("Period", format_args!("{first} to {last}")),
            _ => meta.row("Period", "(empty)"),
        };
        meta.row(
            "Bars",
            format_args!("{} ({} warmup)", result.bar_count, result.warmup_bars),
        )
        .row(
            "Signals",
            format_args!(
                "{} evaluated, {} skipped by sizing",
                result.signal_count, result.skipped_entries
            ),
        )
        .row("Config Hash", &result.config_hash)
        .row("Dataset Hash", &result.dataset_hash);
        if result.synthetic {
            meta.row("Data", "**SYNTHETIC**");
        }
        if let RunOutcome::Ruined { bar_index } = result.outcome {
            meta.row("Outcome", format_args!("**RUINED** at bar {bar_index}"));
        }
    }

    let r = &result.report;
    Table::start(&mut md, "Performance Summary", ["Metric", "Value"])
        .row("Initial Balance", Num(r.initial_balance, 2))
        .row("Final Balance", Num(r.final_balance, 2))
        .row("Total Return", Pct(r.total_return))
        .row("Buy & Hold Return", Pct(result.benchmark.buy_and_hold_return))
        .row("Outperformance", Pct(result.benchmark.outperformance))
        .row("Total P&L", Num(r.total_pnl, 2))
        .row(
            "Trades",
            format_args!(
                "{} ({} long / {} short)",
                r.trade_count, r.long_trades, r.short_trades
            ),
        )
        .row("Win Rate", Pct(r.win_rate))
        .row("Profit Factor", Num(r.profit_factor, 2))
        .row("Expectancy", Num(r.expectancy, 2))
        .row("Avg Win", Num(r.avg_win, 2))
        .row("Avg Loss", Num(r.avg_loss, 2))
        .row("Payoff Ratio", Num(r.payoff_ratio, 2))
        .row("Sharpe (per trade)", Num(r.sharpe, 3))
        .row("Sortino (per trade)", Num(r.sortino, 3))
        .row(
            "Max Drawdown",
            format_args!("{} ({})", Num(r.max_drawdown, 2), Pct(r.max_drawdown_pct)),
        )
        .row("Recovery Factor", Num(r.recovery_factor, 2))
        .row("Max Consecutive Wins", r.max_consecutive_wins)
        .row("Max Consecutive Losses", r.max_consecutive_losses)
        .row("Avg Bars Held", Num(r.avg_bars_held, 1));

    {
        let mut exits = Table::start(&mut md, "Exit Reasons", ["Reason", "Count"]);
        for reason in ExitReason::ALL {
            exits.row(reason, r.exit_reasons.get(reason));
        }
    }

    if !result.trades.is_empty() {
        let shown = result.trades.len().min(REPORT_TRADE_ROWS);
        let _ = write!(
            md,
            "## Trades (first {shown} of {})\n\n\
             | # | Dir | Entry | Exit | Reason | Size | P&L |\n\
             | --- | --- | --- | --- | --- | --- | --- |\n",
            result.trades.len()
        );
        for (i, t) in result.trades.iter().take(shown).enumerate() {
            let _ = writeln!(
                md,
                "| {} | {} | {} @ {:.5} | {} @ {:.5} | {} | {:.2} | {:.2} |",
                i + 1,
                t.direction,
                t.entry_time,
                t.entry_price,
                t.exit_time,
                t.exit_price,
                t.exit_reason,
                t.size,
                t.pnl_amount
            );
        }
        md.push('\n');
    }

    md
}
