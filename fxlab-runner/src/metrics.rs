//! Performance report — pure functions over the trade ledger and balance
//! history.
//!
//! Undefined statistics are reported as sentinels rather than errors: NaN
//! when a ratio has no meaningful value (no trades, too few losers, zero
//! deviation), and +∞ for a profit factor with winners but no losers.
//!
//! `Benchmark` sets the run against buy-and-hold on the same bars.

use std::fmt;

use fxlab_core::domain::{Bar, Direction, ExitReason, Trade};
use serde::{Deserialize, Serialize};

/// Aggregate statistics for a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub trade_count: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub long_trades: usize,
    pub short_trades: usize,

    #[serde(with = "non_finite")]
    pub win_rate: f64,
    #[serde(with = "non_finite")]
    pub profit_factor: f64,
    #[serde(with = "non_finite")]
    pub expectancy: f64,
    pub total_pnl: f64,
    pub gross_profit: f64,
    pub gross_loss: f64,
    #[serde(with = "non_finite")]
    pub avg_win: f64,
    #[serde(with = "non_finite")]
    pub avg_loss: f64,
    #[serde(with = "non_finite")]
    pub payoff_ratio: f64,
    #[serde(with = "non_finite")]
    pub std_dev: f64,
    #[serde(with = "non_finite")]
    pub sharpe: f64,
    #[serde(with = "non_finite")]
    pub sortino: f64,

    pub max_drawdown: f64,
    pub max_drawdown_pct: f64,
    #[serde(with = "non_finite")]
    pub recovery_factor: f64,
    pub max_consecutive_wins: usize,
    pub max_consecutive_losses: usize,
    #[serde(with = "non_finite")]
    pub avg_bars_held: f64,

    #[serde(with = "non_finite")]
    pub initial_balance: f64,
    #[serde(with = "non_finite")]
    pub final_balance: f64,
    #[serde(with = "non_finite")]
    pub total_return: f64,

    pub exit_reasons: ExitReasonCounts,
}

/// Closed trades broken down by exit reason.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitReasonCounts {
    pub stop_loss: usize,
    pub take_profit: usize,
    pub signal_reversal: usize,
    pub end_of_series: usize,
}

impl ExitReasonCounts {
    pub fn from_trades(trades: &[Trade]) -> Self {
        let mut counts = Self::default();
        for t in trades {
            match t.exit_reason {
                ExitReason::StopLoss => counts.stop_loss += 1,
                ExitReason::TakeProfit => counts.take_profit += 1,
                ExitReason::SignalReversal => counts.signal_reversal += 1,
                ExitReason::EndOfSeries => counts.end_of_series += 1,
            }
        }
        counts
    }

    pub fn get(&self, reason: ExitReason) -> usize {
        match reason {
            ExitReason::StopLoss => self.stop_loss,
            ExitReason::TakeProfit => self.take_profit,
            ExitReason::SignalReversal => self.signal_reversal,
            ExitReason::EndOfSeries => self.end_of_series,
        }
    }
}

impl PerformanceReport {
    /// Compute the report from a trade ledger and the balance history
    /// (initial balance followed by the balance after each closed trade).
    pub fn compute(trades: &[Trade], balance_history: &[f64]) -> Self {
        let pnl: Vec<f64> = trades.iter().map(|t| t.pnl_amount).collect();
        let initial_balance = balance_history.first().copied().unwrap_or(f64::NAN);
        let final_balance = balance_history.last().copied().unwrap_or(f64::NAN);
        let total = pnl.iter().sum::<f64>();
        let mdd = max_drawdown(balance_history);
        let std = std_dev(&pnl);
        let exp = expectancy(trades);
        let held: Vec<f64> = trades.iter().map(|t| t.bars_held() as f64).collect();

        Self {
            trade_count: trades.len(),
            winning_trades: trades.iter().filter(|t| t.is_winner()).count(),
            losing_trades: trades.iter().filter(|t| t.is_loser()).count(),
            long_trades: count_direction(trades, Direction::Long),
            short_trades: count_direction(trades, Direction::Short),
            win_rate: win_rate(trades),
            profit_factor: profit_factor(trades),
            expectancy: exp,
            total_pnl: total,
            gross_profit: gross_profit(trades),
            gross_loss: gross_loss(trades),
            avg_win: avg_win(trades),
            avg_loss: avg_loss(trades),
            payoff_ratio: ratio(avg_win(trades), avg_loss(trades)),
            std_dev: std,
            sharpe: ratio(exp, std),
            sortino: sortino(trades),
            max_drawdown: mdd,
            max_drawdown_pct: max_drawdown_pct(balance_history),
            recovery_factor: ratio(total, mdd),
            max_consecutive_wins: max_consecutive(trades, Trade::is_winner),
            max_consecutive_losses: max_consecutive(trades, Trade::is_loser),
            avg_bars_held: mean_f64(&held),
            initial_balance,
            final_balance,
            total_return: ratio(final_balance - initial_balance, initial_balance),
            exit_reasons: ExitReasonCounts::from_trades(trades),
        }
    }
}

// ─── Benchmark ──────────────────────────────────────────────────────

/// Buy-and-hold over the same bars: one unit bought at the first open and
/// sold at the last close, with the initial balance fully invested.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Benchmark {
    #[serde(with = "non_finite")]
    pub buy_and_hold_return: f64,
    #[serde(with = "non_finite")]
    pub buy_and_hold_balance: f64,
    /// Strategy total return minus buy-and-hold return.
    #[serde(with = "non_finite")]
    pub outperformance: f64,
}

impl Default for Benchmark {
    fn default() -> Self {
        Self {
            buy_and_hold_return: f64::NAN,
            buy_and_hold_balance: f64::NAN,
            outperformance: f64::NAN,
        }
    }
}

impl Benchmark {
    /// NaN throughout for an empty series or a non-positive first open.
    pub fn compute(bars: &[Bar], report: &PerformanceReport) -> Self {
        let (Some(first), Some(last)) = (bars.first(), bars.last()) else {
            return Self::default();
        };
        if first.open <= 0.0 {
            return Self::default();
        }
        let buy_and_hold_return = last.close / first.open - 1.0;
        Self {
            buy_and_hold_return,
            buy_and_hold_balance: report.initial_balance * (1.0 + buy_and_hold_return),
            outperformance: report.total_return - buy_and_hold_return,
        }
    }
}

impl fmt::Display for Benchmark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Buy & Hold:       {} ({})",
            Pct(self.buy_and_hold_return),
            Num(self.buy_and_hold_balance, 2)
        )?;
        write!(f, "Outperformance:   {}", Pct(self.outperformance))
    }
}

// ─── Individual metric functions ────────────────────────────────────

/// Fraction of trades with positive realized P&L. NaN with no trades.
pub fn win_rate(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return f64::NAN;
    }
    trades.iter().filter(|t| t.is_winner()).count() as f64 / trades.len() as f64
}

/// Gross profits / |gross losses|.
///
/// NaN with no trades (or when nothing was won or lost); +∞ when there are
/// winners but no losers.
pub fn profit_factor(trades: &[Trade]) -> f64 {
    let gp = gross_profit(trades);
    let gl = gross_loss(trades);
    if trades.is_empty() || (gp == 0.0 && gl == 0.0) {
        return f64::NAN;
    }
    if gl == 0.0 {
        return f64::INFINITY;
    }
    gp / gl
}

/// Mean realized P&L per trade. NaN with no trades.
pub fn expectancy(trades: &[Trade]) -> f64 {
    if trades.is_empty() {
        return f64::NAN;
    }
    trades.iter().map(|t| t.pnl_amount).sum::<f64>() / trades.len() as f64
}

/// Sum of positive P&L.
pub fn gross_profit(trades: &[Trade]) -> f64 {
    trades
        .iter()
        .filter(|t| t.pnl_amount > 0.0)
        .map(|t| t.pnl_amount)
        .sum()
}

/// Absolute sum of negative P&L.
pub fn gross_loss(trades: &[Trade]) -> f64 {
    trades
        .iter()
        .filter(|t| t.pnl_amount < 0.0)
        .map(|t| t.pnl_amount.abs())
        .sum()
}

/// Mean winning P&L. NaN with no winners.
pub fn avg_win(trades: &[Trade]) -> f64 {
    let wins: Vec<f64> = trades
        .iter()
        .filter(|t| t.is_winner())
        .map(|t| t.pnl_amount)
        .collect();
    mean_f64(&wins)
}

/// Mean losing P&L as a positive amount. NaN with no losers.
pub fn avg_loss(trades: &[Trade]) -> f64 {
    let losses: Vec<f64> = trades
        .iter()
        .filter(|t| t.is_loser())
        .map(|t| t.pnl_amount.abs())
        .collect();
    mean_f64(&losses)
}

/// Expectancy divided by the sample standard deviation of losing-trade P&L.
///
/// NaN with fewer than two losing trades or a zero deviation.
pub fn sortino(trades: &[Trade]) -> f64 {
    let losses: Vec<f64> = trades
        .iter()
        .filter(|t| t.is_loser())
        .map(|t| t.pnl_amount)
        .collect();
    ratio(expectancy(trades), std_dev(&losses))
}

/// Largest peak-to-trough decline of the balance history, in money.
pub fn max_drawdown(balance_history: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut max_dd = 0.0_f64;
    for &b in balance_history {
        peak = peak.max(b);
        max_dd = max_dd.max(peak - b);
    }
    max_dd
}

/// Largest peak-to-trough decline as a fraction of the running peak.
pub fn max_drawdown_pct(balance_history: &[f64]) -> f64 {
    let mut peak = f64::NEG_INFINITY;
    let mut max_dd = 0.0_f64;
    for &b in balance_history {
        peak = peak.max(b);
        if peak > 0.0 {
            max_dd = max_dd.max((peak - b) / peak);
        }
    }
    max_dd
}

fn count_direction(trades: &[Trade], direction: Direction) -> usize {
    trades.iter().filter(|t| t.direction == direction).count()
}

fn max_consecutive(trades: &[Trade], pred: impl Fn(&Trade) -> bool) -> usize {
    let mut max_streak = 0;
    let mut current = 0;
    for trade in trades {
        if pred(trade) {
            current += 1;
            max_streak = max_streak.max(current);
        } else {
            current = 0;
        }
    }
    max_streak
}

// ─── Helpers ────────────────────────────────────────────────────────

/// a / b, NaN when either side is NaN or b is zero.
fn ratio(a: f64, b: f64) -> f64 {
    if a.is_nan() || b.is_nan() || b == 0.0 {
        f64::NAN
    } else {
        a / b
    }
}

/// Arithmetic mean; NaN for an empty slice.
pub(crate) fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n-1); NaN below two values.
pub(crate) fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return f64::NAN;
    }
    let mean = mean_f64(values);
    let variance =
        values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

// ─── Display ────────────────────────────────────────────────────────

pub(crate) struct Num(pub f64, pub usize);

impl fmt::Display for Num {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Num(v, prec) = *self;
        if v.is_nan() {
            f.write_str("n/a")
        } else if v == f64::INFINITY {
            f.write_str("inf")
        } else if v == f64::NEG_INFINITY {
            f.write_str("-inf")
        } else {
            write!(f, "{v:.prec$}")
        }
    }
}

pub(crate) struct Pct(pub f64);

impl fmt::Display for Pct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_finite() {
            write!(f, "{:.2}%", self.0 * 100.0)
        } else {
            write!(f, "{}", Num(self.0, 2))
        }
    }
}

impl fmt::Display for PerformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Trades:           {} ({} long / {} short)",
            self.trade_count, self.long_trades, self.short_trades
        )?;
        writeln!(f, "Win Rate:         {}", Pct(self.win_rate))?;
        writeln!(f, "Profit Factor:    {}", Num(self.profit_factor, 2))?;
        writeln!(f, "Expectancy:       {}", Num(self.expectancy, 2))?;
        writeln!(f, "Total P&L:        {}", Num(self.total_pnl, 2))?;
        writeln!(f, "Avg Win / Loss:   {} / {}", Num(self.avg_win, 2), Num(self.avg_loss, 2))?;
        writeln!(f, "Payoff Ratio:     {}", Num(self.payoff_ratio, 2))?;
        writeln!(f, "Sharpe (trade):   {}", Num(self.sharpe, 3))?;
        writeln!(f, "Sortino (trade):  {}", Num(self.sortino, 3))?;
        writeln!(
            f,
            "Max Drawdown:     {} ({})",
            Num(self.max_drawdown, 2),
            Pct(self.max_drawdown_pct)
        )?;
        writeln!(f, "Recovery Factor:  {}", Num(self.recovery_factor, 2))?;
        writeln!(
            f,
            "Max Consec W / L: {} / {}",
            self.max_consecutive_wins, self.max_consecutive_losses
        )?;
        writeln!(f, "Final Balance:    {}", Num(self.final_balance, 2))?;
        writeln!(f, "Total Return:     {}", Pct(self.total_return))?;
        write!(
            f,
            "Exits:            stop_loss={} take_profit={} signal_reversal={} end_of_series={}",
            self.exit_reasons.stop_loss,
            self.exit_reasons.take_profit,
            self.exit_reasons.signal_reversal,
            self.exit_reasons.end_of_series
        )
    }
}

/// Serde adapter that keeps NaN and ±∞ through JSON, which has no literal
/// for them: NaN ↔ `null`, ±∞ ↔ `"inf"` / `"-inf"`.
pub mod non_finite {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_nan() {
            serializer.serialize_none()
        } else if *value == f64::INFINITY {
            serializer.serialize_str("inf")
        } else if *value == f64::NEG_INFINITY {
            serializer.serialize_str("-inf")
        } else {
            serializer.serialize_f64(*value)
        }
    }

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Num(f64),
        Text(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        match Option::<Repr>::deserialize(deserializer)? {
            None => Ok(f64::NAN),
            Some(Repr::Num(v)) => Ok(v),
            Some(Repr::Text(s)) => match s.as_str() {
                "inf" => Ok(f64::INFINITY),
                "-inf" => Ok(f64::NEG_INFINITY),
                "nan" => Ok(f64::NAN),
                other => Err(de::Error::custom(format!("invalid float literal: {other}"))),
            },
        }
    }
}
