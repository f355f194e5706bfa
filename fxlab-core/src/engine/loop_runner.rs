//! Main engine loop.

use super::costs::CostModel;
use super::error::{EngineError, PreconditionError};
use super::sizing::RiskSizer;
use super::state::{EngineConfig, EngineState, RunOutcome, RunResult};
use crate::domain::{Bar, ExitReason, Position, Signal};
use crate::indicators::{Atr, Indicator};
use tracing::{debug, info, warn};

/// Run a backtest over `bars` driven by `signals`.
///
/// This is the main entry point for the engine. It:
/// 1. Validates the config and the series
/// 2. Precomputes ATR when volatility stops are configured
/// 3. Runs the bar loop (exit check, entry check, mark-to-market)
/// 4. Force-closes any position still open at the last bar
/// 5. Returns `RunResult`
///
/// The run is pure: identical inputs always produce identical results.
pub fn run_backtest(
    bars: &[Bar],
    signals: &[Signal],
    config: &EngineConfig,
) -> Result<RunResult, EngineError> {
    run_loop(bars, signals, None, config)
}

/// Like [`run_backtest`], but a signal on bar t may open a position only when
/// `entry_allowed[t]` is true.
///
/// The mask gates entries alone. Exits still read the unmasked signal, so a
/// position held past the end of an allowed window is managed as usual.
pub fn run_backtest_gated(
    bars: &[Bar],
    signals: &[Signal],
    entry_allowed: &[bool],
    config: &EngineConfig,
) -> Result<RunResult, EngineError> {
    if entry_allowed.len() != bars.len() {
        return Err(PreconditionError::EntryMaskMismatch {
            bars: bars.len(),
            mask: entry_allowed.len(),
        }
        .into());
    }
    run_loop(bars, signals, Some(entry_allowed), config)
}

fn run_loop(
    bars: &[Bar],
    signals: &[Signal],
    entry_allowed: Option<&[bool]>,
    config: &EngineConfig,
) -> Result<RunResult, EngineError> {
    config.validate()?;
    validate_series(bars, signals)?;

    let n = bars.len();
    let sizer = RiskSizer::from_config(config);
    let costs = CostModel::from_config(config);
    let atr = config
        .volatility_stops
        .map(|v| Atr::new(v.period).compute(bars));

    let mut state = EngineState::new(config.initial_capital);
    let mut equity_curve = Vec::with_capacity(n);
    let mut outcome = RunOutcome::Completed;

    for (t, bar) in bars.iter().enumerate() {
        state.bar_index = t;
        let prev_signal = if t > 0 { signals[t - 1] } else { Signal::Flat };

        // ─── Phase 1: Exit check ───
        // A position opened on this bar's open is not managed until the next bar.
        let mut exited = false;
        if let Some(pos) = state.position.take() {
            match exit_decision(&pos, bar, prev_signal, config) {
                Some((reason, price)) => {
                    close_position(&mut state, pos, t, bar, price, reason, &costs, config);
                    exited = true;
                }
                None => state.position = Some(pos),
            }
        }

        if exited && state.account.is_ruined() {
            warn!(
                bar = t,
                balance = state.account.balance,
                "account ruined, halting run"
            );
            equity_curve.push(state.account.balance);
            outcome = RunOutcome::Ruined { bar_index: t };
            break;
        }

        // ─── Phase 2: Entry check ───
        // The previous bar's signal is acted on at this bar's open. The last
        // bar never opens a position.
        let eligible = !exited
            && state.position.is_none()
            && t >= 1
            && t - 1 >= config.warmup_bars
            && t + 1 < n
            && entry_allowed.map_or(true, |mask| mask[t - 1]);
        if eligible {
            if let Some(direction) = prev_signal.direction() {
                state.signal_count += 1;
                let distances = match (&atr, &config.volatility_stops) {
                    (Some(atr), Some(vol)) => {
                        let a = atr[t - 1];
                        if a.is_nan() || a <= 0.0 {
                            None
                        } else {
                            Some((a * vol.stop_multiplier, a * vol.target_multiplier))
                        }
                    }
                    _ => Some((config.stop_loss_distance, config.take_profit_distance)),
                };
                let entry = distances.and_then(|(stop, target)| {
                    sizer
                        .size(state.account.balance, stop)
                        .map(|size| (size, stop, target))
                });
                match entry {
                    Some((size, stop, target)) => {
                        let pos = Position::open(
                            direction,
                            t,
                            bar.timestamp,
                            bar.open,
                            size,
                            stop,
                            target,
                        );
                        debug!(
                            bar = t,
                            %direction,
                            price = pos.entry_price,
                            size,
                            stop = pos.stop_price,
                            "open position"
                        );
                        state.position = Some(pos);
                    }
                    None => state.skipped_entries += 1,
                }
            }
        }

        // ─── Phase 3: Mark-to-market ───
        equity_curve.push(state.mark_to_market(bar.close, config.point_value));
    }

    // ─── Series end ───
    if let (Some(pos), Some(last)) = (state.position.take(), bars.last()) {
        let t = n - 1;
        close_position(
            &mut state,
            pos,
            t,
            last,
            last.close,
            ExitReason::EndOfSeries,
            &costs,
            config,
        );
        if let Some(eq) = equity_curve.last_mut() {
            *eq = state.account.balance;
        }
        if state.account.is_ruined() {
            warn!(bar = t, balance = state.account.balance, "account ruined at series end");
            outcome = RunOutcome::Ruined { bar_index: t };
        }
    }

    info!(
        bars = n,
        trades = state.trades.len(),
        final_balance = state.account.balance,
        ruined = matches!(outcome, RunOutcome::Ruined { .. }),
        "backtest complete"
    );

    Ok(RunResult {
        trades: state.trades,
        balance_history: state.balance_history,
        equity_curve,
        final_balance: state.account.balance,
        peak_balance: state.account.peak_balance,
        bar_count: n,
        warmup_bars: config.warmup_bars,
        signal_count: state.signal_count,
        skipped_entries: state.skipped_entries,
        outcome,
    })
}

/// Check stop-loss, then take-profit, then reversal. Stop-loss wins when a
/// bar touches both levels.
fn exit_decision(
    pos: &Position,
    bar: &Bar,
    prev_signal: Signal,
    config: &EngineConfig,
) -> Option<(ExitReason, f64)> {
    if pos.stop_hit(bar) {
        return Some((ExitReason::StopLoss, pos.stop_price));
    }
    if pos.target_hit(bar) {
        if let Some(target) = pos.take_profit_price {
            return Some((ExitReason::TakeProfit, target));
        }
    }
    if config.reversal.closes(pos.direction, prev_signal) {
        return Some((ExitReason::SignalReversal, bar.open));
    }
    None
}

#[allow(clippy::too_many_arguments)]
fn close_position(
    state: &mut EngineState,
    pos: Position,
    t: usize,
    bar: &Bar,
    price: f64,
    reason: ExitReason,
    costs: &CostModel,
    config: &EngineConfig,
) {
    let cost = costs.trade_cost(pos.size);
    let trade = pos.close(t, bar.timestamp, price, reason, config.point_value, cost);
    debug!(
        bar = t,
        reason = %trade.exit_reason,
        price = trade.exit_price,
        pnl = trade.pnl_amount,
        "close position"
    );
    state.record_trade(trade);
}

fn validate_series(bars: &[Bar], signals: &[Signal]) -> Result<(), PreconditionError> {
    if bars.len() != signals.len() {
        return Err(PreconditionError::LengthMismatch {
            bars: bars.len(),
            signals: signals.len(),
        });
    }
    for (i, bar) in bars.iter().enumerate() {
        if bar.is_void() {
            return Err(PreconditionError::VoidBar { index: i });
        }
        if i > 0 && bar.timestamp <= bars[i - 1].timestamp {
            return Err(PreconditionError::NonMonotonicTimestamp { index: i });
        }
    }
    Ok(())
}
