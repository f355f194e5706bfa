//! FxLab Core — bar types, indicators, signal generators, backtest engine.
//!
//! This crate contains the heart of the backtester:
//! - Domain types (bars, signals, positions, trades, account state)
//! - Indicator library (SMA, EMA, RSI, ATR, ADX with +DI/-DI)
//! - Signal generators emitting one Long/Flat/Short intent per bar
//! - Single-position bar loop with stop-loss, take-profit and reversal exits

pub mod domain;
pub mod engine;
pub mod indicators;
pub mod signals;
