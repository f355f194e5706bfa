//! Criterion benchmarks for FxLab hot paths.
//!
//! Benchmarks:
//! 1. Bar loop (full backtest iteration over precomputed signals)
//! 2. Indicator precompute (SMA, EMA, RSI, ATR, ADX)
//! 3. Signal generation (crossover and trend filter)

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use fxlab_core::domain::{Bar, Signal};
use fxlab_core::engine::{run_backtest, EngineConfig};
use fxlab_core::indicators::{Adx, Atr, Ema, Indicator, Rsi, Sma};
use fxlab_core::signals::{MaCrossover, MaType, SignalGenerator, TrendFilter};

// ── Helpers ──────────────────────────────────────────────────────────

fn make_bars(n: usize) -> Vec<Bar> {
    let base = chrono::NaiveDate::from_ymd_opt(2020, 1, 2)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    (0..n)
        .map(|i| {
            let close = 100.0 + (i as f64 * 0.05).sin() * 3.0;
            let open = close - 0.03;
            Bar::new(
                base + chrono::Duration::minutes(5 * i as i64),
                open,
                close + 0.15,
                close - 0.15,
                close,
            )
        })
        .collect()
}

// ── 1. Bar Loop ──────────────────────────────────────────────────────

fn bench_bar_loop(c: &mut Criterion) {
    let mut group = c.benchmark_group("bar_loop");

    for &bar_count in &[10_000, 100_000] {
        let bars = make_bars(bar_count);
        let signals = MaCrossover::new(20, 80, MaType::Ema).generate(&bars);
        let mut config = EngineConfig::new(100_000.0, 0.01, 0.3, 0.6).with_warmup(80);
        config.max_position_size = 10_000.0;

        group.bench_with_input(BenchmarkId::new("ma_crossover", bar_count), &bar_count, |b, _| {
            b.iter(|| run_backtest(black_box(&bars), black_box(&signals), black_box(&config)))
        });
    }

    let bars = make_bars(100_000);
    let flat = vec![Signal::Flat; bars.len()];
    let config = EngineConfig::new(100_000.0, 0.01, 0.3, 0.6);
    group.bench_function("flat_100000", |b| {
        b.iter(|| run_backtest(black_box(&bars), black_box(&flat), black_box(&config)))
    });

    group.finish();
}

// ── 2. Indicators ────────────────────────────────────────────────────

fn bench_indicators(c: &mut Criterion) {
    let bars = make_bars(100_000);
    let indicators: Vec<Box<dyn Indicator>> = vec![
        Box::new(Sma::new(50)),
        Box::new(Ema::new(200)),
        Box::new(Rsi::new(14)),
        Box::new(Atr::new(14)),
        Box::new(Adx::new(14)),
    ];

    let mut group = c.benchmark_group("indicators");
    for ind in &indicators {
        group.bench_function(ind.name(), |b| b.iter(|| ind.compute(black_box(&bars))));
    }
    group.finish();
}

// ── 3. Signals ───────────────────────────────────────────────────────

fn bench_signals(c: &mut Criterion) {
    let bars = make_bars(100_000);
    let crossover = MaCrossover::new(20, 80, MaType::Sma);
    let trend = TrendFilter::default_params();

    let mut group = c.benchmark_group("signals");
    group.bench_function("ma_crossover", |b| {
        b.iter(|| crossover.generate(black_box(&bars)))
    });
    group.bench_function("trend_filter", |b| b.iter(|| trend.generate(black_box(&bars))));
    group.finish();
}

criterion_group!(benches, bench_bar_loop, bench_indicators, bench_signals);
criterion_main!(benches);
