//! Performance benchmarks for spot-rotator
//!
//! Run with: `cargo bench`
//! View results: `open target/criterion/report/index.html`

use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use spot_rotator::indicators::IndicatorSnapshot;
use spot_rotator::scorer::PairScorer;
use spot_rotator::thresholds::RsiThresholds;
use spot_rotator::{Candle, CandleSeries};

fn hourly_series(count: usize) -> CandleSeries {
    let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    let candles = (0..count)
        .map(|i| {
            let close = 30_000.0 + (i as f64 * 0.1).sin() * 250.0 + i as f64;
            Candle {
                datetime: start + Duration::hours(i as i64),
                open: close - 5.0,
                high: close + 20.0,
                low: close - 20.0,
                close,
                volume: 10.0,
            }
        })
        .collect();
    CandleSeries::new(candles).unwrap()
}

fn benchmark_indicators(c: &mut Criterion) {
    let series = hourly_series(300);
    c.bench_function("indicator_snapshot_300", |b| {
        b.iter(|| IndicatorSnapshot::from_series(black_box(&series)))
    });
}

fn benchmark_scoring(c: &mut Criterion) {
    let series = hourly_series(300);
    let scorer = PairScorer::new();
    c.bench_function("score_pair_300", |b| {
        b.iter(|| scorer.score(black_box(&series), RsiThresholds::default()))
    });
}

criterion_group!(benches, benchmark_indicators, benchmark_scoring);
criterion_main!(benches);
