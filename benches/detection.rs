//! Benchmarks for weekly zone and flip detection.

use chrono::{Duration, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use zonescan::prelude::*;

/// Deterministic weekly bars alternating quiet and volatile stretches
fn generate_bars(n: usize) -> Vec<Bar> {
  let start = Utc.with_ymd_and_hms(2000, 1, 3, 0, 0, 0).unwrap();
  let mut bars = Vec::with_capacity(n);
  let mut price = 100.0;

  for i in 0..n {
    let change = ((i * 7 + 13) % 100) as f64 / 1000.0 - 0.045; // Deterministic "random"
    let quiet = (i / 6) % 3 == 0;
    let width = if quiet { 0.02 } else { 0.04 + ((i * 3) % 10) as f64 / 200.0 };

    let o = price;
    let c = price * (1.0 + change);
    let h = o.max(c) * (1.0 + width / 2.0);
    let l = o.min(c) * (1.0 - width / 2.0);

    bars.push(Bar::new(start + Duration::weeks(i as i64), o, h, l, c, 1000.0));
    price = c;
  }

  bars
}

fn bench_demand_zones(c: &mut Criterion) {
  let series = PriceSeries::new(generate_bars(520), 20).unwrap();
  let config = ScanConfig::default();

  c.bench_function("demand_zones_520_weeks", |b| {
    b.iter(|| black_box(ConsolidationZoneDetector.detect(black_box(&series), &config)))
  });
}

fn bench_resistance_flips(c: &mut Criterion) {
  let series = PriceSeries::new(generate_bars(520), 20).unwrap();
  let config = ScanConfig::default();

  c.bench_function("resistance_flips_520_weeks", |b| {
    b.iter(|| black_box(ResistanceFlipDetector.detect(black_box(&series), &config)))
  });
}

fn bench_scaling(c: &mut Criterion) {
  let config = ScanConfig::default();
  let mut group = c.benchmark_group("scaling");

  for size in [104, 520, 2600].iter() {
    let bars = generate_bars(*size);

    group.bench_with_input(BenchmarkId::new("scan_series", size), size, |b, _| {
      b.iter(|| {
        let _ = black_box(scan_series("BENCH", black_box(bars.clone()), &config, None));
      })
    });
  }

  group.finish();
}

fn bench_parallel_scan(c: &mut Criterion) {
  let config = ScanConfig::default();
  let universe: Vec<(String, Vec<Bar>)> =
    (0..64).map(|i| (format!("SYM{i}"), generate_bars(104 + i * 3))).collect();
  let instruments: Vec<(&str, &[Bar])> =
    universe.iter().map(|(t, b)| (t.as_str(), b.as_slice())).collect();

  c.bench_function("parallel_scan_64_instruments", |b| {
    b.iter(|| {
      let _ = black_box(scan_parallel(
        black_box(&config),
        black_box(instruments.clone()),
        Some(&SimpleIndicators as &dyn IndicatorProvider),
      ));
    })
  });
}

fn bench_indicators(c: &mut Criterion) {
  let series = PriceSeries::new(generate_bars(520), 20).unwrap();

  c.bench_function("indicators_520_weeks", |b| {
    b.iter(|| black_box(SimpleIndicators.compute(black_box(&series))))
  });
}

criterion_group!(
  benches,
  bench_demand_zones,
  bench_resistance_flips,
  bench_scaling,
  bench_parallel_scan,
  bench_indicators,
);

criterion_main!(benches);
