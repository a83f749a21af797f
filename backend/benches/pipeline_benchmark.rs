use std::hint::black_box;

use chrono::{Duration, NaiveDate};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};

use bloomwatch::algorithms::{circular_summary, detect, moving_average, normalize};
use bloomwatch::config::{DetectorConfig, NormalizerConfig};
use bloomwatch::models::{DateRange, IndexKind, Observation};

/// Irregular daily-ish observations with a spring bump and periodic clouds.
fn raw_season(days: i64) -> Vec<Observation> {
    let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
    (0..days)
        .step_by(3)
        .map(|d| {
            let date = start + Duration::days(d);
            if d % 21 == 0 {
                return Observation::cloud(date);
            }
            let x = (d as f64 - 100.0) / 25.0;
            Observation::valid_ndvi(date, 0.15 + 0.6 * (-0.5 * x * x).exp())
        })
        .collect()
}

fn bench_normalize(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize");
    let config = NormalizerConfig::default();

    for days in [90i64, 365, 365 * 3] {
        let raw = raw_season(days);
        let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let range = DateRange::new(start, start + Duration::days(days - 1)).unwrap();
        group.bench_with_input(BenchmarkId::new("days", days), &raw, |b, raw| {
            b.iter(|| normalize(black_box(raw), IndexKind::Ndvi, &range, &config));
        });
    }

    group.finish();
}

fn bench_detect(c: &mut Criterion) {
    let mut group = c.benchmark_group("detect");
    let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
    let range = DateRange::new(start, start + Duration::days(364)).unwrap();
    let series = normalize(
        &raw_season(365),
        IndexKind::Ndvi,
        &range,
        &NormalizerConfig::default(),
    )
    .unwrap();
    let config = DetectorConfig::default();

    group.bench_function("one_season", |b| {
        b.iter(|| detect(black_box(&series), &config));
    });

    group.finish();
}

fn bench_smoothing(c: &mut Criterion) {
    let mut group = c.benchmark_group("moving_average");
    let values: Vec<f64> = (0..1000).map(|i| (i as f64 * 0.1).sin() * 0.5 + 0.5).collect();

    for window in [3usize, 7, 15] {
        group.bench_with_input(BenchmarkId::new("window", window), &window, |b, &w| {
            b.iter(|| moving_average(black_box(&values), w));
        });
    }

    group.finish();
}

fn bench_circular_summary(c: &mut Criterion) {
    let onsets: Vec<f64> = (0..30).map(|i| 60.0 + (i % 7) as f64 * 2.5).collect();
    c.bench_function("circular_summary_30_years", |b| {
        b.iter(|| circular_summary(black_box(&onsets)));
    });
}

criterion_group!(
    benches,
    bench_normalize,
    bench_detect,
    bench_smoothing,
    bench_circular_summary
);
criterion_main!(benches);
