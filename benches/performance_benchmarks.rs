use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use riskrs::{
    AthleteId, Dataset, LoadMetrics, MemoryLoader, RecoveryPredictor, RiskEngine, Scenario,
    ScenarioGenerator, SqliteLoader, TimeSeriesLoader,
};

/// Performance benchmarks for the risk engine
///
/// Team sizes scale by repeating the five demo scenarios under fresh ids.

fn end_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 30).unwrap()
}

fn create_team_dataset(size: usize) -> Dataset {
    let generator = ScenarioGenerator::new(end_date());
    Dataset {
        athletes: (0..size)
            .map(|i| generator.athlete(Scenario::ALL[i % Scenario::ALL.len()], i as AthleteId + 1))
            .collect(),
    }
}

fn bench_single_assessment(c: &mut Criterion) {
    let dataset = create_team_dataset(5);
    let memory = MemoryLoader::new(dataset.clone());
    let sqlite = SqliteLoader::in_memory().unwrap();
    sqlite.import_dataset(&dataset).unwrap();
    let engine = RiskEngine::new();

    let mut group = c.benchmark_group("Risk Assessment");
    group.bench_function("memory_loader", |b| {
        b.iter(|| engine.assess(black_box(&memory), 3, end_date()))
    });
    group.bench_function("sqlite_loader", |b| {
        b.iter(|| engine.assess(black_box(&sqlite), 3, end_date()))
    });

    let window = memory
        .snapshot(3, engine.config().data_range(end_date()))
        .unwrap();
    group.bench_function("assess_window", |b| {
        b.iter(|| engine.assess_window(black_box(&window), end_date()))
    });
    group.finish();
}

fn bench_team_assessment(c: &mut Criterion) {
    let engine = RiskEngine::new();
    let mut group = c.benchmark_group("Team Assessment");

    for &size in &[5, 50, 250] {
        let loader = MemoryLoader::new(create_team_dataset(size));
        let ids = loader.athlete_ids().unwrap();

        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::new("assess_team", size), &ids, |b, ids| {
            b.iter(|| engine.assess_team(&loader, ids, end_date()))
        });
    }

    group.finish();
}

fn bench_load_metrics(c: &mut Criterion) {
    let mut group = c.benchmark_group("Load Metrics");

    for &days in &[28, 180, 730] {
        let values: Vec<f64> = (0..days).map(|i| 300.0 + (i % 11) as f64 * 12.5).collect();

        group.throughput(Throughput::Elements(days as u64));
        group.bench_with_input(BenchmarkId::new("zscore", days), &values, |b, values| {
            b.iter(|| LoadMetrics::zscore_from_values(black_box(values)))
        });
        group.bench_with_input(BenchmarkId::new("spike_score", days), &values, |b, values| {
            b.iter(|| LoadMetrics::spike_score_from_values(black_box(values)))
        });
    }

    group.finish();
}

fn bench_recovery_prediction(c: &mut Criterion) {
    let loader = MemoryLoader::new(create_team_dataset(5));

    c.bench_function("recovery_predict", |b| {
        b.iter(|| RecoveryPredictor::predict(black_box(&loader), 302, end_date()))
    });
}

criterion_group!(
    benches,
    bench_single_assessment,
    bench_team_assessment,
    bench_load_metrics,
    bench_recovery_prediction
);
criterion_main!(benches);
