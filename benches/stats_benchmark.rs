use chrono::{Days, NaiveDate};
use criterion::{criterion_group, criterion_main, Criterion};
use habit_tracker::models::stats::{heatmap, HEATMAP_DAYS};
use habit_tracker::models::{HabitLog, UserStats};
use std::hint::black_box;

/// Two years of logs with a handful of habits completed on most days.
fn build_logs() -> (HabitLog, NaiveDate) {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).expect("valid date");
    let mut logs = HabitLog::new();
    for day in 0..730u64 {
        let date = start + Days::new(day);
        for habit in 0..(day % 6) {
            logs.push(&format!("habit-{habit}"), date);
        }
    }
    (logs, start + Days::new(729))
}

fn benchmark_stats(c: &mut Criterion) {
    let (logs, end) = build_logs();

    let mut group = c.benchmark_group("stats_derivation");

    group.bench_function("user_stats_two_years", |b| {
        b.iter(|| UserStats::from_logs(black_box(&logs)))
    });

    group.bench_function("heatmap_90_days", |b| {
        b.iter(|| heatmap(black_box(&logs), end, HEATMAP_DAYS))
    });

    group.finish();
}

criterion_group!(benches, benchmark_stats);
criterion_main!(benches);
