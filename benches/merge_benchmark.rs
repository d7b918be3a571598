//! Merge cost of one flush against a large daily store

use criterion::{BatchSize, BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use storefront_harvester::application::merge;
use storefront_harvester::domain::{Record, SequenceCounter};

fn store(size: u64) -> Vec<Record> {
    (1..=size)
        .map(|n| Record {
            sequence: Some(n),
            code: format!("C{n}"),
            description: format!("Izdelek {n}"),
            price_gross: "12,20".to_string(),
            url: format!("https://shop.test/p/{n}"),
            ..Record::default()
        })
        .collect()
}

/// Five records, half of them already in the store
fn batch(size: u64) -> Vec<Record> {
    (0..5)
        .map(|i| Record {
            code: if i % 2 == 0 { format!("C{}", size / 2 + i) } else { format!("NEW{i}") },
            description: "Osvežen".to_string(),
            ..Record::default()
        })
        .collect()
}

fn bench_flush(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge_flush");

    for size in [100_u64, 1_000, 10_000] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter_batched(
                || (store(size), batch(size), SequenceCounter::starting_after(size)),
                |(existing, batch, mut counter)| black_box(merge(existing, batch, &mut counter)),
                BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

criterion_group!(benches, bench_flush);
criterion_main!(benches);
