//! Benchmarks for cuckoo page operations.
//!
//! Run with:
//! ```bash
//! cargo bench --bench operations
//! ```

#![allow(clippy::expect_used)]

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use cuckoo_page::{CuckooTable, new_buffer};
use std::hint::black_box;

/// Spread keys over both sub-tables with a multiplicative sequence.
fn key(i: u64) -> u64 {
    i.wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

fn populated(words: &mut [u32], count: u64) -> CuckooTable<'_> {
    let mut table = CuckooTable::new(words).expect("page buffer has the right size");
    for i in 1..=count {
        table.insert(key(i), i).expect("insert into non-full table");
    }
    table
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert");

    for load in [10_000u64, 300_000] {
        group.bench_function(BenchmarkId::new("into_loaded", load), |b| {
            let mut words = new_buffer();
            let mut table = populated(&mut words, load);
            let mut i = load;
            b.iter(|| {
                i += 1;
                let status = table.insert(black_box(key(i)), 1).expect("valid insert");
                table.remove(key(i), 1).expect("valid remove");
                black_box(status)
            });
        });
    }

    group.finish();
}

fn bench_lookup(c: &mut Criterion) {
    let mut words = new_buffer();
    let table = populated(&mut words, 300_000);
    let mut group = c.benchmark_group("lookup");

    group.bench_function(BenchmarkId::new("hit", 300_000), |b| {
        let mut i = 0;
        b.iter(|| {
            i = i % 300_000 + 1;
            black_box(table.lookup(black_box(key(i))))
        });
    });

    group.bench_function(BenchmarkId::new("miss", 300_000), |b| {
        let mut i = 1_000_000;
        b.iter(|| {
            i += 1;
            black_box(table.lookup(black_box(key(i))))
        });
    });

    group.finish();
}

fn bench_split(c: &mut Criterion) {
    let mut source = new_buffer();
    let table = populated(&mut source, 100_000);
    let mut group = c.benchmark_group("split");
    group.sample_size(10);

    group.bench_function(BenchmarkId::new("fresh_pages", 100_000), |b| {
        b.iter(|| {
            let mut lower_words = new_buffer();
            let mut upper_words = new_buffer();
            let mut lower = CuckooTable::new(&mut *lower_words).expect("page size");
            let mut upper = CuckooTable::new(&mut *upper_words).expect("page size");
            black_box(table.split(&mut lower, &mut upper).expect("split"))
        });
    });

    group.finish();
}

criterion_group!(benches, bench_insert, bench_lookup, bench_split);
criterion_main!(benches);
