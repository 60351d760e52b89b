//! Benchmark for seqlist containers vs the standard library equivalents.
//!
//! Compares ArraySequence against Vec and ChainSequence against VecDeque for
//! common operations, plus split-cursor consumption.

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use seqlist::sequence::{ArraySequence, ChainSequence, Sequence, SplitCursor};
use std::collections::VecDeque;
use std::hint::black_box;

// =============================================================================
// append Benchmark
// =============================================================================

fn benchmark_append(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("append");

    for size in [100, 1000, 10000] {
        group.bench_with_input(
            BenchmarkId::new("ArraySequence", size),
            &size,
            |bencher, &size| {
                bencher.iter(|| {
                    let mut sequence = ArraySequence::new();
                    for index in 0..size {
                        sequence.append(black_box(index)).unwrap();
                    }
                    black_box(sequence)
                });
            },
        );

        group.bench_with_input(
            BenchmarkId::new("Vec", size),
            &size,
            |bencher, &size| {
                bencher.iter(|| {
                    let mut vec = Vec::new();
                    for index in 0..size {
                        vec.push(black_box(index));
                    }
                    black_box(vec)
                });
            },
        );
    }

    group.finish();
}

// =============================================================================
// push_front Benchmark
// =============================================================================

fn benchmark_push_front(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("push_front");

    for size in [100, 1000, 10000] {
        group.bench_with_input(
            BenchmarkId::new("ChainSequence", size),
            &size,
            |bencher, &size| {
                bencher.iter(|| {
                    let mut chain = ChainSequence::new();
                    for index in 0..size {
                        chain.push_front(black_box(index));
                    }
                    black_box(chain)
                });
            },
        );

        group.bench_with_input(
            BenchmarkId::new("VecDeque", size),
            &size,
            |bencher, &size| {
                bencher.iter(|| {
                    let mut deque = VecDeque::new();
                    for index in 0..size {
                        deque.push_front(black_box(index));
                    }
                    black_box(deque)
                });
            },
        );
    }

    group.finish();
}

// =============================================================================
// get Benchmark
// =============================================================================

fn benchmark_get(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("get");

    for size in [100, 1000] {
        let array: ArraySequence<i32> = (0..size).collect();
        group.bench_with_input(
            BenchmarkId::new("ArraySequence", size),
            &size,
            |bencher, &size| {
                bencher.iter(|| {
                    let mut total = 0i64;
                    for index in 0..size {
                        total += i64::from(array.get(index as usize).unwrap());
                    }
                    black_box(total)
                });
            },
        );

        let chain: ChainSequence<i32> = (0..size).collect();
        group.bench_with_input(
            BenchmarkId::new("ChainSequence", size),
            &size,
            |bencher, &size| {
                bencher.iter(|| {
                    let mut total = 0i64;
                    for index in 0..size {
                        total += i64::from(chain.get(index as usize).unwrap());
                    }
                    black_box(total)
                });
            },
        );
    }

    group.finish();
}

// =============================================================================
// Split Cursor Benchmark
// =============================================================================

fn benchmark_split_consumption(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("split_consumption");

    for size in [1000, 10000] {
        let array: ArraySequence<i32> = (0..size).collect();
        group.bench_with_input(
            BenchmarkId::new("ArraySplitCursor", size),
            &size,
            |bencher, _| {
                bencher.iter(|| {
                    let mut right = array.split_cursor();
                    let mut total = 0i64;
                    if let Some(mut left) = right.try_split() {
                        left.for_each_remaining(|element| total += i64::from(element))
                            .unwrap();
                    }
                    right
                        .for_each_remaining(|element| total += i64::from(element))
                        .unwrap();
                    black_box(total)
                });
            },
        );

        let chain: ChainSequence<i32> = (0..size).collect();
        group.bench_with_input(
            BenchmarkId::new("ChainSplitCursor", size),
            &size,
            |bencher, _| {
                bencher.iter(|| {
                    let mut cursor = chain.split_cursor();
                    let mut total = 0i64;
                    while let Some(mut snapshot) = cursor.try_split() {
                        snapshot
                            .for_each_remaining(|element| total += i64::from(element))
                            .unwrap();
                    }
                    cursor
                        .for_each_remaining(|element| total += i64::from(element))
                        .unwrap();
                    black_box(total)
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_append,
    benchmark_push_front,
    benchmark_get,
    benchmark_split_consumption
);
criterion_main!(benches);
