//! Performance benchmarks for document processing
//!
//! Measures the outline codec on a generated document:
//! - Parsing text into a tree
//! - Writing a tree back to text
//! - Deep copy of a whole document
//!
//! Run with: cargo bench

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use mmd_core::{Extra, MindMap, Topic};

/// A tree `depth` levels deep with `fanout` children per topic, every third topic carrying a
/// note and every fifth an attribute.
fn build_map(depth: usize, fanout: usize) -> MindMap {
    let map = MindMap::with_root("root");
    let root = map.root().expect("map has a root");
    let mut counter = 0usize;
    grow(&root, depth, fanout, &mut counter);
    map
}

fn grow(parent: &Topic, depth: usize, fanout: usize, counter: &mut usize) {
    if depth == 0 {
        return;
    }
    for idx in 0..fanout {
        *counter += 1;
        let child = parent
            .make_child(format!("topic {counter} ({idx})"), None)
            .expect("parent is attached");
        if *counter % 3 == 0 {
            child.set_extra([Extra::Note(format!("note for topic {counter}\nsecond line"))]);
        }
        if *counter % 5 == 0 {
            child.set_attribute("fillColor", Some("#ffcc00"));
        }
        grow(&child, depth - 1, fanout, counter);
    }
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    for (depth, fanout) in [(3, 5), (4, 6)] {
        let text = build_map(depth, fanout).write();
        group.throughput(Throughput::Bytes(text.len() as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{depth}x{fanout}")),
            &text,
            |b, text| b.iter(|| MindMap::parse(text).expect("generated text parses")),
        );
    }
    group.finish();
}

fn bench_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("write");
    for (depth, fanout) in [(3, 5), (4, 6)] {
        let map = build_map(depth, fanout);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{depth}x{fanout}")),
            &map,
            |b, map| b.iter(|| map.write()),
        );
    }
    group.finish();
}

fn bench_make_copy(c: &mut Criterion) {
    let map = build_map(4, 6);
    c.bench_function("make_copy_4x6", |b| b.iter(|| map.make_copy()));
}

criterion_group!(benches, bench_parse, bench_write, bench_make_copy);
criterion_main!(benches);
