use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use vafile::prelude::*;

fn generate_collection(count: usize, dimension: usize) -> MemoryCollection<usize> {
    MemoryCollection::from_vectors(
        dimension,
        (0..count).map(|i| {
            let vector = (0..dimension)
                .map(|j| ((i as f64 * 0.1 + j as f64 * 0.01).sin() * 0.5 + 0.5) * 2.0 - 1.0)
                .collect();
            (i, vector)
        }),
    )
    .unwrap()
}

fn bench_build(c: &mut Criterion) {
    let collection = generate_collection(10_000, 32);
    let mut group = c.benchmark_group("build");

    for partitions in [4, 16, 64] {
        group.bench_with_input(
            BenchmarkId::from_parameter(partitions),
            &partitions,
            |b, &partitions| {
                b.iter(|| {
                    let mut index = VaFile::new(VaFileConfig::new(4096, partitions)).unwrap();
                    index.build(black_box(&collection)).unwrap();
                    index
                })
            },
        );
    }

    group.finish();
}

fn bench_knn(c: &mut Criterion) {
    let dimension = 32;
    let collection = generate_collection(10_000, dimension);
    let query: Vec<f64> = (0..dimension).map(|j| (j as f64 * 0.3).cos()).collect();
    let distance = DistanceFunction::Euclidean;
    let refiner = LpRefiner::for_distance(&collection, &distance).unwrap();
    let metrics = QueryMetrics::new();

    let mut va_file = VaFile::new(VaFileConfig::new(4096, 16)).unwrap();
    va_file.build(&collection).unwrap();
    let mut partial = PartialVaFile::new(VaFileConfig::new(4096, 16)).unwrap();
    partial.build(&collection).unwrap();
    let scan = LinearScan::new(&collection, distance.clone());

    let mut group = c.benchmark_group("knn_k10");

    let va_query = va_file.knn_query(&distance, &refiner).unwrap().unwrap();
    group.bench_function("va-file", |b| {
        b.iter(|| black_box(va_query.knn(black_box(&query), 10, &metrics).unwrap()))
    });

    let partial_query = partial.knn_query(&distance, &refiner).unwrap().unwrap();
    group.bench_function("pva-file", |b| {
        b.iter(|| black_box(partial_query.knn(black_box(&query), 10, &metrics).unwrap()))
    });

    group.bench_function("linear-scan", |b| {
        b.iter(|| black_box(scan.knn(black_box(&query), 10, &metrics).unwrap()))
    });

    group.finish();
}

fn bench_subspace_range(c: &mut Criterion) {
    let dimension = 32;
    let collection = generate_collection(10_000, dimension);
    let query: Vec<f64> = (0..dimension).map(|j| (j as f64 * 0.3).cos()).collect();
    let distance = DistanceFunction::SubspaceMinkowski {
        p: 2.0,
        dimensions: DimensionSubset::from_dimensions(dimension, &[0, 3, 7, 11]).unwrap(),
    };
    let refiner = LpRefiner::for_distance(&collection, &distance).unwrap();
    let metrics = QueryMetrics::new();

    let mut partial = PartialVaFile::new(VaFileConfig::new(4096, 32)).unwrap();
    partial.build(&collection).unwrap();
    let range = partial.range_query(&distance, &refiner).unwrap().unwrap();
    let scan = LinearScan::new(&collection, distance.clone());

    let mut group = c.benchmark_group("subspace_range");
    group.bench_function("pva-file", |b| {
        b.iter(|| black_box(range.range(black_box(&query), 0.2, &metrics).unwrap()))
    });
    group.bench_function("linear-scan", |b| {
        b.iter(|| black_box(scan.range(black_box(&query), 0.2, &metrics).unwrap()))
    });
    group.finish();
}

criterion_group!(benches, bench_build, bench_knn, bench_subspace_range);
criterion_main!(benches);
