//! Criterion benchmarks for graph algorithms
//!
//! Covers the storage layer and the path engine:
//! - CSR snapshot construction
//! - BFS and Dijkstra/BFS shortest paths
//! - PageRank power iteration
//! - k-core peeling

use bibgraph_core::{
    bfs, core_numbers, k_core, pagerank, shortest_path, temporal_citation_network,
    CitationNetworkConfig, CsrSnapshot, Graph, Orientation, PageRankConfig,
};
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use std::hint::black_box;

/// Citation network with `size` papers over 4 fields
fn citation_graph(size: usize) -> Graph<String> {
    let config = CitationNetworkConfig::default().with_fields(4, size / 4);
    let (graph, _) = temporal_citation_network(&config).unwrap();
    graph
}

/// Benchmark: CSR snapshot construction
fn bench_csr_construction(c: &mut Criterion) {
    let mut group = c.benchmark_group("csr_construction");

    for size in [100, 500, 1000, 5000].iter() {
        let graph = citation_graph(*size);

        group.bench_with_input(BenchmarkId::new("symmetric", size), &graph, |b, graph| {
            b.iter(|| {
                let csr = CsrSnapshot::from_graph(black_box(graph), Orientation::Symmetric);
                black_box(csr);
            });
        });
    }

    group.finish();
}

/// Benchmark: BFS traversal performance
fn bench_bfs(c: &mut Criterion) {
    let mut group = c.benchmark_group("bfs");

    for size in [100, 500, 1000, 5000].iter() {
        let graph = citation_graph(*size);
        let start = format!("W{}", size - 1);

        group.bench_with_input(BenchmarkId::new("outgoing", size), &graph, |b, graph| {
            b.iter(|| {
                let visited = bfs(black_box(graph), &start, true).unwrap();
                black_box(visited);
            });
        });
    }

    group.finish();
}

/// Benchmark: shortest path from the newest paper to the oldest
fn bench_shortest_path(c: &mut Criterion) {
    let mut group = c.benchmark_group("shortest_path");

    for size in [100, 500, 1000, 5000].iter() {
        let graph = citation_graph(*size);
        let source = format!("W{}", size - 1);

        group.bench_with_input(BenchmarkId::new("newest_to_oldest", size), &graph, |b, graph| {
            b.iter(|| {
                let path = shortest_path(black_box(graph), &source, "W0").unwrap();
                black_box(path);
            });
        });
    }

    group.finish();
}

/// Benchmark: PageRank algorithm
fn bench_pagerank(c: &mut Criterion) {
    let mut group = c.benchmark_group("pagerank");
    let config = PageRankConfig::default().with_max_iterations(20).with_tolerance(1e-6);

    for size in [100, 500, 1000].iter() {
        let graph = citation_graph(*size);

        group.bench_with_input(BenchmarkId::new("20_iterations", size), &graph, |b, graph| {
            b.iter(|| {
                let scores = pagerank(black_box(graph), &config).unwrap();
                black_box(scores);
            });
        });
    }

    group.finish();
}

/// Benchmark: k-core peeling vs full decomposition
fn bench_cores(c: &mut Criterion) {
    let mut group = c.benchmark_group("cores");

    let graph = citation_graph(1000);

    group.bench_function("k_core_3", |b| {
        b.iter(|| {
            let core = k_core(black_box(&graph), 3).unwrap();
            black_box(core);
        });
    });

    group.bench_function("core_numbers", |b| {
        b.iter(|| {
            let decomposition = core_numbers(black_box(&graph)).unwrap();
            black_box(decomposition);
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_csr_construction,
    bench_bfs,
    bench_shortest_path,
    bench_pagerank,
    bench_cores
);
criterion_main!(benches);
