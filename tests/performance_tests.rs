//! Wall-clock acceptance tests
//!
//! Serialized so timings are not skewed by sibling tests. Bounds are loose
//! enough for unoptimized builds.

use bibgraph_core::{
    infomap, label_propagation, planted_partition, InfomapConfig, LabelPropagationConfig,
    PlantedPartitionConfig,
};
use serial_test::serial;
use std::time::{Duration, Instant};

/// Ten communities of `size` nodes, dense inside, 5% of edges crossing
fn dense_communities(size: usize) -> PlantedPartitionConfig {
    PlantedPartitionConfig::default()
        .with_communities(10, size)
        .with_intra_degree(40)
        .with_inter_fraction(0.05)
}

#[test]
#[serial]
fn test_label_propagation_scales_to_10k_nodes() {
    let (graph, _) = planted_partition(&dense_communities(1000)).unwrap();

    let start = Instant::now();
    let result = label_propagation(&graph, &LabelPropagationConfig::default()).unwrap();
    let elapsed = start.elapsed();

    assert!(elapsed < Duration::from_secs(36), "took {elapsed:?}");
    assert!(result.converged);
    assert!(
        result.iterations >= 1 && result.iterations <= 15,
        "{} iterations",
        result.iterations
    );
    assert!(
        (9..=11).contains(&result.clusters.len()),
        "{} clusters",
        result.clusters.len()
    );
    let covered: usize = result.clusters.iter().map(|c| c.size).sum();
    assert_eq!(covered, 10_000);
}

#[test]
#[serial]
fn test_label_propagation_scaling_is_subquadratic() {
    let fastest = |size: usize| -> Duration {
        let (graph, _) = planted_partition(&dense_communities(size)).unwrap();
        (0..3)
            .map(|_| {
                let start = Instant::now();
                let result = label_propagation(&graph, &LabelPropagationConfig::default()).unwrap();
                let elapsed = start.elapsed();
                assert!(result.converged, "{size}-node communities did not converge");
                elapsed
            })
            .min()
            .unwrap_or_default()
    };

    let small = fastest(100);
    let large = fastest(1000);
    // Ten times the nodes; quadratic growth would cost a hundredfold
    let ratio = large.as_secs_f64() / small.as_secs_f64().max(1e-6);
    assert!(ratio < 40.0, "1k {small:?}, 10k {large:?}, ratio {ratio:.1}");
}

#[test]
#[serial]
fn test_infomap_compresses_many_small_modules() {
    let config = PlantedPartitionConfig::default()
        .with_communities(40, 20)
        .with_intra_degree(8)
        .with_inter_fraction(0.02);
    let (graph, _) = planted_partition(&config).unwrap();

    let result = infomap(&graph, &InfomapConfig::default()).unwrap();

    assert!(result.compression_ratio > 1.5, "ratio {}", result.compression_ratio);
    assert!(result.modules.len() > 10);
}

#[test]
#[serial]
fn test_infomap_1000_nodes_within_budget() {
    let config = PlantedPartitionConfig::default()
        .with_communities(20, 50)
        .with_intra_degree(10)
        .with_inter_fraction(0.05);
    let (graph, _) = planted_partition(&config).unwrap();

    let start = Instant::now();
    let result = infomap(&graph, &InfomapConfig::default()).unwrap();
    let elapsed = start.elapsed();

    assert!(elapsed < Duration::from_secs(40), "took {elapsed:?}");
    assert!(result.compression_ratio > 1.2, "ratio {}", result.compression_ratio);
}
