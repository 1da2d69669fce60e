//! Property-based tests for bibgraph-core
//!
//! Verifies partition, core and metric invariants hold for arbitrary graphs

use bibgraph_core::{
    core_numbers, detect, is_partition_of, k_core, kendall_tau, mean_average_precision,
    mean_reciprocal_rank, modularity, ndcg, precision_at_k, recall_at_k, spearman_correlation,
    CommunityAlgorithm, Graph, HierarchicalConfig, InfomapConfig, LabelPropagationConfig,
    LeidenConfig, LouvainConfig, SpectralConfig,
};
use proptest::prelude::*;
use std::collections::HashSet;

/// Strategy: node count plus a simple edge list (no loops, no parallel edges)
fn prop_graph(max_nodes: usize, max_edges: usize) -> impl Strategy<Value = (usize, Vec<(usize, usize)>)> {
    (1..max_nodes).prop_flat_map(move |n| {
        let edges = prop::collection::vec((0..n, 0..n), 0..max_edges).prop_map(|raw| {
            let mut seen = HashSet::new();
            raw.into_iter()
                .filter(|&(s, t)| s != t && seen.insert((s.min(t), s.max(t))))
                .collect::<Vec<_>>()
        });
        (Just(n), edges)
    })
}

fn build(directed: bool, n: usize, edges: &[(usize, usize)]) -> Graph<String> {
    let mut graph = Graph::new(directed);
    for i in 0..n {
        graph.add_node(format!("W{i}"));
    }
    for (k, &(s, t)) in edges.iter().enumerate() {
        graph
            .add_edge(format!("E{k}"), &format!("W{s}"), &format!("W{t}"), ())
            .unwrap();
    }
    graph
}

/// Strategy: a ranking of distinct ids drawn from a small alphabet
fn prop_ranking() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(0_u8..20, 0..15).prop_map(|raw| {
        let mut seen = HashSet::new();
        raw.into_iter()
            .filter(|x| seen.insert(*x))
            .map(|x| format!("I{x}"))
            .collect()
    })
}

fn algorithms() -> Vec<CommunityAlgorithm> {
    vec![
        CommunityAlgorithm::Louvain(LouvainConfig::default()),
        CommunityAlgorithm::Leiden(LeidenConfig::default()),
        CommunityAlgorithm::LabelPropagation(LabelPropagationConfig::default()),
        CommunityAlgorithm::Infomap(InfomapConfig::default()),
        CommunityAlgorithm::Spectral(SpectralConfig::default().with_num_clusters(3)),
        CommunityAlgorithm::Hierarchical(HierarchicalConfig::default().with_num_clusters(3)),
    ]
}

// Property: every algorithm returns a valid partition with fewer groups than nodes
proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_partitions_are_valid((n, edges) in prop_graph(30, 60), directed in any::<bool>()) {
        let graph = build(directed, n, &edges);
        let has_links = !edges.is_empty();

        for algorithm in algorithms() {
            let result = detect(&graph, &algorithm).unwrap();

            prop_assert!(is_partition_of(&graph, &result.communities), "{}", result.metadata.algorithm);
            prop_assert_eq!(result.num_communities, result.communities.len());
            if has_links {
                prop_assert!(result.num_communities < n, "{}", result.metadata.algorithm);
            } else {
                prop_assert_eq!(result.num_communities, n);
            }
        }
    }
}

// Property: Louvain never does worse than the all-singleton partition
proptest! {
    #[test]
    fn prop_louvain_modularity_beats_singletons((n, edges) in prop_graph(40, 80)) {
        let graph = build(false, n, &edges);
        let result = detect(&graph, &CommunityAlgorithm::Louvain(LouvainConfig::default())).unwrap();

        let singletons: Vec<Vec<String>> = (0..n).map(|i| vec![format!("W{i}")]).collect();
        let baseline = modularity(&graph, &singletons, 1.0).unwrap();
        prop_assert!(result.modularity >= baseline - 1e-9);
        prop_assert!(result.modularity <= 1.0);
    }
}

// Property: k-cores are nested and agree with the core decomposition
proptest! {
    #[test]
    fn prop_k_core_monotone((n, edges) in prop_graph(40, 120)) {
        let graph = build(false, n, &edges);
        let decomposition = core_numbers(&graph).unwrap();

        let mut previous: HashSet<String> = graph.node_ids().iter().map(|id| (*id).to_string()).collect();
        for k in 0..=decomposition.degeneracy + 1 {
            let core: HashSet<String> = k_core(&graph, k).unwrap().into_iter().collect();
            prop_assert!(core.is_subset(&previous), "k={}", k);

            let expected: HashSet<String> = decomposition
                .core_numbers
                .iter()
                .filter(|(_, &c)| c >= k)
                .map(|(id, _)| id.clone())
                .collect();
            prop_assert_eq!(&core, &expected);
            previous = core;
        }
        prop_assert!(previous.is_empty());
    }
}

// Property: rank correlations stay in [-1, 1] and are symmetric
proptest! {
    #[test]
    fn prop_rank_correlation_bounds(a in prop_ranking(), b in prop_ranking()) {
        let rho = spearman_correlation(&a, &b);
        let tau = kendall_tau(&a, &b);

        prop_assert!((-1.0 - 1e-12..=1.0 + 1e-12).contains(&rho));
        prop_assert!((-1.0 - 1e-12..=1.0 + 1e-12).contains(&tau));
        prop_assert!((rho - spearman_correlation(&b, &a)).abs() < 1e-9);
        prop_assert!((tau - kendall_tau(&b, &a)).abs() < 1e-9);
        if a.len() >= 2 {
            prop_assert!((spearman_correlation(&a, &a) - 1.0).abs() < 1e-9);
        }
    }
}

// Property: IR metrics stay in [0, 1]
proptest! {
    #[test]
    fn prop_ir_metrics_bounds(predicted in prop_ranking(), relevant in prop_ranking(), k in 0_usize..20) {
        for value in [
            ndcg(&predicted, &relevant, Some(k)),
            ndcg(&predicted, &relevant, None),
            mean_average_precision(&predicted, &relevant),
            mean_reciprocal_rank(&predicted, &relevant),
            precision_at_k(&predicted, &relevant, k),
            recall_at_k(&predicted, &relevant, k),
        ] {
            prop_assert!((0.0..=1.0 + 1e-12).contains(&value), "value {}", value);
        }
        if !predicted.is_empty() {
            prop_assert!((ndcg(&predicted, &predicted, None) - 1.0).abs() < 1e-9);
        }
    }
}
