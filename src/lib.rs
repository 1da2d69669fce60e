//! bibgraph-core: graph analytics for bibliographic networks
//!
//! # Overview
//!
//! bibgraph-core stores citation and co-authorship networks in an id-keyed
//! graph and runs the analyses a bibliometrics application needs on them:
//! community detection, core/periphery structure, path queries, and the
//! baselines and metrics used to evaluate path rankings.
//!
//! # Quick Start
//!
//! ```
//! use bibgraph_core::{detect, shortest_path, CommunityAlgorithm, Graph, LouvainConfig};
//!
//! # fn main() -> Result<(), bibgraph_core::AnalysisError> {
//! let mut graph: Graph<String> = Graph::undirected();
//! for id in ["W1", "W2", "W3", "W4"] {
//!     graph.add_node(id.to_string());
//! }
//! graph.add_edge("E1", "W1", "W2", ())?;
//! graph.add_edge("E2", "W2", "W3", ())?;
//! graph.add_edge("E3", "W3", "W4", ())?;
//!
//! let path = shortest_path(&graph, "W1", "W4")?;
//! assert_eq!(path.path.nodes, vec!["W1", "W2", "W3", "W4"]);
//!
//! let communities = detect(&graph, &CommunityAlgorithm::Louvain(LouvainConfig::default()))?;
//! assert!(communities.num_communities < graph.node_count());
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - **Storage**: arena-backed [`Graph`] plus a CSR snapshot for numerical work
//! - **Communities**: Louvain, Leiden, label propagation, Infomap, spectral, hierarchical
//! - **Cores**: k-core peeling, core numbers, continuous core/periphery fit
//! - **Paths**: BFS/DFS, Dijkstra, bidirectional search, bounded reachability
//! - **Ranking**: seeded baselines, rank correlation and IR metrics
//! - **Generators**: seeded planted-partition and citation networks

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod algorithms;
pub mod error;
pub mod generators;
pub mod ranking;
pub mod storage;

// Re-export core types
pub use algorithms::{
    bfs, bidirectional_search, core_numbers, core_periphery, detect, dfs, dijkstra,
    find_all_paths, find_reachable_nodes, hierarchical, infomap, is_partition_of, k_core,
    label_propagation, leiden, louvain, modularity, pagerank, run_preset, shortest_path,
    spectral, Cluster, CommunityAlgorithm, CommunityDetectionResult, CoreDecomposition,
    CorePeripheryConfig, CorePeripheryResult, DetectionMetadata, HierarchicalConfig,
    InfomapConfig, InfomapResult, LabelPropagationConfig, LabelPropagationResult, LeidenConfig,
    Linkage, LouvainConfig, Module, NodeCoreness, PageRankConfig, PageRankResult, Path,
    PathPreset, PathResult, PresetConfig, PresetResult, PropagationMode, ReachabilityResult,
    ReachableNode, SpectralConfig, TraversalResult,
};
pub use generators::{
    planted_partition, temporal_citation_network, CitationNetworkConfig, PlantedPartitionConfig,
};
pub use ranking::{
    compare_rankings, degree_ranker, evaluate, kendall_tau, mean_average_precision,
    mean_reciprocal_rank, ndcg, ndcg_with_relevance, pagerank_ranker, precision_at_k,
    random_ranker, recall_at_k, shortest_path_ranker, spearman_correlation, weight_ranker,
    EvaluationReport, RankAgreement, RankedPath, SeededRandom,
};
pub use storage::{CsrSnapshot, Direction, EdgeRef, Graph, Identified, Orientation};

// Error type
pub use error::{AnalysisError, Result};
