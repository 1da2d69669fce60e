//! Graph algorithms (traversal, shortest paths, `PageRank`, cores, communities)
//!
//! Every algorithm borrows the graph immutably. The numerical ones work on a
//! [`CsrSnapshot`](crate::storage::CsrSnapshot) taken at call time.

pub mod community;
pub mod core_periphery;
pub mod kcore;
pub mod pagerank;
pub mod path;
pub mod reachability;
pub mod shortest_path;
pub mod traversal;

pub use community::{
    detect, hierarchical, infomap, is_partition_of, label_propagation, leiden, louvain, modularity,
    spectral, Cluster, CommunityAlgorithm, CommunityDetectionResult, DetectionMetadata,
    HierarchicalConfig, InfomapConfig, InfomapResult, LabelPropagationConfig,
    LabelPropagationResult, LeidenConfig, Linkage, LouvainConfig, Module, PropagationMode,
    SpectralConfig,
};
pub use core_periphery::{core_periphery, CorePeripheryConfig, CorePeripheryResult, NodeCoreness};
pub use kcore::{core_numbers, k_core, CoreDecomposition};
pub use pagerank::{pagerank, PageRankConfig, PageRankResult};
pub use path::{Path, PathResult, TraversalResult};
pub use reachability::{
    find_all_paths, find_reachable_nodes, run_preset, PathPreset, PresetConfig, PresetResult,
    ReachabilityResult, ReachableNode,
};
pub use shortest_path::{bidirectional_search, dijkstra, shortest_path};
pub use traversal::{bfs, dfs};
