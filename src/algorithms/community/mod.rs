//! Community detection
//!
//! Six interchangeable clustering algorithms that all return a complete,
//! non-overlapping partition of the graph's nodes:
//!
//! | Algorithm | Mechanism |
//! |---|---|
//! | [`louvain`] | greedy modularity moves + aggregation |
//! | [`leiden`] | Louvain moves + refinement (connected communities) |
//! | [`label_propagation`] | majority label adoption |
//! | [`infomap`] | two-level map equation |
//! | [`spectral`] | normalized Laplacian embedding + k-means |
//! | [`hierarchical`] | agglomerative hop-distance linkage |
//!
//! Groups are ordered by the insertion index of their first member and
//! members keep node insertion order. Graphs without edges yield singletons.
//!
//! # References
//! - Blondel et al. (2008): "Fast unfolding of communities in large networks"
//! - Traag, Waltman & van Eck (2019): "From Louvain to Leiden"
//! - Rosvall & Bergstrom (2008): "Maps of random walks on complex networks"

pub mod hierarchical;
pub mod infomap;
pub mod label_propagation;
pub mod leiden;
pub mod louvain;
pub(crate) mod network;
pub mod spectral;

pub use hierarchical::{hierarchical, HierarchicalConfig, Linkage};
pub use infomap::{infomap, InfomapConfig, InfomapResult, Module};
pub use label_propagation::{
    label_propagation, Cluster, LabelPropagationConfig, LabelPropagationResult, PropagationMode,
};
pub use leiden::{leiden, LeidenConfig};
pub use louvain::{louvain, LouvainConfig};
pub use spectral::{spectral, SpectralConfig};

use crate::error::{AnalysisError, Result};
use crate::storage::{CsrSnapshot, Graph, Identified, Orientation};
use network::{group_ids, renumber, Network};
use std::collections::HashMap;
use tracing::{debug, instrument};

/// How a partition was produced
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DetectionMetadata {
    /// Algorithm name (`"louvain"`, `"infomap"`, ...)
    pub algorithm: String,
    /// Algorithm-specific iteration count (levels, passes or sweeps)
    pub iterations: usize,
    /// Whether the algorithm stopped on its own criterion rather than a cap
    pub converged: bool,
}

/// Community detection result
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CommunityDetectionResult {
    /// Communities, each containing a list of node ids
    pub communities: Vec<Vec<String>>,

    /// Total number of communities found
    pub num_communities: usize,

    /// Modularity score (standard, resolution 1) of the partition
    pub modularity: f64,

    /// Run details
    pub metadata: DetectionMetadata,
}

impl CommunityDetectionResult {
    /// Get the community index for a given node
    ///
    /// Returns None if node not found in any community
    #[must_use]
    pub fn get_community(&self, node: &str) -> Option<usize> {
        self.communities
            .iter()
            .position(|community| community.iter().any(|member| member == node))
    }

    /// Get all nodes in a specific community
    #[must_use]
    pub fn get_community_nodes(&self, comm_id: usize) -> Option<&[String]> {
        self.communities.get(comm_id).map(Vec::as_slice)
    }

    /// Get size of a specific community
    #[must_use]
    pub fn community_size(&self, comm_id: usize) -> Option<usize> {
        self.communities.get(comm_id).map(Vec::len)
    }
}

/// Algorithm selection for [`detect`]
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CommunityAlgorithm {
    /// Louvain modularity optimization
    Louvain(LouvainConfig),
    /// Leiden modularity optimization with refinement
    Leiden(LeidenConfig),
    /// Label propagation
    LabelPropagation(LabelPropagationConfig),
    /// Infomap (map equation)
    Infomap(InfomapConfig),
    /// Spectral clustering
    Spectral(SpectralConfig),
    /// Agglomerative hierarchical clustering
    Hierarchical(HierarchicalConfig),
}

/// Run any community detection algorithm behind one contract
///
/// # Errors
///
/// `InvalidParameter` for invalid configs or negative edge weights,
/// `Numerical` for an internal numerical failure.
///
/// # Example
///
/// ```
/// use bibgraph_core::{detect, CommunityAlgorithm, Graph, LouvainConfig};
///
/// let mut graph: Graph<String> = Graph::undirected();
/// for id in ["a", "b", "c", "x", "y", "z"] {
///     graph.add_node(id.to_string());
/// }
/// for (s, t) in [("a", "b"), ("b", "c"), ("c", "a"), ("x", "y"), ("y", "z"), ("z", "x")] {
///     graph.add_edge(format!("{s}{t}"), s, t, ()).unwrap();
/// }
///
/// let result = detect(&graph, &CommunityAlgorithm::Louvain(LouvainConfig::default())).unwrap();
/// assert_eq!(result.num_communities, 2);
/// assert_eq!(result.get_community("a"), result.get_community("c"));
/// ```
pub fn detect<N: Identified, E>(
    graph: &Graph<N, E>,
    algorithm: &CommunityAlgorithm,
) -> Result<CommunityDetectionResult> {
    match algorithm {
        CommunityAlgorithm::Louvain(config) => louvain(graph, config),
        CommunityAlgorithm::Leiden(config) => leiden(graph, config),
        CommunityAlgorithm::LabelPropagation(config) => {
            label_propagation(graph, config).map(LabelPropagationResult::into_detection)
        }
        CommunityAlgorithm::Infomap(config) => {
            infomap(graph, config).map(InfomapResult::into_detection)
        }
        CommunityAlgorithm::Spectral(config) => spectral(graph, config),
        CommunityAlgorithm::Hierarchical(config) => hierarchical(graph, config),
    }
}

/// Modularity of any partition of `graph`
///
/// The graph is treated as undirected and weighted. Nodes missing from
/// `communities` count as singletons.
///
/// # Errors
///
/// `NodeNotFound` for an unknown id, `InvalidParameter` if a node appears
/// in two groups or an edge weight is negative.
#[instrument(skip_all, fields(groups = communities.len(), resolution = resolution))]
pub fn modularity<N: Identified, E>(
    graph: &Graph<N, E>,
    communities: &[Vec<String>],
    resolution: f64,
) -> Result<f64> {
    let csr = CsrSnapshot::from_graph(graph, Orientation::Symmetric);
    let net = Network::from_csr(&csr)?;

    let index: HashMap<&str, usize> = csr.ids().iter().enumerate().map(|(i, id)| (*id, i)).collect();
    let mut labels = vec![usize::MAX; csr.num_nodes()];

    for (group, members) in communities.iter().enumerate() {
        for member in members {
            let node = *index
                .get(member.as_str())
                .ok_or_else(|| AnalysisError::NodeNotFound(member.clone()))?;
            if labels[node] != usize::MAX {
                return Err(AnalysisError::invalid(
                    "communities",
                    format!("node {member} appears in more than one group"),
                ));
            }
            labels[node] = group;
        }
    }

    // Uncovered nodes become singletons after the given groups
    let mut next = communities.len();
    for label in &mut labels {
        if *label == usize::MAX {
            *label = next;
            next += 1;
        }
    }

    Ok(net.modularity_of(&labels, resolution))
}

/// Whether `communities` is a complete, disjoint cover of the graph's nodes
#[must_use]
pub fn is_partition_of<N: Identified, E>(graph: &Graph<N, E>, communities: &[Vec<String>]) -> bool {
    let mut seen: HashMap<&str, ()> = HashMap::with_capacity(graph.node_count());
    for member in communities.iter().flatten() {
        if !graph.has_node(member) || seen.insert(member.as_str(), ()).is_some() {
            return false;
        }
    }
    seen.len() == graph.node_count()
}

/// Assemble a result from dense per-node labels
pub(crate) fn build_result(
    csr: &CsrSnapshot<'_>,
    net: &Network,
    labels: &[usize],
    metadata: DetectionMetadata,
) -> CommunityDetectionResult {
    let (labels, count) = renumber(labels);
    let communities = group_ids(csr.ids(), &labels, count);
    CommunityDetectionResult {
        num_communities: communities.len(),
        communities,
        modularity: net.modularity_of(&labels, 1.0),
        metadata,
    }
}

/// Replace an all-singleton labelling with weakly connected components
///
/// Keeps the group count below the node count whenever any two nodes are
/// linked. Returns whether the labels were replaced.
pub(crate) fn components_if_all_singletons(csr: &CsrSnapshot<'_>, labels: &mut Vec<usize>) -> bool {
    let (_, count) = renumber(labels);
    if count < labels.len() {
        return false;
    }
    let (components, component_count) = renumber(&csr.connected_components());
    if component_count == labels.len() {
        return false;
    }
    debug!(components = component_count, "no group formed, using connected components");
    *labels = components;
    true
}

pub(crate) fn metadata(algorithm: &str, iterations: usize, converged: bool) -> DetectionMetadata {
    DetectionMetadata {
        algorithm: algorithm.to_string(),
        iterations,
        converged,
    }
}
