//! Louvain community detection algorithm
//!
//! Greedy modularity optimization (Blondel et al., 2008):
//! 1. Start with each node in its own community
//! 2. Move nodes to the neighbouring community with the largest modularity gain
//! 3. Aggregate communities into super-nodes and repeat
//!
//! The run stops at the first level where no node moves.
//!
//! # References
//! - Blondel et al. (2008): "Fast unfolding of communities in large networks"
//! - Girvan & Newman (2002): "Community structure in social and biological networks"

use super::network::{renumber, visit_order, CommunityWeights, Network};
use super::{build_result, components_if_all_singletons, metadata, CommunityDetectionResult};
use crate::error::{AnalysisError, Result};
use crate::ranking::rng::SeededRandom;
use crate::storage::{CsrSnapshot, Graph, Identified, Orientation};
use tracing::{debug, instrument, warn};

/// Smallest gain that counts as an improvement
const GAIN_EPSILON: f64 = 1e-12;

/// Parameters for [`louvain`]
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LouvainConfig {
    /// Resolution γ; higher values give smaller communities (default: 1.0)
    pub resolution: f64,
    /// Maximum aggregation levels (default: 32)
    pub max_levels: usize,
    /// Maximum local-moving sweeps per level (default: 100)
    pub max_passes: usize,
    /// Seed for a shuffled visiting order; `None` visits in insertion order
    pub seed: Option<u64>,
}

impl Default for LouvainConfig {
    fn default() -> Self {
        Self {
            resolution: 1.0,
            max_levels: 32,
            max_passes: 100,
            seed: None,
        }
    }
}

impl LouvainConfig {
    /// Set the resolution
    #[must_use]
    pub const fn with_resolution(mut self, resolution: f64) -> Self {
        self.resolution = resolution;
        self
    }

    /// Set the level cap
    #[must_use]
    pub const fn with_max_levels(mut self, max_levels: usize) -> Self {
        self.max_levels = max_levels;
        self
    }

    /// Shuffle the visiting order with this seed
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Check parameter domains
    ///
    /// # Errors
    ///
    /// `InvalidParameter` for a non-positive resolution or a zero cap.
    pub fn validate(&self) -> Result<()> {
        validate_resolution(self.resolution)?;
        if self.max_levels == 0 {
            return Err(AnalysisError::invalid("max_levels", "must be at least 1"));
        }
        if self.max_passes == 0 {
            return Err(AnalysisError::invalid("max_passes", "must be at least 1"));
        }
        Ok(())
    }
}

pub(crate) fn validate_resolution(resolution: f64) -> Result<()> {
    if resolution.is_nan() || resolution <= 0.0 || resolution.is_infinite() {
        return Err(AnalysisError::invalid(
            "resolution",
            format!("must be positive and finite, got {resolution}"),
        ));
    }
    Ok(())
}

/// Sweep nodes, moving each to its best neighbouring community
///
/// Returns the community of every node (labels are node indices) and
/// whether anything moved.
fn local_moving(
    net: &Network,
    resolution: f64,
    max_passes: usize,
    order: &[usize],
) -> (Vec<usize>, bool) {
    let n = net.len();
    let two_m = 2.0 * net.total_weight;
    let mut community: Vec<usize> = (0..n).collect();
    let mut total = net.strength.clone();
    let mut weights = CommunityWeights::new(n);
    let mut moved_any = false;

    for pass in 0..max_passes {
        let mut moves = 0_usize;

        for &node in order {
            let current = community[node];
            let k = net.strength[node];

            weights.clear();
            weights.add(current, 0.0);
            for &(neighbor, w) in &net.adj[node] {
                weights.add(community[neighbor], w);
            }

            // Evaluate as if the node had been removed from its community
            total[current] -= k;
            let mut best = current;
            let mut best_gain = weights.get(current) - resolution * total[current] * k / two_m;
            for &candidate in weights.touched() {
                let gain = weights.get(candidate) - resolution * total[candidate] * k / two_m;
                if gain > best_gain + GAIN_EPSILON {
                    best = candidate;
                    best_gain = gain;
                }
            }
            total[best] += k;

            if best != current {
                community[node] = best;
                moves += 1;
            }
        }

        debug!(pass, moves, "louvain local moving pass");
        if moves == 0 {
            break;
        }
        moved_any = true;
    }

    (community, moved_any)
}

/// Detect communities using the Louvain algorithm
///
/// Edge direction is ignored and parallel edges add their weights.
///
/// # Errors
///
/// `InvalidParameter` for an invalid config or a negative edge weight.
///
/// # Example
///
/// ```
/// use bibgraph_core::{louvain, Graph, LouvainConfig};
///
/// let mut graph: Graph<String> = Graph::undirected();
/// for id in ["0", "1", "2", "3", "4", "5"] {
///     graph.add_node(id.to_string());
/// }
/// for (s, t) in [("0", "1"), ("1", "2"), ("2", "0"), ("3", "4"), ("4", "5"), ("5", "3")] {
///     graph.add_edge(format!("{s}-{t}"), s, t, ()).unwrap();
/// }
///
/// let result = louvain(&graph, &LouvainConfig::default()).unwrap();
/// assert_eq!(result.num_communities, 2);
/// assert!((result.modularity - 0.5).abs() < 1e-9);
/// ```
#[instrument(skip_all, fields(nodes = graph.node_count(), edges = graph.edge_count()))]
pub fn louvain<N: Identified, E>(
    graph: &Graph<N, E>,
    config: &LouvainConfig,
) -> Result<CommunityDetectionResult> {
    config.validate()?;

    let csr = CsrSnapshot::from_graph(graph, Orientation::Symmetric);
    let net = Network::from_csr(&csr)?;
    let n = net.len();

    // Node -> super-node at the current level
    let mut assignment: Vec<usize> = (0..n).collect();

    if net.total_weight <= 0.0 {
        debug!("no edge weight, every node is its own community");
        return Ok(build_result(&csr, &net, &assignment, metadata("louvain", 0, true)));
    }

    let mut rng = config.seed.map(SeededRandom::new);
    let mut level_net = net.clone();
    let mut levels = 0;
    let mut converged = false;

    while levels < config.max_levels {
        levels += 1;
        let order = visit_order(level_net.len(), rng.as_mut());
        let (community, moved) =
            local_moving(&level_net, config.resolution, config.max_passes, &order);
        if !moved {
            converged = true;
            break;
        }

        let (community, count) = renumber(&community);
        for node in &mut assignment {
            *node = community[*node];
        }
        debug!(level = levels, communities = count, "louvain level aggregated");
        level_net = level_net.aggregate(&community, count);
    }

    if !converged {
        warn!(max_levels = config.max_levels, "louvain hit level cap");
    }

    components_if_all_singletons(&csr, &mut assignment);
    let result = build_result(&csr, &net, &assignment, metadata("louvain", levels, converged));
    debug!(
        communities = result.num_communities,
        modularity = result.modularity,
        "louvain finished"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::community::{is_partition_of, modularity};

    fn undirected(n_nodes: usize, edges: &[(usize, usize)]) -> Graph<String> {
        let mut graph = Graph::undirected();
        for i in 0..n_nodes {
            graph.add_node(format!("n{i}"));
        }
        for (k, &(s, t)) in edges.iter().enumerate() {
            graph
                .add_edge(format!("e{k}"), &format!("n{s}"), &format!("n{t}"), ())
                .unwrap();
        }
        graph
    }

    /// Four 5-cliques joined in a ring by single edges
    fn ring_of_cliques() -> Graph<String> {
        let mut edges = Vec::new();
        for c in 0..4 {
            let base = c * 5;
            for i in 0..5 {
                for j in (i + 1)..5 {
                    edges.push((base + i, base + j));
                }
            }
            edges.push((base, (base + 5) % 20));
        }
        undirected(20, &edges)
    }

    #[test]
    fn test_louvain_empty_graph() {
        let graph: Graph<String> = Graph::undirected();
        let result = louvain(&graph, &LouvainConfig::default()).unwrap();

        assert_eq!(result.num_communities, 0);
        assert!(result.communities.is_empty());
    }

    #[test]
    fn test_louvain_single_triangle() {
        let graph = undirected(3, &[(0, 1), (1, 2), (2, 0)]);
        let result = louvain(&graph, &LouvainConfig::default()).unwrap();

        assert_eq!(result.num_communities, 1);
        assert_eq!(result.community_size(0), Some(3));
    }

    #[test]
    fn test_louvain_ring_of_cliques() {
        let graph = ring_of_cliques();
        let result = louvain(&graph, &LouvainConfig::default()).unwrap();

        assert_eq!(result.num_communities, 4);
        assert!(result.metadata.converged);
        assert_eq!(result.metadata.algorithm, "louvain");
        assert!(is_partition_of(&graph, &result.communities));
        for c in 0..4 {
            let first = format!("n{}", c * 5);
            let last = format!("n{}", c * 5 + 4);
            assert_eq!(result.get_community(&first), result.get_community(&last));
        }
    }

    #[test]
    fn test_reported_modularity_matches_post_hoc() {
        let graph = ring_of_cliques();
        let result = louvain(&graph, &LouvainConfig::default()).unwrap();
        let q = modularity(&graph, &result.communities, 1.0).unwrap();

        assert!((result.modularity - q).abs() < 1e-12);
        assert!(result.modularity > 0.5);
    }

    #[test]
    fn test_groups_follow_insertion_order() {
        let graph = ring_of_cliques();
        let result = louvain(&graph, &LouvainConfig::default().with_seed(11)).unwrap();

        assert_eq!(result.communities[0][0], "n0");
        assert_eq!(result.communities[1][0], "n5");
    }

    #[test]
    fn test_seeded_runs_are_deterministic() {
        let graph = ring_of_cliques();
        let config = LouvainConfig::default().with_seed(99);
        assert_eq!(
            louvain(&graph, &config).unwrap(),
            louvain(&graph, &config).unwrap()
        );
    }

    #[test]
    fn test_higher_resolution_gives_more_communities() {
        let graph = ring_of_cliques();
        let coarse = louvain(&graph, &LouvainConfig::default().with_resolution(0.05)).unwrap();
        let fine = louvain(&graph, &LouvainConfig::default().with_resolution(3.0)).unwrap();

        assert!(coarse.num_communities < fine.num_communities);
    }

    #[test]
    fn test_high_resolution_path_still_groups() {
        // At γ ≥ 2 no single move on a 3-node path gains anything
        let graph = undirected(3, &[(0, 1), (1, 2)]);
        for resolution in [2.0, 3.0] {
            let config = LouvainConfig::default().with_resolution(resolution);
            let result = louvain(&graph, &config).unwrap();

            assert!(is_partition_of(&graph, &result.communities));
            assert_eq!(result.num_communities, 1, "resolution {resolution}");
        }
    }

    #[test]
    fn test_level_cap_reports_unconverged() {
        let graph = ring_of_cliques();
        let result = louvain(&graph, &LouvainConfig::default().with_max_levels(1)).unwrap();

        assert!(!result.metadata.converged);
        assert_eq!(result.metadata.iterations, 1);
        assert!(is_partition_of(&graph, &result.communities));
    }

    #[test]
    fn test_invalid_resolution() {
        let graph = ring_of_cliques();
        for resolution in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let config = LouvainConfig::default().with_resolution(resolution);
            assert!(matches!(
                louvain(&graph, &config),
                Err(AnalysisError::InvalidParameter { name: "resolution", .. })
            ));
        }
    }

    #[test]
    fn test_negative_weight_rejected() {
        let mut graph = undirected(2, &[]);
        graph.add_weighted_edge("w", "n0", "n1", -1.0, ()).unwrap();
        assert!(louvain(&graph, &LouvainConfig::default()).is_err());
    }
}
