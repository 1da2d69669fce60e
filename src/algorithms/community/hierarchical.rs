//! Agglomerative hierarchical clustering
//!
//! Distances are shortest-path hop counts with edge direction ignored;
//! unreachable pairs are infinitely far apart. Merges are found with the
//! nearest-neighbour chain algorithm and Lance–Williams distance updates,
//! then replayed in distance order until exactly `num_clusters` groups remain.
//! Infinite merges come last, so components stay apart whenever
//! `num_clusters` is at least the number of components.
//!
//! Memory is quadratic in the node count (dense distance matrix).
//!
//! # References
//! - Murtagh (1983): "A survey of recent advances in hierarchical clustering algorithms"
//! - Lance & Williams (1967): "A general theory of classificatory sorting strategies"

use super::network::Network;
use super::{build_result, metadata, CommunityDetectionResult};
use crate::error::{AnalysisError, Result};
use crate::storage::{CsrSnapshot, Graph, Identified, Orientation};
use std::collections::VecDeque;
use tracing::{debug, instrument};

/// Cluster-to-cluster distance rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Linkage {
    /// Closest pair of members
    Single,
    /// Farthest pair of members
    Complete,
    /// Mean over all member pairs (UPGMA)
    #[default]
    Average,
}

/// Parameters for [`hierarchical`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct HierarchicalConfig {
    /// Number of clusters to stop at (default: 2)
    pub num_clusters: usize,
    /// Linkage rule (default: average)
    pub linkage: Linkage,
}

impl Default for HierarchicalConfig {
    fn default() -> Self {
        Self {
            num_clusters: 2,
            linkage: Linkage::Average,
        }
    }
}

impl HierarchicalConfig {
    /// Set the number of clusters
    #[must_use]
    pub const fn with_num_clusters(mut self, num_clusters: usize) -> Self {
        self.num_clusters = num_clusters;
        self
    }

    /// Set the linkage rule
    #[must_use]
    pub const fn with_linkage(mut self, linkage: Linkage) -> Self {
        self.linkage = linkage;
        self
    }

    /// Check parameter domains
    ///
    /// # Errors
    ///
    /// `InvalidParameter` when `num_clusters` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.num_clusters == 0 {
            return Err(AnalysisError::invalid("num_clusters", "must be at least 1"));
        }
        Ok(())
    }
}

/// One agglomeration step: clusters represented by `a` and `b` joined at `distance`
#[derive(Debug, Clone, Copy, PartialEq)]
struct Merge {
    a: usize,
    b: usize,
    distance: f64,
}

/// All-pairs hop distances by BFS from every node
fn hop_distances(neighbors: &[Vec<usize>]) -> Vec<Vec<f64>> {
    let n = neighbors.len();
    let mut distances = vec![vec![f64::INFINITY; n]; n];
    let mut queue = VecDeque::new();

    for (source, row) in distances.iter_mut().enumerate() {
        row[source] = 0.0;
        queue.push_back(source);
        while let Some(node) = queue.pop_front() {
            let next = row[node] + 1.0;
            for &neighbor in &neighbors[node] {
                if row[neighbor].is_infinite() {
                    row[neighbor] = next;
                    queue.push_back(neighbor);
                }
            }
        }
    }

    distances
}

fn lance_williams(linkage: Linkage, d_a: f64, d_b: f64, size_a: usize, size_b: usize) -> f64 {
    match linkage {
        Linkage::Single => d_a.min(d_b),
        Linkage::Complete => d_a.max(d_b),
        Linkage::Average => {
            #[allow(clippy::cast_precision_loss)]
            let (wa, wb) = (size_a as f64, size_b as f64);
            (wa * d_a + wb * d_b) / (wa + wb)
        }
    }
}

/// Full dendrogram by the nearest-neighbour chain
///
/// Each merge keeps the lower-indexed representative. Ties prefer the
/// previous chain element, which keeps the chain acyclic.
fn nn_chain(mut distances: Vec<Vec<f64>>, linkage: Linkage) -> Vec<Merge> {
    let n = distances.len();
    let mut active = vec![true; n];
    let mut size = vec![1_usize; n];
    let mut chain: Vec<usize> = Vec::with_capacity(n);
    let mut merges = Vec::with_capacity(n.saturating_sub(1));

    while merges.len() + 1 < n {
        if chain.is_empty() {
            if let Some(first) = active.iter().position(|&alive| alive) {
                chain.push(first);
            }
        }

        let Some(&a) = chain.last() else {
            break;
        };
        let previous = chain.len().checked_sub(2).map(|i| chain[i]);

        let mut nearest = previous;
        let mut nearest_distance = previous.map_or(f64::INFINITY, |p| distances[a][p]);
        for c in (0..n).filter(|&c| active[c] && c != a) {
            if nearest.is_none() || distances[a][c] < nearest_distance {
                nearest = Some(c);
                nearest_distance = distances[a][c];
            }
        }
        let Some(b) = nearest else {
            break;
        };

        if Some(b) != previous {
            chain.push(b);
            continue;
        }

        // Reciprocal nearest neighbours: merge
        chain.truncate(chain.len() - 2);
        let (keep, gone) = if a < b { (a, b) } else { (b, a) };
        merges.push(Merge {
            a: keep,
            b: gone,
            distance: nearest_distance,
        });

        for c in (0..n).filter(|&c| active[c] && c != keep && c != gone) {
            let updated = lance_williams(
                linkage,
                distances[keep][c],
                distances[gone][c],
                size[keep],
                size[gone],
            );
            distances[keep][c] = updated;
            distances[c][keep] = updated;
        }
        size[keep] += size[gone];
        active[gone] = false;
    }

    merges
}

fn find(parent: &mut [usize], mut node: usize) -> usize {
    while parent[node] != node {
        parent[node] = parent[parent[node]];
        node = parent[node];
    }
    node
}

/// Detect communities by agglomerative clustering over hop distances
///
/// Returns exactly `num_clusters` groups, after clamping it to the node count
/// (minus one when the graph has edges).
///
/// # Errors
///
/// `InvalidParameter` for `num_clusters == 0` or a negative edge weight.
#[instrument(skip_all, fields(nodes = graph.node_count(), k = config.num_clusters, linkage = ?config.linkage))]
pub fn hierarchical<N: Identified, E>(
    graph: &Graph<N, E>,
    config: &HierarchicalConfig,
) -> Result<CommunityDetectionResult> {
    config.validate()?;

    let csr = CsrSnapshot::from_graph(graph, Orientation::Symmetric);
    let net = Network::from_csr(&csr)?;
    let n = net.len();

    if !net.has_links() {
        debug!("no links, every node is its own community");
        let singletons: Vec<usize> = (0..n).collect();
        return Ok(build_result(&csr, &net, &singletons, metadata("hierarchical", 0, true)));
    }

    let k = config.num_clusters.min(n - 1);
    let neighbors: Vec<Vec<usize>> = (0..n).map(|i| csr.distinct_neighbors(i)).collect();
    let mut merges = nn_chain(hop_distances(&neighbors), config.linkage);
    merges.sort_by(|x, y| x.distance.total_cmp(&y.distance));

    let mut parent: Vec<usize> = (0..n).collect();
    let needed = n - k;
    for merge in merges.iter().take(needed) {
        let root_a = find(&mut parent, merge.a);
        let root_b = find(&mut parent, merge.b);
        parent[root_b.max(root_a)] = root_a.min(root_b);
    }
    let labels: Vec<usize> = (0..n).map(|node| find(&mut parent, node)).collect();

    debug!(merges = needed, "dendrogram cut");
    Ok(build_result(&csr, &net, &labels, metadata("hierarchical", needed, true)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::community::is_partition_of;

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

    /// Two 4-cliques joined by a 3-edge path through n8, n9
    fn dumbbell() -> Graph<String> {
        let mut edges = Vec::new();
        for base in [0, 4] {
            for i in 0..4 {
                for j in (i + 1)..4 {
                    edges.push((base + i, base + j));
                }
            }
        }
        edges.extend([(3, 8), (8, 9), (9, 4)]);
        undirected(10, &edges)
    }

    #[test]
    fn test_hop_distances() {
        let neighbors = vec![vec![1], vec![0, 2], vec![1], vec![]];
        let d = hop_distances(&neighbors);
        assert_eq!(d[0][2], 2.0);
        assert_eq!(d[2][0], 2.0);
        assert!(d[0][3].is_infinite());
    }

    #[test]
    fn test_exact_cluster_count_for_every_linkage() {
        let graph = dumbbell();
        for linkage in [Linkage::Single, Linkage::Complete, Linkage::Average] {
            for k in 1..=9 {
                let config = HierarchicalConfig::default()
                    .with_num_clusters(k)
                    .with_linkage(linkage);
                let result = hierarchical(&graph, &config).unwrap();
                assert_eq!(result.num_communities, k, "{linkage:?} k={k}");
                assert!(is_partition_of(&graph, &result.communities));
            }
        }
    }

    #[test]
    fn test_average_linkage_splits_dumbbell() {
        let graph = dumbbell();
        let result = hierarchical(&graph, &HierarchicalConfig::default()).unwrap();

        assert_eq!(result.num_communities, 2);
        assert_eq!(result.get_community("n0"), result.get_community("n3"));
        assert_eq!(result.get_community("n4"), result.get_community("n7"));
        assert_ne!(result.get_community("n0"), result.get_community("n7"));
    }

    #[test]
    fn test_components_not_merged() {
        let graph = undirected(6, &[(0, 1), (1, 2), (3, 4), (4, 5)]);
        for linkage in [Linkage::Single, Linkage::Complete, Linkage::Average] {
            let config = HierarchicalConfig::default().with_linkage(linkage);
            let result = hierarchical(&graph, &config).unwrap();
            assert_eq!(result.num_communities, 2);
            assert_ne!(result.get_community("n0"), result.get_community("n5"));
        }
    }

    #[test]
    fn test_cluster_count_clamped() {
        let graph = undirected(3, &[(0, 1), (1, 2)]);
        let config = HierarchicalConfig::default().with_num_clusters(50);
        let result = hierarchical(&graph, &config).unwrap();
        assert_eq!(result.num_communities, 2);
    }

    #[test]
    fn test_nn_chain_single_linkage_heights() {
        // Path 0-1-2-3: single linkage merges everything at distance 1
        let neighbors = vec![vec![1], vec![0, 2], vec![1, 3], vec![2]];
        let merges = nn_chain(hop_distances(&neighbors), Linkage::Single);

        assert_eq!(merges.len(), 3);
        assert!(merges.iter().all(|m| (m.distance - 1.0).abs() < 1e-12));
    }

    #[test]
    fn test_zero_clusters_rejected() {
        let graph = dumbbell();
        let config = HierarchicalConfig::default().with_num_clusters(0);
        assert!(hierarchical(&graph, &config).is_err());
    }
}
