//! Undirected weighted network used by modularity-based clustering
//!
//! Built from a symmetric [`CsrSnapshot`]: parallel edges are merged and
//! self-loops are kept apart, so aggregation into super-nodes is a plain
//! re-bucketing of weights. A self-loop of weight `w` adds `2w` to its node's
//! strength (the `A_ii = 2w` convention).

use crate::error::{AnalysisError, Result};
use crate::ranking::rng::SeededRandom;
use crate::storage::CsrSnapshot;
use rand::seq::SliceRandom;
use std::collections::{HashMap, VecDeque};

#[derive(Debug, Clone)]
pub(crate) struct Network {
    /// Neighbour weights per node, no self-loops, sorted by neighbour
    pub(crate) adj: Vec<Vec<(usize, f64)>>,
    /// Self-loop weight per node
    pub(crate) loops: Vec<f64>,
    /// Weighted degree `k_i`
    pub(crate) strength: Vec<f64>,
    /// Total edge weight `m` (`Σ k_i = 2m`)
    pub(crate) total_weight: f64,
}

impl Network {
    pub(crate) fn from_csr(csr: &CsrSnapshot<'_>) -> Result<Self> {
        let (adj, loop_entries) = csr.merged_rows();

        if adj.iter().flatten().any(|&(_, w)| w < 0.0) || loop_entries.iter().any(|&w| w < 0.0) {
            return Err(AnalysisError::invalid(
                "weight",
                "modularity-based clustering needs non-negative edge weights",
            ));
        }

        // Symmetric rows list each self-loop twice
        let loops: Vec<f64> = if csr.is_symmetric() {
            loop_entries.iter().map(|w| w / 2.0).collect()
        } else {
            loop_entries
        };

        Ok(Self::assemble(adj, loops))
    }

    fn assemble(adj: Vec<Vec<(usize, f64)>>, loops: Vec<f64>) -> Self {
        let strength: Vec<f64> = adj
            .iter()
            .zip(&loops)
            .map(|(row, &l)| row.iter().map(|&(_, w)| w).sum::<f64>() + 2.0 * l)
            .collect();
        let total_weight = strength.iter().sum::<f64>() / 2.0;

        Self {
            adj,
            loops,
            strength,
            total_weight,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.adj.len()
    }

    /// Whether any edge joins two distinct nodes
    pub(crate) fn has_links(&self) -> bool {
        self.adj.iter().any(|row| !row.is_empty())
    }

    /// Collapse each community into one super-node
    pub(crate) fn aggregate(&self, community: &[usize], count: usize) -> Self {
        let mut buckets: Vec<HashMap<usize, f64>> = vec![HashMap::new(); count];
        let mut loops = vec![0.0; count];

        for (node, row) in self.adj.iter().enumerate() {
            let c = community[node];
            loops[c] += self.loops[node];
            for &(neighbor, w) in row {
                let d = community[neighbor];
                if c == d {
                    // Each internal pair is seen from both ends
                    loops[c] += w / 2.0;
                } else {
                    *buckets[c].entry(d).or_insert(0.0) += w;
                }
            }
        }

        let adj = buckets
            .into_iter()
            .map(|bucket| {
                let mut row: Vec<(usize, f64)> = bucket.into_iter().collect();
                row.sort_unstable_by_key(|&(d, _)| d);
                row
            })
            .collect();

        Self::assemble(adj, loops)
    }

    /// Newman–Girvan modularity with resolution `γ`
    ///
    /// ```text
    /// Q = Σ_c [ L_c / m − γ (K_c / 2m)² ]
    /// ```
    pub(crate) fn modularity_of(&self, community: &[usize], resolution: f64) -> f64 {
        if self.total_weight <= 0.0 {
            return 0.0;
        }
        let count = community.iter().copied().max().map_or(0, |c| c + 1);
        let mut internal = vec![0.0; count];
        let mut total = vec![0.0; count];

        for (node, row) in self.adj.iter().enumerate() {
            let c = community[node];
            total[c] += self.strength[node];
            internal[c] += self.loops[node];
            for &(neighbor, w) in row {
                if community[neighbor] == c {
                    internal[c] += w / 2.0;
                }
            }
        }

        let m = self.total_weight;
        internal
            .iter()
            .zip(&total)
            .map(|(l, k)| l / m - resolution * (k / (2.0 * m)).powi(2))
            .sum()
    }

    /// Split every community into its connected pieces
    ///
    /// Returns compact labels in first-seen order and their count.
    pub(crate) fn split_disconnected(&self, community: &[usize]) -> (Vec<usize>, usize) {
        let n = self.len();
        let mut label = vec![usize::MAX; n];
        let mut next = 0;
        let mut queue = VecDeque::new();

        for start in 0..n {
            if label[start] != usize::MAX {
                continue;
            }
            label[start] = next;
            queue.push_back(start);
            while let Some(node) = queue.pop_front() {
                for &(neighbor, _) in &self.adj[node] {
                    if label[neighbor] == usize::MAX && community[neighbor] == community[start] {
                        label[neighbor] = next;
                        queue.push_back(neighbor);
                    }
                }
            }
            next += 1;
        }

        (label, next)
    }
}

/// Per-community weight accumulator with a touched list
///
/// Reset cost is proportional to the number of touched communities.
#[derive(Debug)]
pub(crate) struct CommunityWeights {
    weight: Vec<f64>,
    seen: Vec<bool>,
    touched: Vec<usize>,
}

impl CommunityWeights {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            weight: vec![0.0; capacity],
            seen: vec![false; capacity],
            touched: Vec::new(),
        }
    }

    pub(crate) fn add(&mut self, community: usize, w: f64) {
        if !self.seen[community] {
            self.seen[community] = true;
            self.touched.push(community);
        }
        self.weight[community] += w;
    }

    pub(crate) fn get(&self, community: usize) -> f64 {
        self.weight[community]
    }

    pub(crate) fn touched(&self) -> &[usize] {
        &self.touched
    }

    pub(crate) fn clear(&mut self) {
        for &c in &self.touched {
            self.weight[c] = 0.0;
            self.seen[c] = false;
        }
        self.touched.clear();
    }
}

/// Node visiting order: index order, or a seeded shuffle of it
pub(crate) fn visit_order(n: usize, rng: Option<&mut SeededRandom>) -> Vec<usize> {
    let mut order: Vec<usize> = (0..n).collect();
    if let Some(rng) = rng {
        order.shuffle(rng);
    }
    order
}

/// Compact labels to `0..count` in order of first appearance
pub(crate) fn renumber(labels: &[usize]) -> (Vec<usize>, usize) {
    let mut mapping: HashMap<usize, usize> = HashMap::new();
    let compact = labels
        .iter()
        .map(|&label| {
            let next = mapping.len();
            *mapping.entry(label).or_insert(next)
        })
        .collect();
    (compact, mapping.len())
}

/// Group dense node indices by compact label, members in index order
pub(crate) fn group_ids(ids: &[&str], labels: &[usize], count: usize) -> Vec<Vec<String>> {
    let mut groups = vec![Vec::new(); count];
    for (node, &label) in labels.iter().enumerate() {
        groups[label].push(ids[node].to_string());
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{Graph, Orientation};

    fn two_triangles() -> Graph<String> {
        let mut graph = Graph::undirected();
        for i in 0..6 {
            graph.add_node(format!("n{i}"));
        }
        let edges = [(0, 1), (1, 2), (2, 0), (3, 4), (4, 5), (5, 3), (2, 3)];
        for (k, (s, t)) in edges.iter().enumerate() {
            graph
                .add_edge(format!("e{k}"), &format!("n{s}"), &format!("n{t}"), ())
                .unwrap();
        }
        graph
    }

    #[test]
    fn test_strength_and_total_weight() {
        let graph = two_triangles();
        let csr = CsrSnapshot::from_graph(&graph, Orientation::Symmetric);
        let net = Network::from_csr(&csr).unwrap();

        assert!((net.total_weight - 7.0).abs() < 1e-12);
        assert!((net.strength[2] - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_modularity_two_triangles() {
        let graph = two_triangles();
        let csr = CsrSnapshot::from_graph(&graph, Orientation::Symmetric);
        let net = Network::from_csr(&csr).unwrap();

        // Q = 2 * (3/7 - (7/14)^2) = 6/7 - 1/2
        let q = net.modularity_of(&[0, 0, 0, 1, 1, 1], 1.0);
        assert!((q - (6.0 / 7.0 - 0.5)).abs() < 1e-12);

        // Everything together scores zero
        assert!(net.modularity_of(&[0; 6], 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_aggregate_preserves_modularity() {
        let graph = two_triangles();
        let csr = CsrSnapshot::from_graph(&graph, Orientation::Symmetric);
        let net = Network::from_csr(&csr).unwrap();
        let community = [0, 0, 0, 1, 1, 1];

        let coarse = net.aggregate(&community, 2);
        assert_eq!(coarse.len(), 2);
        assert!((coarse.total_weight - net.total_weight).abs() < 1e-12);
        assert!((coarse.loops[0] - 3.0).abs() < 1e-12);
        assert_eq!(coarse.adj[0], vec![(1, 1.0)]);

        let q_fine = net.modularity_of(&community, 1.0);
        let q_coarse = coarse.modularity_of(&[0, 1], 1.0);
        assert!((q_fine - q_coarse).abs() < 1e-12);
    }

    #[test]
    fn test_split_disconnected() {
        let graph = two_triangles();
        let csr = CsrSnapshot::from_graph(&graph, Orientation::Symmetric);
        let net = Network::from_csr(&csr).unwrap();

        // {0, 4} is not connected internally
        let (labels, count) = net.split_disconnected(&[0, 1, 1, 2, 0, 2]);
        assert_eq!(count, 4);
        assert_ne!(labels[0], labels[4]);
        assert_eq!(labels[1], labels[2]);
    }

    #[test]
    fn test_has_links_ignores_self_loops() {
        let mut graph: Graph<String> = Graph::undirected();
        graph.add_node("a".to_string());
        graph.add_edge("aa", "a", "a", ()).unwrap();
        let csr = CsrSnapshot::from_graph(&graph, Orientation::Symmetric);
        let net = Network::from_csr(&csr).unwrap();

        assert!(!net.has_links());
        assert!((net.loops[0] - 1.0).abs() < 1e-12);
        assert!((net.strength[0] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_visit_order_is_a_permutation() {
        let mut order = visit_order(10, Some(&mut SeededRandom::new(3)));
        order.sort_unstable();
        assert_eq!(order, (0..10).collect::<Vec<_>>());
        assert_eq!(visit_order(3, None), vec![0, 1, 2]);
    }

    #[test]
    fn test_renumber_first_seen() {
        let (labels, count) = renumber(&[7, 3, 7, 9]);
        assert_eq!(labels, vec![0, 1, 0, 2]);
        assert_eq!(count, 3);
    }
}
