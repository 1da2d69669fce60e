//! CSR (Compressed Sparse Row) snapshot of a [`Graph`]
//!
//! Numerical algorithms run on a read-only, densely re-indexed copy of the
//! adjacency so their inner loops touch contiguous arrays instead of hash
//! maps. Live nodes are numbered `0..n` in insertion order.
//!
//! # CSR Format
//!
//! ```text
//! Graph: 0 → 1, 0 → 2, 1 → 2
//!
//! CSR:
//!   row_offsets: [0, 2, 3, 3]  // Node 0: edges [0..2), Node 1: [2..3), Node 2: [3..3)
//!   col_indices: [1, 2, 2]
//!   edge_weights: [1.0, 1.0, 1.0]
//! ```

use super::graph::{Graph, Identified};

/// How edges are laid out in the snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// Keep the graph's own direction (undirected graphs are symmetric anyway)
    AsStored,
    /// Record every edge in both directions
    Symmetric,
}

/// Dense, immutable adjacency snapshot
#[derive(Debug, Clone)]
pub struct CsrSnapshot<'g> {
    ids: Vec<&'g str>,

    /// Forward CSR: node i's edges start at `row_offsets[i]`
    row_offsets: Vec<usize>,
    col_indices: Vec<usize>,
    edge_weights: Vec<f64>,

    /// Reverse CSR (incoming edges)
    rev_row_offsets: Vec<usize>,
    rev_col_indices: Vec<usize>,
    rev_edge_weights: Vec<f64>,

    symmetric: bool,
    num_edges: usize,
}

impl<'g> CsrSnapshot<'g> {
    /// Build a snapshot of `graph`
    ///
    /// Unweighted edges get weight `1.0`. In the symmetric layout a self-loop
    /// appears twice in its own row, so row sums equal weighted degrees.
    #[must_use]
    pub fn from_graph<N: Identified, E>(graph: &'g Graph<N, E>, orientation: Orientation) -> Self {
        let mut dense_of_slot = vec![usize::MAX; graph.slot_capacity()];
        let mut ids = Vec::with_capacity(graph.node_count());
        for slot in graph.node_slots() {
            dense_of_slot[slot] = ids.len();
            ids.push(graph.slot_id(slot));
        }

        let n = ids.len();
        let symmetric = !graph.is_directed() || orientation == Orientation::Symmetric;

        // Temporary adjacency lists for forward and reverse layouts
        let mut adj_list: Vec<Vec<(usize, f64)>> = vec![Vec::new(); n];
        let mut rev_adj_list: Vec<Vec<(usize, f64)>> = vec![Vec::new(); n];
        let mut num_edges = 0;

        for (_, record) in graph.edge_records() {
            let src = dense_of_slot[record.source];
            let dst = dense_of_slot[record.target];
            let weight = record.weight_or_unit();
            num_edges += 1;

            adj_list[src].push((dst, weight));
            rev_adj_list[dst].push((src, weight));
            if symmetric {
                adj_list[dst].push((src, weight));
                rev_adj_list[src].push((dst, weight));
            }
        }

        let (row_offsets, col_indices, edge_weights) = compress(&adj_list);
        let (rev_row_offsets, rev_col_indices, rev_edge_weights) = compress(&rev_adj_list);

        Self {
            ids,
            row_offsets,
            col_indices,
            edge_weights,
            rev_row_offsets,
            rev_col_indices,
            rev_edge_weights,
            symmetric,
            num_edges,
        }
    }

    /// Number of nodes
    #[must_use]
    pub fn num_nodes(&self) -> usize {
        self.ids.len()
    }

    /// Number of graph edges (each counted once, whatever the layout)
    #[must_use]
    pub const fn num_edges(&self) -> usize {
        self.num_edges
    }

    /// Whether every edge is stored in both directions
    #[must_use]
    pub const fn is_symmetric(&self) -> bool {
        self.symmetric
    }

    /// Node id of dense index `i`
    #[must_use]
    pub fn id(&self, i: usize) -> &'g str {
        self.ids[i]
    }

    /// All node ids in dense order
    #[must_use]
    pub fn ids(&self) -> &[&'g str] {
        &self.ids
    }

    /// Outgoing targets and weights of node `i`
    #[must_use]
    pub fn outgoing(&self, i: usize) -> (&[usize], &[f64]) {
        let start = self.row_offsets[i];
        let end = self.row_offsets[i + 1];
        (&self.col_indices[start..end], &self.edge_weights[start..end])
    }

    /// Incoming sources and weights of node `i`
    #[must_use]
    pub fn incoming(&self, i: usize) -> (&[usize], &[f64]) {
        let start = self.rev_row_offsets[i];
        let end = self.rev_row_offsets[i + 1];
        (
            &self.rev_col_indices[start..end],
            &self.rev_edge_weights[start..end],
        )
    }

    /// Sum of outgoing weights of node `i`
    #[must_use]
    pub fn out_strength(&self, i: usize) -> f64 {
        self.outgoing(i).1.iter().sum()
    }

    /// Distinct neighbours of `i` over outgoing entries, self-loops dropped
    #[must_use]
    pub fn distinct_neighbors(&self, i: usize) -> Vec<usize> {
        let mut neighbors: Vec<usize> = self
            .outgoing(i)
            .0
            .iter()
            .copied()
            .filter(|&j| j != i)
            .collect();
        neighbors.sort_unstable();
        neighbors.dedup();
        neighbors
    }

    /// Forward rows with parallel entries merged and self-loops split out
    ///
    /// Returns `(neighbours, loop_weight)` where `neighbours[i]` is sorted by
    /// neighbour index and `loop_weight[i]` is the sum of row `i`'s self-loop
    /// entries (twice the loop weight in a symmetric layout).
    pub(crate) fn merged_rows(&self) -> (Vec<Vec<(usize, f64)>>, Vec<f64>) {
        let n = self.num_nodes();
        let mut rows = Vec::with_capacity(n);
        let mut loops = vec![0.0; n];

        for (i, loop_weight) in loops.iter_mut().enumerate() {
            let (targets, weights) = self.outgoing(i);
            let mut row: Vec<(usize, f64)> = Vec::with_capacity(targets.len());
            for (&j, &w) in targets.iter().zip(weights) {
                if j == i {
                    *loop_weight += w;
                } else {
                    row.push((j, w));
                }
            }
            row.sort_unstable_by_key(|&(j, _)| j);
            row.dedup_by(|next, kept| {
                if next.0 == kept.0 {
                    kept.1 += next.1;
                    true
                } else {
                    false
                }
            });
            rows.push(row);
        }

        (rows, loops)
    }

    /// Weakly connected component label per node (labels in first-seen order)
    #[must_use]
    pub fn connected_components(&self) -> Vec<usize> {
        let n = self.num_nodes();
        let mut component = vec![usize::MAX; n];
        let mut next = 0;
        let mut stack = Vec::new();

        for start in 0..n {
            if component[start] != usize::MAX {
                continue;
            }
            component[start] = next;
            stack.push(start);

            // DFS treating graph as undirected (follows both CSR layouts)
            while let Some(node) = stack.pop() {
                let forward = self.outgoing(node).0.iter();
                let backward = self.incoming(node).0.iter();
                for &neighbor in forward.chain(backward) {
                    if component[neighbor] == usize::MAX {
                        component[neighbor] = next;
                        stack.push(neighbor);
                    }
                }
            }
            next += 1;
        }

        component
    }
}

/// Flatten per-node adjacency lists into `(row_offsets, col_indices, weights)`
fn compress(adj_list: &[Vec<(usize, f64)>]) -> (Vec<usize>, Vec<usize>, Vec<f64>) {
    let mut row_offsets = Vec::with_capacity(adj_list.len() + 1);
    let total: usize = adj_list.iter().map(Vec::len).sum();
    let mut col_indices = Vec::with_capacity(total);
    let mut edge_weights = Vec::with_capacity(total);

    let mut offset = 0;
    row_offsets.push(offset);
    for neighbors in adj_list {
        offset += neighbors.len();
        row_offsets.push(offset);
        for &(target, weight) in neighbors {
            col_indices.push(target);
            edge_weights.push(weight);
        }
    }

    (row_offsets, col_indices, edge_weights)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle_plus_tail(directed: bool) -> Graph<String> {
        let mut graph = Graph::new(directed);
        for id in ["a", "b", "c", "d"] {
            graph.add_node(id.to_string());
        }
        graph.add_edge("ab", "a", "b", ()).unwrap();
        graph.add_edge("bc", "b", "c", ()).unwrap();
        graph.add_weighted_edge("ca", "c", "a", 2.0, ()).unwrap();
        graph
    }

    #[test]
    fn test_forward_and_reverse_layout() {
        let graph = triangle_plus_tail(true);
        let csr = CsrSnapshot::from_graph(&graph, Orientation::AsStored);

        assert_eq!(csr.num_nodes(), 4);
        assert_eq!(csr.num_edges(), 3);
        assert!(!csr.is_symmetric());
        assert_eq!(csr.row_offsets, vec![0, 1, 2, 3, 3]);
        assert_eq!(csr.outgoing(2), (&[0][..], &[2.0][..]));
        assert_eq!(csr.incoming(0), (&[2][..], &[2.0][..]));
    }

    #[test]
    fn test_symmetric_layout_doubles_entries() {
        let graph = triangle_plus_tail(true);
        let csr = CsrSnapshot::from_graph(&graph, Orientation::Symmetric);

        assert!(csr.is_symmetric());
        assert_eq!(csr.num_edges(), 3);
        assert_eq!(csr.outgoing(0).0.len(), 2);
        assert!((csr.out_strength(0) - 3.0).abs() < 1e-12);
        assert_eq!(csr.distinct_neighbors(0), vec![1, 2]);
    }

    #[test]
    fn test_self_loop_counts_twice_in_symmetric_row() {
        let mut graph: Graph<String> = Graph::undirected();
        graph.add_node("x".to_string());
        graph.add_edge("xx", "x", "x", ()).unwrap();
        let csr = CsrSnapshot::from_graph(&graph, Orientation::AsStored);

        assert!((csr.out_strength(0) - 2.0).abs() < 1e-12);
        assert!(csr.distinct_neighbors(0).is_empty());
    }

    #[test]
    fn test_dense_ids_skip_removed_nodes() {
        let mut graph = triangle_plus_tail(true);
        graph.remove_node("b").unwrap();
        let csr = CsrSnapshot::from_graph(&graph, Orientation::AsStored);

        assert_eq!(csr.ids(), &["a", "c", "d"]);
        assert_eq!(csr.num_edges(), 1);
    }

    #[test]
    fn test_merged_rows_sum_parallel_edges() {
        let mut graph = triangle_plus_tail(false);
        graph.add_weighted_edge("ab2", "a", "b", 0.5, ()).unwrap();
        graph.add_edge("dd", "d", "d", ()).unwrap();
        let csr = CsrSnapshot::from_graph(&graph, Orientation::AsStored);
        let (rows, loops) = csr.merged_rows();

        assert_eq!(rows[0], vec![(1, 1.5), (2, 2.0)]);
        assert!(rows[3].is_empty());
        assert!((loops[3] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_connected_components() {
        let graph = triangle_plus_tail(true);
        let csr = CsrSnapshot::from_graph(&graph, Orientation::AsStored);

        assert_eq!(csr.connected_components(), vec![0, 0, 0, 1]);
    }
}
