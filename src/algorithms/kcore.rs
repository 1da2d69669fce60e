//! K-core decomposition
//!
//! A k-core is a maximal subgraph where every node has degree at least k.
//! Degrees count distinct neighbours with edge direction ignored; self-loops
//! and parallel edges do not add degree.

use crate::error::Result;
use crate::storage::{CsrSnapshot, Graph, Identified, Orientation};
use std::collections::{HashMap, VecDeque};
use tracing::{debug, instrument};

/// Core number of every node
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CoreDecomposition {
    /// Node ids in insertion order
    pub nodes: Vec<String>,
    /// Core number for each node id
    pub core_numbers: HashMap<String, usize>,
    /// The degeneracy (maximum core number) of the graph
    pub degeneracy: usize,
}

impl CoreDecomposition {
    /// Core number of a node
    #[must_use]
    pub fn core_of(&self, id: &str) -> Option<usize> {
        self.core_numbers.get(id).copied()
    }

    /// Members of the k-core in insertion order
    #[must_use]
    pub fn get_kcore(&self, k: usize) -> Vec<String> {
        self.nodes
            .iter()
            .filter(|id| self.core_of(id).is_some_and(|core| core >= k))
            .cloned()
            .collect()
    }

    /// Nodes whose core number is exactly `k`
    #[must_use]
    pub fn shell(&self, k: usize) -> Vec<String> {
        self.nodes
            .iter()
            .filter(|id| self.core_of(id) == Some(k))
            .cloned()
            .collect()
    }
}

fn neighbor_lists<N: Identified, E>(graph: &Graph<N, E>) -> (CsrSnapshot<'_>, Vec<Vec<usize>>) {
    let csr = CsrSnapshot::from_graph(graph, Orientation::Symmetric);
    let neighbors = (0..csr.num_nodes())
        .map(|i| csr.distinct_neighbors(i))
        .collect();
    (csr, neighbors)
}

/// Compute the k-core by iterative peeling
///
/// Nodes with degree below `k` are removed and their neighbours' degrees
/// recomputed until none remain. An empty result is valid.
///
/// # Errors
///
/// Infallible today; returns `Result` for parity with the other analyses.
///
/// # Example
///
/// ```
/// use bibgraph_core::{k_core, Graph};
///
/// let mut graph: Graph<String> = Graph::undirected();
/// for id in ["a", "b", "c", "d"] {
///     graph.add_node(id.to_string());
/// }
/// graph.add_edge("ab", "a", "b", ()).unwrap();
/// graph.add_edge("bc", "b", "c", ()).unwrap();
/// graph.add_edge("ca", "c", "a", ()).unwrap();
/// graph.add_edge("cd", "c", "d", ()).unwrap(); // pendant
///
/// assert_eq!(k_core(&graph, 2).unwrap(), vec!["a", "b", "c"]);
/// assert!(k_core(&graph, 3).unwrap().is_empty());
/// ```
#[instrument(skip_all, fields(nodes = graph.node_count(), k = k))]
pub fn k_core<N: Identified, E>(graph: &Graph<N, E>, k: usize) -> Result<Vec<String>> {
    let (csr, neighbors) = neighbor_lists(graph);
    let n = csr.num_nodes();

    let mut degree: Vec<usize> = neighbors.iter().map(Vec::len).collect();
    let mut removed = vec![false; n];
    let mut queued = vec![false; n];
    let mut queue = VecDeque::new();

    for node in 0..n {
        if degree[node] < k {
            queued[node] = true;
            queue.push_back(node);
        }
    }

    while let Some(node) = queue.pop_front() {
        removed[node] = true;
        for &neighbor in &neighbors[node] {
            if removed[neighbor] {
                continue;
            }
            degree[neighbor] = degree[neighbor].saturating_sub(1);
            if degree[neighbor] < k && !queued[neighbor] {
                queued[neighbor] = true;
                queue.push_back(neighbor);
            }
        }
    }

    let core: Vec<String> = (0..n)
        .filter(|&node| !removed[node])
        .map(|node| csr.id(node).to_string())
        .collect();

    debug!(size = core.len(), "k-core peeled");
    Ok(core)
}

/// Compute the core number of every node (bucket peeling)
///
/// Time complexity: O(V + E)
///
/// # Errors
///
/// Infallible today; returns `Result` for parity with the other analyses.
#[instrument(skip_all, fields(nodes = graph.node_count()))]
pub fn core_numbers<N: Identified, E>(graph: &Graph<N, E>) -> Result<CoreDecomposition> {
    let (csr, neighbors) = neighbor_lists(graph);
    let n = csr.num_nodes();

    let mut degree: Vec<usize> = neighbors.iter().map(Vec::len).collect();
    let max_degree = degree.iter().copied().max().unwrap_or(0);

    // Bucket sort nodes by degree
    let mut bin = vec![0_usize; max_degree + 1];
    for &d in &degree {
        bin[d] += 1;
    }
    let mut start = 0;
    for slot in &mut bin {
        let count = *slot;
        *slot = start;
        start += count;
    }

    let mut position = vec![0_usize; n];
    let mut vertex = vec![0_usize; n];
    for node in 0..n {
        position[node] = bin[degree[node]];
        vertex[position[node]] = node;
        bin[degree[node]] += 1;
    }
    for d in (1..=max_degree).rev() {
        bin[d] = bin[d - 1];
    }
    bin[0] = 0;

    // Peel in degree order, moving each touched neighbour down one bucket
    for i in 0..n {
        let node = vertex[i];
        for &u in &neighbors[node] {
            if degree[u] > degree[node] {
                let du = degree[u];
                let pu = position[u];
                let pw = bin[du];
                let w = vertex[pw];
                if u != w {
                    position[u] = pw;
                    vertex[pu] = w;
                    position[w] = pu;
                    vertex[pw] = u;
                }
                bin[du] += 1;
                degree[u] -= 1;
            }
        }
    }

    let nodes: Vec<String> = csr.ids().iter().map(|id| (*id).to_string()).collect();
    let core_numbers = nodes.iter().cloned().zip(degree.iter().copied()).collect();
    let degeneracy = degree.iter().copied().max().unwrap_or(0);

    Ok(CoreDecomposition {
        nodes,
        core_numbers,
        degeneracy,
    })
}
