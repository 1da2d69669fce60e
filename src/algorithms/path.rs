//! Path and traversal result types shared by the path engine and the rankers

use crate::storage::{Graph, Identified};

/// Walk through the graph
///
/// `edges.len() == nodes.len() - 1`; a single-node path has no edges.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Path {
    /// Node ids in walk order
    pub nodes: Vec<String>,
    /// Edge ids between consecutive nodes
    pub edges: Vec<String>,
    /// Sum of edge weights (unweighted edges count `1.0`)
    pub total_weight: f64,
}

impl Path {
    /// Zero-length path consisting of one node
    #[must_use]
    pub fn single(node: impl Into<String>) -> Self {
        Self {
            nodes: vec![node.into()],
            edges: Vec::new(),
            total_weight: 0.0,
        }
    }

    /// Number of edges walked
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// First node, if any
    #[must_use]
    pub fn source(&self) -> Option<&str> {
        self.nodes.first().map(String::as_str)
    }

    /// Last node, if any
    #[must_use]
    pub fn target(&self) -> Option<&str> {
        self.nodes.last().map(String::as_str)
    }

    /// Materialize a path from `(node slot, edge slot)` steps
    ///
    /// `steps[0]` is the start node with no incoming edge.
    pub(crate) fn from_slots<N: Identified, E>(
        graph: &Graph<N, E>,
        start: usize,
        steps: &[(usize, usize)],
    ) -> Self {
        let mut nodes = Vec::with_capacity(steps.len() + 1);
        let mut edges = Vec::with_capacity(steps.len());
        let mut total_weight = 0.0;

        nodes.push(graph.slot_id(start).to_string());
        for &(node, edge) in steps {
            if let Some(record) = graph.edge_record(edge) {
                edges.push(record.id.clone());
                total_weight += record.weight_or_unit();
            }
            nodes.push(graph.slot_id(node).to_string());
        }

        Self {
            nodes,
            edges,
            total_weight,
        }
    }
}

/// Outcome of a point-to-point search
///
/// "No path" is `found == false` with an empty path and infinite distance,
/// never an error.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PathResult {
    /// Whether the target was reached
    pub found: bool,
    /// The path (empty when not found)
    pub path: Path,
    /// Path length in the search's metric (weight sum or hop count)
    pub distance: f64,
}

impl PathResult {
    pub(crate) fn not_found() -> Self {
        Self {
            found: false,
            path: Path {
                nodes: Vec::new(),
                edges: Vec::new(),
                total_weight: 0.0,
            },
            distance: f64::INFINITY,
        }
    }

    pub(crate) const fn found(path: Path, distance: f64) -> Self {
        Self {
            found: true,
            path,
            distance,
        }
    }
}

/// Visit order of a BFS or DFS
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TraversalResult {
    /// Node ids in the order they were visited, starting with the start node
    pub visit_order: Vec<String>,
}

impl TraversalResult {
    /// Whether `id` was visited
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.visit_order.iter().any(|visited| visited == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_node_path() {
        let path = Path::single("W1");
        assert_eq!(path.edge_count(), 0);
        assert_eq!(path.source(), Some("W1"));
        assert_eq!(path.target(), Some("W1"));
    }

    #[test]
    fn test_from_slots_sums_weights() {
        let mut graph: Graph<String> = Graph::directed();
        for id in ["a", "b", "c"] {
            graph.add_node(id.to_string());
        }
        graph.add_weighted_edge("ab", "a", "b", 2.5, ()).unwrap();
        graph.add_edge("bc", "b", "c", ()).unwrap();

        let a = graph.require_slot("a").unwrap();
        let b = graph.require_slot("b").unwrap();
        let c = graph.require_slot("c").unwrap();
        let path = Path::from_slots(&graph, a, &[(b, 0), (c, 1)]);

        assert_eq!(path.nodes, vec!["a", "b", "c"]);
        assert_eq!(path.edges, vec!["ab", "bc"]);
        assert!((path.total_weight - 3.5).abs() < 1e-12);
    }

    #[test]
    fn test_not_found_shape() {
        let result = PathResult::not_found();
        assert!(!result.found);
        assert!(result.path.nodes.is_empty());
        assert!(result.distance.is_infinite());
    }
}
