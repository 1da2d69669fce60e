//! Graph traversal algorithms (BFS, DFS)
//!
//! Neighbours are visited in adjacency insertion order, so both traversals
//! are deterministic for a given graph.

use super::path::TraversalResult;
use crate::error::Result;
use crate::storage::{Direction, Graph, Identified};
use std::collections::VecDeque;
use tracing::instrument;

/// Direction followed by a traversal with the `directed` flag
const fn traversal_direction(directed: bool) -> Direction {
    if directed {
        Direction::Outgoing
    } else {
        Direction::Both
    }
}

/// Breadth-First Search from a start node
///
/// # Arguments
///
/// * `graph` - Graph to traverse
/// * `start` - Id of the starting node
/// * `directed` - `true` follows outgoing edges only, `false` ignores direction
///
/// # Returns
///
/// Visit order starting with `start`
///
/// # Errors
///
/// `NodeNotFound` if `start` is absent.
///
/// # Example
///
/// ```
/// use bibgraph_core::{bfs, Graph};
///
/// let mut graph: Graph<String> = Graph::directed();
/// for id in ["A", "B", "C"] {
///     graph.add_node(id.to_string());
/// }
/// graph.add_edge("AB", "A", "B", ()).unwrap();
/// graph.add_edge("BC", "B", "C", ()).unwrap();
///
/// assert_eq!(bfs(&graph, "A", true).unwrap().visit_order, vec!["A", "B", "C"]);
/// assert_eq!(bfs(&graph, "C", true).unwrap().visit_order, vec!["C"]);
/// assert_eq!(bfs(&graph, "C", false).unwrap().visit_order.len(), 3);
/// ```
#[instrument(skip_all, fields(start = start, directed = directed))]
pub fn bfs<N: Identified, E>(
    graph: &Graph<N, E>,
    start: &str,
    directed: bool,
) -> Result<TraversalResult> {
    let source = graph.require_slot(start)?;
    let direction = traversal_direction(directed);

    let mut visited = vec![false; graph.slot_capacity()];
    let mut queue = VecDeque::new();
    let mut visit_order = Vec::new();

    queue.push_back(source);
    visited[source] = true;

    while let Some(current) = queue.pop_front() {
        visit_order.push(graph.slot_id(current).to_string());

        for (_, neighbor) in graph.adjacent(current, direction) {
            if !visited[neighbor] {
                visited[neighbor] = true;
                queue.push_back(neighbor);
            }
        }
    }

    Ok(TraversalResult { visit_order })
}

/// Depth-First Search from a start node
///
/// Iterative pre-order DFS; the first-inserted neighbour is explored first.
///
/// # Errors
///
/// `NodeNotFound` if `start` is absent.
#[instrument(skip_all, fields(start = start, directed = directed))]
pub fn dfs<N: Identified, E>(
    graph: &Graph<N, E>,
    start: &str,
    directed: bool,
) -> Result<TraversalResult> {
    let source = graph.require_slot(start)?;
    let direction = traversal_direction(directed);

    let mut visited = vec![false; graph.slot_capacity()];
    let mut stack = vec![source];
    let mut visit_order = Vec::new();

    while let Some(current) = stack.pop() {
        if visited[current] {
            continue;
        }
        visited[current] = true;
        visit_order.push(graph.slot_id(current).to_string());

        // Push in reverse so the first neighbour is popped first
        let neighbors: Vec<usize> = graph.adjacent(current, direction).map(|(_, n)| n).collect();
        for &neighbor in neighbors.iter().rev() {
            if !visited[neighbor] {
                stack.push(neighbor);
            }
        }
    }

    Ok(TraversalResult { visit_order })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnalysisError;

    //   A → B → D
    //   ↓       ↑
    //   C ------┘     E → A
    fn sample(directed: bool) -> Graph<String> {
        let mut graph = Graph::new(directed);
        for id in ["A", "B", "C", "D", "E"] {
            graph.add_node(id.to_string());
        }
        graph.add_edge("AB", "A", "B", ()).unwrap();
        graph.add_edge("AC", "A", "C", ()).unwrap();
        graph.add_edge("BD", "B", "D", ()).unwrap();
        graph.add_edge("CD", "C", "D", ()).unwrap();
        graph.add_edge("EA", "E", "A", ()).unwrap();
        graph
    }

    #[test]
    fn test_bfs_level_order() {
        let graph = sample(true);
        let result = bfs(&graph, "A", true).unwrap();
        assert_eq!(result.visit_order, vec!["A", "B", "C", "D"]);
        assert!(!result.contains("E"));
    }

    #[test]
    fn test_bfs_ignoring_direction_reaches_predecessors() {
        let graph = sample(true);
        let result = bfs(&graph, "A", false).unwrap();
        assert_eq!(result.visit_order, vec!["A", "B", "C", "E", "D"]);
    }

    #[test]
    fn test_dfs_preorder() {
        let graph = sample(true);
        let result = dfs(&graph, "A", true).unwrap();
        assert_eq!(result.visit_order, vec!["A", "B", "D", "C"]);
    }

    #[test]
    fn test_dfs_undirected_graph() {
        let graph = sample(false);
        let result = dfs(&graph, "D", true).unwrap();
        assert_eq!(result.visit_order, vec!["D", "B", "A", "C", "E"]);
    }

    #[test]
    fn test_traversal_from_sink() {
        let graph = sample(true);
        assert_eq!(bfs(&graph, "D", true).unwrap().visit_order, vec!["D"]);
        assert_eq!(dfs(&graph, "D", true).unwrap().visit_order, vec!["D"]);
    }

    #[test]
    fn test_missing_start_is_error() {
        let graph = sample(true);
        assert_eq!(
            bfs(&graph, "Z", true),
            Err(AnalysisError::NodeNotFound("Z".to_string()))
        );
        assert!(dfs(&graph, "Z", false).is_err());
    }
}
