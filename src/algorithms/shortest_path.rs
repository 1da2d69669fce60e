//! Shortest path algorithms: Dijkstra, BFS and bidirectional search
//!
//! Provides shortest path computation between graph nodes:
//! - `dijkstra`: Single-source shortest distances with non-negative weights
//! - `shortest_path`: Dijkstra when any edge carries a weight, BFS otherwise
//! - `bidirectional_search`: Hop-minimal path from two meeting frontiers
//!
//! Edges are followed in the graph's own direction (both ways when undirected).
//!
//! # Example
//!
//! ```
//! use bibgraph_core::{shortest_path, Graph};
//!
//! let mut graph: Graph<String> = Graph::directed();
//! for id in ["A", "B", "C"] {
//!     graph.add_node(id.to_string());
//! }
//! graph.add_weighted_edge("AB", "A", "B", 1.0, ()).unwrap();
//! graph.add_weighted_edge("BC", "B", "C", 2.0, ()).unwrap();
//! graph.add_weighted_edge("AC", "A", "C", 5.0, ()).unwrap();
//!
//! let result = shortest_path(&graph, "A", "C").unwrap();
//! assert!(result.found);
//! assert_eq!(result.path.nodes, vec!["A", "B", "C"]); // 3.0, not 5.0
//! assert_eq!(result.distance, 3.0);
//! ```

use super::path::{Path, PathResult};
use crate::error::Result;
use crate::storage::{Direction, Graph, Identified};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, VecDeque};
use tracing::{debug, instrument};

/// State for Dijkstra's priority queue
#[derive(Clone, Copy)]
struct State {
    cost: f64,
    node: usize,
}

impl PartialEq for State {
    fn eq(&self, other: &Self) -> bool {
        self.cost == other.cost && self.node == other.node
    }
}

impl Eq for State {}

impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap (BinaryHeap is max-heap by default)
        other
            .cost
            .partial_cmp(&self.cost)
            .unwrap_or(Ordering::Equal)
            .then_with(|| other.node.cmp(&self.node))
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Predecessor link: `(previous node slot, edge slot)`
type Link = Option<(usize, usize)>;

/// Walk predecessor links back from `target`, returning forward steps
fn unwind(links: &[Link], target: usize) -> (usize, Vec<(usize, usize)>) {
    let mut steps = Vec::new();
    let mut current = target;
    while let Some((previous, edge)) = links[current] {
        steps.push((current, edge));
        current = previous;
    }
    steps.reverse();
    (current, steps)
}

/// Dijkstra over slots; stops early once `target` is settled
fn dijkstra_slots<N: Identified, E>(
    graph: &Graph<N, E>,
    source: usize,
    target: Option<usize>,
) -> (Vec<f64>, Vec<Link>) {
    let mut distances = vec![f64::INFINITY; graph.slot_capacity()];
    let mut links: Vec<Link> = vec![None; graph.slot_capacity()];
    let mut heap = BinaryHeap::new();

    distances[source] = 0.0;
    heap.push(State {
        cost: 0.0,
        node: source,
    });

    while let Some(State { cost, node }) = heap.pop() {
        // Skip if we've found a better path
        if cost > distances[node] {
            continue;
        }
        if Some(node) == target {
            break;
        }

        for (edge, neighbor) in graph.adjacent(node, Direction::Outgoing) {
            let weight = graph.edge_record(edge).map_or(1.0, |r| r.weight_or_unit());
            let next_cost = cost + weight;

            if next_cost < distances[neighbor] {
                distances[neighbor] = next_cost;
                links[neighbor] = Some((node, edge));
                heap.push(State {
                    cost: next_cost,
                    node: neighbor,
                });
            }
        }
    }

    (distances, links)
}

/// Hop-count BFS over slots; stops early once `target` is discovered
fn bfs_slots<N: Identified, E>(
    graph: &Graph<N, E>,
    source: usize,
    target: usize,
) -> (Vec<f64>, Vec<Link>) {
    let mut distances = vec![f64::INFINITY; graph.slot_capacity()];
    let mut links: Vec<Link> = vec![None; graph.slot_capacity()];
    let mut queue = VecDeque::new();

    distances[source] = 0.0;
    queue.push_back(source);

    while let Some(current) = queue.pop_front() {
        if current == target {
            break;
        }
        for (edge, neighbor) in graph.adjacent(current, Direction::Outgoing) {
            if distances[neighbor].is_infinite() {
                distances[neighbor] = distances[current] + 1.0;
                links[neighbor] = Some((current, edge));
                queue.push_back(neighbor);
            }
        }
    }

    (distances, links)
}

/// Compute single-source shortest distances using Dijkstra's algorithm
///
/// Unweighted edges count as `1.0`.
///
/// # Returns
///
/// Map from each reachable node id to its distance from `source`.
/// Unreachable nodes are not included in the map.
///
/// # Complexity
///
/// O((V + E) log V) using a binary heap
///
/// # Errors
///
/// `NodeNotFound` for a missing source, `InvalidParameter` if any edge has a
/// negative weight.
#[instrument(skip_all, fields(source = source))]
pub fn dijkstra<N: Identified, E>(graph: &Graph<N, E>, source: &str) -> Result<HashMap<String, f64>> {
    let source = graph.require_slot(source)?;
    graph.ensure_non_negative_weights()?;

    let (distances, _) = dijkstra_slots(graph, source, None);

    Ok(graph
        .node_slots()
        .filter(|&slot| distances[slot].is_finite())
        .map(|slot| (graph.slot_id(slot).to_string(), distances[slot]))
        .collect())
}

/// Find the shortest path between two nodes
///
/// Uses Dijkstra when any edge carries an explicit weight and plain BFS
/// (hop count) otherwise. `distance` is the weight sum or the hop count
/// respectively.
///
/// # Errors
///
/// `NodeNotFound` for a missing endpoint, `InvalidParameter` for a negative
/// edge weight. An unreachable target is `found == false`, not an error.
#[instrument(skip_all, fields(source = source, target = target))]
pub fn shortest_path<N: Identified, E>(
    graph: &Graph<N, E>,
    source: &str,
    target: &str,
) -> Result<PathResult> {
    let source_slot = graph.require_slot(source)?;
    let target_slot = graph.require_slot(target)?;

    let (distances, links) = if graph.has_weighted_edges() {
        graph.ensure_non_negative_weights()?;
        dijkstra_slots(graph, source_slot, Some(target_slot))
    } else {
        bfs_slots(graph, source_slot, target_slot)
    };

    let distance = distances[target_slot];
    if distance.is_infinite() {
        debug!("no path");
        return Ok(PathResult::not_found());
    }

    let (start, steps) = unwind(&links, target_slot);
    Ok(PathResult::found(
        Path::from_slots(graph, start, &steps),
        distance,
    ))
}

/// One side of a bidirectional search
struct Frontier {
    direction: Direction,
    depth: Vec<usize>,
    links: Vec<Link>,
    current: Vec<usize>,
    level: usize,
}

impl Frontier {
    fn new(capacity: usize, start: usize, direction: Direction) -> Self {
        let mut depth = vec![usize::MAX; capacity];
        depth[start] = 0;
        Self {
            direction,
            depth,
            links: vec![None; capacity],
            current: vec![start],
            level: 0,
        }
    }

    /// Expand one full level; returns the best meeting node against `other`
    fn expand<N: Identified, E>(&mut self, graph: &Graph<N, E>, other: &Self) -> Option<usize> {
        let mut next = Vec::new();
        let mut best: Option<(usize, usize)> = None;

        for &node in &self.current {
            for (edge, neighbor) in graph.adjacent(node, self.direction) {
                if self.depth[neighbor] != usize::MAX {
                    continue;
                }
                self.depth[neighbor] = self.level + 1;
                self.links[neighbor] = Some((node, edge));
                next.push(neighbor);

                if other.depth[neighbor] != usize::MAX {
                    let total = self.level + 1 + other.depth[neighbor];
                    if best.map_or(true, |(b, _)| total < b) {
                        best = Some((total, neighbor));
                    }
                }
            }
        }

        self.current = next;
        self.level += 1;
        best.map(|(_, meeting)| meeting)
    }
}

/// Hop-minimal path search expanding from both endpoints
///
/// Alternates full-level expansions of a forward frontier (outgoing edges
/// from `source`) and a backward frontier (incoming edges into `target`),
/// always growing the smaller one, until they meet. `distance` is the hop
/// count.
///
/// # Errors
///
/// `NodeNotFound` for a missing endpoint.
#[instrument(skip_all, fields(source = source, target = target))]
pub fn bidirectional_search<N: Identified, E>(
    graph: &Graph<N, E>,
    source: &str,
    target: &str,
) -> Result<PathResult> {
    let source_slot = graph.require_slot(source)?;
    let target_slot = graph.require_slot(target)?;

    if source_slot == target_slot {
        return Ok(PathResult::found(Path::single(source), 0.0));
    }

    let capacity = graph.slot_capacity();
    let mut forward = Frontier::new(capacity, source_slot, Direction::Outgoing);
    let mut backward = Frontier::new(capacity, target_slot, Direction::Incoming);

    while !forward.current.is_empty() && !backward.current.is_empty() {
        let meeting = if forward.current.len() <= backward.current.len() {
            forward.expand(graph, &backward)
        } else {
            backward.expand(graph, &forward)
        };

        if let Some(meeting) = meeting {
            let (start, mut steps) = unwind(&forward.links, meeting);

            // Backward links point towards the target
            let mut current = meeting;
            while let Some((next, edge)) = backward.links[current] {
                steps.push((next, edge));
                current = next;
            }

            let path = Path::from_slots(graph, start, &steps);
            #[allow(clippy::cast_precision_loss)]
            let hops = path.edge_count() as f64;
            debug!(hops, "frontiers met");
            return Ok(PathResult::found(path, hops));
        }
    }

    Ok(PathResult::not_found())
}
