//! Bounded reachability, simple-path enumeration and path presets
//!
//! Based on the level-synchronous frontier BFS used for `find_callers`-style
//! queries: expand one hop at a time until the hop bound is reached.

use super::path::Path;
use super::shortest_path::shortest_path;
use crate::error::{AnalysisError, Result};
use crate::storage::{Direction, Graph, Identified};
use std::collections::VecDeque;
use tracing::{debug, instrument};

/// Default hop bound for presets
pub const DEFAULT_MAX_HOPS: usize = 10;

/// Default cap on enumerated paths for presets
pub const DEFAULT_MAX_PATHS: usize = 1000;

/// Node reached from the source, with its hop distance
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReachableNode {
    /// Node id
    pub id: String,
    /// Minimum number of hops from the source
    pub hops: usize,
}

/// Result of [`find_reachable_nodes`]
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ReachabilityResult {
    /// Reached nodes in BFS order, source excluded
    pub reachable: Vec<ReachableNode>,
    /// Hop distance to the requested target, if it was reached within the bound
    pub target_hops: Option<usize>,
}

impl ReachabilityResult {
    /// Whether the requested target was reached
    #[must_use]
    pub const fn target_reachable(&self) -> bool {
        self.target_hops.is_some()
    }
}

/// Level-order BFS tree restricted to `max_hops`
struct BfsTree {
    order: Vec<usize>,
    hops: Vec<usize>,
    parent: Vec<Option<(usize, usize)>>,
}

impl BfsTree {
    fn grow<N: Identified, E>(
        graph: &Graph<N, E>,
        source: usize,
        max_hops: Option<usize>,
        direction: Direction,
    ) -> Self {
        let mut hops = vec![usize::MAX; graph.slot_capacity()];
        let mut parent = vec![None; graph.slot_capacity()];
        let mut order = Vec::new();
        let mut queue = VecDeque::new();

        hops[source] = 0;
        queue.push_back(source);

        while let Some(current) = queue.pop_front() {
            if max_hops.is_some_and(|limit| hops[current] >= limit) {
                continue;
            }
            for (edge, neighbor) in graph.adjacent(current, direction) {
                if hops[neighbor] == usize::MAX {
                    hops[neighbor] = hops[current] + 1;
                    parent[neighbor] = Some((current, edge));
                    order.push(neighbor);
                    queue.push_back(neighbor);
                }
            }
        }

        Self { order, hops, parent }
    }

    /// Tree path from the root to `node`, oriented along edge direction
    fn path_to<N: Identified, E>(
        &self,
        graph: &Graph<N, E>,
        node: usize,
        direction: Direction,
    ) -> Path {
        let mut chain = vec![node];
        let mut edges = Vec::new();
        let mut current = node;
        while let Some((previous, edge)) = self.parent[current] {
            chain.push(previous);
            edges.push(edge);
            current = previous;
        }
        // Walking incoming edges already yields the chain in edge direction
        if direction != Direction::Incoming {
            chain.reverse();
            edges.reverse();
        }

        let start = chain[0];
        let steps: Vec<(usize, usize)> = chain[1..].iter().copied().zip(edges).collect();
        Path::from_slots(graph, start, &steps)
    }
}

/// Find nodes reachable from `source` within an optional hop bound
///
/// # Arguments
///
/// * `graph` - Graph to explore
/// * `source` - Starting node
/// * `target` - Optional node whose reachability is reported in `target_hops`
/// * `max_hops` - Optional hop bound (`None` = unbounded)
/// * `direction` - Which incident edges to follow
///
/// # Errors
///
/// `NodeNotFound` if `source` or a given `target` is absent.
///
/// # Example
///
/// ```
/// use bibgraph_core::{find_reachable_nodes, Direction, Graph};
///
/// let mut graph: Graph<String> = Graph::directed();
/// for id in ["A", "B", "C", "D"] {
///     graph.add_node(id.to_string());
/// }
/// graph.add_edge("AB", "A", "B", ()).unwrap();
/// graph.add_edge("BC", "B", "C", ()).unwrap();
/// graph.add_edge("CD", "C", "D", ()).unwrap();
///
/// let result = find_reachable_nodes(&graph, "A", Some("D"), Some(2), Direction::Outgoing).unwrap();
/// assert_eq!(result.reachable.len(), 2); // B and C only
/// assert!(!result.target_reachable());
/// ```
#[instrument(skip_all, fields(source = source, max_hops = ?max_hops))]
pub fn find_reachable_nodes<N: Identified, E>(
    graph: &Graph<N, E>,
    source: &str,
    target: Option<&str>,
    max_hops: Option<usize>,
    direction: Direction,
) -> Result<ReachabilityResult> {
    let source_slot = graph.require_slot(source)?;
    let target_slot = target.map(|id| graph.require_slot(id)).transpose()?;

    let tree = BfsTree::grow(graph, source_slot, max_hops, direction);

    let reachable: Vec<ReachableNode> = tree
        .order
        .iter()
        .map(|&slot| ReachableNode {
            id: graph.slot_id(slot).to_string(),
            hops: tree.hops[slot],
        })
        .collect();

    let target_hops = target_slot
        .map(|slot| tree.hops[slot])
        .filter(|&hops| hops != usize::MAX);

    debug!(reached = reachable.len(), "reachability done");
    Ok(ReachabilityResult {
        reachable,
        target_hops,
    })
}

/// Enumerate simple paths from `source` to `target` along outgoing edges
///
/// Paths have at most `max_hops` edges and are produced in depth-first order
/// until `max_paths` have been collected. Parallel edges yield distinct paths.
///
/// # Errors
///
/// `NodeNotFound` for a missing endpoint.
#[instrument(skip_all, fields(source = source, target = target, max_hops = max_hops))]
pub fn find_all_paths<N: Identified, E>(
    graph: &Graph<N, E>,
    source: &str,
    target: &str,
    max_hops: usize,
    max_paths: usize,
) -> Result<Vec<Path>> {
    let source_slot = graph.require_slot(source)?;
    let target_slot = graph.require_slot(target)?;

    let mut paths = Vec::new();
    if max_paths == 0 {
        return Ok(paths);
    }
    if source_slot == target_slot {
        paths.push(Path::single(source));
        return Ok(paths);
    }
    if max_hops == 0 {
        return Ok(paths);
    }

    let mut on_path = vec![false; graph.slot_capacity()];
    on_path[source_slot] = true;

    // Each frame holds a node's outgoing (edge, neighbour) list and a cursor
    let mut frames: Vec<(Vec<(usize, usize)>, usize)> = vec![(
        graph.adjacent(source_slot, Direction::Outgoing).collect(),
        0,
    )];
    let mut steps: Vec<(usize, usize)> = Vec::new();

    while let Some((candidates, cursor)) = frames.last_mut() {
        let Some(&(edge, neighbor)) = candidates.get(*cursor) else {
            frames.pop();
            if let Some((node, _)) = steps.pop() {
                on_path[node] = false;
            }
            continue;
        };
        *cursor += 1;

        if on_path[neighbor] {
            continue;
        }
        if neighbor == target_slot {
            let mut full = steps.clone();
            full.push((neighbor, edge));
            paths.push(Path::from_slots(graph, source_slot, &full));
            if paths.len() >= max_paths {
                break;
            }
            continue;
        }
        if steps.len() + 1 < max_hops {
            on_path[neighbor] = true;
            steps.push((neighbor, edge));
            frames.push((graph.adjacent(neighbor, Direction::Outgoing).collect(), 0));
        }
    }

    debug!(found = paths.len(), "path enumeration done");
    Ok(paths)
}

/// Canned path queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PathPreset {
    /// Single shortest path to the target
    Shortest,
    /// BFS-tree paths to every node reachable along outgoing edges
    AllOutgoing,
    /// BFS-tree paths from every node that reaches the source
    AllIncoming,
    /// All simple paths to the target (bounded enumeration)
    AllPaths,
}

/// Bounds for [`run_preset`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PresetConfig {
    /// Hop bound for reachability and enumeration (default: 10)
    pub max_hops: usize,
    /// Cap on enumerated paths (default: 1000)
    pub max_paths: usize,
}

impl Default for PresetConfig {
    fn default() -> Self {
        Self {
            max_hops: DEFAULT_MAX_HOPS,
            max_paths: DEFAULT_MAX_PATHS,
        }
    }
}

impl PresetConfig {
    /// Set the hop bound
    #[must_use]
    pub const fn with_max_hops(mut self, max_hops: usize) -> Self {
        self.max_hops = max_hops;
        self
    }

    /// Set the path cap
    #[must_use]
    pub const fn with_max_paths(mut self, max_paths: usize) -> Self {
        self.max_paths = max_paths;
        self
    }

    /// Check parameter domains
    ///
    /// # Errors
    ///
    /// `InvalidParameter` when `max_hops` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.max_hops == 0 {
            return Err(AnalysisError::invalid("max_hops", "must be at least 1"));
        }
        Ok(())
    }
}

/// Output of a preset query
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PresetResult {
    /// Preset that produced this result
    pub preset: PathPreset,
    /// Paths found (empty when nothing matched)
    pub paths: Vec<Path>,
}

/// Run a preset path query
///
/// `Shortest` and `AllPaths` need a `target`; the reachability presets ignore it.
///
/// # Errors
///
/// `NodeNotFound` for missing endpoints, `InvalidParameter` for a missing
/// target or an invalid config.
pub fn run_preset<N: Identified, E>(
    graph: &Graph<N, E>,
    source: &str,
    target: Option<&str>,
    preset: PathPreset,
    config: &PresetConfig,
) -> Result<PresetResult> {
    config.validate()?;
    let require_target =
        || target.ok_or_else(|| AnalysisError::invalid("target", format!("{preset:?} needs a target")));

    let paths = match preset {
        PathPreset::Shortest => {
            let result = shortest_path(graph, source, require_target()?)?;
            if result.found {
                vec![result.path]
            } else {
                Vec::new()
            }
        }
        PathPreset::AllOutgoing | PathPreset::AllIncoming => {
            let direction = if preset == PathPreset::AllOutgoing {
                Direction::Outgoing
            } else {
                Direction::Incoming
            };
            let source_slot = graph.require_slot(source)?;
            let tree = BfsTree::grow(graph, source_slot, Some(config.max_hops), direction);
            tree.order
                .iter()
                .map(|&slot| tree.path_to(graph, slot, direction))
                .collect()
        }
        PathPreset::AllPaths => find_all_paths(
            graph,
            source,
            require_target()?,
            config.max_hops,
            config.max_paths,
        )?,
    };

    Ok(PresetResult { preset, paths })
}
