//! Leiden community detection algorithm
//!
//! Louvain's local moving can leave a community internally disconnected
//! when a bridging node moves away. Leiden (Traag et al., 2019) adds a
//! refinement phase between moving and aggregation:
//!
//! 1. **Fast local moving**: a queue of nodes; a node that changes community
//!    re-queues its neighbours outside the new community.
//! 2. **Refinement**: inside each community, singletons merge only into
//!    well-connected sub-communities, so every refined community is connected.
//! 3. **Aggregation** by the refined partition, with the moved partition as
//!    the starting point on the coarse network.
//!
//! A node set `S` is well connected to `T` when
//! `E(S, T) >= γ K_S (K_T - K_S) / 2m`.

use super::louvain::validate_resolution;
use super::network::{renumber, visit_order, CommunityWeights, Network};
use super::{build_result, components_if_all_singletons, metadata, CommunityDetectionResult};
use crate::error::{AnalysisError, Result};
use crate::ranking::rng::SeededRandom;
use crate::storage::{CsrSnapshot, Graph, Identified, Orientation};
use std::collections::VecDeque;
use tracing::{debug, instrument, warn};

const GAIN_EPSILON: f64 = 1e-12;

/// Parameters for [`leiden`]
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LeidenConfig {
    /// Resolution γ (default: 1.0)
    pub resolution: f64,
    /// Maximum aggregation levels (default: 32)
    pub max_levels: usize,
    /// Node visits per level, as a multiple of the node count (default: 100)
    pub max_passes: usize,
    /// Seed for a shuffled visiting order; `None` visits in insertion order
    pub seed: Option<u64>,
}

impl Default for LeidenConfig {
    fn default() -> Self {
        Self {
            resolution: 1.0,
            max_levels: 32,
            max_passes: 100,
            seed: None,
        }
    }
}

impl LeidenConfig {
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

/// Queue-based local moving starting from `community`
///
/// Labels stay below `net.len()`; emptied labels are reused for moves into
/// an empty community.
fn fast_move(
    net: &Network,
    community: &mut [usize],
    resolution: f64,
    budget: usize,
    order: &[usize],
) -> bool {
    let n = net.len();
    let two_m = 2.0 * net.total_weight;

    let mut total = vec![0.0; n];
    let mut size = vec![0_usize; n];
    for node in 0..n {
        total[community[node]] += net.strength[node];
        size[community[node]] += 1;
    }
    let mut free: Vec<usize> = (0..n).rev().filter(|&c| size[c] == 0).collect();

    let mut queue: VecDeque<usize> = order.iter().copied().collect();
    let mut queued = vec![true; n];
    let mut weights = CommunityWeights::new(n);
    let mut visits = 0;
    let mut moved_any = false;

    while let Some(node) = queue.pop_front() {
        if visits == budget {
            break;
        }
        visits += 1;
        queued[node] = false;

        let current = community[node];
        let k = net.strength[node];

        weights.clear();
        weights.add(current, 0.0);
        for &(neighbor, w) in &net.adj[node] {
            weights.add(community[neighbor], w);
        }

        total[current] -= k;
        size[current] -= 1;

        let mut best = current;
        let mut best_gain = weights.get(current) - resolution * total[current] * k / two_m;
        for &candidate in weights.touched() {
            let gain = weights.get(candidate) - resolution * total[candidate] * k / two_m;
            if gain > best_gain + GAIN_EPSILON {
                best = candidate;
                best_gain = gain;
            }
        }

        // An empty community scores zero
        let mut took_free = false;
        if size[current] > 0 && best_gain < -GAIN_EPSILON {
            if let Some(&empty) = free.last() {
                best = empty;
                took_free = true;
            }
        }
        if took_free {
            free.pop();
        }

        total[best] += k;
        size[best] += 1;
        community[node] = best;

        if best != current {
            moved_any = true;
            if size[current] == 0 {
                free.push(current);
            }
            for &(neighbor, _) in &net.adj[node] {
                if !queued[neighbor] && community[neighbor] != best {
                    queued[neighbor] = true;
                    queue.push_back(neighbor);
                }
            }
        }
    }

    moved_any
}

/// Refine `partition` into well-connected sub-communities
///
/// Starts from singletons. A singleton node merges into the refined
/// community of its own partition cell with the largest positive gain,
/// provided both sides are well connected to the rest of that cell.
fn refine(net: &Network, partition: &[usize], resolution: f64, order: &[usize]) -> Vec<usize> {
    let n = net.len();
    let two_m = 2.0 * net.total_weight;

    let mut refined: Vec<usize> = (0..n).collect();
    let mut size = vec![1_usize; n];
    let mut refined_total = net.strength.clone();

    let mut cell_total = vec![0.0; n];
    for node in 0..n {
        cell_total[partition[node]] += net.strength[node];
    }

    // Weight from each node to the rest of its cell
    let inner: Vec<f64> = (0..n)
        .map(|node| {
            net.adj[node]
                .iter()
                .filter(|&&(neighbor, _)| partition[neighbor] == partition[node])
                .map(|&(_, w)| w)
                .sum()
        })
        .collect();
    // Weight from each refined community to the rest of its cell
    let mut external = inner.clone();

    let mut weights = CommunityWeights::new(n);

    for &node in order {
        let own = refined[node];
        if size[own] != 1 {
            continue;
        }
        let cell = partition[node];
        let k = net.strength[node];
        if inner[node] < resolution * k * (cell_total[cell] - k) / two_m {
            continue;
        }

        weights.clear();
        for &(neighbor, w) in &net.adj[node] {
            if partition[neighbor] == cell {
                weights.add(refined[neighbor], w);
            }
        }

        let mut best = None;
        let mut best_gain = 0.0;
        for &candidate in weights.touched() {
            if candidate == own {
                continue;
            }
            let k_r = refined_total[candidate];
            if external[candidate] < resolution * k_r * (cell_total[cell] - k_r) / two_m {
                continue;
            }
            let gain = weights.get(candidate) - resolution * k * k_r / two_m;
            if gain > best_gain + GAIN_EPSILON {
                best = Some(candidate);
                best_gain = gain;
            }
        }

        if let Some(target) = best {
            let link = weights.get(target);
            external[target] = external[target] - link + (inner[node] - link);
            refined_total[target] += k;
            refined_total[own] = 0.0;
            size[target] += 1;
            size[own] = 0;
            refined[node] = target;
        }
    }

    refined
}

/// Detect communities using the Leiden algorithm
///
/// Every returned community induces a connected subgraph.
///
/// # Errors
///
/// `InvalidParameter` for an invalid config or a negative edge weight.
#[instrument(skip_all, fields(nodes = graph.node_count(), edges = graph.edge_count()))]
pub fn leiden<N: Identified, E>(
    graph: &Graph<N, E>,
    config: &LeidenConfig,
) -> Result<CommunityDetectionResult> {
    config.validate()?;

    let csr = CsrSnapshot::from_graph(graph, Orientation::Symmetric);
    let net = Network::from_csr(&csr)?;
    let n = net.len();

    let mut assignment: Vec<usize> = (0..n).collect();

    if net.total_weight <= 0.0 {
        debug!("no edge weight, every node is its own community");
        return Ok(build_result(&csr, &net, &assignment, metadata("leiden", 0, true)));
    }

    let mut rng = config.seed.map(SeededRandom::new);
    let mut level_net = net.clone();
    let mut partition: Vec<usize> = (0..n).collect();
    let mut levels = 0;
    let mut converged = false;

    while levels < config.max_levels {
        levels += 1;
        let size = level_net.len();
        let order = visit_order(size, rng.as_mut());
        let budget = config.max_passes.saturating_mul(size);
        fast_move(&level_net, &mut partition, config.resolution, budget, &order);

        let (moved, cells) = renumber(&partition);
        partition = moved;
        if cells == size {
            converged = true;
            break;
        }

        let (refined, refined_count) =
            renumber(&refine(&level_net, &partition, config.resolution, &order));

        let (aggregate_by, count, next_partition) = if refined_count == size {
            // Refinement merged nothing; aggregate by the moved partition
            (partition.clone(), cells, (0..cells).collect())
        } else {
            let mut next = vec![0; refined_count];
            for node in 0..size {
                next[refined[node]] = partition[node];
            }
            (refined, refined_count, next)
        };

        for node in &mut assignment {
            *node = aggregate_by[*node];
        }
        debug!(
            level = levels,
            communities = cells,
            refined = count,
            "leiden level aggregated"
        );
        level_net = level_net.aggregate(&aggregate_by, count);
        partition = next_partition;
    }

    if !converged {
        warn!(max_levels = config.max_levels, "leiden hit level cap");
    }

    let labels: Vec<usize> = assignment.iter().map(|&node| partition[node]).collect();
    let (mut labels, _) = net.split_disconnected(&labels);
    components_if_all_singletons(&csr, &mut labels);

    let result = build_result(&csr, &net, &labels, metadata("leiden", levels, converged));
    debug!(
        communities = result.num_communities,
        modularity = result.modularity,
        "leiden finished"
    );
    Ok(result)
}
