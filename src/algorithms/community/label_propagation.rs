//! Label propagation (Raghavan, Albert & Kumara, 2007)
//!
//! Every node starts with a unique label and repeatedly adopts the label
//! carrying the most edge weight among its neighbours. A sweep with no label
//! change ends the run.
//!
//! - **Asynchronous**: nodes update in place, in a freshly shuffled order each
//!   sweep. A node keeps its label when it is among the heaviest; other ties
//!   are broken at random.
//! - **Synchronous**: all nodes update from the previous sweep's labels. A
//!   node's own label votes with its average incident weight and ties go to
//!   the smallest label. Synchronous updates can oscillate on bipartite
//!   structure; the iteration cap bounds that.

use super::network::{renumber, CommunityWeights, Network};
use super::{metadata, CommunityDetectionResult};
use crate::error::{AnalysisError, Result};
use crate::ranking::rng::SeededRandom;
use crate::storage::{CsrSnapshot, Graph, Identified, Orientation};
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{debug, instrument, warn};

const TIE_EPSILON: f64 = 1e-12;

/// Update schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PropagationMode {
    /// In-place updates in seeded random order
    #[default]
    Asynchronous,
    /// All nodes update together from the previous sweep
    Synchronous,
}

/// Parameters for [`label_propagation`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LabelPropagationConfig {
    /// Sweep cap (default: 100)
    pub max_iterations: usize,
    /// Update schedule (default: asynchronous)
    pub mode: PropagationMode,
    /// Seed for visiting order and tie-breaking (default: 42)
    pub seed: u64,
}

impl Default for LabelPropagationConfig {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            mode: PropagationMode::Asynchronous,
            seed: 42,
        }
    }
}

impl LabelPropagationConfig {
    /// Set the sweep cap
    #[must_use]
    pub const fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set the update schedule
    #[must_use]
    pub const fn with_mode(mut self, mode: PropagationMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the seed
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Check parameter domains
    ///
    /// # Errors
    ///
    /// `InvalidParameter` when `max_iterations` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(AnalysisError::invalid("max_iterations", "must be at least 1"));
        }
        Ok(())
    }
}

/// One group of nodes sharing a final label
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Cluster {
    /// Compact label, equal to the cluster's index
    pub label: usize,
    /// Member ids in insertion order
    pub nodes: Vec<String>,
    /// Number of members
    pub size: usize,
    /// Sweep in which a member last changed label (at least 1)
    pub iterations: usize,
    /// No member changed label in the final sweep
    pub stable: bool,
}

/// Label propagation outcome
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LabelPropagationResult {
    /// Clusters ordered by their first member's insertion index
    pub clusters: Vec<Cluster>,
    /// Sweeps performed
    pub iterations: usize,
    /// Whether a sweep finished without changes
    pub converged: bool,
    /// Modularity of the clustering
    pub modularity: f64,
}

impl LabelPropagationResult {
    /// Convert into the common community detection shape
    #[must_use]
    pub fn into_detection(self) -> CommunityDetectionResult {
        let communities: Vec<Vec<String>> = self.clusters.into_iter().map(|c| c.nodes).collect();
        CommunityDetectionResult {
            num_communities: communities.len(),
            communities,
            modularity: self.modularity,
            metadata: metadata("label_propagation", self.iterations, self.converged),
        }
    }
}

/// Heaviest labels around `node`, gathered in `votes`
fn tally(net: &Network, labels: &[usize], node: usize, votes: &mut CommunityWeights) -> f64 {
    votes.clear();
    for &(neighbor, w) in &net.adj[node] {
        votes.add(labels[neighbor], w);
    }
    votes
        .touched()
        .iter()
        .map(|&label| votes.get(label))
        .fold(f64::NEG_INFINITY, f64::max)
}

fn asynchronous_sweep(
    net: &Network,
    labels: &mut [usize],
    order: &mut [usize],
    rng: &mut SeededRandom,
    votes: &mut CommunityWeights,
    ties: &mut Vec<usize>,
) -> Vec<usize> {
    order.shuffle(rng);
    let mut changed = Vec::new();

    for &node in order.iter() {
        if net.adj[node].is_empty() {
            continue;
        }
        let best = tally(net, labels, node, votes);
        let current = labels[node];
        if votes.get(current) >= best - TIE_EPSILON {
            continue;
        }

        ties.clear();
        ties.extend(
            votes
                .touched()
                .iter()
                .copied()
                .filter(|&label| votes.get(label) >= best - TIE_EPSILON),
        );
        let pick = if ties.len() == 1 {
            ties[0]
        } else {
            ties[rng.gen_range(0..ties.len())]
        };
        labels[node] = pick;
        changed.push(node);
    }

    changed
}

#[allow(clippy::cast_precision_loss)]
fn synchronous_sweep(net: &Network, labels: &mut Vec<usize>, votes: &mut CommunityWeights) -> Vec<usize> {
    let mut next = labels.clone();
    let mut changed = Vec::new();

    for node in 0..net.len() {
        let row = &net.adj[node];
        if row.is_empty() {
            continue;
        }
        votes.clear();
        let own_weight = row.iter().map(|&(_, w)| w).sum::<f64>() / row.len() as f64;
        votes.add(labels[node], own_weight);
        for &(neighbor, w) in row {
            votes.add(labels[neighbor], w);
        }

        let mut pick = labels[node];
        let mut best = votes.get(pick);
        for &label in votes.touched() {
            let weight = votes.get(label);
            if weight > best + TIE_EPSILON || ((weight - best).abs() <= TIE_EPSILON && label < pick) {
                pick = label;
                best = weight;
            }
        }

        if pick != labels[node] {
            next[node] = pick;
            changed.push(node);
        }
    }

    *labels = next;
    changed
}

/// Detect communities by label propagation
///
/// Edge direction is ignored and edge weights scale the votes.
///
/// # Errors
///
/// `InvalidParameter` for an invalid config or a negative edge weight.
#[instrument(skip_all, fields(nodes = graph.node_count(), edges = graph.edge_count(), mode = ?config.mode))]
pub fn label_propagation<N: Identified, E>(
    graph: &Graph<N, E>,
    config: &LabelPropagationConfig,
) -> Result<LabelPropagationResult> {
    config.validate()?;

    let csr = CsrSnapshot::from_graph(graph, Orientation::Symmetric);
    let net = Network::from_csr(&csr)?;
    let n = net.len();

    let mut labels: Vec<usize> = (0..n).collect();
    let mut last_change = vec![0_usize; n];
    let mut order: Vec<usize> = (0..n).collect();
    let mut rng = SeededRandom::new(config.seed);
    let mut votes = CommunityWeights::new(n);
    let mut ties = Vec::new();

    let mut iterations = 0;
    let mut converged = n == 0;

    while !converged && iterations < config.max_iterations {
        iterations += 1;
        let changed = match config.mode {
            PropagationMode::Asynchronous => asynchronous_sweep(
                &net,
                &mut labels,
                &mut order,
                &mut rng,
                &mut votes,
                &mut ties,
            ),
            PropagationMode::Synchronous => synchronous_sweep(&net, &mut labels, &mut votes),
        };
        for &node in &changed {
            last_change[node] = iterations;
        }
        debug!(iteration = iterations, changed = changed.len(), "label propagation sweep");
        converged = changed.is_empty();
    }

    if !converged {
        warn!(
            max_iterations = config.max_iterations,
            "label propagation hit iteration cap"
        );
    }

    let (labels, count) = renumber(&labels);
    let modularity = net.modularity_of(&labels, 1.0);

    let mut clusters: Vec<Cluster> = (0..count)
        .map(|label| Cluster {
            label,
            nodes: Vec::new(),
            size: 0,
            iterations: 1,
            stable: true,
        })
        .collect();
    for (node, &label) in labels.iter().enumerate() {
        let cluster = &mut clusters[label];
        cluster.nodes.push(csr.id(node).to_string());
        cluster.size += 1;
        cluster.iterations = cluster.iterations.max(last_change[node]);
        if last_change[node] == iterations && !converged {
            cluster.stable = false;
        }
    }

    debug!(clusters = count, iterations, modularity, "label propagation finished");
    Ok(LabelPropagationResult {
        clusters,
        iterations,
        converged,
        modularity,
    })
}
