//! `PageRank` via power iteration
//!
//! Based on Page et al. (1999) "The `PageRank` Citation Ranking: Bringing Order to the Web".
//! Transitions are weight-proportional; unweighted graphs reduce to the classic
//! out-degree formulation. The same iteration supplies Infomap's node visit rates.

use crate::error::{AnalysisError, Result};
use crate::storage::{CsrSnapshot, Graph, Identified, Orientation};
use std::collections::HashMap;
use tracing::{debug, instrument, warn};

/// Damping factor for `PageRank` (Google standard)
pub const DEFAULT_DAMPING: f64 = 0.85;

/// `PageRank` parameters
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PageRankConfig {
    /// Probability of following a link (default: 0.85)
    pub damping: f64,
    /// Maximum number of power iterations (default: 100)
    pub max_iterations: usize,
    /// L1 convergence threshold (default: 1e-10)
    pub tolerance: f64,
}

impl Default for PageRankConfig {
    fn default() -> Self {
        Self {
            damping: DEFAULT_DAMPING,
            max_iterations: 100,
            tolerance: 1e-10,
        }
    }
}

impl PageRankConfig {
    /// Set the damping factor
    #[must_use]
    pub const fn with_damping(mut self, damping: f64) -> Self {
        self.damping = damping;
        self
    }

    /// Set the iteration cap
    #[must_use]
    pub const fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set the convergence threshold
    #[must_use]
    pub const fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Check parameter domains
    ///
    /// # Errors
    ///
    /// `InvalidParameter` unless `0 < damping < 1` and `tolerance > 0`.
    pub fn validate(&self) -> Result<()> {
        if self.damping.is_nan() || self.damping <= 0.0 || self.damping >= 1.0 {
            return Err(AnalysisError::invalid(
                "damping",
                format!("must lie in (0, 1), got {}", self.damping),
            ));
        }
        if self.tolerance.is_nan() || self.tolerance <= 0.0 {
            return Err(AnalysisError::invalid("tolerance", "must be positive"));
        }
        Ok(())
    }
}

/// `PageRank` scores
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PageRankResult {
    /// Score per node id (sums to 1.0)
    pub scores: HashMap<String, f64>,
    /// Power iterations performed
    pub iterations: usize,
    /// Whether the L1 change dropped below the tolerance
    pub converged: bool,
}

impl PageRankResult {
    /// Score of a node (`None` if the id was not in the graph)
    #[must_use]
    pub fn score(&self, id: &str) -> Option<f64> {
        self.scores.get(id).copied()
    }
}

/// Stationary distribution over dense CSR indices
pub(crate) struct PowerIteration {
    pub(crate) ranks: Vec<f64>,
    pub(crate) iterations: usize,
    pub(crate) converged: bool,
}

/// Power iteration on the forward layout of `csr`
///
/// ```text
/// PR(u) = (1-d)/N + d * Σ PR(v) * w(v,u) / w(v)  +  d * dangling / N
/// ```
#[allow(clippy::cast_precision_loss)] // Graphs >2^52 nodes unlikely
pub(crate) fn power_iteration(
    csr: &CsrSnapshot<'_>,
    damping: f64,
    max_iterations: usize,
    tolerance: f64,
) -> PowerIteration {
    let n = csr.num_nodes();
    if n == 0 {
        return PowerIteration {
            ranks: Vec::new(),
            iterations: 0,
            converged: true,
        };
    }

    let teleport = (1.0 - damping) / n as f64;

    // Initialize: uniform distribution
    let mut ranks = vec![1.0 / n as f64; n];
    let mut new_ranks = vec![0.0; n];

    // Out-strengths for normalization
    let out_strength: Vec<f64> = (0..n).map(|node| csr.out_strength(node)).collect();

    let mut iterations = 0;
    let mut converged = false;

    while iterations < max_iterations {
        iterations += 1;

        // Dangling nodes: distribute rank equally to all nodes
        let dangling: f64 = (0..n)
            .filter(|&node| out_strength[node] <= 0.0)
            .map(|node| ranks[node])
            .sum();
        new_ranks.fill(teleport + damping * dangling / n as f64);

        // Distribute rank from each node to its neighbors
        for node in 0..n {
            if out_strength[node] <= 0.0 {
                continue;
            }
            let share = damping * ranks[node] / out_strength[node];
            let (targets, weights) = csr.outgoing(node);
            for (&target, &weight) in targets.iter().zip(weights) {
                new_ranks[target] += share * weight;
            }
        }

        // Check convergence (L1 norm)
        let diff: f64 = ranks
            .iter()
            .zip(&new_ranks)
            .map(|(old, new)| (new - old).abs())
            .sum();

        // Swap buffers
        std::mem::swap(&mut ranks, &mut new_ranks);

        if diff < tolerance {
            converged = true;
            break;
        }
    }

    PowerIteration {
        ranks,
        iterations,
        converged,
    }
}

/// Compute `PageRank` scores for all nodes in the graph
///
/// Follows edges in the graph's own direction (both ways when undirected).
///
/// # Errors
///
/// `InvalidParameter` for an invalid config or a negative edge weight.
///
/// # Example
///
/// ```
/// use bibgraph_core::{pagerank, Graph, PageRankConfig};
///
/// let mut graph: Graph<String> = Graph::directed();
/// for id in ["0", "1", "2"] {
///     graph.add_node(id.to_string());
/// }
/// graph.add_edge("a", "0", "1", ()).unwrap();
/// graph.add_edge("b", "1", "2", ()).unwrap();
/// graph.add_edge("c", "2", "0", ()).unwrap(); // Cycle
///
/// let result = pagerank(&graph, &PageRankConfig::default()).unwrap();
/// let total: f64 = result.scores.values().sum();
/// assert!((total - 1.0).abs() < 1e-9);
/// ```
#[instrument(skip_all, fields(nodes = graph.node_count(), edges = graph.edge_count()))]
pub fn pagerank<N: Identified, E>(
    graph: &Graph<N, E>,
    config: &PageRankConfig,
) -> Result<PageRankResult> {
    config.validate()?;
    graph.ensure_non_negative_weights()?;

    let csr = CsrSnapshot::from_graph(graph, Orientation::AsStored);
    let result = power_iteration(&csr, config.damping, config.max_iterations, config.tolerance);

    if result.converged {
        debug!(iterations = result.iterations, "PageRank converged");
    } else {
        warn!(
            max_iterations = config.max_iterations,
            "PageRank hit iteration cap"
        );
    }

    let scores = csr
        .ids()
        .iter()
        .zip(&result.ranks)
        .map(|(id, &rank)| ((*id).to_string(), rank))
        .collect();

    Ok(PageRankResult {
        scores,
        iterations: result.iterations,
        converged: result.converged,
    })
}
