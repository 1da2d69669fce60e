//! Continuous core/periphery model (Borgatti & Everett, 1999)
//!
//! Fits a coreness vector `c` so that `c_i * c_j` approximates the adjacency
//! `a_ij` over all unordered pairs. The minimum-residual update
//!
//! ```text
//! c_i = Σ_j a_ij c_j / Σ_{j≠i} c_j²
//! ```
//!
//! is applied in place (Gauss–Seidel). Each step is the exact least-squares
//! minimizer for `c_i`, so the residual never grows. The update fixes its own
//! scale, so iterates are left unscaled and only the reported coreness is
//! divided by its maximum. Edge direction is ignored; parallel edges add their
//! weights.

use crate::error::{AnalysisError, Result};
use crate::storage::{CsrSnapshot, Graph, Identified, Orientation};
use tracing::{debug, instrument, warn};

/// Parameters for [`core_periphery`]
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CorePeripheryConfig {
    /// Minimum coreness for a node to count as core, in `[0, 1]` (default: 0.5)
    pub threshold: f64,
    /// Maximum sweeps of the update (default: 200)
    pub max_iterations: usize,
    /// Largest per-node change that counts as converged (default: 1e-8)
    pub tolerance: f64,
}

impl Default for CorePeripheryConfig {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            max_iterations: 200,
            tolerance: 1e-8,
        }
    }
}

impl CorePeripheryConfig {
    /// Set the core threshold
    #[must_use]
    pub const fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Set the sweep cap
    #[must_use]
    pub const fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Check parameter domains
    ///
    /// # Errors
    ///
    /// `InvalidParameter` for a threshold outside `[0, 1]` or a non-positive tolerance.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(AnalysisError::invalid(
                "threshold",
                format!("must lie in [0, 1], got {}", self.threshold),
            ));
        }
        if self.tolerance.is_nan() || self.tolerance <= 0.0 {
            return Err(AnalysisError::invalid("tolerance", "must be positive"));
        }
        Ok(())
    }
}

/// Coreness of one node
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeCoreness {
    /// Node id
    pub id: String,
    /// Coreness in `[0, 1]`
    pub coreness: f64,
    /// Whether `coreness >= threshold`
    pub is_core: bool,
}

/// Fitted core/periphery structure
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CorePeripheryResult {
    /// Every node with its coreness, in insertion order
    pub nodes: Vec<NodeCoreness>,
    /// Ids classified as core
    pub core_nodes: Vec<String>,
    /// Ids classified as periphery
    pub periphery_nodes: Vec<String>,
    /// Pearson correlation between `a_ij` and `c_i c_j`, in `[-1, 1]`
    pub fit_quality: f64,
    /// Sweeps performed
    pub iterations: usize,
    /// Whether the coreness vector stopped changing within the tolerance
    pub converged: bool,
}

impl CorePeripheryResult {
    /// Coreness of a node
    #[must_use]
    pub fn coreness(&self, id: &str) -> Option<f64> {
        self.nodes.iter().find(|n| n.id == id).map(|n| n.coreness)
    }
}

/// Pearson correlation of `a_ij` with `c_i c_j` over unordered pairs `i < j`
///
/// Uses closed-form pair sums, so the cost is O(V + E) instead of O(V²).
#[allow(clippy::cast_precision_loss)]
fn pattern_correlation(rows: &[Vec<(usize, f64)>], c: &[f64]) -> f64 {
    let n = c.len() as f64;
    let pairs = n * (n - 1.0) / 2.0;

    let (mut sum_x, mut sum_x2, mut sum_xy) = (0.0, 0.0, 0.0);
    for (i, row) in rows.iter().enumerate() {
        for &(j, a) in row.iter().filter(|&&(j, _)| j > i) {
            sum_x += a;
            sum_x2 += a * a;
            sum_xy += a * c[i] * c[j];
        }
    }

    let s1: f64 = c.iter().sum();
    let s2: f64 = c.iter().map(|v| v * v).sum();
    let s4: f64 = c.iter().map(|v| v.powi(4)).sum();
    let sum_y = (s1 * s1 - s2) / 2.0;
    let sum_y2 = (s2 * s2 - s4) / 2.0;

    let covariance = pairs * sum_xy - sum_x * sum_y;
    let var_x = pairs * sum_x2 - sum_x * sum_x;
    let var_y = pairs * sum_y2 - sum_y * sum_y;

    if var_x <= f64::EPSILON || var_y <= f64::EPSILON {
        return 0.0;
    }
    (covariance / (var_x * var_y).sqrt()).clamp(-1.0, 1.0)
}

/// Fit continuous coreness scores
///
/// # Returns
///
/// `Ok(None)` for graphs with fewer than 3 nodes (no meaningful pattern).
///
/// # Errors
///
/// `InvalidParameter` for an invalid config or a negative edge weight.
///
/// # Example
///
/// ```
/// use bibgraph_core::{core_periphery, CorePeripheryConfig, Graph};
///
/// // Star: the hub is the core
/// let mut graph: Graph<String> = Graph::undirected();
/// graph.add_node("hub".to_string());
/// for i in 0..5 {
///     graph.add_node(format!("leaf{i}"));
///     graph.add_edge(format!("e{i}"), "hub", &format!("leaf{i}"), ()).unwrap();
/// }
///
/// let result = core_periphery(&graph, &CorePeripheryConfig::default()).unwrap().unwrap();
/// assert_eq!(result.core_nodes, vec!["hub"]);
/// ```
#[instrument(skip_all, fields(nodes = graph.node_count(), edges = graph.edge_count()))]
pub fn core_periphery<N: Identified, E>(
    graph: &Graph<N, E>,
    config: &CorePeripheryConfig,
) -> Result<Option<CorePeripheryResult>> {
    config.validate()?;
    graph.ensure_non_negative_weights()?;

    let csr = CsrSnapshot::from_graph(graph, Orientation::Symmetric);
    let n = csr.num_nodes();
    if n < 3 {
        debug!("fewer than 3 nodes, no core/periphery structure");
        return Ok(None);
    }

    let (rows, _) = csr.merged_rows();

    // Start from normalized strength
    let mut c: Vec<f64> = rows.iter().map(|row| row.iter().map(|&(_, w)| w).sum()).collect();
    let initial_max = c.iter().copied().fold(0.0_f64, f64::max);
    if initial_max > 0.0 {
        for value in &mut c {
            *value /= initial_max;
        }
    }
    // Coreness as reported: `c` divided by its maximum
    let mut shape = c.clone();

    let mut iterations = 0;
    // An edgeless graph is fitted exactly by all zeros
    let mut converged = initial_max <= 0.0;

    while !converged && iterations < config.max_iterations {
        iterations += 1;

        let mut sum_sq: f64 = c.iter().map(|v| v * v).sum();
        for i in 0..n {
            let others = sum_sq - c[i] * c[i];
            let numerator: f64 = rows[i].iter().map(|&(j, a)| a * c[j]).sum();
            let updated = if others > f64::EPSILON {
                numerator / others
            } else {
                0.0
            };
            sum_sq += updated * updated - c[i] * c[i];
            c[i] = updated;
        }

        let max = c.iter().copied().fold(0.0_f64, f64::max);
        if !max.is_finite() {
            return Err(AnalysisError::numerical(
                "core_periphery",
                "coreness diverged",
            ));
        }
        if max <= 0.0 {
            warn!(iteration = iterations, "coreness collapsed to zero");
            shape.fill(0.0);
            break;
        }

        let mut change = 0.0_f64;
        for (reported, &value) in shape.iter_mut().zip(&c) {
            let scaled = value / max;
            change = change.max((scaled - *reported).abs());
            *reported = scaled;
        }
        converged = change < config.tolerance;
    }

    if !converged {
        warn!(
            max_iterations = config.max_iterations,
            "core/periphery fit did not converge"
        );
    }
    let c = shape;

    let fit_quality = pattern_correlation(&rows, &c);

    let mut nodes = Vec::with_capacity(n);
    let mut core_nodes = Vec::new();
    let mut periphery_nodes = Vec::new();
    for (i, &coreness) in c.iter().enumerate() {
        let id = csr.id(i).to_string();
        let is_core = coreness >= config.threshold;
        if is_core {
            core_nodes.push(id.clone());
        } else {
            periphery_nodes.push(id.clone());
        }
        nodes.push(NodeCoreness {
            id,
            coreness,
            is_core,
        });
    }

    debug!(
        core = core_nodes.len(),
        fit_quality, iterations, "core/periphery fitted"
    );
    Ok(Some(CorePeripheryResult {
        nodes,
        core_nodes,
        periphery_nodes,
        fit_quality,
        iterations,
        converged,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn undirected(n_nodes: usize, edges: &[(usize, usize)]) -> Graph<String> {
        let mut graph = Graph::undirected();
        for i in 0..n_nodes {
            graph.add_node(format!("n{i}"));
        }
        for (k, &(s, t)) in edges.iter().enumerate() {
            graph
                .add_edge(format!("e{k}"), &format!("n{s}"), &format!("n{t}"), ())
                .unwrap();
        }
        graph
    }

    /// Clique on 0..4, each periphery node 4..12 tied to two core nodes
    fn ideal_core_periphery() -> Graph<String> {
        let mut edges = Vec::new();
        for i in 0..4 {
            for j in (i + 1)..4 {
                edges.push((i, j));
            }
        }
        for p in 4..12 {
            edges.push((p, p % 4));
            edges.push((p, (p + 1) % 4));
        }
        undirected(12, &edges)
    }

    #[test]
    fn test_small_graph_is_no_result() {
        let graph = undirected(2, &[(0, 1)]);
        assert_eq!(core_periphery(&graph, &CorePeripheryConfig::default()), Ok(None));
    }

    #[test]
    fn test_threshold_validated_first() {
        let graph = undirected(2, &[(0, 1)]);
        for threshold in [-0.1, 1.5, f64::NAN] {
            let config = CorePeripheryConfig::default().with_threshold(threshold);
            assert!(core_periphery(&graph, &config).is_err());
        }
    }

    #[test]
    fn test_ideal_structure_separates_core() {
        let graph = ideal_core_periphery();
        let result = core_periphery(&graph, &CorePeripheryConfig::default())
            .unwrap()
            .unwrap();

        assert!(result.converged);
        assert_eq!(result.core_nodes, vec!["n0", "n1", "n2", "n3"]);
        assert_eq!(result.periphery_nodes.len(), 8);
        assert!(result.fit_quality > 0.5, "fit = {}", result.fit_quality);
        for node in &result.nodes {
            assert!((0.0..=1.0).contains(&node.coreness));
        }
        assert!((result.coreness("n0").unwrap() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_fit_holds_its_shape_over_many_sweeps() {
        let graph = ideal_core_periphery();
        let one = core_periphery(&graph, &CorePeripheryConfig::default().with_max_iterations(1))
            .unwrap()
            .unwrap();
        let many = core_periphery(&graph, &CorePeripheryConfig::default().with_max_iterations(5000))
            .unwrap()
            .unwrap();

        assert!(many.converged);
        assert_eq!(one.core_nodes, vec!["n0", "n1", "n2", "n3"]);
        assert_eq!(many.core_nodes, one.core_nodes);
        // Fixed point: periphery sits near 0.37 of the core
        for p in 4..12 {
            let coreness = many.coreness(&format!("n{p}")).unwrap();
            assert!(coreness > 0.25 && coreness < 0.5, "n{p}: {coreness}");
        }
        for c in 0..4 {
            assert!(many.coreness(&format!("n{c}")).unwrap() > 0.99);
        }
    }

    #[test]
    fn test_edgeless_graph_has_zero_fit() {
        let graph = undirected(4, &[]);
        let result = core_periphery(&graph, &CorePeripheryConfig::default())
            .unwrap()
            .unwrap();

        assert!(result.converged);
        assert_eq!(result.fit_quality, 0.0);
        assert_eq!(result.core_nodes.len(), 0);
    }

    #[test]
    fn test_pattern_correlation_perfect_product() {
        // a_ij = c_i c_j exactly for c = [1, 1, 0]: one edge 0-1
        let rows = vec![vec![(1, 1.0)], vec![(0, 1.0)], vec![]];
        let fit = pattern_correlation(&rows, &[1.0, 1.0, 0.0]);
        assert!((fit - 1.0).abs() < 1e-12);
    }
}
