//! Spectral clustering
//!
//! Embeds nodes with the eigenvectors of the symmetric normalized Laplacian
//! `L = I − D^-½ A D^-½` and clusters the embedding with k-means.
//!
//! The smallest non-trivial eigenvectors of `L` are the largest of
//! `M = ½(I + D^-½ A D^-½)`, whose spectrum lies in `[0, 1]`. They are found
//! by subspace iteration on `M` with the trivial eigenvector `D^½ 1` deflated,
//! followed by a Rayleigh–Ritz projection. Embedding rows are rescaled by
//! `D^-½` (random-walk eigenvectors) and columns by `μ^-½` for Laplacian
//! eigenvalue `μ`, so the slowest-mixing directions dominate seeded k-means++.
//!
//! Edge direction is ignored. Clusters are split into connected pieces, so
//! components are never merged.
//!
//! # References
//! - von Luxburg (2007): "A tutorial on spectral clustering"
//! - Arthur & Vassilvitskii (2007): "k-means++: the advantages of careful seeding"

use super::network::{renumber, Network};
use super::{build_result, metadata, CommunityDetectionResult};
use crate::error::{AnalysisError, Result};
use crate::ranking::rng::SeededRandom;
use crate::storage::{CsrSnapshot, Graph, Identified, Orientation};
use nalgebra::{DMatrix, SymmetricEigen};
use rand::Rng;
use tracing::{debug, instrument, warn};

/// Floor for Laplacian eigenvalues when weighting embedding columns
const MIN_EIGENGAP: f64 = 1e-12;

/// Parameters for [`spectral`]
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SpectralConfig {
    /// Number of clusters k (default: 2)
    pub num_clusters: usize,
    /// Largest Ritz value change that counts as converged (default: 1e-9)
    pub tolerance: f64,
    /// Subspace iteration cap (default: 1000)
    pub max_eigen_iterations: usize,
    /// Lloyd iteration cap (default: 100)
    pub kmeans_max_iterations: usize,
    /// Seed for the start subspace and k-means++ (default: 42)
    pub seed: u64,
}

impl Default for SpectralConfig {
    fn default() -> Self {
        Self {
            num_clusters: 2,
            tolerance: 1e-9,
            max_eigen_iterations: 1000,
            kmeans_max_iterations: 100,
            seed: 42,
        }
    }
}

impl SpectralConfig {
    /// Set the number of clusters
    #[must_use]
    pub const fn with_num_clusters(mut self, num_clusters: usize) -> Self {
        self.num_clusters = num_clusters;
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
    /// `InvalidParameter` when `num_clusters` is zero, the tolerance is not
    /// positive, or an iteration cap is zero.
    pub fn validate(&self) -> Result<()> {
        if self.num_clusters == 0 {
            return Err(AnalysisError::invalid("num_clusters", "must be at least 1"));
        }
        if self.tolerance.is_nan() || self.tolerance <= 0.0 {
            return Err(AnalysisError::invalid("tolerance", "must be positive"));
        }
        if self.max_eigen_iterations == 0 {
            return Err(AnalysisError::invalid(
                "max_eigen_iterations",
                "must be at least 1",
            ));
        }
        if self.kmeans_max_iterations == 0 {
            return Err(AnalysisError::invalid(
                "kmeans_max_iterations",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

/// `M = ½(I + D^-½ A D^-½)` in CSR form
struct Operator<'a, 'g> {
    csr: &'a CsrSnapshot<'g>,
    inv_sqrt_degree: Vec<f64>,
    /// Unit trivial eigenvector `D^½ 1 / ‖D^½ 1‖`
    trivial: Vec<f64>,
}

impl<'a, 'g> Operator<'a, 'g> {
    fn new(csr: &'a CsrSnapshot<'g>, strength: &[f64]) -> Self {
        let inv_sqrt_degree = strength
            .iter()
            .map(|&d| if d > 0.0 { 1.0 / d.sqrt() } else { 0.0 })
            .collect();
        let norm = strength.iter().sum::<f64>().sqrt();
        let trivial = strength.iter().map(|&d| d.sqrt() / norm).collect();
        Self {
            csr,
            inv_sqrt_degree,
            trivial,
        }
    }

    fn apply(&self, x: &DMatrix<f64>) -> DMatrix<f64> {
        let (n, b) = x.shape();
        let mut y = x * 0.5;
        for i in 0..n {
            let s_i = self.inv_sqrt_degree[i];
            if s_i <= 0.0 {
                continue;
            }
            let (targets, weights) = self.csr.outgoing(i);
            for (&j, &w) in targets.iter().zip(weights) {
                let coeff = 0.5 * s_i * w * self.inv_sqrt_degree[j];
                for c in 0..b {
                    y[(i, c)] += coeff * x[(j, c)];
                }
            }
        }
        y
    }

    /// Project out the trivial eigenvector from every column
    fn deflate(&self, x: &mut DMatrix<f64>) {
        let (n, b) = x.shape();
        for c in 0..b {
            let dot: f64 = (0..n).map(|i| self.trivial[i] * x[(i, c)]).sum();
            for i in 0..n {
                x[(i, c)] -= dot * self.trivial[i];
            }
        }
    }

    /// Ritz pairs of `M` on the column space of orthonormal `q`, largest first
    fn ritz(&self, q: &DMatrix<f64>) -> (Vec<f64>, DMatrix<f64>) {
        let projected = q.transpose() * self.apply(q);
        let symmetric = (&projected + projected.transpose()) * 0.5;
        let eigen = SymmetricEigen::new(symmetric);

        let mut order: Vec<usize> = (0..eigen.eigenvalues.len()).collect();
        order.sort_by(|&a, &b| eigen.eigenvalues[b].total_cmp(&eigen.eigenvalues[a]));

        let values = order.iter().map(|&i| eigen.eigenvalues[i]).collect();
        let vectors = DMatrix::from_fn(eigen.eigenvectors.nrows(), order.len(), |r, c| {
            eigen.eigenvectors[(r, order[c])]
        });
        (values, vectors)
    }
}

/// Subspace iteration for the `dimensions` leading non-trivial eigenvectors
///
/// Returns the `D^-½`-scaled embedding (one row per node), the iterations
/// used and whether the Ritz values settled within `tolerance`.
fn embed(
    operator: &Operator<'_, '_>,
    dimensions: usize,
    config: &SpectralConfig,
    rng: &mut SeededRandom,
) -> (Vec<Vec<f64>>, usize, bool) {
    let n = operator.inv_sqrt_degree.len();
    let mut start = DMatrix::from_fn(n, dimensions, |_, _| rng.next_f64() - 0.5);
    operator.deflate(&mut start);
    let mut q = start.qr().q();

    let mut previous = vec![f64::INFINITY; dimensions];
    let mut iterations = 0;
    let mut converged = false;

    while iterations < config.max_eigen_iterations {
        iterations += 1;
        let mut z = operator.apply(&q);
        operator.deflate(&mut z);
        q = z.qr().q();

        let (values, _) = operator.ritz(&q);
        let change = values
            .iter()
            .zip(&previous)
            .map(|(a, b)| (a - b).abs())
            .fold(0.0_f64, f64::max);
        previous = values;
        if change < config.tolerance {
            converged = true;
            break;
        }
    }

    let (values, vectors) = operator.ritz(&q);
    debug!(iterations, ?values, "subspace iteration finished");

    // Commute-time scaling: Laplacian eigenvalue μ = 2(1 − λ) weighs μ^-½
    let column_weight: Vec<f64> = values
        .iter()
        .map(|&lambda| 1.0 / (2.0 * (1.0 - lambda)).max(MIN_EIGENGAP).sqrt())
        .collect();

    let basis = &q * vectors;
    let embedding = (0..n)
        .map(|i| {
            (0..dimensions)
                .map(|c| basis[(i, c)] * column_weight[c] * operator.inv_sqrt_degree[i])
                .collect()
        })
        .collect();
    (embedding, iterations, converged)
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// k-means++ seeding followed by Lloyd iterations
///
/// Returns labels, Lloyd iterations and whether assignments settled.
fn kmeans(
    points: &[Vec<f64>],
    k: usize,
    max_iterations: usize,
    rng: &mut SeededRandom,
) -> (Vec<usize>, usize, bool) {
    let n = points.len();
    let mut centers: Vec<Vec<f64>> = vec![points[rng.gen_range(0..n)].clone()];
    let mut nearest: Vec<f64> = points
        .iter()
        .map(|p| squared_distance(p, &centers[0]))
        .collect();

    while centers.len() < k {
        let total: f64 = nearest.iter().sum();
        let pick = if total > 0.0 {
            let target = rng.next_f64() * total;
            let mut acc = 0.0;
            let mut chosen = n - 1;
            for (i, &d) in nearest.iter().enumerate() {
                acc += d;
                if acc >= target && d > 0.0 {
                    chosen = i;
                    break;
                }
            }
            chosen
        } else {
            rng.gen_range(0..n)
        };
        let center = points[pick].clone();
        for (d, p) in nearest.iter_mut().zip(points) {
            *d = d.min(squared_distance(p, &center));
        }
        centers.push(center);
    }

    let dims = points.first().map_or(0, Vec::len);
    let mut labels = vec![usize::MAX; n];
    let mut iterations = 0;
    let mut converged = false;

    while iterations < max_iterations {
        iterations += 1;
        let mut changed = false;
        for (point, label) in points.iter().zip(labels.iter_mut()) {
            let mut best = 0;
            let mut best_distance = f64::INFINITY;
            for (c, center) in centers.iter().enumerate() {
                let distance = squared_distance(point, center);
                if distance < best_distance {
                    best = c;
                    best_distance = distance;
                }
            }
            if *label != best {
                *label = best;
                changed = true;
            }
        }
        if !changed {
            converged = true;
            break;
        }

        let mut sums = vec![vec![0.0; dims]; k];
        let mut counts = vec![0_usize; k];
        for (point, &label) in points.iter().zip(&labels) {
            counts[label] += 1;
            for (s, x) in sums[label].iter_mut().zip(point) {
                *s += x;
            }
        }
        for ((center, sum), &count) in centers.iter_mut().zip(sums).zip(&counts) {
            if count > 0 {
                #[allow(clippy::cast_precision_loss)]
                let scale = 1.0 / count as f64;
                *center = sum.into_iter().map(|s| s * scale).collect();
            }
        }
    }

    (labels, iterations, converged)
}

/// Detect communities by spectral clustering
///
/// `num_clusters` is clamped to `n − 1` on graphs with edges. A graph with at
/// least as many connected components as requested clusters returns its
/// components.
///
/// # Errors
///
/// `InvalidParameter` for an invalid config or a negative edge weight,
/// `Numerical` if the embedding is not finite.
#[instrument(skip_all, fields(nodes = graph.node_count(), edges = graph.edge_count(), k = config.num_clusters))]
pub fn spectral<N: Identified, E>(
    graph: &Graph<N, E>,
    config: &SpectralConfig,
) -> Result<CommunityDetectionResult> {
    config.validate()?;

    let csr = CsrSnapshot::from_graph(graph, Orientation::Symmetric);
    let net = Network::from_csr(&csr)?;
    let n = net.len();

    if !net.has_links() {
        debug!("no links, every node is its own community");
        let singletons: Vec<usize> = (0..n).collect();
        return Ok(build_result(&csr, &net, &singletons, metadata("spectral", 0, true)));
    }

    let (components, component_count) = renumber(&csr.connected_components());
    let k = config.num_clusters.min(n - 1);
    if k <= component_count {
        debug!(components = component_count, "requested clusters covered by components");
        return Ok(build_result(&csr, &net, &components, metadata("spectral", 0, true)));
    }

    let mut rng = SeededRandom::new(config.seed);
    let operator = Operator::new(&csr, &net.strength);
    let (embedding, eigen_iterations, eigen_converged) = embed(&operator, k, config, &mut rng);

    if embedding.iter().flatten().any(|x| !x.is_finite()) {
        return Err(AnalysisError::numerical(
            "spectral",
            "embedding contains non-finite values",
        ));
    }
    if !eigen_converged {
        warn!(
            max_eigen_iterations = config.max_eigen_iterations,
            "subspace iteration hit iteration cap"
        );
    }

    let (clusters, kmeans_iterations, kmeans_converged) =
        kmeans(&embedding, k, config.kmeans_max_iterations, &mut rng);
    debug!(kmeans_iterations, kmeans_converged, "k-means finished");

    let (mut labels, count) = net.split_disconnected(&clusters);
    if count == n {
        debug!("clustering left only singletons, using connected components");
        labels = components;
    }

    Ok(build_result(
        &csr,
        &net,
        &labels,
        metadata("spectral", eigen_iterations, eigen_converged && kmeans_converged),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithms::community::is_partition_of;

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

    fn cliques_in_a_row(count: usize, size: usize) -> Graph<String> {
        let mut edges = Vec::new();
        for c in 0..count {
            let base = c * size;
            for i in 0..size {
                for j in (i + 1)..size {
                    edges.push((base + i, base + j));
                }
            }
            if c + 1 < count {
                edges.push((base + size - 1, base + size));
            }
        }
        undirected(count * size, &edges)
    }

    #[test]
    fn test_two_cliques() {
        let graph = cliques_in_a_row(2, 6);
        let result = spectral(&graph, &SpectralConfig::default()).unwrap();

        assert_eq!(result.num_communities, 2);
        assert_eq!(result.communities[0], (0..6).map(|i| format!("n{i}")).collect::<Vec<_>>());
        assert_eq!(result.metadata.algorithm, "spectral");
    }

    #[test]
    fn test_three_cliques() {
        let graph = cliques_in_a_row(3, 5);
        let result = spectral(&graph, &SpectralConfig::default().with_num_clusters(3)).unwrap();

        assert_eq!(result.num_communities, 3);
        for c in 0..3 {
            let first = result.get_community(&format!("n{}", c * 5));
            for i in 1..5 {
                assert_eq!(result.get_community(&format!("n{}", c * 5 + i)), first);
            }
        }
    }

    #[test]
    fn test_components_returned_when_enough() {
        let graph = undirected(6, &[(0, 1), (1, 2), (3, 4), (4, 5)]);
        let result = spectral(&graph, &SpectralConfig::default()).unwrap();

        assert_eq!(result.num_communities, 2);
        assert_ne!(result.get_community("n0"), result.get_community("n3"));
    }

    #[test]
    fn test_cluster_count_clamped_below_node_count() {
        let graph = undirected(3, &[(0, 1), (1, 2)]);
        let result = spectral(&graph, &SpectralConfig::default().with_num_clusters(10)).unwrap();

        assert!(result.num_communities < 3);
        assert!(is_partition_of(&graph, &result.communities));
    }

    #[test]
    fn test_deterministic_for_seed() {
        let graph = cliques_in_a_row(3, 4);
        let config = SpectralConfig::default().with_num_clusters(3).with_seed(5);
        assert_eq!(spectral(&graph, &config).unwrap(), spectral(&graph, &config).unwrap());
    }

    #[test]
    fn test_zero_clusters_rejected() {
        let graph = cliques_in_a_row(2, 3);
        assert!(matches!(
            spectral(&graph, &SpectralConfig::default().with_num_clusters(0)),
            Err(AnalysisError::InvalidParameter { name: "num_clusters", .. })
        ));
    }

    #[test]
    fn test_kmeans_separates_blobs() {
        let points = vec![
            vec![0.0, 0.0],
            vec![0.1, 0.0],
            vec![10.0, 10.0],
            vec![10.1, 10.0],
        ];
        let (labels, _, converged) = kmeans(&points, 2, 50, &mut SeededRandom::new(1));

        assert!(converged);
        assert_eq!(labels[0], labels[1]);
        assert_eq!(labels[2], labels[3]);
        assert_ne!(labels[0], labels[2]);
    }

    #[test]
    fn test_operator_fixes_trivial_vector() {
        let graph = cliques_in_a_row(2, 3);
        let csr = CsrSnapshot::from_graph(&graph, Orientation::Symmetric);
        let net = Network::from_csr(&csr).unwrap();
        let operator = Operator::new(&csr, &net.strength);

        let trivial = DMatrix::from_column_slice(6, 1, &operator.trivial);
        let image = operator.apply(&trivial);
        for i in 0..6 {
            assert!((image[(i, 0)] - trivial[(i, 0)]).abs() < 1e-12);
        }
    }
}
