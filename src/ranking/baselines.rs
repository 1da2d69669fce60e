//! Baseline path rankers
//!
//! Every ranker scores a list of candidate paths and returns them sorted by
//! score, highest first. Equal scores keep their input order.

use crate::algorithms::pagerank::{pagerank, PageRankConfig};
use crate::algorithms::path::Path;
use crate::error::{AnalysisError, Result};
use crate::ranking::rng::SeededRandom;
use crate::storage::{Graph, Identified};
use rand::seq::SliceRandom;
use std::collections::BTreeMap;
use tracing::{debug, instrument};

/// A path with its score
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RankedPath {
    /// The scored path
    pub path: Path,
    /// Ranking score (higher is better)
    pub score: f64,
    /// Auxiliary per-ranker values
    pub details: BTreeMap<String, f64>,
}

impl RankedPath {
    fn new(path: Path, score: f64) -> Self {
        Self {
            path,
            score,
            details: BTreeMap::new(),
        }
    }

    fn with_detail(mut self, key: &str, value: f64) -> Self {
        self.details.insert(key.to_string(), value);
        self
    }
}

/// Stable sort by descending score
fn sort_by_score(mut ranked: Vec<RankedPath>) -> Vec<RankedPath> {
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked
}

#[allow(clippy::cast_precision_loss)]
fn mean(total: f64, count: usize) -> f64 {
    if count == 0 {
        0.0
    } else {
        total / count as f64
    }
}

/// Seeded shuffle with decreasing synthetic scores `(n − i) / n`
///
/// The same seed always yields the same order and scores.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn random_ranker(paths: &[Path], seed: u64) -> Vec<RankedPath> {
    let mut order: Vec<usize> = (0..paths.len()).collect();
    order.shuffle(&mut SeededRandom::new(seed));

    let n = paths.len() as f64;
    order
        .into_iter()
        .enumerate()
        .map(|(position, index)| {
            RankedPath::new(paths[index].clone(), (n - position as f64) / n)
                .with_detail("original_index", index as f64)
        })
        .collect()
}

/// Score by the mean total degree of the path's nodes
///
/// # Errors
///
/// `NodeNotFound` if a path mentions a node missing from `graph`.
#[instrument(skip_all, fields(paths = paths.len()))]
pub fn degree_ranker<N: Identified, E>(graph: &Graph<N, E>, paths: &[Path]) -> Result<Vec<RankedPath>> {
    let ranked = paths
        .iter()
        .map(|path| {
            let mut total = 0.0;
            for id in &path.nodes {
                #[allow(clippy::cast_precision_loss)]
                let degree = graph.degree(id)? as f64;
                total += degree;
            }
            let score = mean(total, path.nodes.len());
            Ok(RankedPath::new(path.clone(), score).with_detail("degree_sum", total))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(sort_by_score(ranked))
}

/// Score by the summed `PageRank` of the path's nodes
///
/// `PageRank` is computed once over the whole graph.
///
/// # Errors
///
/// `InvalidParameter` for an invalid config, `NodeNotFound` if a path
/// mentions a node missing from `graph`.
#[instrument(skip_all, fields(paths = paths.len(), damping = config.damping))]
pub fn pagerank_ranker<N: Identified, E>(
    graph: &Graph<N, E>,
    paths: &[Path],
    config: &PageRankConfig,
) -> Result<Vec<RankedPath>> {
    let ranks = pagerank(graph, config)?;
    debug!(iterations = ranks.iterations, "pagerank ready for ranking");

    let ranked = paths
        .iter()
        .map(|path| {
            let mut total = 0.0;
            for id in &path.nodes {
                total += ranks
                    .score(id)
                    .ok_or_else(|| AnalysisError::NodeNotFound(id.clone()))?;
            }
            Ok(RankedPath::new(path.clone(), total)
                .with_detail("mean_pagerank", mean(total, path.nodes.len())))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(sort_by_score(ranked))
}

/// Score shorter paths higher: `1 / (edges + 1)`
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn shortest_path_ranker(paths: &[Path]) -> Vec<RankedPath> {
    let ranked = paths
        .iter()
        .map(|path| {
            let edges = path.edge_count() as f64;
            RankedPath::new(path.clone(), 1.0 / (edges + 1.0)).with_detail("edges", edges)
        })
        .collect();
    sort_by_score(ranked)
}

/// Score by the mean of `weight_fn(edge_id)` over the path's edges
///
/// Paths without edges score `0`.
pub fn weight_ranker<F>(paths: &[Path], weight_fn: F) -> Vec<RankedPath>
where
    F: Fn(&str) -> f64,
{
    let ranked = paths
        .iter()
        .map(|path| {
            let total: f64 = path.edges.iter().map(|edge| weight_fn(edge)).sum();
            RankedPath::new(path.clone(), mean(total, path.edges.len()))
                .with_detail("weight_sum", total)
        })
        .collect();
    sort_by_score(ranked)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(nodes: &[&str]) -> Path {
        Path {
            nodes: nodes.iter().map(|s| (*s).to_string()).collect(),
            edges: nodes.windows(2).map(|w| format!("{}{}", w[0], w[1])).collect(),
            total_weight: nodes.len().saturating_sub(1) as f64,
        }
    }

    /// Star around `hub` plus a tail hub-a-b
    fn star() -> Graph<String> {
        let mut graph = Graph::undirected();
        for id in ["hub", "a", "b", "c", "d"] {
            graph.add_node(id.to_string());
        }
        for (s, t) in [("hub", "a"), ("hub", "c"), ("hub", "d"), ("a", "b")] {
            graph.add_edge(format!("{s}{t}"), s, t, ()).unwrap();
        }
        graph
    }

    fn order(ranked: &[RankedPath]) -> Vec<String> {
        ranked.iter().map(|r| r.path.nodes.join("-")).collect()
    }

    #[test]
    fn test_shortest_path_scores() {
        let ranked = shortest_path_ranker(&[path(&["a", "b", "c"]), path(&["a"]), path(&["a", "b"])]);

        assert_eq!(order(&ranked), vec!["a", "a-b", "a-b-c"]);
        assert!((ranked[0].score - 1.0).abs() < 1e-12);
        assert!((ranked[2].score - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_random_ranker_reproducible() {
        let paths: Vec<Path> = (0..10).map(|i| path(&[&format!("n{i}")])).collect();
        let first = random_ranker(&paths, 42);
        let second = random_ranker(&paths, 42);

        assert_eq!(first, second);
        assert!((first[0].score - 1.0).abs() < 1e-12);
        assert!((first[9].score - 0.1).abs() < 1e-12);
        assert!(first.windows(2).all(|w| w[0].score > w[1].score));
        assert_ne!(order(&first), order(&random_ranker(&paths, 7)));
    }

    #[test]
    fn test_random_ranker_empty() {
        assert!(random_ranker(&[], 1).is_empty());
    }

    #[test]
    fn test_degree_ranker_prefers_hub() {
        let graph = star();
        let ranked = degree_ranker(&graph, &[path(&["a", "b"]), path(&["hub", "c"])]).unwrap();

        assert_eq!(order(&ranked), vec!["hub-c", "a-b"]);
        assert!((ranked[0].score - 2.0).abs() < 1e-12);
        assert_eq!(ranked[0].details["degree_sum"], 4.0);
    }

    #[test]
    fn test_degree_ranker_unknown_node() {
        let graph = star();
        assert_eq!(
            degree_ranker(&graph, &[path(&["zzz"])]),
            Err(AnalysisError::NodeNotFound("zzz".to_string()))
        );
    }

    #[test]
    fn test_pagerank_ranker_prefers_hub() {
        let graph = star();
        let ranked = pagerank_ranker(
            &graph,
            &[path(&["b"]), path(&["hub"])],
            &PageRankConfig::default(),
        )
        .unwrap();

        assert_eq!(ranked[0].path.nodes, vec!["hub"]);
        assert!(ranked[0].score > ranked[1].score);
    }

    #[test]
    fn test_weight_ranker_mean_and_ties() {
        let weights = |edge: &str| if edge == "ab" { 3.0 } else { 1.0 };
        let ranked = weight_ranker(
            &[path(&["x"]), path(&["b", "c"]), path(&["a", "b", "c"]), path(&["c", "d"])],
            weights,
        );

        assert_eq!(order(&ranked), vec!["a-b-c", "b-c", "c-d", "x"]);
        assert!((ranked[0].score - 2.0).abs() < 1e-12);
        assert_eq!(ranked[3].score, 0.0);
    }
}
