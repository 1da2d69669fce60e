//! Path ranking baselines and evaluation metrics
//!
//! [`baselines`] score candidate paths; [`metrics`] compare a ranking with
//! ground truth or with another ranking. [`rng`] supplies the seeded
//! generator every randomized routine in the crate draws from.

pub mod baselines;
pub mod metrics;
pub mod rng;

pub use baselines::{
    degree_ranker, pagerank_ranker, random_ranker, shortest_path_ranker, weight_ranker, RankedPath,
};
pub use metrics::{
    compare_rankings, evaluate, kendall_tau, mean_average_precision, mean_reciprocal_rank, ndcg,
    ndcg_with_relevance, precision_at_k, recall_at_k, spearman_correlation, EvaluationReport,
    RankAgreement,
};
pub use rng::SeededRandom;
