//! Rank-correlation and information-retrieval metrics
//!
//! All functions are pure and total: degenerate inputs yield a neutral value
//! instead of an error. Rankings are slices of ids, best first; anything that
//! implements `AsRef<str>` works, so `&["a", "b"]` and `Vec<String>` both do.

use std::collections::{HashMap, HashSet};

/// Positions of the items present in both rankings, re-ranked `0..m` in each
fn shared_ranks<A: AsRef<str>, B: AsRef<str>>(a: &[A], b: &[B]) -> Vec<(usize, usize)> {
    let mut in_b: HashMap<&str, usize> = HashMap::new();
    for item in b {
        let next = in_b.len();
        in_b.entry(item.as_ref()).or_insert(next);
    }
    let mut seen: HashSet<&str> = HashSet::new();
    let shared: Vec<usize> = a
        .iter()
        .map(AsRef::as_ref)
        .filter(|&item| seen.insert(item))
        .filter_map(|item| in_b.get(item).copied())
        .collect();

    // Dense re-rank of the b positions among shared items
    let mut by_b: Vec<usize> = (0..shared.len()).collect();
    by_b.sort_by_key(|&i| shared[i]);
    let mut rank_b = vec![0; shared.len()];
    for (rank, &i) in by_b.iter().enumerate() {
        rank_b[i] = rank;
    }

    rank_b.into_iter().enumerate().collect()
}

/// Spearman's ρ over the items both rankings contain
///
/// Returns `0.0` when fewer than two items are shared.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn spearman_correlation<A: AsRef<str>, B: AsRef<str>>(a: &[A], b: &[B]) -> f64 {
    let pairs = shared_ranks(a, b);
    let m = pairs.len();
    if m < 2 {
        return 0.0;
    }
    let squared: f64 = pairs
        .iter()
        .map(|&(ra, rb)| {
            let d = ra as f64 - rb as f64;
            d * d
        })
        .sum();
    let m = m as f64;
    1.0 - 6.0 * squared / (m * (m * m - 1.0))
}

/// Kendall's τ over the items both rankings contain
///
/// Returns `1.0` when fewer than two items are shared.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn kendall_tau<A: AsRef<str>, B: AsRef<str>>(a: &[A], b: &[B]) -> f64 {
    let pairs = shared_ranks(a, b);
    let m = pairs.len();
    if m < 2 {
        return 1.0;
    }
    let mut balance: i64 = 0;
    for i in 0..m {
        for j in (i + 1)..m {
            // a-ranks are increasing with the index
            if pairs[i].1 < pairs[j].1 {
                balance += 1;
            } else {
                balance -= 1;
            }
        }
    }
    let total = (m * (m - 1) / 2) as f64;
    balance as f64 / total
}

fn discounted_gain<S: AsRef<str>>(ranking: &[S], relevance: &HashMap<&str, f64>, k: usize) -> f64 {
    let mut seen: HashSet<&str> = HashSet::new();
    ranking
        .iter()
        .map(AsRef::as_ref)
        .take(k)
        .enumerate()
        .filter(|&(_, item)| seen.insert(item))
        .map(|(position, item)| {
            let gain = relevance.get(item).copied().unwrap_or(0.0);
            #[allow(clippy::cast_precision_loss)]
            let discount = ((position + 2) as f64).log2();
            gain / discount
        })
        .sum()
}

fn ndcg_from<S: AsRef<str>>(predicted: &[S], relevance: &HashMap<&str, f64>, k: Option<usize>) -> f64 {
    if predicted.is_empty() {
        return 0.0;
    }
    let k = k.unwrap_or(predicted.len().max(relevance.len()));

    let mut ideal: Vec<f64> = relevance.values().copied().filter(|&r| r > 0.0).collect();
    ideal.sort_by(|x, y| y.total_cmp(x));
    let idcg: f64 = ideal
        .iter()
        .take(k)
        .enumerate()
        .map(|(position, gain)| {
            #[allow(clippy::cast_precision_loss)]
            let discount = ((position + 2) as f64).log2();
            gain / discount
        })
        .sum();

    if idcg <= 0.0 {
        return 1.0;
    }
    discounted_gain(predicted, relevance, k) / idcg
}

/// Normalized discounted cumulative gain against an ideal ordering
///
/// Relevance is graded by position in `ideal`: the first item is worth
/// `ideal.len()`, the last `1`. `k = None` scores the whole list.
/// Empty `predicted` scores `0.0`; an empty `ideal` scores `1.0`.
#[must_use]
pub fn ndcg<P: AsRef<str>, I: AsRef<str>>(predicted: &[P], ideal: &[I], k: Option<usize>) -> f64 {
    let mut relevance = HashMap::new();
    for (position, item) in ideal.iter().enumerate() {
        #[allow(clippy::cast_precision_loss)]
        let grade = (ideal.len() - position) as f64;
        relevance.entry(item.as_ref()).or_insert(grade);
    }
    ndcg_from(predicted, &relevance, k)
}

/// NDCG with explicit graded relevance per item
///
/// Items missing from `relevance` are worth `0`. Returns `1.0` when no item
/// carries positive relevance.
#[must_use]
pub fn ndcg_with_relevance<P: AsRef<str>>(
    predicted: &[P],
    relevance: &HashMap<String, f64>,
    k: Option<usize>,
) -> f64 {
    let relevance: HashMap<&str, f64> = relevance.iter().map(|(id, &r)| (id.as_str(), r)).collect();
    ndcg_from(predicted, &relevance, k)
}

fn relevant_set<R: AsRef<str>>(relevant: &[R]) -> HashSet<&str> {
    relevant.iter().map(|item| item.as_ref()).collect()
}

/// Average precision of one ranking: mean of precision@i over the ranks
/// `i` that hold a relevant item, divided across all relevant items
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn mean_average_precision<P: AsRef<str>, R: AsRef<str>>(predicted: &[P], relevant: &[R]) -> f64 {
    let relevant = relevant_set(relevant);
    if predicted.is_empty() || relevant.is_empty() {
        return 0.0;
    }

    let mut seen: HashSet<&str> = HashSet::new();
    let mut hits = 0_usize;
    let mut total = 0.0;
    for (position, item) in predicted.iter().enumerate() {
        let item = item.as_ref();
        if relevant.contains(item) && seen.insert(item) {
            hits += 1;
            total += hits as f64 / (position + 1) as f64;
        }
    }
    total / relevant.len() as f64
}

/// Reciprocal rank of the first relevant item (`0.0` if none appears)
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn mean_reciprocal_rank<P: AsRef<str>, R: AsRef<str>>(predicted: &[P], relevant: &[R]) -> f64 {
    let relevant = relevant_set(relevant);
    predicted
        .iter()
        .position(|item| relevant.contains(item.as_ref()))
        .map_or(0.0, |position| 1.0 / (position + 1) as f64)
}

fn hits_at_k<P: AsRef<str>>(predicted: &[P], relevant: &HashSet<&str>, k: usize) -> usize {
    let mut seen: HashSet<&str> = HashSet::new();
    predicted
        .iter()
        .map(AsRef::as_ref)
        .take(k)
        .filter(|&item| relevant.contains(item) && seen.insert(item))
        .count()
}

/// Fraction of the top `k` predictions that are relevant
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn precision_at_k<P: AsRef<str>, R: AsRef<str>>(predicted: &[P], relevant: &[R], k: usize) -> f64 {
    let relevant = relevant_set(relevant);
    if predicted.is_empty() || relevant.is_empty() || k == 0 {
        return 0.0;
    }
    hits_at_k(predicted, &relevant, k) as f64 / k as f64
}

/// Fraction of the relevant items found in the top `k` predictions
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn recall_at_k<P: AsRef<str>, R: AsRef<str>>(predicted: &[P], relevant: &[R], k: usize) -> f64 {
    let relevant = relevant_set(relevant);
    if predicted.is_empty() || relevant.is_empty() {
        return 0.0;
    }
    hits_at_k(predicted, &relevant, k) as f64 / relevant.len() as f64
}

/// Every IR metric for one predicted ranking
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EvaluationReport {
    /// Cutoff used for the `@k` metrics
    pub k: usize,
    /// Precision in the top `k`
    pub precision_at_k: f64,
    /// Recall in the top `k`
    pub recall_at_k: f64,
    /// NDCG in the top `k`, binary relevance
    pub ndcg_at_k: f64,
    /// Average precision over the full ranking
    pub mean_average_precision: f64,
    /// Reciprocal rank of the first hit
    pub mean_reciprocal_rank: f64,
}

/// Score `predicted` against a relevant set
#[must_use]
pub fn evaluate<P: AsRef<str>, R: AsRef<str>>(predicted: &[P], relevant: &[R], k: usize) -> EvaluationReport {
    let binary: HashMap<&str, f64> = relevant.iter().map(|item| (item.as_ref(), 1.0)).collect();
    let ndcg_at_k = if relevant.is_empty() {
        0.0
    } else {
        ndcg_from(predicted, &binary, Some(k))
    };

    EvaluationReport {
        k,
        precision_at_k: precision_at_k(predicted, relevant, k),
        recall_at_k: recall_at_k(predicted, relevant, k),
        ndcg_at_k,
        mean_average_precision: mean_average_precision(predicted, relevant),
        mean_reciprocal_rank: mean_reciprocal_rank(predicted, relevant),
    }
}

/// Agreement between two rankings of overlapping items
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RankAgreement {
    /// Items present in both rankings
    pub common_items: usize,
    /// Spearman's ρ over the common items
    pub spearman: f64,
    /// Kendall's τ over the common items
    pub kendall_tau: f64,
}

/// Compare two rankings with both correlation measures
#[must_use]
pub fn compare_rankings<A: AsRef<str>, B: AsRef<str>>(a: &[A], b: &[B]) -> RankAgreement {
    RankAgreement {
        common_items: shared_ranks(a, b).len(),
        spearman: spearman_correlation(a, b),
        kendall_tau: kendall_tau(a, b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EMPTY: [&str; 0] = [];

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_spearman_identity_and_reverse() {
        let r = ["a", "b", "c", "d", "e"];
        let mut reversed = r;
        reversed.reverse();

        assert!(close(spearman_correlation(&r, &r), 1.0));
        assert!(close(spearman_correlation(&r, &reversed), -1.0));
    }

    #[test]
    fn test_spearman_ignores_unshared_items() {
        let a = ["a", "x", "b", "c"];
        let b = ["a", "b", "y", "c"];
        assert!(close(spearman_correlation(&a, &b), 1.0));
    }

    #[test]
    fn test_neutral_values() {
        assert_eq!(spearman_correlation(&EMPTY, &EMPTY), 0.0);
        assert_eq!(kendall_tau(&EMPTY, &EMPTY), 1.0);
        assert_eq!(spearman_correlation(&["a"], &["a"]), 0.0);
        assert_eq!(kendall_tau(&["a", "b"], &["c", "d"]), 1.0);
    }

    #[test]
    fn test_kendall_single_swap() {
        // One discordant pair out of three
        let tau = kendall_tau(&["a", "b", "c"], &["b", "a", "c"]);
        assert!(close(tau, 1.0 / 3.0));
        assert!(close(kendall_tau(&["a", "b", "c"], &["c", "b", "a"]), -1.0));
    }

    #[test]
    fn test_ndcg_perfect_and_degenerate() {
        let ideal = ["a", "b", "c"];
        assert!(close(ndcg(&ideal, &ideal, None), 1.0));
        assert_eq!(ndcg(&EMPTY, &ideal, None), 0.0);
        assert_eq!(ndcg(&ideal, &EMPTY, None), 1.0);
    }

    #[test]
    fn test_ndcg_penalises_misordering() {
        let ideal = ["a", "b", "c"];
        let swapped = ndcg(&["c", "b", "a"], &ideal, None);
        assert!(swapped < 1.0);
        assert!(swapped > 0.0);
        // Irrelevant head pushes gain down
        assert!(ndcg(&["x", "a", "b", "c"], &ideal, None) < 1.0);
    }

    #[test]
    fn test_ndcg_cutoff() {
        let ideal = ["a", "b", "c"];
        assert!(close(ndcg(&["a", "x", "y"], &ideal, Some(1)), 1.0));
        assert!(ndcg(&["a", "x", "y"], &ideal, Some(3)) < 1.0);
    }

    #[test]
    fn test_ndcg_with_relevance() {
        let mut relevance = HashMap::new();
        relevance.insert("a".to_string(), 3.0);
        relevance.insert("b".to_string(), 1.0);

        assert!(close(ndcg_with_relevance(&["a", "b"], &relevance, None), 1.0));
        let expected = (1.0 + 3.0 / 3_f64.log2()) / (3.0 + 1.0 / 3_f64.log2());
        assert!(close(ndcg_with_relevance(&["b", "a"], &relevance, None), expected));

        let zero: HashMap<String, f64> = HashMap::new();
        assert_eq!(ndcg_with_relevance(&["a"], &zero, None), 1.0);
    }

    #[test]
    fn test_reciprocal_rank() {
        assert!(close(mean_reciprocal_rank(&["X", "A", "B"], &["A", "B"]), 0.5));
        assert_eq!(mean_reciprocal_rank(&["X", "Y"], &["A"]), 0.0);
        assert_eq!(mean_reciprocal_rank(&EMPTY, &["A"]), 0.0);
    }

    #[test]
    fn test_precision_and_recall_at_k() {
        let predicted = ["A", "B", "X", "C", "Y"];
        assert!((precision_at_k(&predicted, &["A", "B", "C"], 3) - 2.0 / 3.0).abs() < 1e-3);
        assert!(close(recall_at_k(&predicted, &["A", "B", "C", "D"], 3), 0.5));

        assert_eq!(precision_at_k(&predicted, &EMPTY, 3), 0.0);
        assert_eq!(recall_at_k(&EMPTY, &["A"], 3), 0.0);
        assert_eq!(precision_at_k(&predicted, &["A"], 0), 0.0);
    }

    #[test]
    fn test_average_precision() {
        // Hits at ranks 1 and 3: (1/1 + 2/3) / 2
        let ap = mean_average_precision(&["A", "X", "B"], &["A", "B"]);
        assert!(close(ap, (1.0 + 2.0 / 3.0) / 2.0));
        // A relevant item never retrieved still counts in the denominator
        let partial = mean_average_precision(&["A"], &["A", "B"]);
        assert!(close(partial, 0.5));
        assert_eq!(mean_average_precision(&EMPTY, &["A"]), 0.0);
    }

    #[test]
    fn test_duplicates_not_double_counted() {
        assert!(close(precision_at_k(&["A", "A", "B"], &["A", "B"], 3), 2.0 / 3.0));
        assert!(mean_average_precision(&["A", "A"], &["A"]) <= 1.0);
    }

    #[test]
    fn test_evaluate_report() {
        let report = evaluate(&["A", "B", "X", "C", "Y"], &["A", "B", "C"], 3);

        assert_eq!(report.k, 3);
        assert!((report.precision_at_k - 0.667).abs() < 1e-3);
        assert!(close(report.recall_at_k, 2.0 / 3.0));
        assert!(close(report.mean_reciprocal_rank, 1.0));
        assert!(report.ndcg_at_k > 0.0 && report.ndcg_at_k < 1.0);

        let empty = evaluate(&["A"], &EMPTY, 3);
        assert_eq!(empty.ndcg_at_k, 0.0);
        assert_eq!(empty.mean_average_precision, 0.0);
    }

    #[test]
    fn test_compare_rankings() {
        let agreement = compare_rankings(&["a", "b", "c", "z"], &["c", "b", "a"]);
        assert_eq!(agreement.common_items, 3);
        assert!(close(agreement.spearman, -1.0));
        assert!(close(agreement.kendall_tau, -1.0));
    }
}
