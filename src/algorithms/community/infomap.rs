//! Infomap community detection (Rosvall & Bergstrom, 2008)
//!
//! Finds the two-level partition that minimizes the map equation, the
//! expected number of bits per step needed to describe a random walk:
//!
//! ```text
//! L(M) = q·H(Q) + Σ_i p_i·H(P_i)
//!      = plogp(q) − 2 Σ_i plogp(q_i) + Σ_i plogp(q_i + p_i) − Σ_α plogp(p_α)
//! ```
//!
//! `p_α` are node visit rates from `PageRank` with teleportation τ on the
//! graph's own direction and `q = Σ q_i`. The exit flow `q_i` of module `i`
//! counts both link flow to other modules and teleportation to nodes outside
//! it:
//!
//! ```text
//! q_i = Σ_{α∈i} Σ_{β∉i} p_α·w_αβ + (n − n_i)/n · Σ_{α∈i} t_α·p_α
//! ```
//!
//! where `t_α` is τ for nodes with out-links and 1 for dangling nodes, so
//! teleportation steps are encoded like any other step. The optimizer moves
//! single nodes to the module with the largest codelength decrease, then
//! collapses modules into super-nodes and repeats, like Louvain. Fine-tuning
//! rounds then move single nodes again against the found modules and
//! re-aggregate, which dissolves small fragments left by the first pass.
//!
//! # References
//! - Rosvall & Bergstrom (2008): "Maps of random walks on complex networks
//!   reveal community structure"

use super::network::{renumber, CommunityWeights, Network};
use super::{components_if_all_singletons, metadata, CommunityDetectionResult};
use crate::algorithms::pagerank::power_iteration;
use crate::error::{AnalysisError, Result};
use crate::ranking::rng::SeededRandom;
use crate::storage::{CsrSnapshot, Graph, Identified, Orientation};
use rand::seq::SliceRandom;
use std::collections::HashMap;
use tracing::{debug, instrument, warn};

/// Smallest codelength decrease that counts as an improvement
const MOVE_EPSILON: f64 = 1e-10;

const FLOW_MAX_ITERATIONS: usize = 1000;
const FLOW_TOLERANCE: f64 = 1e-13;

/// Parameters for [`infomap`]
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct InfomapConfig {
    /// Teleportation probability τ of the random walker, in `(0, 1)` (default: 0.15)
    pub teleportation: f64,
    /// Maximum node-moving sweeps per level (default: 100)
    pub max_passes: usize,
    /// Independent seeded runs; the shortest codelength wins (default: 1)
    pub trials: usize,
    /// Seed of the first trial (default: 42)
    pub seed: u64,
}

impl Default for InfomapConfig {
    fn default() -> Self {
        Self {
            teleportation: 0.15,
            max_passes: 100,
            trials: 1,
            seed: 42,
        }
    }
}

impl InfomapConfig {
    /// Set the teleportation probability
    #[must_use]
    pub const fn with_teleportation(mut self, teleportation: f64) -> Self {
        self.teleportation = teleportation;
        self
    }

    /// Set the sweep cap per level
    #[must_use]
    pub const fn with_max_passes(mut self, max_passes: usize) -> Self {
        self.max_passes = max_passes;
        self
    }

    /// Set the number of trials
    #[must_use]
    pub const fn with_trials(mut self, trials: usize) -> Self {
        self.trials = trials;
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
    /// `InvalidParameter` for τ outside `(0, 1)` or a zero count.
    pub fn validate(&self) -> Result<()> {
        if self.teleportation.is_nan() || self.teleportation <= 0.0 || self.teleportation >= 1.0 {
            return Err(AnalysisError::invalid(
                "teleportation",
                format!("must lie in (0, 1), got {}", self.teleportation),
            ));
        }
        if self.max_passes == 0 {
            return Err(AnalysisError::invalid("max_passes", "must be at least 1"));
        }
        if self.trials == 0 {
            return Err(AnalysisError::invalid("trials", "must be at least 1"));
        }
        Ok(())
    }
}

/// One module of the two-level map
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Module {
    /// Module index, ordered by first member's insertion index
    pub id: usize,
    /// Member ids in insertion order
    pub nodes: Vec<String>,
    /// Bits spent on this module's codebook: `plogp(q+p) − plogp(q) − Σ plogp(p_α)`
    pub description_length: f64,
    /// Stationary visit rate of the module, in `(0, 1]`
    pub visit_probability: f64,
    /// Members' share of the one-level codelength over `description_length`
    pub compression_ratio: f64,
}

/// Infomap outcome
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct InfomapResult {
    /// Modules; visit probabilities sum to 1
    pub modules: Vec<Module>,
    /// Map equation value of the partition, in bits
    pub codelength: f64,
    /// Codelength with every node in one module (node visit entropy)
    pub one_level_codelength: f64,
    /// `one_level_codelength / codelength` (1 when nothing is compressed)
    pub compression_ratio: f64,
    /// Node-moving sweeps performed by the winning trial
    pub iterations: usize,
    /// Whether no level of the winning trial hit the sweep cap
    pub converged: bool,
    /// Modularity of the module partition
    pub modularity: f64,
}

impl InfomapResult {
    /// Convert into the common community detection shape
    #[must_use]
    pub fn into_detection(self) -> CommunityDetectionResult {
        let communities: Vec<Vec<String>> = self.modules.into_iter().map(|m| m.nodes).collect();
        CommunityDetectionResult {
            num_communities: communities.len(),
            communities,
            modularity: self.modularity,
            metadata: metadata("infomap", self.iterations, self.converged),
        }
    }
}

fn plogp(x: f64) -> f64 {
    if x > 0.0 {
        x * x.log2()
    } else {
        0.0
    }
}

/// Visit rates and link flows between (super-)nodes, self-links dropped
#[derive(Debug, Clone)]
struct FlowNetwork {
    flow: Vec<f64>,
    /// Flow leaving each (super-)node by teleportation per step
    teleport: Vec<f64>,
    /// Base nodes inside each (super-)node
    size: Vec<usize>,
    /// Base node count, the teleportation targets
    total_nodes: usize,
    out_links: Vec<Vec<(usize, f64)>>,
    in_links: Vec<Vec<(usize, f64)>>,
}

/// Link exit, teleportation flow and size of a group of nodes
#[derive(Debug, Clone, Copy, Default)]
struct ExitParts {
    links: f64,
    teleport: f64,
    size: usize,
}

impl FlowNetwork {
    fn from_csr(csr: &CsrSnapshot<'_>, teleportation: f64) -> Self {
        let n = csr.num_nodes();
        let walk = power_iteration(csr, 1.0 - teleportation, FLOW_MAX_ITERATIONS, FLOW_TOLERANCE);
        if !walk.converged {
            warn!(
                iterations = walk.iterations,
                "visit rates did not reach tolerance"
            );
        }

        let mut out_links = Vec::with_capacity(n);
        let mut teleport = Vec::with_capacity(n);
        for node in 0..n {
            let out = csr.out_strength(node);
            let mut row: Vec<(usize, f64)> = Vec::new();
            // Dangling nodes always teleport
            teleport.push(if out > 0.0 {
                teleportation * walk.ranks[node]
            } else {
                walk.ranks[node]
            });
            if out > 0.0 {
                let scale = (1.0 - teleportation) * walk.ranks[node] / out;
                let (targets, weights) = csr.outgoing(node);
                row.extend(
                    targets
                        .iter()
                        .zip(weights)
                        .filter(|&(&target, _)| target != node)
                        .map(|(&target, &w)| (target, w * scale)),
                );
            }
            out_links.push(merge_row(row));
        }

        Self::assemble(walk.ranks, teleport, vec![1; n], n, out_links)
    }

    fn assemble(
        flow: Vec<f64>,
        teleport: Vec<f64>,
        size: Vec<usize>,
        total_nodes: usize,
        out_links: Vec<Vec<(usize, f64)>>,
    ) -> Self {
        let mut in_links = vec![Vec::new(); flow.len()];
        for (source, row) in out_links.iter().enumerate() {
            for &(target, f) in row {
                in_links[target].push((source, f));
            }
        }
        Self {
            flow,
            teleport,
            size,
            total_nodes,
            out_links,
            in_links,
        }
    }

    /// Exit flow of a module: its link exit plus teleportation landing outside
    #[allow(clippy::cast_precision_loss)]
    fn exit_flow(&self, parts: ExitParts) -> f64 {
        let outside = self.total_nodes.saturating_sub(parts.size) as f64 / self.total_nodes as f64;
        parts.links + parts.teleport * outside
    }

    /// Exit and visit flow of every module of a partition
    fn module_flows(&self, module: &[usize], count: usize) -> (Vec<f64>, Vec<f64>) {
        let mut parts = vec![ExitParts::default(); count];
        let mut flow = vec![0.0; count];
        for (node, row) in self.out_links.iter().enumerate() {
            let m = module[node];
            flow[m] += self.flow[node];
            parts[m].teleport += self.teleport[node];
            parts[m].size += self.size[node];
            parts[m].links += row
                .iter()
                .filter(|&&(target, _)| module[target] != m)
                .map(|&(_, f)| f)
                .sum::<f64>();
        }
        let exit = parts.into_iter().map(|p| self.exit_flow(p)).collect();
        (exit, flow)
    }

    fn len(&self) -> usize {
        self.flow.len()
    }

    fn has_links(&self) -> bool {
        self.out_links.iter().any(|row| !row.is_empty())
    }

    fn aggregate(&self, module: &[usize], count: usize) -> Self {
        let mut flow = vec![0.0; count];
        let mut teleport = vec![0.0; count];
        let mut size = vec![0; count];
        let mut buckets: Vec<HashMap<usize, f64>> = vec![HashMap::new(); count];

        for (node, row) in self.out_links.iter().enumerate() {
            let m = module[node];
            flow[m] += self.flow[node];
            teleport[m] += self.teleport[node];
            size[m] += self.size[node];
            for &(target, f) in row {
                let t = module[target];
                if t != m {
                    *buckets[m].entry(t).or_insert(0.0) += f;
                }
            }
        }

        let out_links = buckets
            .into_iter()
            .map(|bucket| merge_row(bucket.into_iter().collect()))
            .collect();
        Self::assemble(flow, teleport, size, self.total_nodes, out_links)
    }

    /// Codelength of a partition, excluding the constant node entropy term
    fn index_and_module_terms(&self, module: &[usize], count: usize) -> f64 {
        let (exit, flow) = self.module_flows(module, count);
        let total_exit: f64 = exit.iter().sum();
        plogp(total_exit) - 2.0 * exit.iter().copied().map(plogp).sum::<f64>()
            + exit
                .iter()
                .zip(&flow)
                .map(|(q, p)| plogp(q + p))
                .sum::<f64>()
    }
}

fn merge_row(mut row: Vec<(usize, f64)>) -> Vec<(usize, f64)> {
    row.sort_unstable_by_key(|&(target, _)| target);
    row.dedup_by(|next, kept| {
        if next.0 == kept.0 {
            kept.1 += next.1;
            true
        } else {
            false
        }
    });
    row
}

/// Exit and flow of one module before and after a move
#[derive(Debug, Clone, Copy)]
struct ModuleChange {
    exit_before: f64,
    flow_before: f64,
    exit_after: f64,
    flow_after: f64,
}

impl ModuleChange {
    fn exit_delta(&self) -> f64 {
        self.exit_after - self.exit_before
    }
}

/// Codelength change when a node leaves `from` and joins `to`
fn move_delta(total_exit: f64, from: &ModuleChange, to: &ModuleChange) -> f64 {
    let new_total = total_exit + from.exit_delta() + to.exit_delta();
    plogp(new_total) - plogp(total_exit)
        - 2.0
            * (plogp(from.exit_after) + plogp(to.exit_after)
                - plogp(from.exit_before)
                - plogp(to.exit_before))
        + plogp(from.exit_after + from.flow_after)
        + plogp(to.exit_after + to.flow_after)
        - plogp(from.exit_before + from.flow_before)
        - plogp(to.exit_before + to.flow_before)
}

/// Outcome of node moving on one level
struct LevelMoves {
    module: Vec<usize>,
    passes: usize,
    moved: bool,
    capped: bool,
}

/// Greedy node moves starting from `start` (compact labels below `net.len()`)
fn move_nodes(
    net: &FlowNetwork,
    start: Vec<usize>,
    max_passes: usize,
    rng: &mut SeededRandom,
) -> LevelMoves {
    let n = net.len();
    let node_out: Vec<f64> = net
        .out_links
        .iter()
        .map(|row| row.iter().map(|&(_, f)| f).sum())
        .collect();

    let mut module = start;
    let mut parts = vec![ExitParts::default(); n];
    let mut flow = vec![0.0; n];
    let mut members = vec![0_usize; n];
    for (node, row) in net.out_links.iter().enumerate() {
        let m = module[node];
        flow[m] += net.flow[node];
        members[m] += 1;
        parts[m].teleport += net.teleport[node];
        parts[m].size += net.size[node];
        parts[m].links += row
            .iter()
            .filter(|&&(target, _)| module[target] != m)
            .map(|&(_, f)| f)
            .sum::<f64>();
    }
    let mut free: Vec<usize> = (0..n).rev().filter(|&m| members[m] == 0).collect();
    let total_of = |parts: &[ExitParts]| -> f64 { parts.iter().map(|&p| net.exit_flow(p)).sum() };
    let mut total_exit = total_of(&parts);

    let mut out_to = CommunityWeights::new(n);
    let mut in_from = CommunityWeights::new(n);
    let mut order: Vec<usize> = (0..n).collect();

    let mut passes = 0;
    let mut moved = false;
    let mut capped = true;

    while passes < max_passes {
        passes += 1;
        order.shuffle(rng);
        let mut moves = 0_usize;

        for &node in &order {
            let current = module[node];
            out_to.clear();
            in_from.clear();
            for &(target, f) in &net.out_links[node] {
                out_to.add(module[target], f);
                in_from.add(module[target], 0.0);
            }
            for &(source, f) in &net.in_links[node] {
                in_from.add(module[source], f);
                out_to.add(module[source], 0.0);
            }

            let out_v = node_out[node];
            let p_v = net.flow[node];
            let own = ExitParts {
                links: out_v,
                teleport: net.teleport[node],
                size: net.size[node],
            };
            let left = ExitParts {
                links: parts[current].links - out_v + out_to.get(current) + in_from.get(current),
                teleport: parts[current].teleport - own.teleport,
                size: parts[current].size - own.size,
            };
            let leave = ModuleChange {
                exit_before: net.exit_flow(parts[current]),
                flow_before: flow[current],
                exit_after: net.exit_flow(left),
                flow_after: flow[current] - p_v,
            };

            let mut best: Option<(ModuleChange, ExitParts)> = None;
            let mut best_module = current;
            let mut best_delta = -MOVE_EPSILON;

            let candidates = out_to
                .touched()
                .iter()
                .copied()
                .filter(|&m| m != current)
                .map(|m| (m, out_to.get(m), in_from.get(m)));
            // An empty module, unless the node is alone already
            let empty = free
                .last()
                .copied()
                .filter(|_| members[current] > 1)
                .map(|m| (m, 0.0, 0.0));

            for (target, out_to_target, in_from_target) in candidates.chain(empty) {
                let joined = ExitParts {
                    links: parts[target].links + out_v - out_to_target - in_from_target,
                    teleport: parts[target].teleport + own.teleport,
                    size: parts[target].size + own.size,
                };
                let join = ModuleChange {
                    exit_before: net.exit_flow(parts[target]),
                    flow_before: flow[target],
                    exit_after: net.exit_flow(joined),
                    flow_after: flow[target] + p_v,
                };
                let delta = move_delta(total_exit, &leave, &join);
                if delta < best_delta {
                    best_delta = delta;
                    best_module = target;
                    best = Some((join, joined));
                }
            }

            let Some((join, joined)) = best else {
                continue;
            };

            if free.last() == Some(&best_module) {
                free.pop();
            }
            total_exit += leave.exit_delta() + join.exit_delta();
            parts[current] = left;
            flow[current] = leave.flow_after;
            parts[best_module] = joined;
            flow[best_module] = join.flow_after;
            members[current] -= 1;
            members[best_module] += 1;
            if members[current] == 0 {
                parts[current] = ExitParts::default();
                flow[current] = 0.0;
                free.push(current);
            }
            module[node] = best_module;
            moves += 1;
        }

        if moves == 0 {
            capped = false;
            break;
        }
        moved = true;
        // Resync the running total against rounding drift
        total_exit = total_of(&parts);
    }

    LevelMoves {
        module,
        passes,
        moved,
        capped,
    }
}

/// Rounds of node-level fine-tuning after the first multi-level pass
const MAX_TUNING_ROUNDS: usize = 10;

/// Assignment of base nodes plus the sweeps spent finding it
struct LevelOutcome {
    assignment: Vec<usize>,
    iterations: usize,
    converged: bool,
}

/// Node moves on the base network from `start`, then moves of whole modules
/// on each aggregated level until a level changes nothing
fn optimize_levels(
    base: &FlowNetwork,
    start: Vec<usize>,
    max_passes: usize,
    rng: &mut SeededRandom,
) -> LevelOutcome {
    let mut assignment: Vec<usize> = (0..base.len()).collect();
    let mut level = base.clone();
    let mut initial = Some(start);
    let mut iterations = 0;
    let mut converged = true;

    loop {
        let start = initial.take().unwrap_or_else(|| (0..level.len()).collect());
        let moves = move_nodes(&level, start, max_passes, rng);
        iterations += moves.passes;
        if moves.capped {
            converged = false;
        }

        let (module, count) = renumber(&moves.module);
        for node in &mut assignment {
            *node = module[*node];
        }
        if !moves.moved || count == level.len() {
            break;
        }
        debug!(modules = count, "infomap level aggregated");
        level = level.aggregate(&module, count);
    }

    LevelOutcome {
        assignment,
        iterations,
        converged,
    }
}

/// Multi-level optimization from singletons, then fine-tuning rounds that
/// re-move single nodes against the found modules and re-aggregate, kept
/// while the codelength drops
///
/// Returns compact labels and their codelength without the node entropy term.
fn run_trial(
    base: &FlowNetwork,
    max_passes: usize,
    rng: &mut SeededRandom,
) -> (LevelOutcome, f64) {
    let mut best = optimize_levels(base, (0..base.len()).collect(), max_passes, rng);
    let (labels, count) = renumber(&best.assignment);
    best.assignment = labels;
    let mut codelength = base.index_and_module_terms(&best.assignment, count);

    for round in 1..=MAX_TUNING_ROUNDS {
        let tuned = optimize_levels(base, best.assignment.clone(), max_passes, rng);
        let (labels, count) = renumber(&tuned.assignment);
        let tuned_length = base.index_and_module_terms(&labels, count);
        best.iterations += tuned.iterations;
        best.converged &= tuned.converged;
        if tuned_length >= codelength - MOVE_EPSILON {
            break;
        }
        debug!(round, modules = count, codelength = tuned_length, "infomap tuning improved");
        best.assignment = labels;
        codelength = tuned_length;
    }

    (best, codelength)
}

/// Detect communities by minimizing the map equation
///
/// # Errors
///
/// `InvalidParameter` for an invalid config or a negative edge weight.
///
/// # Example
///
/// ```
/// use bibgraph_core::{infomap, Graph, InfomapConfig};
///
/// let mut graph: Graph<String> = Graph::undirected();
/// for i in 0..8 {
///     graph.add_node(format!("n{i}"));
/// }
/// let mut k = 0;
/// for base in [0, 4] {
///     for i in 0..4 {
///         for j in (i + 1)..4 {
///             graph.add_edge(format!("e{k}"), &format!("n{}", base + i), &format!("n{}", base + j), ()).unwrap();
///             k += 1;
///         }
///     }
/// }
/// graph.add_edge("bridge", "n0", "n4", ()).unwrap();
///
/// let result = infomap(&graph, &InfomapConfig::default()).unwrap();
/// let total: f64 = result.modules.iter().map(|m| m.visit_probability).sum();
/// assert!((total - 1.0).abs() < 1e-9);
/// assert!(result.codelength <= result.one_level_codelength);
/// ```
#[instrument(skip_all, fields(nodes = graph.node_count(), edges = graph.edge_count()))]
pub fn infomap<N: Identified, E>(graph: &Graph<N, E>, config: &InfomapConfig) -> Result<InfomapResult> {
    config.validate()?;
    graph.ensure_non_negative_weights()?;

    let csr = CsrSnapshot::from_graph(graph, Orientation::AsStored);
    let base = FlowNetwork::from_csr(&csr, config.teleportation);
    let n = base.len();
    let node_entropy: f64 = -base.flow.iter().copied().map(plogp).sum::<f64>();

    let (labels, iterations, converged, codelength) = if base.has_links() {
        let mut best: Option<(Vec<usize>, usize, bool, f64)> = None;
        for trial in 0..config.trials {
            let mut rng = SeededRandom::new(config.seed.wrapping_add(trial as u64));
            let (outcome, terms) = run_trial(&base, config.max_passes, &mut rng);
            let codelength = terms + node_entropy;
            debug!(trial, codelength, "infomap trial finished");
            if best.as_ref().map_or(true, |b| codelength < b.3) {
                best = Some((outcome.assignment, outcome.iterations, outcome.converged, codelength));
            }
        }
        let (mut labels, iterations, converged, mut codelength) =
            best.unwrap_or_else(|| ((0..n).collect(), 0, true, node_entropy));

        if components_if_all_singletons(&csr, &mut labels) {
            let (_, count) = renumber(&labels);
            codelength = base.index_and_module_terms(&labels, count) + node_entropy;
        }
        (labels, iterations, converged, codelength)
    } else {
        ((0..n).collect(), 0, true, node_entropy)
    };

    if !converged {
        warn!(max_passes = config.max_passes, "infomap hit sweep cap");
    }

    let (labels, count) = renumber(&labels);
    let modules = describe_modules(&csr, &base, &labels, count);

    let symmetric = CsrSnapshot::from_graph(graph, Orientation::Symmetric);
    let modularity = Network::from_csr(&symmetric)?.modularity_of(&labels, 1.0);

    let compression_ratio = if codelength > 0.0 {
        node_entropy / codelength
    } else {
        1.0
    };

    debug!(
        modules = count,
        codelength,
        one_level = node_entropy,
        compression_ratio,
        "infomap finished"
    );
    Ok(InfomapResult {
        modules,
        codelength,
        one_level_codelength: node_entropy,
        compression_ratio,
        iterations,
        converged,
        modularity,
    })
}

fn describe_modules(
    csr: &CsrSnapshot<'_>,
    base: &FlowNetwork,
    labels: &[usize],
    count: usize,
) -> Vec<Module> {
    let (exit, flow) = base.module_flows(labels, count);
    let mut entropy = vec![0.0; count];
    let mut nodes = vec![Vec::new(); count];

    for (node, &m) in labels.iter().enumerate() {
        entropy[m] -= plogp(base.flow[node]);
        nodes[m].push(csr.id(node).to_string());
    }

    nodes
        .into_iter()
        .enumerate()
        .map(|(id, nodes)| {
            let description_length = plogp(exit[id] + flow[id]) - plogp(exit[id]) + entropy[id];
            let compression_ratio = if description_length > 0.0 {
                entropy[id] / description_length
            } else {
                1.0
            };
            Module {
                id,
                nodes,
                description_length,
                visit_probability: flow[id],
                compression_ratio,
            }
        })
        .collect()
}
