//! Seeded synthetic networks with known community structure
//!
//! Used by the benchmarks, the acceptance tests and the demo program. Node ids
//! are `W{index}` and edge ids `E{index}`, both in creation order, so a seed
//! fully determines the graph including insertion order.

use crate::error::{AnalysisError, Result};
use crate::ranking::rng::SeededRandom;
use crate::storage::Graph;
use rand::Rng;
use std::collections::HashSet;
use tracing::{debug, instrument};

/// Parameters for [`planted_partition`]
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PlantedPartitionConfig {
    /// Number of planted communities (default: 4)
    pub communities: usize,
    /// Nodes per community (default: 25)
    pub community_size: usize,
    /// Mean intra-community degree (default: 8)
    pub intra_degree: usize,
    /// Share of all edges that cross communities, in `[0, 1)` (default: 0.1)
    pub inter_fraction: f64,
    /// Generator seed (default: 42)
    pub seed: u64,
}

impl Default for PlantedPartitionConfig {
    fn default() -> Self {
        Self {
            communities: 4,
            community_size: 25,
            intra_degree: 8,
            inter_fraction: 0.1,
            seed: 42,
        }
    }
}

impl PlantedPartitionConfig {
    /// Set the community count and size
    #[must_use]
    pub const fn with_communities(mut self, communities: usize, community_size: usize) -> Self {
        self.communities = communities;
        self.community_size = community_size;
        self
    }

    /// Set the mean intra-community degree
    #[must_use]
    pub const fn with_intra_degree(mut self, intra_degree: usize) -> Self {
        self.intra_degree = intra_degree;
        self
    }

    /// Set the inter-community edge share
    #[must_use]
    pub const fn with_inter_fraction(mut self, inter_fraction: f64) -> Self {
        self.inter_fraction = inter_fraction;
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
    /// `InvalidParameter` for zero communities or size, or an inter fraction
    /// outside `[0, 1)`.
    pub fn validate(&self) -> Result<()> {
        if self.communities == 0 || self.community_size == 0 {
            return Err(AnalysisError::invalid(
                "communities",
                "community count and size must be positive",
            ));
        }
        if self.inter_fraction.is_nan() || !(0.0..1.0).contains(&self.inter_fraction) {
            return Err(AnalysisError::invalid(
                "inter_fraction",
                format!("must lie in [0, 1), got {}", self.inter_fraction),
            ));
        }
        Ok(())
    }
}

/// Parameters for [`temporal_citation_network`]
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CitationNetworkConfig {
    /// Research fields (default: 4)
    pub fields: usize,
    /// Papers per field (default: 40)
    pub papers_per_field: usize,
    /// References per paper, capped by the papers published before it (default: 5)
    pub references: usize,
    /// Probability that a reference leaves the citing paper's field (default: 0.05)
    pub cross_field_probability: f64,
    /// Generator seed (default: 42)
    pub seed: u64,
}

impl Default for CitationNetworkConfig {
    fn default() -> Self {
        Self {
            fields: 4,
            papers_per_field: 40,
            references: 5,
            cross_field_probability: 0.05,
            seed: 42,
        }
    }
}

impl CitationNetworkConfig {
    /// Set the field count and papers per field
    #[must_use]
    pub const fn with_fields(mut self, fields: usize, papers_per_field: usize) -> Self {
        self.fields = fields;
        self.papers_per_field = papers_per_field;
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
    /// `InvalidParameter` for zero fields or papers, or a probability outside `[0, 1]`.
    pub fn validate(&self) -> Result<()> {
        if self.fields == 0 || self.papers_per_field == 0 {
            return Err(AnalysisError::invalid(
                "fields",
                "field count and papers per field must be positive",
            ));
        }
        if self.cross_field_probability.is_nan() || !(0.0..=1.0).contains(&self.cross_field_probability) {
            return Err(AnalysisError::invalid(
                "cross_field_probability",
                format!("must lie in [0, 1], got {}", self.cross_field_probability),
            ));
        }
        Ok(())
    }
}

/// Accumulates unique edges and writes them with sequential ids
struct EdgeSet {
    seen: HashSet<(usize, usize)>,
    edges: Vec<(usize, usize)>,
    directed: bool,
}

impl EdgeSet {
    fn new(directed: bool) -> Self {
        Self {
            seen: HashSet::new(),
            edges: Vec::new(),
            directed,
        }
    }

    fn insert(&mut self, source: usize, target: usize) -> bool {
        if source == target {
            return false;
        }
        let key = if self.directed {
            (source, target)
        } else {
            (source.min(target), source.max(target))
        };
        if !self.seen.insert(key) {
            return false;
        }
        self.edges.push((source, target));
        true
    }

    fn len(&self) -> usize {
        self.edges.len()
    }

    fn into_graph(self, ids: &[String]) -> Result<Graph<String>> {
        let mut graph = Graph::new(self.directed);
        for id in ids {
            graph.add_node(id.clone());
        }
        for (k, (source, target)) in self.edges.into_iter().enumerate() {
            graph.add_edge(format!("E{k}"), &ids[source], &ids[target], ())?;
        }
        Ok(graph)
    }
}

/// Random draws without an accept test give up after this many tries per edge
const ATTEMPTS_PER_EDGE: usize = 50;

/// Undirected graph with planted communities and their ground truth
///
/// Each community is a ring (so it is connected) topped up with random
/// internal edges to the requested mean degree. Inter-community edges are
/// then added until they make up `inter_fraction` of all edges.
///
/// # Errors
///
/// `InvalidParameter` for an invalid config.
#[instrument(skip_all, fields(communities = config.communities, size = config.community_size))]
pub fn planted_partition(config: &PlantedPartitionConfig) -> Result<(Graph<String>, Vec<Vec<String>>)> {
    config.validate()?;

    let size = config.community_size;
    let n = config.communities * size;
    let ids: Vec<String> = (0..n).map(|i| format!("W{i}")).collect();
    let mut rng = SeededRandom::new(config.seed);
    let mut edges = EdgeSet::new(false);

    let max_internal = size * (size - 1) / 2;
    let internal_target = (size * config.intra_degree / 2).clamp(size.min(max_internal), max_internal);
    for community in 0..config.communities {
        let base = community * size;
        if size > 1 {
            for i in 0..size {
                edges.insert(base + i, base + (i + 1) % size);
            }
        }
        let target = edges.len() + internal_target.saturating_sub(size.min(max_internal));
        let mut attempts = 0;
        while edges.len() < target && attempts < internal_target * ATTEMPTS_PER_EDGE {
            attempts += 1;
            edges.insert(base + rng.gen_range(0..size), base + rng.gen_range(0..size));
        }
    }

    let internal = edges.len();
    if config.communities > 1 {
        #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let inter_target =
            (internal as f64 * config.inter_fraction / (1.0 - config.inter_fraction)).round() as usize;
        let goal = internal + inter_target;
        let mut attempts = 0;
        while edges.len() < goal && attempts < inter_target * ATTEMPTS_PER_EDGE {
            attempts += 1;
            let a = rng.gen_range(0..n);
            let b = rng.gen_range(0..n);
            if a / size != b / size {
                edges.insert(a, b);
            }
        }
    }
    debug!(internal, total = edges.len(), "planted partition generated");

    let truth = ids.chunks(size).map(<[String]>::to_vec).collect();
    Ok((edges.into_graph(&ids)?, truth))
}

/// Directed citation DAG where papers only cite earlier work
///
/// Papers are published round-robin across fields, so `W{i}` belongs to
/// field `i % fields`. The first paper of each field founds it and cites
/// nothing. Every later paper cites up to `references` distinct earlier
/// papers, each within its field unless a cross-field draw succeeds. Edges
/// point from the citing to the cited paper. Returns the graph and the papers
/// of each field.
///
/// # Errors
///
/// `InvalidParameter` for an invalid config.
#[instrument(skip_all, fields(fields = config.fields, papers = config.fields * config.papers_per_field))]
pub fn temporal_citation_network(
    config: &CitationNetworkConfig,
) -> Result<(Graph<String>, Vec<Vec<String>>)> {
    config.validate()?;

    let fields = config.fields;
    let n = fields * config.papers_per_field;
    let ids: Vec<String> = (0..n).map(|i| format!("W{i}")).collect();
    let mut rng = SeededRandom::new(config.seed);
    let mut edges = EdgeSet::new(true);

    // Papers fields.. are the first with an earlier paper in their field
    for paper in fields..n {
        let field = paper % fields;
        // Earlier papers of the same field are field, field + fields, ...
        let earlier_in_field = paper / fields;
        let budget = config.references.min(earlier_in_field);
        let mut attempts = 0;
        let mut cited = 0;
        while cited < budget && attempts < budget * ATTEMPTS_PER_EDGE {
            attempts += 1;
            let cross = fields > 1 && rng.gen_bool(config.cross_field_probability);
            let target = if cross {
                rng.gen_range(0..paper)
            } else {
                field + fields * rng.gen_range(0..earlier_in_field)
            };
            if edges.insert(paper, target) {
                cited += 1;
            }
        }
    }
    debug!(citations = edges.len(), "citation network generated");

    let mut truth = vec![Vec::with_capacity(config.papers_per_field); fields];
    for (i, id) in ids.iter().enumerate() {
        truth[i % fields].push(id.clone());
    }
    Ok((edges.into_graph(&ids)?, truth))
}
