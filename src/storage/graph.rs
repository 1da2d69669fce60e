//! Generic graph store keyed by string ids
//!
//! Nodes and edges live in slot arenas (`Vec<Option<_>>`) addressed by dense
//! indices, with a `String → slot` lookup table in front. Every node keeps an
//! outgoing and an incoming list of edge slots; in undirected mode each edge
//! is recorded on both endpoints so it is visible from either side.
//!
//! ```
//! use bibgraph_core::Graph;
//!
//! let mut graph: Graph<String> = Graph::directed();
//! graph.add_node("W1".to_string());
//! graph.add_node("W2".to_string());
//! graph.add_edge("E1", "W1", "W2", ()).unwrap();
//!
//! assert_eq!(graph.get_neighbors("W1").unwrap(), vec!["W2"]);
//! assert!(graph.get_neighbors("W9").is_err()); // absent node is an error, not "no neighbours"
//! ```

use crate::error::{AnalysisError, Result};
use std::collections::{HashMap, HashSet};

/// Identity capability required of node payloads
///
/// The engine never looks at any other field of a node.
pub trait Identified {
    /// Stable, unique node id
    fn id(&self) -> &str;
}

impl Identified for String {
    fn id(&self) -> &str {
        self
    }
}

/// Which incident edges a traversal follows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Direction {
    /// Follow edges from source to target
    Outgoing,
    /// Follow edges from target to source
    Incoming,
    /// Ignore edge direction
    Both,
}

#[derive(Debug, Clone)]
pub(crate) struct EdgeRecord<E> {
    pub(crate) id: String,
    pub(crate) source: usize,
    pub(crate) target: usize,
    pub(crate) weight: Option<f64>,
    pub(crate) data: E,
}

impl<E> EdgeRecord<E> {
    /// Endpoint opposite to `slot` (the node itself for self-loops)
    pub(crate) const fn other(&self, slot: usize) -> usize {
        if self.source == slot {
            self.target
        } else {
            self.source
        }
    }

    pub(crate) fn weight_or_unit(&self) -> f64 {
        self.weight.unwrap_or(1.0)
    }
}

/// Borrowed view of an edge
#[derive(Debug)]
pub struct EdgeRef<'a, E> {
    /// Edge id
    pub id: &'a str,
    /// Source node id
    pub source: &'a str,
    /// Target node id
    pub target: &'a str,
    /// Optional weight (`None` counts as `1.0` in algorithms)
    pub weight: Option<f64>,
    /// Caller payload
    pub data: &'a E,
}

impl<E> Clone for EdgeRef<'_, E> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E> Copy for EdgeRef<'_, E> {}

/// Directed or undirected graph with caller payloads
#[derive(Debug, Clone)]
pub struct Graph<N, E = ()> {
    directed: bool,
    nodes: Vec<Option<N>>,
    node_index: HashMap<String, usize>,
    outgoing: Vec<Vec<usize>>,
    incoming: Vec<Vec<usize>>,
    edges: Vec<Option<EdgeRecord<E>>>,
    edge_index: HashMap<String, usize>,
    weighted_edges: usize,
}

impl<N: Identified, E> Graph<N, E> {
    /// Create an empty graph
    #[must_use]
    pub fn new(directed: bool) -> Self {
        Self {
            directed,
            nodes: Vec::new(),
            node_index: HashMap::new(),
            outgoing: Vec::new(),
            incoming: Vec::new(),
            edges: Vec::new(),
            edge_index: HashMap::new(),
            weighted_edges: 0,
        }
    }

    /// Create an empty directed graph
    #[must_use]
    pub fn directed() -> Self {
        Self::new(true)
    }

    /// Create an empty undirected graph
    #[must_use]
    pub fn undirected() -> Self {
        Self::new(false)
    }

    /// Insert a node, replacing the payload if the id already exists
    ///
    /// Returns `true` when the node is new.
    pub fn add_node(&mut self, node: N) -> bool {
        if let Some(&slot) = self.node_index.get(node.id()) {
            self.nodes[slot] = Some(node);
            return false;
        }

        let slot = self.nodes.len();
        self.node_index.insert(node.id().to_string(), slot);
        self.nodes.push(Some(node));
        self.outgoing.push(Vec::new());
        self.incoming.push(Vec::new());
        true
    }

    /// Insert an unweighted edge
    ///
    /// # Errors
    ///
    /// `NodeNotFound` if an endpoint is absent, `DuplicateEdge` if `id` is taken.
    pub fn add_edge(
        &mut self,
        id: impl Into<String>,
        source: &str,
        target: &str,
        data: E,
    ) -> Result<()> {
        self.insert_edge(id.into(), source, target, None, data)
    }

    /// Insert a weighted edge
    ///
    /// # Errors
    ///
    /// As [`Graph::add_edge`], plus `InvalidParameter` for a non-finite weight.
    pub fn add_weighted_edge(
        &mut self,
        id: impl Into<String>,
        source: &str,
        target: &str,
        weight: f64,
        data: E,
    ) -> Result<()> {
        if !weight.is_finite() {
            return Err(AnalysisError::invalid(
                "weight",
                format!("edge weight must be finite, got {weight}"),
            ));
        }
        self.insert_edge(id.into(), source, target, Some(weight), data)
    }

    fn insert_edge(
        &mut self,
        id: String,
        source: &str,
        target: &str,
        weight: Option<f64>,
        data: E,
    ) -> Result<()> {
        let src = self.require_slot(source)?;
        let dst = self.require_slot(target)?;
        if self.edge_index.contains_key(&id) {
            return Err(AnalysisError::DuplicateEdge(id));
        }

        let edge_slot = self.edges.len();
        self.edge_index.insert(id.clone(), edge_slot);
        self.edges.push(Some(EdgeRecord {
            id,
            source: src,
            target: dst,
            weight,
            data,
        }));
        if weight.is_some() {
            self.weighted_edges += 1;
        }

        self.outgoing[src].push(edge_slot);
        self.incoming[dst].push(edge_slot);
        if !self.directed && src != dst {
            // Undirected: visible from both endpoints
            self.outgoing[dst].push(edge_slot);
            self.incoming[src].push(edge_slot);
        }

        Ok(())
    }

    /// Remove an edge by id
    ///
    /// # Errors
    ///
    /// `EdgeNotFound` if no edge has this id.
    pub fn remove_edge(&mut self, id: &str) -> Result<()> {
        let edge_slot = self
            .edge_index
            .remove(id)
            .ok_or_else(|| AnalysisError::EdgeNotFound(id.to_string()))?;

        if let Some(record) = self.edges[edge_slot].take() {
            for slot in [record.source, record.target] {
                self.outgoing[slot].retain(|&e| e != edge_slot);
                self.incoming[slot].retain(|&e| e != edge_slot);
            }
            if record.weight.is_some() {
                self.weighted_edges -= 1;
            }
        }

        Ok(())
    }

    /// Remove a node together with all incident edges
    ///
    /// # Errors
    ///
    /// `NodeNotFound` if the id is absent.
    pub fn remove_node(&mut self, id: &str) -> Result<N> {
        let slot = self.require_slot(id)?;

        let mut incident: Vec<usize> = self.outgoing[slot].clone();
        incident.extend_from_slice(&self.incoming[slot]);
        incident.sort_unstable();
        incident.dedup();

        for edge_slot in incident {
            let edge_id = self.edges[edge_slot].as_ref().map(|r| r.id.clone());
            if let Some(edge_id) = edge_id {
                self.remove_edge(&edge_id)?;
            }
        }

        self.node_index.remove(id);
        self.nodes[slot]
            .take()
            .ok_or_else(|| AnalysisError::NodeNotFound(id.to_string()))
    }

    /// Whether a node with this id exists
    #[must_use]
    pub fn has_node(&self, id: &str) -> bool {
        self.node_index.contains_key(id)
    }

    /// Node payload by id
    #[must_use]
    pub fn get_node(&self, id: &str) -> Option<&N> {
        self.node_index
            .get(id)
            .and_then(|&slot| self.nodes[slot].as_ref())
    }

    /// Distinct neighbour ids in adjacency insertion order
    ///
    /// Directed graphs report successors; undirected graphs report every
    /// adjacent node.
    ///
    /// # Errors
    ///
    /// `NodeNotFound` if the id is absent.
    pub fn get_neighbors(&self, id: &str) -> Result<Vec<&str>> {
        let slot = self.require_slot(id)?;
        let mut seen = HashSet::new();
        Ok(self
            .adjacent(slot, Direction::Outgoing)
            .filter(|&(_, neighbor)| seen.insert(neighbor))
            .map(|(_, neighbor)| self.slot_id(neighbor))
            .collect())
    }

    /// Edges leaving the node (all incident edges when undirected)
    ///
    /// # Errors
    ///
    /// `NodeNotFound` if the id is absent.
    pub fn get_outgoing_edges(&self, id: &str) -> Result<Vec<EdgeRef<'_, E>>> {
        let slot = self.require_slot(id)?;
        Ok(self.outgoing[slot]
            .iter()
            .filter_map(|&e| self.edge_ref(e))
            .collect())
    }

    /// Edges entering the node (all incident edges when undirected)
    ///
    /// # Errors
    ///
    /// `NodeNotFound` if the id is absent.
    pub fn get_incoming_edges(&self, id: &str) -> Result<Vec<EdgeRef<'_, E>>> {
        let slot = self.require_slot(id)?;
        Ok(self.incoming[slot]
            .iter()
            .filter_map(|&e| self.edge_ref(e))
            .collect())
    }

    /// Edge by id
    #[must_use]
    pub fn get_edge(&self, id: &str) -> Option<EdgeRef<'_, E>> {
        self.edge_index.get(id).and_then(|&e| self.edge_ref(e))
    }

    /// All node payloads in insertion order
    #[must_use]
    pub fn get_all_nodes(&self) -> Vec<&N> {
        self.nodes.iter().flatten().collect()
    }

    /// All node ids in insertion order
    #[must_use]
    pub fn node_ids(&self) -> Vec<&str> {
        self.nodes.iter().flatten().map(Identified::id).collect()
    }

    /// All edges in insertion order
    #[must_use]
    pub fn get_all_edges(&self) -> Vec<EdgeRef<'_, E>> {
        (0..self.edges.len())
            .filter_map(|e| self.edge_ref(e))
            .collect()
    }

    /// Whether edges are one-way
    #[must_use]
    pub const fn is_directed(&self) -> bool {
        self.directed
    }

    /// Number of nodes
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.node_index.len()
    }

    /// Number of edges
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.edge_index.len()
    }

    /// Whether any edge carries an explicit weight
    #[must_use]
    pub const fn has_weighted_edges(&self) -> bool {
        self.weighted_edges > 0
    }

    /// Total degree (in + out; incident edge count when undirected)
    ///
    /// # Errors
    ///
    /// `NodeNotFound` if the id is absent.
    pub fn degree(&self, id: &str) -> Result<usize> {
        let slot = self.require_slot(id)?;
        Ok(self.slot_degree(slot))
    }

    /// Number of outgoing edges
    ///
    /// # Errors
    ///
    /// `NodeNotFound` if the id is absent.
    pub fn out_degree(&self, id: &str) -> Result<usize> {
        Ok(self.outgoing[self.require_slot(id)?].len())
    }

    /// Number of incoming edges
    ///
    /// # Errors
    ///
    /// `NodeNotFound` if the id is absent.
    pub fn in_degree(&self, id: &str) -> Result<usize> {
        Ok(self.incoming[self.require_slot(id)?].len())
    }

    // ----- crate-internal slot access used by the algorithms -----

    pub(crate) fn require_slot(&self, id: &str) -> Result<usize> {
        self.node_index
            .get(id)
            .copied()
            .ok_or_else(|| AnalysisError::NodeNotFound(id.to_string()))
    }

    /// Live node slots in insertion order
    pub(crate) fn node_slots(&self) -> impl Iterator<Item = usize> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter_map(|(slot, node)| node.as_ref().map(|_| slot))
    }

    pub(crate) fn slot_capacity(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn slot_id(&self, slot: usize) -> &str {
        self.nodes[slot].as_ref().map_or("", Identified::id)
    }

    pub(crate) fn slot_degree(&self, slot: usize) -> usize {
        if self.directed {
            self.outgoing[slot].len() + self.incoming[slot].len()
        } else {
            self.outgoing[slot].len()
        }
    }

    /// Live edge records in insertion order
    pub(crate) fn edge_records(&self) -> impl Iterator<Item = (usize, &EdgeRecord<E>)> + '_ {
        self.edges
            .iter()
            .enumerate()
            .filter_map(|(slot, record)| record.as_ref().map(|r| (slot, r)))
    }

    pub(crate) fn edge_record(&self, edge_slot: usize) -> Option<&EdgeRecord<E>> {
        self.edges.get(edge_slot).and_then(Option::as_ref)
    }

    /// Reject graphs with a negative edge weight
    pub(crate) fn ensure_non_negative_weights(&self) -> Result<()> {
        match self.edge_records().find(|(_, r)| r.weight_or_unit() < 0.0) {
            Some((_, record)) => Err(AnalysisError::invalid(
                "weight",
                format!("edge {} has negative weight {}", record.id, record.weight_or_unit()),
            )),
            None => Ok(()),
        }
    }

    /// `(edge slot, neighbour slot)` pairs reachable from `slot` in `direction`
    pub(crate) fn adjacent(
        &self,
        slot: usize,
        direction: Direction,
    ) -> impl Iterator<Item = (usize, usize)> + '_ {
        let empty: &[usize] = &[];
        let (first, second): (&[usize], &[usize]) = match (self.directed, direction) {
            (false, _) | (true, Direction::Outgoing) => (&self.outgoing[slot], empty),
            (true, Direction::Incoming) => (&self.incoming[slot], empty),
            (true, Direction::Both) => (&self.outgoing[slot], &self.incoming[slot]),
        };
        first
            .iter()
            .chain(second.iter())
            .filter_map(move |&e| self.edge_record(e).map(|r| (e, r.other(slot))))
    }

    fn edge_ref(&self, edge_slot: usize) -> Option<EdgeRef<'_, E>> {
        self.edge_record(edge_slot).map(|r| EdgeRef {
            id: &r.id,
            source: self.slot_id(r.source),
            target: self.slot_id(r.target),
            weight: r.weight,
            data: &r.data,
        })
    }
}

impl<N: Identified, E> Default for Graph<N, E> {
    fn default() -> Self {
        Self::directed()
    }
}
