//! Graph storage layer
//!
//! Provides the mutable, id-keyed [`Graph`] store and the read-only
//! [`CsrSnapshot`] (Compressed Sparse Row) view the numerical algorithms run on.

pub mod csr;
pub mod graph;

pub use csr::{CsrSnapshot, Orientation};
pub use graph::{Direction, EdgeRef, Graph, Identified};
