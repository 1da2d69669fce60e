//! Error taxonomy for graph analytics
//!
//! Only genuine failures are errors. Non-convergence is reported through
//! result metadata (`converged: false`) and degenerate inputs produce a
//! defined "no result" value (`Ok(None)` or a singleton partition).

use thiserror::Error;

/// Errors returned by graph operations and analysis algorithms
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    /// Referenced node id is not in the graph
    #[error("node not found: {0}")]
    NodeNotFound(String),

    /// Referenced edge id is not in the graph
    #[error("edge not found: {0}")]
    EdgeNotFound(String),

    /// An edge with this id already exists
    #[error("duplicate edge id: {0}")]
    DuplicateEdge(String),

    /// Parameter outside its valid domain (e.g. `num_clusters == 0`)
    #[error("invalid parameter `{name}`: {reason}")]
    InvalidParameter {
        /// Parameter name
        name: &'static str,
        /// What was wrong with it
        reason: String,
    },

    /// Internal numerical failure caught at the algorithm boundary
    #[error("numerical failure in {algorithm}: {reason}")]
    Numerical {
        /// Algorithm that failed
        algorithm: &'static str,
        /// Failure description
        reason: String,
    },
}

impl AnalysisError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }

    pub(crate) fn numerical(algorithm: &'static str, reason: impl Into<String>) -> Self {
        Self::Numerical {
            algorithm,
            reason: reason.into(),
        }
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, AnalysisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            AnalysisError::NodeNotFound("W123".to_string()).to_string(),
            "node not found: W123"
        );
        assert_eq!(
            AnalysisError::invalid("num_clusters", "must be positive").to_string(),
            "invalid parameter `num_clusters`: must be positive"
        );
        assert_eq!(
            AnalysisError::numerical("spectral", "embedding is not finite").to_string(),
            "numerical failure in spectral: embedding is not finite"
        );
    }
}
