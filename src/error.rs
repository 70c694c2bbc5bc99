//! Error types for dagmc
//!
//! This module defines all error types used throughout the library.
//!
//! Note that a zero-probability state is *not* an error here: distributions
//! signal an impossible parameter combination by returning a log-probability
//! of `f64::NEG_INFINITY`, which the sampler interprets as certain
//! rejection. Only structural problems with the model graph (type
//! mismatches, dangling node references, protocol misuse) surface as errors,
//! and those are fatal to the run.

use thiserror::Error;

use crate::value::ValueKind;

/// Error type for model-graph construction and mutation
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModelError {
    /// A node id does not refer to a node in this graph
    #[error("Unknown node id {0}")]
    UnknownNode(usize),

    /// Value-type mismatch, e.g. when swapping a parameter
    #[error("Type mismatch for node '{node}': expected {expected}, got {actual}")]
    TypeMismatch {
        node: String,
        expected: ValueKind,
        actual: ValueKind,
    },

    /// A required parameter is missing from a node's parent set
    #[error("Node '{node}' is missing required parameter {index}")]
    MissingParameter { node: String, index: usize },

    /// The old parent of a swap is not a parent of the node
    #[error("Node '{node}' has no parent edge to swap out")]
    NotAParent { node: String },

    /// An operation that requires a stochastic node was applied elsewhere
    #[error("Node '{0}' is not stochastic")]
    NotStochastic(String),

    /// Adding an edge would make the graph cyclic
    #[error("Edge from '{parent}' to '{child}' would create a cycle")]
    CycleDetected { parent: String, child: String },
}

/// Error type for proposal protocol violations
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ProposalError {
    /// `undo` was called without a preceding `propose`
    #[error("undo called without a pending proposal")]
    UndoWithoutProposal,
}

/// Top-level error type for MCMC runs
#[derive(Debug, Error)]
pub enum McmcError {
    /// Model-graph error
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    /// Proposal error
    #[error("Proposal error: {0}")]
    Proposal(#[from] ProposalError),

    /// Invalid sampler configuration
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// The sampler has no moves to select from
    #[error("Empty move schedule")]
    EmptyMoveSchedule,

    /// Trace export failure
    #[error("Trace serialization error: {0}")]
    Trace(String),
}

/// Result type alias for MCMC operations
pub type McmcResult<T> = Result<T, McmcError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_error_display() {
        let err = ModelError::TypeMismatch {
            node: "rate".to_string(),
            expected: ValueKind::Real,
            actual: ValueKind::Tree,
        };
        assert_eq!(
            err.to_string(),
            "Type mismatch for node 'rate': expected Real, got Tree"
        );

        let err = ModelError::UnknownNode(7);
        assert_eq!(err.to_string(), "Unknown node id 7");
    }

    #[test]
    fn test_proposal_error_display() {
        let err = ProposalError::UndoWithoutProposal;
        assert_eq!(err.to_string(), "undo called without a pending proposal");
    }

    #[test]
    fn test_mcmc_error_from_model_error() {
        let model_err = ModelError::NotStochastic("mu".to_string());
        let mcmc_err: McmcError = model_err.into();
        assert!(matches!(mcmc_err, McmcError::Model(_)));
    }

    #[test]
    fn test_mcmc_error_from_proposal_error() {
        let mcmc_err: McmcError = ProposalError::UndoWithoutProposal.into();
        assert!(matches!(mcmc_err, McmcError::Proposal(_)));
    }
}
