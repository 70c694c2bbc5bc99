//! Vector scale proposal
//!
//! Jointly rescales every element of a real-vector node by one factor
//! `exp(lambda * (u - 0.5))`. With `n` independently scaled dimensions the
//! log Hastings ratio is `n * ln(factor)`.

use rand::{Rng, RngCore};

use super::{
    expect_real_vector, tune_step_size, Proposal, TARGET_ACCEPTANCE_MULTIVARIATE,
};
use crate::error::{McmcResult, ProposalError};
use crate::graph::model::ModelGraph;
use crate::graph::NodeId;
use crate::value::Value;

/// Joint multiplicative proposal for real-vector nodes
#[derive(Debug)]
pub struct VectorScaleProposal {
    nodes: [NodeId; 1],
    lambda: f64,
    stored_values: Option<Vec<f64>>,
}

impl VectorScaleProposal {
    /// Scale all elements of `node` with tuning parameter `lambda`
    pub fn new(node: NodeId, lambda: f64) -> Self {
        assert!(lambda > 0.0, "lambda must be positive");
        Self {
            nodes: [node],
            lambda,
            stored_values: None,
        }
    }

    /// Current tuning parameter
    pub fn lambda(&self) -> f64 {
        self.lambda
    }
}

impl Proposal for VectorScaleProposal {
    fn name(&self) -> &'static str {
        "vectorScale"
    }

    fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    fn target_acceptance_rate(&self) -> f64 {
        TARGET_ACCEPTANCE_MULTIVARIATE
    }

    fn propose(&mut self, graph: &mut ModelGraph, rng: &mut dyn RngCore) -> McmcResult<f64> {
        let node = self.nodes[0];
        let values = expect_real_vector(graph, node)?;

        let u: f64 = rng.gen();
        let scaling_factor = (self.lambda * (u - 0.5)).exp();
        let n = values.len();

        let scaled: Vec<f64> = values.iter().map(|&x| x * scaling_factor).collect();
        self.stored_values = Some(values);
        graph.set_value(node, Value::RealVector(scaled))?;

        Ok(n as f64 * scaling_factor.ln())
    }

    fn undo(&mut self, graph: &mut ModelGraph) -> McmcResult<()> {
        let values = self
            .stored_values
            .take()
            .ok_or(ProposalError::UndoWithoutProposal)?;
        graph.set_value(self.nodes[0], Value::RealVector(values))
    }

    fn clean(&mut self) {
        self.stored_values = None;
    }

    fn tune(&mut self, acceptance_rate: f64) {
        self.lambda = tune_step_size(
            self.lambda,
            acceptance_rate,
            TARGET_ACCEPTANCE_MULTIVARIATE,
        );
    }

    fn step_size(&self) -> Option<f64> {
        Some(self.lambda)
    }
}
