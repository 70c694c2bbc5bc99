//! Scale proposal
//!
//! Multiplies a positive scalar by `exp(lambda * (u - 0.5))` with
//! `u ~ Uniform(0,1)`. The move is asymmetric; the log Hastings ratio is
//! the log of the scaling factor.

use rand::{Rng, RngCore};

use super::{assign_real, expect_real, tune_step_size, Proposal, TARGET_ACCEPTANCE_SCALAR};
use crate::error::{McmcResult, ProposalError};
use crate::graph::model::ModelGraph;
use crate::graph::NodeId;

/// Multiplicative proposal for positive scalar nodes
///
/// May be bound to several candidate nodes; `prepare` then picks one
/// uniformly at random each iteration.
#[derive(Debug)]
pub struct ScaleProposal {
    nodes: Vec<NodeId>,
    active: usize,
    lambda: f64,
    stored_value: Option<f64>,
}

impl ScaleProposal {
    /// Scale a single node with tuning parameter `lambda`
    pub fn new(node: NodeId, lambda: f64) -> Self {
        Self::over(vec![node], lambda)
    }

    /// Scale one node picked uniformly from `nodes` each iteration
    pub fn over(nodes: Vec<NodeId>, lambda: f64) -> Self {
        assert!(!nodes.is_empty(), "ScaleProposal needs at least one node");
        assert!(lambda > 0.0, "lambda must be positive");
        Self {
            nodes,
            active: 0,
            lambda,
            stored_value: None,
        }
    }

    /// Current tuning parameter
    pub fn lambda(&self) -> f64 {
        self.lambda
    }
}

impl Proposal for ScaleProposal {
    fn name(&self) -> &'static str {
        "scale"
    }

    fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    fn mutated_nodes(&self) -> &[NodeId] {
        &self.nodes[self.active..=self.active]
    }

    fn prepare(&mut self, _graph: &mut ModelGraph, rng: &mut dyn RngCore) -> McmcResult<()> {
        self.active = if self.nodes.len() > 1 {
            rng.gen_range(0..self.nodes.len())
        } else {
            0
        };
        Ok(())
    }

    fn propose(&mut self, graph: &mut ModelGraph, rng: &mut dyn RngCore) -> McmcResult<f64> {
        let node = self.nodes[self.active];
        let x = expect_real(graph, node)?;

        let u: f64 = rng.gen();
        let scaling_factor = (self.lambda * (u - 0.5)).exp();

        self.stored_value = Some(x);
        assign_real(graph, node, x * scaling_factor)?;

        Ok(scaling_factor.ln())
    }

    fn undo(&mut self, graph: &mut ModelGraph) -> McmcResult<()> {
        let x = self
            .stored_value
            .take()
            .ok_or(ProposalError::UndoWithoutProposal)?;
        assign_real(graph, self.nodes[self.active], x)
    }

    fn clean(&mut self) {
        self.stored_value = None;
    }

    fn tune(&mut self, acceptance_rate: f64) {
        self.lambda = tune_step_size(self.lambda, acceptance_rate, TARGET_ACCEPTANCE_SCALAR);
    }

    fn step_size(&self) -> Option<f64> {
        Some(self.lambda)
    }
}
