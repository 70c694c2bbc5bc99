//! Slide proposal
//!
//! Adds `delta = lambda * (u - 0.5)` with `u ~ Uniform(0,1)` to an
//! unconstrained scalar. The proposal density is symmetric, so the log
//! Hastings ratio is exactly zero.

use rand::{Rng, RngCore};

use super::{assign_real, expect_real, tune_step_size, Proposal, TARGET_ACCEPTANCE_SCALAR};
use crate::error::{McmcResult, ProposalError};
use crate::graph::model::ModelGraph;
use crate::graph::NodeId;

/// Additive proposal for unconstrained scalar nodes
#[derive(Debug)]
pub struct SlideProposal {
    nodes: [NodeId; 1],
    lambda: f64,
    stored_value: Option<f64>,
}

impl SlideProposal {
    /// Slide `node` with window parameter `lambda`
    pub fn new(node: NodeId, lambda: f64) -> Self {
        assert!(lambda > 0.0, "lambda must be positive");
        Self {
            nodes: [node],
            lambda,
            stored_value: None,
        }
    }

    /// Current tuning parameter
    pub fn lambda(&self) -> f64 {
        self.lambda
    }
}

impl Proposal for SlideProposal {
    fn name(&self) -> &'static str {
        "slide"
    }

    fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    fn propose(&mut self, graph: &mut ModelGraph, rng: &mut dyn RngCore) -> McmcResult<f64> {
        let node = self.nodes[0];
        let x = expect_real(graph, node)?;

        let u: f64 = rng.gen();
        let delta = self.lambda * (u - 0.5);

        self.stored_value = Some(x);
        assign_real(graph, node, x + delta)?;

        Ok(0.0)
    }

    fn undo(&mut self, graph: &mut ModelGraph) -> McmcResult<()> {
        let x = self
            .stored_value
            .take()
            .ok_or(ProposalError::UndoWithoutProposal)?;
        assign_real(graph, self.nodes[0], x)
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dist::Normal;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn model_with_value(x: f64) -> (ModelGraph, NodeId) {
        let mut graph = ModelGraph::new();
        let mean = graph.add_constant("mean", 0.0);
        let sd = graph.add_constant("sd", 1.0);
        let node = graph
            .add_stochastic("x", Box::new(Normal), &[mean, sd], x)
            .unwrap();
        (graph, node)
    }

    #[test]
    fn test_hastings_ratio_is_always_zero() {
        let (mut graph, node) = model_with_value(0.0);
        let mut rng = StdRng::seed_from_u64(5);
        for lambda in [0.01, 1.0, 100.0] {
            let mut proposal = SlideProposal::new(node, lambda);
            for _ in 0..20 {
                let ln_hastings = proposal.propose(&mut graph, &mut rng).unwrap();
                assert_eq!(ln_hastings, 0.0);
                proposal.undo(&mut graph).unwrap();
            }
        }
    }

    #[test]
    fn test_displacement_bounded_by_half_window() {
        let (mut graph, node) = model_with_value(1.0);
        let mut proposal = SlideProposal::new(node, 0.5);
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..100 {
            proposal.propose(&mut graph, &mut rng).unwrap();
            let x = expect_real(&graph, node).unwrap();
            assert!((x - 1.0).abs() <= 0.25 + 1e-12);
            proposal.undo(&mut graph).unwrap();
        }
    }

    #[test]
    fn test_undo_restores_exactly() {
        let (mut graph, node) = model_with_value(-2.5);
        let mut proposal = SlideProposal::new(node, 3.0);
        let mut rng = StdRng::seed_from_u64(13);
        proposal.propose(&mut graph, &mut rng).unwrap();
        proposal.undo(&mut graph).unwrap();
        assert_eq!(expect_real(&graph, node).unwrap(), -2.5);
    }

    #[test]
    fn test_undo_without_proposal_fails() {
        let (mut graph, node) = model_with_value(0.0);
        let mut proposal = SlideProposal::new(node, 1.0);
        assert!(proposal.undo(&mut graph).is_err());
    }
}
