//! Subtree scale proposal
//!
//! Picks an interior, non-root tree node uniformly at random, draws a new
//! age for it uniformly between the oldest tip below it and its parent's
//! age, and rescales the ages of all interior nodes in its subtree by the
//! ratio of new to old age. Tip ages are fixed data and never move.
//!
//! With `n` rescaled nodes the log Hastings ratio is
//! `(n - 1) * ln(scaleFactor)`. A draw that leaves any descendant older
//! than its parent (possible with serially sampled tips) is reported as
//! infeasible via `-infinity`, never as a tree with negative branch
//! lengths.

use rand::{Rng, RngCore};

use super::{expect_tree, Proposal};
use crate::error::{McmcResult, ProposalError};
use crate::graph::model::ModelGraph;
use crate::graph::NodeId;
use crate::value::Value;

/// Subtree age rescaling for tree-valued nodes
///
/// Has no tunable step size; the proposal window is dictated by the tree
/// itself.
#[derive(Debug)]
pub struct SubtreeScaleProposal {
    nodes: [NodeId; 1],
    stored_ages: Option<Vec<f64>>,
}

impl SubtreeScaleProposal {
    /// Rescale subtrees of the tree held by `node`
    pub fn new(node: NodeId) -> Self {
        Self {
            nodes: [node],
            stored_ages: None,
        }
    }
}

impl Proposal for SubtreeScaleProposal {
    fn name(&self) -> &'static str {
        "subtreeScale"
    }

    fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    fn propose(&mut self, graph: &mut ModelGraph, rng: &mut dyn RngCore) -> McmcResult<f64> {
        let node = self.nodes[0];
        let mut tree = expect_tree(graph, node)?;
        self.stored_ages = Some(tree.ages());

        let candidates = tree.interior_non_root_nodes();
        if candidates.is_empty() {
            // two-tip trees have nothing to rescale
            return Ok(f64::NEG_INFINITY);
        }
        let chosen = candidates[rng.gen_range(0..candidates.len())];

        let parent = match tree.parent(chosen) {
            Some(p) => p,
            None => return Ok(f64::NEG_INFINITY),
        };
        let parent_age = tree.age(parent);
        let my_age = tree.age(chosen);
        let oldest_tip = tree.oldest_tip_age(chosen);
        if !(my_age > 0.0) || parent_age <= oldest_tip {
            return Ok(f64::NEG_INFINITY);
        }

        let u: f64 = rng.gen();
        let my_new_age = oldest_tip + u * (parent_age - oldest_tip);
        let scaling_factor = my_new_age / my_age;

        let num_rescaled = tree.rescale_subtree(chosen, scaling_factor);
        let feasible = tree.is_consistent();
        graph.set_value(node, Value::Tree(tree))?;

        if !feasible {
            return Ok(f64::NEG_INFINITY);
        }
        Ok((num_rescaled as f64 - 1.0) * scaling_factor.ln())
    }

    fn undo(&mut self, graph: &mut ModelGraph) -> McmcResult<()> {
        let ages = self
            .stored_ages
            .take()
            .ok_or(ProposalError::UndoWithoutProposal)?;
        let node = self.nodes[0];
        let mut tree = expect_tree(graph, node)?;
        tree.set_ages(&ages);
        graph.set_value(node, Value::Tree(tree))
    }

    fn clean(&mut self) {
        self.stored_ages = None;
    }
}
