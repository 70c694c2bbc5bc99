//! Proposal strategies
//!
//! A [`Proposal`] is a pure mutation strategy bound to one or more graph
//! nodes. It mutates values through [`ModelGraph::set_value`], which saves
//! the node's rollback state before overwriting, reports the log Hastings
//! ratio of the mutation, and can exactly reverse its last mutation from
//! proposal-local backup state.
//!
//! The proposal backup is distinct from, and complementary to, the node's
//! own value cache: the node backup guards dependents' cached values and
//! log-probabilities, the proposal backup guards the mutated value itself.
//!
//! A proposal that produces an infeasible state (e.g. a negative branch
//! length) reports `f64::NEG_INFINITY` as its Hastings ratio; the move
//! layer then rejects and undoes without touching the accept/reject coin.

pub mod scale;
pub mod slide;
pub mod subtree_scale;
pub mod vector_scale;

pub use scale::ScaleProposal;
pub use slide::SlideProposal;
pub use subtree_scale::SubtreeScaleProposal;
pub use vector_scale::VectorScaleProposal;

use rand::RngCore;

use crate::error::{McmcResult, ModelError};
use crate::graph::model::ModelGraph;
use crate::graph::NodeId;
use crate::tree::TimeTree;
use crate::value::{Value, ValueKind};

/// Target acceptance rate for scalar proposals
pub const TARGET_ACCEPTANCE_SCALAR: f64 = 0.44;

/// Target acceptance rate for multivariate proposals
pub const TARGET_ACCEPTANCE_MULTIVARIATE: f64 = 0.234;

/// A mutation strategy with exact rollback and a Hastings ratio
pub trait Proposal: Send {
    /// Human-readable name, used in operator summaries
    fn name(&self) -> &'static str;

    /// All nodes this proposal may mutate
    fn nodes(&self) -> &[NodeId];

    /// The nodes mutated by the *last* `propose` call
    ///
    /// Defaults to the full node set; proposals that pick one node out of a
    /// pool narrow this down so the move layer only touches what changed.
    fn mutated_nodes(&self) -> &[NodeId] {
        self.nodes()
    }

    /// Acceptance rate this proposal's step size is tuned toward
    fn target_acceptance_rate(&self) -> f64 {
        TARGET_ACCEPTANCE_SCALAR
    }

    /// Optional setup before `propose`, e.g. picking a random node
    ///
    /// Contributes nothing to the Hastings ratio.
    fn prepare(&mut self, _graph: &mut ModelGraph, _rng: &mut dyn RngCore) -> McmcResult<()> {
        Ok(())
    }

    /// Mutate the bound node(s) and return the log Hastings ratio
    ///
    /// Returns `f64::NEG_INFINITY` when the proposed state is infeasible.
    fn propose(&mut self, graph: &mut ModelGraph, rng: &mut dyn RngCore) -> McmcResult<f64>;

    /// Exactly reverse the last `propose`
    ///
    /// Callable at most once per `propose`; calling it without a pending
    /// proposal is a protocol violation and fails with
    /// [`crate::error::ProposalError::UndoWithoutProposal`].
    fn undo(&mut self, graph: &mut ModelGraph) -> McmcResult<()>;

    /// Release transient bookkeeping after a decision is finalized
    fn clean(&mut self) {}

    /// Adjust the step size toward the target acceptance rate
    ///
    /// No-op for proposals without a tunable step size.
    fn tune(&mut self, _acceptance_rate: f64) {}

    /// Current step size, if the proposal has one
    fn step_size(&self) -> Option<f64> {
        None
    }
}

/// Multiplicative step-size update toward a target acceptance rate
///
/// Widens the step when the observed rate is above target and narrows it
/// when below, with the adjustment magnitude proportional to the distance
/// from target. At the target the step size is unchanged.
pub fn tune_step_size(step_size: f64, acceptance_rate: f64, target: f64) -> f64 {
    if acceptance_rate > target {
        step_size * (1.0 + (acceptance_rate - target) / (1.0 - target))
    } else {
        step_size / (2.0 - acceptance_rate / target)
    }
}

/// Read a node's current value as a real, failing structurally otherwise
pub(crate) fn expect_real(graph: &ModelGraph, id: NodeId) -> McmcResult<f64> {
    let node = graph.node(id)?;
    node.current_value().as_real().ok_or_else(|| {
        ModelError::TypeMismatch {
            node: node.name().to_string(),
            expected: ValueKind::Real,
            actual: node.current_value().kind(),
        }
        .into()
    })
}

/// Read a node's current value as a real vector clone
pub(crate) fn expect_real_vector(graph: &ModelGraph, id: NodeId) -> McmcResult<Vec<f64>> {
    let node = graph.node(id)?;
    node.current_value()
        .as_real_vector()
        .map(<[f64]>::to_vec)
        .ok_or_else(|| {
            ModelError::TypeMismatch {
                node: node.name().to_string(),
                expected: ValueKind::RealVector,
                actual: node.current_value().kind(),
            }
            .into()
        })
}

/// Read a node's current value as a tree clone
pub(crate) fn expect_tree(graph: &ModelGraph, id: NodeId) -> McmcResult<TimeTree> {
    let node = graph.node(id)?;
    node.current_value().as_tree().cloned().ok_or_else(|| {
        ModelError::TypeMismatch {
            node: node.name().to_string(),
            expected: ValueKind::Tree,
            actual: node.current_value().kind(),
        }
        .into()
    })
}

/// Assign a real value to a node through the graph's rollback-saving
/// assignment
pub(crate) fn assign_real(graph: &mut ModelGraph, id: NodeId, x: f64) -> McmcResult<()> {
    graph.set_value(id, Value::Real(x))
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tuning_is_neutral_at_target() {
        let tuned = tune_step_size(1.0, 0.44, 0.44);
        assert!((tuned - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_tuning_widens_above_target() {
        assert!(tune_step_size(1.0, 0.9, 0.44) > 1.0);
        assert!(tune_step_size(1.0, 0.45, 0.44) > 1.0);
    }

    #[test]
    fn test_tuning_narrows_below_target() {
        assert!(tune_step_size(1.0, 0.1, 0.44) < 1.0);
        assert!(tune_step_size(1.0, 0.0, 0.44) < 1.0);
    }

    #[test]
    fn test_tuning_magnitude_scales_with_distance() {
        let near = tune_step_size(1.0, 0.5, 0.44);
        let far = tune_step_size(1.0, 0.95, 0.44);
        assert!(far > near);
    }
}
