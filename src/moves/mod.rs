//! Metropolis-Hastings moves
//!
//! A [`Move`] wraps a [`Proposal`] with a selection weight, acceptance
//! bookkeeping and the accept/reject protocol itself. One call to
//! [`Move::perform`] is one full Metropolis-Hastings update:
//!
//! 1. the proposal mutates its nodes through the graph's rollback-saving
//!    assignment and reports the log Hastings ratio;
//! 2. the mutated nodes are touched so dependents are marked stale; the
//!    assignment already touched them, so this is an idempotent safety net
//!    for proposals mutating through other paths;
//! 3. the affected stochastic nodes are collected and their
//!    log-probability deltas summed, split into prior (unclamped) and
//!    likelihood (clamped) terms;
//! 4. the heated acceptance ratio decides: commit via `keep`, or roll back
//!    via the proposal's `undo` followed by `restore`.
//!
//! Rollback is two-layered on purpose. `undo` reverts the mutated value
//! itself from the proposal's backup; `restore` reverts every dependent's
//! cached value and log-probability from the node backups. Both are needed
//! for a rejection to leave the graph byte-for-byte where it started.

use serde::{Deserialize, Serialize};

use rand::{Rng, RngCore};

use crate::error::McmcResult;
use crate::graph::model::ModelGraph;
use crate::graph::NodeId;
use crate::proposal::Proposal;

/// Log acceptance ratios below this are rejected without drawing a uniform
///
/// `exp(-300)` underflows far past any representable coin flip.
const LN_ACCEPTANCE_AUTO_REJECT: f64 = -300.0;

/// Chain heating factors applied to the acceptance ratio
///
/// The heated log acceptance ratio is
/// `posterior * (likelihood * lnLikelihoodRatio + prior * lnPriorRatio)`
/// plus the log Hastings ratio. A cold chain uses all ones.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Heat {
    /// Factor on the prior term
    pub prior: f64,
    /// Factor on the likelihood term
    pub likelihood: f64,
    /// Factor on the whole posterior ratio
    pub posterior: f64,
}

impl Default for Heat {
    fn default() -> Self {
        Self {
            prior: 1.0,
            likelihood: 1.0,
            posterior: 1.0,
        }
    }
}

impl Heat {
    /// The cold chain: no heating at all
    pub fn cold() -> Self {
        Self::default()
    }

    /// Flatten the whole posterior by `beta` in `[0, 1]`; zero samples the
    /// proposal distribution alone
    pub fn tempered(beta: f64) -> Self {
        Self {
            posterior: beta,
            ..Self::default()
        }
    }
}

/// Outcome of one Metropolis-Hastings update
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveOutcome {
    /// The proposed state was committed
    Accepted,
    /// The previous state was rolled back into place
    Rejected,
}

/// Acceptance statistics of a move, for operator summaries
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MoveStats {
    /// Proposal name
    pub name: String,
    /// Selection weight within the schedule
    pub weight: f64,
    /// Total updates performed
    pub tries: u64,
    /// Total updates accepted
    pub accepted: u64,
    /// Lifetime acceptance rate
    pub acceptance_rate: f64,
    /// Current step size, for tunable proposals
    pub step_size: Option<f64>,
}

/// A weighted, tunable Metropolis-Hastings move
pub struct Move {
    proposal: Box<dyn Proposal>,
    weight: f64,
    auto_tune: bool,
    tries: u64,
    accepted: u64,
    tries_period: u64,
    accepted_period: u64,
}

impl Move {
    /// Wrap `proposal` with selection weight `weight`
    ///
    /// Auto-tuning is enabled; disable it with [`Move::without_tuning`].
    pub fn new(proposal: Box<dyn Proposal>, weight: f64) -> Self {
        assert!(weight > 0.0, "move weight must be positive");
        Self {
            proposal,
            weight,
            auto_tune: true,
            tries: 0,
            accepted: 0,
            tries_period: 0,
            accepted_period: 0,
        }
    }

    /// Exclude this move from step-size tuning
    pub fn without_tuning(mut self) -> Self {
        self.auto_tune = false;
        self
    }

    /// Proposal name
    pub fn name(&self) -> &'static str {
        self.proposal.name()
    }

    /// Selection weight within the schedule
    pub fn weight(&self) -> f64 {
        self.weight
    }

    /// Total updates performed
    pub fn tries(&self) -> u64 {
        self.tries
    }

    /// Total updates accepted
    pub fn accepted(&self) -> u64 {
        self.accepted
    }

    /// Lifetime acceptance rate; zero before the first update
    pub fn acceptance_rate(&self) -> f64 {
        if self.tries == 0 {
            0.0
        } else {
            self.accepted as f64 / self.tries as f64
        }
    }

    /// Acceptance rate within the current tuning period
    pub fn period_acceptance_rate(&self) -> f64 {
        if self.tries_period == 0 {
            0.0
        } else {
            self.accepted_period as f64 / self.tries_period as f64
        }
    }

    /// Statistics snapshot for operator summaries
    pub fn stats(&self) -> MoveStats {
        MoveStats {
            name: self.name().to_string(),
            weight: self.weight,
            tries: self.tries,
            accepted: self.accepted,
            acceptance_rate: self.acceptance_rate(),
            step_size: self.proposal.step_size(),
        }
    }

    /// One cold-chain Metropolis-Hastings update
    pub fn perform(
        &mut self,
        graph: &mut ModelGraph,
        rng: &mut dyn RngCore,
    ) -> McmcResult<MoveOutcome> {
        self.perform_heated(graph, rng, Heat::cold())
    }

    /// One Metropolis-Hastings update with chain heating
    pub fn perform_heated(
        &mut self,
        graph: &mut ModelGraph,
        rng: &mut dyn RngCore,
        heat: Heat,
    ) -> McmcResult<MoveOutcome> {
        self.tries += 1;
        self.tries_period += 1;

        self.proposal.prepare(graph, rng)?;
        let ln_hastings = self.proposal.propose(graph, rng)?;
        let mutated: Vec<NodeId> = self.proposal.mutated_nodes().to_vec();
        for &node in &mutated {
            graph.touch(node)?;
        }

        // an infeasible proposal never reaches the coin flip
        if !ln_hastings.is_nan() && ln_hastings > f64::NEG_INFINITY {
            let affected = graph.affected_nodes(&mutated)?;
            let mut ln_prior_ratio = 0.0;
            let mut ln_likelihood_ratio = 0.0;
            for &node in &affected {
                let delta = graph.ln_probability_ratio(node)?;
                if graph.is_clamped(node)? {
                    ln_likelihood_ratio += delta;
                } else {
                    ln_prior_ratio += delta;
                }
            }

            let ln_acceptance = heat.posterior
                * (heat.likelihood * ln_likelihood_ratio + heat.prior * ln_prior_ratio)
                + ln_hastings;

            // NaN fails both comparisons and falls through to rejection
            let accept = if ln_acceptance >= 0.0 {
                true
            } else if !(ln_acceptance > LN_ACCEPTANCE_AUTO_REJECT) {
                false
            } else {
                rng.gen::<f64>() < ln_acceptance.exp()
            };

            if accept {
                for &node in &mutated {
                    graph.keep(node)?;
                }
                self.proposal.clean();
                self.accepted += 1;
                self.accepted_period += 1;
                return Ok(MoveOutcome::Accepted);
            }
        }

        self.proposal.undo(graph)?;
        for &node in &mutated {
            graph.restore(node)?;
        }
        Ok(MoveOutcome::Rejected)
    }

    /// Tune the proposal's step size from this period's acceptance rate,
    /// then start a new period
    ///
    /// No-op for moves with tuning disabled or an empty period.
    pub fn tune(&mut self) {
        if self.auto_tune && self.tries_period > 0 {
            let rate = self.period_acceptance_rate();
            self.proposal.tune(rate);
        }
        self.tries_period = 0;
        self.accepted_period = 0;
    }
}

impl std::fmt::Debug for Move {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Move")
            .field("name", &self.name())
            .field("weight", &self.weight)
            .field("tries", &self.tries)
            .field("accepted", &self.accepted)
            .finish()
    }
}
