//! # dagmc
//!
//! A Metropolis-Hastings MCMC engine over directed acyclic graphs of
//! random variables.
//!
//! Models are built as a DAG of constant, deterministic and stochastic
//! nodes. Proposals mutate node values; the graph's touch/keep/restore
//! protocol tracks exactly which cached values and log-probabilities a
//! mutation invalidates, so each update costs only the affected part of
//! the model instead of a full recomputation.
//!
//! ## Core Concepts
//!
//! - **Speculative state**: a touched node keeps a backup; rejection
//!   restores it byte for byte, acceptance commits it
//! - **Delta evaluation**: acceptance ratios sum log-probability *changes*
//!   over the affected stochastic nodes only
//! - **Weighted move schedules**: proposals carry selection weights,
//!   acceptance statistics and self-tuning step sizes
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use dagmc::prelude::*;
//! use rand::SeedableRng;
//!
//! let mut rng = rand::rngs::StdRng::seed_from_u64(42);
//!
//! let mut graph = ModelGraph::new();
//! let lower = graph.add_constant("lower", 0.0);
//! let upper = graph.add_constant("upper", 10.0);
//! let x = graph.add_stochastic("x", Box::new(Uniform), &[lower, upper], 5.0)?;
//!
//! let mut chain = Mcmc::new(graph);
//! chain.add_move(Move::new(Box::new(ScaleProposal::new(x, 1.0)), 1.0));
//! chain.burnin(1_000, 100, &mut rng)?;
//! chain.run(10_000, &mut rng)?;
//! ```

pub mod dist;
pub mod error;
pub mod function;
pub mod graph;
pub mod monitor;
pub mod moves;
pub mod proposal;
pub mod sampler;
pub mod tree;
pub mod value;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::dist::{Distribution, Exponential, LogNormal, Normal, Uniform};
    pub use crate::error::*;
    pub use crate::function::{
        DeterministicFunction, ExpTransform, Product, Sum, TreeLength,
    };
    pub use crate::graph::prelude::*;
    pub use crate::monitor::{Monitor, ScreenMonitor, TraceMonitor, TraceRow};
    pub use crate::moves::{Heat, Move, MoveOutcome, MoveStats};
    pub use crate::proposal::{
        Proposal, ScaleProposal, SlideProposal, SubtreeScaleProposal, VectorScaleProposal,
    };
    pub use crate::sampler::{run_independent_chains, Mcmc};
    pub use crate::tree::TimeTree;
    pub use crate::value::{Value, ValueKind};
}
