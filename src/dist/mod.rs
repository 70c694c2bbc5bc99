//! Probability distributions
//!
//! A stochastic DAG node owns a [`Distribution`] that scores its current
//! value against its parents' current values and can redraw a fresh value
//! from the prior. The engine treats distributions as opaque strategy
//! objects; the implementations here cover the common scalar priors and are
//! what the test suite samples against.
//!
//! ## The `-infinity` convention
//!
//! A distribution never errors on an out-of-domain value. It returns
//! `f64::NEG_INFINITY` from [`Distribution::ln_probability`], which the
//! sampler reads as "certain rejection". This keeps the hot path free of
//! allocation and unwinding; millions of density evaluations happen per run.

pub mod exponential;
pub mod lognormal;
pub mod normal;
pub mod uniform;

pub use exponential::Exponential;
pub use lognormal::LogNormal;
pub use normal::Normal;
pub use uniform::Uniform;

use rand::RngCore;

use crate::value::{Value, ValueKind};

/// A probability distribution attached to a stochastic node
pub trait Distribution: Send + Sync {
    /// Human-readable name, used in structure printouts
    fn name(&self) -> &'static str;

    /// Parameter kinds this distribution expects, in order
    ///
    /// Checked structurally when the node is wired into the graph.
    fn param_kinds(&self) -> &'static [ValueKind];

    /// Log-density of `value` given the parents' current values
    ///
    /// Returns `f64::NEG_INFINITY` when the value is outside the support or
    /// the parameter combination is itself infeasible.
    fn ln_probability(&self, value: &Value, params: &[Value]) -> f64;

    /// Draw a fresh value from the distribution
    fn redraw(&self, params: &[Value], rng: &mut dyn RngCore) -> Value;
}

/// Extract a real parameter, yielding NaN when the payload kind is wrong
///
/// Wrong kinds are caught structurally at graph construction; the NaN path
/// only matters if a caller bypasses that check, and NaN densities degrade
/// to `-infinity` downstream.
pub(crate) fn real_param(params: &[Value], index: usize) -> f64 {
    params
        .get(index)
        .and_then(Value::as_real)
        .unwrap_or(f64::NAN)
}

/// Map a possibly-NaN log-density onto the `-infinity` sentinel
pub(crate) fn guard_ln(ln: f64) -> f64 {
    if ln.is_nan() {
        f64::NEG_INFINITY
    } else {
        ln
    }
}
