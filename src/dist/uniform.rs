//! Uniform distribution

use rand::{Rng, RngCore};

use super::{guard_ln, real_param, Distribution};
use crate::value::{Value, ValueKind};

/// Continuous uniform distribution on `[lower, upper]`
///
/// Parameters: `lower` (real), `upper` (real).
#[derive(Clone, Copy, Debug, Default)]
pub struct Uniform;

impl Distribution for Uniform {
    fn name(&self) -> &'static str {
        "uniform"
    }

    fn param_kinds(&self) -> &'static [ValueKind] {
        &[ValueKind::Real, ValueKind::Real]
    }

    fn ln_probability(&self, value: &Value, params: &[Value]) -> f64 {
        let lower = real_param(params, 0);
        let upper = real_param(params, 1);
        let x = match value.as_real() {
            Some(x) => x,
            None => return f64::NEG_INFINITY,
        };
        if !(upper > lower) || x < lower || x > upper {
            return f64::NEG_INFINITY;
        }
        guard_ln(-(upper - lower).ln())
    }

    fn redraw(&self, params: &[Value], rng: &mut dyn RngCore) -> Value {
        let lower = real_param(params, 0);
        let upper = real_param(params, 1);
        let u: f64 = rng.gen();
        Value::Real(lower + u * (upper - lower))
    }
}
