//! Normal distribution

use rand::RngCore;
use rand_distr::Distribution as RandDistribution;

use super::{guard_ln, real_param, Distribution};
use crate::value::{Value, ValueKind};

const LN_SQRT_TWO_PI: f64 = 0.918_938_533_204_672_7;

/// Normal distribution
///
/// Parameters: `mean` (real), `sd` (real, positive).
#[derive(Clone, Copy, Debug, Default)]
pub struct Normal;

impl Distribution for Normal {
    fn name(&self) -> &'static str {
        "normal"
    }

    fn param_kinds(&self) -> &'static [ValueKind] {
        &[ValueKind::Real, ValueKind::Real]
    }

    fn ln_probability(&self, value: &Value, params: &[Value]) -> f64 {
        let mean = real_param(params, 0);
        let sd = real_param(params, 1);
        let x = match value.as_real() {
            Some(x) => x,
            None => return f64::NEG_INFINITY,
        };
        if !(sd > 0.0) {
            return f64::NEG_INFINITY;
        }
        let z = (x - mean) / sd;
        guard_ln(-0.5 * z * z - sd.ln() - LN_SQRT_TWO_PI)
    }

    fn redraw(&self, params: &[Value], rng: &mut dyn RngCore) -> Value {
        let mean = real_param(params, 0);
        let sd = real_param(params, 1);
        let draw = match rand_distr::Normal::new(mean, sd) {
            Ok(d) => d.sample(rng),
            Err(_) => f64::NAN,
        };
        Value::Real(draw)
    }
}
