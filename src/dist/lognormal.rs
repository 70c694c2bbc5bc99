//! Log-normal distribution

use rand::RngCore;
use rand_distr::Distribution as RandDistribution;

use super::{guard_ln, real_param, Distribution};
use crate::value::{Value, ValueKind};

const LN_SQRT_TWO_PI: f64 = 0.918_938_533_204_672_7;

/// Log-normal distribution
///
/// Parameters: `mu` (real, log-scale mean), `sigma` (real, positive).
#[derive(Clone, Copy, Debug, Default)]
pub struct LogNormal;

impl Distribution for LogNormal {
    fn name(&self) -> &'static str {
        "lognormal"
    }

    fn param_kinds(&self) -> &'static [ValueKind] {
        &[ValueKind::Real, ValueKind::Real]
    }

    fn ln_probability(&self, value: &Value, params: &[Value]) -> f64 {
        let mu = real_param(params, 0);
        let sigma = real_param(params, 1);
        let x = match value.as_real() {
            Some(x) => x,
            None => return f64::NEG_INFINITY,
        };
        if !(sigma > 0.0) || x <= 0.0 {
            return f64::NEG_INFINITY;
        }
        let z = (x.ln() - mu) / sigma;
        guard_ln(-0.5 * z * z - x.ln() - sigma.ln() - LN_SQRT_TWO_PI)
    }

    fn redraw(&self, params: &[Value], rng: &mut dyn RngCore) -> Value {
        let mu = real_param(params, 0);
        let sigma = real_param(params, 1);
        let draw = match rand_distr::LogNormal::new(mu, sigma) {
            Ok(d) => d.sample(rng),
            Err(_) => f64::NAN,
        };
        Value::Real(draw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn params(mu: f64, sigma: f64) -> Vec<Value> {
        vec![Value::Real(mu), Value::Real(sigma)]
    }

    #[test]
    fn test_support_is_positive_reals() {
        let d = LogNormal;
        assert_eq!(
            d.ln_probability(&Value::Real(0.0), &params(0.0, 1.0)),
            f64::NEG_INFINITY
        );
        assert_eq!(
            d.ln_probability(&Value::Real(-1.0), &params(0.0, 1.0)),
            f64::NEG_INFINITY
        );
        assert!(d.ln_probability(&Value::Real(1.0), &params(0.0, 1.0)).is_finite());
    }

    #[test]
    fn test_density_at_one_matches_normal_at_zero() {
        // ln(1) = 0, and the Jacobian term 1/x vanishes at x = 1
        let ln = LogNormal.ln_probability(&Value::Real(1.0), &params(0.0, 1.0));
        assert!((ln - (-LN_SQRT_TWO_PI)).abs() < 1e-12);
    }

    #[test]
    fn test_redraw_is_positive() {
        let mut rng = StdRng::seed_from_u64(23);
        let p = params(0.0, 0.5);
        for _ in 0..100 {
            let x = LogNormal.redraw(&p, &mut rng).as_real().unwrap();
            assert!(x > 0.0);
        }
    }
}
