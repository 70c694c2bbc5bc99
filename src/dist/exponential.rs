//! Exponential distribution

use rand::{Rng, RngCore};

use super::{guard_ln, real_param, Distribution};
use crate::value::{Value, ValueKind};

/// Exponential distribution with rate parameter
///
/// Parameters: `rate` (real, positive).
#[derive(Clone, Copy, Debug, Default)]
pub struct Exponential;

impl Distribution for Exponential {
    fn name(&self) -> &'static str {
        "exponential"
    }

    fn param_kinds(&self) -> &'static [ValueKind] {
        &[ValueKind::Real]
    }

    fn ln_probability(&self, value: &Value, params: &[Value]) -> f64 {
        let rate = real_param(params, 0);
        let x = match value.as_real() {
            Some(x) => x,
            None => return f64::NEG_INFINITY,
        };
        if !(rate > 0.0) || x < 0.0 {
            return f64::NEG_INFINITY;
        }
        guard_ln(rate.ln() - rate * x)
    }

    fn redraw(&self, params: &[Value], rng: &mut dyn RngCore) -> Value {
        let rate = real_param(params, 0);
        // inverse CDF; u in (0,1]
        let u: f64 = 1.0 - rng.gen::<f64>();
        Value::Real(-u.ln() / rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_density_at_zero_is_ln_rate() {
        let params = vec![Value::Real(2.0)];
        let ln = Exponential.ln_probability(&Value::Real(0.0), &params);
        assert!((ln - 2.0f64.ln()).abs() < 1e-12);
    }

    #[test]
    fn test_negative_value_is_neg_inf() {
        let params = vec![Value::Real(1.0)];
        assert_eq!(
            Exponential.ln_probability(&Value::Real(-1.0), &params),
            f64::NEG_INFINITY
        );
    }

    #[test]
    fn test_non_positive_rate_is_infeasible() {
        let params = vec![Value::Real(0.0)];
        assert_eq!(
            Exponential.ln_probability(&Value::Real(1.0), &params),
            f64::NEG_INFINITY
        );
    }

    #[test]
    fn test_redraw_is_non_negative() {
        let mut rng = StdRng::seed_from_u64(11);
        let params = vec![Value::Real(0.5)];
        for _ in 0..100 {
            let x = Exponential.redraw(&params, &mut rng).as_real().unwrap();
            assert!(x >= 0.0);
        }
    }

    #[test]
    fn test_redraw_mean_roughly_inverse_rate() {
        let mut rng = StdRng::seed_from_u64(13);
        let params = vec![Value::Real(2.0)];
        let n = 20_000;
        let mean: f64 = (0..n)
            .map(|_| Exponential.redraw(&params, &mut rng).as_real().unwrap())
            .sum::<f64>()
            / n as f64;
        assert!((mean - 0.5).abs() < 0.02);
    }
}
