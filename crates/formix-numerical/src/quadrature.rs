//! Quadrature rules
//!
//! Abscissas and weights that are not exact in every domain (Tanh-Sinh and
//! Clenshaw-Curtis) are computed as doubles and converted once per point.

use crate::differentiation::central_difference;
use formix_types::{Domain, FormixError, Result};
use log::{debug, trace};
use std::f64::consts::PI;

/// Largest |t| sampled by Tanh-Sinh before abscissas round to the endpoints
const TANH_SINH_SPAN: f64 = 3.5;

fn require_panels(function: &str, panels: usize) -> Result<()> {
    if panels == 0 {
        return Err(FormixError::Evaluation(format!(
            "{} needs at least one panel",
            function
        )));
    }
    Ok(())
}

/// Composite trapezoidal rule on `panels` equal panels
///
/// Formula: h·[f(a)/2 + f(a+h) + … + f(b-h) + f(b)/2], h = (b-a)/n
pub fn trapezoid<D, F>(domain: &D, mut f: F, a: &D::Value, b: &D::Value, panels: usize) -> Result<D::Value>
where
    D: Domain,
    F: FnMut(&D::Value) -> Result<D::Value>,
{
    require_panels("trapezoid", panels)?;
    let n = domain.from_integer(panels as i64);
    let h = domain.divide(&domain.subtract(b, a)?, &n)?;

    let half = domain.from_ratio(1, 2)?;
    let ends = domain.add(&f(a)?, &f(b)?)?;
    let mut total = domain.multiply(&ends, &half)?;
    for i in 1..panels {
        let x = domain.add(a, &domain.multiply(&domain.from_integer(i as i64), &h)?)?;
        total = domain.add(&total, &f(&x)?)?;
    }
    Ok(domain.multiply(&total, &h)?)
}

/// Trapezoid with the first Euler-Maclaurin end correction
///
/// Formula: T(h) - h²/12·(f'(b) - f'(a)); the end slopes are central
/// differences with step h/1000.
pub fn trapezoid_adjusted<D, F>(
    domain: &D,
    mut f: F,
    a: &D::Value,
    b: &D::Value,
    panels: usize,
) -> Result<D::Value>
where
    D: Domain,
    F: FnMut(&D::Value) -> Result<D::Value>,
{
    require_panels("adjusted trapezoid", panels)?;
    let base = trapezoid(domain, &mut f, a, b, panels)?;

    let n = domain.from_integer(panels as i64);
    let h = domain.divide(&domain.subtract(b, a)?, &n)?;
    if domain.is_zero(&h) {
        return Ok(base);
    }
    let slope_step = domain.divide(&h, &domain.from_integer(1000))?;
    let slope_b = central_difference(domain, &mut f, b, 1, &slope_step)?;
    let slope_a = central_difference(domain, &mut f, a, 1, &slope_step)?;

    let h_squared = domain.multiply(&h, &h)?;
    let factor = domain.divide(&h_squared, &domain.from_integer(12))?;
    let correction = domain.multiply(&factor, &domain.subtract(&slope_b, &slope_a)?)?;
    Ok(domain.subtract(&base, &correction)?)
}

/// Result of a Tanh-Sinh run
#[derive(Debug, Clone, PartialEq)]
pub struct TanhSinhOutcome<T> {
    pub value: T,
    /// Magnitude of the change between the last two levels
    pub error_estimate: f64,
    pub levels_used: u32,
}

/// Double-exponential (Tanh-Sinh) quadrature
///
/// Substitution x = c + r·tanh(π/2·sinh t) on a step h = 2⁻ˡ that halves each
/// level. Only the new odd-indexed nodes are evaluated on refinement. Stops
/// when two successive levels agree within `tolerance` (relative to the
/// estimate, absolute below magnitude 1) or after `max_levels`.
pub fn tanh_sinh<D, F>(
    domain: &D,
    mut f: F,
    a: &D::Value,
    b: &D::Value,
    max_levels: u32,
    tolerance: f64,
) -> Result<TanhSinhOutcome<D::Value>>
where
    D: Domain,
    F: FnMut(&D::Value) -> Result<D::Value>,
{
    let half = domain.from_ratio(1, 2)?;
    let center = domain.multiply(&domain.add(a, b)?, &half)?;
    let radius = domain.multiply(&domain.subtract(b, a)?, &half)?;
    if domain.is_zero(&radius) {
        return Ok(TanhSinhOutcome {
            value: domain.zero(),
            error_estimate: 0.0,
            levels_used: 0,
        });
    }

    let node = |t: f64, f: &mut F| -> Result<Option<D::Value>> {
        let u = PI / 2.0 * t.sinh();
        let abscissa = u.tanh();
        if 1.0 - abscissa.abs() <= 0.0 {
            return Ok(None);
        }
        let cosh_u = u.cosh();
        let weight = PI / 2.0 * t.cosh() / (cosh_u * cosh_u);
        if weight == 0.0 {
            return Ok(None);
        }
        let offset = domain.multiply(&radius, &domain.from_double(abscissa)?)?;
        let x = domain.add(&center, &offset)?;
        let y = f(&x)?;
        Ok(Some(domain.multiply(&domain.from_double(weight)?, &y)?))
    };

    // level 0: h = 1, all integer t
    let mut sum = match node(0.0, &mut f)? {
        Some(v) => v,
        None => domain.zero(),
    };
    let mut k = 1.0;
    while k <= TANH_SINH_SPAN {
        for t in [k, -k] {
            if let Some(term) = node(t, &mut f)? {
                sum = domain.add(&sum, &term)?;
            }
        }
        k += 1.0;
    }
    let mut estimate = domain.multiply(&sum, &radius)?;
    let mut error_estimate = f64::INFINITY;
    let mut level = 0;

    while level < max_levels {
        level += 1;
        let h = 0.5f64.powi(level as i32);
        // odd multiples of h are the nodes new at this level
        let mut j = 1u64;
        while j as f64 * h <= TANH_SINH_SPAN {
            let t = j as f64 * h;
            for t in [t, -t] {
                if let Some(term) = node(t, &mut f)? {
                    sum = domain.add(&sum, &term)?;
                }
            }
            j += 2;
        }

        let next = domain.multiply(&domain.multiply(&sum, &domain.from_double(h)?)?, &radius)?;
        error_estimate = domain.magnitude(&domain.subtract(&next, &estimate)?);
        estimate = next;
        trace!("tanh-sinh level {}: change {:e}", level, error_estimate);

        let scale = domain.magnitude(&estimate).max(1.0);
        if error_estimate <= tolerance * scale {
            break;
        }
    }

    debug!(
        "tanh-sinh finished after {} levels, error estimate {:e}",
        level, error_estimate
    );
    Ok(TanhSinhOutcome {
        value: estimate,
        error_estimate,
        levels_used: level,
    })
}

/// Clenshaw-Curtis weights on the N+1 Chebyshev extreme points cos(jπ/N)
///
/// The weights sum to 2, the length of [-1, 1].
fn clenshaw_curtis_weights(n: usize) -> Vec<f64> {
    let nf = n as f64;
    let mut weights = vec![0.0; n + 1];
    let end = if n % 2 == 0 {
        1.0 / (nf * nf - 1.0)
    } else {
        1.0 / (nf * nf)
    };
    weights[0] = end;
    weights[n] = end;

    for (j, weight) in weights.iter_mut().enumerate().take(n).skip(1) {
        let theta = j as f64 * PI / nf;
        let mut v = 1.0;
        for k in 1..=((n - 1) / 2) {
            let kf = k as f64;
            v -= 2.0 * (2.0 * kf * theta).cos() / (4.0 * kf * kf - 1.0);
        }
        if n % 2 == 0 {
            v -= (nf * theta).cos() / (nf * nf - 1.0);
        }
        *weight = 2.0 * v / nf;
    }
    weights
}

/// Clenshaw-Curtis quadrature with `points` Chebyshev nodes
pub fn clenshaw_curtis<D, F>(domain: &D, mut f: F, a: &D::Value, b: &D::Value, points: usize) -> Result<D::Value>
where
    D: Domain,
    F: FnMut(&D::Value) -> Result<D::Value>,
{
    if points < 2 {
        return Err(FormixError::Evaluation(format!(
            "clenshaw-curtis needs at least 2 points, got {}",
            points
        )));
    }
    let n = points - 1;
    let weights = clenshaw_curtis_weights(n);

    let half = domain.from_ratio(1, 2)?;
    let center = domain.multiply(&domain.add(a, b)?, &half)?;
    let radius = domain.multiply(&domain.subtract(b, a)?, &half)?;

    let mut total = domain.zero();
    for (j, weight) in weights.iter().enumerate() {
        let node = (j as f64 * PI / n as f64).cos();
        let x = domain.add(&center, &domain.multiply(&radius, &domain.from_double(node)?)?)?;
        let term = domain.multiply(&domain.from_double(*weight)?, &f(&x)?)?;
        total = domain.add(&total, &term)?;
    }
    Ok(domain.multiply(&total, &radius)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use formix_types::{Convertible, FactoredDomain, RealDomain};

    #[test]
    fn test_trapezoid_constant_is_exact() {
        let d = RealDomain::new();
        let r = trapezoid(&d, |_| Ok(1.0), &0.0, &1.0, 10).unwrap();
        assert_relative_eq!(r, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_trapezoid_linear_exact_in_factored() {
        let d = FactoredDomain::new();
        let (a, b) = (d.from_integer(0), d.from_integer(2));
        let r = trapezoid(&d, |x| Ok(x.clone()), &a, &b, 4).unwrap();
        assert_eq!(r, d.from_integer(2));
    }

    #[test]
    fn test_trapezoid_rejects_zero_panels() {
        let d = RealDomain::new();
        assert!(trapezoid(&d, |_| Ok(1.0), &0.0, &1.0, 0).is_err());
    }

    #[test]
    fn test_adjusted_trapezoid_beats_plain() {
        let d = RealDomain::new();
        let f = |x: &f64| Ok(x.exp());
        let exact = 1f64.exp() - 1.0;
        let plain = trapezoid(&d, f, &0.0, &1.0, 8).unwrap();
        let adjusted = trapezoid_adjusted(&d, f, &0.0, &1.0, 8).unwrap();
        assert!((adjusted - exact).abs() < (plain - exact).abs() / 100.0);
    }

    #[test]
    fn test_tanh_sinh_polynomial() {
        let d = RealDomain::new();
        let out = tanh_sinh(&d, |x| Ok(x * x), &0.0, &3.0, 8, 1e-12).unwrap();
        assert_relative_eq!(out.value, 9.0, epsilon = 1e-9);
        assert!(out.levels_used <= 8);
    }

    #[test]
    fn test_tanh_sinh_endpoint_singularity() {
        // ∫₀¹ 1/√x dx = 2
        let d = RealDomain::new();
        let out = tanh_sinh(&d, |x: &f64| Ok(1.0 / x.sqrt()), &0.0, &1.0, 10, 1e-10).unwrap();
        assert_relative_eq!(out.value, 2.0, epsilon = 1e-6);
    }

    #[test]
    fn test_clenshaw_weights_sum_to_two() {
        for n in 1..12 {
            let total: f64 = clenshaw_curtis_weights(n).iter().sum();
            assert_relative_eq!(total, 2.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_clenshaw_three_points_is_simpson() {
        let w = clenshaw_curtis_weights(2);
        assert_relative_eq!(w[0], 1.0 / 3.0, epsilon = 1e-15);
        assert_relative_eq!(w[1], 4.0 / 3.0, epsilon = 1e-15);
        assert_relative_eq!(w[2], 1.0 / 3.0, epsilon = 1e-15);
    }

    #[test]
    fn test_clenshaw_sine() {
        let d = RealDomain::new();
        let r = clenshaw_curtis(&d, |x: &f64| Ok(x.sin()), &0.0, &PI, 17).unwrap();
        assert_relative_eq!(r, 2.0, epsilon = 1e-10);
    }
}
