//! Interval sampling and accumulation

use formix_types::{Domain, FormixError, Result};
use log::trace;

/// Upper bound on the number of samples a single range may produce
pub const MAX_SAMPLES: usize = 10_000_000;

/// Tabulated points and the function values at them
#[derive(Debug, Clone, PartialEq)]
pub struct Samples<T> {
    pub points: Vec<T>,
    pub values: Vec<T>,
}

impl<T> Samples<T> {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Points a, a+s, a+2s, … not beyond b
///
/// An empty range (b < a) yields no points. The count is derived in doubles
/// with a small slack so that a step which divides the range evenly in exact
/// arithmetic still reaches `b` in floating domains.
pub fn interval_points<D: Domain>(domain: &D, a: &D::Value, b: &D::Value, step: &D::Value) -> Result<Vec<D::Value>> {
    if !domain.less_than(&domain.zero(), step) {
        return Err(FormixError::Evaluation(format!(
            "interval step must be positive, got {}",
            domain.format(step)
        )));
    }
    if domain.less_than(b, a) {
        return Ok(Vec::new());
    }

    let span = (domain.to_double(b) - domain.to_double(a)) / domain.to_double(step);
    let count = (span + 1e-9).floor();
    if !count.is_finite() || count >= MAX_SAMPLES as f64 {
        return Err(FormixError::Evaluation(format!(
            "interval produces too many samples ({})",
            span
        )));
    }

    let count = count as i64;
    let mut points = Vec::with_capacity(count as usize + 1);
    for i in 0..=count {
        let offset = domain.multiply(&domain.from_integer(i), step)?;
        points.push(domain.add(a, &offset)?);
    }
    trace!("interval sampled at {} points", points.len());
    Ok(points)
}

pub fn sample_interval<D, F>(
    domain: &D,
    mut f: F,
    a: &D::Value,
    b: &D::Value,
    step: &D::Value,
) -> Result<Samples<D::Value>>
where
    D: Domain,
    F: FnMut(&D::Value) -> Result<D::Value>,
{
    let points = interval_points(domain, a, b, step)?;
    let values = points.iter().map(&mut f).collect::<Result<Vec<_>>>()?;
    Ok(Samples { points, values })
}

/// Σ f(x) over the sampled interval; zero for an empty range
pub fn iterate_sum<D, F>(domain: &D, mut f: F, a: &D::Value, b: &D::Value, step: &D::Value) -> Result<D::Value>
where
    D: Domain,
    F: FnMut(&D::Value) -> Result<D::Value>,
{
    let mut total = domain.zero();
    for x in interval_points(domain, a, b, step)? {
        total = domain.add(&total, &f(&x)?)?;
    }
    Ok(total)
}

/// Π f(x) over the sampled interval; one for an empty range
pub fn iterate_product<D, F>(domain: &D, mut f: F, a: &D::Value, b: &D::Value, step: &D::Value) -> Result<D::Value>
where
    D: Domain,
    F: FnMut(&D::Value) -> Result<D::Value>,
{
    let mut total = domain.one();
    for x in interval_points(domain, a, b, step)? {
        total = domain.multiply(&total, &f(&x)?)?;
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use formix_types::{Arithmetic, Convertible, FactoredDomain, RealDomain};

    #[test]
    fn test_points_include_upper_bound() {
        let d = RealDomain::new();
        let pts = interval_points(&d, &0.0, &1.0, &0.1).unwrap();
        assert_eq!(pts.len(), 11);
        assert_eq!(pts[0], 0.0);
    }

    #[test]
    fn test_empty_range() {
        let d = RealDomain::new();
        assert!(interval_points(&d, &2.0, &1.0, &1.0).unwrap().is_empty());
        assert_eq!(iterate_sum(&d, |x| Ok(*x), &2.0, &1.0, &1.0).unwrap(), 0.0);
        assert_eq!(iterate_product(&d, |x| Ok(*x), &2.0, &1.0, &1.0).unwrap(), 1.0);
    }

    #[test]
    fn test_non_positive_step_rejected() {
        let d = RealDomain::new();
        assert!(interval_points(&d, &0.0, &1.0, &0.0).is_err());
        assert!(interval_points(&d, &0.0, &1.0, &-1.0).is_err());
    }

    #[test]
    fn test_sum_and_product_of_integers() {
        let d = RealDomain::new();
        assert_eq!(iterate_sum(&d, |x| Ok(*x), &1.0, &100.0, &1.0).unwrap(), 5050.0);
        assert_eq!(iterate_product(&d, |x| Ok(*x), &1.0, &5.0, &1.0).unwrap(), 120.0);
    }

    #[test]
    fn test_exact_harmonic_sum() {
        let d = FactoredDomain::new();
        let one = d.from_integer(1);
        let r = iterate_sum(&d, |x| Ok(d.invert(x)?), &one, &d.from_integer(4), &one).unwrap();
        assert_eq!(r, d.from_ratio(25, 12).unwrap());
    }

    #[test]
    fn test_sample_interval() {
        let d = RealDomain::new();
        let s = sample_interval(&d, |x| Ok(x * x), &0.0, &2.0, &0.5).unwrap();
        assert_eq!(s.len(), 5);
        assert_eq!(s.values, vec![0.0, 0.25, 1.0, 2.25, 4.0]);
    }
}
