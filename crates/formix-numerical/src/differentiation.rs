use formix_types::{Domain, FormixError, Result};

/// Central finite difference of order `order` at `x`
///
/// Formula: f⁽ⁿ⁾(x) ≈ Σₖ (-1)ᵏ C(n,k) f(x + (n/2 - k)h) / hⁿ
///
/// Order 0 evaluates `f(x)`. Sample offsets are half-integral multiples of
/// `h` for odd orders.
pub fn central_difference<D, F>(
    domain: &D,
    mut f: F,
    x: &D::Value,
    order: u32,
    h: &D::Value,
) -> Result<D::Value>
where
    D: Domain,
    F: FnMut(&D::Value) -> Result<D::Value>,
{
    if order == 0 {
        return f(x);
    }
    if domain.is_zero(h) {
        return Err(FormixError::Evaluation(format!(
            "derivative step is zero in {} domain",
            domain.name()
        )));
    }

    let mut total = domain.zero();
    // C(n, k) carried in the domain: C(n, k + 1) = C(n, k) (n - k) / (k + 1)
    let mut binomial = domain.one();
    for k in 0..=order {
        // offset (n - 2k) / 2 in units of h
        let offset = domain.from_ratio(order as i64 - 2 * k as i64, 2)?;
        let point = domain.add(x, &domain.multiply(&offset, h)?)?;
        let sample = f(&point)?;

        let coefficient = if k % 2 == 1 {
            domain.negate(&binomial)
        } else {
            binomial.clone()
        };
        total = domain.add(&total, &domain.multiply(&coefficient, &sample)?)?;
        if k < order {
            let ratio = domain.from_ratio(i64::from(order - k), i64::from(k) + 1)?;
            binomial = domain.multiply(&binomial, &ratio)?;
        }
    }

    let scale = domain.power(h, &domain.from_integer(order as i64))?;
    Ok(domain.divide(&total, &scale)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use formix_types::{Arithmetic, Convertible, FactoredDomain, RealDomain};

    #[test]
    fn test_fourth_difference_is_exact_for_quartic() {
        // weights 1, -4, 6, -4, 1
        let d = FactoredDomain::new();
        let h = d.from_ratio(1, 2).unwrap();
        let x = d.from_integer(1);
        let r = central_difference(
            &d,
            |v| {
                let square = d.multiply(v, v)?;
                Ok(d.multiply(&square, &square)?)
            },
            &x,
            4,
            &h,
        )
        .unwrap();
        assert_eq!(r, d.from_integer(24));
    }

    #[test]
    fn test_high_order_weights_do_not_overflow() {
        // C(70, 35) is beyond i64; the alternating weights still cancel exactly
        let d = FactoredDomain::new();
        let h = d.from_ratio(1, 2).unwrap();
        let x = d.from_integer(1);
        let r = central_difference(&d, |_| Ok(d.from_integer(3)), &x, 70, &h).unwrap();
        assert!(d.is_zero(&r));

        let real = RealDomain::new();
        let r = central_difference(&real, |v| Ok(*v), &1.0, 70, &0.5).unwrap();
        assert!(r.is_finite());
    }

    #[test]
    fn test_first_derivative_of_square() {
        let d = RealDomain::new();
        let r = central_difference(&d, |x| Ok(x * x), &3.0, 1, &1e-5).unwrap();
        assert_relative_eq!(r, 6.0, epsilon = 1e-6);
    }

    #[test]
    fn test_second_derivative_of_cube() {
        let d = RealDomain::new();
        let r = central_difference(&d, |x| Ok(x * x * x), &2.0, 2, &1e-3).unwrap();
        assert_relative_eq!(r, 12.0, epsilon = 1e-4);
    }

    #[test]
    fn test_third_derivative_of_quartic() {
        let d = RealDomain::new();
        let r = central_difference(&d, |x: &f64| Ok(x.powi(4)), &2.0, 3, &1e-2).unwrap();
        assert_relative_eq!(r, 48.0, epsilon = 1e-3);
    }

    #[test]
    fn test_exact_in_factored_domain() {
        // central differences are exact for quadratics
        let d = FactoredDomain::new();
        let h = d.from_ratio(1, 100).unwrap();
        let x = d.from_integer(3);
        let r = central_difference(&d, |v| Ok(d.multiply(v, v)?), &x, 1, &h).unwrap();
        assert_eq!(r, d.from_integer(6));
    }

    #[test]
    fn test_zero_step_rejected() {
        let d = RealDomain::new();
        assert!(central_difference(&d, |x| Ok(*x), &1.0, 1, &0.0).is_err());
    }
}
