use approx::assert_relative_eq;
use formix_numerical::{clenshaw_curtis, tanh_sinh, trapezoid, trapezoid_adjusted};
use formix_types::{ComplexDomain, Convertible, FactoredDomain, RealDomain};
use num_complex::Complex64;
use proptest::prelude::*;

#[test]
fn every_rule_agrees_on_a_smooth_integrand() {
    let d = RealDomain::new();
    let f = |x: &f64| Ok(1.0 / (1.0 + x * x));
    let exact = std::f64::consts::FRAC_PI_4;

    assert_relative_eq!(trapezoid(&d, f, &0.0, &1.0, 2000).unwrap(), exact, epsilon = 1e-7);
    assert_relative_eq!(trapezoid_adjusted(&d, f, &0.0, &1.0, 50).unwrap(), exact, epsilon = 1e-7);
    assert_relative_eq!(tanh_sinh(&d, f, &0.0, &1.0, 8, 1e-12).unwrap().value, exact, epsilon = 1e-10);
    assert_relative_eq!(clenshaw_curtis(&d, f, &0.0, &1.0, 33).unwrap(), exact, epsilon = 1e-10);
}

#[test]
fn reversed_bounds_flip_the_sign() {
    let d = RealDomain::new();
    let forward = clenshaw_curtis(&d, |x: &f64| Ok(x.exp()), &0.0, &1.0, 17).unwrap();
    let backward = clenshaw_curtis(&d, |x: &f64| Ok(x.exp()), &1.0, &0.0, 17).unwrap();
    assert_relative_eq!(forward, -backward, epsilon = 1e-12);
}

#[test]
fn complex_integrand() {
    // ∫₀^π e^{ix} dx = 2i
    let d = ComplexDomain::new();
    let a = Complex64::new(0.0, 0.0);
    let b = Complex64::new(std::f64::consts::PI, 0.0);
    let r = clenshaw_curtis(&d, |z: &Complex64| Ok((Complex64::i() * z).exp()), &a, &b, 25).unwrap();
    assert_relative_eq!(r.re, 0.0, epsilon = 1e-10);
    assert_relative_eq!(r.im, 2.0, epsilon = 1e-10);
}

#[test]
fn factored_trapezoid_stays_exact() {
    // trapezoid on x² over [0, 1] with 2 panels: 3/8
    let d = FactoredDomain::new();
    let r = trapezoid(
        &d,
        |x| Ok(x.multiply(x)),
        &d.from_integer(0),
        &d.from_integer(1),
        2,
    )
    .unwrap();
    assert_eq!(r, d.from_ratio(3, 8).unwrap());
}

proptest! {
    #[test]
    fn trapezoid_integrates_lines_exactly(slope in -10.0f64..10.0, intercept in -10.0f64..10.0, panels in 1usize..50) {
        let d = RealDomain::new();
        let r = trapezoid(&d, |x: &f64| Ok(slope * x + intercept), &0.0, &2.0, panels).unwrap();
        let exact = 2.0 * slope + 2.0 * intercept;
        prop_assert!((r - exact).abs() < 1e-9);
    }
}
