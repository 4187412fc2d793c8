//! Special functions installed on a domain by `init_special_functions`

use super::factored::Factored;
use crate::error::{DomainError, FormixError, Result};
use num_complex::Complex64;
use std::f64::consts::PI;

/// Special-function family for values of type `T`
pub trait SpecialFunctions<T> {
    fn gamma(&self, x: &T) -> Result<T>;
    fn ln_gamma(&self, x: &T) -> Result<T>;

    /// Bessel function of the first kind of order `alpha`
    fn bessel_j(&self, alpha: f64, x: &T) -> Result<T>;
}

// Lanczos approximation, g = 7, n = 9
const LANCZOS_G: f64 = 7.0;
const LANCZOS: [f64; 9] = [
    0.999_999_999_999_809_9,
    676.520_368_121_885_1,
    -1_259.139_216_722_402_8,
    771.323_428_777_653_1,
    -176.615_029_162_140_6,
    12.507_343_278_686_905,
    -0.138_571_095_265_720_12,
    9.984_369_578_019_572e-6,
    1.505_632_735_149_311_6e-7,
];

const BESSEL_MAX_TERMS: usize = 300;

fn pole(function: &str, x: impl std::fmt::Display) -> FormixError {
    FormixError::Evaluation(format!("{} has a pole at {}", function, x))
}

pub fn real_gamma(x: f64) -> Result<f64> {
    if x <= 0.0 && x.fract() == 0.0 {
        return Err(pole("Gamma", x));
    }
    if x < 0.5 {
        // Reflection: Γ(x)Γ(1-x) = π / sin(πx)
        return Ok(PI / ((PI * x).sin() * real_gamma(1.0 - x)?));
    }
    let x = x - 1.0;
    let mut a = LANCZOS[0];
    let t = x + LANCZOS_G + 0.5;
    for (i, c) in LANCZOS.iter().enumerate().skip(1) {
        a += c / (x + i as f64);
    }
    Ok((2.0 * PI).sqrt() * t.powf(x + 0.5) * (-t).exp() * a)
}

/// ln|Γ(x)|
pub fn real_ln_gamma(x: f64) -> Result<f64> {
    if x <= 0.0 && x.fract() == 0.0 {
        return Err(pole("LnGamma", x));
    }
    if x < 0.5 {
        let reflected = real_ln_gamma(1.0 - x)?;
        return Ok(PI.ln() - (PI * x).sin().abs().ln() - reflected);
    }
    let x = x - 1.0;
    let mut a = LANCZOS[0];
    let t = x + LANCZOS_G + 0.5;
    for (i, c) in LANCZOS.iter().enumerate().skip(1) {
        a += c / (x + i as f64);
    }
    Ok(0.5 * (2.0 * PI).ln() + (x + 0.5) * t.ln() - t + a.ln())
}

pub fn complex_gamma(z: Complex64) -> Result<Complex64> {
    if z.im == 0.0 && z.re <= 0.0 && z.re.fract() == 0.0 {
        return Err(pole("Gamma", z));
    }
    if z.re < 0.5 {
        let pi = Complex64::new(PI, 0.0);
        return Ok(pi / ((pi * z).sin() * complex_gamma(Complex64::new(1.0, 0.0) - z)?));
    }
    let z = z - 1.0;
    let mut a = Complex64::new(LANCZOS[0], 0.0);
    let t = z + LANCZOS_G + 0.5;
    for (i, c) in LANCZOS.iter().enumerate().skip(1) {
        a += *c / (z + i as f64);
    }
    Ok((2.0 * PI).sqrt() * t.powc(z + 0.5) * (-t).exp() * a)
}

/// J_alpha(x) by its power series
pub fn real_bessel_j(alpha: f64, x: f64) -> Result<f64> {
    if alpha < 0.0 && alpha.fract() == 0.0 {
        // J_{-n}(x) = (-1)^n J_n(x)
        let n = -alpha;
        let sign = if (n as i64) % 2 == 0 { 1.0 } else { -1.0 };
        return Ok(sign * real_bessel_j(n, x)?);
    }
    if x < 0.0 && alpha.fract() != 0.0 {
        return Err(DomainError::Unrepresentable {
            value: format!("BesselJ({}, {})", alpha, x),
            domain: "real",
        }
        .into());
    }
    if x == 0.0 {
        return Ok(if alpha == 0.0 { 1.0 } else { 0.0 });
    }

    let half = x / 2.0;
    let quarter_sq = half * half;
    let mut term = half.powf(alpha) / real_gamma(alpha + 1.0)?;
    let mut sum = term;
    for m in 0..BESSEL_MAX_TERMS {
        let m = m as f64;
        term *= -quarter_sq / ((m + 1.0) * (m + 1.0 + alpha));
        sum += term;
        if term.abs() <= f64::EPSILON * sum.abs() {
            break;
        }
    }
    Ok(sum)
}

pub(crate) struct RealSpecialFunctions;

impl SpecialFunctions<f64> for RealSpecialFunctions {
    fn gamma(&self, x: &f64) -> Result<f64> {
        real_gamma(*x)
    }

    fn ln_gamma(&self, x: &f64) -> Result<f64> {
        real_ln_gamma(*x)
    }

    fn bessel_j(&self, alpha: f64, x: &f64) -> Result<f64> {
        real_bessel_j(alpha, *x)
    }
}

pub(crate) struct ComplexSpecialFunctions;

impl SpecialFunctions<Complex64> for ComplexSpecialFunctions {
    fn gamma(&self, z: &Complex64) -> Result<Complex64> {
        complex_gamma(*z)
    }

    fn ln_gamma(&self, z: &Complex64) -> Result<Complex64> {
        Ok(complex_gamma(*z)?.ln())
    }

    fn bessel_j(&self, _alpha: f64, _z: &Complex64) -> Result<Complex64> {
        Err(FormixError::unimplemented("BesselJ", "complex"))
    }
}

/// Exact gamma on the positive integers only
pub(crate) struct FactoredSpecialFunctions;

impl SpecialFunctions<Factored> for FactoredSpecialFunctions {
    fn gamma(&self, x: &Factored) -> Result<Factored> {
        match x.to_integer() {
            Some(n) if n > 0 => {
                let mut result = Factored::one();
                for k in 2..n {
                    result = result.multiply(&Factored::from_integer(k));
                }
                Ok(result)
            }
            Some(n) => Err(pole("Gamma", n)),
            None => Err(FormixError::unimplemented(
                "Gamma of a non-integer",
                "factored",
            )),
        }
    }

    fn ln_gamma(&self, _x: &Factored) -> Result<Factored> {
        Err(FormixError::unimplemented("LnGamma", "factored"))
    }

    fn bessel_j(&self, _alpha: f64, _x: &Factored) -> Result<Factored> {
        Err(FormixError::unimplemented("BesselJ", "factored"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_real_gamma_integers() {
        assert_relative_eq!(real_gamma(1.0).unwrap(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(real_gamma(5.0).unwrap(), 24.0, epsilon = 1e-9);
        assert_relative_eq!(real_gamma(0.5).unwrap(), PI.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_real_gamma_reflection() {
        // Γ(-0.5) = -2√π
        assert_relative_eq!(real_gamma(-0.5).unwrap(), -2.0 * PI.sqrt(), epsilon = 1e-10);
        assert!(real_gamma(-2.0).is_err());
    }

    #[test]
    fn test_ln_gamma_matches_gamma() {
        let x = 7.3;
        assert_relative_eq!(
            real_ln_gamma(x).unwrap(),
            real_gamma(x).unwrap().ln(),
            epsilon = 1e-10
        );
    }

    #[test]
    fn test_bessel_j0_and_j1() {
        assert_relative_eq!(real_bessel_j(0.0, 1.0).unwrap(), 0.765_197_686_557_966_6, epsilon = 1e-12);
        assert_relative_eq!(real_bessel_j(1.0, 1.0).unwrap(), 0.440_050_585_744_933_5, epsilon = 1e-12);
        assert_relative_eq!(real_bessel_j(-1.0, 1.0).unwrap(), -0.440_050_585_744_933_5, epsilon = 1e-12);
    }

    #[test]
    fn test_complex_gamma_on_real_axis() {
        let g = complex_gamma(Complex64::new(4.0, 0.0)).unwrap();
        assert_relative_eq!(g.re, 6.0, epsilon = 1e-9);
        assert!(g.im.abs() < 1e-9);
    }

    #[test]
    fn test_factored_gamma_is_factorial() {
        let g = FactoredSpecialFunctions
            .gamma(&Factored::from_integer(6))
            .unwrap();
        assert_eq!(g, Factored::from_integer(120));
        assert!(FactoredSpecialFunctions
            .gamma(&Factored::from_ratio(1, 2).unwrap())
            .is_err());
    }
}
