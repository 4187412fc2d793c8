use super::special::ComplexSpecialFunctions;
use super::{integer_power, not_integral, Arithmetic, Convertible, Domain, Elementary, Ordered, SpecialFunctions};
use crate::error::{DomainError, DomainResult, Result};
use num_complex::Complex64;
use once_cell::unsync::OnceCell;
use std::cmp::Ordering;

const DOMAIN: &str = "complex";

/// Complex pairs of doubles, ordered lexicographically on (re, im)
pub struct ComplexDomain {
    special: OnceCell<ComplexSpecialFunctions>,
}

impl ComplexDomain {
    pub fn new() -> Self {
        Self {
            special: OnceCell::new(),
        }
    }
}

impl Default for ComplexDomain {
    fn default() -> Self {
        Self::new()
    }
}

impl Arithmetic for ComplexDomain {
    type Value = Complex64;

    fn zero(&self) -> Complex64 {
        Complex64::new(0.0, 0.0)
    }

    fn one(&self) -> Complex64 {
        Complex64::new(1.0, 0.0)
    }

    fn add(&self, a: &Complex64, b: &Complex64) -> DomainResult<Complex64> {
        Ok(a + b)
    }

    fn negate(&self, a: &Complex64) -> Complex64 {
        -a
    }

    fn multiply(&self, a: &Complex64, b: &Complex64) -> DomainResult<Complex64> {
        Ok(a * b)
    }

    fn invert(&self, a: &Complex64) -> DomainResult<Complex64> {
        if a.re == 0.0 && a.im == 0.0 {
            return Err(DomainError::DivisionByZero { domain: DOMAIN });
        }
        Ok(a.inv())
    }
}

impl Ordered for ComplexDomain {
    fn less_than(&self, a: &Complex64, b: &Complex64) -> bool {
        self.compare(a, b) == Ordering::Less
    }

    fn compare(&self, a: &Complex64, b: &Complex64) -> Ordering {
        a.re.total_cmp(&b.re).then(a.im.total_cmp(&b.im))
    }
}

impl Convertible for ComplexDomain {
    fn to_double(&self, a: &Complex64) -> f64 {
        a.re
    }

    fn from_double(&self, x: f64) -> DomainResult<Complex64> {
        Ok(Complex64::new(x, 0.0))
    }

    fn from_integer(&self, n: i64) -> Complex64 {
        Complex64::new(n as f64, 0.0)
    }

    fn to_integer(&self, a: &Complex64) -> DomainResult<i64> {
        if a.im == 0.0 && a.re.is_finite() && a.re.fract() == 0.0 && a.re.abs() < i64::MAX as f64 {
            Ok(a.re as i64)
        } else {
            Err(not_integral(a))
        }
    }

    fn magnitude(&self, a: &Complex64) -> f64 {
        a.norm()
    }

    fn pi(&self) -> Complex64 {
        Complex64::new(std::f64::consts::PI, 0.0)
    }
}

impl Domain for ComplexDomain {
    fn name(&self) -> &'static str {
        DOMAIN
    }

    fn format(&self, a: &Complex64) -> String {
        if a.im == 0.0 {
            a.re.to_string()
        } else if a.im < 0.0 {
            format!("{}-{}i", a.re, -a.im)
        } else {
            format!("{}+{}i", a.re, a.im)
        }
    }

    fn to_json(&self, a: &Complex64) -> serde_json::Value {
        serde_json::json!({ "re": a.re, "im": a.im })
    }

    fn power(&self, base: &Complex64, exponent: &Complex64) -> DomainResult<Complex64> {
        if let Ok(k) = self.to_integer(exponent) {
            return integer_power(self, base, k);
        }
        Ok(base.powc(*exponent))
    }

    fn elementary(&self, function: Elementary, a: &Complex64) -> Result<Complex64> {
        Ok(match function {
            Elementary::Sin => a.sin(),
            Elementary::Cos => a.cos(),
            Elementary::Tan => a.tan(),
            Elementary::Exp => a.exp(),
            Elementary::Ln => a.ln(),
            Elementary::Sqrt => a.sqrt(),
            Elementary::Abs => Complex64::new(a.norm(), 0.0),
        })
    }

    fn imaginary_unit(&self) -> Option<Complex64> {
        Some(Complex64::i())
    }

    fn init_special_functions(&self) {
        let _ = self.special.set(ComplexSpecialFunctions);
    }

    fn special_functions(&self) -> Option<&dyn SpecialFunctions<Complex64>> {
        self.special
            .get()
            .map(|s| s as &dyn SpecialFunctions<Complex64>)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lexicographic_order() {
        let d = ComplexDomain::new();
        assert!(d.less_than(&Complex64::new(1.0, 5.0), &Complex64::new(2.0, 0.0)));
        assert!(d.less_than(&Complex64::new(1.0, 0.0), &Complex64::new(1.0, 1.0)));
        assert!(!d.less_than(&Complex64::new(1.0, 1.0), &Complex64::new(1.0, 1.0)));
    }

    #[test]
    fn test_integer_power_stays_exact() {
        let d = ComplexDomain::new();
        let i = d.imaginary_unit().unwrap();
        assert_eq!(d.power(&i, &Complex64::new(2.0, 0.0)).unwrap(), Complex64::new(-1.0, 0.0));
    }

    #[test]
    fn test_integer_coercion_range() {
        let d = ComplexDomain::new();
        assert_eq!(d.to_integer(&Complex64::new(-12.0, 0.0)).unwrap(), -12);
        assert!(d.to_integer(&Complex64::new(1e300, 0.0)).is_err());
        assert!(d.to_integer(&Complex64::new(9.3e18, 0.0)).is_err());
        assert!(d.to_integer(&Complex64::new(2.0, 1.0)).is_err());
    }

    #[test]
    fn test_format() {
        let d = ComplexDomain::new();
        assert_eq!(d.format(&Complex64::new(1.0, -2.0)), "1-2i");
        assert_eq!(d.format(&Complex64::new(3.0, 0.0)), "3");
    }
}
