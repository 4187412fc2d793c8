use super::special::RealSpecialFunctions;
use super::{not_integral, Arithmetic, Convertible, Domain, Elementary, Ordered, SpecialFunctions};
use crate::error::{DomainError, DomainResult, Result};
use once_cell::unsync::OnceCell;
use std::cmp::Ordering;

const DOMAIN: &str = "real";

/// IEEE double domain
pub struct RealDomain {
    special: OnceCell<RealSpecialFunctions>,
}

impl RealDomain {
    pub fn new() -> Self {
        Self {
            special: OnceCell::new(),
        }
    }
}

impl Default for RealDomain {
    fn default() -> Self {
        Self::new()
    }
}

impl Arithmetic for RealDomain {
    type Value = f64;

    fn zero(&self) -> f64 {
        0.0
    }

    fn one(&self) -> f64 {
        1.0
    }

    fn add(&self, a: &f64, b: &f64) -> DomainResult<f64> {
        Ok(a + b)
    }

    fn negate(&self, a: &f64) -> f64 {
        -a
    }

    fn multiply(&self, a: &f64, b: &f64) -> DomainResult<f64> {
        Ok(a * b)
    }

    fn invert(&self, a: &f64) -> DomainResult<f64> {
        if *a == 0.0 {
            return Err(DomainError::DivisionByZero { domain: DOMAIN });
        }
        Ok(1.0 / a)
    }
}

impl Ordered for RealDomain {
    fn less_than(&self, a: &f64, b: &f64) -> bool {
        a.total_cmp(b) == Ordering::Less
    }

    fn compare(&self, a: &f64, b: &f64) -> Ordering {
        a.total_cmp(b)
    }
}

impl Convertible for RealDomain {
    fn to_double(&self, a: &f64) -> f64 {
        *a
    }

    fn from_double(&self, x: f64) -> DomainResult<f64> {
        Ok(x)
    }

    fn from_integer(&self, n: i64) -> f64 {
        n as f64
    }

    fn to_integer(&self, a: &f64) -> DomainResult<i64> {
        if a.is_finite() && a.fract() == 0.0 && a.abs() < i64::MAX as f64 {
            Ok(*a as i64)
        } else {
            Err(not_integral(a))
        }
    }

    fn magnitude(&self, a: &f64) -> f64 {
        a.abs()
    }

    fn pi(&self) -> f64 {
        std::f64::consts::PI
    }
}

impl Domain for RealDomain {
    fn name(&self) -> &'static str {
        DOMAIN
    }

    fn format(&self, a: &f64) -> String {
        a.to_string()
    }

    fn to_json(&self, a: &f64) -> serde_json::Value {
        serde_json::json!(a)
    }

    fn power(&self, base: &f64, exponent: &f64) -> DomainResult<f64> {
        Ok(base.powf(*exponent))
    }

    fn elementary(&self, function: Elementary, a: &f64) -> Result<f64> {
        Ok(function.apply_f64(*a))
    }

    fn init_special_functions(&self) {
        let _ = self.special.set(RealSpecialFunctions);
    }

    fn special_functions(&self) -> Option<&dyn SpecialFunctions<f64>> {
        self.special.get().map(|s| s as &dyn SpecialFunctions<f64>)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invert_zero_fails() {
        let d = RealDomain::new();
        assert!(d.invert(&0.0).is_err());
        assert_eq!(d.invert(&4.0).unwrap(), 0.25);
    }

    #[test]
    fn test_integer_coercion() {
        let d = RealDomain::new();
        assert_eq!(d.to_integer(&3.0).unwrap(), 3);
        assert!(d.to_integer(&3.5).is_err());
        assert!(d.to_integer(&f64::NAN).is_err());
    }

    #[test]
    fn test_gamma_requires_init() {
        let d = RealDomain::new();
        assert!(d.gamma(&5.0).is_err());
        d.init_special_functions();
        assert!((d.gamma(&5.0).unwrap() - 24.0).abs() < 1e-9);
    }
}
