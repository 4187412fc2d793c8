//! Numeric domains
//!
//! A domain supplies the arithmetic primitives every other component is
//! generic over. Capabilities are split into small traits and bundled by
//! [`Domain`]:
//!
//! - [`Arithmetic`]: zero, one, add, negate, multiply, invert
//! - [`Ordered`]: a total order through `less_than`
//! - [`Convertible`]: lossy double conversions, integer coercion, pi
//!
//! A session picks one domain at construction and keeps it for its lifetime.

use crate::error::{DomainError, DomainResult, FormixError, Result};
use std::cmp::Ordering;
use std::fmt;

mod complex;
mod factored;
mod primes;
mod real;
mod special;

pub use complex::ComplexDomain;
pub use factored::{Factored, FactoredDomain};
pub use primes::{factorize_u64, is_prime};
pub use real::RealDomain;
pub use special::SpecialFunctions;

/// Ring/field primitives over `Self::Value`
pub trait Arithmetic {
    type Value: Clone + fmt::Debug + PartialEq + 'static;

    fn zero(&self) -> Self::Value;
    fn one(&self) -> Self::Value;

    fn add(&self, a: &Self::Value, b: &Self::Value) -> DomainResult<Self::Value>;
    fn negate(&self, a: &Self::Value) -> Self::Value;
    fn multiply(&self, a: &Self::Value, b: &Self::Value) -> DomainResult<Self::Value>;

    /// Multiplicative inverse; fails on the additive identity
    fn invert(&self, a: &Self::Value) -> DomainResult<Self::Value>;

    fn is_zero(&self, a: &Self::Value) -> bool {
        *a == self.zero()
    }

    fn subtract(&self, a: &Self::Value, b: &Self::Value) -> DomainResult<Self::Value> {
        self.add(a, &self.negate(b))
    }

    fn divide(&self, a: &Self::Value, b: &Self::Value) -> DomainResult<Self::Value> {
        self.multiply(a, &self.invert(b)?)
    }
}

/// Total order
pub trait Ordered: Arithmetic {
    fn less_than(&self, a: &Self::Value, b: &Self::Value) -> bool;

    fn compare(&self, a: &Self::Value, b: &Self::Value) -> Ordering {
        if self.less_than(a, b) {
            Ordering::Less
        } else if self.less_than(b, a) {
            Ordering::Greater
        } else {
            Ordering::Equal
        }
    }
}

/// Conversions to and from the outside world
pub trait Convertible: Arithmetic {
    /// Lossy conversion to a double (real part for complex values)
    fn to_double(&self, a: &Self::Value) -> f64;

    fn from_double(&self, x: f64) -> DomainResult<Self::Value>;

    fn from_integer(&self, n: i64) -> Self::Value;

    /// Integer coercion, failing for non-integral values
    fn to_integer(&self, a: &Self::Value) -> DomainResult<i64>;

    /// Absolute size of a value, used for convergence tests
    fn magnitude(&self, a: &Self::Value) -> f64;

    fn pi(&self) -> Self::Value;

    /// `numerator / denominator` built from domain primitives, exact where the domain is
    fn from_ratio(&self, numerator: i64, denominator: i64) -> DomainResult<Self::Value> {
        let n = self.from_integer(numerator);
        let d = self.from_integer(denominator);
        self.divide(&n, &d)
    }
}

/// Elementary functions dispatched through [`Domain::elementary`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Elementary {
    Sin,
    Cos,
    Tan,
    Exp,
    Ln,
    Sqrt,
    Abs,
}

impl Elementary {
    pub fn name(&self) -> &'static str {
        match self {
            Elementary::Sin => "sin",
            Elementary::Cos => "cos",
            Elementary::Tan => "tan",
            Elementary::Exp => "exp",
            Elementary::Ln => "ln",
            Elementary::Sqrt => "sqrt",
            Elementary::Abs => "abs",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "sin" => Some(Elementary::Sin),
            "cos" => Some(Elementary::Cos),
            "tan" => Some(Elementary::Tan),
            "exp" => Some(Elementary::Exp),
            "ln" => Some(Elementary::Ln),
            "sqrt" => Some(Elementary::Sqrt),
            "abs" => Some(Elementary::Abs),
            _ => None,
        }
    }

    pub fn apply_f64(&self, x: f64) -> f64 {
        match self {
            Elementary::Sin => x.sin(),
            Elementary::Cos => x.cos(),
            Elementary::Tan => x.tan(),
            Elementary::Exp => x.exp(),
            Elementary::Ln => x.ln(),
            Elementary::Sqrt => x.sqrt(),
            Elementary::Abs => x.abs(),
        }
    }
}

/// A complete numeric domain
pub trait Domain: Ordered + Convertible + 'static {
    /// Short display name used in error messages ("real", "complex", "factored")
    fn name(&self) -> &'static str;

    fn format(&self, a: &Self::Value) -> String;

    /// Portable export of a single value
    fn to_json(&self, a: &Self::Value) -> serde_json::Value;

    fn power(&self, base: &Self::Value, exponent: &Self::Value) -> DomainResult<Self::Value>;

    fn elementary(&self, function: Elementary, a: &Self::Value) -> Result<Self::Value>;

    fn imaginary_unit(&self) -> Option<Self::Value> {
        None
    }

    /// Install the special-function family for this domain
    fn init_special_functions(&self);

    /// Special functions, or `Unimplemented` before [`Domain::init_special_functions`]
    fn special_functions(&self) -> Option<&dyn SpecialFunctions<Self::Value>>;

    fn gamma(&self, a: &Self::Value) -> Result<Self::Value> {
        match self.special_functions() {
            Some(special) => special.gamma(a),
            None => Err(FormixError::unimplemented("Gamma", self.name())),
        }
    }

    fn ln_gamma(&self, a: &Self::Value) -> Result<Self::Value> {
        match self.special_functions() {
            Some(special) => special.ln_gamma(a),
            None => Err(FormixError::unimplemented("LnGamma", self.name())),
        }
    }

    fn bessel_j(&self, alpha: f64, a: &Self::Value) -> Result<Self::Value> {
        match self.special_functions() {
            Some(special) => special.bessel_j(alpha, a),
            None => Err(FormixError::unimplemented("BesselJ", self.name())),
        }
    }
}

/// Integer power by repeated squaring, shared by every domain
pub(crate) fn integer_power<D: Arithmetic + ?Sized>(
    domain: &D,
    base: &D::Value,
    exponent: i64,
) -> DomainResult<D::Value> {
    let mut result = domain.one();
    let mut square = base.clone();
    let mut n = exponent.unsigned_abs();
    while n > 0 {
        if n & 1 == 1 {
            result = domain.multiply(&result, &square)?;
        }
        n >>= 1;
        if n > 0 {
            square = domain.multiply(&square, &square)?;
        }
    }
    if exponent < 0 {
        domain.invert(&result)
    } else {
        Ok(result)
    }
}

pub(crate) fn not_integral(value: impl fmt::Display) -> DomainError {
    DomainError::NotIntegral {
        value: value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_power_real() {
        let d = RealDomain::new();
        assert_eq!(integer_power(&d, &2.0, 10).unwrap(), 1024.0);
        assert_eq!(integer_power(&d, &2.0, -2).unwrap(), 0.25);
        assert_eq!(integer_power(&d, &5.0, 0).unwrap(), 1.0);
    }

    #[test]
    fn test_compare_is_total() {
        let d = RealDomain::new();
        assert_eq!(d.compare(&1.0, &2.0), Ordering::Less);
        assert_eq!(d.compare(&2.0, &1.0), Ordering::Greater);
        assert_eq!(d.compare(&2.0, &2.0), Ordering::Equal);
    }

    #[test]
    fn test_from_ratio_exact_in_factored() {
        let d = FactoredDomain::new();
        let half = d.from_ratio(1, 2).unwrap();
        let two = d.from_integer(2);
        assert_eq!(d.multiply(&half, &two).unwrap(), d.one());
    }

    #[test]
    fn test_elementary_names_round_trip() {
        for f in [
            Elementary::Sin,
            Elementary::Cos,
            Elementary::Tan,
            Elementary::Exp,
            Elementary::Ln,
            Elementary::Sqrt,
            Elementary::Abs,
        ] {
            assert_eq!(Elementary::from_name(f.name()), Some(f));
        }
    }
}
