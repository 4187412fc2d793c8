//! Exact rationals held as a sign and a prime -> exponent map
//!
//! Multiplication and inversion are exponent arithmetic. Addition factors out
//! the common part, sums two integer cofactors and refactors the result.

use super::primes::factorize_u64;
use super::special::FactoredSpecialFunctions;
use super::{not_integral, Arithmetic, Convertible, Domain, Elementary, Ordered, SpecialFunctions};
use crate::error::{DomainError, DomainResult, Result};
use num_bigint::{BigInt, BigUint, Sign};
use num_integer::Integer;
use num_traits::{FromPrimitive, One, Signed, ToPrimitive, Zero};
use once_cell::unsync::OnceCell;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

const DOMAIN: &str = "factored";

/// Trial division bound used when a cofactor does not fit in a u64
const BIG_TRIAL_LIMIT: u64 = 100_000;

/// Largest denominator produced by `from_f64`
const MAX_APPROX_DENOMINATOR: u64 = 1_000_000;

/// Largest prime exponent `powi` will produce
const MAX_EXPONENT: i64 = u32::MAX as i64;

/// Significant bits kept by the integer quotient in `to_f64`
const QUOTIENT_BITS: i64 = 64;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Factored {
    /// -1, 0 or 1; zero carries no exponents
    sign: i8,
    exponents: BTreeMap<u64, i64>,
}

fn factorize_biguint(n: &BigUint) -> DomainResult<BTreeMap<u64, u32>> {
    if let Some(small) = n.to_u64() {
        return Ok(factorize_u64(small));
    }
    let mut rest = n.clone();
    let mut factors = BTreeMap::new();
    let mut p = 2u64;
    while p <= BIG_TRIAL_LIMIT {
        while (&rest % p).is_zero() {
            rest /= p;
            *factors.entry(p).or_insert(0) += 1;
        }
        if let Some(small) = rest.to_u64() {
            for (q, e) in factorize_u64(small) {
                *factors.entry(q).or_insert(0) += e;
            }
            return Ok(factors);
        }
        p += if p == 2 { 1 } else { 2 };
    }
    Err(DomainError::FactorizationOverflow(format!(
        "cofactor {} has no prime factor below {}",
        rest, BIG_TRIAL_LIMIT
    )))
}

fn product(exponents: impl Iterator<Item = (u64, u64)>) -> BigUint {
    exponents.fold(BigUint::one(), |acc, (p, e)| {
        acc * BigUint::from(p).pow(e as u32)
    })
}

impl Factored {
    pub fn zero() -> Self {
        Factored {
            sign: 0,
            exponents: BTreeMap::new(),
        }
    }

    pub fn one() -> Self {
        Factored {
            sign: 1,
            exponents: BTreeMap::new(),
        }
    }

    fn from_parts(sign: i8, exponents: BTreeMap<u64, i64>) -> Self {
        if sign == 0 {
            return Factored::zero();
        }
        let exponents = exponents.into_iter().filter(|(_, e)| *e != 0).collect();
        Factored { sign, exponents }
    }

    pub fn from_integer(n: i64) -> Self {
        let sign = n.signum() as i8;
        let exponents = factorize_u64(n.unsigned_abs())
            .into_iter()
            .map(|(p, e)| (p, e as i64))
            .collect();
        Factored::from_parts(sign, exponents)
    }

    pub fn from_ratio(numerator: i64, denominator: i64) -> DomainResult<Self> {
        let d = Factored::from_integer(denominator).invert()?;
        Ok(Factored::from_integer(numerator).multiply(&d))
    }

    pub fn from_bigint(n: &BigInt) -> DomainResult<Self> {
        let sign = match n.sign() {
            Sign::Minus => -1,
            Sign::NoSign => 0,
            Sign::Plus => 1,
        };
        let exponents = factorize_biguint(n.magnitude())?
            .into_iter()
            .map(|(p, e)| (p, e as i64))
            .collect();
        Ok(Factored::from_parts(sign, exponents))
    }

    /// Lossy: integral doubles convert exactly, the rest through continued fractions
    pub fn from_f64(x: f64) -> DomainResult<Self> {
        if !x.is_finite() {
            return Err(DomainError::Unrepresentable {
                value: x.to_string(),
                domain: DOMAIN,
            });
        }
        if x.fract() == 0.0 {
            if x.abs() < 9.0e18 {
                return Ok(Factored::from_integer(x as i64));
            }
            return match BigInt::from_f64(x) {
                Some(n) => Factored::from_bigint(&n),
                None => Err(DomainError::Unrepresentable {
                    value: x.to_string(),
                    domain: DOMAIN,
                }),
            };
        }
        let negative = x < 0.0;
        let target = x.abs();
        // convergents h/k of the continued fraction of |x|
        let (mut h_prev, mut h) = (1u64, target.floor() as u64);
        let (mut k_prev, mut k) = (0u64, 1u64);
        let mut rest = target - target.floor();
        while rest > 1e-15 {
            let inv = 1.0 / rest;
            let a = inv.floor() as u64;
            let k_next = a.saturating_mul(k).saturating_add(k_prev);
            if k_next > MAX_APPROX_DENOMINATOR {
                break;
            }
            let h_next = a.saturating_mul(h).saturating_add(h_prev);
            h_prev = h;
            h = h_next;
            k_prev = k;
            k = k_next;
            if ((h as f64) / (k as f64) - target).abs() <= f64::EPSILON * target {
                break;
            }
            rest = inv - inv.floor();
        }
        let value = Factored::from_bigint(&BigInt::from(h))?
            .multiply(&Factored::from_bigint(&BigInt::from(k))?.invert()?);
        Ok(if negative { value.negate() } else { value })
    }

    pub fn sign(&self) -> i8 {
        self.sign
    }

    pub fn is_zero(&self) -> bool {
        self.sign == 0
    }

    /// True when no prime sits in the denominator
    pub fn is_integer(&self) -> bool {
        self.exponents.values().all(|e| *e >= 0)
    }

    pub fn exponent(&self, prime: u64) -> i64 {
        self.exponents.get(&prime).copied().unwrap_or(0)
    }

    pub fn exponents(&self) -> impl Iterator<Item = (u64, i64)> + '_ {
        self.exponents.iter().map(|(p, e)| (*p, *e))
    }

    pub fn numerator(&self) -> BigUint {
        if self.is_zero() {
            return BigUint::zero();
        }
        product(
            self.exponents
                .iter()
                .filter(|(_, e)| **e > 0)
                .map(|(p, e)| (*p, *e as u64)),
        )
    }

    pub fn denominator(&self) -> BigUint {
        product(
            self.exponents
                .iter()
                .filter(|(_, e)| **e < 0)
                .map(|(p, e)| (*p, e.unsigned_abs())),
        )
    }

    fn signed_numerator(&self) -> BigInt {
        let n = BigInt::from(self.numerator());
        if self.sign < 0 {
            -n
        } else {
            n
        }
    }

    pub fn to_integer(&self) -> Option<i64> {
        if !self.is_integer() {
            return None;
        }
        self.signed_numerator().to_i64()
    }

    /// Nearest double, from a 64-bit integer quotient of numerator and denominator
    pub fn to_f64(&self) -> f64 {
        if self.is_zero() {
            return 0.0;
        }
        let (n, d) = (self.numerator(), self.denominator());
        let shift = QUOTIENT_BITS - (n.bits() as i64 - d.bits() as i64);
        let quotient = if shift >= 0 {
            (n << shift as usize) / d
        } else {
            n / (d << shift.unsigned_abs() as usize)
        };
        let scaled = quotient.to_f64().unwrap_or(f64::INFINITY);
        let magnitude = if shift > 1000 {
            // split the scale so subnormal results survive
            scaled * 2f64.powi(-1000) * 2f64.powi(1000 - shift as i32)
        } else {
            scaled * 2f64.powi(-(shift as i32))
        };
        self.sign as f64 * magnitude
    }

    pub fn negate(&self) -> Self {
        Factored {
            sign: -self.sign,
            exponents: self.exponents.clone(),
        }
    }

    pub fn abs(&self) -> Self {
        Factored {
            sign: self.sign.abs(),
            exponents: self.exponents.clone(),
        }
    }

    pub fn multiply(&self, other: &Factored) -> Self {
        if self.is_zero() || other.is_zero() {
            return Factored::zero();
        }
        let mut exponents = self.exponents.clone();
        for (p, e) in &other.exponents {
            *exponents.entry(*p).or_insert(0) += e;
        }
        Factored::from_parts(self.sign * other.sign, exponents)
    }

    pub fn invert(&self) -> DomainResult<Self> {
        if self.is_zero() {
            return Err(DomainError::DivisionByZero { domain: DOMAIN });
        }
        Ok(Factored {
            sign: self.sign,
            exponents: self.exponents.iter().map(|(p, e)| (*p, -e)).collect(),
        })
    }

    /// Raise to an integer power by scaling the exponents
    pub fn powi(&self, k: i64) -> DomainResult<Self> {
        if k == 0 {
            return Ok(Factored::one());
        }
        if self.is_zero() {
            return if k > 0 {
                Ok(Factored::zero())
            } else {
                Err(DomainError::DivisionByZero { domain: DOMAIN })
            };
        }
        let sign = if self.sign < 0 && k % 2 != 0 { -1 } else { 1 };
        let exponents = self
            .exponents
            .iter()
            .map(|(p, e)| match e.checked_mul(k) {
                Some(scaled) if scaled.unsigned_abs() <= MAX_EXPONENT as u64 => Ok((*p, scaled)),
                _ => Err(DomainError::Unrepresentable {
                    value: format!("{}^{}", self, k),
                    domain: DOMAIN,
                }),
            })
            .collect::<DomainResult<BTreeMap<u64, i64>>>()?;
        Ok(Factored::from_parts(sign, exponents))
    }

    /// Exact `q`-th root when every exponent divides evenly
    pub fn root(&self, q: i64) -> Option<Self> {
        if q <= 0 || (self.sign < 0 && q % 2 == 0) {
            return None;
        }
        if self.exponents.values().any(|e| e % q != 0) {
            return None;
        }
        Some(Factored::from_parts(
            self.sign,
            self.exponents.iter().map(|(p, e)| (*p, e / q)).collect(),
        ))
    }

    fn per_prime(a: &Factored, b: &Factored, pick: fn(i64, i64) -> i64) -> BTreeMap<u64, i64> {
        let mut exponents = BTreeMap::new();
        for p in a.exponents.keys().chain(b.exponents.keys()) {
            exponents.insert(*p, pick(a.exponent(*p), b.exponent(*p)));
        }
        exponents
    }

    /// Greatest common divisor, always non-negative
    pub fn gcd(&self, other: &Factored) -> Self {
        if self.is_zero() {
            return other.abs();
        }
        if other.is_zero() {
            return self.abs();
        }
        Factored::from_parts(1, Factored::per_prime(self, other, i64::min))
    }

    /// Least common multiple, always non-negative
    pub fn lcm(&self, other: &Factored) -> Self {
        if self.is_zero() || other.is_zero() {
            return Factored::zero();
        }
        Factored::from_parts(1, Factored::per_prime(self, other, i64::max))
    }

    pub fn add(&self, other: &Factored) -> DomainResult<Self> {
        if self.is_zero() {
            return Ok(other.clone());
        }
        if other.is_zero() {
            return Ok(self.clone());
        }
        let common = Factored::per_prime(self, other, i64::min);
        let cofactor = |value: &Factored| {
            product(
                common
                    .iter()
                    .map(|(p, c)| (*p, (value.exponent(*p) - c) as u64)),
            )
        };
        let mut a = BigInt::from(cofactor(self));
        let mut b = BigInt::from(cofactor(other));
        if self.sign < 0 {
            a = -a;
        }
        if other.sign < 0 {
            b = -b;
        }
        let sum = a + b;
        if sum.is_zero() {
            return Ok(Factored::zero());
        }
        let scale = Factored::from_parts(1, common);
        Ok(Factored::from_bigint(&sum)?.multiply(&scale))
    }

    /// Numerator and denominator as signed big integers, denominator positive
    fn fraction(&self) -> (BigInt, BigInt) {
        (self.signed_numerator(), BigInt::from(self.denominator()))
    }

    pub fn floor(&self) -> DomainResult<Self> {
        let (n, d) = self.fraction();
        Factored::from_bigint(&n.div_floor(&d))
    }

    pub fn ceil(&self) -> DomainResult<Self> {
        let (n, d) = self.fraction();
        Factored::from_bigint(&-((-n).div_floor(&d)))
    }

    /// Round half away from zero
    pub fn round(&self) -> DomainResult<Self> {
        let (n, d) = self.fraction();
        let twice = BigInt::from(2) * n.abs() + &d;
        let magnitude = twice.div_floor(&(BigInt::from(2) * &d));
        let rounded = if n.is_negative() { -magnitude } else { magnitude };
        Factored::from_bigint(&rounded)
    }

    pub fn cmp_value(&self, other: &Factored) -> Ordering {
        let (an, ad) = self.fraction();
        let (bn, bd) = other.fraction();
        (an * bd).cmp(&(bn * ad))
    }
}

impl fmt::Display for Factored {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (n, d) = self.fraction();
        if d.is_one() {
            write!(f, "{}", n)
        } else {
            write!(f, "{}/{}", n, d)
        }
    }
}

/// Exact rational domain
pub struct FactoredDomain {
    special: OnceCell<FactoredSpecialFunctions>,
}

impl FactoredDomain {
    pub fn new() -> Self {
        Self {
            special: OnceCell::new(),
        }
    }
}

impl Default for FactoredDomain {
    fn default() -> Self {
        Self::new()
    }
}

impl Arithmetic for FactoredDomain {
    type Value = Factored;

    fn zero(&self) -> Factored {
        Factored::zero()
    }

    fn one(&self) -> Factored {
        Factored::one()
    }

    fn add(&self, a: &Factored, b: &Factored) -> DomainResult<Factored> {
        a.add(b)
    }

    fn negate(&self, a: &Factored) -> Factored {
        a.negate()
    }

    fn multiply(&self, a: &Factored, b: &Factored) -> DomainResult<Factored> {
        Ok(a.multiply(b))
    }

    fn invert(&self, a: &Factored) -> DomainResult<Factored> {
        a.invert()
    }

    fn is_zero(&self, a: &Factored) -> bool {
        a.is_zero()
    }
}

impl Ordered for FactoredDomain {
    fn less_than(&self, a: &Factored, b: &Factored) -> bool {
        a.cmp_value(b) == Ordering::Less
    }

    fn compare(&self, a: &Factored, b: &Factored) -> Ordering {
        a.cmp_value(b)
    }
}

impl Convertible for FactoredDomain {
    fn to_double(&self, a: &Factored) -> f64 {
        a.to_f64()
    }

    fn from_double(&self, x: f64) -> DomainResult<Factored> {
        Factored::from_f64(x)
    }

    fn from_integer(&self, n: i64) -> Factored {
        Factored::from_integer(n)
    }

    fn to_integer(&self, a: &Factored) -> DomainResult<i64> {
        a.to_integer().ok_or_else(|| not_integral(a))
    }

    fn magnitude(&self, a: &Factored) -> f64 {
        a.to_f64().abs()
    }

    fn pi(&self) -> Factored {
        // 355/113
        let mut pi = Factored::from_integer(355);
        pi.exponents.insert(113, -1);
        pi
    }
}

impl Domain for FactoredDomain {
    fn name(&self) -> &'static str {
        DOMAIN
    }

    fn format(&self, a: &Factored) -> String {
        a.to_string()
    }

    fn to_json(&self, a: &Factored) -> serde_json::Value {
        let (n, d) = a.fraction();
        serde_json::json!({
            "numerator": n.to_string(),
            "denominator": d.to_string(),
        })
    }

    fn power(&self, base: &Factored, exponent: &Factored) -> DomainResult<Factored> {
        if let Some(k) = exponent.to_integer() {
            return base.powi(k);
        }
        // p/q exponents stay exact when the q-th root is exact
        if let (Some(p), Some(q)) = (
            exponent.signed_numerator().to_i64(),
            exponent.denominator().to_i64(),
        ) {
            if let Some(root) = base.root(q) {
                return root.powi(p);
            }
        }
        Factored::from_f64(base.to_f64().powf(exponent.to_f64()))
    }

    fn elementary(&self, function: Elementary, a: &Factored) -> Result<Factored> {
        match function {
            Elementary::Abs => Ok(a.abs()),
            Elementary::Sqrt => match a.root(2) {
                Some(root) => Ok(root),
                None => Ok(Factored::from_f64(a.to_f64().sqrt())?),
            },
            other => Ok(Factored::from_f64(other.apply_f64(a.to_f64()))?),
        }
    }

    fn init_special_functions(&self) {
        let _ = self.special.set(FactoredSpecialFunctions);
    }

    fn special_functions(&self) -> Option<&dyn SpecialFunctions<Factored>> {
        self.special
            .get()
            .map(|s| s as &dyn SpecialFunctions<Factored>)
    }
}
