//! Prime factorization of machine integers
//!
//! Trial division by small primes, then Pollard rho (Brent variant) with a
//! deterministic Miller-Rabin test for the remaining cofactors.

use num_integer::Integer;
use std::collections::BTreeMap;

const SMALL_PRIMES: [u64; 12] = [2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37];
const TRIAL_LIMIT: u64 = 1_000;

fn mul_mod(a: u64, b: u64, m: u64) -> u64 {
    ((a as u128 * b as u128) % m as u128) as u64
}

fn pow_mod(mut base: u64, mut exp: u64, m: u64) -> u64 {
    let mut result = 1 % m;
    base %= m;
    while exp > 0 {
        if exp & 1 == 1 {
            result = mul_mod(result, base, m);
        }
        base = mul_mod(base, base, m);
        exp >>= 1;
    }
    result
}

/// Deterministic for every u64
pub fn is_prime(n: u64) -> bool {
    if n < 2 {
        return false;
    }
    for p in SMALL_PRIMES {
        if n % p == 0 {
            return n == p;
        }
    }
    let mut d = n - 1;
    let mut s = 0;
    while d % 2 == 0 {
        d /= 2;
        s += 1;
    }
    'witness: for a in SMALL_PRIMES {
        let mut x = pow_mod(a, d, n);
        if x == 1 || x == n - 1 {
            continue;
        }
        for _ in 1..s {
            x = mul_mod(x, x, n);
            if x == n - 1 {
                continue 'witness;
            }
        }
        return false;
    }
    true
}

/// Finds a non-trivial divisor of an odd composite `n`
fn pollard_rho(n: u64) -> u64 {
    let mut c = 1u64;
    loop {
        let f = |x: u64| ((mul_mod(x, x, n) as u128 + c as u128) % n as u128) as u64;
        let (mut x, mut y, mut d) = (2u64, 2u64, 1u64);
        while d == 1 {
            x = f(x);
            y = f(f(y));
            d = x.abs_diff(y).gcd(&n);
        }
        if d != n {
            return d;
        }
        c += 1;
    }
}

fn collect_factors(n: u64, factors: &mut BTreeMap<u64, u32>) {
    if n == 1 {
        return;
    }
    if is_prime(n) {
        *factors.entry(n).or_insert(0) += 1;
        return;
    }
    let d = pollard_rho(n);
    collect_factors(d, factors);
    collect_factors(n / d, factors);
}

/// Prime -> multiplicity map of `n`; empty for 0 and 1
pub fn factorize_u64(mut n: u64) -> BTreeMap<u64, u32> {
    let mut factors = BTreeMap::new();
    if n < 2 {
        return factors;
    }
    let mut p = 2;
    while p <= TRIAL_LIMIT && p * p <= n {
        while n % p == 0 {
            *factors.entry(p).or_insert(0) += 1;
            n /= p;
        }
        p += if p == 2 { 1 } else { 2 };
    }
    collect_factors(n, &mut factors);
    factors
}
