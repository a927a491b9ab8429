//! Modular arithmetic over Z_q.
//!
//! [`ModQ`] holds the stateless canonical-residue helpers used by the NTT and
//! the samplers. [`SymmetricModulus`] wraps a modulus that has been checked to
//! be odd and provides the symmetric representative used by reconciliation.

use crate::error::{Error, Result};

/// Modular arithmetic operations over Z_q
pub struct ModQ;

impl ModQ {
    /// Add two values modulo q
    #[inline]
    pub fn add(a: u64, b: u64, q: u64) -> u64 {
        let sum = (a as u128) + (b as u128);
        (sum % (q as u128)) as u64
    }

    /// Subtract two values modulo q
    #[inline]
    pub fn sub(a: u64, b: u64, q: u64) -> u64 {
        if a >= b {
            a - b
        } else {
            q - (b - a)
        }
    }

    /// Multiply two values modulo q
    #[inline]
    pub fn mul(a: u64, b: u64, q: u64) -> u64 {
        let prod = (a as u128) * (b as u128);
        (prod % (q as u128)) as u64
    }

    /// Negate a value modulo q
    #[inline]
    pub fn negate(a: u64, q: u64) -> u64 {
        if a == 0 {
            0
        } else {
            q - a
        }
    }

    /// Canonical residue in [0, q) of a signed integer
    #[inline]
    pub fn from_signed(val: i64, q: u64) -> u64 {
        (val as i128).rem_euclid(q as i128) as u64
    }

    /// Reduce a value modulo q
    #[inline]
    pub fn reduce(a: u64, q: u64) -> u64 {
        a % q
    }

    /// base^exp mod m by square-and-multiply
    pub fn pow(base: u64, mut exp: u64, m: u64) -> u64 {
        let mut result = 1 % m;
        let mut base = base % m;
        while exp > 0 {
            if exp & 1 == 1 {
                result = Self::mul(result, base, m);
            }
            exp >>= 1;
            base = Self::mul(base, base, m);
        }
        result
    }

    /// Multiplicative inverse modulo a prime q (Fermat: a^(q-2)).
    ///
    /// `a` must be non-zero mod q.
    #[inline]
    pub fn inverse(a: u64, q: u64) -> u64 {
        debug_assert!(a % q != 0, "zero has no inverse");
        Self::pow(a, q - 2, q)
    }
}

/// An odd modulus, validated once so that symmetric reduction is total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymmetricModulus {
    q: u64,
    half: u64,
}

impl SymmetricModulus {
    /// Wrap `q`, rejecting even moduli.
    pub fn new(q: u64) -> Result<Self> {
        if q % 2 == 0 {
            return Err(Error::ModulusEven(q));
        }
        if q > i64::MAX as u64 {
            return Err(Error::ModulusTooLarge { q, max_bits: 63 });
        }
        Ok(Self { q, half: (q - 1) / 2 })
    }

    /// The modulus q.
    #[inline]
    pub fn modulus(&self) -> u64 {
        self.q
    }

    /// (q - 1) / 2, the largest symmetric representative.
    #[inline]
    pub fn half(&self) -> u64 {
        self.half
    }

    /// Canonical residue in [0, q).
    #[inline]
    pub fn reduce(&self, r: i64) -> u64 {
        ModQ::from_signed(r, self.q)
    }

    /// Symmetric residue in [-(q - 1) / 2, (q - 1) / 2].
    ///
    /// Reduces to [0, q) first, then maps the upper half down by q.
    #[inline]
    pub fn symmetric(&self, r: i64) -> i64 {
        let canonical = self.reduce(r);
        if canonical <= self.half {
            canonical as i64
        } else {
            canonical as i64 - self.q as i64
        }
    }
}

/// Deterministic Miller-Rabin primality test for 64-bit integers.
pub fn is_prime(n: u64) -> bool {
    const BASES: [u64; 12] = [2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37];

    if n < 2 {
        return false;
    }
    for &p in &BASES {
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

    'witness: for &a in &BASES {
        let mut x = ModQ::pow(a, d, n);
        if x == 1 || x == n - 1 {
            continue;
        }
        for _ in 1..s {
            x = ModQ::mul(x, x, n);
            if x == n - 1 {
                continue 'witness;
            }
        }
        return false;
    }
    true
}

/// Distinct prime factors of `x` by trial division up to sqrt(x).
pub fn prime_factors(mut x: u64) -> Vec<u64> {
    let mut factors = Vec::new();
    let mut i = 2u64;
    while i.saturating_mul(i) <= x {
        if x % i == 0 {
            x /= i;
            if factors.last() != Some(&i) {
                factors.push(i);
            }
        } else {
            i += 1;
        }
    }
    if x > 1 && factors.last() != Some(&x) {
        factors.push(x);
    }
    factors
}

#[cfg(test)]
mod tests {
    use super::*;

    const Q: u64 = 1_073_479_681;

    #[test]
    fn test_add() {
        assert_eq!(ModQ::add(5, 7, Q), 12);
        assert_eq!(ModQ::add(Q - 1, 2, Q), 1);
    }

    #[test]
    fn test_sub() {
        assert_eq!(ModQ::sub(10, 3, Q), 7);
        assert_eq!(ModQ::sub(3, 10, Q), Q - 7);
    }

    #[test]
    fn test_mul() {
        assert_eq!(ModQ::mul(5, 7, Q), 35);
        assert_eq!(ModQ::mul(Q - 1, Q - 1, Q), 1);
    }

    #[test]
    fn test_negate() {
        assert_eq!(ModQ::negate(5, Q), Q - 5);
        assert_eq!(ModQ::negate(0, Q), 0);
    }

    #[test]
    fn test_from_signed() {
        assert_eq!(ModQ::from_signed(5, Q), 5);
        assert_eq!(ModQ::from_signed(-5, Q), Q - 5);
        assert_eq!(ModQ::from_signed(0, Q), 0);
        assert_eq!(ModQ::from_signed(-(Q as i64), Q), 0);
        assert_eq!(ModQ::from_signed(3 * Q as i64 + 4, Q), 4);
    }

    #[test]
    fn test_pow_and_inverse() {
        assert_eq!(ModQ::pow(3, 0, Q), 1);
        assert_eq!(ModQ::pow(2, 10, Q), 1024);
        assert_eq!(ModQ::pow(7, Q - 1, Q), 1);
        for a in [1u64, 2, 3, 12345, Q - 1] {
            assert_eq!(ModQ::mul(a, ModQ::inverse(a, Q), Q), 1);
        }
    }

    #[test]
    fn test_symmetric_rejects_even() {
        assert_eq!(SymmetricModulus::new(16), Err(Error::ModulusEven(16)));
    }

    #[test]
    fn test_symmetric_boundaries() {
        let m = SymmetricModulus::new(17).unwrap();
        assert_eq!(m.half(), 8);
        assert_eq!(m.symmetric(8), 8);
        assert_eq!(m.symmetric(9), -8);
        assert_eq!(m.symmetric(16), -1);
        assert_eq!(m.symmetric(17), 0);
        assert_eq!(m.symmetric(-1), -1);
        assert_eq!(m.symmetric(-9), 8);
    }

    #[test]
    fn test_symmetric_range_and_congruence() {
        for q in [3u64, 17, 97, 7681, Q] {
            let m = SymmetricModulus::new(q).unwrap();
            let half = ((q - 1) / 2) as i64;
            let span = 3 * q as i64;
            let step = (span / 500).max(1);
            let mut r = -span;
            while r <= span {
                let s = m.symmetric(r);
                assert!(-half <= s && s <= half, "q={q} r={r} -> {s}");
                assert_eq!((r - s).rem_euclid(q as i64), 0, "q={q} r={r}");
                r += step;
            }
        }
    }

    #[test]
    fn test_is_prime() {
        let primes = [2u64, 3, 5, 17, 97, 7681, 12289, Q, 1152921504606830593];
        for p in primes {
            assert!(is_prime(p), "{p} should be prime");
        }
        let composites = [0u64, 1, 4, 33, 561, 7680, Q - 1, 3215031751];
        for c in composites {
            assert!(!is_prime(c), "{c} should be composite");
        }
    }

    #[test]
    fn test_prime_factors() {
        assert_eq!(prime_factors(16), vec![2]);
        assert_eq!(prime_factors(7680), vec![2, 3, 5]);
        // Q - 1 = 2^18 * 3^2 * 5 * 7 * 13
        assert_eq!(prime_factors(Q - 1), vec![2, 3, 5, 7, 13]);
    }
}
