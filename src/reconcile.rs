//! Reconciliation: turning two nearby ring values into one shared bit.
//!
//! The responder holds y and publishes `w = signal(y)`. The initiator holds
//! x = y + e and computes `robust_extractor(x, w)`, the responder computes
//! `robust_extractor(y, w)`. When e is even and small relative to q/4 both
//! sides obtain the same bit.

use rand::{CryptoRng, RngCore};

use crate::error::{Error, Result};
use crate::math::modular::SymmetricModulus;
use crate::math::poly::Poly;
use crate::params::RingParams;

/// Hint, signal and extractor functions for one odd modulus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reconciler {
    modulus: SymmetricModulus,
    quarter: i64,
}

impl Reconciler {
    /// Reconciler for modulus `q`; fails if `q` is even.
    pub fn new(q: u64) -> Result<Self> {
        let modulus = SymmetricModulus::new(q)?;
        Ok(Self {
            modulus,
            quarter: (q / 4) as i64,
        })
    }

    /// Reconciler for a validated parameter set.
    pub fn from_params(params: &RingParams) -> Result<Self> {
        params.validate()?;
        Self::new(params.q)
    }

    /// The modulus q.
    pub fn modulus(&self) -> u64 {
        self.modulus.modulus()
    }

    /// 0 iff the symmetric residue of `x` lies in
    /// [-floor(q/4) + b, floor(q/4) + b], else 1.
    pub fn hint(&self, x: u64, b: u8) -> u8 {
        debug_assert!(b <= 1);
        let s = self.symmetric(x);
        let b = i64::from(b);
        let inside = (-self.quarter + b..=self.quarter + b).contains(&s);
        u8::from(!inside)
    }

    /// `hint(y, b)` for a freshly drawn random bit b.
    pub fn signal<R: RngCore + CryptoRng>(&self, rng: &mut R, y: u64) -> u8 {
        let b = (rng.next_u32() & 1) as u8;
        self.hint(y, b)
    }

    /// The agreed bit for `x` given the peer's hint `w`.
    pub fn robust_extractor(&self, x: u64, w: u8) -> u8 {
        debug_assert!(w <= 1);
        let s = self.symmetric(x);
        let shifted = s + i64::from(w) * self.modulus.half() as i64;
        self.modulus.symmetric(shifted).rem_euclid(2) as u8
    }

    /// One signal per coefficient of a coefficient-domain polynomial.
    pub fn signal_poly<R: RngCore + CryptoRng>(&self, rng: &mut R, y: &Poly) -> Vec<u8> {
        y.coeffs().iter().map(|&c| self.signal(rng, c)).collect()
    }

    /// One agreed bit per coefficient, using the peer's hints.
    pub fn extract_poly(&self, x: &Poly, hints: &[u8]) -> Result<Vec<u8>> {
        if hints.len() != x.dimension() {
            return Err(Error::InvalidLength {
                expected: x.dimension(),
                actual: hints.len(),
            });
        }
        Ok(x.coeffs()
            .iter()
            .zip(hints)
            .map(|(&c, &w)| self.robust_extractor(c, w))
            .collect())
    }

    fn symmetric(&self, x: u64) -> i64 {
        self.modulus.symmetric((x % self.modulus.modulus()) as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha20Rng;

    const Q: u64 = 1_073_479_681;

    #[test]
    fn test_rejects_even_modulus() {
        assert_eq!(Reconciler::new(1024), Err(Error::ModulusEven(1024)));
    }

    #[test]
    fn test_hint_small_modulus() {
        let r = Reconciler::new(17).unwrap();
        // floor(17/4) = 4: hint(x, 0) = 0 on [-4, 4], hint(x, 1) = 0 on [-3, 5]
        let h0: Vec<u8> = (0..17).map(|x| r.hint(x, 0)).collect();
        let h1: Vec<u8> = (0..17).map(|x| r.hint(x, 1)).collect();
        assert_eq!(h0, vec![0, 0, 0, 0, 0, 1, 1, 1, 1, 1, 1, 1, 1, 0, 0, 0, 0]);
        assert_eq!(h1, vec![0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 1, 1, 1, 1, 0, 0, 0]);
    }

    #[test]
    fn test_hint_boundaries() {
        let r = Reconciler::new(Q).unwrap();
        let quarter = Q / 4;
        assert_eq!(r.hint(quarter, 0), 0);
        assert_eq!(r.hint(quarter + 1, 0), 1);
        assert_eq!(r.hint(quarter + 1, 1), 0);
        assert_eq!(r.hint(Q - quarter, 0), 0);
        assert_eq!(r.hint(Q - quarter, 1), 1);
    }

    #[test]
    fn test_robust_extractor_small_modulus() {
        let r = Reconciler::new(17).unwrap();
        let e0: Vec<u8> = (0..17).map(|x| r.robust_extractor(x, 0)).collect();
        let e1: Vec<u8> = (0..17).map(|x| r.robust_extractor(x, 1)).collect();
        assert_eq!(e0, vec![0, 1, 0, 1, 0, 1, 0, 1, 0, 0, 1, 0, 1, 0, 1, 0, 1]);
        assert_eq!(e1, vec![0, 0, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 1, 0, 1]);
    }

    #[test]
    fn test_outputs_are_bits() {
        let r = Reconciler::new(Q).unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(5);
        for _ in 0..1000 {
            let x = rng.gen_range(0..Q);
            assert!(r.signal(&mut rng, x) <= 1);
            assert!(r.robust_extractor(x, 0) <= 1);
            assert!(r.robust_extractor(x, 1) <= 1);
        }
    }

    #[test]
    fn test_signal_uses_both_hint_offsets() {
        // x = floor(q/4) + 1 has hint 1 for b = 0 and hint 0 for b = 1.
        let r = Reconciler::new(Q).unwrap();
        let x = Q / 4 + 1;
        let mut rng = ChaCha20Rng::seed_from_u64(9);
        let signals: Vec<u8> = (0..64).map(|_| r.signal(&mut rng, x)).collect();
        assert!(signals.contains(&0));
        assert!(signals.contains(&1));
    }

    #[test]
    fn test_agreement_with_small_even_error() {
        let r = Reconciler::new(Q).unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(2024);
        let bound = (Q / 16) as i64;
        let mut agreed = 0;
        for _ in 0..10_000 {
            let x = rng.gen_range(0..Q);
            let e = 2 * rng.gen_range(-bound..=bound);
            let y = (x as i64 + e).rem_euclid(Q as i64) as u64;

            let w = r.signal(&mut rng, y);
            if r.robust_extractor(x, w) == r.robust_extractor(y, w) {
                agreed += 1;
            }
        }
        assert!(agreed >= 9_900, "only {agreed} of 10000 agreed");
    }

    #[test]
    fn test_poly_helpers() {
        let r = Reconciler::new(17).unwrap();
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        let y = Poly::from_coeffs((0..8).collect(), 17);
        let hints = r.signal_poly(&mut rng, &y);
        assert_eq!(hints.len(), 8);

        let bits = r.extract_poly(&y, &hints).unwrap();
        let expected: Vec<u8> = (0..8)
            .zip(&hints)
            .map(|(c, &w)| r.robust_extractor(c, w))
            .collect();
        assert_eq!(bits, expected);

        assert_eq!(
            r.extract_poly(&y, &hints[..7]),
            Err(Error::InvalidLength {
                expected: 8,
                actual: 7
            })
        );
    }
}
