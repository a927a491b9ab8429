//! Centered binomial noise.
//!
//! A CBD_eta sample is popcount(a) - popcount(b) for two independent
//! eta-bit strings a, b, so it lies in [-eta, eta]. Bits are counted in
//! parallel with a mask-and-shift trick: for eta = 3 every 24-bit
//! little-endian group yields four samples, for eta = 2 every 32-bit group
//! yields eight.

use rand::{CryptoRng, RngCore};
use zeroize::Zeroize;

use super::poly::Poly;
use crate::error::{Error, Result};
use crate::params::{RingParams, NOISE_SEED_BYTES};
use crate::symmetric::prf;

const ETA2_MASK: u32 = 0x5555_5555;
const ETA3_MASK: u32 = 0x0024_9249;

/// Turn `bytes` (exactly `ring_dim * eta / 4` of them) into a
/// coefficient-domain noise polynomial.
pub fn sample_cbd(bytes: &[u8], ring_dim: usize, q: u64, eta: usize) -> Result<Poly> {
    let group = match eta {
        2 => 8,
        3 => 4,
        other => return Err(Error::UnsupportedEta(other)),
    };
    if ring_dim % group != 0 {
        return Err(Error::DimensionTooSmall {
            minimum: group,
            actual: ring_dim,
        });
    }
    let expected = ring_dim * eta / 4;
    if bytes.len() != expected {
        return Err(Error::InvalidLength {
            expected,
            actual: bytes.len(),
        });
    }

    let mut signed = vec![0i64; ring_dim];
    match eta {
        2 => cbd2(bytes, &mut signed),
        _ => cbd3(bytes, &mut signed),
    }
    let poly = Poly::from_signed(&signed, q);
    signed.zeroize();
    Ok(poly)
}

/// Expand a noise seed with the PRF and sample CBD_eta from it.
pub fn noise_from_seed(seed: &[u8; NOISE_SEED_BYTES], params: &RingParams) -> Result<Poly> {
    let mut bytes = vec![0u8; params.noise_bytes()];
    prf(seed, &mut bytes);
    let poly = sample_cbd(&bytes, params.ring_dim, params.q, params.eta);
    bytes.zeroize();
    poly
}

/// Draw a fresh noise seed from `rng` and sample a noise polynomial.
pub fn fresh_noise<R: RngCore + CryptoRng>(rng: &mut R, params: &RingParams) -> Result<Poly> {
    let mut seed = [0u8; NOISE_SEED_BYTES];
    rng.fill_bytes(&mut seed);
    let poly = noise_from_seed(&seed, params);
    seed.zeroize();
    poly
}

fn cbd2(bytes: &[u8], out: &mut [i64]) {
    for (chunk, coeffs) in bytes.chunks_exact(4).zip(out.chunks_exact_mut(8)) {
        let t = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        let d = (t & ETA2_MASK) + ((t >> 1) & ETA2_MASK);
        for (j, c) in coeffs.iter_mut().enumerate() {
            let a = (d >> (4 * j)) & 0x3;
            let b = (d >> (4 * j + 2)) & 0x3;
            *c = i64::from(a) - i64::from(b);
        }
    }
}

fn cbd3(bytes: &[u8], out: &mut [i64]) {
    for (chunk, coeffs) in bytes.chunks_exact(3).zip(out.chunks_exact_mut(4)) {
        let t = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], 0]);
        let d = (t & ETA3_MASK) + ((t >> 1) & ETA3_MASK) + ((t >> 2) & ETA3_MASK);
        for (j, c) in coeffs.iter_mut().enumerate() {
            let a = (d >> (6 * j)) & 0x7;
            let b = (d >> (6 * j + 3)) & 0x7;
            *c = i64::from(a) - i64::from(b);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::poly::Domain;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;
    use std::collections::BTreeMap;

    const Q: u64 = 1_073_479_681;

    fn centered(c: u64, q: u64) -> i64 {
        if c <= q / 2 {
            c as i64
        } else {
            c as i64 - q as i64
        }
    }

    fn seed() -> [u8; NOISE_SEED_BYTES] {
        let mut s = [0u8; NOISE_SEED_BYTES];
        for (i, b) in s.iter_mut().enumerate() {
            *b = i as u8;
        }
        s
    }

    fn histogram(params: &RingParams) -> BTreeMap<i64, usize> {
        let mut hist = BTreeMap::new();
        for s in 0u8..32 {
            let e = noise_from_seed(&[s; NOISE_SEED_BYTES], params).unwrap();
            for &c in e.coeffs() {
                *hist.entry(centered(c, params.q)).or_insert(0) += 1;
            }
        }
        hist
    }

    #[test]
    fn test_cbd3_single_groups() {
        // all ones: a = b = 3 in every lane
        let p = sample_cbd(&[0xFF; 3], 4, 17, 3).unwrap();
        assert!(p.is_zero());
        // low three bits set: first sample +3
        let p = sample_cbd(&[0x07, 0, 0], 4, 17, 3).unwrap();
        assert_eq!(p.coeffs(), &[3, 0, 0, 0]);
        // next three bits set: first sample -3
        let p = sample_cbd(&[0x38, 0, 0], 4, 17, 3).unwrap();
        assert_eq!(p.coeffs(), &[14, 0, 0, 0]);
    }

    #[test]
    fn test_cbd2_single_groups() {
        let p = sample_cbd(&[0x03, 0, 0, 0], 8, 17, 2).unwrap();
        assert_eq!(p.coeffs(), &[2, 0, 0, 0, 0, 0, 0, 0]);
        let p = sample_cbd(&[0x0C, 0, 0, 0], 8, 17, 2).unwrap();
        assert_eq!(p.coeffs(), &[15, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_known_answer_eta3() {
        let params = RingParams::calibrated();
        let e = noise_from_seed(&seed(), &params).unwrap();
        assert_eq!(e.domain(), Domain::Coefficient);
        let first: Vec<i64> = e.coeffs()[..16].iter().map(|&c| centered(c, Q)).collect();
        assert_eq!(first, vec![0, -2, -1, 0, -2, -1, 1, 0, -2, -1, 1, 1, 2, 2, 0, 2]);
        assert_eq!(&e.coeffs()[..8], &[0, Q - 2, Q - 1, 0, Q - 2, Q - 1, 1, 0]);
    }

    #[test]
    fn test_known_answer_eta2() {
        let params = RingParams::new(1024, Q, 2).unwrap();
        let e = noise_from_seed(&seed(), &params).unwrap();
        let first: Vec<i64> = e.coeffs()[..16].iter().map(|&c| centered(c, Q)).collect();
        assert_eq!(first, vec![-1, 0, -1, 0, 0, -1, -1, 1, -1, 1, 1, -1, 0, 1, -2, -1]);
    }

    #[test]
    fn test_range_eta3() {
        let params = RingParams::calibrated();
        let mut rng = ChaCha20Rng::seed_from_u64(42);
        for _ in 0..8 {
            let e = fresh_noise(&mut rng, &params).unwrap();
            assert!(e.linf_norm() <= 3);
        }
    }

    #[test]
    fn test_histogram_eta3() {
        let hist = histogram(&RingParams::calibrated());
        assert_eq!(hist.keys().copied().collect::<Vec<_>>(), vec![-3, -2, -1, 0, 1, 2, 3]);
        // 32 * 1024 samples, binomial weights 1 6 15 20 15 6 1 over 64
        let expected = [512.0, 3072.0, 7680.0, 10240.0, 7680.0, 3072.0, 512.0];
        for (&observed, expected) in hist.values().zip(expected) {
            let ratio = observed as f64 / expected;
            assert!((0.85..1.15).contains(&ratio), "{hist:?}");
        }
    }

    #[test]
    fn test_histogram_eta2() {
        let hist = histogram(&RingParams::new(1024, Q, 2).unwrap());
        assert_eq!(hist.keys().copied().collect::<Vec<_>>(), vec![-2, -1, 0, 1, 2]);
        // binomial weights 1 4 6 4 1 over 16
        let expected = [2048.0, 8192.0, 12288.0, 8192.0, 2048.0];
        for (&observed, expected) in hist.values().zip(expected) {
            let ratio = observed as f64 / expected;
            assert!((0.85..1.15).contains(&ratio), "{hist:?}");
        }
    }

    #[test]
    fn test_rejects_bad_input() {
        assert_eq!(
            sample_cbd(&[0u8; 767], 1024, Q, 3),
            Err(Error::InvalidLength {
                expected: 768,
                actual: 767
            })
        );
        assert_eq!(sample_cbd(&[0u8; 1024], 1024, Q, 4), Err(Error::UnsupportedEta(4)));
        assert_eq!(
            sample_cbd(&[0u8; 2], 4, 17, 2),
            Err(Error::DimensionTooSmall {
                minimum: 8,
                actual: 4
            })
        );
    }

    #[test]
    fn test_fresh_noise_differs_per_draw() {
        let params = RingParams::calibrated();
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let a = fresh_noise(&mut rng, &params).unwrap();
        let b = fresh_noise(&mut rng, &params).unwrap();
        assert_ne!(a, b);
    }
}
