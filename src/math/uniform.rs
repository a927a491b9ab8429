//! Uniform polynomial sampling by rejection over a SHAKE-128 stream.
//!
//! Every 15 stream bytes yield four 30-bit candidates. Bytes 1..=12 supply
//! the middle 24 bits of each candidate, bytes 13 and 14 supply one low
//! nibble each, and byte 0 supplies two top bits to each of the four.
//! A candidate is accepted iff it is below q, so the output is exactly
//! uniform on [0, q) for any q < 2^30.
//!
//! The result is used directly as an NTT-domain value: a uniform vector
//! stays uniform under the (bijective) transform.

use tracing::{debug, trace};

use super::poly::{Domain, Poly};
use crate::error::{Error, Result};
use crate::symmetric::{XofStream, XOF_BLOCK_BYTES};

/// Stream bytes consumed per group of four candidates.
pub const GROUP_BYTES: usize = 15;

/// Candidate width; q must be strictly below 2^CANDIDATE_BITS.
pub const CANDIDATE_BITS: u32 = 30;

/// Multiple of the expected stream length read before giving up.
const REFILL_SLACK: u128 = 8;

/// Refills always allowed on top of the scaled allowance.
const MIN_REFILLS: usize = 64;

/// Upper bound on the first squeeze, for moduli far below 2^30.
const MAX_BUFFER_BLOCKS: usize = 256;

/// Sample a uniform NTT-domain polynomial from `seed`.
///
/// Deterministic: the same `(seed, ring_dim, q)` always yields the same
/// polynomial.
pub fn sample_uniform_ntt(seed: &[u8], ring_dim: usize, q: u64) -> Result<Poly> {
    if q >= 1 << CANDIDATE_BITS {
        return Err(Error::ModulusTooLarge {
            q,
            max_bits: CANDIDATE_BITS,
        });
    }
    let buf_len = buffer_len(ring_dim, q);
    sample_with_buffer(seed, ring_dim, q, buf_len, refill_cap(ring_dim, q, buf_len))
}

/// Size of the first squeeze: enough bytes, on average, for `ring_dim`
/// accepted candidates, rounded up to whole XOF blocks.
pub fn buffer_len(ring_dim: usize, q: u64) -> usize {
    let needed = (CANDIDATE_BITS as f64) * ring_dim as f64 / 8.0;
    let expansion = (1u64 << CANDIDATE_BITS) as f64 / q.max(1) as f64;
    let blocks = ((needed * expansion + XOF_BLOCK_BYTES as f64) / XOF_BLOCK_BYTES as f64) as usize;
    blocks.clamp(1, MAX_BUFFER_BLOCKS) * XOF_BLOCK_BYTES
}

/// Refill rounds allowed before reporting [`Error::SamplerExhausted`]:
/// eight times the rounds needed on average to accept `ring_dim`
/// candidates below q, plus 64.
pub fn refill_cap(ring_dim: usize, q: u64, buf_len: usize) -> usize {
    let candidates = (ring_dim as u128 * (1u128 << CANDIDATE_BITS)).div_ceil(u128::from(q.max(1)));
    let expected_bytes = candidates.div_ceil(4) * GROUP_BYTES as u128;
    let per_round = (buf_len - buf_len % GROUP_BYTES).max(GROUP_BYTES) as u128;
    let scaled = (REFILL_SLACK * expected_bytes).div_ceil(per_round);
    usize::try_from(scaled)
        .unwrap_or(usize::MAX)
        .saturating_add(MIN_REFILLS)
}

fn sample_with_buffer(
    seed: &[u8],
    ring_dim: usize,
    q: u64,
    buf_len: usize,
    max_refills: usize,
) -> Result<Poly> {
    debug_assert!(buf_len >= GROUP_BYTES);

    let mut xof = XofStream::absorb(seed);
    let mut buf = vec![0u8; buf_len];
    xof.squeeze(&mut buf);

    let mut coeffs = Vec::with_capacity(ring_dim);
    reject(&buf, q, ring_dim, &mut coeffs);

    let mut rounds = 0;
    while coeffs.len() < ring_dim {
        if rounds == max_refills {
            return Err(Error::SamplerExhausted {
                rounds,
                accepted: coeffs.len(),
            });
        }
        rounds += 1;

        let tail = buf_len % GROUP_BYTES;
        buf.copy_within(buf_len - tail.., 0);
        xof.squeeze(&mut buf[tail..]);
        trace!(round = rounds, accepted = coeffs.len(), "refilled uniform buffer");

        reject(&buf, q, ring_dim, &mut coeffs);
    }

    if rounds > 0 {
        debug!(rounds, ring_dim, "uniform sampling needed refills");
    }

    Ok(Poly::from_values(coeffs, q, Domain::Ntt))
}

/// Append accepted candidates from whole 15-byte groups of `buf` until
/// `out` holds `target` values.
fn reject(buf: &[u8], q: u64, target: usize, out: &mut Vec<u64>) {
    for group in buf.chunks_exact(GROUP_BYTES) {
        if out.len() >= target {
            return;
        }
        for candidate in unpack_group(group) {
            if out.len() < target && u64::from(candidate) < q {
                out.push(u64::from(candidate));
            }
        }
    }
}

#[inline]
fn unpack_group(group: &[u8]) -> [u32; 4] {
    let b = |i: usize| u32::from(group[i]);
    let top = b(0);
    [
        ((top << 22) & 0x3000_0000) | (b(1) << 20) | (b(2) << 12) | (b(3) << 4) | (b(13) >> 4),
        ((top << 24) & 0x3000_0000) | (b(4) << 20) | (b(5) << 12) | (b(6) << 4) | (b(13) & 0xF),
        ((top << 26) & 0x3000_0000) | (b(7) << 20) | (b(8) << 12) | (b(9) << 4) | (b(14) >> 4),
        ((top << 28) & 0x3000_0000) | (b(10) << 20) | (b(11) << 12) | (b(12) << 4) | (b(14) & 0xF),
    ]
}
