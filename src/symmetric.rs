//! Symmetric primitives used by the protocol.
//!
//! | Role | Primitive | Entry point |
//! |------|-----------|-------------|
//! | XOF  | SHAKE-128 | [`XofStream`] |
//! | Hash | SHA3-256  | [`hash`] |
//! | PRF  | SHAKE-256 | [`prf`] |
//!
//! Every call owns its hashing state; nothing is shared between callers.

use sha3::digest::{ExtendableOutput, Update, XofReader};
use sha3::{Digest, Sha3_256, Shake128, Shake128Reader, Shake256};

/// SHAKE-128 output rate in bytes (one Keccak-f[1600] squeeze).
pub const XOF_BLOCK_BYTES: usize = 168;

/// SHA3-256 digest width.
pub const HASH_BYTES: usize = 32;

/// Single-use SHAKE-128 stream: absorb a seed once, then squeeze any
/// number of bytes.
///
/// Consecutive [`squeeze`](Self::squeeze) calls continue the same output
/// stream, so splitting a read across calls yields the same bytes as one
/// large read.
pub struct XofStream {
    reader: Shake128Reader,
}

impl XofStream {
    /// Absorb `seed` and finalize the sponge for squeezing.
    pub fn absorb(seed: &[u8]) -> Self {
        let mut h = Shake128::default();
        Update::update(&mut h, seed);
        Self {
            reader: h.finalize_xof(),
        }
    }

    /// Fill `out` with the next bytes of the stream.
    pub fn squeeze(&mut self, out: &mut [u8]) {
        self.reader.read(out);
    }
}

/// SHA3-256(input).
pub fn hash(input: &[u8]) -> [u8; HASH_BYTES] {
    let mut h = Sha3_256::new();
    Digest::update(&mut h, input);
    h.finalize().into()
}

/// SHAKE-256(seed), squeezed to fill `out`.
pub fn prf(seed: &[u8], out: &mut [u8]) {
    let mut h = Shake256::default();
    Update::update(&mut h, seed);
    let mut reader = h.finalize_xof();
    reader.read(out);
}
