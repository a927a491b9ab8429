//! Ring parameter sets for the key exchange.
//!
//! A session is fixed to one `(N, Q, ETA)` triple for its whole lifetime.
//! Every constructor that depends on the triple validates it first, so a
//! bad parameter set fails at setup rather than producing silently wrong
//! shared secrets.

use eyre::{Context, Result as EyreResult};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::math::modular::is_prime;

/// Width of the public seed carried in the first protocol message.
pub const PUBLIC_SEED_BYTES: usize = 34;

/// Width of the random seed expanded into one noise polynomial.
pub const NOISE_SEED_BYTES: usize = 34;

/// Largest modulus width accepted by [`RingParams::validate`].
///
/// Keeps products of two residues inside `u128` and signed residues
/// inside `i64`.
pub const MAX_MODULUS_BITS: u32 = 62;

/// Core ring parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RingParams {
    /// Ring dimension N (power of two).
    pub ring_dim: usize,

    /// Coefficient modulus Q.
    /// Must be an odd prime with Q ≡ 1 (mod 2N).
    pub q: u64,

    /// Centered-binomial noise parameter (2 or 3).
    pub eta: usize,
}

impl RingParams {
    /// The calibrated instance: N = 1024, Q = 1073479681, ETA = 3.
    pub fn calibrated() -> Self {
        // 1073479681 = 2^30 - 2^18 + 1, so Q ≡ 1 (mod 2^18) and
        // uniform 30-bit candidates are accepted with probability ~0.9998.
        Self {
            ring_dim: 1024,
            q: 1_073_479_681,
            eta: 3,
        }
    }

    /// Build and validate a parameter set.
    pub fn new(ring_dim: usize, q: u64, eta: usize) -> Result<Self> {
        let params = Self { ring_dim, q, eta };
        params.validate()?;
        Ok(params)
    }

    /// Parse a JSON parameter file and validate it.
    pub fn from_json(json: &str) -> EyreResult<Self> {
        let params: Self =
            serde_json::from_str(json).wrap_err("Failed to parse ring parameters")?;
        params.validate().wrap_err("Invalid ring parameters")?;
        Ok(params)
    }

    /// Check every invariant the ring, the samplers and reconciliation rely on.
    pub fn validate(&self) -> Result<()> {
        if !self.ring_dim.is_power_of_two() {
            return Err(Error::DimensionNotPowerOfTwo(self.ring_dim));
        }

        let group = cbd_group_size(self.eta)?;
        let minimum = group.max(2);
        if self.ring_dim < minimum {
            return Err(Error::DimensionTooSmall {
                minimum,
                actual: self.ring_dim,
            });
        }

        validate_modulus(self.q, self.ring_dim)
    }

    /// log2(N), the number of NTT layers.
    pub fn log_n(&self) -> u32 {
        self.ring_dim.trailing_zeros()
    }

    /// Bytes per serialized coefficient: ceil((bitlength(Q - 1) + 1) / 8).
    ///
    /// The extra bit leaves room for a sign so symmetric representatives
    /// fit the same width.
    pub fn coeff_bytes(&self) -> usize {
        coeff_bytes_for(self.q)
    }

    /// Bytes in one serialized polynomial.
    pub fn poly_bytes(&self) -> usize {
        self.ring_dim * self.coeff_bytes()
    }

    /// PRF output consumed by one CBD polynomial: N * ETA / 4.
    pub fn noise_bytes(&self) -> usize {
        self.ring_dim * self.eta / 4
    }
}

impl Default for RingParams {
    fn default() -> Self {
        Self::calibrated()
    }
}

/// Coefficient width for modulus `q`, see [`RingParams::coeff_bytes`].
pub fn coeff_bytes_for(q: u64) -> usize {
    let bits = 64 - q.saturating_sub(1).leading_zeros() as usize;
    (bits + 1 + 7) / 8
}

/// Modulus checks shared by [`RingParams::validate`] and NTT construction:
/// odd, at most [`MAX_MODULUS_BITS`] wide, prime, and q ≡ 1 (mod 2N).
pub(crate) fn validate_modulus(q: u64, ring_dim: usize) -> Result<()> {
    if q % 2 == 0 {
        return Err(Error::ModulusEven(q));
    }

    if 64 - q.leading_zeros() > MAX_MODULUS_BITS {
        return Err(Error::ModulusTooLarge {
            q,
            max_bits: MAX_MODULUS_BITS,
        });
    }

    if !is_prime(q) {
        return Err(Error::ModulusNotPrime(q));
    }

    if q % (2 * ring_dim as u64) != 1 {
        return Err(Error::ModulusNotNttFriendly { q, ring_dim });
    }

    Ok(())
}

/// Coefficients produced per CBD input group; the ring dimension must be a
/// multiple of this.
fn cbd_group_size(eta: usize) -> Result<usize> {
    match eta {
        2 => Ok(8),
        3 => Ok(4),
        other => Err(Error::UnsupportedEta(other)),
    }
}
