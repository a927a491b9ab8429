//! Fixed-layout protocol messages.
//!
//! ```text
//! ClientHello = public_seed (34) | identity (11, ASCII, NUL-padded)
//!             | salt (11) | key share (N * coeff_bytes)
//! ServerReply = key share (N * coeff_bytes) | hints (ceil(N / 8))
//! ```
//!
//! Key shares travel in NTT domain. Hint bits are packed least
//! significant bit first.

use crate::error::{Error, Result};
use crate::math::poly::{Domain, Poly};
use crate::params::{RingParams, PUBLIC_SEED_BYTES};

/// Width of the identity field.
pub const IDENTITY_BYTES: usize = 11;

/// Width of the salt field.
pub const SALT_BYTES: usize = 11;

/// First protocol message, initiator to responder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientHello {
    public_seed: [u8; PUBLIC_SEED_BYTES],
    identity: String,
    salt: [u8; SALT_BYTES],
    key_share: Poly,
}

impl ClientHello {
    /// Build a hello message, checking the identity and that the key
    /// share is in NTT domain.
    pub fn new(
        public_seed: [u8; PUBLIC_SEED_BYTES],
        identity: &str,
        salt: [u8; SALT_BYTES],
        key_share: Poly,
    ) -> Result<Self> {
        check_identity(identity.as_bytes())?;
        key_share.expect_domain(Domain::Ntt)?;
        Ok(Self {
            public_seed,
            identity: identity.to_owned(),
            salt,
            key_share,
        })
    }

    /// Seed the public element `a` is expanded from.
    pub fn public_seed(&self) -> &[u8; PUBLIC_SEED_BYTES] {
        &self.public_seed
    }

    /// Initiator identity, without NUL padding.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Initiator salt.
    pub fn salt(&self) -> &[u8; SALT_BYTES] {
        &self.salt
    }

    /// Initiator key share, NTT domain.
    pub fn key_share(&self) -> &Poly {
        &self.key_share
    }

    /// Encoded size for a parameter set.
    pub fn encoded_len(params: &RingParams) -> usize {
        PUBLIC_SEED_BYTES + IDENTITY_BYTES + SALT_BYTES + params.poly_bytes()
    }

    /// Serialize in the fixed hello layout.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(
            PUBLIC_SEED_BYTES
                + IDENTITY_BYTES
                + SALT_BYTES
                + self.key_share.dimension() * self.key_share.coeff_bytes(),
        );
        out.extend_from_slice(&self.public_seed);

        let mut identity = [0u8; IDENTITY_BYTES];
        identity[..self.identity.len()].copy_from_slice(self.identity.as_bytes());
        out.extend_from_slice(&identity);

        out.extend_from_slice(&self.salt);
        out.extend_from_slice(&self.key_share.to_bytes());
        out
    }

    /// Parse a hello, validating length, identity and coefficients.
    pub fn from_bytes(bytes: &[u8], params: &RingParams) -> Result<Self> {
        let expected = Self::encoded_len(params);
        if bytes.len() != expected {
            return Err(Error::InvalidLength {
                expected,
                actual: bytes.len(),
            });
        }

        let (seed, rest) = bytes.split_at(PUBLIC_SEED_BYTES);
        let (identity, rest) = rest.split_at(IDENTITY_BYTES);
        let (salt, poly) = rest.split_at(SALT_BYTES);

        let mut public_seed = [0u8; PUBLIC_SEED_BYTES];
        public_seed.copy_from_slice(seed);

        let used = identity
            .iter()
            .rposition(|&b| b != 0)
            .map_or(0, |last| last + 1);
        let identity = &identity[..used];
        check_identity(identity)?;
        let identity = String::from_utf8_lossy(identity).into_owned();

        let mut salt_arr = [0u8; SALT_BYTES];
        salt_arr.copy_from_slice(salt);

        let key_share = Poly::from_bytes(poly, params.ring_dim, params.q, Domain::Ntt)?;

        Ok(Self {
            public_seed,
            identity,
            salt: salt_arr,
            key_share,
        })
    }
}

/// Responder's answer: its key share and one reconciliation hint per
/// coefficient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerReply {
    key_share: Poly,
    hints: Vec<u8>,
}

impl ServerReply {
    /// Build a reply; the share must be in NTT domain with one hint per
    /// coefficient.
    pub fn new(key_share: Poly, hints: Vec<u8>) -> Result<Self> {
        key_share.expect_domain(Domain::Ntt)?;
        if hints.len() != key_share.dimension() {
            return Err(Error::InvalidLength {
                expected: key_share.dimension(),
                actual: hints.len(),
            });
        }
        Ok(Self { key_share, hints })
    }

    /// Responder key share, NTT domain.
    pub fn key_share(&self) -> &Poly {
        &self.key_share
    }

    /// Hint bits, one per coefficient, each 0 or 1.
    pub fn hints(&self) -> &[u8] {
        &self.hints
    }

    /// Encoded size for a parameter set.
    pub fn encoded_len(params: &RingParams) -> usize {
        params.poly_bytes() + params.ring_dim.div_ceil(8)
    }

    /// Key share followed by the packed hints.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = self.key_share.to_bytes();
        out.extend_from_slice(&pack_bits(&self.hints));
        out
    }

    /// Parse a reply. Unused bits of the final hint byte must be zero.
    pub fn from_bytes(bytes: &[u8], params: &RingParams) -> Result<Self> {
        let expected = Self::encoded_len(params);
        if bytes.len() != expected {
            return Err(Error::InvalidLength {
                expected,
                actual: bytes.len(),
            });
        }
        let (poly, hints) = bytes.split_at(params.poly_bytes());
        let key_share = Poly::from_bytes(poly, params.ring_dim, params.q, Domain::Ntt)?;

        let used = params.ring_dim % 8;
        let last = hints.last().copied().unwrap_or(0);
        if used != 0 && last >> used != 0 {
            return Err(Error::NonzeroHintPadding(last));
        }
        Ok(Self {
            key_share,
            hints: unpack_bits(hints, params.ring_dim),
        })
    }
}

/// Pack 0/1 values into bytes, least significant bit first.
pub fn pack_bits(bits: &[u8]) -> Vec<u8> {
    let mut out = vec![0u8; bits.len().div_ceil(8)];
    for (i, &bit) in bits.iter().enumerate() {
        out[i / 8] |= (bit & 1) << (i % 8);
    }
    out
}

/// Inverse of [`pack_bits`] for `count` bits.
pub fn unpack_bits(bytes: &[u8], count: usize) -> Vec<u8> {
    (0..count).map(|i| (bytes[i / 8] >> (i % 8)) & 1).collect()
}

fn check_identity(identity: &[u8]) -> Result<()> {
    if identity.len() > IDENTITY_BYTES {
        return Err(Error::InvalidIdentity(format!(
            "{} bytes exceeds the {IDENTITY_BYTES}-byte field",
            identity.len()
        )));
    }
    if !identity.is_ascii() {
        return Err(Error::InvalidIdentity("identity must be ASCII".into()));
    }
    if identity.contains(&0) {
        return Err(Error::InvalidIdentity("identity must not contain NUL".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_params() -> RingParams {
        RingParams::new(16, 97, 3).unwrap()
    }

    fn share(params: &RingParams) -> Poly {
        let values = (0..params.ring_dim as u64).map(|i| i * 5).collect();
        Poly::from_values(values, params.q, Domain::Ntt)
    }

    #[test]
    fn test_hello_layout() {
        let params = small_params();
        let hello = ClientHello::new([0xAA; 34], "alice", [0x55; 11], share(&params)).unwrap();
        let bytes = hello.to_bytes();

        assert_eq!(bytes.len(), ClientHello::encoded_len(&params));
        assert_eq!(bytes.len(), 34 + 11 + 11 + 16);
        assert!(bytes[..34].iter().all(|&b| b == 0xAA));
        assert_eq!(&bytes[34..45], b"alice\0\0\0\0\0\0");
        assert!(bytes[45..56].iter().all(|&b| b == 0x55));
        assert_eq!(&bytes[56..60], &[0, 5, 10, 15]);
    }

    #[test]
    fn test_hello_roundtrip() {
        let params = small_params();
        let hello = ClientHello::new([7; 34], "elevenchars", [9; 11], share(&params)).unwrap();
        let parsed = ClientHello::from_bytes(&hello.to_bytes(), &params).unwrap();
        assert_eq!(parsed, hello);
        assert_eq!(parsed.identity(), "elevenchars");
        assert!(parsed.key_share().is_ntt());
    }

    #[test]
    fn test_hello_rejects_bad_identity() {
        let params = small_params();
        let too_long = ClientHello::new([0; 34], "twelve chars", [0; 11], share(&params));
        assert!(matches!(too_long, Err(Error::InvalidIdentity(_))));

        let non_ascii = ClientHello::new([0; 34], "bö", [0; 11], share(&params));
        assert!(matches!(non_ascii, Err(Error::InvalidIdentity(_))));

        let mut bytes = ClientHello::new([0; 34], "bob", [0; 11], share(&params))
            .unwrap()
            .to_bytes();
        bytes[35] = 0xC3;
        assert!(matches!(
            ClientHello::from_bytes(&bytes, &params),
            Err(Error::InvalidIdentity(_))
        ));
    }

    #[test]
    fn test_hello_rejects_coefficient_domain_share() {
        let params = small_params();
        let coeffs = Poly::zero(params.ring_dim, params.q);
        assert_eq!(
            ClientHello::new([0; 34], "a", [0; 11], coeffs),
            Err(Error::DomainMismatch {
                expected: Domain::Ntt,
                found: Domain::Coefficient
            })
        );
    }

    #[test]
    fn test_hello_rejects_wrong_length() {
        let params = small_params();
        let bytes = vec![0u8; ClientHello::encoded_len(&params) - 1];
        assert_eq!(
            ClientHello::from_bytes(&bytes, &params),
            Err(Error::InvalidLength {
                expected: 72,
                actual: 71
            })
        );
    }

    #[test]
    fn test_reply_roundtrip() {
        let params = small_params();
        let hints: Vec<u8> = (0..16).map(|i| (i % 3 == 0) as u8).collect();
        let reply = ServerReply::new(share(&params), hints.clone()).unwrap();
        let bytes = reply.to_bytes();
        assert_eq!(bytes.len(), ServerReply::encoded_len(&params));
        assert_eq!(bytes.len(), 16 + 2);

        let parsed = ServerReply::from_bytes(&bytes, &params).unwrap();
        assert_eq!(parsed.hints(), hints.as_slice());
        assert_eq!(parsed, reply);
    }

    #[test]
    fn test_reply_rejects_hint_count() {
        let params = small_params();
        assert_eq!(
            ServerReply::new(share(&params), vec![0; 15]),
            Err(Error::InvalidLength {
                expected: 16,
                actual: 15
            })
        );
    }

    #[test]
    fn test_reply_rejects_hint_padding() {
        let params = RingParams::new(4, 17, 3).unwrap();
        let share = Poly::from_values(vec![1, 2, 3, 4], 17, Domain::Ntt);
        let reply = ServerReply::new(share, vec![1, 0, 1, 1]).unwrap();
        let mut bytes = reply.to_bytes();
        assert_eq!(bytes, vec![1, 2, 3, 4, 0b0000_1101]);
        assert_eq!(ServerReply::from_bytes(&bytes, &params).unwrap(), reply);

        bytes[4] |= 0b0001_0000;
        assert_eq!(
            ServerReply::from_bytes(&bytes, &params),
            Err(Error::NonzeroHintPadding(0b0001_1101))
        );
    }

    #[test]
    fn test_pack_bits() {
        assert_eq!(pack_bits(&[1, 0, 1, 1, 0, 0, 0, 0, 1]), vec![0b0000_1101, 0b0000_0001]);
        assert_eq!(unpack_bits(&[0b0000_1101, 0b0000_0001], 9), vec![1, 0, 1, 1, 0, 0, 0, 0, 1]);
        assert!(pack_bits(&[]).is_empty());
    }
}
