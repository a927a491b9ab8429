//! Error type shared by every fallible operation in the crate.
//!
//! Construction-time parameter violations, domain mix-ups between
//! coefficient and NTT representations, and malformed wire input all
//! surface here. Index-out-of-range coefficient access and mismatched
//! operand shapes remain panics: they are caller bugs, not inputs.

use std::fmt;

use crate::math::poly::Domain;

/// Errors returned by parameter validation, ring operations and decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Ring dimension is not a power of two.
    DimensionNotPowerOfTwo(usize),
    /// Ring dimension is smaller than the sampler or transform supports.
    DimensionTooSmall {
        /// Smallest accepted dimension.
        minimum: usize,
        /// Dimension that was supplied.
        actual: usize,
    },
    /// Modulus is even; symmetric reduction and reconciliation need odd q.
    ModulusEven(u64),
    /// Modulus is not prime.
    ModulusNotPrime(u64),
    /// Modulus is 0 or 1.
    ModulusTooSmall(u64),
    /// Modulus does not satisfy q ≡ 1 (mod 2n).
    ModulusNotNttFriendly {
        /// Offending modulus.
        q: u64,
        /// Ring dimension it was paired with.
        ring_dim: usize,
    },
    /// Modulus exceeds the width supported by an operation.
    ModulusTooLarge {
        /// Offending modulus.
        q: u64,
        /// Number of bits the operation supports.
        max_bits: u32,
    },
    /// CBD width other than 2 or 3.
    UnsupportedEta(usize),
    /// Primitive-root search exhausted every candidate.
    NoPrimitiveRoot {
        /// Modulus searched.
        q: u64,
        /// Requested root order (2n).
        order: u64,
    },
    /// Operand was in the wrong representation.
    DomainMismatch {
        /// Representation the operation requires.
        expected: Domain,
        /// Representation it was given.
        found: Domain,
    },
    /// Byte input has the wrong length.
    InvalidLength {
        /// Expected byte count.
        expected: usize,
        /// Actual byte count received.
        actual: usize,
    },
    /// Decoded coefficient is not a canonical residue.
    CoefficientOutOfRange {
        /// Coefficient position.
        index: usize,
        /// Decoded value.
        value: u64,
        /// Modulus it must be below.
        q: u64,
    },
    /// Unused bits after the last hint are not zero.
    NonzeroHintPadding(u8),
    /// Peer identity is not ASCII or does not fit its fixed-width field.
    InvalidIdentity(String),
    /// Rejection sampling did not complete within the refill cap.
    SamplerExhausted {
        /// Refill rounds performed.
        rounds: usize,
        /// Coefficients accepted before giving up.
        accepted: usize,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DimensionNotPowerOfTwo(n) => {
                write!(f, "ring dimension {n} is not a power of two")
            }
            Self::DimensionTooSmall { minimum, actual } => {
                write!(f, "ring dimension {actual} is below the minimum of {minimum}")
            }
            Self::ModulusEven(q) => write!(f, "modulus {q} is even"),
            Self::ModulusNotPrime(q) => write!(f, "modulus {q} is not prime"),
            Self::ModulusTooSmall(q) => write!(f, "modulus {q} is below 2"),
            Self::ModulusNotNttFriendly { q, ring_dim } => {
                write!(f, "modulus {q} is not congruent to 1 mod 2*{ring_dim}")
            }
            Self::ModulusTooLarge { q, max_bits } => {
                write!(f, "modulus {q} does not fit in {max_bits} bits")
            }
            Self::UnsupportedEta(eta) => {
                write!(f, "unsupported CBD parameter eta = {eta} (expected 2 or 3)")
            }
            Self::NoPrimitiveRoot { q, order } => {
                write!(f, "no primitive {order}-th root of unity modulo {q}")
            }
            Self::DomainMismatch { expected, found } => {
                write!(f, "expected a polynomial in {expected} domain, found {found} domain")
            }
            Self::InvalidLength { expected, actual } => {
                write!(f, "invalid length: expected {expected}, got {actual}")
            }
            Self::CoefficientOutOfRange { index, value, q } => {
                write!(f, "coefficient {index} = {value} is not below q = {q}")
            }
            Self::NonzeroHintPadding(byte) => {
                write!(f, "hint padding bits are not zero in final byte {byte:#04x}")
            }
            Self::InvalidIdentity(reason) => write!(f, "invalid identity: {reason}"),
            Self::SamplerExhausted { rounds, accepted } => write!(
                f,
                "uniform sampler gave up after {rounds} refills with {accepted} coefficients"
            ),
        }
    }
}

impl std::error::Error for Error {}

/// Result type for ring and protocol operations.
pub type Result<T> = std::result::Result<T, Error>;
