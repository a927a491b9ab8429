//! Polynomials over R_q = Z_q[X]/(X^N + 1).
//!
//! A [`Poly`] carries its modulus and an explicit [`Domain`] tag recording
//! whether the stored values are coefficients or NTT evaluations. Operations
//! that only make sense in one representation check the tag, so mixing the
//! two is reported instead of silently producing garbage.
//!
//! # Wire format
//!
//! [`Poly::to_bytes`] writes N big-endian integers of
//! [`coeff_bytes_for(q)`](crate::params::coeff_bytes_for) bytes each,
//! coefficient 0 first, with no separators or length prefix.
//!
//! # Example
//!
//! ```
//! use rlwe_kex::math::Poly;
//!
//! let q = 1_073_479_681;
//! let mut p = Poly::zero(1024, q);
//! p.set_coeff(0, q - 1);
//! let bytes = p.to_bytes();
//! assert_eq!(bytes.len(), 1024 * 4);
//! assert_eq!(&bytes[..4], &(q - 1).to_be_bytes()[4..]);
//! ```

use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use super::modular::ModQ;
use crate::error::{Error, Result};
use crate::params::coeff_bytes_for;

/// Representation a polynomial's values are stored in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Domain {
    /// Ordinary coefficients, constant term first.
    #[default]
    Coefficient,
    /// Evaluations produced by the forward NTT.
    Ntt,
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Domain::Coefficient => f.write_str("coefficient"),
            Domain::Ntt => f.write_str("NTT"),
        }
    }
}

/// Polynomial in R_q = Z_q[X]/(X^N + 1).
///
/// # Fields
///
/// * `coeffs` - N values, each a canonical residue in [0, q)
/// * `q` - Modulus q
/// * `domain` - Whether `coeffs` are coefficients or NTT evaluations
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawPoly")]
pub struct Poly {
    coeffs: Vec<u64>,
    q: u64,
    domain: Domain,
}

/// Unchecked serde form of [`Poly`].
#[derive(Deserialize)]
struct RawPoly {
    coeffs: Vec<u64>,
    q: u64,
    domain: Domain,
}

impl TryFrom<RawPoly> for Poly {
    type Error = Error;

    fn try_from(raw: RawPoly) -> Result<Self> {
        check_modulus(raw.q)?;
        if let Some((index, &value)) = raw.coeffs.iter().enumerate().find(|(_, &v)| v >= raw.q) {
            return Err(Error::CoefficientOutOfRange {
                index,
                value,
                q: raw.q,
            });
        }
        Ok(Self {
            coeffs: raw.coeffs,
            q: raw.q,
            domain: raw.domain,
        })
    }
}

fn check_modulus(q: u64) -> Result<()> {
    if q < 2 {
        return Err(Error::ModulusTooSmall(q));
    }
    Ok(())
}

impl Poly {
    /// Create zero polynomial with given dimension and modulus
    pub fn zero(dim: usize, q: u64) -> Self {
        Self {
            coeffs: vec![0; dim],
            q,
            domain: Domain::Coefficient,
        }
    }

    /// Create polynomial from coefficient vector, reducing each entry mod q
    pub fn from_coeffs(coeffs: Vec<u64>, q: u64) -> Self {
        Self::from_values(coeffs, q, Domain::Coefficient)
    }

    /// Create polynomial from values already known to be in `domain`
    pub fn from_values(mut values: Vec<u64>, q: u64, domain: Domain) -> Self {
        for v in &mut values {
            *v = ModQ::reduce(*v, q);
        }
        Self {
            coeffs: values,
            q,
            domain,
        }
    }

    /// Create polynomial from signed coefficients
    pub fn from_signed(values: &[i64], q: u64) -> Self {
        Self {
            coeffs: values.iter().map(|&v| ModQ::from_signed(v, q)).collect(),
            q,
            domain: Domain::Coefficient,
        }
    }

    /// Create the constant polynomial `value`
    pub fn constant(value: u64, dim: usize, q: u64) -> Self {
        let mut p = Self::zero(dim, q);
        p.coeffs[0] = value % q;
        p
    }

    /// Get polynomial dimension
    pub fn dimension(&self) -> usize {
        self.coeffs.len()
    }

    /// Get polynomial length (alias for dimension)
    pub fn len(&self) -> usize {
        self.coeffs.len()
    }

    /// Check if polynomial has zero length
    pub fn is_empty(&self) -> bool {
        self.coeffs.is_empty()
    }

    /// Get modulus
    pub fn modulus(&self) -> u64 {
        self.q
    }

    /// Representation the values are stored in
    pub fn domain(&self) -> Domain {
        self.domain
    }

    /// Check if in NTT domain
    pub fn is_ntt(&self) -> bool {
        self.domain == Domain::Ntt
    }

    /// Fail with [`Error::DomainMismatch`] unless stored in `expected`
    pub fn expect_domain(&self, expected: Domain) -> Result<()> {
        if self.domain == expected {
            Ok(())
        } else {
            Err(Error::DomainMismatch {
                expected,
                found: self.domain,
            })
        }
    }

    /// Get value at index.
    ///
    /// # Panics
    ///
    /// Panics if `i >= N`.
    pub fn coeff(&self, i: usize) -> u64 {
        self.coeffs[i]
    }

    /// Set value at index, reducing mod q.
    ///
    /// # Panics
    ///
    /// Panics if `i >= N`.
    pub fn set_coeff(&mut self, i: usize, value: u64) {
        self.coeffs[i] = value % self.q;
    }

    /// Get reference to coefficient/NTT vector
    pub fn coeffs(&self) -> &[u64] {
        &self.coeffs
    }

    pub(crate) fn coeffs_mut(&mut self) -> &mut [u64] {
        &mut self.coeffs
    }

    pub(crate) fn set_domain(&mut self, domain: Domain) {
        self.domain = domain;
    }

    /// Check if polynomial is zero
    pub fn is_zero(&self) -> bool {
        self.coeffs.iter().all(|&c| c == 0)
    }

    /// L-infinity norm in centered representation
    pub fn linf_norm(&self) -> u64 {
        assert!(!self.is_ntt(), "Cannot compute norm in NTT domain");
        self.coeffs
            .iter()
            .map(|&c| if c <= self.q / 2 { c } else { self.q - c })
            .max()
            .unwrap_or(0)
    }

    /// Bytes per serialized value for this modulus
    pub fn coeff_bytes(&self) -> usize {
        coeff_bytes_for(self.q)
    }

    /// Serialize every value big-endian, fixed width, index 0 first
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![0u8; self.dimension() * self.coeff_bytes()];
        self.write_bytes(&mut out);
        out
    }

    /// Serialize into a caller-provided buffer of exactly
    /// `N * coeff_bytes` bytes.
    ///
    /// # Panics
    ///
    /// Panics if `out` has the wrong length.
    pub fn write_bytes(&self, out: &mut [u8]) {
        let width = self.coeff_bytes();
        assert_eq!(
            out.len(),
            self.dimension() * width,
            "Output buffer must hold N * coeff_bytes bytes"
        );
        for (chunk, &c) in out.chunks_exact_mut(width).zip(self.coeffs.iter()) {
            chunk.copy_from_slice(&c.to_be_bytes()[8 - width..]);
        }
    }

    /// Parse the output of [`Poly::to_bytes`].
    ///
    /// Rejects inputs of the wrong length and values that are not
    /// canonical residues.
    pub fn from_bytes(bytes: &[u8], dim: usize, q: u64, domain: Domain) -> Result<Self> {
        check_modulus(q)?;
        let width = coeff_bytes_for(q);
        let expected = dim * width;
        if bytes.len() != expected {
            return Err(Error::InvalidLength {
                expected,
                actual: bytes.len(),
            });
        }

        let mut coeffs = Vec::with_capacity(dim);
        for (index, chunk) in bytes.chunks_exact(width).enumerate() {
            let mut buf = [0u8; 8];
            buf[8 - width..].copy_from_slice(chunk);
            let value = u64::from_be_bytes(buf);
            if value >= q {
                return Err(Error::CoefficientOutOfRange { index, value, q });
            }
            coeffs.push(value);
        }

        Ok(Self { coeffs, q, domain })
    }

    /// Negacyclic product by direct O(N^2) convolution.
    ///
    /// Reference oracle for the NTT path; both operands must be in
    /// coefficient domain.
    pub fn mul_schoolbook(&self, other: &Self) -> Self {
        assert_eq!(self.q, other.q, "Moduli must match");
        assert_eq!(self.dimension(), other.dimension(), "Dimensions must match");
        assert!(
            !self.is_ntt() && !other.is_ntt(),
            "Schoolbook multiplication needs coefficient domain"
        );

        let n = self.dimension();
        let q = self.q;
        let mut result = vec![0u64; n];
        for (i, &a) in self.coeffs.iter().enumerate() {
            if a == 0 {
                continue;
            }
            for (j, &b) in other.coeffs.iter().enumerate() {
                let prod = ModQ::mul(a, b, q);
                let k = i + j;
                if k < n {
                    result[k] = ModQ::add(result[k], prod, q);
                } else {
                    // X^N = -1
                    result[k - n] = ModQ::sub(result[k - n], prod, q);
                }
            }
        }

        Self {
            coeffs: result,
            q,
            domain: Domain::Coefficient,
        }
    }
}

impl Zeroize for Poly {
    fn zeroize(&mut self) {
        self.coeffs.zeroize();
    }
}

impl Add for Poly {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        &self + &rhs
    }
}

impl Add for &Poly {
    type Output = Poly;

    fn add(self, rhs: Self) -> Self::Output {
        assert_eq!(self.q, rhs.q, "Moduli must match");
        assert_eq!(self.dimension(), rhs.dimension(), "Dimensions must match");
        assert_eq!(self.domain, rhs.domain, "Domains must match");

        let coeffs: Vec<u64> = self
            .coeffs
            .iter()
            .zip(rhs.coeffs.iter())
            .map(|(&a, &b)| {
                let sum = a + b;
                if sum >= self.q {
                    sum - self.q
                } else {
                    sum
                }
            })
            .collect();

        Poly {
            coeffs,
            q: self.q,
            domain: self.domain,
        }
    }
}

impl AddAssign<&Poly> for Poly {
    fn add_assign(&mut self, rhs: &Self) {
        *self = &*self + rhs;
    }
}

impl Sub for Poly {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        &self - &rhs
    }
}

impl Sub for &Poly {
    type Output = Poly;

    fn sub(self, rhs: Self) -> Self::Output {
        self + &(-rhs)
    }
}

impl SubAssign<&Poly> for Poly {
    fn sub_assign(&mut self, rhs: &Self) {
        *self = &*self - rhs;
    }
}

impl Neg for Poly {
    type Output = Self;

    fn neg(self) -> Self::Output {
        -&self
    }
}

impl Neg for &Poly {
    type Output = Poly;

    fn neg(self) -> Self::Output {
        let coeffs: Vec<u64> = self
            .coeffs
            .iter()
            .map(|&c| ModQ::negate(c, self.q))
            .collect();

        Poly {
            coeffs,
            q: self.q,
            domain: self.domain,
        }
    }
}
