//! Number-Theoretic Transform (NTT) for fast polynomial multiplication.
//!
//! Negacyclic transform over R_q = Z_q[X]/(X^n + 1) built from a binary
//! factorization tree: layer L splits every degree-(n/2^L) factor of
//! X^n + 1 into a "plus" and a "minus" half, and each split contributes
//! one twiddle factor. After log2(n) layers the polynomial has been
//! evaluated at n points and ring multiplication becomes pointwise.
//!
//! # Requirements
//!
//! The modulus q must be an odd prime with q ≡ 1 (mod 2n) so that a
//! primitive 2n-th root of unity exists.
//!
//! # Example
//!
//! ```
//! use rlwe_kex::math::{NttContext, Poly};
//!
//! let ctx = NttContext::new(256, 7681).unwrap();
//! let p = Poly::from_coeffs((0..256).collect(), 7681);
//!
//! let p_hat = ctx.forward(&p).unwrap();
//! assert!(p_hat.is_ntt());
//! assert_eq!(ctx.inverse(&p_hat).unwrap(), p);
//! ```

use tracing::{debug, info};

use super::modular::{prime_factors, ModQ};
use super::poly::{Domain, Poly};
use crate::error::{Error, Result};
use crate::params::{validate_modulus, RingParams};

/// One node of the factorization tree.
///
/// Plus and minus siblings share their twiddle magnitude, so only plus
/// nodes produce table entries.
#[derive(Clone, Copy, Debug)]
struct TreeNode {
    plus: bool,
    power: u64,
    index: u64,
}

/// Precomputed NTT context with twiddle factors.
///
/// Create once per `(n, q)` and share read-only (for example behind an
/// `Arc`) across every polynomial operation and session using that pair.
///
/// # Fields
///
/// * `n` - Ring dimension (power of two, at least 2)
/// * `q` - Modulus (odd prime, q ≡ 1 mod 2n)
/// * `zetas` - Forward twiddles in tree order (n - 1 entries)
/// * `zetas_inv` - Inverses of `zetas`, same order
/// * `n_inv` - 2^(-log2 n) mod q for inverse scaling
#[derive(Clone, Debug)]
pub struct NttContext {
    n: usize,
    q: u64,
    log_n: u32,
    root: u64,
    zetas: Vec<u64>,
    zetas_inv: Vec<u64>,
    n_inv: u64,
}

impl NttContext {
    /// Creates an NTT context for the given dimension and modulus.
    ///
    /// Runs the one-time precomputation: factorization of q - 1,
    /// primitive-root search and twiddle derivation.
    pub fn new(n: usize, q: u64) -> Result<Self> {
        if !n.is_power_of_two() {
            return Err(Error::DimensionNotPowerOfTwo(n));
        }
        if n < 2 {
            return Err(Error::DimensionTooSmall {
                minimum: 2,
                actual: n,
            });
        }
        validate_modulus(q, n)?;

        let tree = build_tree(n);
        let root = find_primitive_root(q, 2 * n as u64)?;

        let mut zetas = Vec::with_capacity(n - 1);
        let mut zetas_inv = Vec::with_capacity(n - 1);
        for node in tree.iter().flatten().filter(|node| node.plus) {
            let base = ModQ::pow(root, 2 * n as u64 / node.index, q);
            let zeta = ModQ::pow(base, node.power, q);
            zetas.push(zeta);
            zetas_inv.push(ModQ::inverse(zeta, q));
        }

        let log_n = n.trailing_zeros();
        let n_inv = ModQ::inverse(ModQ::pow(2, log_n as u64, q), q);

        info!(
            n,
            q,
            root,
            layers = tree.len(),
            twiddles = zetas.len(),
            "NTT context ready"
        );

        Ok(Self {
            n,
            q,
            log_n,
            root,
            zetas,
            zetas_inv,
            n_inv,
        })
    }

    /// Creates an NTT context for a validated parameter set.
    pub fn from_params(params: &RingParams) -> Result<Self> {
        params.validate()?;
        Self::new(params.ring_dim, params.q)
    }

    /// Ring dimension n.
    pub fn dimension(&self) -> usize {
        self.n
    }

    /// Modulus q.
    pub fn modulus(&self) -> u64 {
        self.q
    }

    /// The primitive 2n-th root of unity the twiddles are derived from.
    pub fn root(&self) -> u64 {
        self.root
    }

    /// Forward twiddle table in the order the transform consumes it.
    pub fn zetas(&self) -> &[u64] {
        &self.zetas
    }

    /// Inverse twiddle table, entry-wise inverse of [`zetas`](Self::zetas).
    pub fn zetas_inv(&self) -> &[u64] {
        &self.zetas_inv
    }

    /// Coefficient-domain polynomial to NTT domain.
    pub fn forward(&self, p: &Poly) -> Result<Poly> {
        self.check_shape(p);
        p.expect_domain(Domain::Coefficient)?;

        let mut out = p.clone();
        self.forward_in_place(out.coeffs_mut());
        out.set_domain(Domain::Ntt);
        Ok(out)
    }

    /// NTT-domain polynomial back to coefficients.
    pub fn inverse(&self, p: &Poly) -> Result<Poly> {
        self.check_shape(p);
        p.expect_domain(Domain::Ntt)?;

        let mut out = p.clone();
        self.inverse_in_place(out.coeffs_mut());
        out.set_domain(Domain::Coefficient);
        Ok(out)
    }

    /// Coefficient-wise sum; both operands must share a domain.
    pub fn add(&self, a: &Poly, b: &Poly) -> Result<Poly> {
        self.check_pair(a, b)?;
        Ok(a + b)
    }

    /// Coefficient-wise difference; both operands must share a domain.
    pub fn sub(&self, a: &Poly, b: &Poly) -> Result<Poly> {
        self.check_pair(a, b)?;
        Ok(a + &self.negate(b))
    }

    /// Coefficient-wise negation in either domain.
    pub fn negate(&self, a: &Poly) -> Poly {
        self.check_shape(a);
        -a
    }

    /// Ring product of two NTT-domain polynomials.
    pub fn pointwise_mul(&self, a: &Poly, b: &Poly) -> Result<Poly> {
        self.check_shape(a);
        self.check_shape(b);
        a.expect_domain(Domain::Ntt)?;
        b.expect_domain(Domain::Ntt)?;

        let values = a
            .coeffs()
            .iter()
            .zip(b.coeffs())
            .map(|(&x, &y)| ModQ::mul(x, y, self.q))
            .collect();
        Ok(Poly::from_values(values, self.q, Domain::Ntt))
    }

    /// NTT-domain image of the constant polynomial 2 (every entry is 2).
    pub fn constant_two(&self) -> Poly {
        Poly::from_values(vec![2 % self.q; self.n], self.q, Domain::Ntt)
    }

    /// Negacyclic product of two coefficient-domain polynomials via the
    /// transform.
    pub fn multiply(&self, a: &Poly, b: &Poly) -> Result<Poly> {
        let a_hat = self.forward(a)?;
        let b_hat = self.forward(b)?;
        self.inverse(&self.pointwise_mul(&a_hat, &b_hat)?)
    }

    fn forward_in_place(&self, a: &mut [u64]) {
        let q = self.q;
        let mut k = 0;
        for layer in 0..self.log_n {
            let len = self.n >> layer;
            let half = len / 2;
            for block in a.chunks_exact_mut(len) {
                let zeta = self.zetas[k];
                k += 1;
                let (lo, hi) = block.split_at_mut(half);
                for (x, y) in lo.iter_mut().zip(hi.iter_mut()) {
                    let t = ModQ::mul(zeta, *y, q);
                    let u = *x;
                    *x = ModQ::sub(u, t, q);
                    *y = ModQ::add(u, t, q);
                }
            }
        }
    }

    fn inverse_in_place(&self, a: &mut [u64]) {
        let q = self.q;
        for layer in (0..self.log_n).rev() {
            let len = self.n >> layer;
            let half = len / 2;
            let offset = (1usize << layer) - 1;
            for (s, block) in a.chunks_exact_mut(len).enumerate() {
                let zeta_inv = self.zetas_inv[offset + s];
                let (lo, hi) = block.split_at_mut(half);
                for (x, y) in lo.iter_mut().zip(hi.iter_mut()) {
                    let u = *x;
                    let v = *y;
                    *x = ModQ::add(u, v, q);
                    *y = ModQ::negate(ModQ::mul(zeta_inv, ModQ::sub(u, v, q), q), q);
                }
            }
        }

        for c in a.iter_mut() {
            *c = ModQ::mul(*c, self.n_inv, q);
        }
    }

    fn check_shape(&self, p: &Poly) {
        assert_eq!(p.dimension(), self.n, "Polynomial dimension must match NTT context");
        assert_eq!(p.modulus(), self.q, "Polynomial modulus must match NTT context");
    }

    fn check_pair(&self, a: &Poly, b: &Poly) -> Result<()> {
        self.check_shape(a);
        self.check_shape(b);
        b.expect_domain(a.domain())
    }
}

/// Layers of the factorization tree, consumed once during construction.
///
/// Layer 0 is the split of X^n + 1 at index 4. Each further layer doubles
/// the index; a plus parent shifts its children's power by index / 2.
fn build_tree(n: usize) -> Vec<Vec<TreeNode>> {
    let mut layers = vec![vec![
        TreeNode {
            plus: true,
            power: 1,
            index: 4,
        },
        TreeNode {
            plus: false,
            power: 1,
            index: 4,
        },
    ]];

    let mut degree = n / 2;
    while degree > 1 {
        let Some(parent_layer) = layers.last() else {
            break;
        };
        let next: Vec<TreeNode> = parent_layer
            .iter()
            .flat_map(|parent| {
                let power = parent.power + if parent.plus { parent.index / 2 } else { 0 };
                let index = parent.index * 2;
                [
                    TreeNode {
                        plus: true,
                        power,
                        index,
                    },
                    TreeNode {
                        plus: false,
                        power,
                        index,
                    },
                ]
            })
            .collect();
        layers.push(next);
        degree /= 2;
    }

    debug!(layers = layers.len(), "built NTT factorization tree");
    layers
}

/// Smallest generator g of Z_q^*, raised to (q - 1) / order.
fn find_primitive_root(q: u64, order: u64) -> Result<u64> {
    let factors = prime_factors(q - 1);
    debug!(q, ?factors, "factored q - 1");

    let generator = (2..q).find(|&g| {
        ModQ::pow(g, q - 1, q) == 1
            && factors.iter().all(|&p| ModQ::pow(g, (q - 1) / p, q) != 1)
    });

    match generator {
        Some(g) => {
            debug!(q, generator = g, "found generator of Z_q^*");
            Ok(ModQ::pow(g, (q - 1) / order, q))
        }
        None => Err(Error::NoPrimitiveRoot { q, order }),
    }
}
