//! Mathematical primitives for the key exchange.
//!
//! - **Modular arithmetic** over Z_q, including the symmetric representative
//! - **Polynomials** over R_q = Z_q[X]/(X^N + 1) with an explicit domain tag
//! - **Number-Theoretic Transform (NTT)** for fast negacyclic multiplication
//! - **Uniform sampling** by rejection over a SHAKE-128 stream
//! - **Centered binomial sampling** for secrets and errors
//!
//! # Example
//!
//! ```
//! use rlwe_kex::math::{NttContext, Poly};
//!
//! let ctx = NttContext::new(16, 97).unwrap();
//! let mut x = Poly::zero(16, 97);
//! x.set_coeff(1, 1);
//!
//! // x * x = x^2
//! let x2 = ctx.multiply(&x, &x).unwrap();
//! assert_eq!(x2.coeff(2), 1);
//! ```

pub mod cbd;
pub mod modular;
pub mod ntt;
pub mod poly;
pub mod uniform;

pub use cbd::{fresh_noise, noise_from_seed, sample_cbd};
pub use modular::{ModQ, SymmetricModulus};
pub use ntt::NttContext;
pub use poly::{Domain, Poly};
pub use uniform::sample_uniform_ntt;
