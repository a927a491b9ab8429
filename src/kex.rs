//! Two-party RLWE key agreement.
//!
//! Both parties share a public element `a`, expanded from a seed the
//! initiator chooses. Each party holds a CBD secret `s` and publishes
//!
//! ```text
//! p = a * s + 2 * e
//! ```
//!
//! in NTT domain. On receiving the peer's share each side computes
//!
//! ```text
//! k = inverse(p_peer * s + 2 * e')
//! ```
//!
//! The two `k` differ by an even polynomial with small coefficients, so
//! reconciliation (responder publishes one hint per coefficient) turns
//! them into identical bit strings. The N agreed bits are packed and
//! hashed into a 32-byte [`SharedSecret`].
//!
//! # Example
//!
//! ```
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha20Rng;
//! use rlwe_kex::kex::{respond, Initiator, KexContext};
//! use rlwe_kex::params::RingParams;
//!
//! let ctx = KexContext::new(RingParams::new(256, 1_073_479_681, 3).unwrap()).unwrap();
//! let mut rng = ChaCha20Rng::seed_from_u64(1);
//!
//! let (initiator, hello) = Initiator::start(&ctx, &mut rng, "alice").unwrap();
//! let (reply, responder_secret) = respond(&ctx, &mut rng, &hello).unwrap();
//! let initiator_secret = initiator.finish(&ctx, &mut rng, &reply).unwrap();
//!
//! assert_eq!(initiator_secret, responder_secret);
//! ```

use std::fmt;
use std::sync::Arc;

use rand::{CryptoRng, RngCore};
use subtle::{Choice, ConstantTimeEq};
use tracing::{debug, info};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{Error, Result};
use crate::math::cbd::fresh_noise;
use crate::math::ntt::NttContext;
use crate::math::poly::{Domain, Poly};
use crate::math::uniform::{sample_uniform_ntt, CANDIDATE_BITS};
use crate::params::{RingParams, PUBLIC_SEED_BYTES};
use crate::reconcile::Reconciler;
use crate::symmetric::{hash, HASH_BYTES};
use crate::wire::{pack_bits, ClientHello, ServerReply, SALT_BYTES};

/// Per-parameter-set state shared by every session: the NTT tables, the
/// reconciler and the transform-domain constant 2.
#[derive(Debug, Clone)]
pub struct KexContext {
    params: RingParams,
    ntt: Arc<NttContext>,
    reconciler: Reconciler,
    two: Poly,
}

impl KexContext {
    /// Validate `params` and run the NTT precomputation.
    pub fn new(params: RingParams) -> Result<Self> {
        let ntt = Arc::new(NttContext::from_params(&params)?);
        Self::with_ntt(params, ntt)
    }

    /// Reuse an existing NTT context for the same `(N, Q)`.
    ///
    /// Fails with [`Error::ModulusTooLarge`] if q does not fit the uniform
    /// sampler's 30-bit candidates.
    ///
    /// # Panics
    ///
    /// Panics if `ntt` was built for a different dimension or modulus.
    pub fn with_ntt(params: RingParams, ntt: Arc<NttContext>) -> Result<Self> {
        params.validate()?;
        if params.q >= 1 << CANDIDATE_BITS {
            return Err(Error::ModulusTooLarge {
                q: params.q,
                max_bits: CANDIDATE_BITS,
            });
        }
        assert_eq!(ntt.dimension(), params.ring_dim, "NTT dimension must match params");
        assert_eq!(ntt.modulus(), params.q, "NTT modulus must match params");

        let reconciler = Reconciler::new(params.q)?;
        let two = ntt.constant_two();
        Ok(Self {
            params,
            ntt,
            reconciler,
            two,
        })
    }

    /// Parameter set this context was built for.
    pub fn params(&self) -> &RingParams {
        &self.params
    }

    /// Shared NTT tables.
    pub fn ntt(&self) -> &Arc<NttContext> {
        &self.ntt
    }

    /// Reconciler for this modulus.
    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    /// Expand the public seed into the shared element `a` (NTT domain).
    pub fn public_element(&self, seed: &[u8; PUBLIC_SEED_BYTES]) -> Result<Poly> {
        sample_uniform_ntt(seed, self.params.ring_dim, self.params.q)
    }

    /// Draw a secret and publish `a * s + 2 * e`.
    pub fn generate_keypair<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
        a: &Poly,
    ) -> Result<(SecretKey, Poly)> {
        let s = fresh_noise(rng, &self.params)?;
        let s_hat = self.ntt.forward(&s)?;
        let share = self.mask(rng, a, &s_hat)?;
        debug!(ring_dim = self.params.ring_dim, "generated key share");
        Ok((SecretKey { s_hat }, share))
    }

    /// `inverse(peer_share * s + 2 * e')` for a fresh error e'.
    pub fn shared_value<R: RngCore + CryptoRng>(
        &self,
        rng: &mut R,
        secret: &SecretKey,
        peer_share: &Poly,
    ) -> Result<Poly> {
        let k_hat = self.mask(rng, peer_share, &secret.s_hat)?;
        self.ntt.inverse(&k_hat)
    }

    /// `base * s_hat + 2 * forward(e)` with e drawn fresh.
    fn mask<R: RngCore + CryptoRng>(&self, rng: &mut R, base: &Poly, s_hat: &Poly) -> Result<Poly> {
        let mut e = fresh_noise(rng, &self.params)?;
        let e_hat = self.ntt.forward(&e)?;
        e.zeroize();

        let product = self.ntt.pointwise_mul(base, s_hat)?;
        let mut two_e = self.ntt.pointwise_mul(&self.two, &e_hat)?;
        let masked = self.ntt.add(&product, &two_e)?;
        two_e.zeroize();
        Ok(masked)
    }

    fn derive_secret(&self, bits: &[u8]) -> SharedSecret {
        let mut packed = pack_bits(bits);
        let secret = SharedSecret(hash(&packed));
        packed.zeroize();
        secret
    }
}

/// A party's secret `s`, kept in NTT domain.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SecretKey {
    s_hat: Poly,
}

impl SecretKey {
    /// Representation of the stored secret; always [`Domain::Ntt`].
    pub fn domain(&self) -> Domain {
        self.s_hat.domain()
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretKey([REDACTED])")
    }
}

/// 32-byte session key derived from the reconciled bits.
///
/// Equality is constant-time.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SharedSecret([u8; HASH_BYTES]);

impl SharedSecret {
    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; HASH_BYTES] {
        &self.0
    }
}

impl ConstantTimeEq for SharedSecret {
    fn ct_eq(&self, other: &Self) -> Choice {
        self.0[..].ct_eq(&other.0[..])
    }
}

impl PartialEq for SharedSecret {
    fn eq(&self, other: &Self) -> bool {
        self.ct_eq(other).into()
    }
}

impl Eq for SharedSecret {}

impl fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SharedSecret([REDACTED])")
    }
}

/// Initiator state between sending the hello and receiving the reply.
#[derive(Debug)]
pub struct Initiator {
    secret: SecretKey,
}

impl Initiator {
    /// Choose a public seed and salt, generate a key share and build the
    /// first message.
    pub fn start<R: RngCore + CryptoRng>(
        ctx: &KexContext,
        rng: &mut R,
        identity: &str,
    ) -> Result<(Self, ClientHello)> {
        let mut public_seed = [0u8; PUBLIC_SEED_BYTES];
        rng.fill_bytes(&mut public_seed);
        let mut salt = [0u8; SALT_BYTES];
        rng.fill_bytes(&mut salt);

        let a = ctx.public_element(&public_seed)?;
        let (secret, share) = ctx.generate_keypair(rng, &a)?;
        let hello = ClientHello::new(public_seed, identity, salt, share)?;

        info!(identity, "initiator sent hello");
        Ok((Self { secret }, hello))
    }

    /// Reconcile against the responder's hints and derive the session key.
    pub fn finish<R: RngCore + CryptoRng>(
        self,
        ctx: &KexContext,
        rng: &mut R,
        reply: &ServerReply,
    ) -> Result<SharedSecret> {
        let mut k = ctx.shared_value(rng, &self.secret, reply.key_share())?;
        let mut bits = ctx.reconciler.extract_poly(&k, reply.hints())?;
        k.zeroize();

        let secret = ctx.derive_secret(&bits);
        bits.zeroize();
        info!("initiator derived shared secret");
        Ok(secret)
    }
}

/// Answer a hello: generate a key share over the initiator's public
/// element, publish reconciliation hints and derive the session key.
pub fn respond<R: RngCore + CryptoRng>(
    ctx: &KexContext,
    rng: &mut R,
    hello: &ClientHello,
) -> Result<(ServerReply, SharedSecret)> {
    let a = ctx.public_element(hello.public_seed())?;
    let (secret, share) = ctx.generate_keypair(rng, &a)?;

    let mut k = ctx.shared_value(rng, &secret, hello.key_share())?;
    let hints = ctx.reconciler.signal_poly(rng, &k);
    let mut bits = ctx.reconciler.extract_poly(&k, &hints)?;
    k.zeroize();

    let shared = ctx.derive_secret(&bits);
    bits.zeroize();

    info!(identity = hello.identity(), "responder derived shared secret");
    Ok((ServerReply::new(share, hints)?, shared))
}
