//! Ring-LWE key exchange core.
//!
//! Arithmetic over R_q = Z_q[X]/(X^N + 1) with an NTT engine, deterministic
//! noise sampling from SHA-3 family primitives, and the reconciliation step
//! that turns two close ring elements into one shared bit string.
//!
//! Key components:
//! - [`math`]: modular arithmetic, polynomials, NTT, uniform and CBD samplers
//! - [`reconcile`]: hint, signal and robust extractor
//! - [`kex`]: two-party key agreement built on the above
//! - [`wire`]: fixed-layout protocol messages

pub mod error;
pub mod kex;
pub mod math;
pub mod params;
pub mod reconcile;
pub mod symmetric;
pub mod wire;

pub use error::{Error, Result};
pub use kex::{respond, Initiator, KexContext, SharedSecret};
pub use params::RingParams;
pub use reconcile::Reconciler;
pub use wire::{ClientHello, ServerReply};
