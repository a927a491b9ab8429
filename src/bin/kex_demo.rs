//! kex-demo: run both sides of the key exchange in one process.
//!
//! Messages go through their byte encoding between the two parties, so
//! the demo exercises the wire format as well as the ring arithmetic.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use eyre::{Context, Result};
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use subtle::ConstantTimeEq;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use rlwe_kex::kex::{respond, Initiator, KexContext};
use rlwe_kex::params::RingParams;
use rlwe_kex::symmetric::hash;
use rlwe_kex::wire::{ClientHello, ServerReply};

#[derive(Parser)]
#[command(name = "kex-demo")]
#[command(about = "Run an in-process RLWE key exchange")]
#[command(version)]
struct Args {
    /// JSON parameter file ({"ring_dim": .., "q": .., "eta": ..});
    /// overrides the individual flags
    #[arg(long)]
    params: Option<PathBuf>,

    /// Ring dimension (power of two)
    #[arg(long, default_value = "1024")]
    ring_dim: usize,

    /// Coefficient modulus (prime, q ≡ 1 mod 2N, below 2^30)
    #[arg(long, default_value = "1073479681")]
    q: u64,

    /// Centered-binomial parameter (2 or 3)
    #[arg(long, default_value = "3")]
    eta: usize,

    /// Initiator identity (ASCII, at most 11 bytes)
    #[arg(long, default_value = "alice")]
    identity: String,

    /// Seed for a deterministic ChaCha20 RNG (default: OS randomness)
    #[arg(long)]
    seed: Option<u64>,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let params = match &args.params {
        Some(path) => {
            let json = fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            RingParams::from_json(&json)?
        }
        None => RingParams::new(args.ring_dim, args.q, args.eta)
            .map_err(|e| eyre::eyre!("Invalid parameters: {}", e))?,
    };

    info!(
        "Parameters: N = {}, Q = {}, ETA = {}",
        params.ring_dim, params.q, params.eta
    );

    let setup_start = Instant::now();
    let ctx = KexContext::new(params).wrap_err("Failed to build key-exchange context")?;
    info!("Precomputation: {:.2?}", setup_start.elapsed());

    match args.seed {
        Some(seed) => run(&ctx, &mut ChaCha20Rng::seed_from_u64(seed), &args.identity),
        None => run(&ctx, &mut OsRng, &args.identity),
    }
}

fn run<R: RngCore + CryptoRng>(ctx: &KexContext, rng: &mut R, identity: &str) -> Result<()> {
    let params = ctx.params();
    let exchange_start = Instant::now();

    let (initiator, hello) =
        Initiator::start(ctx, rng, identity).wrap_err("Initiator failed to start")?;
    let hello_bytes = hello.to_bytes();

    let received_hello = ClientHello::from_bytes(&hello_bytes, params)
        .wrap_err("Responder could not parse hello")?;
    let (reply, responder_secret) =
        respond(ctx, rng, &received_hello).wrap_err("Responder failed")?;
    let reply_bytes = reply.to_bytes();

    let received_reply = ServerReply::from_bytes(&reply_bytes, params)
        .wrap_err("Initiator could not parse reply")?;
    let initiator_secret = initiator
        .finish(ctx, rng, &received_reply)
        .wrap_err("Initiator failed to finish")?;

    info!("Exchange: {:.2?}", exchange_start.elapsed());

    let agreed = bool::from(initiator_secret.ct_eq(&responder_secret));
    let fingerprint = hash(initiator_secret.as_bytes());

    println!();
    println!("=== Key Exchange ===");
    println!("Identity:        {}", received_hello.identity());
    println!("Hello size:      {} bytes", hello_bytes.len());
    println!("Reply size:      {} bytes", reply_bytes.len());
    println!("Secrets agree:   {}", agreed);
    println!("Key fingerprint: {}", hex::encode(&fingerprint[..8]));

    if !agreed {
        return Err(eyre::eyre!("Shared secrets differ"));
    }
    Ok(())
}
