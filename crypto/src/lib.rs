//! Cryptographic primitives for fedchain.
//!
//! - **Ed25519** for transaction fulfillments, block and vote signatures
//! - **Blake2b-256** over canonical JSON for content-addressed ids
//!
//! The primitives are used, not designed, here: everything delegates to
//! `ed25519-dalek` and `blake2`.

pub mod error;
pub mod hash;
pub mod keys;
pub mod sign;

pub use error::CryptoError;
pub use hash::{blake2b_256, blake2b_256_multi, content_hash};
pub use keys::{
    generate_keypair, keypair_from_private, keypair_from_seed, load_keypair, public_from_private,
    save_keypair,
};
pub use sign::{sign_message, verify_signature};
