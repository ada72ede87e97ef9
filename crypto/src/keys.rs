//! Ed25519 key generation and node key files.

use std::path::Path;

use ed25519_dalek::SigningKey;
use fedchain_types::{KeyPair, PrivateKey, PublicKey};
use rand::rngs::OsRng;

use crate::CryptoError;

/// Generate a new Ed25519 key pair from a secure random source.
pub fn generate_keypair() -> KeyPair {
    let signing_key = SigningKey::generate(&mut OsRng);
    KeyPair {
        public: PublicKey(signing_key.verifying_key().to_bytes()),
        private: PrivateKey(signing_key.to_bytes()),
    }
}

/// Derive the public key from a private key.
pub fn public_from_private(private: &PrivateKey) -> PublicKey {
    PublicKey(SigningKey::from_bytes(&private.0).verifying_key().to_bytes())
}

/// Reconstruct a full key pair from a private key.
pub fn keypair_from_private(private: PrivateKey) -> KeyPair {
    let public = public_from_private(&private);
    KeyPair { public, private }
}

/// Derive a key pair from a 32-byte seed (deterministic). Used for fixtures
/// and for node identities restored from a key file.
pub fn keypair_from_seed(seed: &[u8; 32]) -> KeyPair {
    keypair_from_private(PrivateKey(*seed))
}

/// Write the private seed of `keypair` to `path` as a hex line.
pub fn save_keypair(keypair: &KeyPair, path: &Path) -> Result<(), CryptoError> {
    std::fs::write(path, format!("{}\n", hex::encode(keypair.private.0)))?;
    Ok(())
}

/// Load a key pair previously written by [`save_keypair`].
pub fn load_keypair(path: &Path) -> Result<KeyPair, CryptoError> {
    let content = std::fs::read_to_string(path)?;
    let mut seed = [0u8; 32];
    hex::decode_to_slice(content.trim(), &mut seed).map_err(|e| {
        CryptoError::KeyFile(format!("{}: {}", path.display(), e))
    })?;
    Ok(keypair_from_seed(&seed))
}
