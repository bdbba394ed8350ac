//! Cryptographic primitives for Guardian.
//!
//! This module provides:
//! - Self-wiping buffers for key material (`secure`)
//! - Argon2id key stretching and its cost parameters (`kdf`)
//! - The persisted ciphertext record (`envelope`)
//! - AES-256-CBC + HMAC-SHA3-512 encrypt/decrypt (`aead`)
//! - Keyfile second factor (`keyfile`)
//! - Random printable passwords (`password`)

pub mod aead;
pub mod envelope;
pub mod kdf;
pub mod keyfile;
pub mod password;
pub mod secure;

use rand::RngCore;

// Re-export the most commonly used items so callers can write:
//   use crate::crypto::{encrypt, decrypt, CostParams, ...};
pub use aead::{decrypt, encrypt};
pub use envelope::Envelope;
pub use kdf::{derive, CostParams};
pub use secure::{MasterKey, SecretBuffer};

/// Fill `buf` from the thread-local CSPRNG (ChaCha seeded from the OS).
pub(crate) fn fill_random(buf: &mut [u8]) {
    rand::rng().fill_bytes(buf);
}

/// `len` fresh random bytes.
pub(crate) fn random_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    fill_random(&mut bytes);
    bytes
}
