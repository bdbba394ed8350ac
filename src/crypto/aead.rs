//! Encrypt-then-MAC job: master key + plaintext -> tamper-evident envelope.
//!
//! Encryption:
//!
//! 1. Fresh random IV, key salt and MAC salt.
//! 2. `enc_key = Argon2id(master_key, key_salt)` (32 bytes).
//! 3. Pad the plaintext to the next multiple of 256 bytes that is
//!    strictly larger than it, filling the gap with random bytes and
//!    storing the pad length in the final byte.
//! 4. AES-256-CBC over the padded buffer (no block padding needed).
//! 5. `mac_key = Argon2id(enc_key, mac_salt)` (256 bytes).
//! 6. `mac = HMAC-SHA3-512(mac_key, iv || cipher)`.
//!
//! Decryption re-derives both keys, verifies the MAC in constant time
//! and only then decrypts.  Every failure is `AuthenticationFailed`.

use aes::Aes256;
use cbc::cipher::block_padding::NoPadding;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use hmac::{Hmac, Mac};
use sha3::Sha3_512;
use subtle::ConstantTimeEq;

use super::envelope::{Envelope, CHUNK_LEN, CURRENT_VERSION, IV_LEN};
use super::kdf::{derive, CostParams, MIN_SALT_LEN};
use super::secure::SecretBuffer;
use super::{fill_random, random_bytes};
use crate::errors::{GuardianError, Result};

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;
type HmacSha3_512 = Hmac<Sha3_512>;

/// AES-256 key length.
pub const ENC_KEY_LEN: usize = 32;

/// Length of the key fed to HMAC-SHA3-512.
pub const MAC_KEY_LEN: usize = 256;

/// Smallest multiple of 256 strictly greater than `plaintext_len`.
pub fn padded_len(plaintext_len: usize) -> usize {
    CHUNK_LEN * (1 + plaintext_len / CHUNK_LEN)
}

/// Encrypt `plaintext` under `master_key`.
///
/// Fails only on invalid configuration (zero cost, salt shorter than
/// Argon2 accepts); every byte string is encryptable.
pub fn encrypt(
    master_key: &[u8],
    plaintext: &[u8],
    cost: &CostParams,
    salt_size: usize,
) -> Result<Envelope> {
    cost.validate()?;
    if salt_size < MIN_SALT_LEN {
        return Err(GuardianError::InvalidConfiguration(format!(
            "salt size must be at least {MIN_SALT_LEN} bytes (got {salt_size})"
        )));
    }

    let iv = random_bytes(IV_LEN);
    let key_salt = random_bytes(salt_size);
    let mac_salt = random_bytes(salt_size);

    let enc_key = derive(master_key, &key_salt, cost, ENC_KEY_LEN)?;
    let padded = pad(plaintext);

    let mut cipher = vec![0u8; padded.len()];
    Aes256CbcEnc::new_from_slices(enc_key.as_bytes(), &iv)
        .map_err(|e| GuardianError::EncryptionFailed(format!("invalid key length: {e}")))?
        .encrypt_padded_b2b_mut::<NoPadding>(padded.as_bytes(), &mut cipher)
        .map_err(|_| GuardianError::EncryptionFailed("block encryption failed".into()))?;

    let mac_key = derive(enc_key.as_bytes(), &mac_salt, cost, MAC_KEY_LEN)?;
    let mac = compute_mac(mac_key.as_bytes(), &iv, &cipher)?;

    Ok(Envelope {
        version: CURRENT_VERSION,
        cost: *cost,
        iv,
        key_salt,
        mac_salt,
        cipher,
        mac,
    })
}

/// Verify and decrypt `envelope` with `master_key`.
///
/// Wrong key, tampering, truncation and malformed cost parameters all
/// surface as the same `AuthenticationFailed`.
pub fn decrypt(master_key: &[u8], envelope: &Envelope) -> Result<SecretBuffer> {
    envelope.check_shape()?;

    let enc_key = derive(master_key, &envelope.key_salt, &envelope.cost, ENC_KEY_LEN)
        .map_err(|_| GuardianError::AuthenticationFailed)?;
    let mac_key = derive(
        enc_key.as_bytes(),
        &envelope.mac_salt,
        &envelope.cost,
        MAC_KEY_LEN,
    )
    .map_err(|_| GuardianError::AuthenticationFailed)?;

    // Authenticate before touching the ciphertext.
    let computed = compute_mac(mac_key.as_bytes(), &envelope.iv, &envelope.cipher)?;
    if !bool::from(computed.as_slice().ct_eq(envelope.mac.as_slice())) {
        return Err(GuardianError::AuthenticationFailed);
    }

    let mut padded = SecretBuffer::from_slice(&envelope.cipher);
    Aes256CbcDec::new_from_slices(enc_key.as_bytes(), &envelope.iv)
        .map_err(|_| GuardianError::AuthenticationFailed)?
        .decrypt_padded_mut::<NoPadding>(padded.as_mut_bytes())
        .map_err(|_| GuardianError::AuthenticationFailed)?;

    unpad(padded)
}

/// HMAC-SHA3-512 over `iv || cipher`.
fn compute_mac(mac_key: &[u8], iv: &[u8], cipher: &[u8]) -> Result<Vec<u8>> {
    let mut mac = HmacSha3_512::new_from_slice(mac_key)
        .map_err(|e| GuardianError::EncryptionFailed(format!("invalid HMAC key: {e}")))?;
    mac.update(iv);
    mac.update(cipher);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// Build the padded plaintext buffer.
fn pad(plaintext: &[u8]) -> SecretBuffer {
    let len = padded_len(plaintext.len());
    let mut buffer = SecretBuffer::zeroed(len);
    let bytes = buffer.as_mut_bytes();

    bytes[..plaintext.len()].copy_from_slice(plaintext);
    fill_random(&mut bytes[plaintext.len()..]);
    bytes[len - 1] = encode_pad(len - plaintext.len());

    buffer
}

/// Strip the random padding off a decrypted buffer.
fn unpad(mut padded: SecretBuffer) -> Result<SecretBuffer> {
    let last = padded
        .as_bytes()
        .last()
        .copied()
        .ok_or(GuardianError::AuthenticationFailed)?;
    let pad = decode_pad(last);
    if pad > padded.len() {
        return Err(GuardianError::AuthenticationFailed);
    }

    let real_len = padded.len() - pad;
    padded.truncate(real_len);
    Ok(padded)
}

/// A pad spans 1..=256 bytes; 256 is stored as 0.
fn encode_pad(pad: usize) -> u8 {
    (pad % CHUNK_LEN) as u8
}

fn decode_pad(byte: u8) -> usize {
    match byte {
        0 => CHUNK_LEN,
        n => usize::from(n),
    }
}
