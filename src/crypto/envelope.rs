//! The authenticated-ciphertext record and its persisted JSON layout.
//!
//! ```text
//! {
//!   "version": 1,
//!   "argon":    {"time": u32, "memory": u32, "threads": u8},
//!   "iv":       "<base64, 16 bytes>",
//!   "keySalt":  "<base64, salt_size bytes>",
//!   "hmacSalt": "<base64, salt_size bytes>",
//!   "cipher":   "<base64, multiple of 256 bytes>",
//!   "hmac":     "<base64, 64 bytes>"
//! }
//! ```
//!
//! An envelope whose `argon` block is all zero is the sentinel for a
//! freshly initialised vault that has never been encrypted; it carries
//! no ciphertext.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

use super::kdf::CostParams;
use crate::errors::{GuardianError, Result};

/// Current envelope format version.
pub const CURRENT_VERSION: u8 = 1;

/// AES block size, also the IV length.
pub const IV_LEN: usize = 16;

/// HMAC-SHA3-512 tag length.
pub const MAC_LEN: usize = 64;

/// Plaintext is padded to a multiple of this many bytes.
pub const CHUNK_LEN: usize = 256;

/// One encrypted vault document.
///
/// Produced by [`super::aead::encrypt`], consumed by
/// [`super::aead::decrypt`].  A new one is produced on every save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Format version.
    pub version: u8,

    /// Argon2id cost used for both key derivations.
    #[serde(rename = "argon")]
    pub cost: CostParams,

    /// AES-CBC initialisation vector.
    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub iv: Vec<u8>,

    /// Salt for deriving the encryption key from the master key.
    #[serde(
        rename = "keySalt",
        serialize_with = "base64_encode",
        deserialize_with = "base64_decode"
    )]
    pub key_salt: Vec<u8>,

    /// Salt for deriving the MAC key from the encryption key.
    #[serde(
        rename = "hmacSalt",
        serialize_with = "base64_encode",
        deserialize_with = "base64_decode"
    )]
    pub mac_salt: Vec<u8>,

    /// AES-256-CBC ciphertext of the padded plaintext.
    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub cipher: Vec<u8>,

    /// HMAC-SHA3-512 over `iv || cipher`.
    #[serde(
        rename = "hmac",
        serialize_with = "base64_encode",
        deserialize_with = "base64_decode"
    )]
    pub mac: Vec<u8>,
}

impl Envelope {
    /// The "no encryption applied yet" sentinel.
    pub fn sentinel() -> Self {
        Self {
            version: CURRENT_VERSION,
            cost: CostParams::EMPTY,
            iv: Vec::new(),
            key_salt: Vec::new(),
            mac_salt: Vec::new(),
            cipher: Vec::new(),
            mac: Vec::new(),
        }
    }

    /// `true` if this envelope is the empty-vault sentinel.
    pub fn is_sentinel(&self) -> bool {
        self.cost.is_empty()
    }

    /// Structural checks that must hold before any key is derived.
    ///
    /// Failing them is indistinguishable from a wrong key.
    pub fn check_shape(&self) -> Result<()> {
        let well_formed = self.iv.len() == IV_LEN
            && self.mac.len() == MAC_LEN
            && self.cipher.len() >= CHUNK_LEN
            && self.cipher.len() % CHUNK_LEN == 0;
        if well_formed {
            Ok(())
        } else {
            Err(GuardianError::AuthenticationFailed)
        }
    }

    /// Serialize to the persisted JSON form.
    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self)
            .map_err(|e| GuardianError::SerializationError(format!("envelope: {e}")))
    }

    /// Parse the persisted JSON form, rejecting unknown versions and
    /// sentinels that carry data.
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let envelope: Envelope = serde_json::from_slice(bytes)
            .map_err(|e| GuardianError::InvalidFormat(format!("envelope JSON: {e}")))?;

        if envelope.version != CURRENT_VERSION {
            return Err(GuardianError::InvalidFormat(format!(
                "unsupported envelope version {}, expected {CURRENT_VERSION}",
                envelope.version
            )));
        }

        if envelope.is_sentinel() && !envelope.cipher.is_empty() {
            return Err(GuardianError::InvalidFormat(
                "envelope has zero cost parameters but carries ciphertext".into(),
            ));
        }

        Ok(envelope)
    }
}

// ---------------------------------------------------------------------------
// Serde helpers for base64-encoded Vec<u8> fields
// ---------------------------------------------------------------------------

pub(crate) fn base64_encode<S>(data: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    let encoded = BASE64.encode(data);
    serializer.serialize_str(&encoded)
}

pub(crate) fn base64_decode<'de, D>(deserializer: D) -> std::result::Result<Vec<u8>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    BASE64.decode(&s).map_err(serde::de::Error::custom)
}
