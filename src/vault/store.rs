//! The in-memory secret map and its load/persist lifecycle.
//!
//! `Vault` only ever holds plaintext in memory.  All byte-level
//! protection is delegated to `crypto::aead`; the master key is passed
//! in for each `open`/`save` and never stored.

use std::collections::HashMap;
use std::io::{Read, Write};

use tracing::debug;
use zeroize::Zeroize;

use crate::crypto::kdf::MIN_SALT_LEN;
use crate::crypto::{decrypt, encrypt, CostParams};
use crate::errors::{GuardianError, Result};

use super::format;

/// Default salt size in bytes for both envelope salts.
pub const DEFAULT_SALT_SIZE: usize = 64;

/// How a vault is sealed on `save`: Argon2id cost and salt size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VaultOptions {
    pub cost: CostParams,
    pub salt_size: usize,
}

impl Default for VaultOptions {
    fn default() -> Self {
        Self {
            cost: CostParams::default(),
            salt_size: DEFAULT_SALT_SIZE,
        }
    }
}

impl VaultOptions {
    pub fn new(cost: CostParams, salt_size: usize) -> Self {
        Self { cost, salt_size }
    }

    /// Reject options that `save` could not honour.
    pub fn validate(&self) -> Result<()> {
        self.cost.validate()?;
        if self.salt_size < MIN_SALT_LEN {
            return Err(GuardianError::InvalidConfiguration(format!(
                "salt size must be at least {MIN_SALT_LEN} bytes (got {})",
                self.salt_size
            )));
        }
        Ok(())
    }
}

/// Identifier -> secret map.  Values are wiped when replaced, removed,
/// or when the vault is dropped.
#[derive(Default)]
pub struct Vault {
    secrets: HashMap<String, String>,
    options: VaultOptions,
}

impl Vault {
    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// An empty vault with default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty vault bound to `options`.
    pub fn with_options(options: VaultOptions) -> Self {
        Self {
            secrets: HashMap::new(),
            options,
        }
    }

    /// Load a vault from a serialized envelope.
    ///
    /// A zero-length source (or the all-zero-cost sentinel envelope) is a
    /// brand-new empty vault and no decryption is attempted.  Otherwise
    /// the envelope is decrypted with `master_key` and the plaintext
    /// document parsed.  The vault is bound to `options` for later saves.
    pub fn open<R: Read>(master_key: &[u8], options: VaultOptions, reader: R) -> Result<Self> {
        let envelope = match format::read_envelope(reader)? {
            Some(envelope) if !envelope.is_sentinel() => envelope,
            _ => {
                debug!("empty vault source, starting a new vault");
                return Ok(Self::with_options(options));
            }
        };

        let plaintext = decrypt(master_key, &envelope)?;
        let secrets = format::decode_document(plaintext.as_bytes())?;
        debug!(entries = secrets.len(), "vault opened");

        Ok(Self { secrets, options })
    }

    // ------------------------------------------------------------------
    // Secret operations
    // ------------------------------------------------------------------

    /// Return the value stored under `id`.
    pub fn get(&self, id: &str) -> Result<&str> {
        self.secrets
            .get(id)
            .map(String::as_str)
            .ok_or_else(|| GuardianError::NotFound(id.to_string()))
    }

    /// Insert or overwrite `id`.  No validation on either side.
    pub fn set(&mut self, id: impl Into<String>, value: impl Into<String>) {
        if let Some(mut previous) = self.secrets.insert(id.into(), value.into()) {
            previous.zeroize();
        }
    }

    /// Remove `id`.  A missing id is `NotFound` and changes nothing.
    pub fn delete(&mut self, id: &str) -> Result<()> {
        match self.secrets.remove(id) {
            Some(mut value) => {
                value.zeroize();
                Ok(())
            }
            None => Err(GuardianError::NotFound(id.to_string())),
        }
    }

    /// `true` if `id` is present.
    pub fn contains(&self, id: &str) -> bool {
        self.secrets.contains_key(id)
    }

    /// All identifiers, sorted lexicographically.
    pub fn list(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.secrets.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Number of stored secrets.
    pub fn len(&self) -> usize {
        self.secrets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.secrets.is_empty()
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Encrypt the whole map with fresh randomness and write the envelope.
    ///
    /// Nothing is written unless encryption succeeded, and the in-memory
    /// map is never touched, so a failed save can simply be retried.
    pub fn save<W: Write>(&self, master_key: &[u8], writer: W) -> Result<()> {
        self.options.validate()?;

        let document = format::encode_document(&self.secrets)?;
        let envelope = encrypt(
            master_key,
            document.as_bytes(),
            &self.options.cost,
            self.options.salt_size,
        )?;
        format::write_envelope(writer, &envelope)?;

        debug!(
            entries = self.secrets.len(),
            cipher_bytes = envelope.cipher.len(),
            "vault saved"
        );
        Ok(())
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// The options the next `save` will use.
    pub fn options(&self) -> &VaultOptions {
        &self.options
    }

    /// Rebind the vault to new options (e.g. a stronger Argon2 cost).
    pub fn set_options(&mut self, options: VaultOptions) {
        self.options = options;
    }
}

impl Drop for Vault {
    fn drop(&mut self) {
        for value in self.secrets.values_mut() {
            value.zeroize();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cheap() -> VaultOptions {
        VaultOptions::new(CostParams::new(1, 1024, 1), 16)
    }

    #[test]
    fn set_then_get_returns_value() {
        let mut vault = Vault::new();
        vault.set("example.com", "user:pass");
        assert_eq!(vault.get("example.com").unwrap(), "user:pass");
    }

    #[test]
    fn set_overwrites() {
        let mut vault = Vault::new();
        vault.set("id", "one");
        vault.set("id", "two");
        assert_eq!(vault.get("id").unwrap(), "two");
        assert_eq!(vault.len(), 1);
    }

    #[test]
    fn delete_missing_is_not_found_and_leaves_map() {
        let mut vault = Vault::new();
        vault.set("keep", "v");
        assert!(matches!(
            vault.delete("missing"),
            Err(GuardianError::NotFound(_))
        ));
        assert_eq!(vault.list(), vec!["keep".to_string()]);
    }

    #[test]
    fn list_is_sorted() {
        let mut vault = Vault::new();
        for id in ["zeta", "alpha", "Mid", "beta"] {
            vault.set(id, "x");
        }
        assert_eq!(vault.list(), vec!["Mid", "alpha", "beta", "zeta"]);
    }

    #[test]
    fn open_empty_source_binds_options() {
        let vault = Vault::open(b"key", cheap(), &b""[..]).unwrap();
        assert!(vault.is_empty());
        assert_eq!(vault.options(), &cheap());
    }

    #[test]
    fn save_with_zero_cost_is_invalid_configuration() {
        let vault = Vault::with_options(VaultOptions::new(CostParams::EMPTY, 16));
        let mut out = Vec::new();
        assert!(matches!(
            vault.save(b"key", &mut out),
            Err(GuardianError::InvalidConfiguration(_))
        ));
        assert!(out.is_empty(), "nothing must be written on failure");
    }

    #[test]
    fn save_then_open_roundtrip() {
        let mut vault = Vault::with_options(cheap());
        vault.set("a", "1");
        vault.set("b", "2");

        let mut out = Vec::new();
        vault.save(b"key", &mut out).unwrap();

        let reopened = Vault::open(b"key", cheap(), out.as_slice()).unwrap();
        assert_eq!(reopened.list(), vec!["a", "b"]);
        assert_eq!(reopened.get("b").unwrap(), "2");
    }
}
