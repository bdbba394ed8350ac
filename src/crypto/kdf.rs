//! Password-based key derivation using Argon2id.
//!
//! Argon2id is a memory-hard KDF that bounds brute-forcing of the master
//! key by the configured cost.  The same secret + salt + cost always
//! yields the same output, which is what makes round-trip decryption
//! possible: the cost travels inside every envelope.

use argon2::{Algorithm, Argon2, Params, Version};
use serde::{Deserialize, Serialize};

use super::secure::SecretBuffer;
use crate::errors::{GuardianError, Result};

/// Argon2's hard lower bound on salt length.
pub const MIN_SALT_LEN: usize = 8;

/// Refuse memory costs above 4 GiB; an envelope claiming more is either
/// corrupt or an attempt to exhaust memory on open.
pub const MAX_MEMORY_KIB: u32 = 4 * 1024 * 1024;

/// Argon2id tuning knobs.
///
/// Serialized with the field names used in the persisted envelope
/// (`time`, `memory`, `threads`).  All-zero is the "nothing encrypted
/// yet" sentinel and is never valid for an encrypting operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CostParams {
    /// Number of passes over memory.
    pub time: u32,
    /// Memory cost in KiB.
    #[serde(rename = "memory")]
    pub memory_kib: u32,
    /// Parallelism lanes.
    #[serde(rename = "threads")]
    pub parallelism: u8,
}

impl CostParams {
    /// The all-zero sentinel.
    pub const EMPTY: Self = Self {
        time: 0,
        memory_kib: 0,
        parallelism: 0,
    };

    pub fn new(time: u32, memory_kib: u32, parallelism: u8) -> Self {
        Self {
            time,
            memory_kib,
            parallelism,
        }
    }

    /// `true` only for the all-zero sentinel.
    pub fn is_empty(&self) -> bool {
        *self == Self::EMPTY
    }

    /// Reject cost parameters that cannot protect anything.
    pub fn validate(&self) -> Result<()> {
        if self.time == 0 || self.memory_kib == 0 || self.parallelism == 0 {
            return Err(GuardianError::InvalidConfiguration(format!(
                "argon cost parameters must all be non-zero (time={}, memory={}, threads={})",
                self.time, self.memory_kib, self.parallelism
            )));
        }
        if self.memory_kib > MAX_MEMORY_KIB {
            return Err(GuardianError::InvalidConfiguration(format!(
                "argon memory must not exceed {MAX_MEMORY_KIB} KiB (got {})",
                self.memory_kib
            )));
        }
        Ok(())
    }

    fn to_argon2_params(self, output_len: usize) -> Result<Params> {
        Params::new(
            self.memory_kib,
            self.time,
            u32::from(self.parallelism),
            Some(output_len),
        )
        .map_err(|e| GuardianError::InvalidConfiguration(format!("invalid Argon2 params: {e}")))
    }
}

impl Default for CostParams {
    /// 3 passes over 64 MiB with 4 lanes.
    fn default() -> Self {
        Self {
            time: 3,
            memory_kib: 65_536,
            parallelism: 4,
        }
    }
}

/// Stretch `secret` into `output_len` bytes of key material.
///
/// Callers validate `cost` first; a zero cost reaching this point is
/// reported as `InvalidConfiguration`, never silently accepted.
pub fn derive(
    secret: &[u8],
    salt: &[u8],
    cost: &CostParams,
    output_len: usize,
) -> Result<SecretBuffer> {
    cost.validate()?;
    let params = cost.to_argon2_params(output_len)?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut output = SecretBuffer::zeroed(output_len);
    argon2
        .hash_password_into(secret, salt, output.as_mut_bytes())
        .map_err(|e| GuardianError::KeyDerivationFailed(format!("Argon2id hashing failed: {e}")))?;

    Ok(output)
}
