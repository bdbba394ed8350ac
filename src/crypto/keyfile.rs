//! Keyfile-based second factor.
//!
//! A keyfile is a 32-byte random file.  When one is supplied, the master
//! key handed to the vault is `HMAC-SHA256(keyfile_bytes, password)`
//! instead of the raw password, so both are needed to open the vault.
//! A wrong or missing keyfile is indistinguishable from a wrong password.

use std::fs;
use std::path::Path;

use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::random_bytes;
use super::secure::{MasterKey, SecretBuffer};
use crate::errors::{GuardianError, Result};

/// Expected length of a keyfile in bytes (256 bits).
pub const KEYFILE_LEN: usize = 32;

/// Generate a new random keyfile and write it to `path`.
///
/// Refuses to overwrite an existing file.  On Unix the file is
/// restricted to owner read/write.
pub fn generate_keyfile(path: &Path) -> Result<SecretBuffer> {
    if path.exists() {
        return Err(GuardianError::KeyfileError(format!(
            "keyfile already exists at {}",
            path.display()
        )));
    }

    let keyfile = SecretBuffer::from(random_bytes(KEYFILE_LEN));

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| {
                GuardianError::KeyfileError(format!("cannot create keyfile directory: {e}"))
            })?;
        }
    }

    fs::write(path, keyfile.as_bytes())
        .map_err(|e| GuardianError::KeyfileError(format!("failed to write keyfile: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = fs::Permissions::from_mode(0o600);
        fs::set_permissions(path, perms).map_err(|e| {
            GuardianError::KeyfileError(format!("failed to set keyfile permissions: {e}"))
        })?;
    }

    Ok(keyfile)
}

/// Load a keyfile from disk and validate its length.
pub fn load_keyfile(path: &Path) -> Result<SecretBuffer> {
    if !path.exists() {
        return Err(GuardianError::KeyfileError(format!(
            "keyfile not found at {}",
            path.display()
        )));
    }

    let data = SecretBuffer::from(
        fs::read(path)
            .map_err(|e| GuardianError::KeyfileError(format!("failed to read keyfile: {e}")))?,
    );

    if data.len() != KEYFILE_LEN {
        return Err(GuardianError::KeyfileError(format!(
            "keyfile must be exactly {KEYFILE_LEN} bytes, got {}",
            data.len()
        )));
    }

    Ok(data)
}

/// Combine a password and keyfile into the effective master key.
pub fn combine_password_keyfile(password: &[u8], keyfile_bytes: &[u8]) -> Result<MasterKey> {
    let mut mac = Hmac::<Sha256>::new_from_slice(keyfile_bytes)
        .map_err(|e| GuardianError::KeyfileError(format!("HMAC init failed: {e}")))?;

    mac.update(password);

    Ok(MasterKey::new(mac.finalize().into_bytes().to_vec()))
}
