//! Vault module — the secret map and its persistence.
//!
//! This module provides:
//! - `Vault` and `VaultOptions` (`store`)
//! - Plaintext document and envelope file encoding (`format`)
//! - Rewind-write-truncate persistence on a held file handle (`storage`)

pub mod format;
pub mod storage;
pub mod store;

// Re-export the most commonly used items.
pub use storage::{open_backing_file, overwrite, Backing};
pub use store::{Vault, VaultOptions, DEFAULT_SALT_SIZE};
