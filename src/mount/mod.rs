//! Mount module — the vault as a filesystem.
//!
//! - `fs`: the kernel-independent adapter (`VaultFs`)
//! - `fuse`: the FUSE binding, behind the `mount` feature

pub mod fs;

#[cfg(feature = "mount")]
pub mod fuse;

pub use fs::{DirEntry, FsError, NodeAttr, NodeKind, VaultFs, MAX_FILE_SIZE, ROOT_INO};
