//! `VaultFs` — one vault exposed as a flat directory of files.
//!
//! Each identifier is a regular file under the root directory and its
//! content is the secret value.  Open files get a private write buffer
//! seeded from the vault; every write is mirrored straight back into the
//! vault map and `release` persists the whole vault to the backing file.
//!
//! Nothing here talks to the kernel.  `mount::fuse` translates FUSE
//! requests into these calls, which keeps the adapter testable with an
//! in-memory backing.

use std::collections::HashMap;

use thiserror::Error;
use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::crypto::MasterKey;
use crate::errors::GuardianError;
use crate::vault::{storage, Backing, Vault};

/// Inode number of the (only) directory.
pub const ROOT_INO: u64 = 1;

/// Largest value a file session may grow to.
pub const MAX_FILE_SIZE: u64 = 16 * 1024 * 1024;

/// Errors surfaced to the filesystem caller.
#[derive(Debug, Error)]
pub enum FsError {
    #[error("no such entry")]
    NotFound,

    #[error("offset {offset} is past the end of the file ({len} bytes)")]
    OffsetOutOfRange { offset: u64, len: u64 },

    #[error("unknown file handle {0}")]
    BadHandle(u64),

    #[error("invalid file name {0:?}")]
    InvalidName(String),

    #[error("vault write-back failed: {0}")]
    WriteBack(#[source] GuardianError),

    #[error("not a directory")]
    NotADirectory,

    #[error("is a directory")]
    IsADirectory,

    #[error("file size {size} exceeds the {max} byte limit")]
    FileTooLarge { size: u64, max: u64 },

    #[error("file content is not valid UTF-8")]
    InvalidContent,
}

impl FsError {
    /// The errno reported to the kernel.
    pub fn errno(&self) -> i32 {
        match self {
            FsError::NotFound => libc::ENOENT,
            FsError::OffsetOutOfRange { .. } => libc::EINVAL,
            FsError::BadHandle(_) => libc::EBADF,
            FsError::InvalidName(_) => libc::EINVAL,
            FsError::WriteBack(_) => libc::EIO,
            FsError::NotADirectory => libc::ENOTDIR,
            FsError::IsADirectory => libc::EISDIR,
            FsError::FileTooLarge { .. } => libc::EFBIG,
            FsError::InvalidContent => libc::EILSEQ,
        }
    }
}

pub type FsResult<T> = std::result::Result<T, FsError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Directory,
    File,
}

/// The attributes `VaultFs` knows about; the FUSE layer fills the rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeAttr {
    pub ino: u64,
    pub kind: NodeKind,
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub ino: u64,
    pub kind: NodeKind,
    pub name: String,
}

/// Stable name <-> inode assignment for the lifetime of a mount.
#[derive(Debug)]
struct InodeTable {
    by_name: HashMap<String, u64>,
    by_ino: HashMap<u64, String>,
    next: u64,
}

impl InodeTable {
    fn new() -> Self {
        Self {
            by_name: HashMap::new(),
            by_ino: HashMap::new(),
            next: ROOT_INO + 1,
        }
    }

    fn ino_for(&mut self, name: &str) -> u64 {
        if let Some(&ino) = self.by_name.get(name) {
            return ino;
        }
        let ino = self.next;
        self.next += 1;
        self.by_name.insert(name.to_string(), ino);
        self.by_ino.insert(ino, name.to_string());
        ino
    }

    fn name_of(&self, ino: u64) -> Option<&str> {
        self.by_ino.get(&ino).map(String::as_str)
    }

    fn forget(&mut self, name: &str) {
        if let Some(ino) = self.by_name.remove(name) {
            self.by_ino.remove(&ino);
        }
    }
}

/// An open file: the identifier it belongs to and its working copy.
struct Handle {
    ino: u64,
    buffer: Zeroizing<Vec<u8>>,
    dirty: bool,
}

pub struct VaultFs<B: Backing> {
    vault: Vault,
    master_key: MasterKey,
    backing: B,
    inodes: InodeTable,
    handles: HashMap<u64, Handle>,
    next_fh: u64,
    needs_save: bool,
}

impl<B: Backing> VaultFs<B> {
    /// Wrap an opened vault.  `backing` is the file it was loaded from.
    pub fn new(vault: Vault, master_key: MasterKey, backing: B) -> Self {
        Self {
            vault,
            master_key,
            backing,
            inodes: InodeTable::new(),
            handles: HashMap::new(),
            next_fh: 1,
            needs_save: false,
        }
    }

    pub fn vault(&self) -> &Vault {
        &self.vault
    }

    pub fn backing(&self) -> &B {
        &self.backing
    }

    pub fn backing_mut(&mut self) -> &mut B {
        &mut self.backing
    }

    /// True while the in-memory vault holds changes the last save lost.
    pub fn needs_save(&self) -> bool {
        self.needs_save
    }

    // ------------------------------------------------------------------
    // Namespace
    // ------------------------------------------------------------------

    /// Every identifier as a directory entry, sorted.
    pub fn readdir(&mut self, ino: u64) -> FsResult<Vec<DirEntry>> {
        self.require_root(ino)?;
        let entries = self
            .vault
            .list()
            .into_iter()
            .map(|name| DirEntry {
                ino: self.inodes.ino_for(&name),
                kind: NodeKind::File,
                name,
            })
            .collect();
        Ok(entries)
    }

    pub fn lookup(&mut self, parent: u64, name: &str) -> FsResult<NodeAttr> {
        self.require_root(parent)?;
        self.value_len(name)?;
        let ino = self.inodes.ino_for(name);
        Ok(NodeAttr {
            ino,
            kind: NodeKind::File,
            size: self.file_len(ino, name)?,
        })
    }

    pub fn getattr(&self, ino: u64) -> FsResult<NodeAttr> {
        if ino == ROOT_INO {
            return Ok(NodeAttr {
                ino,
                kind: NodeKind::Directory,
                size: 0,
            });
        }
        let name = self.inodes.name_of(ino).ok_or(FsError::NotFound)?;
        Ok(NodeAttr {
            ino,
            kind: NodeKind::File,
            size: self.file_len(ino, name)?,
        })
    }

    // ------------------------------------------------------------------
    // File sessions
    // ------------------------------------------------------------------

    /// Create (or reset) `name` as an empty secret and open it for writing.
    pub fn create(&mut self, parent: u64, name: &str) -> FsResult<(NodeAttr, u64)> {
        self.require_root(parent)?;
        validate_name(name)?;

        self.vault.set(name, String::new());
        let ino = self.inodes.ino_for(name);
        let fh = self.insert_handle(Handle {
            ino,
            buffer: Zeroizing::new(Vec::new()),
            dirty: true,
        });
        debug!(ino, fh, "created vault entry");

        Ok((
            NodeAttr {
                ino,
                kind: NodeKind::File,
                size: 0,
            },
            fh,
        ))
    }

    /// Open an existing entry; the buffer starts as its current value.
    pub fn open(&mut self, ino: u64) -> FsResult<u64> {
        if ino == ROOT_INO {
            return Err(FsError::IsADirectory);
        }
        let name = self.inodes.name_of(ino).ok_or(FsError::NotFound)?;
        let value = self.vault.get(name).map_err(|_| FsError::NotFound)?;
        let buffer = Zeroizing::new(value.as_bytes().to_vec());

        Ok(self.insert_handle(Handle {
            ino,
            buffer,
            dirty: false,
        }))
    }

    /// Up to `size` bytes from `offset`.  Reading at exactly the end
    /// yields nothing; starting beyond it is an error.
    pub fn read(&self, fh: u64, offset: u64, size: u32) -> FsResult<Vec<u8>> {
        let handle = self.handles.get(&fh).ok_or(FsError::BadHandle(fh))?;
        let len = handle.buffer.len() as u64;
        if offset > len {
            return Err(FsError::OffsetOutOfRange { offset, len });
        }

        let start = offset as usize;
        let end = offset.saturating_add(u64::from(size)).min(len) as usize;
        Ok(handle.buffer[start..end].to_vec())
    }

    /// Copy `data` in at `offset`, zero-filling any gap, and mirror the
    /// whole buffer into the vault.  Returns the number of bytes written.
    pub fn write(&mut self, fh: u64, offset: u64, data: &[u8]) -> FsResult<u32> {
        let handle = self.handles.get_mut(&fh).ok_or(FsError::BadHandle(fh))?;
        let start = usize::try_from(offset).map_err(|_| FsError::OffsetOutOfRange {
            offset,
            len: handle.buffer.len() as u64,
        })?;
        let end = start
            .checked_add(data.len())
            .ok_or(FsError::OffsetOutOfRange {
                offset,
                len: handle.buffer.len() as u64,
            })?;
        check_size(end as u64)?;

        if end > handle.buffer.len() {
            handle.buffer.resize(end, 0);
        }
        handle.buffer[start..end].copy_from_slice(data);
        handle.dirty = true;

        let ino = handle.ino;
        self.mirror(ino, fh);
        Ok(data.len() as u32)
    }

    /// Resize an entry.  With an open handle the change stays in its
    /// buffer until release; otherwise it is persisted immediately.
    pub fn truncate(&mut self, ino: u64, fh: Option<u64>, size: u64) -> FsResult<NodeAttr> {
        if ino == ROOT_INO {
            return Err(FsError::IsADirectory);
        }
        let name = self
            .inodes
            .name_of(ino)
            .ok_or(FsError::NotFound)?
            .to_string();
        check_size(size)?;
        let new_len = usize::try_from(size)
            .map_err(|_| FsError::OffsetOutOfRange { offset: size, len: 0 })?;

        match fh.filter(|fh| self.handles.contains_key(fh)) {
            Some(fh) => {
                if let Some(handle) = self.handles.get_mut(&fh) {
                    handle.buffer.resize(new_len, 0);
                    handle.dirty = true;
                }
                self.mirror(ino, fh);
            }
            None => {
                let current = self.vault.get(&name).map_err(|_| FsError::NotFound)?;
                let mut bytes = Zeroizing::new(current.as_bytes().to_vec());
                bytes.resize(new_len, 0);
                let value = std::str::from_utf8(&bytes).map_err(|_| FsError::InvalidContent)?;
                self.vault.set(name.as_str(), value);
                self.persist()?;
            }
        }

        self.getattr(ino)
    }

    /// Remove an entry and persist the vault.
    pub fn unlink(&mut self, parent: u64, name: &str) -> FsResult<()> {
        self.require_root(parent)?;
        self.vault.delete(name).map_err(|_| FsError::NotFound)?;
        self.inodes.forget(name);
        debug!("removed vault entry");
        self.persist()
    }

    /// Close a file session: final set, then save if anything changed.
    ///
    /// A read-only session re-sets the same bytes and skips the save.
    /// If the entry was unlinked while open, nothing is resurrected.
    /// A buffer that is not UTF-8 is dropped with `InvalidContent`; the
    /// entry keeps its last valid value, which is still saved if dirty.
    pub fn release(&mut self, fh: u64) -> FsResult<()> {
        let handle = self.handles.remove(&fh).ok_or(FsError::BadHandle(fh))?;
        let Some(name) = self.inodes.name_of(handle.ino).map(str::to_string) else {
            return Ok(());
        };

        let content = std::str::from_utf8(&handle.buffer);
        if let Ok(value) = content {
            self.vault.set(name, value);
        }

        if handle.dirty {
            self.persist()?;
        }
        match content {
            Ok(_) => Ok(()),
            Err(_) => {
                warn!(fh, "discarded non UTF-8 file content");
                Err(FsError::InvalidContent)
            }
        }
    }

    /// Write the whole vault back to the backing file.
    ///
    /// A failure leaves the vault marked for a later `flush_pending`.
    pub fn persist(&mut self) -> FsResult<()> {
        match storage::overwrite(&self.vault, self.master_key.as_bytes(), &mut self.backing) {
            Ok(()) => {
                self.needs_save = false;
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "vault write-back failed");
                self.needs_save = true;
                Err(FsError::WriteBack(e))
            }
        }
    }

    /// Retry a save that failed earlier.  Does nothing when the backing
    /// file is already current.
    pub fn flush_pending(&mut self) -> FsResult<()> {
        if self.needs_save {
            self.persist()?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    fn require_root(&self, ino: u64) -> FsResult<()> {
        if ino == ROOT_INO {
            Ok(())
        } else if self.inodes.name_of(ino).is_some() {
            Err(FsError::NotADirectory)
        } else {
            Err(FsError::NotFound)
        }
    }

    fn value_len(&self, name: &str) -> FsResult<u64> {
        self.vault
            .get(name)
            .map(|value| value.len() as u64)
            .map_err(|_| FsError::NotFound)
    }

    /// Size as seen through the filesystem.  An open dirty buffer wins over
    /// the vault value, which lags while the buffer is not UTF-8.
    fn file_len(&self, ino: u64, name: &str) -> FsResult<u64> {
        let open = self
            .handles
            .values()
            .filter(|handle| handle.ino == ino && handle.dirty)
            .map(|handle| handle.buffer.len() as u64)
            .max();
        match open {
            Some(len) => Ok(len),
            None => self.value_len(name),
        }
    }

    fn insert_handle(&mut self, handle: Handle) -> u64 {
        let fh = self.next_fh;
        self.next_fh += 1;
        self.handles.insert(fh, handle);
        fh
    }

    /// Reflect the buffer of `fh` into the vault entry of `ino`.  Skipped
    /// while the buffer is not UTF-8, e.g. mid-way through a multibyte
    /// character.
    fn mirror(&mut self, ino: u64, fh: u64) {
        let (Some(name), Some(handle)) = (self.inodes.name_of(ino), self.handles.get(&fh)) else {
            return;
        };
        if let Ok(value) = std::str::from_utf8(&handle.buffer) {
            self.vault.set(name.to_string(), value);
        }
    }
}

fn check_size(size: u64) -> FsResult<()> {
    if size > MAX_FILE_SIZE {
        return Err(FsError::FileTooLarge {
            size,
            max: MAX_FILE_SIZE,
        });
    }
    Ok(())
}

/// Names must be a single, non-special path component.
fn validate_name(name: &str) -> FsResult<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\0']) {
        return Err(FsError::InvalidName(name.to_string()));
    }
    Ok(())
}
