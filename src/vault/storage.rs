//! The backing file a vault session reads from and writes back to.
//!
//! A session keeps one handle open for its whole lifetime.  Every save
//! rewinds to offset 0, writes the new envelope and truncates whatever
//! is left of the previous (possibly longer) one, so a stale tail can
//! never survive behind a shorter envelope.

use std::fs::{File, OpenOptions};
use std::io::{self, Cursor, Read, Seek, SeekFrom, Write};
use std::path::Path;

use super::store::Vault;
use crate::errors::{GuardianError, Result};

/// A seekable byte stream whose length can be cut.
pub trait Backing: Read + Write + Seek {
    /// Set the stream length to exactly `len` bytes.
    fn truncate_to(&mut self, len: u64) -> io::Result<()>;
}

impl Backing for File {
    fn truncate_to(&mut self, len: u64) -> io::Result<()> {
        self.set_len(len)
    }
}

impl Backing for Cursor<Vec<u8>> {
    fn truncate_to(&mut self, len: u64) -> io::Result<()> {
        let len = usize::try_from(len)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "length exceeds usize"))?;
        self.get_mut().resize(len, 0);
        Ok(())
    }
}

impl<B: Backing + ?Sized> Backing for &mut B {
    fn truncate_to(&mut self, len: u64) -> io::Result<()> {
        (**self).truncate_to(len)
    }
}

/// Open (creating if needed) the vault file for reading and writing.
///
/// New files are created owner read/write only on Unix.
pub fn open_backing_file(path: &Path) -> Result<File> {
    let mut options = OpenOptions::new();
    options.read(true).write(true).create(true).truncate(false);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    options
        .open(path)
        .map_err(|e| GuardianError::io(format!("failed to open {}", path.display()), e))
}

/// Load the vault held by `backing`, reading from its start.
pub fn load<B: Backing>(
    backing: &mut B,
    master_key: &[u8],
    options: super::VaultOptions,
) -> Result<Vault> {
    backing
        .seek(SeekFrom::Start(0))
        .map_err(|e| GuardianError::io("failed to rewind vault file", e))?;
    Vault::open(master_key, options, &mut *backing)
}

/// Replace the envelope stored in `backing` with a fresh save of `vault`.
pub fn overwrite<B: Backing>(vault: &Vault, master_key: &[u8], backing: &mut B) -> Result<()> {
    backing
        .seek(SeekFrom::Start(0))
        .map_err(|e| GuardianError::io("failed to rewind vault file", e))?;

    vault.save(master_key, &mut *backing)?;

    let end = backing
        .stream_position()
        .map_err(|e| GuardianError::io("failed to query vault file position", e))?;
    backing
        .truncate_to(end)
        .map_err(|e| GuardianError::io("failed to truncate vault file", e))?;
    backing
        .flush()
        .map_err(|e| GuardianError::io("failed to flush vault file", e))
}

/// Size of the envelope currently stored, without disturbing anything.
pub fn stored_len<B: Backing>(backing: &mut B) -> Result<u64> {
    backing
        .seek(SeekFrom::End(0))
        .map_err(|e| GuardianError::io("failed to seek vault file", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::CostParams;
    use crate::vault::VaultOptions;

    fn cheap() -> VaultOptions {
        VaultOptions::new(CostParams::new(1, 1024, 1), 16)
    }

    #[test]
    fn overwrite_truncates_stale_tail() {
        let mut backing = Cursor::new(vec![b'x'; 64 * 1024]);
        let mut vault = Vault::with_options(cheap());
        vault.set("id", "value");

        overwrite(&vault, b"key", &mut backing).unwrap();

        let written = backing.get_ref();
        assert!(written.len() < 64 * 1024);
        assert_eq!(written.last(), Some(&b'}'));

        let reopened = load(&mut backing, b"key", cheap()).unwrap();
        assert_eq!(reopened.get("id").unwrap(), "value");
    }

    #[test]
    fn repeated_overwrites_stay_readable() {
        let mut backing = Cursor::new(Vec::new());
        let mut vault = Vault::with_options(cheap());

        vault.set("big", "v".repeat(2000));
        overwrite(&vault, b"key", &mut backing).unwrap();
        let long_len = stored_len(&mut backing).unwrap();

        vault.delete("big").unwrap();
        overwrite(&vault, b"key", &mut backing).unwrap();
        let short_len = stored_len(&mut backing).unwrap();
        assert!(short_len < long_len);

        let reopened = load(&mut backing, b"key", cheap()).unwrap();
        assert!(reopened.is_empty());
    }

    #[test]
    fn open_backing_file_creates_missing_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("guardian.json");

        let mut file = open_backing_file(&path).unwrap();
        assert!(path.exists());
        assert_eq!(stored_len(&mut file).unwrap(), 0);

        let vault = load(&mut file, b"key", cheap()).unwrap();
        assert!(vault.is_empty());
    }
}
