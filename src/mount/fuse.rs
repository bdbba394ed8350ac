//! FUSE binding for [`VaultFs`].
//!
//! fuser drives the session from a single thread and hands us `&mut self`
//! for every request, so the vault map is never touched concurrently.

use std::ffi::OsStr;
use std::fs::File;
use std::path::Path;
use std::time::{Duration, SystemTime};

use fuser::{
    FileAttr, FileType, Filesystem, MountOption, ReplyAttr, ReplyCreate, ReplyData,
    ReplyDirectory, ReplyEmpty, ReplyEntry, ReplyOpen, ReplyWrite, Request, TimeOrNow,
};
use tracing::{debug, info, warn};

use super::fs::{FsError, NodeAttr, NodeKind, VaultFs, ROOT_INO};
use crate::errors::{GuardianError, Result};

/// Name and type the mount shows up with in the mount table.
pub const FS_NAME: &str = "guardian";

// Attributes change under the kernel's feet whenever a write lands, so
// nothing is cached.
const TTL: Duration = Duration::ZERO;

const BLOCK_SIZE: u32 = 512;

pub struct GuardianFs {
    inner: VaultFs<File>,
    mounted_at: SystemTime,
}

impl GuardianFs {
    pub fn new(inner: VaultFs<File>) -> Self {
        Self {
            inner,
            mounted_at: SystemTime::now(),
        }
    }

    fn file_attr(&self, attr: NodeAttr, req: &Request<'_>) -> FileAttr {
        let (kind, perm, nlink) = match attr.kind {
            NodeKind::Directory => (FileType::Directory, 0o700, 2),
            NodeKind::File => (FileType::RegularFile, 0o600, 1),
        };
        FileAttr {
            ino: attr.ino,
            size: attr.size,
            blocks: attr.size.div_ceil(u64::from(BLOCK_SIZE)),
            atime: self.mounted_at,
            mtime: self.mounted_at,
            ctime: self.mounted_at,
            crtime: self.mounted_at,
            kind,
            perm,
            nlink,
            uid: req.uid(),
            gid: req.gid(),
            rdev: 0,
            blksize: BLOCK_SIZE,
            flags: 0,
        }
    }
}

fn utf8_name(name: &OsStr) -> std::result::Result<&str, FsError> {
    name.to_str()
        .ok_or_else(|| FsError::InvalidName(name.to_string_lossy().into_owned()))
}

fn offset_of(offset: i64) -> std::result::Result<u64, FsError> {
    u64::try_from(offset).map_err(|_| FsError::OffsetOutOfRange { offset: 0, len: 0 })
}

impl Filesystem for GuardianFs {
    fn lookup(&mut self, req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        match utf8_name(name).and_then(|name| self.inner.lookup(parent, name)) {
            Ok(attr) => reply.entry(&TTL, &self.file_attr(attr, req), 0),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn getattr(&mut self, req: &Request<'_>, ino: u64, reply: ReplyAttr) {
        match self.inner.getattr(ino) {
            Ok(attr) => reply.attr(&TTL, &self.file_attr(attr, req)),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn setattr(
        &mut self,
        req: &Request<'_>,
        ino: u64,
        _mode: Option<u32>,
        _uid: Option<u32>,
        _gid: Option<u32>,
        size: Option<u64>,
        _atime: Option<TimeOrNow>,
        _mtime: Option<TimeOrNow>,
        _ctime: Option<SystemTime>,
        fh: Option<u64>,
        _crtime: Option<SystemTime>,
        _chgtime: Option<SystemTime>,
        _bkuptime: Option<SystemTime>,
        _flags: Option<u32>,
        reply: ReplyAttr,
    ) {
        // Only size changes mean anything for a secret; the rest is
        // accepted and ignored so tools like `cp` don't fail.
        let result = match size {
            Some(size) => self.inner.truncate(ino, fh, size),
            None => self.inner.getattr(ino),
        };
        match result {
            Ok(attr) => reply.attr(&TTL, &self.file_attr(attr, req)),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn readdir(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        let entries = match self.inner.readdir(ino) {
            Ok(entries) => entries,
            Err(e) => return reply.error(e.errno()),
        };

        let listing = [
            (ROOT_INO, FileType::Directory, ".".to_string()),
            (ROOT_INO, FileType::Directory, "..".to_string()),
        ]
        .into_iter()
        .chain(
            entries
                .into_iter()
                .map(|entry| (entry.ino, FileType::RegularFile, entry.name)),
        );

        let skip = usize::try_from(offset).unwrap_or(0);
        for (index, (ino, kind, name)) in listing.enumerate().skip(skip) {
            // The offset handed back is the index of the *next* entry.
            if reply.add(ino, (index + 1) as i64, kind, name) {
                break;
            }
        }
        reply.ok();
    }

    fn create(
        &mut self,
        req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        _mode: u32,
        _umask: u32,
        _flags: i32,
        reply: ReplyCreate,
    ) {
        match utf8_name(name).and_then(|name| self.inner.create(parent, name)) {
            Ok((attr, fh)) => reply.created(&TTL, &self.file_attr(attr, req), 0, fh, 0),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn open(&mut self, _req: &Request<'_>, ino: u64, _flags: i32, reply: ReplyOpen) {
        match self.inner.open(ino) {
            Ok(fh) => reply.opened(fh, 0),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn read(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        match offset_of(offset).and_then(|offset| self.inner.read(fh, offset, size)) {
            Ok(bytes) => reply.data(&bytes),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn write(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        fh: u64,
        offset: i64,
        data: &[u8],
        _write_flags: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyWrite,
    ) {
        match offset_of(offset).and_then(|offset| self.inner.write(fh, offset, data)) {
            Ok(written) => reply.written(written),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn unlink(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        match utf8_name(name).and_then(|name| self.inner.unlink(parent, name)) {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn release(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        fh: u64,
        _flags: i32,
        _lock_owner: Option<u64>,
        _flush: bool,
        reply: ReplyEmpty,
    ) {
        match self.inner.release(fh) {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn destroy(&mut self) {
        if let Err(e) = self.inner.flush_pending() {
            warn!(error = %e, "unsaved vault changes lost at unmount");
        }
        debug!("filesystem session ended");
    }
}

/// Serve `fs` at `mount_point` until it is unmounted.
pub fn mount(fs: VaultFs<File>, mount_point: &Path) -> Result<()> {
    let options = [
        MountOption::FSName(FS_NAME.to_string()),
        MountOption::Subtype(FS_NAME.to_string()),
        MountOption::NoDev,
        MountOption::NoSuid,
        MountOption::DefaultPermissions,
    ];

    info!(mount_point = %mount_point.display(), "mounting vault");
    fuser::mount2(GuardianFs::new(fs), mount_point, &options).map_err(|e| {
        GuardianError::MountFailed(format!("{}: {e}", mount_point.display()))
    })
}
