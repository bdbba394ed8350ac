//! `guardian mount` — serve the vault as a directory of files.
//!
//! Blocks until the mount point is unmounted (`fusermount -u <dir>`).

use std::path::Path;

use crate::cli::output;
use crate::cli::{Cli, Session};
use crate::errors::{GuardianError, Result};

/// Execute the `mount` command.
pub fn execute(cli: &Cli, mount_point: &Path) -> Result<()> {
    if !mount_point.is_dir() {
        return Err(GuardianError::MountFailed(format!(
            "{} is not a directory",
            mount_point.display()
        )));
    }

    let session = Session::open(cli)?;
    serve(session, mount_point)
}

#[cfg(feature = "mount")]
fn serve(session: Session, mount_point: &Path) -> Result<()> {
    use crate::mount::fuse;
    use crate::mount::VaultFs;

    output::info(&format!(
        "Serving {} ({} entries) at {}",
        session.path.display(),
        session.vault.len(),
        mount_point.display()
    ));
    output::tip(&format!("Unmount with: fusermount -u {}", mount_point.display()));

    let Session {
        vault, file, key, ..
    } = session;
    fuse::mount(VaultFs::new(vault, key, file), mount_point)?;

    output::success("Unmounted.");
    Ok(())
}

#[cfg(not(feature = "mount"))]
fn serve(session: Session, _mount_point: &Path) -> Result<()> {
    let _ = session;
    output::warning("This build has no filesystem support.");
    Err(GuardianError::MountFailed(
        "mount support not compiled — rebuild with `--features mount`".into(),
    ))
}
