//! `guardian rotate-key` — change the vault master key.
//!
//! Opens the vault with the current key, reads the new one, and rewrites
//! the whole envelope under the new key using the currently configured
//! Argon2 cost and salt size.

use crate::cli::output;
use crate::cli::{read_new_master_key, settings, Cli, Session};
use crate::errors::Result;

/// Execute the `rotate-key` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let settings = settings(cli)?;

    // 1. Open the vault with the current key.
    output::info("Enter your current master key.");
    let mut session = Session::open(cli)?;

    // 2. Read the new key.
    output::info("Choose your new master key.");
    let new_key = read_new_master_key(cli)?;

    // 3. Rebind to the configured options and save under the new key.
    //    The old key is dropped (and wiped) on reassignment.
    session.vault.set_options(settings.vault_options());
    session.key = new_key;
    session.save()?;

    output::success(&format!(
        "Master key rotated for {} ({} entries re-encrypted)",
        session.path.display(),
        session.vault.len()
    ));

    Ok(())
}
